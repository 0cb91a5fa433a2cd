//! Configuration management and validation.
//!
//! Provides the configuration consumed by the orchestration layer: where the
//! document store keeps each dataset, how dataset names are built and
//! recognised, which directory sheet to read, and the category synonym
//! table. The core pipeline functions never read configuration themselves;
//! they receive the pieces they need as arguments.

use crate::constants::{self, output::RUN_DATE_FORMAT};
use crate::error::{CpwError, Result};
use crate::models::CategoryLabel;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level configuration for a reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Folder layout of the document store
    pub store: StoreConfig,

    /// Naming of the cleaned planning snapshots
    pub planning: DatasetPattern,

    /// Where and how the directory (workbook structure) sheet is read
    pub directory: DirectorySheetConfig,

    /// Naming of the category outputs
    pub output: OutputNaming,

    /// Categories in priority order; a row lands in the first one it matches
    pub categories: Vec<CategoryRule>,
}

/// Folder layout of the document store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base directory; every folder below is relative to it
    pub root: PathBuf,

    /// Folder holding the raw planning export
    pub planning_folder: String,

    /// Folder receiving the dated, cleaned planning snapshots
    pub archive_folder: String,

    /// Folder holding the workbook structure file
    pub directory_folder: String,

    /// Folder receiving one workbook per category
    pub output_folder: String,

    /// Maximum number of category outputs stored concurrently
    pub max_concurrent_stores: usize,
}

/// Name template with exactly one embedded `YYYY-MM-DD` date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetPattern {
    pub prefix: String,
    pub extension: String,
}

/// Directory sheet location inside the workbook structure file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySheetConfig {
    /// Sheet holding one row per person
    pub sheet: String,

    /// Zero-based row holding the column headers
    pub header_row: usize,

    /// Only accept macro-enabled workbooks (.xlsm) as the structure file
    pub require_macro_workbook: bool,

    /// Rows with a blank value in this column are not assigned and are dropped
    pub assigned_column: String,
}

/// Naming of the category outputs: `{prefix}{label}{suffix}.{extension}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputNaming {
    pub prefix: String,
    pub suffix: String,
    pub extension: String,

    /// Also store rows that matched no category
    pub store_unclassified: bool,

    /// Label used in the file name of the unclassified output
    pub unclassified_label: String,
}

/// One category with the textual variants that resolve to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub label: CategoryLabel,
    pub synonyms: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            planning: DatasetPattern::default(),
            directory: DirectorySheetConfig::default(),
            output: OutputNaming::default(),
            categories: default_categories(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            planning_folder: constants::DEFAULT_PLANNING_FOLDER.to_string(),
            archive_folder: constants::DEFAULT_ARCHIVE_FOLDER.to_string(),
            directory_folder: constants::DEFAULT_DIRECTORY_FOLDER.to_string(),
            output_folder: constants::DEFAULT_OUTPUT_FOLDER.to_string(),
            max_concurrent_stores: constants::DEFAULT_MAX_CONCURRENT_STORES,
        }
    }
}

impl Default for DatasetPattern {
    fn default() -> Self {
        Self {
            prefix: constants::DEFAULT_PLANNING_PREFIX.to_string(),
            extension: constants::DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl Default for DirectorySheetConfig {
    fn default() -> Self {
        Self {
            sheet: constants::DEFAULT_DIRECTORY_SHEET.to_string(),
            header_row: constants::DEFAULT_DIRECTORY_HEADER_ROW,
            require_macro_workbook: true,
            assigned_column: constants::directory::PERSON_NUMBER.to_string(),
        }
    }
}

impl Default for OutputNaming {
    fn default() -> Self {
        Self {
            prefix: constants::DEFAULT_OUTPUT_PREFIX.to_string(),
            suffix: constants::DEFAULT_OUTPUT_SUFFIX.to_string(),
            extension: constants::DEFAULT_EXTENSION.to_string(),
            store_unclassified: false,
            unclassified_label: constants::DEFAULT_UNCLASSIFIED_LABEL.to_string(),
        }
    }
}

/// The five categories of the reference deployment
pub fn default_categories() -> Vec<CategoryRule> {
    constants::DEFAULT_CATEGORIES
        .iter()
        .map(|(label, synonyms)| CategoryRule {
            label: CategoryLabel::from(*label),
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
        })
        .collect()
}

impl DatasetPattern {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    /// Name of the snapshot for a given run date
    pub fn file_name(&self, date: NaiveDate) -> String {
        format!(
            "{}{}.{}",
            self.prefix,
            date.format(RUN_DATE_FORMAT),
            self.extension
        )
    }

    /// Anchored regex with a single capture group around the date
    pub fn to_regex(&self) -> Result<Regex> {
        let pattern = format!(
            r"^{}(\d{{4}}-\d{{2}}-\d{{2}})\.{}$",
            regex::escape(&self.prefix),
            regex::escape(&self.extension)
        );
        Regex::new(&pattern).map_err(|e| {
            CpwError::configuration(format!("Invalid dataset pattern '{}': {}", pattern, e))
        })
    }
}

impl OutputNaming {
    /// File name of the output for one category
    pub fn file_name(&self, label: &CategoryLabel) -> String {
        format!(
            "{}{}{}.{}",
            self.prefix, label, self.suffix, self.extension
        )
    }

    pub fn unclassified_file_name(&self) -> String {
        self.file_name(&CategoryLabel::new(self.unclassified_label.clone()))
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CpwError::configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        debug!(
            "Loaded configuration from {} ({} categories)",
            path.display(),
            config.categories.len()
        );
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| CpwError::configuration(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CpwError::configuration(format!("Cannot serialize configuration: {}", e)))
    }

    /// Default configuration file location in the user's config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cpw-reconciler").join("config.toml"))
    }

    /// Override the store root
    pub fn with_root(mut self, root: PathBuf) -> Self {
        self.store.root = root;
        self
    }

    /// Replace the category table
    pub fn with_categories(mut self, categories: Vec<CategoryRule>) -> Self {
        self.categories = categories;
        self
    }

    /// Store rows matching no category as their own output
    pub fn with_unclassified_output(mut self) -> Self {
        self.output.store_unclassified = true;
        self
    }

    /// Check the configuration for values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(CpwError::configuration("At least one category is required"));
        }

        let mut seen = HashSet::new();
        for rule in &self.categories {
            let label = rule.label.as_str().trim();
            if label.is_empty() {
                return Err(CpwError::configuration("Category labels cannot be empty"));
            }
            if label.contains(['/', '\\']) {
                return Err(CpwError::configuration(format!(
                    "Category label '{}' cannot contain path separators",
                    label
                )));
            }
            if !seen.insert(label.to_uppercase()) {
                return Err(CpwError::configuration(format!(
                    "Category label '{}' is defined more than once",
                    label
                )));
            }
            if rule.synonyms.iter().all(|s| s.trim().is_empty()) {
                return Err(CpwError::configuration(format!(
                    "Category '{}' has no synonyms",
                    label
                )));
            }
        }

        if self.planning.extension.trim().is_empty() || self.output.extension.trim().is_empty() {
            return Err(CpwError::configuration("File extensions cannot be empty"));
        }
        if self.planning.prefix.is_empty() {
            return Err(CpwError::configuration("Planning prefix cannot be empty"));
        }
        if self.store.max_concurrent_stores == 0 {
            return Err(CpwError::configuration(
                "max_concurrent_stores must be at least 1",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.categories.len(), 5);
        assert_eq!(config.categories[0].label.as_str(), "MOB");
        assert_eq!(config.directory.sheet, "Checker");
        assert_eq!(config.directory.header_row, 1);
    }

    #[test]
    fn test_planning_file_name() {
        let pattern = DatasetPattern::default();
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(
            pattern.file_name(date),
            "Project Plan Analysis-continuous-2024-03-15.xlsx"
        );
    }

    #[test]
    fn test_pattern_regex_captures_date() {
        let regex = DatasetPattern::default().to_regex().unwrap();
        let captures = regex
            .captures("Project Plan Analysis-continuous-2024-01-01.xlsx")
            .unwrap();
        assert_eq!(&captures[1], "2024-01-01");

        assert!(!regex.is_match("Project Plan Analysis-continuous-2024-01-01.xlsx.bak"));
        assert!(!regex.is_match("Project Plan Analysis-continuous-unique values-2024-01-01.xlsx"));
        assert!(!regex.is_match("Project Plan Analysis-continuous-2024-01-01xlsx"));
    }

    #[test]
    fn test_output_file_name() {
        let naming = OutputNaming::default();
        assert_eq!(
            naming.file_name(&CategoryLabel::from("MOB")),
            "CPW_Tool_MOB_Main.xlsx"
        );
        assert_eq!(
            naming.unclassified_file_name(),
            "CPW_Tool_Unclassified_Main.xlsx"
        );
    }

    #[test]
    fn test_toml_round_trip_preserves_category_order() {
        let config = PipelineConfig::default();
        let text = config.to_toml_string().unwrap();
        let parsed = PipelineConfig::from_toml_str(&text).unwrap();

        let labels: Vec<_> = parsed
            .categories
            .iter()
            .map(|c| c.label.as_str().to_string())
            .collect();
        assert_eq!(labels, vec!["MOB", "PLA", "RES", "EF", "SSC"]);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let text = r#"
[store]
root = "/data/cpw"

[[categories]]
label = "ENV"
synonyms = ["ENV", "Environment"]
"#;
        let config = PipelineConfig::from_toml_str(text).unwrap();
        assert_eq!(config.store.root, PathBuf::from("/data/cpw"));
        assert_eq!(config.store.output_folder, "02 GBA Workbooks");
        assert_eq!(config.categories.len(), 1);
        assert_eq!(config.categories[0].label.as_str(), "ENV");
    }

    #[test]
    fn test_validate_rejects_duplicate_labels() {
        let config = PipelineConfig::default().with_categories(vec![
            CategoryRule {
                label: CategoryLabel::from("MOB"),
                synonyms: vec!["MOB".to_string()],
            },
            CategoryRule {
                label: CategoryLabel::from("mob"),
                synonyms: vec!["MOBILITY".to_string()],
            },
        ]);
        assert!(matches!(
            config.validate(),
            Err(CpwError::Configuration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_path_separator_in_label() {
        let config = PipelineConfig::default().with_categories(vec![CategoryRule {
            label: CategoryLabel::from("../MOB"),
            synonyms: vec!["MOB".to_string()],
        }]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_synonyms() {
        let config = PipelineConfig::default().with_categories(vec![CategoryRule {
            label: CategoryLabel::from("MOB"),
            synonyms: vec!["  ".to_string()],
        }]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_category_list() {
        let config = PipelineConfig::default().with_categories(Vec::new());
        assert!(config.validate().is_err());
    }
}
