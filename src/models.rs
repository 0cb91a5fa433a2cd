//! Core data structures shared by the pipeline stages.
//!
//! Defines category labels, partitions, join diagnostics, stage statistics
//! and the reports returned by the orchestration layer.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Business category a joined row can be assigned to (e.g. MOB, PLA)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryLabel(String);

impl CategoryLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryLabel {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// Rows of the joined table assigned to one category, in source order
#[derive(Debug, Clone)]
pub struct Partition {
    pub label: CategoryLabel,
    pub table: DataFrame,
}

impl Partition {
    pub fn new(label: CategoryLabel, table: DataFrame) -> Self {
        Self { label, table }
    }

    pub fn row_count(&self) -> usize {
        self.table.height()
    }
}

/// A join key matched by more than one directory row
///
/// The first directory row wins; this record makes the resolution auditable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousJoin {
    pub key: String,
    pub matches: usize,
}

/// Result of joining planning records to the directory
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub table: DataFrame,
    pub ambiguous: Vec<AmbiguousJoin>,
}

/// Result of categorizing joined records
#[derive(Debug, Clone)]
pub struct CategorizeOutcome {
    /// One partition per configured category, in priority order
    pub partitions: Vec<Partition>,
    /// Rows whose organisation suffix matched no category
    pub unclassified: DataFrame,
    /// Distinct raw suffixes seen, with the category each resolved to
    pub observed_suffixes: Vec<(String, Option<CategoryLabel>)>,
}

impl CategorizeOutcome {
    pub fn partition(&self, label: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.label.as_str() == label)
    }
}

/// Everything produced by one categorization run
#[derive(Debug, Clone)]
pub struct CategorizationOutput {
    /// Full joined table, including unclassified rows
    pub joined: DataFrame,
    /// Sequenced partitions ready for storage
    pub partitions: Vec<Partition>,
    /// Unclassified rows, sequenced like the partitions
    pub unclassified: DataFrame,
    pub ambiguous: Vec<AmbiguousJoin>,
    pub observed_suffixes: Vec<(String, Option<CategoryLabel>)>,
}

/// Row accounting for the cleaning stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningStats {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub missing_employee_removed: usize,
    pub excluded_employee_removed: usize,
    pub output_rows: usize,
}

impl CleaningStats {
    pub fn rows_removed(&self) -> usize {
        self.duplicates_removed + self.missing_employee_removed + self.excluded_employee_removed
    }
}

/// Outcome of the first-run (cleaning) workflow
#[derive(Debug, Clone)]
pub struct FirstRunReport {
    pub source_name: String,
    pub stored_name: String,
    pub stored_location: String,
    pub stats: CleaningStats,
}

/// A table written to the document store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOutput {
    pub name: String,
    pub rows: usize,
}

/// Outcome of the category extraction workflow
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    pub directory_name: String,
    pub planning_name: String,
    pub joined_rows: usize,
    pub stored: Vec<StoredOutput>,
    pub unclassified_rows: usize,
    pub ambiguous: Vec<AmbiguousJoin>,
    pub observed_suffixes: Vec<(String, Option<CategoryLabel>)>,
}
