//! Reconciliation pipeline with modular stages.
//!
//! The pure stages (selector, cleaner, join, categorizer, sequencer) work on
//! in-memory tables only. [`PipelineRunner`] wires them to a
//! [`DocumentStore`] for the two operator workflows: the first run, which
//! cleans and archives the raw planning export, and category extraction,
//! which joins the latest archive to the directory and stores one output per
//! category.

pub mod categorizer;
pub mod cleaner;
pub mod join;
pub mod selector;
pub mod sequencer;

#[cfg(test)]
pub mod tests;

use self::categorizer::SynonymMap;

use crate::config::PipelineConfig;
use crate::constants::{MACRO_WORKBOOK_EXTENSION, SPREADSHEET_EXTENSIONS};
use crate::error::{CpwError, Result};
use crate::models::{CategorizationOutput, ExtractionReport, FirstRunReport, StoredOutput};
use crate::store::DocumentStore;
use crate::workbook::SheetOptions;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use polars::prelude::DataFrame;
use tracing::{debug, info, warn};

/// Clean a raw planning table (first-run stage)
pub fn run_cleaning_pipeline(raw_planning: &DataFrame) -> Result<DataFrame> {
    cleaner::clean(raw_planning)
}

/// Join, categorize and sequence in one pass
pub fn run_categorization_pipeline(
    planning: &DataFrame,
    directory: &DataFrame,
    synonyms: &SynonymMap,
    run_date: NaiveDate,
) -> Result<CategorizationOutput> {
    let joined = join::join(planning, directory)?;
    let categorized = categorizer::categorize(&joined.table, synonyms)?;

    let partitions = sequencer::sequence(&categorized.partitions, run_date)?;
    let unclassified = sequencer::sequence_table(&categorized.unclassified, run_date)?;

    Ok(CategorizationOutput {
        joined: joined.table,
        partitions,
        unclassified,
        ambiguous: joined.ambiguous,
        observed_suffixes: categorized.observed_suffixes,
    })
}

/// Runs the operator workflows against a document store
#[derive(Debug)]
pub struct PipelineRunner<S> {
    store: S,
    config: PipelineConfig,
    synonyms: SynonymMap,
}

impl<S: DocumentStore> PipelineRunner<S> {
    /// Create a runner; the configuration is validated first
    pub fn new(store: S, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let synonyms = SynonymMap::from_rules(&config.categories);
        Ok(Self {
            store,
            config,
            synonyms,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Clean the raw planning export and archive it under the run date
    pub async fn first_run(&self, run_date: NaiveDate) -> Result<FirstRunReport> {
        let folder = &self.config.store.planning_folder;
        let names = self.store.list_available_names(folder).await?;
        let source_name =
            selector::first_with_extension(names.iter().map(String::as_str), SPREADSHEET_EXTENSIONS)
                .ok_or_else(|| CpwError::not_found(folder.as_str(), "no spreadsheet file"))?;

        info!("Cleaning planning export {}", source_name);
        let raw = self.store.fetch_table(folder, &source_name).await?;
        if raw.height() == 0 {
            return Err(CpwError::not_found(
                folder.as_str(),
                format!("'{}' contains no rows", source_name),
            ));
        }

        let (cleaned, stats) = cleaner::clean_with_stats(&raw)?;

        let archive = &self.config.store.archive_folder;
        let stored_name = self.config.planning.file_name(run_date);
        self.store.store_table(archive, &stored_name, &cleaned).await?;
        info!("Archived cleaned planning table as {}", stored_name);

        Ok(FirstRunReport {
            source_name,
            stored_name,
            stored_location: archive.clone(),
            stats,
        })
    }

    /// Join the latest archive to the directory and store each category
    pub async fn extract_categories(&self, run_date: NaiveDate) -> Result<ExtractionReport> {
        let (directory_name, directory) = self.fetch_directory().await?;
        let (planning_name, planning) = self.fetch_latest_planning().await?;

        let output = run_categorization_pipeline(&planning, &directory, &self.synonyms, run_date)?;

        let naming = &self.config.output;
        let mut outputs: Vec<(String, &DataFrame)> = output
            .partitions
            .iter()
            .map(|partition| (naming.file_name(&partition.label), &partition.table))
            .collect();
        if naming.store_unclassified {
            outputs.push((naming.unclassified_file_name(), &output.unclassified));
        }

        let stored = self.store_outputs(&outputs).await?;

        Ok(ExtractionReport {
            directory_name,
            planning_name,
            joined_rows: output.joined.height(),
            stored,
            unclassified_rows: output.unclassified.height(),
            ambiguous: output.ambiguous,
            observed_suffixes: output.observed_suffixes,
        })
    }

    async fn fetch_directory(&self) -> Result<(String, DataFrame)> {
        let settings = &self.config.directory;
        let folder = &self.config.store.directory_folder;

        let extensions: &[&str] = if settings.require_macro_workbook {
            &[MACRO_WORKBOOK_EXTENSION]
        } else {
            SPREADSHEET_EXTENSIONS
        };
        let names = self.store.list_available_names(folder).await?;
        let name = selector::first_with_extension(names.iter().map(String::as_str), extensions)
            .ok_or_else(|| {
                CpwError::not_found(
                    folder.as_str(),
                    format!("no workbook with extension {}", extensions.join("/")),
                )
            })?;

        let options = SheetOptions::sheet(settings.sheet.as_str())
            .with_header_row(settings.header_row)
            .with_first_header_line();
        let raw = self.store.fetch_sheet(folder, &name, &options).await?;
        let directory = join::retain_assigned(&raw, &settings.assigned_column)?;

        debug!("Directory {} has {} assigned rows", name, directory.height());
        Ok((name, directory))
    }

    async fn fetch_latest_planning(&self) -> Result<(String, DataFrame)> {
        let folder = &self.config.store.archive_folder;
        let pattern = self.config.planning.to_regex()?;

        let names = self.store.list_available_names(folder).await?;
        let name = selector::select_latest(names.iter().map(String::as_str), &pattern)
            .ok_or_else(|| {
                CpwError::not_found(
                    folder.as_str(),
                    format!("no file matching {}", pattern.as_str()),
                )
            })?;

        info!("Using archived planning table {}", name);
        let table = self.store.fetch_table(folder, &name).await?;
        Ok((name, table))
    }

    /// Store every output, attempting all of them before reporting failures
    async fn store_outputs(&self, outputs: &[(String, &DataFrame)]) -> Result<Vec<StoredOutput>> {
        let folder = self.config.store.output_folder.as_str();
        let concurrency = self.config.store.max_concurrent_stores.max(1);

        let results: Vec<(String, usize, Result<()>)> = stream::iter(outputs)
            .map(|(name, table)| async move {
                let result = self.store.store_table(folder, name, table).await;
                (name.clone(), table.height(), result)
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut stored = Vec::new();
        let mut failed = Vec::new();
        for (name, rows, result) in results {
            match result {
                Ok(()) => stored.push(StoredOutput { name, rows }),
                Err(e) => {
                    warn!("Failed to store {}: {}", name, e);
                    failed.push(name);
                }
            }
        }

        if failed.is_empty() {
            info!("Stored {} outputs in {}", stored.len(), folder);
            Ok(stored)
        } else {
            Err(CpwError::PartialStore {
                stored: stored.into_iter().map(|s| s.name).collect(),
                failed,
            })
        }
    }
}
