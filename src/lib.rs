//! CPW Reconciler Library
//!
//! Reconciles periodic workforce planning exports against the organisational
//! workbook structure and partitions the result into one table per business
//! category.
//!
//! This library provides tools for:
//! - Selecting the latest date-stamped planning snapshot
//! - Cleaning and deduplicating planning records on a composite key
//! - Left-joining planning records to the directory by resource name
//! - Categorizing rows by synonym-aware organisation suffixes
//! - Stamping each category output with the run date and a row index
//! - Reading and writing workbooks through a pluggable document store

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod store;
pub mod workbook;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{CategoryRule, PipelineConfig};
pub use error::{CpwError, Result};
pub use models::{CategoryLabel, ExtractionReport, FirstRunReport, Partition};
pub use pipeline::categorizer::SynonymMap;
pub use pipeline::{PipelineRunner, run_categorization_pipeline, run_cleaning_pipeline};
pub use store::{DocumentStore, LocalFolderStore};
