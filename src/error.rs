//! Error handling for reconciliation operations.
//!
//! Provides the error taxonomy shared by the pipeline stages and the
//! document store boundary: missing columns, missing datasets, unreadable
//! files, failed stores and invalid configuration.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CpwError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Table '{table}' is missing required columns: {}", missing.join(", "))]
    Schema { table: String, missing: Vec<String> },

    #[error("No data found in '{location}': {criterion}")]
    NotFound { location: String, criterion: String },

    #[error("Could not read or write '{name}' as a table: {reason}")]
    Format { name: String, reason: String },

    #[error("Failed to store '{name}' in '{location}': {reason}")]
    Store {
        location: String,
        name: String,
        reason: String,
    },

    #[error(
        "Stored {} of {} outputs; failed: {}",
        stored.len(),
        stored.len() + failed.len(),
        failed.join(", ")
    )]
    PartialStore {
        stored: Vec<String>,
        failed: Vec<String>,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl CpwError {
    /// Create a schema error for a table missing the given columns
    pub fn schema(table: impl Into<String>, missing: Vec<String>) -> Self {
        Self::Schema {
            table: table.into(),
            missing,
        }
    }

    /// Create a "no data" error
    pub fn not_found(location: impl Into<String>, criterion: impl Into<String>) -> Self {
        Self::NotFound {
            location: location.into(),
            criterion: criterion.into(),
        }
    }

    /// Create a format error for a named dataset
    pub fn format(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True when the error means "nothing to process" rather than a failure
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, CpwError>;
