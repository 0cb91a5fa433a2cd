//! Document store boundary.
//!
//! The pipeline reads its inputs from, and writes its outputs to, named
//! locations in a document store. [`DocumentStore`] is the contract the
//! orchestration layer depends on; [`LocalFolderStore`] implements it over
//! a directory tree.

pub mod local;

pub use local::LocalFolderStore;

use crate::error::Result;
use crate::workbook::SheetOptions;
use polars::prelude::DataFrame;

/// Listing, fetching and storing named tables at a location
///
/// Implementations report failures as errors: a missing location or file is
/// [`CpwError::NotFound`](crate::error::CpwError::NotFound), an unreadable
/// file is [`CpwError::Format`](crate::error::CpwError::Format) and a failed
/// write is [`CpwError::Store`](crate::error::CpwError::Store). Retries for
/// transient failures belong here, never in the pipeline stages.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    /// Names of the datasets available at a location, sorted
    async fn list_available_names(&self, location: &str) -> Result<Vec<String>>;

    /// Fetch one sheet of a named dataset
    async fn fetch_sheet(
        &self,
        location: &str,
        name: &str,
        options: &SheetOptions,
    ) -> Result<DataFrame>;

    /// Serialize and persist a table under a name
    async fn store_table(&self, location: &str, name: &str, table: &DataFrame) -> Result<()>;

    /// Fetch a named dataset using its first sheet and first row as header
    async fn fetch_table(&self, location: &str, name: &str) -> Result<DataFrame> {
        self.fetch_sheet(location, name, &SheetOptions::default())
            .await
    }
}
