//! Run-date stamping and per-partition numbering
//!
//! Prepends `Oracle Date` and a 1-based `Index` to each partition before it
//! leaves the pipeline.

use chrono::NaiveDate;
use polars::prelude::*;

use crate::constants::output::{INDEX, ORACLE_DATE, RUN_DATE_FORMAT};
use crate::error::Result;
use crate::models::Partition;

/// Stamp every partition with the run date and a row sequence
pub fn sequence(partitions: &[Partition], run_date: NaiveDate) -> Result<Vec<Partition>> {
    partitions
        .iter()
        .map(|partition| {
            Ok(Partition::new(
                partition.label.clone(),
                sequence_table(&partition.table, run_date)?,
            ))
        })
        .collect()
}

/// Copy of `table` with `Oracle Date` and `Index` as its first two columns
///
/// Existing columns with those names are replaced.
pub fn sequence_table(table: &DataFrame, run_date: NaiveDate) -> Result<DataFrame> {
    let rows = table.height();
    let date_text = run_date.format(RUN_DATE_FORMAT).to_string();

    let mut sequenced = table.clone();
    for name in [ORACLE_DATE, INDEX] {
        if sequenced.get_column_index(name).is_some() {
            sequenced = sequenced.drop(name)?;
        }
    }

    let dates = Column::new(PlSmallStr::from(ORACLE_DATE), vec![date_text; rows]);
    let index = Column::new(PlSmallStr::from(INDEX), (1..=rows as i64).collect::<Vec<_>>());
    sequenced.insert_column(0, dates)?;
    sequenced.insert_column(1, index)?;

    Ok(sequenced)
}
