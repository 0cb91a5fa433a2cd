//! Record cleaning for raw planning exports
//!
//! Derives the `Unique Code` identity key, keeps the first row per key and
//! drops rows that do not belong to a real employee. Each step is a lazy
//! plan over a clone of its input, so the caller's table is never touched.

use polars::prelude::*;
use tracing::{debug, info};

use crate::constants::{EXCLUDED_EMPLOYEE, MISSING_TEXT, planning};
use crate::error::Result;
use crate::models::CleaningStats;
use crate::schema::{column_names, is_wholly_empty, require_columns};

/// Clean a raw planning table
pub fn clean(raw: &DataFrame) -> Result<DataFrame> {
    clean_with_stats(raw).map(|(table, _)| table)
}

/// Clean a raw planning table and account for every removed row
pub fn clean_with_stats(raw: &DataFrame) -> Result<(DataFrame, CleaningStats)> {
    if is_wholly_empty(raw) {
        debug!("Planning table has no columns, nothing to clean");
        return Ok((DataFrame::empty(), CleaningStats::default()));
    }

    require_columns(
        raw,
        "planning",
        &[planning::PROJECT_NUMBER, planning::EMPLOYEE_NAME],
    )?;

    let mut stats = CleaningStats {
        input_rows: raw.height(),
        ..CleaningStats::default()
    };

    let keyed = with_unique_code(raw)?;

    let deduplicated = keyed
        .lazy()
        .filter(col(planning::UNIQUE_CODE).is_first_distinct())
        .collect()?;
    let distinct_rows = deduplicated.height();
    stats.duplicates_removed = stats.input_rows - distinct_rows;

    let named = deduplicated
        .lazy()
        .filter(col(planning::EMPLOYEE_NAME).is_not_null())
        .collect()?;
    stats.missing_employee_removed = distinct_rows - named.height();

    let cleaned = named
        .clone()
        .lazy()
        .filter(
            col(planning::EMPLOYEE_NAME)
                .cast(DataType::String)
                .neq(lit(EXCLUDED_EMPLOYEE)),
        )
        .collect()?;
    stats.excluded_employee_removed = named.height() - cleaned.height();
    stats.output_rows = cleaned.height();

    info!(
        "Cleaned planning table: {} rows in, {} out ({} duplicates, {} without employee, {} excluded)",
        stats.input_rows,
        stats.output_rows,
        stats.duplicates_removed,
        stats.missing_employee_removed,
        stats.excluded_employee_removed
    );

    Ok((cleaned, stats))
}

/// Add `Unique Code` as the first column, replacing any existing one
fn with_unique_code(raw: &DataFrame) -> Result<DataFrame> {
    let key_part = |name: &str| {
        col(name)
            .cast(DataType::String)
            .fill_null(lit(MISSING_TEXT))
    };

    let mut order = vec![col(planning::UNIQUE_CODE)];
    order.extend(
        column_names(raw)
            .iter()
            .filter(|name| name.as_str() != planning::UNIQUE_CODE)
            .map(|name| col(name.as_str())),
    );

    let keyed = raw
        .clone()
        .lazy()
        .with_column(
            concat_str(
                [
                    key_part(planning::PROJECT_NUMBER),
                    key_part(planning::EMPLOYEE_NAME),
                ],
                planning::UNIQUE_CODE_SEPARATOR,
                false,
            )
            .alias(planning::UNIQUE_CODE),
        )
        .select(order)
        .collect()?;

    Ok(keyed)
}
