//! Column-level checks and text coercion shared by the pipeline stages.
//!
//! Source spreadsheets have uncontrolled column sets, so each stage states
//! the columns it needs up front and fails with a schema error listing
//! every missing one instead of failing on the first lookup.

use crate::error::{CpwError, Result};
use polars::prelude::*;

/// Fail with a schema error unless every named column is present
pub fn require_columns(df: &DataFrame, table: &str, columns: &[&str]) -> Result<()> {
    let missing: Vec<String> = columns
        .iter()
        .filter(|name| df.get_column_index(name).is_none())
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CpwError::schema(table, missing))
    }
}

/// A table with no columns at all (as opposed to one with columns but no rows)
pub fn is_wholly_empty(df: &DataFrame) -> bool {
    df.width() == 0
}

/// Column names in table order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Values of a column rendered as text, nulls preserved
pub fn text_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(column)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect();
    Ok(values)
}

/// Zero-row table with the given text columns
pub fn empty_text_frame(columns: &[&str]) -> Result<DataFrame> {
    let columns = columns
        .iter()
        .map(|name| Column::new_empty(PlSmallStr::from(*name), &DataType::String))
        .collect();
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_columns_reports_all_missing() {
        let df = df!("Project Number" => &[1i64, 2]).unwrap();
        let result = require_columns(&df, "planning", &["Project Number", "Employee Name", "Resource"]);

        match result {
            Err(CpwError::Schema { table, missing }) => {
                assert_eq!(table, "planning");
                assert_eq!(missing, vec!["Employee Name", "Resource"]);
            }
            other => panic!("Expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_require_columns_accepts_present_columns() {
        let df = df!("A" => &["x"], "B" => &["y"]).unwrap();
        assert!(require_columns(&df, "t", &["B", "A"]).is_ok());
    }

    #[test]
    fn test_text_values_renders_numbers_and_keeps_nulls() {
        let df = df!("n" => &[Some(12i64), None, Some(7)]).unwrap();
        let values = text_values(&df, "n").unwrap();
        assert_eq!(
            values,
            vec![Some("12".to_string()), None, Some("7".to_string())]
        );
    }

    #[test]
    fn test_empty_text_frame_has_schema_and_no_rows() {
        let df = empty_text_frame(&["A", "B"]).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(column_names(&df), vec!["A", "B"]);
        assert!(!is_wholly_empty(&df));
        assert!(is_wholly_empty(&DataFrame::empty()));
    }
}
