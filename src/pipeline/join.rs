//! Left join of cleaned planning records onto the directory
//!
//! Every planning row survives exactly once. The directory is reduced to its
//! first row per `Name` before joining, so duplicate names cannot multiply
//! planning rows; the keys that were affected are reported back.

use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::constants::{JOINED_COLUMNS, directory, planning};
use crate::error::Result;
use crate::models::{AmbiguousJoin, JoinOutcome};
use crate::schema::{empty_text_frame, is_wholly_empty, require_columns, text_values};

const ROW_ORDER: &str = "__row_order";

const PLANNING_FIELDS: &[&str] = &[
    planning::UNIQUE_CODE,
    planning::PROJECT_NUMBER,
    planning::PROJECT_NAME,
    planning::RESOURCE,
    planning::EXPENDITURE_ORGANIZATION,
];

const DIRECTORY_FIELDS: &[&str] = &[
    directory::NAME,
    directory::PERSON_NUMBER,
    directory::FILE_NAME,
    directory::DEPARTMENT_MANAGER,
];

/// Join planning rows to directory rows on `Resource == Name`
pub fn join(planning_table: &DataFrame, directory_table: &DataFrame) -> Result<JoinOutcome> {
    if is_wholly_empty(planning_table) {
        debug!("Planning table has no columns, join yields an empty table");
        return Ok(JoinOutcome {
            table: empty_text_frame(JOINED_COLUMNS)?,
            ambiguous: Vec::new(),
        });
    }
    require_columns(planning_table, "planning", PLANNING_FIELDS)?;

    let directory_table = if is_wholly_empty(directory_table) {
        debug!("Directory table has no columns, treating it as having no rows");
        empty_text_frame(DIRECTORY_FIELDS)?
    } else {
        require_columns(directory_table, "directory", DIRECTORY_FIELDS)?;
        directory_table.clone()
    };

    let ambiguous = find_ambiguous_keys(planning_table, &directory_table)?;
    for entry in &ambiguous {
        warn!(
            "Directory has {} rows named '{}', using the first",
            entry.matches, entry.key
        );
    }

    let left = planning_table
        .clone()
        .lazy()
        .select(
            PLANNING_FIELDS
                .iter()
                .map(|name| {
                    if *name == planning::RESOURCE {
                        col(*name).cast(DataType::String)
                    } else {
                        col(*name)
                    }
                })
                .collect::<Vec<_>>(),
        )
        .with_row_index(ROW_ORDER, None);

    let right = directory_table
        .lazy()
        .select(
            DIRECTORY_FIELDS
                .iter()
                .map(|name| {
                    if *name == directory::NAME {
                        col(*name).cast(DataType::String)
                    } else {
                        col(*name)
                    }
                })
                .collect::<Vec<_>>(),
        )
        .filter(col(directory::NAME).is_first_distinct());

    let joined = left
        .join(
            right,
            [col(planning::RESOURCE)],
            [col(directory::NAME)],
            JoinArgs::new(JoinType::Left),
        )
        .sort_by_exprs([col(ROW_ORDER)], SortMultipleOptions::default())
        .select(JOINED_COLUMNS.iter().map(|name| col(*name)).collect::<Vec<_>>())
        .collect()?;

    info!(
        "Joined {} planning rows to the directory ({} ambiguous names)",
        joined.height(),
        ambiguous.len()
    );

    Ok(JoinOutcome {
        table: joined,
        ambiguous,
    })
}

/// Directory names appearing more than once, limited to names the planning
/// table actually references, in order of first reference
fn find_ambiguous_keys(
    planning_table: &DataFrame,
    directory_table: &DataFrame,
) -> Result<Vec<AmbiguousJoin>> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for name in text_values(directory_table, directory::NAME)?.into_iter().flatten() {
        *counts.entry(name).or_default() += 1;
    }

    let mut reported = HashSet::new();
    let mut ambiguous = Vec::new();
    for key in text_values(planning_table, planning::RESOURCE)?.into_iter().flatten() {
        match counts.get(&key) {
            Some(&matches) if matches > 1 && reported.insert(key.clone()) => {
                ambiguous.push(AmbiguousJoin { key, matches });
            }
            _ => {}
        }
    }

    Ok(ambiguous)
}

/// Keep only directory rows that have a value in `column`
///
/// The directory sheet lists vacant positions too; those rows carry no
/// person number and must not take part in the join.
pub fn retain_assigned(directory_table: &DataFrame, column: &str) -> Result<DataFrame> {
    if is_wholly_empty(directory_table) {
        return Ok(directory_table.clone());
    }
    require_columns(directory_table, "directory", &[column])?;

    let assigned = directory_table
        .clone()
        .lazy()
        .filter(col(column).is_not_null())
        .collect()?;

    debug!(
        "Kept {} of {} directory rows with '{}' set",
        assigned.height(),
        directory_table.height(),
        column
    );
    Ok(assigned)
}
