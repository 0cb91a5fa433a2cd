//! Stage-level and orchestration tests for the pipeline module
//!
//! Uses an in-memory document store so the runner can be exercised without
//! touching the filesystem, including stores that fail on purpose.


use crate::error::{CpwError, Result};
use crate::store::DocumentStore;
use crate::workbook::SheetOptions;
use polars::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// Document store keeping tables in memory, keyed by (location, name)
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<(String, String), DataFrame>>,
    failing: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `store_table` fail for the given dataset name
    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn insert(&self, location: &str, name: &str, table: DataFrame) {
        self.tables
            .lock()
            .unwrap()
            .insert((location.to_string(), name.to_string()), table);
    }

    pub fn get(&self, location: &str, name: &str) -> Option<DataFrame> {
        self.tables
            .lock()
            .unwrap()
            .get(&(location.to_string(), name.to_string()))
            .cloned()
    }
}

impl DocumentStore for MemoryStore {
    async fn list_available_names(&self, location: &str) -> Result<Vec<String>> {
        let tables = self.tables.lock().unwrap();
        let names: Vec<String> = tables
            .keys()
            .filter(|(loc, _)| loc == location)
            .map(|(_, name)| name.clone())
            .collect();
        if names.is_empty() {
            return Err(CpwError::not_found(location, "location does not exist"));
        }
        Ok(names)
    }

    async fn fetch_sheet(
        &self,
        location: &str,
        name: &str,
        _options: &SheetOptions,
    ) -> Result<DataFrame> {
        self.get(location, name)
            .ok_or_else(|| CpwError::not_found(location, format!("'{}' is missing", name)))
    }

    async fn store_table(&self, location: &str, name: &str, table: &DataFrame) -> Result<()> {
        if self.failing.contains(name) {
            return Err(CpwError::Store {
                location: location.to_string(),
                name: name.to_string(),
                reason: "simulated outage".to_string(),
            });
        }
        self.insert(location, name, table.clone());
        Ok(())
    }
}

/// Text values of a column, panicking on errors
pub fn texts(df: &DataFrame, column: &str) -> Vec<Option<String>> {
    crate::schema::text_values(df, column).unwrap()
}

/// Raw planning export with duplicates, a missing employee and the
/// conversion line
pub fn raw_planning() -> DataFrame {
    df!(
        "Project Number" => &[100i64, 100, 200, 300, 400, 500],
        "Project Name" => &["Bridge", "Bridge", "Tunnel", "Depot", "Yard", "Port"],
        "Employee Name" => &[
            Some("Lee, Sam"),
            Some("Lee, Sam"),
            None,
            Some("Labor Cost, Conversion Employee"),
            Some("Diaz, Ana"),
            Some("Okafor, Tim"),
        ],
        "Resource" => &["Lee, Sam", "Lee, Sam", "Vacant", "Conversion", "Diaz, Ana", "Okafor, Tim"],
        "Expenditure Organization Name" => &[
            "North Mobility: Highways",
            "North Mobility: Highways",
            "South PLA: Towns",
            "Central EF",
            "West Places: Parks",
            "Finance: Treasury",
        ],
        "Task" => &["1.1", "1.2", "2.1", "3.1", "4.1", "5.1"]
    )
    .unwrap()
}

/// Directory sheet as read from the workbook structure file
pub fn directory_sheet() -> DataFrame {
    df!(
        "Name" => &["Lee, Sam", "Diaz, Ana", "Okafor, Tim", "Vacant Post"],
        "Person Number" => &[Some(501i64), Some(502), Some(503), None],
        "File Name" => &["Lee.xlsx", "Diaz.xlsx", "Okafor.xlsx", "none"],
        "Department Name" => &["Roads", "Parks", "Finance", "Roads"],
        "Department Manager" => &["Kim", "Ode", "Ray", "Kim"]
    )
    .unwrap()
}
