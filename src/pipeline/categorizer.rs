//! Suffix-based categorization of joined rows
//!
//! The category of a row is read from its `Expenditure Organization Name`:
//! the part before the first `:`, trimmed, and then its last space-separated
//! token. Tokens are compared to each category's synonyms after trimming and
//! upper-casing, in category priority order; the first match wins.

use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::CategoryRule;
use crate::constants::{JOINED_COLUMNS, ORGANIZATION_SEPARATOR, planning};
use crate::error::Result;
use crate::models::{CategorizeOutcome, CategoryLabel, Partition};
use crate::schema::{empty_text_frame, is_wholly_empty, require_columns, text_values};

/// Category labels with their normalized synonyms, in priority order
#[derive(Debug, Clone, Default)]
pub struct SynonymMap {
    entries: Vec<(CategoryLabel, HashSet<String>)>,
}

impl SynonymMap {
    pub fn from_rules(rules: &[CategoryRule]) -> Self {
        let entries = rules
            .iter()
            .map(|rule| {
                let synonyms = rule
                    .synonyms
                    .iter()
                    .map(|s| normalize(s))
                    .filter(|s| !s.is_empty())
                    .collect();
                (rule.label.clone(), synonyms)
            })
            .collect();
        Self { entries }
    }

    /// Labels in priority order
    pub fn labels(&self) -> impl Iterator<Item = &CategoryLabel> {
        self.entries.iter().map(|(label, _)| label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the first category accepting the candidate
    fn position(&self, candidate: &str) -> Option<usize> {
        let key = normalize(candidate);
        if key.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .position(|(_, synonyms)| synonyms.contains(&key))
    }

    /// First category accepting the candidate
    pub fn resolve(&self, candidate: &str) -> Option<&CategoryLabel> {
        self.position(candidate).map(|idx| &self.entries[idx].0)
    }
}

/// Comparison form of a suffix or synonym
pub fn normalize(text: &str) -> String {
    text.trim().to_uppercase()
}

/// Suffix candidate of an organisation name
pub fn raw_suffix(organization: &str) -> &str {
    let label = organization
        .split_once(ORGANIZATION_SEPARATOR)
        .map_or(organization, |(left, _)| left)
        .trim();
    label.rsplit_once(' ').map_or(label, |(_, last)| last)
}

/// Split joined rows into one partition per category
pub fn categorize(joined: &DataFrame, synonyms: &SynonymMap) -> Result<CategorizeOutcome> {
    if is_wholly_empty(joined) {
        debug!("Joined table has no columns, every partition is empty");
        let empty = empty_text_frame(JOINED_COLUMNS)?;
        return Ok(CategorizeOutcome {
            partitions: synonyms
                .labels()
                .map(|label| Partition::new(label.clone(), empty.clone()))
                .collect(),
            unclassified: empty,
            observed_suffixes: Vec::new(),
        });
    }
    require_columns(joined, "joined", &[planning::EXPENDITURE_ORGANIZATION])?;

    let organizations = text_values(joined, planning::EXPENDITURE_ORGANIZATION)?;
    let mut observed: Vec<(String, Option<CategoryLabel>)> = Vec::new();
    let mut seen = HashSet::new();

    let assignments: Vec<Option<usize>> = organizations
        .iter()
        .map(|organization| {
            let suffix = raw_suffix(organization.as_deref()?);
            let position = synonyms.position(suffix);
            if !suffix.is_empty() && seen.insert(suffix.to_string()) {
                observed.push((suffix.to_string(), synonyms.resolve(suffix).cloned()));
            }
            position
        })
        .collect();

    let mut partitions = Vec::with_capacity(synonyms.len());
    for (idx, label) in synonyms.labels().enumerate() {
        let table = joined.filter(&row_mask(&assignments, |a| a == Some(idx)))?;
        debug!("Category {} holds {} rows", label, table.height());
        partitions.push(Partition::new(label.clone(), table));
    }

    let unclassified = joined.filter(&row_mask(&assignments, |a| a.is_none()))?;
    if unclassified.height() > 0 {
        let unmatched: Vec<&str> = observed
            .iter()
            .filter(|(_, label)| label.is_none())
            .map(|(suffix, _)| suffix.as_str())
            .collect();
        warn!(
            "{} rows matched no category (suffixes: {})",
            unclassified.height(),
            unmatched.join(", ")
        );
    }

    info!(
        "Categorized {} rows into {} categories, {} unclassified",
        joined.height() - unclassified.height(),
        partitions.len(),
        unclassified.height()
    );

    Ok(CategorizeOutcome {
        partitions,
        unclassified,
        observed_suffixes: observed,
    })
}

fn row_mask(assignments: &[Option<usize>], keep: impl Fn(Option<usize>) -> bool) -> BooleanChunked {
    let values: Vec<bool> = assignments.iter().map(|a| keep(*a)).collect();
    BooleanChunked::from_slice(PlSmallStr::from_static("mask"), &values)
}
