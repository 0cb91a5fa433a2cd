//! Dataset selection by embedded date
//!
//! Snapshot names carry their date (`{prefix}YYYY-MM-DD.{ext}`). The selector
//! picks the most recent one from a listing, ignoring anything that does not
//! match the pattern or whose date does not parse.

use chrono::NaiveDate;
use regex::Regex;
use std::path::Path;
use tracing::{debug, warn};

use crate::constants::output::RUN_DATE_FORMAT;

/// Extract the date captured by the pattern's first group
pub fn parse_snapshot_date(name: &str, pattern: &Regex) -> Option<NaiveDate> {
    let captures = pattern.captures(name)?;
    let text = captures.get(1)?.as_str();
    match NaiveDate::parse_from_str(text, RUN_DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            warn!("Ignoring '{}': '{}' is not a valid date", name, text);
            None
        }
    }
}

/// Name with the latest embedded date, or `None` when nothing matches
///
/// On equal dates the name listed first wins.
pub fn select_latest<'a>(
    names: impl IntoIterator<Item = &'a str>,
    pattern: &Regex,
) -> Option<String> {
    let mut latest: Option<(NaiveDate, &str)> = None;

    for name in names {
        let Some(date) = parse_snapshot_date(name, pattern) else {
            continue;
        };
        match latest {
            Some((best, _)) if date <= best => {}
            _ => latest = Some((date, name)),
        }
    }

    if let Some((date, name)) = latest {
        debug!("Selected {} (dated {})", name, date);
    }
    latest.map(|(_, name)| name.to_string())
}

/// First name (in listing order) whose extension is one of `extensions`
///
/// The comparison ignores case, so `PLAN.XLSX` counts as a workbook.
pub fn first_with_extension<'a>(
    names: impl IntoIterator<Item = &'a str>,
    extensions: &[&str],
) -> Option<String> {
    names
        .into_iter()
        .find(|name| {
            Path::new(name)
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        })
        .map(str::to_string)
}
