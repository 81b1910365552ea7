//! Per-day activity heatmap
//!
//! Accepted submissions and concept reads are bucketed by UTC calendar day.
//! The database does the grouping; this module resolves the requested range
//! and fills in the empty days.

use crate::error::{CoreError, Result};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

/// Days covered when no `start_date` is given.
pub const DEFAULT_WINDOW_DAYS: u64 = 365;

/// Parse a `YYYY-MM-DD` query value, falling back to `default` when the value
/// is missing or malformed.
pub fn parse_date_param(raw: Option<&str>, default: NaiveDate) -> NaiveDate {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or(default)
}

/// Parse a required `YYYY-MM-DD` value.
pub fn parse_required_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| CoreError::InvalidDate)
}

/// Inclusive day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Resolve `start_date` / `end_date` query values against `today`.
    pub fn resolve(start: Option<&str>, end: Option<&str>, today: NaiveDate) -> Result<Self> {
        let default_start = today
            .checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS))
            .unwrap_or(today);
        let start = parse_date_param(start, default_start);
        let end = parse_date_param(end, today);
        if start > end {
            return Err(CoreError::InvalidDateRange);
        }
        Ok(Self { start, end })
    }

    /// First day after the range, used as an exclusive query bound.
    pub fn end_exclusive(&self) -> NaiveDate {
        self.end.succ_opt().unwrap_or(self.end)
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapDay {
    pub date: NaiveDate,
    pub submissions_count: i64,
    pub concepts_read_count: i64,
}

/// One entry per day of `range`, in order, with zero counts for quiet days.
pub fn build_heatmap(
    range: &DateRange,
    submissions: &HashMap<NaiveDate, i64>,
    reads: &HashMap<NaiveDate, i64>,
) -> Vec<HeatmapDay> {
    range
        .days()
        .map(|date| HeatmapDay {
            date,
            submissions_count: submissions.get(&date).copied().unwrap_or(0),
            concepts_read_count: reads.get(&date).copied().unwrap_or(0),
        })
        .collect()
}
