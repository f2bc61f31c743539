//! Date utilities for statement text and range queries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Parse a statement date like `7/19/2024` or `07/19/2024`.
///
/// Month and day may be one or two digits; the year must be four. Dates that
/// do not exist on the calendar (e.g. `2/30/2024`) yield `None`.
pub fn parse_statement_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let mut parts = raw.split('/');
    let (m, d, y) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || y.len() != 4 {
        return None;
    }
    if !(1..=2).contains(&m.len()) || !(1..=2).contains(&d.len()) {
        return None;
    }
    let m: u32 = m.parse().ok()?;
    let d: u32 = d.parse().ok()?;
    let y: i32 = y.parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

/// Inclusive date range. A range whose start is after its end contains nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A single calendar day.
    pub fn day(date: NaiveDate) -> Self {
        Self::new(date, date)
    }
}
