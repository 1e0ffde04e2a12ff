mod billing_tags;

pub use billing_tags::*;
use chrono::NaiveDate;

/// Inclusive calendar date range (UTC) for report queries.
///
/// A range whose end precedes its start is valid and matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}
