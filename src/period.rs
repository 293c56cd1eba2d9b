// 📅 Rent Period Calculator
//
// A payment covers a contiguous, inclusive run of months:
//   Jan → Jan = 1 month, Jan → Mar = 3 months.
// The rent owed is months × the tenant's monthly rate at the time of payment.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

// ============================================================================
// RENT PERIOD
// ============================================================================

/// Result of a rent calculation: how many months and how much money
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RentPeriod {
    pub total_months: i64,
    pub total_rent: f64,
}

/// What to do when the end month precedes the start month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    /// Store whatever the formula yields (zero or negative months)
    #[serde(alias = "passthrough")]
    PassThrough,

    /// Refuse the range with `InvalidDateRange`
    #[default]
    Reject,

    /// Treat the range as empty: 0 months, 0 rent
    Clamp,
}

impl RangePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangePolicy::PassThrough => "pass_through",
            RangePolicy::Reject => "reject",
            RangePolicy::Clamp => "clamp",
        }
    }
}

/// Whole months between the months of `start` and `end` (days are ignored)
pub fn month_diff(start: NaiveDate, end: NaiveDate) -> i64 {
    (end.year() as i64 - start.year() as i64) * 12 + (end.month() as i64 - start.month() as i64)
}

/// Inclusive month count and total rent for a range.
///
/// Pure and unchecked: a reversed range gives zero or negative months.
/// Use [`compute_with_policy`] when the range comes from user input.
pub fn compute(start: NaiveDate, end: NaiveDate, monthly_rent: f64) -> RentPeriod {
    let total_months = month_diff(start, end) + 1;

    RentPeriod {
        total_months,
        total_rent: total_months as f64 * monthly_rent,
    }
}

/// [`compute`] guarded by a [`RangePolicy`]
pub fn compute_with_policy(
    start: NaiveDate,
    end: NaiveDate,
    monthly_rent: f64,
    policy: RangePolicy,
) -> Result<RentPeriod> {
    let period = compute(start, end, monthly_rent);

    if period.total_months >= 1 {
        return Ok(period);
    }

    match policy {
        RangePolicy::PassThrough => Ok(period),
        RangePolicy::Reject => Err(LedgerError::InvalidDateRange {
            start: format_month(start),
            end: format_month(end),
        }),
        RangePolicy::Clamp => Ok(RentPeriod {
            total_months: 0,
            total_rent: 0.0,
        }),
    }
}

// ============================================================================
// DATE PARSING
// ============================================================================

/// Parse a month field: `YYYY-MM` (month pickers), `YYYY-MM-DD` or RFC 3339.
///
/// `YYYY-MM` resolves to the first day of that month.
pub fn parse_month(input: &str) -> Result<NaiveDate> {
    let s = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
        return Ok(date);
    }

    // The calendar date as written, in the caller's own offset
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }

    Err(LedgerError::InvalidDate(input.to_string()))
}

/// Parse a collection date: RFC 3339, or `YYYY-MM-DD` taken as midnight UTC
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    let s = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    Err(LedgerError::InvalidDate(input.to_string()))
}

/// `YYYY-MM`
pub fn format_month(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

// ============================================================================
// TESTS
// ============================================================================
