//! Due-date and loan arithmetic.
//!
//! Day counts are taken over the exact elapsed time and rounded up, so a
//! payment received one second after its due instant is one day late.
//! Monetary results are rounded to two decimals; simple interest uses an
//! actual/365 day basis.

use crate::{Error, ErrorKind, Result};
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;

const MILLIS_PER_DAY: i64 = 86_400_000;
const DAYS_PER_YEAR: f64 = 365.0;

/// Longest accepted loan term (100 years).
pub const MAX_TERM_MONTHS: u32 = 1200;

/// Whole days from `now` until `expected`, rounded up. Negative once
/// `expected` has passed.
pub fn days_to_expiry(expected: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    ceil_days(expected - now)
}

/// [`days_to_expiry`] measured from the current time.
pub fn days_to_expiry_from_now(expected: DateTime<Utc>) -> i64 {
    days_to_expiry(expected, Utc::now())
}

/// Whole days `received` is after `expected`, rounded up; 0 when on time.
pub fn late_days(received: DateTime<Utc>, expected: DateTime<Utc>) -> i64 {
    ceil_days(received - expected).max(0)
}

/// [`late_days`] over ISO-8601 strings.
///
/// Accepts RFC 3339 date-times (`2024-03-01T12:00:00+03:00`) and plain dates
/// (`2024-03-01`, taken as UTC midnight).
pub fn late_days_iso(received: &str, expected: &str) -> Result<i64> {
    Ok(late_days(parse_instant(received)?, parse_instant(expected)?))
}

/// Parse an RFC 3339 date-time or a `YYYY-MM-DD` date at UTC midnight.
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
        .map_err(|_| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("'{}' is not an ISO-8601 date or date-time", value),
            )
        })
}

fn ceil_days(elapsed: Duration) -> i64 {
    let millis = elapsed.num_milliseconds();
    let days = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) == 0 {
        days
    } else {
        days + 1
    }
}

/// Simple interest on `principal` over `days`, actual/365.
pub fn accrued_interest(principal: f64, annual_rate_percent: f64, days: i64) -> Result<f64> {
    validate_loan(principal, annual_rate_percent)?;
    if days < 0 {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("day count must not be negative, got {}", days),
        ));
    }
    Ok(round_cents(
        principal * annual_rate_percent / 100.0 * days as f64 / DAYS_PER_YEAR,
    ))
}

/// Interest accrued over the days `received` is late.
pub fn late_interest(
    principal: f64,
    annual_rate_percent: f64,
    received: DateTime<Utc>,
    expected: DateTime<Utc>,
) -> Result<f64> {
    accrued_interest(principal, annual_rate_percent, late_days(received, expected))
}

/// Level monthly payment that repays `principal` over `months`.
pub fn monthly_payment(principal: f64, annual_rate_percent: f64, months: u32) -> Result<f64> {
    validate_loan(principal, annual_rate_percent)?;
    validate_term(months)?;
    Ok(round_cents(raw_payment(principal, monthly_rate(annual_rate_percent), months)))
}

fn raw_payment(principal: f64, rate: f64, months: u32) -> f64 {
    if rate == 0.0 {
        principal / f64::from(months)
    } else {
        principal * rate / (1.0 - (1.0 + rate).powf(-f64::from(months)))
    }
}

/// One row of an amortization schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Installment {
    /// 1-based installment number.
    pub number: u32,
    pub due_date: NaiveDate,
    pub payment: f64,
    pub principal: f64,
    pub interest: f64,
    /// Outstanding balance after this installment.
    pub balance: f64,
}

/// Monthly amortization of `principal` starting at `first_due`.
///
/// Due dates advance one calendar month at a time, clamped to the last day
/// of shorter months (Jan 31 -> Feb 28/29 -> Mar 31). Every payment but the
/// last is the rounded level payment; the last one clears the remaining
/// balance exactly.
///
/// # Errors
///
/// [`Error::InvalidInput`] for a non-positive principal, a negative rate, or a
/// term outside `1..=MAX_TERM_MONTHS`.
pub fn amortization_schedule(
    principal: f64,
    annual_rate_percent: f64,
    months: u32,
    first_due: NaiveDate,
) -> Result<Vec<Installment>> {
    validate_loan(principal, annual_rate_percent)?;
    validate_term(months)?;

    let rate = monthly_rate(annual_rate_percent);
    let level = round_cents(raw_payment(principal, rate, months));

    let mut balance = round_cents(principal);
    let mut rows = Vec::with_capacity(months as usize);
    for number in 1..=months {
        let due_date = first_due
            .checked_add_months(Months::new(number - 1))
            .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "due date out of range"))?;

        let interest = round_cents(balance * rate);
        let principal_part = if number == months {
            balance
        } else {
            round_cents(level - interest).min(balance)
        };
        balance = round_cents(balance - principal_part);

        rows.push(Installment {
            number,
            due_date,
            payment: round_cents(principal_part + interest),
            principal: principal_part,
            interest,
            balance,
        });
    }
    Ok(rows)
}

fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 12.0 / 100.0
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn validate_loan(principal: f64, annual_rate_percent: f64) -> Result<()> {
    if !principal.is_finite() || principal <= 0.0 {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("principal must be a positive amount, got {}", principal),
        ));
    }
    if !annual_rate_percent.is_finite() || annual_rate_percent < 0.0 {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("interest rate must not be negative, got {}", annual_rate_percent),
        ));
    }
    Ok(())
}

fn validate_term(months: u32) -> Result<()> {
    if months == 0 {
        return Err(Error::new(ErrorKind::InvalidInput, "term must be at least one month"));
    }
    if months > MAX_TERM_MONTHS {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("term must not exceed {} months, got {}", MAX_TERM_MONTHS, months),
        ));
    }
    Ok(())
}
