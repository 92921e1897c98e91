//! Payroll month model.
//!
//! This module contains the [`PayrollMonth`] type that identifies the calendar
//! month a payroll, repayment installment or bonus belongs to.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{PayrollError, PayrollResult};

/// A calendar month, serialized as `YYYY-MM`.
///
/// Internally the month is held as its first day, so ordering and date
/// arithmetic follow chrono.
///
/// # Example
///
/// ```
/// use payroll_engine::models::PayrollMonth;
/// use chrono::NaiveDate;
///
/// let month: PayrollMonth = "2026-02".parse().unwrap();
///
/// assert_eq!(month.days_in_month(), 28);
/// assert!(month.contains(NaiveDate::from_ymd_opt(2026, 2, 14).unwrap()));
/// assert!(!month.contains(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PayrollMonth(NaiveDate);

impl PayrollMonth {
    /// Creates a month from a year and a 1-based month number.
    pub fn new(year: i32, month: u32) -> PayrollResult<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or_else(|| PayrollError::CalculationError {
                message: format!("Invalid payroll month {}-{:02}", year, month),
            })
    }

    /// Returns the month containing the given date.
    pub fn of(date: NaiveDate) -> Self {
        // Day 1 always exists for a month that already holds `date`.
        Self(date.with_day(1).unwrap_or(date))
    }

    /// The calendar year.
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// The 1-based month number.
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// The first day of the month.
    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    /// The last day of the month.
    pub fn last_day(&self) -> NaiveDate {
        self.0
            .with_day(self.days_in_month())
            .unwrap_or(self.0)
    }

    /// The number of calendar days in the month.
    pub fn days_in_month(&self) -> u32 {
        match self.month() {
            4 | 6 | 9 | 11 => 30,
            2 if self.0.leap_year() => 29,
            2 => 28,
            _ => 31,
        }
    }

    /// Checks if a given date falls inside this month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }

    /// Returns the month `count` months later, if representable.
    pub fn add_months(&self, count: u32) -> Option<Self> {
        self.0.checked_add_months(Months::new(count)).map(Self)
    }

    /// Returns the following month, if representable.
    pub fn next(&self) -> Option<Self> {
        self.add_months(1)
    }
}

impl fmt::Display for PayrollMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for PayrollMonth {
    type Err = PayrollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PayrollError::CalculationError {
            message: format!("Invalid payroll month '{}', expected YYYY-MM", s),
        };

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;

        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for PayrollMonth {
    type Error = PayrollError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PayrollMonth> for String {
    fn from(value: PayrollMonth) -> Self {
        value.to_string()
    }
}
