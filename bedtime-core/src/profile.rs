//! Child profile: the age and gender that pick a narrative style.

use chrono::{Datelike, Local, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    /// "3岁6个月", "3岁", "3y6m", "3 years 6 months", "4 yrs 2 mo".
    static ref AGE_PATTERN: Regex = Regex::new(
        r"^\s*(\d+)\s*(?:岁|years?|yrs?|y)\s*,?\s*(?:(\d+)\s*(?:个月|个|月|months?|mos?|m))?\s*$"
    )
    .expect("age pattern is a valid regex");
}

/// Oldest age accepted at input, in months.
pub const MAX_AGE_MONTHS: u32 = 18 * 12;

/// Errors from profile input.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid age format {0:?}; enter something like \"3岁6个月\" or \"3 years 6 months\"")]
    InvalidAgeFormat(String),
}

/// The persisted child profile.
///
/// `base_months` is the age when the profile was recorded on `start_date`;
/// the current age is derived from the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildProfile {
    pub start_date: NaiveDate,
    pub base_months: u32,
    #[serde(default)]
    pub gender: String,
}

impl ChildProfile {
    pub fn new(base_months: u32, gender: impl Into<String>, start_date: NaiveDate) -> Self {
        Self {
            start_date,
            base_months,
            gender: gender.into(),
        }
    }

    /// Record a profile stamped with today's local date.
    pub fn recorded_today(base_months: u32, gender: impl Into<String>) -> Self {
        Self::new(base_months, gender, Local::now().date_naive())
    }

    /// Age in months on `today`.
    pub fn months_on(&self, today: NaiveDate) -> u32 {
        self.base_months
            .saturating_add(months_elapsed(self.start_date, today))
    }

    /// Age in months today.
    pub fn current_months(&self) -> u32 {
        self.months_on(Local::now().date_naive())
    }
}

/// Whole calendar months from `start` to `today`, ignoring the day of month.
///
/// Never negative: a start date in the future yields zero.
pub fn months_elapsed(start: NaiveDate, today: NaiveDate) -> u32 {
    let months = (today.year() - start.year()) * 12 + today.month() as i32 - start.month() as i32;
    u32::try_from(months).unwrap_or(0)
}

/// Parse an age typed by the user into total months.
///
/// Ages above [`MAX_AGE_MONTHS`] are rejected.
pub fn parse_age_input(input: &str) -> Result<u32, ProfileError> {
    let invalid = || ProfileError::InvalidAgeFormat(input.to_string());
    let captures = AGE_PATTERN.captures(input).ok_or_else(invalid)?;

    let years: u32 = captures[1].parse().map_err(|_| invalid())?;
    let months: u32 = match captures.get(2) {
        Some(m) => m.as_str().parse().map_err(|_| invalid())?,
        None => 0,
    };

    years
        .checked_mul(12)
        .and_then(|y| y.checked_add(months))
        .filter(|total| *total <= MAX_AGE_MONTHS)
        .ok_or_else(invalid)
}
