//! Monthly accounting calendar and the business "today".

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;

/// A calendar month identifying one accounting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Creates a year-month. Returns `None` unless `month` is 1..=12 and the
    /// year is representable as a date.
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// The month containing `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Month, 1..=12.
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// Period name, e.g. `2025-11`.
    #[must_use]
    pub fn name(&self) -> String {
        self.to_string()
    }

    /// First day of the month.
    #[must_use]
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Last day of the month.
    #[must_use]
    pub fn end_date(&self) -> NaiveDate {
        last_day_of_month(self.year, self.month)
    }

    /// True if `date` falls inside the month.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::from_date(date) == *self
    }

    /// The following month.
    #[must_use]
    pub const fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The preceding month.
    #[must_use]
    pub const fn prev(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::invalid(format!("invalid period '{s}', expected YYYY-MM"));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

/// Returns the last day of a month.
#[must_use]
pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };

    next_month
        .and_then(|d| d.pred_opt())
        .or_else(|| NaiveDate::from_ymd_opt(year, month, 28))
        .unwrap_or(NaiveDate::MAX)
}

/// Decides what "today" is for the business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessCalendar {
    tz: Tz,
}

impl BusinessCalendar {
    /// Creates a calendar for an IANA timezone name, e.g. `Asia/Jakarta`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown timezone.
    pub fn from_name(name: &str) -> Result<Self, LedgerError> {
        name.parse::<Tz>()
            .map(|tz| Self { tz })
            .map_err(|_| LedgerError::invalid(format!("unknown timezone '{name}'")))
    }

    /// The configured timezone.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.tz
    }

    /// Business date at the given instant.
    #[must_use]
    pub fn date_at(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// Business date now.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.date_at(Utc::now())
    }
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

/// Range of dates for which a posting may provision a missing period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingWindow {
    /// Months back from today.
    pub max_backdate_months: u32,
    /// Days ahead of today.
    pub max_future_days: u32,
}

impl Default for PostingWindow {
    fn default() -> Self {
        Self {
            max_backdate_months: 24,
            max_future_days: 7,
        }
    }
}

impl PostingWindow {
    /// Checks a posting date for which no period exists yet.
    ///
    /// `latest_closed_end` is the end date of the latest CLOSED or LOCKED
    /// period; a new period may never open behind it.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::PostingDateOutOfRange`.
    pub fn check(
        &self,
        date: NaiveDate,
        today: NaiveDate,
        latest_closed_end: Option<NaiveDate>,
    ) -> Result<(), LedgerError> {
        let out_of_range = || LedgerError::PostingDateOutOfRange { date };

        let earliest = today
            .checked_sub_months(Months::new(self.max_backdate_months))
            .unwrap_or(NaiveDate::MIN);
        let latest = today
            .checked_add_days(Days::new(u64::from(self.max_future_days)))
            .unwrap_or(NaiveDate::MAX);

        if date < earliest || date > latest {
            return Err(out_of_range());
        }
        if latest_closed_end.is_some_and(|end| date <= end) {
            return Err(out_of_range());
        }
        Ok(())
    }
}
