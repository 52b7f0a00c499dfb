//! Calendar periods: months and settlement quarters.
//!
//! Both serialize as `"YYYY-MM"`. A [`Quarter`] is identified by its first
//! month, which is always January, April, July or October.

use core::fmt;
use core::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use depotscore_core::DomainError;

const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// Months that open a quarter (and therefore close the previous one).
pub const QUARTER_START_MONTHS: [u32; 4] = [1, 4, 7, 10];

/// A calendar month of a specific year.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, DomainError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(DomainError::validation(format!(
                "year {year} outside {MIN_YEAR}..={MAX_YEAR}"
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation(format!("month {month} outside 1..=12")));
        }
        Ok(Self { year, month })
    }

    /// Month containing `date`.
    ///
    /// The year is not range-checked here; invoice intake validates its dates
    /// with [`YearMonth::new`] before deriving a month from them.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        ymd(self.year, self.month, 1)
    }

    pub fn last_day(&self) -> NaiveDate {
        let days = match self.month {
            4 | 6 | 9 | 11 => 30,
            2 if is_leap_year(self.year) => 29,
            2 => 28,
            _ => 31,
        };
        ymd(self.year, self.month, days)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::of(date) == *self
    }

    /// Shift by `delta` months; `None` when the result leaves the supported years.
    pub fn plus_months(&self, delta: i32) -> Option<Self> {
        let index = self.year * 12 + (self.month as i32 - 1) + delta;
        let year = index.div_euclid(12);
        let month = index.rem_euclid(12) as u32 + 1;
        Self::new(year, month).ok()
    }

    /// Quarter this month belongs to.
    pub fn quarter(&self) -> Quarter {
        let start_month = (self.month - 1) / 3 * 3 + 1;
        Quarter {
            start: Self {
                year: self.year,
                month: start_month,
            },
        }
    }

    /// Whether this month opens a quarter.
    pub fn is_quarter_start(&self) -> bool {
        QUARTER_START_MONTHS.contains(&self.month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| DomainError::validation(format!("expected YYYY-MM, got {s:?}")))?;
        let year = year
            .parse::<i32>()
            .map_err(|e| DomainError::validation(format!("year in {s:?}: {e}")))?;
        let month = month
            .parse::<u32>()
            .map_err(|e| DomainError::validation(format!("month in {s:?}: {e}")))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// A 3-calendar-month settlement window starting in month 1, 4, 7 or 10.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quarter {
    start: YearMonth,
}

impl Quarter {
    /// Quarter starting at `start_month` of `year`; the month must open a quarter.
    pub fn new(year: i32, start_month: u32) -> Result<Self, DomainError> {
        let start = YearMonth::new(year, start_month)?;
        if !start.is_quarter_start() {
            return Err(DomainError::validation(format!(
                "quarter must start in month 1, 4, 7 or 10, got {start_month}"
            )));
        }
        Ok(Self { start })
    }

    /// Quarter containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        YearMonth::of(date).quarter()
    }

    pub fn start(&self) -> YearMonth {
        self.start
    }

    pub fn year(&self) -> i32 {
        self.start.year()
    }

    pub fn start_month(&self) -> u32 {
        self.start.month()
    }

    /// The three months of the quarter, in calendar order.
    pub fn months(&self) -> [YearMonth; 3] {
        let first = self.start;
        let second = YearMonth {
            year: first.year,
            month: first.month + 1,
        };
        let third = YearMonth {
            year: first.year,
            month: first.month + 2,
        };
        [first, second, third]
    }

    pub fn first_day(&self) -> NaiveDate {
        self.start.first_day()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.months()[2].last_day()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Self::containing(date) == *self
    }

    /// The immediately preceding quarter (three months earlier).
    pub fn previous(&self) -> Option<Self> {
        self.start.plus_months(-3).map(|start| Self { start })
    }

    pub fn next(&self) -> Option<Self> {
        self.start.plus_months(3).map(|start| Self { start })
    }

    /// Quarter closed by the first invoice recorded in `month`.
    ///
    /// Only quarter-opening months close anything: April closes January,
    /// July closes April, October closes July and January closes the previous
    /// year's October.
    pub fn closed_by(month: YearMonth) -> Option<Self> {
        if !month.is_quarter_start() {
            return None;
        }
        month.quarter().previous()
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.start, f)
    }
}

impl FromStr for Quarter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let start: YearMonth = s.parse()?;
        Self::new(start.year(), start.month())
    }
}

impl TryFrom<String> for Quarter {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quarter> for String {
    fn from(value: Quarter) -> Self {
        value.to_string()
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

// Callers pass the fields of an existing `YearMonth` and a day within that
// month's length; chrono accepts every such date for years 1..=9999 and
// beyond, so construction cannot fail.
fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("validated calendar date")
}
