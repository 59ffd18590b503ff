//! Month arithmetic on a fixed UTC+05:30 clock.
//!
//! All "this month" and "last month" windows in the dashboard are derived from
//! the current instant shifted by five and a half hours, independent of the
//! host's timezone.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

const IST_OFFSET_MINUTES: i64 = 330;

pub(crate) fn ist_date(instant: DateTime<Utc>) -> NaiveDate {
    (instant + Duration::minutes(IST_OFFSET_MINUTES)).date_naive()
}

pub(crate) fn ist_today() -> NaiveDate {
    ist_date(Utc::now())
}

/// A calendar month, `month` in 1..=12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct YearMonth {
    pub(crate) year: i32,
    pub(crate) month: u32,
}

impl YearMonth {
    pub(crate) fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub(crate) fn of(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    pub(crate) fn previous(&self) -> Self {
        if self.month <= 1 {
            Self::new(self.year - 1, 12)
        } else {
            Self::new(self.year, self.month - 1)
        }
    }

    /// First and last day of the month. `None` for an out-of-range month.
    pub(crate) fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        month_bounds(self.year, self.month)
    }

    pub(crate) fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub(crate) fn days(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    pub(crate) fn name(&self) -> &'static str {
        month_name(self.month)
    }

    /// Parse `YYYY-MM`.
    pub(crate) fn parse(s: &str) -> Option<Self> {
        let (y, m) = s.trim().split_once('-')?;
        if y.len() != 4 || m.len() != 2 {
            return None;
        }
        let year: i32 = y.parse().ok()?;
        let month: u32 = m.parse().ok()?;
        (1..=12).contains(&month).then(|| Self::new(year, month))
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name(), self.year)
    }
}

pub(crate) fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

pub(crate) fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))?;
    Some((first, last))
}

pub(crate) fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "Unknown",
    }
}

/// Display form used in lists and matched by search, e.g. `5 Jan 2025`.
pub(crate) fn format_display_date(date: NaiveDate) -> String {
    date.format("%-d %b %Y").to_string()
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests;
