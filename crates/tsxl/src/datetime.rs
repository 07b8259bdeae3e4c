//! Date-times that carry a precision
//!
//! Table cells and time series dates remember how precise they are: a
//! monthly value is `2020-03`, not `2020-03-01 00:00:00`. The precision
//! drives text formatting and the Excel number format used on output.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use lazy_regex::regex_captures;

use crate::error::CommandError;

/// Smallest unit a date-time is significant to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DateTimePrecision {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl DateTimePrecision {
    /// Excel number format code showing exactly this precision
    pub fn excel_format(&self) -> &'static str {
        match self {
            DateTimePrecision::Year => "yyyy",
            DateTimePrecision::Month => "yyyy-mm",
            DateTimePrecision::Day => "yyyy-mm-dd",
            DateTimePrecision::Hour => "yyyy-mm-dd hh",
            DateTimePrecision::Minute => "yyyy-mm-dd hh:mm",
            DateTimePrecision::Second => "yyyy-mm-dd hh:mm:ss",
        }
    }

    fn chrono_format(&self) -> &'static str {
        match self {
            DateTimePrecision::Year => "%Y",
            DateTimePrecision::Month => "%Y-%m",
            DateTimePrecision::Day => "%Y-%m-%d",
            DateTimePrecision::Hour => "%Y-%m-%d %H",
            DateTimePrecision::Minute => "%Y-%m-%d %H:%M",
            DateTimePrecision::Second => "%Y-%m-%d %H:%M:%S",
        }
    }
}

/// A calendar date-time with a precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTimeValue {
    value: NaiveDateTime,
    precision: DateTimePrecision,
}

impl DateTimeValue {
    /// Create a value, truncating `value` to `precision`
    pub fn new(value: NaiveDateTime, precision: DateTimePrecision) -> Self {
        Self {
            value: truncate(value, precision),
            precision,
        }
    }

    /// Precision guessed from the time part (midnight means day precision)
    pub fn from_datetime(value: NaiveDateTime) -> Self {
        let precision = if value.second() != 0 || value.nanosecond() != 0 {
            DateTimePrecision::Second
        } else if value.hour() != 0 || value.minute() != 0 {
            DateTimePrecision::Minute
        } else {
            DateTimePrecision::Day
        };
        Self::new(value, precision)
    }

    pub fn value(&self) -> NaiveDateTime {
        self.value
    }

    pub fn precision(&self) -> DateTimePrecision {
        self.precision
    }

    /// Same instant shown at another precision
    pub fn with_precision(&self, precision: DateTimePrecision) -> Self {
        Self::new(self.value, precision)
    }
}

fn truncate(value: NaiveDateTime, precision: DateTimePrecision) -> NaiveDateTime {
    let (month, day, hour, minute, second) = match precision {
        DateTimePrecision::Year => (1, 1, 0, 0, 0),
        DateTimePrecision::Month => (value.month(), 1, 0, 0, 0),
        DateTimePrecision::Day => (value.month(), value.day(), 0, 0, 0),
        DateTimePrecision::Hour => (value.month(), value.day(), value.hour(), 0, 0),
        DateTimePrecision::Minute => (value.month(), value.day(), value.hour(), value.minute(), 0),
        DateTimePrecision::Second => (
            value.month(),
            value.day(),
            value.hour(),
            value.minute(),
            value.second(),
        ),
    };
    NaiveDate::from_ymd_opt(value.year(), month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .unwrap_or(value)
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value.format(self.precision.chrono_format()))
    }
}

impl FromStr for DateTimeValue {
    type Err = CommandError;

    /// Accepts `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, `MM/DD/YYYY` and ISO
    /// date-times to the hour, minute or second (`T` or space separated)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || CommandError::invalid_value(s, "not a recognized date/time");
        let num = |t: &str| t.parse::<u32>().map_err(|_| invalid());

        let (year, month, day, time, precision) =
            if let Some((_, y)) = regex_captures!(r"^(\d{4})$", s) {
                (y, "1", "1", None, DateTimePrecision::Year)
            } else if let Some((_, y, m)) = regex_captures!(r"^(\d{4})-(\d{1,2})$", s) {
                (y, m, "1", None, DateTimePrecision::Month)
            } else if let Some((_, m, d, y)) = regex_captures!(r"^(\d{1,2})/(\d{1,2})/(\d{4})$", s)
            {
                (y, m, d, None, DateTimePrecision::Day)
            } else if let Some((_, y, m, d, rest)) =
                regex_captures!(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[T ](.+))?$", s)
            {
                if rest.is_empty() {
                    (y, m, d, None, DateTimePrecision::Day)
                } else {
                    (y, m, d, Some(rest), DateTimePrecision::Hour)
                }
            } else {
                return Err(invalid());
            };

        let (mut hour, mut minute, mut second) = (0, 0, 0);
        let mut precision = precision;
        if let Some(time) = time {
            if let Some((_, h, mi, sec)) =
                regex_captures!(r"^(\d{1,2})(?::(\d{2}))?(?::(\d{2}))?$", time.trim())
            {
                hour = num(h)?;
                if !mi.is_empty() {
                    minute = num(mi)?;
                    precision = DateTimePrecision::Minute;
                }
                if !sec.is_empty() {
                    second = num(sec)?;
                    precision = DateTimePrecision::Second;
                }
            } else {
                return Err(invalid());
            }
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let value = NaiveDate::from_ymd_opt(year, num(month)?, num(day)?)
            .and_then(|d| d.and_hms_opt(hour, minute, second))
            .ok_or_else(invalid)?;
        Ok(Self::new(value, precision))
    }
}
