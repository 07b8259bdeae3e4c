//! Regular-interval time series

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDateTime};
use lazy_regex::regex_captures;

use crate::datetime::{DateTimePrecision, DateTimeValue};
use crate::error::{CommandError, Result};
use crate::pattern::Glob;

/// Base unit of a time series interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalBase {
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl IntervalBase {
    fn name(&self) -> &'static str {
        match self {
            IntervalBase::Minute => "Minute",
            IntervalBase::Hour => "Hour",
            IntervalBase::Day => "Day",
            IntervalBase::Month => "Month",
            IntervalBase::Year => "Year",
        }
    }
}

/// Interval such as `1Day`, `15Minute` or `Month`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeInterval {
    pub multiplier: u32,
    pub base: IntervalBase,
}

impl TimeInterval {
    pub fn new(multiplier: u32, base: IntervalBase) -> Self {
        Self {
            multiplier: multiplier.max(1),
            base,
        }
    }

    /// Precision of date-times in a series with this interval
    pub fn precision(&self) -> DateTimePrecision {
        match self.base {
            IntervalBase::Minute => DateTimePrecision::Minute,
            IntervalBase::Hour => DateTimePrecision::Hour,
            IntervalBase::Day => DateTimePrecision::Day,
            IntervalBase::Month => DateTimePrecision::Month,
            IntervalBase::Year => DateTimePrecision::Year,
        }
    }

    /// `dt` moved forward by `steps` intervals
    pub fn advance(&self, dt: NaiveDateTime, steps: u32) -> Option<NaiveDateTime> {
        let n = i64::from(self.multiplier) * i64::from(steps);
        match self.base {
            IntervalBase::Minute => dt.checked_add_signed(Duration::minutes(n)),
            IntervalBase::Hour => dt.checked_add_signed(Duration::hours(n)),
            IntervalBase::Day => dt.checked_add_signed(Duration::days(n)),
            IntervalBase::Month => dt.checked_add_months(Months::new(u32::try_from(n).ok()?)),
            IntervalBase::Year => dt.checked_add_months(Months::new(u32::try_from(n * 12).ok()?)),
        }
    }

    /// Number of whole intervals from `start` to `dt`, if `dt` falls on one
    fn steps_between(&self, start: NaiveDateTime, dt: NaiveDateTime) -> Option<usize> {
        if dt < start {
            return None;
        }
        let m = i64::from(self.multiplier);
        let units = match self.base {
            IntervalBase::Minute => exact((dt - start).num_seconds(), 60)?,
            IntervalBase::Hour => exact((dt - start).num_seconds(), 3600)?,
            IntervalBase::Day => exact((dt - start).num_seconds(), 86_400)?,
            IntervalBase::Month | IntervalBase::Year => {
                let months = i64::from(dt.year() - start.year()) * 12
                    + i64::from(dt.month()) - i64::from(start.month());
                if self.base == IntervalBase::Year {
                    exact(months, 12)?
                } else {
                    months
                }
            }
        };
        (units % m == 0).then(|| (units / m) as usize)
    }
}

fn exact(value: i64, unit: i64) -> Option<i64> {
    (value % unit == 0).then_some(value / unit)
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multiplier == 1 {
            f.write_str(self.base.name())
        } else {
            write!(f, "{}{}", self.multiplier, self.base.name())
        }
    }
}

impl FromStr for TimeInterval {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CommandError::invalid_value(s, "not a time interval");
        let (_, mult, base) = regex_captures!(r"^(?i)\s*(\d*)\s*([a-z]+)\s*$", s).ok_or_else(invalid)?;
        let base = match base.to_ascii_lowercase().as_str() {
            "min" | "minute" => IntervalBase::Minute,
            "hour" => IntervalBase::Hour,
            "day" => IntervalBase::Day,
            "mon" | "month" => IntervalBase::Month,
            "year" => IntervalBase::Year,
            _ => return Err(invalid()),
        };
        let multiplier = match mult {
            "" => 1,
            m => m.parse().map_err(|_| invalid())?,
        };
        if multiplier == 0 {
            return Err(invalid());
        }
        Ok(Self::new(multiplier, base))
    }
}

/// Time series identifier `Location.DataSource.DataType.Interval[.Scenario]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TsIdent {
    pub location: String,
    pub data_source: String,
    pub data_type: String,
    pub interval: TimeInterval,
    pub scenario: String,
}

impl fmt::Display for TsIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.location, self.data_source, self.data_type, self.interval
        )?;
        if !self.scenario.is_empty() {
            write!(f, ".{}", self.scenario)?;
        }
        Ok(())
    }
}

impl FromStr for TsIdent {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if !(4..=5).contains(&parts.len()) || parts[0].is_empty() {
            return Err(CommandError::invalid_value(
                s,
                "expected Location.DataSource.DataType.Interval[.Scenario]",
            ));
        }
        Ok(Self {
            location: parts[0].to_string(),
            data_source: parts[1].to_string(),
            data_type: parts[2].to_string(),
            interval: parts[3].parse()?,
            scenario: parts.get(4).map(|s| s.to_string()).unwrap_or_default(),
        })
    }
}

/// Most values one series may hold
pub const MAX_VALUES: usize = 10_000_000;

/// A regular time series; `None` values are missing
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    ident: TsIdent,
    pub alias: String,
    pub description: String,
    pub units: String,
    start: NaiveDateTime,
    end: NaiveDateTime,
    values: Vec<Option<f64>>,
}

impl TimeSeries {
    /// Create a series with every value missing
    ///
    /// `start` and `end` are truncated to the interval precision; `end` must
    /// fall a whole number of intervals after `start`.
    pub fn new(ident: TsIdent, start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        let precision = ident.interval.precision();
        let start = DateTimeValue::new(start, precision).value();
        let end = DateTimeValue::new(end, precision).value();
        let count = ident.interval.steps_between(start, end).ok_or_else(|| {
            CommandError::other(format!(
                "period {} to {} does not fit interval {}",
                start, end, ident.interval
            ))
        })? + 1;
        if count > MAX_VALUES {
            return Err(CommandError::other(format!(
                "period {} to {} has {} {} values; at most {} are allowed",
                start, end, count, ident.interval, MAX_VALUES
            )));
        }
        Ok(Self {
            ident,
            alias: String::new(),
            description: String::new(),
            units: String::new(),
            start,
            end,
            values: vec![None; count],
        })
    }

    pub fn ident(&self) -> &TsIdent {
        &self.ident
    }

    pub fn tsid(&self) -> String {
        self.ident.to_string()
    }

    pub fn interval(&self) -> TimeInterval {
        self.ident.interval
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Date-times of the period, start to end
    pub fn dates(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        (0..self.values.len() as u32).filter_map(move |i| self.ident.interval.advance(self.start, i))
    }

    fn index_of(&self, dt: NaiveDateTime) -> Option<usize> {
        let dt = DateTimeValue::new(dt, self.ident.interval.precision()).value();
        self.ident
            .interval
            .steps_between(self.start, dt)
            .filter(|i| *i < self.values.len())
    }

    /// Value at a date-time; `None` when missing or outside the period
    pub fn value_at(&self, dt: NaiveDateTime) -> Option<f64> {
        self.index_of(dt).and_then(|i| self.values[i])
    }

    pub fn set_value(&mut self, dt: NaiveDateTime, value: Option<f64>) -> Result<()> {
        let i = self.index_of(dt).ok_or_else(|| {
            CommandError::other(format!("{} is outside the period of {}", dt, self.ident))
        })?;
        // NaN is treated as missing
        self.values[i] = value.filter(|v| !v.is_nan());
        Ok(())
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn non_missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Date-time text at the interval precision
    pub fn format_date(&self, dt: NaiveDateTime) -> String {
        DateTimeValue::new(dt, self.ident.interval.precision()).to_string()
    }

    /// Alias when set, otherwise the TSID
    pub fn display_name(&self) -> String {
        if self.alias.is_empty() {
            self.tsid()
        } else {
            self.alias.clone()
        }
    }

    /// Whether the alias or TSID matches a `*` glob, ignoring case
    pub fn matches(&self, pattern: &Glob) -> bool {
        (!self.alias.is_empty() && pattern.is_match(&self.alias)) || pattern.is_match(&self.tsid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_interval_parse() {
        assert_eq!("Day".parse::<TimeInterval>().unwrap(), TimeInterval::new(1, IntervalBase::Day));
        assert_eq!("15Minute".parse::<TimeInterval>().unwrap().to_string(), "15Minute");
        assert_eq!("6hour".parse::<TimeInterval>().unwrap().to_string(), "6Hour");
        assert!("0Day".parse::<TimeInterval>().is_err());
        assert!("Fortnight".parse::<TimeInterval>().is_err());
    }

    #[test]
    fn test_tsid_parse() {
        let id: TsIdent = "09010500.USGS.Streamflow.Day".parse().unwrap();
        assert_eq!(id.location, "09010500");
        assert_eq!(id.interval.base, IntervalBase::Day);
        assert_eq!(id.to_string(), "09010500.USGS.Streamflow.Day");
        let id: TsIdent = "Res.SIM.Storage.Month.Wet".parse().unwrap();
        assert_eq!(id.scenario, "Wet");
        assert!("Loc.Src".parse::<TsIdent>().is_err());
    }

    #[test]
    fn test_daily_values() {
        let id: TsIdent = "A.B.C.Day".parse().unwrap();
        let mut ts = TimeSeries::new(id, dt(2020, 2, 27), dt(2020, 3, 2)).unwrap();
        assert_eq!(ts.len(), 5);
        ts.set_value(dt(2020, 2, 29), Some(4.0)).unwrap();
        ts.set_value(dt(2020, 3, 1), Some(f64::NAN)).unwrap();
        assert_eq!(ts.value_at(dt(2020, 2, 29)), Some(4.0));
        assert_eq!(ts.value_at(dt(2020, 3, 1)), None);
        assert_eq!(ts.non_missing_count(), 1);
        assert!(ts.set_value(dt(2020, 3, 3), Some(1.0)).is_err());
        let dates: Vec<String> = ts.dates().map(|d| ts.format_date(d)).collect();
        assert_eq!(dates[2], "2020-02-29");
        assert_eq!(dates.len(), 5);
    }

    #[test]
    fn test_period_too_long() {
        let id: TsIdent = "A.B.C.Minute".parse().unwrap();
        let err = TimeSeries::new(id.clone(), dt(1900, 1, 1), dt(2100, 1, 1)).unwrap_err();
        assert!(err.to_string().contains("at most"));
        // A year of minutes is fine
        assert_eq!(TimeSeries::new(id, dt(2020, 1, 1), dt(2021, 1, 1)).unwrap().len(), 527_041);
    }

    #[test]
    fn test_monthly_period() {
        let id: TsIdent = "A.B.C.Month".parse().unwrap();
        let ts = TimeSeries::new(id, dt(2019, 11, 15), dt(2020, 2, 1)).unwrap();
        assert_eq!(ts.len(), 4);
        assert_eq!(ts.format_date(ts.start()), "2019-11");
        assert_eq!(ts.dates().last(), Some(dt(2020, 2, 1)));
    }

    #[test]
    fn test_matching() {
        let id: TsIdent = "09010500.USGS.Streamflow.Day".parse().unwrap();
        let mut ts = TimeSeries::new(id, dt(2020, 1, 1), dt(2020, 1, 2)).unwrap();
        assert!(ts.matches(&Glob::new("*.USGS.*").unwrap()));
        ts.alias = "Inflow".into();
        assert!(ts.matches(&Glob::new("inflow").unwrap()));
        assert!(!ts.matches(&Glob::new("Outflow").unwrap()));
        assert_eq!(ts.display_name(), "Inflow");
    }
}
