//! Excel serial dates
//!
//! Excel stores date-times as a number of days since an epoch, the fraction
//! being the time of day. The 1900 system keeps Lotus 1-2-3's fictional
//! 1900-02-29 as serial 60, so real dates before March 1900 are shifted by one.
//! The 1904 system has no such gap.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

const MS_PER_DAY: i64 = 86_400_000;

/// Largest serial Excel displays as a date (9999-12-31)
pub const MAX_SERIAL_1900: f64 = 2_958_465.999_999;

fn epoch(date_1904: bool) -> NaiveDateTime {
    let (y, m, d) = if date_1904 {
        (1904, 1, 1)
    } else {
        (1899, 12, 31)
    };
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Convert a serial number to a date-time
///
/// Returns `None` for negative or out-of-range serials. Serial 60 in the
/// 1900 system (the non-existent 1900-02-29) maps to 1900-03-01. The result
/// is rounded to the millisecond.
pub fn serial_to_datetime(serial: f64, date_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > MAX_SERIAL_1900 {
        return None;
    }

    let total_ms = (serial * MS_PER_DAY as f64).round() as i64;
    let mut days = total_ms.div_euclid(MS_PER_DAY);
    let ms = total_ms.rem_euclid(MS_PER_DAY);

    if !date_1904 && days >= 61 {
        days -= 1;
    }

    epoch(date_1904)
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::milliseconds(ms))
}

/// Convert a date-time to a serial number
///
/// Returns `None` for date-times before the epoch.
pub fn datetime_to_serial(dt: NaiveDateTime, date_1904: bool) -> Option<f64> {
    let base = epoch(date_1904);
    if dt < base {
        return None;
    }
    let mut days = (dt.date() - base.date()).num_days();
    if !date_1904 && days >= 60 {
        days += 1;
    }
    let ms_of_day = dt.num_seconds_from_midnight() as i64 * 1000
        + (dt.nanosecond() / 1_000_000) as i64;
    Some(days as f64 + ms_of_day as f64 / MS_PER_DAY as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_known_serials_1900() {
        assert_eq!(serial_to_datetime(1.0, false), Some(dt(1900, 1, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(59.0, false), Some(dt(1900, 2, 28, 0, 0, 0)));
        assert_eq!(serial_to_datetime(60.0, false), Some(dt(1900, 3, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(61.0, false), Some(dt(1900, 3, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(43831.0, false), Some(dt(2020, 1, 1, 0, 0, 0)));
        assert_eq!(
            serial_to_datetime(43831.75, false),
            Some(dt(2020, 1, 1, 18, 0, 0))
        );
    }

    #[test]
    fn test_known_serials_1904() {
        assert_eq!(serial_to_datetime(0.0, true), Some(dt(1904, 1, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(42369.0, true), Some(dt(2020, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn test_to_serial() {
        assert_eq!(datetime_to_serial(dt(2020, 1, 1, 0, 0, 0), false), Some(43831.0));
        assert_eq!(datetime_to_serial(dt(1900, 2, 28, 0, 0, 0), false), Some(59.0));
        assert_eq!(datetime_to_serial(dt(1900, 3, 1, 0, 0, 0), false), Some(61.0));
        assert_eq!(datetime_to_serial(dt(2020, 1, 1, 12, 0, 0), true), Some(42369.5));
        assert_eq!(datetime_to_serial(dt(1899, 1, 1, 0, 0, 0), false), None);
    }

    #[test]
    fn test_rounding_near_midnight() {
        // One millisecond short of midnight rounds into the same day, not past it
        let serial = 43831.0 + (MS_PER_DAY - 1) as f64 / MS_PER_DAY as f64;
        let value = serial_to_datetime(serial, false).unwrap();
        assert_eq!(value.date(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());

        let serial = 43831.0 + 0.999_999_999_9;
        assert_eq!(serial_to_datetime(serial, false), Some(dt(2020, 1, 2, 0, 0, 0)));
    }

    #[test]
    fn test_invalid() {
        assert_eq!(serial_to_datetime(-1.0, false), None);
        assert_eq!(serial_to_datetime(f64::NAN, false), None);
        assert_eq!(serial_to_datetime(3_000_000.0, false), None);
    }
}
