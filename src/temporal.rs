//! ISO-8601 rendering for the date and timestamp encodings of the binary formats.
//!
//! Values chrono cannot represent keep their raw number.

use arrow::temporal_conversions::{date32_to_datetime, timestamp_ms_to_datetime, timestamp_us_to_datetime};
use chrono::NaiveDateTime;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// `YYYY-MM-DD` for days since the Unix epoch.
pub fn format_date(days: i32) -> String {
    match date32_to_datetime(days) {
        Some(dt) => dt.format(DATE_FORMAT).to_string(),
        None => days.to_string(),
    }
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ` for milliseconds since the Unix epoch.
pub fn format_timestamp_millis(millis: i64) -> String {
    timestamp_ms_to_datetime(millis).map_or_else(|| millis.to_string(), format_timestamp)
}

pub fn format_timestamp_micros(micros: i64) -> String {
    timestamp_us_to_datetime(micros).map_or_else(|| micros.to_string(), format_timestamp)
}

fn format_timestamp(dt: NaiveDateTime) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Midnight renders as a plain date, anything else as a timestamp.
#[cfg(feature = "excel")]
pub fn format_datetime(dt: NaiveDateTime) -> String {
    if dt.time() == chrono::NaiveTime::MIN {
        dt.format(DATE_FORMAT).to_string()
    } else {
        format_timestamp(dt)
    }
}

/// Elapsed time as `[h]:mm:ss`, with `.mmm` when there are milliseconds.
#[cfg(feature = "excel")]
pub fn format_duration(delta: chrono::TimeDelta) -> String {
    let sign = if delta < chrono::TimeDelta::zero() { "-" } else { "" };
    let delta = delta.abs();
    let secs = delta.num_seconds();
    let (h, m, s) = (secs / 3_600, (secs % 3_600) / 60, secs % 60);
    match delta.subsec_millis() {
        0 => format!("{sign}{h}:{m:02}:{s:02}"),
        ms => format!("{sign}{h}:{m:02}:{s:02}.{ms:03}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_and_leap_day() {
        assert_eq!(format_date(0), "1970-01-01");
        assert_eq!(format_date(19_416), "2023-02-28");
        assert_eq!(format_date(11_016), "2000-02-29");
        assert_eq!(format_date(-1), "1969-12-31");
    }

    #[test]
    fn timestamps_have_time_of_day() {
        assert_eq!(
            format_timestamp_millis(1_700_000_000_123),
            "2023-11-14T22:13:20.123Z"
        );
        assert_eq!(
            format_timestamp_micros(1_700_000_000_123_456),
            "2023-11-14T22:13:20.123Z"
        );
        assert_eq!(format_timestamp_millis(-1), "1969-12-31T23:59:59.999Z");
    }

    #[cfg(feature = "excel")]
    #[test]
    fn datetimes_and_durations() {
        let noon = chrono::NaiveDate::from_ymd_opt(2023, 3, 15)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        assert_eq!(format_datetime(noon), "2023-03-15T12:00:00.000Z");
        assert_eq!(format_datetime(noon.date().and_time(chrono::NaiveTime::MIN)), "2023-03-15");

        assert_eq!(format_duration(chrono::TimeDelta::minutes(36 * 60 + 30)), "36:30:00");
        assert_eq!(format_duration(chrono::TimeDelta::milliseconds(-1_500)), "-0:00:01.500");
    }
}
