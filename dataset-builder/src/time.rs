use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ndarray::Array1;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const EXPORT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Regularly spaced instants, in seconds since the Unix epoch.
///
#[derive(Clone)]
pub struct TimeRange {
    pub start: i64,
    pub step: i64,
}

impl TimeRange {
    pub fn new(start: i64, step: i64) -> Self {
        Self { start, step }
    }

    pub fn get(&self, index: usize) -> i64 {
        self.start + (index as i64) * self.step
    }

    pub fn slice(&self, start: usize, stop: usize) -> Array1<i64> {
        Array1::from_iter((start..stop).map(|i| self.get(i)))
    }
}

/// Parse an ISO-like datetime string into seconds since the Unix epoch.
///
/// Accepts RFC 3339 timestamps with an offset, naive timestamps (assumed UTC, with either a `T`
/// or a space between date and time, optional fractional seconds) and bare dates.
///
pub fn parse_datetime(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.timestamp());
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc().timestamp());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp())
}

/// Format seconds since the Unix epoch the way time bounds are written to configuration files.
///
pub fn format_datetime(seconds: i64) -> String {
    match DateTime::from_timestamp(seconds, 0) {
        Some(datetime) => datetime.format(EXPORT_FORMAT).to_string(),
        None => seconds.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn test_get() {
        let range = TimeRange::new(1000000, 3600);
        assert_eq!(range.get(0), 1000000);
        assert_eq!(range.get(100), 1360000);
    }

    #[test]
    fn test_slice() {
        let range = TimeRange::new(1000000, 3600);
        assert_eq!(range.slice(100, 102), array![1360000, 1363600]);
    }

    #[test]
    fn test_parse_datetime() {
        assert_eq!(parse_datetime("1970-01-02"), Some(86400));
        assert_eq!(parse_datetime("1970-01-01T01:00:00"), Some(3600));
        assert_eq!(parse_datetime("1970-01-01 01:00:00.500"), Some(3600));
        assert_eq!(parse_datetime("1970-01-01T02:00:00+01:00"), Some(3600));
        assert_eq!(parse_datetime("2020-03-01T00:00:00Z"), Some(1583020800));
        assert_eq!(parse_datetime("yesterday"), None);
        assert_eq!(parse_datetime("42"), None);
    }

    #[test]
    fn test_format_datetime() {
        assert_eq!(format_datetime(0), "1970-01-01T00:00:00");
        assert_eq!(format_datetime(1583020800), "2020-03-01T00:00:00");
        assert_eq!(parse_datetime(&format_datetime(1583020800)), Some(1583020800));
    }
}
