use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Shortest digit run read as epoch milliseconds. Anything shorter is
/// handed to the calendar parsers ("2026" is a year, not 2 seconds).
const EPOCH_MILLIS_MIN_LEN: usize = 10;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A stored login/logout value, tagged by the text form it arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeValue {
    EpochMillis(i64),
    Calendar(DateTime<Utc>),
}

impl TimeValue {
    /// Returns `None` for empty or unparseable text; callers pick the fallback.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if raw.len() >= EPOCH_MILLIS_MIN_LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
            let millis = raw.parse::<i64>().ok()?;
            // reject values chrono cannot represent
            Utc.timestamp_millis_opt(millis).single()?;
            return Some(TimeValue::EpochMillis(millis));
        }

        parse_calendar(raw).map(TimeValue::Calendar)
    }

    pub fn instant(&self) -> DateTime<Utc> {
        match *self {
            TimeValue::EpochMillis(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            TimeValue::Calendar(dt) => dt,
        }
    }
}

/// Parse a stored time value into an instant.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    TimeValue::parse(raw).map(|v| v.instant())
}

pub fn parse_stored(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(parse_instant)
}

/// Encode an instant the way the server writes fresh values.
pub fn encode_millis(instant: DateTime<Utc>) -> String {
    instant.timestamp_millis().to_string()
}

fn parse_calendar(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    // reduced-precision ISO dates: YYYY-MM-DD, YYYY-MM, YYYY
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        match raw.len() {
            7 => NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok(),
            4 if raw.bytes().all(|b| b.is_ascii_digit()) => {
                NaiveDate::from_ymd_opt(raw.parse().ok()?, 1, 1)
            }
            _ => None,
        }
    })?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}
