//! Trading session window, timeframes and minute-of-day conversions.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use super::error::SegviewError;
use super::record::Record;

pub const DEFAULT_SESSION_START_MIN: u32 = 8 * 60 + 30;
pub const DEFAULT_SESSION_END_MIN: u32 = 17 * 60 + 30;
pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Timeframe used when the identifier is neither a minute count nor `D`.
pub const FALLBACK_TIMEFRAME_MIN: u32 = 5;

/// Horizontal chart domain in minutes since midnight. `end_min > start_min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionWindow {
    pub start_min: u32,
    pub end_min: u32,
}

impl Default for SessionWindow {
    fn default() -> Self {
        Self {
            start_min: DEFAULT_SESSION_START_MIN,
            end_min: DEFAULT_SESSION_END_MIN,
        }
    }
}

impl SessionWindow {
    pub fn new(start_min: u32, end_min: u32) -> Result<Self, SegviewError> {
        if end_min <= start_min || end_min > MINUTES_PER_DAY {
            return Err(SegviewError::ConfigInvalid {
                section: "session".into(),
                key: "end".into(),
                reason: format!(
                    "session end ({}) must be after start ({}) and within one day",
                    format_hm(end_min as i64),
                    format_hm(start_min as i64)
                ),
            });
        }
        Ok(Self { start_min, end_min })
    }

    pub fn len_min(&self) -> u32 {
        self.end_min - self.start_min
    }

    pub fn bars(&self, timeframe: Timeframe) -> u32 {
        self.len_min() / timeframe.minutes(self)
    }
}

/// Bar width: a minute count, or one bar spanning the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeframe {
    Minutes(u32),
    Daily,
}

impl Timeframe {
    /// `"5"` → 5 minutes, `"D"` → daily. Anything else falls back to 5 minutes.
    pub fn parse(tf: &str) -> Self {
        let tf = tf.trim();
        if tf.eq_ignore_ascii_case("d") {
            return Timeframe::Daily;
        }
        match leading_int(tf) {
            Some(n) if n > 0 => Timeframe::Minutes(n),
            _ => Timeframe::Minutes(FALLBACK_TIMEFRAME_MIN),
        }
    }

    pub fn minutes(&self, session: &SessionWindow) -> u32 {
        match self {
            Timeframe::Minutes(n) => *n,
            Timeframe::Daily => session.len_min(),
        }
    }

    pub fn is_daily(&self) -> bool {
        matches!(self, Timeframe::Daily)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::Minutes(n) => write!(f, "{n}"),
            Timeframe::Daily => write!(f, "D"),
        }
    }
}

fn leading_int(s: &str) -> Option<u32> {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse().ok()
}

/// Minute of day from a `YYYY-MM-DD[ T]HH:MM:SS...` timestamp.
///
/// Only the first 19 characters are considered, so zone suffixes such as
/// `" UTC"` are tolerated. Returns `None` for anything else.
pub fn parse_start_time_to_min(s: &str) -> Option<u32> {
    let s = s.trim();
    let b = s.as_bytes();
    if b.len() < 16 {
        return None;
    }
    let digits = |range: std::ops::Range<usize>| b[range].iter().all(u8::is_ascii_digit);
    if !digits(0..4) || b[4] != b'-' || !digits(5..7) || b[7] != b'-' || !digits(8..10) {
        return None;
    }
    if b[10] != b' ' && b[10] != b'T' {
        return None;
    }
    let rest = &s[11..];
    let (h, rest) = rest.split_once(':')?;
    if h.is_empty() || h.len() > 2 || !h.bytes().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let rb = rest.as_bytes();
    if rb.len() < 5 || !rb[..2].iter().all(u8::is_ascii_digit) || rb[2] != b':' {
        return None;
    }
    if !rb[3..5].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = rest[..2].parse().ok()?;
    Some(hour * 60 + minute)
}

/// Minute of day from a 4-digit `HHMM` string (also accepts `HH:MM`).
pub fn hm_to_min(hm: &str) -> Option<u32> {
    let digits: String = hm.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 3 || digits.len() > 4 {
        return None;
    }
    let padded = format!("{digits:0>4}");
    let h: u32 = padded[..2].parse().ok()?;
    let m: u32 = padded[2..4].parse().ok()?;
    if h > 24 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

/// `HH:MM` for a minute of day.
pub fn format_hm(min: i64) -> String {
    format!("{:02}:{:02}", min.div_euclid(60), min.rem_euclid(60))
}

/// Calendar date from `YYYY-MM-DD`, `YYYYMMDD` or `YYMMDD` prefixes.
pub fn parse_date_prefix(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Some(Ok(d)) = s.get(..10).map(|p| NaiveDate::parse_from_str(p, "%Y-%m-%d")) {
        return Some(d);
    }
    let leading: String = s.chars().take_while(char::is_ascii_digit).collect();
    if leading.len() >= 8 {
        if let Ok(d) = NaiveDate::parse_from_str(&leading[..8], "%Y%m%d") {
            return Some(d);
        }
    }
    if leading.len() >= 6 {
        return NaiveDate::parse_from_str(&format!("20{}", &leading[..6]), "%Y%m%d").ok();
    }
    None
}

/// Timestamp of a record: `time`, then `Time`.
pub fn record_time(record: &Record) -> Option<&str> {
    record.first_text(&["time", "Time"])
}

/// Minute of a record on the session axis: its timestamp, or failing that
/// `session start + bar_index * timeframe`. An index that lands past the end
/// of the day has no minute.
pub fn record_minute(record: &Record, session: &SessionWindow, timeframe: Timeframe) -> Option<u32> {
    if let Some(min) = record_time(record).and_then(parse_start_time_to_min) {
        return Some(min);
    }
    let idx = record.lenient_number("bar_index")?;
    if !idx.is_finite() || idx < 0.0 || idx > f64::from(MINUTES_PER_DAY) {
        return None;
    }
    (idx as u32)
        .checked_mul(timeframe.minutes(session))
        .and_then(|offset| session.start_min.checked_add(offset))
        .filter(|min| *min <= MINUTES_PER_DAY)
}
