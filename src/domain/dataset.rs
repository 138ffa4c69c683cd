//! Dataset kinds, lookup keys and the filename-stem conventions tying them together.
//!
//! Files are named `{asset}_{date}_{tf}_{start}_{end}` for one segment,
//! `{asset}_{date}_{tf}` for a whole-day vector file, and
//! `{asset}_{date}_{start}_{end}` for daily-timeframe segments.

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::error::SegviewError;
use super::session::Timeframe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Classified,
    RawVectors,
    Alerts,
    Trades,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Alerts,
        DatasetKind::Trades,
        DatasetKind::RawVectors,
        DatasetKind::Classified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Classified => "classified",
            DatasetKind::RawVectors => "raw_vectors",
            DatasetKind::Alerts => "alerts",
            DatasetKind::Trades => "trades",
        }
    }

    /// Classified and raw-vector files are always `.jsonl`; event logs may be `.json` too.
    pub fn accepts_file_name(&self, name: &str) -> bool {
        if name.starts_with('.') {
            return false;
        }
        match self {
            DatasetKind::Classified | DatasetKind::RawVectors => name.ends_with(".jsonl"),
            DatasetKind::Alerts | DatasetKind::Trades => {
                name.ends_with(".jsonl") || name.ends_with(".json")
            }
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = SegviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classified" => Ok(DatasetKind::Classified),
            "raw_vectors" => Ok(DatasetKind::RawVectors),
            "alerts" => Ok(DatasetKind::Alerts),
            "trades" => Ok(DatasetKind::Trades),
            other => Err(SegviewError::UnknownKind(other.to_string())),
        }
    }
}

/// File name without its final extension.
pub fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

pub fn stem_parts(stem: &str) -> usize {
    stem.split('_').count()
}

/// (asset, date, timeframe) identifying one logical group of files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetKey {
    pub asset: String,
    pub date: String,
    /// Timeframe exactly as it appears in file names; may be empty for alert lookups.
    pub tf: String,
}

impl DatasetKey {
    /// Asset and date are mandatory; a missing one is a user-input error.
    pub fn new(asset: &str, date: &str, tf: &str) -> Result<Self, SegviewError> {
        let (asset, date, tf) = (asset.trim(), date.trim(), tf.trim());
        if asset.is_empty() || date.is_empty() {
            return Err(SegviewError::missing("asset and date"));
        }
        Ok(Self {
            asset: asset.to_string(),
            date: date.to_string(),
            tf: tf.to_string(),
        })
    }

    /// Like [`DatasetKey::new`] but the timeframe is mandatory too.
    pub fn with_timeframe(asset: &str, date: &str, tf: &str) -> Result<Self, SegviewError> {
        let key = Self::new(asset, date, tf)?;
        if key.tf.is_empty() {
            return Err(SegviewError::missing("asset, date and tf"));
        }
        Ok(key)
    }

    pub fn has_timeframe(&self) -> bool {
        !self.tf.is_empty()
    }

    pub fn timeframe(&self) -> Timeframe {
        Timeframe::parse(&self.tf)
    }

    /// `{asset}_{date}`
    pub fn day_stem(&self) -> String {
        format!("{}_{}", self.asset, self.date)
    }

    /// `{asset}_{date}_{tf}` with the timeframe spelled as given.
    pub fn tf_stem(&self) -> String {
        format!("{}_{}_{}", self.asset, self.date, self.tf)
    }

    /// Prefix shared by every per-segment file of this key.
    pub fn segment_prefix(&self) -> String {
        if self.timeframe().is_daily() {
            format!("{}_", self.day_stem())
        } else {
            format!("{}_", self.tf_stem())
        }
    }

    pub fn segment_stem_parts(&self) -> usize {
        if self.timeframe().is_daily() { 4 } else { 5 }
    }

    /// Per-segment stem of this key, as opposed to a whole-day vector stem
    /// that shares the prefix.
    pub fn is_segment_stem(&self, stem: &str) -> bool {
        stem.starts_with(&self.segment_prefix()) && stem_parts(stem) == self.segment_stem_parts()
    }

    /// `{asset}_{date}_{tf}` exactly, or `{asset}_{date}_{tf}_*`.
    pub fn matches_tf_stem(&self, stem: &str) -> bool {
        let want = self.tf_stem();
        stem == want || stem.starts_with(&format!("{want}_"))
    }

    /// Timeframe-less daily stem `{asset}_{date}`.
    pub fn matches_day_stem(&self, stem: &str) -> bool {
        stem == self.day_stem()
    }

    /// Trade-log file names belonging to this key.
    pub fn matches_trade_file(&self, name: &str) -> bool {
        let want = self.tf_stem();
        name.starts_with(&format!("{want}_"))
            || name.starts_with(&format!("{want}."))
            || file_stem(name) == want
    }
}
