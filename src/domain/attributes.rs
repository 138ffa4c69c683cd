//! Which record fields a tabular view shows, per dataset kind.
//!
//! The selection is an explicit value handed to each query rather than
//! shared state, so two views of the same data can show different columns.

use serde_json::Value;

use crate::domain::dataset::DatasetKind;
use crate::domain::record::Record;

/// Placeholder for a missing cell.
pub const EMPTY_CELL: &str = "\u{2014}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrGroup {
    pub label: &'static str,
    pub attrs: &'static [&'static str],
}

const ID: &[&str] = &["time", "bar_index", "ticker", "tickerid", "tf", "received_at"];
const PRICE_VWAP: &[&str] = &["close", "volume", "htfVwap", "REV_avwap", "TRADE_avwap", "htf", "htf2"];
const REVERSAL: &[&str] = &[
    "revDir",
    "reversalScore",
    "shockDir",
    "shockScore",
    "noneDir",
    "noneScore",
    "inTrendScore",
    "trendDir",
];
const TREND: &[&str] = &[
    "tTrendDir", "tTrendAbs", "tRegimeDir", "tRegimeAbs", "tPreDir", "tPreAbs", "tPreCDir", "tPreCAbs",
];
const PEAK_SHOCK: &[&str] = &["tPeakDir", "tPeakConf", "tShockDirTot", "tShockScoreTot"];
const ATR: &[&str] = &["atrNow", "atrBase", "atrRatio"];
const SMA_CROSS: &[&str] = &[
    "smaCrossDirHTF",
    "smaCrossScoreHTF",
    "smaCrossDirInd",
    "smaCrossScoreInd",
    "htfSmaFastDir",
    "htfSmaFastScore",
    "htfSmaFastBarsSince",
];
const FSM: &[&str] = &["FSM_State", "prev_state", "new_state"];

const VECTOR_GROUPS: &[AttrGroup] = &[
    AttrGroup { label: "Id", attrs: ID },
    AttrGroup { label: "Price / VWAP", attrs: PRICE_VWAP },
    AttrGroup { label: "Reversal", attrs: REVERSAL },
    AttrGroup { label: "Trend", attrs: TREND },
    AttrGroup { label: "Peak / Shock", attrs: PEAK_SHOCK },
    AttrGroup { label: "ATR", attrs: ATR },
    AttrGroup { label: "SMA Cross", attrs: SMA_CROSS },
    AttrGroup { label: "FSM", attrs: FSM },
];

const TRADE_GROUPS: &[AttrGroup] = &[
    AttrGroup { label: "Id", attrs: &["time", "bar_index", "ticker", "tf", "received_at"] },
    AttrGroup { label: "Trade", attrs: &["event", "dir", "entryPx", "exitPx", "pnl", "tradeScore"] },
    AttrGroup { label: "Price / VWAP", attrs: &["close", "volume", "TRADE_avwap", "REV_avwap", "htf", "htf2"] },
    AttrGroup { label: "ATR", attrs: &["atrNow", "atrBase"] },
    AttrGroup { label: "Trend", attrs: &["trendDir", "tPreDir", "tPreCDir", "smaCrossDirInd"] },
    AttrGroup { label: "FSM", attrs: &["prev_state", "new_state"] },
];

const CLASSIFIED_GROUPS: &[AttrGroup] = &[
    AttrGroup {
        label: "Id",
        attrs: &["closing_bar_index", "segment_id", "ticker", "tf", "date", "start_time", "duration_min", "bars"],
    },
    AttrGroup { label: "Price", attrs: &["p0_close", "p1_close", "delta_pct", "range_pct", "efficiency"] },
    AttrGroup { label: "Volume", attrs: &["dollarVol_sum", "vol_slope", "vol_peak_ratio"] },
    AttrGroup { label: "ATR", attrs: &["atrRatio_peak", "atrRatio_q50"] },
    AttrGroup {
        label: "VWAP",
        attrs: &[
            "rev_avwap_side_frac",
            "rev_avwap_cross_count",
            "rev_avwap_dist_abs_mean_pct",
            "htfVwap_side_frac",
            "htfVwap_cross_count",
        ],
    },
    AttrGroup {
        label: "Shock",
        attrs: &["tShockScoreTot_peak", "tShockScoreTot_density", "tShock_time_to_peak"],
    },
    AttrGroup {
        label: "Trend",
        attrs: &[
            "tTrendAbs_area",
            "tTrendAbs_active_frac",
            "inTrendScore_area",
            "tRegimeAbs_active_frac",
            "smaCrossScoreInd_active_frac",
        ],
    },
    AttrGroup {
        label: "Classification",
        attrs: &[
            "profit_score",
            "entry_score",
            "maintain_score",
            "tradeability_score",
            "tier",
            "next_profit_score",
            "next_entry_score",
            "next_maintain_score",
            "next_tradeability_score",
            "next_delta_pct",
            "next_tier",
        ],
    },
];

pub fn groups(kind: DatasetKind) -> &'static [AttrGroup] {
    match kind {
        DatasetKind::Alerts | DatasetKind::RawVectors => VECTOR_GROUPS,
        DatasetKind::Trades => TRADE_GROUPS,
        DatasetKind::Classified => CLASSIFIED_GROUPS,
    }
}

pub fn defaults(kind: DatasetKind) -> &'static [&'static str] {
    match kind {
        DatasetKind::Alerts | DatasetKind::RawVectors => {
            &["time", "bar_index", "revDir", "close", "REV_avwap"]
        }
        DatasetKind::Trades => &["time", "bar_index", "event", "dir", "entryPx", "exitPx", "pnl"],
        DatasetKind::Classified => &[
            "start_time",
            "closing_bar_index",
            "p0_close",
            "delta_pct",
            "tier",
            "tradeability_score",
        ],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelection {
    kind: DatasetKind,
    columns: Vec<String>,
}

impl AttributeSelection {
    pub fn defaults(kind: DatasetKind) -> Self {
        Self {
            kind,
            columns: defaults(kind).iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Explicit columns in the given order, duplicates dropped. An empty
    /// list means the kind's defaults.
    pub fn new<I, S>(kind: DatasetKind, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut columns: Vec<String> = Vec::new();
        for attr in attrs {
            let attr = attr.as_ref().trim();
            if !attr.is_empty() && !columns.iter().any(|c| c == attr) {
                columns.push(attr.to_string());
            }
        }
        if columns.is_empty() {
            return Self::defaults(kind);
        }
        Self { kind, columns }
    }

    /// Parse a comma-separated column list such as `time,close,REV_avwap`.
    pub fn parse(kind: DatasetKind, list: &str) -> Self {
        Self::new(kind, list.split(','))
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Attributes offered for this kind that are not selected.
    pub fn unselected(&self) -> Vec<&'static str> {
        groups(self.kind)
            .iter()
            .flat_map(|g| g.attrs.iter().copied())
            .filter(|a| !self.columns.iter().any(|c| c == a))
            .collect()
    }

    pub fn row(&self, record: &Record) -> Vec<String> {
        self.columns.iter().map(|c| cell(record, c)).collect()
    }
}

/// A non-zero `revDir` marks a reversal edge.
pub fn is_reversal_edge(record: &Record) -> bool {
    record.lenient_number("revDir").is_some_and(|d| d != 0.0)
}

/// Display text of one attribute. Time columns show `HH:MM`; `time` falls
/// back to `Time` and then `start_time`.
pub fn cell(record: &Record, attr: &str) -> String {
    let fields = record.fields();
    let present = |key: &str| fields.get(key).filter(|v| !v.is_null());
    let value = match attr {
        "time" => present("time")
            .or_else(|| present("Time"))
            .or_else(|| present("start_time")),
        other => present(other),
    };
    let Some(value) = value else {
        return EMPTY_CELL.to_string();
    };
    if attr == "time" || attr == "start_time" {
        return value
            .as_str()
            .map_or_else(|| EMPTY_CELL.to_string(), bar_time_to_hm);
    }
    match value {
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
            (None, Some(f)) => format!("{f:.2}"),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// First `H:MM`/`HH:MM` in a timestamp, zero-padded. Falls back to the
/// `HH:MM` slice of an ISO timestamp.
pub fn bar_time_to_hm(t: &str) -> String {
    let b = t.as_bytes();
    for (i, _) in t.match_indices(':') {
        let Some(minutes) = t.get(i + 1..i + 3) else {
            continue;
        };
        if !minutes.bytes().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let hour_start = match i {
            0 => continue,
            1 => 0,
            _ if b[i - 2].is_ascii_digit() => i - 2,
            _ => i - 1,
        };
        let hours = &t[hour_start..i];
        if hours.bytes().all(|c| c.is_ascii_digit()) {
            return format!("{hours:0>2}:{minutes}");
        }
    }
    t.get(11..16)
        .map_or_else(|| EMPTY_CELL.to_string(), str::to_string)
}
