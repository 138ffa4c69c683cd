//! Auxiliary chart series on the minute-of-session axis.
//!
//! Every series is sorted by minute and holds finite values only. Records
//! whose minute cannot be resolved contribute nothing.

use serde::Serialize;

use crate::domain::record::Record;
use crate::domain::session::{SessionWindow, Timeframe, record_minute};
use crate::domain::trade::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub min: u32,
    pub value: f64,
}

/// Higher-timeframe VWAP and its ATR band. `atr_upper[i].min == atr_lower[i].min`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HtfBand {
    pub htf_vwap: Vec<SeriesPoint>,
    pub atr_upper: Vec<SeriesPoint>,
    pub atr_lower: Vec<SeriesPoint>,
}

/// `TRADE_avwap` while one trade is open.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeAvwapSegment {
    pub entry_min: u32,
    pub exit_min: u32,
    pub points: Vec<SeriesPoint>,
}

fn points_of(
    records: &[Record],
    field: &str,
    session: &SessionWindow,
    timeframe: Timeframe,
) -> Vec<SeriesPoint> {
    let mut points: Vec<SeriesPoint> = records
        .iter()
        .filter_map(|r| {
            let value = r.number(field)?;
            let min = record_minute(r, session, timeframe)?;
            Some(SeriesPoint { min, value })
        })
        .collect();
    points.sort_by_key(|p| p.min);
    points
}

/// Reversal VWAP from alert records.
pub fn rev_avwap_series(
    alerts: &[Record],
    session: &SessionWindow,
    timeframe: Timeframe,
) -> Vec<SeriesPoint> {
    points_of(alerts, "REV_avwap", session, timeframe)
}

/// `htfVwap` and `htfVwap ± atrNow` from raw-vector records.
///
/// Segment files overlap at their boundary bars, so when several records
/// land on the same minute only the first one read is kept.
pub fn htf_band_series(
    raw_vectors: &[Record],
    session: &SessionWindow,
    timeframe: Timeframe,
) -> HtfBand {
    let mut rows: Vec<(u32, f64, Option<f64>)> = raw_vectors
        .iter()
        .filter_map(|record| {
            let value = record.number("htfVwap")?;
            let min = record_minute(record, session, timeframe)?;
            let atr = record.number("atrNow").or_else(|| record.number("atrnow"));
            Some((min, value, atr))
        })
        .collect();
    // one source record per minute for both the line and its band
    rows.sort_by_key(|row| row.0);
    rows.dedup_by_key(|row| row.0);

    let mut band = HtfBand::default();
    for (min, value, atr) in rows {
        band.htf_vwap.push(SeriesPoint { min, value });
        if let Some(atr) = atr {
            band.atr_upper.push(SeriesPoint { min, value: value + atr });
            band.atr_lower.push(SeriesPoint { min, value: value - atr });
        }
    }
    band
}

/// `TRADE_avwap` between each trade's entry and exit. A trade still open
/// runs to the end of the session; trades without an entry minute are skipped.
pub fn trade_avwap_segments(
    raw_vectors: &[Record],
    trades: &[Trade],
    session: &SessionWindow,
    timeframe: Timeframe,
) -> Vec<TradeAvwapSegment> {
    let mut all = points_of(raw_vectors, "TRADE_avwap", session, timeframe);
    all.dedup_by_key(|p| p.min);
    trades
        .iter()
        .filter_map(|trade| {
            let entry_min = trade.entry_min?;
            let exit_min = if trade.is_open() {
                session.end_min
            } else {
                trade.exit_min?
            };
            let points: Vec<SeriesPoint> = all
                .iter()
                .filter(|p| p.min >= entry_min && p.min <= exit_min)
                .copied()
                .collect();
            (!points.is_empty()).then_some(TradeAvwapSegment {
                entry_min,
                exit_min,
                points,
            })
        })
        .collect()
}
