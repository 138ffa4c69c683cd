//! Chart model: the data one chart shows, and its conversion into draw commands.

pub mod hit;
pub mod render;
pub mod scale;
pub mod scene;

use serde::Serialize;

use crate::domain::segment::Segment;
use crate::domain::series::{SeriesPoint, TradeAvwapSegment};
use crate::domain::trade::Trade;

/// Bars assumed when the data reports none.
pub const FALLBACK_BARS_IN_SESSION: u32 = 108;

/// Everything needed to draw one (asset, date, timeframe) chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub segments: Vec<Segment>,
    pub bars_in_session: u32,
    pub session_start: u32,
    pub session_end: u32,
    pub rev_avwap_series: Vec<SeriesPoint>,
    pub htf_vwap_series: Vec<SeriesPoint>,
    pub atr_upper_series: Vec<SeriesPoint>,
    pub atr_lower_series: Vec<SeriesPoint>,
    pub trades: Vec<Trade>,
    pub trade_avwap_segments: Vec<TradeAvwapSegment>,
}

impl ChartData {
    pub fn bars(&self) -> u32 {
        if self.bars_in_session > 0 {
            self.bars_in_session
        } else {
            FALLBACK_BARS_IN_SESSION
        }
    }

    /// Minutes per bar; fractional when the session does not divide evenly.
    pub fn bar_minutes(&self) -> f64 {
        f64::from(self.session_end.saturating_sub(self.session_start)) / f64::from(self.bars())
    }

    /// Every price the chart plots: segment endpoints, series values, trade prices.
    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        let segment_prices = self
            .segments
            .iter()
            .flat_map(|s| [s.close_first, s.close_last]);
        let series = [
            &self.rev_avwap_series,
            &self.htf_vwap_series,
            &self.atr_upper_series,
            &self.atr_lower_series,
        ]
        .into_iter()
        .flatten()
        .map(|p| p.value);
        let trade_prices = self
            .trades
            .iter()
            .flat_map(|t| [t.entry_px, t.exit_px])
            .flatten();
        let trade_vwap = self
            .trade_avwap_segments
            .iter()
            .flat_map(|seg| seg.points.iter().map(|p| p.value));
        segment_prices
            .chain(series)
            .chain(trade_prices)
            .chain(trade_vwap)
            .filter(|p| p.is_finite())
    }
}

pub const NEUTRAL_TIER_COLOR: &str = "#333333";

/// Legend order of the named tiers.
pub const TIER_ORDER: [&str; 6] = [
    "elite",
    "high_quality",
    "tradable",
    "difficult",
    "low_edge",
    "non_tradable",
];

/// Segment tier to stroke/fill colour. Numeric, letter and named tiers share
/// the same four-step scale.
pub fn tier_color(tier: &str) -> &'static str {
    match tier {
        "1" | "A" | "elite" => "#1565C0",
        "2" | "B" | "high_quality" => "#2E7D32",
        "3" | "C" | "tradable" => "#E65100",
        "4" | "D" | "difficult" => "#C62828",
        "low_edge" => "#7B1FA2",
        "non_tradable" => "#455A64",
        _ => NEUTRAL_TIER_COLOR,
    }
}
