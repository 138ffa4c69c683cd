//! Pixel mapping for the chart: plot area, price range, axis ticks.

use crate::domain::session::format_hm;

use super::ChartData;

pub const PADDING_TOP: f64 = 24.0;
pub const PADDING_RIGHT: f64 = 20.0;
pub const PADDING_BOTTOM: f64 = 52.0;
pub const PADDING_LEFT: f64 = 54.0;

pub const MIN_X_LABEL_SPACING: f64 = 52.0;
pub const Y_LABEL_SPACING: f64 = 20.0;
pub const MIN_Y_LABELS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl PlotArea {
    pub fn for_canvas(width: f64, height: f64) -> Self {
        Self {
            left: PADDING_LEFT,
            right: width - PADDING_RIGHT,
            top: PADDING_TOP,
            bottom: height - PADDING_BOTTOM,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Padded price range on the vertical axis. `max > min` always.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    /// Union of `prices` padded by 5% on each side. No prices at all gives
    /// the unit range.
    pub fn padded(prices: impl IntoIterator<Item = f64>) -> Self {
        let (lo, hi) = prices
            .into_iter()
            .filter(|p| p.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p), hi.max(p))
            });
        let lo = if lo.is_finite() { lo } else { 0.0 };
        let hi = if hi > lo { hi } else { lo + 1.0 };
        let pad = match (hi - lo) * 0.05 {
            p if p > 0.0 => p,
            _ => 1.0,
        };
        Self {
            min: lo - pad,
            max: hi + pad,
        }
    }
}

/// Minute/price to pixel mapping for one chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartScale {
    pub area: PlotArea,
    pub session_start: f64,
    pub session_end: f64,
    pub price: PriceRange,
}

impl ChartScale {
    pub fn new(area: PlotArea, data: &ChartData) -> Self {
        Self {
            area,
            session_start: f64::from(data.session_start),
            session_end: f64::from(data.session_end),
            price: PriceRange::padded(data.prices()),
        }
    }

    pub fn x_from_min(&self, min: f64) -> f64 {
        self.area.left
            + (min - self.session_start) / (self.session_end - self.session_start) * self.area.width()
    }

    /// Higher prices map to smaller y.
    pub fn y_from_price(&self, price: f64) -> f64 {
        self.area.bottom
            - (price - self.price.min) / (self.price.max - self.price.min) * self.area.height()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub at: f64,
    pub label: String,
}

/// Bars between time labels: the smallest even step that keeps labels at
/// least [`MIN_X_LABEL_SPACING`] pixels apart.
pub fn x_label_step(plot_width: f64, bars: u32) -> u32 {
    let max_labels = ((plot_width / MIN_X_LABEL_SPACING).floor() as u32).max(1);
    let step = bars.div_ceil(max_labels).max(2);
    if step % 2 == 0 { step } else { step + 1 }
}

/// Time labels along the bottom edge, `at` in x pixels.
pub fn x_ticks(scale: &ChartScale, bars: u32, bar_minutes: f64) -> Vec<Tick> {
    let step = x_label_step(scale.area.width(), bars);
    (0..=bars)
        .step_by(step as usize)
        .map(|k| {
            let min = scale.session_start + f64::from(k) * bar_minutes;
            Tick {
                at: scale.x_from_min(min),
                label: format_hm(min.round() as i64),
            }
        })
        .collect()
}

/// Price labels along the left edge, top to bottom, `at` in y pixels.
pub fn y_ticks(scale: &ChartScale) -> Vec<Tick> {
    let count = ((scale.area.height() / Y_LABEL_SPACING).floor() as usize).max(MIN_Y_LABELS);
    let PriceRange { min, max } = scale.price;
    (0..=count)
        .map(|i| {
            let price = max - (max - min) * (i as f64 / count as f64);
            Tick {
                at: scale.y_from_price(price),
                label: format!("{price:.2}"),
            }
        })
        .collect()
}
