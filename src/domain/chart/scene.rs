//! Backend-neutral draw commands, grouped into z-ordered layers.

use serde::Serialize;

use super::hit::HitIndex;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stroke {
    pub color: &'static str,
    pub width: f64,
    /// Dash pattern in pixels; empty for a solid line.
    pub dash: &'static [f64],
}

impl Stroke {
    pub const fn solid(color: &'static str, width: f64) -> Self {
        Self {
            color,
            width,
            dash: &[],
        }
    }

    pub const fn dashed(color: &'static str, width: f64, dash: &'static [f64]) -> Self {
        Self { color, width, dash }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Baseline {
    Top,
    Middle,
    Bottom,
    Alphabetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TextStyle {
    pub size: f64,
    pub bold: bool,
    pub anchor: Anchor,
    pub baseline: Baseline,
    pub fill: &'static str,
    /// Outline drawn under the glyphs to keep them legible over lines.
    pub halo: Option<Stroke>,
}

impl TextStyle {
    pub const fn plain(size: f64, fill: &'static str, anchor: Anchor, baseline: Baseline) -> Self {
        Self {
            size,
            bold: false,
            anchor,
            baseline,
            fill,
            halo: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawCommand {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: &'static str,
        opacity: f64,
    },
    Line {
        from: (f64, f64),
        to: (f64, f64),
        stroke: Stroke,
    },
    Polyline {
        points: Vec<(f64, f64)>,
        stroke: Stroke,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        fill: &'static str,
        stroke: Stroke,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
        style: TextStyle,
    },
}

/// Layers back to front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    BarShading,
    Frame,
    SegmentSpans,
    Connectors,
    RevAvwap,
    AtrBand,
    HtfVwap,
    TradeAvwap,
    Endpoints,
    TradeMarkers,
    PriceLabels,
    AxisLabels,
    Legend,
}

impl Layer {
    pub const ORDER: [Layer; 13] = [
        Layer::BarShading,
        Layer::Frame,
        Layer::SegmentSpans,
        Layer::Connectors,
        Layer::RevAvwap,
        Layer::AtrBand,
        Layer::HtfVwap,
        Layer::TradeAvwap,
        Layer::Endpoints,
        Layer::TradeMarkers,
        Layer::PriceLabels,
        Layer::AxisLabels,
        Layer::Legend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::BarShading => "bar_shading",
            Layer::Frame => "frame",
            Layer::SegmentSpans => "segment_spans",
            Layer::Connectors => "connectors",
            Layer::RevAvwap => "rev_avwap",
            Layer::AtrBand => "atr_band",
            Layer::HtfVwap => "htf_vwap",
            Layer::TradeAvwap => "trade_avwap",
            Layer::Endpoints => "endpoints",
            Layer::TradeMarkers => "trade_markers",
            Layer::PriceLabels => "price_labels",
            Layer::AxisLabels => "axis_labels",
            Layer::Legend => "legend",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneLayer {
    pub layer: Layer,
    pub commands: Vec<DrawCommand>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub layers: Vec<SceneLayer>,
    #[serde(skip)]
    pub hits: HitIndex,
}

impl Scene {
    pub fn layer(&self, layer: Layer) -> &[DrawCommand] {
        self.layers
            .iter()
            .find(|l| l.layer == layer)
            .map_or(&[], |l| l.commands.as_slice())
    }

    /// All commands in paint order.
    pub fn commands(&self) -> impl Iterator<Item = &DrawCommand> {
        self.layers.iter().flat_map(|l| l.commands.iter())
    }
}
