//! Chart rendering: [`ChartData`] to a layered [`Scene`] plus its hit index.

use crate::domain::error::SegviewError;
use crate::domain::series::SeriesPoint;
use crate::domain::trade::Direction;

use super::hit::{Endpoint, HitIndex, PlotCircle};
use super::scale::{ChartScale, PlotArea, x_ticks, y_ticks};
use super::scene::{Anchor, Baseline, DrawCommand, Layer, Scene, SceneLayer, Stroke, TextStyle};
use super::{ChartData, TIER_ORDER, tier_color};

pub const CIRCLE_RADIUS: f64 = 6.0;
pub const TRADE_MARK_OFFSET: f64 = 10.0;

const SHADE_FILL: &str = "#000000";
const SHADE_OPACITY: f64 = 0.04;
const FRAME: Stroke = Stroke::solid("#ddd", 1.0);
const WHITE: &str = "#fff";
const LABEL: &str = "#333";
const HEADING: &str = "#555";
const BUY: &str = "#2E7D32";
const SELL: &str = "#C62828";

pub const REV_AVWAP_STROKE: Stroke = Stroke::dashed("#cc00cc", 1.5, &[4.0, 4.0]);
pub const HTF_VWAP_STROKE: Stroke = Stroke::solid("#0d47a1", 1.5);
pub const ATR_BAND_STROKE: Stroke = Stroke::dashed("#1976d2", 1.0, &[2.0, 2.0]);
pub const TRADE_AVWAP_STROKE: Stroke = Stroke::dashed("#e65100", 1.5, &[2.0, 3.0]);

const SPAN_WIDTH: f64 = 2.0;
const ENDPOINT_RING: Stroke = Stroke::solid(WHITE, 1.5);
const GLYPH_HALO: Stroke = Stroke::solid(WHITE, 3.0);

const LEGEND_ROW: f64 = 18.0;
const LEGEND_INSET: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 600.0,
        }
    }
}

/// Lay out the whole chart. Fails only when the canvas leaves no plot area.
pub fn render(data: &ChartData, canvas: CanvasSize) -> Result<Scene, SegviewError> {
    let area = PlotArea::for_canvas(canvas.width, canvas.height);
    if area.width() <= 0.0 || area.height() <= 0.0 {
        return Err(SegviewError::Render {
            reason: format!(
                "canvas {}x{} is too small for the plot margins",
                canvas.width, canvas.height
            ),
        });
    }
    if data.session_end <= data.session_start {
        return Err(SegviewError::Render {
            reason: "session end must be after session start".to_string(),
        });
    }
    let scale = ChartScale::new(area, data);
    let painter = Painter { data, scale };

    let mut hits = HitIndex::default();
    let layers = Layer::ORDER
        .into_iter()
        .map(|layer| SceneLayer {
            layer,
            commands: painter.paint(layer, &mut hits),
        })
        .collect();

    Ok(Scene {
        width: canvas.width,
        height: canvas.height,
        layers,
        hits,
    })
}

struct Painter<'a> {
    data: &'a ChartData,
    scale: ChartScale,
}

impl Painter<'_> {
    fn paint(&self, layer: Layer, hits: &mut HitIndex) -> Vec<DrawCommand> {
        match layer {
            Layer::BarShading => self.bar_shading(),
            Layer::Frame => self.frame(),
            Layer::SegmentSpans => self.segment_spans(),
            Layer::Connectors => self.connectors(),
            Layer::RevAvwap => self.series_line(&self.data.rev_avwap_series, REV_AVWAP_STROKE),
            Layer::AtrBand => self.atr_band(),
            Layer::HtfVwap => self.series_line(&self.data.htf_vwap_series, HTF_VWAP_STROKE),
            Layer::TradeAvwap => self
                .data
                .trade_avwap_segments
                .iter()
                .flat_map(|seg| self.series_line(&seg.points, TRADE_AVWAP_STROKE))
                .collect(),
            Layer::Endpoints => self.endpoints(hits),
            Layer::TradeMarkers => self.trade_markers(),
            Layer::PriceLabels => self.price_labels(),
            Layer::AxisLabels => self.axis_labels(),
            Layer::Legend => self.legend(),
        }
    }

    fn point(&self, min: f64, price: f64) -> (f64, f64) {
        (self.scale.x_from_min(min), self.scale.y_from_price(price))
    }

    fn bar_shading(&self) -> Vec<DrawCommand> {
        let area = self.scale.area;
        let bars = self.data.bars();
        let bar_width = area.width() / f64::from(bars);
        (1..bars)
            .step_by(2)
            .map(|k| DrawCommand::Rect {
                x: area.left + f64::from(k) * bar_width,
                y: area.top,
                width: bar_width,
                height: area.height(),
                fill: SHADE_FILL,
                opacity: SHADE_OPACITY,
            })
            .collect()
    }

    fn frame(&self) -> Vec<DrawCommand> {
        let a = self.scale.area;
        vec![DrawCommand::Polyline {
            points: vec![(a.left, a.top), (a.left, a.bottom), (a.right, a.bottom)],
            stroke: FRAME,
        }]
    }

    fn segment_spans(&self) -> Vec<DrawCommand> {
        self.data
            .segments
            .iter()
            .map(|s| DrawCommand::Line {
                from: self.point(f64::from(s.start_min), s.close_first),
                to: self.point(f64::from(s.end_min), s.close_last),
                stroke: Stroke::solid(tier_color(&s.tier), SPAN_WIDTH),
            })
            .collect()
    }

    /// Joins each segment's end to the next one's start, in the next one's colour.
    fn connectors(&self) -> Vec<DrawCommand> {
        self.data
            .segments
            .windows(2)
            .map(|pair| DrawCommand::Line {
                from: self.point(f64::from(pair[0].end_min), pair[0].close_last),
                to: self.point(f64::from(pair[1].start_min), pair[1].close_first),
                stroke: Stroke::solid(tier_color(&pair[1].tier), SPAN_WIDTH),
            })
            .collect()
    }

    fn series_line(&self, points: &[SeriesPoint], stroke: Stroke) -> Vec<DrawCommand> {
        if points.is_empty() {
            return Vec::new();
        }
        vec![DrawCommand::Polyline {
            points: points
                .iter()
                .map(|p| self.point(f64::from(p.min), p.value))
                .collect(),
            stroke,
        }]
    }

    fn atr_band(&self) -> Vec<DrawCommand> {
        if self.data.atr_upper_series.is_empty() || self.data.atr_lower_series.is_empty() {
            return Vec::new();
        }
        let mut commands = self.series_line(&self.data.atr_upper_series, ATR_BAND_STROKE);
        commands.extend(self.series_line(&self.data.atr_lower_series, ATR_BAND_STROKE));
        commands
    }

    fn endpoints(&self, hits: &mut HitIndex) -> Vec<DrawCommand> {
        let mut commands = Vec::with_capacity(self.data.segments.len() * 2);
        for s in &self.data.segments {
            let start_is_peak = s.start_is_peak();
            let ends = [
                (Endpoint::Start, s.start_min, s.close_first, &s.start_hm, start_is_peak),
                (Endpoint::End, s.end_min, s.close_last, &s.end_hm, !start_is_peak),
            ];
            for (endpoint, min, price, hm, peak) in ends {
                let (x, y) = self.point(f64::from(min), price);
                commands.push(DrawCommand::Circle {
                    cx: x,
                    cy: y,
                    r: CIRCLE_RADIUS,
                    fill: tier_color(&s.tier),
                    stroke: ENDPOINT_RING,
                });
                hits.push(PlotCircle {
                    x,
                    y,
                    segment_id: s.segment_id.clone(),
                    endpoint,
                    time_hm: hm.clone(),
                    price,
                    peak,
                });
            }
        }
        commands
    }

    fn trade_markers(&self) -> Vec<DrawCommand> {
        let mut commands = Vec::new();
        for trade in &self.data.trades {
            if let (Some(min), Some(px)) = (trade.entry_min, trade.entry_px) {
                let (x, y) = self.point(f64::from(min), px);
                let (glyph, color, label_y, baseline) = match trade.dir {
                    Direction::Buy => ("+", BUY, y - TRADE_MARK_OFFSET - 2.0, Baseline::Top),
                    Direction::Sell => ("\u{2212}", SELL, y + TRADE_MARK_OFFSET + 2.0, Baseline::Bottom),
                };
                commands.push(glyph_text(x, y, glyph, color));
                commands.push(price_label(x, label_y, px, baseline));
            }
            if let (Some(min), Some(px)) = (trade.exit_min, trade.exit_px) {
                let (x, y) = self.point(f64::from(min), px);
                commands.push(glyph_text(x, y, "\u{00d7}", SELL));
                commands.push(price_label(x, y + TRADE_MARK_OFFSET + 2.0, px, Baseline::Top));
            }
        }
        commands
    }

    fn price_labels(&self) -> Vec<DrawCommand> {
        let style = TextStyle::plain(11.0, LABEL, Anchor::Middle, Baseline::Bottom);
        self.data
            .segments
            .iter()
            .flat_map(|s| {
                [(s.start_min, s.close_first), (s.end_min, s.close_last)]
            })
            .map(|(min, price)| {
                let (x, y) = self.point(f64::from(min), price);
                DrawCommand::Text {
                    x,
                    y: y - CIRCLE_RADIUS - 2.0,
                    text: format!("{price:.2}"),
                    style,
                }
            })
            .collect()
    }

    fn axis_labels(&self) -> Vec<DrawCommand> {
        let area = self.scale.area;
        let time_style = TextStyle::plain(11.0, LABEL, Anchor::Middle, Baseline::Alphabetic);
        let price_style = TextStyle::plain(11.0, LABEL, Anchor::End, Baseline::Middle);
        let times = x_ticks(&self.scale, self.data.bars(), self.data.bar_minutes())
            .into_iter()
            .map(|t| DrawCommand::Text {
                x: t.at,
                y: area.bottom + 16.0,
                text: t.label,
                style: time_style,
            });
        let prices = y_ticks(&self.scale).into_iter().map(|t| DrawCommand::Text {
            x: area.left - 6.0,
            y: t.at,
            text: t.label,
            style: price_style,
        });
        times.chain(prices).collect()
    }

    fn legend(&self) -> Vec<DrawCommand> {
        let x = self.scale.area.right - LEGEND_INSET;
        let mut legend = Legend {
            x,
            y: self.scale.area.top + LEGEND_INSET,
            commands: Vec::new(),
        };
        let d = self.data;

        legend.heading("Lines");
        if !d.rev_avwap_series.is_empty() {
            legend.line_row(REV_AVWAP_STROKE, "REV_avwap (reversal VWAP)");
        }
        if !d.htf_vwap_series.is_empty() {
            legend.line_row(HTF_VWAP_STROKE, "htfVwap (higher-timeframe VWAP)");
        }
        if !d.atr_upper_series.is_empty() {
            legend.line_row(ATR_BAND_STROKE, "+/- atrnow (ATR band)");
        }
        if !d.trade_avwap_segments.is_empty() {
            legend.line_row(TRADE_AVWAP_STROKE, "TRADE_avwap (while trade open)");
        }
        if !d.trades.is_empty() {
            legend.heading("Trades");
            legend.glyph_row("+", BUY, "Buy entry");
            legend.glyph_row("\u{2212}", SELL, "Sell entry");
            legend.glyph_row("\u{00d7}", SELL, "Exit");
        }
        legend.heading("Segment tiers");
        for tier in TIER_ORDER {
            legend.tier_row(tier);
        }
        legend.commands
    }
}

fn glyph_text(x: f64, y: f64, glyph: &str, color: &'static str) -> DrawCommand {
    DrawCommand::Text {
        x,
        y,
        text: glyph.to_string(),
        style: TextStyle {
            size: 14.0,
            bold: true,
            anchor: Anchor::Middle,
            baseline: Baseline::Middle,
            fill: color,
            halo: Some(GLYPH_HALO),
        },
    }
}

fn price_label(x: f64, y: f64, price: f64, baseline: Baseline) -> DrawCommand {
    DrawCommand::Text {
        x,
        y,
        text: format!("{price:.2}"),
        style: TextStyle::plain(10.0, LABEL, Anchor::Middle, baseline),
    }
}

/// Right-aligned legend column, one row per entry.
struct Legend {
    x: f64,
    y: f64,
    commands: Vec<DrawCommand>,
}

impl Legend {
    fn label(&mut self, x: f64, text: &str, fill: &'static str) {
        self.commands.push(DrawCommand::Text {
            x,
            y: self.y + 4.0,
            text: text.to_string(),
            style: TextStyle::plain(11.0, fill, Anchor::End, Baseline::Alphabetic),
        });
    }

    fn heading(&mut self, text: &str) {
        self.label(self.x, text, HEADING);
        self.y += LEGEND_ROW;
    }

    fn line_row(&mut self, stroke: Stroke, text: &str) {
        self.commands.push(DrawCommand::Line {
            from: (self.x - 40.0, self.y),
            to: (self.x - 10.0, self.y),
            stroke,
        });
        self.label(self.x - 46.0, text, LABEL);
        self.y += LEGEND_ROW;
    }

    fn glyph_row(&mut self, glyph: &str, color: &'static str, text: &str) {
        self.commands.push(glyph_text(self.x - 20.0, self.y, glyph, color));
        self.label(self.x - 32.0, text, LABEL);
        self.y += LEGEND_ROW;
    }

    fn tier_row(&mut self, tier: &str) {
        self.commands.push(DrawCommand::Circle {
            cx: self.x - 16.0,
            cy: self.y,
            r: CIRCLE_RADIUS,
            fill: tier_color(tier),
            stroke: ENDPOINT_RING,
        });
        self.label(self.x - 28.0, tier, LABEL);
        self.y += LEGEND_ROW;
    }
}
