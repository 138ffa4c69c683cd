//! Hit-testing of segment endpoint circles.

use serde::Serialize;

/// Pointer tolerance in pixels; larger than the drawn circle on purpose.
pub const HIT_RADIUS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Start,
    End,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Start => "start",
            Endpoint::End => "end",
        }
    }
}

/// One drawn segment endpoint and what to say about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotCircle {
    pub x: f64,
    pub y: f64,
    pub segment_id: String,
    #[serde(rename = "type")]
    pub endpoint: Endpoint,
    pub time_hm: String,
    pub price: f64,
    pub peak: bool,
}

impl PlotCircle {
    /// `"{id} {start|end} {HH:MM} {price} ({peak|trough})"`
    pub fn tooltip(&self) -> String {
        format!(
            "{} {} {} {:.2} ({})",
            self.segment_id,
            self.endpoint.as_str(),
            self.time_hm,
            self.price,
            if self.peak { "peak" } else { "trough" }
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HitIndex {
    circles: Vec<PlotCircle>,
}

impl HitIndex {
    pub fn push(&mut self, circle: PlotCircle) {
        self.circles.push(circle);
    }

    pub fn circles(&self) -> &[PlotCircle] {
        &self.circles
    }

    pub fn is_empty(&self) -> bool {
        self.circles.is_empty()
    }

    /// Nearest circle within [`HIT_RADIUS`]; the earlier one wins an exact tie.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<&PlotCircle> {
        self.circles
            .iter()
            .map(|c| (c, (c.x - x).hypot(c.y - y)))
            .filter(|(_, d)| *d <= HIT_RADIUS)
            .fold(None, |best: Option<(&PlotCircle, f64)>, (c, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((c, d)),
            })
            .map(|(c, _)| c)
    }
}
