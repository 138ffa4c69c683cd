//! HTTP request handlers for web adapter.

use askama::Template;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::adapters::svg_chart::scene_to_svg;
use crate::domain::chart::hit::PlotCircle;
use crate::domain::chart::render::{CanvasSize, render};
use crate::domain::chart::scene::Scene;
use crate::domain::dataset::DatasetKind;
use crate::domain::error::SegviewError;
use crate::domain::query::{FileSummary, TimeWindow};
use crate::domain::session::format_hm;

use super::{AppState, WebError, templates};

/// `(asset, date, tf)` plus an optional `HHMM` window.
#[derive(Debug, Default, Deserialize)]
pub struct KeyParams {
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub tf: String,
    pub start_hm: Option<String>,
    pub end_hm: Option<String>,
}

impl KeyParams {
    fn window(&self) -> TimeWindow {
        TimeWindow::from_hm(self.start_hm.as_deref(), self.end_hm.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PlotParams {
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub tf: String,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl PlotParams {
    fn canvas(&self) -> CanvasSize {
        let default = CanvasSize::default();
        CanvasSize {
            width: self.width.unwrap_or(default.width),
            height: self.height.unwrap_or(default.height),
        }
    }
}

/// Plot parameters plus the pointer position in canvas pixels.
#[derive(Debug, Deserialize)]
pub struct HitParams {
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub tf: String,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub x: f64,
    pub y: f64,
}

impl HitParams {
    fn plot(&self) -> PlotParams {
        PlotParams {
            asset: self.asset.clone(),
            date: self.date.clone(),
            tf: self.tf.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawFileParams {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Serialize)]
struct FileListing {
    files: Vec<FileSummary>,
}

#[derive(Serialize)]
struct HitResponse<'a> {
    hit: Option<&'a PlotCircle>,
    tooltip: Option<String>,
}

fn no_store<T: Serialize>(value: T) -> Response {
    ([(header::CACHE_CONTROL, "no-store")], Json(value)).into_response()
}

fn render_plot(state: &AppState, params: &PlotParams) -> Result<Scene, WebError> {
    let data = state
        .queries()
        .segments_and_series(&params.asset, &params.date, &params.tf)?;
    Ok(render(&data, params.canvas())?)
}

pub async fn dashboard(State(state): State<Arc<AppState>>) -> Result<Response, WebError> {
    let meta = state.queries().classified_meta();
    let session = state.settings.session;
    let session = format!(
        "{} to {}",
        format_hm(i64::from(session.start_min)),
        format_hm(i64::from(session.end_min))
    );
    let template = templates::DashboardTemplate {
        meta: &meta,
        session: &session,
        kinds: &DatasetKind::ALL,
        tiers: templates::tier_swatches(),
    };
    let html = template
        .render()
        .map_err(|e| WebError::internal(e.to_string()).page())?;
    Ok(Html(html).into_response())
}

pub async fn classified_meta(State(state): State<Arc<AppState>>) -> Response {
    no_store(state.queries().classified_meta())
}

pub async fn raw_listing(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<Response, WebError> {
    let kind: DatasetKind = kind
        .parse()
        .map_err(|e: SegviewError| WebError::not_found(e.to_string()))?;
    let files = state.queries().list_files_of_kind(kind);
    Ok(no_store(FileListing { files }))
}

pub async fn raw_file(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RawFileParams>,
) -> Result<Response, WebError> {
    if params.name.is_empty() {
        return Err(WebError::bad_request("kind and name required"));
    }
    let kind: DatasetKind = params.kind.parse()?;
    let text = state.queries().read_raw_file(kind, &params.name)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        text,
    )
        .into_response())
}

pub async fn classified_records(
    State(state): State<Arc<AppState>>,
    Query(params): Query<KeyParams>,
) -> Result<Response, WebError> {
    let records = state.queries().classified_records(
        &params.asset,
        &params.date,
        &params.tf,
        params.window(),
    )?;
    Ok(no_store(records))
}

pub async fn alert_bars(
    State(state): State<Arc<AppState>>,
    Query(params): Query<KeyParams>,
) -> Result<Response, WebError> {
    let bars = state.queries().alert_records_in_window(
        &params.asset,
        &params.date,
        &params.tf,
        params.window(),
    )?;
    Ok(no_store(bars))
}

pub async fn plot_vectors(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlotParams>,
) -> Result<Response, WebError> {
    let data = state
        .queries()
        .segments_and_series(&params.asset, &params.date, &params.tf)?;
    Ok(no_store(data))
}

pub async fn plot_svg(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlotParams>,
) -> Result<Response, WebError> {
    let scene = render_plot(&state, &params)?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        scene_to_svg(&scene),
    )
        .into_response())
}

pub async fn plot_hit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HitParams>,
) -> Result<Response, WebError> {
    let scene = render_plot(&state, &params.plot())?;
    let hit = scene.hits.hit_test(params.x, params.y);
    Ok(no_store(HitResponse {
        hit,
        tooltip: hit.map(PlotCircle::tooltip),
    }))
}

pub async fn not_found() -> WebError {
    WebError::new(StatusCode::NOT_FOUND, "Page not found").page()
}
