//! End-to-end tests from files on disk to chart data, scene and SVG.

mod common;

use approx::assert_relative_eq;
use common::*;
use segview::adapters::fs_data_adapter::FsDataAdapter;
use segview::adapters::svg_chart::scene_to_svg;
use segview::domain::chart::hit::Endpoint;
use segview::domain::chart::render::{CanvasSize, render};
use segview::domain::chart::scene::Layer;
use segview::domain::query::{DataQueries, TimeWindow};
use segview::domain::settings::Settings;
use segview::domain::trade::{Direction, Trade};

const AAPL_SEGMENT: &str = "AAPL_20240105_5_000_020";

fn aapl_root() -> DataRoot {
    let root = DataRoot::new();
    root.segment(
        AAPL_SEGMENT,
        21,
        21,
        &summary("2024-01-05 09:30:00", 100, 100.0, 101.5, "high_quality"),
    );
    root
}

#[test]
fn segment_from_summary_line_end_to_end() {
    let root = aapl_root();
    let settings = root.settings();
    let port = FsDataAdapter::new();
    let data = DataQueries::new(&port, &settings)
        .segments_and_series("AAPL", "20240105", "5")
        .unwrap();

    assert_eq!(data.segments.len(), 1);
    let seg = &data.segments[0];
    assert_eq!(seg.segment_id, AAPL_SEGMENT);
    assert_eq!(seg.start_min, 570);
    assert_eq!(seg.end_min, 670);
    assert_eq!(seg.start_hm, "09:30");
    assert_eq!(seg.end_hm, "11:10");
    assert_eq!(seg.tier, "high_quality");
    // trough to peak
    assert!(!seg.start_is_peak());
    assert_eq!(data.session_start, 510);
    assert_eq!(data.session_end, 1050);
    assert_eq!(data.bars_in_session, 108);
}

#[test]
fn line_count_mismatch_excludes_segment() {
    let root = aapl_root();
    root.segment(
        "AAPL_20240105_5_020_040",
        21,
        20,
        &summary("2024-01-05 11:10:00", 100, 101.5, 99.0, "low_quality"),
    );
    let settings = root.settings();
    let port = FsDataAdapter::new();
    let data = DataQueries::new(&port, &settings)
        .segments_and_series("AAPL", "20240105", "5")
        .unwrap();
    let ids: Vec<_> = data.segments.iter().map(|s| s.segment_id.as_str()).collect();
    assert_eq!(ids, [AAPL_SEGMENT]);
}

#[test]
fn missing_companion_excludes_segment() {
    let root = DataRoot::new();
    root.write_lines(
        "classified/AAPL_20240105_5_000_020.jsonl",
        &[summary("2024-01-05 09:30:00", 100, 100.0, 101.5, "x")],
    );
    let settings = root.settings();
    let port = FsDataAdapter::new();
    let data = DataQueries::new(&port, &settings)
        .segments_and_series("AAPL", "20240105", "5")
        .unwrap();
    assert!(data.segments.is_empty());
}

#[test]
fn malformed_trailing_line_falls_back_to_last_parseable_summary() {
    let root = DataRoot::new();
    root.write_lines(
        "classified/AAPL_20240105_5_000_003.jsonl",
        &[
            r#"{"bar_index":0}"#.to_string(),
            summary("2024-01-05 10:00:00", 15, 50.0, 49.0, "medium_quality"),
            "{not json".to_string(),
        ],
    );
    root.write_lines("raw_vectors/AAPL_20240105_5_000_003.jsonl", &filler(3));
    let settings = root.settings();
    let port = FsDataAdapter::new();
    let data = DataQueries::new(&port, &settings)
        .segments_and_series("AAPL", "20240105", "5")
        .unwrap();
    assert_eq!(data.segments.len(), 1);
    assert_eq!(data.segments[0].start_min, 600);
    assert_eq!(data.segments[0].end_min, 615);
    assert!(data.segments[0].start_is_peak());
}

#[test]
fn rev_avwap_from_alert_file() {
    let root = aapl_root();
    root.write(
        "alerts/AAPL_20240105_5.jsonl",
        "{\"time\":\"2024-01-05 09:45:00\",\"close\":48.70,\"REV_avwap\":48.72,\"revDir\":1}\n",
    );
    let settings = root.settings();
    let port = FsDataAdapter::new();
    let data = DataQueries::new(&port, &settings)
        .segments_and_series("AAPL", "20240105", "5")
        .unwrap();
    assert_eq!(data.rev_avwap_series.len(), 1);
    assert_eq!(data.rev_avwap_series[0].min, 585);
    assert_relative_eq!(data.rev_avwap_series[0].value, 48.72);
}

#[test]
fn trades_and_trade_avwap_from_logs() {
    let root = DataRoot::new();
    root.write_lines(
        "classified/AAPL_20240105_5_000_004.jsonl",
        &[
            r#"{"bar_index":0}"#.to_string(),
            r#"{"bar_index":1}"#.to_string(),
            r#"{"bar_index":2}"#.to_string(),
            summary("2024-01-05 10:00:00", 15, 185.0, 187.0, "high_quality"),
        ],
    );
    root.write_lines(
        "raw_vectors/AAPL_20240105_5_000_004.jsonl",
        &[
            r#"{"time":"2024-01-05 10:00:00","htfVwap":185.1,"atrNow":0.4,"TRADE_avwap":185.2}"#.to_string(),
            r#"{"time":"2024-01-05 10:05:00","htfVwap":185.3,"TRADE_avwap":185.6}"#.to_string(),
            r#"{"time":"2024-01-05 10:10:00","htfVwap":185.5,"atrNow":0.5,"TRADE_avwap":186.0}"#.to_string(),
            r#"{"time":"2024-01-05 10:15:00","htfVwap":185.7,"TRADE_avwap":186.4}"#.to_string(),
        ],
    );
    root.write_lines(
        "trades/AAPL_20240105_5.jsonl",
        &[
            r#"{"ticker":"AAPL","tf":"5","event":"entry","dir":"B","time":"2024-01-05 10:00:00","entryPx":185.0}"#.to_string(),
            r#"{"ticker":"AAPL","tf":"5","event":"exit","time":"2024-01-05 10:10:00","exitPx":186.1}"#.to_string(),
            r#"{"ticker":"MSFT","tf":"5","event":"entry","time":"2024-01-05 10:00:00","entryPx":370.0}"#.to_string(),
        ],
    );
    let settings = root.settings();
    let port = FsDataAdapter::new();
    let data = DataQueries::new(&port, &settings)
        .segments_and_series("AAPL", "20240105", "5")
        .unwrap();

    assert_eq!(data.segments.len(), 1);
    assert_eq!(data.trades.len(), 1);
    let trade = &data.trades[0];
    assert_eq!(trade.entry_min, Some(600));
    assert_eq!(trade.exit_min, Some(610));
    assert_eq!(trade.dir, Direction::Buy);

    assert_eq!(data.trade_avwap_segments.len(), 1);
    let mins: Vec<u32> = data.trade_avwap_segments[0].points.iter().map(|p| p.min).collect();
    assert_eq!(mins, [600, 605, 610]);

    assert_eq!(data.htf_vwap_series.len(), 4);
    let band: Vec<u32> = data.atr_upper_series.iter().map(|p| p.min).collect();
    assert_eq!(band, [600, 610]);
    assert_relative_eq!(data.atr_lower_series[1].value, 185.0);
}

#[test]
fn daily_timeframe_uses_four_part_stems() {
    let root = DataRoot::new();
    root.segment(
        "AAPL_20240105_000_001",
        2,
        2,
        &summary("2024-01-05 08:30:00", 540, 100.0, 103.0, "high_quality"),
    );
    root.segment(
        "AAPL_20240105_5_000_020",
        2,
        2,
        &summary("2024-01-05 09:30:00", 100, 100.0, 101.5, "high_quality"),
    );
    let settings = root.settings();
    let port = FsDataAdapter::new();
    let data = DataQueries::new(&port, &settings)
        .segments_and_series("AAPL", "20240105", "D")
        .unwrap();
    assert_eq!(data.bars_in_session, 1);
    let ids: Vec<_> = data.segments.iter().map(|s| s.segment_id.as_str()).collect();
    assert_eq!(ids, ["AAPL_20240105_000_001"]);
}

#[test]
fn rendered_chart_is_hit_testable_and_serialisable() {
    let root = aapl_root();
    let settings = root.settings();
    let port = FsDataAdapter::new();
    let data = DataQueries::new(&port, &settings)
        .segments_and_series("AAPL", "20240105", "5")
        .unwrap();
    let scene = render(&data, CanvasSize::default()).unwrap();

    let circles = scene.hits.circles();
    assert_eq!(circles.len(), 2);
    let start = &circles[0];
    assert_eq!(start.endpoint, Endpoint::Start);
    assert!(!start.peak);
    assert!(circles[1].peak);

    let hit = scene.hits.hit_test(start.x + 3.0, start.y - 3.0).unwrap();
    assert_eq!(hit.tooltip(), "AAPL_20240105_5_000_020 start 09:30 100.00 (trough)");
    assert!(scene.hits.hit_test(start.x + 50.0, start.y + 50.0).is_none());

    assert_eq!(scene.layer(Layer::Endpoints).len(), 2);
    let svg = scene_to_svg(&scene);
    assert!(svg.contains(r#"<g class="endpoints">"#));
    assert!(svg.contains(r#"<g class="segment_spans">"#));
}

#[test]
fn unreadable_alert_file_is_reported_not_fatal() {
    let port = MockDataPort::new()
        .with_file(
            "/data/classified/AAPL_20240105_5_000_001.jsonl",
            &summary("2024-01-05 09:30:00", 5, 1.0, 2.0, "x"),
        )
        .with_file("/data/raw_vectors/AAPL_20240105_5_000_001.jsonl", "{}\n")
        .with_unreadable("/data/alerts/AAPL_20240105_5.jsonl");
    let settings = mock_settings("/data");
    let queries = DataQueries::new(&port, &settings);

    let bars = queries
        .alert_records_in_window("AAPL", "20240105", "5", TimeWindow::default())
        .unwrap();
    assert!(bars.records.is_empty());
    assert_eq!(bars.source_file.as_deref(), Some("AAPL_20240105_5.jsonl"));
    assert!(bars.error.unwrap().contains("permission denied"));

    let data = queries.segments_and_series("AAPL", "20240105", "5").unwrap();
    assert_eq!(data.segments.len(), 1);
    assert!(data.rev_avwap_series.is_empty());
}

#[test]
fn alert_override_file_shadows_data_root() {
    let root = DataRoot::new();
    root.write(
        "alerts/AAPL_20240105_5.jsonl",
        "{\"time\":\"2024-01-05 09:45:00\",\"REV_avwap\":1.0}\n",
    );
    let combined = root.write(
        "elsewhere/all_alerts.jsonl",
        concat!(
            "{\"ticker\":\"AAPL\",\"time\":\"2024-01-05 09:50:00\",\"REV_avwap\":2.0}\n",
            "{\"ticker\":\"TSLA\",\"time\":\"2024-01-05 09:55:00\",\"REV_avwap\":3.0}\n",
        ),
    );
    let mut settings = root.settings();
    settings.dirs.alerts_file = Some(combined);
    let port = FsDataAdapter::new();
    let bars = DataQueries::new(&port, &settings)
        .alert_records_in_window("AAPL", "20240105", "5", TimeWindow::default())
        .unwrap();
    assert_eq!(bars.source_file.as_deref(), Some("all_alerts.jsonl"));
    assert_eq!(bars.records.len(), 1);
}

fn chart_trades(settings: &Settings) -> Vec<Trade> {
    let port = FsDataAdapter::new();
    DataQueries::new(&port, settings)
        .segments_and_series("AAPL", "20240105", "5")
        .unwrap()
        .trades
}

#[test]
fn combined_trade_log_is_scanned_when_no_file_is_named_for_the_key() {
    let root = DataRoot::new();
    root.write_lines(
        "trades/b_session.jsonl",
        &[
            r#"{"ticker":"AAPL","tf":"5","event":"exit","time":"2024-01-05 11:00:00","close":12.0}"#.to_string(),
            r#"{"ticker":"MSFT","tf":"5","event":"entry","time":"2024-01-05 10:00:00","close":370.0}"#.to_string(),
        ],
    );
    root.write_lines(
        "trades/a_session.jsonl",
        &[
            r#"{"ticker":"AAPL","tf":"5","event":"entry","dir":"S","time":"2024-01-05 10:00:00","close":11.0}"#.to_string(),
            r#"{"ticker":"AAPL","tf":"5","event":"exit","time":"2024-01-05 10:30:00","close":10.5}"#.to_string(),
            // other day, dropped by the date check
            r#"{"ticker":"AAPL","tf":"5","event":"entry","time":"2024-01-08 10:00:00","close":9.0}"#.to_string(),
            // time without a date fails the date check in a combined log
            r#"{"ticker":"AAPL","tf":"5","event":"entry","time":"10:45","bar_index":20,"close":9.5}"#.to_string(),
        ],
    );
    // later resolver in the chain, never reached
    root.write(
        "trades.jsonl",
        "{\"ticker\":\"AAPL\",\"tf\":\"5\",\"event\":\"entry\",\"time\":\"2024-01-05 12:00:00\",\"close\":1.0}\n",
    );
    let settings = root.settings();

    let trades = chart_trades(&settings);
    // a_session.jsonl is read before b_session.jsonl; the open state resets per file
    assert_eq!(trades.len(), 2);
    assert_eq!(trades[0].entry_min, Some(600));
    assert_eq!(trades[0].exit_min, Some(630));
    assert_eq!(trades[0].dir, Direction::Sell);
    assert_eq!(trades[1].entry_min, None);
    assert_eq!(trades[1].exit_min, Some(660));

    assert_eq!(chart_trades(&settings), trades);
}

#[test]
fn key_named_trade_file_skips_the_date_check() {
    let root = DataRoot::new();
    root.write_lines(
        "trades/AAPL_20240105_5.jsonl",
        &[r#"{"ticker":"AAPL","tf":"5","event":"entry","time":"10:45","bar_index":20,"close":9.5}"#.to_string()],
    );
    root.write_lines(
        "trades/combined.jsonl",
        &[r#"{"ticker":"AAPL","tf":"5","event":"entry","time":"2024-01-05 12:00:00","close":1.0}"#.to_string()],
    );
    let trades = chart_trades(&root.settings());
    // the key-named pass finds a trade, so the combined log is not read
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].entry_min, Some(610));
    assert!(trades[0].is_open());
}
