//! Segment assembly: one [`Segment`] per classified segment file.
//!
//! A classified file's last parseable line is the segment summary. A file
//! only produces a segment when its raw-vector companion exists and has the
//! same number of non-blank lines, so half-written pairs never reach the chart.

use serde::Serialize;

use crate::domain::dataset::{DatasetKey, DatasetKind, file_stem};
use crate::domain::locator::Locator;
use crate::domain::record::{FieldValue, Record, non_blank_lines, parse_records};
use crate::domain::session::{MINUTES_PER_DAY, format_hm, parse_start_time_to_min};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub segment_id: String,
    pub start_min: u32,
    pub end_min: u32,
    pub start_hm: String,
    pub end_hm: String,
    pub close_first: f64,
    pub close_last: f64,
    pub tier: String,
}

impl Segment {
    /// Whether the start endpoint is the local high. The end endpoint is
    /// always the opposite.
    pub fn start_is_peak(&self) -> bool {
        self.close_first > self.close_last
    }
}

/// What the assembler needs to know about one classified file.
#[derive(Debug, Clone)]
pub struct SegmentSource {
    pub stem: String,
    pub line_count: usize,
    pub companion_line_count: Option<usize>,
    pub summary: Option<Record>,
}

/// Summary record to segment, `None` when a required field is unusable.
pub fn segment_from_summary(stem: &str, summary: &Record) -> Option<Segment> {
    let start_min = summary
        .text("start_time")
        .and_then(parse_start_time_to_min)?;
    let duration = summary.number("duration_min")?;
    let close_first = summary.number("p0_close")?;
    let close_last = summary.number("p1_close")?;

    if !(0.0..=f64::from(MINUTES_PER_DAY)).contains(&duration) {
        return None;
    }
    let end_min = start_min.checked_add(duration.round() as u32)?;

    let tier = match summary.field("tier") {
        FieldValue::Text(s) => s.to_string(),
        FieldValue::Number(_) => summary.display("tier").unwrap_or_default(),
        _ => String::new(),
    };
    let segment_id = summary
        .display("segment_id")
        .unwrap_or_else(|| stem.to_string());

    Some(Segment {
        segment_id,
        start_min,
        end_min,
        start_hm: format_hm(i64::from(start_min)),
        end_hm: format_hm(i64::from(end_min)),
        close_first,
        close_last,
        tier,
    })
}

/// Build segments from sources already sorted by stem. Output is stably
/// sorted by start minute.
pub fn assemble(sources: impl IntoIterator<Item = SegmentSource>) -> Vec<Segment> {
    let mut segments: Vec<Segment> = sources
        .into_iter()
        .filter_map(|src| {
            if src.line_count == 0 {
                return None;
            }
            if src.companion_line_count != Some(src.line_count) {
                tracing::debug!(
                    stem = %src.stem,
                    lines = src.line_count,
                    companion = ?src.companion_line_count,
                    "skipping segment without matching raw vectors"
                );
                return None;
            }
            let segment = src
                .summary
                .as_ref()
                .and_then(|summary| segment_from_summary(&src.stem, summary));
            if segment.is_none() {
                tracing::debug!(stem = %src.stem, "skipping segment with unusable summary");
            }
            segment
        })
        .collect();
    segments.sort_by_key(|s| s.start_min);
    segments
}

/// Read every classified segment file of `key` and assemble the segments.
pub fn load_segments(locator: &Locator<'_>, key: &DatasetKey) -> Vec<Segment> {
    let port = locator.port();
    let sources = locator
        .segment_files(DatasetKind::Classified, key)
        .into_iter()
        .filter_map(|file| {
            let content = match port.read_to_string(&file.path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(file = %file.name, error = %e, "cannot read classified file");
                    return None;
                }
            };
            let stem = file_stem(&file.name).to_string();
            let line_count = non_blank_lines(&content).count();
            let companion_line_count = locator
                .find_by_stem(DatasetKind::RawVectors, &stem)
                .map(|path| port.count_lines(&path));
            let summary = parse_records(non_blank_lines(&content)).pop();
            Some(SegmentSource {
                stem,
                line_count,
                companion_line_count,
                summary,
            })
        });
    assemble(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::parse_line;

    fn source(stem: &str, lines: usize, companion: Option<usize>, json: &str) -> SegmentSource {
        SegmentSource {
            stem: stem.to_string(),
            line_count: lines,
            companion_line_count: companion,
            summary: Some(parse_line(json).unwrap()),
        }
    }

    const SUMMARY: &str = r#"{"start_time":"2024-01-05 09:30:00","duration_min":100,"p0_close":185.2,"p1_close":187.9,"tier":"A"}"#;

    #[test]
    fn summary_becomes_segment() {
        let segs = assemble([source("AAPL_20240105_5_000_020", 20, Some(20), SUMMARY)]);
        assert_eq!(segs.len(), 1);
        let s = &segs[0];
        assert_eq!(s.start_min, 570);
        assert_eq!(s.end_min, 670);
        assert_eq!(s.start_hm, "09:30");
        assert_eq!(s.end_hm, "11:10");
        assert_eq!(s.tier, "A");
        assert_eq!(s.segment_id, "AAPL_20240105_5_000_020");
        assert!(!s.start_is_peak());
    }

    #[test]
    fn line_count_mismatch_is_skipped() {
        assert!(assemble([source("s", 20, Some(19), SUMMARY)]).is_empty());
        assert!(assemble([source("s", 20, None, SUMMARY)]).is_empty());
        assert!(assemble([source("s", 0, Some(0), SUMMARY)]).is_empty());
    }

    #[test]
    fn unusable_summary_is_skipped() {
        let bad_time = r#"{"start_time":"09:30","duration_min":10,"p0_close":1,"p1_close":2}"#;
        let str_duration = r#"{"start_time":"2024-01-05 09:30:00","duration_min":"10","p0_close":1,"p1_close":2}"#;
        let no_close = r#"{"start_time":"2024-01-05 09:30:00","duration_min":10,"p0_close":1}"#;
        let huge_duration = r#"{"start_time":"2024-01-05 09:30:00","duration_min":1e300,"p0_close":1,"p1_close":2}"#;
        let negative_duration = r#"{"start_time":"2024-01-05 09:30:00","duration_min":-5,"p0_close":1,"p1_close":2}"#;
        for json in [bad_time, str_duration, no_close, huge_duration, negative_duration] {
            assert!(assemble([source("s", 1, Some(1), json)]).is_empty(), "{json}");
        }
    }

    #[test]
    fn numeric_tier_and_explicit_id() {
        let json = r#"{"start_time":"2024-01-05 10:00:00","duration_min":15,"p0_close":2,"p1_close":1,"tier":2,"segment_id":"seg-9"}"#;
        let segs = assemble([source("s", 1, Some(1), json)]);
        assert_eq!(segs[0].tier, "2");
        assert_eq!(segs[0].segment_id, "seg-9");
        assert!(segs[0].start_is_peak());
    }

    #[test]
    fn missing_tier_is_empty() {
        let json = r#"{"start_time":"2024-01-05 10:00:00","duration_min":15,"p0_close":2,"p1_close":1}"#;
        assert_eq!(assemble([source("s", 1, Some(1), json)])[0].tier, "");
    }

    #[test]
    fn sorted_by_start_minute() {
        let late = r#"{"start_time":"2024-01-05 11:00:00","duration_min":5,"p0_close":1,"p1_close":2}"#;
        let early = r#"{"start_time":"2024-01-05 09:35:00","duration_min":5,"p0_close":1,"p1_close":2}"#;
        let segs = assemble([source("a", 1, Some(1), late), source("b", 1, Some(1), early)]);
        let starts: Vec<u32> = segs.iter().map(|s| s.start_min).collect();
        assert_eq!(starts, [575, 660]);
    }
}
