//! Read-only queries over the datasets: what the CLI and the HTTP surface ask for.
//!
//! Every query is a bounded set of file reads followed by pure computation.
//! Missing asset/date is the only user-facing error; an absent dataset is an
//! empty answer.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Serialize;

use crate::domain::chart::ChartData;
use crate::domain::dataset::{DatasetKey, DatasetKind, file_stem};
use crate::domain::error::SegviewError;
use crate::domain::locator::{Locator, Resolver};
use crate::domain::record::{Record, parse_records};
use crate::domain::segment::load_segments;
use crate::domain::series::{htf_band_series, rev_avwap_series, trade_avwap_segments};
use crate::domain::session::{SessionWindow, hm_to_min, parse_start_time_to_min, record_time};
use crate::domain::settings::Settings;
use crate::domain::trade::load_trades;
use crate::ports::data_port::{DataPort, FileEntry};

/// Alert records of one key inside an optional time window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertRecords {
    #[serde(rename = "bars")]
    pub records: Vec<Record>,
    #[serde(rename = "file")]
    pub source_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassifiedRecords {
    pub records: Vec<Record>,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub name: String,
    #[serde(rename = "count")]
    pub record_count: usize,
}

/// Distinct assets, dates and timeframes present in the classified directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassifiedMeta {
    pub assets: Vec<String>,
    pub dates: Vec<String>,
    pub tf: Vec<String>,
}

/// Optional `HHMM` bounds, inclusive on both ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_min: Option<u32>,
    pub end_min: Option<u32>,
}

impl TimeWindow {
    /// Unparseable or empty bounds are open.
    pub fn from_hm(start_hm: Option<&str>, end_hm: Option<&str>) -> Self {
        Self {
            start_min: start_hm.and_then(hm_to_min),
            end_min: end_hm.and_then(hm_to_min),
        }
    }

    /// A missing minute is always inside.
    pub fn contains(&self, min: Option<u32>) -> bool {
        let Some(min) = min else {
            return true;
        };
        self.start_min.is_none_or(|s| min >= s) && self.end_min.is_none_or(|e| min <= e)
    }
}

pub struct DataQueries<'a> {
    locator: Locator<'a>,
    session: SessionWindow,
}

impl<'a> DataQueries<'a> {
    pub fn new(port: &'a dyn DataPort, settings: &'a Settings) -> Self {
        Self {
            locator: Locator::new(port, &settings.dirs),
            session: settings.session,
        }
    }

    pub fn locator(&self) -> &Locator<'a> {
        &self.locator
    }

    pub fn session(&self) -> SessionWindow {
        self.session
    }

    /// Everything one chart of `(asset, date, tf)` draws.
    pub fn segments_and_series(&self, asset: &str, date: &str, tf: &str) -> Result<ChartData, SegviewError> {
        let key = DatasetKey::with_timeframe(asset, date, tf)?;
        let timeframe = key.timeframe();
        let session = self.session;

        let segments = load_segments(&self.locator, &key);
        let alerts: Vec<Record> = self
            .locator
            .alert_files(&key)
            .iter()
            .flat_map(|file| self.alert_file_records(&key, file))
            .collect();
        let raw: Vec<Record> = self
            .locator
            .segment_files(DatasetKind::RawVectors, &key)
            .iter()
            .flat_map(|file| self.read_records(file))
            .collect();
        let trades = load_trades(&self.locator, &key, session);
        let band = htf_band_series(&raw, &session, timeframe);
        let trade_avwap = trade_avwap_segments(&raw, &trades, &session, timeframe);

        tracing::debug!(
            key = %key.tf_stem(),
            segments = segments.len(),
            alerts = alerts.len(),
            raw = raw.len(),
            trades = trades.len(),
            "assembled chart data"
        );

        Ok(ChartData {
            segments,
            bars_in_session: session.bars(timeframe),
            session_start: session.start_min,
            session_end: session.end_min,
            rev_avwap_series: rev_avwap_series(&alerts, &session, timeframe),
            htf_vwap_series: band.htf_vwap,
            atr_upper_series: band.atr_upper,
            atr_lower_series: band.atr_lower,
            trades,
            trade_avwap_segments: trade_avwap,
        })
    }

    /// Records of the first alert file for the key whose bar time falls in
    /// `window`. Records without a parseable time are kept.
    pub fn alert_records_in_window(
        &self,
        asset: &str,
        date: &str,
        tf: &str,
        window: TimeWindow,
    ) -> Result<AlertRecords, SegviewError> {
        let key = DatasetKey::new(asset, date, tf)?;
        let files = self.locator.alert_files(&key);
        let Some(file) = files.first() else {
            let mut error = format!("no alert file for {} / {}", key.asset, key.date);
            if key.has_timeframe() {
                error.push_str(&format!(" / {}", key.tf));
            }
            return Ok(AlertRecords {
                error: Some(error),
                ..AlertRecords::default()
            });
        };
        let content = match self.locator.port().read_to_string(&file.path) {
            Ok(content) => content,
            Err(e) => {
                return Ok(AlertRecords {
                    records: Vec::new(),
                    source_file: Some(file.name.clone()),
                    error: Some(e.to_string()),
                });
            }
        };
        let records = parse_records(content.lines())
            .into_iter()
            .filter(|r| belongs_to_asset(&key, file, r))
            .filter(|r| window.contains(record_time(r).and_then(parse_start_time_to_min)))
            .collect();
        Ok(AlertRecords {
            records,
            source_file: Some(file.name.clone()),
            error: None,
        })
    }

    /// Every classified record of the key, filtered on `start_time`.
    pub fn classified_records(
        &self,
        asset: &str,
        date: &str,
        tf: &str,
        window: TimeWindow,
    ) -> Result<ClassifiedRecords, SegviewError> {
        let key = DatasetKey::with_timeframe(asset, date, tf)?;
        let prefix = key.segment_prefix();
        let files = self
            .locator
            .first_match(DatasetKind::Classified, |_, f| file_stem(&f.name).starts_with(&prefix));
        let records = files
            .iter()
            .flat_map(|file| self.read_records(file))
            .filter(|r| window.contains(r.text("start_time").and_then(parse_start_time_to_min)))
            .collect();
        Ok(ClassifiedRecords {
            records,
            files: files.into_iter().map(|f| f.name).collect(),
        })
    }

    /// Files of a kind with their record counts, newest first.
    pub fn list_files_of_kind(&self, kind: DatasetKind) -> Vec<FileSummary> {
        let port = self.locator.port();
        self.locator
            .list_files(kind)
            .into_iter()
            .map(|f| FileSummary {
                record_count: port.count_lines(&f.path),
                name: f.name,
            })
            .collect()
    }

    pub fn classified_meta(&self) -> ClassifiedMeta {
        let dir = Resolver::Dir(self.locator.classified_dir());
        let mut assets = BTreeSet::new();
        let mut dates = BTreeSet::new();
        let mut tfs = BTreeSet::new();
        for file in self.locator.candidates(DatasetKind::Classified, &dir) {
            let parts: Vec<&str> = file_stem(&file.name).split('_').collect();
            match parts.as_slice() {
                [asset, date, tf, _, _] => {
                    assets.insert(asset.to_string());
                    dates.insert(date.to_string());
                    tfs.insert(tf.to_string());
                }
                [asset, date, _, _] => {
                    assets.insert(asset.to_string());
                    dates.insert(date.to_string());
                    tfs.insert("D".to_string());
                }
                _ => {}
            }
        }
        ClassifiedMeta {
            assets: assets.into_iter().collect(),
            dates: dates.into_iter().collect(),
            tf: tfs.into_iter().collect(),
        }
    }

    /// Full text of one dataset file, looked up by bare name along the
    /// kind's resolver chain.
    pub fn read_raw_file(&self, kind: DatasetKind, name: &str) -> Result<String, SegviewError> {
        if !is_bare_file_name(name) {
            return Err(SegviewError::InvalidFileName(name.to_string()));
        }
        let port = self.locator.port();
        for resolver in self.locator.resolvers(kind) {
            let path = match &resolver {
                Resolver::Dir(dir) => dir.join(name),
                Resolver::File(file) => {
                    if file.file_name().and_then(|n| n.to_str()) != Some(name) {
                        continue;
                    }
                    file.clone()
                }
            };
            if port.is_file(&path) {
                return port.read_to_string(&path);
            }
        }
        Err(SegviewError::FileNotFound(name.to_string()))
    }

    fn read_records(&self, file: &FileEntry) -> Vec<Record> {
        match self.locator.port().read_to_string(&file.path) {
            Ok(content) => parse_records(content.lines()),
            Err(e) => {
                tracing::warn!(file = %file.name, error = %e, "cannot read dataset file");
                Vec::new()
            }
        }
    }

    fn alert_file_records(&self, key: &DatasetKey, file: &FileEntry) -> Vec<Record> {
        self.read_records(file)
            .into_iter()
            .filter(|r| belongs_to_asset(key, file, r))
            .collect()
    }
}

/// Combined logs mix assets; per-key files are trusted as-is.
fn belongs_to_asset(key: &DatasetKey, file: &FileEntry, record: &Record) -> bool {
    let stem = file_stem(&file.name);
    if key.matches_tf_stem(stem) || key.matches_day_stem(stem) {
        return true;
    }
    match record
        .first_text(&["ticker", "tickerid"])
        .filter(|t| !t.is_empty())
    {
        Some(ticker) => ticker.eq_ignore_ascii_case(&key.asset),
        None => true,
    }
}

fn is_bare_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && !name.contains("..")
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineCountMismatch {
    pub stem: String,
    pub raw: usize,
    pub classified: usize,
}

/// Raw-vector vs classified pairing diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub raw_files: usize,
    pub classified_files: usize,
    /// Stems with raw vectors but no classified file, and their line counts.
    pub raw_only: Vec<(String, usize)>,
    pub classified_only: Vec<String>,
    pub mismatched: Vec<LineCountMismatch>,
}

impl MatchReport {
    pub fn is_clean(&self) -> bool {
        self.raw_only.is_empty() && self.classified_only.is_empty() && self.mismatched.is_empty()
    }
}

/// Compare stems and non-blank line counts of two directories of `.jsonl` files.
pub fn check_match(port: &dyn DataPort, raw_dir: &Path, classified_dir: &Path) -> Result<MatchReport, SegviewError> {
    let raw = stem_line_counts(port, raw_dir)?;
    let classified = stem_line_counts(port, classified_dir)?;

    let raw_only = raw
        .iter()
        .filter(|(stem, _)| !classified.contains_key(*stem))
        .map(|(stem, n)| (stem.clone(), *n))
        .collect();
    let classified_only = classified
        .keys()
        .filter(|stem| !raw.contains_key(*stem))
        .cloned()
        .collect();
    let mismatched = raw
        .iter()
        .filter_map(|(stem, &r)| {
            let &c = classified.get(stem)?;
            (r != c).then(|| LineCountMismatch {
                stem: stem.clone(),
                raw: r,
                classified: c,
            })
        })
        .collect();

    Ok(MatchReport {
        raw_files: raw.len(),
        classified_files: classified.len(),
        raw_only,
        classified_only,
        mismatched,
    })
}

fn stem_line_counts(port: &dyn DataPort, dir: &Path) -> Result<BTreeMap<String, usize>, SegviewError> {
    if !port.is_dir(dir) {
        return Err(SegviewError::FileNotFound(dir.display().to_string()));
    }
    Ok(port
        .list_dir(dir)?
        .into_iter()
        .filter(|f| f.name.to_ascii_lowercase().ends_with(".jsonl"))
        .map(|f| (file_stem(&f.name).to_string(), port.count_lines(&f.path)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fs_data_adapter::FsDataAdapter;
    use crate::domain::settings::DataDirs;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn settings(root: &Path) -> Settings {
        Settings {
            dirs: DataDirs::rooted_at(root),
            session: SessionWindow::default(),
            listen: "127.0.0.1:0".into(),
            static_dir: root.join("static"),
        }
    }

    fn lines(n: usize, last: &str) -> String {
        let mut body: String = (0..n - 1).map(|i| format!("{{\"bar\":{i}}}\n")).collect();
        body.push_str(last);
        body.push('\n');
        body
    }

    const SUMMARY: &str = r#"{"start_time":"2024-01-05 09:30:00","duration_min":100,"p0_close":100.0,"p1_close":101.5,"tier":"high_quality","segment_id":"AAPL_20240105_5_000_020"}"#;

    #[test]
    fn chart_data_pairs_segments_with_raw_vectors() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("classified/AAPL_20240105_5_000_020.jsonl"), &lines(21, SUMMARY));
        touch(
            &root.path().join("raw_vectors/AAPL_20240105_5_000_020.jsonl"),
            &lines(21, r#"{"time":"2024-01-05 09:35:00","htfVwap":100.2,"atrNow":0.5}"#),
        );
        touch(
            &root.path().join("alerts/AAPL_20240105_5.jsonl"),
            "{\"time\":\"2024-01-05 09:45:00\",\"REV_avwap\":48.72}\n",
        );

        let s = settings(root.path());
        let port = FsDataAdapter::new();
        let data = DataQueries::new(&port, &s)
            .segments_and_series("AAPL", "20240105", "5")
            .unwrap();

        assert_eq!(data.segments.len(), 1);
        let seg = &data.segments[0];
        assert_eq!((seg.start_min, seg.end_min), (570, 670));
        assert!(!seg.start_is_peak());
        assert_eq!(data.bars_in_session, 108);
        assert_eq!(data.rev_avwap_series.len(), 1);
        assert_eq!(data.rev_avwap_series[0].min, 585);
        assert_eq!(data.htf_vwap_series.len(), 1);
        assert_eq!(data.atr_upper_series[0].min, data.atr_lower_series[0].min);
    }

    #[test]
    fn chart_data_requires_timeframe() {
        let root = TempDir::new().unwrap();
        let s = settings(root.path());
        let port = FsDataAdapter::new();
        let err = DataQueries::new(&port, &s)
            .segments_and_series("AAPL", "20240105", "")
            .unwrap_err();
        assert!(matches!(err, SegviewError::MissingInput { .. }));
    }

    #[test]
    fn alerts_window_filters_by_bar_time() {
        let root = TempDir::new().unwrap();
        touch(
            &root.path().join("alerts/AAPL_20240105_5.jsonl"),
            concat!(
                "{\"time\":\"2024-01-05 09:25:00\"}\n",
                "{\"time\":\"2024-01-05 09:45:00\"}\n",
                "{\"close\":1}\n",
                "{\"time\":\"2024-01-05 11:00:00\"}\n",
            ),
        );
        let s = settings(root.path());
        let port = FsDataAdapter::new();
        let q = DataQueries::new(&port, &s);
        let got = q
            .alert_records_in_window("AAPL", "20240105", "5", TimeWindow::from_hm(Some("0930"), Some("1030")))
            .unwrap();
        assert_eq!(got.source_file.as_deref(), Some("AAPL_20240105_5.jsonl"));
        assert_eq!(got.records.len(), 2);
        assert!(got.error.is_none());
    }

    #[test]
    fn missing_alert_file_is_an_informational_error() {
        let root = TempDir::new().unwrap();
        let s = settings(root.path());
        let port = FsDataAdapter::new();
        let got = DataQueries::new(&port, &s)
            .alert_records_in_window("MSFT", "20240105", "5", TimeWindow::default())
            .unwrap();
        assert!(got.records.is_empty());
        assert_eq!(got.error.as_deref(), Some("no alert file for MSFT / 20240105 / 5"));
    }

    #[test]
    fn combined_alert_log_keeps_matching_ticker() {
        let root = TempDir::new().unwrap();
        touch(
            &root.path().join("alerts.jsonl"),
            concat!(
                "{\"ticker\":\"aapl\",\"time\":\"2024-01-05 09:45:00\",\"REV_avwap\":1.0}\n",
                "{\"ticker\":\"MSFT\",\"time\":\"2024-01-05 09:50:00\",\"REV_avwap\":2.0}\n",
                "{\"time\":\"2024-01-05 09:55:00\",\"REV_avwap\":3.0}\n",
            ),
        );
        let s = settings(root.path());
        let port = FsDataAdapter::new();
        let got = DataQueries::new(&port, &s)
            .alert_records_in_window("AAPL", "20240105", "5", TimeWindow::default())
            .unwrap();
        assert_eq!(got.records.len(), 2);
    }

    #[test]
    fn classified_records_window_uses_start_time() {
        let root = TempDir::new().unwrap();
        touch(
            &root.path().join("classified/AAPL_20240105_5_000_020.jsonl"),
            "{\"start_time\":\"2024-01-05 09:30:00\"}\n{\"bar\":1}\n",
        );
        touch(
            &root.path().join("classified/AAPL_20240105_5_020_040.jsonl"),
            "{\"start_time\":\"2024-01-05 12:00:00\"}\n",
        );
        touch(&root.path().join("classified/MSFT_20240105_5_000_020.jsonl"), "{}\n");
        let s = settings(root.path());
        let port = FsDataAdapter::new();
        let got = DataQueries::new(&port, &s)
            .classified_records("AAPL", "20240105", "5", TimeWindow::from_hm(None, Some("1100")))
            .unwrap();
        assert_eq!(got.files.len(), 2);
        assert_eq!(got.records.len(), 2);
    }

    #[test]
    fn classified_meta_reads_stems() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("classified");
        touch(&dir.join("MSFT_20240108_15_000_010.jsonl"), "{}\n");
        touch(&dir.join("AAPL_20240105_5_000_020.jsonl"), "{}\n");
        touch(&dir.join("AAPL_20240105_000_001.jsonl"), "{}\n");
        touch(&dir.join("AAPL_20240105_5.jsonl"), "{}\n");
        let s = settings(root.path());
        let port = FsDataAdapter::new();
        let meta = DataQueries::new(&port, &s).classified_meta();
        assert_eq!(meta.assets, ["AAPL", "MSFT"]);
        assert_eq!(meta.dates, ["20240105", "20240108"]);
        assert_eq!(meta.tf, ["15", "5", "D"]);
    }

    #[test]
    fn raw_file_names_must_be_bare() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("raw_vectors/AAPL_20240105_5.jsonl"), "{}\n{}\n");
        let s = settings(root.path());
        let port = FsDataAdapter::new();
        let q = DataQueries::new(&port, &s);
        assert_eq!(
            q.read_raw_file(DatasetKind::RawVectors, "AAPL_20240105_5.jsonl").unwrap(),
            "{}\n{}\n"
        );
        for bad in ["../secret", "a/b.jsonl", "", ".."] {
            assert!(matches!(
                q.read_raw_file(DatasetKind::RawVectors, bad),
                Err(SegviewError::InvalidFileName(_))
            ));
        }
        assert!(matches!(
            q.read_raw_file(DatasetKind::RawVectors, "nope.jsonl"),
            Err(SegviewError::FileNotFound(_))
        ));
    }

    #[test]
    fn list_files_counts_records() {
        let root = TempDir::new().unwrap();
        touch(&root.path().join("trades/t.jsonl"), "{}\n\n{}\n");
        let s = settings(root.path());
        let port = FsDataAdapter::new();
        let files = DataQueries::new(&port, &s).list_files_of_kind(DatasetKind::Trades);
        assert_eq!(files, vec![FileSummary { name: "t.jsonl".into(), record_count: 2 }]);
    }

    #[test]
    fn check_match_reports_each_discrepancy() {
        let root = TempDir::new().unwrap();
        let raw = root.path().join("raw");
        let cls = root.path().join("cls");
        touch(&raw.join("A_1_5_000_010.jsonl"), "{}\n{}\n");
        touch(&cls.join("A_1_5_000_010.jsonl"), "{}\n{}\n");
        touch(&raw.join("A_1_5_010_020.jsonl"), "{}\n{}\n{}\n");
        touch(&cls.join("A_1_5_010_020.jsonl"), "{}\n");
        touch(&raw.join("A_1_5_020_030.jsonl"), "{}\n");
        touch(&cls.join("A_1_5_030_040.jsonl"), "{}\n");

        let port = FsDataAdapter::new();
        let report = check_match(&port, &raw, &cls).unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.raw_files, 3);
        assert_eq!(report.raw_only, vec![("A_1_5_020_030".to_string(), 1)]);
        assert_eq!(report.classified_only, ["A_1_5_030_040"]);
        assert_eq!(
            report.mismatched,
            vec![LineCountMismatch { stem: "A_1_5_010_020".into(), raw: 3, classified: 1 }]
        );
        assert!(check_match(&port, &root.path().join("missing"), &cls).is_err());
    }
}
