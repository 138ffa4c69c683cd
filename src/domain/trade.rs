//! Trade pairing: turning entry/exit event records into plotted trades.
//!
//! Event logs mix several conventions. Some write an `entry` record and a
//! later `exit` record; others write one record that already carries both
//! prices. [`TradePairer`] is a small state machine over those events: it
//! remembers the one trade that is currently open and attaches the next exit
//! to it.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::domain::dataset::{DatasetKey, DatasetKind, file_stem};
use crate::domain::locator::Locator;
use crate::domain::record::{FieldValue, Record, parse_records};
use crate::domain::session::{SessionWindow, Timeframe, parse_date_prefix, record_minute, record_time};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// `S`, `s` or `-1` mean sell; everything else is a buy.
    pub fn of(record: &Record) -> Self {
        match record.field("dir") {
            FieldValue::Text("S") | FieldValue::Text("s") => Direction::Sell,
            FieldValue::Number(n) if n == -1.0 => Direction::Sell,
            _ => Direction::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "B",
            Direction::Sell => "S",
        }
    }
}

impl Serialize for Direction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_min: Option<u32>,
    pub exit_min: Option<u32>,
    pub dir: Direction,
    #[serde(rename = "entryPx")]
    pub entry_px: Option<f64>,
    #[serde(rename = "exitPx")]
    pub exit_px: Option<f64>,
    pub entry_bar_index: Option<i64>,
    pub exit_bar_index: Option<i64>,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.entry_min.is_some() && self.exit_min.is_none()
    }
}

/// Decides whether an event record belongs to the (asset, date, tf) being plotted.
#[derive(Debug, Clone)]
pub struct TradeFilter {
    asset: String,
    date: String,
    tf: String,
    want_date: Option<NaiveDate>,
}

impl TradeFilter {
    pub fn new(key: &DatasetKey) -> Self {
        Self {
            asset: key.asset.to_uppercase(),
            date: key.date.clone(),
            tf: key.tf.clone(),
            want_date: parse_date_prefix(&key.date),
        }
    }

    pub fn matches(&self, record: &Record, skip_date_check: bool) -> bool {
        let ticker = record
            .display("ticker")
            .filter(|t| !t.is_empty())
            .or_else(|| record.display("tickerid"))
            .unwrap_or_default()
            .to_uppercase();
        let tf = record.display("tf").unwrap_or_default();
        if ticker != self.asset || tf.trim() != self.tf {
            return false;
        }
        let Some(want) = self.want_date else {
            return true;
        };
        if skip_date_check {
            return true;
        }
        let time = record_time(record);
        if time.and_then(parse_date_prefix) == Some(want) {
            return true;
        }
        let date = record.display("date").map(|d| d.trim().to_string());
        if let Some(d) = &date {
            if *d == self.date || parse_date_prefix(d) == Some(want) {
                return true;
            }
        }
        time.is_none() && date.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct EventPoint {
    min: Option<u32>,
    bar_index: Option<i64>,
    dir: Direction,
    entry_px: Option<f64>,
    exit_px: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TradeEvent {
    Entry(EventPoint),
    Exit(EventPoint),
    /// One record carrying both prices.
    RoundTrip(EventPoint),
    /// Entry price and minute but no event keyword.
    ImplicitEntry(EventPoint),
    Ignored,
}

fn classify(record: &Record, session: &SessionWindow, timeframe: Timeframe) -> TradeEvent {
    let close = record.lenient_number("close");
    let point = EventPoint {
        min: record_minute(record, session, timeframe),
        bar_index: record.lenient_number("bar_index").map(|n| n as i64),
        dir: Direction::of(record),
        entry_px: record.lenient_number("entryPx").or(close),
        exit_px: record.lenient_number("exitPx").or(close),
    };
    let event = record.display("event").unwrap_or_default().to_lowercase();
    match event.as_str() {
        "entry" | "buy" | "sell" | "b" | "s" => TradeEvent::Entry(point),
        "exit" | "close" => TradeEvent::Exit(point),
        _ => match (point.entry_px, point.exit_px, point.min) {
            (Some(_), Some(_), Some(_)) => TradeEvent::RoundTrip(point),
            (Some(_), None, Some(_)) => TradeEvent::ImplicitEntry(point),
            _ => TradeEvent::Ignored,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairerState {
    Flat,
    /// Index into `trades` of the trade awaiting its exit.
    Open(usize),
}

pub struct TradePairer<'a> {
    filter: &'a TradeFilter,
    session: SessionWindow,
    timeframe: Timeframe,
    state: PairerState,
    trades: Vec<Trade>,
}

impl<'a> TradePairer<'a> {
    pub fn new(filter: &'a TradeFilter, session: SessionWindow, timeframe: Timeframe) -> Self {
        Self {
            filter,
            session,
            timeframe,
            state: PairerState::Flat,
            trades: Vec::new(),
        }
    }

    /// Feed one file's records. An entry left open in a previous file is not
    /// closed by exits in this one. Files named exactly `{asset}_{date}_{tf}`
    /// skip the per-record date check.
    pub fn feed_file(&mut self, records: &[Record], skip_date_check: bool) {
        self.state = PairerState::Flat;
        for record in records {
            if !self.filter.matches(record, skip_date_check) {
                continue;
            }
            let event = classify(record, &self.session, self.timeframe);
            self.apply(event);
        }
    }

    fn apply(&mut self, event: TradeEvent) {
        self.state = match (self.state, event) {
            (state, TradeEvent::Exit(p)) if p.min.is_none() => {
                tracing::debug!(bar_index = ?p.bar_index, "dropping exit without a resolvable minute");
                state
            }
            (_, TradeEvent::Entry(p)) | (_, TradeEvent::ImplicitEntry(p)) => {
                self.trades.push(Trade {
                    entry_min: p.min,
                    exit_min: None,
                    dir: p.dir,
                    entry_px: p.entry_px,
                    exit_px: None,
                    entry_bar_index: p.bar_index,
                    exit_bar_index: None,
                });
                PairerState::Open(self.trades.len() - 1)
            }
            (PairerState::Open(idx), TradeEvent::Exit(p)) => {
                if let Some(trade) = self.trades.get_mut(idx) {
                    trade.exit_min = p.min;
                    trade.exit_px = p.exit_px;
                    trade.exit_bar_index = p.bar_index;
                }
                PairerState::Flat
            }
            (PairerState::Flat, TradeEvent::Exit(p)) => {
                tracing::debug!(min = ?p.min, "exit without an open entry");
                self.trades.push(Trade {
                    entry_min: None,
                    exit_min: p.min,
                    dir: p.dir,
                    entry_px: None,
                    exit_px: p.exit_px,
                    entry_bar_index: None,
                    exit_bar_index: p.bar_index,
                });
                PairerState::Flat
            }
            (_, TradeEvent::RoundTrip(p)) => {
                self.trades.push(Trade {
                    entry_min: p.min,
                    exit_min: p.min,
                    dir: p.dir,
                    entry_px: p.entry_px,
                    exit_px: p.exit_px,
                    entry_bar_index: p.bar_index,
                    exit_bar_index: p.bar_index,
                });
                PairerState::Flat
            }
            (state, TradeEvent::Ignored) => state,
        };
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }
}

/// Trades for `key`. Each resolver is tried in turn: first the files named
/// after the key, then every file it holds. The first resolver that yields
/// any trade wins.
pub fn load_trades(locator: &Locator<'_>, key: &DatasetKey, session: SessionWindow) -> Vec<Trade> {
    let filter = TradeFilter::new(key);
    let timeframe = key.timeframe();
    let port = locator.port();
    let read = |path: &std::path::Path| -> Option<Vec<Record>> {
        match port.read_to_string(path) {
            Ok(content) => Some(parse_records(content.lines())),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read trade log");
                None
            }
        }
    };
    let stem_key = key.tf_stem();

    for group in locator.groups(DatasetKind::Trades) {
        let named: Vec<_> = group
            .files
            .iter()
            .filter(|f| key.matches_trade_file(&f.name))
            .collect();
        for pass in [named, group.files.iter().collect()] {
            let mut pairer = TradePairer::new(&filter, session, timeframe);
            for file in pass {
                let Some(records) = read(&file.path) else {
                    continue;
                };
                pairer.feed_file(&records, file_stem(&file.name) == stem_key);
            }
            if !pairer.trades().is_empty() {
                return pairer.into_trades();
            }
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::parse_line;

    fn key() -> DatasetKey {
        DatasetKey::new("AAPL", "240105", "5").unwrap()
    }

    fn records(lines: &[&str]) -> Vec<Record> {
        lines.iter().map(|l| parse_line(l).unwrap()).collect()
    }

    fn pair(lines: &[&str], skip_date_check: bool) -> Vec<Trade> {
        let filter = TradeFilter::new(&key());
        let mut pairer = TradePairer::new(&filter, SessionWindow::default(), Timeframe::Minutes(5));
        pairer.feed_file(&records(lines), skip_date_check);
        pairer.into_trades()
    }

    #[test]
    fn entry_then_exit_pairs_into_one_trade() {
        let trades = pair(
            &[
                r#"{"ticker":"AAPL","tf":"5","event":"entry","dir":"B","time":"2024-01-05 10:00:00","entryPx":185.0}"#,
                r#"{"ticker":"AAPL","tf":"5","event":"exit","time":"2024-01-05 11:30:00","exitPx":187.5}"#,
            ],
            false,
        );
        assert_eq!(trades.len(), 1);
        let t = &trades[0];
        assert_eq!(t.entry_min, Some(600));
        assert_eq!(t.exit_min, Some(690));
        assert_eq!(t.dir, Direction::Buy);
        assert_eq!(t.entry_px, Some(185.0));
        assert_eq!(t.exit_px, Some(187.5));
        assert!(!t.is_open());
    }

    #[test]
    fn exit_without_entry_is_an_orphan() {
        let trades = pair(
            &[r#"{"ticker":"AAPL","tf":5,"event":"close","dir":"S","time":"2024-01-05 10:00:00","close":3.5}"#],
            false,
        );
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_min, None);
        assert_eq!(trades[0].exit_min, Some(600));
        assert_eq!(trades[0].exit_px, Some(3.5));
        assert_eq!(trades[0].dir, Direction::Sell);
    }

    #[test]
    fn second_exit_after_close_is_orphaned() {
        let trades = pair(
            &[
                r#"{"ticker":"AAPL","tf":"5","event":"s","time":"2024-01-05 10:00:00","close":10}"#,
                r#"{"ticker":"AAPL","tf":"5","event":"exit","time":"2024-01-05 10:10:00","close":9}"#,
                r#"{"ticker":"AAPL","tf":"5","event":"exit","time":"2024-01-05 10:20:00","close":8}"#,
            ],
            false,
        );
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].exit_min, Some(610));
        assert_eq!(trades[1].entry_min, None);
    }

    #[test]
    fn exit_without_minute_leaves_trade_open_for_next_exit() {
        let trades = pair(
            &[
                r#"{"ticker":"AAPL","tf":"5","event":"entry","bar_index":2,"close":10}"#,
                r#"{"ticker":"AAPL","tf":"5","event":"exit","close":11}"#,
                r#"{"ticker":"AAPL","tf":"5","event":"exit","bar_index":8,"close":12}"#,
            ],
            true,
        );
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_min, Some(520));
        assert_eq!(trades[0].exit_min, Some(550));
        assert_eq!(trades[0].exit_px, Some(12.0));
        assert!(!trades[0].is_open());
    }

    #[test]
    fn orphan_exit_without_minute_is_dropped() {
        let trades = pair(&[r#"{"ticker":"AAPL","tf":"5","event":"exit","close":11}"#], true);
        assert!(trades.is_empty());
    }

    #[test]
    fn single_record_with_both_prices_is_a_round_trip() {
        let trades = pair(
            &[r#"{"ticker":"aapl","tf":"5","dir":-1,"bar_index":6,"entryPx":"10","exitPx":9}"#],
            true,
        );
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].entry_min, Some(540));
        assert_eq!(trades[0].exit_min, Some(540));
        assert_eq!(trades[0].entry_bar_index, Some(6));
        assert_eq!(trades[0].dir, Direction::Sell);
    }

    #[test]
    fn implicit_entry_stays_open() {
        let trades = pair(
            &[r#"{"ticker":"AAPL","tf":"5","time":"2024-01-05 10:00:00","entryPx":10}"#],
            false,
        );
        assert!(trades[0].is_open());
    }

    #[test]
    fn records_for_other_keys_are_ignored() {
        let trades = pair(
            &[
                r#"{"ticker":"MSFT","tf":"5","event":"entry","time":"2024-01-05 10:00:00","close":1}"#,
                r#"{"ticker":"AAPL","tf":"15","event":"entry","time":"2024-01-05 10:00:00","close":1}"#,
                r#"{"ticker":"AAPL","tf":"5","event":"entry","time":"2024-01-08 10:00:00","close":1}"#,
            ],
            false,
        );
        assert!(trades.is_empty());
    }

    #[test]
    fn date_check_variants() {
        let filter = TradeFilter::new(&key());
        let yes = |json: &str| filter.matches(&parse_line(json).unwrap(), false);
        assert!(yes(r#"{"tickerid":"AAPL","tf":"5","time":"240105 10:00"}"#));
        assert!(yes(r#"{"ticker":"AAPL","tf":"5","date":"240105"}"#));
        assert!(yes(r#"{"ticker":"AAPL","tf":"5","date":"2024-01-05"}"#));
        assert!(yes(r#"{"ticker":"AAPL","tf":"5"}"#));
        assert!(!yes(r#"{"ticker":"AAPL","tf":"5","date":"2024-01-06"}"#));
        assert!(filter.matches(
            &parse_line(r#"{"ticker":"AAPL","tf":"5","date":"2024-01-06"}"#).unwrap(),
            true
        ));
    }

    #[test]
    fn open_entry_does_not_carry_across_files() {
        let filter = TradeFilter::new(&key());
        let mut pairer = TradePairer::new(&filter, SessionWindow::default(), Timeframe::Minutes(5));
        pairer.feed_file(
            &records(&[r#"{"ticker":"AAPL","tf":"5","event":"entry","time":"2024-01-05 10:00:00","close":1}"#]),
            false,
        );
        pairer.feed_file(
            &records(&[r#"{"ticker":"AAPL","tf":"5","event":"exit","time":"2024-01-05 11:00:00","close":2}"#]),
            false,
        );
        let trades = pairer.into_trades();
        assert_eq!(trades.len(), 2);
        assert!(trades[0].is_open());
    }

    #[test]
    fn direction_serializes_as_letter() {
        let json = serde_json::to_string(&Direction::Sell).unwrap();
        assert_eq!(json, "\"S\"");
    }
}
