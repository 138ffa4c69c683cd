//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_export;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::fs_data_adapter::FsDataAdapter;
use crate::adapters::svg_chart::scene_to_svg;
use crate::domain::attributes::{AttributeSelection, is_reversal_edge};
use crate::domain::chart::render::{CanvasSize, render};
use crate::domain::dataset::DatasetKind;
use crate::domain::error::SegviewError;
use crate::domain::query::{DataQueries, TimeWindow, check_match};
use crate::domain::record::Record;
use crate::domain::settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "segview", about = "Inspect classified price segments and their indicator series")]
pub struct Cli {
    /// INI config file; defaults and environment apply without one
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Args, Debug, Clone)]
pub struct KeyArgs {
    #[arg(long)]
    pub asset: String,
    #[arg(long)]
    pub date: String,
    #[arg(long, default_value = "")]
    pub tf: String,
}

#[derive(clap::Args, Debug, Clone, Copy)]
pub struct CanvasArgs {
    #[arg(long, default_value_t = 1200.0)]
    pub width: f64,
    #[arg(long, default_value_t = 600.0)]
    pub height: f64,
}

impl From<CanvasArgs> for CanvasSize {
    fn from(args: CanvasArgs) -> Self {
        CanvasSize {
            width: args.width,
            height: args.height,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct WindowArgs {
    /// Window start as HHMM
    #[arg(long)]
    pub start_hm: Option<String>,
    /// Window end as HHMM
    #[arg(long)]
    pub end_hm: Option<String>,
}

impl WindowArgs {
    fn window(&self) -> TimeWindow {
        TimeWindow::from_hm(self.start_hm.as_deref(), self.end_hm.as_deref())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Chart data for one asset/date/timeframe
    Segments {
        #[command(flatten)]
        key: KeyArgs,
        #[arg(long)]
        json: bool,
    },
    /// Alert records in a time window
    Alerts {
        #[command(flatten)]
        key: KeyArgs,
        #[command(flatten)]
        window: WindowArgs,
        /// Comma-separated columns
        #[arg(long, default_value = "")]
        attrs: String,
        #[arg(long)]
        json: bool,
    },
    /// Classified segment records in a time window
    Classified {
        #[command(flatten)]
        key: KeyArgs,
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value = "")]
        attrs: String,
        #[arg(long)]
        json: bool,
    },
    /// List the files of a dataset kind, newest first
    List { kind: DatasetKind },
    /// Assets, dates and timeframes present in the classified directory
    Meta,
    /// Render the chart as SVG
    Render {
        #[command(flatten)]
        key: KeyArgs,
        #[command(flatten)]
        canvas: CanvasArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Describe the segment endpoint under a pixel
    Hit {
        #[command(flatten)]
        key: KeyArgs,
        #[command(flatten)]
        canvas: CanvasArgs,
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
    },
    /// Compare raw-vector and classified files stem by stem
    CheckMatch {
        raw_dir: Option<PathBuf>,
        classified_dir: Option<PathBuf>,
    },
    /// Export alert or classified records as CSV
    Export {
        source: DatasetKind,
        #[command(flatten)]
        key: KeyArgs,
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, default_value = "")]
        attrs: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Start the web server
    Serve,
}

impl clap::ValueEnum for DatasetKind {
    fn value_variants<'a>() -> &'a [Self] {
        &DatasetKind::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let settings = match load_settings(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let port = FsDataAdapter::new();
    let queries = DataQueries::new(&port, &settings);

    let result = match cli.command {
        Command::Segments { key, json } => run_segments(&queries, &key, json),
        Command::Alerts {
            key,
            window,
            attrs,
            json,
        } => run_alerts(&queries, &key, &window, &attrs, json),
        Command::Classified {
            key,
            window,
            attrs,
            json,
        } => run_classified(&queries, &key, &window, &attrs, json),
        Command::List { kind } => run_list(&queries, kind),
        Command::Meta => print_json(&queries.classified_meta()),
        Command::Render {
            key,
            canvas,
            output,
        } => run_render(&queries, &key, canvas.into(), output.as_deref()),
        Command::Hit { key, canvas, x, y } => run_hit(&queries, &key, canvas.into(), x, y),
        Command::CheckMatch {
            raw_dir,
            classified_dir,
        } => run_check_match(&queries, &settings, raw_dir, classified_dir),
        Command::Export {
            source,
            key,
            window,
            attrs,
            output,
        } => run_export(&queries, source, &key, &window, &attrs, output.as_deref()),
        Command::Serve => run_serve(&settings),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Config file (if any) plus the process environment.
pub fn load_settings(config: Option<&Path>) -> Result<Settings, SegviewError> {
    if let Some(path) = config {
        eprintln!("Loading config from {}", path.display());
    }
    let adapter = FileConfigAdapter::load_optional(config)?;
    Settings::load(&adapter, |name| std::env::var(name).ok())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), SegviewError> {
    let text = serde_json::to_string_pretty(value).map_err(io::Error::from)?;
    println!("{text}");
    Ok(())
}

fn print_table(records: &[Record], selection: &AttributeSelection, mark_edges: bool) {
    println!("{}", selection.columns().join("\t"));
    for record in records {
        let row = selection.row(record).join("\t");
        if mark_edges && is_reversal_edge(record) {
            println!("{row}\t*");
        } else {
            println!("{row}");
        }
    }
}

fn run_segments(queries: &DataQueries<'_>, key: &KeyArgs, json: bool) -> Result<(), SegviewError> {
    let data = queries.segments_and_series(&key.asset, &key.date, &key.tf)?;
    if json {
        return print_json(&data);
    }
    eprintln!(
        "{} segments, {} trades, {} bars in session",
        data.segments.len(),
        data.trades.len(),
        data.bars()
    );
    for s in &data.segments {
        println!(
            "{}\t{}\t{}\t{:.2}\t{:.2}\t{}",
            s.segment_id, s.start_hm, s.end_hm, s.close_first, s.close_last, s.tier
        );
    }
    Ok(())
}

fn run_alerts(
    queries: &DataQueries<'_>,
    key: &KeyArgs,
    window: &WindowArgs,
    attrs: &str,
    json: bool,
) -> Result<(), SegviewError> {
    let alerts = queries.alert_records_in_window(&key.asset, &key.date, &key.tf, window.window())?;
    if json {
        return print_json(&alerts);
    }
    if let Some(error) = &alerts.error {
        eprintln!("{error}");
        return Ok(());
    }
    if let Some(file) = &alerts.source_file {
        eprintln!("{} records from {file}", alerts.records.len());
    }
    let selection = AttributeSelection::parse(DatasetKind::Alerts, attrs);
    print_table(&alerts.records, &selection, true);
    Ok(())
}

fn run_classified(
    queries: &DataQueries<'_>,
    key: &KeyArgs,
    window: &WindowArgs,
    attrs: &str,
    json: bool,
) -> Result<(), SegviewError> {
    let classified = queries.classified_records(&key.asset, &key.date, &key.tf, window.window())?;
    if json {
        return print_json(&classified);
    }
    eprintln!(
        "{} records from {} files",
        classified.records.len(),
        classified.files.len()
    );
    let selection = AttributeSelection::parse(DatasetKind::Classified, attrs);
    print_table(&classified.records, &selection, false);
    Ok(())
}

fn run_list(queries: &DataQueries<'_>, kind: DatasetKind) -> Result<(), SegviewError> {
    let files = queries.list_files_of_kind(kind);
    if files.is_empty() {
        eprintln!("no {kind} files found");
    }
    for f in files {
        println!("{}\t{}", f.record_count, f.name);
    }
    Ok(())
}

fn run_render(
    queries: &DataQueries<'_>,
    key: &KeyArgs,
    canvas: CanvasSize,
    output: Option<&Path>,
) -> Result<(), SegviewError> {
    let data = queries.segments_and_series(&key.asset, &key.date, &key.tf)?;
    let svg = scene_to_svg(&render(&data, canvas)?);
    match output {
        Some(path) => {
            fs::write(path, svg)?;
            eprintln!("Chart written to: {}", path.display());
        }
        None => io::stdout().write_all(svg.as_bytes())?,
    }
    Ok(())
}

fn run_hit(
    queries: &DataQueries<'_>,
    key: &KeyArgs,
    canvas: CanvasSize,
    x: f64,
    y: f64,
) -> Result<(), SegviewError> {
    let data = queries.segments_and_series(&key.asset, &key.date, &key.tf)?;
    let scene = render(&data, canvas)?;
    match scene.hits.hit_test(x, y) {
        Some(circle) => println!("{}", circle.tooltip()),
        None => eprintln!("no segment endpoint near ({x}, {y})"),
    }
    Ok(())
}

fn run_check_match(
    queries: &DataQueries<'_>,
    settings: &Settings,
    raw_dir: Option<PathBuf>,
    classified_dir: Option<PathBuf>,
) -> Result<(), SegviewError> {
    let raw_dir = raw_dir
        .or_else(|| settings.dirs.raw_vectors_dir.clone())
        .unwrap_or_else(|| settings.dirs.base.join("raw_vectors"));
    let classified_dir = classified_dir.unwrap_or_else(|| queries.locator().classified_dir());
    let report = check_match(queries.locator().port(), &raw_dir, &classified_dir)?;

    println!("Raw dir: {}", raw_dir.display());
    println!("  *.jsonl: {}", report.raw_files);
    println!("Classified dir: {}", classified_dir.display());
    println!("  *.jsonl: {}", report.classified_files);
    if !report.raw_only.is_empty() {
        println!("\nIn raw but no classified: {}", report.raw_only.len());
        for (stem, lines) in &report.raw_only {
            println!("  {stem}.jsonl ({lines} lines)");
        }
    }
    if !report.classified_only.is_empty() {
        println!("\nIn classified but no raw: {}", report.classified_only.len());
        for stem in &report.classified_only {
            println!("  {stem}.jsonl");
        }
    }
    if !report.mismatched.is_empty() {
        println!("\nSame stem but line count mismatch: {}", report.mismatched.len());
        for m in &report.mismatched {
            println!("  {}: raw {} vs classified {}", m.stem, m.raw, m.classified);
        }
    }
    if report.is_clean() {
        println!("\nOK: same stems and same line counts (1:1).");
    }
    Ok(())
}

fn run_export(
    queries: &DataQueries<'_>,
    source: DatasetKind,
    key: &KeyArgs,
    window: &WindowArgs,
    attrs: &str,
    output: Option<&Path>,
) -> Result<(), SegviewError> {
    let records = match source {
        DatasetKind::Alerts => {
            let alerts = queries.alert_records_in_window(&key.asset, &key.date, &key.tf, window.window())?;
            if let Some(error) = alerts.error {
                eprintln!("{error}");
            }
            alerts.records
        }
        DatasetKind::Classified => {
            queries
                .classified_records(&key.asset, &key.date, &key.tf, window.window())?
                .records
        }
        other => {
            return Err(SegviewError::UnknownKind(format!(
                "{other} (export supports alerts and classified)"
            )));
        }
    };
    let selection = AttributeSelection::parse(source, attrs);
    let written = match output {
        Some(path) => {
            let n = csv_export::write_records(fs::File::create(path)?, &records, &selection)?;
            eprintln!("{n} rows written to: {}", path.display());
            n
        }
        None => csv_export::write_records(io::stdout().lock(), &records, &selection)?,
    };
    tracing::debug!(rows = written, source = %source, "exported records");
    Ok(())
}

fn run_serve(settings: &Settings) -> Result<(), SegviewError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, serve};
        use std::sync::Arc;

        eprintln!("Starting web server on {}", settings.listen);
        let state = AppState {
            data_port: Arc::new(FsDataAdapter::new()),
            settings: Arc::new(settings.clone()),
        };
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(serve(state, &settings.listen))?;
        Ok(())
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = settings;
        Err(SegviewError::Io(io::Error::new(
            io::ErrorKind::Unsupported,
            "built without the web feature",
        )))
    }
}
