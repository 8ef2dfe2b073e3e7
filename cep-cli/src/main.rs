//! CEP Engine CLI Application
//!
//! This is the command-line host for the cep-engine library. It adds:
//! - Rule loading from a TOML file
//! - Event ingestion from JSON lines (file or stdin)
//! - Derived-event output as JSON lines (file or stdout)
//! - A run summary on the log

use anyhow::{Context, Result};
use cep_engine::{Event, Graph};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

mod config;
mod input;
mod report;

use report::Summary;

/// CEP Engine - Match event streams against pattern rules
#[derive(Parser, Debug)]
#[command(name = "cep-cli")]
#[command(about = "Match a stream of events against CEP rules and print derived events", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the rule file (rules.toml)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// JSON-lines event file (default: stdin)
    #[arg(short, long, value_name = "FILE")]
    events: Option<PathBuf>,

    /// Output file for derived events (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Override the derived-event recursion limit from the config file
    #[arg(long, value_name = "DEPTH")]
    max_depth: Option<usize>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("CEP Engine CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using engine library v{}", cep_engine::VERSION);

    log::info!("Loading rules from: {:?}", args.config);
    let config = config::load_config(&args.config)?;
    log::debug!("Loaded {} statement(s)", config.statements.len());

    let mut graph = config.build_graph(args.max_depth);
    let pending = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&pending);
    graph.add_listener(move |event| {
        sink.lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone())
    });

    let reader: Box<dyn BufRead> = match &args.events {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open event file: {:?}", path))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    let summary = process_stream(&graph, &pending, reader, &mut writer)?;
    writer.flush().context("Failed to flush output")?;

    summary.log();
    Ok(())
}

/// Feed every event through the graph, writing derived events as they appear
fn process_stream<R: BufRead, W: Write>(
    graph: &Graph,
    pending: &Mutex<Vec<Event>>,
    reader: R,
    writer: &mut W,
) -> Result<Summary> {
    let mut summary = Summary::default();

    for item in input::read_events(reader) {
        let (line_no, event) = item?;
        summary.events_read += 1;

        let dispatched = graph.on_event(&event);

        // Events derived before a failed dispatch already happened; keep them
        let derived: Vec<Event> =
            std::mem::take(&mut *pending.lock().unwrap_or_else(|e| e.into_inner()));
        for derived_event in &derived {
            summary.record_derived(derived_event);
            report::write_event(writer, derived_event)?;
        }

        dispatched
            .with_context(|| format!("Dispatch failed for {} (line {})", event, line_no))?;
    }

    summary.live_flows = graph.registry().len();
    Ok(summary)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
