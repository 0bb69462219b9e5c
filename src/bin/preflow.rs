use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use preflow::{read_graph, Graph, PreflowConfig, RunStats};

#[derive(Parser)]
#[command(name = "preflow")]
#[command(about = "Maximum flow by parallel preflow-push", long_about = None)]
struct Cli {
    /// Network description; reads stdin when omitted
    input: Option<PathBuf>,

    /// Number of worker threads (overrides the config file)
    #[arg(short, long)]
    threads: Option<usize>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a JSON report instead of plain text
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct Report<'a> {
    flow: i64,
    elapsed_secs: f64,
    workers: usize,
    stats: &'a RunStats,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = if verbose == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    } else {
        EnvFilter::new(default)
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_graph(input: Option<&PathBuf>) -> Result<Graph> {
    match input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            read_graph(BufReader::new(file)).with_context(|| format!("reading {}", path.display()))
        }
        None => read_graph(io::stdin().lock()).context("reading stdin"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let begin = Instant::now();

    let mut config = match &cli.config {
        Some(path) => PreflowConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PreflowConfig::default(),
    };
    if let Some(threads) = cli.threads {
        config = config.with_workers(threads);
    }

    let mut graph = load_graph(cli.input.as_ref())?;
    let outcome = graph.solve(&config).context("computing maximum flow")?;
    let elapsed = begin.elapsed().as_secs_f64();

    if cli.json {
        let report = Report {
            flow: outcome.flow,
            elapsed_secs: elapsed,
            workers: config.workers,
            stats: &outcome.stats,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("t = {elapsed:.6} s");
        println!("f = {}", outcome.flow);
    }

    Ok(())
}
