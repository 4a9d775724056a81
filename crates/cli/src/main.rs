//! pgn-annotator: annotates the games of a PGN file with engine analysis

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, ensure, Context};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pgn_annotator_core::{
    default_output_path, run_batch, BatchOptions, Config, GameFilter, OpeningBook, UciEngine,
};

const LOG_FILE: &str = "annotator.log";
const DEFAULT_ENGINE: &str = "stockfish";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Annotates chess games in a PGN file with a UCI engine"
)]
struct Args {
    /// PGN file with the games to annotate
    #[arg(short, long)]
    file: PathBuf,

    /// Where to write the annotated games [default: <file>-annotated.pgn]
    #[arg(short, long)]
    outputfile: Option<PathBuf>,

    /// Header filter, e.g. "Player:Carlsen;Result:1-0" or "Interesting"
    #[arg(short = 'i', long)]
    filter: Option<String>,

    /// Path to the UCI engine [default: stockfish]
    #[arg(short, long)]
    engine: Option<String>,

    /// Minutes of engine time per game
    #[arg(short = 'a', long)]
    gametime: Option<f64>,

    /// Engine search threads
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    threads: Option<u32>,

    /// More output: -v info, -vv debug, -vvv trace into annotator.log
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Opening dataset (JSON array of {c, n, f, m} records)
    #[arg(long)]
    eco: Option<PathBuf>,
}

fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let default = match verbose {
        0 => "warn,pgn_annotator=info,pgn_annotator_core=info",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    if verbose >= 3 {
        let file = File::create(LOG_FILE).with_context(|| format!("cannot create {}", LOG_FILE))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

/// Settings file values, overridden by command line flags
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(engine) = &args.engine {
        config.engine = Some(engine.clone());
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if let Some(gametime) = args.gametime {
        config.gametime = gametime;
    }
    if let Some(eco) = &args.eco {
        config.eco = Some(eco.clone());
    }

    ensure!(
        config.gametime.is_finite() && config.gametime > 0.0,
        "game time must be a positive number of minutes, got {}",
        config.gametime
    );
    ensure!(config.threads > 0, "thread count must be at least 1");
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config = load_config(&args)?;
    let book = match &config.eco {
        Some(path) => OpeningBook::load(path)?,
        None => OpeningBook::empty(),
    };

    let output = args
        .outputfile
        .clone()
        .unwrap_or_else(|| default_output_path(&args.file));
    let options = BatchOptions {
        input: args.file.clone(),
        output,
        filter: GameFilter::parse(
            args.filter.as_deref().unwrap_or(""),
            config.analysis.interesting_rating,
        ),
        gametime: config.gametime,
    };

    let engine_path = config.engine.as_deref().unwrap_or(DEFAULT_ENGINE);
    let mut engine = UciEngine::start(engine_path, config.threads)
        .await
        .with_context(|| format!("could not start engine {}", engine_path))?;

    let outcome = tokio::select! {
        result = run_batch(&mut engine, &book, &config.analysis, &options) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    engine.quit().await;

    match outcome {
        Some(Ok(summary)) => {
            info!(
                annotated = summary.annotated,
                failed = summary.failed,
                filtered = summary.filtered,
                "wrote {}",
                options.output.display()
            );
            Ok(())
        }
        Some(Err(e)) => Err(e).context("annotation stopped"),
        None => {
            warn!("interrupted");
            bail!("interrupted")
        }
    }
}
