//! Moongrid CLI - Generative Mosaic Frontend
//!
//! Renders still mosaics, looping animations and periodic refreshes from a
//! seeded latent grid.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;
mod sinks;

/// Moongrid - seeded latent mosaics that drift with the moon
#[derive(Parser)]
#[command(name = "moongrid")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Seed for the run (random when neither seed nor hash is given)
    #[arg(long, conflicts_with = "hash")]
    seed: Option<u64>,

    /// 51-character token hash, seeds the sfc32 source
    #[arg(long)]
    hash: Option<String>,

    /// Engine configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Inference backend
    #[arg(short, long, value_enum, default_value = "palette")]
    backend: BackendKind,

    /// Directory holding moon-map.onnx and moon-synth.onnx
    #[arg(long, default_value = "models")]
    model_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the features record for this run
    Features,

    /// Render one still mosaic
    Render {
        /// Date whose moon phase drives the loop parameter (default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Explicit loop parameter, overrides the date
        #[arg(long)]
        phase: Option<f64>,

        /// Output file
        #[arg(short, long, default_value = "moongrid.png")]
        output: PathBuf,
    },

    /// Render the full looping animation as a GIF
    Animate {
        /// Output file
        #[arg(short, long, default_value = "moongrid.gif")]
        output: PathBuf,

        /// Also write the closing still mosaic
        #[arg(long)]
        still: Option<PathBuf>,
    },

    /// Re-render the still mosaic on the configured interval
    Watch {
        /// Output file, rewritten on every refresh
        #[arg(short, long, default_value = "moongrid.png")]
        output: PathBuf,

        /// Stop after this many refreshes
        #[arg(long)]
        ticks: Option<u64>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, clap::ValueEnum)]
enum BackendKind {
    /// Procedural gradients, no model files
    Palette,
    /// ONNX mapping and synthesis networks (requires the `onnx` feature)
    Onnx,
}

/// Options shared by every command
struct RunOptions {
    seed: Option<u64>,
    hash: Option<String>,
    config: Option<PathBuf>,
    backend: BackendKind,
    model_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_ansi(!cli.no_color)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let options = RunOptions {
        seed: cli.seed,
        hash: cli.hash,
        config: cli.config,
        backend: cli.backend,
        model_dir: cli.model_dir,
    };

    match cli.command {
        Commands::Features => {
            commands::features::run(&options)?;
        }

        Commands::Render {
            date,
            phase,
            output,
        } => {
            commands::render::run(&options, date, phase, &output).await?;
        }

        Commands::Animate { output, still } => {
            commands::animate::run(&options, &output, still.as_deref()).await?;
        }

        Commands::Watch { output, ticks } => {
            commands::watch::run(&options, &output, ticks).await?;
        }
    }

    Ok(())
}
