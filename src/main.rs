use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use strata::analyze::{analyze_image, show_layer, OutputFormat};
use strata::check::run_check;
use strata::config::{Config, DEFAULT_CHECK_IMAGE, DEFAULT_SNAPSHOT_DIR, SNAPSHOT_DIR_ENV};

#[derive(Parser)]
#[command(name = "strata")]
#[command(author = "Bentlybro <github@bentlybro.com>")]
#[command(version)]
#[command(about = "Strata - Break down container image layers, wasted space and efficiency", long_about = None)]
struct Cli {
    /// Directory holding image analyzer snapshots
    #[arg(long, global = true, env = SNAPSHOT_DIR_ENV, default_value = DEFAULT_SNAPSHOT_DIR)]
    snapshot_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an image: efficiency, layer breakdown and wasted space
    Analyze {
        /// Image to analyze (e.g., node:alpine)
        image: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the file tree of one layer
    Layer {
        /// Image to analyze (e.g., node:alpine)
        image: String,

        /// Layer index, 0 being the topmost layer
        index: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Analyze a reference image and exit non-zero on failure
    Check {
        /// Image to analyze
        #[arg(default_value = DEFAULT_CHECK_IMAGE)]
        image: String,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so table and JSON output stay clean
    // Uses RUST_LOG (defaults to "warn")
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();
    let config = Config::new(cli.snapshot_dir);

    match cli.command {
        Commands::Analyze { image, format } => {
            analyze_image(&config, &image, format)?;
        }
        Commands::Layer {
            image,
            index,
            format,
        } => {
            show_layer(&config, &image, index, format)?;
        }
        Commands::Check { image } => {
            run_check(&config, &image)?;
        }
    }

    Ok(())
}
