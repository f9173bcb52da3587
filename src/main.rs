// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "tryon")]
#[command(about = "AR try-on frame compositing and image acquisition")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a still photo through a session's filters
    Process {
        /// Input image (PNG, JPEG, ...)
        #[arg(short, long)]
        input: PathBuf,

        /// JSON file with one landmark array per face (no file = no face)
        #[arg(short, long)]
        landmarks: Option<PathBuf>,

        /// JSON file with the filter list, in application order
        #[arg(short, long)]
        filters: Option<PathBuf>,

        /// Output PNG path (default: ~/Pictures/tryon/tryon_TIMESTAMP.png)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve an image URL through the acquisition cache
    #[cfg(feature = "http")]
    Fetch {
        /// Image URL
        url: String,

        /// Save the decoded image as PNG
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=tryon=trace, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            landmarks,
            filters,
            output,
        } => cli::process_image(input, landmarks, filters, output),
        #[cfg(feature = "http")]
        Commands::Fetch { url, output } => cli::fetch_image(url, output),
    }
}
