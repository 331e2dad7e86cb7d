//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod download;
mod list;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "prospekt")]
#[command(about = "Download Aldi Süd flyers (Prospekte) with duplicate detection")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Download new flyers from the listing page
    Download {
        /// Directory for PDFs and the metadata file
        #[arg(short, long, env = "PROSPEKT_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// Run the browser headless (true/false)
        #[arg(long)]
        headless: Option<bool>,

        /// Download even if a flyer looks like a duplicate
        #[arg(short, long)]
        force: bool,

        /// Fetch pages over plain HTTP instead of a browser
        #[arg(long = "static")]
        static_page: bool,

        /// Listing page to scrape
        #[arg(long, env = "PROSPEKT_LISTING_URL")]
        listing_url: Option<String>,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// List previously downloaded flyers
    List {
        /// Directory containing the metadata file
        #[arg(short, long, env = "PROSPEKT_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
    };
    let (mut settings, _config) = load_settings_with_options(options).await?;

    match cli.command {
        Commands::Download {
            output_dir,
            headless,
            force,
            static_page,
            listing_url,
            no_progress,
        } => {
            if let Some(dir) = output_dir {
                settings.output_dir = dir;
            }
            if let Some(headless) = headless {
                settings.browser.headless = headless;
            }
            if let Some(url) = listing_url {
                settings.listing_url = url;
            }
            download::cmd_download(&settings, force, static_page, !no_progress).await
        }
        Commands::List { output_dir, json } => {
            if let Some(dir) = output_dir {
                settings.output_dir = dir;
            }
            list::cmd_list(&settings, json)
        }
    }
}
