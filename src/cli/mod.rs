//! CLI parser and command dispatch.

mod init;
mod scrape;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "bookdex")]
#[command(about = "Book catalog ingestion and browsing system")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

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
    /// Initialize the data directory and database
    Init,

    /// Scrape the origin site and reconcile results into the catalog
    Scrape {
        #[command(subcommand)]
        command: ScrapeCommands,
    },

    /// Start the web server to browse and trigger scrapes
    Serve {
        /// Address to bind to: PORT, HOST, or HOST:PORT (defaults to config)
        bind: Option<String>,
    },
}

#[derive(Subcommand)]
enum ScrapeCommands {
    /// Scrape the category index
    Categories,

    /// Scrape product listings for one or more categories
    Products {
        /// Category ids or slugs (or use --all)
        categories: Vec<String>,
        /// Scrape every known category
        #[arg(short, long)]
        all: bool,
    },

    /// Scrape one product's detail page and refresh its reviews
    Detail {
        /// Product id
        product_id: i32,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Scrape { command } => match command {
            ScrapeCommands::Categories => scrape::cmd_scrape_categories(&settings).await,
            ScrapeCommands::Products { categories, all } => {
                scrape::cmd_scrape_products(&settings, &categories, all).await
            }
            ScrapeCommands::Detail { product_id } => {
                scrape::cmd_scrape_detail(&settings, product_id).await
            }
        },
        Commands::Serve { bind } => serve::cmd_serve(&settings, bind.as_deref()).await,
    }
}
