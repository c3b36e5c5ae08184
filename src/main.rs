//! Quartodoc Ultra CLI.
//!
//! - `build`: write the API reference pages, index, inventory and sidebar
//! - `interlinks`: download and cache the inventories of external sites
//! - `convert-inventory`: convert a Sphinx `objects.inv` file to JSON

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use quartodoc_ultra::config::{QuartoConfig, CONFIG_FILENAME};
use quartodoc_ultra::inventory::{convert_inventory, Inventory};
use quartodoc_ultra::{Builder, PageFilter};

#[derive(Parser)]
#[command(name = "quartodoc-ultra", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the API reference.
    Build {
        /// Path to the Quarto config
        #[arg(long, default_value = CONFIG_FILENAME)]
        config: PathBuf,
        /// Only write pages whose path matches this pattern
        #[arg(long, default_value = "*")]
        filter: String,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Download the inventories listed under `interlinks.sources`.
    Interlinks {
        #[arg(long, default_value = CONFIG_FILENAME)]
        config: PathBuf,
        /// Print what would be downloaded without fetching anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Convert a Sphinx inventory to JSON.
    ConvertInventory {
        input: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(&cli.command, Commands::Build { verbose: true, .. });
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Build { config, filter, .. } => build(&config, &filter),
        Commands::Interlinks { config, dry_run } => interlinks(&config, dry_run),
        Commands::ConvertInventory { input, out } => convert_inventory(&input, out.as_deref())
            .map(|path| info!("Wrote {}", path.display()))
            .map_err(anyhow::Error::from),
    };

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn build(config: &Path, filter: &str) -> Result<()> {
    let quarto = QuartoConfig::load(config)
        .with_context(|| format!("Failed to load config: {}", config.display()))?;
    let filter = PageFilter::new(filter)?;

    let mut builder = Builder::from_quarto_config(&quarto)?;
    let stats = builder.build(&filter)?;

    info!(
        "{} pages written, {} unchanged, {} filtered out, {} inventory items",
        stats.pages_written, stats.pages_unchanged, stats.pages_filtered, stats.items
    );
    Ok(())
}

fn interlinks(config: &Path, dry_run: bool) -> Result<()> {
    let quarto = QuartoConfig::load(config)
        .with_context(|| format!("Failed to load config: {}", config.display()))?;
    let Some(interlinks) = &quarto.interlinks else {
        println!("No interlinks field found in your quarto config. Quitting.");
        return Ok(());
    };

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("quartodoc-ultra/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")?;

    for (name, source) in &interlinks.sources {
        if source.is_local() {
            continue;
        }

        let url = source.inventory_url();
        let dest = interlinks.cache_path(&quarto.root_dir, name);
        if dry_run {
            println!("{} -> {}", url, dest.display());
            continue;
        }

        info!("Downloading inventory: {}", url);
        let response = client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Failed to download inventory: {}", url))?;
        let bytes = response.bytes()?;

        let inventory = Inventory::from_sphinx_bytes(&bytes)
            .with_context(|| format!("Failed to read inventory: {}", url))?;
        if inventory.is_empty() {
            warn!("Inventory {} has no items", url);
        }
        inventory
            .write_json(&dest)
            .with_context(|| format!("Failed to write: {}", dest.display()))?;
    }
    Ok(())
}
