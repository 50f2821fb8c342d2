//! Bomflow ETL
//!
//! Ingests BOM spreadsheets either from the design project tree (full load)
//! or from the staging folder (user uploads), and stages new uploads.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use bomflow_utils::{init_logging, AppConfig};

mod service;

use service::EtlService;

/// Command-line arguments for bomflow-etl
#[derive(Parser, Debug)]
#[command(name = "bomflow-etl")]
#[command(about = "BOM ingestion pipeline")]
#[command(version)]
struct Args {
    /// Force debug logging regardless of configuration
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape the design project tree and overwrite the final table
    Design,
    /// Load every staged upload, then clear the staging folder
    Staging,
    /// Check that files would load, without staging them
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Validate files and copy them into the staging folder
    Upload {
        /// Project order number, 5-7 digits
        #[arg(long)]
        pon: String,

        #[arg(long, env = "USER")]
        uploader: String,

        /// Delete files already staged for this PON
        #[arg(long)]
        replace: bool,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load().context("Failed to load configuration")?;
    config.logging.debug |= args.debug;
    init_logging(&config.logging)?;

    let service = EtlService::new(config);

    match args.command {
        Command::Design => {
            let tally = service.run_design().await?;
            info!("Design load finished: {} of {} BOMs loaded", tally.succeeded, tally.total);
        }
        Command::Staging => {
            let tally = service.run_staging().await?;
            info!("Staging load finished: {} of {} BOMs loaded", tally.succeeded, tally.total);
        }
        Command::Validate { files } => {
            let report = service.validate(&files);
            for (path, category) in &report.accepted {
                println!("ok      {} ({})", path.display(), category);
            }
            for (path, reason) in &report.rejected {
                println!("failed  {}: {}", path.display(), reason);
            }
            if !report.is_clean() {
                bail!("{} of {} files failed validation", report.rejected.len(), files.len());
            }
        }
        Command::Upload {
            pon,
            uploader,
            replace,
            files,
        } => {
            let staged = service.upload(&pon, &uploader, &files, replace)?;
            for path in &staged {
                println!("staged  {}", path.display());
            }
        }
    }

    Ok(())
}
