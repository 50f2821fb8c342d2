use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

const LOG_FILE_NAME: &str = "app.log";

pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.effective_level()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    let log_file = open_log_file(config)?;

    match config.format.as_str() {
        "json" => {
            let fmt_layer = fmt::layer().json().with_target(true);

            if let Some(file) = log_file {
                registry.with(fmt_layer.with_writer(file)).init();
            } else {
                registry.with(fmt_layer).init();
            }
        }
        _ => {
            let fmt_layer = fmt::layer().with_target(true);

            if let Some(file) = log_file {
                registry
                    .with(fmt_layer.with_ansi(false).with_writer(file))
                    .init();
            } else {
                registry.with(fmt_layer).init();
            }
        }
    }

    tracing::info!(
        level = config.effective_level(),
        debug = config.debug,
        "Logging configured"
    );
    Ok(())
}

fn open_log_file(config: &LoggingConfig) -> Result<Option<File>> {
    let Some(dir) = &config.log_dir else {
        return Ok(None);
    };

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let path = dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    Ok(Some(file))
}
