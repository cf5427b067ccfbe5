//! Common utilities for the pipeline binary: shared CLI parsing and
//! logging initialization.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Common CLI arguments for the pipeline binary.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CommonArgs {
    /// Path to a TOML config file. Falls back to built-in defaults when absent.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level, overridden by `RUST_LOG` if set.
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

/// Initialize tracing/logging.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    Ok(())
}
