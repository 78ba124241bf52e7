//! Log setup for a full-screen terminal app.
//!
//! The terminal is in raw mode on the alternate screen, so events are written
//! to a file instead of stderr. `RUST_LOG` overrides the default filter.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "attack_map=info";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Multi-line, human readable
    Pretty,
    /// One line per event
    #[default]
    Compact,
    /// JSON lines for log tooling
    Json,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber, appending to `path`
pub fn init_logging(path: &Path, format: LogFormat) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let writer = Mutex::new(file);
    let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);

    let registry = tracing_subscriber::registry().with(env_filter());
    match format {
        LogFormat::Json => registry.with(layer.json()).try_init(),
        LogFormat::Compact => registry.with(layer.compact()).try_init(),
        LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))
}
