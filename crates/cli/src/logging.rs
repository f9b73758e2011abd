//! Diagnostic logging for the command line
//!
//! Command results go to stdout; everything emitted through `tracing` goes to
//! stderr so that output such as `status --json` stays machine readable.

use std::io;

use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration for the migrator binary
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is not set
    pub level: String,
    /// Emit one JSON object per event instead of plain text
    pub json_format: bool,
    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Map repeated `-v` flags onto a level
    pub fn from_verbosity(verbose: u8, json_format: bool) -> Self {
        let level = match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        Self {
            level: level.to_string(),
            json_format,
            include_location: verbose > 2,
        }
    }

    /// Directive applied when `RUST_LOG` is absent; sqlx statement logging stays at warn
    pub fn filter_directive(&self) -> String {
        format!("{},sqlx=warn", self.level)
    }
}

/// Install the global subscriber
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.filter_directive()))?;

    let layer = Layer::new()
        .with_writer(io::stderr)
        .with_target(false)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()?;
    }

    tracing::debug!(level = %config.level, json = config.json_format, "logging initialized");
    Ok(())
}
