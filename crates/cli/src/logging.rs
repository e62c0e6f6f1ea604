//! Logging setup for the command-line tool.
//!
//! Logs are written to stderr so stdout carries only the JSON report.
//!
//! Set `GRAMMAR_VOCAB_LOG_FORMAT=json` for JSON logs.
//! Set `RUST_LOG` to control log levels (default: info).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FORMAT_ENV: &str = "GRAMMAR_VOCAB_LOG_FORMAT";

/// Log format mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable logs (default).
    Pretty,
    Json,
}

impl LogFormat {
    /// Detect log format from environment.
    pub fn from_env() -> Self {
        Self::parse(&std::env::var(LOG_FORMAT_ENV).unwrap_or_default())
    }

    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Initialize logging with an optional level override.
///
/// `RUST_LOG` wins when set; otherwise `level` is used, falling back to
/// `info`. A second initialization is reported as an error.
pub fn init(level: Option<&str>, format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("info")));

    let result = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("logging subscriber init failed: {e}"))
}
