//! Tracing subscriber setup for binaries and jobs embedding the billing core
//!
//! The configured level applies to this crate only; everything else the host
//! links in stays at `warn`. Span close events are logged so the recurring
//! run reports how long it took.

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

const CRATE_TARGET: &str = "invoicing_core";

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log level/filter '{value}': unable to build EnvFilter")]
    EnvFilter { value: String, source: ParseError },
    #[error("telemetry error: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

/// Filter directives for a configured level.
///
/// A bare level such as `debug` is scoped to this crate; anything containing
/// `=` or `,` is taken as a full directive list.
pub fn filter_directives(log_level: &str) -> String {
    let level = log_level.trim();
    if level.is_empty() {
        format!("warn,{}=info", CRATE_TARGET)
    } else if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("warn,{}={}", CRATE_TARGET, level)
    }
}

/// Install a compact fmt subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let directives = filter_directives(&config.log_level);
            EnvFilter::try_new(&directives).map_err(|source| TelemetryError::EnvFilter {
                value: config.log_level.clone(),
                source,
            })?
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
