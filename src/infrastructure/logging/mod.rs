// Logging module - Logging infrastructure
use crate::domain::error::{CeError, CeResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use std::io;

/// Filter directive for a run: `-d` wins over the configured level.
pub fn filter_directive(configured_level: &str, debug: bool) -> String {
    let level = if debug {
        "debug"
    } else {
        match configured_level {
            "error" | "warn" | "info" | "debug" | "trace" => configured_level,
            _ => "info",
        }
    };
    format!("ontapce={},warn", level)
}

/// Initialize logging system.
///
/// `RUST_LOG` takes precedence over the configured level. Logs go to stderr so
/// they never mix with listings on stdout.
pub fn init_logging(configured_level: &str, debug: bool) -> CeResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(configured_level, debug)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(debug)
                .with_level(true)
                .with_file(debug)
                .with_line_number(debug)
        )
        .try_init()
        .map_err(|e| CeError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::debug!("ontapce logging system initialized");
    Ok(())
}
