//! Tracing setup for the binary.

use anyhow::{anyhow, bail, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Map a `--loglevel` value to a tracing directive.
///
/// `fatal` and `panic` are accepted for compatibility and mean `error`.
pub fn level_directive(level: &str) -> Result<&'static str> {
    Ok(match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" | "fatal" | "panic" => "error",
        other => bail!(
            "unsupported log level '{}'; expected one of: trace, debug, info, warning, error, fatal, panic",
            other
        ),
    })
}

/// Install the global subscriber. `RUST_LOG` overrides `level` when set.
pub fn initialize_tracing(level: &str) -> Result<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::new(level_directive(level)?),
    };

    let format = tracing_subscriber::fmt::format()
        .without_time()
        .with_target(false)
        .compact();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_writer(std::io::stderr)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow!("initializing logging: {e}"))
}
