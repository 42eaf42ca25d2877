//! Structured logging setup using `tracing-subscriber`.
//!
//! Logs always go to stderr so stdout carries nothing but the briefing
//! when the console sink is used. `RUST_LOG` takes precedence over the
//! configured level.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialise the global subscriber from the logging section.
///
/// `verbose` raises the fallback level to `debug`. Calling this twice is
/// harmless; the second subscriber is ignored.
pub fn init(config: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let result = if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        tracing::debug!("tracing subscriber already installed: {e}");
    }
}
