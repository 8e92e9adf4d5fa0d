//! Subscriber setup for the CLI.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install a stderr `fmt` subscriber. `RUST_LOG` overrides the configured
/// filter; an unparsable configured filter falls back to `info`.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
