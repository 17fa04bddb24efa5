//! Logging initialization.
//!
//! Uses the `tracing` ecosystem with both human-readable and JSON output.
//! Log output goes to stderr; stdout is reserved for bundle/title data.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem with an explicit default level.
///
/// The RUST_LOG environment variable overrides the configured level.
pub fn init(default_level: &str, json_format: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json_format {
        // JSON format for machine parsing
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        // Pretty format for humans
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the config file, with CLI flag overrides.
pub fn init_from_config(
    config: &aiwriter_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let level = if verbose_override {
        "debug"
    } else {
        &config.logging.level
    };
    let json_format = json_logs_override || config.logging.format == "json";
    init(level, json_format);
}
