//! Structured logging setup
//!
//! RUST_LOG wins when set; otherwise the configured level applies.
//! Logs go to stderr so command output on stdout stays clean.

use crate::infra::config::Config;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

pub fn init(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr);

    // try_init: a second call (tests, embedding) keeps the first subscriber
    let _ = if config.log_json() { builder.json().try_init() } else { builder.try_init() };
}
