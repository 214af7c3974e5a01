//! Infrastructure - configuration and logging
//!
//! - `config` - Application configuration (TOML loading, defaults, env overrides)
//! - `logging` - tracing subscriber setup

pub mod config;
pub mod logging;

// Re-export commonly used types
pub use config::Config;
