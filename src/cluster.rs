//! Resolve the `cluster` section of a job configuration into a validated job description

/// Typed, all-optional view of one configuration layer
pub mod section;

/// Built-in defaults and per-cluster presets
pub mod preset;

/// Merge layers, validate required keys and derive job paths
pub mod resolve;

/// Configuration errors, all fatal
pub mod error;

pub use error::ConfigError;
pub use resolve::ResolvedConfig;
