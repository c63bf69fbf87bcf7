//! Configuration management module.
//!
//! Handles TOML configuration file loading, environment overrides,
//! validation, and default generation.

mod service;
mod types;
mod validation;

pub use service::ConfigService;
pub use types::Config;
pub use validation::validate;
