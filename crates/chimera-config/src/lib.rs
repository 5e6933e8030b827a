// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! # Chimera Configuration
//!
//! Type-safe configuration loader with three override tiers:
//! - TOML file (`chimera_configuration.toml`)
//! - Environment variables (`CHIMERA_*`)
//! - CLI key/value overrides
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chimera_config::{load_config, validate_config};
//!
//! let config = load_config(None, None).expect("Failed to load config");
//! validate_config(&config).expect("Invalid config");
//!
//! let expression = config.expression_config();
//! let breeding = config.breeding_config();
//! println!("GPU threshold: {}", expression.gpu_threshold);
//! println!("Mutation rate: {}", breeding.mutation_rate);
//! ```
//!
//! Runtime crates only see their own plain config structs; this crate is the
//! single place that knows about file formats.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{apply_cli_overrides, apply_environment_overrides, find_config_file, load_config, CONFIG_FILE_NAME};
pub use types::*;
pub use validation::{collect_violations, validate_config, ConfigValidationError};

/// Re-export for convenience
pub use serde;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
