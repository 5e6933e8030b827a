// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Logging configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error or a full `EnvFilter` string)
    pub level: String,

    pub format: LogFormat,

    /// Base directory for rolling log files; console only when `None`
    pub log_dir: Option<PathBuf>,

    /// Run folders older than this are removed
    pub retention_days: u64,

    /// Most recent run folders kept
    pub retention_runs: usize,
}

/// Log format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    Text,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: LogFormat::Text,
            log_dir: None,
            retention_days: 30,
            retention_runs: 10,
        }
    }
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>, json: bool, log_dir: Option<PathBuf>) -> Self {
        LoggingConfig {
            level: level.into(),
            format: if json { LogFormat::Json } else { LogFormat::Text },
            log_dir,
            ..Self::default()
        }
    }
}
