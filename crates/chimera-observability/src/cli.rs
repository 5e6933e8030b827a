// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing for per-crate debug flags
//!
//! Supports flags like `--debug-chimera-expression` and `--debug-all`.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

/// Environment variable listing crates to debug (comma-separated or `all`)
pub const DEBUG_ENV: &str = "CHIMERA_DEBUG";

/// Crates with debug logging enabled
///
/// # Example
/// ```rust
/// use chimera_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-chimera-breeding".to_string()]);
/// assert!(flags.is_enabled("chimera-breeding"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Collect `--debug-{crate-name}` arguments; `--debug-all` enables every known crate
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = CrateDebugFlags::default();
        for arg in args {
            if arg == "--debug-all" {
                flags.enable_all();
            } else if let Some(crate_name) = arg.strip_prefix("--debug-") {
                flags.enabled_crates.insert(crate_name.to_string());
            }
        }
        flags
    }

    /// Merge a `CHIMERA_DEBUG` style value
    pub fn merge_env_value(&mut self, value: &str) {
        if value.trim() == "all" {
            self.enable_all();
            return;
        }
        for crate_name in value.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            self.enabled_crates.insert(crate_name.to_string());
        }
    }

    fn enable_all(&mut self) {
        self.enabled_crates
            .extend(KNOWN_CRATES.iter().map(|c| c.to_string()));
    }

    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// `DEBUG` for enabled crates, `INFO` otherwise
    pub fn log_level(&self, crate_name: &str) -> tracing::Level {
        if self.is_enabled(crate_name) {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// `EnvFilter` directive string with `base_level` as the default
    ///
    /// Format: `chimera-breeding=debug,chimera-expression=debug,info`
    pub fn to_filter_string(&self, base_level: &str) -> String {
        let base = if base_level.trim().is_empty() {
            "info"
        } else {
            base_level.trim()
        };
        let mut filters: Vec<String> = self
            .enabled_crates
            .iter()
            .map(|c| format!("{}=debug", c))
            .collect();
        filters.push(base.to_string());
        filters.join(",")
    }
}

/// Debug flags from the process arguments plus `CHIMERA_DEBUG`
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(value) = env::var(DEBUG_ENV) {
        flags.merge_env_value(&value);
    }
    flags
}

/// Help text for the debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Enable debug logging for all crates
  --debug-{{crate-name}}          Enable debug logging for one crate

Available crates:
  {}

Environment Variable:
  {env}={{crate-name}}[,{{crate-name}}]
  {env}=all
"#,
        KNOWN_CRATES.join(", "),
        env = DEBUG_ENV
    )
}
