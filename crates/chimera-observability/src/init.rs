// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output always; with the `file-logging` feature and a `log_dir`,
//! a combined JSON log rolls daily inside a timestamped run folder:
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       └── chimera.log
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps background log writers alive; logs flush when dropped
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder receiving log files, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Filter directive combining the configured level with debug flags
pub fn build_filter(config: &LoggingConfig, debug_flags: &CrateDebugFlags) -> Result<EnvFilter> {
    let directive = debug_flags.to_filter_string(&config.level);
    EnvFilter::try_new(&directive).with_context(|| format!("Invalid log filter: {}", directive))
}

/// Install the global subscriber
///
/// # Errors
///
/// Fails on an invalid filter directive, an unwritable log directory, or when a
/// global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig, debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console_filter = build_filter(config, debug_flags)?;
    let console_layer = match config.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(console_filter)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(console_filter)
            .boxed(),
    };
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let (file_guards, log_dir) = match &config.log_dir {
        Some(base) => {
            let (layer, guard, run_folder) = file_layer(config, debug_flags, base)?;
            layers.push(layer);
            (vec![guard], Some(run_folder))
        }
        None => (Vec::new(), None),
    };
    #[cfg(not(feature = "file-logging"))]
    let log_dir = None;

    Registry::default()
        .with(layers)
        .try_init()
        .context("Global tracing subscriber already installed")?;

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: file_guards,
        log_dir,
    })
}

/// Console logging at `info` with flags from the environment
pub fn init_logging_default(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    init_logging(&LoggingConfig::default(), debug_flags)
}

#[cfg(feature = "file-logging")]
fn file_layer(
    config: &LoggingConfig,
    debug_flags: &CrateDebugFlags,
    base_log_dir: &Path,
) -> Result<(BoxedLayer, tracing_appender::non_blocking::WorkerGuard, PathBuf)> {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let run_folder = base_log_dir.join(format!("run_{}", timestamp));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

    cleanup_old_logs(base_log_dir, &run_folder, config.retention_days, config.retention_runs)?;

    let appender = tracing_appender::rolling::daily(&run_folder, "chimera.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(build_filter(config, debug_flags)?)
        .boxed();

    Ok((layer, guard, run_folder))
}

/// Remove run folders older than `retention_days`, then all but the newest
/// `retention_runs`. The active run folder is never removed.
#[cfg(feature = "file-logging")]
pub fn cleanup_old_logs(
    base_log_dir: &Path,
    active_run: &Path,
    retention_days: u64,
    retention_runs: usize,
) -> Result<usize> {
    use chrono::{NaiveDateTime, TimeZone, Utc};

    if !base_log_dir.exists() {
        return Ok(0);
    }

    let mut runs: Vec<(PathBuf, chrono::DateTime<Utc>)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)? {
        let path = entry?.path();
        if !path.is_dir() || path == active_run {
            continue;
        }
        let stamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix("run_"))
            .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y%m%d_%H%M%S").ok());
        if let Some(naive) = stamp {
            runs.push((path, Utc.from_utc_datetime(&naive)));
        }
    }

    // Newest first
    runs.sort_by(|a, b| b.1.cmp(&a.1));

    let cutoff = Utc::now() - chrono::Duration::days(retention_days.min(36_500) as i64);
    // The active run occupies one retained slot
    let keep = retention_runs.saturating_sub(1);

    let mut removed = 0;
    for (index, (path, started)) in runs.iter().enumerate() {
        if *started < cutoff || index >= keep {
            match std::fs::remove_dir_all(path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(
                    target: "chimera",
                    "Failed to remove old log directory {}: {}",
                    path.display(),
                    e
                ),
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_flags() {
        let flags = CrateDebugFlags::from_args(vec!["--debug-chimera-expression".to_string()]);
        assert!(build_filter(&LoggingConfig::default(), &flags).is_ok());
    }

    #[test]
    fn test_build_filter_rejects_garbage() {
        let config = LoggingConfig {
            level: "chimera=notalevel".to_string(),
            ..LoggingConfig::default()
        };
        assert!(build_filter(&config, &CrateDebugFlags::default()).is_err());
    }

    #[cfg(feature = "file-logging")]
    #[test]
    fn test_cleanup_keeps_newest_runs() {
        let base = tempfile::tempdir().unwrap();
        let now = chrono::Utc::now();
        let mut names = Vec::new();
        for hours in 1..=4 {
            let stamp = (now - chrono::Duration::hours(hours)).format("%Y%m%d_%H%M%S");
            let name = format!("run_{}", stamp);
            std::fs::create_dir_all(base.path().join(&name)).unwrap();
            names.push(name);
        }
        let stale = (now - chrono::Duration::days(90)).format("%Y%m%d_%H%M%S");
        std::fs::create_dir_all(base.path().join(format!("run_{}", stale))).unwrap();
        let active = base.path().join("run_active");
        std::fs::create_dir_all(&active).unwrap();

        let removed = cleanup_old_logs(base.path(), &active, 30, 3).unwrap();
        assert_eq!(removed, 3);
        assert!(active.exists());
        assert!(base.path().join(&names[0]).exists());
        assert!(base.path().join(&names[1]).exists());
        assert!(!base.path().join(&names[2]).exists());
    }
}
