// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later ones win:
//! 1. TOML file
//! 2. Environment variables
//! 3. CLI arguments

use crate::{ChimeraConfig, ConfigError, ConfigResult};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "chimera_configuration.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "CHIMERA_CONFIG_PATH";

/// Find the Chimera configuration file
///
/// Search order:
/// 1. `CHIMERA_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the file is not found or contains invalid TOML. Call
/// [`crate::validate_config`] afterwards to check value ranges.
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<ChimeraConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: ChimeraConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

fn parse_flag(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower == "true" || lower == "1" || lower == "yes"
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `CHIMERA_LOG_LEVEL` -> `system.log_level`
/// - `CHIMERA_WORKER_THREADS` -> `system.worker_threads`
/// - `CHIMERA_RNG_SEED` -> `system.rng_seed`
/// - `CHIMERA_ENABLE_CACHING` -> `expression.enable_caching`
/// - `CHIMERA_USE_GPU` -> `expression.use_gpu`
/// - `CHIMERA_GPU_THRESHOLD` -> `expression.gpu_threshold`
/// - `CHIMERA_NOISE_AMPLITUDE` -> `expression.noise_amplitude`
/// - `CHIMERA_MAX_CACHE_SIZE` -> `cache.max_cache_size`
/// - `CHIMERA_MUTATION_RATE` -> `breeding.mutation_rate`
/// - `CHIMERA_ALLOW_INBREEDING` -> `breeding.allow_inbreeding`
/// - `CHIMERA_LOG_JSON` -> `logging.json`
/// - `CHIMERA_LOG_DIR` -> `logging.log_dir`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut ChimeraConfig) {
    // System settings
    if let Ok(value) = env::var("CHIMERA_LOG_LEVEL") {
        config.system.log_level = value;
    }
    if let Ok(value) = env::var("CHIMERA_WORKER_THREADS") {
        if let Ok(threads) = value.parse::<usize>() {
            config.system.worker_threads = threads;
        }
    }
    if let Ok(value) = env::var("CHIMERA_RNG_SEED") {
        if let Ok(seed) = value.parse::<u64>() {
            config.system.rng_seed = Some(seed);
        }
    }

    // Expression settings
    if let Ok(value) = env::var("CHIMERA_ENABLE_CACHING") {
        config.expression.enable_caching = parse_flag(&value);
    }
    if let Ok(value) = env::var("CHIMERA_USE_GPU") {
        config.expression.use_gpu = parse_flag(&value);
    }
    if let Ok(value) = env::var("CHIMERA_GPU_THRESHOLD") {
        if let Ok(threshold) = value.parse::<usize>() {
            config.expression.gpu_threshold = threshold;
        }
    }
    if let Ok(value) = env::var("CHIMERA_NOISE_AMPLITUDE") {
        if let Ok(amplitude) = value.parse::<f32>() {
            config.expression.noise_amplitude = amplitude;
        }
    }

    // Cache settings
    if let Ok(value) = env::var("CHIMERA_MAX_CACHE_SIZE") {
        if let Ok(size) = value.parse::<usize>() {
            config.cache.max_cache_size = size;
        }
    }

    // Breeding settings
    if let Ok(value) = env::var("CHIMERA_MUTATION_RATE") {
        if let Ok(rate) = value.parse::<f32>() {
            config.breeding.mutation_rate = rate;
        }
    }
    if let Ok(value) = env::var("CHIMERA_ALLOW_INBREEDING") {
        config.breeding.allow_inbreeding = parse_flag(&value);
    }

    // Logging settings
    if let Ok(value) = env::var("CHIMERA_LOG_JSON") {
        config.logging.json = parse_flag(&value);
    }
    if let Ok(value) = env::var("CHIMERA_LOG_DIR") {
        config.logging.log_dir = Some(PathBuf::from(value));
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Key/value pairs (e.g., `{"use_gpu": "false", "rng_seed": "7"}`)
pub fn apply_cli_overrides(config: &mut ChimeraConfig, cli_args: &HashMap<String, String>) {
    // System settings
    if let Some(value) = cli_args.get("log_level") {
        config.system.log_level = value.clone();
    }
    if let Some(value) = cli_args.get("worker_threads") {
        if let Ok(threads) = value.parse::<usize>() {
            config.system.worker_threads = threads;
        }
    }
    if let Some(value) = cli_args.get("rng_seed") {
        if let Ok(seed) = value.parse::<u64>() {
            config.system.rng_seed = Some(seed);
        }
    }

    // Expression settings
    if let Some(value) = cli_args.get("use_gpu") {
        config.expression.use_gpu = parse_flag(value);
    }
    if let Some(value) = cli_args.get("enable_caching") {
        config.expression.enable_caching = parse_flag(value);
    }
    if let Some(value) = cli_args.get("batch_threshold") {
        if let Ok(threshold) = value.parse::<usize>() {
            config.expression.batch_threshold = threshold;
        }
    }
    if let Some(value) = cli_args.get("gpu_threshold") {
        if let Ok(threshold) = value.parse::<usize>() {
            config.expression.gpu_threshold = threshold;
        }
    }
    if let Some(value) = cli_args.get("noise_amplitude") {
        if let Ok(amplitude) = value.parse::<f32>() {
            config.expression.noise_amplitude = amplitude;
        }
    }

    // Breeding settings
    if let Some(value) = cli_args.get("mutation_rate") {
        if let Ok(rate) = value.parse::<f32>() {
            config.breeding.mutation_rate = rate;
        }
    }
    if let Some(value) = cli_args.get("allow_inbreeding") {
        config.breeding.allow_inbreeding = parse_flag(value);
    }
    if let Some(value) = cli_args.get("offspring_per_pair") {
        if let Ok(count) = value.parse::<usize>() {
            config.breeding.offspring_per_pair = count;
        }
    }

    // Logging settings
    if let Some(value) = cli_args.get("log_json") {
        config.logging.json = parse_flag(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const OVERRIDE_VARS: &[&str] = &[
        "CHIMERA_LOG_LEVEL",
        "CHIMERA_WORKER_THREADS",
        "CHIMERA_RNG_SEED",
        "CHIMERA_ENABLE_CACHING",
        "CHIMERA_USE_GPU",
        "CHIMERA_GPU_THRESHOLD",
        "CHIMERA_NOISE_AMPLITUDE",
        "CHIMERA_MAX_CACHE_SIZE",
        "CHIMERA_MUTATION_RATE",
        "CHIMERA_ALLOW_INBREEDING",
        "CHIMERA_LOG_JSON",
        "CHIMERA_LOG_DIR",
    ];

    fn clear_override_vars() {
        for var in OVERRIDE_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        let found = find_config_file().unwrap();
        env::remove_var(CONFIG_PATH_ENV);
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var(CONFIG_PATH_ENV, "/nonexistent/chimera.toml");
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_override_vars();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[expression]").unwrap();
        writeln!(file, "gpu_threshold = 500").unwrap();
        writeln!(file, "[breeding]").unwrap();
        writeln!(file, "mutation_rate = 0.05").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();
        assert_eq!(config.expression.gpu_threshold, 500);
        assert_eq!(config.expression.batch_threshold, 50);
        assert_eq!(config.breeding.mutation_rate, 0.05);
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[cache").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_override_vars();
        let mut config = ChimeraConfig::default();

        env::set_var("CHIMERA_USE_GPU", "false");
        env::set_var("CHIMERA_RNG_SEED", "42");
        env::set_var("CHIMERA_MUTATION_RATE", "not-a-number");
        env::set_var("CHIMERA_LOG_DIR", "/tmp/chimera-logs");

        apply_environment_overrides(&mut config);
        clear_override_vars();

        assert!(!config.expression.use_gpu);
        assert_eq!(config.system.rng_seed, Some(42));
        assert_eq!(config.breeding.mutation_rate, 0.01);
        assert_eq!(config.logging.log_dir, Some(PathBuf::from("/tmp/chimera-logs")));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = ChimeraConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("gpu_threshold".to_string(), "1000".to_string());
        cli_args.insert("allow_inbreeding".to_string(), "yes".to_string());

        apply_cli_overrides(&mut config, &cli_args);
        assert_eq!(config.expression.gpu_threshold, 1000);
        assert!(config.breeding.allow_inbreeding);
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_override_vars();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[system]").unwrap();
        writeln!(file, "worker_threads = 2").unwrap();
        writeln!(file, "log_level = \"warn\"").unwrap();

        env::set_var("CHIMERA_WORKER_THREADS", "4");
        env::set_var("CHIMERA_LOG_LEVEL", "debug");
        let mut cli_args = HashMap::new();
        cli_args.insert("worker_threads".to_string(), "8".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();
        clear_override_vars();

        // CLI beats env, env beats file
        assert_eq!(config.system.worker_threads, 8);
        assert_eq!(config.system.log_level, "debug");
    }
}
