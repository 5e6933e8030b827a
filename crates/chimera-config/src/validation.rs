// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Every rule runs and all violations are reported together.

use crate::{ChimeraConfig, ConfigError, ConfigResult};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    OutOfRange { field: String, value: f32, min: f32, max: f32 },
    NotPositive { field: String },
    ThresholdOrder { lower: String, upper: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { field, value, min, max } => {
                write!(f, "{} = {} is outside [{}, {}]", field, value, min, max)
            }
            Self::NotPositive { field } => write!(f, "{} must be greater than zero", field),
            Self::ThresholdOrder { lower, upper } => {
                write!(f, "{} must not exceed {}", lower, upper)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks fractions in [0, 1], similarity threshold ordering, batch tier
/// ordering and positive capacities.
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation
pub fn validate_config(config: &ChimeraConfig) -> ConfigResult<()> {
    let errors = collect_violations(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// All rule violations, in section order
pub fn collect_violations(config: &ChimeraConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_fractions(config, &mut errors);
    validate_threshold_order(config, &mut errors);
    validate_capacities(config, &mut errors);
    errors
}

fn check_fraction(field: &str, value: f32, errors: &mut Vec<ConfigValidationError>) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(ConfigValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min: 0.0,
            max: 1.0,
        });
    }
}

fn validate_fractions(config: &ChimeraConfig, errors: &mut Vec<ConfigValidationError>) {
    check_fraction("expression.noise_amplitude", config.expression.noise_amplitude, errors);

    let cache = &config.cache;
    check_fraction("cache.eviction_fraction", cache.eviction_fraction, errors);
    check_fraction("cache.initial_similarity_threshold", cache.initial_similarity_threshold, errors);
    check_fraction("cache.threshold_floor", cache.threshold_floor, errors);
    check_fraction("cache.threshold_ceiling", cache.threshold_ceiling, errors);
    check_fraction("cache.promotion_threshold", cache.promotion_threshold, errors);

    let breeding = &config.breeding;
    check_fraction("breeding.mutation_rate", breeding.mutation_rate, errors);
    check_fraction("breeding.inbreeding_depression_factor", breeding.inbreeding_depression_factor, errors);
    check_fraction("breeding.compatibility_floor", breeding.compatibility_floor, errors);
    check_fraction("breeding.low_compatibility_warning", breeding.low_compatibility_warning, errors);
}

fn validate_threshold_order(config: &ChimeraConfig, errors: &mut Vec<ConfigValidationError>) {
    let cache = &config.cache;
    if cache.threshold_floor > cache.threshold_ceiling {
        errors.push(ConfigValidationError::ThresholdOrder {
            lower: "cache.threshold_floor".to_string(),
            upper: "cache.threshold_ceiling".to_string(),
        });
    } else if !(cache.threshold_floor..=cache.threshold_ceiling).contains(&cache.initial_similarity_threshold) {
        errors.push(ConfigValidationError::OutOfRange {
            field: "cache.initial_similarity_threshold".to_string(),
            value: cache.initial_similarity_threshold,
            min: cache.threshold_floor,
            max: cache.threshold_ceiling,
        });
    }

    if config.expression.batch_threshold > config.expression.gpu_threshold {
        errors.push(ConfigValidationError::ThresholdOrder {
            lower: "expression.batch_threshold".to_string(),
            upper: "expression.gpu_threshold".to_string(),
        });
    }
}

fn validate_capacities(config: &ChimeraConfig, errors: &mut Vec<ConfigValidationError>) {
    let positive = [
        ("cache.max_cache_size", config.cache.max_cache_size),
        ("cache.similarity_capacity", config.cache.similarity_capacity),
        ("pool.capacity", config.pool.capacity),
        ("breeding.max_generations_tracked", config.breeding.max_generations_tracked),
        ("breeding.pedigree_cleanup_batch", config.breeding.pedigree_cleanup_batch),
        ("breeding.offspring_per_pair", config.breeding.offspring_per_pair),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ConfigValidationError::NotPositive {
                field: field.to_string(),
            });
        }
    }
}
