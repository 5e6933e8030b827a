// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Each struct maps to a section of `chimera_configuration.toml`. Defaults
//! match the runtime defaults of the crate the section configures, so an
//! empty file yields the same engine as `Default::default()`.

use std::path::PathBuf;
use std::time::Duration;

use chimera_breeding::BreedingConfig;
use chimera_expression::{
    BatchStrategy, CacheConfig, ExpressionConfig, PoolConfig, SimilarityCacheConfig,
};
use chimera_genetics::EnvironmentalConditions;
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChimeraConfig {
    pub system: SystemConfig,
    pub expression: ExpressionSection,
    pub cache: CacheSection,
    pub pool: PoolSection,
    pub breeding: BreedingSection,
    pub logging: LoggingSection,
}

/// Process-wide settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub log_level: String,
    /// Dedicated expression worker pool size; 0 = rayon global pool
    pub worker_threads: usize,
    /// Seed for reproducible breeding runs
    pub rng_seed: Option<u64>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            worker_threads: 0,
            rng_seed: None,
        }
    }
}

/// Expression engine switches and batch tier thresholds
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExpressionSection {
    pub enable_caching: bool,
    pub enable_similarity_cache: bool,
    pub noise_amplitude: f32,
    pub batch_threshold: usize,
    pub gpu_threshold: usize,
    pub use_gpu: bool,
}

impl Default for ExpressionSection {
    fn default() -> Self {
        let runtime = ExpressionConfig::default();
        Self {
            enable_caching: runtime.enable_caching,
            enable_similarity_cache: runtime.enable_similarity_cache,
            noise_amplitude: runtime.noise_amplitude,
            batch_threshold: runtime.batch_threshold,
            gpu_threshold: runtime.gpu_threshold,
            use_gpu: runtime.use_gpu,
        }
    }
}

impl ExpressionSection {
    /// Pin every non-empty batch to one dispatch tier.
    ///
    /// `Gpu` still falls back to the parallel tier when no accelerator is found.
    pub fn force_strategy(&mut self, strategy: BatchStrategy) {
        let (batch_threshold, gpu_threshold, use_gpu) = match strategy {
            BatchStrategy::Sequential => (usize::MAX, usize::MAX, false),
            BatchStrategy::Parallel => (1, usize::MAX, false),
            BatchStrategy::Gpu => (1, 1, true),
        };
        self.batch_threshold = batch_threshold;
        self.gpu_threshold = gpu_threshold;
        self.use_gpu = use_gpu;
    }
}

/// L1/L2 cache sizing, expiry and maintenance cadence
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSection {
    pub max_cache_size: usize,
    pub ttl_secs: u64,
    pub eviction_fraction: f32,
    pub async_eviction: bool,
    pub sweep_interval_secs: u64,
    pub similarity_capacity: usize,
    pub similarity_ttl_secs: u64,
    pub initial_similarity_threshold: f32,
    pub threshold_floor: f32,
    pub threshold_ceiling: f32,
    pub parallel_scan_threshold: usize,
    pub retune_interval_secs: u64,
    pub promotion_threshold: f32,
    pub max_promotions: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        let runtime = ExpressionConfig::default();
        Self {
            max_cache_size: runtime.cache.max_cache_size,
            ttl_secs: runtime.cache.ttl.as_secs(),
            eviction_fraction: runtime.cache.eviction_fraction,
            async_eviction: runtime.cache.async_eviction,
            sweep_interval_secs: runtime.sweep_interval.as_secs(),
            similarity_capacity: runtime.similarity.capacity,
            similarity_ttl_secs: runtime.similarity.ttl.as_secs(),
            initial_similarity_threshold: runtime.similarity.initial_threshold,
            threshold_floor: runtime.similarity.threshold_floor,
            threshold_ceiling: runtime.similarity.threshold_ceiling,
            parallel_scan_threshold: runtime.similarity.parallel_scan_threshold,
            retune_interval_secs: runtime.retune_interval.as_secs(),
            promotion_threshold: runtime.promotion_threshold,
            max_promotions: runtime.max_promotions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolSection {
    pub capacity: usize,
    pub prewarm: usize,
}

impl Default for PoolSection {
    fn default() -> Self {
        let runtime = PoolConfig::default();
        Self {
            capacity: runtime.capacity,
            prewarm: runtime.prewarm,
        }
    }
}

/// Breeding engine settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreedingSection {
    pub mutation_rate: f32,
    pub allow_inbreeding: bool,
    pub inbreeding_depression_factor: f32,
    pub max_generations_tracked: usize,
    pub lineage_retention_hours: u64,
    pub pedigree_cleanup_batch: usize,
    pub compatibility_floor: f32,
    pub low_compatibility_warning: f32,
    pub offspring_per_pair: usize,
    pub evaluation_environment: EnvironmentalConditions,
}

impl Default for BreedingSection {
    fn default() -> Self {
        let runtime = BreedingConfig::default();
        Self {
            mutation_rate: runtime.mutation_rate,
            allow_inbreeding: runtime.allow_inbreeding,
            inbreeding_depression_factor: runtime.inbreeding_depression_factor,
            max_generations_tracked: runtime.max_generations_tracked,
            lineage_retention_hours: runtime.lineage_retention_hours,
            pedigree_cleanup_batch: runtime.pedigree_cleanup_batch,
            compatibility_floor: runtime.compatibility_floor,
            low_compatibility_warning: runtime.low_compatibility_warning,
            offspring_per_pair: runtime.offspring_per_pair,
            evaluation_environment: runtime.evaluation_environment,
        }
    }
}

/// Logging output
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter directive; `system.log_level` is used when empty
    pub level: String,
    pub json: bool,
    /// Rolling log files are written here when set
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: String::new(),
            json: false,
            log_dir: None,
        }
    }
}

impl ChimeraConfig {
    /// Runtime settings for `TraitExpressionEngine`
    pub fn expression_config(&self) -> ExpressionConfig {
        let expression = &self.expression;
        let cache = &self.cache;
        ExpressionConfig {
            enable_caching: expression.enable_caching,
            enable_similarity_cache: expression.enable_similarity_cache,
            noise_amplitude: expression.noise_amplitude,
            batch_threshold: expression.batch_threshold,
            gpu_threshold: expression.gpu_threshold,
            use_gpu: expression.use_gpu,
            worker_threads: self.system.worker_threads,
            sweep_interval: Duration::from_secs(cache.sweep_interval_secs),
            retune_interval: Duration::from_secs(cache.retune_interval_secs),
            promotion_threshold: cache.promotion_threshold,
            max_promotions: cache.max_promotions,
            cache: CacheConfig {
                max_cache_size: cache.max_cache_size,
                ttl: Duration::from_secs(cache.ttl_secs),
                eviction_fraction: cache.eviction_fraction,
                async_eviction: cache.async_eviction,
            },
            similarity: SimilarityCacheConfig {
                capacity: cache.similarity_capacity,
                ttl: Duration::from_secs(cache.similarity_ttl_secs),
                initial_threshold: cache.initial_similarity_threshold,
                threshold_floor: cache.threshold_floor,
                threshold_ceiling: cache.threshold_ceiling,
                parallel_scan_threshold: cache.parallel_scan_threshold,
            },
            pool: PoolConfig {
                capacity: self.pool.capacity,
                prewarm: self.pool.prewarm,
            },
        }
    }

    /// Runtime settings for `BreedingCalculationEngine`
    pub fn breeding_config(&self) -> BreedingConfig {
        let breeding = &self.breeding;
        BreedingConfig {
            mutation_rate: breeding.mutation_rate,
            allow_inbreeding: breeding.allow_inbreeding,
            inbreeding_depression_factor: breeding.inbreeding_depression_factor,
            max_generations_tracked: breeding.max_generations_tracked,
            lineage_retention_hours: breeding.lineage_retention_hours,
            pedigree_cleanup_batch: breeding.pedigree_cleanup_batch,
            compatibility_floor: breeding.compatibility_floor,
            low_compatibility_warning: breeding.low_compatibility_warning,
            offspring_per_pair: breeding.offspring_per_pair,
            evaluation_environment: breeding.evaluation_environment,
            rng_seed: self.system.rng_seed,
        }
    }

    /// Effective log filter: `[logging] level`, else `[system] log_level`
    pub fn effective_log_level(&self) -> &str {
        if self.logging.level.is_empty() {
            &self.system.log_level
        } else {
            &self.logging.level
        }
    }
}
