// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Runtime configuration for the expression engine.
//!
//! These are plain structs with defaults. The application layer builds them
//! from its own configuration source so this crate stays free of file formats.

use std::time::Duration;

/// Exact (L1) cache settings
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_cache_size: usize,
    pub ttl: Duration,
    /// Fraction of entries removed per eviction pass (default 0.2)
    pub eviction_fraction: f32,
    /// Run eviction on the rayon pool instead of the inserting thread
    pub async_eviction: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_cache_size: 10_000,
            ttl: Duration::from_secs(300),
            eviction_fraction: 0.2,
            async_eviction: true,
        }
    }
}

/// Similarity (L2) cache settings
#[derive(Debug, Clone)]
pub struct SimilarityCacheConfig {
    pub capacity: usize,
    pub ttl: Duration,
    pub initial_threshold: f32,
    pub threshold_floor: f32,
    pub threshold_ceiling: f32,
    /// Entry count above which lookups scan in parallel
    pub parallel_scan_threshold: usize,
}

impl Default for SimilarityCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 5_000,
            ttl: Duration::from_secs(600),
            initial_threshold: 0.85,
            threshold_floor: 0.70,
            threshold_ceiling: 0.95,
            parallel_scan_threshold: 256,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub capacity: usize,
    /// Instances allocated up front
    pub prewarm: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 1_024,
            prewarm: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpressionConfig {
    pub enable_caching: bool,
    pub enable_similarity_cache: bool,
    /// Half-width of the uniform noise added to adaptive capacity; 0 disables it
    pub noise_amplitude: f32,
    /// Minimum batch size for the parallel tier
    pub batch_threshold: usize,
    /// Minimum batch size for the accelerated tier
    pub gpu_threshold: usize,
    pub use_gpu: bool,
    /// Dedicated rayon pool size; 0 uses the global pool
    pub worker_threads: usize,
    pub sweep_interval: Duration,
    pub retune_interval: Duration,
    /// Minimum access frequency and average similarity for L2 to L1 promotion
    pub promotion_threshold: f32,
    pub max_promotions: usize,
    pub cache: CacheConfig,
    pub similarity: SimilarityCacheConfig,
    pub pool: PoolConfig,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            enable_caching: true,
            enable_similarity_cache: true,
            noise_amplitude: 0.02,
            batch_threshold: 50,
            gpu_threshold: 200,
            use_gpu: true,
            worker_threads: 0,
            sweep_interval: Duration::from_secs(60),
            retune_interval: Duration::from_secs(300),
            promotion_threshold: 0.9,
            max_promotions: 100,
            cache: CacheConfig::default(),
            similarity: SimilarityCacheConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

impl ExpressionConfig {
    /// Noise-free configuration, the usual choice for tests and replays
    pub fn deterministic() -> Self {
        Self {
            noise_amplitude: 0.0,
            ..Self::default()
        }
    }
}
