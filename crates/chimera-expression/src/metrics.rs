// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Engine counters and the metric snapshots built from them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::exact_cache::CacheMetrics;
use crate::pool::PoolMetrics;
use crate::similarity_cache::SimilarityCacheMetrics;

#[derive(Debug, Default)]
pub(crate) struct EngineCounters {
    pub calculations: AtomicU64,
    pub exact_hits: AtomicU64,
    pub similarity_hits: AtomicU64,
    pub misses: AtomicU64,
    pub computations: AtomicU64,
    pub compute_nanos: AtomicU64,
    pub sequential_batches: AtomicU64,
    pub parallel_batches: AtomicU64,
    pub gpu_batches: AtomicU64,
    pub gpu_fallbacks: AtomicU64,
    pub accelerator_unavailable: AtomicU64,
    pub maintenance_ticks: AtomicU64,
    pub promotions: AtomicU64,
}

impl EngineCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, value: u64) {
        counter.fetch_add(value, Ordering::Relaxed);
    }

    pub fn read(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceMetrics {
    pub total_calculations: u64,
    pub exact_cache_hits: u64,
    pub similarity_cache_hits: u64,
    pub cache_misses: u64,
    /// Share of calculations answered by either cache tier
    pub cache_hit_rate: f64,
    pub computations: u64,
    pub average_computation_micros: f64,
    pub sequential_batches: u64,
    pub parallel_batches: u64,
    pub gpu_batches: u64,
    /// Accelerated batches that failed and were rerun on the parallel tier
    pub gpu_fallbacks: u64,
    /// Accelerator discovery failures
    pub accelerator_unavailable: u64,
    pub accelerator: Option<String>,
    pub pool: PoolMetrics,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AdvancedCacheMetrics {
    pub exact: CacheMetrics,
    pub similarity: SimilarityCacheMetrics,
    pub promotions: u64,
    pub maintenance_ticks: u64,
}

/// Outcome of one maintenance pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaintenanceReport {
    pub exact_expired: usize,
    pub similarity_expired: usize,
    /// New L2 threshold, when a retune ran
    pub retuned_threshold: Option<f32>,
    pub promoted: usize,
}
