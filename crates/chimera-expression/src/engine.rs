// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
# Trait Expression Engine

Front door for expression: L1 exact cache, then L2 similarity cache, then
the model. Results handed to callers are always owned, pool-acquired values;
the caches hold separate immutable snapshots, so recycling a result can never
alter what a cache returns later.

Batches are dispatched to a sequential, parallel or accelerated tier by size.
Accelerated failures are logged and rerun on the parallel tier.
*/

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chimera_genetics::{random, EnvironmentalConditions, Genotype, TraitExpressionResult};
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::backend::{self, unpack, ExpressionBackend, PackedBatch};
use crate::config::ExpressionConfig;
use crate::dispatch::{self, BatchDecision, BatchStrategy};
use crate::error::{ExpressionError, ExpressionResult};
use crate::exact_cache::ExactCache;
use crate::key::ExpressionKey;
use crate::metrics::{AdvancedCacheMetrics, EngineCounters, MaintenanceReport, PerformanceMetrics};
use crate::model::{express, LocusEffects};
use crate::pool::ObjectPool;
use crate::similarity_cache::SimilarityCache;

enum AcceleratorState {
    Uninitialized,
    Ready(Box<dyn ExpressionBackend>),
    Unavailable,
}

pub struct TraitExpressionEngine {
    config: ExpressionConfig,
    pool: ObjectPool<TraitExpressionResult>,
    exact: ExactCache<ExpressionKey, TraitExpressionResult>,
    similarity: SimilarityCache,
    accelerator: Mutex<AcceleratorState>,
    thread_pool: Option<rayon::ThreadPool>,
    counters: EngineCounters,
    last_retune: Mutex<Instant>,
    closed: AtomicBool,
}

impl TraitExpressionEngine {
    pub fn new(config: ExpressionConfig) -> Self {
        let thread_pool = if config.worker_threads > 0 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(config.worker_threads)
                .thread_name(|i| format!("chimera-expr-{}", i))
                .build()
            {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!(target: "chimera-expression", "Failed to build worker pool ({}), using global rayon pool", e);
                    None
                }
            }
        } else {
            None
        };

        info!(
            target: "chimera-expression",
            "Trait expression engine: caching={}, similarity={}, batch_threshold={}, gpu_threshold={}, workers={}",
            config.enable_caching,
            config.enable_similarity_cache,
            config.batch_threshold,
            config.gpu_threshold,
            thread_pool
                .as_ref()
                .map_or_else(|| "global".to_string(), |p| p.current_num_threads().to_string())
        );

        Self {
            pool: ObjectPool::with_prewarm(config.pool.capacity, config.pool.prewarm),
            exact: ExactCache::new(config.cache.clone()),
            similarity: SimilarityCache::new(config.similarity.clone()),
            accelerator: Mutex::new(AcceleratorState::Uninitialized),
            thread_pool,
            counters: EngineCounters::default(),
            last_retune: Mutex::new(Instant::now()),
            closed: AtomicBool::new(false),
            config,
        }
    }

    /// Engine with an explicit accelerated backend instead of lazy WGPU discovery
    pub fn with_accelerator(config: ExpressionConfig, backend: Box<dyn ExpressionBackend>) -> Self {
        let engine = Self::new(config);
        info!(target: "chimera-expression", "Accelerator injected: {}", backend.backend_name());
        *engine.accelerator.lock() = AcceleratorState::Ready(backend);
        engine
    }

    pub fn config(&self) -> &ExpressionConfig {
        &self.config
    }

    /// Expression of `genotype` under `environment`.
    ///
    /// Never fails: out-of-range environment factors are clamped and missing
    /// loci express the neutral 0.5.
    pub fn calculate_expression(
        &self,
        genotype: &Genotype,
        environment: &EnvironmentalConditions,
    ) -> TraitExpressionResult {
        EngineCounters::bump(&self.counters.calculations);
        let env = environment.clamped();

        if !self.config.enable_caching {
            let mut result = self.pool.get();
            self.compute_into(genotype, &env, &mut result);
            return result;
        }

        let key = ExpressionKey::new(genotype, &env);
        if let Some(result) = self.lookup(&key, genotype, &env) {
            return result;
        }

        let mut result = self.pool.get();
        self.compute_into(genotype, &env, &mut result);
        self.store(key, genotype, &env, &result);
        result
    }

    /// One result per input pair, in input order
    pub fn calculate_expression_batch(
        &self,
        items: &[(&Genotype, &EnvironmentalConditions)],
    ) -> Vec<TraitExpressionResult> {
        if items.is_empty() {
            return Vec::new();
        }

        let decision = self.select_batch_strategy(items.len());
        debug!(target: "chimera-expression", "Batch of {}: {}", items.len(), decision.reason);

        match decision.strategy {
            BatchStrategy::Sequential => {
                EngineCounters::bump(&self.counters.sequential_batches);
                items
                    .iter()
                    .map(|(genotype, env)| self.calculate_expression(genotype, env))
                    .collect()
            }
            BatchStrategy::Parallel => self.run_parallel(items),
            BatchStrategy::Gpu => match self.run_accelerated(items) {
                Ok(results) => results,
                Err(e) => {
                    warn!(target: "chimera-expression", "Accelerated batch failed, retrying on parallel tier: {}", e);
                    EngineCounters::bump(&self.counters.gpu_fallbacks);
                    self.run_parallel(items)
                }
            },
        }
    }

    /// Strategy the dispatcher would use for a batch of `batch_size`
    pub fn select_batch_strategy(&self, batch_size: usize) -> BatchDecision {
        // Only pay for accelerator discovery when a batch could use it
        let available = batch_size >= self.config.gpu_threshold && self.accelerator_ready();
        dispatch::select_batch_strategy(batch_size, &self.config, available)
    }

    /// Hand a result back to the pool
    pub fn recycle(&self, result: TraitExpressionResult) {
        self.pool.put(result);
    }

    pub fn clear_cache(&self) {
        self.exact.clear();
        self.similarity.clear();
        info!(target: "chimera-expression", "Expression caches cleared");
    }

    pub fn get_performance_metrics(&self) -> PerformanceMetrics {
        let c = &self.counters;
        let calculations = EngineCounters::read(&c.calculations);
        let exact_hits = EngineCounters::read(&c.exact_hits);
        let similarity_hits = EngineCounters::read(&c.similarity_hits);
        let computations = EngineCounters::read(&c.computations);
        let compute_nanos = EngineCounters::read(&c.compute_nanos);

        PerformanceMetrics {
            total_calculations: calculations,
            exact_cache_hits: exact_hits,
            similarity_cache_hits: similarity_hits,
            cache_misses: EngineCounters::read(&c.misses),
            cache_hit_rate: if calculations == 0 {
                0.0
            } else {
                (exact_hits + similarity_hits) as f64 / calculations as f64
            },
            computations,
            average_computation_micros: if computations == 0 {
                0.0
            } else {
                compute_nanos as f64 / computations as f64 / 1_000.0
            },
            sequential_batches: EngineCounters::read(&c.sequential_batches),
            parallel_batches: EngineCounters::read(&c.parallel_batches),
            gpu_batches: EngineCounters::read(&c.gpu_batches),
            gpu_fallbacks: EngineCounters::read(&c.gpu_fallbacks),
            accelerator_unavailable: EngineCounters::read(&c.accelerator_unavailable),
            accelerator: match &*self.accelerator.lock() {
                AcceleratorState::Ready(backend) => Some(backend.backend_name().to_string()),
                _ => None,
            },
            pool: self.pool.metrics(),
        }
    }

    pub fn get_advanced_cache_metrics(&self) -> AdvancedCacheMetrics {
        AdvancedCacheMetrics {
            exact: self.exact.metrics(),
            similarity: self.similarity.metrics(),
            promotions: EngineCounters::read(&self.counters.promotions),
            maintenance_ticks: EngineCounters::read(&self.counters.maintenance_ticks),
        }
    }

    /// One maintenance pass: expiry sweeps, periodic threshold retune and
    /// promotion of hot L2 entries into L1
    pub fn tick(&self) -> MaintenanceReport {
        if self.is_closed() {
            return MaintenanceReport::default();
        }
        EngineCounters::bump(&self.counters.maintenance_ticks);

        let mut report = MaintenanceReport {
            exact_expired: self.exact.sweep_expired(),
            similarity_expired: self.similarity.sweep_expired(),
            ..Default::default()
        };

        if self.config.enable_caching && self.config.enable_similarity_cache {
            report.retuned_threshold = {
                let mut last = self.last_retune.lock();
                if last.elapsed() >= self.config.retune_interval {
                    *last = Instant::now();
                    self.similarity.retune_threshold()
                } else {
                    None
                }
            };

            for candidate in self
                .similarity
                .promotion_candidates(self.config.promotion_threshold, self.config.max_promotions)
            {
                if !self.exact.contains_key(&candidate.key) {
                    self.exact.set(candidate.key, candidate.result);
                    report.promoted += 1;
                }
            }
            EngineCounters::add(&self.counters.promotions, report.promoted as u64);
        }

        debug!(target: "chimera-expression", "Maintenance: {:?}", report);
        report
    }

    /// Stop maintenance and drop cached state. Calculations still work
    /// afterwards but nothing further is swept.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.exact.clear();
        self.similarity.clear();
        info!(target: "chimera-expression", "Trait expression engine closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn lookup(
        &self,
        key: &ExpressionKey,
        genotype: &Genotype,
        env: &EnvironmentalConditions,
    ) -> Option<TraitExpressionResult> {
        if let Some(cached) = self.exact.try_get(key) {
            EngineCounters::bump(&self.counters.exact_hits);
            let mut result = self.pool.get();
            result.copy_from(&cached);
            return Some(result);
        }

        if self.config.enable_similarity_cache {
            if let Some(found) = self.similarity.try_get_similar(genotype, env) {
                EngineCounters::bump(&self.counters.similarity_hits);
                let mut result = self.pool.get();
                result.copy_from(&found.result);
                result.genotype_id.clear();
                result.genotype_id.push_str(&genotype.id);
                self.exact.set(key.clone(), Arc::new(result.clone()));
                return Some(result);
            }
        }

        EngineCounters::bump(&self.counters.misses);
        None
    }

    fn store(
        &self,
        key: ExpressionKey,
        genotype: &Genotype,
        env: &EnvironmentalConditions,
        result: &TraitExpressionResult,
    ) {
        let snapshot = Arc::new(result.clone());
        if self.config.enable_similarity_cache {
            self.similarity
                .set(key.clone(), genotype, env, Arc::clone(&snapshot));
        }
        self.exact.set(key, snapshot);
    }

    fn noise(&self) -> f32 {
        random::uniform_noise(self.config.noise_amplitude)
    }

    fn compute_into(
        &self,
        genotype: &Genotype,
        env: &EnvironmentalConditions,
        result: &mut TraitExpressionResult,
    ) {
        let start = Instant::now();
        let raw = express(&LocusEffects::from_genotype(genotype), env, self.noise());
        raw.write_into(&genotype.id, result);
        EngineCounters::bump(&self.counters.computations);
        EngineCounters::add(
            &self.counters.compute_nanos,
            start.elapsed().as_nanos() as u64,
        );
    }

    fn run_parallel(
        &self,
        items: &[(&Genotype, &EnvironmentalConditions)],
    ) -> Vec<TraitExpressionResult> {
        EngineCounters::bump(&self.counters.parallel_batches);
        let work = || {
            items
                .par_iter()
                .map(|(genotype, env)| self.calculate_expression(genotype, env))
                .collect()
        };
        match &self.thread_pool {
            Some(pool) => pool.install(work),
            None => work(),
        }
    }

    fn accelerator_ready(&self) -> bool {
        if !self.config.use_gpu {
            return false;
        }
        let mut state = self.accelerator.lock();
        if matches!(*state, AcceleratorState::Uninitialized) {
            *state = match backend::create_accelerator() {
                Ok(backend) => {
                    info!(target: "chimera-expression", "Accelerator ready: {}", backend.backend_name());
                    AcceleratorState::Ready(backend)
                }
                Err(e) => {
                    warn!(target: "chimera-expression", "Accelerator unavailable, using CPU tiers: {}", e);
                    EngineCounters::bump(&self.counters.accelerator_unavailable);
                    AcceleratorState::Unavailable
                }
            };
        }
        matches!(*state, AcceleratorState::Ready(_))
    }

    fn run_accelerated(
        &self,
        items: &[(&Genotype, &EnvironmentalConditions)],
    ) -> ExpressionResult<Vec<TraitExpressionResult>> {
        let mut results: Vec<Option<TraitExpressionResult>> = Vec::with_capacity(items.len());
        let mut pending: Vec<(usize, EnvironmentalConditions, Option<ExpressionKey>)> = Vec::new();
        let mut batch = PackedBatch::with_capacity(items.len());

        for (index, (genotype, environment)) in items.iter().enumerate() {
            let env = environment.clamped();
            let key = self
                .config
                .enable_caching
                .then(|| ExpressionKey::new(genotype, &env));
            if let Some(key) = &key {
                if let Some(hit) = self.lookup(key, genotype, &env) {
                    results.push(Some(hit));
                    continue;
                }
            }
            batch.push(&LocusEffects::from_genotype(genotype), &env, self.noise());
            pending.push((index, env, key));
            results.push(None);
        }

        if !batch.is_empty() {
            let start = Instant::now();
            let output = {
                let mut state = self.accelerator.lock();
                match &mut *state {
                    AcceleratorState::Ready(backend) => backend.compute_batch(&batch)?,
                    _ => {
                        return Err(ExpressionError::BackendUnavailable(
                            "accelerator not initialized".to_string(),
                        ))
                    }
                }
            };
            let raw = unpack(&output, batch.len())?;
            EngineCounters::add(&self.counters.computations, batch.len() as u64);
            EngineCounters::add(
                &self.counters.compute_nanos,
                start.elapsed().as_nanos() as u64,
            );

            for ((index, env, key), values) in pending.into_iter().zip(raw) {
                let genotype = items[index].0;
                let mut result = self.pool.get();
                values.write_into(&genotype.id, &mut result);
                if let Some(key) = key {
                    self.store(key, genotype, &env, &result);
                }
                results[index] = Some(result);
            }
        }

        EngineCounters::bump(&self.counters.gpu_batches);
        EngineCounters::add(&self.counters.calculations, items.len() as u64);
        Ok(results.into_iter().map(Option::unwrap_or_default).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;
    use chimera_genetics::{loci, Allele, AllelePair};

    fn plant(id: &str, thc: f32) -> Genotype {
        Genotype::new(id)
            .with_locus(
                loci::THC,
                AllelePair::new(Allele::dominant(format!("{}-t", id), thc), Allele::recessive("r", 0.2)),
            )
            .with_locus(
                loci::HEIGHT,
                AllelePair::homozygous(Allele::recessive(format!("{}-h", id), 0.6)),
            )
    }

    struct FailingBackend;

    impl ExpressionBackend for FailingBackend {
        fn backend_name(&self) -> &str {
            "failing"
        }

        fn compute_batch(&mut self, _batch: &PackedBatch) -> ExpressionResult<Vec<f32>> {
            Err(ExpressionError::Backend("device lost".to_string()))
        }
    }

    #[test]
    fn test_repeat_calls_hit_exact_cache() {
        let engine = TraitExpressionEngine::new(ExpressionConfig::deterministic());
        let g = plant("a", 0.8);
        let env = EnvironmentalConditions::default();

        let first = engine.calculate_expression(&g, &env);
        let second = engine.calculate_expression(&g, &env);
        assert_eq!(first, second);

        let m = engine.get_performance_metrics();
        assert_eq!(m.total_calculations, 2);
        assert_eq!(m.exact_cache_hits, 1);
        assert_eq!(m.computations, 1);
    }

    #[test]
    fn test_caching_disabled_always_computes() {
        let config = ExpressionConfig {
            enable_caching: false,
            ..ExpressionConfig::deterministic()
        };
        let engine = TraitExpressionEngine::new(config);
        let g = plant("a", 0.8);
        let env = EnvironmentalConditions::default();
        engine.calculate_expression(&g, &env);
        engine.calculate_expression(&g, &env);
        assert_eq!(engine.get_performance_metrics().computations, 2);
        assert_eq!(engine.get_advanced_cache_metrics().exact.size, 0);
    }

    #[test]
    fn test_similarity_hit_relabelled_and_promoted_to_exact() {
        let engine = TraitExpressionEngine::new(ExpressionConfig::deterministic());
        let env = EnvironmentalConditions::default();
        // Same allele ids, tiny effect difference
        let original = Genotype::new("orig").with_locus(
            loci::THC,
            AllelePair::new(Allele::dominant("t", 0.80), Allele::recessive("r", 0.2)),
        );
        let twin = Genotype::new("twin").with_locus(
            loci::THC,
            AllelePair::new(Allele::dominant("t", 0.81), Allele::recessive("r", 0.2)),
        );

        engine.calculate_expression(&original, &env);
        let approx = engine.calculate_expression(&twin, &env);
        assert_eq!(approx.genotype_id, "twin");

        let m = engine.get_performance_metrics();
        assert_eq!(m.similarity_cache_hits, 1);
        assert_eq!(m.computations, 1);

        // The relabelled copy now lives in L1
        engine.calculate_expression(&twin, &env);
        assert_eq!(engine.get_performance_metrics().exact_cache_hits, 1);
    }

    #[test]
    fn test_gpu_tier_with_injected_backend() {
        let engine = TraitExpressionEngine::with_accelerator(
            ExpressionConfig {
                enable_similarity_cache: false,
                ..ExpressionConfig::deterministic()
            },
            Box::new(CpuBackend::default()),
        );
        let plants: Vec<Genotype> = (0..250).map(|i| plant(&format!("p{}", i), (i % 10) as f32 / 10.0)).collect();
        let env = EnvironmentalConditions::default();
        let items: Vec<_> = plants.iter().map(|g| (g, &env)).collect();

        assert_eq!(engine.select_batch_strategy(items.len()).strategy, BatchStrategy::Gpu);
        let results = engine.calculate_expression_batch(&items);
        assert_eq!(results.len(), 250);
        for (g, r) in plants.iter().zip(&results) {
            assert_eq!(r.genotype_id, g.id);
        }
        let m = engine.get_performance_metrics();
        assert_eq!(m.gpu_batches, 1);
        assert_eq!(m.gpu_fallbacks, 0);
        assert_eq!(m.accelerator.as_deref(), Some("CPU (rayon)"));
    }

    #[test]
    fn test_gpu_failure_falls_back_to_parallel() {
        let engine = TraitExpressionEngine::with_accelerator(
            ExpressionConfig {
                enable_similarity_cache: false,
                ..ExpressionConfig::deterministic()
            },
            Box::new(FailingBackend),
        );
        let plants: Vec<Genotype> = (0..200).map(|i| plant(&format!("p{}", i), 0.5)).collect();
        let env = EnvironmentalConditions::default();
        let items: Vec<_> = plants.iter().map(|g| (g, &env)).collect();

        let results = engine.calculate_expression_batch(&items);
        assert_eq!(results.len(), 200);
        assert_eq!(results[199].genotype_id, "p199");

        let m = engine.get_performance_metrics();
        assert_eq!(m.gpu_fallbacks, 1);
        assert_eq!(m.accelerator_unavailable, 0);
        assert_eq!(m.parallel_batches, 1);
    }

    #[cfg(not(feature = "gpu"))]
    #[test]
    fn test_missing_accelerator_is_not_a_fallback() {
        let engine = TraitExpressionEngine::new(ExpressionConfig {
            enable_similarity_cache: false,
            ..ExpressionConfig::deterministic()
        });
        assert!(engine.config().use_gpu);
        let plants: Vec<Genotype> = (0..250).map(|i| plant(&format!("p{}", i), 0.5)).collect();
        let env = EnvironmentalConditions::default();
        let items: Vec<_> = plants.iter().map(|g| (g, &env)).collect();

        assert_eq!(engine.calculate_expression_batch(&items).len(), 250);
        assert_eq!(engine.calculate_expression_batch(&items).len(), 250);

        let m = engine.get_performance_metrics();
        assert_eq!(m.accelerator_unavailable, 1);
        assert_eq!(m.gpu_fallbacks, 0);
        assert_eq!(m.gpu_batches, 0);
        assert_eq!(m.parallel_batches, 2);
        assert!(m.accelerator.is_none());
    }

    #[test]
    fn test_tick_promotes_hot_similarity_entries() {
        let config = ExpressionConfig {
            retune_interval: std::time::Duration::ZERO,
            promotion_threshold: 0.5,
            ..ExpressionConfig::deterministic()
        };
        let engine = TraitExpressionEngine::new(config);
        let env = EnvironmentalConditions::default();
        let original = Genotype::new("orig").with_locus(
            loci::CBD,
            AllelePair::homozygous(Allele::recessive("c", 0.4)),
        );
        let twin = Genotype::new("twin").with_locus(
            loci::CBD,
            AllelePair::homozygous(Allele::recessive("c", 0.41)),
        );
        engine.calculate_expression(&original, &env);
        engine.calculate_expression(&twin, &env);

        // Evict the original from L1 so promotion has something to restore
        engine.exact.clear();
        let report = engine.tick();
        assert!(report.retuned_threshold.is_some());
        assert_eq!(report.promoted, 1);
        assert_eq!(engine.get_advanced_cache_metrics().promotions, 1);
    }

    #[test]
    fn test_close_clears_and_stops_maintenance() {
        let engine = TraitExpressionEngine::new(ExpressionConfig::deterministic());
        engine.calculate_expression(&plant("a", 0.3), &EnvironmentalConditions::default());
        engine.close();
        assert!(engine.is_closed());
        assert_eq!(engine.get_advanced_cache_metrics().exact.size, 0);
        assert_eq!(engine.tick(), MaintenanceReport::default());
    }
}
