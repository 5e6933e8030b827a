// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
Similarity-aware (L2) cache.

Answers "have we computed something close enough?" by scoring the request
against every live entry with [`overall_similarity`] and returning the best
match at or above a self-tuning threshold.

Per-entry statistics (access count, last access, running average of observed
match similarity) sit behind a small per-entry mutex, so concurrent hits on
the same entry may interleave but never tear the stored result, which is an
immutable `Arc` snapshot.

Lookups copy the live entries' `Arc`s out under the map's read lock and score
them after the guard is dropped. The scan may fan out over rayon, and a
worker that steals a sibling job inside that scan can reach [`SimilarityCache::set`];
`parking_lot::RwLock` is not reentrant, so no map guard may be held across it.
*/

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use chimera_genetics::{EnvironmentalConditions, Genotype, TraitExpressionResult};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::SimilarityCacheConfig;
use crate::key::ExpressionKey;
use crate::similarity::overall_similarity;

/// Upper bound on promotion candidates returned per call
pub const MAX_PROMOTION_CANDIDATES: usize = 100;

/// Share of entries dropped per eviction pass beyond the overflow itself
const EVICTION_HEADROOM: f64 = 0.1;

/// Threshold moves this fraction of the way toward the observed percentile
const RETUNE_RATE: f32 = 0.1;
const RETUNE_PERCENTILE: f64 = 0.8;

const SECONDS_PER_HOUR: f64 = 3600.0;

struct EntryStats {
    access_count: u64,
    last_accessed: Instant,
    average_similarity: f32,
}

struct SimilarityEntry {
    key: ExpressionKey,
    result: Arc<TraitExpressionResult>,
    genotype: Arc<Genotype>,
    environment: EnvironmentalConditions,
    created_at: Instant,
    expires_at: Instant,
    stats: Mutex<EntryStats>,
}

impl SimilarityEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

fn match_score<'a>(
    genotype: &Genotype,
    environment: &EnvironmentalConditions,
    threshold: f32,
    entry: &'a Arc<SimilarityEntry>,
) -> Option<(f32, &'a Arc<SimilarityEntry>)> {
    let similarity = overall_similarity(genotype, environment, &entry.genotype, &entry.environment);
    (similarity >= threshold).then_some((similarity, entry))
}

/// Best approximate match for a request
#[derive(Debug, Clone)]
pub struct SimilarMatch {
    pub result: Arc<TraitExpressionResult>,
    pub similarity: f32,
    /// Key of the entry that matched
    pub key: ExpressionKey,
}

/// Hot L2 entry eligible for copying into L1
#[derive(Debug, Clone)]
pub struct PromotionCandidate {
    pub key: ExpressionKey,
    pub result: Arc<TraitExpressionResult>,
    /// Accesses per hour alive
    pub access_frequency: f64,
    pub average_similarity: f32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SimilarityCacheMetrics {
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub size: usize,
    pub capacity: usize,
    pub evictions: u64,
    pub expirations: u64,
    pub retunes: u64,
    pub current_threshold: f32,
    /// Mean similarity of returned matches
    pub average_match_similarity: f64,
}

pub struct SimilarityCache {
    config: SimilarityCacheConfig,
    entries: RwLock<AHashMap<ExpressionKey, Arc<SimilarityEntry>>>,
    /// f32 bit pattern of the live threshold
    threshold_bits: AtomicU32,
    retune_lock: Mutex<()>,
    sweep_lock: Mutex<()>,
    requests: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
    retunes: AtomicU64,
    /// Sum of matched similarities, in millionths
    matched_similarity_micros: AtomicU64,
}

impl SimilarityCache {
    pub fn new(config: SimilarityCacheConfig) -> Self {
        let initial = config
            .initial_threshold
            .clamp(config.threshold_floor, config.threshold_ceiling);
        Self {
            threshold_bits: AtomicU32::new(initial.to_bits()),
            config,
            entries: RwLock::new(AHashMap::new()),
            retune_lock: Mutex::new(()),
            sweep_lock: Mutex::new(()),
            requests: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            retunes: AtomicU64::new(0),
            matched_similarity_micros: AtomicU64::new(0),
        }
    }

    /// Current match threshold
    pub fn threshold(&self) -> f32 {
        f32::from_bits(self.threshold_bits.load(Ordering::Acquire))
    }

    /// Best live entry with similarity at or above the threshold
    pub fn try_get_similar(
        &self,
        genotype: &Genotype,
        environment: &EnvironmentalConditions,
    ) -> Option<SimilarMatch> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let threshold = self.threshold();
        let now = Instant::now();

        let live: Vec<Arc<SimilarityEntry>> = {
            let entries = self.entries.read();
            entries
                .values()
                .filter(|entry| !entry.is_expired(now))
                .cloned()
                .collect()
        };

        let best = if live.len() >= self.config.parallel_scan_threshold {
            live.par_iter()
                .filter_map(|entry| match_score(genotype, environment, threshold, entry))
                .max_by(|a, b| a.0.total_cmp(&b.0))
        } else {
            live.iter()
                .filter_map(|entry| match_score(genotype, environment, threshold, entry))
                .max_by(|a, b| a.0.total_cmp(&b.0))
        };

        let Some((similarity, entry)) = best else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        {
            let mut stats = entry.stats.lock();
            // The stored self-similarity of 1.0 counts as the first observation
            let observations = stats.access_count as f32 + 1.0;
            stats.average_similarity =
                (stats.average_similarity * observations + similarity) / (observations + 1.0);
            stats.access_count += 1;
            stats.last_accessed = now;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        self.matched_similarity_micros
            .fetch_add((similarity as f64 * 1e6) as u64, Ordering::Relaxed);
        trace!(target: "chimera-expression", "[L2] Match for {} at similarity {:.3}", genotype.id, similarity);

        Some(SimilarMatch {
            result: Arc::clone(&entry.result),
            similarity,
            key: entry.key.clone(),
        })
    }

    /// Store a computed result together with the inputs that produced it
    pub fn set(
        &self,
        key: ExpressionKey,
        genotype: &Genotype,
        environment: &EnvironmentalConditions,
        result: Arc<TraitExpressionResult>,
    ) {
        let now = Instant::now();
        let entry = Arc::new(SimilarityEntry {
            key: key.clone(),
            result,
            genotype: Arc::new(genotype.clone()),
            environment: *environment,
            created_at: now,
            expires_at: now + self.config.ttl,
            stats: Mutex::new(EntryStats {
                access_count: 0,
                last_accessed: now,
                average_similarity: 1.0,
            }),
        });
        let len = {
            let mut entries = self.entries.write();
            entries.insert(key, entry);
            entries.len()
        };
        if len > self.config.capacity {
            self.evict();
        }
    }

    /// Drop the entries with the lowest access rate
    /// (`access_count / hours since last access`), expired entries first
    pub fn evict(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let len = entries.len();
        if len <= self.config.capacity {
            return 0;
        }
        let overflow = len - self.config.capacity;
        let headroom = (self.config.capacity as f64 * EVICTION_HEADROOM).ceil() as usize;
        let target = overflow.max(headroom).min(len);

        let mut ranked: Vec<(f64, ExpressionKey)> = entries
            .iter()
            .map(|(key, entry)| {
                let rate = if entry.is_expired(now) {
                    f64::NEG_INFINITY
                } else {
                    let stats = entry.stats.lock();
                    let hours = (now.duration_since(stats.last_accessed).as_secs_f64()
                        / SECONDS_PER_HOUR)
                        .max(1.0 / SECONDS_PER_HOUR);
                    stats.access_count as f64 / hours
                };
                (rate, key.clone())
            })
            .collect();
        ranked.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        for (_, key) in ranked.into_iter().take(target) {
            entries.remove(&key);
        }
        drop(entries);

        self.evictions.fetch_add(target as u64, Ordering::Relaxed);
        debug!(target: "chimera-expression", "[L2] Evicted {} of {} entries", target, len);
        target
    }

    /// Move the threshold 10% toward the 80th percentile of live entries'
    /// average similarity, clamped to the configured band.
    ///
    /// Returns the new threshold, or `None` when there is nothing to learn
    /// from or another retune is in progress.
    pub fn retune_threshold(&self) -> Option<f32> {
        let _guard = self.retune_lock.try_lock()?;
        let now = Instant::now();

        let mut averages: Vec<f32> = {
            let entries = self.entries.read();
            entries
                .values()
                .filter(|entry| !entry.is_expired(now))
                .map(|entry| entry.stats.lock().average_similarity)
                .collect()
        };
        if averages.is_empty() {
            return None;
        }
        averages.sort_unstable_by(|a, b| a.total_cmp(b));

        // Nearest-rank percentile
        let rank = (RETUNE_PERCENTILE * averages.len() as f64).ceil() as usize;
        let percentile = averages[rank.clamp(1, averages.len()) - 1];

        let current = self.threshold();
        let next = (current + RETUNE_RATE * (percentile - current))
            .clamp(self.config.threshold_floor, self.config.threshold_ceiling);
        self.threshold_bits.store(next.to_bits(), Ordering::Release);
        self.retunes.fetch_add(1, Ordering::Relaxed);

        debug!(
            target: "chimera-expression",
            "[L2] Threshold retuned {:.4} -> {:.4} (p80 {:.4} over {} entries)",
            current, next, percentile, averages.len()
        );
        Some(next)
    }

    /// Entries whose access frequency and average similarity both exceed
    /// `threshold`, most frequently accessed first
    pub fn promotion_candidates(&self, threshold: f32, max: usize) -> Vec<PromotionCandidate> {
        let now = Instant::now();
        let limit = max.min(MAX_PROMOTION_CANDIDATES);
        if limit == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<PromotionCandidate> = {
            let entries = self.entries.read();
            entries
                .iter()
                .filter(|(_, entry)| !entry.is_expired(now))
                .filter_map(|(key, entry)| {
                    let stats = entry.stats.lock();
                    let alive = now
                        .duration_since(entry.created_at)
                        .max(Duration::from_secs(1));
                    let frequency =
                        stats.access_count as f64 / (alive.as_secs_f64() / SECONDS_PER_HOUR);
                    (frequency > threshold as f64 && stats.average_similarity > threshold).then(
                        || PromotionCandidate {
                            key: key.clone(),
                            result: Arc::clone(&entry.result),
                            access_frequency: frequency,
                            average_similarity: stats.average_similarity,
                        },
                    )
                })
                .collect()
        };

        candidates.sort_unstable_by(|a, b| b.access_frequency.total_cmp(&a.access_frequency));
        candidates.truncate(limit);
        candidates
    }

    /// Remove expired entries; skipped if a sweep is already running
    pub fn sweep_expired(&self) -> usize {
        let Some(_guard) = self.sweep_lock.try_lock() else {
            return 0;
        };
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        drop(entries);

        if removed > 0 {
            self.expirations.fetch_add(removed as u64, Ordering::Relaxed);
            debug!(target: "chimera-expression", "[L2] Sweep removed {} expired entries", removed);
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn metrics(&self) -> SimilarityCacheMetrics {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        SimilarityCacheMetrics {
            total_requests: self.requests.load(Ordering::Relaxed),
            hits,
            misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
            size: self.len(),
            capacity: self.config.capacity,
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            retunes: self.retunes.load(Ordering::Relaxed),
            current_threshold: self.threshold(),
            average_match_similarity: if hits == 0 {
                0.0
            } else {
                self.matched_similarity_micros.load(Ordering::Relaxed) as f64 / 1e6 / hits as f64
            },
        }
    }
}
