// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
Pedigree database.

One [`BreedingLineage`] per bred individual, keyed by id. Relatedness and
inbreeding are answered from recorded parents only: founders and anything
pruned away count as unrelated.

The inbreeding coefficient is deliberately coarse. Selfing gives 1.0, any
recorded grandparent shared between the two parents gives 0.125, everything
else 0.0. No path counting.
*/

use ahash::{AHashMap, AHashSet};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BreedingConfig;

pub const SELF_FERTILIZATION_COEFFICIENT: f32 = 1.0;
pub const SHARED_GRANDPARENT_COEFFICIENT: f32 = 0.125;

// A century; longer windows behave the same and keep timestamp math in range
const MAX_RETENTION_HOURS: u64 = 24 * 365 * 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreedingLineage {
    pub individual_id: String,
    pub parent1_id: String,
    pub parent2_id: String,
    /// max(parent generations) + 1
    pub generation: u32,
    pub inbreeding_coefficient: f32,
    pub bred_at: DateTime<Utc>,
}

impl BreedingLineage {
    pub fn new(
        individual_id: impl Into<String>,
        parent1_id: impl Into<String>,
        parent2_id: impl Into<String>,
        generation: u32,
        inbreeding_coefficient: f32,
    ) -> Self {
        Self {
            individual_id: individual_id.into(),
            parent1_id: parent1_id.into(),
            parent2_id: parent2_id.into(),
            generation,
            inbreeding_coefficient,
            bred_at: Utc::now(),
        }
    }

    pub fn parents(&self) -> [&str; 2] {
        [&self.parent1_id, &self.parent2_id]
    }
}

struct StoredLineage {
    lineage: BreedingLineage,
    // Insertion order breaks timestamp ties
    sequence: u64,
}

#[derive(Default)]
struct Records {
    by_id: AHashMap<String, StoredLineage>,
    next_sequence: u64,
}

pub struct PedigreeDatabase {
    records: RwLock<Records>,
    capacity: usize,
    cleanup_batch: usize,
    retention: Option<Duration>,
}

impl PedigreeDatabase {
    pub fn new(capacity: usize, cleanup_batch: usize, retention_hours: u64) -> Self {
        Self {
            records: RwLock::new(Records::default()),
            capacity: capacity.max(1),
            cleanup_batch: cleanup_batch.max(1),
            retention: (retention_hours > 0).then(|| {
                Duration::hours(retention_hours.min(MAX_RETENTION_HOURS) as i64)
            }),
        }
    }

    pub fn from_config(config: &BreedingConfig) -> Self {
        Self::new(
            config.pedigree_capacity(),
            config.pedigree_cleanup_batch,
            config.lineage_retention_hours,
        )
    }

    /// Insert or replace a record, then prune if over capacity.
    /// Returns the number of records pruned.
    pub fn record(&self, lineage: BreedingLineage) -> usize {
        let len = {
            let mut records = self.records.write();
            let sequence = records.next_sequence;
            records.next_sequence += 1;
            records
                .by_id
                .insert(lineage.individual_id.clone(), StoredLineage { lineage, sequence });
            records.by_id.len()
        };
        if len > self.capacity {
            self.prune()
        } else {
            0
        }
    }

    pub fn get(&self, individual_id: &str) -> Option<BreedingLineage> {
        self.records
            .read()
            .by_id
            .get(individual_id)
            .map(|stored| stored.lineage.clone())
    }

    pub fn len(&self) -> usize {
        self.records.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.records.write().by_id.clear();
    }

    /// Recorded parents of both individuals, i.e. the grandparents of a cross
    /// between them.
    fn recorded_parents(records: &Records, id: &str) -> AHashSet<String> {
        records
            .by_id
            .get(id)
            .map(|stored| {
                stored
                    .lineage
                    .parents()
                    .iter()
                    .map(|p| p.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn calculate_inbreeding_coefficient(&self, parent1_id: &str, parent2_id: &str) -> f32 {
        if parent1_id == parent2_id {
            return SELF_FERTILIZATION_COEFFICIENT;
        }
        let records = self.records.read();
        let first = Self::recorded_parents(&records, parent1_id);
        if first.is_empty() {
            return 0.0;
        }
        let second = Self::recorded_parents(&records, parent2_id);
        if first.is_disjoint(&second) {
            0.0
        } else {
            SHARED_GRANDPARENT_COEFFICIENT
        }
    }

    /// Same individual, parent and child, or sharing a recorded parent
    pub fn are_related(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        let records = self.records.read();
        let parents_a = Self::recorded_parents(&records, a);
        let parents_b = Self::recorded_parents(&records, b);
        parents_a.contains(b) || parents_b.contains(a) || !parents_a.is_disjoint(&parents_b)
    }

    /// Remove up to one cleanup batch of the oldest records while over
    /// capacity. With a retention window only records older than the window
    /// are eligible.
    pub fn prune(&self) -> usize {
        let mut records = self.records.write();
        let len = records.by_id.len();
        if len <= self.capacity {
            return 0;
        }

        let cutoff = self.retention.map(|window| Utc::now() - window);
        let mut eligible: Vec<(DateTime<Utc>, u64, String)> = records
            .by_id
            .values()
            .filter(|stored| cutoff.map_or(true, |c| stored.lineage.bred_at < c))
            .map(|stored| {
                (
                    stored.lineage.bred_at,
                    stored.sequence,
                    stored.lineage.individual_id.clone(),
                )
            })
            .collect();
        eligible.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut removed = 0;
        for (_, _, id) in eligible.into_iter().take(self.cleanup_batch) {
            if records.by_id.remove(&id).is_some() {
                removed += 1;
            }
        }
        debug!(
            target: "chimera-breeding",
            "Pedigree pruned {} of {} records (capacity {})",
            removed, len, self.capacity
        );
        removed
    }
}
