// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Breeding engine configuration.

use chimera_genetics::EnvironmentalConditions;

#[derive(Debug, Clone, PartialEq)]
pub struct BreedingConfig {
    /// Per-allele mutation probability
    pub mutation_rate: f32,
    pub allow_inbreeding: bool,
    /// Scales vigor/resistance markers by `1 - coefficient * factor`
    pub inbreeding_depression_factor: f32,
    /// Pedigree holds up to `max_generations_tracked * 100` records
    pub max_generations_tracked: usize,
    /// Only records older than this are pruned; 0 disables the age gate
    pub lineage_retention_hours: u64,
    /// Records removed per prune pass
    pub pedigree_cleanup_batch: usize,
    /// Pairs below this score are never proposed
    pub compatibility_floor: f32,
    /// Crosses below this score log a warning but proceed
    pub low_compatibility_warning: f32,
    pub offspring_per_pair: usize,
    /// Conditions used to evaluate offspring fitness and goal scores
    pub evaluation_environment: EnvironmentalConditions,
    /// Seed for reproducible crosses
    pub rng_seed: Option<u64>,
}

impl Default for BreedingConfig {
    fn default() -> Self {
        Self {
            mutation_rate: 0.01,
            allow_inbreeding: false,
            inbreeding_depression_factor: 0.3,
            max_generations_tracked: 10,
            lineage_retention_hours: 0,
            pedigree_cleanup_batch: 50,
            compatibility_floor: 0.3,
            low_compatibility_warning: 0.1,
            offspring_per_pair: 2,
            evaluation_environment: EnvironmentalConditions::default(),
            rng_seed: None,
        }
    }
}

impl BreedingConfig {
    /// Pedigree size above which pruning starts
    pub fn pedigree_capacity(&self) -> usize {
        self.max_generations_tracked.max(1) * 100
    }
}
