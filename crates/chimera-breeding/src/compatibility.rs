// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Parent compatibility: genetic distance plus an expected heterosis term,
//! discounted by the cross's inbreeding coefficient.

use chimera_expression::locus_similarity;
use chimera_genetics::Genotype;
use serde::{Deserialize, Serialize};

/// Heterosis peaks at `HETEROSIS_SCALE` for parents at distance 0.5
pub const HETEROSIS_SCALE: f32 = 0.25;
const DISTANCE_WEIGHT: f32 = 0.5;
const HETEROSIS_WEIGHT: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BreedingCompatibility {
    /// Overall suitability in [0, 1]
    pub score: f32,
    pub genetic_distance: f32,
    pub expected_heterosis: f32,
    pub inbreeding_coefficient: f32,
}

/// Scores a prospective cross
pub trait CompatibilityScorer: Send + Sync {
    fn score(&self, a: &Genotype, b: &Genotype, inbreeding_coefficient: f32) -> BreedingCompatibility;
}

/// Mean per-locus dissimilarity over the union of loci. A locus carried by
/// only one parent counts as fully distant.
pub fn genetic_distance(a: &Genotype, b: &Genotype) -> f32 {
    let mut total = 0.0;
    let mut count = 0usize;
    for (locus, pair) in &a.loci {
        total += match b.loci.get(locus) {
            Some(other) => 1.0 - locus_similarity(pair, other),
            None => 1.0,
        };
        count += 1;
    }
    for locus in b.loci.keys() {
        if !a.loci.contains_key(locus) {
            total += 1.0;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        (total / count as f32).clamp(0.0, 1.0)
    }
}

/// Hybrid vigor estimate: zero for identical or wholly unrelated parents
pub fn expected_heterosis(distance: f32) -> f32 {
    4.0 * distance * (1.0 - distance) * HETEROSIS_SCALE
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GeneticCompatibility;

impl CompatibilityScorer for GeneticCompatibility {
    fn score(&self, a: &Genotype, b: &Genotype, inbreeding_coefficient: f32) -> BreedingCompatibility {
        let distance = genetic_distance(a, b);
        let heterosis = expected_heterosis(distance);
        let raw = (DISTANCE_WEIGHT * distance + HETEROSIS_WEIGHT * heterosis).clamp(0.0, 1.0);
        BreedingCompatibility {
            score: raw * (1.0 - inbreeding_coefficient.clamp(0.0, 1.0)),
            genetic_distance: distance,
            expected_heterosis: heterosis,
            inbreeding_coefficient,
        }
    }
}
