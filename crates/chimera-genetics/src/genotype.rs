// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
Genotype representation.

A genotype maps locus keys to allele pairs and carries lineage metadata
(generation, parents, inbreeding) plus free-form genetic markers such as
`vigor` or `disease_resistance`.
*/

use std::collections::BTreeMap;
use std::hash::{BuildHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::allele::{AllelePair, UNKNOWN_EFFECT};

/// Well-known locus keys read by the expression model
pub mod loci {
    pub const HEIGHT: &str = "height";
    pub const THC: &str = "thc";
    pub const CBD: &str = "cbd";
    pub const YIELD: &str = "yield";

    pub const ALL: [&str; 4] = [HEIGHT, THC, CBD, YIELD];
}

// Fixed seeds keep fingerprints stable across processes
const FINGERPRINT_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genotype {
    pub id: String,
    pub generation: u32,
    pub is_founder: bool,
    /// Zero, one or two parent ids
    pub parent_ids: Vec<String>,
    pub loci: BTreeMap<String, AllelePair>,
    pub genetic_markers: BTreeMap<String, f32>,
    pub inbreeding_coefficient: f32,
    pub overall_fitness: f32,
}

impl Genotype {
    /// Empty founder genotype
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            generation: 0,
            is_founder: true,
            parent_ids: Vec::new(),
            loci: BTreeMap::new(),
            genetic_markers: BTreeMap::new(),
            inbreeding_coefficient: 0.0,
            overall_fitness: 0.5,
        }
    }

    pub fn with_locus(mut self, locus: impl Into<String>, pair: AllelePair) -> Self {
        self.loci.insert(locus.into(), pair);
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>, value: f32) -> Self {
        self.genetic_markers.insert(marker.into(), value);
        self
    }

    pub fn with_fitness(mut self, fitness: f32) -> Self {
        self.overall_fitness = fitness;
        self
    }

    /// Expressed effect at `locus`, or `None` when the locus is absent
    pub fn locus_effect(&self, locus: &str) -> Option<f32> {
        self.loci.get(locus).map(AllelePair::expressed_effect)
    }

    /// Expressed effect at `locus`, neutral when absent
    pub fn effect_or_neutral(&self, locus: &str) -> f32 {
        self.locus_effect(locus).unwrap_or(UNKNOWN_EFFECT)
    }

    pub fn parent1_id(&self) -> Option<&str> {
        self.parent_ids.first().map(String::as_str)
    }

    pub fn parent2_id(&self) -> Option<&str> {
        self.parent_ids.get(1).map(String::as_str)
    }

    /// Structural fingerprint over everything that affects expression.
    ///
    /// Two genotypes with the same id but different allele content produce
    /// different fingerprints, so the fingerprint is part of every cache key.
    pub fn fingerprint(&self) -> u64 {
        let state = ahash::RandomState::with_seeds(
            FINGERPRINT_SEEDS[0],
            FINGERPRINT_SEEDS[1],
            FINGERPRINT_SEEDS[2],
            FINGERPRINT_SEEDS[3],
        );
        let mut hasher = state.build_hasher();
        for (locus, pair) in &self.loci {
            locus.hash(&mut hasher);
            for allele in [&pair.first, &pair.second] {
                match allele {
                    Some(a) => {
                        1u8.hash(&mut hasher);
                        a.id.hash(&mut hasher);
                        a.effect_strength.to_bits().hash(&mut hasher);
                        a.is_dominant.hash(&mut hasher);
                    }
                    None => 0u8.hash(&mut hasher),
                }
            }
        }
        self.inbreeding_coefficient.to_bits().hash(&mut hasher);
        self.overall_fitness.to_bits().hash(&mut hasher);
        hasher.finish()
    }
}
