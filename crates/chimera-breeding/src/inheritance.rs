// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
Allele recombination and mutation.

The engine only needs [`InheritanceSimulator`]; [`MendelianInheritance`] is
the default: one allele per parent per locus, chosen uniformly, then a
uniform ±0.1 effect nudge with probability `mutation_rate` per allele.
*/

use std::collections::BTreeMap;

use chimera_genetics::random::generate_id;
use chimera_genetics::{Allele, AllelePair, Genotype};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{BreedingError, Result};

/// Half-width of a mutation's effect change
pub const MUTATION_STEP: f32 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub offspring_id: String,
    pub locus: String,
    pub original_allele_id: String,
    pub mutated_allele_id: String,
    pub previous_effect: f32,
    pub new_effect: f32,
}

/// Parameters the engine hands to a simulator for one cross
#[derive(Debug, Clone, Copy)]
pub struct CrossParameters {
    pub offspring_count: usize,
    pub mutation_rate: f32,
    pub allow_inbreeding: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Inheritance {
    pub offspring: Vec<Genotype>,
    pub mutations: Vec<MutationRecord>,
}

/// Produces offspring genotypes from two parents
pub trait InheritanceSimulator: Send + Sync {
    fn simulator_name(&self) -> &str;

    fn cross(
        &self,
        parent1: &Genotype,
        parent2: &Genotype,
        params: CrossParameters,
        rng: &mut dyn RngCore,
    ) -> Result<Inheritance>;
}

#[derive(Debug, Clone, Default)]
pub struct MendelianInheritance;

impl MendelianInheritance {
    pub fn new() -> Self {
        Self
    }

    fn gamete<R: RngCore + ?Sized>(pair: Option<&AllelePair>, rng: &mut R) -> Option<Allele> {
        let pair = pair?;
        match (&pair.first, &pair.second) {
            (Some(a), Some(b)) => Some(if rng.gen_bool(0.5) { a.clone() } else { b.clone() }),
            (Some(a), None) | (None, Some(a)) => Some(a.clone()),
            (None, None) => None,
        }
    }

    fn mutate<R: RngCore + ?Sized>(
        allele: &mut Allele,
        rate: f32,
        offspring_id: &str,
        locus: &str,
        rng: &mut R,
    ) -> Option<MutationRecord> {
        if rate <= 0.0 || rng.gen::<f32>() >= rate {
            return None;
        }
        let previous_effect = allele.effect_strength;
        let delta = (rng.gen::<f32>() - 0.5) * 2.0 * MUTATION_STEP;
        let original_allele_id = allele.id.clone();
        allele.effect_strength = (previous_effect + delta).clamp(0.0, 1.0);
        allele.id = format!("{}-m{:04x}", original_allele_id, rng.gen::<u16>());
        Some(MutationRecord {
            offspring_id: offspring_id.to_string(),
            locus: locus.to_string(),
            original_allele_id,
            mutated_allele_id: allele.id.clone(),
            previous_effect,
            new_effect: allele.effect_strength,
        })
    }

    /// Mid-parent marker values; a marker carried by one parent passes through
    fn blend_markers(parent1: &Genotype, parent2: &Genotype) -> BTreeMap<String, f32> {
        let mut markers = parent1.genetic_markers.clone();
        for (name, value) in &parent2.genetic_markers {
            markers
                .entry(name.clone())
                .and_modify(|v| *v = (*v + value) * 0.5)
                .or_insert(*value);
        }
        markers
    }
}

impl InheritanceSimulator for MendelianInheritance {
    fn simulator_name(&self) -> &str {
        "mendelian"
    }

    fn cross(
        &self,
        parent1: &Genotype,
        parent2: &Genotype,
        params: CrossParameters,
        rng: &mut dyn RngCore,
    ) -> Result<Inheritance> {
        if !params.allow_inbreeding && parent1.id == parent2.id {
            return Err(BreedingError::Inheritance(format!(
                "self-fertilisation of '{}' requires allow_inbreeding",
                parent1.id
            )));
        }

        let mut locus_keys: Vec<&String> = parent1.loci.keys().chain(parent2.loci.keys()).collect();
        locus_keys.sort();
        locus_keys.dedup();

        let markers = Self::blend_markers(parent1, parent2);
        let generation = parent1.generation.max(parent2.generation) + 1;
        let mut result = Inheritance {
            offspring: Vec::with_capacity(params.offspring_count),
            mutations: Vec::new(),
        };

        for _ in 0..params.offspring_count {
            let id = generate_id("plant", rng);
            let mut child = Genotype::new(id);
            child.is_founder = false;
            child.generation = generation;
            child.parent_ids = vec![parent1.id.clone(), parent2.id.clone()];
            child.genetic_markers = markers.clone();
            child.overall_fitness = (parent1.overall_fitness + parent2.overall_fitness) * 0.5;

            for locus in &locus_keys {
                let mut first = Self::gamete(parent1.loci.get(*locus), rng);
                let mut second = Self::gamete(parent2.loci.get(*locus), rng);
                for allele in [first.as_mut(), second.as_mut()].into_iter().flatten() {
                    if let Some(record) =
                        Self::mutate(allele, params.mutation_rate, &child.id, locus, rng)
                    {
                        result.mutations.push(record);
                    }
                }
                child
                    .loci
                    .insert((*locus).clone(), AllelePair { first, second });
            }
            result.offspring.push(child);
        }
        Ok(result)
    }
}
