// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Result types returned by the breeding engine.

use chimera_genetics::Genotype;
use serde::{Deserialize, Serialize};

use crate::compatibility::BreedingCompatibility;
use crate::inheritance::MutationRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreedingResult {
    pub parent1: Genotype,
    pub parent2: Genotype,
    pub offspring: Vec<Genotype>,
    pub mutations: Vec<MutationRecord>,
    pub compatibility: BreedingCompatibility,
    pub inbreeding_coefficient: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimalBreedingPair {
    pub parent1_id: String,
    pub parent2_id: String,
    pub compatibility: BreedingCompatibility,
    /// Goal score expected from the cross, in [0, 1]
    pub predicted_outcome: f32,
    /// `0.4 * compatibility + 0.6 * predicted_outcome`
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub generation: u32,
    pub population_size: usize,
    pub pairs_bred: usize,
    pub offspring_produced: usize,
    pub mean_goal_score: f32,
    pub best_goal_score: f32,
    /// Mean score change relative to the previous generation
    pub genetic_gain: f32,
    pub mean_inbreeding: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationalSimulationResult {
    pub goal_name: String,
    pub founder_mean_score: f32,
    pub generations: Vec<GenerationSummary>,
    pub total_genetic_gain: f32,
    pub best_individual_id: Option<String>,
    pub final_population: Vec<Genotype>,
}

impl GenerationalSimulationResult {
    pub fn generations_completed(&self) -> usize {
        self.generations.len()
    }
}
