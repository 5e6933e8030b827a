// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
# Breeding Calculation Engine

Crosses parents through an [`InheritanceSimulator`], records lineage in the
[`PedigreeDatabase`], and evaluates offspring through the shared
[`TraitExpressionEngine`].

Invalid input is logged at error level and returned as an `Err`; low
compatibility and empty markers are logged warnings only.
*/

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use chimera_expression::TraitExpressionEngine;
use chimera_genetics::random::{generate_id, seeded_rng};
use chimera_genetics::{EnvironmentalConditions, Genotype, TraitExpressionResult, TraitKind};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::{debug, error, info, trace, warn};

use crate::compatibility::{BreedingCompatibility, CompatibilityScorer, GeneticCompatibility};
use crate::config::BreedingConfig;
use crate::error::{BreedingError, Result};
use crate::goal::BreedingGoal;
use crate::inheritance::{CrossParameters, Inheritance, InheritanceSimulator, MendelianInheritance};
use crate::pedigree::{BreedingLineage, PedigreeDatabase};
use crate::types::{BreedingResult, GenerationSummary, GenerationalSimulationResult, OptimalBreedingPair};

pub const COMPATIBILITY_WEIGHT: f32 = 0.4;
pub const OUTCOME_WEIGHT: f32 = 0.6;

/// Marker name fragments subject to inbreeding depression
pub const DEPRESSION_MARKER_TAGS: [&str; 2] = ["vigor", "resistance"];

pub struct BreedingCalculationEngine {
    config: BreedingConfig,
    expression: Arc<TraitExpressionEngine>,
    pedigree: PedigreeDatabase,
    inheritance: Box<dyn InheritanceSimulator>,
    scorer: Box<dyn CompatibilityScorer>,
    rng: Mutex<StdRng>,
    crosses: AtomicU64,
    offspring_bred: AtomicU64,
}

impl BreedingCalculationEngine {
    pub fn new(config: BreedingConfig, expression: Arc<TraitExpressionEngine>) -> Self {
        Self::with_components(
            config,
            expression,
            Box::new(MendelianInheritance::new()),
            Box::new(GeneticCompatibility),
        )
    }

    pub fn with_components(
        config: BreedingConfig,
        expression: Arc<TraitExpressionEngine>,
        inheritance: Box<dyn InheritanceSimulator>,
        scorer: Box<dyn CompatibilityScorer>,
    ) -> Self {
        info!(
            target: "chimera-breeding",
            "Breeding engine: simulator={}, mutation_rate={}, inbreeding={}, pedigree capacity={}",
            inheritance.simulator_name(),
            config.mutation_rate,
            config.allow_inbreeding,
            config.pedigree_capacity()
        );
        Self {
            pedigree: PedigreeDatabase::from_config(&config),
            rng: Mutex::new(seeded_rng(config.rng_seed)),
            crosses: AtomicU64::new(0),
            offspring_bred: AtomicU64::new(0),
            config,
            expression,
            inheritance,
            scorer,
        }
    }

    pub fn config(&self) -> &BreedingConfig {
        &self.config
    }

    pub fn pedigree(&self) -> &PedigreeDatabase {
        &self.pedigree
    }

    pub fn expression(&self) -> &Arc<TraitExpressionEngine> {
        &self.expression
    }

    pub fn crosses_performed(&self) -> u64 {
        self.crosses.load(Ordering::Relaxed)
    }

    pub fn offspring_bred(&self) -> u64 {
        self.offspring_bred.load(Ordering::Relaxed)
    }

    /// Cross two parents and record every offspring in the pedigree
    pub fn breed_plants(
        &self,
        parent1: &Genotype,
        parent2: &Genotype,
        offspring_count: usize,
    ) -> Result<BreedingResult> {
        validate_parent(parent1)?;
        validate_parent(parent2)?;
        if offspring_count == 0 {
            error!(target: "chimera-breeding", "Cross {} x {} requested zero offspring", parent1.id, parent2.id);
            return Err(BreedingError::InvalidOffspringCount(offspring_count));
        }

        let coefficient = self
            .pedigree
            .calculate_inbreeding_coefficient(&parent1.id, &parent2.id);
        let compatibility = self.scorer.score(parent1, parent2, coefficient);
        if compatibility.score < self.config.low_compatibility_warning {
            warn!(
                target: "chimera-breeding",
                "Low compatibility {:.3} for {} x {}, breeding anyway",
                compatibility.score, parent1.id, parent2.id
            );
        }

        let params = CrossParameters {
            offspring_count,
            mutation_rate: self.config.mutation_rate,
            allow_inbreeding: self.config.allow_inbreeding,
        };
        let crossed = {
            let mut rng = self.rng.lock();
            self.inheritance.cross(parent1, parent2, params, &mut *rng)
        };
        let Inheritance {
            mut offspring,
            mutations,
        } = crossed.map_err(|e| {
            error!(target: "chimera-breeding", "Cross {} x {} failed: {}", parent1.id, parent2.id, e);
            e
        })?;

        let generation = parent1.generation.max(parent2.generation) + 1;
        for child in &mut offspring {
            self.finalize_offspring(child, parent1, parent2, generation, coefficient);
        }
        self.evaluate_fitness(&mut offspring);

        self.crosses.fetch_add(1, Ordering::Relaxed);
        self.offspring_bred
            .fetch_add(offspring.len() as u64, Ordering::Relaxed);
        debug!(
            target: "chimera-breeding",
            "Bred {} x {}: {} offspring, {} mutations, F={:.3}",
            parent1.id, parent2.id, offspring.len(), mutations.len(), coefficient
        );

        Ok(BreedingResult {
            parent1: parent1.clone(),
            parent2: parent2.clone(),
            offspring,
            mutations,
            compatibility,
            inbreeding_coefficient: coefficient,
        })
    }

    pub fn analyze_breeding_compatibility(&self, a: &Genotype, b: &Genotype) -> BreedingCompatibility {
        let coefficient = self.pedigree.calculate_inbreeding_coefficient(&a.id, &b.id);
        self.scorer.score(a, b, coefficient)
    }

    /// Expected goal score of offspring from `a x b`, in [0, 1]
    pub fn predict_breeding_outcome(&self, a: &Genotype, b: &Genotype, goal: &BreedingGoal) -> Result<f32> {
        if goal.is_empty() {
            error!(target: "chimera-breeding", "Cannot predict outcome for empty goal '{}'", goal.name);
            return Err(BreedingError::EmptyGoal(goal.name.clone()));
        }
        let compatibility = self.analyze_breeding_compatibility(a, b);
        Ok(self.predict(a, b, goal, &compatibility))
    }

    /// Best `max_pairs` unordered pairs from `population`, highest blended
    /// score first. Empty when the goal has no targets.
    pub fn optimize_breeding_pairs(
        &self,
        population: &[Genotype],
        goal: &BreedingGoal,
        max_pairs: usize,
    ) -> Vec<OptimalBreedingPair> {
        if goal.is_empty() {
            error!(target: "chimera-breeding", "Breeding goal '{}' has no trait targets", goal.name);
            return Vec::new();
        }
        if population.len() < 2 || max_pairs == 0 {
            return Vec::new();
        }

        let n = population.len();
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();

        let mut candidates: Vec<OptimalBreedingPair> = pairs
            .par_iter()
            .filter_map(|&(i, j)| self.evaluate_pair(&population[i], &population[j], goal))
            .collect();
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(max_pairs);

        debug!(
            target: "chimera-breeding",
            "Pair optimisation: {} candidates from {} pairs, returning {}",
            candidates.len(), pairs.len(), candidates.len().min(max_pairs)
        );
        candidates
    }

    /// Breed `generations` rounds from `founders`, keeping the population at
    /// the founder count
    pub fn simulate_generations(
        &self,
        founders: &[Genotype],
        generations: u32,
        goal: &BreedingGoal,
    ) -> Result<GenerationalSimulationResult> {
        if goal.is_empty() {
            error!(target: "chimera-breeding", "Cannot simulate towards empty goal '{}'", goal.name);
            return Err(BreedingError::EmptyGoal(goal.name.clone()));
        }
        if founders.len() < 2 {
            error!(target: "chimera-breeding", "Simulation needs at least two founders, got {}", founders.len());
            return Err(BreedingError::InsufficientPopulation {
                required: 2,
                actual: founders.len(),
            });
        }

        let cap = founders.len();
        let per_pair = self.config.offspring_per_pair.max(1);
        let pairs_needed = cap.div_ceil(per_pair);

        let founder_scores = self.goal_scores(founders, goal);
        let founder_mean_score = mean(&founder_scores);
        let mut previous_mean = founder_mean_score;
        let mut best: Option<(f32, String)> = best_of(founders, &founder_scores);

        let mut population = founders.to_vec();
        let mut summaries = Vec::with_capacity(generations as usize);

        for generation in 1..=generations {
            let pairs = self.optimize_breeding_pairs(&population, goal, pairs_needed);
            if pairs.is_empty() {
                warn!(
                    target: "chimera-breeding",
                    "No eligible pairs in generation {}, stopping early",
                    generation
                );
                break;
            }

            let mut next = Vec::with_capacity(pairs.len() * per_pair);
            {
                let by_id: AHashMap<&str, &Genotype> =
                    population.iter().map(|g| (g.id.as_str(), g)).collect();
                for pair in &pairs {
                    let (Some(a), Some(b)) = (
                        by_id.get(pair.parent1_id.as_str()),
                        by_id.get(pair.parent2_id.as_str()),
                    ) else {
                        continue;
                    };
                    match self.breed_plants(a, b, per_pair) {
                        Ok(result) => next.extend(result.offspring),
                        Err(e) => warn!(target: "chimera-breeding", "Skipping pair in generation {}: {}", generation, e),
                    }
                }
            }
            if next.is_empty() {
                warn!(target: "chimera-breeding", "Generation {} produced no offspring, stopping early", generation);
                break;
            }

            let offspring_produced = next.len();
            let scores = self.goal_scores(&next, goal);
            let mut ranked: Vec<(f32, Genotype)> = scores.into_iter().zip(next).collect();
            ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
            ranked.truncate(cap);

            let kept_scores: Vec<f32> = ranked.iter().map(|(s, _)| *s).collect();
            let mean_goal_score = mean(&kept_scores);
            let best_goal_score = kept_scores.first().copied().unwrap_or(0.0);
            let mean_inbreeding = ranked
                .iter()
                .map(|(_, g)| g.inbreeding_coefficient)
                .sum::<f32>()
                / ranked.len() as f32;

            if let Some((score, genotype)) = ranked.first() {
                if best.as_ref().map_or(true, |(b, _)| *score > *b) {
                    best = Some((*score, genotype.id.clone()));
                }
            }

            summaries.push(GenerationSummary {
                generation,
                population_size: ranked.len(),
                pairs_bred: pairs.len(),
                offspring_produced,
                mean_goal_score,
                best_goal_score,
                genetic_gain: mean_goal_score - previous_mean,
                mean_inbreeding,
            });
            info!(
                target: "chimera-breeding",
                "Generation {}: mean score {:.4} (gain {:+.4}), best {:.4}",
                generation, mean_goal_score, mean_goal_score - previous_mean, best_goal_score
            );
            previous_mean = mean_goal_score;
            population = ranked.into_iter().map(|(_, g)| g).collect();

            if population.len() < 2 {
                warn!(target: "chimera-breeding", "Population collapsed below two, stopping early");
                break;
            }
        }

        Ok(GenerationalSimulationResult {
            goal_name: goal.name.clone(),
            founder_mean_score,
            total_genetic_gain: summaries.iter().map(|s| s.genetic_gain).sum(),
            generations: summaries,
            best_individual_id: best.map(|(_, id)| id),
            final_population: population,
        })
    }

    fn finalize_offspring(
        &self,
        child: &mut Genotype,
        parent1: &Genotype,
        parent2: &Genotype,
        generation: u32,
        coefficient: f32,
    ) {
        if child.id.is_empty() {
            child.id = generate_id("plant", &mut *self.rng.lock());
        }
        child.generation = generation;
        child.is_founder = false;
        if child.parent_ids.is_empty() {
            child.parent_ids = vec![parent1.id.clone(), parent2.id.clone()];
        }
        child.inbreeding_coefficient = coefficient;

        let factor = self.config.inbreeding_depression_factor;
        if self.config.allow_inbreeding && factor > 0.0 && coefficient > 0.0 {
            let scale = (1.0 - coefficient * factor).max(0.0);
            for (name, value) in child.genetic_markers.iter_mut() {
                let lower = name.to_lowercase();
                if DEPRESSION_MARKER_TAGS.iter().any(|tag| lower.contains(tag)) {
                    *value *= scale;
                }
            }
        }
        if child.genetic_markers.is_empty() {
            warn!(target: "chimera-breeding", "Offspring {} has no genetic markers", child.id);
        }

        self.pedigree.record(BreedingLineage::new(
            child.id.clone(),
            parent1.id.clone(),
            parent2.id.clone(),
            generation,
            coefficient,
        ));
    }

    fn evaluation_environment(&self, goal: Option<&BreedingGoal>) -> EnvironmentalConditions {
        goal.and_then(|g| g.environment)
            .unwrap_or(self.config.evaluation_environment)
    }

    fn evaluate_fitness(&self, offspring: &mut [Genotype]) {
        let env = self.evaluation_environment(None);
        let results = {
            let items: Vec<_> = offspring.iter().map(|g| (g, &env)).collect();
            self.expression.calculate_expression_batch(&items)
        };
        for (child, result) in offspring.iter_mut().zip(results) {
            child.overall_fitness = result.overall_fitness;
            self.expression.recycle(result);
        }
    }

    fn goal_scores(&self, population: &[Genotype], goal: &BreedingGoal) -> Vec<f32> {
        let env = self.evaluation_environment(Some(goal));
        let items: Vec<_> = population.iter().map(|g| (g, &env)).collect();
        self.expression
            .calculate_expression_batch(&items)
            .into_iter()
            .map(|result| {
                let score = goal.score(&result);
                self.expression.recycle(result);
                score
            })
            .collect()
    }

    /// Mid-parent expression lifted by expected heterosis, scored against
    /// the goal and discounted for inbreeding depression
    fn predict(
        &self,
        a: &Genotype,
        b: &Genotype,
        goal: &BreedingGoal,
        compatibility: &BreedingCompatibility,
    ) -> f32 {
        let env = self.evaluation_environment(Some(goal));
        let ra = self.expression.calculate_expression(a, &env);
        let rb = self.expression.calculate_expression(b, &env);

        let lift = compatibility.expected_heterosis;
        let mut predicted = TraitExpressionResult::default();
        for kind in TraitKind::ALL {
            let mid = (ra.trait_value(kind) + rb.trait_value(kind)) * 0.5;
            predicted.set_trait_value(kind, (mid + lift * (1.0 - mid)).clamp(0.0, 1.0));
        }
        self.expression.recycle(ra);
        self.expression.recycle(rb);

        let depression = (compatibility.inbreeding_coefficient
            * self.config.inbreeding_depression_factor)
            .clamp(0.0, 1.0);
        goal.score(&predicted) * (1.0 - depression)
    }

    fn evaluate_pair(&self, a: &Genotype, b: &Genotype, goal: &BreedingGoal) -> Option<OptimalBreedingPair> {
        if !self.config.allow_inbreeding && self.pedigree.are_related(&a.id, &b.id) {
            trace!(target: "chimera-breeding", "Skipping related pair {} x {}", a.id, b.id);
            return None;
        }
        let compatibility = self.analyze_breeding_compatibility(a, b);
        if compatibility.score < self.config.compatibility_floor {
            trace!(
                target: "chimera-breeding",
                "Skipping {} x {}: compatibility {:.3} below floor",
                a.id, b.id, compatibility.score
            );
            return None;
        }
        let predicted_outcome = self.predict(a, b, goal, &compatibility);
        Some(OptimalBreedingPair {
            parent1_id: a.id.clone(),
            parent2_id: b.id.clone(),
            score: COMPATIBILITY_WEIGHT * compatibility.score + OUTCOME_WEIGHT * predicted_outcome,
            compatibility,
            predicted_outcome,
        })
    }
}

fn validate_parent(parent: &Genotype) -> Result<()> {
    let reason = if parent.id.trim().is_empty() {
        "missing id"
    } else if parent.loci.is_empty() {
        "no gene loci"
    } else {
        return Ok(());
    };
    error!(target: "chimera-breeding", "Invalid parent '{}': {}", parent.id, reason);
    Err(BreedingError::InvalidParent {
        id: parent.id.clone(),
        reason: reason.to_string(),
    })
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

fn best_of(population: &[Genotype], scores: &[f32]) -> Option<(f32, String)> {
    population
        .iter()
        .zip(scores)
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(g, s)| (*s, g.id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chimera_expression::ExpressionConfig;
    use chimera_genetics::{loci, Allele, AllelePair};

    fn engine(config: BreedingConfig) -> BreedingCalculationEngine {
        let expression = Arc::new(TraitExpressionEngine::new(ExpressionConfig::deterministic()));
        BreedingCalculationEngine::new(
            BreedingConfig {
                rng_seed: Some(11),
                ..config
            },
            expression,
        )
    }

    fn plant(id: &str, thc: f32) -> Genotype {
        Genotype::new(id)
            .with_locus(loci::THC, AllelePair::homozygous(Allele::recessive(format!("{id}-t"), thc)))
            .with_marker("vigor", 0.8)
            .with_marker("aroma", 0.5)
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let e = engine(BreedingConfig::default());
        let good = plant("a", 0.5);
        let bare = Genotype::new("bare");
        assert!(matches!(e.breed_plants(&good, &bare, 2), Err(BreedingError::InvalidParent { .. })));
        assert!(matches!(
            e.breed_plants(&good, &plant("b", 0.4), 0),
            Err(BreedingError::InvalidOffspringCount(0))
        ));
        assert_eq!(e.crosses_performed(), 0);
    }

    #[test]
    fn test_offspring_recorded_in_pedigree() {
        let e = engine(BreedingConfig {
            mutation_rate: 0.0,
            ..BreedingConfig::default()
        });
        let a = plant("a", 0.9);
        let b = plant("b", 0.1);
        let result = e.breed_plants(&a, &b, 3).unwrap();

        assert_eq!(result.offspring.len(), 3);
        assert_eq!(e.pedigree().len(), 3);
        for child in &result.offspring {
            let lineage = e.pedigree().get(&child.id).unwrap();
            assert_eq!(lineage.generation, 1);
            assert_eq!(lineage.parents(), ["a", "b"]);
            assert!((0.0..=1.0).contains(&child.overall_fitness));
        }
        assert_eq!(e.offspring_bred(), 3);
    }

    #[test]
    fn test_inbreeding_depression_scales_vigor_markers() {
        let e = engine(BreedingConfig {
            allow_inbreeding: true,
            inbreeding_depression_factor: 0.5,
            mutation_rate: 0.0,
            ..BreedingConfig::default()
        });
        let a = plant("a", 0.6);
        let selfed = e.breed_plants(&a, &a, 1).unwrap();
        let child = &selfed.offspring[0];

        assert_eq!(selfed.inbreeding_coefficient, 1.0);
        // 0.8 * (1 - 1.0 * 0.5)
        assert!((child.genetic_markers["vigor"] - 0.4).abs() < 1e-6);
        assert!((child.genetic_markers["aroma"] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_prediction_prefers_goal_aligned_pairs() {
        let e = engine(BreedingConfig::default());
        let goal = BreedingGoal::new("potency").maximize(TraitKind::Thc, 1.0);
        let strong = e
            .predict_breeding_outcome(&plant("a", 0.9), &plant("b", 0.8), &goal)
            .unwrap();
        let weak = e
            .predict_breeding_outcome(&plant("c", 0.2), &plant("d", 0.1), &goal)
            .unwrap();
        assert!(strong > weak);
        assert!(matches!(
            e.predict_breeding_outcome(&plant("a", 0.9), &plant("b", 0.8), &BreedingGoal::new("x")),
            Err(BreedingError::EmptyGoal(_))
        ));
    }

    #[test]
    fn test_empty_goal_yields_no_pairs() {
        let e = engine(BreedingConfig::default());
        let population = vec![plant("a", 0.9), plant("b", 0.1)];
        assert!(e.optimize_breeding_pairs(&population, &BreedingGoal::new("none"), 5).is_empty());
    }
}
