// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Typed breeding goals: weighted trait targets scored against expression
//! results.

use chimera_genetics::{EnvironmentalConditions, TraitExpressionResult, TraitKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitTarget {
    pub trait_kind: TraitKind,
    /// Desired expression in [0, 1]
    pub target: f32,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreedingGoal {
    pub name: String,
    pub targets: Vec<TraitTarget>,
    /// Evaluation conditions; the engine's configured environment when unset
    pub environment: Option<EnvironmentalConditions>,
}

impl BreedingGoal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            targets: Vec::new(),
            environment: None,
        }
    }

    pub fn with_target(mut self, trait_kind: TraitKind, target: f32, weight: f32) -> Self {
        self.targets.push(TraitTarget {
            trait_kind,
            target: target.clamp(0.0, 1.0),
            weight: weight.max(0.0),
        });
        self
    }

    /// Push a trait as high as it goes
    pub fn maximize(self, trait_kind: TraitKind, weight: f32) -> Self {
        self.with_target(trait_kind, 1.0, weight)
    }

    pub fn with_environment(mut self, environment: EnvironmentalConditions) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Weighted closeness `1 - |value - target|` in [0, 1]; 0 for an empty
    /// or zero-weight goal
    pub fn score(&self, result: &TraitExpressionResult) -> f32 {
        let total_weight: f32 = self.targets.iter().map(|t| t.weight).sum();
        if total_weight <= 0.0 {
            return 0.0;
        }
        let weighted: f32 = self
            .targets
            .iter()
            .map(|t| t.weight * (1.0 - (result.trait_value(t.trait_kind) - t.target).abs()))
            .sum();
        (weighted / total_weight).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(thc: f32, cbd: f32) -> TraitExpressionResult {
        TraitExpressionResult {
            thc_expression: thc,
            cbd_expression: cbd,
            ..Default::default()
        }
    }

    #[test]
    fn test_score_weights_targets() {
        let goal = BreedingGoal::new("potency")
            .maximize(TraitKind::Thc, 3.0)
            .with_target(TraitKind::Cbd, 0.0, 1.0);
        assert!((goal.score(&result(1.0, 0.0)) - 1.0).abs() < 1e-6);
        assert!((goal.score(&result(0.5, 0.0)) - 0.625).abs() < 1e-6);
        assert!(goal.score(&result(0.9, 0.1)) > goal.score(&result(0.1, 0.9)));
    }

    #[test]
    fn test_empty_goal_scores_zero() {
        let goal = BreedingGoal::new("none");
        assert!(goal.is_empty());
        assert_eq!(goal.score(&result(1.0, 1.0)), 0.0);
    }
}
