// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
Trait expression results.

`TraitExpressionResult` is the unit produced by the expression engine and
recycled through its object pool, so it must be cheap to reset and copy.
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::genotype::loci;

/// Observable traits produced by the expression model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraitKind {
    Height,
    Thc,
    Cbd,
    Yield,
}

impl TraitKind {
    pub const ALL: [TraitKind; 4] = [
        TraitKind::Height,
        TraitKind::Thc,
        TraitKind::Cbd,
        TraitKind::Yield,
    ];

    /// Locus key whose allele pair drives this trait
    pub fn locus_key(self) -> &'static str {
        match self {
            TraitKind::Height => loci::HEIGHT,
            TraitKind::Thc => loci::THC,
            TraitKind::Cbd => loci::CBD,
            TraitKind::Yield => loci::YIELD,
        }
    }
}

impl fmt::Display for TraitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.locus_key())
    }
}

impl FromStr for TraitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "height" => Ok(TraitKind::Height),
            "thc" => Ok(TraitKind::Thc),
            "cbd" => Ok(TraitKind::Cbd),
            "yield" => Ok(TraitKind::Yield),
            _ => Err(format!(
                "Unknown trait: {}. Valid options: height, thc, cbd, yield",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StressResponse {
    pub temperature_stress: f32,
    pub light_stress: f32,
    pub overall_stress_level: f32,
    pub adaptive_capacity: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TraitExpressionResult {
    pub genotype_id: String,
    pub height_expression: f32,
    pub thc_expression: f32,
    pub cbd_expression: f32,
    pub yield_expression: f32,
    pub overall_fitness: f32,
    pub stress_response: StressResponse,
}

impl TraitExpressionResult {
    /// Clear every field, keeping the id allocation for reuse
    pub fn reset(&mut self) {
        self.genotype_id.clear();
        self.height_expression = 0.0;
        self.thc_expression = 0.0;
        self.cbd_expression = 0.0;
        self.yield_expression = 0.0;
        self.overall_fitness = 0.0;
        self.stress_response = StressResponse::default();
    }

    /// Overwrite `self` with `other` without reallocating the id buffer
    pub fn copy_from(&mut self, other: &TraitExpressionResult) {
        self.genotype_id.clear();
        self.genotype_id.push_str(&other.genotype_id);
        self.height_expression = other.height_expression;
        self.thc_expression = other.thc_expression;
        self.cbd_expression = other.cbd_expression;
        self.yield_expression = other.yield_expression;
        self.overall_fitness = other.overall_fitness;
        self.stress_response = other.stress_response;
    }

    pub fn trait_value(&self, kind: TraitKind) -> f32 {
        match kind {
            TraitKind::Height => self.height_expression,
            TraitKind::Thc => self.thc_expression,
            TraitKind::Cbd => self.cbd_expression,
            TraitKind::Yield => self.yield_expression,
        }
    }

    pub fn set_trait_value(&mut self, kind: TraitKind, value: f32) {
        let slot = match kind {
            TraitKind::Height => &mut self.height_expression,
            TraitKind::Thc => &mut self.thc_expression,
            TraitKind::Cbd => &mut self.cbd_expression,
            TraitKind::Yield => &mut self.yield_expression,
        };
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trait_kind_parsing() {
        assert_eq!("THC".parse::<TraitKind>().unwrap(), TraitKind::Thc);
        assert_eq!("yield".parse::<TraitKind>().unwrap(), TraitKind::Yield);
        assert!("terpene".parse::<TraitKind>().is_err());
        assert_eq!(TraitKind::Height.to_string(), "height");
    }

    #[test]
    fn test_reset_and_copy() {
        let mut source = TraitExpressionResult {
            genotype_id: "a".into(),
            thc_expression: 0.7,
            overall_fitness: 0.6,
            ..Default::default()
        };
        let mut target = TraitExpressionResult::default();
        target.copy_from(&source);
        assert_eq!(target, source);

        source.reset();
        assert_eq!(source, TraitExpressionResult::default());
        assert_eq!(target.trait_value(TraitKind::Thc), 0.7);
    }
}
