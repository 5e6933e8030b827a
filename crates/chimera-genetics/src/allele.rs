// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
Alleles and allele pairs.

A locus holds exactly two alleles. A pair with either side missing is
"unknown" and contributes [`UNKNOWN_EFFECT`] to expression.
*/

use serde::{Deserialize, Serialize};

/// Contribution of a locus whose allele pair is incomplete
pub const UNKNOWN_EFFECT: f32 = 0.5;

/// A single allele at a locus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allele {
    /// Unique allele identifier (shared by copies inherited from a common source)
    pub id: String,
    /// Effect strength in [0, 1]
    pub effect_strength: f32,
    pub is_dominant: bool,
}

impl Allele {
    pub fn new(id: impl Into<String>, effect_strength: f32, is_dominant: bool) -> Self {
        Self {
            id: id.into(),
            effect_strength: effect_strength.clamp(0.0, 1.0),
            is_dominant,
        }
    }

    pub fn dominant(id: impl Into<String>, effect_strength: f32) -> Self {
        Self::new(id, effect_strength, true)
    }

    pub fn recessive(id: impl Into<String>, effect_strength: f32) -> Self {
        Self::new(id, effect_strength, false)
    }
}

/// The two alleles at one locus
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AllelePair {
    pub first: Option<Allele>,
    pub second: Option<Allele>,
}

impl AllelePair {
    pub fn new(first: Allele, second: Allele) -> Self {
        Self {
            first: Some(first),
            second: Some(second),
        }
    }

    /// Pair with no known alleles
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Two copies of the same allele
    pub fn homozygous(allele: Allele) -> Self {
        Self {
            first: Some(allele.clone()),
            second: Some(allele),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.first.is_some() && self.second.is_some()
    }

    /// Both alleles, if the pair is complete
    pub fn alleles(&self) -> Option<(&Allele, &Allele)> {
        match (&self.first, &self.second) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    /// Effect strength expressed by this pair.
    ///
    /// Exactly one dominant allele masks the other; otherwise the two effects
    /// are averaged. Incomplete pairs express [`UNKNOWN_EFFECT`].
    pub fn expressed_effect(&self) -> f32 {
        match self.alleles() {
            Some((a, b)) => match (a.is_dominant, b.is_dominant) {
                (true, false) => a.effect_strength,
                (false, true) => b.effect_strength,
                _ => (a.effect_strength + b.effect_strength) * 0.5,
            },
            None => UNKNOWN_EFFECT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_dominant_allele_masks_recessive() {
        let pair = AllelePair::new(Allele::dominant("a", 0.9), Allele::recessive("b", 0.3));
        assert_eq!(pair.expressed_effect(), 0.9);

        let swapped = AllelePair::new(Allele::recessive("b", 0.3), Allele::dominant("a", 0.9));
        assert_eq!(swapped.expressed_effect(), 0.9);
    }

    #[test]
    fn test_codominant_and_recessive_pairs_average() {
        let both = AllelePair::new(Allele::dominant("a", 0.8), Allele::dominant("b", 0.4));
        assert!((both.expressed_effect() - 0.6).abs() < 1e-6);

        let neither = AllelePair::new(Allele::recessive("a", 0.2), Allele::recessive("b", 0.6));
        assert!((neither.expressed_effect() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_incomplete_pair_is_unknown() {
        let half = AllelePair {
            first: Some(Allele::dominant("a", 0.9)),
            second: None,
        };
        assert!(!half.is_complete());
        assert_eq!(half.expressed_effect(), UNKNOWN_EFFECT);
        assert_eq!(AllelePair::unknown().expressed_effect(), UNKNOWN_EFFECT);
    }

    #[test]
    fn test_effect_strength_clamped() {
        assert_eq!(Allele::dominant("x", 1.7).effect_strength, 1.0);
        assert_eq!(Allele::recessive("y", -0.2).effect_strength, 0.0);
    }
}
