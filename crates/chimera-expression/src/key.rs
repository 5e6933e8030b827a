// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Structural cache key for a (genotype, environment) pair.
//!
//! Equality compares the genotype id, its content fingerprint and the exact
//! bit pattern of every environmental factor, so a key match is an input match.

use chimera_genetics::{EnvironmentalConditions, Genotype, FACTOR_COUNT};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpressionKey {
    pub genotype_id: String,
    pub fingerprint: u64,
    pub environment_bits: [u32; FACTOR_COUNT],
}

impl ExpressionKey {
    pub fn new(genotype: &Genotype, environment: &EnvironmentalConditions) -> Self {
        Self {
            genotype_id: genotype.id.clone(),
            fingerprint: genotype.fingerprint(),
            environment_bits: environment.to_bits(),
        }
    }
}
