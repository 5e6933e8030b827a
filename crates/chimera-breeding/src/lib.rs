// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
# Chimera Breeding

Crosses, pedigree tracking, compatibility scoring, pair optimisation and
multi-generation simulation on top of `chimera-expression`.

```text
breed_plants(a, b, n)
   +-- PedigreeDatabase::calculate_inbreeding_coefficient
   +-- CompatibilityScorer (distance + heterosis)
   +-- InheritanceSimulator (recombination + mutation)
   +-- PedigreeDatabase::record, per offspring
   +-- TraitExpressionEngine::calculate_expression_batch (fitness)
```

Copyright 2025 Chimera Genetics Team
Licensed under the Apache License, Version 2.0
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod compatibility;
pub mod config;
pub mod engine;
pub mod error;
pub mod goal;
pub mod inheritance;
pub mod pedigree;
pub mod types;

pub use compatibility::{BreedingCompatibility, CompatibilityScorer, GeneticCompatibility};
pub use config::BreedingConfig;
pub use engine::BreedingCalculationEngine;
pub use error::{BreedingError, Result};
pub use goal::{BreedingGoal, TraitTarget};
pub use inheritance::{CrossParameters, Inheritance, InheritanceSimulator, MendelianInheritance, MutationRecord};
pub use pedigree::{BreedingLineage, PedigreeDatabase};
pub use types::{BreedingResult, GenerationSummary, GenerationalSimulationResult, OptimalBreedingPair};
