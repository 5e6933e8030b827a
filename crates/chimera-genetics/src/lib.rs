// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
# Chimera Genetics

Pure data model shared by the expression and breeding engines:

- `Allele` / `AllelePair` with the dominance rule
- `Genotype` (loci, markers, lineage metadata)
- `EnvironmentalConditions`
- `TraitExpressionResult` and `StressResponse`
- `StrainTemplate` presets for founder generation

Nothing in this crate holds shared mutable state; genotypes and
environments are treated as immutable once handed to an engine.

Copyright 2025 Chimera Genetics Team
Licensed under the Apache License, Version 2.0
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod allele;
pub mod environment;
pub mod error;
pub mod genotype;
pub mod random;
pub mod templates;
pub mod traits;

pub use allele::{Allele, AllelePair, UNKNOWN_EFFECT};
pub use environment::{EnvironmentalConditions, FACTOR_COUNT};
pub use error::{GeneticsError, GeneticsResult};
pub use genotype::{loci, Genotype};
pub use templates::{LocusTemplate, StrainSource, StrainTemplate};
pub use traits::{StressResponse, TraitExpressionResult, TraitKind};
