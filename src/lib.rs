// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! # Chimera
//!
//! Genetic trait expression and breeding for cultivation simulations.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! chimera = "0.3"  # Default: config + observability
//! ```
//!
//! ## Feature Flags
//!
//! - **`config`** (default): TOML configuration loader and [`runtime::ChimeraRuntime`]
//! - **`observability`** (default): logging initialization and debug flags
//! - **`gpu`**: WGPU compute backend for large expression batches
//! - **`file-logging`**: rolling JSON log files
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chimera::prelude::*;
//!
//! let expression = Arc::new(TraitExpressionEngine::new(ExpressionConfig::default()));
//! let breeding = BreedingCalculationEngine::new(BreedingConfig::default(), expression.clone());
//!
//! let mut rng = chimera::genetics::random::seeded_rng(Some(7));
//! let mother = StrainTemplate::indica_dominant().create_founder(&mut rng)?;
//! let father = StrainTemplate::sativa_dominant().create_founder(&mut rng)?;
//!
//! let cross = breeding.breed_plants(&mother, &father, 4)?;
//! let traits = expression.calculate_expression(&cross.offspring[0], &EnvironmentalConditions::default());
//! println!("THC {:.2}", traits.thc_expression);
//! expression.recycle(traits);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: chimera-genetics                           │
//! │  (Allele, Genotype, Environment, TraitExpressionResult) │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Expression: chimera-expression                         │
//! │  (L1/L2 caches, object pool, batch dispatch)            │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Breeding: chimera-breeding                             │
//! │  (Crosses, pedigree, pair optimisation, simulation)     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Re-export foundation
pub use chimera_genetics as genetics;

// Re-export algorithms
pub use chimera_breeding as breeding;
pub use chimera_expression as expression;

// Re-export infrastructure
#[cfg(feature = "config")]
pub use chimera_config as config;

#[cfg(feature = "observability")]
pub use chimera_observability as observability;

#[cfg(feature = "config")]
pub mod runtime;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::genetics::{
        loci, Allele, AllelePair, EnvironmentalConditions, Genotype, StrainTemplate, TraitExpressionResult,
        TraitKind,
    };

    pub use crate::expression::{
        BatchStrategy, ExpressionConfig, MaintenanceRunner, PerformanceMetrics, TraitExpressionEngine,
    };

    pub use crate::breeding::{
        BreedingCalculationEngine, BreedingConfig, BreedingError, BreedingGoal, BreedingResult,
        OptimalBreedingPair,
    };

    #[cfg(feature = "config")]
    pub use crate::config::{load_config, validate_config, ChimeraConfig};

    #[cfg(feature = "config")]
    pub use crate::runtime::ChimeraRuntime;
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        let genotype = Genotype::new("facade");
        assert!(genotype.loci.is_empty());
        assert_eq!(ExpressionConfig::default().batch_threshold, 50);
    }
}
