// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

/*!
# Chimera Expression

Computes phenotypic trait expression for a genotype under environmental
conditions.

## Architecture

```text
calculate_expression
   |
   +-- L1 ExactCache       (structural key, TTL + LRU)
   +-- L2 SimilarityCache  (weighted similarity, adaptive threshold)
   +-- model::express      (dominance, environment response, epistasis,
                            pleiotropy, stress)

calculate_expression_batch
   |
   +-- Sequential  < batch_threshold
   +-- Parallel    rayon
   +-- Gpu         packed buffers on WGPU (feature `gpu`), falls back to Parallel
```

Results come from an [`ObjectPool`]; callers may hand them back with
[`TraitExpressionEngine::recycle`]. Cache tiers hold their own immutable
snapshots, so a recycled result never aliases cached state.

Copyright 2025 Chimera Genetics Team
Licensed under the Apache License, Version 2.0
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod exact_cache;
pub mod key;
pub mod maintenance;
pub mod metrics;
pub mod model;
pub mod pool;
pub mod similarity;
pub mod similarity_cache;

pub use backend::{is_gpu_available, CpuBackend, ExpressionBackend, PackedBatch};
pub use config::{CacheConfig, ExpressionConfig, PoolConfig, SimilarityCacheConfig};
pub use dispatch::{select_batch_strategy, BatchDecision, BatchStrategy};
pub use engine::TraitExpressionEngine;
pub use error::{ExpressionError, ExpressionResult};
pub use exact_cache::{CacheMetrics, ExactCache};
pub use key::ExpressionKey;
pub use maintenance::MaintenanceRunner;
pub use metrics::{AdvancedCacheMetrics, MaintenanceReport, PerformanceMetrics};
pub use pool::{ObjectPool, PoolMetrics, Poolable};
pub use similarity::{environmental_similarity, genetic_similarity, locus_similarity, overall_similarity};
pub use similarity_cache::{PromotionCandidate, SimilarMatch, SimilarityCache, SimilarityCacheMetrics};

#[cfg(feature = "gpu")]
pub use backend::WgpuBackend;
