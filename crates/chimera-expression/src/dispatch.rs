// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! Batch strategy selection.
//!
//! Largest threshold first: accelerated when the batch reaches the GPU
//! threshold and hardware is present, parallel at the batch threshold,
//! sequential otherwise.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ExpressionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchStrategy {
    /// Calling thread, one item at a time
    Sequential,
    /// Fan out across the rayon pool
    Parallel,
    /// Packed buffers on the accelerated backend
    Gpu,
}

impl fmt::Display for BatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStrategy::Sequential => write!(f, "Sequential"),
            BatchStrategy::Parallel => write!(f, "Parallel"),
            BatchStrategy::Gpu => write!(f, "GPU"),
        }
    }
}

impl FromStr for BatchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(BatchStrategy::Sequential),
            "parallel" => Ok(BatchStrategy::Parallel),
            "gpu" | "wgpu" => Ok(BatchStrategy::Gpu),
            _ => Err(format!(
                "Unknown batch strategy: {}. Valid options: sequential, parallel, gpu",
                s
            )),
        }
    }
}

/// Strategy selection decision with rationale
#[derive(Debug, Clone, PartialEq)]
pub struct BatchDecision {
    pub strategy: BatchStrategy,
    pub reason: String,
}

pub fn select_batch_strategy(
    batch_size: usize,
    config: &ExpressionConfig,
    accelerator_available: bool,
) -> BatchDecision {
    if batch_size >= config.gpu_threshold && config.use_gpu && accelerator_available {
        return BatchDecision {
            strategy: BatchStrategy::Gpu,
            reason: format!(
                "GPU selected: {} items >= gpu_threshold {}",
                batch_size, config.gpu_threshold
            ),
        };
    }

    if batch_size >= config.batch_threshold {
        let reason = if batch_size >= config.gpu_threshold {
            format!(
                "Parallel selected: {} items, accelerator not available",
                batch_size
            )
        } else {
            format!(
                "Parallel selected: {} items >= batch_threshold {}",
                batch_size, config.batch_threshold
            )
        };
        return BatchDecision {
            strategy: BatchStrategy::Parallel,
            reason,
        };
    }

    BatchDecision {
        strategy: BatchStrategy::Sequential,
        reason: format!(
            "Sequential selected: {} items below batch_threshold {}",
            batch_size, config.batch_threshold
        ),
    }
}
