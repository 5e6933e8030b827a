// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! # CPU Backend
//!
//! Evaluates packed batches with rayon. Used directly in tests to exercise
//! the accelerated tier without a GPU, and as the reference the shader is
//! checked against.

use rayon::prelude::*;

use super::{ExpressionBackend, PackedBatch, RESULT_STRIDE};
use crate::error::ExpressionResult;
use crate::model::{express, PACKED_RESULT_LEN};

pub struct CpuBackend {
    name: String,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self {
            name: "CPU (rayon)".to_string(),
        }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionBackend for CpuBackend {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn compute_batch(&mut self, batch: &PackedBatch) -> ExpressionResult<Vec<f32>> {
        batch.validate()?;
        let mut output = vec![0.0f32; batch.len() * RESULT_STRIDE];
        output
            .par_chunks_mut(RESULT_STRIDE)
            .enumerate()
            .for_each(|(index, out)| {
                let effects = batch.effects_at(index);
                let (env, noise) = batch.environment_at(index);
                let raw = express(&effects, &env, noise);
                out[..PACKED_RESULT_LEN].copy_from_slice(&raw.to_packed());
            });
        Ok(output)
    }
}
