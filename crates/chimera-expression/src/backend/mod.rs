// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! # Compute Backend Abstraction
//!
//! Batch expression runs on a backend that consumes fixed-stride packed
//! buffers. The CPU backend evaluates the same layout with rayon; the WGPU
//! backend uploads it to a compute shader.
//!
//! Layout (all `f32`):
//!
//! | buffer      | stride | slots                                              |
//! |-------------|--------|----------------------------------------------------|
//! | genotype    | 8      | height, thc, cbd, yield, baseline fitness, pad x3  |
//! | environment | 8      | six factors, noise, pad                            |
//! | result      | 12     | nine [`RawExpression`] values, pad x3              |

mod cpu;
#[cfg(feature = "gpu")]
mod wgpu_backend;

pub use cpu::CpuBackend;
#[cfg(feature = "gpu")]
pub use wgpu_backend::WgpuBackend;

use chimera_genetics::EnvironmentalConditions;

use crate::error::{ExpressionError, ExpressionResult};
use crate::model::{LocusEffects, RawExpression, PACKED_RESULT_LEN};

pub const GENOTYPE_STRIDE: usize = 8;
pub const ENVIRONMENT_STRIDE: usize = 8;
pub const RESULT_STRIDE: usize = 12;

/// Threads per workgroup, must match `@workgroup_size` in the shader
pub const WORKGROUP_SIZE: u32 = 64;

/// Genotype/environment pairs packed for a backend
#[derive(Debug, Clone, Default)]
pub struct PackedBatch {
    pub genotype_data: Vec<f32>,
    pub environment_data: Vec<f32>,
    len: usize,
}

impl PackedBatch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            genotype_data: Vec::with_capacity(capacity * GENOTYPE_STRIDE),
            environment_data: Vec::with_capacity(capacity * ENVIRONMENT_STRIDE),
            len: 0,
        }
    }

    pub fn push(&mut self, effects: &LocusEffects, env: &EnvironmentalConditions, noise: f32) {
        self.genotype_data.extend_from_slice(&[
            effects.height,
            effects.thc,
            effects.cbd,
            effects.yield_potential,
            effects.baseline_fitness,
            0.0,
            0.0,
            0.0,
        ]);
        let factors = env.as_array();
        self.environment_data.extend_from_slice(&factors);
        self.environment_data.extend_from_slice(&[noise, 0.0]);
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn effects_at(&self, index: usize) -> LocusEffects {
        let g = &self.genotype_data[index * GENOTYPE_STRIDE..(index + 1) * GENOTYPE_STRIDE];
        LocusEffects {
            height: g[0],
            thc: g[1],
            cbd: g[2],
            yield_potential: g[3],
            baseline_fitness: g[4],
        }
    }

    /// Environment and noise term at `index`
    pub fn environment_at(&self, index: usize) -> (EnvironmentalConditions, f32) {
        let e = &self.environment_data
            [index * ENVIRONMENT_STRIDE..(index + 1) * ENVIRONMENT_STRIDE];
        (
            EnvironmentalConditions {
                temperature: e[0],
                humidity: e[1],
                light_intensity: e[2],
                co2_level: e[3],
                nutrient_level: e[4],
                water_availability: e[5],
            },
            e[6],
        )
    }

    pub fn validate(&self) -> ExpressionResult<()> {
        if self.genotype_data.len() != self.len * GENOTYPE_STRIDE
            || self.environment_data.len() != self.len * ENVIRONMENT_STRIDE
        {
            return Err(ExpressionError::InvalidBatch(format!(
                "{} entries but {} genotype and {} environment slots",
                self.len,
                self.genotype_data.len(),
                self.environment_data.len()
            )));
        }
        Ok(())
    }
}

/// Workgroups needed to cover `len` items
pub fn workgroup_count(len: usize) -> u32 {
    (len as u32).div_ceil(WORKGROUP_SIZE)
}

/// Split backend output into per-item results
pub fn unpack(output: &[f32], len: usize) -> ExpressionResult<Vec<RawExpression>> {
    if output.len() < len * RESULT_STRIDE {
        return Err(ExpressionError::Backend(format!(
            "expected {} result slots, backend returned {}",
            len * RESULT_STRIDE,
            output.len()
        )));
    }
    Ok(output
        .chunks_exact(RESULT_STRIDE)
        .take(len)
        .map(|chunk| RawExpression::from_packed(&chunk[..PACKED_RESULT_LEN]))
        .collect())
}

/// Batch compute backend (CPU, GPU)
pub trait ExpressionBackend: Send {
    /// Get backend type name for logging/debugging
    fn backend_name(&self) -> &str;

    /// Evaluate every packed item, returning `len * RESULT_STRIDE` values
    fn compute_batch(&mut self, batch: &PackedBatch) -> ExpressionResult<Vec<f32>>;
}

/// Check if GPU is available
#[cfg(feature = "gpu")]
pub fn is_gpu_available() -> bool {
    use wgpu::Backends;

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: Backends::all(),
        ..Default::default()
    });

    pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .is_some()
}

#[cfg(not(feature = "gpu"))]
pub fn is_gpu_available() -> bool {
    false
}

/// Construct the accelerated backend for this build
pub fn create_accelerator() -> ExpressionResult<Box<dyn ExpressionBackend>> {
    #[cfg(feature = "gpu")]
    {
        Ok(Box::new(WgpuBackend::new()?))
    }
    #[cfg(not(feature = "gpu"))]
    {
        Err(ExpressionError::BackendUnavailable(
            "compiled without the `gpu` feature".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::express;

    #[test]
    fn test_workgroup_count_rounds_up() {
        assert_eq!(workgroup_count(0), 0);
        assert_eq!(workgroup_count(1), 1);
        assert_eq!(workgroup_count(64), 1);
        assert_eq!(workgroup_count(65), 2);
        assert_eq!(workgroup_count(200), 4);
    }

    #[test]
    fn test_packed_batch_accessors() {
        let effects = LocusEffects {
            height: 0.1,
            thc: 0.2,
            cbd: 0.3,
            yield_potential: 0.4,
            baseline_fitness: 0.5,
        };
        let env = EnvironmentalConditions::new(20.0, 55.0, 700.0, 1100.0);
        let mut batch = PackedBatch::with_capacity(2);
        batch.push(&effects, &EnvironmentalConditions::default(), 0.0);
        batch.push(&effects, &env, 0.01);

        assert_eq!(batch.len(), 2);
        assert!(batch.validate().is_ok());
        assert_eq!(batch.effects_at(1), effects);
        assert_eq!(batch.environment_at(1), (env, 0.01));
    }

    #[test]
    fn test_unpack_rejects_short_output() {
        assert!(unpack(&[0.0; RESULT_STRIDE], 2).is_err());
    }

    #[test]
    fn test_cpu_backend_matches_model() {
        let effects = LocusEffects {
            height: 0.7,
            thc: 0.9,
            cbd: 0.2,
            yield_potential: 0.6,
            baseline_fitness: 0.55,
        };
        let env = EnvironmentalConditions::new(30.0, 45.0, 1100.0, 900.0);
        let mut batch = PackedBatch::with_capacity(1);
        batch.push(&effects, &env, 0.0);

        let mut backend = CpuBackend::default();
        let output = backend.compute_batch(&batch).unwrap();
        let raw = unpack(&output, 1).unwrap();
        assert_eq!(raw[0], express(&effects, &env, 0.0));
    }

    #[cfg(not(feature = "gpu"))]
    #[test]
    fn test_accelerator_unavailable_without_feature() {
        assert!(!is_gpu_available());
        assert!(matches!(
            create_accelerator(),
            Err(ExpressionError::BackendUnavailable(_))
        ));
    }
}
