// Copyright 2025 Chimera Genetics Team
// SPDX-License-Identifier: Apache-2.0

//! # WGPU Backend
//!
//! GPU-accelerated batch expression using WGPU (cross-platform GPU compute library).
//! Supports Metal (macOS), Vulkan (Linux), DirectX 12 (Windows).
//!
//! Buffers are created per batch: batches are short-lived and vary in size,
//! so there is no persistent device-side state beyond the pipeline.

use bytemuck::{Pod, Zeroable};
use tracing::{debug, info};
use wgpu::util::DeviceExt;

use super::{workgroup_count, ExpressionBackend, PackedBatch, RESULT_STRIDE};
use crate::error::{ExpressionError, ExpressionResult};

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct BatchParams {
    count: u32,
    _padding: [u32; 3],
}

/// WGPU backend for GPU acceleration
pub struct WgpuBackend {
    /// Backend name for logging
    name: String,

    /// WGPU device
    device: wgpu::Device,

    /// WGPU command queue
    queue: wgpu::Queue,

    /// Trait expression pipeline (auto-layout from shader)
    pipeline: wgpu::ComputePipeline,
}

impl WgpuBackend {
    /// Create a new WGPU backend
    pub fn new() -> ExpressionResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Request adapter (GPU)
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| {
            ExpressionError::BackendUnavailable("Failed to find WGPU adapter".to_string())
        })?;

        let adapter_info = adapter.get_info();
        let name = format!("WGPU ({} - {:?})", adapter_info.name, adapter_info.backend);

        // Request device and queue
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Chimera Expression Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .map_err(|e| ExpressionError::BackendUnavailable(format!("Failed to create device: {}", e)))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Trait Expression Shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("shaders/trait_expression.wgsl").into(),
            ),
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Trait Expression Pipeline"),
            layout: None, // Auto-layout from shader
            module: &shader,
            entry_point: "trait_expression_main",
        });

        info!(target: "chimera-expression", "[GPU] {} ready", name);

        Ok(Self {
            name,
            device,
            queue,
            pipeline,
        })
    }

    fn read_back(&self, buffer: &wgpu::Buffer, size: u64) -> ExpressionResult<Vec<f32>> {
        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Expression Results Staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Download Expression Results"),
            });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging_buffer, 0, size);
        self.queue.submit(Some(encoder.finish()));

        // Map staging buffer to CPU memory (blocking)
        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            // Receiver outlives the poll below; a send failure only means it gave up
            let _ = sender.send(result);
        });

        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| {
                ExpressionError::Backend("Failed to receive result buffer map status".to_string())
            })?
            .map_err(|e| ExpressionError::Backend(format!("Failed to map result buffer: {:?}", e)))?;

        let data = buffer_slice.get_mapped_range();
        let values: Vec<f32> = bytemuck::cast_slice(&data).to_vec();

        drop(data);
        staging_buffer.unmap();
        Ok(values)
    }
}

impl ExpressionBackend for WgpuBackend {
    fn backend_name(&self) -> &str {
        &self.name
    }

    fn compute_batch(&mut self, batch: &PackedBatch) -> ExpressionResult<Vec<f32>> {
        batch.validate()?;
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let genotype_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Genotype Effects"),
                contents: bytemuck::cast_slice(&batch.genotype_data),
                usage: wgpu::BufferUsages::STORAGE,
            });
        let environment_buffer =
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Environments"),
                    contents: bytemuck::cast_slice(&batch.environment_data),
                    usage: wgpu::BufferUsages::STORAGE,
                });
        let result_size = (batch.len() * RESULT_STRIDE * std::mem::size_of::<f32>()) as u64;
        let result_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Expression Results"),
            size: result_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let params = BatchParams {
            count: batch.len() as u32,
            _padding: [0; 3],
        };
        let params_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Batch Params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let bind_group_layout = self.pipeline.get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Trait Expression Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: genotype_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: environment_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: result_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Trait Expression Encoder"),
            });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Trait Expression Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(workgroup_count(batch.len()), 1, 1);
        }
        self.queue.submit(Some(encoder.finish()));

        debug!(
            target: "chimera-expression",
            "[GPU] Dispatched {} items in {} workgroups",
            batch.len(),
            workgroup_count(batch.len())
        );

        self.read_back(&result_buffer, result_size)
    }
}
