//! wgpu compute backend
//!
//! Uploads both images as `Rgba32Float` textures, runs `compare.wgsl` over
//! the dispatch grid and copies the atomic counter block back to the host.
//! The clear, the compute pass and the readback copy are recorded into one
//! command buffer, and `execute` blocks until the device has finished it.

use crate::accumulator::{SLOT_BUFFER_SIZE, SLOT_COUNT, StatisticsCounters};
use crate::comparator::{MATCH_EPSILON, ONE_PERCENT_BAND, SCALE, kernel_source};
use crate::config::TileSize;
use crate::dispatch::{ComputeBackend, DispatchJob};
use crate::error::{Result, ValidationError};
use crate::wgpu_helpers::*;
use std::collections::HashMap;
use wgpu::util::DeviceExt;

/// Uniform block consumed by the kernel; field order matches `Params` in the shader
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct KernelParams {
    width: u32,
    height: u32,
    error_threshold: f32,
    warning_threshold: f32,
    track_extended: u32,
    match_epsilon: f32,
    one_percent_band: f32,
    scale: f32,
}

/// Device-side counter block and its host-visible copy
#[derive(Debug)]
struct GpuAccumulator {
    storage: wgpu::Buffer,
    readback: wgpu::Buffer,
}

impl GpuAccumulator {
    fn new(device: &wgpu::Device) -> Self {
        Self {
            storage: create_buffer(device, "statistics_counters", SLOT_BUFFER_SIZE, BUFFER_USAGE_COUNTERS),
            readback: create_buffer(device, "statistics_readback", SLOT_BUFFER_SIZE, BUFFER_USAGE_READBACK),
        }
    }

    /// Records a zeroing of the counter block ahead of any kernel work in `encoder`
    fn clear(&mut self, encoder: &mut wgpu::CommandEncoder) -> ClearedGpuAccumulator<'_> {
        encoder.clear_buffer(&self.storage, 0, None);
        ClearedGpuAccumulator { accumulator: self }
    }
}

impl Drop for GpuAccumulator {
    fn drop(&mut self) {
        self.storage.destroy();
        self.readback.destroy();
    }
}

/// Counter block whose clear has been recorded
struct ClearedGpuAccumulator<'a> {
    accumulator: &'a GpuAccumulator,
}

impl ClearedGpuAccumulator<'_> {
    fn binding(&self) -> wgpu::BindingResource<'_> {
        self.accumulator.storage.as_entire_binding()
    }

    /// Records the copy of the counters into the host-visible buffer
    fn record_readback(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_buffer_to_buffer(&self.accumulator.storage, 0, &self.accumulator.readback, 0, SLOT_BUFFER_SIZE);
    }

    /// Waits for the submitted work and returns the counter slots
    fn read(self, device: &wgpu::Device) -> Result<[u32; SLOT_COUNT]> {
        let words = read_buffer_u32(device, &self.accumulator.readback)?;
        words
            .try_into()
            .map_err(|words: Vec<u32>| ValidationError::Device(format!("expected {SLOT_COUNT} counters, read {}", words.len())))
    }
}

/// Per-dispatch device resources, destroyed when the dispatch ends on any path
struct DispatchResources {
    reference: wgpu::Texture,
    candidate: wgpu::Texture,
    params: wgpu::Buffer,
}

impl Drop for DispatchResources {
    fn drop(&mut self) {
        self.reference.destroy();
        self.candidate.destroy();
        self.params.destroy();
    }
}

/// GPU implementation of [`ComputeBackend`]
///
/// Owns the device, its queue, the counter block and one compiled pipeline per tile size.
#[derive(Debug)]
pub struct GpuBackend {
    /// The wgpu device
    device: wgpu::Device,
    /// The wgpu command queue
    queue: wgpu::Queue,
    /// Layout shared by every tile specialization of the kernel
    bind_group_layout: wgpu::BindGroupLayout,
    /// Compiled kernels keyed by work-group tile
    pipelines: HashMap<TileSize, wgpu::ComputePipeline>,
    accumulator: GpuAccumulator,
    adapter_name: String,
}

impl GpuBackend {
    /// Requests an adapter and device and creates a backend on it
    ///
    /// # Returns
    /// A new backend or an error if no adapter or device is available
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        let adapter_name = adapter.get_info().name;

        // textureLoad on Rgba32Float and atomics on storage buffers are core features
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Spectral Validation Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: Default::default(),
            })
            .await?;

        tracing::debug!(adapter = %adapter_name, "GPU backend initialized");

        Ok(Self::from_device(device, queue, adapter_name))
    }

    /// Blocking variant of [`GpuBackend::new`]
    pub fn new_blocking() -> Result<Self> {
        pollster::block_on(Self::new())
    }

    /// Creates a backend on an existing device
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue, adapter_name: impl Into<String>) -> Self {
        let input_texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Texture {
                // Rgba32Float is not filterable without an optional feature; textureLoad does not need it
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("compare_bind_group_layout"),
            entries: &[
                input_texture_entry(0),
                input_texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<KernelParams>() as u64),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(SLOT_BUFFER_SIZE),
                    },
                    count: None,
                },
            ],
        });

        let accumulator = GpuAccumulator::new(&device);

        Self {
            device,
            queue,
            bind_group_layout,
            pipelines: HashMap::new(),
            accumulator,
            adapter_name: adapter_name.into(),
        }
    }

    /// Name of the adapter the device was created on
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// Returns the kernel specialized for `tile`, compiling it on first use
    fn pipeline_for(&mut self, tile: TileSize) -> &wgpu::ComputePipeline {
        let device = &self.device;
        let bind_group_layout = &self.bind_group_layout;

        self.pipelines.entry(tile).or_insert_with(|| {
            tracing::debug!(tile = %tile, "compiling comparison kernel");

            let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("compare_kernel_{tile}")),
                source: wgpu::ShaderSource::Wgsl(kernel_source(tile).into()),
            });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("compare_pipeline_layout_{tile}")),
                bind_group_layouts: &[bind_group_layout],
                push_constant_ranges: &[],
            });

            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(&format!("compare_pipeline_{tile}")),
                layout: Some(&pipeline_layout),
                module: &shader_module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        })
    }

    /// Uploads the inputs of one dispatch
    fn create_dispatch_resources(&self, job: &DispatchJob<'_>) -> Result<DispatchResources> {
        let params = KernelParams {
            width: job.reference.width(),
            height: job.reference.height(),
            error_threshold: job.thresholds.error_threshold,
            warning_threshold: job.thresholds.warning_threshold,
            track_extended: job.layout.tracks_extended() as u32,
            match_epsilon: MATCH_EPSILON,
            one_percent_band: ONE_PERCENT_BAND,
            scale: SCALE,
        };

        Ok(DispatchResources {
            reference: upload_image_texture(&self.device, &self.queue, "reference_texture", job.reference)?,
            candidate: upload_image_texture(&self.device, &self.queue, "candidate_texture", job.candidate)?,
            params: self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("compare_params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            }),
        })
    }

    /// Records and submits the dispatch, then reads the counters back
    fn run(&mut self, job: &DispatchJob<'_>) -> Result<[u32; SLOT_COUNT]> {
        let resources = self.create_dispatch_resources(job)?;
        let pipeline = self.pipeline_for(job.grid.tile).clone();

        let reference_view = resources.reference.create_view(&wgpu::TextureViewDescriptor::default());
        let candidate_view = resources.candidate.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("compare_encoder") });

        // Zeroing is recorded first so stale counters can never leak into this dispatch
        let accumulator = self.accumulator.clear(&mut encoder);

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("compare_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&reference_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&candidate_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: resources.params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: accumulator.binding(),
                },
            ],
        });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("compare_pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(job.grid.groups_x, job.grid.groups_y, 1);
        }

        accumulator.record_readback(&mut encoder);
        self.queue.submit(std::iter::once(encoder.finish()));

        accumulator.read(&self.device)
    }
}

impl ComputeBackend for GpuBackend {
    fn name(&self) -> &str {
        "gpu"
    }

    fn execute(&mut self, job: &DispatchJob<'_>) -> Result<StatisticsCounters> {
        let max_groups = self.device.limits().max_compute_workgroups_per_dimension;
        if job.grid.groups_x > max_groups || job.grid.groups_y > max_groups {
            return Err(ValidationError::Device(format!(
                "dispatch of {}x{} work-groups exceeds the device limit of {max_groups}",
                job.grid.groups_x, job.grid.groups_y
            )));
        }

        // Capture validation and allocation failures instead of letting wgpu panic on them
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let result = self.run(job);

        let validation_error = pollster::block_on(self.device.pop_error_scope());
        let memory_error = pollster::block_on(self.device.pop_error_scope());
        if let Some(error) = validation_error.or(memory_error) {
            return Err(ValidationError::Device(error.to_string()));
        }

        let slots = result?;
        Ok(StatisticsCounters::from_slots(&slots, job.layout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_layout_matches_shader() {
        // Eight 4-byte scalars, no padding
        assert_eq!(std::mem::size_of::<KernelParams>(), 32);
    }
}
