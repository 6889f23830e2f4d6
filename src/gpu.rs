//! Optional GPU backend (feature `gpu`): a drop-in [`Backend`] chosen once,
//! at `Pipeline::new`, per §9's pluggable-backend pattern — never per-voxel.
//!
//! Only `normalize` runs as a compute shader here; `crop`, `transpose`, and
//! `resample` fall through to the trait's default methods (the CPU free
//! functions), since `GpuBackend` only overrides `normalize` below. Async
//! device/queue operations are resolved synchronously inside that stage via
//! `pollster::block_on` — this backend never leaks a `Future` across the
//! `Backend` trait boundary.

use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::pipeline::Backend;
use crate::volume::{CTNormalizationProperties, Volume};

/// GPU-specific failure modes, folded into [`crate::error::Error::GpuBackend`].
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("no suitable GPU adapter available")]
    NoAdapter,
    #[error("failed to request GPU device: {0}")]
    DeviceRequest(String),
    #[error("shader compilation or pipeline creation failed: {0}")]
    Shader(String),
    #[error("GPU buffer mapping failed: {0}")]
    BufferMap(String),
    #[error("compute dispatch failed: {0}")]
    Dispatch(String),
}

const NORMALIZE_SHADER: &str = r#"
struct Params {
    mean: f32,
    std: f32,
    lower: f32,
    upper: f32,
};

@group(0) @binding(0) var<storage, read_write> data: array<f32>;
@group(0) @binding(1) var<uniform> params: Params;

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let i = id.x;
    if (i >= arrayLength(&data)) {
        return;
    }
    let clipped = clamp(data[i], params.lower, params.upper);
    data[i] = (clipped - params.mean) / params.std;
}
"#;

/// Holds an initialized `wgpu` device and queue, acquired once at construction.
pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuBackend {
    /// Requests a default adapter/device pair, blocking until ready.
    pub fn new() -> Result<Self, GpuError> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .map_err(|_| GpuError::NoAdapter)?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .map_err(|e| GpuError::DeviceRequest(e.to_string()))?;
        Ok(GpuBackend { device, queue })
    }

    fn normalize_on_gpu(&self, volume: &Volume, props: &CTNormalizationProperties) -> Vec<f32> {
        let data = volume.data();

        let storage_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("ct-normalize-storage"),
            contents: bytemuck::cast_slice(data),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
        });

        #[repr(C)]
        #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
        struct Params {
            mean: f32,
            std: f32,
            lower: f32,
            upper: f32,
        }

        let params = Params {
            mean: props.mean,
            std: props.effective_std(),
            lower: props.lower,
            upper: props.upper,
        };
        let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("ct-normalize-params"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ct-normalize-shader"),
            source: wgpu::ShaderSource::Wgsl(NORMALIZE_SHADER.into()),
        });

        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("ct-normalize-pipeline"),
                layout: None,
                module: &shader,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });

        let bind_group_layout = pipeline.get_bind_group_layout(0);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ct-normalize-bind-group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: storage_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("ct-normalize-encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("ct-normalize-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let workgroups = (data.len() as u32).div_ceil(256);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }

        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ct-normalize-readback"),
            size: storage_buffer.size(),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        encoder.copy_buffer_to_buffer(&storage_buffer, 0, &readback, 0, storage_buffer.size());
        self.queue.submit(Some(encoder.finish()));

        let slice = readback.slice(..);
        slice.map_async(wgpu::MapMode::Read, |_| {});
        self.device.poll(wgpu::Maintain::Wait);

        let view = slice.get_mapped_range();
        let result: Vec<f32> = bytemuck::cast_slice(&view).to_vec();
        drop(view);
        readback.unmap();

        result
    }
}

impl Backend for GpuBackend {
    fn normalize(&self, volume: &Volume, props: &CTNormalizationProperties) -> Volume {
        let data = self.normalize_on_gpu(volume, props);
        let mut out = Volume::with_metadata_from(data, volume.shape(), volume.spacing, volume, None)
            .expect("GPU normalize preserves shape and spacing");
        out.bbox = volume.bbox;
        out
    }
}
