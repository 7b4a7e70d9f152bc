//! wgpu render context: the full scene lives in one persistent instance
//! buffer uploaded at construction; per frame only a 4-byte time scalar is
//! rewritten and one instanced draw is issued.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt as _;

use crate::compile::instances::{NoteInstance, StaticQuad};
use crate::foundation::core::{Canvas, FrameRgb};
use crate::foundation::error::{NotefallError, NotefallResult};
use crate::render::{RenderContext, Scene};

/// Instanced vertex attributes, uploaded exactly once.
///
/// `color_radius` packs rgb + corner radius; `timing_size` packs
/// (start_time, animate flag, width_px, height_px). Static overlay quads
/// carry an animate flag of 0 and skip the time-driven vertex path.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct RawInstance {
    base_rect: [f32; 4],
    color_radius: [f32; 4],
    timing_size: [f32; 4],
}

/// The uniform block. Only `current_time` ever changes after upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct RawParams {
    current_time: f32,
    pixels_per_second: f32,
    strike_y_pixels: f32,
    lookahead: f32,
    screen: [f32; 2],
    passthrough: f32,
    _pad: f32,
}

fn raw_note(inst: &NoteInstance, radius: f32) -> RawInstance {
    RawInstance {
        base_rect: inst.base_rect,
        color_radius: [inst.color[0], inst.color[1], inst.color[2], radius],
        timing_size: [
            inst.timing[0],
            1.0,
            inst.size_pixels[0],
            inst.size_pixels[1],
        ],
    }
}

fn raw_static(quad: &StaticQuad) -> RawInstance {
    RawInstance {
        base_rect: quad.rect,
        color_radius: [quad.color[0], quad.color[1], quad.color[2], 0.0],
        timing_size: [0.0, 0.0, quad.size_pixels[0], quad.size_pixels[1]],
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

/// GPU-resident render context (requires the `gpu` cargo feature).
///
/// All wgpu resources are owned here and scoped to one video render;
/// teardown is the struct's `Drop`, which runs on every exit path.
pub struct GpuContext {
    canvas: Canvas,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    instance_count: u32,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    readback: wgpu::Buffer,
    bytes_per_row: u32,
    rendered: bool,
}

impl GpuContext {
    /// Acquire a headless device, compile the animation program and upload
    /// the instance buffer. Any failure here is fatal and happens before
    /// the first frame.
    pub fn new(scene: Scene) -> NotefallResult<Self> {
        let canvas = scene.params.canvas();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| NotefallError::resource_init(format!("no gpu adapter available: {e:?}")))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| NotefallError::resource_init(format!("wgpu request_device failed: {e:?}")))?;

        let max_dim = device.limits().max_texture_dimension_2d;
        if canvas.width > max_dim || canvas.height > max_dim {
            return Err(NotefallError::resource_init(format!(
                "surface {}x{} exceeds device texture limit {max_dim}",
                canvas.width, canvas.height
            )));
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("notefall_surface"),
            size: wgpu::Extent3d {
                width: canvas.width,
                height: canvas.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bytes_per_row = align_to(canvas.width * 4, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("notefall_readback"),
            size: u64::from(bytes_per_row) * u64::from(canvas.height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Static overlay first, notes after; one buffer, one draw, uploaded
        // exactly once for the whole video.
        let raw: Vec<RawInstance> = scene
            .statics
            .iter()
            .map(raw_static)
            .chain(
                scene
                    .instances
                    .iter()
                    .map(|i| raw_note(i, scene.params.corner_radius)),
            )
            .collect();
        let instance_count = raw.len() as u32;
        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("notefall_instances"),
            contents: bytemuck::cast_slice(&raw),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let params = RawParams {
            current_time: 0.0,
            pixels_per_second: scene.params.pixels_per_second,
            strike_y_pixels: scene.params.strike_line_y_pixels,
            lookahead: scene.params.lookahead_seconds,
            screen: [canvas.width as f32, canvas.height as f32],
            passthrough: scene.params.passthrough_seconds,
            _pad: 0.0,
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("notefall_frame_params"),
            contents: bytemuck::cast_slice(&[params]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("notefall_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<RawParams>() as u64),
                },
                count: None,
            }],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("notefall_bg"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("notefall_notes_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("notes.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("notefall_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let instance_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<RawInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x4, 2 => Float32x4],
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("notefall_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[instance_layout],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    // Additive blend over the black clear: commutative, so
                    // the image is independent of instance order.
                    blend: Some(wgpu::BlendState {
                        color: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::One,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                        alpha: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::One,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..wgpu::PrimitiveState::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            canvas,
            device,
            queue,
            pipeline,
            bind_group,
            uniform_buffer,
            instance_buffer,
            instance_count,
            texture,
            view,
            readback,
            bytes_per_row,
            rendered: false,
        })
    }
}

impl RenderContext for GpuContext {
    fn canvas(&self) -> Canvas {
        self.canvas
    }

    fn render_frame(&mut self, time: f64) -> NotefallResult<()> {
        // The single per-frame mutable parameter: 4 bytes at offset 0.
        self.queue
            .write_buffer(&self.uniform_buffer, 0, &(time as f32).to_le_bytes());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("notefall_frame_encoder"),
            });
        {
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("notefall_frame_rp"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rp.set_pipeline(&self.pipeline);
            rp.set_bind_group(0, &self.bind_group, &[]);
            rp.set_vertex_buffer(0, self.instance_buffer.slice(..));
            rp.draw(0..4, 0..self.instance_count);
        }
        self.queue.submit(Some(encoder.finish()));
        self.rendered = true;
        Ok(())
    }

    fn read_frame(&mut self) -> NotefallResult<FrameRgb> {
        if !self.rendered {
            return Err(NotefallError::resource_init(
                "read_frame called before render_frame",
            ));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("notefall_readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.bytes_per_row),
                    rows_per_image: Some(self.canvas.height),
                },
            },
            wgpu::Extent3d {
                width: self.canvas.width,
                height: self.canvas.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = self.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| NotefallError::resource_init(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| NotefallError::resource_init("readback channel closed"))?
            .map_err(|e| NotefallError::resource_init(format!("readback map failed: {e:?}")))?;

        // Texture rows come back top-first (NDC +1 renders to row 0), so
        // assembling rows in order yields the top-left-origin contract;
        // padding is stripped and alpha dropped per row.
        let mut data = Vec::with_capacity(self.canvas.rgb_len());
        {
            let mapped = buffer_slice.get_mapped_range();
            let padded = self.bytes_per_row as usize;
            for row in 0..self.canvas.height as usize {
                let start = row * padded;
                let row_bytes = &mapped[start..start + self.canvas.width as usize * 4];
                for px in row_bytes.chunks_exact(4) {
                    data.extend_from_slice(&px[..3]);
                }
            }
        }
        self.readback.unmap();

        let frame = FrameRgb {
            width: self.canvas.width,
            height: self.canvas.height,
            data,
        };
        frame.validate()?;
        Ok(frame)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/gpu.rs"]
mod tests;
