// SPDX-License-Identifier: GPL-3.0-only

//! wgpu implementation of the render backend
//!
//! Draws the planar frame as one indexed quad with the YUV presentation
//! program, into either a host window surface or an offscreen texture that
//! can be read back. Every GPU step runs inside a validation error scope and
//! captured errors are returned as `RenderError`.

use super::backend::{FramePlanes, RenderBackend, Snapshot};
use super::textures::{PlaneTextures, create_plane_bind_group_layout};
use super::viewport::Viewport;
use super::RendererConfig;
use crate::constants::{QUAD_FLOATS_PER_VERTEX, QUAD_INDICES, QUAD_VERTICES};
use crate::errors::{RenderError, RenderResult};
use crate::gpu::{self, CachedDimensions, GpuDeviceInfo};
use crate::shaders::{self, YUV_PRESENT_SHADER, program};
use tracing::{debug, info, warn};
use wgpu::util::DeviceExt;

/// Format of the offscreen target and of read-back snapshots
const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x2,
];

/// Where the backend draws
pub enum RenderTarget {
    /// A host window surface, presented after every draw
    Window {
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    },
    /// An offscreen texture; see [`RenderBackend::read_back`]
    Offscreen { width: u32, height: u32 },
}

impl RenderTarget {
    fn size(&self) -> (u32, u32) {
        match self {
            RenderTarget::Window { width, height, .. } => (*width, *height),
            RenderTarget::Offscreen { width, height } => (*width, *height),
        }
    }
}

/// Everything the host hands over when the surface is acquired
pub struct WgpuSurface {
    pub instance: wgpu::Instance,
    pub target: RenderTarget,
}

impl WgpuSurface {
    /// Offscreen target on a fresh instance
    pub fn offscreen(width: u32, height: u32) -> Self {
        Self {
            instance: gpu::create_instance(),
            target: RenderTarget::Offscreen { width, height },
        }
    }

    /// Window surface created by the host from `instance`
    pub fn window(
        instance: wgpu::Instance,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            instance,
            target: RenderTarget::Window {
                surface,
                width,
                height,
            },
        }
    }
}

enum Target {
    Window {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
}

fn create_offscreen(device: &wgpu::Device, width: u32, height: u32) -> Target {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("yuv_offscreen_target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Target::Offscreen { texture, view }
}

/// Prefer a non-sRGB format so shader output is written unchanged
fn pick_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first().copied())
}

fn create_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("yuv_present_shader"),
        source: wgpu::ShaderSource::Wgsl(YUV_PRESENT_SHADER.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("yuv_present_pipeline_layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("yuv_present_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some(program::VERTEX_ENTRY),
            compilation_options: Default::default(),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: (QUAD_FLOATS_PER_VERTEX * std::mem::size_of::<f32>())
                    as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &QUAD_ATTRIBUTES,
            }],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some(program::FRAGMENT_ENTRY),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

/// Render backend on a wgpu device
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    info: GpuDeviceInfo,
    target: Target,
    size: (u32, u32),
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    planes: Option<(PlaneTextures, wgpu::BindGroup)>,
    dims: CachedDimensions,
    clear_color: wgpu::Color,
    _instance: wgpu::Instance,
}

impl WgpuBackend {
    /// Close the error scope opened for `what`
    fn pop_scope(&self, what: &str) -> RenderResult<()> {
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(e) => Err(RenderError::Gpu(format!("{} failed: {}", what, e))),
            None => Ok(()),
        }
    }

    /// Acquire the next window texture; `None` for offscreen targets
    fn acquire(&self) -> RenderResult<Option<wgpu::SurfaceTexture>> {
        let Target::Window { surface, config } = &self.target else {
            return Ok(None);
        };
        match surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Render surface lost or outdated, reconfiguring");
                surface.configure(&self.device, config);
                Err(RenderError::Gpu(
                    "surface lost or outdated; reconfigured".to_string(),
                ))
            }
            Err(e) => Err(RenderError::Gpu(format!(
                "failed to acquire surface texture: {}",
                e
            ))),
        }
    }
}

impl RenderBackend for WgpuBackend {
    type Surface = WgpuSurface;

    fn create(surface: WgpuSurface, config: &RendererConfig) -> RenderResult<Self> {
        let WgpuSurface { instance, target } = surface;
        let (width, height) = target.size();
        if width == 0 || height == 0 {
            return Err(RenderError::SurfaceNotReady);
        }

        // Reject a broken program before touching the GPU
        shaders::check_program(YUV_PRESENT_SHADER)?;

        let compatible = match &target {
            RenderTarget::Window { surface, .. } => Some(surface),
            RenderTarget::Offscreen { .. } => None,
        };
        let adapter = pollster::block_on(gpu::request_adapter(
            &instance,
            compatible,
            config.power_preference,
        ))?;
        let (device, queue, info) =
            pollster::block_on(gpu::create_device(&adapter, "yuvplay-renderer"))?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let (target, format) = match target {
            RenderTarget::Window { surface, .. } => {
                let caps = surface.get_capabilities(&adapter);
                let Some(format) = pick_surface_format(&caps.formats) else {
                    let _ = pollster::block_on(device.pop_error_scope());
                    return Err(RenderError::InitFailed(
                        "surface reports no supported formats".to_string(),
                    ));
                };
                let wanted: wgpu::PresentMode = config.present_mode.into();
                let present_mode = if caps.present_modes.contains(&wanted) {
                    wanted
                } else {
                    debug!(?wanted, "Present mode unsupported, using Fifo");
                    wgpu::PresentMode::Fifo
                };
                let surface_config = wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format,
                    width,
                    height,
                    present_mode,
                    desired_maximum_frame_latency: 2,
                    alpha_mode: caps
                        .alpha_modes
                        .first()
                        .copied()
                        .unwrap_or(wgpu::CompositeAlphaMode::Auto),
                    view_formats: vec![],
                };
                surface.configure(&device, &surface_config);
                (
                    Target::Window {
                        surface,
                        config: surface_config,
                    },
                    format,
                )
            }
            RenderTarget::Offscreen { .. } => {
                (create_offscreen(&device, width, height), OFFSCREEN_FORMAT)
            }
        };

        let bind_group_layout = create_plane_bind_group_layout(&device);
        let pipeline = create_pipeline(&device, &bind_group_layout, format);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("yuv_plane_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("yuv_quad_vertices"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("yuv_quad_indices"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::InitFailed(format!(
                "GPU resource creation failed: {}",
                e
            )));
        }

        info!(
            adapter = %info.adapter_name,
            backend = ?info.backend,
            ?format,
            width,
            height,
            "Renderer resources created"
        );

        let [r, g, b, a] = config.clear_color;
        Ok(Self {
            device,
            queue,
            info,
            target,
            size: (width, height),
            pipeline,
            bind_group_layout,
            sampler,
            vertex_buffer,
            index_buffer,
            planes: None,
            dims: CachedDimensions::default(),
            clear_color: wgpu::Color { r, g, b, a },
            _instance: instance,
        })
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.size = (width, height);
        if width == 0 || height == 0 {
            debug!(width, height, "Surface minimized, skipping configure");
            return Ok(());
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        if matches!(self.target, Target::Offscreen { .. }) {
            self.target = create_offscreen(&self.device, width, height);
        } else if let Target::Window { surface, config } = &mut self.target {
            config.width = width;
            config.height = height;
            surface.configure(&self.device, config);
        }
        self.pop_scope("resize")
    }

    fn upload(&mut self, planes: &FramePlanes<'_>) -> RenderResult<()> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        if self.planes.is_none() || self.dims.needs_update(planes.width, planes.height) {
            let textures = PlaneTextures::new(&self.device, planes.width, planes.height);
            let bind_group =
                textures.bind_group(&self.device, &self.bind_group_layout, &self.sampler);
            self.planes = Some((textures, bind_group));
            self.dims.update(planes.width, planes.height);
            debug!(
                width = planes.width,
                height = planes.height,
                "Plane textures allocated"
            );
        }

        if let Some((textures, _)) = &self.planes {
            textures.write(&self.queue, planes.y, planes.u, planes.v);
        }

        self.pop_scope("plane upload")
    }

    fn draw(&mut self, viewport: Option<Viewport>) -> RenderResult<()> {
        let (width, height) = self.size;
        if width == 0 || height == 0 {
            return Ok(());
        }

        let frame = self.acquire()?;
        let frame_view = frame
            .as_ref()
            .map(|f| f.texture.create_view(&wgpu::TextureViewDescriptor::default()));
        let view = match (&frame_view, &self.target) {
            (Some(view), _) => view,
            (None, Target::Offscreen { view, .. }) => view,
            (None, Target::Window { .. }) => return Err(RenderError::SurfaceNotReady),
        };

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("yuv_present_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("yuv_present_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });

            if let (Some(vp), Some((_, bind_group))) = (viewport, &self.planes) {
                if !vp.is_empty() {
                    pass.set_pipeline(&self.pipeline);
                    pass.set_bind_group(0, bind_group, &[]);
                    pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                    pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                    pass.set_viewport(
                        vp.x as f32,
                        vp.y as f32,
                        vp.width as f32,
                        vp.height as f32,
                        0.0,
                        1.0,
                    );
                    pass.set_scissor_rect(vp.x, vp.y, vp.width, vp.height);
                    pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
                }
            }
        }
        self.queue.submit(Some(encoder.finish()));

        let result = self.pop_scope("draw");
        if let Some(frame) = frame {
            frame.present();
        }
        result
    }

    fn read_back(&mut self) -> RenderResult<Option<Snapshot>> {
        let Target::Offscreen { texture, .. } = &self.target else {
            return Ok(None);
        };
        let (width, height) = (texture.width(), texture.height());
        let padded = gpu::padded_bytes_per_row(width, 4);

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("yuv_readback_buffer"),
            size: padded as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("yuv_readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));
        self.pop_scope("read back")?;

        let data = pollster::block_on(gpu::read_buffer_async(&self.device, &buffer))
            .map_err(RenderError::Gpu)?;

        let row = (width * 4) as usize;
        let mut rgba = Vec::with_capacity(row * height as usize);
        for chunk in data.chunks(padded as usize).take(height as usize) {
            rgba.extend_from_slice(&chunk[..row]);
        }

        Ok(Some(Snapshot {
            width,
            height,
            rgba,
        }))
    }
}

impl Drop for WgpuBackend {
    fn drop(&mut self) {
        debug!(adapter = %self.info.adapter_name, "Releasing renderer GPU resources");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_surface_format_prefers_linear() {
        let formats = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Bgra8Unorm,
        ];
        assert_eq!(
            pick_surface_format(&formats),
            Some(wgpu::TextureFormat::Bgra8Unorm)
        );
        assert_eq!(
            pick_surface_format(&[wgpu::TextureFormat::Rgba8UnormSrgb]),
            Some(wgpu::TextureFormat::Rgba8UnormSrgb)
        );
        assert_eq!(pick_surface_format(&[]), None);
    }

    #[test]
    fn test_quad_vertex_stride() {
        assert_eq!(
            std::mem::size_of_val(&QUAD_VERTICES),
            QUAD_VERTICES.len() * QUAD_FLOATS_PER_VERTEX * std::mem::size_of::<f32>()
        );
        let last = QUAD_ATTRIBUTES[1];
        assert_eq!(last.shader_location, program::TEX_COORD_LOCATION);
        assert_eq!(last.offset, 3 * std::mem::size_of::<f32>() as u64);
    }
}
