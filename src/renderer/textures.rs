// SPDX-License-Identifier: GPL-3.0-only

//! Plane textures for planar 4:2:0 frames

/// Y, U and V textures for one frame size
///
/// All three are single channel `R8Unorm`; U and V are half size in both
/// directions.
pub(crate) struct PlaneTextures {
    pub tex_y: wgpu::Texture,
    pub tex_y_view: wgpu::TextureView,
    pub tex_u: wgpu::Texture,
    pub tex_u_view: wgpu::TextureView,
    pub tex_v: wgpu::Texture,
    pub tex_v_view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

fn create_plane(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::R8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn write_plane(queue: &wgpu::Queue, texture: &wgpu::Texture, data: &[u8], width: u32, height: u32) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

impl PlaneTextures {
    pub(crate) fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let (tex_y, tex_y_view) = create_plane(device, "yuv_tex_y", width, height);
        let (tex_u, tex_u_view) = create_plane(device, "yuv_tex_u", width / 2, height / 2);
        let (tex_v, tex_v_view) = create_plane(device, "yuv_tex_v", width / 2, height / 2);

        Self {
            tex_y,
            tex_y_view,
            tex_u,
            tex_u_view,
            tex_v,
            tex_v_view,
            width,
            height,
        }
    }

    /// Queue the three plane uploads
    ///
    /// Slices must be exactly the plane sizes for `width × height`.
    pub(crate) fn write(&self, queue: &wgpu::Queue, y: &[u8], u: &[u8], v: &[u8]) {
        let (chroma_w, chroma_h) = (self.width / 2, self.height / 2);
        write_plane(queue, &self.tex_y, y, self.width, self.height);
        write_plane(queue, &self.tex_u, u, chroma_w, chroma_h);
        write_plane(queue, &self.tex_v, v, chroma_w, chroma_h);
    }

    /// Bind group for the presentation program
    pub(crate) fn bind_group(
        &self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("yuv_planes_bind_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&self.tex_y_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&self.tex_u_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&self.tex_v_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }
}

/// Bind group layout matching `tex_y`, `tex_u`, `tex_v`, `plane_sampler`
pub(crate) fn create_plane_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let plane = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    };

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("yuv_planes_bind_group_layout"),
        entries: &[
            plane(0),
            plane(1),
            plane(2),
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}
