//! wgpu Render Backend
//!
//! [`RenderBackend`] on top of a `wgpu::Device`. Textures live in a slot map,
//! all work is recorded into one lazily created command encoder and handed to
//! the queue by [`WgpuBackend::submit`] (once per frame, after `refresh`).
//!
//! Scene passes belong to the host renderer and are forwarded to a
//! [`SceneDrawer`]; the probe-specific full-screen passes (world background,
//! glossy and diffuse convolution) are implemented here.

use std::borrow::Cow;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use wgpu::util::DeviceExt;

use super::backend::{
    Attachment, AttachmentLayer, FilterUniforms, Framebuffer, FullscreenDraw, RenderBackend, ScenePass,
    ShaderVariant, TextureDesc, TextureHandle, TextureKind, ViewMatrices, Viewport,
};
use crate::errors::{ProbeError, Result};
use crate::lightprobes::ShadingInputs;
use crate::lightprobes::capture::cube_face_views;
use crate::scene::WorldMaterialId;

// ============================================================================
// Host scene submission
// ============================================================================

/// Render target handed to the host for one face of a capture.
pub struct CaptureTarget<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color: &'a wgpu::TextureView,
    pub color_format: wgpu::TextureFormat,
    pub depth: Option<&'a wgpu::TextureView>,
    pub viewport: Viewport,
    /// Cube face (array layer) being rendered.
    pub face: u32,
}

/// Host renderer hook used while capturing probes.
pub trait SceneDrawer {
    /// Records one standard scene pass into `target` with the given view.
    /// Colour and depth are already cleared; passes must load, not clear.
    fn draw_pass(
        &mut self,
        target: &mut CaptureTarget<'_>,
        pass: ScenePass,
        view: &ViewMatrices,
        shading: &ShadingInputs,
    );

    /// Draws the world material for the face `target.face` seen through `view`.
    fn draw_world_material(
        &mut self,
        target: &mut CaptureTarget<'_>,
        material: WorldMaterialId,
        view: &ViewMatrices,
    ) -> Result<()> {
        let _ = (target, view);
        Err(ProbeError::ShaderUnavailable(format!("world material {}", material.0)))
    }
}

// ============================================================================
// Mip chain generation
// ============================================================================

/// Box-filters mip `i` into `i + 1` for every layer of a texture.
struct MipChainBlitter {
    layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    shader: wgpu::ShaderModule,
    pipelines: FxHashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
}

impl MipChainBlitter {
    fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Probe Mip Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/lightprobe_blit.wgsl"))),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Probe Mip Blit Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Probe Mip Blit Pipeline Layout"),
            bind_group_layouts: &[Some(&layout)],
            immediate_size: 0,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Probe Mip Blit Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        Self {
            layout,
            pipeline_layout,
            sampler,
            shader,
            pipelines: FxHashMap::default(),
        }
    }

    fn pipeline(&mut self, device: &wgpu::Device, format: wgpu::TextureFormat) -> wgpu::RenderPipeline {
        let Self {
            pipelines,
            pipeline_layout,
            shader,
            ..
        } = self;
        pipelines
            .entry(format)
            .or_insert_with(|| {
                fullscreen_pipeline(device, &format!("Probe Mip Blit {format:?}"), pipeline_layout, shader, format)
            })
            .clone()
    }

    fn generate(&mut self, device: &wgpu::Device, encoder: &mut wgpu::CommandEncoder, texture: &wgpu::Texture) {
        let mip_count = texture.mip_level_count();
        let format = texture.format();
        if mip_count < 2 || format.is_depth_stencil_format() {
            return;
        }

        let pipeline = self.pipeline(device, format);

        for layer in 0..texture.depth_or_array_layers() {
            for mip in 0..mip_count - 1 {
                let src = layer_view(texture, layer, mip, wgpu::TextureUsages::TEXTURE_BINDING);
                let dst = layer_view(texture, layer, mip + 1, wgpu::TextureUsages::RENDER_ATTACHMENT);

                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Probe Mip Blit BG"),
                    layout: &self.layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&src),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&self.sampler),
                        },
                    ],
                });

                let mut rpass = begin_color_pass(encoder, "Probe Mip Blit", &dst, wgpu::LoadOp::Clear(wgpu::Color::BLACK));
                rpass.set_pipeline(&pipeline);
                rpass.set_bind_group(0, &bind_group, &[]);
                rpass.draw(0..3, 0..1);
            }
        }
    }
}

// ============================================================================
// Probe full-screen passes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FilterKind {
    World,
    Glossy,
    Diffuse,
}

struct FilterPipelines {
    layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    world: wgpu::ShaderModule,
    glossy: wgpu::ShaderModule,
    diffuse: wgpu::ShaderModule,
    pipelines: FxHashMap<(FilterKind, wgpu::TextureFormat), wgpu::RenderPipeline>,
}

impl FilterPipelines {
    fn new(device: &wgpu::Device) -> Self {
        let module = |label: &'static str, source: &'static str| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
            })
        };
        let world = module("Probe World Shader", include_str!("shaders/lightprobe_world.wgsl"));
        let glossy = module(
            "Probe Glossy Filter Shader",
            include_str!("shaders/lightprobe_filter_glossy.wgsl"),
        );
        let diffuse = module(
            "Probe Diffuse Filter Shader",
            include_str!("shaders/lightprobe_filter_diffuse.wgsl"),
        );

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Probe Filter Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Probe Filter Pipeline Layout"),
            bind_group_layouts: &[Some(&layout)],
            immediate_size: 0,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Probe Filter Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        Self {
            layout,
            pipeline_layout,
            sampler,
            world,
            glossy,
            diffuse,
            pipelines: FxHashMap::default(),
        }
    }

    fn pipeline(&mut self, device: &wgpu::Device, kind: FilterKind, format: wgpu::TextureFormat) -> wgpu::RenderPipeline {
        let Self {
            pipelines,
            pipeline_layout,
            world,
            glossy,
            diffuse,
            ..
        } = self;
        pipelines
            .entry((kind, format))
            .or_insert_with(|| {
                let shader = match kind {
                    FilterKind::World => &*world,
                    FilterKind::Glossy => &*glossy,
                    FilterKind::Diffuse => &*diffuse,
                };
                log::debug!("Creating probe {kind:?} pipeline for {format:?}");
                fullscreen_pipeline(device, &format!("Probe {kind:?} {format:?}"), pipeline_layout, shader, format)
            })
            .clone()
    }
}

// ============================================================================
// WgpuBackend
// ============================================================================

struct GpuTexture {
    texture: wgpu::Texture,
    desc: TextureDesc,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: SlotMap<TextureHandle, GpuTexture>,
    encoder: Option<wgpu::CommandEncoder>,
    mipmaps: MipChainBlitter,
    filters: FilterPipelines,
    drawer: Box<dyn SceneDrawer>,
    dummy_cube: wgpu::Texture,
    dummy_2d: wgpu::Texture,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, drawer: Box<dyn SceneDrawer>) -> Self {
        let dummy = |label: &'static str, layers: u32| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: layers,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba16Float,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
        };
        let dummy_cube = dummy("Probe Dummy Cube", 6);
        let dummy_2d = dummy("Probe Dummy 2D", 1);

        Self {
            mipmaps: MipChainBlitter::new(&device),
            filters: FilterPipelines::new(&device),
            device,
            queue,
            textures: SlotMap::with_key(),
            encoder: None,
            drawer,
            dummy_cube,
            dummy_2d,
        }
    }

    /// Submits everything recorded since the last call.
    pub fn submit(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(Some(encoder.finish()));
        }
    }

    #[must_use]
    pub fn texture(&self, handle: TextureHandle) -> Option<&wgpu::Texture> {
        self.textures.get(handle).map(|t| &t.texture)
    }

    /// Sampling view matching the texture kind (cube, array or plain 2D).
    #[must_use]
    pub fn sampled_view(&self, handle: TextureHandle) -> Option<wgpu::TextureView> {
        let tex = self.textures.get(handle)?;
        let dimension = match tex.desc.kind {
            TextureKind::D2 => wgpu::TextureViewDimension::D2,
            TextureKind::D2Array => wgpu::TextureViewDimension::D2Array,
            TextureKind::Cube => wgpu::TextureViewDimension::Cube,
        };
        Some(tex.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(tex.desc.label),
            dimension: Some(dimension),
            usage: Some(wgpu::TextureUsages::TEXTURE_BINDING),
            ..Default::default()
        }))
    }

    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Render views of an attachment: one per layer for layered attachments.
    fn attachment_views(&self, attachment: Attachment) -> Result<Vec<(u32, wgpu::TextureView)>> {
        let tex = self
            .textures
            .get(attachment.texture)
            .ok_or(ProbeError::ResourceUnavailable("attachment texture"))?;
        let layers = match attachment.layer {
            AttachmentLayer::Single(layer) => layer..layer + 1,
            AttachmentLayer::All => 0..tex.desc.layers,
        };
        Ok(layers
            .map(|layer| {
                (
                    layer,
                    layer_view(&tex.texture, layer, attachment.mip, wgpu::TextureUsages::RENDER_ATTACHMENT),
                )
            })
            .collect())
    }

    fn attachment_format(&self, attachment: Attachment) -> Result<wgpu::TextureFormat> {
        self.textures
            .get(attachment.texture)
            .map(|t| t.desc.format)
            .ok_or(ProbeError::ResourceUnavailable("attachment texture"))
    }

    fn check_limits(&self, desc: &TextureDesc) -> Result<()> {
        let limits = self.device.limits();
        let reason = if desc.width > limits.max_texture_dimension_2d || desc.height > limits.max_texture_dimension_2d {
            Some(format!(
                "{}x{} exceeds max texture dimension {}",
                desc.width, desc.height, limits.max_texture_dimension_2d
            ))
        } else if desc.layers > limits.max_texture_array_layers {
            Some(format!(
                "{} layers exceed max array layers {}",
                desc.layers, limits.max_texture_array_layers
            ))
        } else if desc.width == 0 || desc.height == 0 {
            Some("zero-sized texture".to_owned())
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ProbeError::ResourceAllocation {
                label: desc.label.to_owned(),
                reason,
            }),
            None => Ok(()),
        }
    }

    fn draw_world_material(&mut self, target: &Framebuffer, material: WorldMaterialId) -> Result<()> {
        let color = target
            .color()
            .ok_or(ProbeError::ResourceUnavailable("framebuffer colour attachment"))?;
        let format = self.attachment_format(color)?;
        let views = self.attachment_views(color)?;
        let faces = cube_face_views(glam::Vec3::ZERO, 0.1, 100.0);

        for (layer, view) in &views {
            let encoder = encoder_slot(&mut self.encoder, &self.device);
            let mut capture = CaptureTarget {
                device: &self.device,
                queue: &self.queue,
                encoder,
                color: view,
                color_format: format,
                depth: None,
                viewport: target.viewport(),
                face: *layer,
            };
            let face_view = &faces[(*layer as usize).min(5)];
            self.drawer.draw_world_material(&mut capture, material, face_view)?;
        }
        Ok(())
    }
}

impl RenderBackend for WgpuBackend {
    fn create_texture(&mut self, desc: &TextureDesc, data: Option<&[u8]>) -> Result<TextureHandle> {
        self.check_limits(desc)?;

        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
        if desc.is_depth() || desc.mip_levels > 1 || data.is_none() {
            usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: desc.layers,
            },
            mip_level_count: desc.mip_levels.max(1),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage,
            view_formats: &[],
        });

        if let Some(data) = data {
            let block_size = desc.format.block_copy_size(None).unwrap_or(4);
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                data,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(desc.width * block_size),
                    rows_per_image: Some(desc.height),
                },
                wgpu::Extent3d {
                    width: desc.width,
                    height: desc.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        Ok(self.textures.insert(GpuTexture {
            texture,
            desc: desc.clone(),
        }))
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if let Some(tex) = self.textures.remove(texture) {
            tex.texture.destroy();
        }
    }

    fn generate_mipmaps(&mut self, texture: TextureHandle) {
        let Some(tex) = self.textures.get(texture) else {
            log::warn!("generate_mipmaps on unknown texture {texture:?}");
            return;
        };
        let encoder = encoder_slot(&mut self.encoder, &self.device);
        self.mipmaps.generate(&self.device, encoder, &tex.texture);
    }

    fn clear(&mut self, target: &Framebuffer, color: [f32; 4], depth: Option<f32>) {
        let color_view = target
            .color()
            .and_then(|a| self.attachment_views(a).ok())
            .and_then(|mut v| v.pop())
            .map(|(_, v)| v);
        let depth_view = target
            .depth()
            .and_then(|a| self.attachment_views(a).ok())
            .and_then(|mut v| v.pop())
            .map(|(_, v)| v);

        let encoder = encoder_slot(&mut self.encoder, &self.device);
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(target.label),
            color_attachments: &[color_view.as_ref().map(|view| wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: f64::from(color[0]),
                        g: f64::from(color[1]),
                        b: f64::from(color[2]),
                        a: f64::from(color[3]),
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: depth_view.as_ref().map(|view| wgpu::RenderPassDepthStencilAttachment {
                view,
                depth_ops: Some(wgpu::Operations {
                    load: depth.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
    }

    fn draw_scene(&mut self, target: &Framebuffer, pass: ScenePass, view: &ViewMatrices, shading: &ShadingInputs) {
        let Some(color) = target.color() else {
            log::warn!("draw_scene({pass:?}) without colour attachment");
            return;
        };
        let (Ok(format), Ok(mut views)) = (self.attachment_format(color), self.attachment_views(color)) else {
            return;
        };
        let Some((face, color_view)) = views.pop() else {
            return;
        };
        let depth_view = target
            .depth()
            .and_then(|a| self.attachment_views(a).ok())
            .and_then(|mut v| v.pop())
            .map(|(_, v)| v);

        let encoder = encoder_slot(&mut self.encoder, &self.device);
        let mut capture = CaptureTarget {
            device: &self.device,
            queue: &self.queue,
            encoder,
            color: &color_view,
            color_format: format,
            depth: depth_view.as_ref(),
            viewport: target.viewport(),
            face,
        };
        self.drawer.draw_pass(&mut capture, pass, view, shading);
    }

    fn draw_fullscreen(&mut self, target: &Framebuffer, draw: &FullscreenDraw) -> Result<()> {
        let kind = match draw.variant {
            ShaderVariant::WorldMaterial(material) => return self.draw_world_material(target, material),
            ShaderVariant::WorldDefault => FilterKind::World,
            ShaderVariant::GlossyFilter => FilterKind::Glossy,
            ShaderVariant::DiffuseFilter(_) => FilterKind::Diffuse,
        };

        let color = target
            .color()
            .ok_or(ProbeError::ResourceUnavailable("framebuffer colour attachment"))?;
        let format = self.attachment_format(color)?;
        let views = self.attachment_views(color)?;

        let source = match draw.source {
            Some(handle) => self
                .sampled_view(handle)
                .ok_or(ProbeError::ResourceUnavailable("filter source"))?,
            None => cube_view(&self.dummy_cube),
        };
        let samples = match draw.samples {
            Some(handle) => self
                .sampled_view(handle)
                .ok_or(ProbeError::ResourceUnavailable("sample table"))?,
            None => self.dummy_2d.create_view(&wgpu::TextureViewDescriptor::default()),
        };

        let pipeline = self.filters.pipeline(&self.device, kind, format);
        let viewport = target.viewport();

        for (layer, view) in &views {
            let uniforms = FilterUniforms {
                layer: if matches!(color.layer, AttachmentLayer::All) { *layer } else { draw.uniforms.layer },
                ..draw.uniforms
            };
            let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Probe Filter Uniforms"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Probe Filter BG"),
                layout: &self.filters.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&source),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&samples),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::Sampler(&self.filters.sampler),
                    },
                ],
            });

            let encoder = encoder_slot(&mut self.encoder, &self.device);
            // Load: the diffuse pass writes one tile of an atlas.
            let mut rpass = begin_color_pass(encoder, "Probe Filter Pass", view, wgpu::LoadOp::Load);
            rpass.set_viewport(
                viewport.x as f32,
                viewport.y as f32,
                viewport.width as f32,
                viewport.height as f32,
                0.0,
                1.0,
            );
            rpass.set_scissor_rect(viewport.x, viewport.y, viewport.width, viewport.height);
            rpass.set_pipeline(&pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.draw(0..3, 0..1);
        }
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn encoder_slot<'a>(slot: &'a mut Option<wgpu::CommandEncoder>, device: &wgpu::Device) -> &'a mut wgpu::CommandEncoder {
    slot.get_or_insert_with(|| {
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Light Probe Encoder"),
        })
    })
}

fn layer_view(texture: &wgpu::Texture, layer: u32, mip: u32, usage: wgpu::TextureUsages) -> wgpu::TextureView {
    texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("Probe Layer View"),
        format: None,
        dimension: Some(wgpu::TextureViewDimension::D2),
        aspect: wgpu::TextureAspect::All,
        base_mip_level: mip,
        mip_level_count: Some(1),
        base_array_layer: layer,
        array_layer_count: Some(1),
        usage: Some(usage),
    })
}

fn cube_view(texture: &wgpu::Texture) -> wgpu::TextureView {
    texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("Probe Cube View"),
        dimension: Some(wgpu::TextureViewDimension::Cube),
        array_layer_count: Some(6),
        ..Default::default()
    })
}

fn begin_color_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
