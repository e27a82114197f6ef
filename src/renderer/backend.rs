//! Render Backend Abstraction
//!
//! The light-probe pipeline never talks to the GPU directly. Texture
//! allocation, mip generation, clears, scene submission and the full-screen
//! convolution passes all go through [`RenderBackend`].
//!
//! [`WgpuBackend`](super::wgpu_backend::WgpuBackend) is the production
//! implementation; tests drive the pipeline with a recording backend.
//!
//! # Framebuffers
//!
//! A [`Framebuffer`] is plain CPU-side state: which texture layer/mip is
//! bound as colour and depth, and the active viewport. The pipeline mutates
//! it (attach, detach, resize the viewport) exactly the way a GL-style
//! framebuffer would be driven; the backend resolves it into real
//! attachments for every draw.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use slotmap::new_key_type;

use crate::errors::Result;
use crate::lightprobes::ShadingInputs;
use crate::renderer::settings::IrradianceEncoding;
use crate::scene::WorldMaterialId;

new_key_type! {
    /// Backend-owned texture.
    pub struct TextureHandle;
}

// ============================================================================
// Texture Description
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    D2,
    D2Array,
    Cube,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    pub label: &'static str,
    pub kind: TextureKind,
    pub width: u32,
    pub height: u32,
    /// Array layers (6 for cube maps).
    pub layers: u32,
    pub mip_levels: u32,
    pub format: wgpu::TextureFormat,
}

impl TextureDesc {
    #[must_use]
    pub fn cube(label: &'static str, size: u32, mip_levels: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            label,
            kind: TextureKind::Cube,
            width: size,
            height: size,
            layers: 6,
            mip_levels,
            format,
        }
    }

    #[must_use]
    pub fn array_2d(
        label: &'static str,
        size: u32,
        layers: u32,
        mip_levels: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            label,
            kind: TextureKind::D2Array,
            width: size,
            height: size,
            layers: layers.max(1),
            mip_levels,
            format,
        }
    }

    #[must_use]
    pub fn plain_2d(label: &'static str, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            label,
            kind: TextureKind::D2,
            width,
            height,
            layers: 1,
            mip_levels: 1,
            format,
        }
    }

    #[must_use]
    pub fn is_depth(&self) -> bool {
        self.format.is_depth_stencil_format()
    }
}

// ============================================================================
// Framebuffer State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentLayer {
    Single(u32),
    /// Layered attachment; full-screen draws are replicated on every layer.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub texture: TextureHandle,
    pub layer: AttachmentLayer,
    pub mip: u32,
}

impl Attachment {
    #[must_use]
    pub fn layer(texture: TextureHandle, layer: u32, mip: u32) -> Self {
        Self {
            texture,
            layer: AttachmentLayer::Single(layer),
            mip,
        }
    }

    #[must_use]
    pub fn layered(texture: TextureHandle) -> Self {
        Self {
            texture,
            layer: AttachmentLayer::All,
            mip: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn square(size: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size,
            height: size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Framebuffer {
    pub label: &'static str,
    color: Option<Attachment>,
    depth: Option<Attachment>,
    viewport: Viewport,
}

impl Framebuffer {
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            color: None,
            depth: None,
            viewport: Viewport::default(),
        }
    }

    pub fn attach_color(&mut self, attachment: Attachment) {
        self.color = Some(attachment);
    }

    pub fn detach_color(&mut self) -> Option<Attachment> {
        self.color.take()
    }

    pub fn attach_depth(&mut self, attachment: Attachment) {
        self.depth = Some(attachment);
    }

    pub fn detach_depth(&mut self) -> Option<Attachment> {
        self.depth.take()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    #[must_use]
    pub fn color(&self) -> Option<Attachment> {
        self.color
    }

    #[must_use]
    pub fn depth(&self) -> Option<Attachment> {
        self.depth
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Drops both attachments, e.g. after the textures were destroyed.
    pub fn reset(&mut self) {
        self.color = None;
        self.depth = None;
        self.viewport = Viewport::default();
    }
}

// ============================================================================
// Scene Submission
// ============================================================================

/// Standard scene passes submitted for every captured cube face, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenePass {
    Background,
    DepthPrepass,
    DepthPrepassCull,
    Default,
    DefaultFlat,
    Material,
}

impl ScenePass {
    pub const CAPTURE_SEQUENCE: [ScenePass; 6] = [
        ScenePass::Background,
        ScenePass::DepthPrepass,
        ScenePass::DepthPrepassCull,
        ScenePass::Default,
        ScenePass::DefaultFlat,
        ScenePass::Material,
    ];
}

/// View/projection override used while the scene is rendered into a probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewMatrices {
    pub view: Mat4,
    pub view_inverse: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub view_projection_inverse: Mat4,
}

impl ViewMatrices {
    #[must_use]
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        let view_projection = projection * view;
        Self {
            view,
            view_inverse: view.inverse(),
            projection,
            view_projection,
            view_projection_inverse: view_projection.inverse(),
        }
    }

    /// World-space position of the viewer.
    #[must_use]
    pub fn eye(&self) -> Vec3 {
        self.view_inverse.w_axis.truncate()
    }
}

// ============================================================================
// Full-screen Passes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderVariant {
    /// Flat-colour world background (always available).
    WorldDefault,
    /// Host-provided world material; may be unavailable.
    WorldMaterial(WorldMaterialId),
    GlossyFilter,
    DiffuseFilter(IrradianceEncoding),
}

/// Uniform block shared by all probe full-screen passes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Default)]
pub struct FilterUniforms {
    pub sample_count: f32,
    pub inv_sample_count: f32,
    pub roughness_squared: f32,
    pub lod_factor: f32,

    pub lod_max: f32,
    pub texel_size: f32,
    pub padding_size: f32,
    pub layer: u32,

    pub color: [f32; 3],
    /// SH L2 integration resolution.
    pub probe_size: u32,

    pub encoding: u32,
    pub _pad: [u32; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct FullscreenDraw {
    pub variant: ShaderVariant,
    pub uniforms: FilterUniforms,
    /// Radiance source (the capture cube).
    pub source: Option<TextureHandle>,
    /// Hammersley sample table.
    pub samples: Option<TextureHandle>,
}

// ============================================================================
// RenderBackend
// ============================================================================

/// Resource-and-draw API consumed by the probe pipeline.
///
/// All calls are recorded in submission order on the calling thread.
pub trait RenderBackend {
    /// Allocates a texture; `data` fills mip 0 of layer 0 when provided.
    fn create_texture(&mut self, desc: &TextureDesc, data: Option<&[u8]>) -> Result<TextureHandle>;

    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Rebuilds mips `1..` of every layer from mip 0.
    fn generate_mipmaps(&mut self, texture: TextureHandle);

    /// Clears the bound attachments (depth only when `depth` is `Some`).
    fn clear(&mut self, target: &Framebuffer, color: [f32; 4], depth: Option<f32>);

    /// Submits one of the host's standard scene passes with overridden matrices.
    fn draw_scene(&mut self, target: &Framebuffer, pass: ScenePass, view: &ViewMatrices, shading: &ShadingInputs);

    /// Draws a full-screen triangle with the given variant into the bound
    /// colour attachment, restricted to the framebuffer viewport.
    fn draw_fullscreen(&mut self, target: &Framebuffer, draw: &FullscreenDraw) -> Result<()>;
}
