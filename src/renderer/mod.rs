//! GPU-facing side of the probe pipeline: the backend abstraction, its wgpu
//! implementation and the global settings.

pub mod backend;
pub mod settings;
pub mod wgpu_backend;

pub use backend::{
    Attachment, AttachmentLayer, FilterUniforms, Framebuffer, FullscreenDraw, RenderBackend, ScenePass,
    ShaderVariant, TextureDesc, TextureHandle, TextureKind, ViewMatrices, Viewport,
};
pub use settings::{IrradianceEncoding, LightProbeSettings};
pub use wgpu_backend::{CaptureTarget, SceneDrawer, WgpuBackend};
