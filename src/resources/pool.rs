//! Probe Resource Pool
//!
//! Owns every GPU texture the probe pipeline writes:
//!
//! | Resource            | Shape                              | Lifetime                     |
//! |---------------------|------------------------------------|------------------------------|
//! | Capture colour      | cube, `capture_size`², full mips   | created once                 |
//! | Capture depth       | cube, `capture_size`²              | created once                 |
//! | Reflection atlas    | 2D array, one layer per cube probe | recreated on layer change    |
//! | Irradiance atlases  | 2 × 2D, `irradiance_pool_size`²    | created once (ping/pong)     |
//!
//! Recreating an atlas discards its contents, so [`ProbeResourcePool::ensure`]
//! reports what changed and the caller invalidates the bake state.

use super::ping_pong::PingPong;
use crate::errors::{ProbeError, Result};
use crate::renderer::backend::{Attachment, Framebuffer, RenderBackend, TextureDesc, TextureHandle, Viewport};
use crate::renderer::settings::LightProbeSettings;

pub const CAPTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const CAPTURE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;
pub const REFLECTION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Signed float so spherical-harmonic coefficients survive.
pub const IRRADIANCE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTargets {
    pub color: TextureHandle,
    pub depth: TextureHandle,
}

/// What [`ProbeResourcePool::ensure`] had to (re)allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolChanges {
    pub reflection_atlas: bool,
    pub irradiance_atlas: bool,
}

impl PoolChanges {
    #[inline]
    #[must_use]
    pub fn any(&self) -> bool {
        self.reflection_atlas || self.irradiance_atlas
    }
}

#[derive(Debug)]
pub struct ProbeResourcePool {
    capture: Option<CaptureTargets>,
    reflection_atlas: Option<TextureHandle>,
    atlas_layers: u32,
    irradiance: Option<PingPong<TextureHandle>>,
    /// Bound to one face of the capture targets.
    pub capture_fb: Framebuffer,
    /// Bound to the reflection atlas (layer 0, mip 0) between filter passes.
    pub filter_fb: Framebuffer,
}

impl Default for ProbeResourcePool {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeResourcePool {
    #[must_use]
    pub fn new() -> Self {
        Self {
            capture: None,
            reflection_atlas: None,
            atlas_layers: 0,
            irradiance: None,
            capture_fb: Framebuffer::new("Probe Capture FB"),
            filter_fb: Framebuffer::new("Probe Filter FB"),
        }
    }

    /// Creates the capture cube and its depth target if missing.
    pub fn ensure_capture(&mut self, backend: &mut dyn RenderBackend, settings: &LightProbeSettings) -> Result<()> {
        if self.capture.is_some() {
            return Ok(());
        }

        let color = backend.create_texture(
            &TextureDesc::cube(
                "Probe Capture Cube",
                settings.capture_size,
                settings.capture_mip_count(),
                CAPTURE_FORMAT,
            ),
            None,
        )?;
        let depth = match backend.create_texture(
            &TextureDesc::cube("Probe Capture Depth", settings.capture_size, 1, CAPTURE_DEPTH_FORMAT),
            None,
        ) {
            Ok(depth) => depth,
            Err(err) => {
                backend.destroy_texture(color);
                return Err(err);
            }
        };

        self.capture_fb.attach_color(Attachment::layer(color, 0, 0));
        self.capture_fb.attach_depth(Attachment::layer(depth, 0, 0));
        self.capture_fb.set_viewport(Viewport::square(settings.capture_size));
        self.capture = Some(CaptureTargets { color, depth });

        log::info!("Probe capture targets created ({0}x{0})", settings.capture_size);
        Ok(())
    }

    /// Makes sure every target exists and the reflection atlas has exactly
    /// `cube_count` layers.
    pub fn ensure(
        &mut self,
        backend: &mut dyn RenderBackend,
        settings: &LightProbeSettings,
        cube_count: usize,
    ) -> Result<PoolChanges> {
        self.ensure_capture(backend, settings)?;

        let mut changes = PoolChanges::default();
        let layers = cube_count.max(1) as u32;

        if self.reflection_atlas.is_none() || self.atlas_layers != layers {
            if let Some(old) = self.reflection_atlas.take() {
                backend.destroy_texture(old);
            }
            self.filter_fb.detach_color();
            self.atlas_layers = 0;

            let atlas = backend.create_texture(
                &TextureDesc::array_2d(
                    "Probe Reflection Atlas",
                    settings.atlas_size,
                    layers,
                    settings.atlas_mip_count(),
                    REFLECTION_FORMAT,
                ),
                None,
            )?;

            self.filter_fb.attach_color(Attachment::layer(atlas, 0, 0));
            self.filter_fb.set_viewport(Viewport::square(settings.atlas_size));
            self.reflection_atlas = Some(atlas);
            self.atlas_layers = layers;
            changes.reflection_atlas = true;

            log::info!("Probe reflection atlas (re)allocated with {layers} layer(s)");
        }

        if self.irradiance.is_none() {
            let desc = TextureDesc::plain_2d(
                "Probe Irradiance Atlas",
                settings.irradiance_pool_size,
                settings.irradiance_pool_size,
                IRRADIANCE_FORMAT,
            );
            let first = backend.create_texture(&desc, None)?;
            let second = match backend.create_texture(&desc, None) {
                Ok(tex) => tex,
                Err(err) => {
                    backend.destroy_texture(first);
                    return Err(err);
                }
            };
            self.irradiance = Some(PingPong::new(first, second));
            changes.irradiance_atlas = true;

            log::info!("Probe irradiance atlases allocated ({0}x{0})", settings.irradiance_pool_size);
        }

        Ok(changes)
    }

    /// Frees every texture; the pool can be re-filled by `ensure`.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(capture) = self.capture.take() {
            backend.destroy_texture(capture.color);
            backend.destroy_texture(capture.depth);
        }
        if let Some(atlas) = self.reflection_atlas.take() {
            backend.destroy_texture(atlas);
        }
        if let Some(irradiance) = self.irradiance.take() {
            for tex in irradiance.into_slots() {
                backend.destroy_texture(tex);
            }
        }
        self.atlas_layers = 0;
        self.capture_fb.reset();
        self.filter_fb.reset();
    }

    pub fn capture(&self) -> Result<CaptureTargets> {
        self.capture.ok_or(ProbeError::ResourceUnavailable("probe capture targets"))
    }

    pub fn reflection_atlas(&self) -> Result<TextureHandle> {
        self.reflection_atlas
            .ok_or(ProbeError::ResourceUnavailable("probe reflection atlas"))
    }

    pub fn irradiance(&self) -> Result<&PingPong<TextureHandle>> {
        self.irradiance
            .as_ref()
            .ok_or(ProbeError::ResourceUnavailable("probe irradiance atlases"))
    }

    pub fn irradiance_mut(&mut self) -> Result<&mut PingPong<TextureHandle>> {
        self.irradiance
            .as_mut()
            .ok_or(ProbeError::ResourceUnavailable("probe irradiance atlases"))
    }

    #[must_use]
    pub fn atlas_layers(&self) -> u32 {
        self.atlas_layers
    }

    /// Whether every target needed by a bake unit exists.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.capture.is_some() && self.reflection_atlas.is_some() && self.irradiance.is_some()
    }
}
