//! Capture Renderer
//!
//! Renders radiance into the capture cube: either the whole scene seen from
//! a probe position (six faces, one view each) or the world background alone
//! (one layered full-screen pass).

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3};

use super::ShadingInputs;
use crate::errors::{ProbeError, Result};
use crate::renderer::backend::{
    Attachment, FilterUniforms, FullscreenDraw, RenderBackend, ScenePass, ShaderVariant, ViewMatrices, Viewport,
};
use crate::resources::ProbeResourcePool;
use crate::scene::{WORLD_ERROR_COLOR, WorldProbe};

/// Clear colour of every captured face.
pub const CAPTURE_CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

/// Look direction and up vector of each cube face, in layer order
/// (+X, -X, +Y, -Y, +Z, -Z).
pub const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Y),
    (Vec3::NEG_X, Vec3::NEG_Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::NEG_Z),
    (Vec3::Z, Vec3::NEG_Y),
    (Vec3::NEG_Z, Vec3::NEG_Y),
];

/// The six 90° views of a cube capture centred at `position`.
#[must_use]
pub fn cube_face_views(position: Vec3, near: f32, far: f32) -> [ViewMatrices; 6] {
    let projection = Mat4::perspective_rh(FRAC_PI_2, 1.0, near, far);
    CUBE_FACES.map(|(dir, up)| ViewMatrices::new(Mat4::look_to_rh(position, dir, up), projection))
}

// ============================================================================
// Shading override guard
// ============================================================================

/// Temporarily overrides shading inputs; the saved state is restored when
/// the guard drops, whichever way the scope is left.
pub struct ShadingOverride<'a> {
    target: &'a mut ShadingInputs,
    saved: ShadingInputs,
}

impl<'a> ShadingOverride<'a> {
    pub fn new(target: &'a mut ShadingInputs, apply: impl FnOnce(&mut ShadingInputs)) -> Self {
        let saved = *target;
        apply(target);
        Self { target, saved }
    }

    /// Disables specular shading to avoid feedback from not yet filtered probes.
    pub fn without_specular(target: &'a mut ShadingInputs) -> Self {
        Self::new(target, |s| s.specular_enabled = false)
    }
}

impl std::ops::Deref for ShadingOverride<'_> {
    type Target = ShadingInputs;

    fn deref(&self) -> &Self::Target {
        self.target
    }
}

impl std::ops::DerefMut for ShadingOverride<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.target
    }
}

impl Drop for ShadingOverride<'_> {
    fn drop(&mut self) {
        *self.target = self.saved;
    }
}

// ============================================================================
// CaptureRenderer
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct CaptureRenderer {
    capture_size: u32,
}

impl CaptureRenderer {
    #[must_use]
    pub fn new(capture_size: u32) -> Self {
        Self { capture_size }
    }

    /// Renders the scene into all six faces of the capture cube.
    ///
    /// Specular shading is off for the duration of the call. The capture
    /// framebuffer is left on face 0.
    pub fn render_scene_to_probe(
        &self,
        backend: &mut dyn RenderBackend,
        pool: &mut ProbeResourcePool,
        shading: &mut ShadingInputs,
        position: Vec3,
        near: f32,
        far: f32,
    ) -> Result<()> {
        let targets = pool.capture()?;
        let shading = ShadingOverride::without_specular(shading);
        let fb = &mut pool.capture_fb;

        fb.detach_color();
        fb.detach_depth();

        for (face, view) in cube_face_views(position, near, far).iter().enumerate() {
            let face = face as u32;
            fb.attach_color(Attachment::layer(targets.color, face, 0));
            fb.attach_depth(Attachment::layer(targets.depth, face, 0));
            fb.set_viewport(Viewport::square(self.capture_size));

            backend.clear(fb, CAPTURE_CLEAR_COLOR, Some(1.0));
            for pass in ScenePass::CAPTURE_SEQUENCE {
                backend.draw_scene(fb, pass, view, &shading);
            }

            fb.detach_color();
            fb.detach_depth();
        }

        fb.attach_color(Attachment::layer(targets.color, 0, 0));
        fb.attach_depth(Attachment::layer(targets.depth, 0, 0));
        log::trace!("Captured scene at {position} (near {near}, far {far})");
        Ok(())
    }

    /// Renders the world background into every face of the capture cube.
    ///
    /// A world material that cannot be drawn falls back to the flat default
    /// shader in [`WORLD_ERROR_COLOR`].
    pub fn render_world_to_probe(
        &self,
        backend: &mut dyn RenderBackend,
        pool: &mut ProbeResourcePool,
        world: &WorldProbe,
    ) -> Result<()> {
        let targets = pool.capture()?;
        let fb = &mut pool.capture_fb;

        fb.detach_color();
        fb.detach_depth();
        fb.attach_color(Attachment::layered(targets.color));
        fb.set_viewport(Viewport::square(self.capture_size));

        let result = match world.material() {
            Some(material) => {
                let draw = FullscreenDraw {
                    variant: ShaderVariant::WorldMaterial(material),
                    uniforms: FilterUniforms::default(),
                    source: None,
                    samples: None,
                };
                match backend.draw_fullscreen(fb, &draw) {
                    Err(ProbeError::ShaderUnavailable(reason)) => {
                        log::warn!("World shader unavailable ({reason}), using error colour");
                        backend.draw_fullscreen(fb, &world_default_draw(WORLD_ERROR_COLOR))
                    }
                    other => other,
                }
            }
            None => backend.draw_fullscreen(fb, &world_default_draw(world.horizon_color())),
        };

        fb.detach_color();
        fb.attach_color(Attachment::layer(targets.color, 0, 0));
        fb.attach_depth(Attachment::layer(targets.depth, 0, 0));
        result
    }
}

fn world_default_draw(color: Vec3) -> FullscreenDraw {
    FullscreenDraw {
        variant: ShaderVariant::WorldDefault,
        uniforms: FilterUniforms {
            color: color.to_array(),
            ..Default::default()
        },
        source: None,
        samples: None,
    }
}
