//! Shared test support: a recording [`RenderBackend`] and scene builders.

#![allow(dead_code)]

use glam::{Mat4, UVec3, Vec3};
use slotmap::SlotMap;

use myth_lightprobes::errors::{ProbeError, Result};
use myth_lightprobes::lightprobes::{LightProbes, ShadingInputs};
use myth_lightprobes::renderer::backend::{
    Attachment, FilterUniforms, Framebuffer, FullscreenDraw, RenderBackend, ScenePass, ShaderVariant, TextureDesc,
    TextureHandle, ViewMatrices, Viewport,
};
use myth_lightprobes::scene::{LightProbe, ProbeObject, ProbeObjectId, ProbeScene};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateTexture {
        handle: TextureHandle,
        desc: TextureDesc,
        has_data: bool,
    },
    DestroyTexture(TextureHandle),
    GenerateMipmaps(TextureHandle),
    Clear {
        color: Option<Attachment>,
        depth: Option<Attachment>,
    },
    DrawScene {
        pass: ScenePass,
        color: Option<Attachment>,
        depth: Option<Attachment>,
        eye: Vec3,
        shading: ShadingInputs,
    },
    DrawFullscreen {
        variant: ShaderVariant,
        color: Option<Attachment>,
        viewport: Viewport,
        uniforms: FilterUniforms,
        source: Option<TextureHandle>,
    },
}

/// Records every call; can be told to fail allocations or world shaders.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub commands: Vec<Command>,
    textures: SlotMap<TextureHandle, TextureDesc>,
    /// Allocation of any texture whose label contains one of these fails.
    pub fail_labels: Vec<&'static str>,
    pub world_shader_available: bool,
    pub fail_fullscreen: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            world_shader_available: true,
            ..Default::default()
        }
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn desc(&self, handle: TextureHandle) -> Option<&TextureDesc> {
        self.textures.get(handle)
    }

    pub fn find_texture(&self, label: &str) -> Vec<(TextureHandle, TextureDesc)> {
        self.textures
            .iter()
            .filter(|(_, d)| d.label == label)
            .map(|(h, d)| (h, d.clone()))
            .collect()
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn scene_draws(&self) -> Vec<&Command> {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::DrawScene { .. }))
            .collect()
    }

    pub fn fullscreen_draws(&self) -> Vec<&Command> {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::DrawFullscreen { .. }))
            .collect()
    }
}

impl RenderBackend for RecordingBackend {
    fn create_texture(&mut self, desc: &TextureDesc, data: Option<&[u8]>) -> Result<TextureHandle> {
        if self.fail_labels.iter().any(|l| desc.label.contains(l)) {
            return Err(ProbeError::ResourceAllocation {
                label: desc.label.to_owned(),
                reason: "out of memory (test)".to_owned(),
            });
        }
        let handle = self.textures.insert(desc.clone());
        self.commands.push(Command::CreateTexture {
            handle,
            desc: desc.clone(),
            has_data: data.is_some(),
        });
        Ok(handle)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(texture);
        self.commands.push(Command::DestroyTexture(texture));
    }

    fn generate_mipmaps(&mut self, texture: TextureHandle) {
        self.commands.push(Command::GenerateMipmaps(texture));
    }

    fn clear(&mut self, target: &Framebuffer, _color: [f32; 4], _depth: Option<f32>) {
        self.commands.push(Command::Clear {
            color: target.color(),
            depth: target.depth(),
        });
    }

    fn draw_scene(&mut self, target: &Framebuffer, pass: ScenePass, view: &ViewMatrices, shading: &ShadingInputs) {
        self.commands.push(Command::DrawScene {
            pass,
            color: target.color(),
            depth: target.depth(),
            eye: view.eye(),
            shading: *shading,
        });
    }

    fn draw_fullscreen(&mut self, target: &Framebuffer, draw: &FullscreenDraw) -> Result<()> {
        if self.fail_fullscreen {
            return Err(ProbeError::ResourceUnavailable("test failure"));
        }
        if matches!(draw.variant, ShaderVariant::WorldMaterial(_)) && !self.world_shader_available {
            return Err(ProbeError::ShaderUnavailable("test world shader".to_owned()));
        }
        self.commands.push(Command::DrawFullscreen {
            variant: draw.variant,
            color: target.color(),
            viewport: target.viewport(),
            uniforms: draw.uniforms,
            source: draw.source,
        });
        Ok(())
    }
}

// ============================================================================
// Scene builders
// ============================================================================

pub fn add_grid(scene: &mut ProbeScene, resolution: UVec3, position: Vec3) -> ProbeObjectId {
    scene.add(ProbeObject::new(
        LightProbe::grid(resolution),
        Mat4::from_translation(position),
    ))
}

pub fn add_cube(scene: &mut ProbeScene, position: Vec3) -> ProbeObjectId {
    scene.add(ProbeObject::new(LightProbe::cube(), Mat4::from_translation(position)))
}

/// Runs sync + refresh until a refresh reports no work, returning the number
/// of frames that did work. Panics after `limit` frames.
pub fn bake_until_idle(
    probes: &mut LightProbes,
    backend: &mut RecordingBackend,
    scene: &mut ProbeScene,
    limit: usize,
) -> usize {
    for frame in 0..limit {
        probes.sync(backend, scene).expect("sync");
        if !probes.refresh(backend, false).expect("refresh") {
            return frame;
        }
    }
    panic!("baking did not converge within {limit} frames");
}

/// Small settings so tests stay fast to reason about.
pub fn small_settings() -> myth_lightprobes::renderer::settings::LightProbeSettings {
    myth_lightprobes::renderer::settings::LightProbeSettings {
        capture_size: 64,
        atlas_size: 128,
        irradiance_pool_size: 64,
        max_cube_probes: 8,
        max_grids: 4,
        ..Default::default()
    }
}

pub fn initialized(backend: &mut RecordingBackend) -> LightProbes {
    let mut probes = LightProbes::new(small_settings()).expect("valid settings");
    probes.init(backend).expect("init");
    probes
}
