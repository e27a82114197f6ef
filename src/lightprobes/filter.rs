//! Convolution Filter
//!
//! Turns a captured radiance cube into the data the shading pass samples:
//!
//! - **Glossy**: filtered importance sampling into the reflection atlas, one
//!   roughness per mip level (GGX lobe widening with the level).
//! - **Diffuse**: cosine convolution into one footprint of the pending
//!   irradiance atlas.
//!
//! Both passes sample the capture cube through its mip chain, so the chain is
//! regenerated first. The filter framebuffer is always left bound to the
//! reflection atlas at (layer 0, mip 0) when a pass returns, on error too.

use std::f32::consts::TAU;

use half::f16;

use super::grid::irradiance_tile;
use crate::errors::Result;
use crate::renderer::backend::{
    Attachment, Framebuffer, FilterUniforms, FullscreenDraw, RenderBackend, ShaderVariant, TextureDesc,
    TextureHandle, Viewport,
};
use crate::renderer::settings::{IrradianceEncoding, LightProbeSettings};
use crate::resources::ProbeResourcePool;

/// Sample budget of the diffuse convolution.
pub const DIFFUSE_SAMPLE_COUNT: u32 = 1024;
/// Integration resolution used by the SH L2 projection.
pub const SH_PROBE_SIZE: u32 = 32;
/// Source LOD the SH L2 projection reads.
pub const SH_LOD_MAX: f32 = 2.0;

// ============================================================================
// Glossy level parameters
// ============================================================================

/// Parameters of one glossy mip level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlossyLevel {
    pub level: u32,
    /// Target mip size in texels.
    pub size: u32,
    /// GGX `a²`, remapped so roughness is spread evenly across mips.
    pub roughness: f32,
    pub samples: u32,
    pub lod_factor: f32,
    pub lod_max: f32,
    pub texel_size: f32,
    pub padding: f32,
}

impl GlossyLevel {
    #[must_use]
    pub fn uniforms(&self, layer: u32) -> FilterUniforms {
        FilterUniforms {
            sample_count: self.samples as f32,
            inv_sample_count: 1.0 / self.samples as f32,
            roughness_squared: self.roughness,
            lod_factor: self.lod_factor,
            lod_max: self.lod_max,
            texel_size: self.texel_size,
            padding_size: self.padding,
            layer,
            ..Default::default()
        }
    }
}

/// `clamp(((level / (max_level - 4))²)², 1e-8, 0.99999)`.
#[must_use]
pub fn roughness_for_level(level: u32, max_level: u32) -> f32 {
    let r = level as f32 / (max_level as f32 - 4.0);
    let r = r * r;
    (r * r).clamp(1e-8, 0.99999)
}

/// Importance samples per glossy level; the sharp levels need few.
#[must_use]
pub fn sample_count_for_level(level: u32) -> u32 {
    match level {
        0 => 1,
        1 => 16,
        2 => 32,
        3 => 64,
        _ => 128,
    }
}

/// Octahedral border padding for a level, with the empirical correction
/// that fixes visible seams at the larger levels.
///
/// NOTE: the correction table has no derivation; it matches what the
/// octahedral sampling needs in practice and should be revisited together
/// with the padding math in the glossy shader.
#[must_use]
pub fn padding_correction(base: f32) -> f32 {
    let mut padding = base;
    if padding > 32.0 {
        padding += 5.0;
    }
    if padding > 16.0 {
        padding += 4.0;
    } else if padding > 8.0 {
        padding += 2.0;
    } else if padding > 4.0 {
        padding += 1.0;
    }
    padding
}

/// `0.5 * log2(capture_texels / samples) + bias`: the capture LOD whose texel
/// density matches one sample's solid angle.
#[must_use]
pub fn lod_factor(capture_size: u32, samples: u32, bias: f32) -> f32 {
    let texels = (capture_size as f32) * (capture_size as f32);
    bias + 0.5 * (texels / samples as f32).log2()
}

/// Highest capture LOD the filters may read.
#[inline]
#[must_use]
pub fn capture_lod_max(capture_size: u32) -> f32 {
    capture_size.ilog2() as f32 - 2.0
}

/// Number of glossy levels written per atlas layer.
#[inline]
#[must_use]
pub fn glossy_level_count(settings: &LightProbeSettings) -> u32 {
    settings.atlas_max_level().saturating_sub(settings.min_lod_level)
}

/// Maximum reflection LOD the shading pass may sample.
#[inline]
#[must_use]
pub fn shading_lod_max(settings: &LightProbeSettings) -> f32 {
    glossy_level_count(settings) as f32 - 1.0
}

/// Full parameter list of the glossy chain for `settings`.
#[must_use]
pub fn glossy_levels(settings: &LightProbeSettings) -> Vec<GlossyLevel> {
    let max_level = settings.atlas_max_level();
    let count = glossy_level_count(settings);
    let lod_max = capture_lod_max(settings.capture_size);

    (0..count)
        .map(|i| {
            let size = (settings.atlas_size >> i).max(1);
            let samples = sample_count_for_level(i);
            let bias = if i == 0 { 0.0 } else { 1.0 };
            let base_padding = (1u32 << (max_level - settings.min_lod_level - 1 - i)) as f32;
            GlossyLevel {
                level: i,
                size,
                roughness: roughness_for_level(i, max_level),
                samples,
                lod_factor: lod_factor(settings.capture_size, samples, bias),
                lod_max,
                texel_size: 1.0 / size as f32,
                padding: padding_correction(base_padding),
            }
        })
        .collect()
}

/// Uniforms of the diffuse convolution for the given encoding.
#[must_use]
pub fn diffuse_uniforms(encoding: IrradianceEncoding, capture_size: u32) -> FilterUniforms {
    let samples = DIFFUSE_SAMPLE_COUNT as f32;
    let (lod_factor, lod_max, probe_size) = match encoding {
        IrradianceEncoding::ShL2 => (0.0, SH_LOD_MAX, SH_PROBE_SIZE),
        IrradianceEncoding::Cubemap | IrradianceEncoding::Hl2 => (
            lod_factor(capture_size, DIFFUSE_SAMPLE_COUNT, 0.0),
            capture_lod_max(capture_size),
            0,
        ),
    };
    FilterUniforms {
        sample_count: samples,
        inv_sample_count: 1.0 / samples,
        lod_factor,
        lod_max,
        probe_size,
        encoding: encoding.shader_id(),
        ..Default::default()
    }
}

// ============================================================================
// Hammersley sequence
// ============================================================================

/// Van der Corput radical inverse in base 2.
#[inline]
#[must_use]
pub fn radical_inverse(i: u32) -> f32 {
    (f64::from(i.reverse_bits()) * 2.328_306_436_538_696_3e-10) as f32
}

/// `(cos φ, sin φ)` with `φ = 2π · radical_inverse(i)` for `i in 0..count`.
#[must_use]
pub fn hammersley_table(count: u32) -> Vec<[f32; 2]> {
    (0..count)
        .map(|i| {
            let phi = radical_inverse(i) * TAU;
            [phi.cos(), phi.sin()]
        })
        .collect()
}

fn hammersley_bytes(table: &[[f32; 2]]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(table.len() * 4);
    for [x, y] in table {
        bytes.extend_from_slice(&f16::from_f32(*x).to_le_bytes());
        bytes.extend_from_slice(&f16::from_f32(*y).to_le_bytes());
    }
    bytes
}

// ============================================================================
// ConvolutionFilter
// ============================================================================

#[derive(Debug)]
pub struct ConvolutionFilter {
    levels: Vec<GlossyLevel>,
    encoding: IrradianceEncoding,
    capture_size: u32,
    atlas_size: u32,
    pool_size: u32,
    hammersley_size: u32,
    hammersley: Option<TextureHandle>,
    lod_max: f32,
}

impl ConvolutionFilter {
    #[must_use]
    pub fn new(settings: &LightProbeSettings) -> Self {
        Self {
            levels: glossy_levels(settings),
            encoding: settings.irradiance_encoding,
            capture_size: settings.capture_size,
            atlas_size: settings.atlas_size,
            pool_size: settings.irradiance_pool_size,
            hammersley_size: settings.hammersley_size,
            hammersley: None,
            lod_max: 0.0,
        }
    }

    /// Uploads the Hammersley table.
    pub fn init(&mut self, backend: &mut dyn RenderBackend) -> Result<()> {
        if self.hammersley.is_some() {
            return Ok(());
        }
        let bytes = hammersley_bytes(&hammersley_table(self.hammersley_size));
        let texture = backend.create_texture(
            &TextureDesc::plain_2d(
                "Hammersley Samples",
                self.hammersley_size,
                1,
                wgpu::TextureFormat::Rg16Float,
            ),
            Some(&bytes),
        )?;
        self.hammersley = Some(texture);
        log::debug!("Hammersley table uploaded ({} samples)", self.hammersley_size);
        Ok(())
    }

    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(texture) = self.hammersley.take() {
            backend.destroy_texture(texture);
        }
    }

    #[must_use]
    pub fn hammersley(&self) -> Option<TextureHandle> {
        self.hammersley
    }

    #[must_use]
    pub fn levels(&self) -> &[GlossyLevel] {
        &self.levels
    }

    /// Reflection LOD range the shading pass may sample; set by the first
    /// glossy filter.
    #[must_use]
    pub fn lod_max(&self) -> f32 {
        self.lod_max
    }

    #[must_use]
    pub fn encoding(&self) -> IrradianceEncoding {
        self.encoding
    }

    /// Prefilters the capture cube into every glossy mip of atlas `layer`.
    pub fn glossy_filter(
        &mut self,
        backend: &mut dyn RenderBackend,
        pool: &mut ProbeResourcePool,
        layer: u32,
    ) -> Result<()> {
        let source = pool.capture()?.color;
        let atlas = pool.reflection_atlas()?;

        backend.generate_mipmaps(source);

        pool.filter_fb.detach_color();
        let result = self.draw_glossy_levels(backend, &mut pool.filter_fb, source, atlas, layer);

        self.lod_max = (self.levels.len() as f32) - 1.0;
        self.rebind_atlas(&mut pool.filter_fb, atlas);
        result
    }

    fn draw_glossy_levels(
        &self,
        backend: &mut dyn RenderBackend,
        fb: &mut Framebuffer,
        source: TextureHandle,
        atlas: TextureHandle,
        layer: u32,
    ) -> Result<()> {
        for level in &self.levels {
            fb.attach_color(Attachment::layer(atlas, layer, level.level));
            fb.set_viewport(Viewport::square(level.size));
            let draw = FullscreenDraw {
                variant: ShaderVariant::GlossyFilter,
                uniforms: level.uniforms(layer),
                source: Some(source),
                samples: self.hammersley,
            };
            let result = backend.draw_fullscreen(fb, &draw);
            fb.detach_color();
            result?;
        }
        Ok(())
    }

    /// Convolves the capture cube into cell `offset` of the pending
    /// irradiance atlas.
    pub fn diffuse_filter(
        &self,
        backend: &mut dyn RenderBackend,
        pool: &mut ProbeResourcePool,
        offset: u32,
    ) -> Result<()> {
        let source = pool.capture()?.color;
        let atlas = pool.reflection_atlas()?;
        let target = *pool.irradiance()?.pending();
        let tile = irradiance_tile(offset, self.encoding, self.pool_size)?;

        backend.generate_mipmaps(source);

        let fb = &mut pool.filter_fb;
        fb.detach_color();
        fb.attach_color(Attachment::layer(target, 0, 0));
        fb.set_viewport(tile);

        let draw = FullscreenDraw {
            variant: ShaderVariant::DiffuseFilter(self.encoding),
            uniforms: diffuse_uniforms(self.encoding, self.capture_size),
            source: Some(source),
            samples: self.hammersley,
        };
        let result = backend.draw_fullscreen(fb, &draw);

        fb.detach_color();
        self.rebind_atlas(fb, atlas);
        result
    }

    fn rebind_atlas(&self, fb: &mut Framebuffer, atlas: TextureHandle) {
        fb.attach_color(Attachment::layer(atlas, 0, 0));
        fb.set_viewport(Viewport::square(self.atlas_size));
    }
}
