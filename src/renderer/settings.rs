//! Light Probe Settings
//!
//! Configuration for the probe baking subsystem. Consumed once by
//! [`LightProbes::new`](crate::lightprobes::LightProbes::new); changing
//! resolutions at runtime requires a new context.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_lightprobes::renderer::settings::{IrradianceEncoding, LightProbeSettings};
//!
//! // Defaults: 512² capture, 1024² atlases, 3 diffuse bounces
//! let settings = LightProbeSettings::default();
//!
//! // Cheaper setup for low-end devices
//! let settings = LightProbeSettings {
//!     capture_size: 128,
//!     atlas_size: 256,
//!     max_bounce: 1,
//!     ..Default::default()
//! };
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{ProbeError, Result};

// ---------------------------------------------------------------------------
// IrradianceEncoding
// ---------------------------------------------------------------------------

/// Storage layout of one irradiance sample in the irradiance atlas.
///
/// The footprint is part of the contract with the shading pass: writer and
/// reader must agree on it exactly.
///
/// | Encoding  | Footprint | Contents                                  |
/// |-----------|-----------|-------------------------------------------|
/// | `ShL2`    | 3 × 3     | 9 spherical-harmonic coefficients (signed) |
/// | `Cubemap` | 8 × 8     | Octahedral irradiance map                  |
/// | `Hl2`     | 3 × 2     | Ambient cube (one texel per axis)          |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IrradianceEncoding {
    ShL2,
    Cubemap,
    #[default]
    Hl2,
}

impl IrradianceEncoding {
    /// Texel footprint `(width, height)` of one cell.
    #[inline]
    #[must_use]
    pub fn footprint(self) -> (u32, u32) {
        match self {
            Self::ShL2 => (3, 3),
            Self::Cubemap => (8, 8),
            Self::Hl2 => (3, 2),
        }
    }

    /// Whether the encoding stores signed values (needs a float format).
    #[inline]
    #[must_use]
    pub fn is_signed(self) -> bool {
        matches!(self, Self::ShL2)
    }

    /// Shader-side discriminant written into filter uniforms.
    #[inline]
    #[must_use]
    pub fn shader_id(self) -> u32 {
        match self {
            Self::ShL2 => 0,
            Self::Cubemap => 1,
            Self::Hl2 => 2,
        }
    }
}

// ---------------------------------------------------------------------------
// LightProbeSettings
// ---------------------------------------------------------------------------

/// Global configuration for probe baking.
///
/// | Field                  | Description                               | Default |
/// |------------------------|-------------------------------------------|---------|
/// | `capture_size`         | Cube capture face resolution              | 512     |
/// | `atlas_size`           | Reflection atlas layer resolution         | 1024    |
/// | `irradiance_pool_size` | Irradiance atlas resolution               | 1024    |
/// | `max_cube_probes`      | Cube probe capacity (world included)      | 32      |
/// | `max_grids`            | Grid capacity (world included)            | 64      |
/// | `max_bounce`           | Diffuse bounces baked into grids          | 3       |
/// | `min_lod_level`        | Smallest glossy mips left unfiltered      | 3       |
/// | `irradiance_encoding`  | Irradiance sample layout                  | `Hl2`   |
/// | `hammersley_size`      | Importance-sample table length            | 1024    |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightProbeSettings {
    pub capture_size: u32,
    pub atlas_size: u32,
    pub irradiance_pool_size: u32,
    pub max_cube_probes: usize,
    pub max_grids: usize,
    pub max_bounce: u32,
    pub min_lod_level: u32,
    pub irradiance_encoding: IrradianceEncoding,
    pub hammersley_size: u32,
}

impl Default for LightProbeSettings {
    fn default() -> Self {
        Self {
            capture_size: 512,
            atlas_size: 1024,
            irradiance_pool_size: 1024,
            max_cube_probes: 32,
            max_grids: 64,
            max_bounce: 3,
            min_lod_level: 3,
            irradiance_encoding: IrradianceEncoding::default(),
            hammersley_size: 1024,
        }
    }
}

impl LightProbeSettings {
    /// Checks the invariants the filter and scheduler rely on.
    pub fn validate(&self) -> Result<()> {
        if !self.capture_size.is_power_of_two() || self.capture_size < 8 {
            return Err(ProbeError::InvalidSettings(format!(
                "capture_size must be a power of two >= 8, got {}",
                self.capture_size
            )));
        }
        if !self.atlas_size.is_power_of_two() {
            return Err(ProbeError::InvalidSettings(format!(
                "atlas_size must be a power of two, got {}",
                self.atlas_size
            )));
        }
        // The roughness curve divides by (max_level - 4) and at least one
        // glossy level must be produced.
        let max_level = self.atlas_size.ilog2();
        if max_level <= 4 || max_level <= self.min_lod_level {
            return Err(ProbeError::InvalidSettings(format!(
                "atlas_size {} too small for min_lod_level {}",
                self.atlas_size, self.min_lod_level
            )));
        }
        let (w, h) = self.irradiance_encoding.footprint();
        if self.irradiance_pool_size < w.max(h) {
            return Err(ProbeError::InvalidSettings(format!(
                "irradiance_pool_size {} smaller than one cell",
                self.irradiance_pool_size
            )));
        }
        if self.max_cube_probes < 1 || self.max_grids < 1 {
            return Err(ProbeError::InvalidSettings(
                "probe capacities must reserve the world slot".into(),
            ));
        }
        if self.max_bounce == 0 {
            return Err(ProbeError::InvalidSettings("max_bounce must be at least 1".into()));
        }
        if self.hammersley_size == 0 {
            return Err(ProbeError::InvalidSettings("hammersley_size must be non-zero".into()));
        }
        Ok(())
    }

    /// `floor(log2(atlas_size))`.
    #[inline]
    #[must_use]
    pub fn atlas_max_level(&self) -> u32 {
        self.atlas_size.ilog2()
    }

    /// Mip levels allocated for the reflection atlas.
    #[inline]
    #[must_use]
    pub fn atlas_mip_count(&self) -> u32 {
        self.atlas_max_level() + 1
    }

    /// Mip levels allocated for the capture cube.
    #[inline]
    #[must_use]
    pub fn capture_mip_count(&self) -> u32 {
        self.capture_size.ilog2() + 1
    }

    /// Number of irradiance cells the atlas can hold (world cell included).
    #[inline]
    #[must_use]
    pub fn irradiance_cell_capacity(&self) -> u32 {
        let (w, h) = self.irradiance_encoding.footprint();
        (self.irradiance_pool_size / w) * (self.irradiance_pool_size / h)
    }
}
