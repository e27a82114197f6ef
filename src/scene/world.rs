//! World Probe
//!
//! Describes the environment captured into probe slot 0 of both probe kinds.

use glam::Vec3;

/// Host-side identifier of a world material (node-based background shader).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldMaterialId(pub u64);

/// Flat colour used when the world material shader is unavailable.
pub const WORLD_ERROR_COLOR: Vec3 = Vec3::new(1.0, 0.0, 1.0);

/// The implicit environment probe.
///
/// Every mutation bumps the version; the registry compares versions to
/// decide whether all baked lighting must be invalidated.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldProbe {
    horizon_color: Vec3,
    material: Option<WorldMaterialId>,
    version: u64,
}

impl Default for WorldProbe {
    fn default() -> Self {
        Self::new(Vec3::splat(0.05))
    }
}

impl WorldProbe {
    #[must_use]
    pub fn new(horizon_color: Vec3) -> Self {
        Self {
            horizon_color,
            material: None,
            version: 0,
        }
    }

    #[must_use]
    pub fn horizon_color(&self) -> Vec3 {
        self.horizon_color
    }

    pub fn set_horizon_color(&mut self, color: Vec3) {
        if self.horizon_color != color {
            self.horizon_color = color;
            self.mark_changed();
        }
    }

    #[must_use]
    pub fn material(&self) -> Option<WorldMaterialId> {
        self.material
    }

    pub fn set_material(&mut self, material: Option<WorldMaterialId>) {
        if self.material != material {
            self.material = material;
            self.mark_changed();
        }
    }

    /// Forces a re-bake of everything (e.g. the world shader was edited).
    pub fn mark_changed(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }
}
