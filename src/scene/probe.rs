//! Light probe objects as seen by the baking subsystem.

use bitflags::bitflags;
use glam::{Mat4, UVec3};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ProbeFlags: u32 {
        /// Use `parallax_shape` / `parallax_distance` instead of the influence volume.
        const CUSTOM_PARALLAX = 1 << 0;
        /// Emit debug display instances for this probe.
        const SHOW_DATA       = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// Reflection probe.
    Cube,
    /// Irradiance volume.
    Grid,
}

/// Influence / parallax volume shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProbeShape {
    #[default]
    Sphere,
    Box,
}

impl ProbeShape {
    /// Value written into the GPU tables.
    #[inline]
    #[must_use]
    pub fn shader_id(self) -> f32 {
        match self {
            Self::Sphere => 0.0,
            Self::Box => 1.0,
        }
    }
}

/// Authoring parameters of a probe.
#[derive(Debug, Clone, PartialEq)]
pub struct LightProbe {
    pub kind: ProbeKind,
    pub attenuation_shape: ProbeShape,
    pub parallax_shape: ProbeShape,
    /// Fraction of the influence volume used to fade out (0..1).
    pub falloff: f32,
    /// Influence radius (sphere) or half extent (box), in object space.
    pub influence_distance: f32,
    pub parallax_distance: f32,
    /// Cells per axis; ignored for cube probes.
    pub grid_resolution: UVec3,
    pub clip_start: f32,
    pub clip_end: f32,
    pub flags: ProbeFlags,
    /// Debug sphere radius.
    pub display_size: f32,
}

impl LightProbe {
    #[must_use]
    pub fn cube() -> Self {
        Self {
            kind: ProbeKind::Cube,
            attenuation_shape: ProbeShape::Sphere,
            parallax_shape: ProbeShape::Sphere,
            falloff: 0.2,
            influence_distance: 2.5,
            parallax_distance: 2.5,
            grid_resolution: UVec3::ONE,
            clip_start: 0.8,
            clip_end: 40.0,
            flags: ProbeFlags::empty(),
            display_size: 1.0,
        }
    }

    #[must_use]
    pub fn grid(resolution: UVec3) -> Self {
        Self {
            kind: ProbeKind::Grid,
            attenuation_shape: ProbeShape::Box,
            parallax_shape: ProbeShape::Box,
            falloff: 1.0,
            influence_distance: 0.1,
            grid_resolution: resolution.max(UVec3::ONE),
            ..Self::cube()
        }
    }

    #[must_use]
    pub fn with_attenuation(mut self, shape: ProbeShape, influence_distance: f32, falloff: f32) -> Self {
        self.attenuation_shape = shape;
        self.influence_distance = influence_distance;
        self.falloff = falloff;
        self
    }

    #[must_use]
    pub fn with_custom_parallax(mut self, shape: ProbeShape, distance: f32) -> Self {
        self.parallax_shape = shape;
        self.parallax_distance = distance;
        self.flags |= ProbeFlags::CUSTOM_PARALLAX;
        self
    }

    #[must_use]
    pub fn with_clip(mut self, clip_start: f32, clip_end: f32) -> Self {
        self.clip_start = clip_start;
        self.clip_end = clip_end;
        self
    }

    #[must_use]
    pub fn with_show_data(mut self, display_size: f32) -> Self {
        self.display_size = display_size;
        self.flags |= ProbeFlags::SHOW_DATA;
        self
    }

    /// Number of bake cells: the lattice size for grids, 1 for cube probes.
    /// `None` when the lattice size does not fit in a `u32`.
    #[inline]
    #[must_use]
    pub fn cell_count(&self) -> Option<u32> {
        match self.kind {
            ProbeKind::Cube => Some(1),
            ProbeKind::Grid => {
                let r = self.grid_resolution.max(UVec3::ONE);
                r.x.checked_mul(r.y)?.checked_mul(r.z)
            }
        }
    }
}

/// A probe-bearing scene object.
///
/// The resync bit plays the role of the scene's change tracking: it is set by
/// every mutation and consumed once per frame by the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeObject {
    probe: LightProbe,
    world_matrix: Mat4,
    visible: bool,
    needs_resync: bool,
}

impl ProbeObject {
    #[must_use]
    pub fn new(probe: LightProbe, world_matrix: Mat4) -> Self {
        Self {
            probe,
            world_matrix,
            visible: true,
            needs_resync: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn probe(&self) -> &LightProbe {
        &self.probe
    }

    /// Mutable access to the probe settings; always tags the object for resync.
    pub fn probe_mut(&mut self) -> &mut LightProbe {
        self.needs_resync = true;
        &mut self.probe
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ProbeKind {
        self.probe.kind
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    pub fn set_world_matrix(&mut self, world_matrix: Mat4) {
        if self.world_matrix != world_matrix {
            self.world_matrix = world_matrix;
            self.needs_resync = true;
        }
    }

    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            self.needs_resync = true;
        }
    }

    #[inline]
    #[must_use]
    pub fn needs_resync(&self) -> bool {
        self.needs_resync
    }

    /// Returns and clears the resync bit.
    pub fn take_resync(&mut self) -> bool {
        std::mem::take(&mut self.needs_resync)
    }
}
