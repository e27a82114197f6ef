//! GPU parameter tables for cube probes and irradiance grids.
//!
//! Both structs are `Pod` and laid out in 16-byte rows so a slice of them
//! can be uploaded as-is into a uniform/storage buffer.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, UVec3, Vec3};

use crate::scene::probe::{LightProbe, ProbeFlags};

const MIN_DISTANCE: f32 = 1e-8;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CubeProbeData {
    pub position: Vec3,
    pub parallax_type: f32,

    pub attenuation_fac: f32,
    pub attenuation_type: f32,
    pub _pad: [f32; 2],

    /// World → unit influence volume.
    pub attenuation_mat: Mat4,
    /// World → unit parallax volume.
    pub parallax_mat: Mat4,
}

impl Default for CubeProbeData {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            parallax_type: 0.0,
            attenuation_fac: 0.0,
            attenuation_type: 0.0,
            _pad: [0.0; 2],
            attenuation_mat: Mat4::IDENTITY,
            parallax_mat: Mat4::IDENTITY,
        }
    }
}

impl CubeProbeData {
    #[must_use]
    pub fn from_probe(probe: &LightProbe, world_matrix: Mat4) -> Self {
        let attenuation_fac = 1.0 / probe.falloff.max(MIN_DISTANCE);
        let influence = probe.influence_distance.max(MIN_DISTANCE);
        let attenuation_mat = (world_matrix * Mat4::from_scale(Vec3::splat(influence))).inverse();

        let (parallax_shape, parallax_distance) = if probe.flags.contains(ProbeFlags::CUSTOM_PARALLAX) {
            (probe.parallax_shape, probe.parallax_distance)
        } else {
            (probe.attenuation_shape, probe.influence_distance)
        };
        let parallax_mat =
            (world_matrix * Mat4::from_scale(Vec3::splat(parallax_distance.max(MIN_DISTANCE)))).inverse();

        Self {
            position: world_matrix.w_axis.truncate(),
            parallax_type: parallax_shape.shader_id(),
            attenuation_fac,
            attenuation_type: probe.attenuation_shape.shader_id(),
            _pad: [0.0; 2],
            attenuation_mat,
            parallax_mat,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GridData {
    /// World → grid local space ([-1, 1]³).
    pub world_to_local: Mat4,

    /// World position of cell (0, 0, 0).
    pub corner: Vec3,
    pub attenuation_scale: f32,

    pub increment_x: Vec3,
    pub attenuation_bias: f32,

    pub increment_y: Vec3,
    /// First cell of this grid in the irradiance atlas.
    pub offset: u32,

    pub increment_z: Vec3,
    pub _pad0: f32,

    pub resolution: UVec3,
    pub _pad1: u32,
}

impl Default for GridData {
    /// The world slot: a single cell at offset 0.
    fn default() -> Self {
        Self {
            world_to_local: Mat4::IDENTITY,
            corner: Vec3::ZERO,
            attenuation_scale: 0.0,
            increment_x: Vec3::ZERO,
            attenuation_bias: 0.0,
            increment_y: Vec3::ZERO,
            offset: 0,
            increment_z: Vec3::ZERO,
            _pad0: 0.0,
            resolution: UVec3::ONE,
            _pad1: 0,
        }
    }
}

impl GridData {
    #[must_use]
    pub fn from_probe(probe: &LightProbe, world_matrix: Mat4, offset: u32) -> Self {
        let fac = 1.0 / probe.falloff.max(MIN_DISTANCE);
        let resolution = probe.grid_resolution.max(UVec3::ONE);

        // Cells span [-1, 1] in object space, sampled at their centres.
        let cell_dim = Vec3::splat(2.0) / resolution.as_vec3();
        let half_cell = cell_dim * 0.5;
        let first_local = Vec3::splat(-1.0) + half_cell;

        let corner = world_matrix.transform_point3(first_local);
        let step = |axis: Vec3| world_matrix.transform_point3(first_local + axis * cell_dim) - corner;

        Self {
            world_to_local: world_matrix.inverse(),
            corner,
            attenuation_scale: fac / probe.influence_distance.max(MIN_DISTANCE),
            increment_x: step(Vec3::X),
            attenuation_bias: fac,
            increment_y: step(Vec3::Y),
            offset,
            increment_z: step(Vec3::Z),
            _pad0: 0.0,
            resolution,
            _pad1: 0,
        }
    }

    /// Saturates at `u32::MAX`; registered grids always fit.
    #[inline]
    #[must_use]
    pub fn cell_count(&self) -> u32 {
        self.resolution
            .x
            .saturating_mul(self.resolution.y)
            .saturating_mul(self.resolution.z)
    }
}
