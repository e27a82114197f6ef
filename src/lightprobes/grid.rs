//! Irradiance grid addressing.
//!
//! Two conventions here are shared with the shading pass and must match it
//! exactly:
//! - cells are flattened z-fastest, then y, then x;
//! - irradiance samples are tiled row-major across the atlas, one footprint
//!   of the active [`IrradianceEncoding`] per cell offset.

use glam::{Mat3, UVec2, UVec3, Vec3};

use super::uniforms::GridData;
use crate::errors::{ProbeError, Result};
use crate::renderer::backend::Viewport;
use crate::renderer::settings::IrradianceEncoding;

/// `z + res_z * (y + res_y * x)`.
#[inline]
#[must_use]
pub fn flatten_cell(cell: UVec3, resolution: UVec3) -> u32 {
    cell.z + resolution.z * (cell.y + resolution.y * cell.x)
}

/// Inverse of [`flatten_cell`].
#[inline]
#[must_use]
pub fn unflatten_cell(index: u32, resolution: UVec3) -> UVec3 {
    UVec3::new(
        index / (resolution.z * resolution.y),
        (index / resolution.z) % resolution.y,
        index % resolution.z,
    )
}

impl GridData {
    /// World-space centre of the cell with flattened index `index`.
    #[must_use]
    pub fn cell_position(&self, index: u32) -> Vec3 {
        let cell = unflatten_cell(index, self.resolution).as_vec3();
        self.corner + self.increment_x * cell.x + self.increment_y * cell.y + self.increment_z * cell.z
    }

    /// Recovers integer cell coordinates from a world position produced by
    /// [`cell_position`](Self::cell_position). `None` when the position is
    /// outside the lattice or the grid transform is degenerate.
    #[must_use]
    pub fn cell_at(&self, position: Vec3) -> Option<UVec3> {
        let basis = Mat3::from_cols(self.increment_x, self.increment_y, self.increment_z);
        if basis.determinant().abs() <= f32::EPSILON {
            return None;
        }
        let local = (basis.inverse() * (position - self.corner)).round();
        if local.min_element() < 0.0 {
            return None;
        }
        let cell = local.as_uvec3();
        cell.cmplt(self.resolution).all().then_some(cell)
    }
}

/// Number of cells one row of the atlas holds.
#[inline]
#[must_use]
pub fn cells_per_row(encoding: IrradianceEncoding, pool_size: u32) -> u32 {
    pool_size / encoding.footprint().0
}

/// Pixel origin of the cell at `offset`.
#[must_use]
pub fn irradiance_tile_origin(offset: u32, encoding: IrradianceEncoding, pool_size: u32) -> UVec2 {
    let (w, h) = encoding.footprint();
    let per_row = cells_per_row(encoding, pool_size).max(1);
    UVec2::new(w * (offset % per_row), h * (offset / per_row))
}

/// Viewport covering the footprint of the cell at `offset`.
pub fn irradiance_tile(offset: u32, encoding: IrradianceEncoding, pool_size: u32) -> Result<Viewport> {
    let (w, h) = encoding.footprint();
    let capacity = cells_per_row(encoding, pool_size) * (pool_size / h);
    if offset >= capacity {
        return Err(ProbeError::IrradianceAtlasFull { offset, capacity });
    }
    let origin = irradiance_tile_origin(offset, encoding, pool_size);
    Ok(Viewport {
        x: origin.x,
        y: origin.y,
        width: w,
        height: h,
    })
}
