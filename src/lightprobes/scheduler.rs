//! Incremental Bake Scheduler
//!
//! Spreads probe baking over frames: every call to [`BakeScheduler::plan`]
//! yields at most one [`BakeUnit`], which the caller executes and then
//! reports back through [`BakeScheduler::complete`].
//!
//! # Ordering
//!
//! ```text
//!  World dirty ──► World
//!       │
//!       ▼ (unless paused)
//!  bounce 0 .. max_bounce ──► GridCell × every cell of every dirty grid
//!       │                     (grids re-tagged and atlases swapped between bounces)
//!       ▼
//!  dirty cube probes ──► CubeProbe
//!       │
//!       ▼
//!     Idle
//! ```
//!
//! Grids need the world lighting as their first bounce input; cube probes
//! need converged diffuse lighting, so they come last.
//!
//! The scheduler is pure bookkeeping: it never touches the GPU, so its
//! whole state machine is exercised without a device.

use super::registry::{DirtyCube, DirtyGridCell, ProbeRegistry, SyncReport};
use crate::resources::PingPong;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakePhase {
    Idle,
    WorldDirty,
    /// Grid bounce `k` (`k < max_bounce`) in progress.
    GridBounce(u32),
    CubeDirty,
}

/// One bounded piece of baking work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BakeUnit {
    /// Capture the world, glossy-filter layer 0 and diffuse-filter cell 0 of
    /// both irradiance atlases.
    World,
    /// Capture one grid cell and diffuse-filter it into the pending atlas.
    GridCell { cell: DirtyGridCell, bounce: u32 },
    /// Capture one cube probe and glossy-filter it into its atlas layer.
    CubeProbe(DirtyCube),
}

#[derive(Debug, Clone)]
pub struct BakeScheduler {
    max_bounce: u32,
    bounce: u32,
    world_dirty: bool,
    world_ready: bool,
    active_cubes: u32,
    active_grids: u32,
}

impl BakeScheduler {
    #[must_use]
    pub fn new(max_bounce: u32) -> Self {
        Self {
            max_bounce,
            bounce: 0,
            world_dirty: true,
            world_ready: false,
            active_cubes: 0,
            active_grids: 0,
        }
    }

    /// Applies the change flags of a registry sync.
    pub fn on_sync(&mut self, report: &SyncReport) {
        if report.world_changed {
            self.world_dirty = true;
        }
        if report.restart_bounces {
            self.restart_bounces();
        }
    }

    /// Full reset after the bake targets were reallocated.
    pub fn invalidate(&mut self) {
        self.world_dirty = true;
        self.world_ready = false;
        self.active_cubes = 0;
        self.active_grids = 0;
        self.bounce = 0;
    }

    pub fn restart_bounces(&mut self) {
        self.bounce = 0;
    }

    /// Picks this frame's unit, advancing bounce bookkeeping on the way.
    ///
    /// Finishing a bounce re-tags every grid and swaps `irradiance` so the
    /// next bounce reads the one just completed.
    pub fn plan<T>(
        &mut self,
        registry: &mut ProbeRegistry,
        irradiance: &mut PingPong<T>,
        paused: bool,
    ) -> Option<BakeUnit> {
        if self.world_dirty {
            return Some(BakeUnit::World);
        }
        if paused {
            return None;
        }

        while self.bounce < self.max_bounce {
            self.active_grids = registry.grid_count() as u32;

            if let Some(cell) = registry.first_dirty_grid() {
                return Some(BakeUnit::GridCell {
                    cell,
                    bounce: self.bounce,
                });
            }

            self.bounce += 1;
            log::debug!("Irradiance bounce {} of {} done", self.bounce, self.max_bounce);

            if self.bounce < self.max_bounce {
                registry.mark_grids_dirty();
                irradiance.swap();
            }
        }

        registry.first_dirty_cube().map(BakeUnit::CubeProbe)
    }

    /// Records a successfully executed unit.
    pub fn complete(&mut self, unit: &BakeUnit, registry: &mut ProbeRegistry) {
        match unit {
            BakeUnit::World => {
                self.world_dirty = false;
                if !self.world_ready {
                    self.world_ready = true;
                    self.active_cubes = 1;
                    self.active_grids = 1;
                }
            }
            BakeUnit::GridCell { cell, .. } => {
                if registry.advance_grid(cell.id) {
                    log::trace!("Grid {} finished bounce {}", cell.grid, self.bounce);
                }
            }
            BakeUnit::CubeProbe(cube) => {
                if registry.complete_cube(cube.id, cube.index) {
                    self.active_cubes += 1;
                }
            }
        }
    }

    #[must_use]
    pub fn phase(&self, registry: &ProbeRegistry) -> BakePhase {
        if self.world_dirty {
            BakePhase::WorldDirty
        } else if self.bounce < self.max_bounce {
            BakePhase::GridBounce(self.bounce)
        } else if registry.has_dirty_cubes() {
            BakePhase::CubeDirty
        } else {
            BakePhase::Idle
        }
    }

    #[must_use]
    pub fn bounce(&self) -> u32 {
        self.bounce
    }

    #[must_use]
    pub fn max_bounce(&self) -> u32 {
        self.max_bounce
    }

    #[must_use]
    pub fn is_world_dirty(&self) -> bool {
        self.world_dirty
    }

    #[must_use]
    pub fn is_world_ready(&self) -> bool {
        self.world_ready
    }

    /// Cube probes (world included) the shading pass may sample.
    #[must_use]
    pub fn active_cubes(&self) -> u32 {
        self.active_cubes
    }

    /// Grids (world included) the shading pass may sample.
    #[must_use]
    pub fn active_grids(&self) -> u32 {
        self.active_grids
    }
}
