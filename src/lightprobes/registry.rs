//! Probe Registry
//!
//! Rebuilt from the scene every frame. The registry decides which probe
//! objects take part in baking, assigns their atlas layers / cell offsets,
//! tracks per-object bake progress and produces the packed parameter tables
//! the shading pass uploads.
//!
//! Slot 0 of both tables always belongs to the world probe, so registry
//! indices of scene probes start at 1.
//!
//! # Change detection
//!
//! An object is (re)marked dirty when any of the following holds:
//! - it was not registered last frame,
//! - its resync bit was set (transform, settings or visibility changed),
//! - the world changed,
//! - its registry slot or (for grids) its atlas offset moved.
//!
//! Dirtying a grid restarts the scene-wide bounce iteration; the registry
//! only reports it, the scheduler acts on it.

use glam::Vec3;
use rustc_hash::{FxHashMap, FxHashSet};

use super::uniforms::{CubeProbeData, GridData};
use crate::renderer::settings::LightProbeSettings;
use crate::resources::VersionObserver;
use crate::scene::{ProbeFlags, ProbeKind, ProbeObjectId, ProbeScene};

/// Bake progress of one probe-bearing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeBakeState {
    pub needs_update: bool,
    pub updated_cells: u32,
    pub cell_count: u32,
    /// Set once the probe has been baked at least once since the last full
    /// invalidation; counted in the active probe totals.
    pub ready_to_shade: bool,
    /// Atlas layer written by the last cube bake.
    pub probe_index: Option<usize>,
    /// Registry slot assigned by the last sync.
    pub slot: usize,
    /// First irradiance cell (grids only).
    pub offset: u32,
}

impl ProbeBakeState {
    fn new(slot: usize, cell_count: u32, offset: u32) -> Self {
        Self {
            needs_update: true,
            updated_cells: 0,
            cell_count,
            ready_to_shade: false,
            probe_index: None,
            slot,
            offset,
        }
    }

    fn mark_dirty(&mut self, cell_count: u32) {
        self.needs_update = true;
        self.updated_cells = 0;
        self.cell_count = cell_count;
        self.probe_index = None;
    }

    /// Whether every cell has been baked for the current bounce.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.updated_cells >= self.cell_count
    }
}

/// Outcome of one [`ProbeRegistry::sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub world_changed: bool,
    /// A grid was dirtied (or the world changed): bounce 0 must be redone.
    pub restart_bounces: bool,
    pub cubes_dirtied: usize,
    pub grids_dirtied: usize,
    /// Objects skipped because of capacity or atlas overflow.
    pub rejected: usize,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    id: ProbeObjectId,
    near: f32,
    far: f32,
    show_data: bool,
    display_size: f32,
}

/// The next grid cell to bake.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirtyGridCell {
    pub id: ProbeObjectId,
    /// Registry slot (>= 1).
    pub grid: usize,
    /// Flattened cell index inside the grid.
    pub cell: u32,
    /// Atlas cell receiving the result (`grid offset + cell`).
    pub offset: u32,
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
}

/// The next cube probe to bake.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirtyCube {
    pub id: ProbeObjectId,
    /// Registry slot, equal to the reflection atlas layer.
    pub index: usize,
    pub position: Vec3,
    pub near: f32,
    pub far: f32,
}

/// Debug instance for a probe with [`ProbeFlags::SHOW_DATA`] set.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeDisplay {
    pub kind: ProbeKind,
    pub index: usize,
    pub size: f32,
    /// Probe position, or every cell position for grids (flattened order).
    pub positions: Vec<Vec3>,
}

#[derive(Debug)]
pub struct ProbeRegistry {
    cubes: Vec<Entry>,
    grids: Vec<Entry>,
    states: FxHashMap<ProbeObjectId, ProbeBakeState>,
    world: VersionObserver,

    cube_data: Vec<CubeProbeData>,
    grid_data: Vec<GridData>,
    total_cells: u32,

    max_cubes: usize,
    max_grids: usize,
    cell_capacity: u32,
}

impl ProbeRegistry {
    #[must_use]
    pub fn new(settings: &LightProbeSettings) -> Self {
        Self {
            cubes: Vec::with_capacity(settings.max_cube_probes),
            grids: Vec::with_capacity(settings.max_grids),
            states: FxHashMap::default(),
            world: VersionObserver::new(),
            cube_data: vec![CubeProbeData::default()],
            grid_data: vec![GridData::default()],
            total_cells: 1,
            max_cubes: settings.max_cube_probes,
            max_grids: settings.max_grids,
            cell_capacity: settings.irradiance_cell_capacity(),
        }
    }

    /// Scans the scene, consuming every object's resync bit.
    pub fn sync(&mut self, scene: &mut ProbeScene) -> SyncReport {
        let mut report = SyncReport {
            world_changed: self.world.observe(scene.world.version()),
            ..Default::default()
        };
        report.restart_bounces = report.world_changed;

        self.cubes.clear();
        self.grids.clear();
        self.cube_data.truncate(1);
        self.grid_data.truncate(1);
        let mut next_offset = 1u32;

        for (id, object) in scene.iter_mut() {
            let resync = object.take_resync();
            if !object.is_visible() {
                continue;
            }

            let probe = object.probe();
            let entry = Entry {
                id,
                near: probe.clip_start,
                far: probe.clip_end,
                show_data: probe.flags.contains(ProbeFlags::SHOW_DATA),
                display_size: probe.display_size,
            };
            let Some(cells) = probe.cell_count() else {
                log::warn!(
                    "Irradiance grid {id:?} resolution {} has too many cells, skipping",
                    probe.grid_resolution
                );
                report.rejected += 1;
                continue;
            };

            let (slot, offset) = match object.kind() {
                ProbeKind::Cube => {
                    if self.cubes.len() + 1 >= self.max_cubes {
                        log::warn!(
                            "Too many cube probes in the scene (max {}), skipping {id:?}",
                            self.max_cubes
                        );
                        report.rejected += 1;
                        continue;
                    }
                    self.cubes.push(entry);
                    self.cube_data
                        .push(CubeProbeData::from_probe(probe, object.world_matrix()));
                    (self.cubes.len(), 0)
                }
                ProbeKind::Grid => {
                    if self.grids.len() + 1 >= self.max_grids {
                        log::warn!(
                            "Too many irradiance grids in the scene (max {}), skipping {id:?}",
                            self.max_grids
                        );
                        report.rejected += 1;
                        continue;
                    }
                    if next_offset.saturating_add(cells) > self.cell_capacity {
                        log::warn!(
                            "Irradiance atlas full ({} cells), skipping grid {id:?} with {cells} cells",
                            self.cell_capacity
                        );
                        report.rejected += 1;
                        continue;
                    }
                    let offset = next_offset;
                    next_offset += cells;
                    self.grids.push(entry);
                    self.grid_data
                        .push(GridData::from_probe(probe, object.world_matrix(), offset));
                    (self.grids.len(), offset)
                }
            };

            let mut dirtied = false;
            self.states
                .entry(id)
                .and_modify(|state| {
                    if resync || report.world_changed || state.slot != slot || state.offset != offset {
                        state.mark_dirty(cells);
                        dirtied = true;
                    }
                    state.slot = slot;
                    state.offset = offset;
                })
                .or_insert_with(|| {
                    dirtied = true;
                    ProbeBakeState::new(slot, cells, offset)
                });

            if dirtied {
                match object.kind() {
                    ProbeKind::Cube => report.cubes_dirtied += 1,
                    ProbeKind::Grid => {
                        report.grids_dirtied += 1;
                        report.restart_bounces = true;
                    }
                }
            }
        }

        self.total_cells = next_offset;

        let present: FxHashSet<ProbeObjectId> =
            self.cubes.iter().chain(self.grids.iter()).map(|e| e.id).collect();
        self.states.retain(|id, _| present.contains(id));

        report
    }

    /// Marks every registered probe and grid dirty and not ready.
    pub fn invalidate_all(&mut self) {
        for state in self.states.values_mut() {
            state.mark_dirty(state.cell_count);
            state.ready_to_shade = false;
        }
    }

    /// Restarts cell progress of every grid for the next bounce.
    pub fn mark_grids_dirty(&mut self) {
        for entry in &self.grids {
            if let Some(state) = self.states.get_mut(&entry.id) {
                state.needs_update = true;
                state.updated_cells = 0;
            }
        }
    }

    #[must_use]
    pub fn first_dirty_grid(&self) -> Option<DirtyGridCell> {
        self.grids.iter().enumerate().find_map(|(i, entry)| {
            let state = self.states.get(&entry.id)?;
            if !state.needs_update || state.is_complete() {
                return None;
            }
            let grid = i + 1;
            let cell = state.updated_cells;
            Some(DirtyGridCell {
                id: entry.id,
                grid,
                cell,
                offset: state.offset + cell,
                position: self.grid_data[grid].cell_position(cell),
                near: entry.near,
                far: entry.far,
            })
        })
    }

    /// Records one finished cell; returns `true` once the grid is complete.
    pub fn advance_grid(&mut self, id: ProbeObjectId) -> bool {
        let Some(state) = self.states.get_mut(&id) else {
            return false;
        };
        state.updated_cells = (state.updated_cells + 1).min(state.cell_count);
        if state.is_complete() {
            state.needs_update = false;
            state.ready_to_shade = true;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn first_dirty_cube(&self) -> Option<DirtyCube> {
        self.cubes.iter().enumerate().find_map(|(i, entry)| {
            let state = self.states.get(&entry.id)?;
            if !state.needs_update {
                return None;
            }
            let index = i + 1;
            Some(DirtyCube {
                id: entry.id,
                index,
                position: self.cube_data[index].position,
                near: entry.near,
                far: entry.far,
            })
        })
    }

    /// Records a finished cube bake into `layer`; returns `true` the first
    /// time the probe becomes shadeable.
    pub fn complete_cube(&mut self, id: ProbeObjectId, layer: usize) -> bool {
        let Some(state) = self.states.get_mut(&id) else {
            return false;
        };
        state.needs_update = false;
        state.updated_cells = state.cell_count;
        state.probe_index = Some(layer);
        !std::mem::replace(&mut state.ready_to_shade, true)
    }

    #[must_use]
    pub fn has_dirty_grids(&self) -> bool {
        self.first_dirty_grid().is_some()
    }

    #[must_use]
    pub fn has_dirty_cubes(&self) -> bool {
        self.first_dirty_cube().is_some()
    }

    #[must_use]
    pub fn state(&self, id: ProbeObjectId) -> Option<&ProbeBakeState> {
        self.states.get(&id)
    }

    /// Registered cube probes, world included.
    #[inline]
    #[must_use]
    pub fn cube_count(&self) -> usize {
        self.cubes.len() + 1
    }

    /// Registered grids, world included.
    #[inline]
    #[must_use]
    pub fn grid_count(&self) -> usize {
        self.grids.len() + 1
    }

    /// Irradiance cells in use, world cell included.
    #[inline]
    #[must_use]
    pub fn total_cells(&self) -> u32 {
        self.total_cells
    }

    pub fn cube_ids(&self) -> impl Iterator<Item = ProbeObjectId> + '_ {
        self.cubes.iter().map(|e| e.id)
    }

    pub fn grid_ids(&self) -> impl Iterator<Item = ProbeObjectId> + '_ {
        self.grids.iter().map(|e| e.id)
    }

    /// Packed cube parameters, slot 0 = world.
    #[must_use]
    pub fn cube_table(&self) -> &[CubeProbeData] {
        &self.cube_data
    }

    /// Packed grid parameters, slot 0 = world.
    #[must_use]
    pub fn grid_table(&self) -> &[GridData] {
        &self.grid_data
    }

    /// Debug instances for probes flagged with "show data".
    #[must_use]
    pub fn display_list(&self) -> Vec<ProbeDisplay> {
        let cubes = self.cubes.iter().enumerate().filter(|(_, e)| e.show_data).map(|(i, e)| {
            ProbeDisplay {
                kind: ProbeKind::Cube,
                index: i + 1,
                size: e.display_size,
                positions: vec![self.cube_data[i + 1].position],
            }
        });
        let grids = self.grids.iter().enumerate().filter(|(_, e)| e.show_data).map(|(i, e)| {
            let data = &self.grid_data[i + 1];
            ProbeDisplay {
                kind: ProbeKind::Grid,
                index: i + 1,
                size: e.display_size,
                positions: (0..data.cell_count()).map(|c| data.cell_position(c)).collect(),
            }
        });
        cubes.chain(grids).collect()
    }
}
