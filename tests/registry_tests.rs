//! Probe Registry Tests
//!
//! Tests for:
//! - World slot reservation and table layout
//! - Cell offset assignment and offset-shift dirtying
//! - Capacity and irradiance atlas overflow handling
//! - Resync consumption, visibility, pruning of removed objects
//! - Derived cube probe parameters and the debug display list

mod common;

use glam::{Mat4, UVec3, Vec3};

use common::*;
use myth_lightprobes::lightprobes::ProbeRegistry;
use myth_lightprobes::renderer::settings::LightProbeSettings;
use myth_lightprobes::scene::{LightProbe, ProbeKind, ProbeObject, ProbeScene, ProbeShape};

const EPSILON: f32 = 1e-4;

fn approx_mat(a: Mat4, b: Mat4) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

// ============================================================================
// Layout
// ============================================================================

#[test]
fn empty_scene_keeps_world_slots() {
    let mut registry = ProbeRegistry::new(&small_settings());
    let mut scene = ProbeScene::default();

    let report = registry.sync(&mut scene);

    assert!(report.world_changed);
    assert_eq!(registry.cube_count(), 1);
    assert_eq!(registry.grid_count(), 1);
    assert_eq!(registry.cube_table().len(), 1);
    assert_eq!(registry.grid_table().len(), 1);
    assert_eq!(registry.grid_table()[0].offset, 0);
    assert_eq!(registry.total_cells(), 1);
}

#[test]
fn world_change_is_reported_once() {
    let mut registry = ProbeRegistry::new(&small_settings());
    let mut scene = ProbeScene::default();

    assert!(registry.sync(&mut scene).world_changed);
    assert!(!registry.sync(&mut scene).world_changed);
    scene.world.mark_changed();
    assert!(registry.sync(&mut scene).world_changed);
}

#[test]
fn grid_offsets_accumulate_from_one() {
    let mut registry = ProbeRegistry::new(&small_settings());
    let mut scene = ProbeScene::default();
    add_grid(&mut scene, UVec3::splat(2), Vec3::ZERO);
    add_grid(&mut scene, UVec3::new(1, 1, 3), Vec3::X);

    registry.sync(&mut scene);

    let table = registry.grid_table();
    assert_eq!(table.len(), 3);
    assert_eq!(table[1].offset, 1);
    assert_eq!(table[2].offset, 9);
    assert_eq!(registry.total_cells(), 12);
}

#[test]
fn cube_probe_slots_follow_scene_order() {
    let mut registry = ProbeRegistry::new(&small_settings());
    let mut scene = ProbeScene::default();
    let a = add_cube(&mut scene, Vec3::X);
    let b = add_cube(&mut scene, Vec3::Y);

    registry.sync(&mut scene);

    assert_eq!(registry.state(a).unwrap().slot, 1);
    assert_eq!(registry.state(b).unwrap().slot, 2);
    assert_eq!(registry.cube_ids().collect::<Vec<_>>(), vec![a, b]);
    assert_eq!(registry.grid_ids().count(), 0);
    assert_eq!(registry.cube_table()[2].position, Vec3::Y);
}

// ============================================================================
// Change detection
// ============================================================================

#[test]
fn new_objects_are_dirty_and_resync_is_consumed() {
    let mut registry = ProbeRegistry::new(&small_settings());
    let mut scene = ProbeScene::default();
    let grid = add_grid(&mut scene, UVec3::ONE, Vec3::ZERO);

    let report = registry.sync(&mut scene);
    assert_eq!(report.grids_dirtied, 1);
    assert!(report.restart_bounces);
    assert!(!scene.get(grid).unwrap().needs_resync());

    registry.advance_grid(grid);
    let report = registry.sync(&mut scene);
    assert_eq!(report.grids_dirtied, 0);
    assert!(!report.restart_bounces);
    assert!(!registry.state(grid).unwrap().needs_update);
}

#[test]
fn settings_edit_dirties_probe() {
    let mut registry = ProbeRegistry::new(&small_settings());
    let mut scene = ProbeScene::default();
    let cube = add_cube(&mut scene, Vec3::ZERO);
    registry.sync(&mut scene);
    registry.complete_cube(cube, 1);
    registry.sync(&mut scene);
    assert!(!registry.state(cube).unwrap().needs_update);

    scene.get_mut(cube).unwrap().probe_mut().clip_end = 80.0;
    let report = registry.sync(&mut scene);

    assert_eq!(report.cubes_dirtied, 1);
    assert!(!report.restart_bounces, "cube edits keep grid bounces");
    let state = registry.state(cube).unwrap();
    assert!(state.needs_update);
    assert_eq!(state.probe_index, None);
    assert!(state.ready_to_shade, "readiness survives re-dirtying");
}

#[test]
fn removing_a_grid_shifts_and_dirties_followers() {
    let mut registry = ProbeRegistry::new(&small_settings());
    let mut scene = ProbeScene::default();
    let first = add_grid(&mut scene, UVec3::splat(2), Vec3::ZERO);
    let second = add_grid(&mut scene, UVec3::ONE, Vec3::X);
    registry.sync(&mut scene);
    registry.advance_grid(second);
    assert!(!registry.state(second).unwrap().needs_update);

    scene.remove(first);
    let report = registry.sync(&mut scene);

    assert_eq!(report.grids_dirtied, 1);
    assert!(registry.state(first).is_none(), "removed object state is pruned");
    let state = registry.state(second).unwrap();
    assert_eq!(state.offset, 1);
    assert!(state.needs_update);
    assert_eq!(registry.grid_table()[1].offset, 1);
}

#[test]
fn hidden_objects_are_not_registered() {
    let mut registry = ProbeRegistry::new(&small_settings());
    let mut scene = ProbeScene::default();
    let cube = add_cube(&mut scene, Vec3::ZERO);
    scene.get_mut(cube).unwrap().set_visible(false);

    registry.sync(&mut scene);

    assert_eq!(registry.cube_count(), 1);
    assert!(registry.state(cube).is_none());
    assert!(!scene.get(cube).unwrap().needs_resync());

    scene.get_mut(cube).unwrap().set_visible(true);
    let report = registry.sync(&mut scene);
    assert_eq!(report.cubes_dirtied, 1);
}

#[test]
fn invalidate_all_clears_readiness() {
    let mut registry = ProbeRegistry::new(&small_settings());
    let mut scene = ProbeScene::default();
    let cube = add_cube(&mut scene, Vec3::ZERO);
    let grid = add_grid(&mut scene, UVec3::splat(2), Vec3::ZERO);
    registry.sync(&mut scene);
    assert!(registry.complete_cube(cube, 1));
    assert!(!registry.complete_cube(cube, 1), "ready only once");
    registry.advance_grid(grid);

    registry.invalidate_all();

    for id in [cube, grid] {
        let state = registry.state(id).unwrap();
        assert!(state.needs_update);
        assert!(!state.ready_to_shade);
        assert_eq!(state.updated_cells, 0);
    }
}

// ============================================================================
// Dirty queries
// ============================================================================

#[test]
fn dirty_grid_cells_walk_in_flattened_order() {
    let mut registry = ProbeRegistry::new(&small_settings());
    let mut scene = ProbeScene::default();
    let grid = add_grid(&mut scene, UVec3::new(1, 1, 2), Vec3::ZERO);
    registry.sync(&mut scene);

    let first = registry.first_dirty_grid().unwrap();
    assert_eq!((first.grid, first.cell, first.offset), (1, 0, 1));
    assert!(!registry.advance_grid(grid));

    let second = registry.first_dirty_grid().unwrap();
    assert_eq!((second.cell, second.offset), (1, 2));
    assert!((second.position - first.position - Vec3::new(0.0, 0.0, 1.0)).length() < EPSILON);
    assert!(registry.advance_grid(grid));

    assert!(registry.first_dirty_grid().is_none());
    assert!(!registry.has_dirty_grids());
    assert_eq!(registry.grid_ids().collect::<Vec<_>>(), vec![grid]);
    registry.mark_grids_dirty();
    assert!(registry.has_dirty_grids());
    assert_eq!(registry.first_dirty_grid().unwrap().cell, 0);
}

// ============================================================================
// Capacity
// ============================================================================

#[test]
fn cube_capacity_overflow_skips_extra_probes() {
    init_logger();
    let settings = small_settings();
    let mut registry = ProbeRegistry::new(&settings);
    let mut scene = ProbeScene::default();
    for i in 0..settings.max_cube_probes {
        add_cube(&mut scene, Vec3::X * i as f32);
    }

    let report = registry.sync(&mut scene);

    assert_eq!(registry.cube_count(), settings.max_cube_probes);
    assert_eq!(report.rejected, 1);
}

#[test]
fn grids_overflowing_the_atlas_are_rejected() {
    init_logger();
    // Hl2 3x2 footprint: 2 x 3 = 6 cells, one taken by the world.
    let settings = LightProbeSettings {
        irradiance_pool_size: 6,
        ..small_settings()
    };
    let mut registry = ProbeRegistry::new(&settings);
    let mut scene = ProbeScene::default();
    let big = add_grid(&mut scene, UVec3::splat(2), Vec3::ZERO);
    let small = add_grid(&mut scene, UVec3::new(5, 1, 1), Vec3::ZERO);

    let report = registry.sync(&mut scene);

    assert_eq!(report.rejected, 1);
    assert!(registry.state(big).is_none());
    assert_eq!(registry.state(small).unwrap().offset, 1);
    assert_eq!(registry.total_cells(), 6);
}

#[test]
fn grids_with_unrepresentable_cell_count_are_rejected() {
    init_logger();
    let mut registry = ProbeRegistry::new(&small_settings());
    let mut scene = ProbeScene::default();
    let huge = add_grid(&mut scene, UVec3::new(65536, 65536, 2), Vec3::ZERO);
    let small = add_grid(&mut scene, UVec3::ONE, Vec3::X);

    let report = registry.sync(&mut scene);

    assert_eq!(report.rejected, 1);
    assert!(registry.state(huge).is_none());
    assert_eq!(registry.state(small).unwrap().offset, 1);
    assert_eq!(registry.grid_count(), 2);
    assert_eq!(registry.total_cells(), 2);
}

#[test]
fn lattice_cell_count_overflow_is_none() {
    assert_eq!(LightProbe::grid(UVec3::new(65536, 65536, 2)).cell_count(), None);
    assert_eq!(LightProbe::grid(UVec3::new(2, 3, 4)).cell_count(), Some(24));
    assert_eq!(LightProbe::cube().cell_count(), Some(1));
}

// ============================================================================
// Derived parameters
// ============================================================================

#[test]
fn cube_data_uses_influence_volume_for_parallax_by_default() {
    let mut registry = ProbeRegistry::new(&small_settings());
    let mut scene = ProbeScene::default();
    let world = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    scene.add(ProbeObject::new(
        LightProbe::cube().with_attenuation(ProbeShape::Box, 4.0, 0.5),
        world,
    ));

    registry.sync(&mut scene);
    let data = registry.cube_table()[1];

    let expected = (world * Mat4::from_scale(Vec3::splat(4.0))).inverse();
    assert!(approx_mat(data.attenuation_mat, expected));
    assert!(approx_mat(data.parallax_mat, expected));
    assert_eq!(data.attenuation_type, 1.0);
    assert_eq!(data.parallax_type, 1.0);
    assert!((data.attenuation_fac - 2.0).abs() < EPSILON);
}

#[test]
fn cube_data_honours_custom_parallax() {
    let mut registry = ProbeRegistry::new(&small_settings());
    let mut scene = ProbeScene::default();
    scene.add(ProbeObject::new(
        LightProbe::cube().with_custom_parallax(ProbeShape::Box, 8.0),
        Mat4::IDENTITY,
    ));

    registry.sync(&mut scene);
    let data = registry.cube_table()[1];

    assert!(approx_mat(data.parallax_mat, Mat4::from_scale(Vec3::splat(1.0 / 8.0))));
    assert_eq!(data.parallax_type, 1.0);
    assert_eq!(data.attenuation_type, 0.0);
}

#[test]
fn display_list_only_contains_flagged_probes() {
    let mut registry = ProbeRegistry::new(&small_settings());
    let mut scene = ProbeScene::default();
    add_cube(&mut scene, Vec3::ZERO);
    scene.add(ProbeObject::new(
        LightProbe::grid(UVec3::splat(2)).with_show_data(0.25),
        Mat4::IDENTITY,
    ));

    registry.sync(&mut scene);
    let list = registry.display_list();

    assert_eq!(list.len(), 1);
    assert_eq!(list[0].kind, ProbeKind::Grid);
    assert_eq!(list[0].index, 1);
    assert_eq!(list[0].size, 0.25);
    assert_eq!(list[0].positions.len(), 8);
    assert!((list[0].positions[0] - Vec3::splat(-0.5)).length() < EPSILON);
}
