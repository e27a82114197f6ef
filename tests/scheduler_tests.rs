//! Bake Scheduling Tests
//!
//! Tests for:
//! - Unit ordering (world, grid bounces, cube probes)
//! - One unit per frame, nothing while paused
//! - Bounce restarts on grid / world changes
//! - Full invalidation when the reflection atlas is reallocated
//! - Allocation failure degrading to "no probe lighting"

mod common;

use glam::{Mat4, UVec3, Vec3};

use common::*;
use myth_lightprobes::errors::ProbeError;
use myth_lightprobes::lightprobes::{BakePhase, BakeScheduler, BakeUnit, LightProbes, ProbeRegistry};
use myth_lightprobes::renderer::backend::ShaderVariant;
use myth_lightprobes::resources::PingPong;
use myth_lightprobes::scene::ProbeScene;

/// Runs one frame and returns the unit kind inferred from the recorded draws.
fn frame(probes: &mut LightProbes, backend: &mut RecordingBackend, scene: &mut ProbeScene, paused: bool) -> Option<&'static str> {
    backend.take_commands();
    probes.sync(backend, scene).expect("sync");
    let worked = probes.refresh(backend, paused).expect("refresh");
    let commands = backend.take_commands();

    let world = commands.iter().any(|c| {
        matches!(
            c,
            Command::DrawFullscreen {
                variant: ShaderVariant::WorldDefault | ShaderVariant::WorldMaterial(_),
                ..
            }
        )
    });
    let glossy = commands.iter().any(|c| {
        matches!(
            c,
            Command::DrawFullscreen {
                variant: ShaderVariant::GlossyFilter,
                ..
            }
        )
    });
    let scene_draws = commands.iter().any(|c| matches!(c, Command::DrawScene { .. }));

    match (worked, world, scene_draws, glossy) {
        (false, ..) => None,
        (true, true, _, _) => Some("world"),
        (true, false, true, true) => Some("cube"),
        (true, false, true, false) => Some("cell"),
        _ => panic!("unexpected frame contents: {commands:?}"),
    }
}

// ============================================================================
// End-to-end ordering
// ============================================================================

#[test]
fn single_grid_converges_in_world_plus_bounces_times_cells() {
    init_logger();
    let mut backend = RecordingBackend::new();
    let mut probes = initialized(&mut backend);
    let mut scene = ProbeScene::default();
    add_grid(&mut scene, UVec3::splat(2), Vec3::ZERO);

    let mut units = Vec::new();
    for _ in 0..30 {
        units.push(frame(&mut probes, &mut backend, &mut scene, false));
    }

    assert_eq!(units[0], Some("world"));
    assert!(units[1..25].iter().all(|u| *u == Some("cell")), "{units:?}");
    assert!(units[25..].iter().all(Option::is_none), "{units:?}");
    assert_eq!(probes.phase(), BakePhase::Idle);
    assert!(!probes.has_pending_work());
}

#[test]
fn world_only_scene_needs_one_frame() {
    let mut backend = RecordingBackend::new();
    let mut probes = initialized(&mut backend);
    let mut scene = ProbeScene::default();

    assert_eq!(bake_until_idle(&mut probes, &mut backend, &mut scene, 10), 1);
    let inputs = probes.shading_inputs();
    assert_eq!(inputs.active_cubes, 1);
    assert_eq!(inputs.active_grids, 1);
}

#[test]
fn cubes_start_after_all_grid_bounces() {
    let mut backend = RecordingBackend::new();
    let mut probes = initialized(&mut backend);
    let mut scene = ProbeScene::default();
    add_cube(&mut scene, Vec3::new(5.0, 0.0, 0.0));
    add_grid(&mut scene, UVec3::ONE, Vec3::ZERO);

    let units: Vec<_> = (0..7)
        .map(|_| frame(&mut probes, &mut backend, &mut scene, false))
        .collect();

    assert_eq!(
        units,
        vec![
            Some("world"),
            Some("cell"),
            Some("cell"),
            Some("cell"),
            Some("cube"),
            None,
            None
        ]
    );
}

#[test]
fn converges_within_bound() {
    let mut backend = RecordingBackend::new();
    let mut probes = initialized(&mut backend);
    let mut scene = ProbeScene::default();
    add_grid(&mut scene, UVec3::new(2, 1, 3), Vec3::ZERO);
    add_grid(&mut scene, UVec3::new(1, 2, 1), Vec3::X * 4.0);
    for i in 0..3 {
        add_cube(&mut scene, Vec3::Y * i as f32);
    }

    let cells = 6 + 2;
    let bound = 3 * cells + 3 + 2;
    let frames = bake_until_idle(&mut probes, &mut backend, &mut scene, 200);
    assert!(frames <= bound, "took {frames} frames, bound {bound}");
    assert_eq!(frames, 1 + 3 * cells + 3);
}

// ============================================================================
// Pause
// ============================================================================

#[test]
fn pause_skips_grid_and_cube_work() {
    let mut backend = RecordingBackend::new();
    let mut probes = initialized(&mut backend);
    let mut scene = ProbeScene::default();
    add_grid(&mut scene, UVec3::splat(2), Vec3::ZERO);

    // The world is baked even while paused.
    assert_eq!(frame(&mut probes, &mut backend, &mut scene, true), Some("world"));
    for _ in 0..5 {
        assert_eq!(frame(&mut probes, &mut backend, &mut scene, true), None);
    }
    assert_eq!(probes.phase(), BakePhase::GridBounce(0));
    assert_eq!(frame(&mut probes, &mut backend, &mut scene, false), Some("cell"));
}

// ============================================================================
// Change handling
// ============================================================================

#[test]
fn world_change_rebakes_everything() {
    let mut backend = RecordingBackend::new();
    let mut probes = initialized(&mut backend);
    let mut scene = ProbeScene::default();
    add_grid(&mut scene, UVec3::ONE, Vec3::ZERO);
    add_cube(&mut scene, Vec3::Y);
    bake_until_idle(&mut probes, &mut backend, &mut scene, 50);

    scene.world.set_horizon_color(Vec3::new(0.2, 0.3, 0.4));
    assert_eq!(bake_until_idle(&mut probes, &mut backend, &mut scene, 50), 1 + 3 + 1);
}

#[test]
fn moving_a_cube_does_not_restart_bounces() {
    let mut backend = RecordingBackend::new();
    let mut probes = initialized(&mut backend);
    let mut scene = ProbeScene::default();
    add_grid(&mut scene, UVec3::splat(2), Vec3::ZERO);
    let cube = add_cube(&mut scene, Vec3::Y);
    bake_until_idle(&mut probes, &mut backend, &mut scene, 100);

    scene
        .get_mut(cube)
        .unwrap()
        .set_world_matrix(Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)));
    assert_eq!(frame(&mut probes, &mut backend, &mut scene, false), Some("cube"));
    assert_eq!(frame(&mut probes, &mut backend, &mut scene, false), None);
}

#[test]
fn moving_a_grid_restarts_bounces() {
    let mut backend = RecordingBackend::new();
    let mut probes = initialized(&mut backend);
    let mut scene = ProbeScene::default();
    let grid = add_grid(&mut scene, UVec3::new(2, 1, 1), Vec3::ZERO);
    add_cube(&mut scene, Vec3::Y);
    bake_until_idle(&mut probes, &mut backend, &mut scene, 100);

    scene
        .get_mut(grid)
        .unwrap()
        .set_world_matrix(Mat4::from_translation(Vec3::Z));
    // Three bounces of two cells; the cube stays clean.
    assert_eq!(bake_until_idle(&mut probes, &mut backend, &mut scene, 100), 6);
}

#[test]
fn atlas_realloc_invalidates_all_state() {
    let mut backend = RecordingBackend::new();
    let mut probes = initialized(&mut backend);
    let mut scene = ProbeScene::default();
    let grid = add_grid(&mut scene, UVec3::ONE, Vec3::ZERO);
    let first = add_cube(&mut scene, Vec3::Y);
    bake_until_idle(&mut probes, &mut backend, &mut scene, 50);
    assert_eq!(probes.shading_inputs().active_cubes, 2);
    assert!(probes.registry().state(first).unwrap().ready_to_shade);

    let second = add_cube(&mut scene, Vec3::NEG_Y);
    probes.sync(&mut backend, &mut scene).unwrap();

    assert_eq!(probes.pool().atlas_layers(), 3);
    assert_eq!(probes.phase(), BakePhase::WorldDirty);
    assert_eq!(probes.shading_inputs().active_cubes, 0);
    assert_eq!(probes.shading_inputs().active_grids, 0);
    for id in [grid, first, second] {
        let state = probes.registry().state(id).unwrap();
        assert!(state.needs_update);
        assert!(!state.ready_to_shade);
        assert_eq!(state.updated_cells, 0);
    }

    // World, 3 bounces of one cell, two cubes.
    assert_eq!(probes.refresh(&mut backend, false), Ok(true));
    assert_eq!(bake_until_idle(&mut probes, &mut backend, &mut scene, 50), 3 + 2);
    assert_eq!(probes.shading_inputs().active_cubes, 3);
}

// ============================================================================
// Shading inputs during captures
// ============================================================================

#[test]
fn grid_captures_hide_probes_and_specular() {
    let mut backend = RecordingBackend::new();
    let mut probes = initialized(&mut backend);
    let mut scene = ProbeScene::default();
    add_grid(&mut scene, UVec3::ONE, Vec3::ZERO);
    add_cube(&mut scene, Vec3::Y);

    frame(&mut probes, &mut backend, &mut scene, false);

    // Bounce 0: no grids, no cubes.
    probes.sync(&mut backend, &mut scene).unwrap();
    probes.refresh(&mut backend, false).unwrap();
    for draw in backend.scene_draws() {
        let Command::DrawScene { shading, .. } = draw else { unreachable!() };
        assert_eq!(shading.active_cubes, 0);
        assert_eq!(shading.active_grids, 0);
        assert!(!shading.specular_enabled);
    }
    backend.take_commands();

    // Bounce 1: grids (world + ours) light the capture, cubes still hidden.
    probes.sync(&mut backend, &mut scene).unwrap();
    probes.refresh(&mut backend, false).unwrap();
    for draw in backend.scene_draws() {
        let Command::DrawScene { shading, .. } = draw else { unreachable!() };
        assert_eq!(shading.active_cubes, 0);
        assert_eq!(shading.active_grids, 2);
    }

    assert!(probes.shading_inputs().specular_enabled);
}

#[test]
fn grid_cell_writes_pending_and_shading_reads_current() {
    let mut backend = RecordingBackend::new();
    let mut probes = initialized(&mut backend);
    let mut scene = ProbeScene::default();
    add_grid(&mut scene, UVec3::ONE, Vec3::ZERO);

    frame(&mut probes, &mut backend, &mut scene, false);
    let current_before = probes.shading_inputs().irradiance_atlas.unwrap();

    probes.sync(&mut backend, &mut scene).unwrap();
    backend.take_commands();
    probes.refresh(&mut backend, false).unwrap();

    let captured_with = backend
        .scene_draws()
        .iter()
        .map(|c| match c {
            Command::DrawScene { shading, .. } => shading.irradiance_atlas.unwrap(),
            _ => unreachable!(),
        })
        .next()
        .unwrap();
    let written = backend
        .fullscreen_draws()
        .iter()
        .map(|c| match c {
            Command::DrawFullscreen { color, .. } => color.unwrap().texture,
            _ => unreachable!(),
        })
        .next()
        .unwrap();

    // The capture reads one atlas while the filter writes the other, which
    // is the atlas the shading pass keeps sampling.
    assert_ne!(captured_with, written);
    assert_eq!(written, current_before);
    assert_eq!(probes.shading_inputs().irradiance_atlas, Some(current_before));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn allocation_failure_disables_probe_lighting() {
    init_logger();
    let mut backend = RecordingBackend::new();
    let mut probes = initialized(&mut backend);
    let mut scene = ProbeScene::default();
    add_cube(&mut scene, Vec3::Y);

    backend.fail_labels.push("Reflection Atlas");
    let report = probes.sync(&mut backend, &mut scene);
    assert!(report.is_ok());
    assert!(!probes.gi_available());
    assert!(!probes.shading_inputs().gi_enabled());
    // Nothing can be baked, but the dirty world keeps the redraw request alive.
    backend.take_commands();
    assert_eq!(probes.refresh(&mut backend, false), Ok(true));
    assert_eq!(probes.refresh(&mut backend, false), Ok(true));
    assert!(probes.has_pending_work());
    assert_eq!(probes.phase(), BakePhase::WorldDirty);
    assert!(backend.fullscreen_draws().is_empty());

    backend.fail_labels.clear();
    assert_eq!(bake_until_idle(&mut probes, &mut backend, &mut scene, 20), 2);
    assert!(probes.gi_available());
    assert_eq!(probes.shading_inputs().active_cubes, 2);
}

#[test]
fn failed_unit_stays_dirty() {
    let mut backend = RecordingBackend::new();
    let mut probes = initialized(&mut backend);
    let mut scene = ProbeScene::default();
    let grid = add_grid(&mut scene, UVec3::ONE, Vec3::ZERO);
    frame(&mut probes, &mut backend, &mut scene, false);

    let current = probes.shading_inputs().irradiance_atlas;
    backend.fail_fullscreen = true;
    probes.sync(&mut backend, &mut scene).unwrap();
    // The failure is logged and a redraw is still requested for the retry.
    assert_eq!(probes.refresh(&mut backend, false), Ok(true));
    assert!(probes.has_pending_work());

    let state = probes.registry().state(grid).unwrap();
    assert!(state.needs_update);
    assert_eq!(state.updated_cells, 0);
    // The swap around the cell is undone even on failure.
    assert_eq!(probes.shading_inputs().irradiance_atlas, current);

    backend.fail_fullscreen = false;
    assert_eq!(bake_until_idle(&mut probes, &mut backend, &mut scene, 20), 3);
}

#[test]
fn lifecycle_misuse_is_reported() {
    let mut backend = RecordingBackend::new();
    let mut probes = LightProbes::new(small_settings()).unwrap();
    let mut scene = ProbeScene::default();

    assert_eq!(probes.sync(&mut backend, &mut scene), Err(ProbeError::NotInitialized));
    assert_eq!(probes.refresh(&mut backend, false), Err(ProbeError::NotInitialized));
}

#[test]
fn teardown_releases_every_texture() {
    let mut backend = RecordingBackend::new();
    let mut probes = initialized(&mut backend);
    let mut scene = ProbeScene::default();
    add_grid(&mut scene, UVec3::ONE, Vec3::ZERO);
    add_cube(&mut scene, Vec3::Y);
    bake_until_idle(&mut probes, &mut backend, &mut scene, 50);
    assert!(backend.live_textures() > 0);

    probes.teardown(&mut backend);
    assert_eq!(backend.live_textures(), 0);
    assert!(!probes.is_initialized());

    // A torn-down context can be brought back up.
    probes.init(&mut backend).unwrap();
    assert_eq!(bake_until_idle(&mut probes, &mut backend, &mut scene, 50), 1 + 3 + 1);
}

// ============================================================================
// Scheduler without a backend
// ============================================================================

#[test]
fn plan_yields_world_until_completed() {
    let settings = small_settings();
    let mut registry = ProbeRegistry::new(&settings);
    let mut scheduler = BakeScheduler::new(settings.max_bounce);
    let mut atlases = PingPong::new(0u8, 1u8);
    let mut scene = ProbeScene::default();
    add_grid(&mut scene, UVec3::ONE, Vec3::ZERO);
    scheduler.on_sync(&registry.sync(&mut scene));

    assert_eq!(scheduler.plan(&mut registry, &mut atlases, false), Some(BakeUnit::World));
    assert_eq!(scheduler.plan(&mut registry, &mut atlases, true), Some(BakeUnit::World));
    scheduler.complete(&BakeUnit::World, &mut registry);
    assert!(scheduler.is_world_ready());

    let Some(BakeUnit::GridCell { cell, bounce }) = scheduler.plan(&mut registry, &mut atlases, false) else {
        panic!("expected a grid cell");
    };
    assert_eq!((cell.cell, cell.offset, bounce), (0, 1, 0));
}

#[test]
fn bounce_transitions_swap_atlases() {
    let settings = small_settings();
    let mut registry = ProbeRegistry::new(&settings);
    let mut scheduler = BakeScheduler::new(3);
    let mut atlases = PingPong::new(0u8, 1u8);
    let mut scene = ProbeScene::default();
    add_grid(&mut scene, UVec3::ONE, Vec3::ZERO);
    scheduler.on_sync(&registry.sync(&mut scene));
    scheduler.complete(&BakeUnit::World, &mut registry);

    let mut bounces = Vec::new();
    while let Some(unit) = scheduler.plan(&mut registry, &mut atlases, false) {
        if let BakeUnit::GridCell { bounce, .. } = unit {
            bounces.push(bounce);
        }
        scheduler.complete(&unit, &mut registry);
    }

    assert_eq!(bounces, vec![0, 1, 2]);
    // One swap between consecutive bounces, none after the last.
    assert_eq!(atlases.swap_count(), 2);
    assert_eq!(scheduler.bounce(), 3);
}
