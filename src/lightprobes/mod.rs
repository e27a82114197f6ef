//! Light Probe Baking
//!
//! [`LightProbes`] owns the whole pipeline for one scene context:
//!
//! ```text
//! ProbeScene ──sync──► ProbeRegistry ──dirty list──► BakeScheduler
//!                                                        │ one unit / frame
//!                                                        ▼
//!                       CaptureRenderer ──raw cube──► ConvolutionFilter
//!                                                        │
//!                             reflection atlas / irradiance atlases
//!                                                        │
//!                                                        ▼
//!                                    ShadingInputs (main shading pass)
//! ```
//!
//! # Frame loop
//!
//! ```rust,ignore
//! let mut probes = LightProbes::new(LightProbeSettings::default())?;
//! probes.init(&mut backend)?;
//!
//! loop {
//!     // Bake failures are logged inside and retried; only lifecycle misuse
//!     // surfaces here, and the frame still renders with the last inputs.
//!     let redraw = match probes
//!         .sync(&mut backend, &mut scene)
//!         .and_then(|_| probes.refresh(&mut backend, navigating))
//!     {
//!         Ok(redraw) => redraw,
//!         Err(err) => {
//!             log::error!("Light probes skipped this frame: {err}");
//!             false
//!         }
//!     };
//!     render_frame(probes.shading_inputs(), probes.cube_table(), probes.grid_table());
//!     if redraw {
//!         request_redraw();
//!     }
//! }
//!
//! probes.teardown(&mut backend);
//! ```

pub mod capture;
pub mod filter;
pub mod grid;
pub mod registry;
pub mod scheduler;
pub mod uniforms;

pub use capture::{CaptureRenderer, ShadingOverride};
pub use filter::ConvolutionFilter;
pub use registry::{ProbeBakeState, ProbeDisplay, ProbeRegistry, SyncReport};
pub use scheduler::{BakePhase, BakeScheduler, BakeUnit};
pub use uniforms::{CubeProbeData, GridData};

use crate::errors::{ProbeError, Result};
use crate::renderer::backend::{RenderBackend, TextureHandle};
use crate::renderer::settings::{IrradianceEncoding, LightProbeSettings};
use crate::resources::ProbeResourcePool;
use crate::scene::{ProbeScene, WorldProbe};
use registry::DirtyGridCell;

/// Probe data as seen by the shading pass (and by captures, which shade the
/// scene with the probes baked so far).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingInputs {
    pub reflection_atlas: Option<TextureHandle>,
    /// The *current* irradiance atlas.
    pub irradiance_atlas: Option<TextureHandle>,
    /// Cube probes to sample, world included. Zero disables probe lighting.
    pub active_cubes: u32,
    /// Grids to sample, world included.
    pub active_grids: u32,
    pub specular_enabled: bool,
    pub reflection_lod_max: f32,
    pub encoding: IrradianceEncoding,
}

impl Default for ShadingInputs {
    fn default() -> Self {
        Self {
            reflection_atlas: None,
            irradiance_atlas: None,
            active_cubes: 0,
            active_grids: 0,
            specular_enabled: true,
            reflection_lod_max: 0.0,
            encoding: IrradianceEncoding::default(),
        }
    }
}

impl ShadingInputs {
    /// Whether any baked probe data may be sampled.
    #[must_use]
    pub fn gi_enabled(&self) -> bool {
        self.active_cubes > 0 || self.active_grids > 0
    }
}

/// Owned light-probe context.
#[derive(Debug)]
pub struct LightProbes {
    settings: LightProbeSettings,
    registry: ProbeRegistry,
    pool: ProbeResourcePool,
    filter: ConvolutionFilter,
    capture: CaptureRenderer,
    scheduler: BakeScheduler,
    shading: ShadingInputs,
    world: WorldProbe,
    initialized: bool,
    gi_available: bool,
}

impl LightProbes {
    pub fn new(settings: LightProbeSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            registry: ProbeRegistry::new(&settings),
            pool: ProbeResourcePool::new(),
            filter: ConvolutionFilter::new(&settings),
            capture: CaptureRenderer::new(settings.capture_size),
            scheduler: BakeScheduler::new(settings.max_bounce),
            shading: ShadingInputs {
                encoding: settings.irradiance_encoding,
                ..Default::default()
            },
            world: WorldProbe::default(),
            initialized: false,
            gi_available: false,
            settings,
        })
    }

    /// Creates the sample table and capture targets.
    pub fn init(&mut self, backend: &mut dyn RenderBackend) -> Result<()> {
        self.filter.init(backend)?;
        self.pool.ensure_capture(backend, &self.settings)?;
        self.initialized = true;
        log::info!(
            "Light probes initialized (capture {}, atlas {}, {} bounces)",
            self.settings.capture_size,
            self.settings.atlas_size,
            self.settings.max_bounce
        );
        Ok(())
    }

    /// Per-frame scan of the scene; (re)allocates bake targets as needed.
    ///
    /// An allocation failure is not returned: probe lighting is disabled for
    /// this frame and allocation is retried on the next call.
    pub fn sync(&mut self, backend: &mut dyn RenderBackend, scene: &mut ProbeScene) -> Result<SyncReport> {
        if !self.initialized {
            return Err(ProbeError::NotInitialized);
        }

        let report = self.registry.sync(scene);
        self.scheduler.on_sync(&report);
        if report.world_changed {
            self.world = scene.world.clone();
        }

        match self.pool.ensure(backend, &self.settings, self.registry.cube_count()) {
            Ok(changes) => {
                if changes.any() {
                    log::info!("Probe bake targets reallocated, invalidating all probes");
                    self.registry.invalidate_all();
                    self.scheduler.invalidate();
                }
                self.gi_available = true;
            }
            Err(err) => {
                log::error!("Light probe allocation failed, disabling probe lighting: {err}");
                self.gi_available = false;
            }
        }

        self.update_shading_inputs();
        Ok(report)
    }

    /// Executes at most one bake unit. Returns whether a redraw is needed;
    /// `false` means every probe has converged.
    ///
    /// Bake failures are logged, not returned: a failed unit leaves its probe
    /// dirty and a redraw is still requested so it is retried on a later
    /// frame. The same holds while bake targets cannot be allocated.
    pub fn refresh(&mut self, backend: &mut dyn RenderBackend, paused: bool) -> Result<bool> {
        if !self.initialized {
            return Err(ProbeError::NotInitialized);
        }
        if !self.gi_available || !self.pool.is_complete() {
            return Ok(self.has_pending_work());
        }

        let unit = {
            let irradiance = self.pool.irradiance_mut()?;
            self.scheduler.plan(&mut self.registry, irradiance, paused)
        };
        let Some(unit) = unit else {
            self.update_shading_inputs();
            return Ok(false);
        };

        log::debug!("Baking {unit:?}");
        match self.execute(backend, &unit) {
            Ok(()) => self.scheduler.complete(&unit, &mut self.registry),
            Err(err) => log::error!("Light probe bake failed, retrying next frame: {err}"),
        }
        self.update_shading_inputs();
        Ok(true)
    }

    /// Whether any bake work remains, regardless of pause or allocation state.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.phase() != BakePhase::Idle
    }

    fn execute(&mut self, backend: &mut dyn RenderBackend, unit: &BakeUnit) -> Result<()> {
        match unit {
            BakeUnit::World => {
                self.capture
                    .render_world_to_probe(backend, &mut self.pool, &self.world)?;
                self.filter.glossy_filter(backend, &mut self.pool, 0)?;
                self.filter.diffuse_filter(backend, &mut self.pool, 0)?;
                // Both atlases hold the world cell so grids can start from either.
                self.pool.irradiance_mut()?.swap();
                self.filter.diffuse_filter(backend, &mut self.pool, 0)
            }
            BakeUnit::GridCell { cell, bounce } => {
                // Capture reads the last complete bounce while the new cell
                // lands in the atlas the shading pass samples.
                self.pool.irradiance_mut()?.swap();
                let result = self.bake_grid_cell(backend, cell, *bounce);
                self.pool.irradiance_mut()?.swap();
                result
            }
            BakeUnit::CubeProbe(cube) => {
                let mut shading = self.shading;
                self.capture.render_scene_to_probe(
                    backend,
                    &mut self.pool,
                    &mut shading,
                    cube.position,
                    cube.near,
                    cube.far,
                )?;
                self.filter
                    .glossy_filter(backend, &mut self.pool, cube.index as u32)
            }
        }
    }

    fn bake_grid_cell(&mut self, backend: &mut dyn RenderBackend, cell: &DirtyGridCell, bounce: u32) -> Result<()> {
        let Self {
            capture,
            pool,
            filter,
            shading,
            ..
        } = self;

        shading.irradiance_atlas = Some(*pool.irradiance()?.current());
        {
            // Probes never light themselves; bounce 0 sees the world only.
            let mut inputs = ShadingOverride::new(shading, |s| {
                s.active_cubes = 0;
                if bounce == 0 {
                    s.active_grids = 0;
                }
            });
            capture.render_scene_to_probe(backend, pool, &mut inputs, cell.position, cell.near, cell.far)?;
        }
        filter.diffuse_filter(backend, pool, cell.offset)
    }

    fn update_shading_inputs(&mut self) {
        let (active_cubes, active_grids) = if self.gi_available {
            (
                self.scheduler
                    .active_cubes()
                    .min(self.registry.cube_count() as u32),
                self.scheduler
                    .active_grids()
                    .min(self.registry.grid_count() as u32),
            )
        } else {
            (0, 0)
        };

        self.shading = ShadingInputs {
            reflection_atlas: self.pool.reflection_atlas().ok(),
            irradiance_atlas: self.pool.irradiance().ok().map(|pp| *pp.current()),
            active_cubes,
            active_grids,
            specular_enabled: true,
            reflection_lod_max: self.filter.lod_max(),
            encoding: self.settings.irradiance_encoding,
        };
    }

    /// Frees every GPU resource. The context may be re-initialized.
    pub fn teardown(&mut self, backend: &mut dyn RenderBackend) {
        self.pool.release(backend);
        self.filter.release(backend);
        self.registry = ProbeRegistry::new(&self.settings);
        self.scheduler = BakeScheduler::new(self.settings.max_bounce);
        self.shading = ShadingInputs {
            encoding: self.settings.irradiance_encoding,
            ..Default::default()
        };
        self.initialized = false;
        self.gi_available = false;
        log::info!("Light probes torn down");
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn shading_inputs(&self) -> &ShadingInputs {
        &self.shading
    }

    /// Packed cube probe table, slot 0 = world.
    #[must_use]
    pub fn cube_table(&self) -> &[CubeProbeData] {
        self.registry.cube_table()
    }

    /// Packed grid table, slot 0 = world.
    #[must_use]
    pub fn grid_table(&self) -> &[GridData] {
        self.registry.grid_table()
    }

    #[must_use]
    pub fn display_list(&self) -> Vec<ProbeDisplay> {
        self.registry.display_list()
    }

    #[must_use]
    pub fn phase(&self) -> BakePhase {
        self.scheduler.phase(&self.registry)
    }

    #[must_use]
    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    #[must_use]
    pub fn scheduler(&self) -> &BakeScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn pool(&self) -> &ProbeResourcePool {
        &self.pool
    }

    #[must_use]
    pub fn settings(&self) -> &LightProbeSettings {
        &self.settings
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether bake targets exist this frame.
    #[must_use]
    pub fn gi_available(&self) -> bool {
        self.gi_available
    }
}
