//! # Myth Light Probes
//!
//! Incremental baking of reflection probes and irradiance grids for the
//! Myth engine.
//!
//! Baking a probe means rendering the scene six times and convolving the
//! result, far too much for one frame when a scene holds dozens of probes and
//! thousands of grid cells. [`LightProbes`] spreads that work over frames,
//! one capture per frame, converging over several diffuse bounces while the
//! renderer keeps shading with whatever has been baked so far.
//!
//! ## Modules
//!
//! - [`scene`]: the probe objects and world the baker consumes
//! - [`lightprobes`]: registry, capture, filters, scheduler and the
//!   [`LightProbes`] context
//! - [`resources`]: bake targets and the irradiance ping-pong buffer
//! - [`renderer`]: backend abstraction, wgpu backend, settings
//! - [`errors`]: [`ProbeError`] and [`Result`]

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod lightprobes;
pub mod renderer;
pub mod resources;
pub mod scene;

pub use errors::{ProbeError, Result};
pub use lightprobes::{BakePhase, BakeUnit, CubeProbeData, GridData, LightProbes, ShadingInputs, SyncReport};
pub use renderer::{LightProbeSettings, IrradianceEncoding, RenderBackend, SceneDrawer, WgpuBackend};
pub use scene::{LightProbe, ProbeObject, ProbeObjectId, ProbeScene, WorldProbe};
