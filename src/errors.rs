//! Error Types
//!
//! This module defines the error types used by the light-probe subsystem.
//!
//! # Overview
//!
//! The main error type [`ProbeError`] covers the failure modes of baking:
//! - GPU resource allocation failures (render targets, atlases)
//! - Missing shaders or resources at draw time
//! - Irradiance atlas overflow
//! - Invalid settings and lifecycle misuse
//!
//! Capacity overflow of the probe registry is *not* an error: the offending
//! object is skipped with a logged diagnostic.
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, ProbeError>`.
//!
//! ```rust,ignore
//! use myth_lightprobes::errors::{ProbeError, Result};
//!
//! fn bake_step() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for light-probe baking.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    // ========================================================================
    // GPU & Rendering Errors
    // ========================================================================
    /// A render target or atlas could not be created.
    #[error("Failed to allocate {label}: {reason}")]
    ResourceAllocation {
        /// Debug label of the resource
        label: String,
        /// Backend-provided reason
        reason: String,
    },

    /// A resource required by a pass is not (yet) available.
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(&'static str),

    /// The requested shader variant could not be compiled or bound.
    #[error("Shader unavailable: {0}")]
    ShaderUnavailable(String),

    // ========================================================================
    // Atlas Errors
    // ========================================================================
    /// A cell offset does not fit in the irradiance atlas.
    #[error("Irradiance atlas full: cell offset {offset} exceeds capacity {capacity}")]
    IrradianceAtlasFull {
        /// Requested cell offset
        offset: u32,
        /// Number of cells the atlas can hold
        capacity: u32,
    },

    // ========================================================================
    // Configuration & Lifecycle Errors
    // ========================================================================
    /// Settings failed validation.
    #[error("Invalid light probe settings: {0}")]
    InvalidSettings(String),

    /// An operation was called before `init` or after `teardown`.
    #[error("Light probes not initialized")]
    NotInitialized,
}

/// Alias for `Result<T, ProbeError>`.
pub type Result<T> = std::result::Result<T, ProbeError>;
