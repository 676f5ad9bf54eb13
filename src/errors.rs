//! Error Types
//!
//! This module defines the error types used throughout the scene graph.
//!
//! # Overview
//!
//! The main error type [`StrataError`] covers the conditions a caller may want
//! to react to:
//! - Component lifecycle failures (duplicate ids)
//! - Lookups of ids or handles that no longer resolve
//! - Invalid enumerated values and hierarchy edits
//! - Configuration loading
//!
//! Most validation problems inside setters are *not* returned: they are
//! logged and the operation is downgraded to a safe default so the scene
//! stays renderable. Only constructors and loaders return [`Result<T>`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use strata::errors::{StrataError, Result};
//!
//! fn build(scene: &mut Scene) -> Result<()> {
//!     let t = scene.create_transform(TransformDesc::default())?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the Strata scene graph.
#[derive(Error, Debug)]
pub enum StrataError {
    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// A component with this id already exists in the scene.
    #[error("Component id '{0}' is already in use")]
    DuplicateId(String),

    /// The scene has been destroyed and no longer accepts components.
    #[error("Scene {0} has been destroyed")]
    SceneDestroyed(u32),

    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// No component with this id exists in the scene.
    #[error("Component not found: '{0}'")]
    ComponentNotFound(String),

    /// A typed handle no longer refers to a live component.
    #[error("Stale {0} handle")]
    StaleHandle(&'static str),

    /// The component exists but has the wrong type for this use.
    #[error("Component '{id}' is a {found}, expected {expected}")]
    TypeMismatch {
        /// Id of the offending component
        id: String,
        /// Type name the operation required
        expected: &'static str,
        /// Type name actually registered
        found: &'static str,
    },

    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// Unsupported geometry primitive name.
    #[error("Unsupported primitive: '{0}'")]
    InvalidPrimitive(String),

    /// Unsupported buffer usage name.
    #[error("Unsupported usage: '{0}'")]
    InvalidUsage(String),

    /// Unsupported clip mode name.
    #[error("Unsupported clip mode: '{0}'")]
    InvalidClipMode(String),

    /// Unsupported light space name.
    #[error("Unsupported light space: '{0}'")]
    InvalidLightSpace(String),

    /// Re-parenting would make a transform its own ancestor.
    #[error("Transform '{0}' cannot be parented under its own descendant")]
    HierarchyCycle(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Alias for `Result<T, StrataError>`.
pub type Result<T> = std::result::Result<T, StrataError>;
