//! Error types for geb-solver.
//!
//! Every variant is fatal for the running evaluate call: these conditions
//! indicate framework-integration bugs or numerical breakdown, and silently
//! substituting values would corrupt the surrounding nonlinear solve. The
//! driver is expected to abort on any of them.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BeamError>;

#[derive(Error, Debug)]
pub enum BeamError {
    #[error("element {element}: {what} has wrong size (expected {expected}, got {got})")]
    SizeMismatch {
        element: i32,
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("element {element}: evaluate called before reference geometry was set up")]
    NotInitialized { element: i32 },

    #[error("element {element}: reference geometry set up twice")]
    AlreadyInitialized { element: i32 },

    #[error("element {element}: unsupported configuration: {what}")]
    Unsupported { element: i32, what: String },

    #[error("element {element}: numerical degeneracy in {what}")]
    NumericalDegeneracy { element: i32, what: String },

    #[error("unpack type tag mismatch: expected {expected}, got {got}")]
    TypeTagMismatch { expected: String, got: String },

    #[error("unpack schema version mismatch: expected {expected}, got {got}")]
    SchemaVersionMismatch { expected: u32, got: u32 },

    #[error("no constitutive law registered under material id {id}")]
    UnknownMaterial { id: u32 },

    #[error("triad interpolation failed: {0}")]
    Fem(#[from] geb_fem::FemError),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
