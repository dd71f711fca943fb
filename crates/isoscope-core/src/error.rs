//! Error types for isoscope.

use std::path::PathBuf;

use glam::{UVec3, Vec3};
use thiserror::Error;

/// The main error type for isoscope operations.
#[derive(Error, Debug)]
pub enum IsoError {
    /// No volume has been loaded yet.
    #[error("volume data not loaded - call load() first")]
    NotInitialized,

    /// The iso-surface has not been generated yet.
    #[error("iso-surface not generated - call convert_to_polygon() first")]
    MeshNotReady,

    /// A volume file could not be opened or read.
    #[error("failed to load '{path}': {source}")]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A recognized line of the info file could not be parsed.
    #[error("invalid info file, line {line}: {message}")]
    InvalidInfo { line: usize, message: String },

    /// The info file never declared a resolution.
    #[error("info file has no resolution entry")]
    MissingResolution,

    /// Every axis needs at least two samples to form a cell.
    #[error("invalid resolution {x}x{y}x{z}: every axis must be greater than 1")]
    InvalidResolution { x: u32, y: u32, z: u32 },

    /// Voxel spacing must be finite and positive on every axis.
    #[error("invalid voxel size {0}: every component must be finite and greater than 0")]
    InvalidRatio(Vec3),

    /// Two grids that must line up have different shapes.
    #[error("resolution mismatch: expected {expected}, got {actual}")]
    ResolutionMismatch { expected: UVec3, actual: UVec3 },

    /// Samples must be finite and non-negative.
    #[error("sample {index} has invalid value {value}")]
    InvalidSample { index: usize, value: f32 },

    /// Histograms need at least one bucket.
    #[error("invalid histogram interval {0}: must be at least 1")]
    InvalidInterval(u32),

    /// Equalization only works on integer samples in `[0, 255]`.
    #[error("sample {index} has value {value}, outside the equalization range [0, 255]")]
    EqualizationOutOfRange { index: usize, value: f32 },

    /// Rejected configuration.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for isoscope operations.
pub type Result<T> = std::result::Result<T, IsoError>;
