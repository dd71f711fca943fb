//! Core building blocks for isoscope.
//!
//! This crate holds the data types and algorithms behind iso-surface extraction:
//! - [`VolumeAttributes`] and the info-file parser, [`RawVolume`] for 8-bit samples
//! - [`GradientField`] with decibel-compressed magnitudes
//! - [`Histogram`], [`Heatmap`] and [`Equalization`] for transfer-function design
//! - [`triangulate`], the marching cubes pass producing an [`IsoSurfaceMesh`]

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Accessors return plain values which don't need must_use
#![allow(clippy::must_use_candidate)]
// Grid coordinates are conventionally named i, j, k and x, y, z
#![allow(clippy::many_single_char_names)]
#![allow(clippy::similar_names)]

pub mod attributes;
pub mod error;
pub mod gradient;
pub mod histogram;
pub mod loader;
pub mod marching_cubes;
pub mod mesh;
pub mod options;
pub mod tables;
pub mod transfer_function;
pub mod volume;

pub use attributes::{DataType, Endian, VolumeAttributes};
pub use error::{IsoError, Result};
pub use gradient::{compress_magnitude, GradientField};
pub use histogram::{level_counts, Bin, Equalization, Heatmap, HeatmapAxis, Histogram, LEVELS};
pub use loader::{load_info_file, load_raw_file};
pub use marching_cubes::{interpolate, polygonise, triangulate, CrossingKind, EdgeCrossing, GridCell, Voxel};
pub use mesh::{IsoSurfaceMesh, MeshStatistics, MeshVertex, FLOATS_PER_VERTEX};
pub use options::Options;
pub use transfer_function::{save_description, write_description, Description, TransferFunction};
pub use volume::{flatten_index, unflatten_index, RawVolume};

// Re-export glam types for convenience
pub use glam::{UVec3, Vec3, Vec4};
