//! isoscope: iso-surface extraction from raw volume data.
//!
//! Loads a regular 3D grid of 8-bit samples described by a small info file,
//! analyzes its scalar and gradient distributions, and extracts iso-surfaces
//! with marching cubes into an interleaved position/normal triangle list
//! ready for upload by a renderer.
//!
//! # Quick Start
//!
//! ```no_run
//! use isoscope::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let mut surface = IsoSurface::from_files("engine.inf", "engine.raw")?;
//!     surface.set_iso_value(80.0);
//!     let mesh = surface.convert_to_polygon()?;
//!     println!("{} triangles", mesh.triangle_count());
//!
//!     println!("{}", surface.debug_report()?);
//!     Ok(())
//! }
//! ```
//!
//! # Pipeline
//!
//! - [`VolumeAttributes`] - resolution, voxel ratio and sample format from the info file
//! - [`RawVolume`] - the scalar samples, x fastest then y then z
//! - [`GradientField`] - per-voxel gradients and decibel-compressed magnitudes
//! - [`Histogram`] / [`Heatmap`] - value and gradient distributions
//! - [`IsoSurfaceMesh`] - the marching cubes output

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
// Accessors return plain values which don't need must_use
#![allow(clippy::must_use_candidate)]

mod init;
mod iso_surface;

pub use init::init_logging;
pub use iso_surface::IsoSurface;

// Re-export core types
pub use isoscope_core::{
    attributes::{DataType, Endian, VolumeAttributes},
    error::{IsoError, Result},
    gradient::GradientField,
    histogram::{Bin, Equalization, Heatmap, HeatmapAxis, Histogram, LEVELS},
    mesh::{IsoSurfaceMesh, MeshStatistics, MeshVertex, FLOATS_PER_VERTEX},
    options::Options,
    transfer_function::TransferFunction,
    volume::RawVolume,
    UVec3, Vec3, Vec4,
};

// Lower-level building blocks for callers driving the pipeline themselves
pub use isoscope_core::{load_info_file, load_raw_file, marching_cubes, triangulate};
