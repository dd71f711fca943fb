//! Triangle-soup output of the marching cubes pass.

#![allow(clippy::cast_precision_loss)]

use std::fmt;
use std::time::Duration;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Floats per vertex in the interleaved buffer: position then normal.
pub const FLOATS_PER_VERTEX: usize = 6;

/// One vertex of the interleaved buffer, laid out for direct GPU upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    /// Position as a vector.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    /// Normal as a vector.
    #[must_use]
    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }
}

/// A non-indexed triangle list with interleaved `(px, py, pz, nx, ny, nz)`
/// vertices. Every three consecutive vertices form one triangle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IsoSurfaceMesh {
    vertices: Vec<f32>,
    iso_value: f32,
    voxel_count: usize,
    degenerate_edges: usize,
    elapsed: Duration,
}

impl IsoSurfaceMesh {
    /// Creates an empty mesh for the given pass parameters.
    #[must_use]
    pub fn new(iso_value: f32, voxel_count: usize) -> Self {
        Self {
            iso_value,
            voxel_count,
            ..Self::default()
        }
    }

    /// Appends one full triangle.
    pub(crate) fn push_triangle(&mut self, triangle: [MeshVertex; 3]) {
        for vertex in triangle {
            self.vertices.extend_from_slice(&vertex.position);
            self.vertices.extend_from_slice(&vertex.normal);
        }
    }

    pub(crate) fn add_degenerate_edge(&mut self) {
        self.degenerate_edges += 1;
    }

    pub(crate) fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    /// The flat interleaved buffer.
    #[must_use]
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// The buffer viewed as vertices.
    #[must_use]
    pub fn as_vertices(&self) -> &[MeshVertex] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Iterates over triangles.
    pub fn triangles(&self) -> impl Iterator<Item = &[MeshVertex]> + '_ {
        self.as_vertices().chunks_exact(3)
    }

    /// Iterates over vertex positions.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.as_vertices().iter().map(MeshVertex::position)
    }

    /// Iterates over vertex normals.
    pub fn normals(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.as_vertices().iter().map(MeshVertex::normal)
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / FLOATS_PER_VERTEX
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.vertex_count() / 3
    }

    /// Number of stored positions (one per vertex).
    #[must_use]
    pub fn position_count(&self) -> usize {
        self.vertex_count()
    }

    /// Number of stored normals (one per vertex).
    #[must_use]
    pub fn normal_count(&self) -> usize {
        self.vertex_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iso-value the mesh was extracted at.
    #[must_use]
    pub fn iso_value(&self) -> f32 {
        self.iso_value
    }

    /// Number of voxels in the source volume.
    #[must_use]
    pub fn voxel_count(&self) -> usize {
        self.voxel_count
    }

    /// Edges resolved by the flat-edge tie-break during the last pass.
    #[must_use]
    pub fn degenerate_edges(&self) -> usize {
        self.degenerate_edges
    }

    /// Wall-clock time of the last pass.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Snapshot of the mesh counters.
    #[must_use]
    pub fn statistics(&self, gradient_magnitude_count: usize) -> MeshStatistics {
        MeshStatistics {
            voxel_count: self.voxel_count,
            triangle_count: self.triangle_count(),
            vertex_count: self.vertex_count(),
            position_count: self.position_count(),
            normal_count: self.normal_count(),
            gradient_magnitude_count,
            degenerate_edges: self.degenerate_edges,
            elapsed_seconds: self.elapsed.as_secs_f64(),
        }
    }
}

/// Read-only counters describing the last triangulation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshStatistics {
    pub voxel_count: usize,
    pub triangle_count: usize,
    pub vertex_count: usize,
    pub position_count: usize,
    pub normal_count: usize,
    pub gradient_magnitude_count: usize,
    pub degenerate_edges: usize,
    pub elapsed_seconds: f64,
}

impl fmt::Display for MeshStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Construct Method: Marching Cubes")?;
        writeln!(f, "Voxel Count: {}", self.voxel_count)?;
        writeln!(f, "Triangle Count: {}", self.triangle_count)?;
        writeln!(f, "Vertex Count: {}", self.vertex_count)?;
        writeln!(f, "Position Count: {}", self.position_count)?;
        writeln!(f, "Normal Count: {}", self.normal_count)?;
        writeln!(f, "Gradient Magnitudes Count: {}", self.gradient_magnitude_count)?;
        writeln!(f, "Degenerate Edges: {}", self.degenerate_edges)?;
        write!(f, "Elapsed time: {:.6} (seconds)", self.elapsed_seconds)
    }
}
