//! Marching Cubes iso-surface extraction.
//!
//! Walks every unit cell of the grid, classifies its eight corners against the
//! iso-value, and emits triangles from the fixed lookup tables in
//! [`crate::tables`]. Positions and normals are interpolated linearly along
//! each crossed edge. Output is a non-indexed triangle soup.

#![allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]

use std::time::Instant;

use glam::{UVec3, Vec3};

use crate::attributes::VolumeAttributes;
use crate::error::{IsoError, Result};
use crate::gradient::GradientField;
use crate::mesh::{IsoSurfaceMesh, MeshVertex};
use crate::tables::{CORNER_OFFSETS, EDGE_CORNERS, EDGE_TABLE, TRI_TABLE};
use crate::volume::RawVolume;

/// Tolerance for treating two scalar values as equal during interpolation.
pub const EPSILON: f32 = 1e-5;

/// One cell corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voxel {
    /// Grid-space integer coordinates.
    pub position: Vec3,
    /// Gradient at this grid point.
    pub normal: Vec3,
    /// Scalar value at this grid point.
    pub value: f32,
}

/// The eight corners of a unit cell, in table order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub corners: [Voxel; 8],
}

impl GridCell {
    /// Gathers the cell whose lowest corner is `(i, j, k)`.
    #[must_use]
    pub fn gather(volume: &RawVolume, gradient: &GradientField, i: u32, j: u32, k: u32) -> Self {
        let corners = CORNER_OFFSETS.map(|[dx, dy, dz]| {
            let (x, y, z) = (i + dx, j + dy, k + dz);
            Voxel {
                position: UVec3::new(x, y, z).as_vec3(),
                normal: gradient.normal(x, y, z),
                value: volume.value(x, y, z),
            }
        });
        Self { corners }
    }

    /// Bit `v` is set when corner `v` lies strictly above the iso-value.
    #[must_use]
    pub fn cube_index(&self, iso_value: f32) -> u8 {
        self.corners
            .iter()
            .enumerate()
            .filter(|(_, corner)| corner.value > iso_value)
            .fold(0u8, |index, (v, _)| index | (1 << v))
    }
}

/// How an edge crossing was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingKind {
    /// The iso-value equals the first corner's value.
    AtStart,
    /// The iso-value equals the second corner's value.
    AtEnd,
    /// Both corners hold the same value; the first corner is used.
    Degenerate,
    /// Regular linear interpolation.
    Interpolated,
}

/// Where the surface crosses an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCrossing {
    pub position: Vec3,
    pub normal: Vec3,
    pub kind: CrossingKind,
}

/// Interpolates position and normal between `a` and `b` at `iso_value`.
#[must_use]
pub fn interpolate(iso_value: f32, a: &Voxel, b: &Voxel) -> EdgeCrossing {
    let at = |voxel: &Voxel, kind| EdgeCrossing {
        position: voxel.position,
        normal: voxel.normal,
        kind,
    };

    if (iso_value - a.value).abs() < EPSILON {
        return at(a, CrossingKind::AtStart);
    }
    if (iso_value - b.value).abs() < EPSILON {
        return at(b, CrossingKind::AtEnd);
    }
    if (a.value - b.value).abs() < EPSILON {
        return at(a, CrossingKind::Degenerate);
    }

    let t = (iso_value - a.value) / (b.value - a.value);
    EdgeCrossing {
        position: a.position + t * (b.position - a.position),
        normal: a.normal + t * (b.normal - a.normal),
        kind: CrossingKind::Interpolated,
    }
}

/// Emits the triangles of one cell into `mesh`.
///
/// Positions are scaled by `ratio`; normals are normalized. Returns the number
/// of triangles emitted.
pub fn polygonise(cell: &GridCell, iso_value: f32, ratio: Vec3, mesh: &mut IsoSurfaceMesh) -> usize {
    let cube_index = usize::from(cell.cube_index(iso_value));
    let edges = EDGE_TABLE[cube_index];
    if edges == 0 {
        return 0;
    }

    let mut crossings = [None::<EdgeCrossing>; 12];
    for (edge, [a, b]) in EDGE_CORNERS.iter().enumerate() {
        if edges & (1 << edge) != 0 {
            let crossing = interpolate(iso_value, &cell.corners[*a], &cell.corners[*b]);
            if crossing.kind == CrossingKind::Degenerate {
                mesh.add_degenerate_edge();
            }
            crossings[edge] = Some(crossing);
        }
    }

    let mut emitted = 0;
    for triple in TRI_TABLE[cube_index].chunks_exact(3) {
        if triple[0] < 0 {
            break;
        }
        let vertex = |edge: i8| {
            // The tables only reference edges flagged in EDGE_TABLE.
            let crossing = crossings[edge as usize].unwrap_or(EdgeCrossing {
                position: Vec3::ZERO,
                normal: Vec3::ZERO,
                kind: CrossingKind::Degenerate,
            });
            MeshVertex {
                position: (crossing.position * ratio).to_array(),
                normal: crossing.normal.normalize_or_zero().to_array(),
            }
        };
        mesh.push_triangle([vertex(triple[0]), vertex(triple[1]), vertex(triple[2])]);
        emitted += 1;
    }
    emitted
}

/// Extracts the iso-surface of `volume` at `iso_value`.
///
/// Each call is a full pass over all `(nx-1)(ny-1)(nz-1)` cells.
pub fn triangulate(
    volume: &RawVolume,
    gradient: &GradientField,
    attributes: &VolumeAttributes,
    iso_value: f32,
) -> Result<IsoSurfaceMesh> {
    let resolution = volume.resolution();
    for actual in [gradient.resolution(), attributes.resolution] {
        if actual != resolution {
            return Err(IsoError::ResolutionMismatch {
                expected: resolution,
                actual,
            });
        }
    }
    attributes.validate()?;

    log::debug!("generating iso-surface vertices at iso-value {iso_value}");
    let start = Instant::now();
    let mut mesh = IsoSurfaceMesh::new(iso_value, volume.len());

    for k in 0..resolution.z - 1 {
        for j in 0..resolution.y - 1 {
            for i in 0..resolution.x - 1 {
                let cell = GridCell::gather(volume, gradient, i, j, k);
                polygonise(&cell, iso_value, attributes.ratio, &mut mesh);
            }
        }
    }

    mesh.set_elapsed(start.elapsed());
    if mesh.degenerate_edges() > 0 {
        log::debug!(
            "{} flat edges resolved to their first corner",
            mesh.degenerate_edges()
        );
    }
    log::info!(
        "iso-surface at {iso_value}: {} triangles in {:.3}s",
        mesh.triangle_count(),
        mesh.elapsed().as_secs_f64()
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pipeline(samples: Vec<f32>, resolution: UVec3) -> (RawVolume, GradientField, VolumeAttributes) {
        let attributes = VolumeAttributes::new(resolution);
        let volume = RawVolume::from_samples(samples, resolution).unwrap();
        let gradient = GradientField::compute(&volume, &attributes, 256.0).unwrap();
        (volume, gradient, attributes)
    }

    fn voxel(position: Vec3, value: f32) -> Voxel {
        Voxel {
            position,
            normal: Vec3::Y,
            value,
        }
    }

    #[test]
    fn test_single_cell_horizontal_plane() {
        let (volume, gradient, attributes) =
            pipeline(vec![0.0, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0, 10.0], UVec3::splat(2));
        let mesh = triangulate(&volume, &gradient, &attributes, 5.0).unwrap();

        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 6);
        for vertex in mesh.as_vertices() {
            assert!((vertex.position[2] - 0.5).abs() < 1e-6);
            assert!((vertex.normal() - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn test_uniform_volume_is_empty() {
        let (volume, gradient, attributes) = pipeline(vec![100.0; 64], UVec3::splat(4));
        let mesh = triangulate(&volume, &gradient, &attributes, 50.0).unwrap();
        assert!(mesh.is_empty());
        assert_eq!(mesh.voxel_count(), 64);
    }

    #[test]
    fn test_everything_below_iso_value_is_empty() {
        let (volume, gradient, attributes) = pipeline(vec![1.0; 27], UVec3::splat(3));
        let mesh = triangulate(&volume, &gradient, &attributes, 50.0).unwrap();
        assert_eq!(mesh.vertex_count(), 0);
    }

    #[test]
    fn test_single_corner_above() {
        let mut samples = vec![0.0; 8];
        samples[0] = 10.0;
        let (volume, gradient, attributes) = pipeline(samples, UVec3::splat(2));
        let mesh = triangulate(&volume, &gradient, &attributes, 5.0).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_positions_scaled_by_ratio() {
        let resolution = UVec3::splat(2);
        let attributes = VolumeAttributes::new(resolution).with_ratio(Vec3::new(1.0, 1.0, 4.0));
        let volume =
            RawVolume::from_samples(vec![0.0, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0, 10.0], resolution)
                .unwrap();
        let gradient = GradientField::compute(&volume, &attributes, 256.0).unwrap();
        let mesh = triangulate(&volume, &gradient, &attributes, 5.0).unwrap();
        assert!(mesh.positions().all(|p| (p.z - 2.0).abs() < 1e-6));
    }

    #[test]
    fn test_cube_index_is_strict() {
        let (volume, gradient, _) =
            pipeline(vec![5.0, 6.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0], UVec3::splat(2));
        let cell = GridCell::gather(&volume, &gradient, 0, 0, 0);
        // Sample (1,0,0) is corner 1 in table order.
        assert_eq!(cell.cube_index(5.0), 0b0000_0010);
        assert_eq!(cell.cube_index(4.0), 0xff);
    }

    #[test]
    fn test_gather_uses_table_corner_order() {
        let (volume, gradient, _) = pipeline((0..8).map(|v| v as f32).collect(), UVec3::splat(2));
        let cell = GridCell::gather(&volume, &gradient, 0, 0, 0);
        let values: Vec<f32> = cell.corners.iter().map(|c| c.value).collect();
        // Flat index of (x, y, z) is x + 2y + 4z.
        assert_eq!(values, vec![0.0, 1.0, 5.0, 4.0, 2.0, 3.0, 7.0, 6.0]);
        assert_eq!(cell.corners[2].position, Vec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn test_interpolation_endpoints() {
        let a = voxel(Vec3::ZERO, 2.0);
        let b = voxel(Vec3::X, 8.0);

        let start = interpolate(2.0, &a, &b);
        assert_eq!(start.kind, CrossingKind::AtStart);
        assert_eq!(start.position, Vec3::ZERO);

        let end = interpolate(8.0, &a, &b);
        assert_eq!(end.kind, CrossingKind::AtEnd);
        assert_eq!(end.position, Vec3::X);

        let mid = interpolate(5.0, &a, &b);
        assert_eq!(mid.kind, CrossingKind::Interpolated);
        assert!((mid.position - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_flat_edge_picks_first_corner() {
        let a = voxel(Vec3::ZERO, 3.0);
        let b = voxel(Vec3::X, 3.0);
        let crossing = interpolate(7.0, &a, &b);
        assert_eq!(crossing.kind, CrossingKind::Degenerate);
        assert_eq!(crossing.position, Vec3::ZERO);
    }

    #[test]
    fn test_mismatched_gradient_is_rejected() {
        let (volume, _, attributes) = pipeline(vec![0.0; 8], UVec3::splat(2));
        let (_, other_gradient, _) = pipeline(vec![0.0; 27], UVec3::splat(3));
        assert!(matches!(
            triangulate(&volume, &other_gradient, &attributes, 0.5),
            Err(IsoError::ResolutionMismatch { .. })
        ));
    }

    #[test]
    fn test_transposed_gradient_is_rejected() {
        let (volume, _, attributes) = pipeline(vec![0.0; 16], UVec3::new(2, 4, 2));
        let (_, transposed, _) = pipeline(vec![0.0; 16], UVec3::new(4, 2, 2));
        assert!(matches!(
            triangulate(&volume, &transposed, &attributes, 0.5),
            Err(IsoError::ResolutionMismatch { expected, actual })
                if expected == UVec3::new(2, 4, 2) && actual == UVec3::new(4, 2, 2)
        ));
    }

    #[test]
    fn test_sphere_surface() {
        let n = 16u32;
        let center = Vec3::splat((n - 1) as f32 / 2.0);
        let volume = RawVolume::from_fn(UVec3::splat(n), |x, y, z| {
            let d = (UVec3::new(x, y, z).as_vec3() - center).length();
            (255.0 - d * 30.0).max(0.0)
        })
        .unwrap();
        let attributes = VolumeAttributes::new(UVec3::splat(n));
        let gradient = GradientField::compute(&volume, &attributes, 256.0).unwrap();
        let mesh = triangulate(&volume, &gradient, &attributes, 105.0).unwrap();

        assert!(mesh.triangle_count() > 50);
        // iso 105 <=> distance 5 from the center.
        for p in mesh.positions() {
            assert!(((p - center).length() - 5.0).abs() < 1.0, "{p:?}");
        }
        // Gradients point toward increasing values, i.e. inward.
        for vertex in mesh.as_vertices() {
            let outward = (vertex.position() - center).normalize();
            assert!(vertex.normal().dot(outward) < 0.0);
        }
    }

    proptest! {
        #[test]
        fn triangle_lists_are_complete(
            samples in prop::collection::vec(0u8..=255, 27),
            iso_value in 0.0f32..255.0,
        ) {
            let samples: Vec<f32> = samples.into_iter().map(f32::from).collect();
            let (volume, gradient, attributes) = pipeline(samples, UVec3::splat(3));
            let mesh = triangulate(&volume, &gradient, &attributes, iso_value).unwrap();
            prop_assert_eq!(mesh.vertices().len() % 6, 0);
            prop_assert_eq!(mesh.vertex_count() % 3, 0);
        }
    }
}
