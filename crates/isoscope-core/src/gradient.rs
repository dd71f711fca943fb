//! Per-voxel gradients and compressed gradient magnitudes.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use glam::{UVec3, Vec3};

use crate::attributes::VolumeAttributes;
use crate::error::{IsoError, Result};
use crate::volume::{flatten_index, RawVolume};

/// Gradient vectors and their decibel-compressed lengths, one per voxel.
///
/// Uses the same flat indexing as [`RawVolume`].
#[derive(Debug, Clone, PartialEq)]
pub struct GradientField {
    resolution: UVec3,
    normals: Vec<Vec3>,
    magnitudes: Vec<f32>,
}

impl GradientField {
    /// Computes the gradient at every voxel.
    ///
    /// Each axis uses a forward difference on its lower boundary, a backward
    /// difference on its upper boundary and a central difference elsewhere.
    /// The central difference is `(V[i+1] - V[i-1]) / 2 * ratio`, with the
    /// ratio as a multiplier, while the one-sided differences divide by it.
    ///
    /// Magnitudes are `20 * log2(len)` with `len` clamped to `[1, max_gradient]`.
    pub fn compute(
        volume: &RawVolume,
        attributes: &VolumeAttributes,
        max_gradient: f32,
    ) -> Result<Self> {
        let resolution = volume.resolution();
        if attributes.resolution != resolution {
            return Err(IsoError::ResolutionMismatch {
                expected: attributes.resolution,
                actual: resolution,
            });
        }
        attributes.validate()?;

        let ratio = attributes.ratio;
        let samples = volume.samples();
        let n = [
            i64::from(resolution.x),
            i64::from(resolution.y),
            i64::from(resolution.z),
        ];
        let at = |i: i64, j: i64, k: i64| {
            samples[flatten_index(resolution, i as u32, j as u32, k as u32)]
        };

        let mut normals = Vec::with_capacity(volume.len());
        let mut magnitudes = Vec::with_capacity(volume.len());

        for k in 0..n[2] {
            for j in 0..n[1] {
                for i in 0..n[0] {
                    let gx = axis_difference(i, n[0], ratio.x, |d| at(i + d, j, k));
                    let gy = axis_difference(j, n[1], ratio.y, |d| at(i, j + d, k));
                    let gz = axis_difference(k, n[2], ratio.z, |d| at(i, j, k + d));
                    let normal = Vec3::new(gx, gy, gz);

                    magnitudes.push(compress_magnitude(normal.length(), max_gradient));
                    normals.push(normal);
                }
            }
        }

        log::debug!(
            "computed {} gradients (max_gradient = {max_gradient})",
            normals.len()
        );

        Ok(Self {
            resolution,
            normals,
            magnitudes,
        })
    }

    /// Grid resolution the field was computed for.
    #[must_use]
    pub fn resolution(&self) -> UVec3 {
        self.resolution
    }

    /// Un-normalized gradient vectors.
    #[must_use]
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    /// Compressed gradient magnitudes.
    #[must_use]
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Gradient at a grid point.
    #[must_use]
    pub fn normal(&self, x: u32, y: u32, z: u32) -> Vec3 {
        self.normals[flatten_index(self.resolution, x, y, z)]
    }

    /// Number of voxels covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.normals.len()
    }

    /// True when the field covers no voxels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.normals.is_empty()
    }
}

/// Derivative along one axis at position `p` of an axis with `n` samples.
///
/// `sample(d)` returns the value at offset `d` from the current voxel.
fn axis_difference(p: i64, n: i64, ratio: f32, sample: impl Fn(i64) -> f32) -> f32 {
    if p + 1 >= n {
        (sample(0) - sample(-1)) / ratio
    } else if p - 1 < 0 {
        (sample(1) - sample(0)) / ratio
    } else {
        (sample(1) - sample(-1)) / 2.0 * ratio
    }
}

/// `20 * log2(len)` with `len` clamped to `[1, max_gradient]`. NaN counts as 1.
#[must_use]
pub fn compress_magnitude(length: f32, max_gradient: f32) -> f32 {
    let length = if length.is_nan() || length < 1.0 {
        1.0
    } else if length > max_gradient {
        max_gradient
    } else {
        length
    };
    20.0 * length.log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attributes(resolution: UVec3) -> VolumeAttributes {
        VolumeAttributes::new(resolution)
    }

    #[test]
    fn test_constant_volume_has_zero_gradient() {
        let resolution = UVec3::new(4, 3, 5);
        let volume = RawVolume::from_fn(resolution, |_, _, _| 42.0).unwrap();
        let field = GradientField::compute(&volume, &attributes(resolution), 256.0).unwrap();

        assert_eq!(field.len(), volume.len());
        assert!(field.normals().iter().all(|n| *n == Vec3::ZERO));
        assert!(field.magnitudes().iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_linear_ramp_along_x() {
        let resolution = UVec3::new(4, 2, 2);
        let volume = RawVolume::from_fn(resolution, |x, _, _| 3.0 * x as f32).unwrap();
        let field = GradientField::compute(&volume, &attributes(resolution), 256.0).unwrap();

        // Forward, central, central, backward differences all give 3.
        for x in 0..4 {
            assert_eq!(field.normal(x, 0, 0), Vec3::new(3.0, 0.0, 0.0));
        }
    }

    #[test]
    fn test_ratio_multiplies_central_difference() {
        let resolution = UVec3::new(3, 2, 2);
        let attributes = attributes(resolution).with_ratio(Vec3::new(2.0, 1.0, 1.0));
        let volume = RawVolume::from_fn(resolution, |x, _, _| 4.0 * x as f32).unwrap();
        let field = GradientField::compute(&volume, &attributes, 256.0).unwrap();

        // One-sided: 4 / 2 = 2. Central: (8 - 0) / 2 * 2 = 8.
        assert_eq!(field.normal(0, 0, 0).x, 2.0);
        assert_eq!(field.normal(1, 0, 0).x, 8.0);
        assert_eq!(field.normal(2, 0, 0).x, 2.0);
    }

    #[test]
    fn test_gradient_along_z() {
        let resolution = UVec3::splat(2);
        let volume =
            RawVolume::from_samples(vec![0.0, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0, 10.0], resolution)
                .unwrap();
        let field = GradientField::compute(&volume, &attributes(resolution), 256.0).unwrap();
        assert!(field.normals().iter().all(|n| *n == Vec3::new(0.0, 0.0, 10.0)));
    }

    #[test]
    fn test_magnitude_compression() {
        assert_eq!(compress_magnitude(0.25, 256.0), 0.0);
        assert_eq!(compress_magnitude(1.0, 256.0), 0.0);
        assert!((compress_magnitude(8.0, 256.0) - 60.0).abs() < 1e-4);
        assert!((compress_magnitude(1.0e6, 256.0) - 160.0).abs() < 1e-4);
    }

    #[test]
    fn test_resolution_mismatch() {
        let volume = RawVolume::from_fn(UVec3::splat(2), |_, _, _| 0.0).unwrap();
        let result = GradientField::compute(&volume, &attributes(UVec3::splat(3)), 256.0);
        assert!(matches!(result, Err(IsoError::ResolutionMismatch { .. })));
    }

    #[test]
    fn test_same_voxel_count_different_shape() {
        let volume = RawVolume::from_fn(UVec3::new(2, 4, 2), |_, _, _| 0.0).unwrap();
        let err = GradientField::compute(&volume, &attributes(UVec3::new(4, 2, 2)), 256.0)
            .unwrap_err();
        assert!(matches!(
            err,
            IsoError::ResolutionMismatch { expected, actual }
                if expected == UVec3::new(4, 2, 2) && actual == UVec3::new(2, 4, 2)
        ));
        assert!(err.to_string().contains("[4, 2, 2]"));
    }

    #[test]
    fn test_nan_length_compresses_to_zero() {
        assert_eq!(compress_magnitude(f32::NAN, 256.0), 0.0);
    }

    #[test]
    fn test_zero_ratio_rejected() {
        let resolution = UVec3::splat(2);
        let volume = RawVolume::from_fn(resolution, |_, _, _| 7.0).unwrap();
        let attributes = attributes(resolution).with_ratio(Vec3::ZERO);
        assert!(matches!(
            GradientField::compute(&volume, &attributes, 256.0),
            Err(IsoError::InvalidRatio(_))
        ));
    }
}
