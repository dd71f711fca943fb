//! Raw scalar volume storage.

use glam::UVec3;

use crate::attributes::VolumeAttributes;
use crate::error::{IsoError, Result};

/// A regular grid of scalar samples.
///
/// Samples are stored row-major with x fastest, then y, then z:
/// `index(x, y, z) = z * (ny * nx) + y * nx + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawVolume {
    resolution: UVec3,
    samples: Vec<f32>,
}

impl RawVolume {
    /// Promotes raw unsigned bytes to float samples, without rescaling.
    pub fn from_bytes(bytes: &[u8], attributes: &VolumeAttributes) -> Result<Self> {
        let samples = bytes.iter().map(|&b| f32::from(b)).collect();
        Self::from_samples(samples, attributes.resolution)
    }

    /// Wraps already decoded samples.
    ///
    /// Samples must be finite and non-negative; histogram bins span `[0, max]`.
    pub fn from_samples(samples: Vec<f32>, resolution: UVec3) -> Result<Self> {
        VolumeAttributes::new(resolution).validate()?;
        let expected = resolution.x as usize * resolution.y as usize * resolution.z as usize;
        if samples.len() != expected {
            return Err(IsoError::SizeMismatch {
                expected,
                actual: samples.len(),
            });
        }
        if let Some((index, &value)) = samples
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(IsoError::InvalidSample { index, value });
        }
        Ok(Self {
            resolution,
            samples,
        })
    }

    /// Builds a volume by evaluating `f` at every grid point.
    pub fn from_fn(resolution: UVec3, mut f: impl FnMut(u32, u32, u32) -> f32) -> Result<Self> {
        let mut samples =
            Vec::with_capacity(resolution.x as usize * resolution.y as usize * resolution.z as usize);
        for z in 0..resolution.z {
            for y in 0..resolution.y {
                for x in 0..resolution.x {
                    samples.push(f(x, y, z));
                }
            }
        }
        Self::from_samples(samples, resolution)
    }

    /// Number of samples along each axis.
    #[must_use]
    pub fn resolution(&self) -> UVec3 {
        self.resolution
    }

    /// Total number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed volume; kept for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All samples in flat order.
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub(crate) fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Flattens a 3D index.
    #[must_use]
    pub fn index(&self, x: u32, y: u32, z: u32) -> usize {
        flatten_index(self.resolution, x, y, z)
    }

    /// Unflattens a linear index.
    #[must_use]
    pub fn coords(&self, index: usize) -> UVec3 {
        unflatten_index(self.resolution, index)
    }

    /// Sample at a grid point.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the grid.
    #[must_use]
    pub fn value(&self, x: u32, y: u32, z: u32) -> f32 {
        self.samples[self.index(x, y, z)]
    }

    /// Largest sample value.
    #[must_use]
    pub fn max_value(&self) -> f32 {
        max_of(&self.samples)
    }
}

/// Flattens `(x, y, z)` for a grid of the given resolution.
#[must_use]
pub fn flatten_index(resolution: UVec3, x: u32, y: u32, z: u32) -> usize {
    let nx = resolution.x as usize;
    let ny = resolution.y as usize;
    z as usize * (ny * nx) + y as usize * nx + x as usize
}

/// Inverse of [`flatten_index`].
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn unflatten_index(resolution: UVec3, index: usize) -> UVec3 {
    let nx = resolution.x as usize;
    let ny = resolution.y as usize;
    UVec3::new(
        (index % nx) as u32,
        ((index / nx) % ny) as u32,
        (index / (nx * ny)) as u32,
    )
}

pub(crate) fn max_of(values: &[f32]) -> f32 {
    values.iter().copied().fold(f32::MIN, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_index_layout_is_x_fastest() {
        let volume = RawVolume::from_fn(UVec3::new(3, 4, 5), |x, y, z| {
            (x + 10 * y + 100 * z) as f32
        })
        .unwrap();
        assert_eq!(volume.index(1, 0, 0), 1);
        assert_eq!(volume.index(0, 1, 0), 3);
        assert_eq!(volume.index(0, 0, 1), 12);
        assert_eq!(volume.value(2, 3, 4), 432.0);
        assert_eq!(volume.max_value(), 432.0);
    }

    #[test]
    fn test_from_bytes_promotes_without_scaling() {
        let attributes = VolumeAttributes::new(UVec3::splat(2));
        let bytes = [0u8, 1, 2, 3, 4, 5, 6, 255];
        let volume = RawVolume::from_bytes(&bytes, &attributes).unwrap();
        assert_eq!(volume.samples()[7], 255.0);
        assert_eq!(volume.samples()[3], 3.0);
    }

    #[test]
    fn test_size_mismatch() {
        let result = RawVolume::from_samples(vec![0.0; 7], UVec3::splat(2));
        assert!(matches!(
            result,
            Err(IsoError::SizeMismatch {
                expected: 8,
                actual: 7
            })
        ));
    }

    #[test]
    fn test_negative_and_nan_samples_rejected() {
        let result = RawVolume::from_samples(vec![-5.0; 8], UVec3::splat(2));
        assert!(matches!(result, Err(IsoError::InvalidSample { index: 0, .. })));

        let mut samples = vec![1.0; 8];
        samples[6] = f32::NAN;
        let result = RawVolume::from_samples(samples, UVec3::splat(2));
        assert!(matches!(result, Err(IsoError::InvalidSample { index: 6, .. })));
    }

    #[test]
    fn test_degenerate_resolution() {
        let result = RawVolume::from_samples(vec![0.0; 4], UVec3::new(4, 1, 1));
        assert!(matches!(result, Err(IsoError::InvalidResolution { .. })));
    }

    proptest! {
        #[test]
        fn index_roundtrip(
            nx in 2u32..40, ny in 2u32..40, nz in 2u32..40,
            fx in 0.0f64..1.0, fy in 0.0f64..1.0, fz in 0.0f64..1.0,
        ) {
            let resolution = UVec3::new(nx, ny, nz);
            let x = (fx * f64::from(nx)) as u32;
            let y = (fy * f64::from(ny)) as u32;
            let z = (fz * f64::from(nz)) as u32;
            let index = flatten_index(resolution, x, y, z);
            prop_assert!(index < (nx * ny * nz) as usize);
            prop_assert_eq!(unflatten_index(resolution, index), UVec3::new(x, y, z));
        }
    }
}
