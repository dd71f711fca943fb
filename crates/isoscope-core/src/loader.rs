//! Loading info and raw volume files from disk.

use std::path::Path;

use crate::attributes::VolumeAttributes;
use crate::error::{IsoError, Result};
use crate::volume::RawVolume;

/// Reads and parses an info file.
///
/// Bytes that are not valid UTF-8 (e.g. Latin-1 comments) are replaced
/// rather than rejected.
pub fn load_info_file(path: impl AsRef<Path>) -> Result<VolumeAttributes> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| IsoError::LoadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let attributes = VolumeAttributes::parse(&String::from_utf8_lossy(&bytes))?;
    log::info!("loaded volume info {}: {attributes}", path.display());
    Ok(attributes)
}

/// Reads a headerless raw file of unsigned 8-bit samples.
///
/// The file size must match the declared resolution exactly; nothing is
/// returned unless the whole volume was read.
pub fn load_raw_file(path: impl AsRef<Path>, attributes: &VolumeAttributes) -> Result<RawVolume> {
    let path = path.as_ref();
    log::info!("loading volume data: {}", path.display());

    attributes.validate()?;
    if attributes.data_type.size_in_bytes() > 1 {
        log::warn!(
            "{} declares {:?} samples ({} bytes); decoding as unsigned 8-bit",
            path.display(),
            attributes.data_type,
            attributes.data_type.size_in_bytes()
        );
    }
    let bytes = std::fs::read(path).map_err(|source| IsoError::LoadFailed {
        path: path.to_path_buf(),
        source,
    })?;

    let volume = RawVolume::from_bytes(&bytes, attributes).map_err(|err| {
        log::error!("rejecting {}: {err}", path.display());
        err
    })?;
    log::info!("loaded {} voxels from {}", volume.len(), path.display());
    Ok(volume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec3;
    use tempfile::TempDir;

    #[test]
    fn test_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let info = dir.path().join("ok.inf");
        let raw = dir.path().join("ok.raw");
        std::fs::write(&info, "Resolution=2x2x3\nVoxelSize=1:1:2\n").unwrap();
        std::fs::write(&raw, (0u8..12).collect::<Vec<_>>()).unwrap();

        let attributes = load_info_file(&info).unwrap();
        let volume = load_raw_file(&raw, &attributes).unwrap();
        assert_eq!(volume.resolution(), UVec3::new(2, 2, 3));
        assert_eq!(volume.value(1, 1, 2), 11.0);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let attributes = VolumeAttributes::new(UVec3::splat(2));
        let err = load_raw_file(dir.path().join("does-not-exist.raw"), &attributes).unwrap_err();
        assert!(matches!(err, IsoError::LoadFailed { .. }));
    }

    #[test]
    fn test_short_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("short.raw");
        std::fs::write(&raw, [1u8; 7]).unwrap();
        let attributes = VolumeAttributes::new(UVec3::splat(2));
        let err = load_raw_file(&raw, &attributes).unwrap_err();
        assert!(matches!(
            err,
            IsoError::SizeMismatch {
                expected: 8,
                actual: 7
            }
        ));
    }

    #[test]
    fn test_info_with_bom_and_latin1_comment() {
        let dir = TempDir::new().unwrap();
        let info = dir.path().join("latin1.inf");
        let mut bytes = b"\xEF\xBB\xBFResolution=2:3:4\n# r\xE9solution en \xB5m\n".to_vec();
        bytes.extend_from_slice(b"VoxelSize=1:1:0.5\n");
        std::fs::write(&info, bytes).unwrap();

        let attributes = load_info_file(&info).unwrap();
        assert_eq!(attributes.resolution, UVec3::new(2, 3, 4));
        assert_eq!(attributes.ratio.z, 0.5);
    }

    #[test]
    fn test_wide_sample_type_still_reads_bytes() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("short-type.raw");
        std::fs::write(&raw, [3u8; 8]).unwrap();
        let attributes =
            VolumeAttributes::parse("Resolution=2:2:2\nSampleType=UnsignedShort\n").unwrap();

        let volume = load_raw_file(&raw, &attributes).unwrap();
        assert_eq!(volume.len(), 8);
        assert_eq!(volume.max_value(), 3.0);
    }
}
