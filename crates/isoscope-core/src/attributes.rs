//! Volume attributes and the info-file parser.
//!
//! An info file is a small line-oriented text file describing a raw volume:
//!
//! ```text
//! # engine block
//! Resolution=149:208:110
//! VoxelSize=1.0:1.0:1.0
//! SampleType=UnsignedChar
//! Endian=Little
//! ```
//!
//! Keys are matched case-insensitively and may contain `-`, `_` or a space
//! between words (`voxel-size`, `sample type`). Unknown lines are ignored.

use std::fmt;
use std::str::FromStr;

use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{IsoError, Result};

/// Declared sample type of a raw volume.
///
/// Informational only: samples are always decoded as unsigned bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DataType {
    Char,
    #[default]
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
}

impl DataType {
    /// Size in bytes of one sample of this type.
    #[must_use]
    pub fn size_in_bytes(self) -> usize {
        match self {
            Self::Char | Self::UnsignedChar => 1,
            Self::Short | Self::UnsignedShort => 2,
            Self::Int | Self::UnsignedInt => 4,
            Self::Long | Self::UnsignedLong => 8,
        }
    }

    /// Matches a sample-type value such as `UnsignedChar` or `unsigned short`.
    ///
    /// Unsigned variants are tried first so `UnsignedChar` is not taken for `Char`.
    fn from_value(value: &str) -> Option<Self> {
        let key = normalize_key(value);
        let unsigned = key.strip_prefix("unsigned");
        let base = unsigned.unwrap_or(&key);
        let signed = unsigned.is_none();

        let data_type = if base.starts_with("char") {
            if signed { Self::Char } else { Self::UnsignedChar }
        } else if base.starts_with("short") {
            if signed { Self::Short } else { Self::UnsignedShort }
        } else if base.starts_with("int") {
            if signed { Self::Int } else { Self::UnsignedInt }
        } else if base.starts_with("long") {
            if signed { Self::Long } else { Self::UnsignedLong }
        } else {
            return None;
        };
        Some(data_type)
    }
}

/// Byte order declared by the info file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Describes the layout of a raw volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeAttributes {
    /// Number of samples along each axis.
    pub resolution: UVec3,
    /// Physical spacing multiplier per axis.
    pub ratio: Vec3,
    /// Declared sample type.
    pub data_type: DataType,
    /// Declared byte order.
    pub endian: Endian,
}

impl Default for VolumeAttributes {
    fn default() -> Self {
        Self {
            resolution: UVec3::ZERO,
            ratio: Vec3::ONE,
            data_type: DataType::default(),
            endian: Endian::default(),
        }
    }
}

impl VolumeAttributes {
    /// Creates attributes with unit spacing and the default sample type.
    #[must_use]
    pub fn new(resolution: UVec3) -> Self {
        Self {
            resolution,
            ..Self::default()
        }
    }

    /// Sets the voxel spacing ratio.
    #[must_use]
    pub fn with_ratio(mut self, ratio: Vec3) -> Self {
        self.ratio = ratio;
        self
    }

    /// Parses the text of an info file.
    pub fn parse(text: &str) -> Result<Self> {
        let mut attributes = Self::default();
        let mut has_resolution = false;

        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        for (line_index, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            let line_number = line_index + 1;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = split_key_value(line) else {
                log::trace!("ignoring info line {line_number}: {line}");
                continue;
            };

            match InfoKey::recognize(key) {
                Some(InfoKey::Resolution) => {
                    // Either 149:208:110 or 256x256x256.
                    let separator = if value.contains(['x', 'X']) { 'x' } else { ':' };
                    let tokens: Vec<&str> = value
                        .split(|c: char| c == separator || (separator == 'x' && c == 'X'))
                        .collect();
                    let [x, y, z] = parse_triple::<u32>(&tokens, line_number, "resolution")?;
                    attributes.resolution = UVec3::new(x, y, z);
                    has_resolution = true;
                }
                Some(InfoKey::Ratio) => {
                    let tokens: Vec<&str> = value.split(':').collect();
                    let [x, y, z] = parse_triple::<f32>(&tokens, line_number, "voxel size")?;
                    attributes.ratio = Vec3::new(x, y, z);
                }
                Some(InfoKey::SampleType) => match DataType::from_value(value) {
                    Some(data_type) => attributes.data_type = data_type,
                    None => log::warn!(
                        "unknown sample type '{value}' on line {line_number}, keeping {:?}",
                        attributes.data_type
                    ),
                },
                Some(InfoKey::Endian) => {
                    let endian = normalize_key(value);
                    if endian.is_empty() || endian.contains("little") {
                        attributes.endian = Endian::Little;
                    } else if endian.contains("big") {
                        attributes.endian = Endian::Big;
                    }
                }
                None => log::trace!("ignoring info line {line_number}: {line}"),
            }
        }

        if !has_resolution {
            return Err(IsoError::MissingResolution);
        }
        attributes.validate()?;
        Ok(attributes)
    }

    /// Checks that the grid has at least one cell along every axis and a
    /// finite, positive spacing.
    pub fn validate(&self) -> Result<()> {
        let r = self.resolution;
        if r.x <= 1 || r.y <= 1 || r.z <= 1 {
            return Err(IsoError::InvalidResolution {
                x: r.x,
                y: r.y,
                z: r.z,
            });
        }
        if !self.ratio.is_finite() || self.ratio.min_element() <= 0.0 {
            return Err(IsoError::InvalidRatio(self.ratio));
        }
        Ok(())
    }

    /// Total number of samples.
    #[must_use]
    pub fn voxel_count(&self) -> usize {
        self.resolution.x as usize * self.resolution.y as usize * self.resolution.z as usize
    }

    /// Number of marching cubes cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let cells = self.resolution.saturating_sub(UVec3::ONE);
        cells.x as usize * cells.y as usize * cells.z as usize
    }

    /// Physical extent of the volume (`resolution * ratio`).
    #[must_use]
    pub fn extent(&self) -> Vec3 {
        self.resolution.as_vec3() * self.ratio
    }
}

impl FromStr for VolumeAttributes {
    type Err = IsoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for VolumeAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{} ({:?}, {:?}, ratio {}:{}:{})",
            self.resolution.x,
            self.resolution.y,
            self.resolution.z,
            self.data_type,
            self.endian,
            self.ratio.x,
            self.ratio.y,
            self.ratio.z
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InfoKey {
    Resolution,
    Ratio,
    SampleType,
    Endian,
}

impl InfoKey {
    fn recognize(key: &str) -> Option<Self> {
        match normalize_key(key).as_str() {
            "resolution" => Some(Self::Resolution),
            "voxelsize" | "ratio" => Some(Self::Ratio),
            "sampletype" => Some(Self::SampleType),
            "endian" => Some(Self::Endian),
            _ => None,
        }
    }
}

/// Lowercases and drops word separators: `Voxel-Size` -> `voxelsize`.
fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' ' | '\t'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Splits at the first `=`, or at the first `:` when the line has no `=`.
fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=').or_else(|| line.split_once(':'))?;
    Some((key.trim(), value.trim()))
}

fn parse_triple<T: FromStr>(tokens: &[&str], line: usize, what: &str) -> Result<[T; 3]> {
    if tokens.len() != 3 {
        return Err(IsoError::InvalidInfo {
            line,
            message: format!("{what} needs 3 components, found {}", tokens.len()),
        });
    }
    let parse = |token: &str| {
        token.trim().parse::<T>().map_err(|_| IsoError::InvalidInfo {
            line,
            message: format!("'{}' is not a valid {what} component", token.trim()),
        })
    };
    Ok([parse(tokens[0])?, parse(tokens[1])?, parse(tokens[2])?])
}
