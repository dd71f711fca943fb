//! Transfer function table and the plain-text description export.

#![allow(clippy::cast_precision_loss)]

use std::io::Write;
use std::path::Path;

use glam::{UVec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::histogram::LEVELS;

/// Maps each of the 256 grey levels to an RGBA color.
///
/// Serialized as a plain list of colors; shorter lists are padded on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Vec4>", into = "Vec<Vec4>")]
pub struct TransferFunction {
    entries: Vec<Vec4>,
}

impl From<Vec<Vec4>> for TransferFunction {
    fn from(entries: Vec<Vec4>) -> Self {
        Self::new(entries)
    }
}

impl From<TransferFunction> for Vec<Vec4> {
    fn from(transfer_function: TransferFunction) -> Self {
        transfer_function.entries
    }
}

impl Default for TransferFunction {
    fn default() -> Self {
        Self::grayscale_ramp()
    }
}

impl TransferFunction {
    /// Creates a transfer function from explicit entries.
    ///
    /// The table is padded with transparent black, or truncated, to 256 entries.
    #[must_use]
    pub fn new(mut entries: Vec<Vec4>) -> Self {
        entries.resize(LEVELS, Vec4::ZERO);
        Self { entries }
    }

    /// Linear ramp from transparent black to opaque white.
    #[must_use]
    pub fn grayscale_ramp() -> Self {
        let entries = (0..LEVELS)
            .map(|i| Vec4::splat(i as f32 / (LEVELS - 1) as f32))
            .collect();
        Self { entries }
    }

    /// Linear interpolation between color stops spread evenly over the levels.
    #[must_use]
    pub fn from_stops(stops: &[Vec4]) -> Self {
        match stops {
            [] => Self::new(Vec::new()),
            [only] => Self::new(vec![*only; LEVELS]),
            _ => {
                let segments = (stops.len() - 1) as f32;
                let entries = (0..LEVELS)
                    .map(|i| {
                        let t = i as f32 / (LEVELS - 1) as f32 * segments;
                        let idx = (t.floor() as usize).min(stops.len() - 2);
                        stops[idx].lerp(stops[idx + 1], t - idx as f32)
                    })
                    .collect();
                Self { entries }
            }
        }
    }

    /// All 256 RGBA entries.
    #[must_use]
    pub fn entries(&self) -> &[Vec4] {
        &self.entries
    }

    /// Color of a grey level.
    #[must_use]
    pub fn get(&self, level: u8) -> Vec4 {
        self.entries[usize::from(level)]
    }

    /// Replaces the color of a grey level.
    pub fn set(&mut self, level: u8, color: Vec4) {
        self.entries[usize::from(level)] = color;
    }

    /// Flattened `[r, g, b, a, ...]` data, ready for a 1D texture.
    #[must_use]
    pub fn to_rgba_f32(&self) -> Vec<f32> {
        self.entries.iter().flat_map(|c| c.to_array()).collect()
    }
}

/// Inputs of the description export.
#[derive(Debug, Clone, Copy)]
pub struct Description<'a> {
    pub raw_file: &'a Path,
    pub info_file: &'a Path,
    pub equalized: bool,
    pub resolution: UVec3,
    pub transfer_function: &'a TransferFunction,
}

/// Writes a plain-text report of the loaded volume and its transfer function.
pub fn write_description(mut writer: impl Write, description: &Description<'_>) -> Result<()> {
    writeln!(writer, "Raw File Path: {}", description.raw_file.display())?;
    writeln!(writer, "Info File Path: {}", description.info_file.display())?;
    writeln!(writer, "Equalization: {}", description.equalized)?;
    let r = description.resolution;
    writeln!(writer, "Resolution: {}x{}x{}", r.x, r.y, r.z)?;
    writeln!(writer, "Index\tR\tG\tB\tA")?;
    for (index, color) in description.transfer_function.entries().iter().enumerate() {
        writeln!(
            writer,
            "{index}\t{:.2}\t{:.2}\t{:.2}\t{:.2}",
            color.x, color.y, color.z, color.w
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the description to a file, replacing it if present.
pub fn save_description(path: impl AsRef<Path>, description: &Description<'_>) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    write_description(std::io::BufWriter::new(file), description)?;
    log::info!("wrote volume description to {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grayscale_ramp() {
        let tf = TransferFunction::grayscale_ramp();
        assert_eq!(tf.entries().len(), LEVELS);
        assert_eq!(tf.get(0), Vec4::ZERO);
        assert_eq!(tf.get(255), Vec4::ONE);
        assert_eq!(tf.to_rgba_f32().len(), 4 * LEVELS);
    }

    #[test]
    fn test_from_stops_hits_endpoints() {
        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let blue = Vec4::new(0.0, 0.0, 1.0, 0.5);
        let tf = TransferFunction::from_stops(&[red, blue]);
        assert_eq!(tf.get(0), red);
        assert!((tf.get(255) - blue).length() < 1e-6);
    }

    #[test]
    fn test_new_pads_to_full_table() {
        let mut tf = TransferFunction::new(vec![Vec4::ONE; 3]);
        assert_eq!(tf.entries().len(), LEVELS);
        assert_eq!(tf.get(3), Vec4::ZERO);
        tf.set(3, Vec4::ONE);
        assert_eq!(tf.get(3), Vec4::ONE);
    }

    #[test]
    fn test_deserialize_short_table_is_padded() {
        let mut tf: TransferFunction = serde_json::from_str("[[1.0, 0.0, 0.0, 1.0]]").unwrap();
        assert_eq!(tf.entries().len(), LEVELS);
        assert_eq!(tf.get(0), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(tf.get(255), Vec4::ZERO);
        tf.set(255, Vec4::ONE);

        let json = serde_json::to_string(&tf).unwrap();
        let back: TransferFunction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tf);
    }

    #[test]
    fn test_description_format() {
        let tf = TransferFunction::grayscale_ramp();
        let description = Description {
            raw_file: Path::new("engine.raw"),
            info_file: Path::new("engine.inf"),
            equalized: true,
            resolution: UVec3::new(149, 208, 110),
            transfer_function: &tf,
        };
        let mut out = Vec::new();
        write_description(&mut out, &description).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Raw File Path: engine.raw");
        assert_eq!(lines[2], "Equalization: true");
        assert_eq!(lines[3], "Resolution: 149x208x110");
        assert_eq!(lines[4], "Index\tR\tG\tB\tA");
        assert_eq!(lines[5], "0\t0.00\t0.00\t0.00\t0.00");
        assert_eq!(lines[5 + 255], "255\t1.00\t1.00\t1.00\t1.00");
        assert_eq!(lines.len(), 5 + LEVELS);
    }
}
