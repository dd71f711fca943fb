//! The stateful iso-surface object.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use std::io::Write;
use std::path::{Path, PathBuf};

use glam::{Vec3, Vec4};
use isoscope_core::{
    load_info_file, load_raw_file, save_description, triangulate, write_description, Description,
    Equalization, GradientField, Heatmap, HeatmapAxis, Histogram, IsoError, IsoSurfaceMesh,
    MeshStatistics, Options, RawVolume, Result, TransferFunction, VolumeAttributes, LEVELS,
};

const IN_MEMORY: &str = "<memory>";

/// A volume and everything derived from it at load time.
#[derive(Debug, Clone)]
struct LoadedVolume {
    attributes: VolumeAttributes,
    volume: RawVolume,
    gradient: GradientField,
    iso_histogram: Histogram,
    gradient_histogram: Histogram,
    heatmap: Heatmap,
    info_path: Option<PathBuf>,
    raw_path: Option<PathBuf>,
    equalized: bool,
}

impl LoadedVolume {
    /// Runs gradient, histogram and heatmap construction over a fresh volume.
    fn analyze(
        attributes: VolumeAttributes,
        volume: RawVolume,
        options: &Options,
        info_path: Option<PathBuf>,
        raw_path: Option<PathBuf>,
    ) -> Result<Self> {
        let gradient = GradientField::compute(&volume, &attributes, options.max_gradient)?;
        let (iso_histogram, gradient_histogram, heatmap) =
            build_histograms(&volume, &gradient, options.interval)?;

        let loaded = Self {
            attributes,
            volume,
            gradient,
            iso_histogram,
            gradient_histogram,
            heatmap,
            info_path,
            raw_path,
            equalized: false,
        };
        if options.equalize_on_load {
            loaded.equalized()
        } else {
            Ok(loaded)
        }
    }

    /// A copy with equalized samples and histograms rebuilt at 256 buckets.
    ///
    /// The gradient field is carried over unchanged.
    fn equalized(&self) -> Result<Self> {
        let equalization = Equalization::of_volume(&self.volume)?;
        let mut volume = self.volume.clone();
        equalization.apply(&mut volume)?;

        let (iso_histogram, gradient_histogram, heatmap) =
            build_histograms(&volume, &self.gradient, LEVELS as u32)?;

        Ok(Self {
            volume,
            iso_histogram,
            gradient_histogram,
            heatmap,
            equalized: true,
            ..self.clone()
        })
    }

    fn info_path(&self) -> &Path {
        self.info_path.as_deref().unwrap_or(Path::new(IN_MEMORY))
    }

    fn raw_path(&self) -> &Path {
        self.raw_path.as_deref().unwrap_or(Path::new(IN_MEMORY))
    }
}

fn build_histograms(
    volume: &RawVolume,
    gradient: &GradientField,
    interval: u32,
) -> Result<(Histogram, Histogram, Heatmap)> {
    let iso_histogram = Histogram::of_volume(volume, interval)?;
    let gradient_histogram = Histogram::build(gradient.magnitudes(), interval)?;
    let heatmap = Heatmap::build(
        volume.samples(),
        gradient.magnitudes(),
        &iso_histogram,
        &gradient_histogram,
    )?;
    Ok((iso_histogram, gradient_histogram, heatmap))
}

/// Owns one loaded volume, its analysis and the last extracted iso-surface.
///
/// Every query on volume data fails with [`IsoError::NotInitialized`] until a
/// load succeeds. A failed load keeps whatever was loaded before.
#[derive(Debug, Clone)]
pub struct IsoSurface {
    options: Options,
    iso_value: f32,
    transfer_function: TransferFunction,
    state: Option<LoadedVolume>,
    mesh: Option<IsoSurfaceMesh>,
}

impl Default for IsoSurface {
    fn default() -> Self {
        let options = Options::default();
        Self {
            iso_value: options.iso_value,
            options,
            transfer_function: TransferFunction::default(),
            state: None,
            mesh: None,
        }
    }
}

impl IsoSurface {
    /// Creates an empty iso-surface with the given options.
    pub fn new(options: Options) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            iso_value: options.iso_value,
            options,
            ..Self::default()
        })
    }

    /// Creates an iso-surface with default options and loads the given files.
    pub fn from_files(info_path: impl AsRef<Path>, raw_path: impl AsRef<Path>) -> Result<Self> {
        let mut surface = Self::default();
        surface.load(info_path, raw_path)?;
        Ok(surface)
    }

    /// Options in effect.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Loads an info file and its raw volume, then computes gradients,
    /// histograms and the heatmap.
    pub fn load(&mut self, info_path: impl AsRef<Path>, raw_path: impl AsRef<Path>) -> Result<()> {
        let info_path = info_path.as_ref();
        let raw_path = raw_path.as_ref();

        let attributes = load_info_file(info_path)?;
        let volume = load_raw_file(raw_path, &attributes)?;
        let loaded = LoadedVolume::analyze(
            attributes,
            volume,
            &self.options,
            Some(info_path.to_path_buf()),
            Some(raw_path.to_path_buf()),
        )?;
        self.commit(loaded);
        Ok(())
    }

    /// Like [`IsoSurface::load`], with the info text and raw bytes already in memory.
    pub fn load_from_memory(&mut self, info_text: &str, raw_bytes: &[u8]) -> Result<()> {
        let attributes = VolumeAttributes::parse(info_text)?;
        let volume = RawVolume::from_bytes(raw_bytes, &attributes)?;
        let loaded = LoadedVolume::analyze(attributes, volume, &self.options, None, None)?;
        self.commit(loaded);
        Ok(())
    }

    fn commit(&mut self, loaded: LoadedVolume) {
        log::info!(
            "volume ready: {} voxels, {} histogram buckets{}",
            loaded.volume.len(),
            loaded.iso_histogram.interval(),
            if loaded.equalized { ", equalized" } else { "" }
        );
        self.state = Some(loaded);
        self.mesh = None;
    }

    fn loaded(&self) -> Result<&LoadedVolume> {
        self.state.as_ref().ok_or(IsoError::NotInitialized)
    }

    /// Whether a volume has been loaded.
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn attributes(&self) -> Result<&VolumeAttributes> {
        Ok(&self.loaded()?.attributes)
    }

    pub fn volume(&self) -> Result<&RawVolume> {
        Ok(&self.loaded()?.volume)
    }

    pub fn gradient(&self) -> Result<&GradientField> {
        Ok(&self.loaded()?.gradient)
    }

    /// Histogram of scalar values.
    pub fn iso_value_histogram(&self) -> Result<&Histogram> {
        Ok(&self.loaded()?.iso_histogram)
    }

    /// Histogram of compressed gradient magnitudes.
    pub fn gradient_histogram(&self) -> Result<&Histogram> {
        Ok(&self.loaded()?.gradient_histogram)
    }

    /// Joint iso-value / gradient-magnitude distribution.
    pub fn heatmap(&self) -> Result<&Heatmap> {
        Ok(&self.loaded()?.heatmap)
    }

    /// Five chart labels for one heatmap axis.
    pub fn heatmap_axis_labels(&self, axis: HeatmapAxis) -> Result<[String; 5]> {
        let loaded = self.loaded()?;
        let histogram = match axis {
            HeatmapAxis::IsoValue => &loaded.iso_histogram,
            HeatmapAxis::Gradient => &loaded.gradient_histogram,
        };
        histogram
            .axis_labels()
            .ok_or(IsoError::InvalidInterval(0))
    }

    /// Equalizes the scalar histogram, rewriting the volume in place.
    ///
    /// Histograms and heatmap are rebuilt with 256 buckets. Any extracted
    /// iso-surface is dropped since it no longer matches the volume. On
    /// error nothing changes.
    pub fn equalize(&mut self) -> Result<()> {
        let equalized = self.loaded()?.equalized()?;
        log::info!("equalized volume histogram");
        self.state = Some(equalized);
        self.mesh = None;
        Ok(())
    }

    /// Whether the loaded volume has been equalized.
    pub fn is_equalized(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.equalized)
    }

    /// Iso-value used by the next [`IsoSurface::convert_to_polygon`].
    pub fn iso_value(&self) -> f32 {
        self.iso_value
    }

    pub fn set_iso_value(&mut self, iso_value: f32) {
        self.iso_value = iso_value;
    }

    /// Extracts the iso-surface at the current iso-value, replacing the last one.
    pub fn convert_to_polygon(&mut self) -> Result<&IsoSurfaceMesh> {
        self.mesh = None;
        let loaded = self.loaded()?;
        let mesh = triangulate(
            &loaded.volume,
            &loaded.gradient,
            &loaded.attributes,
            self.iso_value,
        )?;
        Ok(self.mesh.insert(mesh))
    }

    /// The last extracted iso-surface, if any.
    pub fn mesh(&self) -> Option<&IsoSurfaceMesh> {
        self.mesh.as_ref()
    }

    /// Counters of the last extraction.
    pub fn statistics(&self) -> Result<MeshStatistics> {
        let loaded = self.loaded()?;
        let mesh = self.mesh.as_ref().ok_or(IsoError::MeshNotReady)?;
        Ok(mesh.statistics(loaded.gradient.magnitudes().len()))
    }

    /// Human-readable summary of the volume and the last extraction.
    ///
    /// The report is also logged at info level.
    pub fn debug_report(&self) -> Result<String> {
        let loaded = self.loaded()?;
        let statistics = self.statistics()?;
        let r = loaded.attributes.resolution;
        let report = format!(
            "Raw File Path: {}\nInfo File Path: {}\nResolution: {}x{}x{}\nEqualization: {}\nIso-value: {}\n{statistics}",
            loaded.raw_path().display(),
            loaded.info_path().display(),
            r.x,
            r.y,
            r.z,
            loaded.equalized,
            self.mesh.as_ref().map_or(self.iso_value, IsoSurfaceMesh::iso_value),
        );
        log::info!("{report}");
        Ok(report)
    }

    /// One `(gradient.xyz, value / max)` texel per voxel, in volume order.
    pub fn texture_data(&self) -> Result<Vec<Vec4>> {
        let loaded = self.loaded()?;
        let max = loaded.volume.max_value();
        let scale = if max > 0.0 { 1.0 / max } else { 0.0 };
        Ok(loaded
            .gradient
            .normals()
            .iter()
            .zip(loaded.volume.samples())
            .map(|(normal, &value)| normal.extend(value * scale))
            .collect())
    }

    /// Physical extent of the volume, from the origin to `resolution * ratio`.
    pub fn bounding_box(&self) -> Result<(Vec3, Vec3)> {
        Ok((Vec3::ZERO, self.loaded()?.attributes.extent()))
    }

    pub fn transfer_function(&self) -> &TransferFunction {
        &self.transfer_function
    }

    pub fn set_transfer_function(&mut self, transfer_function: TransferFunction) {
        self.transfer_function = transfer_function;
    }

    fn description(&self) -> Result<Description<'_>> {
        let loaded = self.loaded()?;
        Ok(Description {
            raw_file: loaded.raw_path(),
            info_file: loaded.info_path(),
            equalized: loaded.equalized,
            resolution: loaded.attributes.resolution,
            transfer_function: &self.transfer_function,
        })
    }

    /// Writes the volume description and transfer function table.
    pub fn write_description(&self, writer: impl Write) -> Result<()> {
        write_description(writer, &self.description()?)
    }

    /// Saves the volume description and transfer function table to a file.
    pub fn save_description(&self, path: impl AsRef<Path>) -> Result<()> {
        save_description(path, &self.description()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLAB_INFO: &str = "Resolution=2:2:2\nVoxelSize=1:1:1\n";
    const SLAB: [u8; 8] = [0, 0, 0, 0, 10, 10, 10, 10];

    fn slab() -> IsoSurface {
        let mut surface = IsoSurface::default();
        surface.load_from_memory(SLAB_INFO, &SLAB).unwrap();
        surface
    }

    #[test]
    fn test_queries_before_load_fail() {
        let mut surface = IsoSurface::default();
        assert!(!surface.is_initialized());
        assert!(matches!(surface.convert_to_polygon(), Err(IsoError::NotInitialized)));
        assert!(matches!(surface.iso_value_histogram(), Err(IsoError::NotInitialized)));
        assert!(matches!(surface.debug_report(), Err(IsoError::NotInitialized)));
        assert!(matches!(surface.equalize(), Err(IsoError::NotInitialized)));
        assert!(matches!(surface.texture_data(), Err(IsoError::NotInitialized)));
    }

    #[test]
    fn test_report_needs_mesh() {
        let surface = slab();
        assert!(matches!(surface.debug_report(), Err(IsoError::MeshNotReady)));
        assert!(matches!(surface.statistics(), Err(IsoError::MeshNotReady)));
    }

    #[test]
    fn test_failed_load_keeps_previous_volume() {
        let mut surface = slab();
        let result = surface.load_from_memory(SLAB_INFO, &SLAB[..7]);
        assert!(matches!(result, Err(IsoError::SizeMismatch { .. })));
        assert_eq!(surface.volume().unwrap().samples().len(), 8);
    }

    #[test]
    fn test_options_interval_drives_histograms() {
        let options = Options {
            interval: 4,
            ..Options::default()
        };
        let mut surface = IsoSurface::new(options).unwrap();
        surface.load_from_memory(SLAB_INFO, &SLAB).unwrap();
        assert_eq!(surface.iso_value_histogram().unwrap().interval(), 4);
        assert_eq!(surface.heatmap().unwrap().cells().len(), 16);
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = Options {
            interval: 0,
            ..Options::default()
        };
        assert!(matches!(IsoSurface::new(options), Err(IsoError::InvalidInterval(0))));
    }

    #[test]
    fn test_equalize_on_load() {
        let options = Options {
            equalize_on_load: true,
            ..Options::default()
        };
        let mut surface = IsoSurface::new(options).unwrap();
        surface.load_from_memory(SLAB_INFO, &SLAB).unwrap();
        assert!(surface.is_equalized());
        assert_eq!(surface.iso_value_histogram().unwrap().interval(), LEVELS);
        // Half the voxels at 0, half at 10: cdf 0.5 then 1.0.
        let samples = surface.volume().unwrap().samples();
        assert_eq!(&samples[..4], &[128.0; 4]);
        assert_eq!(&samples[4..], &[255.0; 4]);
    }

    #[test]
    fn test_texture_data() {
        let surface = slab();
        let texels = surface.texture_data().unwrap();
        assert_eq!(texels.len(), 8);
        assert_eq!(texels[0], Vec4::new(0.0, 0.0, 10.0, 0.0));
        assert_eq!(texels[7], Vec4::new(0.0, 0.0, 10.0, 1.0));
    }

    #[test]
    fn test_description_uses_memory_placeholder() {
        let surface = slab();
        let mut out = Vec::new();
        surface.write_description(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Raw File Path: <memory>\n"));
        assert!(text.contains("Resolution: 2x2x2"));
    }
}
