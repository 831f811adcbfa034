use std::collections::HashMap;

use crate::collect::backend::{GeoBackend, LayerRef, Reducer};
use crate::collect::scenes::{DateRange, SceneInfo};
use crate::error::{ReforestError, ReforestResult};
use crate::geometric::land_cover::ClassCode;
use crate::geometric::raster::Raster;
use crate::geometric::roi::Roi;
use crate::geometric::slope::{terrain_slope, SlopeUnit};
use crate::geometric::zonal::ClassHistogram;

/// Geoprocessing backend over rasters held in memory
///
/// Layers must be north-up and share the coordinate system of the ROIs they
/// are clipped with. Used by tests, demos and offline runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    layers: HashMap<String, Raster>,
    scenes: HashMap<String, Vec<SceneInfo>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend::default()
    }

    /// Register a layer under `id`
    pub fn with_layer(mut self, id: impl Into<String>, raster: Raster) -> Self {
        self.insert_layer(id, raster);
        self
    }

    pub fn insert_layer(&mut self, id: impl Into<String>, raster: Raster) {
        self.layers.insert(id.into(), raster);
    }

    /// Register the scenes of an image collection
    pub fn with_scenes(mut self, collection: impl Into<String>, scenes: Vec<SceneInfo>) -> Self {
        self.scenes.insert(collection.into(), scenes);
        self
    }

    pub fn layer(&self, id: &str) -> Option<&Raster> {
        self.layers.get(id)
    }

    fn find_layer(&self, layer: &LayerRef) -> ReforestResult<&Raster> {
        let raster = self.layers.get(&layer.id).ok_or_else(|| {
            ReforestError::UpstreamService(format!("unknown layer {}", layer.id))
        })?;
        if let Some(band) = &layer.band {
            if &raster.band != band {
                return Err(ReforestError::UpstreamService(format!(
                    "layer {} has no band '{}'",
                    layer.id, band
                )));
            }
        }
        Ok(raster)
    }

    /// Load band `band_index` (1-based) of a GeoTIFF as layer `id`
    #[cfg(feature = "gdal")]
    pub fn load_geotiff(
        &mut self,
        id: impl Into<String>,
        path: &std::path::Path,
        band_index: usize,
        band_name: &str,
    ) -> anyhow::Result<()> {
        use anyhow::Context;
        use gdal::Dataset;

        use crate::geo_core::GeoTransform;

        let dataset = Dataset::open(path).context(format!("Failed to open raster: {:?}", path))?;
        let transform = GeoTransform::from_gdal(
            dataset
                .geo_transform()
                .context("Failed to read geotransform")?,
        );
        let (width, height) = dataset.raster_size();
        let band = dataset
            .rasterband(band_index)
            .context(format!("Failed to get band {}", band_index))?;
        let no_data = band.no_data_value();
        let buffer = band
            .read_as::<f64>((0, 0), (width, height), (width, height), None)
            .context("Failed to read raster band")?;

        let data = buffer
            .data()
            .iter()
            .map(|v| match no_data {
                Some(nd) if *v == nd => f64::NAN,
                _ => *v,
            })
            .collect();

        let raster = Raster::new(band_name, width, height, transform, data)?;
        log::info!("Loaded {:?} band {} as {}x{} layer", path, band_index, width, height);
        self.insert_layer(id, raster);
        Ok(())
    }
}

fn ensure_north_up(raster: &Raster) -> ReforestResult<()> {
    if !raster.transform.is_north_up() {
        return Err(ReforestError::InvalidParameter(format!(
            "raster '{}' is not north-up",
            raster.band
        )));
    }
    Ok(())
}

impl GeoBackend for MemoryBackend {
    fn clip(&self, layer: &LayerRef, roi: &Roi) -> ReforestResult<Raster> {
        let raster = self.find_layer(layer)?;
        ensure_north_up(raster)?;

        // Pixel window covering the ROI envelope
        let bbox = roi.bbox();
        let t = &raster.transform;
        let pixel_height = t.pixel_height.abs();
        let to_col = |x: f64| ((x - t.top_left_x) / t.pixel_width).clamp(0.0, raster.width as f64);
        let to_row = |y: f64| ((t.top_left_y - y) / pixel_height).clamp(0.0, raster.height as f64);
        let min_col = to_col(bbox.min_x).floor() as usize;
        let max_col = to_col(bbox.max_x).ceil() as usize;
        let min_row = to_row(bbox.max_y).floor() as usize;
        let max_row = to_row(bbox.min_y).ceil() as usize;

        let width = max_col.saturating_sub(min_col);
        let height = max_row.saturating_sub(min_row);
        let window = raster.crop(min_col, min_row, width, height)?;

        let data = (0..height)
            .flat_map(|row| (0..width).map(move |col| (col, row)))
            .map(|(col, row)| {
                let (x, y) = window.transform.pixel_center(col, row);
                if roi.contains(x, y) {
                    window.data()[row * width + col]
                } else {
                    f64::NAN
                }
            })
            .collect();

        let clipped = window.with_data(raster.band.clone(), data)?;
        log::debug!(
            "Clipped {} to {}x{} pixels ({} inside ROI)",
            layer,
            width,
            height,
            clipped.valid_count()
        );
        Ok(clipped)
    }

    fn terrain_slope(&self, elevation: &Raster) -> ReforestResult<Raster> {
        terrain_slope(elevation, SlopeUnit::Percent)
    }

    fn reduce_region(
        &self,
        raster: &Raster,
        roi: &Roi,
        reducer: Reducer,
        scale_m: f64,
    ) -> ReforestResult<ClassHistogram> {
        match reducer {
            Reducer::FrequencyHistogram => {}
        }

        let mut histogram = ClassHistogram::new();
        if raster.is_empty() {
            return Ok(histogram);
        }

        // Pixels at another resolution count in units of scale-sized pixels
        let (_, center_lat) = raster
            .transform
            .pixel_center(raster.width / 2, raster.height / 2);
        let (dx, dy) = raster.transform.pixel_size_m(center_lat);
        let weight = dx * dy / (scale_m * scale_m);

        for row in 0..raster.height {
            for col in 0..raster.width {
                let Some(value) = raster.get(col, row) else {
                    continue;
                };
                let (x, y) = raster.transform.pixel_center(col, row);
                if !roi.contains(x, y) {
                    continue;
                }
                histogram.add(class_code(value)?, weight);
            }
        }
        Ok(histogram)
    }

    fn list_scenes(
        &self,
        collection: &str,
        _roi: &Roi,
        range: &DateRange,
    ) -> ReforestResult<Vec<SceneInfo>> {
        let scenes = self.scenes.get(collection).ok_or_else(|| {
            ReforestError::UpstreamService(format!("unknown image collection {}", collection))
        })?;
        Ok(scenes
            .iter()
            .filter(|s| s.acquisition_date().is_some_and(|d| range.contains(d)))
            .cloned()
            .collect())
    }
}

fn class_code(value: f64) -> ReforestResult<ClassCode> {
    if value.fract() == 0.0 && value >= 0.0 && value <= ClassCode::MAX as f64 {
        Ok(value as ClassCode)
    } else {
        Err(ReforestError::InvalidParameter(format!(
            "pixel value {} is not a class code",
            value
        )))
    }
}
