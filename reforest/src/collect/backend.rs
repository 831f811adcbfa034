use serde::{Deserialize, Serialize};

use crate::collect::scenes::{DateRange, SceneInfo};
use crate::error::{ReforestError, ReforestResult};
use crate::geometric::raster::Raster;
use crate::geometric::roi::Roi;
use crate::geometric::zonal::ClassHistogram;

/// A named raster layer, optionally narrowed to one band
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<String>,
}

impl LayerRef {
    pub fn new(id: impl Into<String>) -> Self {
        LayerRef {
            id: id.into(),
            band: None,
        }
    }

    pub fn with_band(id: impl Into<String>, band: impl Into<String>) -> Self {
        LayerRef {
            id: id.into(),
            band: Some(band.into()),
        }
    }
}

impl std::fmt::Display for LayerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.band {
            Some(band) => write!(f, "{}[{}]", self.id, band),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Zonal reducers a backend can apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Reducer {
    FrequencyHistogram,
}

/// Raster/vector geoprocessing service used by the pipeline
///
/// Every call blocks until the service answers. Failures and timeouts are
/// reported as `ReforestError::UpstreamService`.
pub trait GeoBackend {
    /// Fetch a layer clipped to the region
    fn clip(&self, layer: &LayerRef, roi: &Roi) -> ReforestResult<Raster>;

    /// Slope raster derived from an elevation raster
    fn terrain_slope(&self, elevation: &Raster) -> ReforestResult<Raster>;

    /// Zonal reduction of `raster` over `roi` at `scale_m` meters per pixel
    fn reduce_region(
        &self,
        raster: &Raster,
        roi: &Roi,
        reducer: Reducer,
        scale_m: f64,
    ) -> ReforestResult<ClassHistogram>;

    /// Scenes of an image collection intersecting the region in a date range
    fn list_scenes(
        &self,
        collection: &str,
        _roi: &Roi,
        _range: &DateRange,
    ) -> ReforestResult<Vec<SceneInfo>> {
        Err(ReforestError::UpstreamService(format!(
            "backend cannot list scenes of {}",
            collection
        )))
    }
}

impl<B: GeoBackend + ?Sized> GeoBackend for &B {
    fn clip(&self, layer: &LayerRef, roi: &Roi) -> ReforestResult<Raster> {
        (**self).clip(layer, roi)
    }

    fn terrain_slope(&self, elevation: &Raster) -> ReforestResult<Raster> {
        (**self).terrain_slope(elevation)
    }

    fn reduce_region(
        &self,
        raster: &Raster,
        roi: &Roi,
        reducer: Reducer,
        scale_m: f64,
    ) -> ReforestResult<ClassHistogram> {
        (**self).reduce_region(raster, roi, reducer, scale_m)
    }

    fn list_scenes(
        &self,
        collection: &str,
        roi: &Roi,
        range: &DateRange,
    ) -> ReforestResult<Vec<SceneInfo>> {
        (**self).list_scenes(collection, roi, range)
    }
}

impl<B: GeoBackend + ?Sized> GeoBackend for Box<B> {
    fn clip(&self, layer: &LayerRef, roi: &Roi) -> ReforestResult<Raster> {
        (**self).clip(layer, roi)
    }

    fn terrain_slope(&self, elevation: &Raster) -> ReforestResult<Raster> {
        (**self).terrain_slope(elevation)
    }

    fn reduce_region(
        &self,
        raster: &Raster,
        roi: &Roi,
        reducer: Reducer,
        scale_m: f64,
    ) -> ReforestResult<ClassHistogram> {
        (**self).reduce_region(raster, roi, reducer, scale_m)
    }

    fn list_scenes(
        &self,
        collection: &str,
        roi: &Roi,
        range: &DateRange,
    ) -> ReforestResult<Vec<SceneInfo>> {
        (**self).list_scenes(collection, roi, range)
    }
}
