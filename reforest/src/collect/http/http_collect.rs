use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

use crate::collect::backend::{GeoBackend, LayerRef, Reducer};
use crate::collect::global_variables::DEFAULT_SCALE_M;
use crate::collect::scenes::{DateRange, SceneInfo};
use crate::config::BackendConfig;
use crate::error::{ReforestError, ReforestResult};
use crate::geometric::raster::Raster;
use crate::geometric::roi::Roi;
use crate::geometric::zonal::ClassHistogram;

const CLIP_PATH: &str = "clip";
const SLOPE_PATH: &str = "terrain/slope";
const REDUCE_PATH: &str = "reduce";
const SCENES_PATH: &str = "scenes";

#[derive(Debug, Serialize)]
struct ClipRequest<'a> {
    layer: &'a LayerRef,
    roi: geojson::Geometry,
    scale: f64,
}

#[derive(Debug, Serialize)]
struct SlopeRequest<'a> {
    elevation: &'a Raster,
}

#[derive(Debug, Serialize)]
struct ReduceRequest<'a> {
    raster: &'a Raster,
    roi: geojson::Geometry,
    reducer: Reducer,
    scale: f64,
}

#[derive(Debug, Serialize)]
struct ScenesRequest<'a> {
    collection: &'a str,
    roi: geojson::Geometry,
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct ScenesResponse {
    scenes: Vec<SceneInfo>,
}

/// Geoprocessing backend reached over HTTP
///
/// Each capability is a JSON `POST` relative to the base URL:
/// - `clip`: `{layer, roi, scale}` -> raster
/// - `terrain/slope`: `{elevation}` -> raster
/// - `reduce`: `{raster, roi, reducer, scale}` -> `{band: {code: count}}`
/// - `scenes`: `{collection, roi, start, end}` -> `{scenes: [...]}`
///
/// Every layer is clipped at the same `scale` in meters, so the service
/// returns them on a common grid. Requests time out after
/// `BackendConfig::timeout_secs`.
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    scale_m: f64,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> ReforestResult<Self> {
        // Paths are joined onto the base, which therefore has to end with '/'
        let base = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };
        let base_url = Url::parse(&base).map_err(|e| {
            ReforestError::InvalidParameter(format!("invalid backend URL '{}': {}", base, e))
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                ReforestError::UpstreamService(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(HttpBackend {
            client,
            base_url,
            scale_m: DEFAULT_SCALE_M,
        })
    }

    /// Pixel size in meters asked of the service when clipping
    pub fn with_scale(mut self, scale_m: f64) -> Self {
        self.scale_m = scale_m;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ReforestResult<Url> {
        self.base_url.join(path).map_err(|e| {
            ReforestError::InvalidParameter(format!("invalid endpoint '{}': {}", path, e))
        })
    }

    fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> ReforestResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        log::debug!("POST {}", url);

        let response = self.client.post(url.clone()).json(body).send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(ReforestError::UpstreamService(format!(
                "{} returned {}: {}",
                url, status, body
            )));
        }

        let bytes = response.bytes()?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ReforestError::UpstreamService(format!("unreadable response from {}: {}", url, e))
        })
    }
}

/// Histogram of `band` in a reduction response
fn histogram_for_band(
    mut response: HashMap<String, ClassHistogram>,
    band: &str,
) -> ReforestResult<ClassHistogram> {
    if let Some(histogram) = response.remove(band) {
        return Ok(histogram);
    }
    // A single-band answer under another key is still unambiguous
    if response.len() == 1 {
        if let Some((_, histogram)) = response.into_iter().next() {
            return Ok(histogram);
        }
    }
    Err(ReforestError::UpstreamService(format!(
        "reduction response has no histogram for band '{}'",
        band
    )))
}

impl GeoBackend for HttpBackend {
    fn clip(&self, layer: &LayerRef, roi: &Roi) -> ReforestResult<Raster> {
        log::info!("Clipping {} to ROI at {} m", layer, self.scale_m);
        // Grid consistency is checked while deserializing
        self.post_json(
            CLIP_PATH,
            &ClipRequest {
                layer,
                roi: roi.to_geojson(),
                scale: self.scale_m,
            },
        )
    }

    fn terrain_slope(&self, elevation: &Raster) -> ReforestResult<Raster> {
        log::info!("Computing terrain slope");
        let slope: Raster = self.post_json(SLOPE_PATH, &SlopeRequest { elevation })?;
        if !slope.same_shape(elevation.width, elevation.height) || slope.len() != elevation.len() {
            return Err(ReforestError::UpstreamService(format!(
                "slope raster is {}x{}, elevation is {}x{}",
                slope.width, slope.height, elevation.width, elevation.height
            )));
        }
        Ok(slope)
    }

    fn reduce_region(
        &self,
        raster: &Raster,
        roi: &Roi,
        reducer: Reducer,
        scale_m: f64,
    ) -> ReforestResult<ClassHistogram> {
        log::info!("Reducing '{}' over ROI at {} m", raster.band, scale_m);
        let response: HashMap<String, ClassHistogram> = self.post_json(
            REDUCE_PATH,
            &ReduceRequest {
                raster,
                roi: roi.to_geojson(),
                reducer,
                scale: scale_m,
            },
        )?;
        histogram_for_band(response, &raster.band)
    }

    fn list_scenes(
        &self,
        collection: &str,
        roi: &Roi,
        range: &DateRange,
    ) -> ReforestResult<Vec<SceneInfo>> {
        log::info!("Listing {} scenes from {} to {}", collection, range.start, range.end);
        let response: ScenesResponse = self.post_json(
            SCENES_PATH,
            &ScenesRequest {
                collection,
                roi: roi.to_geojson(),
                start: range.start.to_string(),
                end: range.end.to_string(),
            },
        )?;
        Ok(response.scenes)
    }
}
