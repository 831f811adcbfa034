use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::collect::backend::LayerRef;
use crate::collect::global_variables::{
    DEFAULT_BACKEND_URL, DEFAULT_SCALE_M, DEFAULT_TIMEOUT_SECS, ELEVATION_LAYER,
    MAX_CLOUDY_PIXEL_PERCENTAGE, MAX_SCENES, NLCD_BAND, NLCD_LAYER, SENTINEL2_COLLECTION,
};
use crate::error::ReforestResult;
use crate::geometric::land_cover::{
    CategoryBuckets, ClassCode, NLCD_FOREST_CODES, NLCD_NON_FOREST_CODES,
};
use crate::geometric::masks::{ExclusionSet, MaskBuilder};
use crate::geometric::zonal::ZonalAggregator;

/// Remote geoprocessing service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL; endpoint paths are joined onto it
    pub base_url: String,
    pub timeout_secs: u64,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Clearest-scene search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub collection: String,
    pub max_cloud_pct: f64,
    pub limit: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            collection: SENTINEL2_COLLECTION.to_string(),
            max_cloud_pct: MAX_CLOUDY_PIXEL_PERCENTAGE,
            limit: MAX_SCENES,
        }
    }
}

/// Pipeline configuration
///
/// Every field has a default, so a JSON file only lists what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reduction scale, meters per pixel
    pub scale_m: f64,
    pub land_cover: LayerRef,
    pub elevation: LayerRef,
    /// Codes removed from the non-forested mask
    pub exclusions: ExclusionSet,
    pub forest_codes: Vec<ClassCode>,
    pub non_forest_codes: Vec<ClassCode>,
    pub backend: BackendConfig,
    pub scenes: SceneConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            scale_m: DEFAULT_SCALE_M,
            land_cover: LayerRef::with_band(NLCD_LAYER, NLCD_BAND),
            elevation: LayerRef::new(ELEVATION_LAYER),
            exclusions: ExclusionSet::nlcd(),
            forest_codes: NLCD_FOREST_CODES.to_vec(),
            non_forest_codes: NLCD_NON_FOREST_CODES.to_vec(),
            backend: BackendConfig::default(),
            scenes: SceneConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_json::from_str(json).context("Failed to parse pipeline configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .context(format!("Failed to read configuration file: {:?}", path))?;
        Self::from_json_str(&json).context(format!("Invalid configuration in {:?}", path))
    }

    /// Checks the settings that cannot be expressed in the types
    pub fn validate(&self) -> ReforestResult<()> {
        self.aggregator()?;
        self.buckets()?;
        Ok(())
    }

    pub fn aggregator(&self) -> ReforestResult<ZonalAggregator> {
        ZonalAggregator::new(self.scale_m)
    }

    pub fn buckets(&self) -> ReforestResult<CategoryBuckets> {
        CategoryBuckets::new(
            self.forest_codes.iter().copied(),
            self.non_forest_codes.iter().copied(),
        )
    }

    pub fn mask_builder(&self) -> MaskBuilder {
        MaskBuilder::new(self.exclusions.clone(), self.forest_codes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.scale_m, 30.0);
        assert_eq!(config.land_cover.band.as_deref(), Some("landcover"));
        assert_eq!(config.backend.timeout(), Duration::from_secs(60));
        assert_eq!(config.scenes.limit, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = PipelineConfig::from_json_str(
            r#"{
                "scale_m": 10,
                "exclusions": [95, 11, 12, 21, 22, 23, 24, 90],
                "backend": { "timeout_secs": 5 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.scale_m, 10.0);
        assert!(!config.exclusions.contains(81));
        assert_eq!(config.exclusions.codes()[0], 11);
        assert_eq!(config.backend.timeout_secs, 5);
        assert_eq!(config.backend.base_url, DEFAULT_BACKEND_URL);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(PipelineConfig::from_json_str(r#"{"scale_m": -30}"#).is_err());
        assert!(PipelineConfig::from_json_str(
            r#"{"forest_codes": [41], "non_forest_codes": [41, 21]}"#
        )
        .is_err());
        assert!(PipelineConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"elevation": {{"id": "USGS/SRTMGL1_003"}}}}"#).unwrap();
        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.elevation.id, "USGS/SRTMGL1_003");
        assert!(PipelineConfig::from_json_file(Path::new("/nonexistent/config.json")).is_err());
    }
}
