use serde::{Deserialize, Serialize};

use crate::collect::backend::GeoBackend;
use crate::collect::scenes::{select_clearest, DateRange, SceneInfo};
use crate::commons::basic_functions::hex_color;
use crate::config::PipelineConfig;
use crate::error::ReforestResult;
use crate::geo_core::BoundingBox;
use crate::geometric::land_cover::Legend;
use crate::geometric::masks::MaskBuilder;
use crate::geometric::report::{AreaClassifier, AreaTable, BucketSummary, PlantableReport};
use crate::geometric::roi::Roi;
use crate::geometric::slope::SlopeThreshold;
use crate::geometric::zonal::ZonalAggregator;

/// Region of an analysis request
#[derive(Debug, Clone)]
pub enum RoiSource {
    /// GeoJSON FeatureCollection text as pasted or uploaded by the user
    GeoJson(String),
    Resolved(Roi),
}

/// One user action: a region, a slope threshold and optionally a scene search
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub roi: RoiSource,
    pub threshold: SlopeThreshold,
    /// Date range of the clearest-scene search, if wanted
    pub scenes: Option<DateRange>,
}

impl AnalysisRequest {
    pub fn from_geojson(text: impl Into<String>, threshold: SlopeThreshold) -> Self {
        AnalysisRequest {
            roi: RoiSource::GeoJson(text.into()),
            threshold,
            scenes: None,
        }
    }

    pub fn from_roi(roi: Roi, threshold: SlopeThreshold) -> Self {
        AnalysisRequest {
            roi: RoiSource::Resolved(roi),
            threshold,
            scenes: None,
        }
    }

    pub fn with_scenes(mut self, range: DateRange) -> Self {
        self.scenes = Some(range);
        self
    }
}

/// Everything shown for one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandCoverReport {
    pub roi_bbox: BoundingBox,
    pub threshold: SlopeThreshold,
    /// `#rrggbb` color of the below-threshold slope layer
    pub slope_palette: String,
    /// All classes in the region
    pub classes: AreaTable,
    pub buckets: BucketSummary,
    /// Classes of the non-forested mask, any slope
    pub non_forested: AreaTable,
    pub plantable: PlantableReport,
    /// Clearest scenes, empty unless requested
    pub scenes: Vec<SceneInfo>,
}

/// ROI -> masks -> histograms -> area report, against one backend
pub struct ReforestationPipeline<B: GeoBackend> {
    backend: B,
    config: PipelineConfig,
    aggregator: ZonalAggregator,
    masks: MaskBuilder,
    classifier: AreaClassifier,
}

impl<B: GeoBackend> ReforestationPipeline<B> {
    pub fn new(backend: B, config: PipelineConfig) -> ReforestResult<Self> {
        Self::with_legend(backend, config, Legend::nlcd())
    }

    pub fn with_legend(backend: B, config: PipelineConfig, legend: Legend) -> ReforestResult<Self> {
        let aggregator = config.aggregator()?;
        let classifier = AreaClassifier::new(legend, config.buckets()?, aggregator.pixel_area_km2());
        let masks = config.mask_builder();
        Ok(ReforestationPipeline {
            backend,
            config,
            aggregator,
            masks,
            classifier,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage; the first failure aborts the run
    pub fn run(&self, request: &AnalysisRequest) -> ReforestResult<LandCoverReport> {
        let parsed;
        let roi = match &request.roi {
            RoiSource::GeoJson(text) => {
                parsed = Roi::from_geojson_str(text)?;
                &parsed
            }
            RoiSource::Resolved(roi) => roi,
        };
        let bbox = roi.bbox();
        log::info!(
            "Analysing ROI [{:.6}, {:.6}, {:.6}, {:.6}] at {} slope threshold",
            bbox.min_x,
            bbox.min_y,
            bbox.max_x,
            bbox.max_y,
            request.threshold
        );

        let classes = self.backend.clip(&self.config.land_cover, roi)?;
        let elevation = self.backend.clip(&self.config.elevation, roi)?;
        let mut slope = self.backend.terrain_slope(&elevation)?;
        log::info!("Fetched {}x{} land-cover pixels", classes.width, classes.height);
        if !slope.same_grid(&classes) {
            log::debug!(
                "Resampling {}x{} slope onto the {}x{} land-cover grid",
                slope.width,
                slope.height,
                classes.width,
                classes.height
            );
            slope = slope.resample_to(&classes)?;
        }

        let masks = self.masks.build(&classes, &slope, request.threshold)?;
        let plantable_mask = masks.plantable()?;

        let all_hist = self.aggregator.reduce(&self.backend, &classes, roi, None)?;
        let non_forested_hist =
            self.aggregator
                .reduce(&self.backend, &classes, roi, Some(&masks.non_forested))?;
        let plantable_hist = self
            .aggregator
            .reduce(&self.backend, &classes, roi, Some(&plantable_mask))?;

        let table = self.classifier.table(&all_hist);
        let buckets = self.classifier.summarize(&table);
        let non_forested = self.classifier.table(&non_forested_hist);
        let plantable = self
            .classifier
            .plantable(&plantable_hist, &buckets)
            .with_threshold(request.threshold);
        log::info!("{}", buckets);
        log::info!("{}", plantable);

        let scenes = match &request.scenes {
            Some(range) => self.clearest_scenes(roi, range)?,
            None => Vec::new(),
        };

        Ok(LandCoverReport {
            roi_bbox: bbox,
            threshold: request.threshold,
            slope_palette: hex_color(request.threshold.palette()),
            classes: table,
            buckets,
            non_forested,
            plantable,
            scenes,
        })
    }

    /// Clearest scenes of the configured collection over the region
    pub fn clearest_scenes(&self, roi: &Roi, range: &DateRange) -> ReforestResult<Vec<SceneInfo>> {
        let scenes = &self.config.scenes;
        let candidates = self.backend.list_scenes(&scenes.collection, roi, range)?;
        let count = candidates.len();
        let kept = select_clearest(candidates, scenes.max_cloud_pct, scenes.limit);
        log::info!(
            "Kept {} of {} {} scenes under {}% cloud",
            kept.len(),
            count,
            scenes.collection,
            scenes.max_cloud_pct
        );
        Ok(kept)
    }
}
