use std::cell::Cell;

use approx::assert_relative_eq;
use reforest::collect::global_variables::{ELEVATION_LAYER, NLCD_LAYER};
use reforest::geo_core::GeoTransform;
use reforest::{
    AnalysisRequest, ClassHistogram, GeoBackend, LayerRef, MemoryBackend, PipelineConfig, Raster,
    Reducer, ReforestError, ReforestResult, ReforestationPipeline, Roi, SlopeThreshold,
};

const ROI_GEOJSON: &str = r#"{
    "type": "FeatureCollection",
    "features": [{
        "type": "Feature",
        "properties": {},
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[0, 0], [120, 0], [120, 120], [0, 120], [0, 0]]]
        }
    }]
}"#;

/// Wraps a backend, counting calls and optionally failing one capability
struct FakeBackend {
    inner: MemoryBackend,
    calls: Cell<usize>,
    fail_slope: bool,
}

impl FakeBackend {
    fn new(inner: MemoryBackend) -> Self {
        FakeBackend {
            inner,
            calls: Cell::new(0),
            fail_slope: false,
        }
    }

    fn tick(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl GeoBackend for FakeBackend {
    fn clip(&self, layer: &LayerRef, roi: &Roi) -> ReforestResult<Raster> {
        self.tick();
        self.inner.clip(layer, roi)
    }

    fn terrain_slope(&self, elevation: &Raster) -> ReforestResult<Raster> {
        self.tick();
        if self.fail_slope {
            return Err(ReforestError::UpstreamService("terrain service unavailable".into()));
        }
        self.inner.terrain_slope(elevation)
    }

    fn reduce_region(
        &self,
        raster: &Raster,
        roi: &Roi,
        reducer: Reducer,
        scale_m: f64,
    ) -> ReforestResult<ClassHistogram> {
        self.tick();
        self.inner.reduce_region(raster, roi, reducer, scale_m)
    }
}

/// 4x4 grid of 30 m pixels with a 6 m rise per row going south
fn memory_backend() -> MemoryBackend {
    let transform = GeoTransform::north_up(0.0, 120.0, 30.0, 30.0);
    #[rustfmt::skip]
    let classes = vec![
        41.0, 42.0, 52.0, 71.0,
        43.0, 52.0, 71.0, 31.0,
        21.0, 82.0, 90.0, 11.0,
        52.0, 71.0, 95.0, 11.0,
    ];
    let elevation = (0..4)
        .flat_map(|row| (0..4).map(move |_| row as f64 * 6.0))
        .collect();
    MemoryBackend::new()
        .with_layer(
            NLCD_LAYER,
            Raster::new("landcover", 4, 4, transform, classes).unwrap(),
        )
        .with_layer(
            ELEVATION_LAYER,
            Raster::new("elevation", 4, 4, transform, elevation).unwrap(),
        )
}

fn pipeline(backend: FakeBackend) -> ReforestationPipeline<FakeBackend> {
    ReforestationPipeline::new(backend, PipelineConfig::default()).unwrap()
}

#[test]
fn test_malformed_roi_fails_before_any_backend_call() {
    let pipeline = pipeline(FakeBackend::new(memory_backend()));
    let err = pipeline
        .run(&AnalysisRequest::from_geojson("{not json", SlopeThreshold::Twenty))
        .unwrap_err();
    assert!(matches!(err, ReforestError::MalformedInput(_)));
    assert!(!err.is_retryable());
    assert_eq!(pipeline.backend().calls.get(), 0);
}

#[test]
fn test_schema_error_fails_before_any_backend_call() {
    let pipeline = pipeline(FakeBackend::new(memory_backend()));
    let err = pipeline
        .run(&AnalysisRequest::from_geojson(
            r#"{"type": "FeatureCollection", "features": []}"#,
            SlopeThreshold::Twenty,
        ))
        .unwrap_err();
    assert!(matches!(err, ReforestError::Schema(_)));
    assert_eq!(pipeline.backend().calls.get(), 0);
}

#[test]
fn test_upstream_failure_aborts_run() {
    let mut backend = FakeBackend::new(memory_backend());
    backend.fail_slope = true;
    let pipeline = pipeline(backend);
    let err = pipeline
        .run(&AnalysisRequest::from_geojson(ROI_GEOJSON, SlopeThreshold::Twenty))
        .unwrap_err();
    assert!(err.is_retryable());
    // two clips and the failed slope call, no reductions
    assert_eq!(pipeline.backend().calls.get(), 3);
}

#[test]
fn test_full_run_from_geojson() {
    let _ = env_logger::builder().is_test(true).try_init();

    let pipeline = pipeline(FakeBackend::new(memory_backend()));
    let report = pipeline
        .run(&AnalysisRequest::from_geojson(ROI_GEOJSON, SlopeThreshold::Thirty))
        .unwrap();
    assert_eq!(pipeline.backend().calls.get(), 6);

    let percent_sum: f64 = report.classes.rows.iter().map(|r| r.percentage).sum();
    assert_relative_eq!(percent_sum, 100.0, epsilon = 0.01);
    assert_relative_eq!(report.classes.total_km2, 16.0 * 0.0009, epsilon = 1e-12);

    let b = &report.buckets;
    assert_relative_eq!(b.forested_km2 + b.non_forested_km2, b.total_km2, epsilon = 1e-12);
    assert_relative_eq!(b.forested_km2, 3.0 * 0.0009, epsilon = 1e-12);
    // 52 x3, 71 x3, 31, 21, 82, 90, 95
    assert_relative_eq!(b.non_forested_km2, 11.0 * 0.0009, epsilon = 1e-12);

    // 10% grade on the edge rows and 20% inside, all under 30%
    assert_relative_eq!(report.plantable.area_km2, report.non_forested.total_km2, epsilon = 1e-12);
    assert_eq!(report.roi_bbox.max_x, 120.0);
}

#[test]
fn test_plantable_never_exceeds_non_forested() {
    for threshold in SlopeThreshold::ALL {
        let pipeline = pipeline(FakeBackend::new(memory_backend()));
        let report = pipeline
            .run(&AnalysisRequest::from_geojson(ROI_GEOJSON, threshold))
            .unwrap();
        assert!(report.plantable.area_km2 <= report.non_forested.total_km2 + 1e-12);
        assert!(report.non_forested.total_km2 <= report.buckets.non_forested_km2 + 1e-12);
    }
}

#[test]
fn test_run_is_idempotent() {
    let pipeline = pipeline(FakeBackend::new(memory_backend()));
    let request = AnalysisRequest::from_geojson(ROI_GEOJSON, SlopeThreshold::Twenty);
    let first = pipeline.run(&request).unwrap();
    let second = pipeline.run(&request).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_water_only_roi_guards_percentages() {
    let transform = GeoTransform::north_up(0.0, 60.0, 30.0, 30.0);
    let backend = MemoryBackend::new()
        .with_layer(NLCD_LAYER, Raster::filled("landcover", 2, 2, transform, 11.0))
        .with_layer(ELEVATION_LAYER, Raster::filled("elevation", 2, 2, transform, 0.0));
    let roi = Roi::from_rings(vec![vec![[0.0, 0.0], [60.0, 0.0], [60.0, 60.0], [0.0, 60.0], [0.0, 0.0]]])
        .unwrap();
    let pipeline = ReforestationPipeline::new(backend, PipelineConfig::default()).unwrap();
    let report = pipeline
        .run(&AnalysisRequest::from_roi(roi, SlopeThreshold::Ten))
        .unwrap();
    assert!(report.buckets.division_guarded);
    assert_eq!(report.buckets.forested_pct, 0.0);
    assert_eq!(report.plantable.share_of_total_pct, 0.0);
    assert!(report.plantable.table.is_empty());
}

#[test]
fn test_layers_at_different_resolutions() {
    // 30 m land cover and 90 m elevation over the same 180 m square
    let backend = MemoryBackend::new()
        .with_layer(
            NLCD_LAYER,
            Raster::filled("landcover", 6, 6, GeoTransform::north_up(0.0, 180.0, 30.0, 30.0), 71.0),
        )
        .with_layer(
            ELEVATION_LAYER,
            Raster::new(
                "elevation",
                2,
                2,
                GeoTransform::north_up(0.0, 180.0, 90.0, 90.0),
                vec![0.0, 0.0, 9.0, 9.0],
            )
            .unwrap(),
        );
    let geojson = ROI_GEOJSON.replace("120", "180");
    let pipeline = pipeline(FakeBackend::new(backend));
    let report = pipeline
        .run(&AnalysisRequest::from_geojson(geojson, SlopeThreshold::Twenty))
        .unwrap();

    // a 5% grade, so every grassland pixel is plantable
    assert_relative_eq!(report.classes.total_km2, 36.0 * 0.0009, epsilon = 1e-12);
    assert_relative_eq!(report.plantable.area_km2, 36.0 * 0.0009, epsilon = 1e-12);
    assert_relative_eq!(report.plantable.area_km2, report.buckets.non_forested_km2, epsilon = 1e-12);
}
