use anyhow::Result;
use reforest::collect::global_variables::{ELEVATION_LAYER, NLCD_LAYER};
use reforest::geo_core::GeoTransform;
use reforest::{
    AnalysisRequest, MemoryBackend, PipelineConfig, Raster, ReforestationPipeline, SlopeThreshold,
};

const ROI: &str = r#"{
    "type": "FeatureCollection",
    "features": [{
        "type": "Feature",
        "properties": {},
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[0, 0], [300, 0], [300, 300], [0, 300], [0, 0]]]
        }
    }]
}"#;

/// Example: plantable area over a synthetic 10x10 scene held in memory
fn main() -> Result<()> {
    env_logger::init();
    println!("=== Example: Plantable area from in-memory layers ===\n");

    // 30 m pixels: forest in the north, scrub and grassland below, a lake in the corner
    let transform = GeoTransform::north_up(0.0, 300.0, 30.0, 30.0);
    let classes: Vec<f64> = (0..10)
        .flat_map(|row| {
            (0..10).map(move |col| match (row, col) {
                (r, c) if r >= 8 && c >= 8 => 11.0,
                (r, _) if r < 3 => 41.0,
                (_, c) if c < 5 => 52.0,
                _ => 71.0,
            })
        })
        .collect();
    // hillside steepening towards the east
    let elevation: Vec<f64> = (0..10)
        .flat_map(|_| (0..10).map(|col| (col * col) as f64 * 0.5))
        .collect();

    let backend = MemoryBackend::new()
        .with_layer(NLCD_LAYER, Raster::new("landcover", 10, 10, transform, classes)?)
        .with_layer(ELEVATION_LAYER, Raster::new("elevation", 10, 10, transform, elevation)?);
    let pipeline = ReforestationPipeline::new(backend, PipelineConfig::default())?;

    for threshold in SlopeThreshold::ALL {
        let report = pipeline.run(&AnalysisRequest::from_geojson(ROI, threshold))?;

        println!("Slope threshold {} (layer color {})", threshold, report.slope_palette);
        println!("{}", report.buckets);
        println!("{}", report.plantable);
        for row in &report.plantable.table.rows {
            println!("  - {:<28} {:>8.4} Sq. Km ({:.2}%)", row.label, row.area_km2, row.percentage);
        }
        println!();
    }

    let report = pipeline.run(&AnalysisRequest::from_geojson(ROI, SlopeThreshold::Twenty))?;
    println!("Land-cover breakdown:");
    for row in &report.classes.rows {
        println!(
            "  - {:>3} {:<28} {:>8.4} Sq. Km ({:.2}%) [{}]",
            row.code, row.label, row.area_km2, row.percentage, row.bucket
        );
    }

    println!("\nPie chart slices:");
    for (bucket, area, color) in report.buckets.pie_slices() {
        println!("  - {:<14} {:>8.4} Sq. Km {}", bucket.to_string(), area, color);
    }

    std::fs::create_dir_all("./output")?;
    report
        .classes
        .write_csv_file(std::path::Path::new("./output/land_cover_areas.csv"))?;
    println!("\nArea table saved to ./output/land_cover_areas.csv");

    Ok(())
}
