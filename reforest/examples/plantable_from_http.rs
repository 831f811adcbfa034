use anyhow::{Context, Result};
use reforest::{AnalysisRequest, DateRange, HttpBackend, PipelineConfig, ReforestationPipeline, SlopeThreshold};
use std::path::Path;

/// Example: plantable area computed by a remote geoprocessing service
///
/// Usage: plantable_from_http <roi.geojson> [config.json] [threshold]
fn main() -> Result<()> {
    env_logger::init();
    println!("=== Example: Plantable area from a geoprocessing service ===\n");

    let args: Vec<String> = std::env::args().collect();
    let roi_path = args
        .get(1)
        .context("Usage: plantable_from_http <roi.geojson> [config.json] [threshold]")?;
    let config = match args.get(2) {
        Some(path) => PipelineConfig::from_json_file(Path::new(path))?,
        None => PipelineConfig::default(),
    };
    let threshold = match args.get(3) {
        Some(t) => SlopeThreshold::try_from(t.parse::<u32>().context("Threshold must be 10, 20 or 30")?)?,
        None => SlopeThreshold::Twenty,
    };

    let geojson = std::fs::read_to_string(roi_path)
        .context(format!("Failed to read ROI file: {}", roi_path))?;

    println!("Backend: {}", config.backend.base_url);
    println!("Land cover: {}", config.land_cover);
    println!("Elevation: {}", config.elevation);
    println!("Scale: {} m\n", config.scale_m);

    let backend = HttpBackend::new(&config.backend)?.with_scale(config.scale_m);
    let pipeline = ReforestationPipeline::new(backend, config)?;

    let request = AnalysisRequest::from_geojson(geojson, threshold).with_scenes(DateRange::year(2021)?);
    let report = pipeline.run(&request).context("Land-cover analysis failed")?;

    println!("{}", report.buckets);
    println!("{}\n", report.plantable);

    println!("Non-forested land-cover class breakdown:");
    for row in &report.non_forested.rows {
        println!("  - {:<28} {:>8.2} Sq. Km ({:.2}%)", row.label, row.area_km2, row.percentage);
    }

    println!("\nClearest scenes:");
    for scene in &report.scenes {
        println!(
            "  - {} ({}, {:.1}% cloud)",
            scene.id,
            scene.formatted_date(),
            scene.cloudy_pixel_percentage
        );
    }

    Ok(())
}
