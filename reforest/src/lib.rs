//! Land-cover and slope zonal statistics for reforestation screening.
//!
//! A region of interest is clipped against a land-cover layer and an
//! elevation layer, masked into forested / non-forested / low-slope pixels,
//! reduced into class histograms and reported as areas in km².
//! Raster primitives are delegated to a [`collect::backend::GeoBackend`].

pub mod collect;
pub mod commons;
pub mod config;
pub mod error;
pub mod geo_core;
pub mod geometric;
pub mod pipeline;

pub use collect::backend::{GeoBackend, LayerRef, Reducer};
#[cfg(feature = "reqwest")]
pub use collect::http::HttpBackend;
pub use collect::memory::MemoryBackend;
pub use collect::scenes::{select_clearest, DateRange, SceneInfo};
pub use config::PipelineConfig;
pub use error::{ReforestError, ReforestResult};
pub use geometric::land_cover::{Bucket, CategoryBuckets, ClassCode, Legend};
pub use geometric::masks::{ExclusionSet, LandCoverMasks, MaskBuilder};
pub use geometric::raster::{PixelMask, Raster};
pub use geometric::report::{AreaClassifier, AreaTable, BucketSummary, PlantableReport};
pub use geometric::roi::Roi;
pub use geometric::slope::{SlopeThreshold, SlopeUnit};
pub use geometric::zonal::{ClassHistogram, ZonalAggregator};
pub use pipeline::{AnalysisRequest, LandCoverReport, ReforestationPipeline, RoiSource};
