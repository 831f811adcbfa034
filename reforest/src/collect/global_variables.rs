/// Reduction scale in meters per pixel
pub const DEFAULT_SCALE_M: f64 = 30.0;

/// NLCD 2021 land-cover image and the band holding class codes
pub const NLCD_LAYER: &str = "USGS/NLCD_RELEASES/2021_REL/NLCD/2021";
pub const NLCD_BAND: &str = "landcover";

/// SRTM elevation used to derive slope
pub const ELEVATION_LAYER: &str = "CGIAR/SRTM90_V4";

/// Sentinel-2 collection searched for the clearest scenes
pub const SENTINEL2_COLLECTION: &str = "COPERNICUS/S2";

/// Scenes at or above this cloudy pixel percentage are dropped
pub const MAX_CLOUDY_PIXEL_PERCENTAGE: f64 = 10.0;

/// Maximum number of clearest scenes kept
pub const MAX_SCENES: usize = 5;

/// Backend request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080/api/v1/";
