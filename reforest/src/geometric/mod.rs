pub mod land_cover;
pub mod masks;
pub mod raster;
pub mod report;
pub mod roi;
pub mod slope;
pub mod zonal;
