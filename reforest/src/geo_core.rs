use serde::{Deserialize, Serialize};

/// Meters per degree of latitude (approximation used for pixel sizes)
pub const DEG_TO_M_LAT: f64 = 111_320.0;

/// Earth circumference at the equator in meters
const EARTH_CIRCUMFERENCE_M: f64 = 40_075_000.0;

/// Meters per degree of longitude at a given latitude
pub fn deg_to_m_lon(lat: f64) -> f64 {
    EARTH_CIRCUMFERENCE_M * lat.to_radians().cos() / 360.0
}

/// Bounding box structure
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64, // min longitude
    pub min_y: f64, // min latitude
    pub max_x: f64, // max longitude
    pub max_y: f64, // max latitude
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box holding every `[x, y]` pair, `None` when there are none
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a [f64; 2]>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = BoundingBox::new(first[0], first[1], first[0], first[1]);
        for p in iter {
            bbox.min_x = bbox.min_x.min(p[0]);
            bbox.min_y = bbox.min_y.min(p[1]);
            bbox.max_x = bbox.max_x.max(p[0]);
            bbox.max_y = bbox.max_y.max(p[1]);
        }
        Some(bbox)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Affine geotransform, GDAL ordering
/// `x = top_left_x + col * pixel_width + row * rotation_x`
/// `y = top_left_y + col * rotation_y + row * pixel_height`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64, // negative for north-up rasters
}

impl GeoTransform {
    /// North-up transform from origin and square-ish pixel sizes
    pub fn north_up(top_left_x: f64, top_left_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        GeoTransform {
            top_left_x,
            pixel_width,
            rotation_x: 0.0,
            top_left_y,
            rotation_y: 0.0,
            pixel_height: -pixel_height.abs(),
        }
    }

    pub fn from_gdal(gt: [f64; 6]) -> Self {
        GeoTransform {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// Coordinates of the centre of pixel (col, row)
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        let c = col as f64 + 0.5;
        let r = row as f64 + 0.5;
        (
            self.top_left_x + c * self.pixel_width + r * self.rotation_x,
            self.top_left_y + c * self.rotation_y + r * self.pixel_height,
        )
    }

    /// Transform of the sub-grid starting at (col, row)
    pub fn offset(&self, col: usize, row: usize) -> Self {
        let c = col as f64;
        let r = row as f64;
        GeoTransform {
            top_left_x: self.top_left_x + c * self.pixel_width + r * self.rotation_x,
            top_left_y: self.top_left_y + c * self.rotation_y + r * self.pixel_height,
            ..*self
        }
    }

    /// Unrotated, with rows running south
    pub fn is_north_up(&self) -> bool {
        self.rotation_x == 0.0
            && self.rotation_y == 0.0
            && self.pixel_width > 0.0
            && self.pixel_height < 0.0
    }

    /// Whether coordinates look like geographic degrees rather than meters
    pub fn is_geographic(&self) -> bool {
        self.pixel_width.abs() < 1.0
            && self.top_left_x.abs() <= 360.0
            && self.top_left_y.abs() <= 90.0
    }

    /// Pixel size in meters (x, y) around the given latitude
    pub fn pixel_size_m(&self, lat: f64) -> (f64, f64) {
        if self.is_geographic() {
            (
                self.pixel_width.abs() * deg_to_m_lon(lat),
                self.pixel_height.abs() * DEG_TO_M_LAT,
            )
        } else {
            (self.pixel_width.abs(), self.pixel_height.abs())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounding_box() {
        let bbox: BoundingBox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(bbox.min_x, 0.0);
        assert_eq!(bbox.max_x, 1.0);
        assert!(bbox.contains(0.5, 0.5));
        assert!(!bbox.contains(1.5, 0.5));
    }

    #[test]
    fn test_bounding_box_from_points() {
        let pts = [[-80.7, 38.4], [-80.6, 38.5], [-80.65, 38.3]];
        let bbox = BoundingBox::from_points(pts.iter()).unwrap();
        assert_eq!(bbox.min_x, -80.7);
        assert_eq!(bbox.max_x, -80.6);
        assert_eq!(bbox.min_y, 38.3);
        assert_eq!(bbox.max_y, 38.5);
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_pixel_center_north_up() {
        let gt = GeoTransform::north_up(10.0, 20.0, 2.0, 2.0);
        assert_eq!(gt.pixel_center(0, 0), (11.0, 19.0));
        assert_eq!(gt.pixel_center(1, 2), (13.0, 15.0));
        let sub = gt.offset(1, 2);
        assert_eq!(sub.pixel_center(0, 0), (13.0, 15.0));
    }

    #[test]
    fn test_is_north_up() {
        assert!(GeoTransform::north_up(0.0, 90.0, 30.0, 30.0).is_north_up());
        let rotated = GeoTransform::from_gdal([0.0, 30.0, 1.0, 90.0, 0.0, -30.0]);
        assert!(!rotated.is_north_up());
        let south_up = GeoTransform::from_gdal([0.0, 30.0, 0.0, 90.0, 0.0, 30.0]);
        assert!(!south_up.is_north_up());
    }

    #[test]
    fn test_pixel_size_m() {
        let projected = GeoTransform::north_up(500_000.0, 4_000_000.0, 30.0, 30.0);
        assert_eq!(projected.pixel_size_m(0.0), (30.0, 30.0));

        let geographic = GeoTransform::north_up(-81.0, 39.0, 0.001, 0.001);
        let (dx, dy) = geographic.pixel_size_m(0.0);
        assert_relative_eq!(dy, 111.32, epsilon = 1e-9);
        assert_relative_eq!(dx, 40_075.0 / 360.0, epsilon = 1e-9);
    }
}
