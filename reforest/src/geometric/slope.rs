//! Slope thresholds and Horn (1981) terrain slope.
//!
//! Thresholds are percent grade. `terrain_slope` is what the in-memory backend
//! uses for the `terrain_slope` capability; remote backends compute their own.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ReforestError, ReforestResult};
use crate::geometric::raster::Raster;

/// Slope cutoff separating plantable (below) from too-steep (at or above)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SlopeThreshold {
    Ten,
    Twenty,
    Thirty,
}

impl SlopeThreshold {
    pub const ALL: [SlopeThreshold; 3] = [
        SlopeThreshold::Thirty,
        SlopeThreshold::Twenty,
        SlopeThreshold::Ten,
    ];

    pub fn percent(&self) -> u32 {
        match self {
            SlopeThreshold::Ten => 10,
            SlopeThreshold::Twenty => 20,
            SlopeThreshold::Thirty => 30,
        }
    }

    pub fn value(&self) -> f64 {
        self.percent() as f64
    }

    /// Display color of the below-threshold slope layer
    pub fn palette(&self) -> &'static str {
        match self {
            SlopeThreshold::Ten => "FFFF00",
            SlopeThreshold::Twenty => "00FF00",
            SlopeThreshold::Thirty => "0000FF",
        }
    }
}

impl TryFrom<u32> for SlopeThreshold {
    type Error = ReforestError;

    fn try_from(percent: u32) -> Result<Self, Self::Error> {
        match percent {
            10 => Ok(SlopeThreshold::Ten),
            20 => Ok(SlopeThreshold::Twenty),
            30 => Ok(SlopeThreshold::Thirty),
            other => Err(ReforestError::InvalidParameter(format!(
                "slope threshold must be 10, 20 or 30 percent, got {}",
                other
            ))),
        }
    }
}

impl From<SlopeThreshold> for u32 {
    fn from(t: SlopeThreshold) -> u32 {
        t.percent()
    }
}

impl fmt::Display for SlopeThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Unit of computed slope values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlopeUnit {
    #[default]
    Percent,
    Degrees,
}

/// Band name of rasters produced by `terrain_slope`
pub const SLOPE_BAND: &str = "slope";

/// Horn-method slope of an elevation raster
///
/// Cell sizes come from the geotransform; geographic rasters are converted to
/// meters at the raster's centre latitude. Edge pixels reuse the nearest
/// in-grid neighbour. No-data neighbours, such as pixels outside a clipped
/// ROI, take the centre value, so pixels along the ROI edge keep a slope.
/// No-data pixels stay NaN.
pub fn terrain_slope(elevation: &Raster, unit: SlopeUnit) -> ReforestResult<Raster> {
    let (w, h) = (elevation.width, elevation.height);
    if w == 0 || h == 0 {
        return elevation.with_data(SLOPE_BAND, Vec::new());
    }

    let (_, center_lat) = elevation.transform.pixel_center(w / 2, h / 2);
    let (dx, dy) = elevation.transform.pixel_size_m(center_lat);
    if !(dx > 0.0 && dy > 0.0) {
        return Err(ReforestError::InvalidParameter(format!(
            "elevation raster has degenerate pixel size {}x{} m",
            dx, dy
        )));
    }

    let z = elevation.data();
    let clamped = |r: isize, c: isize| {
        let r = r.clamp(0, h as isize - 1) as usize;
        let c = c.clamp(0, w as isize - 1) as usize;
        z[r * w + c]
    };

    let mut out = vec![f64::NAN; w * h];
    out.par_chunks_mut(w).enumerate().for_each(|(r, row)| {
        let r = r as isize;
        for (c, cell) in row.iter_mut().enumerate() {
            let c = c as isize;
            let centre = clamped(r, c);
            if centre.is_nan() {
                continue;
            }
            // no-data neighbours (outside the ROI) stand in as the centre
            let at = |dr: isize, dc: isize| {
                let v = clamped(r + dr, c + dc);
                if v.is_nan() {
                    centre
                } else {
                    v
                }
            };
            let nw = at(-1, -1);
            let n = at(-1, 0);
            let ne = at(-1, 1);
            let west = at(0, -1);
            let east = at(0, 1);
            let sw = at(1, -1);
            let s = at(1, 0);
            let se = at(1, 1);

            let dz_dx = ((ne + 2.0 * east + se) - (nw + 2.0 * west + sw)) / (8.0 * dx);
            let dz_dy = ((nw + 2.0 * n + ne) - (sw + 2.0 * s + se)) / (8.0 * dy);
            let rise = (dz_dx * dz_dx + dz_dy * dz_dy).sqrt();

            *cell = match unit {
                SlopeUnit::Percent => rise * 100.0,
                SlopeUnit::Degrees => rise.atan().to_degrees(),
            };
        }
    });

    elevation.with_data(SLOPE_BAND, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_core::GeoTransform;
    use approx::assert_relative_eq;

    fn ramp(width: usize, height: usize, rise_per_col: f64) -> Raster {
        let data = (0..height)
            .flat_map(|_| (0..width).map(move |c| c as f64 * rise_per_col))
            .collect();
        Raster::new(
            "elevation",
            width,
            height,
            GeoTransform::north_up(500_000.0, 4_000_000.0, 30.0, 30.0),
            data,
        )
        .unwrap()
    }

    #[test]
    fn test_threshold_values() {
        assert_eq!(SlopeThreshold::try_from(20).unwrap(), SlopeThreshold::Twenty);
        assert!(SlopeThreshold::try_from(15).is_err());
        assert_eq!(SlopeThreshold::Ten.palette(), "FFFF00");
        assert_eq!(SlopeThreshold::Thirty.to_string(), "30%");
    }

    #[test]
    fn test_threshold_serde() {
        let t: SlopeThreshold = serde_json::from_str("10").unwrap();
        assert_eq!(t, SlopeThreshold::Ten);
        assert!(serde_json::from_str::<SlopeThreshold>("25").is_err());
        assert_eq!(serde_json::to_string(&SlopeThreshold::Twenty).unwrap(), "20");
    }

    #[test]
    fn test_flat_terrain_has_zero_slope() {
        let slope = terrain_slope(&ramp(4, 4, 0.0), SlopeUnit::Percent).unwrap();
        assert!(slope.data().iter().all(|v| *v == 0.0));
        assert_eq!(slope.band, SLOPE_BAND);
    }

    #[test]
    fn test_interior_ramp_slope() {
        // 3 m rise per 30 m pixel is a 10% grade
        let slope = terrain_slope(&ramp(5, 5, 3.0), SlopeUnit::Percent).unwrap();
        assert_relative_eq!(slope.get(2, 2).unwrap(), 10.0, epsilon = 1e-9);

        let deg = terrain_slope(&ramp(5, 5, 30.0), SlopeUnit::Degrees).unwrap();
        assert_relative_eq!(deg.get(2, 2).unwrap(), 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_nodata_stays_nodata() {
        let mut data = vec![0.0; 9];
        data[4] = f64::NAN;
        let r = Raster::new("elevation", 3, 3, GeoTransform::north_up(0.0, 0.0, 30.0, 30.0), data)
            .unwrap();
        let slope = terrain_slope(&r, SlopeUnit::Percent).unwrap();
        assert_eq!(slope.get(1, 1), None);
        assert_eq!(slope.valid_count(), 8);
        assert!(slope.data().iter().filter(|v| !v.is_nan()).all(|v| *v == 0.0));
    }

    #[test]
    fn test_clipped_edge_keeps_slope() {
        // ramp with the eastern column clipped away
        let mut elevation = ramp(5, 5, 3.0);
        let data = elevation
            .data()
            .iter()
            .enumerate()
            .map(|(i, v)| if i % 5 == 4 { f64::NAN } else { *v })
            .collect();
        elevation = elevation.with_data("elevation", data).unwrap();

        let slope = terrain_slope(&elevation, SlopeUnit::Percent).unwrap();
        assert_eq!(slope.valid_count(), 20);
        // next to the clipped column: (9 - 6) * 4 m over 8 * 30 m, 5% as on a grid edge
        assert_relative_eq!(slope.get(3, 2).unwrap(), 5.0, epsilon = 1e-9);
        assert_relative_eq!(slope.get(2, 2).unwrap(), 10.0, epsilon = 1e-9);
    }
}
