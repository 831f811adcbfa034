use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::collect::backend::{GeoBackend, Reducer};
use crate::collect::global_variables::DEFAULT_SCALE_M;
use crate::error::{ReforestError, ReforestResult};
use crate::geometric::land_cover::ClassCode;
use crate::geometric::raster::{PixelMask, Raster};
use crate::geometric::roi::Roi;

/// Square meters in a square kilometer
const M2_PER_KM2: f64 = 1_000_000.0;

/// Pixel count per class code
///
/// Counts are `f64`: remote reducers may weight pixels cut by the region edge.
/// On the wire this is a JSON object keyed by the code as a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassHistogram(BTreeMap<ClassCode, f64>);

impl ClassHistogram {
    pub fn new() -> Self {
        ClassHistogram(BTreeMap::new())
    }

    pub fn from_counts<I>(counts: I) -> Self
    where
        I: IntoIterator<Item = (ClassCode, f64)>,
    {
        let mut hist = ClassHistogram::new();
        for (code, count) in counts {
            hist.add(code, count);
        }
        hist
    }

    pub fn add(&mut self, code: ClassCode, count: f64) {
        *self.0.entry(code).or_insert(0.0) += count;
    }

    pub fn get(&self, code: ClassCode) -> f64 {
        self.0.get(&code).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    /// Codes in ascending order with their counts
    pub fn iter(&self) -> impl Iterator<Item = (ClassCode, f64)> + '_ {
        self.0.iter().map(|(code, count)| (*code, *count))
    }

    /// Fails on negative or non-finite counts
    pub fn validate(&self) -> ReforestResult<()> {
        match self.0.iter().find(|(_, c)| !c.is_finite() || **c < 0.0) {
            Some((code, count)) => Err(ReforestError::UpstreamService(format!(
                "histogram reports invalid count {} for class {}",
                count, code
            ))),
            None => Ok(()),
        }
    }
}

/// Reduces rasters over a region into class histograms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZonalAggregator {
    scale_m: f64,
}

impl ZonalAggregator {
    pub fn new(scale_m: f64) -> ReforestResult<Self> {
        if !(scale_m.is_finite() && scale_m > 0.0) {
            return Err(ReforestError::InvalidParameter(format!(
                "reduction scale must be a positive number of meters, got {}",
                scale_m
            )));
        }
        Ok(ZonalAggregator { scale_m })
    }

    pub fn scale_m(&self) -> f64 {
        self.scale_m
    }

    /// Area of one pixel at the reduction scale, in km²
    pub fn pixel_area_km2(&self) -> f64 {
        self.scale_m * self.scale_m / M2_PER_KM2
    }

    pub fn area_km2(&self, count: f64) -> f64 {
        count * self.pixel_area_km2()
    }

    /// Frequency histogram of `raster` over `roi`, restricted to `mask` if given
    pub fn reduce<B>(
        &self,
        backend: &B,
        raster: &Raster,
        roi: &Roi,
        mask: Option<&PixelMask>,
    ) -> ReforestResult<ClassHistogram>
    where
        B: GeoBackend + ?Sized,
    {
        let masked;
        let input = match mask {
            Some(mask) => {
                masked = raster.update_mask(mask)?;
                &masked
            }
            None => raster,
        };

        let histogram =
            backend.reduce_region(input, roi, Reducer::FrequencyHistogram, self.scale_m)?;
        histogram.validate()?;

        log::debug!(
            "Reduced '{}' at {} m: {} classes, {} pixels",
            raster.band,
            self.scale_m,
            histogram.len(),
            histogram.total()
        );
        Ok(histogram)
    }

    /// Area per class in km²
    pub fn to_areas(&self, histogram: &ClassHistogram) -> BTreeMap<ClassCode, f64> {
        histogram
            .iter()
            .map(|(code, count)| (code, self.area_km2(count)))
            .collect()
    }
}

impl Default for ZonalAggregator {
    fn default() -> Self {
        ZonalAggregator {
            scale_m: DEFAULT_SCALE_M,
        }
    }
}
