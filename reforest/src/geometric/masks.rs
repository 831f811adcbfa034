use serde::{Deserialize, Serialize};

use crate::error::ReforestResult;
use crate::geometric::land_cover::{ClassCode, NLCD_FOREST_CODES, NLCD_MASK_EXCLUSIONS};
use crate::geometric::raster::{PixelMask, Raster};
use crate::geometric::slope::SlopeThreshold;

/// Codes removed from the non-forested mask
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ClassCode>", into = "Vec<ClassCode>")]
pub struct ExclusionSet(Vec<ClassCode>);

impl From<Vec<ClassCode>> for ExclusionSet {
    fn from(codes: Vec<ClassCode>) -> Self {
        ExclusionSet::new(codes)
    }
}

impl From<ExclusionSet> for Vec<ClassCode> {
    fn from(set: ExclusionSet) -> Self {
        set.0
    }
}

impl ExclusionSet {
    pub fn new(mut codes: Vec<ClassCode>) -> Self {
        codes.sort_unstable();
        codes.dedup();
        ExclusionSet(codes)
    }

    /// Water, ice/snow, developed, pasture/crops and wetlands
    pub fn nlcd() -> Self {
        Self::new(NLCD_MASK_EXCLUSIONS.to_vec())
    }

    /// `nlcd()` without pasture/hay (81) and cultivated crops (82)
    pub fn nlcd_with_agriculture() -> Self {
        Self::new(
            NLCD_MASK_EXCLUSIONS
                .iter()
                .copied()
                .filter(|c| !matches!(c, 81 | 82))
                .collect(),
        )
    }

    pub fn codes(&self) -> &[ClassCode] {
        &self.0
    }

    pub fn contains(&self, code: ClassCode) -> bool {
        self.0.binary_search(&code).is_ok()
    }
}

impl Default for ExclusionSet {
    fn default() -> Self {
        ExclusionSet::nlcd()
    }
}

/// Pixel masks derived from one classification raster and one slope raster
#[derive(Debug, Clone, PartialEq)]
pub struct LandCoverMasks {
    pub forested: PixelMask,
    pub non_forested: PixelMask,
    pub slope_low: PixelMask,
    pub slope_high: PixelMask,
}

impl LandCoverMasks {
    /// Non-forested land below the slope threshold
    pub fn plantable(&self) -> ReforestResult<PixelMask> {
        self.non_forested.and(&self.slope_low)
    }
}

/// Builds land-cover and slope masks
#[derive(Debug, Clone)]
pub struct MaskBuilder {
    exclusions: ExclusionSet,
    forest_codes: Vec<ClassCode>,
}

impl MaskBuilder {
    pub fn new(exclusions: ExclusionSet, forest_codes: Vec<ClassCode>) -> Self {
        MaskBuilder {
            exclusions,
            forest_codes,
        }
    }

    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    /// Derive the four masks
    ///
    /// Both rasters must share the same grid. No-data pixels are false in
    /// every mask.
    pub fn build(
        &self,
        classes: &Raster,
        slope: &Raster,
        threshold: SlopeThreshold,
    ) -> ReforestResult<LandCoverMasks> {
        classes.ensure_aligned(slope)?;

        let forested = classes.is_in(&self.forest_codes);
        let excluded: Vec<ClassCode> = self
            .exclusions
            .codes()
            .iter()
            .chain(self.forest_codes.iter())
            .copied()
            .collect();
        let non_forested = classes.not_in(&excluded);

        let slope_low = slope.lt(threshold.value());
        let slope_high = slope.gte(threshold.value());

        log::debug!(
            "Masks at {}: forested={}, non_forested={}, slope_low={}, slope_high={}",
            threshold,
            forested.count(),
            non_forested.count(),
            slope_low.count(),
            slope_high.count()
        );

        Ok(LandCoverMasks {
            forested,
            non_forested,
            slope_low,
            slope_high,
        })
    }
}

impl Default for MaskBuilder {
    fn default() -> Self {
        MaskBuilder::new(ExclusionSet::nlcd(), NLCD_FOREST_CODES.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReforestError;
    use crate::geo_core::GeoTransform;

    fn row(band: &str, values: Vec<f64>) -> Raster {
        let n = values.len();
        Raster::new(band, n, 1, GeoTransform::north_up(0.0, 0.0, 30.0, 30.0), values).unwrap()
    }

    #[test]
    fn test_forested_uses_any_forest_code() {
        let classes = row("landcover", vec![41.0, 42.0, 43.0, 21.0, 71.0]);
        let slope = row("slope", vec![0.0; 5]);
        let masks = MaskBuilder::default()
            .build(&classes, &slope, SlopeThreshold::Twenty)
            .unwrap();
        assert_eq!(masks.forested.bits(), &[true, true, true, false, false]);
        assert_eq!(masks.non_forested.bits(), &[false, false, false, false, true]);
    }

    #[test]
    fn test_exclusion_variants() {
        let classes = row("landcover", vec![81.0, 82.0, 52.0, 11.0, f64::NAN]);
        let slope = row("slope", vec![0.0; 5]);

        let strict = MaskBuilder::default()
            .build(&classes, &slope, SlopeThreshold::Ten)
            .unwrap();
        assert_eq!(strict.non_forested.bits(), &[false, false, true, false, false]);

        let lenient = MaskBuilder::new(ExclusionSet::nlcd_with_agriculture(), NLCD_FOREST_CODES.to_vec())
            .build(&classes, &slope, SlopeThreshold::Ten)
            .unwrap();
        assert_eq!(lenient.non_forested.bits(), &[true, true, true, false, false]);
    }

    #[test]
    fn test_slope_threshold_partition() {
        let classes = row("landcover", vec![71.0, 71.0, 71.0]);
        let slope = row("slope", vec![5.0, 15.0, 25.0]);
        let masks = MaskBuilder::default()
            .build(&classes, &slope, SlopeThreshold::Twenty)
            .unwrap();
        assert_eq!(masks.slope_low.bits(), &[true, true, false]);
        assert_eq!(masks.slope_high.bits(), &[false, false, true]);
        assert_eq!(masks.plantable().unwrap().bits(), &[true, true, false]);
    }

    #[test]
    fn test_plantable_never_exceeds_non_forested() {
        let classes = row("landcover", vec![71.0, 41.0, 52.0, 31.0, 21.0, 90.0]);
        let slope = row("slope", vec![2.0, 3.0, 45.0, 9.9, 1.0, 0.0]);
        for threshold in SlopeThreshold::ALL {
            let masks = MaskBuilder::default().build(&classes, &slope, threshold).unwrap();
            assert!(masks.plantable().unwrap().count() <= masks.non_forested.count());
        }
    }

    #[test]
    fn test_misaligned_rasters() {
        let classes = row("landcover", vec![71.0, 71.0]);
        let slope = row("slope", vec![1.0, 1.0, 1.0]);
        let err = MaskBuilder::default()
            .build(&classes, &slope, SlopeThreshold::Ten)
            .unwrap_err();
        assert!(matches!(err, ReforestError::InvalidParameter(_)));
    }

    #[test]
    fn test_exclusion_set_dedups() {
        let set = ExclusionSet::new(vec![82, 11, 82]);
        assert_eq!(set.codes(), &[11, 82]);
        assert!(set.contains(82));
        assert!(!ExclusionSet::nlcd_with_agriculture().contains(81));
    }
}
