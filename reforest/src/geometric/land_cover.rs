use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{ReforestError, ReforestResult};

/// Land-cover class code as stored in the classification raster
pub type ClassCode = u16;

/// Label given to codes missing from a legend
pub const UNKNOWN_LABEL: &str = "Unknown";

/// NLCD forest subtypes: deciduous, evergreen, mixed
pub const NLCD_FOREST_CODES: [ClassCode; 3] = [41, 42, 43];

/// NLCD codes counted as non-forested land
pub const NLCD_NON_FOREST_CODES: [ClassCode; 15] =
    [21, 22, 23, 24, 31, 51, 52, 71, 72, 73, 74, 81, 82, 90, 95];

/// NLCD codes removed from the non-forested mask: water, ice/snow,
/// developed, pasture/crops and wetlands
pub const NLCD_MASK_EXCLUSIONS: [ClassCode; 10] = [11, 12, 21, 22, 23, 24, 81, 82, 90, 95];

/// NLCD classes
/// Name                              Code  Color
const NLCD_CLASSES: [(ClassCode, &str, &str); 20] = [
    (11, "Open Water", "#466b9f"),
    (12, "Perennial Ice/Snow", "#d1def8"),
    (21, "Developed - Open Space", "#dec5c5"),
    (22, "Developed - Low Intensity", "#d99282"),
    (23, "Developed - Medium Intensity", "#eb0000"),
    (24, "Developed - High Intensity", "#ab0000"),
    (31, "Barren Land (Rock/Sand/Clay)", "#b3ac9f"),
    (41, "Deciduous Forest", "#68ab5f"),
    (42, "Evergreen Forest", "#1c5f2c"),
    (43, "Mixed Forest", "#b5c58f"),
    (51, "Dwarf Scrub", "#af963c"),
    (52, "Shrub/Scrub", "#ccb879"),
    (71, "Grassland/Herbaceous", "#dfdfc2"),
    (72, "Sedge/Herbaceous", "#d1d182"),
    (73, "Lichens", "#a3cc51"),
    (74, "Moss", "#82ba9e"),
    (81, "Pasture/Hay", "#dcd939"),
    (82, "Cultivated Crops", "#ab6c28"),
    (90, "Woody Wetlands", "#b8d9eb"),
    (95, "Emergent Herbaceous Wetlands", "#6c9fb8"),
];

/// One legend entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandCoverClass {
    pub code: ClassCode,
    pub label: String,
    pub color: String,
}

/// Immutable class code -> label/color table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    name: String,
    classes: BTreeMap<ClassCode, LandCoverClass>,
}

impl Legend {
    pub fn from_entries<I>(name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = LandCoverClass>,
    {
        Legend {
            name: name.into(),
            classes: entries.into_iter().map(|c| (c.code, c)).collect(),
        }
    }

    fn from_table(name: &str, table: &[(ClassCode, &str, &str)]) -> Self {
        Self::from_entries(
            name,
            table.iter().map(|(code, label, color)| LandCoverClass {
                code: *code,
                label: label.to_string(),
                color: color.to_string(),
            }),
        )
    }

    /// NLCD land-cover legend (20 classes)
    pub fn nlcd() -> Self {
        Self::from_table("NLCD", &NLCD_CLASSES)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn get(&self, code: ClassCode) -> Option<&LandCoverClass> {
        self.classes.get(&code)
    }

    /// Human label, `"Unknown"` for codes outside the legend
    pub fn label(&self, code: ClassCode) -> &str {
        self.get(code).map(|c| c.label.as_str()).unwrap_or(UNKNOWN_LABEL)
    }

    /// Display color, `None` for codes outside the legend
    pub fn color(&self, code: ClassCode) -> Option<&str> {
        self.get(code).map(|c| c.color.as_str())
    }

    pub fn codes(&self) -> impl Iterator<Item = ClassCode> + '_ {
        self.classes.keys().copied()
    }
}

/// Area category of a class code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bucket {
    Forested,
    NonForested,
    /// Water, ice/snow and anything outside both buckets
    Excluded,
}

impl Bucket {
    /// Pie chart color
    pub fn color(&self) -> Option<&'static str> {
        match self {
            Bucket::Forested => Some("#68ab5f"),
            Bucket::NonForested => Some("#b3ac9f"),
            Bucket::Excluded => None,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Forested => write!(f, "Forested"),
            Bucket::NonForested => write!(f, "Non-Forested"),
            Bucket::Excluded => write!(f, "Excluded"),
        }
    }
}

/// Partition of class codes into forested and non-forested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBuckets {
    forested: BTreeSet<ClassCode>,
    non_forested: BTreeSet<ClassCode>,
}

impl CategoryBuckets {
    /// Fails when a code is placed in both buckets
    pub fn new<F, N>(forested: F, non_forested: N) -> ReforestResult<Self>
    where
        F: IntoIterator<Item = ClassCode>,
        N: IntoIterator<Item = ClassCode>,
    {
        let forested: BTreeSet<ClassCode> = forested.into_iter().collect();
        let non_forested: BTreeSet<ClassCode> = non_forested.into_iter().collect();
        if let Some(code) = forested.intersection(&non_forested).next() {
            return Err(ReforestError::InvalidParameter(format!(
                "class {} is both forested and non-forested",
                code
            )));
        }
        Ok(CategoryBuckets {
            forested,
            non_forested,
        })
    }

    /// NLCD partition; open water (11) and ice/snow (12) are excluded
    pub fn nlcd() -> Self {
        CategoryBuckets {
            forested: NLCD_FOREST_CODES.into_iter().collect(),
            non_forested: NLCD_NON_FOREST_CODES.into_iter().collect(),
        }
    }

    pub fn bucket_of(&self, code: ClassCode) -> Bucket {
        if self.forested.contains(&code) {
            Bucket::Forested
        } else if self.non_forested.contains(&code) {
            Bucket::NonForested
        } else {
            Bucket::Excluded
        }
    }
}

impl Default for CategoryBuckets {
    fn default() -> Self {
        CategoryBuckets::nlcd()
    }
}
