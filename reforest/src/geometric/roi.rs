use geo::{Contains, Coord, LineString, Point, Polygon};
use serde_json::Value;

use crate::error::{ReforestError, ReforestResult};
use crate::geo_core::BoundingBox;

/// Region of interest
///
/// Rings of `[lon, lat]` pairs taken verbatim from the user's GeoJSON. The
/// first ring is the exterior, the others are holes. Winding, closure and
/// self-intersection are not checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Roi {
    rings: Vec<Vec<[f64; 2]>>,
    polygon: Polygon<f64>,
    bbox: BoundingBox,
}

impl Roi {
    /// Resolve a ROI from pasted or uploaded GeoJSON text
    ///
    /// Reads `features[0].geometry.coordinates` of a FeatureCollection.
    pub fn from_geojson_str(text: &str) -> ReforestResult<Self> {
        let value: Value = serde_json::from_str(text.trim())
            .map_err(|e| ReforestError::MalformedInput(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Resolve a ROI from an already parsed JSON document
    pub fn from_value(value: &Value) -> ReforestResult<Self> {
        let coordinates = value
            .get("features")
            .and_then(|f| f.get(0))
            .and_then(|f| f.get("geometry"))
            .and_then(|g| g.get("coordinates"))
            .ok_or_else(|| {
                ReforestError::Schema("features[0].geometry.coordinates is missing".to_string())
            })?;

        let rings = parse_rings(coordinates)?;
        Self::from_rings(rings)
    }

    /// Build a ROI from rings already held in memory
    pub fn from_rings(rings: Vec<Vec<[f64; 2]>>) -> ReforestResult<Self> {
        if rings.is_empty() {
            return Err(ReforestError::Schema(
                "coordinates must hold at least one ring".to_string(),
            ));
        }

        let bbox = BoundingBox::from_points(rings.iter().flatten()).ok_or_else(|| {
            ReforestError::Schema("coordinates hold no positions".to_string())
        })?;

        let to_line = |ring: &Vec<[f64; 2]>| {
            LineString::from(
                ring.iter()
                    .map(|p| Coord { x: p[0], y: p[1] })
                    .collect::<Vec<_>>(),
            )
        };
        let exterior = to_line(&rings[0]);
        let interiors = rings[1..].iter().map(to_line).collect();
        let polygon = Polygon::new(exterior, interiors);

        Ok(Roi {
            rings,
            polygon,
            bbox,
        })
    }

    /// Rings exactly as supplied
    pub fn rings(&self) -> &[Vec<[f64; 2]>] {
        &self.rings
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// Whether a point lies strictly inside the polygon
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.bbox.contains(lon, lat) && self.polygon.contains(&Point::new(lon, lat))
    }

    /// GeoJSON polygon geometry for transport to a backend
    pub fn to_geojson(&self) -> geojson::Geometry {
        let rings = self
            .rings
            .iter()
            .map(|ring| ring.iter().map(|p| vec![p[0], p[1]]).collect())
            .collect();
        geojson::Geometry::new(geojson::Value::Polygon(rings))
    }
}

/// Parse a ring-of-rings of two-element numeric pairs
fn parse_rings(coordinates: &Value) -> ReforestResult<Vec<Vec<[f64; 2]>>> {
    let rings = coordinates
        .as_array()
        .ok_or_else(|| ReforestError::Schema("coordinates must be an array of rings".to_string()))?;

    rings
        .iter()
        .enumerate()
        .map(|(i, ring)| {
            let positions = ring.as_array().ok_or_else(|| {
                ReforestError::Schema(format!("ring {} must be an array of positions", i))
            })?;
            positions
                .iter()
                .enumerate()
                .map(|(j, pos)| parse_position(pos).ok_or_else(|| {
                    ReforestError::Schema(format!(
                        "ring {} position {} must be a [lon, lat] pair of numbers",
                        i, j
                    ))
                }))
                .collect()
        })
        .collect()
}

fn parse_position(pos: &Value) -> Option<[f64; 2]> {
    match pos.as_array()?.as_slice() {
        [lon, lat] => Some([lon.as_f64()?, lat.as_f64()?]),
        _ => None,
    }
}
