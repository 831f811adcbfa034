use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ReforestError, ReforestResult};
use crate::geo_core::GeoTransform;

/// Single-band raster clipped to a region
///
/// Values are stored row-major as `f64`; NaN marks masked or no-data pixels.
/// Class rasters hold integer class codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RasterParts")]
pub struct Raster {
    pub band: String,
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    #[serde(with = "nan_as_null")]
    data: Vec<f64>,
}

/// Wire form of a raster, checked by `Raster::new` before use
#[derive(Deserialize)]
struct RasterParts {
    band: String,
    width: usize,
    height: usize,
    transform: GeoTransform,
    #[serde(with = "nan_as_null")]
    data: Vec<f64>,
}

impl TryFrom<RasterParts> for Raster {
    type Error = ReforestError;

    fn try_from(parts: RasterParts) -> Result<Self, Self::Error> {
        Raster::new(parts.band, parts.width, parts.height, parts.transform, parts.data)
    }
}

impl Raster {
    pub fn new(
        band: impl Into<String>,
        width: usize,
        height: usize,
        transform: GeoTransform,
        data: Vec<f64>,
    ) -> ReforestResult<Self> {
        if width.checked_mul(height) != Some(data.len()) {
            return Err(ReforestError::InvalidParameter(format!(
                "raster data holds {} values, expected {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Raster {
            band: band.into(),
            width,
            height,
            transform,
            data,
        })
    }

    /// Raster with every pixel set to `value`
    pub fn filled(
        band: impl Into<String>,
        width: usize,
        height: usize,
        transform: GeoTransform,
        value: f64,
    ) -> Self {
        Raster {
            band: band.into(),
            width,
            height,
            transform,
            data: vec![value; width * height],
        }
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let v = self.data[row * self.width + col];
        (!v.is_nan()).then_some(v)
    }

    /// Number of pixels holding a value
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    pub fn same_shape(&self, other_width: usize, other_height: usize) -> bool {
        self.width == other_width && self.height == other_height
    }

    fn ensure_shape(&self, width: usize, height: usize, what: &str) -> ReforestResult<()> {
        if self.same_shape(width, height) {
            Ok(())
        } else {
            Err(ReforestError::InvalidParameter(format!(
                "{} is {}x{} but raster '{}' is {}x{}",
                what, width, height, self.band, self.width, self.height
            )))
        }
    }

    /// Fails unless `other` has the same pixel grid dimensions
    pub fn ensure_aligned(&self, other: &Raster) -> ReforestResult<()> {
        self.ensure_shape(other.width, other.height, &format!("raster '{}'", other.band))
    }

    /// Mask of valid pixels satisfying `pred`
    pub fn select<F>(&self, pred: F) -> PixelMask
    where
        F: Fn(f64) -> bool + Sync,
    {
        let bits = self
            .data
            .par_iter()
            .map(|&v| !v.is_nan() && pred(v))
            .collect();
        PixelMask {
            width: self.width,
            height: self.height,
            bits,
        }
    }

    /// `value < threshold`
    pub fn lt(&self, threshold: f64) -> PixelMask {
        self.select(|v| v < threshold)
    }

    /// `value >= threshold`
    pub fn gte(&self, threshold: f64) -> PixelMask {
        self.select(|v| v >= threshold)
    }

    /// Value equals any of `codes`
    pub fn is_in(&self, codes: &[u16]) -> PixelMask {
        self.select(|v| codes.iter().any(|&c| v == c as f64))
    }

    /// Value equals none of `codes`
    pub fn not_in(&self, codes: &[u16]) -> PixelMask {
        self.select(|v| codes.iter().all(|&c| v != c as f64))
    }

    /// Copy with every pixel outside `mask` set to NaN
    pub fn update_mask(&self, mask: &PixelMask) -> ReforestResult<Raster> {
        self.ensure_shape(mask.width, mask.height, "mask")?;
        let data = self
            .data
            .par_iter()
            .zip(mask.bits.par_iter())
            .map(|(&v, &keep)| if keep { v } else { f64::NAN })
            .collect();
        Ok(Raster {
            data,
            ..self.clone_header()
        })
    }

    /// Sub-grid of `width` x `height` pixels starting at (col, row)
    pub fn crop(&self, col: usize, row: usize, width: usize, height: usize) -> ReforestResult<Raster> {
        if col + width > self.width || row + height > self.height {
            return Err(ReforestError::InvalidParameter(format!(
                "crop {}x{} at ({}, {}) exceeds raster {}x{}",
                width, height, col, row, self.width, self.height
            )));
        }
        let mut data = Vec::with_capacity(width * height);
        for r in row..row + height {
            let start = r * self.width + col;
            data.extend_from_slice(&self.data[start..start + width]);
        }
        Ok(Raster {
            band: self.band.clone(),
            width,
            height,
            transform: self.transform.offset(col, row),
            data,
        })
    }

    /// Same grid with new values
    pub fn with_data(&self, band: impl Into<String>, data: Vec<f64>) -> ReforestResult<Raster> {
        Raster::new(band, self.width, self.height, self.transform, data)
    }

    /// Same dimensions and geotransform
    pub fn same_grid(&self, other: &Raster) -> bool {
        self.same_shape(other.width, other.height) && self.transform == other.transform
    }

    /// Nearest-neighbour resample onto the grid of `target`
    ///
    /// Each target pixel takes the value of the source pixel under its
    /// centre, NaN where the centre falls outside the source. Both grids must
    /// be north-up and share a coordinate system.
    pub fn resample_to(&self, target: &Raster) -> ReforestResult<Raster> {
        for (name, t) in [(&self.band, &self.transform), (&target.band, &target.transform)] {
            if !t.is_north_up() {
                return Err(ReforestError::InvalidParameter(format!(
                    "raster '{}' is not north-up",
                    name
                )));
            }
        }

        let src = &self.transform;
        let pixel_height = src.pixel_height.abs();
        let mut data = vec![f64::NAN; target.len()];
        if target.width > 0 {
            data.par_chunks_mut(target.width)
                .enumerate()
                .for_each(|(row, out)| {
                    for (col, cell) in out.iter_mut().enumerate() {
                        let (x, y) = target.transform.pixel_center(col, row);
                        let c = ((x - src.top_left_x) / src.pixel_width).floor();
                        let r = ((src.top_left_y - y) / pixel_height).floor();
                        if c >= 0.0 && r >= 0.0 && c < self.width as f64 && r < self.height as f64 {
                            *cell = self.data[r as usize * self.width + c as usize];
                        }
                    }
                });
        }
        target.with_data(self.band.clone(), data)
    }

    fn clone_header(&self) -> Raster {
        Raster {
            band: self.band.clone(),
            width: self.width,
            height: self.height,
            transform: self.transform,
            data: Vec::new(),
        }
    }
}

/// Boolean raster aligned to a `Raster`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelMask {
    pub width: usize,
    pub height: usize,
    bits: Vec<bool>,
}

impl PixelMask {
    pub fn new(width: usize, height: usize, bits: Vec<bool>) -> ReforestResult<Self> {
        if width.checked_mul(height) != Some(bits.len()) {
            return Err(ReforestError::InvalidParameter(format!(
                "mask holds {} pixels, expected {}x{}",
                bits.len(),
                width,
                height
            )));
        }
        Ok(PixelMask {
            width,
            height,
            bits,
        })
    }

    pub fn filled(width: usize, height: usize, value: bool) -> Self {
        PixelMask {
            width,
            height,
            bits: vec![value; width * height],
        }
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn get(&self, col: usize, row: usize) -> bool {
        col < self.width && row < self.height && self.bits[row * self.width + col]
    }

    /// Number of selected pixels
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    fn zip_with<F>(&self, other: &PixelMask, op: F) -> ReforestResult<PixelMask>
    where
        F: Fn(bool, bool) -> bool + Sync + Send,
    {
        if self.width != other.width || self.height != other.height {
            return Err(ReforestError::InvalidParameter(format!(
                "cannot combine {}x{} mask with {}x{} mask",
                self.width, self.height, other.width, other.height
            )));
        }
        let bits = self
            .bits
            .par_iter()
            .zip(other.bits.par_iter())
            .map(|(&a, &b)| op(a, b))
            .collect();
        Ok(PixelMask {
            width: self.width,
            height: self.height,
            bits,
        })
    }

    pub fn and(&self, other: &PixelMask) -> ReforestResult<PixelMask> {
        self.zip_with(other, |a, b| a && b)
    }

    pub fn or(&self, other: &PixelMask) -> ReforestResult<PixelMask> {
        self.zip_with(other, |a, b| a || b)
    }
}

/// NaN <-> JSON null for raster payloads
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(data: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let values: Vec<Option<f64>> = data
            .iter()
            .map(|v| if v.is_nan() { None } else { Some(*v) })
            .collect();
        values.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}
