use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ReforestError, ReforestResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive calendar date range for imagery searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ReforestResult<Self> {
        if start > end {
            return Err(ReforestError::InvalidParameter(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(DateRange { start, end })
    }

    /// Parse `YYYY-MM-DD` strings as typed by the user
    pub fn parse(start: &str, end: &str) -> ReforestResult<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|e| {
                ReforestError::InvalidParameter(format!("invalid date '{}': {}", s, e))
            })
        };
        Self::new(parse(start)?, parse(end)?)
    }

    /// Calendar year, e.g. 2021-01-01 .. 2021-12-31
    pub fn year(year: i32) -> ReforestResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1);
        let end = NaiveDate::from_ymd_opt(year, 12, 31);
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => Err(ReforestError::InvalidParameter(format!(
                "year {} is out of range",
                year
            ))),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// A candidate satellite scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneInfo {
    pub id: String,
    pub cloudy_pixel_percentage: f64,
    /// Acquisition start, milliseconds since the Unix epoch
    pub time_start_ms: i64,
}

impl SceneInfo {
    pub fn acquisition_date(&self) -> Option<NaiveDate> {
        DateTime::from_timestamp_millis(self.time_start_ms).map(|dt| dt.date_naive())
    }

    /// Acquisition date as `MM-DD-YYYY`
    pub fn formatted_date(&self) -> String {
        self.acquisition_date()
            .map(|d| d.format("%m-%d-%Y").to_string())
            .unwrap_or_default()
    }
}

/// Keep the clearest scenes
///
/// Drops scenes at or above `max_cloud_pct`, sorts by cloudiness then
/// acquisition time, and keeps at most `limit`.
pub fn select_clearest(mut scenes: Vec<SceneInfo>, max_cloud_pct: f64, limit: usize) -> Vec<SceneInfo> {
    scenes.retain(|s| s.cloudy_pixel_percentage < max_cloud_pct);
    scenes.sort_by(|a, b| {
        a.cloudy_pixel_percentage
            .total_cmp(&b.cloudy_pixel_percentage)
            .then(a.time_start_ms.cmp(&b.time_start_ms))
    });
    scenes.truncate(limit);
    scenes
}
