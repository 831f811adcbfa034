use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::Path;

use crate::commons::basic_functions::{percentage, round2};
use crate::error::ReforestResult;
use crate::geometric::land_cover::{Bucket, CategoryBuckets, ClassCode, Legend};
use crate::geometric::slope::SlopeThreshold;
use crate::geometric::zonal::ClassHistogram;

/// Area of one land-cover class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaRow {
    pub code: ClassCode,
    pub label: String,
    /// `None` for codes outside the legend
    pub color: Option<String>,
    pub bucket: Bucket,
    pub area_km2: f64,
    /// Share of `AreaTable::total_km2`, which counts every class present,
    /// water and ice included. Rows of a non-empty table sum to 100 even when
    /// `BucketSummary::division_guarded` is set; only an empty table has 0.
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    class: ClassCode,
    description: &'a str,
    area_km2: f64,
    percentage: f64,
    color: &'a str,
}

/// Per-class areas sorted by descending area
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaTable {
    pub rows: Vec<AreaRow>,
    pub total_km2: f64,
}

impl AreaTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, code: ClassCode) -> Option<&AreaRow> {
        self.rows.iter().find(|r| r.code == code)
    }

    /// Summed area of the rows in `bucket`
    pub fn bucket_area(&self, bucket: Bucket) -> f64 {
        self.rows
            .iter()
            .filter(|r| r.bucket == bucket)
            .map(|r| r.area_km2)
            .sum()
    }

    /// Write as CSV: `class,description,area_km2,percentage,color`
    pub fn write_csv<W: Write>(&self, writer: W) -> ReforestResult<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for row in &self.rows {
            wtr.serialize(CsvRecord {
                class: row.code,
                description: &row.label,
                area_km2: round2(row.area_km2),
                percentage: round2(row.percentage),
                color: row.color.as_deref().unwrap_or(""),
            })?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_csv_file(&self, path: &Path) -> ReforestResult<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)?;
        log::info!("Area table written to {:?}", path);
        Ok(())
    }
}

/// Forested / non-forested totals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub forested_km2: f64,
    pub non_forested_km2: f64,
    /// `forested_km2 + non_forested_km2`; excluded classes are left out
    pub total_km2: f64,
    pub forested_pct: f64,
    pub non_forested_pct: f64,
    /// Set when the total was zero and every percentage fell back to 0
    pub division_guarded: bool,
}

impl BucketSummary {
    /// Forested and non-forested slices with their pie chart colors
    pub fn pie_slices(&self) -> Vec<(Bucket, f64, &'static str)> {
        [
            (Bucket::Forested, self.forested_km2),
            (Bucket::NonForested, self.non_forested_km2),
        ]
        .into_iter()
        .filter_map(|(bucket, area)| bucket.color().map(|color| (bucket, area, color)))
        .collect()
    }
}

impl fmt::Display for BucketSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Total Forested Area: {:.2} Sq. Km ({:.2}%)",
            self.forested_km2, self.forested_pct
        )?;
        write!(
            f,
            "Total Non-Forested Area: {:.2} Sq. Km ({:.2}%)",
            self.non_forested_km2, self.non_forested_pct
        )
    }
}

/// Non-forested area below the slope threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantableReport {
    pub table: AreaTable,
    pub area_km2: f64,
    /// Plantable area over the forested + non-forested total
    pub share_of_total_pct: f64,
    pub threshold: Option<SlopeThreshold>,
}

impl PlantableReport {
    pub fn with_threshold(mut self, threshold: SlopeThreshold) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

impl fmt::Display for PlantableReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.threshold {
            Some(threshold) => write!(
                f,
                "Total plantable area (non-forested) within {} slope threshold: {:.2} Sq. Km ({:.2}% of total)",
                threshold, self.area_km2, self.share_of_total_pct
            ),
            None => write!(
                f,
                "Total plantable area (non-forested): {:.2} Sq. Km ({:.2}% of total)",
                self.area_km2, self.share_of_total_pct
            ),
        }
    }
}

/// Turns class histograms into labelled area tables and bucket totals
#[derive(Debug, Clone)]
pub struct AreaClassifier {
    legend: Legend,
    buckets: CategoryBuckets,
    pixel_area_km2: f64,
}

impl AreaClassifier {
    pub fn new(legend: Legend, buckets: CategoryBuckets, pixel_area_km2: f64) -> Self {
        AreaClassifier {
            legend,
            buckets,
            pixel_area_km2,
        }
    }

    pub fn legend(&self) -> &Legend {
        &self.legend
    }

    pub fn buckets(&self) -> &CategoryBuckets {
        &self.buckets
    }

    pub fn table(&self, histogram: &ClassHistogram) -> AreaTable {
        let mut rows: Vec<AreaRow> = histogram
            .iter()
            .map(|(code, count)| AreaRow {
                code,
                label: self.legend.label(code).to_string(),
                color: self.legend.color(code).map(str::to_string),
                bucket: self.buckets.bucket_of(code),
                area_km2: count * self.pixel_area_km2,
                percentage: 0.0,
            })
            .collect();

        let total_km2: f64 = rows.iter().map(|r| r.area_km2).sum();
        for row in &mut rows {
            row.percentage = percentage(row.area_km2, total_km2).unwrap_or(0.0);
        }
        rows.sort_by(|a, b| b.area_km2.total_cmp(&a.area_km2).then(a.code.cmp(&b.code)));

        if rows.iter().any(|r| r.color.is_none()) {
            log::warn!("Histogram contains codes outside the {} legend", self.legend.name());
        }

        AreaTable { rows, total_km2 }
    }

    pub fn summarize(&self, table: &AreaTable) -> BucketSummary {
        let forested_km2 = table.bucket_area(Bucket::Forested);
        let non_forested_km2 = table.bucket_area(Bucket::NonForested);
        let total_km2 = forested_km2 + non_forested_km2;

        match (
            percentage(forested_km2, total_km2),
            percentage(non_forested_km2, total_km2),
        ) {
            (Some(forested_pct), Some(non_forested_pct)) => BucketSummary {
                forested_km2,
                non_forested_km2,
                total_km2,
                forested_pct,
                non_forested_pct,
                division_guarded: false,
            },
            _ => {
                log::warn!("Forested and non-forested areas are both zero");
                BucketSummary {
                    forested_km2,
                    non_forested_km2,
                    total_km2,
                    forested_pct: 0.0,
                    non_forested_pct: 0.0,
                    division_guarded: true,
                }
            }
        }
    }

    /// Report on the histogram of the plantable-masked classes
    pub fn plantable(&self, histogram: &ClassHistogram, summary: &BucketSummary) -> PlantableReport {
        let table = self.table(histogram);
        let area_km2 = table.total_km2;
        let share_of_total_pct = percentage(area_km2, summary.total_km2).unwrap_or(0.0);
        PlantableReport {
            table,
            area_km2,
            share_of_total_pct,
            threshold: None,
        }
    }
}

impl Default for AreaClassifier {
    fn default() -> Self {
        AreaClassifier::new(
            Legend::nlcd(),
            CategoryBuckets::nlcd(),
            crate::geometric::zonal::ZonalAggregator::default().pixel_area_km2(),
        )
    }
}
