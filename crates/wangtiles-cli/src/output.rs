//! Point tables on disk: CSV and Parquet via polars, JSON via serde.

use anyhow::{bail, Context, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use wangtiles::PointBatch;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Csv,
    Parquet,
    Json,
}

impl Format {
    /// Chosen by file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(Format::Csv),
            Some("parquet") => Ok(Format::Parquet),
            Some("json") => Ok(Format::Json),
            _ => bail!(
                "unsupported points file {} (expected .csv, .parquet or .json)",
                path.display()
            ),
        }
    }
}

/// One emitted point, as written to JSON.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub x: f64,
    pub y: f64,
    pub rank: u64,
    pub depth: u32,
}

/// Columnar accumulation of query batches.
#[derive(Debug, Default)]
pub struct PointTable {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub rank: Vec<u64>,
    pub depth: Vec<u32>,
}

impl PointTable {
    pub fn push_batch(&mut self, batch: &PointBatch) {
        self.x.extend(batch.positions.iter().map(|p| p.x));
        self.y.extend(batch.positions.iter().map(|p| p.y));
        self.rank.extend_from_slice(&batch.ranks);
        self.depth.extend_from_slice(&batch.depths);
    }

    pub fn len(&self) -> usize {
        self.rank.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rank.is_empty()
    }

    pub fn max_depth(&self) -> Option<u32> {
        self.depth.iter().copied().max()
    }

    pub fn records(&self) -> impl Iterator<Item = PointRecord> + '_ {
        (0..self.len()).map(|i| PointRecord {
            x: self.x[i],
            y: self.y[i],
            rank: self.rank[i],
            depth: self.depth[i],
        })
    }

    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        df!(
            "x" => self.x.as_slice(),
            "y" => self.y.as_slice(),
            "rank" => self.rank.as_slice(),
            "depth" => self.depth.as_slice()
        )
    }
}

/// Write `table` to `path` in the format its extension names.
pub fn write_points(path: &Path, table: &PointTable) -> Result<Format> {
    let format = Format::from_path(path)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output dir {}", parent.display()))?;
        }
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    match format {
        Format::Csv => {
            let mut df = table.to_frame()?;
            CsvWriter::new(BufWriter::new(file))
                .include_header(true)
                .finish(&mut df)?;
        }
        Format::Parquet => {
            let mut df = table.to_frame()?;
            ParquetWriter::new(file).finish(&mut df)?;
        }
        Format::Json => {
            let mut w = BufWriter::new(file);
            let records: Vec<PointRecord> = table.records().collect();
            serde_json::to_writer(&mut w, &records)?;
            w.flush()?;
        }
    }
    Ok(format)
}

/// Point count and rank range per recursion depth of a written CSV/Parquet table.
pub fn depth_summary(path: &Path) -> Result<DataFrame> {
    let lf = match Format::from_path(path)? {
        Format::Csv => LazyCsvReader::new(path)
            .with_infer_schema_length(Some(100))
            .finish()
            .with_context(|| format!("scanning {}", path.display()))?,
        Format::Parquet => LazyFrame::scan_parquet(path, ScanArgsParquet::default())
            .with_context(|| format!("scanning {}", path.display()))?,
        Format::Json => bail!("summarize reads CSV or Parquet, got {}", path.display()),
    };
    let df = lf
        .group_by([col("depth")])
        .agg([
            col("rank").count().alias("points"),
            col("rank").min().alias("min_rank"),
            col("rank").max().alias("max_rank"),
        ])
        .sort(["depth"], SortMultipleOptions::default())
        .collect()?;
    Ok(df)
}
