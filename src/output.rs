//! Result types returned by the conversion entry points.

use crate::error::ImageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to one table (sheet) of a workbook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableSummary {
    /// Sheet (tab) name.
    pub sheet: String,
    /// Table name from the title row, as used for output file names.
    pub name: String,
    /// Columns after flattening, recap exclusion and normalisation.
    pub columns: Vec<String>,
    /// Rows loaded from the sheet.
    pub loaded_rows: usize,
    /// Rows left after pruning (= features written).
    pub rows: usize,
    /// Images decoded and written in this run.
    pub images_extracted: usize,
    /// Images bound from an existing artefact without decoding.
    pub images_cached: usize,
    /// Per-image failures (rows carry the failure sentinel).
    pub image_errors: Vec<ImageError>,
    /// `false` when the longitude or latitude column is missing.
    pub has_geometry: bool,
    /// Written GeoJSON file, if any.
    pub geojson_path: Option<PathBuf>,
    /// Written shapefile directory, if any.
    pub shapefile_dir: Option<PathBuf>,
}

/// Outcome of converting one workbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub tables: Vec<TableSummary>,
    /// Wall-clock time for the whole file, in milliseconds.
    pub duration_ms: u64,
}

impl FileReport {
    pub fn images_failed(&self) -> usize {
        self.tables.iter().map(|t| t.image_errors.len()).sum()
    }

    pub fn features_written(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| t.geojson_path.is_some())
            .map(|t| t.rows)
            .sum()
    }
}

/// A file that failed inside a folder run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFailure {
    pub source: PathBuf,
    /// Human-readable error message.
    pub error: String,
}

/// Outcome of a single-file or folder run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub failures: Vec<FileFailure>,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn total_files(&self) -> usize {
        self.files.len() + self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Per-sheet view returned by [`crate::inspect`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetInfo {
    pub sheet: String,
    pub name: String,
    pub columns: Vec<String>,
    pub rows: usize,
    pub has_geometry: bool,
}
