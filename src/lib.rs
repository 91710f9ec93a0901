//! # sheet2geo
//!
//! Convert road-sign survey spreadsheets into GeoJSON and ESRI Shapefile
//! point layers, with the photos embedded in the sheets extracted to JPEG.
//!
//! ## Survey layout
//!
//! Every sheet of a workbook is one table:
//!
//! ```text
//! row 1      title (becomes the table and output file name)
//! rows 3–5   three-level header with merged cells
//! row 6…     one surveyed sign per row, photo anchored in column C
//! ```
//!
//! ## Pipeline Overview
//!
//! ```text
//! .xlsx / .xls
//!  │
//!  ├─ 1. Input      magic-byte check, or list a folder's spreadsheets
//!  ├─ 2. Load       calamine cells; flatten header; default locations
//!  ├─ 3. Normalize  Yes/No flag columns; text DOKUMENTASI column
//!  ├─ 4. Images     drawing parts → RGB JPEG cache, keyed by sheet + row
//!  ├─ 5. Prune      drop rows with no source data
//!  └─ 6. Export     <table>.geojson and <table>_shapefile/<table>.shp
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sheet2geo::{convert, ConversionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .output_dir("converted_output")
//!         .build()?;
//!     let report = convert("survey.xlsx", &config)?;
//!     for file in &report.files {
//!         for table in &file.tables {
//!             eprintln!("{}: {} features", table.name, table.rows);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `sheet2geo` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! sheet2geo = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod cancel;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod table;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use cancel::CancellationToken;
pub use config::{ColumnSchema, ConversionConfig, ConversionConfigBuilder, LayoutConfig};
pub use convert::{convert, convert_file, convert_folder, inspect};
pub use error::{ConvertError, ImageError};
pub use output::{BatchReport, FileFailure, FileReport, SheetInfo, TableSummary};
pub use progress::{
    ConversionProgressCallback, FnProgressCallback, Milestone, NoopProgressCallback,
    ProgressAggregator, ProgressCallback,
};
pub use table::{Row, Table, Value};
