//! Error types for the sheet2geo library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`]: **Fatal** for the current file: the workbook cannot be
//!   read, its layout does not match the expected survey format, or an output
//!   artefact cannot be written. Returned as `Err(ConvertError)` from the
//!   top-level `convert*` functions. In folder mode each file has its own
//!   failure boundary, so one fatal file does not stop the batch.
//!
//! * [`ImageError`]: **Non-fatal**: a single embedded photo failed to read,
//!   decode or save. The affected row gets the failure sentinel, the error is
//!   stored in [`crate::output::TableSummary::image_errors`], and extraction
//!   continues with the next row.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the sheet2geo library.
///
/// Per-image failures use [`ImageError`] and never propagate here.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input path does not exist.
    #[error("Input not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the input.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The file exists but is neither an `.xlsx` (zip) nor an `.xls` (OLE2) workbook.
    #[error("File is not a spreadsheet: '{path}'\nFirst bytes: {magic:?}")]
    NotASpreadsheet { path: PathBuf, magic: [u8; 4] },

    /// Folder mode was requested on something that is not a directory.
    #[error("Not a directory: '{path}'")]
    NotADirectory { path: PathBuf },

    // ── Source format errors ──────────────────────────────────────────────
    /// The workbook could not be opened or a sheet could not be read.
    #[error("Failed to read workbook '{path}': {detail}")]
    Workbook { path: PathBuf, detail: String },

    /// The title row of a sheet holds no value to name the table after.
    #[error("Sheet '{sheet}' has no title in row {row}")]
    MissingTitle { sheet: String, row: u32 },

    /// A column the survey layout requires is absent from the flattened header.
    #[error("Sheet '{sheet}' has no '{column}' column\nThe header rows do not match the survey layout.")]
    MissingColumn { sheet: String, column: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file or directory.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The shapefile writer rejected the table.
    #[error("Failed to write shapefile '{path}': {detail}")]
    Shapefile { path: PathBuf, detail: String },

    /// GeoJSON encoding failed.
    #[error("Failed to encode GeoJSON for table '{table}': {source}")]
    Serialize {
        table: String,
        #[source]
        source: serde_json::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Control flow ──────────────────────────────────────────────────────
    /// The caller cancelled the run through its [`crate::CancellationToken`].
    #[error("Conversion cancelled")]
    Cancelled,
}

impl ConvertError {
    /// `true` for errors caused by the spreadsheet not matching the survey layout.
    pub fn is_source_format(&self) -> bool {
        matches!(
            self,
            ConvertError::MissingTitle { .. } | ConvertError::MissingColumn { .. }
        )
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::OutputWriteFailed {
            path: path.into(),
            source,
        }
    }
}

/// A non-fatal error for a single embedded image.
///
/// Stored alongside [`crate::output::TableSummary`]; the row's documentation
/// field holds the failure sentinel instead of an artefact path.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageError {
    /// The media part referenced by the drawing could not be read from the archive.
    #[error("Could not read image at {cell} in sheet {sheet}: {detail}")]
    ReadFailed {
        sheet: String,
        cell: String,
        detail: String,
    },

    /// The image bytes are not a decodable raster image.
    #[error("Could not decode image at {cell} in sheet {sheet}: {detail}")]
    DecodeFailed {
        sheet: String,
        cell: String,
        detail: String,
    },

    /// The converted JPEG could not be written to the artefact cache.
    #[error("Could not save image at {cell} in sheet {sheet}: {detail}")]
    SaveFailed {
        sheet: String,
        cell: String,
        detail: String,
    },

    /// The sheet's drawing parts could not be parsed; none of its images
    /// were extracted.
    #[error("Could not read drawings of sheet {sheet}: {detail}")]
    DrawingsUnreadable { sheet: String, detail: String },
}

impl ImageError {
    /// Cell reference (e.g. `C7`) the failing image is anchored to; empty
    /// when the whole sheet's drawings failed.
    pub fn cell(&self) -> &str {
        match self {
            ImageError::ReadFailed { cell, .. }
            | ImageError::DecodeFailed { cell, .. }
            | ImageError::SaveFailed { cell, .. } => cell,
            ImageError::DrawingsUnreadable { .. } => "",
        }
    }

    /// Underlying reader, decoder or I/O message.
    pub fn detail(&self) -> &str {
        match self {
            ImageError::ReadFailed { detail, .. }
            | ImageError::DecodeFailed { detail, .. }
            | ImageError::SaveFailed { detail, .. }
            | ImageError::DrawingsUnreadable { detail, .. } => detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_display() {
        let e = ConvertError::MissingColumn {
            sheet: "Siliwangi".into(),
            column: "DETAIL LOKASI".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Siliwangi"), "got: {msg}");
        assert!(msg.contains("DETAIL LOKASI"), "got: {msg}");
        assert!(e.is_source_format());
    }

    #[test]
    fn missing_title_is_source_format() {
        let e = ConvertError::MissingTitle {
            sheet: "Sheet1".into(),
            row: 1,
        };
        assert!(e.is_source_format());
        assert!(e.to_string().contains("row 1"));
    }

    #[test]
    fn write_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let e = ConvertError::write("/out/a.geojson", io);
        assert!(!e.is_source_format());
        assert!(e.to_string().contains("/out/a.geojson"));
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn image_error_names_cell_and_sheet() {
        let e = ImageError::DecodeFailed {
            sheet: "Ruas 1".into(),
            cell: "C7".into(),
            detail: "unknown format".into(),
        };
        assert_eq!(e.cell(), "C7");
        assert_eq!(e.detail(), "unknown format");
        let msg = e.to_string();
        assert!(msg.contains("C7") && msg.contains("Ruas 1"), "got: {msg}");
    }
}
