//! Image extraction: bind each data row's photo to an on-disk JPEG.
//!
//! Artefacts are keyed by sheet and physical row, so a rerun over the same
//! output folder finds them and skips decoding entirely. A row whose picture
//! cannot be read, decoded or saved gets the failure sentinel; extraction
//! then moves on to the next row.

use crate::config::{ConversionConfig, IMAGES_DIR_NAME};
use crate::error::{ConvertError, ImageError};
use crate::pipeline::drawing::SheetDrawings;
use crate::pipeline::input::SpreadsheetFormat;
use crate::pipeline::load::sanitize_name;
use crate::pipeline::{encode, write_atomic};
use crate::progress::Reporter;
use crate::table::{Table, Value};
use std::path::Path;
use tracing::{debug, info, warn};

/// Counts for one table.
#[derive(Debug, Clone, Default)]
pub struct ExtractionStats {
    pub extracted: usize,
    pub cached: usize,
    pub errors: Vec<ImageError>,
}

/// File name of the artefact for `physical_row` of `sheet`.
///
/// `source_stem` namespaces the name by workbook when set.
pub fn artifact_name(source_stem: Option<&str>, sheet: &str, physical_row: u32) -> String {
    match source_stem {
        Some(stem) => format!(
            "{}_{}_{}.jpg",
            sanitize_name(stem),
            sanitize_name(sheet),
            physical_row
        ),
        None => format!("{}_{}.jpg", sanitize_name(sheet), physical_row),
    }
}

/// Extract the photos of `table` from `source` into the artefact cache.
///
/// Fatal only when the cache directory cannot be created or the run is
/// cancelled; per-image problems end up in [`ExtractionStats::errors`].
pub(crate) fn extract_images(
    table: &mut Table,
    source: &Path,
    format: SpreadsheetFormat,
    config: &ConversionConfig,
    reporter: &Reporter<'_>,
) -> Result<ExtractionStats, ConvertError> {
    let schema = &config.schema;
    let layout = &config.layout;
    let images_dir = config.images_dir();
    std::fs::create_dir_all(&images_dir).map_err(|e| ConvertError::write(&images_dir, e))?;

    let doc = match table.column_index(&schema.documentation_column) {
        Some(i) => i,
        None => table.push_column(schema.documentation_column.clone(), Value::text("")),
    };

    let mut stats = ExtractionStats::default();
    let mut drawings = match format {
        SpreadsheetFormat::Xls => {
            info!(
                "Skipping image extraction for sheet '{}': .xls workbooks carry no drawing parts",
                table.sheet
            );
            None
        }
        SpreadsheetFormat::Xlsx => match SheetDrawings::open(source, &table.sheet) {
            Ok(d) => Some(d),
            Err(e) => {
                let detail = e.to_string();
                warn!(
                    "Could not read drawings of sheet '{}' in {}: {}",
                    table.sheet,
                    source.display(),
                    detail
                );
                reporter.log(&format!(
                    "Warning: Could not read drawings of sheet {}. Error: {}",
                    table.sheet, detail
                ));
                stats.errors.push(ImageError::DrawingsUnreadable {
                    sheet: table.sheet.clone(),
                    detail,
                });
                None
            }
        },
    };

    let stem = config
        .namespace_images
        .then(|| source.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .flatten();
    let image_col = layout.image_column_index();

    for k in 0..table.len() {
        config.check_cancelled()?;
        let physical = table.rows()[k].physical_row;
        let name = artifact_name(stem.as_deref(), &table.sheet, physical);
        let artifact = images_dir.join(&name);
        let bound = format!("{IMAGES_DIR_NAME}/{name}");

        if artifact.is_file() {
            debug!("Cache hit: {}", artifact.display());
            table.set_value(k, doc, Value::text(bound));
            stats.cached += 1;
            continue;
        }

        let Some(pictures) = drawings.as_mut() else {
            continue;
        };
        // Anchors are 0-based.
        let Some(anchor_row) = physical.checked_sub(1) else {
            continue;
        };
        if pictures.media_at(anchor_row, image_col).is_none() {
            continue;
        }

        let cell = format!("{}{}", layout.image_column, physical);
        match save_picture(pictures, anchor_row, image_col, &artifact, &table.sheet, &cell) {
            Ok(()) => {
                debug!("Extracted {} → {}", cell, artifact.display());
                table.set_value(k, doc, Value::text(bound));
                stats.extracted += 1;
            }
            Err(err) => {
                let detail = err.detail().to_string();
                warn!("Image at {} in sheet '{}' failed: {}", cell, table.sheet, detail);
                reporter.log(&format!(
                    "Warning: Could not process image at {} in sheet {}. Error: {}",
                    cell, table.sheet, detail
                ));
                table.set_value(k, doc, Value::text(schema.failure_sentinel.as_str()));
                stats.errors.push(err);
            }
        }
    }

    info!(
        "Sheet '{}': {} image(s) extracted, {} cached, {} failed",
        table.sheet,
        stats.extracted,
        stats.cached,
        stats.errors.len()
    );
    Ok(stats)
}

fn save_picture(
    drawings: &mut SheetDrawings,
    row: u32,
    col: u32,
    artifact: &Path,
    sheet: &str,
    cell: &str,
) -> Result<(), ImageError> {
    let bytes = drawings
        .read_picture(row, col)
        .map_err(|e| ImageError::ReadFailed {
            sheet: sheet.to_string(),
            cell: cell.to_string(),
            detail: e.to_string(),
        })?
        .ok_or_else(|| ImageError::ReadFailed {
            sheet: sheet.to_string(),
            cell: cell.to_string(),
            detail: "picture disappeared from index".to_string(),
        })?;

    let jpeg = encode::to_jpeg(&bytes).map_err(|e| ImageError::DecodeFailed {
        sheet: sheet.to_string(),
        cell: cell.to_string(),
        detail: e.to_string(),
    })?;

    write_atomic(artifact, &jpeg).map_err(|e| ImageError::SaveFailed {
        sheet: sheet.to_string(),
        cell: cell.to_string(),
        detail: e.to_string(),
    })
}
