//! Conversion entry points: single file, folder, and dry-run inspection.
//!
//! Every file goes through the same stages in order, each applied to all of
//! the file's tables before the next begins:
//!
//! ```text
//! load (20%) → normalize (40%) → images + prune (60%) → GeoJSON (80%) → Shapefile (100%)
//! ```
//!
//! Percentages are per file; in folder mode the [`crate::ProgressAggregator`]
//! maps them onto the whole batch. A failing file in a folder is logged,
//! recorded in [`BatchReport::failures`] and the batch moves on. Cancellation
//! is the one error that always stops the run.

use crate::config::{ColumnSchema, ConversionConfig};
use crate::error::ConvertError;
use crate::output::{BatchReport, FileFailure, FileReport, SheetInfo, TableSummary};
use crate::pipeline::input::{self, InputKind};
use crate::pipeline::{geojson, images, load, normalize, prune, shapefile};
use crate::progress::{Milestone, Reporter};
use crate::table::Table;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a spreadsheet file or every spreadsheet in a folder.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// A [`BatchReport`]; for a single file it holds exactly one [`FileReport`].
///
/// # Errors
/// For a single file, any fatal [`ConvertError`]. For a folder, only errors
/// that affect the whole batch (missing folder, cancellation); per-file
/// failures are collected in the report instead.
pub fn convert(input: impl AsRef<Path>, config: &ConversionConfig) -> Result<BatchReport, ConvertError> {
    let input = input.as_ref();
    config.validate()?;
    match input::classify(input)? {
        InputKind::File(path) => {
            let start = Instant::now();
            let report = convert_file(&path, config)?;
            Ok(BatchReport {
                files: vec![report],
                failures: Vec::new(),
                duration_ms: start.elapsed().as_millis() as u64,
            })
        }
        InputKind::Folder(dir) => convert_folder(&dir, config),
    }
}

/// Convert one workbook: one GeoJSON file and one shapefile per sheet.
pub fn convert_file(path: impl AsRef<Path>, config: &ConversionConfig) -> Result<FileReport, ConvertError> {
    config.validate()?;
    let mut reporter = Reporter::new(config.progress_callback.as_ref(), 1);
    let report = process_file(path.as_ref(), config, &mut reporter, 1)?;
    if let Some(cb) = reporter.callback() {
        cb.on_file_complete(1, 1, report.tables.len());
    }
    Ok(report)
}

/// Convert every `.xlsx` / `.xls` directly inside `dir`, in file-name order.
pub fn convert_folder(dir: impl AsRef<Path>, config: &ConversionConfig) -> Result<BatchReport, ConvertError> {
    let start = Instant::now();
    let dir = dir.as_ref();
    config.validate()?;
    let files = input::list_spreadsheets(dir)?;
    let total = files.len();
    info!("Batch of {} file(s) in {}", total, dir.display());

    let mut reporter = Reporter::new(config.progress_callback.as_ref(), total);
    let mut batch = BatchReport::default();

    if files.is_empty() {
        reporter.log(&format!("No spreadsheet files found in {}", dir.display()));
    }

    for (i, path) in files.iter().enumerate() {
        let file_index = i + 1;
        config.check_cancelled()?;
        match process_file(path, config, &mut reporter, file_index) {
            Ok(report) => {
                if let Some(cb) = reporter.callback() {
                    cb.on_file_complete(file_index, total, report.tables.len());
                }
                batch.files.push(report);
            }
            Err(ConvertError::Cancelled) => return Err(ConvertError::Cancelled),
            Err(e) => {
                let message = e.to_string();
                warn!("Error processing {}: {}", path.display(), message);
                reporter.log(&format!("Error processing {}: {}", path.display(), message));
                if let Some(cb) = reporter.callback() {
                    cb.on_file_error(file_index, total, &message);
                }
                // A failed file still counts as done for batch progress.
                reporter.milestone(file_index, Milestone::ShapefileWritten);
                batch.failures.push(FileFailure {
                    source: path.clone(),
                    error: message,
                });
            }
        }
    }

    if files.is_empty() {
        reporter.milestone(1, Milestone::ShapefileWritten);
    }
    reporter.log("Batch processing completed.");
    if let Some(cb) = reporter.callback() {
        cb.on_batch_complete(total, batch.files.len());
    }
    batch.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Batch complete: {}/{} file(s) converted in {}ms",
        batch.files.len(),
        total,
        batch.duration_ms
    );
    Ok(batch)
}

/// Load and normalise every sheet without writing anything.
///
/// Useful to check that a workbook matches the survey layout before a run.
pub fn inspect(path: impl AsRef<Path>, config: &ConversionConfig) -> Result<Vec<SheetInfo>, ConvertError> {
    config.validate()?;
    let resolved = input::resolve_file(path.as_ref())?;
    let mut tables = load::load_workbook(&resolved.path, config)?;
    Ok(tables
        .iter_mut()
        .map(|t| {
            normalize::normalize(t, &config.schema);
            SheetInfo {
                sheet: t.sheet.clone(),
                name: t.name.clone(),
                columns: t.columns().to_vec(),
                rows: t.len(),
                has_geometry: geometry_columns(t, &config.schema).is_some(),
            }
        })
        .collect())
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Indices of the longitude and latitude columns, if both exist.
fn geometry_columns(table: &Table, schema: &ColumnSchema) -> Option<(usize, usize)> {
    Some((
        table.column_index(&schema.longitude_column)?,
        table.column_index(&schema.latitude_column)?,
    ))
}

fn process_file(
    path: &Path,
    config: &ConversionConfig,
    reporter: &mut Reporter<'_>,
    file_index: usize,
) -> Result<FileReport, ConvertError> {
    let start = Instant::now();
    let total = reporter.total_files();
    info!("Processing file {}/{}: {}", file_index, total, path.display());
    reporter.log(&format!("Processing file: {}", path.display()));
    if let Some(cb) = reporter.callback() {
        cb.on_file_start(file_index, total, path);
    }

    // ── Step 1: Resolve and load ─────────────────────────────────────────
    let resolved = input::resolve_file(path)?;
    let mut tables = load::load_workbook(&resolved.path, config)?;
    reporter.milestone(file_index, Milestone::Loaded);

    // ── Step 2: Normalise ────────────────────────────────────────────────
    config.check_cancelled()?;
    for table in &mut tables {
        normalize::normalize(table, &config.schema);
    }
    reporter.milestone(file_index, Milestone::Normalized);

    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| ConvertError::write(&config.output_dir, e))?;

    let mut summaries: Vec<TableSummary> = tables
        .iter()
        .map(|t| TableSummary {
            sheet: t.sheet.clone(),
            name: t.name.clone(),
            loaded_rows: t.len(),
            ..TableSummary::default()
        })
        .collect();

    // ── Step 3: Images, then prune ───────────────────────────────────────
    for (table, summary) in tables.iter_mut().zip(summaries.iter_mut()) {
        config.check_cancelled()?;
        let stats = images::extract_images(table, &resolved.path, resolved.format, config, reporter)?;
        summary.images_extracted = stats.extracted;
        summary.images_cached = stats.cached;
        summary.image_errors = stats.errors;

        prune::prune(table, &config.schema);
        summary.rows = table.len();
        summary.columns = table.columns().to_vec();
        summary.has_geometry = geometry_columns(table, &config.schema).is_some();
        if !summary.has_geometry {
            info!(
                "Table '{}' has no '{}'/'{}' columns; skipping GeoJSON and shapefile",
                table.name, config.schema.longitude_column, config.schema.latitude_column
            );
        }
    }
    reporter.milestone(file_index, Milestone::ImagesExtracted);

    // ── Step 4: GeoJSON ──────────────────────────────────────────────────
    if config.export_geojson {
        for (table, summary) in tables.iter().zip(summaries.iter_mut()) {
            config.check_cancelled()?;
            let Some((lon, lat)) = geometry_columns(table, &config.schema) else {
                continue;
            };
            let written = geojson::write_geojson(table, lon, lat, &config.output_dir)?;
            reporter.log(&format!("GeoJSON file created: {}", written.display()));
            summary.geojson_path = Some(written);
        }
    } else {
        debug!("GeoJSON export disabled");
    }
    reporter.milestone(file_index, Milestone::GeoJsonWritten);

    // ── Step 5: Shapefile ────────────────────────────────────────────────
    if config.export_shapefile {
        for (table, summary) in tables.iter().zip(summaries.iter_mut()) {
            config.check_cancelled()?;
            let Some((lon, lat)) = geometry_columns(table, &config.schema) else {
                continue;
            };
            let written = shapefile::write_shapefile(table, lon, lat, &config.output_dir)?;
            reporter.log(&format!("Shapefile created: {}", written.dir.display()));
            summary.shapefile_dir = Some(written.dir);
        }
    } else {
        debug!("Shapefile export disabled");
    }
    reporter.milestone(file_index, Milestone::ShapefileWritten);

    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Converted {} table(s) from {} in {}ms",
        summaries.len(),
        path.display(),
        duration_ms
    );
    reporter.log(&format!("Conversion completed for {}", path.display()));

    Ok(FileReport {
        source: path.to_path_buf(),
        tables: summaries,
        duration_ms,
    })
}
