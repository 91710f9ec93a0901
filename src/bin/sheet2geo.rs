//! CLI binary for sheet2geo.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and renders progress on the terminal.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use sheet2geo::{
    convert, inspect, BatchReport, ColumnSchema, ConversionConfig, ConversionProgressCallback,
    LayoutConfig, ProgressCallback,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one percent bar for the whole run, with status
/// lines printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
    warnings: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}%  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(100);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            warnings: AtomicUsize::new(0),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_progress(&self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn on_log(&self, message: &str) {
        if message.starts_with("Warning") {
            self.warnings.fetch_add(1, Ordering::SeqCst);
            self.bar.println(format!("  {} {}", yellow("⚠"), message));
        } else if message.starts_with("Error") {
            self.bar.println(format!("  {} {}", red("✗"), red(message)));
        } else {
            self.bar.println(format!("  {} {}", dim("·"), dim(message)));
        }
    }

    fn on_file_start(&self, file_index: usize, total_files: usize, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.bar.set_message(format!("{file_index}/{total_files} {name}"));
    }

    fn on_file_complete(&self, _file_index: usize, _total_files: usize, tables: usize) {
        self.bar
            .println(format!("  {} {} table(s) written", green("✓"), tables));
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total_files.saturating_sub(success_count);
        if failed == 0 {
            eprintln!(
                "{} {} file(s) converted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} file(s) converted  ({} failed)",
                if success_count == 0 { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one survey workbook into ./converted_output
  sheet2geo survey.xlsx

  # Convert every .xlsx/.xls in a folder into a chosen directory
  sheet2geo surveys/ -o gis/

  # GeoJSON only, artefacts prefixed with the workbook name
  sheet2geo --no-shapefile --namespace-images survey.xlsx

  # Check the header layout without writing anything
  sheet2geo --inspect-only survey.xlsx

  # Machine-readable report
  sheet2geo --json surveys/ > report.json

OUTPUT LAYOUT:
  <output>/<table>.geojson
  <output>/<table>_shapefile/<table>.{shp,shx,dbf,prj,cpg}
  <output>/extracted_images/<sheet>_<row>.jpg

  Images already present in extracted_images/ are reused, not re-extracted.

ENVIRONMENT VARIABLES:
  RUST_LOG    Override the log filter (e.g. sheet2geo=debug)
"#;

/// Convert road-sign survey spreadsheets to GeoJSON and ESRI Shapefiles.
#[derive(Parser, Debug)]
#[command(
    name = "sheet2geo",
    version,
    about = "Convert road-sign survey spreadsheets to GeoJSON and ESRI Shapefiles",
    long_about = "Convert road-sign survey spreadsheets (.xlsx/.xls with a three-row header and \
photos embedded over cells) into GeoJSON feature collections and point shapefiles, extracting \
the photos to JPEG files referenced from each feature.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Spreadsheet file, or folder of spreadsheets.
    input: PathBuf,

    /// Output directory.
    #[arg(short, long, env = "SHEET2GEO_OUTPUT", default_value = "converted_output")]
    output: PathBuf,

    /// Do not write GeoJSON files.
    #[arg(long, env = "SHEET2GEO_NO_GEOJSON")]
    no_geojson: bool,

    /// Do not write shapefiles.
    #[arg(long, env = "SHEET2GEO_NO_SHAPEFILE")]
    no_shapefile: bool,

    /// Prefix extracted image names with the workbook file name.
    #[arg(long, env = "SHEET2GEO_NAMESPACE_IMAGES")]
    namespace_images: bool,

    /// Header rows, top level first (1-based, comma separated).
    #[arg(long, env = "SHEET2GEO_HEADER_ROWS", default_value = "3,4,5")]
    header_rows: String,

    /// First data row (1-based).
    #[arg(long, env = "SHEET2GEO_DATA_START_ROW", default_value_t = 6)]
    data_start_row: u32,

    /// Row holding the table title (1-based).
    #[arg(long, env = "SHEET2GEO_TITLE_ROW", default_value_t = 1)]
    title_row: u32,

    /// Column letters the photos are anchored to.
    #[arg(long, env = "SHEET2GEO_IMAGE_COLUMN", default_value = "C")]
    image_column: String,

    /// JSON file overriding column names (see `ColumnSchema`).
    #[arg(long, env = "SHEET2GEO_SCHEMA")]
    schema: Option<PathBuf>,

    /// Print a JSON report instead of the summary.
    #[arg(long, env = "SHEET2GEO_JSON")]
    json: bool,

    /// Load and list the sheets only, no output written.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "SHEET2GEO_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SHEET2GEO_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SHEET2GEO_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries the status lines; keep library INFO logs out
    // of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let cli_cb = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = cli_cb
        .clone()
        .map(|cb| cb as Arc<dyn ConversionProgressCallback>);
    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let sheets = inspect(&cli.input, &config).context("Failed to inspect workbook")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&sheets).context("Failed to serialise sheets")?
            );
        } else {
            println!("File:    {}", cli.input.display());
            for sheet in &sheets {
                println!();
                println!("Sheet:   {}", sheet.sheet);
                println!("Table:   {}", sheet.name);
                println!("Rows:    {}", sheet.rows);
                println!(
                    "Geometry: {}",
                    if sheet.has_geometry { "yes" } else { "missing" }
                );
                println!("Columns:");
                for col in &sheet.columns {
                    println!("  - {}", if col.is_empty() { "(unnamed)" } else { col });
                }
            }
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let result = convert(&cli.input, &config);
    if let Some(cb) = &cli_cb {
        // single-file runs never reach on_batch_complete
        if !cb.bar.is_finished() {
            cb.bar.finish_and_clear();
        }
        let warnings = cb.warnings.load(Ordering::SeqCst);
        if warnings > 0 && !cli.quiet {
            eprintln!("{} {} image warning(s)", yellow("⚠"), warnings);
        }
    }
    let report = result.context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report, &config.output_dir);
    }

    if !report.is_success() {
        anyhow::bail!(
            "{} of {} file(s) failed",
            report.failures.len(),
            report.total_files()
        );
    }
    Ok(())
}

fn print_summary(report: &BatchReport, output_dir: &Path) {
    for file in &report.files {
        eprintln!("{} {}", cyan("◆"), bold(&file.source.display().to_string()));
        for t in &file.tables {
            let exports = match (&t.geojson_path, &t.shapefile_dir) {
                _ if !t.has_geometry => yellow("no coordinate columns, not exported"),
                (Some(_), Some(_)) => "GeoJSON + shapefile".to_string(),
                (Some(_), None) => "GeoJSON".to_string(),
                (None, Some(_)) => "shapefile".to_string(),
                (None, None) => dim("nothing written"),
            };
            eprintln!(
                "  {} {:<32} {:>4} rows  {}",
                if t.image_errors.is_empty() { green("✓") } else { yellow("⚠") },
                t.name,
                t.rows,
                exports
            );
            eprintln!(
                "    {}",
                dim(&format!(
                    "images: {} extracted, {} cached, {} failed",
                    t.images_extracted,
                    t.images_cached,
                    t.image_errors.len()
                ))
            );
        }
    }
    for failure in &report.failures {
        eprintln!(
            "{} {}  {}",
            red("✗"),
            bold(&failure.source.display().to_string()),
            red(&failure.error)
        );
    }
    eprintln!(
        "{}  {} file(s) in {}ms  →  {}",
        if report.is_success() { green("✔") } else { cyan("⚠") },
        report.files.len(),
        report.duration_ms,
        bold(&output_dir.display().to_string()),
    );
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let schema = match cli.schema {
        Some(ref path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read schema from {:?}", path))?;
            serde_json::from_str::<ColumnSchema>(&text)
                .with_context(|| format!("Invalid schema JSON in {:?}", path))?
        }
        None => ColumnSchema::default(),
    };

    let layout = LayoutConfig {
        title_row: cli.title_row,
        header_rows: parse_rows(&cli.header_rows)?,
        data_start_row: cli.data_start_row,
        image_column: cli.image_column.trim().to_ascii_uppercase(),
    };

    let mut builder = ConversionConfig::builder()
        .output_dir(&cli.output)
        .layout(layout)
        .schema(schema)
        .export_geojson(!cli.no_geojson)
        .export_shapefile(!cli.no_shapefile)
        .namespace_images(cli.namespace_images);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--header-rows` ("3,4,5") into row numbers.
fn parse_rows(s: &str) -> Result<Vec<u32>> {
    s.split(',')
        .map(|p| {
            let p = p.trim();
            let row: u32 = p
                .parse()
                .with_context(|| format!("Invalid row number: '{p}'"))?;
            if row < 1 {
                anyhow::bail!("Rows are 1-indexed, minimum is 1 (got {row})");
            }
            Ok(row)
        })
        .collect()
}
