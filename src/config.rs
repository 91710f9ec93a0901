//! Configuration types for spreadsheet-to-GIS conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The fixed survey layout (which rows
//! hold the title and header, where data starts, which column carries the
//! photos) lives in [`LayoutConfig`]; the column names the pipeline keys on
//! live in [`ColumnSchema`]. Both default to the road-sign survey format and
//! can be swapped without touching the stages.

use crate::cancel::CancellationToken;
use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

static RE_COLUMN_LETTERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{1,3}$").unwrap());

/// Configuration for a conversion run.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use sheet2geo::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .output_dir("converted_output")
///     .export_shapefile(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.layout.data_start_row, 6);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Root of every output artefact. Default: `converted_output`.
    pub output_dir: PathBuf,

    /// Physical row/column positions of the survey layout.
    pub layout: LayoutConfig,

    /// Column names and tokens the stages key on.
    pub schema: ColumnSchema,

    /// Write `<table>.geojson`. Default: true.
    pub export_geojson: bool,

    /// Write `<table>_shapefile/<table>.shp` and siblings. Default: true.
    pub export_shapefile: bool,

    /// Prefix artefact names with the source file stem. Default: false.
    ///
    /// Without it two workbooks sharing a sheet name and output folder share
    /// (and overwrite-protect) each other's image artefacts.
    pub namespace_images: bool,

    /// Optional progress/log observer.
    pub progress_callback: Option<ProgressCallback>,

    /// Cooperative cancellation signal, checked between files, sheets, stages
    /// and image rows.
    pub cancel: CancellationToken,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("converted_output"),
            layout: LayoutConfig::default(),
            schema: ColumnSchema::default(),
            export_geojson: true,
            export_shapefile: true,
            namespace_images: false,
            progress_callback: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("output_dir", &self.output_dir)
            .field("layout", &self.layout)
            .field("schema", &self.schema)
            .field("export_geojson", &self.export_geojson)
            .field("export_shapefile", &self.export_shapefile)
            .field("namespace_images", &self.namespace_images)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Directory holding the cached image artefacts.
    pub fn images_dir(&self) -> PathBuf {
        self.output_dir.join(IMAGES_DIR_NAME)
    }

    /// Check layout, schema and output directory.
    ///
    /// [`ConversionConfigBuilder::build`] runs this; the `convert*` entry
    /// points run it again for configs assembled field by field.
    pub fn validate(&self) -> Result<(), ConvertError> {
        self.layout.validate()?;
        self.schema.validate()?;
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "output directory must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), ConvertError> {
        if self.cancel.is_cancelled() {
            Err(ConvertError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Name of the artefact cache directory under the output root.
pub const IMAGES_DIR_NAME: &str = "extracted_images";

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn layout(mut self, layout: LayoutConfig) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn schema(mut self, schema: ColumnSchema) -> Self {
        self.config.schema = schema;
        self
    }

    pub fn export_geojson(mut self, v: bool) -> Self {
        self.config.export_geojson = v;
        self
    }

    pub fn export_shapefile(mut self, v: bool) -> Self {
        self.config.export_shapefile = v;
        self
    }

    pub fn namespace_images(mut self, v: bool) -> Self {
        self.config.namespace_images = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.config.cancel = token;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Layout ───────────────────────────────────────────────────────────────

/// Physical positions of the survey sheet layout. All rows are 1-based, as
/// shown by spreadsheet applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Row holding the table title. Default: 1.
    pub title_row: u32,
    /// Rows of the composite header, top level first. Default: 3, 4, 5.
    pub header_rows: Vec<u32>,
    /// First data row; data row `k` is physical row `data_start_row + k`. Default: 6.
    pub data_start_row: u32,
    /// Column letters of the cell photos are anchored to. Default: `C`.
    pub image_column: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            title_row: 1,
            header_rows: vec![3, 4, 5],
            data_start_row: 6,
            image_column: "C".to_string(),
        }
    }
}

impl LayoutConfig {
    /// Check ordering constraints between title, header and data rows.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.title_row == 0 || self.data_start_row == 0 {
            return Err(ConvertError::InvalidConfig(
                "rows are 1-based, 0 is not a valid row".into(),
            ));
        }
        let (Some(&first), Some(&last)) = (self.header_rows.first(), self.header_rows.last())
        else {
            return Err(ConvertError::InvalidConfig(
                "at least one header row is required".into(),
            ));
        };
        if self.header_rows.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConvertError::InvalidConfig(format!(
                "header rows must be strictly increasing, got {:?}",
                self.header_rows
            )));
        }
        if first <= self.title_row {
            return Err(ConvertError::InvalidConfig(format!(
                "header rows must come after the title row {}",
                self.title_row
            )));
        }
        if last >= self.data_start_row {
            return Err(ConvertError::InvalidConfig(format!(
                "data must start after the last header row {last}, got {}",
                self.data_start_row
            )));
        }
        if !RE_COLUMN_LETTERS.is_match(&self.image_column) {
            return Err(ConvertError::InvalidConfig(format!(
                "image column must be 1–3 uppercase letters, got '{}'",
                self.image_column
            )));
        }
        Ok(())
    }

    /// 0-based index of [`Self::image_column`] (`A` → 0, `C` → 2, `AA` → 26).
    pub fn image_column_index(&self) -> u32 {
        column_index(&self.image_column)
    }
}

/// Convert column letters to a 0-based index. Non-letters are skipped.
pub fn column_index(letters: &str) -> u32 {
    letters
        .bytes()
        .filter(u8::is_ascii_alphabetic)
        .fold(0u32, |acc, b| {
            acc.saturating_mul(26)
                .saturating_add(u32::from(b.to_ascii_uppercase() - b'A' + 1))
        })
        .saturating_sub(1)
}

// ── Schema ───────────────────────────────────────────────────────────────

/// Column names and literal tokens of the survey format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSchema {
    /// Header segments containing this token are dropped. Default: `Unnamed`.
    pub placeholder_token: String,
    /// Columns whose name contains this (any case) are excluded. Default: `Rekap`.
    pub recap_marker: String,
    /// Prefixes of the Yes/No flag columns.
    pub flag_prefixes: Vec<String>,
    /// Location column filled with the table name when empty.
    pub location_column: String,
    /// Column receiving extracted image paths.
    pub documentation_column: String,
    /// Longitude column (flattened name).
    pub longitude_column: String,
    /// Latitude column (flattened name).
    pub latitude_column: String,
    /// Value written to the documentation column when an image fails.
    pub failure_sentinel: String,
    /// Normalised token for a present flag.
    pub flag_yes: String,
    /// Normalised token for an absent flag.
    pub flag_no: String,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            placeholder_token: "Unnamed".to_string(),
            recap_marker: "Rekap".to_string(),
            flag_prefixes: vec!["JENIS RAMBU".to_string(), "LOKASI PEMASANGAN".to_string()],
            location_column: "DETAIL LOKASI".to_string(),
            documentation_column: "DOKUMENTASI".to_string(),
            longitude_column: "TITIK KORDINAT_Longitude".to_string(),
            latitude_column: "TITIK KORDINAT_Latitude".to_string(),
            failure_sentinel: "Image extraction failed".to_string(),
            flag_yes: "Yes".to_string(),
            flag_no: "No".to_string(),
        }
    }
}

impl ColumnSchema {
    pub fn validate(&self) -> Result<(), ConvertError> {
        let required = [
            ("placeholder_token", &self.placeholder_token),
            ("recap_marker", &self.recap_marker),
            ("location_column", &self.location_column),
            ("documentation_column", &self.documentation_column),
            ("longitude_column", &self.longitude_column),
            ("latitude_column", &self.latitude_column),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConvertError::InvalidConfig(format!(
                    "schema field '{field}' must not be empty"
                )));
            }
        }
        if self.longitude_column == self.latitude_column {
            return Err(ConvertError::InvalidConfig(
                "longitude and latitude columns must differ".into(),
            ));
        }
        Ok(())
    }

    /// `true` when `name` is one of the Yes/No flag columns.
    pub fn is_flag_column(&self, name: &str) -> bool {
        self.flag_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }

    /// `true` when `name` is a recap/summary column.
    pub fn is_recap_column(&self, name: &str) -> bool {
        name.to_lowercase()
            .contains(&self.recap_marker.to_lowercase())
    }
}
