//! ESRI Shapefile export: point layer in WGS 84 with a dBASE attribute table.
//!
//! Layout: `<out>/<table>_shapefile/<table>.{shp,shx,dbf,prj,cpg}`.
//!
//! Every table row becomes one record, so the `.dbf` lines up with the
//! GeoJSON features. Rows without usable coordinates get a null shape
//! (shape type 0) in the `.shp`. The `shapefile` writer stamps every record
//! with the header's shape type, so the point records are encoded here and
//! the attribute table goes through its `dbase` writer.
//!
//! dBASE limits shape the attribute table: field names are at most 10 ASCII
//! characters and character fields at most 254 bytes. Column names are
//! sanitised and de-duplicated; long text is truncated on a char boundary.

use crate::error::ConvertError;
use crate::pipeline::geojson::row_coordinates;
use crate::pipeline::write_atomic;
use crate::table::{Table, Value};
use ::shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// WKT for EPSG:4326 in the ESRI dialect `.prj` readers expect.
pub const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

const MAX_FIELD_NAME: usize = 10;
const MAX_CHAR_FIELD: usize = 254;
const NUMERIC_WIDTH: u8 = 20;
const NUMERIC_DECIMALS: u8 = 6;

// ── .shp / .shx constants (sizes in 16-bit words) ───────────────────────

const FILE_CODE: i32 = 9994;
const VERSION: i32 = 1000;
const SHAPE_NULL: i32 = 0;
const SHAPE_POINT: i32 = 1;
const HEADER_WORDS: i32 = 50;
const RECORD_HEADER_WORDS: i32 = 4;
const POINT_CONTENT_WORDS: i32 = 10;
const NULL_CONTENT_WORDS: i32 = 2;

/// How one table column is stored in the `.dbf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Index of the source column in the table.
    pub column: usize,
    /// Sanitised dBASE field name.
    pub name: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    /// Character field of the given byte length.
    Character(u8),
}

/// Written shapefile bundle.
#[derive(Debug, Clone)]
pub struct ShapefileOutput {
    pub dir: PathBuf,
    /// Records with a point geometry.
    pub points: usize,
    /// Records written with a null shape.
    pub null_shapes: usize,
}

/// Map column names to unique dBASE field names.
pub fn field_names(columns: &[&str]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    columns
        .iter()
        .map(|col| {
            let mut base: String = col
                .trim()
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .take(MAX_FIELD_NAME)
                .collect();
            if base.trim_matches('_').is_empty() {
                base = "FIELD".to_string();
            }
            let mut candidate = base.clone();
            let mut n = 1;
            while used.contains(&candidate.to_ascii_uppercase()) {
                let suffix = format!("_{n}");
                let keep = MAX_FIELD_NAME.saturating_sub(suffix.len()).min(base.len());
                candidate = format!("{}{}", &base[..keep], suffix);
                n += 1;
            }
            used.insert(candidate.to_ascii_uppercase());
            candidate
        })
        .collect()
}

/// Decide the dBASE layout for every column, coordinates included.
pub fn field_specs(table: &Table) -> Vec<FieldSpec> {
    let names: Vec<&str> = table.columns().iter().map(String::as_str).collect();

    field_names(&names)
        .into_iter()
        .enumerate()
        .map(|(column, name)| {
            let values = table.rows().iter().filter_map(|r| r.cells.get(column));
            let mut numeric = true;
            let mut longest = 1usize;
            for v in values.filter(|v| !v.is_blank()) {
                if !matches!(v, Value::Number(_)) {
                    numeric = false;
                }
                longest = longest.max(v.to_label().len());
            }
            let kind = if numeric {
                FieldKind::Numeric
            } else {
                FieldKind::Character(longest.min(MAX_CHAR_FIELD) as u8)
            };
            FieldSpec { column, name, kind }
        })
        .collect()
}

/// Write the shapefile bundle for `table` under `out_dir`.
pub fn write_shapefile(
    table: &Table,
    lon: usize,
    lat: usize,
    out_dir: &Path,
) -> Result<ShapefileOutput, ConvertError> {
    let dir = out_dir.join(format!("{}_shapefile", table.name));
    std::fs::create_dir_all(&dir).map_err(|e| ConvertError::write(&dir, e))?;
    let shp = dir.join(format!("{}.shp", table.name));

    // ── Geometry ─────────────────────────────────────────────────────────
    let points: Vec<Option<(f64, f64)>> = table
        .rows()
        .iter()
        .map(|row| {
            let point = row_coordinates(row, lon, lat);
            if point.is_none() {
                warn!(
                    "Row {} of '{}' has no valid coordinates; written with a null shape",
                    row.physical_row, table.name
                );
            }
            point
        })
        .collect();
    let (shp_bytes, shx_bytes) = encode_point_layer(&points);
    write_atomic(&shp, &shp_bytes).map_err(|e| ConvertError::write(&shp, e))?;
    let shx = shp.with_extension("shx");
    write_atomic(&shx, &shx_bytes).map_err(|e| ConvertError::write(&shx, e))?;

    // ── Attributes ───────────────────────────────────────────────────────
    let dbf = shp.with_extension("dbf");
    let dbase_error = |e: ::shapefile::dbase::Error| ConvertError::Shapefile {
        path: dbf.clone(),
        detail: e.to_string(),
    };

    let specs = field_specs(table);
    let mut builder = TableWriterBuilder::new();
    for spec in &specs {
        let name = FieldName::try_from(spec.name.as_str()).map_err(|e| ConvertError::Shapefile {
            path: dbf.clone(),
            detail: format!("field name '{}': {:?}", spec.name, e),
        })?;
        builder = match spec.kind {
            FieldKind::Numeric => builder.add_numeric_field(name, NUMERIC_WIDTH, NUMERIC_DECIMALS),
            FieldKind::Character(len) => builder.add_character_field(name, len),
        };
    }
    debug!("dBASE layout for '{}': {:?}", table.name, specs);

    let mut writer = builder.build_with_file_dest(&dbf).map_err(dbase_error)?;
    for row in table.rows() {
        let mut record = Record::default();
        for spec in &specs {
            let value = row.cells.get(spec.column).cloned().unwrap_or_default();
            record.insert(spec.name.clone(), field_value(&value, spec.kind));
        }
        writer.write_record(&record).map_err(dbase_error)?;
    }
    writer.close().map_err(dbase_error)?;

    for (ext, contents) in [("prj", WGS84_PRJ), ("cpg", "UTF-8")] {
        let path = shp.with_extension(ext);
        write_atomic(&path, contents.as_bytes()).map_err(|e| ConvertError::write(&path, e))?;
    }

    let point_count = points.iter().filter(|p| p.is_some()).count();
    info!(
        "Shapefile created: {} ({} points, {} null)",
        shp.display(),
        point_count,
        points.len() - point_count
    );
    Ok(ShapefileOutput {
        dir,
        points: point_count,
        null_shapes: points.len() - point_count,
    })
}

/// Encode `.shp` and `.shx` contents for a point layer.
///
/// `None` entries become null-shape records; the layer's shape type stays
/// Point. The bounding box covers the non-null points only.
fn encode_point_layer(points: &[Option<(f64, f64)>]) -> (Vec<u8>, Vec<u8>) {
    let bbox = points
        .iter()
        .flatten()
        .fold(None, |acc: Option<[f64; 4]>, &(x, y)| {
            Some(match acc {
                None => [x, y, x, y],
                Some([x0, y0, x1, y1]) => [x0.min(x), y0.min(y), x1.max(x), y1.max(y)],
            })
        })
        .unwrap_or([0.0; 4]);

    let content_words = |p: &Option<(f64, f64)>| match p {
        Some(_) => POINT_CONTENT_WORDS,
        None => NULL_CONTENT_WORDS,
    };
    let shp_words = HEADER_WORDS
        + points
            .iter()
            .map(|p| RECORD_HEADER_WORDS + content_words(p))
            .sum::<i32>();
    let shx_words = HEADER_WORDS + RECORD_HEADER_WORDS * points.len() as i32;

    let mut shp = Vec::with_capacity(shp_words as usize * 2);
    let mut shx = Vec::with_capacity(shx_words as usize * 2);
    write_main_header(&mut shp, shp_words, bbox);
    write_main_header(&mut shx, shx_words, bbox);

    let mut offset = HEADER_WORDS;
    for (i, point) in points.iter().enumerate() {
        let words = content_words(point);
        shx.extend_from_slice(&offset.to_be_bytes());
        shx.extend_from_slice(&words.to_be_bytes());

        shp.extend_from_slice(&(i as i32 + 1).to_be_bytes());
        shp.extend_from_slice(&words.to_be_bytes());
        match point {
            Some((x, y)) => {
                shp.extend_from_slice(&SHAPE_POINT.to_le_bytes());
                shp.extend_from_slice(&x.to_le_bytes());
                shp.extend_from_slice(&y.to_le_bytes());
            }
            None => shp.extend_from_slice(&SHAPE_NULL.to_le_bytes()),
        }
        offset += RECORD_HEADER_WORDS + words;
    }
    (shp, shx)
}

/// The 100-byte header shared by `.shp` and `.shx`.
fn write_main_header(buf: &mut Vec<u8>, file_words: i32, [xmin, ymin, xmax, ymax]: [f64; 4]) {
    buf.extend_from_slice(&FILE_CODE.to_be_bytes());
    buf.extend_from_slice(&[0u8; 20]);
    buf.extend_from_slice(&file_words.to_be_bytes());
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&SHAPE_POINT.to_le_bytes());
    // z and m ranges stay zero for 2-D points
    for v in [xmin, ymin, xmax, ymax, 0.0, 0.0, 0.0, 0.0] {
        buf.extend_from_slice(&f64::to_le_bytes(v));
    }
}

fn field_value(value: &Value, kind: FieldKind) -> FieldValue {
    match kind {
        FieldKind::Numeric => FieldValue::Numeric(value.as_f64()),
        FieldKind::Character(_) if value.is_blank() => FieldValue::Character(None),
        FieldKind::Character(_) => {
            FieldValue::Character(Some(truncate_bytes(&value.to_label(), MAX_CHAR_FIELD)))
        }
    }
}

fn truncate_bytes(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut t = Table::new(
            "Ruas 1",
            "Siliwangi",
            vec![
                "NO".into(),
                "DETAIL LOKASI".into(),
                "TITIK KORDINAT_Longitude".into(),
                "TITIK KORDINAT_Latitude".into(),
                "JENIS RAMBU_Larangan".into(),
                "JENIS RAMBU_Peringatan".into(),
            ],
        );
        t.push_row(
            6,
            vec![
                Value::Number(1.0),
                Value::text("Simpang Dago"),
                Value::Number(107.61),
                Value::Number(-6.89),
                Value::text("Yes"),
                Value::text("No"),
            ],
            true,
        );
        t.push_row(
            7,
            vec![
                Value::Number(2.0),
                Value::text("Siliwangi"),
                Value::Empty,
                Value::Empty,
                Value::text("No"),
                Value::text("No"),
            ],
            true,
        );
        t
    }

    #[test]
    fn field_names_fit_dbase_limits() {
        let names = field_names(&[
            "JENIS RAMBU_Larangan",
            "JENIS RAMBU_Peringatan",
            "JENIS RAMBU_Perintah",
            "",
            "Lokasi é",
        ]);
        assert_eq!(names[0], "JENIS_RAMB");
        assert_eq!(names[1], "JENIS_RA_1");
        assert_eq!(names[2], "JENIS_RA_2");
        assert_eq!(names[3], "FIELD");
        assert_eq!(names[4], "Lokasi__");
        assert!(names.iter().all(|n| n.len() <= 10 && n.is_ascii()));
    }

    #[test]
    fn specs_cover_every_column() {
        let specs = field_specs(&sample());
        let cols: Vec<usize> = specs.iter().map(|s| s.column).collect();
        assert_eq!(cols, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(specs[0].kind, FieldKind::Numeric);
        assert_eq!(specs[1].kind, FieldKind::Character(12));
        assert_eq!(specs[2].kind, FieldKind::Numeric);
        assert_eq!(specs[3].kind, FieldKind::Numeric);
        assert_eq!(specs[4].kind, FieldKind::Character(3));
        assert_eq!(specs[2].name, "TITIK_KORD");
        assert_eq!(specs[3].name, "TITIK_KO_1");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let s = "é".repeat(200);
        let t = truncate_bytes(&s, 254);
        assert_eq!(t.len(), 254);
        let t = truncate_bytes(&s, 253);
        assert_eq!(t.len(), 252);
        assert_eq!(truncate_bytes("abc", 254), "abc");
    }

    #[test]
    fn point_layer_encodes_null_records() {
        let (shp, shx) = encode_point_layer(&[Some((107.61, -6.89)), None]);
        // header + point record (8 + 20) + null record (8 + 4)
        assert_eq!(shp.len(), 100 + 28 + 12);
        assert_eq!(shx.len(), 100 + 16);
        assert_eq!(i32::from_be_bytes(shp[24..28].try_into().unwrap()) * 2, shp.len() as i32);
        assert_eq!(i32::from_be_bytes(shx[24..28].try_into().unwrap()) * 2, shx.len() as i32);
        assert_eq!(i32::from_le_bytes(shp[136..140].try_into().unwrap()), SHAPE_NULL);
        // second index entry points at the null record
        assert_eq!(i32::from_be_bytes(shx[108..112].try_into().unwrap()), 64);
        assert_eq!(i32::from_be_bytes(shx[112..116].try_into().unwrap()), 2);
        assert_eq!(f64::from_le_bytes(shp[36..44].try_into().unwrap()), 107.61);
    }

    #[test]
    fn writes_one_record_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let out = write_shapefile(&sample(), 2, 3, dir.path()).unwrap();
        assert_eq!(out.dir, dir.path().join("Siliwangi_shapefile"));
        assert_eq!(out.points, 1);
        assert_eq!(out.null_shapes, 1);

        for ext in ["shp", "shx", "dbf", "prj", "cpg"] {
            let path = out.dir.join(format!("Siliwangi.{ext}"));
            assert!(path.is_file(), "missing {}", path.display());
        }

        let shp = out.dir.join("Siliwangi.shp");
        let bytes = std::fs::read(&shp).unwrap();
        assert_eq!(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]), 9994);
        assert_eq!(i32::from_le_bytes([bytes[32], bytes[33], bytes[34], bytes[35]]), 1);

        let shapes = ::shapefile::read_shapes(&shp).unwrap();
        assert_eq!(shapes.len(), 2);
        match &shapes[0] {
            ::shapefile::Shape::Point(p) => assert_eq!((p.x, p.y), (107.61, -6.89)),
            _ => panic!("first record should be a point"),
        }
        assert!(matches!(shapes[1], ::shapefile::Shape::NullShape));

        let mut dbf = ::shapefile::dbase::Reader::from_path(out.dir.join("Siliwangi.dbf")).unwrap();
        let names: Vec<String> = dbf.fields().iter().map(|f| f.name().to_string()).collect();
        assert_eq!(
            names,
            vec!["NO", "DETAIL_LOK", "TITIK_KORD", "TITIK_KO_1", "JENIS_RAMB", "JENIS_RA_1"]
        );
        let records = dbf.read().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].get("TITIK_KORD"),
            Some(&FieldValue::Numeric(Some(107.61)))
        );
        assert_eq!(records[1].get("TITIK_KORD"), Some(&FieldValue::Numeric(None)));
        assert_eq!(
            records[1].get("DETAIL_LOK"),
            Some(&FieldValue::Character(Some("Siliwangi".to_string())))
        );

        let prj = std::fs::read_to_string(out.dir.join("Siliwangi.prj")).unwrap();
        assert!(prj.starts_with("GEOGCS[\"GCS_WGS_1984\""));
        let cpg = std::fs::read_to_string(out.dir.join("Siliwangi.cpg")).unwrap();
        assert_eq!(cpg, "UTF-8");
    }
}
