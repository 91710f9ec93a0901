//! GeoJSON export: one `FeatureCollection` of points per table.

use crate::error::ConvertError;
use crate::pipeline::write_atomic;
use crate::table::{Row, Table};
use serde::Serialize;
use serde_json::{json, Map, Value as Json};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Longitude/latitude pair for a row, if both parse as finite numbers.
pub fn row_coordinates(row: &Row, lon: usize, lat: usize) -> Option<(f64, f64)> {
    let x = row.cells.get(lon)?.as_f64()?;
    let y = row.cells.get(lat)?.as_f64()?;
    Some((x, y))
}

/// Build the feature collection for `table`.
///
/// Properties hold every column except the two geometry columns, in column
/// order. Rows without usable coordinates get a `null` geometry.
pub fn feature_collection(table: &Table, lon: usize, lat: usize) -> Json {
    let features: Vec<Json> = table
        .rows()
        .iter()
        .map(|row| {
            let mut properties = Map::new();
            for (i, name) in table.columns().iter().enumerate() {
                if i == lon || i == lat {
                    continue;
                }
                let value = row.cells.get(i).map(|v| v.to_json()).unwrap_or(Json::Null);
                properties.insert(name.clone(), value);
            }
            let geometry = match row_coordinates(row, lon, lat) {
                Some((x, y)) => json!({ "type": "Point", "coordinates": [x, y] }),
                None => Json::Null,
            };
            json!({
                "type": "Feature",
                "properties": properties,
                "geometry": geometry,
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

/// Encode with 4-space indentation; non-ASCII stays literal.
pub fn to_pretty_string(value: &Json, table: &str) -> Result<Vec<u8>, ConvertError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser).map_err(|source| ConvertError::Serialize {
        table: table.to_string(),
        source,
    })?;
    buf.push(b'\n');
    Ok(buf)
}

/// Write `<out_dir>/<table.name>.geojson` and return its path.
pub fn write_geojson(
    table: &Table,
    lon: usize,
    lat: usize,
    out_dir: &Path,
) -> Result<PathBuf, ConvertError> {
    let path = out_dir.join(format!("{}.geojson", table.name));
    let collection = feature_collection(table, lon, lat);
    let bytes = to_pretty_string(&collection, &table.name)?;
    debug!("GeoJSON for '{}': {} bytes", table.name, bytes.len());
    write_atomic(&path, &bytes).map_err(|e| ConvertError::write(&path, e))?;
    info!("GeoJSON file created: {}", path.display());
    Ok(path)
}
