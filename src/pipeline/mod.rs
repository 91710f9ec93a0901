//! Pipeline stages for spreadsheet-to-GIS conversion.
//!
//! Each submodule implements exactly one transformation step. Stages take
//! the table by exclusive borrow, so every step is testable on a hand-built
//! [`crate::Table`] without a workbook on disk.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ load ──▶ normalize ──▶ images ──▶ prune ──▶ geojson
//! (magic)   (header)  (flags, doc)  (drawing,   (empty    shapefile
//!                                    encode)    rows)
//! ```
//!
//! 1. [`input`]:     validate the file (magic bytes) or list a folder
//! 2. [`load`]:      read each sheet with calamine; [`header`] flattens the
//!    three-row composite header
//! 3. [`normalize`]: Yes/No flag columns, text documentation column
//! 4. [`images`]:    bind photos to cached JPEG artefacts; [`drawing`] walks
//!    the package parts, [`encode`] transcodes to RGB JPEG
//! 5. [`prune`]:     drop rows with no source data
//! 6. [`geojson`] / [`shapefile`]: write the point layers

pub mod drawing;
pub mod encode;
pub mod geojson;
pub mod header;
pub mod images;
pub mod input;
pub mod load;
pub mod normalize;
pub mod prune;
pub mod shapefile;

use std::io::Write;
use std::path::Path;

/// Write `bytes` to `path` through a temp file in the same directory.
///
/// Readers never observe a partially written file: either the old content
/// (or nothing) or the complete new content.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.geojson");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        // no stray temp files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn atomic_write_needs_existing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.geojson");
        assert!(write_atomic(&path, b"x").is_err());
    }
}
