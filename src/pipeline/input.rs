//! Input resolution: validate a spreadsheet path or list a folder's spreadsheets.
//!
//! Magic bytes are checked before calamine sees the file so a renamed PDF or
//! a half-synced cloud placeholder produces a clear error instead of a zip or
//! OLE2 parse failure deep inside the loader.

use crate::error::ConvertError;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";
const OLE2_MAGIC: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];

/// Extensions processed in folder mode (compared case-insensitively).
pub const SPREADSHEET_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// Container format of a workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    /// Office Open XML (zip package). Embedded pictures are readable.
    Xlsx,
    /// Legacy BIFF8 in an OLE2 compound file.
    Xls,
}

impl SpreadsheetFormat {
    pub fn from_magic(magic: &[u8; 4]) -> Option<Self> {
        match *magic {
            ZIP_MAGIC => Some(Self::Xlsx),
            OLE2_MAGIC => Some(Self::Xls),
            _ => None,
        }
    }
}

/// A validated input spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub path: PathBuf,
    pub format: SpreadsheetFormat,
}

/// What the user pointed the converter at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    File(PathBuf),
    Folder(PathBuf),
}

/// Classify `path` as a file or a folder; fails if it does not exist.
pub fn classify(path: &Path) -> Result<InputKind, ConvertError> {
    let meta = std::fs::metadata(path).map_err(|e| io_to_input_error(path, e))?;
    if meta.is_dir() {
        Ok(InputKind::Folder(path.to_path_buf()))
    } else {
        Ok(InputKind::File(path.to_path_buf()))
    }
}

/// Validate a single spreadsheet: exists, readable, and carries a known magic.
pub fn resolve_file(path: &Path) -> Result<ResolvedInput, ConvertError> {
    let mut file = File::open(path).map_err(|e| io_to_input_error(path, e))?;
    let mut magic = [0u8; 4];
    let mut filled = 0;
    while filled < magic.len() {
        match file.read(&mut magic[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(io_to_input_error(path, e)),
        }
    }

    let format = SpreadsheetFormat::from_magic(&magic).ok_or_else(|| {
        ConvertError::NotASpreadsheet {
            path: path.to_path_buf(),
            magic,
        }
    })?;
    debug!("Resolved {:?} workbook: {}", format, path.display());
    Ok(ResolvedInput {
        path: path.to_path_buf(),
        format,
    })
}

/// Spreadsheet children of `dir`, sorted by file name.
///
/// Only immediate children with a spreadsheet extension are returned; Excel
/// lock files (`~$name.xlsx`) are skipped.
pub fn list_spreadsheets(dir: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    if !dir.is_dir() {
        return Err(if dir.exists() {
            ConvertError::NotADirectory {
                path: dir.to_path_buf(),
            }
        } else {
            ConvertError::FileNotFound {
                path: dir.to_path_buf(),
            }
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| io_to_input_error(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_to_input_error(dir, e))?;
        let path = entry.path();
        if path.is_file() && is_spreadsheet_name(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("{} spreadsheet(s) in {}", files.len(), dir.display());
    Ok(files)
}

/// `true` for `*.xlsx` / `*.xls` names that are not Excel lock files.
pub fn is_spreadsheet_name(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with("~$") {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn io_to_input_error(path: &Path, e: io::Error) -> ConvertError {
    match e.kind() {
        io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied {
            path: path.to_path_buf(),
        },
        io::ErrorKind::NotFound => ConvertError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => ConvertError::Workbook {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    }
}
