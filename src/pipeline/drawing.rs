//! Locate pictures embedded in an `.xlsx` sheet through its drawing part.
//!
//! calamine only reads cell values, so pictures are found by walking the
//! package relationships directly:
//!
//! ```text
//! xl/workbook.xml            sheet name → r:id
//! xl/_rels/workbook.xml.rels r:id → xl/worksheets/sheetN.xml
//! xl/worksheets/_rels/…      worksheet → xl/drawings/drawingM.xml
//! xl/drawings/drawingM.xml   anchor (from col/row) → r:embed
//! xl/drawings/_rels/…        r:embed → xl/media/imageK.png
//! ```
//!
//! A picture belongs to the cell under the top-left corner of its anchor.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const REL_DRAWING: &str = "/drawing";

/// Errors while walking the drawing parts of a workbook.
#[derive(Debug, Error)]
pub enum DrawingError {
    #[error("zip: {0}")]
    Zip(#[from] ZipError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed XML in '{part}': {detail}")]
    Xml { part: String, detail: String },

    #[error("part '{0}' not found in archive")]
    MissingPart(String),
}

/// The open archive of one workbook plus the picture anchors of one sheet.
///
/// The archive handle lives as long as this value; dropping it releases the
/// file on every path.
pub struct SheetDrawings {
    archive: ZipArchive<File>,
    anchors: HashMap<(u32, u32), String>,
}

impl SheetDrawings {
    /// Open `path` and index the pictures of `sheet`.
    ///
    /// A sheet without a drawing part yields an empty index.
    pub fn open(path: &Path, sheet: &str) -> Result<Self, DrawingError> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;
        let anchors = index_sheet(&mut archive, sheet)?;
        debug!("Sheet '{}': {} anchored picture(s)", sheet, anchors.len());
        Ok(Self { archive, anchors })
    }

    /// Media part anchored at the 0-based `(row, col)`, if any.
    pub fn media_at(&self, row: u32, col: u32) -> Option<&str> {
        self.anchors.get(&(row, col)).map(String::as_str)
    }

    /// Raw bytes of the picture anchored at `(row, col)`.
    pub fn read_picture(&mut self, row: u32, col: u32) -> Result<Option<Vec<u8>>, DrawingError> {
        let Some(part) = self.anchors.get(&(row, col)).cloned() else {
            return Ok(None);
        };
        read_part(&mut self.archive, &part)?
            .map(Some)
            .ok_or(DrawingError::MissingPart(part))
    }
}

// ── Relationship walk ────────────────────────────────────────────────────

fn index_sheet(
    archive: &mut ZipArchive<File>,
    sheet: &str,
) -> Result<HashMap<(u32, u32), String>, DrawingError> {
    let mut anchors = HashMap::new();

    let workbook = read_part(archive, WORKBOOK_PART)?
        .ok_or_else(|| DrawingError::MissingPart(WORKBOOK_PART.to_string()))?;
    let Some(sheet_rid) = sheet_relationship_id(&workbook, sheet)? else {
        return Ok(anchors);
    };

    let workbook_rels = load_relationships(archive, WORKBOOK_PART)?;
    let Some(sheet_part) = workbook_rels
        .iter()
        .find(|r| r.id == sheet_rid)
        .map(|r| resolve_target(WORKBOOK_PART, &r.target))
    else {
        return Ok(anchors);
    };

    let sheet_rels = load_relationships(archive, &sheet_part)?;
    for drawing in sheet_rels.iter().filter(|r| r.kind.ends_with(REL_DRAWING)) {
        let drawing_part = resolve_target(&sheet_part, &drawing.target);
        let Some(xml) = read_part(archive, &drawing_part)? else {
            debug!("Drawing part '{}' is missing", drawing_part);
            continue;
        };
        let pictures = parse_anchors(&xml, &drawing_part)?;
        if pictures.is_empty() {
            continue;
        }
        let media: HashMap<String, String> = load_relationships(archive, &drawing_part)?
            .into_iter()
            .map(|r| (r.id, resolve_target(&drawing_part, &r.target)))
            .collect();
        for pic in pictures {
            match media.get(&pic.embed) {
                Some(target) => {
                    anchors.entry((pic.row, pic.col)).or_insert_with(|| target.clone());
                }
                None => debug!("Picture '{}' has no media relationship", pic.embed),
            }
        }
    }

    Ok(anchors)
}

/// Read a whole archive part. Names match case-insensitively.
fn read_part(archive: &mut ZipArchive<File>, name: &str) -> Result<Option<Vec<u8>>, DrawingError> {
    let Some(actual) = archive
        .file_names()
        .find(|f| f.eq_ignore_ascii_case(name))
        .map(str::to_owned)
    else {
        return Ok(None);
    };
    let mut file = match archive.by_name(&actual) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

/// `dir/_rels/name.rels` for a part `dir/name`.
fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the part that owns it.
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    let target = target.replace('\\', "/");
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = source_part.split('/').collect();
    segments.pop();
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

// ── XML parsing ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct Relationship {
    id: String,
    kind: String,
    target: String,
}

fn xml_reader(bytes: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(bytes);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.expand_empty_elements = true;
    config.trim_text(true);
    reader
}

fn xml_error(part: &str, detail: impl ToString) -> DrawingError {
    DrawingError::Xml {
        part: part.to_string(),
        detail: detail.to_string(),
    }
}

fn attribute(e: &BytesStart<'_>, local: &[u8], part: &str) -> Result<Option<String>, DrawingError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| xml_error(part, err))?;
        if attr.key.local_name().as_ref() == local {
            let value = attr.unescape_value().map_err(|err| xml_error(part, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn load_relationships(
    archive: &mut ZipArchive<File>,
    part: &str,
) -> Result<Vec<Relationship>, DrawingError> {
    let path = rels_path(part);
    match read_part(archive, &path)? {
        Some(xml) => parse_relationships(&xml, &path),
        None => Ok(Vec::new()),
    }
}

fn parse_relationships(xml: &[u8], part: &str) -> Result<Vec<Relationship>, DrawingError> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut rels = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"Relationship" => {
                let id = attribute(&e, b"Id", part)?;
                let target = attribute(&e, b"Target", part)?;
                let kind = attribute(&e, b"Type", part)?.unwrap_or_default();
                if let Some((id, target)) = id.zip(target) {
                    rels.push(Relationship { id, kind, target });
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(part, e)),
        }
        buf.clear();
    }
    Ok(rels)
}

fn sheet_relationship_id(xml: &[u8], sheet: &str) -> Result<Option<String>, DrawingError> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"sheet" => {
                if attribute(&e, b"name", WORKBOOK_PART)?.as_deref() == Some(sheet) {
                    return attribute(&e, b"id", WORKBOOK_PART);
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Ok(_) => {}
            Err(e) => return Err(xml_error(WORKBOOK_PART, e)),
        }
        buf.clear();
    }
}

/// A picture reference: 0-based top-left cell and the embed relationship id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct AnchoredPicture {
    row: u32,
    col: u32,
    embed: String,
}

#[derive(Debug, Clone, Copy)]
enum AnchorField {
    Col,
    Row,
}

fn parse_anchors(xml: &[u8], part: &str) -> Result<Vec<AnchoredPicture>, DrawingError> {
    let mut reader = xml_reader(xml);
    let mut buf = Vec::new();
    let mut pictures = Vec::new();

    let mut current: Option<(Option<(u32, u32)>, Option<String>)> = None;
    let mut from: (Option<u32>, Option<u32>) = (None, None);
    let mut in_from = false;
    let mut field: Option<AnchorField> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"twoCellAnchor" | b"oneCellAnchor" | b"absoluteAnchor" => {
                    current = Some((None, None));
                    from = (None, None);
                }
                b"from" => in_from = true,
                b"col" if in_from => field = Some(AnchorField::Col),
                b"row" if in_from => field = Some(AnchorField::Row),
                b"blip" => {
                    if let Some((_, embed)) = current.as_mut() {
                        if embed.is_none() {
                            *embed = attribute(&e, b"embed", part)?;
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let Some(f) = field {
                    let text = String::from_utf8_lossy(&t);
                    let n: u32 = text
                        .trim()
                        .parse()
                        .map_err(|_| xml_error(part, format!("bad anchor index '{text}'")))?;
                    match f {
                        AnchorField::Col => from.0 = Some(n),
                        AnchorField::Row => from.1 = Some(n),
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"col" | b"row" => field = None,
                b"from" => {
                    in_from = false;
                    if let (Some((cell, _)), (Some(col), Some(row))) = (current.as_mut(), from) {
                        *cell = Some((row, col));
                    }
                }
                b"twoCellAnchor" | b"oneCellAnchor" | b"absoluteAnchor" => {
                    if let Some((Some((row, col)), Some(embed))) = current.take() {
                        pictures.push(AnchoredPicture { row, col, embed });
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(part, e)),
        }
        buf.clear();
    }

    Ok(pictures)
}
