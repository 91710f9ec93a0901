//! Survey workbook fixtures built in memory.
//!
//! The workbooks are minimal but real OOXML packages: calamine reads the
//! cells, and the drawing parts anchor one valid PNG at `C6` and one
//! unreadable picture at `C7`. [`Variant`] selects the broken shapes.

#![allow(dead_code)]

use image::{ImageFormat, Rgba, RgbaImage};
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const SHEET: &str = "Ruas 1";
pub const TITLE: &str = "DATA RAMBU JALAN SILIWANGI";

/// One data row: running number, location, lon, lat, flag.
pub struct SurveyRow {
    pub no: u32,
    pub location: &'static str,
    pub lon: f64,
    pub lat: f64,
    pub flag: bool,
}

/// Rows 6–8 of the default survey; row 9 only carries a running number.
pub fn default_rows() -> Vec<SurveyRow> {
    vec![
        SurveyRow { no: 1, location: "Simpang Dago", lon: 107.61, lat: -6.89, flag: true },
        SurveyRow { no: 2, location: "Jl. Siliwangi 12", lon: 107.62, lat: -6.88, flag: false },
        SurveyRow { no: 3, location: "", lon: 107.63, lat: -6.87, flag: true },
    ]
}

/// Write the default survey workbook, with pictures, to `path`.
pub fn write_survey(path: &Path) {
    write_workbook(path, TITLE, &default_rows(), true);
}

/// Shape of a generated survey workbook.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Pictures anchored at `C6` (valid) and `C7` (unreadable).
    Pictures,
    /// No drawing parts.
    Plain,
    /// A drawing part whose anchor cannot be parsed.
    BrokenDrawing,
    /// No `TITIK KORDINAT` header group and no coordinate cells.
    NoCoordinates,
}

/// Write a survey workbook with one sheet named [`SHEET`].
pub fn write_workbook(path: &Path, title: &str, rows: &[SurveyRow], pictures: bool) {
    let variant = if pictures { Variant::Pictures } else { Variant::Plain };
    write_variant(path, title, rows, variant);
}

/// Write a survey workbook of the given [`Variant`].
pub fn write_variant(path: &Path, title: &str, rows: &[SurveyRow], variant: Variant) {
    let drawing = match variant {
        Variant::Pictures => Some(DRAWING),
        Variant::BrokenDrawing => Some(BROKEN_DRAWING),
        Variant::Plain | Variant::NoCoordinates => None,
    };
    let coordinates = variant != Variant::NoCoordinates;

    let file = std::fs::File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let mut put = |name: &str, bytes: &[u8]| {
        let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        zip.start_file(name, opts).unwrap();
        zip.write_all(bytes).unwrap();
    };

    put("[Content_Types].xml", CONTENT_TYPES.as_bytes());
    put("_rels/.rels", ROOT_RELS.as_bytes());
    put("xl/workbook.xml", workbook_xml(SHEET).as_bytes());
    put("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes());
    put(
        "xl/worksheets/sheet1.xml",
        sheet_xml(title, rows, drawing.is_some(), coordinates).as_bytes(),
    );
    if let Some(drawing) = drawing {
        put("xl/worksheets/_rels/sheet1.xml.rels", SHEET_RELS.as_bytes());
        put("xl/drawings/drawing1.xml", drawing.as_bytes());
        put("xl/drawings/_rels/drawing1.xml.rels", DRAWING_RELS.as_bytes());
        put("xl/media/image1.png", &sample_png());
        put("xl/media/image2.png", b"\x89PNG\r\n\x1a\nnot really a png");
    }
    zip.finish().unwrap();
}

/// An 8×8 semi-transparent PNG; the alpha channel must be dropped on export.
pub fn sample_png() -> Vec<u8> {
    let img = RgbaImage::from_pixel(8, 8, Rgba([200, 30, 30, 128]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
    buf
}

// ── Package parts ────────────────────────────────────────────────────────

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Default Extension="png" ContentType="image/png"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/drawings/drawing1.xml" ContentType="application/vnd.openxmlformats-officedocument.drawing+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

const SHEET_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing1.xml"/>
</Relationships>"#;

const DRAWING_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image2.png"/>
</Relationships>"#;

const DRAWING: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<xdr:oneCellAnchor>
<xdr:from><xdr:col>2</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>5</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
<xdr:ext cx="952500" cy="952500"/>
<xdr:pic><xdr:nvPicPr><xdr:cNvPr id="2" name="Picture 1"/><xdr:cNvPicPr/></xdr:nvPicPr><xdr:blipFill><a:blip r:embed="rId1"/></xdr:blipFill><xdr:spPr/></xdr:pic>
<xdr:clientData/>
</xdr:oneCellAnchor>
<xdr:oneCellAnchor>
<xdr:from><xdr:col>2</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>6</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
<xdr:ext cx="952500" cy="952500"/>
<xdr:pic><xdr:nvPicPr><xdr:cNvPr id="3" name="Picture 2"/><xdr:cNvPicPr/></xdr:nvPicPr><xdr:blipFill><a:blip r:embed="rId2"/></xdr:blipFill><xdr:spPr/></xdr:pic>
<xdr:clientData/>
</xdr:oneCellAnchor>
</xdr:wsDr>"#;

const BROKEN_DRAWING: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<xdr:oneCellAnchor>
<xdr:from><xdr:col>two</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>five</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
<xdr:ext cx="952500" cy="952500"/>
<xdr:pic><xdr:nvPicPr><xdr:cNvPr id="2" name="Picture 1"/><xdr:cNvPicPr/></xdr:nvPicPr><xdr:blipFill><a:blip r:embed="rId1"/></xdr:blipFill><xdr:spPr/></xdr:pic>
<xdr:clientData/>
</xdr:oneCellAnchor>
</xdr:wsDr>"#;

fn workbook_xml(sheet: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="{sheet}" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#
    )
}

// ── Worksheet ────────────────────────────────────────────────────────────

enum Cell<'a> {
    Text(&'a str),
    Number(f64),
}

fn cell_xml(col: char, row: u32, cell: &Cell<'_>) -> String {
    match cell {
        Cell::Text(s) => format!(r#"<c r="{col}{row}" t="inlineStr"><is><t>{s}</t></is></c>"#),
        Cell::Number(n) => format!(r#"<c r="{col}{row}"><v>{n}</v></c>"#),
    }
}

fn row_xml(row: u32, cells: &[(char, Cell<'_>)]) -> String {
    let inner: String = cells.iter().map(|(col, c)| cell_xml(*col, row, c)).collect();
    format!(r#"<row r="{row}">{inner}</row>"#)
}

fn sheet_xml(title: &str, rows: &[SurveyRow], pictures: bool, coordinates: bool) -> String {
    let mut data = Vec::new();
    data.push(row_xml(1, &[('A', Cell::Text(title))]));
    let mut header = vec![
        ('A', Cell::Text("NO")),
        ('B', Cell::Text("DETAIL LOKASI")),
        ('C', Cell::Text("DOKUMENTASI")),
    ];
    let mut sub_header = Vec::new();
    if coordinates {
        header.push(('D', Cell::Text("TITIK KORDINAT")));
        sub_header.push(('D', Cell::Text("Longitude")));
        sub_header.push(('E', Cell::Text("Latitude")));
    }
    header.push(('F', Cell::Text("JENIS RAMBU")));
    header.push(('G', Cell::Text("Rekap")));
    sub_header.push(('F', Cell::Text("Larangan")));
    data.push(row_xml(3, &header));
    data.push(row_xml(4, &sub_header));

    let mut physical = 6;
    for r in rows {
        let mut cells = vec![('A', Cell::Number(f64::from(r.no)))];
        if !r.location.is_empty() {
            cells.push(('B', Cell::Text(r.location)));
        }
        if coordinates {
            cells.push(('D', Cell::Number(r.lon)));
            cells.push(('E', Cell::Number(r.lat)));
        }
        if r.flag {
            cells.push(('F', Cell::Number(1.0)));
        }
        cells.push(('G', Cell::Number(1.0)));
        data.push(row_xml(physical, &cells));
        physical += 1;
    }
    data.push(row_xml(physical, &[('A', Cell::Number(f64::from(physical - 5)))]));

    let drawing = if pictures { r#"<drawing r:id="rId1"/>"# } else { "" };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<dimension ref="A1:G{physical}"/>
<sheetData>{}</sheetData>
{drawing}
</worksheet>"#,
        data.concat()
    )
}
