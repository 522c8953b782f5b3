//! In-memory fixture builders for OOXML packages and OLE objects.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use docsift_extractors::Ole10Native;
use zip::write::SimpleFileOptions;

pub const W: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;
pub const S: &str = r#"xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main""#;
const R: &str =
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#;
const REL: &str = r#"xmlns="http://schemas.openxmlformats.org/package/2006/relationships""#;

/// Zip archive with the given entries, in order.
pub fn zip_bytes(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// `word/document.xml` wrapping `body`.
pub fn document_xml(body: &str) -> Vec<u8> {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {W}><w:body>{body}</w:body></w:document>"#
    )
    .into_bytes()
}

/// `word/comments.xml` wrapping `inner`.
pub fn comments_xml(inner: &str) -> Vec<u8> {
    format!(r#"<?xml version="1.0"?><w:comments {W}>{inner}</w:comments>"#).into_bytes()
}

/// Paragraph with a single run of text.
pub fn paragraph(text: &str) -> String {
    format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>")
}

/// Single-sheet workbook package.
pub fn workbook(shared: &[&str], rows: &str) -> Vec<u8> {
    let items: String = shared
        .iter()
        .map(|s| format!("<si><t>{s}</t></si>"))
        .collect();

    zip_bytes(&[
        (
            "xl/workbook.xml",
            format!(
                r#"<workbook {S} {R}><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#
            )
            .into_bytes(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            format!(
                r#"<Relationships {REL}><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#
            )
            .into_bytes(),
        ),
        (
            "xl/sharedStrings.xml",
            format!(r#"<sst {S}>{items}</sst>"#).into_bytes(),
        ),
        (
            "xl/worksheets/sheet1.xml",
            format!(r#"<worksheet {S}><sheetData>{rows}</sheetData></worksheet>"#).into_bytes(),
        ),
    ])
}

/// OLE compound file holding an `Ole10Native` stream for `filename`.
pub fn ole_object(filename: &str, payload: &[u8]) -> Vec<u8> {
    ole_with_stream("\u{1}Ole10Native", &Ole10Native::encode(filename, payload))
}

/// OLE compound file holding one arbitrary stream.
pub fn ole_with_stream(name: &str, data: &[u8]) -> Vec<u8> {
    let mut ole = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    {
        let mut stream = ole.create_stream(name).unwrap();
        stream.write_all(data).unwrap();
    }
    ole.flush().unwrap();
    ole.into_inner().into_inner()
}

/// Write `bytes` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}
