//! Recovery of files embedded in a Word package.
//!
//! Spreadsheets under `word/embeddings/` are copied out verbatim; `.bin`
//! OLE objects are opened as compound files and their `Ole10Native`
//! payload is written out. A failure on one entry skips that entry only.

use std::collections::HashSet;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::container::{CompoundContainer, Container, Package};
use crate::error::{ExtractError, ExtractResult};
use crate::ole10::{Ole10Native, OLE10_NATIVE_STREAM};
use crate::types::EmbeddedPayload;

/// Package folder holding embedded objects.
pub const EMBEDDINGS_PREFIX: &str = "word/embeddings/";

/// Extensions treated as spreadsheets.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls"];

/// What an embeddings entry is, judged by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Spreadsheet,
    OleObject,
    Other,
}

impl EntryKind {
    pub fn classify(name: &str) -> Self {
        match extension(name).as_deref() {
            Some(ext) if SPREADSHEET_EXTENSIONS.contains(&ext) => Self::Spreadsheet,
            Some("bin") => Self::OleObject,
            _ => Self::Other,
        }
    }
}

/// Lowercase extension of the last path component.
pub fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// A file written out of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredFile {
    /// Where it was written.
    pub path: PathBuf,
}

impl RecoveredFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn is_spreadsheet(&self) -> bool {
        EntryKind::classify(&self.file_name()) == EntryKind::Spreadsheet
    }
}

/// Decode the `Ole10Native` payload of an OLE object entry.
pub fn decode_ole_object(entry: &str, bytes: Vec<u8>) -> ExtractResult<EmbeddedPayload> {
    let mut ole = CompoundContainer::from_bytes(bytes)?;
    if !ole.has_entry(OLE10_NATIVE_STREAM) {
        return Err(ExtractError::EntryNotFound(format!(
            "{entry}: no Ole10Native stream"
        )));
    }
    let native = Ole10Native::decode(&ole.read_entry(OLE10_NATIVE_STREAM)?)?;
    let original_filename = native.safe_filename();

    Ok(EmbeddedPayload {
        original_filename,
        bytes: native.payload,
        source_entry: entry.to_string(),
    })
}

/// Writes recovered files as `<stem>__<name>` under one directory.
struct Writer<'a> {
    stem: &'a str,
    out_dir: &'a Path,
    used: HashSet<String>,
}

impl Writer<'_> {
    fn write(&mut self, entry: &str, name: &str, bytes: &[u8]) -> ExtractResult<RecoveredFile> {
        let mut file_name = format!("{}__{name}", self.stem);
        if self.used.contains(&file_name) {
            let entry_stem = Path::new(basename(entry))
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            file_name = format!("{}__{entry_stem}__{name}", self.stem);
        }

        std::fs::create_dir_all(self.out_dir)?;
        let path = self.out_dir.join(&file_name);
        std::fs::write(&path, bytes)?;
        self.used.insert(file_name);

        Ok(RecoveredFile { path })
    }
}

/// Recover every usable embedded object from a Word package.
///
/// `stem` is the host document's file stem; files go to `out_dir`, which
/// is created on first write. Entries are visited in archive order.
pub fn recover_embedded<R: Read + Seek>(
    package: &mut Package<R>,
    stem: &str,
    out_dir: &Path,
) -> Vec<RecoveredFile> {
    let mut writer = Writer {
        stem,
        out_dir,
        used: HashSet::new(),
    };
    let mut recovered = Vec::new();

    for entry in package.entries_under(EMBEDDINGS_PREFIX) {
        match recover_entry(package, &entry, &mut writer) {
            Ok(Some(file)) => {
                info!(entry = %entry, path = %file.path.display(), "Recovered embedded file");
                recovered.push(file);
            }
            Ok(None) => debug!(entry = %entry, "Embedded entry not recoverable, ignoring"),
            Err(err) => warn!(entry = %entry, "Skipping embedded entry: {err}"),
        }
    }

    recovered
}

fn recover_entry<R: Read + Seek>(
    package: &mut Package<R>,
    entry: &str,
    writer: &mut Writer<'_>,
) -> ExtractResult<Option<RecoveredFile>> {
    let base = basename(entry);

    match EntryKind::classify(base) {
        EntryKind::Spreadsheet => {
            let bytes = package.read_entry(entry)?;
            writer.write(entry, base, &bytes).map(Some)
        }
        EntryKind::OleObject => {
            let payload = decode_ole_object(entry, package.read_entry(entry)?)?;
            if payload.bytes.is_empty() {
                return Ok(None);
            }
            let name = payload
                .original_filename
                .unwrap_or_else(|| format!("{base}.bin"));
            writer.write(entry, &name, &payload.bytes).map(Some)
        }
        EntryKind::Other => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(EntryKind::classify("Book1.xlsx"), EntryKind::Spreadsheet);
        assert_eq!(EntryKind::classify("Old.XLS"), EntryKind::Spreadsheet);
        assert_eq!(EntryKind::classify("macro.xlsm"), EntryKind::Spreadsheet);
        assert_eq!(EntryKind::classify("oleObject1.bin"), EntryKind::OleObject);
        assert_eq!(EntryKind::classify("image1.emf"), EntryKind::Other);
        assert_eq!(EntryKind::classify("noext"), EntryKind::Other);
    }

    #[test]
    fn test_decode_ole_object_rejects_non_cfb() {
        let err = decode_ole_object("word/embeddings/oleObject1.bin", b"junk".to_vec()).unwrap_err();
        assert!(matches!(err, ExtractError::Container(_)));
    }

    #[test]
    fn test_writer_disambiguates_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = Writer {
            stem: "essay",
            out_dir: dir.path(),
            used: HashSet::new(),
        };

        let first = writer
            .write("word/embeddings/oleObject1.bin", "data.xlsx", b"1")
            .unwrap();
        let second = writer
            .write("word/embeddings/oleObject2.bin", "data.xlsx", b"2")
            .unwrap();

        assert_eq!(first.file_name(), "essay__data.xlsx");
        assert_eq!(second.file_name(), "essay__oleObject2__data.xlsx");
        assert!(first.is_spreadsheet());
        assert_eq!(std::fs::read(&second.path).unwrap(), b"2");
    }
}
