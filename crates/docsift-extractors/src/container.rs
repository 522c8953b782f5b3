//! Named-entry access to zip packages and OLE compound files.
//!
//! Both container kinds hold their read handle for as long as the value
//! lives; dropping it releases the handle on every exit path.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::error::{ExtractError, ExtractResult};

/// Upper bound on the buffer reserved up front for one zip entry.
const MAX_SIZE_HINT: usize = 1 << 20;

/// Initial capacity for an entry whose header declares `declared` bytes.
///
/// The declared size comes from the archive and may be corrupt.
fn size_hint(declared: u64) -> usize {
    usize::try_from(declared)
        .unwrap_or(usize::MAX)
        .min(MAX_SIZE_HINT)
}

/// Read-only lookup of named entries.
pub trait Container {
    /// Check whether an entry exists. Names are matched exactly.
    fn has_entry(&self, name: &str) -> bool;

    /// Read an entry in full.
    fn read_entry(&mut self, name: &str) -> ExtractResult<Vec<u8>>;

    /// All entry names, in container order.
    fn entry_names(&self) -> Vec<String>;

    /// Read an entry that may legitimately be absent.
    fn read_optional(&mut self, name: &str) -> ExtractResult<Option<Vec<u8>>> {
        if self.has_entry(name) {
            self.read_entry(name).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Zip-based OOXML package.
///
/// Entry names are the archive's internal paths: case-sensitive and
/// forward-slash separated.
pub struct Package<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl Package<BufReader<File>> {
    /// Open a package from disk.
    pub fn open(path: &Path) -> ExtractResult<Self> {
        let file = File::open(path).map_err(|e| {
            ExtractError::Container(format!("cannot open {}: {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(file))
    }
}

impl Package<Cursor<Vec<u8>>> {
    /// Open a package held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> ExtractResult<Self> {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> Package<R> {
    pub fn from_reader(reader: R) -> ExtractResult<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|e| ExtractError::Container(format!("not a zip package: {e}")))?;
        Ok(Self { archive })
    }

    /// Names of entries under a folder prefix such as `word/embeddings/`.
    pub fn entries_under(&self, prefix: &str) -> Vec<String> {
        self.archive
            .file_names()
            .filter(|name| name.starts_with(prefix) && !name.ends_with('/'))
            .map(str::to_string)
            .collect()
    }
}

impl<R: Read + Seek> Container for Package<R> {
    fn has_entry(&self, name: &str) -> bool {
        self.archive.file_names().any(|n| n == name)
    }

    fn read_entry(&mut self, name: &str) -> ExtractResult<Vec<u8>> {
        let mut entry = self.archive.by_name(name).map_err(|e| match e {
            zip::result::ZipError::FileNotFound => ExtractError::EntryNotFound(name.to_string()),
            other => ExtractError::Container(format!("{name}: {other}")),
        })?;

        let mut buf = Vec::with_capacity(size_hint(entry.size()));
        entry.read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn entry_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }
}

/// OLE compound file (Compound File Binary Format).
///
/// Stream names follow the CFB directory literally, including a leading
/// control byte such as `\x01` in `\x01Ole10Native`.
pub struct CompoundContainer<R: Read + Seek> {
    inner: cfb::CompoundFile<R>,
}

impl CompoundContainer<Cursor<Vec<u8>>> {
    /// Open a compound file held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> ExtractResult<Self> {
        let inner = cfb::CompoundFile::open(Cursor::new(bytes))
            .map_err(|e| ExtractError::Container(format!("not a compound file: {e}")))?;
        Ok(Self { inner })
    }
}

impl<R: Read + Seek> Container for CompoundContainer<R> {
    fn has_entry(&self, name: &str) -> bool {
        self.inner.is_stream(name)
    }

    fn read_entry(&mut self, name: &str) -> ExtractResult<Vec<u8>> {
        if !self.inner.is_stream(name) {
            return Err(ExtractError::EntryNotFound(name.escape_debug().to_string()));
        }

        let mut stream = self.inner.open_stream(name).map_err(|e| {
            ExtractError::Container(format!("{}: {e}", name.escape_debug()))
        })?;
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn entry_names(&self) -> Vec<String> {
        self.inner
            .walk()
            .filter(|entry| entry.is_stream())
            .map(|entry| {
                entry
                    .path()
                    .to_string_lossy()
                    .trim_start_matches('/')
                    .to_string()
            })
            .collect()
    }
}
