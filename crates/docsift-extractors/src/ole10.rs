//! `Ole10Native` envelope decoding.
//!
//! Word and Excel wrap foreign files dropped into a document in a small
//! binary header inside the `\x01Ole10Native` stream. Only the fields
//! needed to recover the file are modelled; the rest are skipped by fixed
//! byte counts.
//!
//! Layout (little-endian):
//!
//! | size | field                                  |
//! |------|----------------------------------------|
//! | 4    | total length (presence only)           |
//! | 2    | flags (skipped)                        |
//! | 2    | reserved (skipped)                     |
//! | n+1  | NUL-terminated Latin-1 filename        |
//! | m+1  | NUL-terminated source path (discarded) |
//! | 4    | reserved (skipped)                     |
//! | 4    | reserved (skipped)                     |
//! | 4    | payload length                         |
//! | len  | payload                                |

use crate::error::{ExtractError, ExtractResult};

/// Name of the stream carrying the envelope inside a compound file.
pub const OLE10_NATIVE_STREAM: &str = "\u{1}Ole10Native";

/// A decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ole10Native {
    /// Filename as recorded by the embedding application; may be empty.
    pub filename: String,
    pub payload: Vec<u8>,
}

/// Bounds-checked cursor over the raw stream.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize, field: &str) -> ExtractResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                ExtractError::MalformedOle10Native(format!(
                    "{field} runs past end of stream (offset {}, need {len}, have {})",
                    self.pos,
                    self.data.len().saturating_sub(self.pos)
                ))
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn skip(&mut self, len: usize, field: &str) -> ExtractResult<()> {
        self.take(len, field).map(|_| ())
    }

    fn u32_le(&mut self, field: &str) -> ExtractResult<u32> {
        let bytes = self.take(4, field)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn c_string(&mut self, field: &str) -> ExtractResult<&'a [u8]> {
        let rest = &self.data[self.pos.min(self.data.len())..];
        let nul = rest.iter().position(|b| *b == 0).ok_or_else(|| {
            ExtractError::MalformedOle10Native(format!("{field} has no NUL terminator"))
        })?;
        let bytes = &rest[..nul];
        self.pos += nul + 1;
        Ok(bytes)
    }
}

impl Ole10Native {
    /// Decode an envelope from raw stream bytes.
    pub fn decode(data: &[u8]) -> ExtractResult<Self> {
        let mut cursor = Cursor { data, pos: 0 };

        cursor.u32_le("total length")?;
        cursor.skip(2, "flags")?;
        cursor.skip(2, "reserved")?;
        let filename = latin1(cursor.c_string("filename")?);
        cursor.c_string("source path")?;
        cursor.skip(4, "reserved")?;
        cursor.skip(4, "reserved")?;
        let size = cursor.u32_le("payload length")? as usize;
        let payload = cursor.take(size, "payload")?.to_vec();

        Ok(Self { filename, payload })
    }

    /// Build envelope bytes for a filename and payload.
    ///
    /// Characters outside Latin-1 are written as `?`.
    pub fn encode(filename: &str, payload: &[u8]) -> Vec<u8> {
        let name: Vec<u8> = filename
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .filter(|b| *b != 0)
            .collect();

        let mut body = Vec::with_capacity(name.len() * 2 + payload.len() + 20);
        body.extend_from_slice(&2u16.to_le_bytes());
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&name);
        body.push(0);
        body.extend_from_slice(&name);
        body.push(0);
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        body.extend_from_slice(payload);

        let mut out = Vec::with_capacity(body.len() + 4);
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    /// Final path component of the recorded filename, if there is one.
    ///
    /// Both separators are honoured since the name usually comes from a
    /// Windows path.
    pub fn safe_filename(&self) -> Option<String> {
        self.filename
            .rsplit(['/', '\\'])
            .next()
            .map(str::trim)
            .filter(|name| !name.is_empty() && *name != "." && *name != "..")
            .map(str::to_string)
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|b| char::from(*b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let payload = b"PK\x03\x04 workbook bytes".to_vec();
        let encoded = Ole10Native::encode("data.xlsx", &payload);
        let decoded = Ole10Native::decode(&encoded).unwrap();

        assert_eq!(decoded.filename, "data.xlsx");
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn test_latin1_filename() {
        let encoded = Ole10Native::encode("r\u{e9}sum\u{e9}.txt", b"x");
        let decoded = Ole10Native::decode(&encoded).unwrap();
        assert_eq!(decoded.filename, "r\u{e9}sum\u{e9}.txt");
    }

    #[test]
    fn test_empty_payload() {
        let encoded = Ole10Native::encode("empty.bin", b"");
        let decoded = Ole10Native::decode(&encoded).unwrap();
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_truncated_header() {
        let err = Ole10Native::decode(&[0x10, 0x00, 0x00]).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedOle10Native(_)));
    }

    #[test]
    fn test_missing_terminator() {
        let mut data = vec![0u8; 8];
        data.extend_from_slice(b"no-terminator");
        let err = Ole10Native::decode(&data).unwrap_err();
        assert!(err.to_string().contains("NUL terminator"));
    }

    #[test]
    fn test_payload_length_past_end() {
        let mut encoded = Ole10Native::encode("a.txt", b"abc");
        encoded.truncate(encoded.len() - 1);
        let err = Ole10Native::decode(&encoded).unwrap_err();
        assert!(err.to_string().contains("payload"));
    }

    #[test]
    fn test_every_truncation_is_an_error() {
        let encoded = Ole10Native::encode("notes.txt", b"hello");
        for len in 0..encoded.len() {
            assert!(
                Ole10Native::decode(&encoded[..len]).is_err(),
                "prefix of {len} bytes decoded"
            );
        }
    }

    #[test]
    fn test_safe_filename() {
        let native = Ole10Native {
            filename: "C:\\Users\\me\\Desktop\\data.xlsx".to_string(),
            payload: Vec::new(),
        };
        assert_eq!(native.safe_filename().as_deref(), Some("data.xlsx"));

        let unix = Ole10Native {
            filename: "../../etc/passwd".to_string(),
            payload: Vec::new(),
        };
        assert_eq!(unix.safe_filename().as_deref(), Some("passwd"));

        let empty = Ole10Native {
            filename: String::new(),
            payload: Vec::new(),
        };
        assert_eq!(empty.safe_filename(), None);

        let dots = Ole10Native {
            filename: "..".to_string(),
            payload: Vec::new(),
        };
        assert_eq!(dots.safe_filename(), None);
    }
}
