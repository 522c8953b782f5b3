//! Namespace-aware pull reader shared by the package parsers.
//!
//! Wraps `quick_xml::NsReader` and hands out owned nodes so callers can
//! match on resolved namespace + local name without juggling borrows.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

use crate::error::{ExtractError, ExtractResult};

/// WordprocessingML, transitional and strict.
pub(crate) const WORDML: &[&[u8]] = &[
    b"http://schemas.openxmlformats.org/wordprocessingml/2006/main",
    b"http://purl.oclc.org/ooxml/wordprocessingml/main",
];

/// SpreadsheetML, transitional and strict.
pub(crate) const SPREADSHEETML: &[&[u8]] = &[
    b"http://schemas.openxmlformats.org/spreadsheetml/2006/main",
    b"http://purl.oclc.org/ooxml/spreadsheetml/main",
];

/// Office document relationships (`r:id` attributes).
pub(crate) const OFFICE_RELS: &[&[u8]] = &[
    b"http://schemas.openxmlformats.org/officeDocument/2006/relationships",
    b"http://purl.oclc.org/ooxml/officeDocument/relationships",
];

/// Package relationships (`.rels` parts).
pub(crate) const PACKAGE_RELS: &[&[u8]] =
    &[b"http://schemas.openxmlformats.org/package/2006/relationships"];

/// Decode a part's bytes, substituting U+FFFD for anything that is not UTF-8.
pub(crate) fn decode_part(bytes: &[u8]) -> Cow<'_, str> {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim_start_matches('\u{feff}')),
        Cow::Owned(s) => Cow::Owned(s.trim_start_matches('\u{feff}').to_string()),
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Attribute {
    namespace: Option<Vec<u8>>,
    local: Vec<u8>,
    value: String,
}

/// An opened element with its attributes resolved.
#[derive(Debug, Clone)]
pub(crate) struct Element {
    namespace: Option<Vec<u8>>,
    local: Vec<u8>,
    attrs: Vec<Attribute>,
    /// Self-closing; no matching `Close` follows.
    pub empty: bool,
}

fn in_namespaces(namespace: &Option<Vec<u8>>, namespaces: &[&[u8]]) -> bool {
    namespace
        .as_deref()
        .is_some_and(|ns| namespaces.iter().any(|candidate| *candidate == ns))
}

impl Element {
    pub fn is(&self, namespaces: &[&[u8]], local: &[u8]) -> bool {
        self.local == local && in_namespaces(&self.namespace, namespaces)
    }

    /// Attribute in one of the given namespaces.
    pub fn attr(&self, namespaces: &[&[u8]], local: &[u8]) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.local == local && in_namespaces(&a.namespace, namespaces))
            .map(|a| a.value.as_str())
    }

    /// Unprefixed attribute.
    pub fn plain_attr(&self, local: &[u8]) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.local == local && a.namespace.is_none())
            .map(|a| a.value.as_str())
    }
}

#[derive(Debug)]
pub(crate) enum Node {
    Open(Element),
    Close {
        namespace: Option<Vec<u8>>,
        local: Vec<u8>,
    },
    Text(String),
    Eof,
}

impl Node {
    pub fn closes(&self, namespaces: &[&[u8]], name: &[u8]) -> bool {
        matches!(self, Node::Close { namespace, local } if local == name && in_namespaces(namespace, namespaces))
    }
}

pub(crate) struct XmlReader<'a> {
    reader: NsReader<&'a [u8]>,
    part: String,
}

impl<'a> XmlReader<'a> {
    pub fn new(xml: &'a str, part: &str) -> Self {
        Self {
            reader: NsReader::from_str(xml),
            part: part.to_string(),
        }
    }

    pub fn part(&self) -> &str {
        &self.part
    }

    pub fn next_node(&mut self) -> ExtractResult<Node> {
        loop {
            let part = &self.part;
            let (resolved, event) = self
                .reader
                .read_resolved_event()
                .map_err(|e| ExtractError::xml(part, e))?;
            let namespace = bound(resolved);

            match event {
                Event::Start(e) => return self.open(&e, namespace, false).map(Node::Open),
                Event::Empty(e) => return self.open(&e, namespace, true).map(Node::Open),
                Event::End(e) => {
                    return Ok(Node::Close {
                        namespace,
                        local: e.local_name().as_ref().to_vec(),
                    })
                }
                Event::Text(e) => {
                    let text = e
                        .unescape()
                        .map_err(|err| ExtractError::xml(&self.part, err))?;
                    return Ok(Node::Text(text.into_owned()));
                }
                Event::CData(e) => {
                    return Ok(Node::Text(String::from_utf8_lossy(&e.into_inner()).into_owned()))
                }
                Event::Eof => return Ok(Node::Eof),
                _ => {}
            }
        }
    }

    fn open(
        &self,
        e: &BytesStart<'_>,
        namespace: Option<Vec<u8>>,
        empty: bool,
    ) -> ExtractResult<Element> {
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| ExtractError::xml(&self.part, err))?;
            let (resolved, local) = self.reader.resolve_attribute(attr.key);
            let namespace = bound(resolved);
            let local = local.as_ref().to_vec();
            let value = attr
                .unescape_value()
                .map_err(|err| ExtractError::xml(&self.part, err))?
                .into_owned();
            attrs.push(Attribute {
                namespace,
                local,
                value,
            });
        }

        Ok(Element {
            namespace,
            local: e.local_name().as_ref().to_vec(),
            attrs,
            empty,
        })
    }

    /// Concatenate the text of every `wanted` descendant of the element
    /// that was just opened, consuming input up to and including its close.
    pub fn collect_text(&mut self, wanted: impl Fn(&Element) -> bool) -> ExtractResult<String> {
        self.accumulate(None, wanted)
    }

    /// All text inside the element that was just opened.
    pub fn element_text(&mut self) -> ExtractResult<String> {
        self.accumulate(Some(1), |_| false)
    }

    /// Skip past the close of the element that was just opened.
    pub fn skip_element(&mut self) -> ExtractResult<()> {
        self.accumulate(None, |_| false).map(|_| ())
    }

    fn accumulate(
        &mut self,
        mut capture_at: Option<usize>,
        wanted: impl Fn(&Element) -> bool,
    ) -> ExtractResult<String> {
        let mut out = String::new();
        let mut depth = 1usize;

        loop {
            match self.next_node()? {
                Node::Open(el) if !el.empty => {
                    depth += 1;
                    if capture_at.is_none() && wanted(&el) {
                        capture_at = Some(depth);
                    }
                }
                Node::Open(_) => {}
                Node::Text(text) => {
                    if capture_at.is_some() {
                        out.push_str(&text);
                    }
                }
                Node::Close { .. } => {
                    if capture_at == Some(depth) {
                        capture_at = None;
                    }
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                }
                Node::Eof => {
                    return Err(ExtractError::xml(&self.part, "unexpected end of document"))
                }
            }
        }
    }
}

fn bound(resolved: ResolveResult<'_>) -> Option<Vec<u8>> {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => Some(ns.to_vec()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:a="urn:other">
  <w:ins w:id="1" w:author="Jane &amp; Co"><w:r><w:t>hello</w:t><a:t>skip</a:t><w:t xml:space="preserve"> world</w:t></w:r></w:ins>
  <w:p/>
</w:document>"#;

    fn open_first(reader: &mut XmlReader<'_>, local: &[u8]) -> Element {
        loop {
            match reader.next_node().unwrap() {
                Node::Open(el) if el.is(WORDML, local) => return el,
                Node::Eof => panic!("element not found"),
                _ => {}
            }
        }
    }

    #[test]
    fn test_attributes_resolve_namespace() {
        let mut reader = XmlReader::new(DOC, "word/document.xml");
        let ins = open_first(&mut reader, b"ins");

        assert_eq!(ins.attr(WORDML, b"author"), Some("Jane & Co"));
        assert_eq!(ins.attr(WORDML, b"id"), Some("1"));
        assert_eq!(ins.plain_attr(b"author"), None);
        assert!(!ins.empty);
    }

    #[test]
    fn test_collect_text_matches_namespace() {
        let mut reader = XmlReader::new(DOC, "word/document.xml");
        open_first(&mut reader, b"ins");

        let text = reader.collect_text(|el| el.is(WORDML, b"t")).unwrap();
        assert_eq!(text, "hello world");

        let p = open_first(&mut reader, b"p");
        assert!(p.empty);
    }

    #[test]
    fn test_collect_text_unterminated() {
        let xml = r#"<w:ins xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:t>x</w:t>"#;
        let mut reader = XmlReader::new(xml, "word/document.xml");
        open_first(&mut reader, b"ins");
        assert!(reader.collect_text(|el| el.is(WORDML, b"t")).is_err());
    }

    #[test]
    fn test_decode_part_replaces_invalid_bytes() {
        let decoded = decode_part(b"\xef\xbb\xbf<a>\xff</a>");
        assert_eq!(decoded, "<a>\u{fffd}</a>");
    }
}
