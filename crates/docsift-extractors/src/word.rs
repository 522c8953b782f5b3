//! Word package parsing: body text, tracked changes and comments.
//!
//! The comment table is built before the body walk because the walk
//! splices comment previews into the text at each comment-range start.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::limits;
use crate::container::Container;
use crate::error::{ExtractError, ExtractResult};
use crate::report::{clip, truncate_chars, Report};
use crate::types::{Comment, RevisionEntry, RevisionKind};
use crate::xml::{decode_part, Element, Node, XmlReader, WORDML};

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const COMMENTS_PART: &str = "word/comments.xml";

const UNKNOWN_AUTHOR: &str = "Unknown";

/// Comments keyed by id, kept in document order.
#[derive(Debug, Default)]
pub struct CommentTable {
    comments: Vec<Comment>,
    by_id: HashMap<String, usize>,
}

impl CommentTable {
    pub fn get(&self, id: &str) -> Option<&Comment> {
        self.by_id.get(id).map(|idx| &self.comments[*idx])
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn into_vec(self) -> Vec<Comment> {
        self.comments
    }

    fn insert(&mut self, comment: Comment) {
        match self.by_id.get(&comment.id) {
            Some(idx) => self.comments[*idx] = comment,
            None => {
                self.by_id.insert(comment.id.clone(), self.comments.len());
                self.comments.push(comment);
            }
        }
    }
}

/// Parse `word/comments.xml`.
///
/// A comment is kept only when it has an id and non-empty text.
pub fn parse_comments(xml: &str) -> ExtractResult<CommentTable> {
    let mut reader = XmlReader::new(xml, COMMENTS_PART);
    let mut table = CommentTable::default();

    loop {
        match reader.next_node()? {
            Node::Open(el) if el.is(WORDML, b"comment") && !el.empty => {
                let id = el.attr(WORDML, b"id").map(str::to_string);
                let author = author_of(&el);
                let date = el.attr(WORDML, b"date").unwrap_or_default().to_string();
                let text = reader.collect_text(|child| child.is(WORDML, b"t"))?;

                match id {
                    Some(id) if !text.is_empty() => table.insert(Comment {
                        id,
                        author,
                        date,
                        text,
                    }),
                    _ => debug!("Skipping comment without id or text"),
                }
            }
            Node::Eof => break,
            _ => {}
        }
    }

    Ok(table)
}

/// Element kinds the body walk branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyElement {
    Text,
    DeletedText,
    Tab,
    Break,
    InsertionStart,
    DeletionStart,
    CommentRangeStart,
    Other,
}

impl BodyElement {
    fn classify(el: &Element) -> Self {
        if el.is(WORDML, b"t") {
            Self::Text
        } else if el.is(WORDML, b"delText") {
            Self::DeletedText
        } else if el.is(WORDML, b"tab") && el.attr(WORDML, b"val").is_none() {
            // w:tab with w:val is a tab-stop definition, not a run tab.
            Self::Tab
        } else if el.is(WORDML, b"br") || el.is(WORDML, b"cr") {
            Self::Break
        } else if el.is(WORDML, b"ins") {
            Self::InsertionStart
        } else if el.is(WORDML, b"del") {
            Self::DeletionStart
        } else if el.is(WORDML, b"commentRangeStart") {
            Self::CommentRangeStart
        } else {
            Self::Other
        }
    }
}

/// Body text and revisions from `word/document.xml`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WordBody {
    pub text: String,
    pub revisions: Vec<RevisionEntry>,
}

/// Revisions open at the current point of the walk.
///
/// Entries are reserved in `revisions` when their element opens, so the
/// list stays in document order even when one revision nests another.
#[derive(Debug, Default)]
struct OpenRevisions {
    revisions: Vec<RevisionEntry>,
    open: Vec<usize>,
}

impl OpenRevisions {
    fn open(&mut self, el: &Element, kind: RevisionKind) {
        self.open.push(self.revisions.len());
        self.revisions.push(RevisionEntry {
            author: author_of(el),
            date: el.attr(WORDML, b"date").unwrap_or_default().to_string(),
            text: String::new(),
            kind,
        });
    }

    fn close(&mut self) {
        self.open.pop();
    }

    fn is_open(&self) -> bool {
        !self.open.is_empty()
    }

    /// Append to the innermost open revision of `kind`. Returns false
    /// when no such revision is open.
    fn push_text(&mut self, kind: RevisionKind, text: &str) -> bool {
        let innermost = self
            .open
            .iter()
            .rev()
            .copied()
            .find(|idx| self.revisions[*idx].kind == kind);
        match innermost {
            Some(idx) => {
                self.revisions[idx].text.push_str(text);
                true
            }
            None => false,
        }
    }

    fn finish(self) -> Vec<RevisionEntry> {
        self.revisions
            .into_iter()
            .filter(|r| !r.text.is_empty())
            .collect()
    }
}

/// Walk the body in document order.
///
/// Inserted and deleted text goes to the revision list only; it never
/// appears in the body text. Revisions may nest, e.g. a deletion of
/// text another author inserted, and comment ranges inside a revision
/// still get their inline marker.
pub fn parse_body(xml: &str, comments: &CommentTable) -> ExtractResult<WordBody> {
    let mut reader = XmlReader::new(xml, DOCUMENT_PART);
    let mut text = String::new();
    let mut revisions = OpenRevisions::default();

    loop {
        let el = match reader.next_node()? {
            Node::Open(el) => el,
            node if node.closes(WORDML, b"p") => {
                text.push('\n');
                continue;
            }
            node if node.closes(WORDML, b"ins") || node.closes(WORDML, b"del") => {
                revisions.close();
                continue;
            }
            Node::Eof if revisions.is_open() => {
                return Err(ExtractError::xml(reader.part(), "unexpected end of document"))
            }
            Node::Eof => break,
            _ => continue,
        };

        match BodyElement::classify(&el) {
            BodyElement::Text if !el.empty => {
                let run = reader.element_text()?;
                if !revisions.is_open() {
                    text.push_str(&run);
                } else if !revisions.push_text(RevisionKind::Insertion, &run) {
                    debug!("Dropping run text inside a deletion");
                }
            }
            BodyElement::DeletedText if !el.empty => {
                let run = reader.element_text()?;
                if !revisions.push_text(RevisionKind::Deletion, &run) {
                    debug!("Dropping deleted text outside a deletion");
                }
            }
            BodyElement::Tab if !revisions.is_open() => text.push('\t'),
            BodyElement::Break if !revisions.is_open() => text.push('\n'),
            BodyElement::InsertionStart if !el.empty => revisions.open(&el, RevisionKind::Insertion),
            BodyElement::DeletionStart if !el.empty => revisions.open(&el, RevisionKind::Deletion),
            BodyElement::CommentRangeStart => {
                if let Some(comment) = el.attr(WORDML, b"id").and_then(|id| comments.get(id)) {
                    let preview = truncate_chars(&comment.text, limits::COMMENT_PREVIEW_CHARS);
                    text.push_str(&format!(" [COMMENT: {preview}...] "));
                }
                if !el.empty {
                    reader.skip_element()?;
                }
            }
            _ => {}
        }
    }

    let trimmed = text.trim_end().len();
    text.truncate(trimmed);
    Ok(WordBody {
        text,
        revisions: revisions.finish(),
    })
}

fn author_of(el: &Element) -> String {
    el.attr(WORDML, b"author")
        .unwrap_or(UNKNOWN_AUTHOR)
        .to_string()
}

/// Everything read from a Word package, with per-section failures.
#[derive(Debug, Default)]
pub struct WordDocument {
    pub body: String,
    pub revisions: Vec<RevisionEntry>,
    pub comments: Vec<Comment>,
    /// Why the body could not be read, if it could not.
    pub body_error: Option<String>,
    /// Why the comments could not be read, if they could not.
    pub comments_error: Option<String>,
}

impl WordDocument {
    pub fn insertions(&self) -> Vec<&RevisionEntry> {
        self.revisions_of(RevisionKind::Insertion)
    }

    pub fn deletions(&self) -> Vec<&RevisionEntry> {
        self.revisions_of(RevisionKind::Deletion)
    }

    fn revisions_of(&self, kind: RevisionKind) -> Vec<&RevisionEntry> {
        self.revisions.iter().filter(|r| r.kind == kind).collect()
    }
}

/// Read comments then body from an opened package.
///
/// A failing part only blanks its own section.
pub fn read_document(package: &mut impl Container) -> WordDocument {
    let mut document = WordDocument::default();

    let table = match read_comments(package) {
        Ok(table) => table,
        Err(err) => {
            warn!("Skipping comments: {err}");
            document.comments_error = Some(err.to_string());
            CommentTable::default()
        }
    };

    match read_body(package, &table) {
        Ok(body) => {
            document.body = body.text;
            document.revisions = body.revisions;
        }
        Err(err) => {
            warn!("Skipping document body: {err}");
            document.body_error = Some(err.to_string());
        }
    }

    document.comments = table.into_vec();
    debug!(
        revisions = document.revisions.len(),
        comments = document.comments.len(),
        "Read word package"
    );
    document
}

fn read_comments(package: &mut impl Container) -> ExtractResult<CommentTable> {
    match package.read_optional(COMMENTS_PART)? {
        Some(bytes) => parse_comments(&decode_part(&bytes)),
        None => Ok(CommentTable::default()),
    }
}

fn read_body(package: &mut impl Container, comments: &CommentTable) -> ExtractResult<WordBody> {
    let bytes = package
        .read_optional(DOCUMENT_PART)?
        .ok_or_else(|| ExtractError::PartMissing(DOCUMENT_PART.to_string()))?;
    parse_body(&decode_part(&bytes), comments)
}

/// Render the document, track-changes and comments sections.
pub fn render(document: &WordDocument) -> String {
    let mut report = Report::new();

    report.section("DOCUMENT TEXT");
    match &document.body_error {
        Some(err) => report.line(format!("[document text unavailable: {err}]")),
        None => report.line(document.body.as_str()),
    }

    let insertions = document.insertions();
    let deletions = document.deletions();
    if !insertions.is_empty() || !deletions.is_empty() {
        report.section("TRACK CHANGES DETECTED");
        report.line("The writer submitted with track changes enabled.");
        report.line("Use these to understand what was modified from the previous version.");
        report.line("");

        render_revisions(&mut report, "INSERTIONS", "insertions", &insertions, limits::MAX_INSERTIONS);
        render_revisions(&mut report, "DELETIONS", "deletions", &deletions, limits::MAX_DELETIONS);
    }

    if let Some(err) = &document.comments_error {
        report.section("COMMENTS IN DOCUMENT");
        report.line(format!("[comments unavailable: {err}]"));
    } else if !document.comments.is_empty() {
        report.section("COMMENTS IN DOCUMENT");
        report.line("The writer's document contains comments.");
        report.line("These may be instructor feedback or writer notes.");
        report.line("");
        report.capped(
            &document.comments,
            limits::MAX_COMMENTS,
            "comments",
            |r, i, comment| {
                r.line(format!(
                    "  [{i}] {}: \"{}\"",
                    comment.author,
                    clip(&comment.text, limits::COMMENT_TEXT_CHARS)
                ));
            },
        );
    }

    report.finish()
}

fn render_revisions(
    report: &mut Report,
    title: &str,
    noun: &str,
    entries: &[&RevisionEntry],
    cap: usize,
) {
    if entries.is_empty() {
        return;
    }

    report.subsection(&format!("{title} ({} found):", entries.len()));
    report.capped(entries, cap, noun, |r, i, entry| {
        r.line(format!(
            "  [{i}] \"{}\"",
            clip(&entry.text, limits::REVISION_TEXT_CHARS)
        ));
        if entry.author != UNKNOWN_AUTHOR {
            r.line(format!("      - by {}", entry.author));
        }
    });
}
