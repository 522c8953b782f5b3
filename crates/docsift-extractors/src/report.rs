//! Plain-text report building and final assembly.

/// Heavy rule framing top-level report sections.
pub const SECTION_RULE: &str = "============================================================";

/// Light rule framing subsections.
pub const SUBSECTION_RULE: &str = "----------------------------------------";

/// Line-oriented report under construction.
#[derive(Debug, Default)]
pub struct Report {
    lines: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
    }

    /// Section title between heavy rules, preceded by a blank line unless
    /// it opens the report.
    pub fn section(&mut self, title: &str) {
        if self.lines.is_empty() {
            self.line(SECTION_RULE);
        } else {
            self.line(format!("\n{SECTION_RULE}"));
        }
        self.line(title);
        self.line(SECTION_RULE);
    }

    pub fn subsection(&mut self, title: &str) {
        self.line(SUBSECTION_RULE);
        self.line(title);
        self.line(SUBSECTION_RULE);
    }

    /// Render at most `cap` items, then a single `... and N more <noun>`
    /// line when some were left out.
    pub fn capped<T>(
        &mut self,
        items: &[T],
        cap: usize,
        noun: &str,
        mut render: impl FnMut(&mut Self, usize, &T),
    ) {
        for (i, item) in items.iter().take(cap).enumerate() {
            render(self, i + 1, item);
        }
        if let Some(line) = overflow_line(items.len(), cap, noun) {
            self.line(line);
        }
    }

    pub fn finish(self) -> String {
        self.lines.join("\n")
    }
}

/// The `... and N more` line for a list of `total` items shown up to `cap`.
pub fn overflow_line(total: usize, cap: usize, noun: &str) -> Option<String> {
    (total > cap).then(|| format!("  ... and {} more {noun}", total - cap))
}

/// First `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// First `max` characters of `text`, with `...` when anything was cut.
pub fn clip(text: &str, max: usize) -> String {
    let head = truncate_chars(text, max);
    if head.len() < text.len() {
        format!("{head}...")
    } else {
        head.to_string()
    }
}

/// A recovered embedded file as it appears in the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedSection {
    /// Spreadsheet whose own report (or error line) is inlined.
    Spreadsheet { name: String, report: String },
    /// Any other payload; only its name is listed.
    Unparsed { name: String },
}

/// Join the document report with the embedded-files section.
pub fn assemble(document: &str, embedded: &[EmbeddedSection]) -> String {
    let mut text = document.to_string();
    if embedded.is_empty() {
        return text;
    }

    text.push_str("\n\n[EMBEDDED_FILES]\n");
    for section in embedded {
        match section {
            EmbeddedSection::Spreadsheet { name, report } => {
                text.push_str(&format!("\n[Embedded] {name}\n"));
                text.push_str(report);
            }
            EmbeddedSection::Unparsed { name } => {
                text.push_str(&format!("\n[Embedded] {name} (unparsed)\n"));
            }
        }
    }
    text
}
