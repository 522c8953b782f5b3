//! Spreadsheet package parsing: shared strings, sheet rows, formulas and
//! chart inventory.
//!
//! Any failure reading the workbook fails the whole workbook; there is no
//! partial spreadsheet report.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::limits;
use crate::container::Container;
use crate::error::{ExtractError, ExtractResult};
use crate::report::{overflow_line, Report};
use crate::types::SpreadsheetModel;
use crate::xml::{decode_part, Node, XmlReader, OFFICE_RELS, PACKAGE_RELS, SPREADSHEETML};

pub const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
pub const WORKBOOK_PART: &str = "xl/workbook.xml";
pub const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

const WORKSHEET_PREFIX: &str = "xl/worksheets/sheet";
const CHART_PREFIX: &str = "xl/charts/chart";

/// Text of a rich-text container (`<si>` or `<is>`), skipping phonetic runs.
fn rich_text(reader: &mut XmlReader<'_>) -> ExtractResult<String> {
    let mut out = String::new();
    let mut depth = 1usize;

    loop {
        match reader.next_node()? {
            Node::Open(el) if el.empty => {}
            Node::Open(el) if el.is(SPREADSHEETML, b"rPh") => reader.skip_element()?,
            Node::Open(el) if el.is(SPREADSHEETML, b"t") => out.push_str(&reader.element_text()?),
            Node::Open(_) => depth += 1,
            Node::Close { .. } => {
                depth -= 1;
                if depth == 0 {
                    return Ok(out);
                }
            }
            Node::Text(_) => {}
            Node::Eof => {
                return Err(ExtractError::xml(reader.part(), "unexpected end of document"))
            }
        }
    }
}

/// Parse `xl/sharedStrings.xml`; one entry per `<si>`, index = position.
pub fn parse_shared_strings(xml: &str) -> ExtractResult<Vec<String>> {
    let mut reader = XmlReader::new(xml, SHARED_STRINGS_PART);
    let mut strings = Vec::new();

    loop {
        match reader.next_node()? {
            Node::Open(el) if el.is(SPREADSHEETML, b"si") => {
                if el.empty {
                    strings.push(String::new());
                } else {
                    strings.push(rich_text(&mut reader)?);
                }
            }
            Node::Eof => break,
            _ => {}
        }
    }

    Ok(strings)
}

/// A sheet declared in `xl/workbook.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredSheet {
    pub name: String,
    /// Relationship id pointing at the sheet part.
    pub rel_id: Option<String>,
}

/// Parse declared sheets in document order.
pub fn parse_workbook(xml: &str) -> ExtractResult<Vec<DeclaredSheet>> {
    let mut reader = XmlReader::new(xml, WORKBOOK_PART);
    let mut sheets = Vec::new();

    loop {
        match reader.next_node()? {
            Node::Open(el) if el.is(SPREADSHEETML, b"sheet") => {
                if let Some(name) = el.plain_attr(b"name").filter(|n| !n.is_empty()) {
                    sheets.push(DeclaredSheet {
                        name: name.to_string(),
                        rel_id: el.attr(OFFICE_RELS, b"id").map(str::to_string),
                    });
                }
            }
            Node::Eof => break,
            _ => {}
        }
    }

    Ok(sheets)
}

/// Parse a `.rels` part into id → package path, resolving targets
/// against `base_dir` (e.g. `xl`).
pub fn parse_relationships(xml: &str, base_dir: &str) -> ExtractResult<HashMap<String, String>> {
    let mut reader = XmlReader::new(xml, WORKBOOK_RELS_PART);
    let mut rels = HashMap::new();

    loop {
        match reader.next_node()? {
            Node::Open(el) if el.is(PACKAGE_RELS, b"Relationship") => {
                if let (Some(id), Some(target)) = (el.plain_attr(b"Id"), el.plain_attr(b"Target")) {
                    rels.insert(id.to_string(), resolve_target(base_dir, target));
                }
            }
            Node::Eof => break,
            _ => {}
        }
    }

    Ok(rels)
}

fn resolve_target(base_dir: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("{base_dir}/{target}"),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Rows and formulas read from one worksheet.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WorksheetData {
    /// Non-empty rows, at most `MAX_SHEET_ROWS`.
    pub rows: Vec<Vec<String>>,
    /// Non-empty rows in the sheet.
    pub row_total: usize,
    pub formulas: Vec<String>,
}

/// Walk a worksheet's rows, resolving each cell by its type.
pub fn parse_worksheet(
    xml: &str,
    part: &str,
    shared: &SpreadsheetModel,
) -> ExtractResult<WorksheetData> {
    let mut reader = XmlReader::new(xml, part);
    let mut data = WorksheetData::default();
    let mut row: Option<Vec<String>> = None;

    loop {
        match reader.next_node()? {
            Node::Open(el) if el.is(SPREADSHEETML, b"row") => {
                if !el.empty {
                    row = Some(Vec::new());
                }
            }
            Node::Open(el) if el.is(SPREADSHEETML, b"c") && !el.empty => {
                let cell_type = el.plain_attr(b"t").unwrap_or_default().to_string();
                let cell = parse_cell(&mut reader, &cell_type, shared)?;
                if let Some(formula) = cell.formula {
                    data.formulas.push(formula);
                }
                if let (Some(values), Some(value)) = (row.as_mut(), cell.value) {
                    values.push(value);
                }
            }
            node if node.closes(SPREADSHEETML, b"row") => {
                if let Some(values) = row.take().filter(|v| !v.is_empty()) {
                    data.row_total += 1;
                    if data.rows.len() < limits::MAX_SHEET_ROWS {
                        data.rows.push(values);
                    }
                }
            }
            Node::Eof => break,
            _ => {}
        }
    }

    Ok(data)
}

struct Cell {
    value: Option<String>,
    formula: Option<String>,
}

fn parse_cell(
    reader: &mut XmlReader<'_>,
    cell_type: &str,
    shared: &SpreadsheetModel,
) -> ExtractResult<Cell> {
    let mut raw: Option<String> = None;
    let mut inline: Option<String> = None;
    let mut formula: Option<String> = None;

    loop {
        match reader.next_node()? {
            Node::Open(el) if el.empty => {}
            Node::Open(el) if el.is(SPREADSHEETML, b"v") => raw = Some(reader.element_text()?),
            Node::Open(el) if el.is(SPREADSHEETML, b"is") => inline = Some(rich_text(reader)?),
            Node::Open(el) if el.is(SPREADSHEETML, b"f") => {
                formula = Some(reader.element_text()?).filter(|f| !f.is_empty())
            }
            Node::Open(_) => reader.skip_element()?,
            Node::Close { .. } => break,
            Node::Text(_) => {}
            Node::Eof => {
                return Err(ExtractError::xml(reader.part(), "unexpected end of document"))
            }
        }
    }

    let value = match cell_type {
        "s" => raw.map(|idx| shared.shared_string(&idx).to_string()),
        "inlineStr" => inline.filter(|text| !text.is_empty()),
        _ => raw.filter(|text| !text.is_empty()),
    };

    Ok(Cell { value, formula })
}

/// Worksheet parts in natural order (`sheet2` before `sheet10`).
fn worksheet_parts(package: &impl Container) -> Vec<String> {
    let mut parts: Vec<String> = package
        .entry_names()
        .into_iter()
        .filter(|name| name.starts_with(WORKSHEET_PREFIX) && name.ends_with(".xml"))
        .collect();
    parts.sort_by_key(|name| {
        let number = name[WORKSHEET_PREFIX.len()..name.len() - ".xml".len()]
            .parse::<u32>()
            .unwrap_or(u32::MAX);
        (number, name.clone())
    });
    parts
}

fn part_stem(part: &str) -> String {
    let file = part.rsplit('/').next().unwrap_or(part);
    file.strip_suffix(".xml").unwrap_or(file).to_string()
}

/// Pair each sheet name with the worksheet part holding its cells.
///
/// Uses the workbook relationships when present; otherwise declared
/// names are matched to worksheet parts by position.
fn bind_sheets(
    package: &impl Container,
    declared: &[DeclaredSheet],
    rels: &HashMap<String, String>,
) -> Vec<(String, Option<String>)> {
    if !rels.is_empty() {
        return declared
            .iter()
            .map(|sheet| {
                let part = sheet
                    .rel_id
                    .as_ref()
                    .and_then(|id| rels.get(id))
                    .filter(|part| package.has_entry(part))
                    .cloned();
                (sheet.name.clone(), part)
            })
            .collect();
    }

    let parts = worksheet_parts(package);
    let mut bound: Vec<(String, Option<String>)> = declared
        .iter()
        .enumerate()
        .map(|(i, sheet)| (sheet.name.clone(), parts.get(i).cloned()))
        .collect();
    for part in parts.iter().skip(declared.len()) {
        bound.push((part_stem(part), Some(part.clone())));
    }
    bound
}

/// Read a whole workbook from an opened package.
pub fn read_workbook(package: &mut impl Container) -> ExtractResult<SpreadsheetModel> {
    let mut model = SpreadsheetModel::default();

    if let Some(bytes) = package.read_optional(SHARED_STRINGS_PART)? {
        model.shared_strings = parse_shared_strings(&decode_part(&bytes))?;
    }

    let declared = match package.read_optional(WORKBOOK_PART)? {
        Some(bytes) => parse_workbook(&decode_part(&bytes))?,
        None => Vec::new(),
    };
    let rels = match package.read_optional(WORKBOOK_RELS_PART)? {
        Some(bytes) => parse_relationships(&decode_part(&bytes), "xl")?,
        None => HashMap::new(),
    };

    for (name, part) in bind_sheets(&*package, &declared, &rels) {
        let mut rows = Vec::new();
        let mut row_total = 0;

        if let Some(part) = part {
            let bytes = package.read_entry(&part)?;
            let data = parse_worksheet(&decode_part(&bytes), &part, &model)?;
            debug!(sheet = %name, part = %part, rows = data.row_total, "Read worksheet");

            rows = data.rows;
            row_total = data.row_total;
            model.formula_total += data.formulas.len();
            let room = limits::MAX_FORMULAS.saturating_sub(model.formulas.len());
            model.formulas.extend(data.formulas.into_iter().take(room));
        }

        if !model.sheet_rows.contains_key(&name) {
            model.sheet_names.push(name.clone());
        }
        model.sheet_rows.insert(name.clone(), rows);
        model.sheet_row_totals.insert(name, row_total);
    }

    model.chart_parts = package
        .entry_names()
        .into_iter()
        .filter(|name| name.starts_with(CHART_PREFIX))
        .collect();

    Ok(model)
}

/// Distinct shared strings in first-seen order, and how many there are.
pub fn unique_strings(model: &SpreadsheetModel) -> (Vec<&str>, usize) {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    let mut total = 0;

    for s in &model.shared_strings {
        if seen.insert(s.as_str()) {
            total += 1;
            if unique.len() < limits::MAX_UNIQUE_STRINGS {
                unique.push(s.as_str());
            }
        }
    }
    (unique, total)
}

/// Render the workbook report.
pub fn render(file_name: &str, model: &SpreadsheetModel) -> String {
    let mut report = Report::new();

    report.line(format!("FILE: {file_name}"));

    report.line("CHART_FILES:");
    report.lines(model.chart_parts.iter().map(String::as_str));

    report.line("FORMULAS:");
    report.lines(model.formulas.iter().map(String::as_str));
    if let Some(line) = overflow_line(model.formula_total, limits::MAX_FORMULAS, "formulas") {
        report.line(line);
    }

    report.line("SHEETS_PREVIEW:");
    for sheet in &model.sheet_names {
        report.line(format!("[Sheet] {sheet}"));
        let rows = model.sheet_rows.get(sheet).map(Vec::as_slice).unwrap_or_default();
        for row in rows {
            report.line(format!("\t{}", row.join(" | ")));
        }
        let total = model.sheet_row_totals.get(sheet).copied().unwrap_or(rows.len());
        if let Some(line) = overflow_line(total, limits::MAX_SHEET_ROWS, "rows") {
            report.line(line);
        }
    }

    let (unique, total) = unique_strings(model);
    report.line("UNIQUE_STRINGS:");
    report.lines(unique);
    if let Some(line) = overflow_line(total, limits::MAX_UNIQUE_STRINGS, "unique strings") {
        report.line(line);
    }

    report.finish()
}
