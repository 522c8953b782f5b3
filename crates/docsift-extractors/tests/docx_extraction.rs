//! Integration tests for Word extraction and embedded object recovery.

mod common;

use common::*;
use docsift_extractors::{DocxExtractor, ExtractError, Extractor};

async fn extract(package: Vec<u8>) -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "essay.docx", &package);
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();

    let content = DocxExtractor::new().extract(&path, &out).await.unwrap();
    (dir, content.text)
}

/// Plain body, no comments part, no revisions: only the body section.
#[tokio::test]
async fn test_plain_document_has_only_body_section() {
    let package = zip_bytes(&[(
        "word/document.xml",
        document_xml(&format!("{}{}", paragraph("First line."), paragraph("Second line."))),
    )]);

    let (_dir, text) = extract(package).await;

    assert!(text.contains("DOCUMENT TEXT"));
    assert!(text.contains("First line.\nSecond line."));
    assert!(!text.contains("TRACK CHANGES DETECTED"));
    assert!(!text.contains("COMMENTS IN DOCUMENT"));
    assert!(!text.contains("[EMBEDDED_FILES]"));
}

/// One insertion by Jane yields one insertion entry and no deletions.
#[tokio::test]
async fn test_single_insertion_is_reported() {
    let body = r#"<w:p><w:r><w:t>Intro </w:t></w:r><w:ins w:id="1" w:author="Jane" w:date="2024-03-01T10:00:00Z"><w:r><w:t>hello world</w:t></w:r></w:ins></w:p>"#;
    let package = zip_bytes(&[("word/document.xml", document_xml(body))]);

    let (_dir, text) = extract(package).await;
    let lines: Vec<&str> = text.lines().collect();

    let header = lines
        .iter()
        .position(|l| *l == "INSERTIONS (1 found):")
        .expect("insertions subsection");
    assert_eq!(lines[header + 2], "  [1] \"hello world\"");
    assert_eq!(lines[header + 3], "      - by Jane");
    assert!(!text.contains("DELETIONS"));

    // Inserted text belongs to the revision list, not the body.
    let body_line = lines.iter().find(|l| l.starts_with("Intro")).unwrap();
    assert_eq!(body_line.trim_end(), "Intro");
}

#[tokio::test]
async fn test_comments_are_listed_and_marked_inline() {
    let body = r#"<w:p><w:commentRangeStart w:id="0"/><w:r><w:t>Thesis statement</w:t></w:r><w:commentRangeEnd w:id="0"/></w:p>"#;
    let comments = comments_xml(
        r#"<w:comment w:id="0" w:author="Prof. Lee"><w:p><w:r><w:t>Needs a citation</w:t></w:r></w:p></w:comment>"#,
    );
    let package = zip_bytes(&[
        ("word/document.xml", document_xml(body)),
        ("word/comments.xml", comments),
    ]);

    let (_dir, text) = extract(package).await;

    assert!(text.contains(" [COMMENT: Needs a citation...] Thesis statement"));
    assert!(text.contains("COMMENTS IN DOCUMENT"));
    assert!(text.contains("  [1] Prof. Lee: \"Needs a citation\""));
}

#[tokio::test]
async fn test_malformed_comments_only_blank_their_section() {
    let package = zip_bytes(&[
        ("word/document.xml", document_xml(&paragraph("Body survives."))),
        (
            "word/comments.xml",
            format!(r#"<w:comments {W}><w:comment w:id="0"><w:p>"#).into_bytes(),
        ),
    ]);

    let (_dir, text) = extract(package).await;

    assert!(text.contains("Body survives."));
    assert!(text.contains("[comments unavailable: "));
}

/// An OLE object wrapping `data.xlsx` is recovered byte-for-byte and its
/// workbook report is inlined.
#[tokio::test]
async fn test_ole_wrapped_workbook_is_recovered_and_reported() {
    let embedded = workbook(&["Score", "Total"], r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1"><v>42</v></c></row>"#);
    let package = zip_bytes(&[
        ("word/document.xml", document_xml(&paragraph("See table."))),
        ("word/embeddings/oleObject1.bin", ole_object("C:\\Users\\amy\\data.xlsx", &embedded)),
    ]);

    let (dir, text) = extract(package).await;

    let recovered = dir.path().join("out/embedded/essay__data.xlsx");
    assert_eq!(std::fs::read(&recovered).unwrap(), embedded);

    let section = text.find("\n\n[EMBEDDED_FILES]\n").expect("embedded section");
    let tail = &text[section..];
    assert!(tail.contains("\n[Embedded] essay__data.xlsx\nFILE: essay__data.xlsx"));
    assert!(tail.contains("[Sheet] Data\n\tScore | 42"));
}

#[tokio::test]
async fn test_embedded_entries_recovered_in_archive_order() {
    let sheet = workbook(&["a"], r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row>"#);
    let package = zip_bytes(&[
        ("word/document.xml", document_xml(&paragraph("Body."))),
        ("word/embeddings/Microsoft_Excel_Worksheet.xlsx", sheet),
        ("word/embeddings/oleObject1.bin", b"not a compound file".to_vec()),
        ("word/embeddings/oleObject2.bin", ole_object("notes.txt", b"plain notes")),
        ("word/embeddings/oleObject3.bin", ole_with_stream("Contents", b"raw")),
        ("word/embeddings/image1.emf", b"emf".to_vec()),
    ]);

    let (dir, text) = extract(package).await;
    let embedded_dir = dir.path().join("out/embedded");

    let mut names: Vec<String> = std::fs::read_dir(&embedded_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec!["essay__Microsoft_Excel_Worksheet.xlsx", "essay__notes.txt"]
    );

    let xlsx_at = text.find("[Embedded] essay__Microsoft_Excel_Worksheet.xlsx\n").unwrap();
    let notes_at = text.find("[Embedded] essay__notes.txt (unparsed)\n").unwrap();
    assert!(xlsx_at < notes_at);
}

#[tokio::test]
async fn test_duplicate_embedded_names_are_disambiguated() {
    let package = zip_bytes(&[
        ("word/document.xml", document_xml(&paragraph("Body."))),
        ("word/embeddings/oleObject1.bin", ole_object("notes.txt", b"one")),
        ("word/embeddings/oleObject2.bin", ole_object("notes.txt", b"two")),
    ]);

    let (dir, _text) = extract(package).await;
    let embedded_dir = dir.path().join("out/embedded");

    assert_eq!(std::fs::read(embedded_dir.join("essay__notes.txt")).unwrap(), b"one");
    assert_eq!(
        std::fs::read(embedded_dir.join("essay__oleObject2__notes.txt")).unwrap(),
        b"two"
    );
}

#[tokio::test]
async fn test_unnamed_ole_payload_falls_back_to_entry_name() {
    let package = zip_bytes(&[
        ("word/document.xml", document_xml(&paragraph("Body."))),
        ("word/embeddings/oleObject7.bin", ole_object("", b"payload")),
        ("word/embeddings/oleObject8.bin", ole_object("", b"")),
    ]);

    let (dir, text) = extract(package).await;

    let path = dir.path().join("out/embedded/essay__oleObject7.bin.bin");
    assert_eq!(std::fs::read(path).unwrap(), b"payload");
    assert!(text.contains("[Embedded] essay__oleObject7.bin.bin (unparsed)"));
    assert!(!text.contains("oleObject8"));
}

#[tokio::test]
async fn test_embedded_workbook_failure_is_inlined() {
    let package = zip_bytes(&[
        ("word/document.xml", document_xml(&paragraph("Body."))),
        ("word/embeddings/Broken.xlsx", b"not a zip".to_vec()),
    ]);

    let (_dir, text) = extract(package).await;

    assert!(text.contains("\n[Embedded] essay__Broken.xlsx\nERROR: Container error: "));
}

#[tokio::test]
async fn test_extraction_is_idempotent() {
    let embedded = workbook(&["x"], r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row>"#);
    let body = r#"<w:p><w:r><w:t>Keep</w:t></w:r><w:del w:author="Sam"><w:r><w:delText>drop</w:delText></w:r></w:del></w:p>"#;
    let package = zip_bytes(&[
        ("word/document.xml", document_xml(body)),
        ("word/embeddings/oleObject1.bin", ole_object("data.xlsx", &embedded)),
    ]);

    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "essay.docx", &package);
    let extractor = DocxExtractor::new();

    let mut outputs = Vec::new();
    for run in ["first", "second"] {
        let out = dir.path().join(run);
        std::fs::create_dir(&out).unwrap();
        outputs.push(extractor.extract(&path, &out).await.unwrap().text);
    }

    assert_eq!(outputs[0], outputs[1]);
    assert!(outputs[0].contains("DELETIONS (1 found):"));
}

#[tokio::test]
async fn test_missing_document_part_is_a_section_failure() {
    let package = zip_bytes(&[("word/styles.xml", b"<styles/>".to_vec())]);

    let (_dir, text) = extract(package).await;

    assert!(text.contains("[document text unavailable: Part missing: word/document.xml]"));
}

#[tokio::test]
async fn test_non_zip_aborts_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "essay.docx", b"%PDF-1.4 not a docx");

    let err = DocxExtractor::new()
        .extract(&path, dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::Container(_)));
    assert!(!dir.path().join("embedded").exists());
}
