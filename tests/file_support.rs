//! Extraction tests against real file bytes: hand-assembled PDFs and
//! form-feed separated text, loaded through the filesystem adapter.

use std::fs;

use pagewise::connector_fs::{collect_files, load_document};
use pagewise::extract::{extract_pages, MIME_PDF};
use pagewise_core::chunk::chunk_document;
use tempfile::TempDir;

/// Build a minimal PDF with one Helvetica text line per page.
fn minimal_pdf_with_pages(phrases: &[&str]) -> Vec<u8> {
    let page_count = phrases.len();
    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect();

    let mut objects: Vec<String> = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            page_count
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];
    for (i, phrase) in phrases.iter().enumerate() {
        let stream = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 3 0 R >> >> >>",
            5 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            stream.len(),
            stream
        ));
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj {} endobj\n", i + 1, body).as_bytes());
    }
    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}

#[test]
fn pdf_pages_are_extracted_in_order() {
    let bytes = minimal_pdf_with_pages(&["first page phrase", "second page phrase"]);
    let pages = extract_pages(&bytes, MIME_PDF).unwrap();

    assert_eq!(pages.len(), 2);
    assert!(pages[0].contains("first page phrase"));
    assert!(pages[1].contains("second page phrase"));
}

#[test]
fn pdf_file_becomes_one_chunk_per_page() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("manual.pdf");
    fs::write(
        &path,
        minimal_pdf_with_pages(&["install the tool", "configure the tool"]),
    )
    .unwrap();

    let doc = load_document(&path).unwrap();
    assert_eq!(doc.source_id, "manual.pdf");

    let chunks = chunk_document(&doc).unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].ordinal, 1);
    assert!(chunks[0].content.contains("install the tool"));
    assert_eq!(chunks[1].ordinal, 2);
    assert!(chunks[1].content.contains("configure the tool"));
}

#[test]
fn text_form_feeds_split_pages_and_blank_pages_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("notes.txt");
    fs::write(&path, "alpha  line\n\x0C   \x0Cgamma\tline").unwrap();

    let doc = load_document(&path).unwrap();
    assert_eq!(doc.segments.len(), 3);

    let chunks = chunk_document(&doc).unwrap();
    let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["alpha line", "gamma line"]);
    assert_eq!(chunks[1].ordinal, 2);
}

#[test]
fn corrupt_pdf_fails_to_load() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("broken.pdf");
    fs::write(&path, b"not a pdf").unwrap();

    let err = load_document(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("broken.pdf"));
}

#[test]
fn collect_skips_unsupported_extensions() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("a.md"), "# A").unwrap();
    fs::write(tmp.path().join("b.csv"), "x,y").unwrap();
    fs::create_dir_all(tmp.path().join("nested")).unwrap();
    fs::write(tmp.path().join("nested/c.txt"), "c").unwrap();

    let extensions = vec!["md".to_string(), "txt".to_string()];
    let files = collect_files(&[tmp.path().to_path_buf()], &extensions).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["a.md", "c.txt"]);
}
