use std::io::Read;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no extractable text found")]
    NoText,
    #[error("pdf extraction failed: {0}")]
    Pdf(String),
    #[error("docx extraction failed: {0}")]
    Docx(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Text,
    Html,
    Pdf,
    Docx,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Text => "text",
            SourceFormat::Html => "html",
            SourceFormat::Pdf => "pdf",
            SourceFormat::Docx => "docx",
        }
    }
}

/// Pick a decoder from the filename extension. Anything unrecognized falls
/// back to plain text, decoded lossily.
pub fn detect_format(filename: &str) -> SourceFormat {
    let ext = filename
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    match ext.as_str() {
        "docx" => SourceFormat::Docx,
        "html" | "htm" => SourceFormat::Html,
        "pdf" => SourceFormat::Pdf,
        _ => SourceFormat::Text,
    }
}

/// Decode raw file bytes into plain text for the heuristic pipeline.
///
/// Scanned PDFs with no text layer come back blank and surface as `NoText`;
/// OCR is an external concern.
pub fn decode(bytes: &[u8], filename: &str) -> Result<String, IngestError> {
    let format = detect_format(filename);
    debug!(filename, format = format.as_str(), "decoding source document");

    let text = match format {
        SourceFormat::Docx => docx_text(bytes)?,
        SourceFormat::Html => html_text(bytes),
        SourceFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| IngestError::Pdf(e.to_string()))?,
        SourceFormat::Text => String::from_utf8_lossy(bytes).into_owned(),
    };

    if text.trim().is_empty() {
        return Err(IngestError::NoText);
    }
    Ok(text)
}

/// All stripped text nodes of the document joined with newlines.
fn html_text(bytes: &[u8]) -> String {
    let html = String::from_utf8_lossy(bytes);
    let document = scraper::Html::parse_document(&html);
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pull paragraph text out of `word/document.xml`: `w:t` runs concatenate,
/// each closed `w:p` becomes one line. Empty paragraphs keep their line so
/// blank-line block separators survive into the decoded text.
fn docx_text(bytes: &[u8]) -> Result<String, IngestError> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive =
        zip::ZipArchive::new(cursor).map_err(|e| IngestError::Docx(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| IngestError::Docx(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| IngestError::Docx(e.to_string()))?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_run_text = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_run_text = true,
            Ok(Event::Text(t)) if in_run_text => {
                let chunk = t.unescape().map_err(|e| IngestError::Docx(e.to_string()))?;
                current.push_str(&chunk);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            // Self-closing <w:p/> still takes its line.
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"p" => {
                paragraphs.push(std::mem::take(&mut current))
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(IngestError::Docx(e.to_string())),
            _ => {}
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    Ok(paragraphs.join("\n"))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn format_detection() {
        assert_eq!(detect_format("catalog.PDF"), SourceFormat::Pdf);
        assert_eq!(detect_format("page.htm"), SourceFormat::Html);
        assert_eq!(detect_format("list.docx"), SourceFormat::Docx);
        assert_eq!(detect_format("notes.txt"), SourceFormat::Text);
        assert_eq!(detect_format("no_extension"), SourceFormat::Text);
    }

    #[test]
    fn plain_text_passthrough() {
        let text = decode(b"Widget A\nPrice: $1", "a.txt").unwrap();
        assert_eq!(text, "Widget A\nPrice: $1");
    }

    #[test]
    fn invalid_utf8_decodes_lossily() {
        let text = decode(b"Widget\xff A\nrow", "a.txt").unwrap();
        assert!(text.starts_with("Widget"));
        assert!(text.ends_with("row"));
    }

    #[test]
    fn blank_input_is_no_text() {
        assert!(matches!(decode(b"  \n ", "a.txt"), Err(IngestError::NoText)));
    }

    #[test]
    fn html_text_nodes_joined() {
        let html = b"<html><body><h1>Widget A</h1><p>Price: $12.50</p><p>A sturdy widget.</p></body></html>";
        let text = decode(html, "page.html").unwrap();
        assert_eq!(text, "Widget A\nPrice: $12.50\nA sturdy widget.");
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let xml = concat!(
            r#"<?xml version="1.0"?>"#,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            "<w:body>",
            "<w:p><w:r><w:t>Widget A</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Price: </w:t></w:r><w:r><w:t>$12.50</w:t></w:r></w:p>",
            "<w:p/>",
            "<w:p><w:r><w:t>Widget B</w:t></w:r></w:p>",
            "</w:body></w:document>",
        );
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let text = decode(&bytes, "list.docx").unwrap();
        assert_eq!(text, "Widget A\nPrice: $12.50\n\nWidget B");
    }

    #[test]
    fn not_a_docx_is_typed_error() {
        assert!(matches!(
            decode(b"plain bytes", "fake.docx"),
            Err(IngestError::Docx(_))
        ));
    }
}
