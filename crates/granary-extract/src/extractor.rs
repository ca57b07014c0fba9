//! Heterogeneous document text extraction
//!
//! PDF goes through `pdf-extract` first with a raw `lopdf` pass as fallback;
//! DOCX is unzipped and its XML runs collected; HTML is rendered to text;
//! plain text is read directly. Parsing runs on blocking threads so large
//! documents never stall the async runtime.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{ExtractError, ExtractResult};

const HTML_RENDER_WIDTH: usize = 100;

/// Document formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Html,
    Text,
}

impl DocumentFormat {
    /// Classify by MIME type first, file extension as fallback
    pub fn detect(mime_type: &str, path: &Path) -> Option<Self> {
        match mime_type {
            "application/pdf" => return Some(Self::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                return Some(Self::Docx);
            }
            "text/html" => return Some(Self::Html),
            "text/plain" | "text/markdown" | "text/csv" => return Some(Self::Text),
            _ => {}
        }

        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        match ext.as_deref() {
            Some("pdf") => Some(Self::Pdf),
            Some("docx") => Some(Self::Docx),
            Some("html" | "htm") => Some(Self::Html),
            Some("txt" | "md" | "csv" | "log") => Some(Self::Text),
            _ => None,
        }
    }
}

/// Extract natural-language text from a downloaded document
///
/// # Errors
///
/// Returns `UnsupportedFormat` for unknown formats, `Extraction` when both
/// the primary and fallback extractors fail, and `EmptyDocument` when the
/// file yields no usable text. Callers must not index a document on these
/// errors; a filename-only placeholder is never an acceptable substitute.
pub async fn extract_text(path: &Path, mime_type: &str) -> ExtractResult<String> {
    let format = DocumentFormat::detect(mime_type, path)
        .ok_or_else(|| ExtractError::UnsupportedFormat(mime_type.to_string()))?;

    let filename = file_name(path);
    let owned: PathBuf = path.to_path_buf();

    let text = tokio::task::spawn_blocking(move || extract_blocking(&owned, format))
        .await
        .map_err(|e| ExtractError::Extraction {
            filename: filename.clone(),
            message: format!("extraction task failed: {e}"),
        })??;

    if text.trim().is_empty() {
        return Err(ExtractError::EmptyDocument(filename));
    }
    Ok(text)
}

fn extract_blocking(path: &Path, format: DocumentFormat) -> ExtractResult<String> {
    match format {
        DocumentFormat::Pdf => extract_pdf(path),
        DocumentFormat::Docx => extract_docx(path),
        DocumentFormat::Html => extract_html(path),
        DocumentFormat::Text => extract_plain(path),
    }
}

/// PDF extraction with a raw-text fallback
fn extract_pdf(path: &Path) -> ExtractResult<String> {
    match pdf_extract::extract_text(path) {
        Ok(text) if !text.trim().is_empty() => return Ok(text),
        Ok(_) => {
            tracing::warn!(path = %path.display(), "Primary PDF extractor returned empty text, trying fallback");
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Primary PDF extractor failed, trying fallback");
        }
    }

    extract_pdf_fallback(path)
}

/// Secondary PDF pass: page-by-page raw text via lopdf
fn extract_pdf_fallback(path: &Path) -> ExtractResult<String> {
    let filename = file_name(path);
    let document = lopdf::Document::load(path).map_err(|e| ExtractError::Extraction {
        filename: filename.clone(),
        message: format!("fallback load failed: {e}"),
    })?;

    let mut pages_text = Vec::new();
    for page_number in document.page_iter().enumerate().map(|(i, _)| i as u32 + 1) {
        match document.extract_text(&[page_number]) {
            Ok(text) => pages_text.push(text),
            Err(e) => {
                tracing::debug!(page = page_number, error = %e, "Fallback skipped unreadable page");
            }
        }
    }

    if pages_text.is_empty() {
        return Err(ExtractError::Extraction {
            filename,
            message: "both PDF extractors failed".to_string(),
        });
    }
    Ok(pages_text.join("\n\n"))
}

/// DOCX: collect `<w:t>` runs from word/document.xml, paragraphs as breaks
fn extract_docx(path: &Path) -> ExtractResult<String> {
    let filename = file_name(path);
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ExtractError::Extraction {
        filename: filename.clone(),
        message: format!("not a valid archive: {e}"),
    })?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Extraction {
            filename: filename.clone(),
            message: format!("missing document body: {e}"),
        })?
        .read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_run => {
                text.push_str(&e.unescape().unwrap_or_default());
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExtractError::Extraction {
                    filename,
                    message: format!("document body parse failed: {e}"),
                });
            }
        }
    }

    Ok(text)
}

/// HTML rendered to plain text, preserving heading/paragraph structure
fn extract_html(path: &Path) -> ExtractResult<String> {
    let bytes = std::fs::read(path)?;
    html2text::from_read(bytes.as_slice(), HTML_RENDER_WIDTH).map_err(|e| {
        ExtractError::Extraction {
            filename: file_name(path),
            message: format!("html render failed: {e}"),
        }
    })
}

/// Plain text with lossy decoding for stray non-UTF-8 bytes
fn extract_plain(path: &Path) -> ExtractResult<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
