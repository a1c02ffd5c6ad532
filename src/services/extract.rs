//! Best-effort text extraction from uploaded files.
//!
//! Extraction never fails an analysis: a file that cannot be read contributes
//! no text and a human-readable note instead.

use std::io::{Cursor, Read};
use std::sync::Arc;

use async_trait::async_trait;
use quick_xml::events::Event;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::upload::{FileKind, UploadedFile};
use crate::services::generation::{GenerationError, Generator};
use crate::services::ocr::TesseractOcr;
use crate::services::workers_ai::WorkersAiClient;

/// Maximum decompressed bytes read from a single ZIP entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Text pulled out of one file, plus a note when extraction was degraded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub text: String,
    pub note: Option<String>,
}

impl Extraction {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            note: None,
        }
    }

    pub fn degraded(note: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            note: Some(note.into()),
        }
    }
}

/// Which optional extraction paths can currently work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub docx: bool,
    pub pptx: bool,
    pub ocr: bool,
    pub transcription: bool,
}

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, file: &UploadedFile) -> Extraction;

    fn capabilities(&self) -> Capabilities;
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Invalid OOXML archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),

    #[error("Unrecognized image data: {0}")]
    UnrecognizedImage(#[from] image::ImageError),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("Transcription failed: {0}")]
    Transcription(#[from] GenerationError),

    #[error("Capability unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Production extractor: OOXML parsing, Tesseract OCR and Workers AI transcription.
pub struct DefaultExtractor {
    ocr: TesseractOcr,
    transcriber: Arc<WorkersAiClient>,
}

impl DefaultExtractor {
    pub fn new(ocr: TesseractOcr, transcriber: Arc<WorkersAiClient>) -> Self {
        Self { ocr, transcriber }
    }
}

#[async_trait]
impl ContentExtractor for DefaultExtractor {
    async fn extract(&self, file: &UploadedFile) -> Extraction {
        let kind = file.kind();
        debug!(filename = %file.filename, ?kind, bytes = file.bytes.len(), "Extracting file");

        let outcome = match kind {
            FileKind::Document => extract_docx(&file.bytes),
            FileKind::Slideshow => extract_pptx(&file.bytes),
            FileKind::Image => self.ocr.recognize(&file.bytes).await,
            FileKind::Audio => self
                .transcriber
                .transcribe(&file.bytes)
                .await
                .map_err(ExtractError::from),
            FileKind::Other => {
                return Extraction::degraded(format!(
                    "تم تجاهل الملف {}: نوع غير مدعوم لاستخراج النص.",
                    file.filename
                ))
            }
        };

        match outcome {
            Ok(text) => Extraction::text(text),
            Err(e) => {
                warn!(filename = %file.filename, error = %e, "Extraction degraded");
                Extraction::degraded(format!("تعذر استخراج النص من الملف {}: {e}", file.filename))
            }
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            docx: true,
            pptx: true,
            ocr: self.ocr.is_available(),
            transcription: self.transcriber.is_configured(),
        }
    }
}

type Archive<'a> = zip::ZipArchive<Cursor<&'a [u8]>>;

fn read_zip_entry_bounded(archive: &mut Archive<'_>, name: &str) -> Result<Vec<u8>, ExtractError> {
    let entry = archive.by_name(name)?;
    let mut out = Vec::new();
    entry.take(MAX_XML_ENTRY_BYTES).read_to_end(&mut out)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Ooxml(format!("{name} exceeds size limit")));
    }
    Ok(out)
}

/// Text of a Word document, one line per paragraph.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml")?;
    collect_text_runs(&xml)
}

/// Text of a slide deck in slide order, one line per paragraph.
pub fn extract_pptx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(str::to_string)
        .collect();
    slide_names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    let mut slides = Vec::with_capacity(slide_names.len());
    for name in slide_names {
        let xml = read_zip_entry_bounded(&mut archive, &name)?;
        let text = collect_text_runs(&xml)?;
        if !text.is_empty() {
            slides.push(text);
        }
    }
    Ok(slides.join("\n"))
}

/// Concatenate `<*:t>` runs, breaking lines at the end of each `<*:p>` paragraph.
fn collect_text_runs(xml: &[u8]) -> Result<String, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_run = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_run = true,
            Event::Text(te) if in_run => {
                let text = te.unescape().map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                out.push_str(&text);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_run = false,
                b"p" if !out.is_empty() && !out.ends_with('\n') => out.push('\n'),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn extractor() -> DefaultExtractor {
        let client = WorkersAiClient::new(&crate::config::AppConfig::default()).unwrap();
        DefaultExtractor::new(TesseractOcr::new("eng"), Arc::new(client))
    }

    #[test]
    fn test_docx_paragraphs_and_runs() {
        let xml = r#"<w:document xmlns:w="w"><w:body>
            <w:p><w:r><w:t>This is a test </w:t></w:r><w:r><w:t>document.</w:t></w:r></w:p>
            <w:p><w:r><w:t>مرحبا بالعالم</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let bytes = zip_archive(&[("word/document.xml", xml)]);
        let text = extract_docx(&bytes).unwrap();
        assert_eq!(text, "This is a test document.\nمرحبا بالعالم");
    }

    #[test]
    fn test_pptx_slides_in_numeric_order() {
        let slide = |t: &str| format!(r#"<p:sld xmlns:a="a" xmlns:p="p"><a:p><a:r><a:t>{t}</a:t></a:r></a:p></p:sld>"#);
        let s1 = slide("Slide one");
        let s2 = slide("Slide two");
        let s10 = slide("Slide ten");
        let bytes = zip_archive(&[
            ("ppt/slides/slide10.xml", s10.as_str()),
            ("ppt/slides/slide2.xml", s2.as_str()),
            ("ppt/slides/slide1.xml", s1.as_str()),
        ]);
        let text = extract_pptx(&bytes).unwrap();
        assert_eq!(text, "Slide one\nSlide two\nSlide ten");
    }

    #[test]
    fn test_invalid_zip_is_an_error() {
        let err = extract_docx(b"This is a fake docx binary content").unwrap_err();
        assert!(matches!(err, ExtractError::Zip(_)));
    }

    #[test]
    fn test_docx_without_document_part() {
        let bytes = zip_archive(&[("word/other.xml", "<x/>")]);
        assert!(extract_docx(&bytes).is_err());
    }

    #[tokio::test]
    async fn test_unsupported_file_is_skipped_with_note() {
        let file = UploadedFile::new("large.bin", vec![0u8; 64]);
        let extraction = extractor().extract(&file).await;
        assert!(extraction.text.is_empty());
        assert!(extraction.note.unwrap().contains("large.bin"));
    }

    #[tokio::test]
    async fn test_broken_image_degrades_to_note() {
        let file = UploadedFile::new("test.png", b"fakeimagebytes".to_vec());
        let extraction = extractor().extract(&file).await;
        assert!(extraction.text.is_empty());
        assert!(extraction.note.is_some());
    }

    #[tokio::test]
    async fn test_audio_without_credentials_degrades_to_note() {
        let file = UploadedFile::new("sample.mp3", b"fakeaudiobytes".to_vec());
        let extraction = extractor().extract(&file).await;
        assert!(extraction.text.is_empty());
        assert!(extraction.note.unwrap().contains("sample.mp3"));
    }

    #[test]
    fn test_capabilities_report_transcription_unconfigured() {
        let caps = extractor().capabilities();
        assert!(caps.docx && caps.pptx);
        assert!(!caps.transcription);
    }
}
