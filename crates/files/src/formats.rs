//! Document formats and their text extractors.
//!
//! Each supported format implements [`TextExtractor`]; [`DocumentFormat::extractor`] is the only
//! place that branches on format.

use crate::constants::{
    MAX_DOCX_XML_BYTES, MIME_DOCX, MIME_LEGACY_DOC, MIME_OCTET_STREAM, MIME_PDF, MIME_TEXT,
};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::Path;

/// Errors raised by a single extractor. Callers wrap these with the file name.
#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    #[error("PDF could not be parsed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("DOCX archive could not be read: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("DOCX body could not be parsed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{entry} inflates past {limit} bytes")]
    EntryTooLarge { entry: &'static str, limit: u64 },
}

/// Capability of producing plain text from raw file bytes.
pub trait TextExtractor: Send + Sync {
    /// Extracts the text content of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractorError`] if the bytes are not a readable instance of the format.
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractorError>;
}

/// Formats the pipeline can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
}

impl DocumentFormat {
    /// Returns the extractor for this format.
    pub fn extractor(self) -> &'static dyn TextExtractor {
        match self {
            DocumentFormat::Pdf => &PdfExtractor,
            DocumentFormat::Docx => &DocxExtractor,
            DocumentFormat::Text => &PlainTextExtractor,
        }
    }
}

/// Outcome of resolving a file's format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatVerdict {
    Supported(DocumentFormat),
    /// Legacy binary Word document (`application/msword`).
    Legacy,
    /// Any other media type; carries the type that was resolved.
    Unsupported(String),
}

/// Resolves the format of an uploaded file.
///
/// The declared media type wins when present and specific. A missing or
/// `application/octet-stream` type falls back to sniffing the bytes, then to the file extension.
pub fn resolve_format(name: &str, declared_mime: Option<&str>, bytes: &[u8]) -> FormatVerdict {
    let declared = declared_mime
        .map(normalise_mime)
        .filter(|m| !m.is_empty() && m != MIME_OCTET_STREAM);

    if let Some(mime) = declared {
        return classify_mime(&mime);
    }

    if let Some(kind) = infer::get(bytes) {
        return classify_mime(kind.mime_type());
    }

    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("pdf") => FormatVerdict::Supported(DocumentFormat::Pdf),
        Some("docx") => FormatVerdict::Supported(DocumentFormat::Docx),
        Some("txt") => FormatVerdict::Supported(DocumentFormat::Text),
        Some("doc") => FormatVerdict::Legacy,
        _ => FormatVerdict::Unsupported(
            declared_mime
                .map(normalise_mime)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| MIME_OCTET_STREAM.to_owned()),
        ),
    }
}

fn normalise_mime(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn classify_mime(mime: &str) -> FormatVerdict {
    match mime {
        MIME_PDF => FormatVerdict::Supported(DocumentFormat::Pdf),
        MIME_DOCX => FormatVerdict::Supported(DocumentFormat::Docx),
        MIME_TEXT => FormatVerdict::Supported(DocumentFormat::Text),
        MIME_LEGACY_DOC => FormatVerdict::Legacy,
        other => FormatVerdict::Unsupported(other.to_owned()),
    }
}

/// Reads the text layer of every page.
///
/// Tokens within a page are joined with single spaces; pages are separated by newlines.
struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractorError> {
        let document = lopdf::Document::load_mem(bytes)?;
        let mut pages = Vec::new();
        for page_number in document.get_pages().keys() {
            let raw = document.extract_text(&[*page_number])?;
            pages.push(join_tokens(&raw));
        }
        Ok(pages.join("\n"))
    }
}

pub(crate) fn join_tokens(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reads the raw text runs of `word/document.xml`, dropping all formatting.
struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractorError> {
        let xml = read_docx_entry(bytes, DOCX_BODY_ENTRY, MAX_DOCX_XML_BYTES)?;
        docx_body_text(&xml)
    }
}

const DOCX_BODY_ENTRY: &str = "word/document.xml";

/// Inflates one archive entry, refusing to go past `limit` bytes whatever the header claims.
fn read_docx_entry(
    bytes: &[u8],
    entry: &'static str,
    limit: u64,
) -> Result<String, ExtractorError> {
    let too_large = ExtractorError::EntryTooLarge { entry, limit };
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let file = archive.by_name(entry)?;
    if file.size() > limit {
        return Err(too_large);
    }

    let mut xml = String::new();
    file.take(limit + 1).read_to_string(&mut xml)?;
    if xml.len() as u64 > limit {
        return Err(too_large);
    }
    Ok(xml)
}

pub(crate) fn docx_body_text(xml: &str) -> Result<String, ExtractorError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text_run => out.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}

/// Decodes bytes as UTF-8, replacing invalid sequences.
struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractorError> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
