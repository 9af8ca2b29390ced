//! Limits and media types for uploaded documents.

/// One mebibyte.
pub const MIB: u64 = 1024 * 1024;

/// Maximum number of files accepted in one upload batch.
pub const MAX_FILES_PER_BATCH: usize = 10;

/// Maximum size of a single uploaded file.
pub const MAX_FILE_BYTES: u64 = MIB;

/// Maximum cumulative size of an upload batch.
pub const MAX_BATCH_BYTES: u64 = 5 * MIB;

/// Largest inflated `word/document.xml` a DOCX may carry.
pub const MAX_DOCX_XML_BYTES: u64 = 10 * MAX_FILE_BYTES;

/// Extracted text per document is cut to this many characters.
pub const MAX_DOCUMENT_CHARS: usize = 15_000;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_LEGACY_DOC: &str = "application/msword";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";
