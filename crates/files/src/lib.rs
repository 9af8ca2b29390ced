//! Telecare document ingestion
//!
//! This crate turns a batch of uploaded files into plain-text documents that can be handed to a
//! language model.
//!
//! ## Pipeline
//!
//! ```text
//! UploadedFile[] ──validate──▶ ValidatedFile[] ──extract──▶ ExtractedDocument[]
//!                 (count, size,                (PDF / DOCX / text,
//!                  batch size, type)            truncated per document)
//! ```
//!
//! - Validation fails fast and reports the first violated precondition.
//! - Extraction is all-or-nothing: one unreadable file aborts the batch, so callers never build
//!   a summary from a partial document set.
//! - Text per document is silently cut to [`MAX_DOCUMENT_CHARS`] characters.
//!
//! ## Example Usage
//!
//! ```no_run
//! use telecare_files::{extract_batch, UploadLimits, UploadedFile};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let files = vec![UploadedFile::new("notes.txt", Some("text/plain"), b"BP 120/80".to_vec())];
//! let documents = extract_batch(files, &UploadLimits::default())?;
//! assert_eq!(documents[0].text(), "BP 120/80");
//! # Ok(())
//! # }
//! ```

mod constants;
mod extract;
mod formats;
mod upload;

pub use constants::{
    MAX_BATCH_BYTES, MAX_DOCUMENT_CHARS, MAX_FILES_PER_BATCH, MAX_FILE_BYTES, MIB, MIME_DOCX,
    MIME_LEGACY_DOC, MIME_OCTET_STREAM, MIME_PDF, MIME_TEXT,
};
pub use extract::{extract_batch, extract_validated, ExtractedDocument};
pub use formats::{resolve_format, DocumentFormat, FormatVerdict, TextExtractor};
pub use upload::{validate_batch, UploadLimits, UploadedFile, ValidatedFile};

/// Errors that can occur while validating or extracting an upload batch
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FilesError {
    /// More files than the batch allows
    #[error("Too many files: {count} submitted, at most {max} allowed")]
    TooManyFiles { count: usize, max: usize },

    /// A single file is over the per-file limit
    #[error("File {name} exceeds the maximum size of {max_bytes} bytes")]
    FileTooLarge { name: String, max_bytes: u64 },

    /// The files together are over the batch limit
    #[error("Total upload size exceeds the maximum of {max_bytes} bytes")]
    BatchTooLarge { max_bytes: u64 },

    /// The file type is not one of PDF, DOCX or plain text
    #[error("File {name} has unsupported type {mime_type}")]
    UnsupportedType { name: String, mime_type: String },

    /// The file is a legacy Word document; callers show a conversion hint
    #[error("File {name} uses the legacy .doc format; please convert it to .docx or PDF")]
    LegacyFormatUnsupported { name: String },

    /// Nothing left to process
    #[error("No files were provided")]
    EmptyBatch,

    /// A file passed validation but its text could not be read
    #[error("Failed to extract text from {name}: {cause}")]
    ExtractionFailed { name: String, cause: String },
}

/// Result type for document ingestion.
pub type FilesResult<T> = Result<T, FilesError>;
