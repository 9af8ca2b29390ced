//! Upload batch validation.
//!
//! Validation reports the first violated precondition in this order:
//!
//! 1. file count
//! 2. per-file size
//! 3. cumulative size
//! 4. media type (legacy `.doc` is reported separately from other unsupported types)
//! 5. empty batch
//!
//! Zero-byte entries (empty form slots) are dropped before any check runs. Whether a batch is
//! valid does not depend on the order of its files; only the specific error reported can.

use crate::constants::{MAX_BATCH_BYTES, MAX_DOCUMENT_CHARS, MAX_FILES_PER_BATCH, MAX_FILE_BYTES};
use crate::formats::{resolve_format, DocumentFormat, FormatVerdict};
use crate::{FilesError, FilesResult};

/// Size and count limits applied to an upload batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_file_bytes: u64,
    pub max_batch_bytes: u64,
    pub max_document_chars: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_files: MAX_FILES_PER_BATCH,
            max_file_bytes: MAX_FILE_BYTES,
            max_batch_bytes: MAX_BATCH_BYTES,
            max_document_chars: MAX_DOCUMENT_CHARS,
        }
    }
}

/// A file as received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    name: String,
    declared_mime: Option<String>,
    bytes: Vec<u8>,
}

impl UploadedFile {
    /// Creates an uploaded file from its client-supplied name, declared media type and content.
    pub fn new(name: impl Into<String>, declared_mime: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_mime: declared_mime.map(str::to_owned),
            bytes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_mime(&self) -> Option<&str> {
        self.declared_mime.as_deref()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// A file that passed validation, paired with the format its text will be extracted as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFile {
    pub(crate) file: UploadedFile,
    pub(crate) format: DocumentFormat,
}

impl ValidatedFile {
    pub fn file(&self) -> &UploadedFile {
        &self.file
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }
}

/// Validates an upload batch against `limits`.
///
/// No file content is parsed here, so a rejected batch never costs extraction work.
///
/// # Errors
///
/// Returns the first violated precondition as a [`FilesError`]; see the module docs for the
/// order.
pub fn validate_batch(
    files: Vec<UploadedFile>,
    limits: &UploadLimits,
) -> FilesResult<Vec<ValidatedFile>> {
    let files: Vec<UploadedFile> = files.into_iter().filter(|f| !f.bytes.is_empty()).collect();

    if files.len() > limits.max_files {
        return Err(FilesError::TooManyFiles {
            count: files.len(),
            max: limits.max_files,
        });
    }

    if let Some(oversized) = files.iter().find(|f| f.size_bytes() > limits.max_file_bytes) {
        return Err(FilesError::FileTooLarge {
            name: oversized.name.clone(),
            max_bytes: limits.max_file_bytes,
        });
    }

    let total: u64 = files.iter().map(UploadedFile::size_bytes).sum();
    if total > limits.max_batch_bytes {
        return Err(FilesError::BatchTooLarge {
            max_bytes: limits.max_batch_bytes,
        });
    }

    let mut validated = Vec::with_capacity(files.len());
    for file in files {
        match resolve_format(&file.name, file.declared_mime(), &file.bytes) {
            FormatVerdict::Supported(format) => validated.push(ValidatedFile { file, format }),
            FormatVerdict::Legacy => {
                return Err(FilesError::LegacyFormatUnsupported { name: file.name });
            }
            FormatVerdict::Unsupported(mime_type) => {
                return Err(FilesError::UnsupportedType {
                    name: file.name,
                    mime_type,
                });
            }
        }
    }

    if validated.is_empty() {
        return Err(FilesError::EmptyBatch);
    }

    Ok(validated)
}
