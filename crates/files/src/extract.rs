//! Batch text extraction.

use crate::formats::ExtractorError;
use crate::upload::{validate_batch, UploadLimits, UploadedFile, ValidatedFile};
use crate::{DocumentFormat, FilesError, FilesResult};
use sha2::{Digest, Sha256};
use telecare_types::NonEmptyText;

/// Plain text extracted from one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    name: NonEmptyText,
    format: DocumentFormat,
    text: String,
    size_bytes: u64,
    sha256: String,
    truncated: bool,
}

impl ExtractedDocument {
    /// Builds a document from already-extracted text, applying the character cap.
    ///
    /// With no upload behind it, the text itself is treated as the source for
    /// [`size_bytes`](Self::size_bytes) and [`sha256`](Self::sha256).
    pub fn new(
        name: NonEmptyText,
        format: DocumentFormat,
        text: &str,
        max_chars: usize,
    ) -> Self {
        Self::from_source(name, format, text, max_chars, text.as_bytes())
    }

    fn from_source(
        name: NonEmptyText,
        format: DocumentFormat,
        text: &str,
        max_chars: usize,
        source: &[u8],
    ) -> Self {
        let (text, truncated) = truncate_chars(text.trim(), max_chars);
        Self {
            name,
            format,
            text,
            size_bytes: source.len() as u64,
            sha256: hex::encode(Sha256::digest(source)),
            truncated,
        }
    }

    pub fn name(&self) -> &NonEmptyText {
        &self.name
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Size of the source the text came from: the uploaded file, or the text given to
    /// [`new`](Self::new).
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Hex SHA-256 of the same source as [`size_bytes`](Self::size_bytes). Used to reference
    /// documents in logs.
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// True when the text was cut to the per-document character cap.
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

/// Validates and extracts a whole upload batch.
///
/// # Errors
///
/// Returns the first validation failure, or `FilesError::ExtractionFailed` for the first file
/// whose text cannot be read. No partial result is ever returned.
pub fn extract_batch(
    files: Vec<UploadedFile>,
    limits: &UploadLimits,
) -> FilesResult<Vec<ExtractedDocument>> {
    let validated = validate_batch(files, limits)?;
    extract_validated(validated, limits)
}

/// Extracts text from files that already passed [`validate_batch`].
///
/// # Errors
///
/// Returns `FilesError::ExtractionFailed` for the first unreadable file.
pub fn extract_validated(
    files: Vec<ValidatedFile>,
    limits: &UploadLimits,
) -> FilesResult<Vec<ExtractedDocument>> {
    let mut documents = Vec::with_capacity(files.len());

    for (index, validated) in files.into_iter().enumerate() {
        let file = &validated.file;
        let raw = validated
            .format
            .extractor()
            .extract(file.bytes())
            .map_err(|e| extraction_failed(file.name(), e))?;

        let name = NonEmptyText::new(file.name())
            .or_else(|_| NonEmptyText::new(format!("document-{}", index + 1)))
            .map_err(|e| FilesError::ExtractionFailed {
                name: file.name().to_owned(),
                cause: e.to_string(),
            })?;

        let document = ExtractedDocument::from_source(
            name,
            validated.format,
            &raw,
            limits.max_document_chars,
            file.bytes(),
        );

        if document.truncated {
            tracing::debug!(
                sha256 = %document.sha256,
                max_chars = limits.max_document_chars,
                "document text truncated"
            );
        }

        documents.push(document);
    }

    Ok(documents)
}

fn extraction_failed(name: &str, cause: ExtractorError) -> FilesError {
    tracing::warn!(file = name, error = %cause, "text extraction failed");
    FilesError::ExtractionFailed {
        name: name.to_owned(),
        cause: cause.to_string(),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => (text[..cut].to_owned(), true),
        None => (text.to_owned(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MIME_LEGACY_DOC, MIME_PDF, MIME_TEXT};

    #[test]
    fn extracts_plain_text_batch_in_order() {
        let files = vec![
            UploadedFile::new("a.txt", Some(MIME_TEXT), b"  first  ".to_vec()),
            UploadedFile::new("b.txt", Some(MIME_TEXT), b"second".to_vec()),
        ];
        let docs = extract_batch(files, &UploadLimits::default()).unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].name().as_str(), "a.txt");
        assert_eq!(docs[0].text(), "first");
        assert_eq!(docs[0].size_bytes(), 9);
        assert_eq!(docs[1].text(), "second");
        assert_eq!(docs[1].format(), DocumentFormat::Text);
        assert_eq!(docs[1].sha256().len(), 64);
    }

    #[test]
    fn digest_covers_the_uploaded_bytes_not_the_trimmed_text() {
        let upload = b"  padded note \n".to_vec();
        let expected = hex::encode(Sha256::digest(&upload));
        let files = vec![UploadedFile::new("note.txt", Some(MIME_TEXT), upload)];
        let docs = extract_batch(files, &UploadLimits::default()).unwrap();

        assert_eq!(docs[0].text(), "padded note");
        assert_eq!(docs[0].sha256(), expected);
        assert_eq!(docs[0].size_bytes(), 15);
    }

    #[test]
    fn long_text_is_truncated_silently() {
        let body = "é".repeat(15_010);
        let files = vec![UploadedFile::new("long.txt", Some(MIME_TEXT), body.into_bytes())];
        let docs = extract_batch(files, &UploadLimits::default()).unwrap();

        assert_eq!(docs[0].text().chars().count(), 15_000);
        assert!(docs[0].truncated());
    }

    #[test]
    fn short_text_is_not_marked_truncated() {
        let doc = ExtractedDocument::new(
            NonEmptyText::new("x.txt").unwrap(),
            DocumentFormat::Text,
            "abc",
            3,
        );
        assert_eq!(doc.text(), "abc");
        assert!(!doc.truncated());
    }

    #[test]
    fn one_unreadable_file_aborts_the_batch() {
        let files = vec![
            UploadedFile::new("ok.txt", Some(MIME_TEXT), b"fine".to_vec()),
            UploadedFile::new("broken.pdf", Some(MIME_PDF), b"not a pdf at all".to_vec()),
        ];
        let err = extract_batch(files, &UploadLimits::default()).unwrap_err();
        assert!(matches!(err, FilesError::ExtractionFailed { ref name, .. } if name == "broken.pdf"));
    }

    #[test]
    fn validation_runs_before_extraction() {
        let files = vec![
            UploadedFile::new("broken.pdf", Some(MIME_PDF), b"not a pdf".to_vec()),
            UploadedFile::new("old.doc", Some(MIME_LEGACY_DOC), b"x".to_vec()),
        ];
        let err = extract_batch(files, &UploadLimits::default()).unwrap_err();
        assert_eq!(
            err,
            FilesError::LegacyFormatUnsupported {
                name: "old.doc".into()
            }
        );
    }

    #[test]
    fn unnamed_files_get_positional_names() {
        let files = vec![UploadedFile::new("  ", Some(MIME_TEXT), b"text".to_vec())];
        let docs = extract_batch(files, &UploadLimits::default()).unwrap();
        assert_eq!(docs[0].name().as_str(), "document-1");
    }
}
