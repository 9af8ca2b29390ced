//! Translating core errors into HTTP responses.
//!
//! Every error leaves as `(status, ErrorBody)`. Validation problems carry their specific
//! message; upstream configuration problems are logged in full and reduced to a generic message.

use api_shared::ErrorBody;
use axum::{http::StatusCode, Json};
use telecare_core::{AnalysisError, FlagStoreError};
use telecare_files::FilesError;

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub fn json_error(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
    retryable: bool,
) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
            code: code.to_owned(),
            retryable,
        }),
    )
}

pub fn files_error(error: &FilesError) -> ApiError {
    let code = match error {
        FilesError::TooManyFiles { .. } => "TOO_MANY_FILES",
        FilesError::FileTooLarge { .. } => "FILE_TOO_LARGE",
        FilesError::BatchTooLarge { .. } => "BATCH_TOO_LARGE",
        FilesError::UnsupportedType { .. } => "UNSUPPORTED_TYPE",
        FilesError::LegacyFormatUnsupported { .. } => "LEGACY_FORMAT",
        FilesError::EmptyBatch => "EMPTY_BATCH",
        FilesError::ExtractionFailed { .. } => "EXTRACTION_FAILED",
    };
    tracing::info!(code, "upload rejected");
    json_error(StatusCode::BAD_REQUEST, code, error.to_string(), false)
}

pub fn analysis_error(error: &AnalysisError) -> ApiError {
    let retryable = error.is_transient();
    match error {
        AnalysisError::InvalidInput(message) => {
            json_error(StatusCode::BAD_REQUEST, "INVALID_INPUT", message.clone(), retryable)
        }
        AnalysisError::ContextLengthExceeded => json_error(
            StatusCode::BAD_REQUEST,
            "DOCUMENTS_TOO_LARGE",
            "The documents are too large to analyse together; try fewer or shorter files",
            retryable,
        ),
        AnalysisError::QuotaExceeded | AnalysisError::RateLimited => json_error(
            StatusCode::TOO_MANY_REQUESTS,
            "SERVICE_BUSY",
            "The analysis service is busy, please retry shortly",
            retryable,
        ),
        AnalysisError::RetriesExhausted { .. } => json_error(
            StatusCode::TOO_MANY_REQUESTS,
            "RETRIES_EXHAUSTED",
            "Request failed after multiple attempts, please retry shortly",
            retryable,
        ),
        AnalysisError::Configuration(detail) => {
            tracing::error!(%detail, "model configuration error");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "MODEL_CONFIGURATION",
                "The analysis service is not configured correctly",
                retryable,
            )
        }
        AnalysisError::Upstream(message) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "UPSTREAM_ERROR",
            message.clone(),
            retryable,
        ),
        AnalysisError::InvalidResponse(detail) => {
            tracing::error!(%detail, "unreadable model response");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INVALID_MODEL_RESPONSE",
                "The analysis service returned an unreadable response",
                retryable,
            )
        }
    }
}

pub fn flag_store_error(error: &FlagStoreError) -> ApiError {
    match error {
        FlagStoreError::UnknownFlag(_) => {
            json_error(StatusCode::NOT_FOUND, "UNKNOWN_SETTING", error.to_string(), false)
        }
        FlagStoreError::InvalidValue { .. } => {
            json_error(StatusCode::BAD_REQUEST, "INVALID_SETTING", error.to_string(), false)
        }
        _ => {
            tracing::error!(%error, "flag store unavailable");
            json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "SETTINGS_UNAVAILABLE",
                "Settings are temporarily unavailable",
                true,
            )
        }
    }
}

pub fn internal_error(context: &'static str) -> ApiError {
    tracing::error!(context, "internal error");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL",
        "Internal server error",
        false,
    )
}
