//! `POST /api/documents/summarize`

use crate::error::{analysis_error, files_error, internal_error, json_error, ApiError};
use crate::AppState;
use api_shared::{ErrorBody, SummaryRes};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use telecare_files::{extract_batch, UploadedFile};

/// Index of a `file<N>` form field.
fn file_field_index(name: &str) -> Option<usize> {
    name.strip_prefix("file")?.parse().ok()
}

pub(crate) fn multipart_error(error: MultipartError) -> ApiError {
    tracing::info!(%error, "malformed multipart body");
    json_error(
        StatusCode::BAD_REQUEST,
        "INVALID_FORM",
        format!("Malformed form data: {}", error.body_text()),
        false,
    )
}

/// Collects the `file0..fileN` fields in index order. Other fields are ignored.
async fn read_files(multipart: &mut Multipart) -> Result<Vec<UploadedFile>, ApiError> {
    let mut indexed = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(index) = field.name().and_then(file_field_index) else {
            continue;
        };
        let name = field.file_name().unwrap_or_default().to_owned();
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        indexed.push((index, UploadedFile::new(name, content_type.as_deref(), bytes.to_vec())));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, file)| file).collect())
}

#[utoipa::path(
    post,
    path = "/api/documents/summarize",
    request_body(content_type = "multipart/form-data", description = "Fields file0..fileN: PDF, DOCX or plain text"),
    responses(
        (status = 200, description = "Summary of the uploaded documents", body = SummaryRes),
        (status = 400, description = "Upload rejected or documents too large", body = ErrorBody),
        (status = 429, description = "Analysis service busy", body = ErrorBody),
        (status = 500, description = "Analysis service failure", body = ErrorBody)
    )
)]
/// Extract text from an upload batch and summarize it.
///
/// The whole batch is validated before any text is extracted, and any failure rejects the whole
/// batch.
#[axum::debug_handler]
pub(crate) async fn summarize_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SummaryRes>, ApiError> {
    let files = read_files(&mut multipart).await?;
    tracing::info!(files = files.len(), "document batch received");

    let limits = state.limits;
    let documents = tokio::task::spawn_blocking(move || extract_batch(files, &limits))
        .await
        .map_err(|_| internal_error("document extraction task failed"))?
        .map_err(|e| files_error(&e))?;

    let summary = state
        .orchestrator
        .summarize(&documents)
        .await
        .map_err(|e| analysis_error(&e))?;

    Ok(Json(SummaryRes {
        title: summary.title,
        content: summary.content,
        key_points: summary.key_points,
    }))
}
