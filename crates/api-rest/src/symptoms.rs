//! `POST /api/symptoms/analyze`

use crate::documents::multipart_error;
use crate::error::{analysis_error, json_error, ApiError};
use crate::AppState;
use api_shared::{ErrorBody, SymptomAnalysisRes};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use telecare_core::analysis::{SymptomImage, SymptomRequest};

async fn read_request(multipart: &mut Multipart) -> Result<SymptomRequest, ApiError> {
    let mut request = SymptomRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("symptoms") => {
                request.symptoms = field.text().await.map_err(multipart_error)?;
            }
            Some("image") => {
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // An empty file input still submits a zero-byte part.
                if !bytes.is_empty() {
                    request.image = Some(SymptomImage {
                        mime_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            Some("specialties") => {
                let raw = field.text().await.map_err(multipart_error)?;
                if !raw.trim().is_empty() {
                    request.specialties = serde_json::from_str(&raw).map_err(|_| {
                        json_error(
                            StatusCode::BAD_REQUEST,
                            "INVALID_INPUT",
                            "specialties must be a JSON array of strings",
                            false,
                        )
                    })?;
                }
            }
            _ => {}
        }
    }

    Ok(request)
}

#[utoipa::path(
    post,
    path = "/api/symptoms/analyze",
    request_body(content_type = "multipart/form-data", description = "Fields: symptoms (required), image (optional), specialties (JSON string array, optional)"),
    responses(
        (status = 200, description = "Triage of the described symptoms", body = SymptomAnalysisRes),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 429, description = "Analysis service busy", body = ErrorBody),
        (status = 500, description = "Analysis service failure", body = ErrorBody)
    )
)]
/// Triage a symptom description, optionally with a photo.
#[axum::debug_handler]
pub(crate) async fn analyze_symptoms(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SymptomAnalysisRes>, ApiError> {
    let request = read_request(&mut multipart).await?;

    let analysis = state
        .orchestrator
        .analyze_symptoms(request)
        .await
        .map_err(|e| analysis_error(&e))?;

    Ok(Json(SymptomAnalysisRes {
        priority: analysis.priority.to_string(),
        recommended_specialties: analysis.recommended_specialties,
        description: analysis.description,
    }))
}
