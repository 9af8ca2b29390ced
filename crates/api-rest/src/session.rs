//! Session lookup and the page placeholder.

use crate::error::{json_error, ApiError};
use api_shared::{ErrorBody, PageRes, SessionRes};
use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Extension, Json,
};
use telecare_core::constants::API_PREFIX;
use telecare_core::IdentityClaim;

fn session_res(identity: IdentityClaim) -> SessionRes {
    SessionRes {
        subject: identity.subject,
        name: identity.name,
        is_doctor: identity.is_doctor,
        is_admin: identity.is_admin,
    }
}

#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Identity of the caller", body = SessionRes),
        (status = 401, description = "No valid session", body = ErrorBody)
    )
)]
/// Return the identity carried by the caller's session token.
pub(crate) async fn current_session(
    identity: Option<Extension<IdentityClaim>>,
) -> Result<Json<SessionRes>, ApiError> {
    match identity {
        Some(Extension(identity)) => Ok(Json(session_res(identity))),
        None => Err(json_error(
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
            "No valid session",
            false,
        )),
    }
}

/// Every path without a route. Pages are rendered elsewhere, so a gated page that reaches
/// here is answered with its path and the caller's identity. Unknown API paths are 404s.
pub(crate) async fn page(uri: Uri, identity: Option<Extension<IdentityClaim>>) -> Response {
    let path = uri.path();
    if path.starts_with(API_PREFIX) {
        return json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "No such endpoint", false)
            .into_response();
    }

    Json(PageRes {
        page: path.to_owned(),
        identity: identity.map(|Extension(identity)| session_res(identity)),
    })
    .into_response()
}
