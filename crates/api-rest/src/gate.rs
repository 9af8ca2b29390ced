//! Request-gate middleware.
//!
//! Resolves the caller's identity, reads a fresh flag snapshot and applies
//! [`telecare_core::gate::decide`] before any handler runs. A continued request carries the
//! identity as an [`axum::Extension`].

use crate::error::json_error;
use crate::AppState;
use api_shared::auth::session_token;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use telecare_core::constants::SESSION_COOKIE;
use telecare_core::gate::{decide, is_ungated, GateDecision, GateInput};

pub(crate) async fn gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();

    let identity = {
        let headers = request.headers();
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let cookie = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
        state
            .sessions
            .resolve(session_token(authorization, cookie, SESSION_COOKIE))
    };

    // One store round-trip per gated request; probes and assets skip it.
    let flags = if is_ungated(&path) {
        None
    } else {
        match state.flags.snapshot().await {
            Ok(flags) => Some(flags),
            Err(error) => {
                tracing::warn!(%error, "flag store unavailable, gate failing open");
                None
            }
        }
    };

    let verdict = decide(&GateInput::new(&path, identity.as_ref(), flags.as_ref()));
    tracing::debug!(rule = verdict.rule, %path, "gate decision");

    match verdict.decision {
        GateDecision::Continue => {
            if let Some(identity) = identity {
                request.extensions_mut().insert(identity);
            }
            next.run(request).await
        }
        GateDecision::Redirect(location) => {
            tracing::info!(rule = verdict.rule, %path, location, "gate redirect");
            Redirect::temporary(location).into_response()
        }
        GateDecision::Reject { status, message } => {
            tracing::info!(rule = verdict.rule, %path, status, "gate reject");
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::FORBIDDEN);
            json_error(status, "FEATURE_DISABLED", message, false).into_response()
        }
    }
}
