//! # API REST
//!
//! REST API implementation for telecare.
//!
//! Handles:
//! - HTTP endpoints with axum, behind the request gate
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (multipart parsing, JSON errors, CORS, request tracing)
//!
//! Uses `api-shared` for wire types and `telecare-core` for every decision.

#![warn(rust_2018_idioms)]

mod documents;
pub mod error;
mod gate;
mod session;
mod settings;
mod symptoms;

use api_shared::{
    AppointmentSetting, ErrorBody, HealthRes, HealthService, PageRes, SessionRes,
    SettingUpdateReq, SettingsRes, SummaryRes, SymptomAnalysisRes, ToggleSetting,
};
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use telecare_core::analysis::Orchestrator;
use telecare_core::config::DEFAULT_MAX_REQUEST_BYTES;
use telecare_core::{FlagStore, SessionResolver};
use telecare_files::UploadLimits;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST handlers and the gate.
#[derive(Clone)]
pub struct AppState {
    flags: Arc<dyn FlagStore>,
    sessions: SessionResolver,
    orchestrator: Arc<Orchestrator>,
    limits: UploadLimits,
    max_request_bytes: usize,
}

impl AppState {
    pub fn new(
        flags: Arc<dyn FlagStore>,
        sessions: SessionResolver,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        Self {
            flags,
            sessions,
            orchestrator,
            limits: UploadLimits::default(),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }

    pub fn with_limits(mut self, limits: UploadLimits, max_request_bytes: usize) -> Self {
        self.limits = limits;
        self.max_request_bytes = max_request_bytes;
        self
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        documents::summarize_documents,
        symptoms::analyze_symptoms,
        settings::get_settings,
        settings::update_setting,
        session::current_session,
    ),
    components(schemas(
        HealthRes,
        ErrorBody,
        SummaryRes,
        SymptomAnalysisRes,
        SettingsRes,
        SettingUpdateReq,
        ToggleSetting,
        AppointmentSetting,
        SessionRes,
        PageRes,
    ))
)]
pub struct ApiDoc;

/// Builds the full application: routes, docs, gate, body limit, tracing and CORS.
pub fn router(state: AppState) -> Router {
    let body_limit = state.max_request_bytes;

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/documents/summarize",
            post(documents::summarize_documents),
        )
        .route("/api/symptoms/analyze", post(symptoms::analyze_symptoms))
        .route("/api/settings", get(settings::get_settings))
        .route("/api/admin/settings/:key", put(settings::update_setting))
        .route("/api/session", get(session::current_session))
        .fallback(session::page)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(state.clone(), gate::gate))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = uuid::Uuid::new_v4();
    tracing::info_span!(
        "request",
        %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    )
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint. Never gated and never touches the flag store.
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::{header, HeaderMap, StatusCode};
    use http_body_util::BodyExt;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use telecare_core::analysis::{Cooldown, ModelClient, ModelRequest, RetryPolicy};
    use telecare_core::flags::{FlagKey, InMemoryFlagStore, Toggle};
    use telecare_core::{
        AnalysisError, AnalysisResult, FeatureFlags, FlagStoreError, FlagStoreResult,
        IdentityClaim, SessionSigner,
    };
    use tower::ServiceExt;

    struct ScriptedModel {
        answers: Mutex<VecDeque<AnalysisResult<String>>>,
        calls: Mutex<Vec<ModelRequest>>,
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn complete(&self, request: &ModelRequest) -> AnalysisResult<String> {
            self.calls.lock().unwrap().push(request.clone());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AnalysisError::Upstream("script exhausted".into())))
        }
    }

    struct UnreachableStore;

    #[async_trait]
    impl FlagStore for UnreachableStore {
        async fn snapshot(&self) -> FlagStoreResult<FeatureFlags> {
            Err(FlagStoreError::Status(503))
        }

        async fn update(
            &self,
            _key: FlagKey,
            _value: serde_json::Value,
        ) -> FlagStoreResult<FeatureFlags> {
            Err(FlagStoreError::Status(503))
        }
    }

    struct Harness {
        app: Router,
        model: Arc<ScriptedModel>,
        signer: SessionSigner,
    }

    impl Harness {
        fn with_store(flags: Arc<dyn FlagStore>, answers: Vec<AnalysisResult<String>>) -> Self {
            let keys = telecare_keys::SessionKeyPair::generate().unwrap();
            let signer = SessionSigner::from_pkcs8_pem(keys.private_key_pem()).unwrap();
            let model = Arc::new(ScriptedModel {
                answers: Mutex::new(answers.into()),
                calls: Mutex::new(Vec::new()),
            });
            let orchestrator = Orchestrator::new(
                model.clone(),
                Arc::new(Cooldown::new(Duration::ZERO)),
                RetryPolicy {
                    max_attempts: 1,
                    backoff: Duration::ZERO,
                },
            );
            let state = AppState::new(
                flags,
                SessionResolver::new(signer.verifier()),
                Arc::new(orchestrator),
            );
            Self {
                app: router(state),
                model,
                signer,
            }
        }

        fn new(flags: FeatureFlags) -> Self {
            Self::with_store(Arc::new(InMemoryFlagStore::new(flags)), Vec::new())
        }

        fn token(&self, is_doctor: bool, is_admin: bool) -> String {
            let identity = IdentityClaim {
                subject: "user-1".into(),
                name: "Alex Example".into(),
                is_doctor,
                is_admin,
            };
            self.signer
                .issue(&identity, chrono::Utc::now() + chrono::Duration::hours(1))
                .unwrap()
        }

        fn model_calls(&self) -> usize {
            self.model.calls.lock().unwrap().len()
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, serde_json::Value) {
            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
            (status, headers, json)
        }
    }

    fn get(path: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    const BOUNDARY: &str = "telecare-test-boundary";

    struct Part<'a> {
        field: &'a str,
        file_name: Option<&'a str>,
        content_type: Option<&'a str>,
        body: &'a [u8],
    }

    fn text_part<'a>(field: &'a str, body: &'a str) -> Part<'a> {
        Part {
            field,
            file_name: None,
            content_type: None,
            body: body.as_bytes(),
        }
    }

    fn file_part<'a>(field: &'a str, name: &'a str, content_type: &'a str, body: &'a [u8]) -> Part<'a> {
        Part {
            field,
            file_name: Some(name),
            content_type: Some(content_type),
            body,
        }
    }

    fn multipart(path: &str, parts: &[Part<'_>]) -> Request<Body> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.field);
            if let Some(name) = part.file_name {
                disposition.push_str(&format!("; filename=\"{name}\""));
            }
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(b"\r\n");
            if let Some(content_type) = part.content_type {
                body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(part.body);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::post(path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn flags_with(f: impl FnOnce(&mut FeatureFlags)) -> FeatureFlags {
        let mut flags = FeatureFlags::default();
        f(&mut flags);
        flags
    }

    #[tokio::test]
    async fn health_is_never_gated() {
        let harness = Harness::new(flags_with(|f| f.maintenance = Toggle::ON));
        let (status, _, body) = harness.send(get("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn maintenance_redirects_pages_with_307() {
        let harness = Harness::new(flags_with(|f| f.maintenance = Toggle::ON));
        let token = harness.token(false, false);
        let (status, headers, _) = harness.send(get("/dashboard", Some(&token))).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(headers[header::LOCATION], "/maintenance");
    }

    #[tokio::test]
    async fn anonymous_pages_redirect_to_sign_in() {
        let harness = Harness::new(FeatureFlags::default());
        let (status, headers, _) = harness.send(get("/prescriptions", None)).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(headers[header::LOCATION], "/auth/signin");
    }

    #[tokio::test]
    async fn pages_named_like_the_health_check_are_gated() {
        let harness = Harness::new(FeatureFlags::default());
        for path in ["/healthcare-records", "/health-history"] {
            let (status, headers, _) = harness.send(get(path, None)).await;
            assert_eq!(status, StatusCode::TEMPORARY_REDIRECT, "{path}");
            assert_eq!(headers[header::LOCATION], "/auth/signin");
        }
    }

    #[tokio::test]
    async fn signed_in_pages_reach_the_placeholder_with_identity() {
        let harness = Harness::new(FeatureFlags::default());
        let token = harness.token(true, false);
        let request = Request::get("/doctor-dashboard")
            .header(header::COOKIE, format!("theme=dark; session={token}"))
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = harness.send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page"], "/doctor-dashboard");
        assert_eq!(body["identity"]["is_doctor"], true);
    }

    #[tokio::test]
    async fn disabled_registration_rejects_signup_api() {
        let harness = Harness::new(flags_with(|f| f.registration = Toggle::OFF));
        let request = Request::post("/api/auth/signup")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = harness.send(request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Registration is currently disabled");
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn unreadable_flags_fail_open() {
        let harness = Harness::with_store(Arc::new(UnreachableStore), Vec::new());
        let (status, _, body) = harness.send(get("/dashboard", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["page"], "/dashboard");

        let (status, _, body) = harness.send(get("/api/settings", None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["retryable"], true);
    }

    #[tokio::test]
    async fn session_endpoint_reports_identity_or_401() {
        let harness = Harness::new(FeatureFlags::default());
        let (status, _, _) = harness.send(get("/api/session", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, _) = harness.send(get("/api/session", Some("forged.token"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = harness.token(false, true);
        let (status, _, body) = harness.send(get("/api/session", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subject"], "user-1");
        assert_eq!(body["is_admin"], true);
    }

    #[tokio::test]
    async fn only_admins_update_settings_and_updates_take_effect() {
        let harness = Harness::new(FeatureFlags::default());
        let update = |token: &str| {
            Request::put("/api/admin/settings/maintenance")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"enabled": true}"#))
                .unwrap()
        };

        let patient = harness.token(false, false);
        let (status, _, _) = harness.send(update(&patient)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin = harness.token(false, true);
        let (status, _, body) = harness.send(update(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["maintenance"]["enabled"], true);

        let (status, headers, _) = harness.send(get("/dashboard", Some(&patient))).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(headers[header::LOCATION], "/maintenance");
    }

    #[tokio::test]
    async fn out_of_range_appointment_settings_are_rejected() {
        let harness = Harness::new(FeatureFlags::default());
        let admin = harness.token(false, true);
        let request = Request::put("/api/admin/settings/appointments")
            .header(header::AUTHORIZATION, format!("Bearer {admin}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"enabled": true, "default_duration": 1}"#))
            .unwrap();
        let (status, _, body) = harness.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_SETTING");

        let request = Request::put("/api/admin/settings/dark_mode")
            .header(header::AUTHORIZATION, format!("Bearer {admin}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"enabled": true}"#))
            .unwrap();
        let (status, _, _) = harness.send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn summarize_returns_the_model_summary() {
        let harness = Harness::with_store(
            Arc::new(InMemoryFlagStore::default()),
            vec![Ok(r#"{"title": "Referral", "keyPoints": ["Seen in clinic"]}"#.into())],
        );
        let request = multipart(
            "/api/documents/summarize",
            &[
                file_part("file1", "plan.txt", "text/plain", b"Review in six weeks."),
                file_part("file0", "referral.txt", "text/plain", b"Seen in clinic today."),
                file_part("file2", "", "application/octet-stream", b""),
            ],
        );
        let (status, _, body) = harness.send(request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Referral");
        assert_eq!(body["content"], "");
        assert_eq!(body["keyPoints"][0], "Seen in clinic");

        let prompt = harness.model.calls.lock().unwrap()[0].user.clone();
        let first = prompt.find("### Document: referral.txt ###").unwrap();
        let second = prompt.find("### Document: plan.txt ###").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn too_many_files_are_rejected_before_the_model() {
        let harness = Harness::new(FeatureFlags::default());
        let names: Vec<String> = (0..11).map(|i| format!("file{i}")).collect();
        let parts: Vec<Part<'_>> = names
            .iter()
            .map(|name| file_part(name, "a.txt", "text/plain", b"x"))
            .collect();
        let (status, _, body) = harness
            .send(multipart("/api/documents/summarize", &parts))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "TOO_MANY_FILES");
        assert_eq!(harness.model_calls(), 0);
    }

    #[tokio::test]
    async fn legacy_word_documents_abort_the_batch() {
        let harness = Harness::new(FeatureFlags::default());
        let request = multipart(
            "/api/documents/summarize",
            &[
                file_part("file0", "ok.txt", "text/plain", b"fine"),
                file_part("file1", "old.doc", "application/msword", b"\xd0\xcf\x11\xe0"),
            ],
        );
        let (status, _, body) = harness.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "LEGACY_FORMAT");
        assert_eq!(harness.model_calls(), 0);
    }

    #[tokio::test]
    async fn rate_limited_model_maps_to_retryable_429() {
        let harness = Harness::with_store(
            Arc::new(InMemoryFlagStore::default()),
            vec![Err(AnalysisError::RateLimited)],
        );
        let request = multipart(
            "/api/documents/summarize",
            &[file_part("file0", "a.txt", "text/plain", b"content")],
        );
        let (status, _, body) = harness.send(request).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["code"], "RETRIES_EXHAUSTED");
        assert_eq!(body["retryable"], true);
    }

    #[tokio::test]
    async fn symptom_analysis_round_trip() {
        let harness = Harness::with_store(
            Arc::new(InMemoryFlagStore::default()),
            vec![Ok(r#"{"priority": "urgent",
                "recommendedSpecialties": ["Cardiology", "Dermatology"],
                "description": "Seek care now."}"#
                .into())],
        );
        let request = multipart(
            "/api/symptoms/analyze",
            &[
                text_part("symptoms", "crushing chest pain"),
                text_part("specialties", r#"["Cardiology"]"#),
                file_part("image", "", "application/octet-stream", b""),
            ],
        );
        let (status, _, body) = harness.send(request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["priority"], "urgent");
        assert_eq!(body["recommendedSpecialties"], serde_json::json!(["Cardiology"]));
        assert!(harness.model.calls.lock().unwrap()[0].image_data_url.is_none());
    }

    #[tokio::test]
    async fn symptom_analysis_requires_symptoms() {
        let harness = Harness::new(FeatureFlags::default());
        let request = multipart("/api/symptoms/analyze", &[text_part("symptoms", "  ")]);
        let (status, _, body) = harness.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");

        let request = multipart(
            "/api/symptoms/analyze",
            &[
                text_part("symptoms", "rash"),
                text_part("specialties", "Dermatology"),
            ],
        );
        let (status, _, _) = harness.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(harness.model_calls(), 0);
    }

    #[tokio::test]
    async fn unknown_api_paths_are_json_404s() {
        let harness = Harness::new(FeatureFlags::default());
        let (status, _, body) = harness.send(get("/api/nothing-here", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let harness = Harness::new(flags_with(|f| f.maintenance = Toggle::ON));
        let (status, _, body) = harness.send(get("/api-docs/openapi.json", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/documents/summarize"].is_object());
    }
}
