//! # Summarization and analysis orchestrator
//!
//! Sends extracted documents, or a symptom description with an optional image, to an external
//! model and parses the answer into a typed result.
//!
//! Every operation first passes the shared [`Cooldown`], so calls into the model are spaced by
//! at least the cooldown window across all callers. Document summaries are retried when the
//! model reports a rate limit, with a linear backoff of `attempt × backoff`. Symptom analysis is
//! a single attempt. Document and symptom text is never logged.

mod client;
mod cooldown;
mod openai;
mod prompt;
mod result;

pub use client::{ModelClient, ModelRequest};
pub use cooldown::Cooldown;
pub use openai::{OpenAiClient, OpenAiConfig};
pub use prompt::{
    assemble_prompt_body, summary_user_prompt, symptom_user_prompt, DOCUMENT_SEPARATOR,
    SUMMARY_SYSTEM_PROMPT, SYMPTOM_SYSTEM_PROMPT,
};
pub use result::{Priority, SummaryResult, SymptomAnalysis, DEFAULT_SUMMARY_TITLE};

use crate::constants::{
    DEFAULT_MODEL_BACKOFF_SECS, DEFAULT_MODEL_MAX_ATTEMPTS, MAX_SYMPTOM_CHARS,
    MAX_SYMPTOM_IMAGE_BYTES,
};
use crate::error::{AnalysisError, AnalysisResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::sync::Arc;
use std::time::Duration;
use telecare_files::ExtractedDocument;
use telecare_types::{NonEmptyText, TextError};

/// Image types the model accepts alongside a symptom description.
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/gif"];

/// How summaries are retried when the model is rate limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Multiplied by the attempt number before the next attempt.
    pub backoff: Duration,
}

impl RetryPolicy {
    fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MODEL_MAX_ATTEMPTS,
            backoff: Duration::from_secs(DEFAULT_MODEL_BACKOFF_SECS),
        }
    }
}

/// An image attached to a symptom description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SymptomImage {
    fn data_url(&self) -> AnalysisResult<String> {
        let mime_type = self.mime_type.trim().to_ascii_lowercase();
        if !SUPPORTED_IMAGE_TYPES.contains(&mime_type.as_str()) {
            return Err(AnalysisError::InvalidInput(format!(
                "unsupported image type: {}",
                self.mime_type
            )));
        }
        if self.bytes.is_empty() {
            return Err(AnalysisError::InvalidInput("image is empty".into()));
        }
        if self.bytes.len() as u64 > MAX_SYMPTOM_IMAGE_BYTES {
            return Err(AnalysisError::InvalidInput(format!(
                "image exceeds {} MiB",
                MAX_SYMPTOM_IMAGE_BYTES / (1024 * 1024)
            )));
        }
        Ok(format!("data:{mime_type};base64,{}", BASE64.encode(&self.bytes)))
    }
}

/// Input to [`Orchestrator::analyze_symptoms`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymptomRequest {
    pub symptoms: String,
    pub image: Option<SymptomImage>,
    /// Specialties the answer may recommend. Empty means unrestricted.
    pub specialties: Vec<String>,
}

pub struct Orchestrator {
    model: Arc<dyn ModelClient>,
    cooldown: Arc<Cooldown>,
    retry: RetryPolicy,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn ModelClient>, cooldown: Arc<Cooldown>, retry: RetryPolicy) -> Self {
        Self {
            model,
            cooldown,
            retry,
        }
    }

    /// Summarizes a complete, already-extracted document set.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an empty document set.
    /// - `RetriesExhausted` when every attempt was rate limited.
    /// - Any other model error, unretried.
    pub async fn summarize(&self, documents: &[ExtractedDocument]) -> AnalysisResult<SummaryResult> {
        if documents.is_empty() {
            return Err(AnalysisError::InvalidInput("no documents to summarize".into()));
        }

        let body = assemble_prompt_body(documents);
        let request = ModelRequest::new(SUMMARY_SYSTEM_PROMPT, summary_user_prompt(&body));

        let digests: Vec<&str> = documents.iter().map(|d| d.sha256()).collect();
        tracing::info!(documents = documents.len(), prompt_chars = body.chars().count(), ?digests, "summarizing documents");

        let waited = self.cooldown.wait().await;
        if !waited.is_zero() {
            tracing::debug!(waited_ms = waited.as_millis() as u64, "held by model cooldown");
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.model.complete(&request).await {
                Ok(raw) => {
                    let summary = SummaryResult::from_model_output(&raw)?;
                    tracing::info!(attempt, key_points = summary.key_points.len(), "summary ready");
                    return Ok(summary);
                }
                Err(AnalysisError::RateLimited) if attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    tracing::warn!(attempt, delay_secs = delay.as_secs_f64(), "model rate limited, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(AnalysisError::RateLimited) => {
                    tracing::error!(attempts = attempt, "model still rate limited, giving up");
                    return Err(AnalysisError::RetriesExhausted { attempts: attempt });
                }
                Err(error) => {
                    tracing::error!(attempt, %error, "summary failed");
                    return Err(error);
                }
            }
        }
    }

    /// Triage for a symptom description. Not retried.
    pub async fn analyze_symptoms(&self, request: SymptomRequest) -> AnalysisResult<SymptomAnalysis> {
        let symptoms = NonEmptyText::with_max_chars(&request.symptoms, MAX_SYMPTOM_CHARS)
            .map_err(|e| match e {
                TextError::Empty => AnalysisError::InvalidInput("symptoms are required".into()),
                TextError::TooLong { max } => AnalysisError::InvalidInput(format!(
                    "symptoms must be at most {max} characters"
                )),
            })?;

        let specialties: Vec<String> = request
            .specialties
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();

        let mut model_request = ModelRequest::new(
            SYMPTOM_SYSTEM_PROMPT,
            symptom_user_prompt(symptoms.as_str(), &specialties),
        );
        if let Some(image) = &request.image {
            model_request = model_request.with_image(image.data_url()?);
        }

        tracing::info!(
            with_image = request.image.is_some(),
            allowed_specialties = specialties.len(),
            "analyzing symptoms"
        );

        self.cooldown.wait().await;

        let raw = self.model.complete(&model_request).await.map_err(|error| {
            tracing::error!(%error, "symptom analysis failed");
            error
        })?;
        let analysis = SymptomAnalysis::from_model_output(&raw, &specialties)?;
        tracing::info!(priority = %analysis.priority, "symptom analysis ready");
        Ok(analysis)
    }
}
