//! The seam between the orchestrator and whichever model vendor answers it.

use crate::error::AnalysisResult;
use async_trait::async_trait;

/// One chat completion: a system instruction, a user message and optionally an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    pub system: String,
    pub user: String,
    /// `data:<mime>;base64,<payload>`
    pub image_data_url: Option<String>,
}

impl ModelRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            image_data_url: None,
        }
    }

    pub fn with_image(mut self, data_url: String) -> Self {
        self.image_data_url = Some(data_url);
        self
    }
}

/// An external model that answers with the raw text of a JSON object.
///
/// Implementations classify vendor failures into [`crate::error::AnalysisError`]; they do not
/// retry or throttle, which is the orchestrator's job.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, request: &ModelRequest) -> AnalysisResult<String>;
}
