//! Error types for the telecare core crate.

/// Errors raised while reading or writing feature flags.
#[derive(Debug, thiserror::Error)]
pub enum FlagStoreError {
    #[error("unknown feature flag: {0}")]
    UnknownFlag(String),
    #[error("invalid value for feature flag {key}: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("failed to read settings file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write settings file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to parse settings YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("failed to serialize settings YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("settings request failed: {0}")]
    Http(reqwest::Error),
    #[error("settings store responded with status {0}")]
    Status(u16),
}

pub type FlagStoreResult<T> = std::result::Result<T, FlagStoreError>;

/// Errors raised while issuing or verifying session tokens.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session token is malformed")]
    Malformed,
    #[error("session token is not valid base64url")]
    InvalidEncoding,
    #[error("session claims could not be decoded: {0}")]
    InvalidClaims(serde_json::Error),
    #[error("session token signature does not verify")]
    BadSignature,
    #[error("session token has expired")]
    Expired,
    #[error("failed to parse ECDSA private key: {0}")]
    PrivateKeyParse(Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to parse ECDSA public key: {0}")]
    PublicKeyParse(Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to serialize session claims: {0}")]
    Serialization(serde_json::Error),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by the summarization and analysis orchestrator.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// The caller supplied unusable input (empty symptoms, bad image).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The model account has no quota left. Not retried.
    #[error("model quota exceeded")]
    QuotaExceeded,
    /// The model asked us to slow down. Retried on the summary path.
    #[error("model rate limit reached")]
    RateLimited,
    /// Every attempt was rate limited.
    #[error("request failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
    /// Bad key, unknown model or missing configuration. Never retried.
    #[error("model configuration error: {0}")]
    Configuration(String),
    /// The prompt did not fit in the model's context window.
    #[error("documents are too large for the model context")]
    ContextLengthExceeded,
    /// Any other upstream failure; carries the upstream message.
    #[error("model request failed: {0}")]
    Upstream(String),
    /// The model answered with something that is not a JSON object.
    #[error("model returned an unreadable response: {0}")]
    InvalidResponse(String),
}

impl AnalysisError {
    /// True for errors a caller may resolve by trying again shortly.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AnalysisError::QuotaExceeded
                | AnalysisError::RateLimited
                | AnalysisError::RetriesExhausted { .. }
        )
    }
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while resolving startup configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
    #[error("failed to read {name} from {path}: {source}")]
    FileRead {
        name: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
