//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services.
//! Nothing in request handling reads environment variables, which keeps behaviour consistent
//! in multi-threaded runtimes and test harnesses.
//!
//! [`CoreConfig::from_lookup`] takes the variable source as a closure so the binary passes
//! `std::env::var` and tests pass a map.

use crate::analysis::{Cooldown, OpenAiClient, OpenAiConfig, Orchestrator, RetryPolicy};
use crate::constants::{
    DEFAULT_MODEL, DEFAULT_MODEL_BACKOFF_SECS, DEFAULT_MODEL_BASE_URL,
    DEFAULT_MODEL_COOLDOWN_SECS, DEFAULT_MODEL_MAX_ATTEMPTS, DEFAULT_MODEL_TIMEOUT_SECS,
};
use crate::error::{AnalysisResult, ConfigError, ConfigResult, FlagStoreResult};
use crate::flags::{FileFlagStore, FlagStore, InMemoryFlagStore, RestFlagStore};
use crate::session::{SessionResolver, SessionVerifier};
use base64::{engine::general_purpose, Engine as _};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use telecare_files::{UploadLimits, MIB};

pub const FLAG_STORE_VAR: &str = "TELECARE_FLAG_STORE";
pub const FLAG_STORE_KEY_VAR: &str = "TELECARE_FLAG_STORE_KEY";
pub const SESSION_PUBLIC_KEY_VAR: &str = "TELECARE_SESSION_PUBLIC_KEY";
pub const MAX_REQUEST_BYTES_VAR: &str = "TELECARE_MAX_REQUEST_BYTES";
pub const MODEL_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const MODEL_BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const MODEL_VAR: &str = "OPENAI_MODEL";
pub const MODEL_COOLDOWN_VAR: &str = "TELECARE_MODEL_COOLDOWN_SECS";
pub const MODEL_MAX_ATTEMPTS_VAR: &str = "TELECARE_MODEL_MAX_ATTEMPTS";
pub const MODEL_BACKOFF_VAR: &str = "TELECARE_MODEL_BACKOFF_SECS";
pub const MODEL_TIMEOUT_VAR: &str = "TELECARE_MODEL_TIMEOUT_SECS";

/// Default cap on a request body; comfortably above a full upload batch plus form overhead.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 16 * MIB as usize;

/// Where the feature flags live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagStoreSource {
    Memory,
    File(PathBuf),
    Rest {
        base_url: String,
        api_key: Option<String>,
    },
}

impl FlagStoreSource {
    pub fn build(&self) -> FlagStoreResult<Arc<dyn FlagStore>> {
        Ok(match self {
            FlagStoreSource::Memory => Arc::new(InMemoryFlagStore::default()),
            FlagStoreSource::File(path) => Arc::new(FileFlagStore::new(path)),
            FlagStoreSource::Rest { base_url, api_key } => {
                Arc::new(RestFlagStore::new(base_url.clone(), api_key.clone())?)
            }
        })
    }

    pub fn describe(&self) -> String {
        match self {
            FlagStoreSource::Memory => "memory".into(),
            FlagStoreSource::File(path) => format!("file:{}", path.display()),
            FlagStoreSource::Rest { base_url, .. } => format!("rest:{base_url}"),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    flag_store: FlagStoreSource,
    session_public_key_pem: Option<String>,
    max_request_bytes: usize,
    upload_limits: UploadLimits,
    model: OpenAiConfig,
    cooldown: Duration,
    retry: RetryPolicy,
}

impl CoreConfig {
    /// Resolves every setting through `lookup`, applying defaults for unset or blank values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let flag_store =
            flag_store_from_env_value(lookup(FLAG_STORE_VAR), lookup(FLAG_STORE_KEY_VAR))?;
        let session_public_key_pem =
            pem_from_env_value(SESSION_PUBLIC_KEY_VAR, lookup(SESSION_PUBLIC_KEY_VAR))?;
        let max_request_bytes = parse_from_env_value(
            MAX_REQUEST_BYTES_VAR,
            lookup(MAX_REQUEST_BYTES_VAR),
            DEFAULT_MAX_REQUEST_BYTES,
        )?;

        let model = OpenAiConfig {
            api_key: non_blank(lookup(MODEL_API_KEY_VAR)),
            base_url: non_blank(lookup(MODEL_BASE_URL_VAR))
                .unwrap_or_else(|| DEFAULT_MODEL_BASE_URL.to_owned()),
            model: non_blank(lookup(MODEL_VAR)).unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            timeout: secs_from_env_value(
                MODEL_TIMEOUT_VAR,
                lookup(MODEL_TIMEOUT_VAR),
                DEFAULT_MODEL_TIMEOUT_SECS,
            )?,
        };

        let cooldown = secs_from_env_value(
            MODEL_COOLDOWN_VAR,
            lookup(MODEL_COOLDOWN_VAR),
            DEFAULT_MODEL_COOLDOWN_SECS,
        )?;
        let max_attempts: u32 = parse_from_env_value(
            MODEL_MAX_ATTEMPTS_VAR,
            lookup(MODEL_MAX_ATTEMPTS_VAR),
            DEFAULT_MODEL_MAX_ATTEMPTS,
        )?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                name: MODEL_MAX_ATTEMPTS_VAR,
                reason: "must be at least 1".into(),
            });
        }
        let backoff = secs_from_env_value(
            MODEL_BACKOFF_VAR,
            lookup(MODEL_BACKOFF_VAR),
            DEFAULT_MODEL_BACKOFF_SECS,
        )?;

        let upload_limits = UploadLimits::default();
        if (max_request_bytes as u64) < upload_limits.max_batch_bytes {
            return Err(ConfigError::InvalidValue {
                name: MAX_REQUEST_BYTES_VAR,
                reason: format!(
                    "must be at least the upload batch limit of {} bytes",
                    upload_limits.max_batch_bytes
                ),
            });
        }

        Ok(Self {
            flag_store,
            session_public_key_pem,
            max_request_bytes,
            upload_limits,
            model,
            cooldown,
            retry: RetryPolicy {
                max_attempts,
                backoff,
            },
        })
    }

    pub fn flag_store(&self) -> &FlagStoreSource {
        &self.flag_store
    }

    pub fn has_session_key(&self) -> bool {
        self.session_public_key_pem.is_some()
    }

    pub fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }

    pub fn upload_limits(&self) -> &UploadLimits {
        &self.upload_limits
    }

    pub fn model(&self) -> &OpenAiConfig {
        &self.model
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Without a configured public key every request is anonymous.
    pub fn session_resolver(&self) -> ConfigResult<SessionResolver> {
        match &self.session_public_key_pem {
            Some(pem) => SessionVerifier::from_public_key_pem(pem)
                .map(SessionResolver::new)
                .map_err(|e| ConfigError::InvalidValue {
                    name: SESSION_PUBLIC_KEY_VAR,
                    reason: e.to_string(),
                }),
            None => Ok(SessionResolver::anonymous()),
        }
    }

    /// Builds the orchestrator with the OpenAI-compatible client and a fresh cooldown.
    pub fn orchestrator(&self) -> AnalysisResult<Orchestrator> {
        let client = OpenAiClient::new(self.model.clone())?;
        Ok(Orchestrator::new(
            Arc::new(client),
            Arc::new(Cooldown::new(self.cooldown)),
            self.retry,
        ))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a value, returning `default` when it is unset or blank.
pub fn parse_from_env_value<T>(name: &'static str, value: Option<String>, default: T) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_blank(value) {
        Some(v) => v.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            name,
            reason: format!("{v:?}: {e}"),
        }),
        None => Ok(default),
    }
}

/// Parse a whole number of seconds.
pub fn secs_from_env_value(
    name: &'static str,
    value: Option<String>,
    default_secs: u64,
) -> ConfigResult<Duration> {
    parse_from_env_value(name, value, default_secs).map(Duration::from_secs)
}

/// Parse the flag store location: `memory`, `file:<path>` or `rest:<base url>`.
///
/// Unset or blank means `memory`. `key` is only used by the REST store.
pub fn flag_store_from_env_value(
    value: Option<String>,
    key: Option<String>,
) -> ConfigResult<FlagStoreSource> {
    let Some(value) = non_blank(value) else {
        return Ok(FlagStoreSource::Memory);
    };

    if value.eq_ignore_ascii_case("memory") {
        return Ok(FlagStoreSource::Memory);
    }
    if let Some(path) = value.strip_prefix("file:") {
        if path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: FLAG_STORE_VAR,
                reason: "file: requires a path".into(),
            });
        }
        return Ok(FlagStoreSource::File(PathBuf::from(path.trim())));
    }
    if let Some(url) = value.strip_prefix("rest:") {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                name: FLAG_STORE_VAR,
                reason: "rest: requires an http(s) base URL".into(),
            });
        }
        return Ok(FlagStoreSource::Rest {
            base_url: url.to_owned(),
            api_key: non_blank(key),
        });
    }

    Err(ConfigError::InvalidValue {
        name: FLAG_STORE_VAR,
        reason: format!("expected memory, file:<path> or rest:<url>, got {value:?}"),
    })
}

/// Resolve a PEM supplied inline, as a path to a PEM file, or base64-encoded.
pub fn pem_from_env_value(
    name: &'static str,
    value: Option<String>,
) -> ConfigResult<Option<String>> {
    let Some(value) = non_blank(value) else {
        return Ok(None);
    };

    if value.contains("-----BEGIN") {
        return Ok(Some(value));
    }

    let path = Path::new(&value);
    if path.exists() {
        return std::fs::read_to_string(path)
            .map(Some)
            .map_err(|source| ConfigError::FileRead {
                name,
                path: value.clone(),
                source,
            });
    }

    let decoded = general_purpose::STANDARD
        .decode(value.as_bytes())
        .map_err(|e| ConfigError::InvalidValue {
            name,
            reason: format!("not a PEM, an existing path or base64: {e}"),
        })?;
    let pem = String::from_utf8(decoded).map_err(|e| ConfigError::InvalidValue {
        name,
        reason: e.to_string(),
    })?;
    if !pem.contains("-----BEGIN") {
        return Err(ConfigError::InvalidValue {
            name,
            reason: "decoded value is not a PEM".into(),
        });
    }
    Ok(Some(pem))
}
