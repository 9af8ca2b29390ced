//! # Telecare Core
//!
//! Decision logic for the telecare service:
//! - [`flags`]: the feature-flag snapshot and the stores it is read from
//! - [`session`]: signed session tokens and the identity they carry
//! - [`gate`]: the per-request continue/redirect/reject policy
//! - [`analysis`]: the cooldown-throttled model orchestrator for document summaries and
//!   symptom triage
//!
//! Document validation and text extraction live in `telecare-files`.
//!
//! **No API concerns**: HTTP servers, multipart parsing and wire types belong in `api-rest`
//! and `api-shared`.

pub mod analysis;
pub mod config;
pub mod constants;
pub mod error;
pub mod flags;
pub mod gate;
pub mod session;

pub use config::CoreConfig;
pub use error::{
    AnalysisError, AnalysisResult, ConfigError, ConfigResult, FlagStoreError, FlagStoreResult,
    SessionError, SessionResult,
};
pub use flags::{FeatureFlags, FlagKey, FlagStore};
pub use gate::{decide, is_ungated, GateDecision, GateInput, Verdict};
pub use session::{IdentityClaim, SessionResolver, SessionSigner, SessionVerifier};
