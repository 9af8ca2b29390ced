//! Session tokens and identity resolution.
//!
//! A session token is two base64url (unpadded) segments joined by a dot:
//!
//! ```text
//! <claims JSON>.<raw 64-byte ECDSA P-256 signature (r || s) over the first segment>
//! ```
//!
//! Claims carry the subject, a display name, the `is_doctor` / `is_admin` role flags and an
//! expiry in unix seconds. Tokens are signed with a PKCS#8 private key held by the sign-in
//! service (or the `telecare issue-token` CLI) and verified here with the matching public key.
//!
//! Resolution never fails a request: a missing, malformed, forged or expired token resolves to
//! "no identity" and the request gate decides what that means for the path.

use crate::error::{SessionError, SessionResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The decoded identity carried by a request. Immutable for the lifetime of the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub subject: String,
    pub name: String,
    pub is_doctor: bool,
    pub is_admin: bool,
}

impl IdentityClaim {
    /// Landing page for this identity after sign-in.
    pub fn home_path(&self) -> &'static str {
        if self.is_doctor {
            crate::constants::DOCTOR_HOME_PATH
        } else {
            crate::constants::PATIENT_HOME_PATH
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaimsV1 {
    sub: String,
    name: String,
    #[serde(default)]
    is_doctor: bool,
    #[serde(default)]
    is_admin: bool,
    exp: i64,
}

/// Issues session tokens.
pub struct SessionSigner {
    key: SigningKey,
}

impl SessionSigner {
    /// Loads a signer from a PKCS#8 PEM private key.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PrivateKeyParse` if the PEM is not a P-256 private key.
    pub fn from_pkcs8_pem(pem: &str) -> SessionResult<Self> {
        let key = SigningKey::from_pkcs8_pem(pem)
            .map_err(|e| SessionError::PrivateKeyParse(Box::new(e)))?;
        Ok(Self { key })
    }

    /// Returns a verifier for tokens issued by this signer.
    pub fn verifier(&self) -> SessionVerifier {
        SessionVerifier {
            key: *self.key.verifying_key(),
        }
    }

    /// Issues a token for `identity` that expires at `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Serialization` if the claims cannot be encoded.
    pub fn issue(
        &self,
        identity: &IdentityClaim,
        expires_at: DateTime<Utc>,
    ) -> SessionResult<String> {
        let claims = SessionClaimsV1 {
            sub: identity.subject.clone(),
            name: identity.name.clone(),
            is_doctor: identity.is_doctor,
            is_admin: identity.is_admin,
            exp: expires_at.timestamp(),
        };
        let payload = serde_json::to_vec(&claims).map_err(SessionError::Serialization)?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);
        let signature: Signature = self.key.sign(payload_b64.as_bytes());

        Ok(format!(
            "{}.{}",
            payload_b64,
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }
}

/// Verifies session tokens.
#[derive(Debug, Clone)]
pub struct SessionVerifier {
    key: VerifyingKey,
}

impl SessionVerifier {
    /// Loads a verifier from an SPKI PEM public key.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PublicKeyParse` if the PEM is not a P-256 public key.
    pub fn from_public_key_pem(pem: &str) -> SessionResult<Self> {
        let key = VerifyingKey::from_public_key_pem(pem)
            .map_err(|e| SessionError::PublicKeyParse(Box::new(e)))?;
        Ok(Self { key })
    }

    /// Verifies `token` and returns its identity if it is authentic and unexpired at `now`.
    ///
    /// # Errors
    ///
    /// Returns the first of: `Malformed`, `InvalidEncoding`, `BadSignature`, `InvalidClaims`,
    /// `Expired`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> SessionResult<IdentityClaim> {
        let (payload_b64, signature_b64) = token
            .trim()
            .split_once('.')
            .ok_or(SessionError::Malformed)?;
        if payload_b64.is_empty() || signature_b64.contains('.') {
            return Err(SessionError::Malformed);
        }

        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| SessionError::InvalidEncoding)?;
        let signature =
            Signature::from_slice(&signature_bytes).map_err(|_| SessionError::BadSignature)?;
        self.key
            .verify(payload_b64.as_bytes(), &signature)
            .map_err(|_| SessionError::BadSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| SessionError::InvalidEncoding)?;
        let claims: SessionClaimsV1 =
            serde_json::from_slice(&payload).map_err(SessionError::InvalidClaims)?;

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(SessionError::Expired)?;
        if expires_at <= now {
            return Err(SessionError::Expired);
        }

        Ok(IdentityClaim {
            subject: claims.sub,
            name: claims.name,
            is_doctor: claims.is_doctor,
            is_admin: claims.is_admin,
        })
    }
}

/// Turns an optional request token into an optional identity.
#[derive(Debug, Clone, Default)]
pub struct SessionResolver {
    verifier: Option<Arc<SessionVerifier>>,
}

impl SessionResolver {
    pub fn new(verifier: SessionVerifier) -> Self {
        Self {
            verifier: Some(Arc::new(verifier)),
        }
    }

    /// A resolver without a key; every request is anonymous.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn resolve(&self, token: Option<&str>) -> Option<IdentityClaim> {
        self.resolve_at(token, Utc::now())
    }

    pub fn resolve_at(&self, token: Option<&str>, now: DateTime<Utc>) -> Option<IdentityClaim> {
        let token = token.filter(|t| !t.trim().is_empty())?;
        let verifier = self.verifier.as_ref()?;
        match verifier.verify(token, now) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::debug!(error = %e, "ignoring invalid session token");
                None
            }
        }
    }
}
