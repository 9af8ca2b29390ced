use rcgen::{KeyPair, PKCS_ECDSA_P256_SHA256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the private half written by [`SessionKeyPair::write_to_dir`].
pub const PRIVATE_KEY_FILENAME: &str = "session_private.pem";

/// File name of the public half written by [`SessionKeyPair::write_to_dir`].
pub const PUBLIC_KEY_FILENAME: &str = "session_public.pem";

/// Errors that can occur during key generation.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Failed to generate key pair: {0}")]
    GenerationError(String),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An ECDSA P-256 key pair used to sign and verify session tokens.
///
/// The private key is PKCS#8 PEM (`BEGIN PRIVATE KEY`) and the public key is SPKI PEM
/// (`BEGIN PUBLIC KEY`), which is what the session signer and verifier load.
pub struct SessionKeyPair {
    private_key_pem: String,
    public_key_pem: String,
}

impl SessionKeyPair {
    /// Generates a fresh key pair.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::GenerationError` if the crypto backend cannot produce a key.
    pub fn generate() -> Result<Self, KeyError> {
        let key_pair = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256)
            .map_err(|e| KeyError::GenerationError(e.to_string()))?;

        Ok(Self {
            private_key_pem: key_pair.serialize_pem(),
            public_key_pem: key_pair.public_key_pem(),
        })
    }

    pub fn private_key_pem(&self) -> &str {
        &self.private_key_pem
    }

    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    /// Writes both halves into `dir` and returns their paths as `(private, public)`.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::Write` if either file cannot be written.
    pub fn write_to_dir(&self, dir: &Path) -> Result<(PathBuf, PathBuf), KeyError> {
        let private_path = dir.join(PRIVATE_KEY_FILENAME);
        let public_path = dir.join(PUBLIC_KEY_FILENAME);

        for (path, contents) in [
            (&private_path, &self.private_key_pem),
            (&public_path, &self.public_key_pem),
        ] {
            fs::write(path, contents).map_err(|source| KeyError::Write {
                path: path.clone(),
                source,
            })?;
        }

        Ok((private_path, public_path))
    }
}
