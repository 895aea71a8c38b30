//! Credential encryption for the login handshake.
//!
//! The credential payload is encrypted with PKCS#1 v1.5 under the RSA key the
//! session-key endpoint publishes, and travels hex-encoded.

use rsa::{BigUint, Pkcs1v15Encrypt, RsaPublicKey};
use talk_core::{CredentialPayload, RsaKeySpec};
use thiserror::Error;

/// Crypto errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The published modulus/exponent pair is not a usable RSA key.
    #[error("invalid rsa key: {0}")]
    InvalidKey(String),

    /// Encryption failed (for example, payload too long for the key).
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
}

/// Build the public key described by `spec`.
pub fn public_key(spec: &RsaKeySpec) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::new(
        BigUint::from_bytes_be(&spec.modulus),
        BigUint::from(spec.exponent),
    )
    .map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

/// Encrypt the credential payload and hex-encode the ciphertext.
pub fn encrypt_credential(
    spec: &RsaKeySpec,
    payload: &CredentialPayload,
) -> Result<String, CryptoError> {
    let key = public_key(spec)?;
    let mut rng = rand::thread_rng();
    let ciphertext = key
        .encrypt(&mut rng, Pkcs1v15Encrypt, payload.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    Ok(hex::encode(ciphertext))
}
