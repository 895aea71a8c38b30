//! Credential payload construction for the login handshake.
//!
//! This module provides:
//! - Identity provider selection from the shape of the login identifier
//! - The length-prefixed credential payload that gets RSA-encrypted
//! - Parsing of the provider's `name,modulus,exponent` RSA key string
//!
//! Encryption itself needs randomness and lives in talk-client.

use regex::Regex;
use std::sync::OnceLock;
use talk_types::IdentityProvider;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Credential errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// The RSA key string does not have three comma-separated parts.
    #[error("malformed rsa key: expected 3 fields, got {0}")]
    MalformedKey(usize),

    /// The modulus is not valid hex.
    #[error("invalid rsa modulus: {0}")]
    InvalidModulus(String),

    /// The exponent is not valid hex.
    #[error("invalid rsa exponent: {0}")]
    InvalidExponent(String),
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"[^@]+@[^@]+\.[^@]").expect("static email pattern"))
}

/// Pick the identity provider for a login identifier.
///
/// Identifiers shaped like an email address belong to [`IdentityProvider::Line`],
/// everything else to [`IdentityProvider::NaverKr`].
pub fn classify_identifier(identifier: &str) -> IdentityProvider {
    if email_pattern().is_match(identifier) {
        IdentityProvider::Line
    } else {
        IdentityProvider::NaverKr
    }
}

/// Plaintext credential block, wiped from memory on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CredentialPayload {
    bytes: Vec<u8>,
}

impl CredentialPayload {
    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Don't leak credentials in debug output
impl std::fmt::Debug for CredentialPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CredentialPayload([{} bytes REDACTED])", self.bytes.len())
    }
}

/// Build the credential payload.
///
/// Each field is written as its decimal byte length immediately followed by
/// its bytes: `len(key) key len(id) id len(secret) secret`.
pub fn credential_payload(session_key: &str, identifier: &str, secret: &str) -> CredentialPayload {
    let mut bytes = Vec::with_capacity(session_key.len() + identifier.len() + secret.len() + 12);
    for field in [session_key, identifier, secret] {
        bytes.extend_from_slice(field.len().to_string().as_bytes());
        bytes.extend_from_slice(field.as_bytes());
    }
    CredentialPayload { bytes }
}

/// RSA public key as published by the session-key endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaKeySpec {
    /// Key name, echoed back by some endpoints.
    pub key_name: String,
    /// Big-endian modulus bytes.
    pub modulus: Vec<u8>,
    /// Public exponent.
    pub exponent: u64,
}

impl RsaKeySpec {
    /// Parse a `name,modulusHex,exponentHex` string.
    pub fn parse(raw: &str) -> Result<Self, CredentialError> {
        let parts: Vec<&str> = raw.split(',').collect();
        if parts.len() < 3 {
            return Err(CredentialError::MalformedKey(parts.len()));
        }

        let modulus = hex::decode(parts[1].trim())
            .map_err(|e| CredentialError::InvalidModulus(e.to_string()))?;
        let exponent = u64::from_str_radix(parts[2].trim(), 16)
            .map_err(|e| CredentialError::InvalidExponent(e.to_string()))?;

        Ok(Self {
            key_name: parts[0].to_string(),
            modulus,
            exponent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_identifiers_use_line_provider() {
        assert_eq!(classify_identifier("alice@example.com"), IdentityProvider::Line);
        assert_eq!(classify_identifier("a@b.cd"), IdentityProvider::Line);
    }

    #[test]
    fn other_identifiers_use_naver_provider() {
        assert_eq!(classify_identifier("alice"), IdentityProvider::NaverKr);
        assert_eq!(classify_identifier("alice@localhost"), IdentityProvider::NaverKr);
        assert_eq!(classify_identifier("@example.com"), IdentityProvider::NaverKr);
    }

    #[test]
    fn payload_is_length_prefixed() {
        let payload = credential_payload("abc", "me@x.io", "pw");
        assert_eq!(payload.as_bytes(), b"3abc7me@x.io2pw");
    }

    #[test]
    fn payload_lengths_count_bytes() {
        // "秘密" is 6 bytes in UTF-8
        let payload = credential_payload("k", "id", "秘密");
        let mut expected = b"1k2id6".to_vec();
        expected.extend_from_slice("秘密".as_bytes());
        assert_eq!(payload.as_bytes(), expected.as_slice());
    }

    #[test]
    fn payload_handles_multi_digit_lengths() {
        let key = "k".repeat(16);
        let payload = credential_payload(&key, "", "");
        let expected = format!("16{}00", key);
        assert_eq!(payload.as_bytes(), expected.as_bytes());
        assert_eq!(payload.len(), 20);
    }

    #[test]
    fn payload_debug_redacts() {
        let payload = credential_payload("key", "id", "hunter2");
        let debug = format!("{:?}", payload);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn parse_rsa_key() {
        let spec = RsaKeySpec::parse("10001,c0ffee,10001").unwrap();
        assert_eq!(spec.key_name, "10001");
        assert_eq!(spec.modulus, vec![0xc0, 0xff, 0xee]);
        assert_eq!(spec.exponent, 65537);
    }

    #[test]
    fn parse_rejects_short_key() {
        assert_eq!(
            RsaKeySpec::parse("name,abcd"),
            Err(CredentialError::MalformedKey(2))
        );
    }

    #[test]
    fn parse_rejects_bad_hex() {
        assert!(matches!(
            RsaKeySpec::parse("n,zz,3"),
            Err(CredentialError::InvalidModulus(_))
        ));
        assert!(matches!(
            RsaKeySpec::parse("n,abcd,xyz"),
            Err(CredentialError::InvalidExponent(_))
        ));
    }
}
