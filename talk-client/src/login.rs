//! Credential exchange - turns an identifier and secret into a session token.
//!
//! The handshake has two halves:
//!
//! 1. [`CredentialExchange::request_pincode`] fetches a one-time session key
//!    and RSA key for the identifier's provider, submits the encrypted
//!    credential with device metadata, and returns the pincode the user
//!    confirms on a registered device.
//! 2. [`CredentialExchange::await_verified_token`] waits on the verifier
//!    status endpoint until the pincode is confirmed, then redeems the
//!    verifier for a login result. Only `SUCCESS` yields a token.
//!
//! The wait can be cancelled with a `CancellationToken`; cancellation is
//! reported as [`ClientError::Cancelled`], never as a protocol failure.

use serde::Deserialize;
use std::sync::Arc;
use talk_core::{classify_identifier, credential_payload, RsaKeySpec};
use talk_types::{Call, LoginResultType, Reply};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::encrypt_credential;
use crate::device::DeviceInfo;
use crate::error::ClientError;
use crate::session::Session;
use crate::transport::Transport;

/// Session key document.
#[derive(Deserialize)]
struct SessionKey {
    session_key: String,
    rsa_key: String,
}

/// Verifier status document.
#[derive(Deserialize)]
struct CertificateStatus {
    result: CertificateResult,
}

#[derive(Deserialize)]
struct CertificateResult {
    verifier: String,
}

/// Login handshake against a [`Session`].
pub struct CredentialExchange<T: Transport> {
    session: Arc<Session<T>>,
    device: DeviceInfo,
    verifier: Mutex<Option<Zeroizing<String>>>,
}

impl<T: Transport> CredentialExchange<T> {
    /// Create an exchange that submits `device` with the credential.
    pub fn new(session: Arc<Session<T>>, device: DeviceInfo) -> Self {
        Self {
            session,
            device,
            verifier: Mutex::new(None),
        }
    }

    /// Submit the credential and return the pincode to show the user.
    pub async fn request_pincode(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<String, ClientError> {
        let provider = classify_identifier(identifier);
        self.session.set_provider(provider).await;
        self.session.ensure_connected().await?;

        let config = self.session.config();
        let key_url = config.server.session_key_url(provider);
        debug!("Fetching session key for {:?}", provider);
        let document = self.session.get_json(&key_url).await?;
        let key: SessionKey = serde_json::from_value(document)
            .map_err(|e| ClientError::MalformedResponse(format!("session key: {}", e)))?;

        let rsa_key = RsaKeySpec::parse(&key.rsa_key)?;
        let payload = credential_payload(&key.session_key, identifier, secret);
        let identity_credential = encrypt_credential(&rsa_key, &payload)?;

        let call = Call::LoginWithIdentityCredentialForCertificate {
            provider,
            identifier: identifier.to_string(),
            keep_logged_in: true,
            access_location: self.device.access_location.clone(),
            system_name: self.device.system_name.clone(),
            identity_credential,
        };
        let result = match self.session.call(call).await? {
            Reply::Login(result) => result,
            _ => {
                return Err(ClientError::UnexpectedReply {
                    method: "loginWithIdentityCredentialForCertificate",
                })
            }
        };

        let verifier = result
            .verifier
            .ok_or_else(|| ClientError::MalformedResponse("login result without verifier".into()))?;
        let pincode = result
            .pin_code
            .ok_or_else(|| ClientError::MalformedResponse("login result without pincode".into()))?;

        *self.verifier.lock().await = Some(Zeroizing::new(verifier));
        info!("Credential accepted, waiting for pincode confirmation");
        Ok(pincode)
    }

    /// Wait for the pincode to be confirmed and return the session token.
    ///
    /// Cancelling `cancel` ends the wait with [`ClientError::Cancelled`]. The
    /// token is returned, not installed; the caller authenticates with it.
    pub async fn await_verified_token(
        &self,
        cancel: &CancellationToken,
    ) -> Result<String, ClientError> {
        let verifier = self
            .verifier
            .lock()
            .await
            .take()
            .ok_or(ClientError::NotAuthenticated)?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Login cancelled");
                Err(ClientError::Cancelled)
            }
            result = self.redeem(&verifier) => result,
        }
    }

    async fn redeem(&self, verifier: &str) -> Result<String, ClientError> {
        let url = self.session.config().server.certificate_url();
        let document = self.session.get_json_with_access(&url, verifier).await?;
        let status: CertificateStatus = serde_json::from_value(document)
            .map_err(|e| ClientError::MalformedResponse(format!("certificate: {}", e)))?;
        let verifier = Zeroizing::new(status.result.verifier);

        let call = Call::LoginWithVerifierForCertificate {
            verifier: verifier.to_string(),
        };
        let result = match self.session.call(call).await? {
            Reply::Login(result) => result,
            _ => {
                return Err(ClientError::UnexpectedReply {
                    method: "loginWithVerifierForCertificate",
                })
            }
        };

        match result.result_type {
            LoginResultType::Success => {
                let token = result.auth_token.ok_or_else(|| {
                    ClientError::MalformedResponse("SUCCESS without auth token".into())
                })?;
                info!("Login verified");
                Ok(token)
            }
            other => {
                warn!("Login rejected: {}", other);
                Err(ClientError::LoginRejected(other))
            }
        }
    }
}
