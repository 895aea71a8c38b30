//! Client error type.

use crate::config::ConfigError;
use crate::crypto::CryptoError;
use crate::transport::TransportError;
use talk_core::{CredentialError, FailureKind};
use talk_types::LoginResultType;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The service rejected the call. The reason is surfaced verbatim.
    #[error("{reason} (code {code})")]
    Talk {
        /// Service error code.
        code: i32,
        /// Service-provided reason.
        reason: String,
    },

    /// Login ended in a state other than SUCCESS.
    #[error("login rejected: {0}")]
    LoginRejected(LoginResultType),

    /// The caller cancelled the operation.
    #[error("Cancel login.")]
    Cancelled,

    /// No session token is installed.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The service answered with a reply of the wrong shape.
    #[error("unexpected reply to {method}")]
    UnexpectedReply {
        /// Remote method that was called.
        method: &'static str,
    },

    /// Credential payload or key parsing error.
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// An auxiliary JSON document was missing a field.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// The session token was rejected (transport status exactly 400).
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Transport(e) if e.status() == Some(400))
    }

    /// How the poller's reconnect state machine should treat this error.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Cancelled => FailureKind::Cancelled,
            e if e.is_auth_expired() => FailureKind::AuthExpired,
            _ => FailureKind::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_status_400_is_auth_expired() {
        let expired = ClientError::from(TransportError::Http { status: 400 });
        assert!(expired.is_auth_expired());
        assert_eq!(expired.failure_kind(), FailureKind::AuthExpired);

        for status in [401, 403, 404, 500] {
            let error = ClientError::from(TransportError::Http { status });
            assert!(!error.is_auth_expired());
            assert_eq!(error.failure_kind(), FailureKind::Transient);
        }
    }

    #[test]
    fn cancellation_is_its_own_kind() {
        assert_eq!(ClientError::Cancelled.failure_kind(), FailureKind::Cancelled);
        assert_eq!(ClientError::Cancelled.to_string(), "Cancel login.");
    }

    #[test]
    fn protocol_rejections_are_transient_and_verbatim() {
        let error = ClientError::Talk {
            code: 20,
            reason: "not a friend".into(),
        };
        assert_eq!(error.failure_kind(), FailureKind::Transient);
        assert!(error.to_string().starts_with("not a friend"));
    }

    #[test]
    fn login_rejection_names_tag() {
        let error = ClientError::LoginRejected(LoginResultType::RequireDeviceConfirm);
        assert_eq!(error.to_string(), "login rejected: REQUIRE_DEVICE_CONFIRM");
    }
}
