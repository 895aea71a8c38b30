//! Transport abstraction for talksync.
//!
//! This module provides a pluggable transport layer that abstracts
//! the underlying connection mechanism (HTTP, mock for testing).
//!
//! # Design
//!
//! The transport owns the header set of every request:
//! - `connect()` builds a fresh connection and drops any access header
//! - `set_access_token()` adds or replaces the access header
//! - `call()` performs one RPC
//! - `get_json()` performs an auxiliary JSON GET with the fixed headers and an
//!   optional per-request access header; the installed access header is
//!   neither sent nor changed
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.set_default_reply("getProfile", Reply::Profile(profile));
//! transport.connect().await?;
//! transport.set_access_token("token");
//! let response = transport.call(&Call::GetProfile).await?;
//! ```

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::MockTransport;

use async_trait::async_trait;
use talk_types::{Call, RpcResponse};
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The server answered with a non-success HTTP status.
    #[error("HTTP Response code: {status}")]
    Http {
        /// HTTP status code.
        status: u16,
    },

    /// Connection, DNS or I/O failure.
    #[error("network error: {0}")]
    Network(String),

    /// Request or response body could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// `connect()` has not been called.
    #[error("not connected")]
    NotConnected,
}

impl TransportError {
    /// HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status } => Some(*status),
            _ => None,
        }
    }
}

/// Transport trait for talking to the messaging service.
///
/// Implementations handle the underlying connection mechanism
/// (HTTP, mock, etc).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Build a fresh connection. Any access header is dropped.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Add or replace the `X-Line-Access` header.
    fn set_access_token(&self, token: &str);

    /// Perform one RPC.
    async fn call(&self, call: &Call) -> Result<RpcResponse, TransportError>;

    /// GET a JSON document with the fixed headers.
    ///
    /// `access`, if given, is sent as `X-Line-Access` on this request only.
    async fn get_json(
        &self,
        url: &str,
        access: Option<&str>,
    ) -> Result<serde_json::Value, TransportError>;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;
}
