//! HTTP transport.
//!
//! RPC calls are POSTed as MessagePack bodies to the API endpoint. The fixed
//! headers are installed as client defaults on `connect()`; the access header
//! is attached per request so it can be replaced without a new client.

use super::{Transport, TransportError};
use crate::config::ClientConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{RequestBuilder, Response};
use std::sync::Mutex;
use talk_types::{Call, RpcResponse};

const ACCESS_HEADER: &str = "X-Line-Access";
const APPLICATION_HEADER: &str = "X-Line-Application";
const MSGPACK: &str = "application/x-msgpack";

/// Transport over `reqwest`.
pub struct HttpTransport {
    api_url: String,
    user_agent: String,
    application: String,
    inner: Mutex<HttpInner>,
}

#[derive(Default)]
struct HttpInner {
    client: Option<reqwest::Client>,
    access_token: Option<String>,
}

impl HttpTransport {
    /// Create a transport for the configured endpoint. Call `connect()` before use.
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            api_url: config.server.api_url(),
            user_agent: config.headers.user_agent.clone(),
            application: config.headers.application.clone(),
            inner: Mutex::new(HttpInner::default()),
        }
    }

    fn default_headers(&self) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|e| TransportError::Codec(format!("user agent: {}", e)))?,
        );
        headers.insert(
            APPLICATION_HEADER,
            HeaderValue::from_str(&self.application)
                .map_err(|e| TransportError::Codec(format!("application header: {}", e)))?,
        );
        Ok(headers)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HttpInner> {
        // A poisoned header set is still a valid header set
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot the client and access token without holding the lock across I/O.
    fn snapshot(&self) -> Result<(reqwest::Client, Option<String>), TransportError> {
        let inner = self.lock();
        let client = inner.client.clone().ok_or(TransportError::NotConnected)?;
        Ok((client, inner.access_token.clone()))
    }

    async fn send(
        request: RequestBuilder,
        access_token: Option<String>,
    ) -> Result<Response, TransportError> {
        let request = match access_token {
            Some(token) => request.header(ACCESS_HEADER, token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let client = reqwest::Client::builder()
            .default_headers(self.default_headers()?)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let mut inner = self.lock();
        inner.client = Some(client);
        inner.access_token = None;
        Ok(())
    }

    fn set_access_token(&self, token: &str) {
        self.lock().access_token = Some(token.to_string());
    }

    async fn call(&self, call: &Call) -> Result<RpcResponse, TransportError> {
        let (client, access_token) = self.snapshot()?;
        let body = call
            .to_bytes()
            .map_err(|e| TransportError::Codec(e.to_string()))?;

        let request = client
            .post(&self.api_url)
            .header(CONTENT_TYPE, MSGPACK)
            .body(body);
        let response = Self::send(request, access_token).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        RpcResponse::from_bytes(&bytes).map_err(|e| TransportError::Codec(e.to_string()))
    }

    async fn get_json(
        &self,
        url: &str,
        access: Option<&str>,
    ) -> Result<serde_json::Value, TransportError> {
        let (client, _) = self.snapshot()?;
        let response = Self::send(client.get(url), access.map(str::to_string)).await?;

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| TransportError::Codec(e.to_string()))
    }

    fn is_connected(&self) -> bool {
        self.lock().client.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_headers_are_valid() {
        let transport = HttpTransport::new(&ClientConfig::default());
        let headers = transport.default_headers().unwrap();
        assert_eq!(
            headers.get(USER_AGENT).unwrap(),
            "DESKTOP:MAC:10.9.4-MAVERICKS-x64(3.7.0)"
        );
        assert!(headers.contains_key(APPLICATION_HEADER));
    }

    #[tokio::test]
    async fn call_before_connect_fails() {
        let transport = HttpTransport::new(&ClientConfig::default());
        assert!(!transport.is_connected());

        let result = transport.call(&Call::GetProfile).await;
        assert_eq!(result, Err(TransportError::NotConnected));
    }

    #[tokio::test]
    async fn connect_drops_access_token() {
        let transport = HttpTransport::new(&ClientConfig::default());
        transport.connect().await.unwrap();
        transport.set_access_token("token");
        assert_eq!(transport.snapshot().unwrap().1.as_deref(), Some("token"));

        transport.connect().await.unwrap();
        assert!(transport.is_connected());
        assert!(transport.snapshot().unwrap().1.is_none());
    }
}
