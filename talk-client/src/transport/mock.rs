//! Mock transport for testing.
//!
//! Allows scripting replies per remote method and capturing the calls and
//! access tokens the client produced for verification.

use super::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use talk_types::{Call, Reply, RpcResponse, TalkException};

type Scripted<T> = Result<T, TransportError>;

/// Mock transport for testing.
///
/// Replies are looked up by method name: a one-shot queue is drained first,
/// then the sticky default applies. A call with neither fails with a
/// network error naming the method.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    connected: bool,
    connect_count: usize,
    access_token: Option<String>,
    token_log: Vec<String>,
    calls: Vec<Call>,
    queued: HashMap<String, VecDeque<Scripted<RpcResponse>>>,
    defaults: HashMap<String, Scripted<RpcResponse>>,
    json: HashMap<String, VecDeque<Scripted<serde_json::Value>>>,
    json_requests: Vec<(String, Option<String>)>,
    stalled: HashSet<String>,
    fail_next_connect: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock transport that is already connected.
    pub fn connected() -> Self {
        let transport = Self::new();
        transport.lock().connected = true;
        transport
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn queue(&self, method: &str, scripted: Scripted<RpcResponse>) {
        self.lock()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(scripted);
    }

    /// Queue a reply for the next call of `method`.
    pub fn queue_reply(&self, method: &str, reply: Reply) {
        self.queue(method, Ok(RpcResponse::Ok(reply)));
    }

    /// Queue a service exception for the next call of `method`.
    pub fn queue_exception(&self, method: &str, code: i32, reason: &str) {
        self.queue(
            method,
            Ok(RpcResponse::Exception(TalkException {
                code,
                reason: reason.to_string(),
            })),
        );
    }

    /// Queue a transport failure for the next call of `method`.
    pub fn queue_error(&self, method: &str, error: TransportError) {
        self.queue(method, Err(error));
    }

    /// Reply to every unqueued call of `method` with `reply`.
    pub fn set_default_reply(&self, method: &str, reply: Reply) {
        self.lock()
            .defaults
            .insert(method.to_string(), Ok(RpcResponse::Ok(reply)));
    }

    /// Fail every unqueued call of `method` with `error`.
    pub fn set_default_error(&self, method: &str, error: TransportError) {
        self.lock().defaults.insert(method.to_string(), Err(error));
    }

    /// Queue a JSON document for the next GET of `url`.
    pub fn queue_json(&self, url: &str, value: serde_json::Value) {
        self.lock()
            .json
            .entry(url.to_string())
            .or_default()
            .push_back(Ok(value));
    }

    /// Queue a failure for the next GET of `url`.
    pub fn queue_json_error(&self, url: &str, error: TransportError) {
        self.lock()
            .json
            .entry(url.to_string())
            .or_default()
            .push_back(Err(error));
    }

    /// Make every GET of `url` wait forever, like a verifier that is never
    /// confirmed.
    pub fn stall_json(&self, url: &str) {
        self.lock().stalled.insert(url.to_string());
    }

    /// All calls made, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Method names of all calls made, in order.
    pub fn methods(&self) -> Vec<&'static str> {
        self.lock().calls.iter().map(Call::method).collect()
    }

    /// Number of calls made to `method`.
    pub fn call_count(&self, method: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method() == method)
            .count()
    }

    /// Forget recorded calls (scripts are kept).
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Every access token installed, in order.
    pub fn access_tokens(&self) -> Vec<String> {
        self.lock().token_log.clone()
    }

    /// The access header currently installed.
    pub fn current_access_token(&self) -> Option<String> {
        self.lock().access_token.clone()
    }

    /// URLs fetched with `get_json`, paired with the access header sent.
    pub fn json_requests(&self) -> Vec<(String, Option<String>)> {
        self.lock().json_requests.clone()
    }

    /// Number of successful `connect()` calls.
    pub fn connect_count(&self) -> usize {
        self.lock().connect_count
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: &str) {
        self.lock().fail_next_connect = Some(error.to_string());
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let mut inner = self.lock();

        // Check for forced failure
        if let Some(error) = inner.fail_next_connect.take() {
            return Err(TransportError::Network(error));
        }

        inner.connected = true;
        inner.connect_count += 1;
        inner.access_token = None;
        Ok(())
    }

    fn set_access_token(&self, token: &str) {
        let mut inner = self.lock();
        inner.access_token = Some(token.to_string());
        inner.token_log.push(token.to_string());
    }

    async fn call(&self, call: &Call) -> Result<RpcResponse, TransportError> {
        let mut inner = self.lock();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }

        inner.calls.push(call.clone());
        let method = call.method();

        if let Some(scripted) = inner.queued.get_mut(method).and_then(VecDeque::pop_front) {
            return scripted;
        }

        inner.defaults.get(method).cloned().unwrap_or_else(|| {
            Err(TransportError::Network(format!(
                "no scripted reply for {}",
                method
            )))
        })
    }

    async fn get_json(
        &self,
        url: &str,
        access: Option<&str>,
    ) -> Result<serde_json::Value, TransportError> {
        let scripted = {
            let mut inner = self.lock();

            if !inner.connected {
                return Err(TransportError::NotConnected);
            }

            inner
                .json_requests
                .push((url.to_string(), access.map(str::to_string)));

            if inner.stalled.contains(url) {
                None
            } else {
                Some(
                    inner
                        .json
                        .get_mut(url)
                        .and_then(VecDeque::pop_front)
                        .unwrap_or_else(|| Err(TransportError::Http { status: 404 })),
                )
            }
        };

        match scripted {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }
}
