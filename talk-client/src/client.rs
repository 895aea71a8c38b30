//! TalkClient - the main interface for talksync.
//!
//! This module provides [`TalkClient`], the API the UI layer drives: login,
//! resume, logout, sending, refreshing, opening conversations and running the
//! background poller.
//!
//! # Architecture
//!
//! ```text
//! Application → TalkClient → Session → Transport → Network
//!                   ↓           ↑
//!            Poller task ───────┘
//!                   ↓
//!              MessageSink (UI)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use talk_client::{ChannelSink, ClientConfig, HttpTransport, TalkClient};
//!
//! let config = ClientConfig::default();
//! let client = TalkClient::new(config.clone(), HttpTransport::new(&config));
//!
//! let pending = client.login("alice@example.com", "secret").await?;
//! println!("Enter {} on your phone", pending.pincode());
//! let token = pending.wait().await?;
//!
//! let (sink, mut events) = ChannelSink::new(64);
//! let poller = client.spawn_poller(sink);
//! ```

use std::sync::{Arc, Mutex};
use talk_core::{Entity, EntityCollections};
use talk_types::{Message, MessageBox, Mid};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ClientConfig;
use crate::device::DeviceInfo;
use crate::entity_cache::EntityCache;
use crate::error::ClientError;
use crate::login::CredentialExchange;
use crate::poller::{MessageSink, PollExit, Poller};
use crate::session::Session;
use crate::transport::Transport;

/// An opened conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    /// The conversation's message box.
    pub message_box: MessageBox,
    /// Most recent messages, as returned by the service.
    pub recent: Vec<Message>,
}

/// A login waiting for pincode confirmation.
pub struct PendingLogin<T: Transport> {
    pincode: String,
    exchange: CredentialExchange<T>,
    session: Arc<Session<T>>,
    cancel: CancellationToken,
}

impl<T: Transport> PendingLogin<T> {
    /// Pincode to show the user.
    pub fn pincode(&self) -> &str {
        &self.pincode
    }

    /// Token that cancels the wait.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for confirmation, then authenticate the session.
    ///
    /// Returns the session token for the caller to persist.
    pub async fn wait(self) -> Result<String, ClientError> {
        let token = self.exchange.await_verified_token(&self.cancel).await?;
        self.session.authenticate_with_token(&token).await?;
        Ok(token)
    }
}

/// Handle to a running poller task.
pub struct PollerHandle {
    stop: CancellationToken,
    handle: JoinHandle<PollExit>,
}

impl PollerHandle {
    /// Ask the poller to stop after its current cycle.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    /// Check whether the poller task has ended.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the poller task to end.
    pub async fn join(self) -> Result<PollExit, JoinError> {
        self.handle.await
    }
}

/// The messaging client.
pub struct TalkClient<T: Transport> {
    config: ClientConfig,
    session: Arc<Session<T>>,
    entities: EntityCache<T>,
    device: DeviceInfo,
    login_cancel: Mutex<Option<CancellationToken>>,
}

impl<T: Transport + 'static> TalkClient<T> {
    /// Create a new client.
    pub fn new(config: ClientConfig, transport: T) -> Self {
        let session = Session::shared(transport, config.clone());
        Self {
            entities: EntityCache::new(Arc::clone(&session)),
            session,
            config,
            device: DeviceInfo::detect(),
            login_cancel: Mutex::new(None),
        }
    }

    /// Override the device metadata sent at login.
    pub fn with_device(mut self, device: DeviceInfo) -> Self {
        self.device = device;
        self
    }

    /// The shared session.
    pub fn session(&self) -> &Arc<Session<T>> {
        &self.session
    }

    /// Start a login. The returned [`PendingLogin`] carries the pincode.
    pub async fn login(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<PendingLogin<T>, ClientError> {
        let exchange = CredentialExchange::new(Arc::clone(&self.session), self.device.clone());
        let pincode = exchange.request_pincode(identifier, secret).await?;

        let cancel = CancellationToken::new();
        *self
            .login_cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(cancel.clone());

        Ok(PendingLogin {
            pincode,
            exchange,
            session: Arc::clone(&self.session),
            cancel,
        })
    }

    /// Cancel the pending login, if any.
    pub fn cancel_login(&self) {
        let cancel = self
            .login_cancel
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(cancel) = cancel {
            cancel.cancel();
        }
    }

    /// Authenticate with a stored token.
    pub async fn resume(&self, token: &str) -> Result<(), ClientError> {
        self.session.authenticate_with_token(token).await
    }

    /// Forget the session token.
    pub async fn logout(&self) {
        self.session.clear_token().await;
    }

    /// Send a text message.
    pub async fn send_text(&self, to: &Mid, text: &str) -> Result<Message, ClientError> {
        self.session.send_text(to, text).await
    }

    /// Reload profile, groups, contacts and rooms.
    pub async fn refresh_all(&self) -> Result<(), ClientError> {
        self.session.refresh_profile().await?;
        self.session.refresh_groups().await?;
        self.session.refresh_contacts().await?;
        self.session.refresh_rooms().await?;
        info!("Refreshed all entities");
        Ok(())
    }

    /// Open a conversation: its message box and the most recent messages.
    pub async fn open_conversation(&self, entity: &Entity) -> Result<Conversation, ClientError> {
        let message_box = self.session.get_message_box(entity.id()).await?;
        let recent = self
            .session
            .get_recent_messages(&message_box.id, self.config.recent_message_count)
            .await?;
        Ok(Conversation {
            message_box,
            recent,
        })
    }

    /// Resolve an identifier to an entity, refreshing on a miss.
    pub async fn resolve(&self, id: &Mid) -> Result<Option<Entity>, ClientError> {
        self.entities.resolve(id).await
    }

    /// The entity resolver, for use by the UI layer's sink.
    pub fn entity_cache(&self) -> EntityCache<T> {
        self.entities.clone()
    }

    /// Sorted contacts, groups and rooms.
    pub async fn entities(&self) -> EntityCollections {
        self.session.collections().await
    }

    /// Start the background poller.
    pub fn spawn_poller<S: MessageSink + 'static>(&self, sink: S) -> PollerHandle {
        let stop = CancellationToken::new();
        let poller = Poller::new(Arc::clone(&self.session), sink, self.config.poll.clone());
        let handle = tokio::spawn(poller.run(stop.clone()));
        PollerHandle { stop, handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::{ChannelSink, SinkEvent};
    use crate::session::script_empty_account;
    use crate::MockTransport;
    use rsa::traits::PublicKeyParts;
    use rsa::RsaPrivateKey;
    use serde_json::json;
    use std::time::Duration;
    use talk_types::{
        Call, Contact, LoginResult, LoginResultType, MessageBoxWrapUp, MidType, OpType,
        Operation, Reply, Revision,
    };

    fn client(transport: &MockTransport) -> TalkClient<MockTransport> {
        let config = ClientConfig::default()
            .with_base_url("http://talk.test")
            .with_poll_interval(Duration::from_millis(1));
        TalkClient::new(config, transport.clone()).with_device(DeviceInfo::new("10.0.0.1", "host"))
    }

    fn script_login(transport: &MockTransport) {
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 1024)
            .unwrap()
            .to_public_key();
        transport.queue_json(
            "http://talk.test/authct/v1/keys/line",
            json!({
                "session_key": "sk",
                "rsa_key": format!(
                    "k,{},{}",
                    hex::encode(key.n().to_bytes_be()),
                    hex::encode(key.e().to_bytes_be())
                ),
            }),
        );
        transport.queue_reply(
            "loginWithIdentityCredentialForCertificate",
            Reply::Login(LoginResult {
                result_type: LoginResultType::Success,
                auth_token: None,
                verifier: Some("v1".into()),
                pin_code: Some("4321".into()),
            }),
        );
    }

    #[tokio::test]
    async fn login_then_wait_authenticates() {
        let transport = MockTransport::new();
        script_empty_account(&transport, "u-me", 3);
        script_login(&transport);
        transport.queue_json("http://talk.test/Q", json!({"result": {"verifier": "v2"}}));
        transport.queue_reply(
            "loginWithVerifierForCertificate",
            Reply::Login(LoginResult {
                result_type: LoginResultType::Success,
                auth_token: Some("durable".into()),
                verifier: None,
                pin_code: None,
            }),
        );
        let client = client(&transport);

        let pending = client.login("me@example.com", "pw").await.unwrap();
        assert_eq!(pending.pincode(), "4321");

        let token = pending.wait().await.unwrap();

        assert_eq!(token, "durable");
        assert_eq!(client.session().token().await.as_deref(), Some("durable"));
        assert_eq!(transport.current_access_token().as_deref(), Some("durable"));
        assert_eq!(client.session().cursor().await, Revision::new(3));
    }

    #[tokio::test]
    async fn cancel_login_ends_wait() {
        let transport = MockTransport::new();
        script_login(&transport);
        let client = client(&transport);

        let pending = client.login("me@example.com", "pw").await.unwrap();
        client.cancel_login();

        assert!(matches!(pending.wait().await, Err(ClientError::Cancelled)));
        assert!(client.session().token().await.is_none());
    }

    #[tokio::test]
    async fn resume_and_logout() {
        let transport = MockTransport::new();
        script_empty_account(&transport, "u-me", 1);
        let client = client(&transport);

        client.resume("stored").await.unwrap();
        assert!(client.session().is_authenticated().await);

        client.logout().await;
        assert!(!client.session().is_authenticated().await);
        assert!(matches!(
            client.send_text(&Mid::from("u-x"), "hi").await,
            Err(ClientError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn open_conversation_loads_recent_messages() {
        let transport = MockTransport::new();
        script_empty_account(&transport, "u-me", 1);
        transport.queue_reply("getContacts", Reply::Contacts(vec![Contact::new("u-x", "X")]));
        transport.queue_reply(
            "getMessageBoxCompactWrapUp",
            Reply::MessageBox(MessageBoxWrapUp {
                message_box: MessageBox {
                    id: Mid::from("u-x"),
                    mid_type: MidType::User,
                    last_seq: 4,
                },
            }),
        );
        transport.queue_reply(
            "getRecentMessages",
            Reply::Messages(vec![Message::text("u-x", "a"), Message::text("u-x", "b")]),
        );
        let client = client(&transport);
        client.resume("tok").await.unwrap();

        let entity = client.resolve(&Mid::from("u-x")).await.unwrap().unwrap();
        let conversation = client.open_conversation(&entity).await.unwrap();

        assert_eq!(conversation.message_box.last_seq, 4);
        assert_eq!(conversation.recent.len(), 2);
        assert!(matches!(
            transport.calls().pop(),
            Some(Call::GetRecentMessages { count: 20, .. })
        ));
    }

    #[tokio::test]
    async fn refresh_all_reloads_everything() {
        let transport = MockTransport::new();
        script_empty_account(&transport, "u-me", 1);
        let client = client(&transport);
        client.resume("tok").await.unwrap();
        transport.clear_calls();

        client.refresh_all().await.unwrap();

        assert_eq!(transport.call_count("getProfile"), 1);
        assert_eq!(transport.call_count("getGroupIdsJoined"), 1);
        assert_eq!(transport.call_count("getAllContactIds"), 1);
        assert_eq!(transport.call_count("getMessageBoxWrapUpList"), 1);
        assert!(client.entities().await.is_empty());
    }

    #[tokio::test]
    async fn spawned_poller_delivers_and_stops() {
        let transport = MockTransport::new();
        script_empty_account(&transport, "u-me", 0);
        transport.set_default_reply("fetchOperations", Reply::Operations(vec![]));
        let mut message = Message::text("u-me", "hello");
        message.from = Mid::from("u-y");
        transport.queue_reply(
            "fetchOperations",
            Reply::Operations(vec![Operation {
                revision: Revision::new(1),
                op_type: OpType::ReceiveMessage,
                message: Some(message),
            }]),
        );
        let client = client(&transport);
        client.resume("tok").await.unwrap();

        let (sink, mut events) = ChannelSink::new(8);
        let handle = client.spawn_poller(sink);

        let event = events.recv().await.unwrap();
        assert!(matches!(
            event,
            SinkEvent::Message { ref conversation, .. } if conversation == "u-y"
        ));

        handle.stop();
        assert_eq!(handle.join().await.unwrap(), PollExit::Stopped);
    }
}
