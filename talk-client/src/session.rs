//! Session - the authenticated connection to the messaging service.
//!
//! [`Session`] owns the transport, the session token, the revision cursor,
//! the user's own profile and the contact/group/room collections. One
//! `tokio::sync::Mutex` guards all of it and is held for each RPC plus the
//! application of its result, so calls from the poller, the entity cache and
//! the application never interleave.
//!
//! # Architecture
//!
//! ```text
//! TalkClient ─┐
//! Poller ─────┼─→ Session ─→ Transport ─→ Network
//! EntityCache ┘      ↓
//!              talk-core (cursor, collections)
//! ```
//!
//! User-facing calls recover from an expired token on their own: on a
//! transport status 400 the session opens a fresh connection, replays the
//! stored token and retries the call once. `fetch_new_operations` leaves
//! that decision to the poller's reconnect state machine.

use std::sync::Arc;
use talk_core::{
    merge_groups, sort_contacts, Entity, EntityCollections, EntityKind, RevisionCursor,
};
use talk_types::{
    Call, Contact, Group, IdentityProvider, Message, MessageBox, Mid, MidType, Operation,
    Profile, Reply, Revision, Room, RpcResponse,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::transport::Transport;

/// Retry `$op` once after re-authenticating if it failed with an expired token.
macro_rules! with_reauth {
    ($session:expr, $state:ident, $op:expr) => {{
        match $op {
            Err(e) if e.is_auth_expired() => {
                warn!("Session token rejected, re-authenticating");
                $session.reauthenticate_locked(&mut $state).await?;
                $op
            }
            other => other,
        }
    }};
}

/// Mutable session state. Only touched with the session lock held.
#[derive(Default)]
struct SessionState {
    token: Option<String>,
    provider: Option<IdentityProvider>,
    cursor: RevisionCursor,
    profile: Option<Profile>,
    collections: EntityCollections,
}

// Don't leak the session token in debug output
impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("provider", &self.provider)
            .field("cursor", &self.cursor)
            .field("profile", &self.profile)
            .field("entities", &self.collections.len())
            .finish()
    }
}

/// The authenticated session.
///
/// Shared as `Arc<Session<T>>` between the client facade, the poller, the
/// entity cache and the credential exchange.
pub struct Session<T: Transport> {
    transport: T,
    config: ClientConfig,
    state: Mutex<SessionState>,
}

impl<T: Transport> Session<T> {
    /// Create an unauthenticated session.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Create a session already wrapped for sharing.
    pub fn shared(transport: T, config: ClientConfig) -> Arc<Self> {
        Arc::new(Self::new(transport, config))
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // =========================================================================
    // Raw calls
    // =========================================================================

    async fn call_locked(&self, state: &SessionState, call: Call) -> Result<Reply, ClientError> {
        if call.requires_auth() && state.token.as_deref().map_or(true, str::is_empty) {
            return Err(ClientError::NotAuthenticated);
        }

        debug!("Calling {}", call.method());
        match self.transport.call(&call).await? {
            RpcResponse::Ok(reply) => Ok(reply),
            RpcResponse::Exception(e) => Err(ClientError::Talk {
                code: e.code,
                reason: e.reason,
            }),
        }
    }

    /// Perform a single call under the session lock, without recovery.
    ///
    /// Authenticated calls fail with [`ClientError::NotAuthenticated`] while
    /// no token is installed.
    pub async fn call(&self, call: Call) -> Result<Reply, ClientError> {
        let state = self.state.lock().await;
        self.call_locked(&state, call).await
    }

    /// GET a JSON document, presenting `access` on this request only.
    ///
    /// Used by the login handshake to present its verifier. The session lock
    /// is not taken and the installed access token is left as it is, so the
    /// wait does not hold up other calls.
    pub async fn get_json_with_access(
        &self,
        url: &str,
        access: &str,
    ) -> Result<serde_json::Value, ClientError> {
        Ok(self.transport.get_json(url, Some(access)).await?)
    }

    /// GET a JSON document without an access header.
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value, ClientError> {
        Ok(self.transport.get_json(url, None).await?)
    }

    /// Open a connection if the transport has none yet.
    pub async fn ensure_connected(&self) -> Result<(), ClientError> {
        let _state = self.state.lock().await;
        if !self.transport.is_connected() {
            self.transport.connect().await?;
        }
        Ok(())
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Install `token` and eagerly load the session.
    ///
    /// Loads, in order: last revision (seeds the cursor), own profile, groups,
    /// contacts, rooms. The first failure aborts and is returned; state loaded
    /// by earlier steps is kept.
    pub async fn authenticate_with_token(&self, token: &str) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        if !self.transport.is_connected() {
            self.transport.connect().await?;
        }
        self.authenticate_locked(&mut state, token).await
    }

    async fn authenticate_locked(
        &self,
        state: &mut SessionState,
        token: &str,
    ) -> Result<(), ClientError> {
        if token.is_empty() {
            return Err(ClientError::NotAuthenticated);
        }

        state.token = Some(token.to_string());
        self.transport.set_access_token(token);

        self.refresh_revision_locked(state).await?;
        self.refresh_profile_locked(state).await?;
        self.refresh_groups_locked(state).await?;
        self.refresh_contacts_locked(state).await?;
        self.refresh_rooms_locked(state).await?;

        info!(
            "Authenticated at revision {} ({} contacts, {} groups, {} rooms)",
            state.cursor.current(),
            state.collections.contacts.len(),
            state.collections.groups.len(),
            state.collections.rooms.len()
        );
        Ok(())
    }

    async fn reauthenticate_locked(&self, state: &mut SessionState) -> Result<(), ClientError> {
        let token = state.token.clone().ok_or(ClientError::NotAuthenticated)?;
        self.transport.connect().await?;
        self.authenticate_locked(state, &token).await
    }

    /// Open a fresh connection and replay the stored token.
    pub async fn reconnect(&self) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        info!("Reconnecting with stored token");
        self.reauthenticate_locked(&mut state).await
    }

    /// Forget the session token and profile (logout).
    pub async fn clear_token(&self) {
        let mut state = self.state.lock().await;
        state.token = None;
        state.profile = None;
        info!("Session token cleared");
    }

    /// Record which identity provider the login used.
    pub async fn set_provider(&self, provider: IdentityProvider) {
        self.state.lock().await.provider = Some(provider);
    }

    // =========================================================================
    // Refresh (locked, no recovery)
    // =========================================================================

    async fn refresh_revision_locked(&self, state: &mut SessionState) -> Result<(), ClientError> {
        let revision = match self.call_locked(state, Call::GetLastOpRevision).await? {
            Reply::Revision(revision) => revision,
            _ => return Err(unexpected(&Call::GetLastOpRevision)),
        };
        state.cursor.advance_to(revision);
        debug!("Cursor at revision {}", state.cursor.current());
        Ok(())
    }

    async fn refresh_profile_locked(&self, state: &mut SessionState) -> Result<(), ClientError> {
        match self.call_locked(state, Call::GetProfile).await? {
            Reply::Profile(profile) => {
                state.profile = Some(profile);
                Ok(())
            }
            _ => Err(unexpected(&Call::GetProfile)),
        }
    }

    async fn fetch_ids(&self, state: &SessionState, call: Call) -> Result<Vec<Mid>, ClientError> {
        let method = call.method();
        match self.call_locked(state, call).await? {
            Reply::Ids(ids) => Ok(ids),
            _ => Err(ClientError::UnexpectedReply { method }),
        }
    }

    async fn fetch_groups(
        &self,
        state: &SessionState,
        ids: Vec<Mid>,
    ) -> Result<Vec<Group>, ClientError> {
        match self.call_locked(state, Call::GetGroups { ids }).await? {
            Reply::Groups(groups) => Ok(groups),
            _ => Err(ClientError::UnexpectedReply {
                method: "getGroups",
            }),
        }
    }

    async fn refresh_contacts_locked(&self, state: &mut SessionState) -> Result<(), ClientError> {
        let ids = self.fetch_ids(state, Call::GetAllContactIds).await?;
        let mut contacts = match self.call_locked(state, Call::GetContacts { ids }).await? {
            Reply::Contacts(contacts) => contacts,
            _ => {
                return Err(ClientError::UnexpectedReply {
                    method: "getContacts",
                })
            }
        };
        sort_contacts(&mut contacts);
        debug!("Loaded {} contacts", contacts.len());
        state.collections.contacts = contacts;
        Ok(())
    }

    async fn refresh_groups_locked(&self, state: &mut SessionState) -> Result<(), ClientError> {
        let joined_ids = self.fetch_ids(state, Call::GetGroupIdsJoined).await?;
        let invited_ids = self.fetch_ids(state, Call::GetGroupIdsInvited).await?;
        let joined = self.fetch_groups(state, joined_ids).await?;
        let invited = self.fetch_groups(state, invited_ids).await?;

        let groups = merge_groups(invited, joined);
        debug!("Loaded {} groups", groups.len());
        state.collections.groups = groups;
        Ok(())
    }

    async fn refresh_rooms_locked(&self, state: &mut SessionState) -> Result<(), ClientError> {
        let count = self.config.room_page_size.max(1);
        let mut start = 1;
        let mut rooms = Vec::new();

        loop {
            let page = match self
                .call_locked(state, Call::GetMessageBoxWrapUpList { start, count })
                .await?
            {
                Reply::MessageBoxes(page) => page,
                _ => {
                    return Err(ClientError::UnexpectedReply {
                        method: "getMessageBoxWrapUpList",
                    })
                }
            };

            for wrap_up in page.iter().filter(|w| w.message_box.mid_type == MidType::Room) {
                let room_id = wrap_up.message_box.id.clone();
                match self.call_locked(state, Call::GetRoom { room_id }).await? {
                    Reply::Room(room) => rooms.push(room),
                    _ => return Err(ClientError::UnexpectedReply { method: "getRoom" }),
                }
            }

            if page.len() < count as usize {
                break;
            }
            start += count;
        }

        debug!("Loaded {} rooms", rooms.len());
        state.collections.rooms = rooms;
        Ok(())
    }

    async fn refresh_kind_locked(
        &self,
        state: &mut SessionState,
        kind: EntityKind,
    ) -> Result<(), ClientError> {
        match kind {
            EntityKind::Contact => self.refresh_contacts_locked(state).await,
            EntityKind::Group => self.refresh_groups_locked(state).await,
            EntityKind::Room => self.refresh_rooms_locked(state).await,
        }
    }

    // =========================================================================
    // Refresh (recovering)
    // =========================================================================

    /// Reload the last revision. The cursor never moves backwards.
    pub async fn refresh_revision(&self) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        with_reauth!(self, state, self.refresh_revision_locked(&mut state).await)
    }

    /// Reload the user's own profile.
    pub async fn refresh_profile(&self) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        with_reauth!(self, state, self.refresh_profile_locked(&mut state).await)
    }

    /// Reload contacts, sorted by display name.
    pub async fn refresh_contacts(&self) -> Result<(), ClientError> {
        self.refresh(EntityKind::Contact).await
    }

    /// Reload invited and joined groups, sorted by name.
    pub async fn refresh_groups(&self) -> Result<(), ClientError> {
        self.refresh(EntityKind::Group).await
    }

    /// Reload rooms from the message box listing.
    pub async fn refresh_rooms(&self) -> Result<(), ClientError> {
        self.refresh(EntityKind::Room).await
    }

    /// Reload one collection.
    pub async fn refresh(&self, kind: EntityKind) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        with_reauth!(self, state, self.refresh_kind_locked(&mut state, kind).await)
    }

    // =========================================================================
    // Messaging
    // =========================================================================

    /// Message box of the conversation with `mid`.
    pub async fn get_message_box(&self, mid: &Mid) -> Result<MessageBox, ClientError> {
        let mut state = self.state.lock().await;
        let call = || Call::GetMessageBoxCompactWrapUp { mid: mid.clone() };
        let reply = with_reauth!(self, state, self.call_locked(&state, call()).await)?;
        match reply {
            Reply::MessageBox(wrap_up) => Ok(wrap_up.message_box),
            _ => Err(unexpected(&call())),
        }
    }

    /// The `count` most recent messages of a box.
    pub async fn get_recent_messages(
        &self,
        message_box_id: &Mid,
        count: i32,
    ) -> Result<Vec<Message>, ClientError> {
        let mut state = self.state.lock().await;
        let call = || Call::GetRecentMessages {
            message_box_id: message_box_id.clone(),
            count,
        };
        let reply = with_reauth!(self, state, self.call_locked(&state, call()).await)?;
        match reply {
            Reply::Messages(messages) => Ok(messages),
            _ => Err(unexpected(&call())),
        }
    }

    /// Send a text message to a contact, group or room.
    ///
    /// Returns the message as accepted by the service.
    pub async fn send_text(&self, to: &Mid, text: &str) -> Result<Message, ClientError> {
        let mut state = self.state.lock().await;
        let mut message = Message::text(to.clone(), text);
        if let Some(profile) = &state.profile {
            message.from = profile.mid.clone();
        }
        let call = || Call::SendMessage {
            seq: 0,
            message: message.clone(),
        };

        let reply = with_reauth!(self, state, self.call_locked(&state, call()).await)?;
        debug!("Sent message to {}", to);
        match reply {
            Reply::Message(sent) => Ok(sent),
            Reply::Unit => Ok(message),
            _ => Err(ClientError::UnexpectedReply {
                method: "sendMessage",
            }),
        }
    }

    /// Fetch up to `count` operations after the cursor.
    ///
    /// The cursor advances to the highest revision in the batch. No recovery
    /// is attempted here.
    pub async fn fetch_new_operations(&self, count: i32) -> Result<Vec<Operation>, ClientError> {
        let mut state = self.state.lock().await;
        let call = Call::FetchOperations {
            local_revision: state.cursor.current(),
            count,
        };

        let operations = match self.call_locked(&state, call).await? {
            Reply::Operations(operations) => operations,
            _ => {
                return Err(ClientError::UnexpectedReply {
                    method: "fetchOperations",
                })
            }
        };

        if let Some(max) = operations.iter().map(|op| op.revision).max() {
            state.cursor.advance_to(max);
        }
        Ok(operations)
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Check whether a session token is installed.
    pub async fn is_authenticated(&self) -> bool {
        self.state.lock().await.token.is_some()
    }

    /// The session token.
    pub async fn token(&self) -> Option<String> {
        self.state.lock().await.token.clone()
    }

    /// The identity provider of the last login.
    pub async fn provider(&self) -> Option<IdentityProvider> {
        self.state.lock().await.provider
    }

    /// The revision cursor.
    pub async fn cursor(&self) -> Revision {
        self.state.lock().await.cursor.current()
    }

    /// The user's own profile.
    pub async fn profile(&self) -> Option<Profile> {
        self.state.lock().await.profile.clone()
    }

    /// Contacts, sorted by display name.
    pub async fn contacts(&self) -> Vec<Contact> {
        self.state.lock().await.collections.contacts.clone()
    }

    /// Groups, sorted by name.
    pub async fn groups(&self) -> Vec<Group> {
        self.state.lock().await.collections.groups.clone()
    }

    /// Rooms.
    pub async fn rooms(&self) -> Vec<Room> {
        self.state.lock().await.collections.rooms.clone()
    }

    /// All three collections.
    pub async fn collections(&self) -> EntityCollections {
        self.state.lock().await.collections.clone()
    }

    /// Find an entity in memory, without refreshing.
    pub async fn find(&self, id: &Mid) -> Option<Entity> {
        self.state.lock().await.collections.find(id)
    }

    /// Find an entity in one in-memory collection.
    pub async fn find_kind(&self, kind: EntityKind, id: &Mid) -> Option<Entity> {
        self.state.lock().await.collections.find_kind(kind, id)
    }
}

fn unexpected(call: &Call) -> ClientError {
    ClientError::UnexpectedReply {
        method: call.method(),
    }
}

/// Script a [`MockTransport`](crate::MockTransport) with an empty account.
#[cfg(test)]
pub(crate) fn script_empty_account(
    transport: &crate::MockTransport,
    self_mid: &str,
    revision: i64,
) {
    transport.set_default_reply("getLastOpRevision", Reply::Revision(Revision::new(revision)));
    transport.set_default_reply(
        "getProfile",
        Reply::Profile(Profile {
            mid: Mid::from(self_mid),
            display_name: "Me".into(),
            status_message: String::new(),
        }),
    );
    transport.set_default_reply("getGroupIdsJoined", Reply::Ids(vec![]));
    transport.set_default_reply("getGroupIdsInvited", Reply::Ids(vec![]));
    transport.set_default_reply("getGroups", Reply::Groups(vec![]));
    transport.set_default_reply("getAllContactIds", Reply::Ids(vec![]));
    transport.set_default_reply("getContacts", Reply::Contacts(vec![]));
    transport.set_default_reply("getMessageBoxWrapUpList", Reply::MessageBoxes(vec![]));
}
