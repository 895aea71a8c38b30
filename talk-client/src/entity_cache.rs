//! Entity resolution with refresh on miss.

use std::sync::Arc;
use talk_core::{Entity, EntityKind};
use talk_types::Mid;
use tracing::debug;

use crate::error::ClientError;
use crate::session::Session;
use crate::transport::Transport;

/// Resolves identifiers to contacts, groups and rooms.
///
/// The collections live in the [`Session`]; this type adds the
/// refresh-on-miss policy.
pub struct EntityCache<T: Transport> {
    session: Arc<Session<T>>,
}

impl<T: Transport> Clone for EntityCache<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
        }
    }
}

impl<T: Transport> EntityCache<T> {
    /// Create a cache over `session`.
    pub fn new(session: Arc<Session<T>>) -> Self {
        Self { session }
    }

    /// Resolve `id` to an entity.
    ///
    /// Looks in memory first (contacts, groups, rooms). On a miss, refreshes
    /// contacts, groups and rooms in turn, checking the refreshed collection
    /// after each. `Ok(None)` means the id is unknown; refresh errors are
    /// returned as-is.
    pub async fn resolve(&self, id: &Mid) -> Result<Option<Entity>, ClientError> {
        if let Some(entity) = self.session.find(id).await {
            return Ok(Some(entity));
        }

        for kind in [EntityKind::Contact, EntityKind::Group, EntityKind::Room] {
            debug!("Entity {} not cached, refreshing {:?}", id, kind);
            self.session.refresh(kind).await?;
            if let Some(entity) = self.session.find_kind(kind, id).await {
                return Ok(Some(entity));
            }
        }

        debug!("Entity {} not found", id);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::script_empty_account;
    use crate::transport::TransportError;
    use crate::MockTransport;
    use talk_types::{Contact, Group, Reply};

    async fn cache(transport: &MockTransport) -> EntityCache<MockTransport> {
        script_empty_account(transport, "u-me", 1);
        let session = Session::shared(transport.clone(), ClientConfig::default());
        session.authenticate_with_token("tok").await.unwrap();
        transport.clear_calls();
        EntityCache::new(session)
    }

    #[tokio::test]
    async fn cached_entity_needs_no_refresh() {
        let transport = MockTransport::new();
        transport.queue_reply("getContacts", Reply::Contacts(vec![Contact::new("u-1", "Ann")]));
        let cache = cache(&transport).await;

        let entity = cache.resolve(&Mid::from("u-1")).await.unwrap().unwrap();

        assert_eq!(entity.kind(), EntityKind::Contact);
        assert_eq!(entity.name(), "Ann");
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn group_found_after_contacts_then_groups_refresh() {
        let transport = MockTransport::new();
        let cache = cache(&transport).await;

        // the group only exists server-side from now on
        transport.set_default_reply("getGroupIdsJoined", Reply::Ids(vec![Mid::from("g-1")]));
        transport.queue_reply("getGroups", Reply::Groups(vec![Group::new("g-1", "Team")]));
        transport.queue_reply("getGroups", Reply::Groups(vec![]));

        let entity = cache.resolve(&Mid::from("g-1")).await.unwrap().unwrap();
        assert_eq!(entity.kind(), EntityKind::Group);
        assert_eq!(entity.name(), "Team");
        assert_eq!(
            transport.methods(),
            vec![
                "getAllContactIds",
                "getContacts",
                "getGroupIdsJoined",
                "getGroupIdsInvited",
                "getGroups",
                "getGroups",
            ]
        );

        transport.clear_calls();
        let again = cache.resolve(&Mid::from("g-1")).await.unwrap().unwrap();
        assert_eq!(again.id(), "g-1");
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_id_is_clean_miss() {
        let transport = MockTransport::new();
        let cache = cache(&transport).await;

        let result = cache.resolve(&Mid::from("nobody")).await.unwrap();

        assert!(result.is_none());
        assert_eq!(transport.call_count("getAllContactIds"), 1);
        assert_eq!(transport.call_count("getGroupIdsJoined"), 1);
        assert_eq!(transport.call_count("getMessageBoxWrapUpList"), 1);
    }

    #[tokio::test]
    async fn refresh_error_aborts_resolution() {
        let transport = MockTransport::new();
        let cache = cache(&transport).await;
        transport.queue_error("getAllContactIds", TransportError::Network("reset".into()));

        let result = cache.resolve(&Mid::from("u-9")).await;

        assert!(matches!(result, Err(ClientError::Transport(_))));
        assert_eq!(transport.call_count("getGroupIdsJoined"), 0);
    }
}
