//! CLI command implementations.

pub mod history;
pub mod list;
pub mod listen;
pub mod login;
pub mod logout;
pub mod send;

use anyhow::{Context, Result};
use std::path::Path;
use talk_client::{ClientConfig, HttpTransport, TalkClient, Transport};
use talk_core::Entity;
use talk_types::{ContentType, Message, Mid};

use crate::config::Settings;

/// Build a client and authenticate it with the stored token.
pub async fn resumed_client(
    data_dir: &Path,
    config: ClientConfig,
) -> Result<TalkClient<HttpTransport>> {
    let settings = Settings::load(data_dir).await?;
    let token = settings.require_token()?;

    let transport = HttpTransport::new(&config);
    let client = TalkClient::new(config, transport);
    client
        .resume(token)
        .await
        .context("Failed to resume session. Run 'talk-cli login' again.")?;
    Ok(client)
}

/// Resolve `id` to a contact, group or room, or fail with a readable error.
pub async fn resolve_entity<T: Transport + 'static>(
    client: &TalkClient<T>,
    id: &str,
) -> Result<Entity> {
    client
        .resolve(&Mid::from(id))
        .await?
        .with_context(|| format!("Unknown contact, group or room: {}", id))
}

/// Display name for the sender of a message.
pub async fn sender_name<T: Transport + 'static>(client: &TalkClient<T>, from: &Mid) -> String {
    if let Some(profile) = client.session().profile().await {
        if profile.mid == *from {
            return "me".to_string();
        }
    }
    match client.resolve(from).await {
        Ok(Some(entity)) => entity.name().to_string(),
        _ => from.to_string(),
    }
}

/// Render a message body for the terminal.
pub fn message_body(message: &Message) -> String {
    match (message.content_type, &message.text) {
        (ContentType::None, Some(text)) => text.clone(),
        (ContentType::None, None) => String::new(),
        (ContentType::Image, _) => "[image]".to_string(),
        (ContentType::Video, _) => "[video]".to_string(),
        (ContentType::Audio, _) => "[audio]".to_string(),
        (ContentType::Sticker, _) => "[sticker]".to_string(),
        (ContentType::Other, _) => "[attachment]".to_string(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use talk_client::{ClientConfig, DeviceInfo, MockTransport, TalkClient};
    use talk_types::{Mid, Profile, Reply, Revision};

    /// Client over a mock account owned by `u-me`, already authenticated.
    pub async fn client(transport: &MockTransport) -> TalkClient<MockTransport> {
        client_with_config(transport, ClientConfig::default()).await
    }

    /// Like [`client`], with a custom configuration.
    pub async fn client_with_config(
        transport: &MockTransport,
        config: ClientConfig,
    ) -> TalkClient<MockTransport> {
        transport.set_default_reply("getLastOpRevision", Reply::Revision(Revision::new(1)));
        transport.set_default_reply(
            "getProfile",
            Reply::Profile(Profile {
                mid: Mid::from("u-me"),
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

        let client = TalkClient::new(config, transport.clone())
            .with_device(DeviceInfo::new("10.0.0.1", "test"));
        client.resume("tok").await.unwrap();
        client
    }
}
