//! Show the recent messages of a conversation.

use anyhow::Result;
use std::path::Path;
use talk_client::{ClientConfig, TalkClient, Transport};

use super::{message_body, resolve_entity, resumed_client, sender_name};

/// Run the history command.
pub async fn run(data_dir: &Path, config: ClientConfig, id: &str) -> Result<()> {
    let client = resumed_client(data_dir, config).await?;
    for line in execute(&client, id).await? {
        println!("{}", line);
    }
    Ok(())
}

/// Render the header and recent messages of the conversation with `id`.
pub async fn execute<T: Transport + 'static>(
    client: &TalkClient<T>,
    id: &str,
) -> Result<Vec<String>> {
    let entity = resolve_entity(client, id).await?;
    let conversation = client.open_conversation(&entity).await?;

    let mut lines = vec![format!(
        "=== {} ({} messages) ===",
        entity.name(),
        conversation.recent.len()
    )];
    for message in &conversation.recent {
        let sender = sender_name(client, &message.from).await;
        lines.push(format!("{}: {}", sender, message_body(message)));
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use talk_client::MockTransport;
    use talk_types::{Contact, Message, MessageBox, MessageBoxWrapUp, Mid, MidType, Reply};

    #[tokio::test]
    async fn history_names_senders() {
        let transport = MockTransport::new();
        transport.queue_reply("getContacts", Reply::Contacts(vec![Contact::new("u-x", "Xena")]));
        transport.queue_reply(
            "getMessageBoxCompactWrapUp",
            Reply::MessageBox(MessageBoxWrapUp {
                message_box: MessageBox {
                    id: Mid::from("u-x"),
                    mid_type: MidType::User,
                    last_seq: 2,
                },
            }),
        );
        let mut incoming = Message::text("u-me", "hey");
        incoming.from = Mid::from("u-x");
        let mut outgoing = Message::text("u-x", "hello");
        outgoing.from = Mid::from("u-me");
        transport.queue_reply("getRecentMessages", Reply::Messages(vec![incoming, outgoing]));
        let client = testing::client(&transport).await;

        let lines = execute(&client, "u-x").await.unwrap();

        assert_eq!(
            lines,
            vec!["=== Xena (2 messages) ===", "Xena: hey", "me: hello"]
        );
    }
}
