//! List contacts, groups and rooms.

use anyhow::Result;
use std::path::Path;
use talk_client::{ClientConfig, TalkClient, Transport};
use talk_core::room_name;

use super::resumed_client;

/// Run the list command.
pub async fn run(data_dir: &Path, config: ClientConfig) -> Result<()> {
    let client = resumed_client(data_dir, config).await?;
    for line in execute(&client).await {
        println!("{}", line);
    }
    Ok(())
}

/// Render the sorted entity lists.
pub async fn execute<T: Transport + 'static>(client: &TalkClient<T>) -> Vec<String> {
    let entities = client.entities().await;
    let mut lines = Vec::with_capacity(entities.len() + 3);

    lines.push(format!("Contacts ({}):", entities.contacts.len()));
    for contact in &entities.contacts {
        lines.push(format!("  {}  {}", contact.mid, contact.display_name));
    }

    lines.push(format!("Groups ({}):", entities.groups.len()));
    for group in &entities.groups {
        lines.push(format!(
            "  {}  {} [{} members]",
            group.id,
            group.name,
            group.members.len()
        ));
    }

    lines.push(format!("Rooms ({}):", entities.rooms.len()));
    for room in &entities.rooms {
        lines.push(format!("  {}  {}", room.mid, room_name(room)));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing;
    use talk_client::MockTransport;
    use talk_types::{Contact, Reply};

    #[tokio::test]
    async fn contacts_are_listed_sorted() {
        let transport = MockTransport::new();
        transport.queue_reply(
            "getContacts",
            Reply::Contacts(vec![Contact::new("u-2", "zoe"), Contact::new("u-1", "Adam")]),
        );
        let client = testing::client(&transport).await;

        let lines = execute(&client).await;

        assert_eq!(
            lines,
            vec![
                "Contacts (2):",
                "  u-1  Adam",
                "  u-2  zoe",
                "Groups (0):",
                "Rooms (0):",
            ]
        );
    }
}
