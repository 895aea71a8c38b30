//! Send a text message.

use anyhow::Result;
use std::path::Path;
use talk_client::{ClientConfig, TalkClient, Transport};
use talk_types::Message;

use super::{resolve_entity, resumed_client};

/// Run the send command.
pub async fn run(data_dir: &Path, config: ClientConfig, id: &str, text: &str) -> Result<()> {
    let client = resumed_client(data_dir, config).await?;
    let (name, _) = execute(&client, id, text).await?;
    println!("Sent to {}", name);
    Ok(())
}

/// Send `text` to the entity `id`. Returns the entity name and sent message.
pub async fn execute<T: Transport + 'static>(
    client: &TalkClient<T>,
    id: &str,
    text: &str,
) -> Result<(String, Message)> {
    if text.is_empty() {
        anyhow::bail!("Refusing to send an empty message");
    }
    let entity = resolve_entity(client, id).await?;
    let sent = client.send_text(entity.id(), text).await?;
    Ok((entity.name().to_string(), sent))
}
