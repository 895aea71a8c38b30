//! Print incoming messages until Ctrl-C.

use anyhow::Result;
use std::future::Future;
use std::path::Path;
use talk_client::{ChannelSink, ClientConfig, PollExit, SinkEvent, TalkClient, Transport};
use tracing::info;

use super::{message_body, resumed_client, sender_name};

/// Run the listen command.
pub async fn run(data_dir: &Path, config: ClientConfig) -> Result<()> {
    let client = resumed_client(data_dir, config).await?;
    println!("Listening for messages (Ctrl-C to stop)...");

    let stop = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    match execute(&client, stop, |line| println!("{}", line)).await? {
        PollExit::Stopped => Ok(()),
        PollExit::Fatal { failures } => {
            anyhow::bail!("Polling stopped after {} consecutive failures", failures)
        }
    }
}

/// Run the poller and render each delivered message through `on_line`.
///
/// Returns when `stop` completes or the poller gives up.
pub async fn execute<T, S, F>(client: &TalkClient<T>, stop: S, mut on_line: F) -> Result<PollExit>
where
    T: Transport + 'static,
    S: Future<Output = ()>,
    F: FnMut(String),
{
    let (sink, mut events) = ChannelSink::new(64);
    let poller = client.spawn_poller(sink);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => {
                info!("Stop requested");
                break;
            }
            event = events.recv() => match event {
                Some(SinkEvent::Message { conversation, message }) => {
                    let title = match client.resolve(&conversation).await {
                        Ok(Some(entity)) => entity.name().to_string(),
                        _ => conversation.to_string(),
                    };
                    let sender = sender_name(client, &message.from).await;
                    on_line(format!("[{}] {}: {}", title, sender, message_body(&message)));
                }
                Some(SinkEvent::Fatal { failures, reason }) => {
                    on_line(format!("Connection lost after {} failures: {}", failures, reason));
                }
                None => break,
            }
        }
    }

    poller.stop();
    Ok(poller.join().await?)
}
