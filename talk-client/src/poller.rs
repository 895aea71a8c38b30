//! Operation poller - the background sync loop.
//!
//! Each cycle fetches the operations after the session cursor, drops those
//! already seen, and hands message operations to a [`MessageSink`] keyed by
//! conversation. Cycle outcomes feed the reconnect state machine from
//! talk-core, whose actions (re-authenticate, continue, give up) the poller
//! executes.
//!
//! ```text
//! loop {
//!     cycle:  fetch → filter (dispatch cursor) → classify → sink
//!     outcome → ReconnectState::on_event → actions
//!     stop requested? → return
//!     sleep(interval)
//! }
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use talk_core::{
    classify, Disposition, ReconnectAction, ReconnectEvent, ReconnectPolicy, ReconnectState,
    RevisionCursor,
};
use talk_types::{Message, Mid};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PollConfig;
use crate::error::ClientError;
use crate::session::Session;
use crate::transport::Transport;

/// Receiver of dispatched messages. Implemented by the UI layer.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// A message for the conversation keyed by `conversation`.
    async fn deliver(&self, conversation: Mid, message: Message);

    /// Polling has stopped for good. Called at most once.
    async fn fatal(&self, failures: u32, reason: String);
}

/// Event emitted by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// A dispatched message.
    Message {
        /// Conversation partner.
        conversation: Mid,
        /// The message.
        message: Message,
    },
    /// Polling gave up.
    Fatal {
        /// Consecutive failures that exhausted the budget.
        failures: u32,
        /// Last error.
        reason: String,
    },
}

/// Sink that forwards everything into an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<SinkEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SinkEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    async fn send(&self, event: SinkEvent) {
        if self.tx.send(event).await.is_err() {
            debug!("Sink receiver dropped, discarding event");
        }
    }
}

#[async_trait]
impl MessageSink for ChannelSink {
    async fn deliver(&self, conversation: Mid, message: Message) {
        self.send(SinkEvent::Message {
            conversation,
            message,
        })
        .await;
    }

    async fn fatal(&self, failures: u32, reason: String) {
        self.send(SinkEvent::Fatal { failures, reason }).await;
    }
}

/// Why [`Poller::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    /// The stop token was cancelled.
    Stopped,
    /// The failure budget was exhausted.
    Fatal {
        /// Consecutive failures at the time of giving up.
        failures: u32,
    },
}

/// The operation poller.
pub struct Poller<T: Transport, S: MessageSink> {
    session: Arc<Session<T>>,
    sink: S,
    config: PollConfig,
    dispatch_cursor: Option<RevisionCursor>,
    state: ReconnectState,
}

impl<T: Transport, S: MessageSink> Poller<T, S> {
    /// Create a poller over `session` delivering to `sink`.
    pub fn new(session: Arc<Session<T>>, sink: S, config: PollConfig) -> Self {
        let policy = ReconnectPolicy {
            max_consecutive_failures: config.max_consecutive_failures,
        };
        Self {
            session,
            sink,
            config,
            dispatch_cursor: None,
            state: ReconnectState::new(policy),
        }
    }

    /// Reconnect state after the last cycle.
    pub fn reconnect_state(&self) -> &ReconnectState {
        &self.state
    }

    /// Highest revision dispatched or skipped so far.
    pub fn dispatch_cursor(&self) -> Option<RevisionCursor> {
        self.dispatch_cursor
    }

    /// Fetch one batch and dispatch its new message operations.
    ///
    /// Returns the number of messages delivered to the sink.
    pub async fn poll_once(&mut self) -> Result<usize, ClientError> {
        if self.session.profile().await.is_none() {
            warn!("No profile cached, re-establishing session");
            self.session.reconnect().await?;
        }

        if self.dispatch_cursor.is_none() {
            let seed = self.session.cursor().await;
            debug!("Dispatch cursor seeded at revision {}", seed);
            self.dispatch_cursor = Some(RevisionCursor::with_revision(seed));
        }

        let operations = self
            .session
            .fetch_new_operations(self.config.batch_size)
            .await?;
        let self_mid = self
            .session
            .profile()
            .await
            .map(|p| p.mid)
            .unwrap_or_default();
        let cursor = self.dispatch_cursor.get_or_insert_with(RevisionCursor::new);

        let mut delivered = 0;
        for operation in operations {
            if !cursor.accept(operation.revision) {
                debug!("Skipping already seen revision {}", operation.revision);
                continue;
            }

            match classify(&operation, &self_mid) {
                Disposition::Dispatch {
                    conversation,
                    message,
                } => {
                    debug!(
                        "Dispatching revision {} to {}",
                        operation.revision, conversation
                    );
                    self.sink.deliver(conversation, message).await;
                    delivered += 1;
                }
                Disposition::Suppressed => {
                    debug!("Suppressed revision {}", operation.revision);
                }
                Disposition::Ignored => {}
            }
        }

        Ok(delivered)
    }

    /// Run one cycle: poll, then apply the reconnect state machine.
    ///
    /// Returns `Some` when polling must stop for good.
    pub async fn cycle(&mut self) -> Option<PollExit> {
        let (event, mut last_error) = match self.poll_once().await {
            Ok(_) => (ReconnectEvent::CycleSucceeded, None),
            Err(e) => {
                warn!("Poll cycle failed: {}", e);
                (
                    ReconnectEvent::CycleFailed {
                        kind: e.failure_kind(),
                    },
                    Some(e.to_string()),
                )
            }
        };

        let mut events = VecDeque::from([event]);
        while let Some(event) = events.pop_front() {
            let (next, actions) = self.state.on_event(event);
            self.state = next;

            for action in actions {
                match action {
                    ReconnectAction::Continue => {}
                    ReconnectAction::Reauthenticate => match self.session.reconnect().await {
                        Ok(()) => {
                            info!("Re-authenticated after expired token");
                            events.push_back(ReconnectEvent::ReauthSucceeded);
                        }
                        Err(e) => {
                            warn!("Re-authentication failed: {}", e);
                            last_error = Some(e.to_string());
                            events.push_back(ReconnectEvent::ReauthFailed);
                        }
                    },
                    ReconnectAction::NotifyFatal { failures } => {
                        let reason = last_error.take().unwrap_or_default();
                        error!(
                            "Polling stopped after {} consecutive failures: {}",
                            failures, reason
                        );
                        self.sink.fatal(failures, reason).await;
                        return Some(PollExit::Fatal { failures });
                    }
                }
            }
        }

        None
    }

    /// Poll until `stop` is cancelled or the failure budget runs out.
    ///
    /// `stop` is checked once per cycle, before the delay; an in-flight fetch
    /// is never interrupted.
    pub async fn run(mut self, stop: CancellationToken) -> PollExit {
        info!(
            "Poller started (interval {}ms, batch {})",
            self.config.interval_ms, self.config.batch_size
        );

        loop {
            if let Some(exit) = self.cycle().await {
                return exit;
            }

            if stop.is_cancelled() {
                info!("Poller stopped");
                return PollExit::Stopped;
            }

            tokio::time::sleep(self.config.interval()).await;
        }
    }
}
