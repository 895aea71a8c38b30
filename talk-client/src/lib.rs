//! # talk-client
//!
//! Client library for the talk messaging service.
//!
//! This is the library a UI layer drives to log in, read and send messages.
//!
//! ## Features
//!
//! - **Pincode Login**: RSA-encrypted credential, confirmed on a second device
//! - **Session Recovery**: one transparent reconnect on an expired token
//! - **Background Polling**: at-most-once message dispatch with a failure budget
//! - **Transport Abstraction**: Pluggable transport layer (http, mock)
//! - **Pure State Machine**: Uses talk-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use talk_client::{ClientConfig, HttpTransport, TalkClient};
//!
//! let config = ClientConfig::default();
//! let client = TalkClient::new(config.clone(), HttpTransport::new(&config));
//!
//! client.resume(&stored_token).await?;
//! client.send_text(&friend, "hello").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod crypto;
pub mod device;
pub mod entity_cache;
pub mod error;
pub mod login;
pub mod poller;
pub mod session;
pub mod transport;

pub use client::{Conversation, PendingLogin, PollerHandle, TalkClient};
pub use config::{ClientConfig, ConfigError, HeaderConfig, PollConfig, ServerConfig};
pub use crypto::CryptoError;
pub use device::DeviceInfo;
pub use entity_cache::EntityCache;
pub use error::ClientError;
pub use login::CredentialExchange;
pub use poller::{ChannelSink, MessageSink, PollExit, Poller, SinkEvent};
pub use session::Session;
pub use transport::{HttpTransport, MockTransport, Transport, TransportError};
