//! # talk-core
//!
//! Pure logic for talksync (no I/O, instant tests).
//!
//! This crate implements the state machines and algorithms of the messaging
//! client without any network or disk I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (RPC, HTTP) is performed by `talk-client`, which
//! interprets the decisions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod credential;
pub mod cursor;
pub mod dispatch;
pub mod entity;
pub mod reconnect;

pub use credential::{
    classify_identifier, credential_payload, CredentialError, CredentialPayload, RsaKeySpec,
};
pub use cursor::RevisionCursor;
pub use dispatch::{classify, conversation_partner, Disposition};
pub use entity::{
    merge_groups, room_name, sort_contacts, Entity, EntityCollections, EntityKind, RoomEntry,
};
pub use reconnect::{
    FailureKind, Phase, ReconnectAction, ReconnectEvent, ReconnectPolicy, ReconnectState,
    DEFAULT_MAX_CONSECUTIVE_FAILURES,
};
