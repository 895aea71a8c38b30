//! # talk-types
//!
//! Wire and domain types for the talksync messaging client.
//!
//! This crate provides the foundational types used across all talksync crates:
//! - [`Mid`], [`Revision`] - Identity and ordering types
//! - [`Contact`], [`Group`], [`Room`], [`Message`], [`Operation`] - Domain records
//! - [`Call`], [`Reply`], [`RpcResponse`] - RPC envelopes and their codec
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod ids;
mod model;
mod rpc;

pub use error::TypesError;
pub use ids::{Mid, Revision};
pub use model::{
    Contact, ContentType, Group, IdentityProvider, LoginResult, LoginResultType, Message,
    MessageBox, MessageBoxWrapUp, MidType, OpType, Operation, Profile, Room,
};
pub use rpc::{Call, Reply, RpcResponse, TalkException};
