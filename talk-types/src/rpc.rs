//! RPC envelopes for the messaging service.
//!
//! Every remote call is one [`Call`] POSTed as a MessagePack body; the server
//! answers with an [`RpcResponse`] that either carries a typed [`Reply`] or a
//! structured [`TalkException`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    Contact, Group, IdentityProvider, LoginResult, Message, MessageBoxWrapUp, Mid, Operation,
    Profile, Revision, Room, TypesError,
};

/// A remote procedure invocation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Call {
    /// Latest operation revision on the server
    GetLastOpRevision,
    /// Own profile
    GetProfile,
    /// Identifiers of all contacts
    GetAllContactIds,
    /// Full contact records
    GetContacts {
        /// Contacts to fetch
        ids: Vec<Mid>,
    },
    /// Identifiers of joined groups
    GetGroupIdsJoined,
    /// Identifiers of groups with a pending invitation
    GetGroupIdsInvited,
    /// Full group records
    GetGroups {
        /// Groups to fetch
        ids: Vec<Mid>,
    },
    /// One page of the message box listing (1-based `start`)
    GetMessageBoxWrapUpList {
        /// First entry of the page
        start: i32,
        /// Page size
        count: i32,
    },
    /// Full room record
    GetRoom {
        /// Room to fetch
        room_id: Mid,
    },
    /// Message box of a single conversation
    GetMessageBoxCompactWrapUp {
        /// Conversation partner
        mid: Mid,
    },
    /// Most recent messages of a box
    GetRecentMessages {
        /// Box to read
        message_box_id: Mid,
        /// Number of messages
        count: i32,
    },
    /// Send a message
    SendMessage {
        /// Client sequence number
        seq: i32,
        /// Message to send
        message: Message,
    },
    /// Operations with a revision after `local_revision`
    FetchOperations {
        /// Client's current cursor
        local_revision: Revision,
        /// Maximum batch size
        count: i32,
    },
    /// Submit the encrypted credential, obtaining a verifier and pincode
    LoginWithIdentityCredentialForCertificate {
        /// Provider chosen from the identifier
        provider: IdentityProvider,
        /// Login identifier
        identifier: String,
        /// Ask for a durable token
        keep_logged_in: bool,
        /// Local IP address of this device
        access_location: String,
        /// Host name of this device
        system_name: String,
        /// Hex-encoded RSA ciphertext of the credential payload
        identity_credential: String,
    },
    /// Redeem a verifier for a login result
    LoginWithVerifierForCertificate {
        /// Verifier from the certificate endpoint
        verifier: String,
    },
}

impl Call {
    /// Name of the remote method.
    pub fn method(&self) -> &'static str {
        match self {
            Self::GetLastOpRevision => "getLastOpRevision",
            Self::GetProfile => "getProfile",
            Self::GetAllContactIds => "getAllContactIds",
            Self::GetContacts { .. } => "getContacts",
            Self::GetGroupIdsJoined => "getGroupIdsJoined",
            Self::GetGroupIdsInvited => "getGroupIdsInvited",
            Self::GetGroups { .. } => "getGroups",
            Self::GetMessageBoxWrapUpList { .. } => "getMessageBoxWrapUpList",
            Self::GetRoom { .. } => "getRoom",
            Self::GetMessageBoxCompactWrapUp { .. } => "getMessageBoxCompactWrapUp",
            Self::GetRecentMessages { .. } => "getRecentMessages",
            Self::SendMessage { .. } => "sendMessage",
            Self::FetchOperations { .. } => "fetchOperations",
            Self::LoginWithIdentityCredentialForCertificate { .. } => {
                "loginWithIdentityCredentialForCertificate"
            }
            Self::LoginWithVerifierForCertificate { .. } => "loginWithVerifierForCertificate",
        }
    }

    /// Whether the call needs a session token.
    ///
    /// Only the two login handshake calls may run unauthenticated.
    pub fn requires_auth(&self) -> bool {
        !matches!(
            self,
            Self::LoginWithIdentityCredentialForCertificate { .. }
                | Self::LoginWithVerifierForCertificate { .. }
        )
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TypesError> {
        rmp_serde::to_vec_named(self).map_err(TypesError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        rmp_serde::from_slice(bytes).map_err(TypesError::Deserialization)
    }
}

// Login calls carry credential material; keep Debug to the method name.
impl fmt::Debug for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchOperations {
                local_revision,
                count,
            } => f
                .debug_struct("FetchOperations")
                .field("local_revision", local_revision)
                .field("count", count)
                .finish(),
            Self::GetMessageBoxWrapUpList { start, count } => f
                .debug_struct("GetMessageBoxWrapUpList")
                .field("start", start)
                .field("count", count)
                .finish(),
            other => write!(f, "Call({})", other.method()),
        }
    }
}

/// Typed result of a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    /// No payload
    Unit,
    /// A revision number
    Revision(Revision),
    /// A profile
    Profile(Profile),
    /// A list of identifiers
    Ids(Vec<Mid>),
    /// Contact records
    Contacts(Vec<Contact>),
    /// Group records
    Groups(Vec<Group>),
    /// A page of message box summaries
    MessageBoxes(Vec<MessageBoxWrapUp>),
    /// A single message box summary
    MessageBox(MessageBoxWrapUp),
    /// A room record
    Room(Room),
    /// A list of messages
    Messages(Vec<Message>),
    /// A single message
    Message(Message),
    /// A batch of operations
    Operations(Vec<Operation>),
    /// A login result
    Login(LoginResult),
}

impl Reply {
    /// Short name of the reply shape, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Revision(_) => "revision",
            Self::Profile(_) => "profile",
            Self::Ids(_) => "ids",
            Self::Contacts(_) => "contacts",
            Self::Groups(_) => "groups",
            Self::MessageBoxes(_) => "message_boxes",
            Self::MessageBox(_) => "message_box",
            Self::Room(_) => "room",
            Self::Messages(_) => "messages",
            Self::Message(_) => "message",
            Self::Operations(_) => "operations",
            Self::Login(_) => "login",
        }
    }
}

/// Structured rejection raised by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalkException {
    /// Service error code
    pub code: i32,
    /// Human-readable reason, surfaced verbatim
    pub reason: String,
}

/// Body of every RPC response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcResponse {
    /// The call succeeded
    Ok(Reply),
    /// The service rejected the call
    Exception(TalkException),
}

impl RpcResponse {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TypesError> {
        rmp_serde::to_vec_named(self).map_err(TypesError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        rmp_serde::from_slice(bytes).map_err(TypesError::Deserialization)
    }
}
