//! Domain records exchanged with the messaging service.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{Mid, Revision};

/// Identity provider backing a login identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentityProvider {
    /// Native accounts, addressed by email.
    Line,
    /// Federated accounts, addressed by anything else.
    NaverKr,
}

/// The authenticated user's own profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// The user's own identifier, used to decide message direction
    pub mid: Mid,
    /// Display name
    pub display_name: String,
    /// Free-form status line
    pub status_message: String,
}

/// A direct contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Contact identifier
    pub mid: Mid,
    /// Display name
    pub display_name: String,
    /// Free-form status line
    pub status_message: String,
}

impl Contact {
    /// Create a contact with an empty status message.
    pub fn new(mid: impl Into<Mid>, display_name: impl Into<String>) -> Self {
        Self {
            mid: mid.into(),
            display_name: display_name.into(),
            status_message: String::new(),
        }
    }
}

/// A named group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group identifier
    pub id: Mid,
    /// Group name
    pub name: String,
    /// Current members
    pub members: Vec<Contact>,
}

impl Group {
    /// Create a group with no members.
    pub fn new(id: impl Into<Mid>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            members: Vec::new(),
        }
    }
}

/// An unnamed multi-user chat room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Room identifier
    pub mid: Mid,
    /// Participants, in server order
    pub contacts: Vec<Contact>,
}

/// Kind of conversation a message box belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidType {
    /// One-to-one conversation
    User,
    /// Chat room
    Room,
    /// Group conversation
    Group,
}

/// Server-side conversation container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBox {
    /// Box identifier (the conversation partner's Mid)
    pub id: Mid,
    /// Kind of conversation
    pub mid_type: MidType,
    /// Sequence number of the last message in the box
    pub last_seq: i64,
}

/// Summary wrapper around a message box, as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBoxWrapUp {
    /// The wrapped box
    pub message_box: MessageBox,
}

/// Payload kind of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ContentType {
    /// Plain text
    #[default]
    None,
    /// Image attachment
    Image,
    /// Video attachment
    Video,
    /// Audio attachment
    Audio,
    /// Sticker (package/version/id in metadata)
    Sticker,
    /// Anything else
    Other,
}

/// A chat message. Immutable once received.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Server-assigned message id (empty for outgoing messages)
    pub id: String,
    /// Sender
    pub from: Mid,
    /// Recipient (user, group or room)
    pub to: Mid,
    /// Payload kind
    pub content_type: ContentType,
    /// Text body, if any
    pub text: Option<String>,
    /// Sticker/image URLs and flags
    pub content_metadata: BTreeMap<String, String>,
    /// Creation time in milliseconds since the epoch
    pub created_time: i64,
}

impl Message {
    /// Build an outgoing text message.
    pub fn text(to: impl Into<Mid>, text: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            from: Mid::default(),
            to: to.into(),
            content_type: ContentType::None,
            text: Some(text.into()),
            content_metadata: BTreeMap::new(),
            created_time: 0,
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("content_type", &self.content_type)
            .field(
                "text",
                &self
                    .text
                    .as_ref()
                    .map(|t| format!("[{} bytes REDACTED]", t.len())),
            )
            .field("content_metadata", &self.content_metadata.len())
            .field("created_time", &self.created_time)
            .finish()
    }
}

/// Kind of server-side change carried by an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpType {
    /// Marker closing a fetch
    EndOfOperation,
    /// Own profile changed
    UpdateProfile,
    /// A contact's profile changed
    NotifiedUpdateProfile,
    /// A contact was added
    AddContact,
    /// Message sent by this account
    SendMessage,
    /// Message received from someone else
    ReceiveMessage,
    /// Rich content sent by this account
    SendContent,
    /// Delivery receipt for a sent message
    SendMessageReceipt,
    /// Delivery receipt for a received message
    ReceiveMessageReceipt,
    /// A peer read a message
    NotifiedReadMessage,
    /// Invitation into a group
    NotifiedInviteIntoGroup,
    /// Group invitation accepted
    AcceptGroupInvitation,
    /// Left a group
    LeaveGroup,
    /// Left a room
    LeaveRoom,
    /// Any other server code
    Other(i32),
}

/// A single server-side change event delivered during polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Server revision of this change
    pub revision: Revision,
    /// Kind of change
    pub op_type: OpType,
    /// Message payload, for message-bearing kinds
    pub message: Option<Message>,
}

/// Outcome tag of a verifier-based login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoginResultType {
    /// Login completed, token issued
    Success,
    /// Login needs a QR code scan
    RequireQrcode,
    /// Login needs confirmation on a registered device
    RequireDeviceConfirm,
}

impl fmt::Display for LoginResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::Success => "SUCCESS",
            Self::RequireQrcode => "REQUIRE_QRCODE",
            Self::RequireDeviceConfirm => "REQUIRE_DEVICE_CONFIRM",
        };
        f.write_str(tag)
    }
}

/// Result of a login call.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResult {
    /// Outcome tag
    pub result_type: LoginResultType,
    /// Durable session token (on success)
    pub auth_token: Option<String>,
    /// Short-lived verifier (credential step)
    pub verifier: Option<String>,
    /// Human-readable pincode (credential step)
    pub pin_code: Option<String>,
}

impl fmt::Debug for LoginResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResult")
            .field("result_type", &self.result_type)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("verifier", &self.verifier.as_ref().map(|_| "[REDACTED]"))
            .field("pin_code", &self.pin_code)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_result_type_displays_server_tag() {
        assert_eq!(LoginResultType::Success.to_string(), "SUCCESS");
        assert_eq!(LoginResultType::RequireQrcode.to_string(), "REQUIRE_QRCODE");
        assert_eq!(
            LoginResultType::RequireDeviceConfirm.to_string(),
            "REQUIRE_DEVICE_CONFIRM"
        );
    }

    #[test]
    fn outgoing_text_message() {
        let msg = Message::text("u42", "hi");
        assert_eq!(msg.to, "u42");
        assert_eq!(msg.content_type, ContentType::None);
        assert_eq!(msg.text.as_deref(), Some("hi"));
        assert!(msg.from.is_empty());
    }

    #[test]
    fn message_debug_redacts_text() {
        let msg = Message::text("u42", "top secret");
        let debug = format!("{:?}", msg);
        assert!(debug.contains("[10 bytes REDACTED]"), "got: {}", debug);
        assert!(!debug.contains("top secret"));
    }

    #[test]
    fn login_result_debug_redacts_token() {
        let result = LoginResult {
            result_type: LoginResultType::Success,
            auth_token: Some("tok-abcdef".into()),
            verifier: None,
            pin_code: None,
        };
        let debug = format!("{:?}", result);
        assert!(!debug.contains("tok-abcdef"));
    }
}
