//! Operation classification and conversation routing.

use talk_types::{ContentType, Message, Mid, OpType, Operation};

/// What the poller should do with an accepted operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Deliver the message to the conversation keyed by `conversation`.
    Dispatch {
        /// Conversation partner (user, group or room).
        conversation: Mid,
        /// The message to deliver.
        message: Message,
    },
    /// Message-bearing, but delivered through another operation.
    Suppressed,
    /// Not a message operation.
    Ignored,
}

/// Resolve the conversation a message belongs to, seen from `self_mid`.
///
/// - own message: the recipient
/// - message addressed to us: the sender
/// - anything else (group or room traffic): the recipient
pub fn conversation_partner<'a>(self_mid: &Mid, from: &'a Mid, to: &'a Mid) -> &'a Mid {
    if from == self_mid {
        to
    } else if to == self_mid {
        from
    } else {
        to
    }
}

/// Classify an operation for dispatch.
///
/// Only sent/received message and sent content operations carrying a payload
/// are dispatched. Own image and video sends are suppressed: that content
/// arrives again as a `SendContent` operation.
pub fn classify(operation: &Operation, self_mid: &Mid) -> Disposition {
    let message = match (operation.op_type, &operation.message) {
        (OpType::SendMessage | OpType::SendContent | OpType::ReceiveMessage, Some(message)) => {
            message
        }
        _ => return Disposition::Ignored,
    };

    if operation.op_type == OpType::SendMessage
        && matches!(message.content_type, ContentType::Image | ContentType::Video)
    {
        return Disposition::Suppressed;
    }

    let conversation = conversation_partner(self_mid, &message.from, &message.to).clone();
    Disposition::Dispatch {
        conversation,
        message: message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talk_types::Revision;

    fn me() -> Mid {
        Mid::from("u-me")
    }

    fn message(from: &str, to: &str, content_type: ContentType) -> Message {
        let mut message = Message::text(to, "hello");
        message.from = Mid::from(from);
        message.content_type = content_type;
        message
    }

    fn op(op_type: OpType, message: Option<Message>) -> Operation {
        Operation {
            revision: Revision::new(1),
            op_type,
            message,
        }
    }

    #[test]
    fn own_message_routes_to_recipient() {
        let from = me();
        let to = Mid::from("u-x");
        assert_eq!(conversation_partner(&me(), &from, &to), &to);
    }

    #[test]
    fn incoming_message_routes_to_sender() {
        let from = Mid::from("u-y");
        let to = me();
        assert_eq!(conversation_partner(&me(), &from, &to), &from);
    }

    #[test]
    fn group_traffic_routes_to_group() {
        let from = Mid::from("u-y");
        let to = Mid::from("g-1");
        assert_eq!(conversation_partner(&me(), &from, &to), &to);
    }

    #[test]
    fn received_text_dispatches() {
        let operation = op(
            OpType::ReceiveMessage,
            Some(message("u-y", "u-me", ContentType::None)),
        );

        match classify(&operation, &me()) {
            Disposition::Dispatch {
                conversation,
                message,
            } => {
                assert_eq!(conversation, "u-y");
                assert_eq!(message.text.as_deref(), Some("hello"));
            }
            other => panic!("expected Dispatch, got {:?}", other),
        }
    }

    #[test]
    fn send_content_dispatches_images() {
        let operation = op(
            OpType::SendContent,
            Some(message("u-me", "u-x", ContentType::Image)),
        );
        assert!(matches!(
            classify(&operation, &me()),
            Disposition::Dispatch { ref conversation, .. } if conversation == "u-x"
        ));
    }

    #[test]
    fn own_image_and_video_sends_are_suppressed() {
        for content_type in [ContentType::Image, ContentType::Video] {
            let operation = op(
                OpType::SendMessage,
                Some(message("u-me", "u-x", content_type)),
            );
            assert_eq!(classify(&operation, &me()), Disposition::Suppressed);
        }
    }

    #[test]
    fn own_sticker_send_dispatches() {
        let operation = op(
            OpType::SendMessage,
            Some(message("u-me", "u-x", ContentType::Sticker)),
        );
        assert!(matches!(
            classify(&operation, &me()),
            Disposition::Dispatch { .. }
        ));
    }

    #[test]
    fn received_image_is_not_suppressed() {
        let operation = op(
            OpType::ReceiveMessage,
            Some(message("u-y", "u-me", ContentType::Image)),
        );
        assert!(matches!(
            classify(&operation, &me()),
            Disposition::Dispatch { .. }
        ));
    }

    #[test]
    fn non_message_operations_are_ignored() {
        let with_payload = Some(message("u-y", "u-me", ContentType::None));
        for op_type in [
            OpType::EndOfOperation,
            OpType::NotifiedReadMessage,
            OpType::SendMessageReceipt,
            OpType::Other(99),
        ] {
            let operation = op(op_type, with_payload.clone());
            assert_eq!(classify(&operation, &me()), Disposition::Ignored);
        }
    }

    #[test]
    fn message_operation_without_payload_is_ignored() {
        let operation = op(OpType::ReceiveMessage, None);
        assert_eq!(classify(&operation, &me()), Disposition::Ignored);
    }
}
