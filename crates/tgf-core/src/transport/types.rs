use crate::domain::{ChatId, MessageId, MessageKey, UserId};

/// Incoming message as seen by the engine.
///
/// Transport-specific fields stay in the adapter; this is the minimal shape
/// the forwarding decision and formatter need. Immutable once received.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub sender_id: Option<UserId>,
    pub text: Option<String>,
    /// Message id this message replies to, within the same chat.
    pub reply_to: Option<MessageId>,
    pub media: Option<MediaRef>,
}

impl InboundMessage {
    pub fn key(&self) -> MessageKey {
        MessageKey {
            chat_id: self.chat_id,
            message_id: self.message_id,
        }
    }
}

/// Media attached to a message, re-sendable by platform file id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaRef {
    Photo { file_id: String },
    Document { file_id: String },
}
