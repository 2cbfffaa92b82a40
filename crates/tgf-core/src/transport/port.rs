use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageKey, UserId},
    transport::types::{InboundMessage, MediaRef},
    Result,
};

/// Port over the messaging platform.
///
/// These are the only suspension points in the pipeline; none carries an
/// explicit timeout, so a hung call stalls that message's pipeline (known gap,
/// kept deliberately).
#[async_trait]
pub trait TransportPort: Send + Sync {
    /// Fetch a message from a chat. Fails soft: a transport error is logged
    /// by the implementation and surfaces as `None`.
    async fn fetch_message(&self, chat_id: ChatId, message_id: MessageId)
        -> Option<InboundMessage>;

    /// Send a message, optionally with media and as a reply to an existing
    /// message in the destination chat. Returns the key of the new message.
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        media: Option<&MediaRef>,
        reply_to: Option<MessageId>,
    ) -> Result<MessageKey>;

    /// Look up a user's handle. Fails soft to `None`; blank-vs-fallback
    /// policy is the formatter's job.
    async fn lookup_username(&self, user_id: UserId) -> Option<String>;
}
