//! Forwarding engine: decision gate, reply resolution, send, mapping update.

use std::{
    collections::{HashMap, HashSet},
    future::Future,
    pin::Pin,
    sync::Arc,
};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    domain::{ChatId, MessageId, MessageKey, UserId},
    formatting,
    store::ForwardMap,
    tracked::TrackedUserSet,
    transport::{port::TransportPort, types::InboundMessage},
    Result,
};

/// Pure forwarding predicate: a message is eligible when it has a sender and
/// that sender is tracked. Applies to inbound events only; the reply-parent
/// path forwards regardless of the parent's sender.
pub fn should_forward(tracked: &TrackedUserSet, msg: &InboundMessage) -> bool {
    match msg.sender_id {
        Some(sender) => tracked.contains(sender),
        None => false,
    }
}

/// Terminal state of one pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// Sender absent or not tracked; nothing sent.
    FilteredOut,
    /// The source message already has a destination mapping; nothing sent.
    AlreadyForwarded,
    /// Sent and recorded; carries the destination message key.
    Forwarded(MessageKey),
}

enum ForwardResult {
    Sent(MessageKey),
    Duplicate,
}

/// Per-MessageKey lock table serializing pipeline runs for the same source
/// message. Entries are never removed; the table grows with the forward map
/// and shares its retention story.
#[derive(Default)]
pub struct KeyLocks {
    inner: Mutex<HashMap<MessageKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub async fn lock_key(&self, key: MessageKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Orchestrates one inbound message end to end: decision, reply resolution,
/// formatting, send, mapping update. A mapping is recorded only after a
/// confirmed send, so a cancelled or failed pipeline never leaves a partial
/// entry behind.
pub struct ForwardingEngine {
    transport: Arc<dyn TransportPort>,
    map: Arc<ForwardMap>,
    tracked: Arc<TrackedUserSet>,
    source_chat: ChatId,
    destination_chat: ChatId,
    locks: KeyLocks,
}

impl ForwardingEngine {
    pub fn new(
        transport: Arc<dyn TransportPort>,
        map: Arc<ForwardMap>,
        tracked: Arc<TrackedUserSet>,
        source_chat: ChatId,
        destination_chat: ChatId,
    ) -> Self {
        Self {
            transport,
            map,
            tracked,
            source_chat,
            destination_chat,
            locks: KeyLocks::default(),
        }
    }

    pub fn tracked(&self) -> &TrackedUserSet {
        &self.tracked
    }

    /// Run the full pipeline for one inbound message.
    ///
    /// A send error is terminal for this message only: no mapping is written
    /// and the error surfaces to the caller for logging. Subsequent messages
    /// are unaffected.
    pub async fn handle_message(&self, msg: &InboundMessage) -> Result<ForwardOutcome> {
        if !should_forward(&self.tracked, msg) {
            tracing::debug!(
                message_id = msg.message_id.0,
                sender = ?msg.sender_id,
                "message filtered out"
            );
            return Ok(ForwardOutcome::FilteredOut);
        }

        tracing::info!(
            message_id = msg.message_id.0,
            sender = ?msg.sender_id,
            "processing message"
        );

        // Seeding the visited set with the message's own key defends against
        // a malformed self-referential reply chain.
        let mut visited = HashSet::from([msg.key()]);
        match self.forward(msg, &mut visited).await? {
            ForwardResult::Sent(dest) => Ok(ForwardOutcome::Forwarded(dest)),
            ForwardResult::Duplicate => Ok(ForwardOutcome::AlreadyForwarded),
        }
    }

    /// Forward one message (inbound event or reply parent), re-checking the
    /// map under the per-key lock so concurrent duplicate deliveries of the
    /// same source message collapse to a single send.
    fn forward<'a>(
        &'a self,
        msg: &'a InboundMessage,
        visited: &'a mut HashSet<MessageKey>,
    ) -> Pin<Box<dyn Future<Output = Result<ForwardResult>> + Send + 'a>> {
        Box::pin(async move {
        let key = msg.key();
        let _guard = self.locks.lock_key(key).await;

        if self.map.is_forwarded(key) {
            tracing::debug!(?key, "already forwarded, skipping");
            return Ok(ForwardResult::Duplicate);
        }

        let reply_to = match msg.reply_to {
            Some(parent_id) => self.resolve_reply(key, parent_id, visited).await,
            None => None,
        };

        let label = self.resolve_label(msg.sender_id).await;
        let link = formatting::message_link(self.source_chat, msg.message_id);
        let text = formatting::format_forward(&label, msg.text.as_deref(), &link);

        let sent = self
            .transport
            .send_message(self.destination_chat, &text, msg.media.as_ref(), reply_to)
            .await?;

        self.map.record(key, sent);
        tracing::info!(source = ?key, destination = ?sent, "forwarded message");
        Ok(ForwardResult::Sent(sent))
        })
    }

    /// Resolve a reply parent to its destination message id, forwarding the
    /// parent first when needed.
    ///
    /// Degrades to `None` (child goes out standalone) when the parent cannot
    /// be fetched, its send fails, or the chain cycles: a message is never
    /// dropped because its ancestor is unavailable. An absent parent is
    /// treated the same as "not a reply".
    async fn resolve_reply(
        &self,
        child: MessageKey,
        parent_id: MessageId,
        visited: &mut HashSet<MessageKey>,
    ) -> Option<MessageId> {
        let parent_key = MessageKey {
            chat_id: child.chat_id,
            message_id: parent_id,
        };

        if let Some(dest) = self.map.destination_of(parent_key) {
            return Some(dest);
        }

        if !visited.insert(parent_key) {
            tracing::warn!(?child, ?parent_key, "reply chain cycle, sending standalone");
            return None;
        }

        let parent = self.transport.fetch_message(child.chat_id, parent_id).await?;

        // Boxed for async recursion: a chain of replies resolves one ancestor
        // per step, each step re-checking the map.
        match self.forward(&parent, visited).await {
            Ok(ForwardResult::Sent(dest)) => Some(dest.message_id),
            Ok(ForwardResult::Duplicate) => self.map.destination_of(parent_key),
            Err(e) => {
                tracing::error!(?parent_key, error = %e, "parent forward failed, sending standalone");
                None
            }
        }
    }

    async fn resolve_label(&self, sender: Option<UserId>) -> String {
        match sender {
            Some(user_id) => {
                let username = self.transport.lookup_username(user_id).await;
                formatting::sender_label(user_id, username.as_deref())
            }
            // Only reachable on the parent-forward path; the decision gate
            // stops inbound events without a sender.
            None => "unknown".to_string(),
        }
    }
}
