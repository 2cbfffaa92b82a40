//! Telegram adapter (teloxide).
//!
//! Implements the `tgf-core` TransportPort over the Telegram Bot API.

use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;

use teloxide::{prelude::*, types::InputFile, types::ParseMode};

use tokio::time::sleep;

pub mod router;

use tgf_core::{
    domain::{ChatId, MessageId, MessageKey, UserId},
    errors::Error,
    transport::{
        port::TransportPort,
        types::{InboundMessage, MediaRef},
    },
    Result,
};

pub struct TelegramTransport {
    bot: Bot,
    source_chat: ChatId,
    seen: Mutex<SeenCache>,
}

impl TelegramTransport {
    pub fn new(bot: Bot, source_chat: ChatId, cache_capacity: usize) -> Self {
        Self {
            bot,
            source_chat,
            seen: Mutex::new(SeenCache::new(cache_capacity)),
        }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    /// Record a message the dispatcher has seen so later reply-parent fetches
    /// can find it. The Bot API has no message-history read, so this cache is
    /// the only source `fetch_message` can serve from.
    pub fn remember(&self, msg: InboundMessage) {
        if let Ok(mut cache) = self.seen.lock() {
            cache.insert(msg);
        }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::Transport(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl TransportPort for TelegramTransport {
    async fn fetch_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Option<InboundMessage> {
        let key = MessageKey {
            chat_id,
            message_id,
        };
        let hit = self.seen.lock().ok().and_then(|cache| cache.get(key));
        if hit.is_none() {
            tracing::error!(?key, "reply parent not in seen cache");
        }
        hit
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        media: Option<&MediaRef>,
        reply_to: Option<MessageId>,
    ) -> Result<MessageKey> {
        let chat = Self::tg_chat(chat_id);

        let msg = match media {
            None => {
                self.with_retry(|| {
                    let mut req = self
                        .bot
                        .send_message(chat, text.to_string())
                        .parse_mode(ParseMode::Markdown);
                    if let Some(id) = reply_to {
                        req = req.reply_to_message_id(Self::tg_msg_id(id));
                    }
                    req
                })
                .await?
            }
            Some(MediaRef::Photo { file_id }) => {
                self.with_retry(|| {
                    let mut req = self
                        .bot
                        .send_photo(chat, InputFile::file_id(file_id.clone()))
                        .caption(text.to_string())
                        .parse_mode(ParseMode::Markdown);
                    if let Some(id) = reply_to {
                        req = req.reply_to_message_id(Self::tg_msg_id(id));
                    }
                    req
                })
                .await?
            }
            Some(MediaRef::Document { file_id }) => {
                self.with_retry(|| {
                    let mut req = self
                        .bot
                        .send_document(chat, InputFile::file_id(file_id.clone()))
                        .caption(text.to_string())
                        .parse_mode(ParseMode::Markdown);
                    if let Some(id) = reply_to {
                        req = req.reply_to_message_id(Self::tg_msg_id(id));
                    }
                    req
                })
                .await?
            }
        };

        Ok(MessageKey {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn lookup_username(&self, user_id: UserId) -> Option<String> {
        let tg_user = teloxide::types::UserId(user_id.0 as u64);
        match self
            .bot
            .get_chat_member(Self::tg_chat(self.source_chat), tg_user)
            .await
        {
            Ok(member) => member.user.username.clone(),
            Err(e) => {
                tracing::error!(user_id = user_id.0, error = %e, "username lookup failed");
                None
            }
        }
    }
}

/// Convert a teloxide update message into the engine's inbound shape.
pub fn to_inbound(msg: &Message) -> InboundMessage {
    let media = if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        Some(MediaRef::Photo {
            file_id: photo.file.id.clone(),
        })
    } else {
        msg.document().map(|doc| MediaRef::Document {
            file_id: doc.file.id.clone(),
        })
    };

    InboundMessage {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
        sender_id: msg.from().map(|u| UserId(u.id.0 as i64)),
        text: msg
            .text()
            .or_else(|| msg.caption())
            .map(|s| s.to_string()),
        reply_to: msg.reply_to_message().map(|m| MessageId(m.id.0)),
        media,
    }
}

/// Bounded FIFO cache of recently seen messages, keyed by MessageKey.
#[derive(Debug)]
struct SeenCache {
    capacity: usize,
    map: HashMap<MessageKey, InboundMessage>,
    order: VecDeque<MessageKey>,
}

impl SeenCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            map: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn insert(&mut self, msg: InboundMessage) {
        let key = msg.key();
        if self.map.insert(key, msg).is_none() {
            self.order.push_back(key);
            while self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.map.remove(&oldest);
                }
            }
        }
    }

    fn get(&self, key: MessageKey) -> Option<InboundMessage> {
        self.map.get(&key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(id: i32) -> InboundMessage {
        InboundMessage {
            chat_id: ChatId(-100),
            message_id: MessageId(id),
            sender_id: Some(UserId(1)),
            text: Some(format!("m{id}")),
            reply_to: None,
            media: None,
        }
    }

    #[test]
    fn cache_serves_recent_messages() {
        let mut cache = SeenCache::new(8);
        cache.insert(inbound(1));

        let key = inbound(1).key();
        assert_eq!(cache.get(key).unwrap().text.as_deref(), Some("m1"));
    }

    #[test]
    fn cache_evicts_oldest_beyond_capacity() {
        let mut cache = SeenCache::new(2);
        cache.insert(inbound(1));
        cache.insert(inbound(2));
        cache.insert(inbound(3));

        assert!(cache.get(inbound(1).key()).is_none());
        assert!(cache.get(inbound(2).key()).is_some());
        assert!(cache.get(inbound(3).key()).is_some());
    }

    #[test]
    fn cache_reinsert_does_not_duplicate_order() {
        let mut cache = SeenCache::new(2);
        cache.insert(inbound(1));
        cache.insert(inbound(1));
        cache.insert(inbound(2));

        assert!(cache.get(inbound(1).key()).is_some());
        assert!(cache.get(inbound(2).key()).is_some());
    }
}
