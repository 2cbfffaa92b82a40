use std::{collections::HashMap, sync::Mutex};

use crate::domain::{MessageId, MessageKey};

/// In-process map from source message to its forwarded destination message.
///
/// Entries accumulate monotonically and are never pruned or overwritten in
/// practice: callers check `is_forwarded` before sending, so memory grows with
/// forwarded volume for the life of the process. There is no persistence
/// across restarts.
#[derive(Debug, Default)]
pub struct ForwardMap {
    inner: Mutex<HashMap<MessageKey, MessageKey>>,
}

impl ForwardMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, source: MessageKey, destination: MessageKey) {
        if let Ok(mut map) = self.inner.lock() {
            map.insert(source, destination);
            tracing::debug!(?source, ?destination, "recorded message mapping");
        }
    }

    pub fn is_forwarded(&self, source: MessageKey) -> bool {
        self.inner
            .lock()
            .map(|map| map.contains_key(&source))
            .unwrap_or(false)
    }

    /// Destination message id for a source message, if it was forwarded.
    pub fn destination_of(&self, source: MessageKey) -> Option<MessageId> {
        self.inner
            .lock()
            .ok()
            .and_then(|map| map.get(&source).map(|dest| dest.message_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChatId;

    fn key(chat: i64, msg: i32) -> MessageKey {
        MessageKey {
            chat_id: ChatId(chat),
            message_id: MessageId(msg),
        }
    }

    #[test]
    fn records_and_looks_up() {
        let map = ForwardMap::new();
        assert!(!map.is_forwarded(key(-100, 1)));
        assert_eq!(map.destination_of(key(-100, 1)), None);

        map.record(key(-100, 1), key(-200, 11));
        assert!(map.is_forwarded(key(-100, 1)));
        assert_eq!(map.destination_of(key(-100, 1)), Some(MessageId(11)));
    }

    #[test]
    fn keys_are_scoped_by_chat() {
        let map = ForwardMap::new();
        map.record(key(-100, 1), key(-200, 11));
        assert!(!map.is_forwarded(key(-101, 1)));
    }
}
