//! Outbound message formatting.
//!
//! The formatted text is the one bit-exact, user-visible contract of the
//! forwarder: `#{label} - {body} - [to_chat]({backlink})`, sent with Markdown
//! parse mode so the backlink renders as a link.

use crate::domain::{ChatId, MessageId, UserId};

/// Build the outbound text. A missing body renders as an empty string.
pub fn format_forward(sender_label: &str, body: Option<&str>, backlink: &str) -> String {
    format!(
        "#{sender_label} - {} - [to_chat]({backlink})",
        body.unwrap_or("")
    )
}

/// Link to the original message.
///
/// For supergroups/channels Telegram prefixes the chat id with `-100`; the
/// `t.me/c/` form requires it stripped. The strip is on the string form, and
/// must stay that way for generated links to resolve.
pub fn message_link(source_chat: ChatId, message_id: MessageId) -> String {
    let chat = source_chat.0.to_string();
    let chat = chat.strip_prefix("-100").unwrap_or(&chat);
    format!("https://t.me/c/{chat}/{}", message_id.0)
}

/// Display label for a sender: the handle when present and non-blank,
/// otherwise the numeric id.
pub fn sender_label(user_id: UserId, username: Option<&str>) -> String {
    match username {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => user_id.0.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_contract() {
        assert_eq!(
            format_forward("alice", Some("hello"), "https://t.me/c/1/2"),
            "#alice - hello - [to_chat](https://t.me/c/1/2)"
        );
    }

    #[test]
    fn empty_body_stays_in_template() {
        assert_eq!(
            format_forward("alice", None, "https://t.me/c/1/2"),
            "#alice -  - [to_chat](https://t.me/c/1/2)"
        );
    }

    #[test]
    fn link_strips_supergroup_prefix() {
        assert_eq!(
            message_link(ChatId(-1001234567890), MessageId(42)),
            "https://t.me/c/1234567890/42"
        );
    }

    #[test]
    fn link_keeps_other_chat_ids() {
        assert_eq!(message_link(ChatId(777), MessageId(5)), "https://t.me/c/777/5");
        // A plain negative group id has no -100 prefix to strip.
        assert_eq!(message_link(ChatId(-42), MessageId(5)), "https://t.me/c/-42/5");
    }

    #[test]
    fn label_prefers_username() {
        assert_eq!(sender_label(UserId(555), Some("alice")), "alice");
    }

    #[test]
    fn label_falls_back_to_id_on_blank() {
        assert_eq!(sender_label(UserId(555), Some("")), "555");
        assert_eq!(sender_label(UserId(555), Some("   ")), "555");
        assert_eq!(sender_label(UserId(555), None), "555");
    }
}
