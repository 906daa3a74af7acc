use chrono::{DateTime, Utc};

use crate::common::utils::char_len;
use crate::kernel::RawMessage;

/// Messages shorter than this are never job postings.
pub const MIN_MESSAGE_CHARS: usize = 50;

/// A chat message that survived fetching, tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub text: String,
    pub message_id: i64,
    pub message_date: DateTime<Utc>,
    /// The chat as written in the config (`@handle` or numeric id).
    pub chat_id: String,
    pub is_bot: bool,
    /// Category slug; empty until `ChatParser::parse_category` tags it.
    pub category: String,
}

impl ChatMessage {
    pub fn from_raw(raw: RawMessage, chat_id: impl Into<String>) -> Self {
        Self {
            text: raw.text,
            message_id: raw.message_id,
            message_date: raw.date,
            chat_id: chat_id.into(),
            is_bot: raw.sender_is_bot,
            category: String::new(),
        }
    }
}

/// Keep messages with at least [`MIN_MESSAGE_CHARS`] characters that were
/// not sent by bots. Order is preserved.
pub fn filter_messages(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    messages
        .into_iter()
        .filter(|m| !m.is_bot && char_len(&m.text) >= MIN_MESSAGE_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn message(id: i64, text: &str, is_bot: bool) -> ChatMessage {
        ChatMessage {
            text: text.to_string(),
            message_id: id,
            message_date: Utc::now(),
            chat_id: "@jobs".into(),
            is_bot,
            category: String::new(),
        }
    }

    #[test]
    fn drops_short_and_bot_messages() {
        let long = "x".repeat(50);
        let short = "x".repeat(49);
        let kept = filter_messages(vec![
            message(1, &long, false),
            message(2, &short, false),
            message(3, &long, true),
            message(4, &long, false),
        ]);
        let ids: Vec<_> = kept.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn length_counts_characters() {
        // 50 Cyrillic characters are 100 bytes but still pass.
        let cyrillic = "я".repeat(50);
        assert_eq!(filter_messages(vec![message(1, &cyrillic, false)]).len(), 1);
        let shorter = "я".repeat(49);
        assert!(filter_messages(vec![message(1, &shorter, false)]).is_empty());
    }

    proptest! {
        #[test]
        fn filtered_messages_meet_criteria(
            specs in prop::collection::vec((0usize..120, any::<bool>()), 0..40)
        ) {
            let input: Vec<_> = specs
                .iter()
                .enumerate()
                .map(|(i, (len, bot))| message(i as i64, &"a".repeat(*len), *bot))
                .collect();
            let expected = specs.iter().filter(|(len, bot)| *len >= 50 && !bot).count();

            let kept = filter_messages(input);

            prop_assert_eq!(kept.len(), expected);
            prop_assert!(kept.iter().all(|m| !m.is_bot && char_len(&m.text) >= 50));
            prop_assert!(kept.windows(2).all(|w| w[0].message_id < w[1].message_id));
        }
    }
}
