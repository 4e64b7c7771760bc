//! In-memory message state for one client session.
//!
//! The store is the single source of truth for message state while the
//! client runs. It is constructed explicitly at session start and owned by
//! the session's apply loop; nothing here is a process-wide singleton.
//! State is not persisted and is lost when the session ends.

use std::collections::HashMap;
use std::sync::Arc;

use skylark_common::Message;
use tracing::debug;

/// A reaction or read receipt that arrived before its message, held for
/// replay once the message is appended.
#[derive(Clone, Debug)]
enum PendingOp {
    Reaction {
        emoji: Arc<str>,
        user_id: Arc<str>,
    },
    Read {
        user_id: Arc<str>,
    },
}

/// Mapping of chat id to its insertion-ordered message list, plus a
/// message-id → chat-id index so read receipts (which carry no chat id)
/// resolve without scanning every chat.
#[derive(Debug, Default)]
pub struct MessageStore {
    chats: HashMap<Arc<str>, Vec<Message>>,
    chat_index: HashMap<Arc<str>, Arc<str>>,
    // TODO: cap this; entries for messages that never arrive live forever
    pending: HashMap<Arc<str>, Vec<PendingOp>>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to the tail of its chat's list, creating the list
    /// on first use, and replays any buffered operations targeting it.
    ///
    /// Appending the same id twice produces two entries; de-duplication is
    /// the feed's responsibility, not the store's.
    pub fn append(&mut self, message: Message) {
        let id = message.id.clone();
        let chat_id = message.chat_id.clone();
        self.chat_index.insert(id.clone(), chat_id.clone());
        self.chats.entry(chat_id.clone()).or_default().push(message);
        if let Some(ops) = self.pending.remove(&id) {
            debug!(message_id = %id, replayed = ops.len(), "replaying buffered operations");
            for op in ops {
                match op {
                    PendingOp::Reaction { emoji, user_id } => {
                        self.add_reaction(id.clone(), chat_id.clone(), emoji, user_id)
                    }
                    PendingOp::Read { user_id } => self.mark_read(id.clone(), user_id),
                }
            }
        }
    }

    /// Records `user_id` reacting with `emoji` on the message in the named
    /// chat. If the message is not known yet (out-of-order delivery), the
    /// reaction is buffered and replayed when the message arrives; visible
    /// state stays unchanged until then.
    pub fn add_reaction(
        &mut self,
        message_id: Arc<str>,
        chat_id: Arc<str>,
        emoji: Arc<str>,
        user_id: Arc<str>,
    ) {
        let found = self
            .chats
            .get_mut(&chat_id)
            .and_then(|msgs| msgs.iter_mut().find(|m| m.id == message_id));
        match found {
            Some(message) => message.react(&emoji, &user_id),
            None => {
                debug!(%message_id, %chat_id, "buffering reaction for unknown message");
                self.pending
                    .entry(message_id)
                    .or_default()
                    .push(PendingOp::Reaction { emoji, user_id });
            }
        }
    }

    /// Records that `user_id` has seen the message. The chat is resolved
    /// through the index; an unknown id buffers like a reaction.
    pub fn mark_read(&mut self, message_id: Arc<str>, user_id: Arc<str>) {
        let chat_id = self.chat_index.get(&message_id).cloned();
        let found = chat_id.and_then(|chat_id| {
            self.chats
                .get_mut(&chat_id)
                .and_then(|msgs| msgs.iter_mut().find(|m| m.id == message_id))
        });
        match found {
            Some(message) => message.mark_read(&user_id),
            None => {
                debug!(%message_id, "buffering read receipt for unknown message");
                self.pending
                    .entry(message_id)
                    .or_default()
                    .push(PendingOp::Read { user_id });
            }
        }
    }

    /// The chat's messages in insertion order, oldest first; empty if the
    /// chat is unknown.
    pub fn messages(&self, chat_id: &str) -> &[Message] {
        self.chats
            .get(chat_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use skylark_common::{Reaction, User};

    fn message(id: &str, chat_id: &str) -> Message {
        Message {
            id: id.into(),
            chat_id: chat_id.into(),
            sender: User {
                id: "u1".into(),
                name: "alice".into(),
                avatar: None,
            },
            content: Some("hi".into()),
            media: None,
            created_at: "2024-01-01T00:00:00Z".parse().unwrap(),
            reactions: Vec::new(),
            read_by: Vec::new(),
        }
    }

    #[test]
    fn append_and_read_back_per_chat() {
        let mut store = MessageStore::new();
        store.append(message("m1", "c1"));
        assert_eq!(store.messages("c1"), &[message("m1", "c1")]);
        assert_eq!(store.messages("c2"), &[]);
    }

    #[test]
    fn append_is_not_idempotent_by_id() {
        let mut store = MessageStore::new();
        store.append(message("m1", "c1"));
        store.append(message("m1", "c1"));
        assert_eq!(store.messages("c1").len(), 2);
    }

    #[test]
    fn same_user_reacting_twice_counts_once() {
        let mut store = MessageStore::new();
        store.append(message("m1", "c1"));
        store.add_reaction("m1".into(), "c1".into(), "👍".into(), "u2".into());
        store.add_reaction("m1".into(), "c1".into(), "👍".into(), "u2".into());
        assert_eq!(
            store.messages("c1")[0].reactions,
            vec![Reaction {
                emoji: "👍".into(),
                count: 1,
                reacted_by: vec!["u2".into()],
            }]
        );
    }

    #[test]
    fn one_entry_per_distinct_emoji() {
        let mut store = MessageStore::new();
        store.append(message("m1", "c1"));
        store.add_reaction("m1".into(), "c1".into(), "👍".into(), "u2".into());
        store.add_reaction("m1".into(), "c1".into(), "🎉".into(), "u2".into());
        store.add_reaction("m1".into(), "c1".into(), "🚀".into(), "u3".into());
        assert_eq!(store.messages("c1")[0].reactions.len(), 3);
    }

    #[test]
    fn mark_read_is_monotone() {
        let mut store = MessageStore::new();
        store.append(message("m1", "c1"));
        store.mark_read("m1".into(), "u2".into());
        assert_eq!(store.messages("c1")[0].read_by.len(), 1);
        store.mark_read("m1".into(), "u2".into());
        assert_eq!(store.messages("c1")[0].read_by.len(), 1);
        store.mark_read("m1".into(), "u3".into());
        assert_eq!(store.messages("c1")[0].read_by.len(), 2);
    }

    #[test]
    fn read_receipt_resolves_chat_without_one() {
        let mut store = MessageStore::new();
        store.append(message("m1", "c1"));
        store.append(message("m2", "c2"));
        store.mark_read("m2".into(), "u5".into());
        assert_eq!(store.messages("c1")[0].read_by.len(), 0);
        assert_eq!(store.messages("c2")[0].read_by, vec![Arc::<str>::from("u5")]);
    }

    #[test]
    fn reaction_for_unknown_message_leaves_state_unchanged() {
        let mut store = MessageStore::new();
        store.append(message("m1", "c1"));
        store.add_reaction("missing".into(), "c1".into(), "👍".into(), "u2".into());
        assert_eq!(store.messages("c1"), &[message("m1", "c1")]);
    }

    #[test]
    fn buffered_operations_replay_when_the_message_arrives() {
        let mut store = MessageStore::new();
        store.add_reaction("m1".into(), "c1".into(), "👍".into(), "u2".into());
        store.mark_read("m1".into(), "u3".into());
        assert!(store.is_empty());

        store.append(message("m1", "c1"));
        let msg = &store.messages("c1")[0];
        assert_eq!(
            msg.reactions,
            vec![Reaction {
                emoji: "👍".into(),
                count: 1,
                reacted_by: vec!["u2".into()],
            }]
        );
        assert_eq!(msg.read_by, vec![Arc::<str>::from("u3")]);
    }
}
