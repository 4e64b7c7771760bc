//! Wire-level chat events and the adapter into canonical messages.
//!
//! Inbound frames are `{"type": ..., "payload": ...}` JSON objects; the
//! backend is inconsistent about field casing and sub-objects, so the raw
//! shapes here accept both spellings and treat every field as optional.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MediaKind, MediaMeta, Message, Reaction, User};

/// One inbound frame from the real-time channel, classified by its `type`
/// discriminator. Types this client does not understand land in `Unknown`
/// and are dropped by the subscription.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum ChatEvent {
    Message(RawMessage),
    Reaction(ReactionEvent),
    Read(ReadEvent),
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionEvent {
    #[serde(alias = "message_id")]
    pub message_id: Arc<str>,
    #[serde(alias = "chat_id")]
    pub chat_id: Arc<str>,
    pub emoji: Arc<str>,
    #[serde(alias = "user_id")]
    pub user_id: Arc<str>,
}

/// Read receipts carry no chat id; the store resolves the chat through its
/// message-id index.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadEvent {
    #[serde(alias = "message_id")]
    pub message_id: Arc<str>,
    #[serde(alias = "user_id")]
    pub user_id: Arc<str>,
}

/// Client-originated frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum OutboundFrame {
    #[serde(rename = "message:send")]
    MessageSend { chat_id: Arc<str>, text: Arc<str> },
}

/// A message as the backend sends it: partial, snake_case or camelCase,
/// with optional nested `user` and `file` sub-objects.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub id: Option<Arc<str>>,
    #[serde(default, alias = "chatId")]
    pub chat_id: Option<Arc<str>>,
    #[serde(default, alias = "userId")]
    pub user_id: Option<Arc<str>>,
    #[serde(default, alias = "sender")]
    pub user: Option<RawUser>,
    #[serde(default, alias = "text")]
    pub content: Option<Arc<str>>,
    #[serde(default)]
    pub file: Option<RawFile>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reactions: Option<Vec<Reaction>>,
    #[serde(default, alias = "readBy")]
    pub read_by: Option<Vec<Arc<str>>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawUser {
    #[serde(default)]
    pub id: Option<Arc<str>>,
    #[serde(default)]
    pub name: Option<Arc<str>>,
    #[serde(default)]
    pub avatar: Option<Arc<str>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFile {
    #[serde(default)]
    pub name: Option<Arc<str>>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, rename = "type")]
    pub kind: Option<Arc<str>>,
}

impl RawMessage {
    /// Adapts the raw shape into a fully populated [`Message`].
    ///
    /// Never fails: a missing id is synthesized from `now`, a missing
    /// sender becomes the `"Unknown"` placeholder, and absent collections
    /// default to empty. `now` is passed in so the fallback path stays
    /// deterministic under test.
    pub fn into_message(self, now: DateTime<Utc>) -> Message {
        let fallback_id: Arc<str> = now.timestamp_millis().to_string().into();
        let sender = match self.user {
            Some(user) => User {
                id: user
                    .id
                    .or(self.user_id)
                    .unwrap_or_else(|| fallback_id.clone()),
                name: user.name.unwrap_or_else(|| "Unknown".into()),
                avatar: user.avatar,
            },
            None => User {
                id: self.user_id.unwrap_or_else(|| fallback_id.clone()),
                name: "Unknown".into(),
                avatar: None,
            },
        };
        Message {
            id: self.id.unwrap_or_else(|| fallback_id.clone()),
            chat_id: self.chat_id.unwrap_or_else(|| "unknown".into()),
            sender,
            content: self.content,
            media: self.file.map(|file| MediaMeta {
                name: file.name.unwrap_or_else(|| "unnamed".into()),
                size: file.size.unwrap_or(0),
                kind: file
                    .kind
                    .map(|label| MediaKind::from_label(&label))
                    .unwrap_or_default(),
            }),
            created_at: self.created_at.unwrap_or(now),
            reactions: self.reactions.unwrap_or_default(),
            read_by: self.read_by.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        "2024-01-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn adapts_a_complete_snake_case_message() {
        let raw: RawMessage = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "chat_id": "c1",
            "user": { "id": "u1", "name": "alice" },
            "text": "hello",
            "created_at": "2024-03-05T12:30:00Z",
        }))
        .unwrap();
        let msg = raw.into_message(now());
        assert_eq!(&*msg.id, "m1");
        assert_eq!(&*msg.chat_id, "c1");
        assert_eq!(&*msg.sender.name, "alice");
        assert_eq!(msg.content.as_deref(), Some("hello"));
        assert_eq!(msg.created_at, "2024-03-05T12:30:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(msg.reactions, Vec::new());
        assert_eq!(msg.read_by, Vec::<Arc<str>>::new());
    }

    #[test]
    fn adapts_camel_case_aliases() {
        let raw: RawMessage = serde_json::from_value(serde_json::json!({
            "id": "m2",
            "chatId": "c1",
            "userId": "u2",
            "content": "hi",
            "createdAt": "2024-03-05T12:31:00Z",
        }))
        .unwrap();
        let msg = raw.into_message(now());
        assert_eq!(&*msg.chat_id, "c1");
        assert_eq!(&*msg.sender.id, "u2");
        assert_eq!(&*msg.sender.name, "Unknown");
    }

    #[test]
    fn empty_payload_synthesizes_every_required_field() {
        let msg = RawMessage::default().into_message(now());
        assert_eq!(&*msg.id, "1704067200000");
        assert_eq!(msg.id, msg.sender.id);
        assert_eq!(&*msg.sender.name, "Unknown");
        assert_eq!(&*msg.chat_id, "unknown");
        assert_eq!(msg.created_at, now());
        assert_eq!(msg.content, None);
        assert_eq!(msg.media, None);
    }

    #[test]
    fn file_sub_object_becomes_media_meta() {
        let raw: RawMessage = serde_json::from_value(serde_json::json!({
            "id": "m3",
            "chat_id": "c1",
            "file": { "name": "cat.png", "size": 2048, "type": "image/png" },
        }))
        .unwrap();
        let msg = raw.into_message(now());
        assert_eq!(
            msg.media,
            Some(MediaMeta {
                name: "cat.png".into(),
                size: 2048,
                kind: MediaKind::Image,
            })
        );
    }

    #[test]
    fn classifies_inbound_frames_by_type() {
        let event: ChatEvent = serde_json::from_str(
            r#"{"type":"reaction","payload":{"messageId":"m1","chatId":"c1","emoji":"👍","userId":"u2"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ChatEvent::Reaction(ReactionEvent {
                message_id: "m1".into(),
                chat_id: "c1".into(),
                emoji: "👍".into(),
                user_id: "u2".into(),
            })
        );

        let event: ChatEvent = serde_json::from_str(
            r#"{"type":"read","payload":{"message_id":"m1","user_id":"u3"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ChatEvent::Read(ReadEvent {
                message_id: "m1".into(),
                user_id: "u3".into(),
            })
        );
    }

    #[test]
    fn unknown_frame_types_are_not_fatal() {
        let event: ChatEvent =
            serde_json::from_str(r#"{"type":"typing","payload":{"chat_id":"c1"}}"#).unwrap();
        assert_eq!(event, ChatEvent::Unknown);
    }

    #[test]
    fn outbound_send_frame_shape() {
        let frame = OutboundFrame::MessageSend {
            chat_id: "c1".into(),
            text: "hello".into(),
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            serde_json::json!({
                "type": "message:send",
                "payload": { "chat_id": "c1", "text": "hello" },
            })
        );
    }
}
