use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod event;

pub use event::{ChatEvent, OutboundFrame, RawMessage, ReactionEvent, ReadEvent};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Arc<str>,
    pub name: Arc<str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Arc<str>>,
}

/// Attachment category derived from the backend's MIME-ish type label.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    File,
    Audio,
    Video,
    #[default]
    Other,
}

impl MediaKind {
    /// Maps a label like `"image"` or `"image/png"` to a category.
    pub fn from_label(label: &str) -> Self {
        let category = label.split('/').next().unwrap_or(label);
        match category {
            "image" => MediaKind::Image,
            "file" => MediaKind::File,
            "audio" => MediaKind::Audio,
            "video" => MediaKind::Video,
            _ => MediaKind::Other,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaMeta {
    pub name: Arc<str>,
    pub size: u64,
    pub kind: MediaKind,
}

/// Emoji-keyed aggregate of the users who reacted to a message.
///
/// `count` is always recomputed from `reacted_by`; nothing ever increments
/// it directly, so the two cannot diverge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: Arc<str>,
    pub count: usize,
    pub reacted_by: Vec<Arc<str>>,
}

impl Reaction {
    pub fn new(emoji: Arc<str>, user_id: Arc<str>) -> Self {
        Self {
            emoji,
            count: 1,
            reacted_by: vec![user_id],
        }
    }

    /// Adds a user to the reaction; a duplicate user is a no-op.
    pub fn add_user(&mut self, user_id: &Arc<str>) {
        if !self.reacted_by.contains(user_id) {
            self.reacted_by.push(user_id.clone());
        }
        self.count = self.reacted_by.len();
    }
}

/// The canonical, fully populated chat message.
///
/// Immutable once created except for `reactions` and `read_by`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Arc<str>,
    pub chat_id: Arc<str>,
    pub sender: User,
    #[serde(default)]
    pub content: Option<Arc<str>>,
    #[serde(default)]
    pub media: Option<MediaMeta>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub read_by: Vec<Arc<str>>,
}

impl Message {
    pub fn sender_id(&self) -> &Arc<str> {
        &self.sender.id
    }

    /// Records `user_id` reacting with `emoji`, creating the reaction entry
    /// if this emoji is new on the message.
    pub fn react(&mut self, emoji: &Arc<str>, user_id: &Arc<str>) {
        match self.reactions.iter_mut().find(|r| r.emoji == *emoji) {
            Some(reaction) => reaction.add_user(user_id),
            None => self
                .reactions
                .push(Reaction::new(emoji.clone(), user_id.clone())),
        }
    }

    /// Records that `user_id` has seen the message. `read_by` only grows.
    pub fn mark_read(&mut self, user_id: &Arc<str>) {
        if !self.read_by.contains(user_id) {
            self.read_by.push(user_id.clone());
        }
    }
}
