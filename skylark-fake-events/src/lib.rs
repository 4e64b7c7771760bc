//! Generates a plausible stream of chat events for running the client
//! without a backend: messages across a few fixed chats, reactions and
//! read receipts against recent messages, and the occasional reaction
//! that arrives before its message.

use std::sync::Arc;

use chrono::Utc;
use rand::prelude::{Rng, SliceRandom};
use skylark_common::{event::RawUser, ChatEvent, RawMessage, ReactionEvent, ReadEvent};
use uuid::Uuid;

const CHAT_COUNT: usize = 3;

const USER_NAMES: &[&str] = &["alice", "bob", "charlie", "dana"];

const EMOJIS: &[&str] = &["👍", "🎉", "😂", "🚀"];

struct Generator {
    chats: Vec<Arc<str>>,
    users: Vec<(Arc<str>, Arc<str>)>,
    /// Recent (message id, chat id) pairs for reactions and reads.
    recent: Vec<(Arc<str>, Arc<str>)>,
    /// An id already used by an early reaction; the next message event
    /// reuses it, so the store's replay path gets exercised.
    promised: Option<(Arc<str>, Arc<str>)>,
}

impl Generator {
    fn new() -> Self {
        let chats = (0..CHAT_COUNT)
            .map(|_| Arc::from(Uuid::now_v7().to_string()))
            .collect();
        let users = USER_NAMES
            .iter()
            .map(|name| {
                (
                    Arc::from(Uuid::now_v7().to_string()),
                    Arc::from(*name),
                )
            })
            .collect();
        Self {
            chats,
            users,
            recent: Vec::new(),
            promised: None,
        }
    }

    fn generate(&mut self, rng: &mut impl Rng) -> ChatEvent {
        const MIN_MESSAGE_WORDS: usize = 1;
        const MAX_MESSAGE_WORDS: usize = 15;
        const MAX_RECENT: usize = 20;

        let roll = rng.gen_range(0..100);
        if roll < 10 && self.promised.is_none() && !self.recent.is_empty() {
            // react to a message nobody has seen yet
            let chat_id = self.chats.choose(rng).unwrap().clone();
            let message_id: Arc<str> = Uuid::now_v7().to_string().into();
            self.promised = Some((message_id.clone(), chat_id.clone()));
            return self.reaction(message_id, chat_id, rng);
        }
        if roll < 25 {
            if let Some((message_id, chat_id)) = self.recent.choose(rng).cloned() {
                return self.reaction(message_id, chat_id, rng);
            }
        }
        if roll < 40 {
            if let Some((message_id, _)) = self.recent.choose(rng).cloned() {
                let (user_id, _) = self.users.choose(rng).unwrap().clone();
                return ChatEvent::Read(ReadEvent {
                    message_id,
                    user_id,
                });
            }
        }

        let (message_id, chat_id) = self.promised.take().unwrap_or_else(|| {
            (
                Uuid::now_v7().to_string().into(),
                self.chats.choose(rng).unwrap().clone(),
            )
        });
        self.recent.push((message_id.clone(), chat_id.clone()));
        if self.recent.len() > MAX_RECENT {
            self.recent.remove(0);
        }
        let (user_id, user_name) = self.users.choose(rng).unwrap().clone();
        let words = rng.gen_range(MIN_MESSAGE_WORDS..=MAX_MESSAGE_WORDS);
        ChatEvent::Message(RawMessage {
            id: Some(message_id),
            chat_id: Some(chat_id),
            user_id: Some(user_id.clone()),
            user: Some(RawUser {
                id: Some(user_id),
                name: Some(user_name),
                avatar: None,
            }),
            content: Some(lipsum::lipsum_words_with_rng(&mut *rng, words).into()),
            file: None,
            created_at: Some(Utc::now()),
            reactions: None,
            read_by: None,
        })
    }

    fn reaction(
        &mut self,
        message_id: Arc<str>,
        chat_id: Arc<str>,
        rng: &mut impl Rng,
    ) -> ChatEvent {
        let (user_id, _) = self.users.choose(rng).unwrap().clone();
        ChatEvent::Reaction(ReactionEvent {
            message_id,
            chat_id,
            emoji: Arc::from(*EMOJIS.choose(rng).unwrap()),
            user_id,
        })
    }
}

pub async fn event_sender(channel: tokio::sync::mpsc::UnboundedSender<ChatEvent>) {
    let mut generator = Generator::new();
    loop {
        let event = generator.generate(&mut rand::thread_rng());
        if channel.send(event).is_err() {
            return;
        }
        let millis = rand::thread_rng().gen_range(0..3000);
        tokio::time::sleep(tokio::time::Duration::from_millis(millis)).await;
    }
}
