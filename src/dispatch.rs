//! Routes raw Telegram updates into the dialogue.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::Mutex as TurnLock;

use crate::channel::Messenger;
use crate::dialogue::{Dialogue, Event};

/// What an update asks of us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A pressed inline button.
    Button {
        chat_id: i64,
        user_id: Option<u64>,
        callback_id: String,
        data: String,
    },
    /// A callback with nothing to act on. It still gets answered.
    EmptyCallback { callback_id: String },
    /// A text message: command or free text.
    Text {
        chat_id: i64,
        user_id: Option<u64>,
        text: String,
    },
    Ignored,
}

impl Inbound {
    /// Classify an update object. Anything unexpected is [`Inbound::Ignored`].
    #[must_use]
    pub fn classify(update: &Value) -> Self {
        if let Some(callback) = update.get("callback_query") {
            let Some(callback_id) = callback.get("id").and_then(Value::as_str) else {
                return Self::Ignored;
            };
            let chat_id = callback
                .pointer("/message/chat/id")
                .and_then(Value::as_i64);
            let data = callback.get("data").and_then(Value::as_str);

            return match (chat_id, data) {
                (Some(chat_id), Some(data)) => Self::Button {
                    chat_id,
                    user_id: callback.pointer("/from/id").and_then(Value::as_u64),
                    callback_id: callback_id.to_string(),
                    data: data.to_string(),
                },
                _ => Self::EmptyCallback {
                    callback_id: callback_id.to_string(),
                },
            };
        }

        if let Some(message) = update.get("message")
            && let Some(chat_id) = message.pointer("/chat/id").and_then(Value::as_i64)
            && let Some(text) = message.get("text").and_then(Value::as_str)
        {
            return Self::Text {
                chat_id,
                user_id: message.pointer("/from/id").and_then(Value::as_u64),
                text: text.to_string(),
            };
        }

        Self::Ignored
    }

    /// The chat this update belongs to, if it needs handling.
    #[must_use]
    pub const fn chat_id(&self) -> Option<i64> {
        match self {
            Self::Button { chat_id, .. } | Self::Text { chat_id, .. } => Some(*chat_id),
            Self::EmptyCallback { .. } | Self::Ignored => None,
        }
    }

    fn callback_id(&self) -> Option<&str> {
        match self {
            Self::Button { callback_id, .. } | Self::EmptyCallback { callback_id } => {
                Some(callback_id.as_str())
            }
            Self::Text { .. } | Self::Ignored => None,
        }
    }
}

/// Feeds updates to the dialogue and acknowledges button presses.
///
/// Updates for one chat are handled one at a time; different chats run
/// concurrently.
pub struct Dispatcher {
    dialogue: Dialogue,
    messenger: Arc<dyn Messenger>,
    allowed_users: Vec<u64>,
    turns: Mutex<HashMap<i64, Arc<TurnLock<()>>>>,
}

impl Dispatcher {
    /// `allowed_users` empty means everyone may use the bot.
    pub fn new(dialogue: Dialogue, messenger: Arc<dyn Messenger>, allowed_users: Vec<u64>) -> Self {
        Self {
            dialogue,
            messenger,
            allowed_users,
            turns: Mutex::default(),
        }
    }

    fn is_allowed(&self, user_id: Option<u64>) -> bool {
        self.allowed_users.is_empty()
            || user_id.is_some_and(|id| self.allowed_users.contains(&id))
    }

    /// Handle one update. Never fails; problems are logged.
    ///
    /// Button presses are answered first so the client stops its spinner
    /// while a menu is being generated.
    pub async fn dispatch(&self, update: &Value) {
        let inbound = Inbound::classify(update);

        if let Some(callback_id) = inbound.callback_id() {
            self.answer(callback_id).await;
        }

        let Some(chat_id) = inbound.chat_id() else {
            if inbound == Inbound::Ignored {
                tracing::debug!("Ignoring update: {update}");
            }
            return;
        };

        let turn = self.turn(chat_id).lock_owned().await;
        match inbound {
            Inbound::Button { user_id, data, .. } => {
                if self.is_allowed(user_id) {
                    self.dialogue.handle(chat_id, Event::Button(data)).await;
                } else {
                    tracing::warn!("Ignoring button from unauthorized user {user_id:?}");
                }
            }
            Inbound::Text { user_id, text, .. } => {
                if self.is_allowed(user_id) {
                    self.dialogue.handle(chat_id, Event::from_text(&text)).await;
                } else {
                    tracing::warn!("Ignoring message from unauthorized user {user_id:?}");
                }
            }
            Inbound::EmptyCallback { .. } | Inbound::Ignored => {}
        }
        drop(turn);
        self.release(chat_id);
    }

    /// The lock serializing work for `chat_id`.
    fn turn(&self, chat_id: i64) -> Arc<TurnLock<()>> {
        let mut turns = self.turns.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(turns.entry(chat_id).or_default())
    }

    /// Forget the chat's lock once nobody holds or waits on it.
    fn release(&self, chat_id: i64) {
        let mut turns = self.turns.lock().unwrap_or_else(PoisonError::into_inner);
        if turns
            .get(&chat_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            turns.remove(&chat_id);
        }
    }

    #[cfg(test)]
    fn tracked_chats(&self) -> usize {
        self.turns.lock().unwrap().len()
    }

    async fn answer(&self, callback_id: &str) {
        if let Err(e) = self.messenger.answer_callback(callback_id).await {
            tracing::warn!("Failed to answer callback {callback_id}: {e:?}");
        }
    }
}
