//! Outbound messaging channel.

use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};

use crate::render::{Keyboard, Reply};
use crate::telegram::{TelegramApi, to_telegram_html};

/// Delivers replies to a chat and acknowledges button presses.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a reply, with its keyboard if it has one.
    async fn send(&self, chat_id: i64, reply: &Reply) -> Result<()>;

    /// Clear the pending indicator on a pressed button.
    async fn answer_callback(&self, callback_id: &str) -> Result<()>;
}

/// Telegram delivery through teloxide.
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
    api: TelegramApi,
}

impl TelegramMessenger {
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self {
            bot: Bot::new(token),
            api: TelegramApi::new(token),
        }
    }
}

fn inline_keyboard(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.token.clone()))
            .collect::<Vec<_>>()
    }))
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, chat_id: i64, reply: &Reply) -> Result<()> {
        let chat_id = ChatId(chat_id);

        let mut message = self
            .bot
            .send_message(chat_id, to_telegram_html(&reply.text))
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = &reply.keyboard {
            message = message.reply_markup(inline_keyboard(keyboard));
        }

        let Err(e) = message.await else {
            return Ok(());
        };

        // Fallback to plain text if HTML parsing fails
        tracing::warn!("HTML send to {chat_id} failed, retrying as plain text: {e}");
        let mut plain = self.bot.send_message(chat_id, reply.text.clone());
        if let Some(keyboard) = &reply.keyboard {
            plain = plain.reply_markup(inline_keyboard(keyboard));
        }
        plain.await?;

        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        self.api.answer_callback_query(callback_id).await
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records everything it is asked to deliver.
    #[derive(Default)]
    pub struct RecordingMessenger {
        pub sent: Mutex<Vec<(i64, Reply)>>,
        pub answered: Mutex<Vec<String>>,
        /// Sends and answers in call order.
        pub log: Mutex<Vec<String>>,
        pub fail_sends: bool,
    }

    impl RecordingMessenger {
        pub fn failing() -> Self {
            Self {
                fail_sends: true,
                ..Self::default()
            }
        }

        pub fn replies(&self) -> Vec<Reply> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, r)| r.clone())
                .collect()
        }

        pub fn last(&self) -> Reply {
            self.replies().pop().expect("nothing was sent")
        }

        pub fn clear(&self) {
            self.sent.lock().unwrap().clear();
            self.log.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send(&self, chat_id: i64, reply: &Reply) -> Result<()> {
            if self.fail_sends {
                anyhow::bail!("channel unavailable");
            }
            self.sent.lock().unwrap().push((chat_id, reply.clone()));
            self.log.lock().unwrap().push(format!("send {chat_id}"));
            Ok(())
        }

        async fn answer_callback(&self, callback_id: &str) -> Result<()> {
            self.answered.lock().unwrap().push(callback_id.to_string());
            self.log.lock().unwrap().push(format!("answer {callback_id}"));
            Ok(())
        }
    }
}
