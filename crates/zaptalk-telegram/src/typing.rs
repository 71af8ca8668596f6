//! Typing indicator — Telegram's typing status expires after ~5 seconds,
//! so it is refreshed every 4 until stopped.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ChatAction;

/// Handle to a background typing indicator task.
///
/// Call `stop()` once the reply is ready.
pub struct TypingHandle(tokio::task::JoinHandle<()>);

impl TypingHandle {
    /// Send `ChatAction::Typing` immediately, then every 4 seconds until
    /// stopped. The loop also ends on its own if the send starts failing.
    pub fn start(bot: Bot, chat_id: ChatId) -> Self {
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(4));
            loop {
                tick.tick().await;
                if bot.send_chat_action(chat_id, ChatAction::Typing).await.is_err() {
                    break;
                }
            }
        });
        TypingHandle(handle)
    }

    pub fn stop(self) {
        self.0.abort();
    }
}
