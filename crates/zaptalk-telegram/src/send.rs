//! Reply delivery. Replies are capped well under Telegram's 4096-character
//! message limit, so a single plain-text send is enough — no chunking, no
//! parse mode.

use teloxide::prelude::*;
use tracing::warn;

/// Send `text` to `chat_id`, logging instead of propagating on failure.
/// A dropped reply must not take the dispatcher down.
pub async fn send_response(bot: &Bot, chat_id: ChatId, text: &str) {
    if let Err(e) = bot.send_message(chat_id, text).await {
        warn!(error = %e, chat_id = chat_id.0, "failed to send message");
    }
}
