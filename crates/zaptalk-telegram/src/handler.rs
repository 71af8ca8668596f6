//! Message handler registered in the teloxide Dispatcher.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::warn;

use zaptalk_agent::pipeline::{TurnError, TurnPipeline, REJECTION_REPLY};

use crate::commands::{self, Command};
use crate::send;
use crate::typing::TypingHandle;

/// Runs for every incoming `Message`. Performs:
/// 1. Bot-message filter
/// 2. Sender / text extraction (media-only messages are ignored)
/// 3. Command interception (/start, /help, /reset)
/// 4. Non-blocking turn pipeline invocation with typing indicator
pub async fn handle_message(
    bot: Bot,
    msg: Message,
    pipeline: Arc<TurnPipeline>,
) -> ResponseResult<()> {
    // Ignore messages from other bots.
    if msg.from.as_ref().map(|u| u.is_bot).unwrap_or(false) {
        return Ok(());
    }

    let from = match msg.from.as_ref() {
        Some(u) => u,
        None => return Ok(()),
    };
    let user_id = from.id.0 as i64;
    let chat_id = msg.chat.id;

    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    if let Some(command) = commands::parse(&text) {
        handle_command(&bot, chat_id, user_id, command, &pipeline).await;
        return Ok(());
    }
    if text.trim_start().starts_with('/') {
        // Unregistered commands are ignored, never fed to the model.
        return Ok(());
    }

    // Run the turn on its own task so a slow model call never blocks the
    // dispatcher or other users' turns.
    let bot2 = bot.clone();
    let pipeline2 = Arc::clone(&pipeline);
    tokio::spawn(async move {
        let typing = TypingHandle::start(bot2.clone(), chat_id);
        let result = pipeline2.run_turn(user_id, &text).await;
        typing.stop();

        match result {
            Ok(reply) => send::send_response(&bot2, chat_id, &reply).await,
            Err(TurnError::InvalidMessage) => {
                send::send_response(&bot2, chat_id, REJECTION_REPLY).await;
            }
            Err(e) => {
                warn!(error = %e, user_id, "turn pipeline failed");
                send::send_response(&bot2, chat_id, &pipeline2.persona().fallback_reply).await;
            }
        }
    });

    Ok(())
}

async fn handle_command(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    command: Command,
    pipeline: &Arc<TurnPipeline>,
) {
    match command {
        Command::Start => {
            let bot_username = bot
                .get_me()
                .await
                .ok()
                .and_then(|me| me.user.username)
                .unwrap_or_default();
            let sent = bot
                .send_message(chat_id, pipeline.persona().greeting.clone())
                .reply_markup(commands::start_keyboard(&bot_username))
                .await;
            if let Err(e) = sent {
                warn!(error = %e, "failed to send greeting");
            }
        }
        Command::Help => {
            send::send_response(bot, chat_id, &pipeline.persona().help_text).await;
        }
        Command::Reset => match pipeline.reset(user_id).await {
            Ok(()) => send::send_response(bot, chat_id, commands::RESET_ACK).await,
            Err(e) => {
                warn!(error = %e, user_id, "conversation reset failed");
                send::send_response(bot, chat_id, &pipeline.persona().fallback_reply).await;
            }
        },
    }
}
