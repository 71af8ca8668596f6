//! Telegram channel adapter.
//!
//! Wraps a teloxide `Bot` + `Dispatcher` and drives the long-polling event
//! loop for the lifetime of the process. Long polling — no public URL
//! required.

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::info;

use zaptalk_agent::pipeline::TurnPipeline;
use zaptalk_core::config::TelegramConfig;

use crate::commands;
use crate::error::TelegramError;
use crate::handler::handle_message;

pub struct TelegramAdapter {
    pipeline: Arc<TurnPipeline>,
    config: TelegramConfig,
}

impl TelegramAdapter {
    pub fn new(config: &TelegramConfig, pipeline: Arc<TurnPipeline>) -> Self {
        Self {
            pipeline,
            config: config.clone(),
        }
    }

    /// Register the command menu, then drive the long-polling loop.
    ///
    /// Only returns early if the bot can't be set up; once dispatching
    /// starts it runs until the process exits.
    pub async fn run(self) -> Result<(), TelegramError> {
        if self.config.bot_token.trim().is_empty() {
            return Err(TelegramError::NoToken);
        }
        let bot = Bot::new(&self.config.bot_token);

        let persona_name = self.pipeline.persona().name.clone();
        bot.set_my_commands(commands::menu_commands(&persona_name))
            .await?;

        info!("starting long-polling dispatcher");

        let handler = Update::filter_message().endpoint(handle_message);

        Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![self.pipeline])
            .default_handler(|_upd| async {})
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}
