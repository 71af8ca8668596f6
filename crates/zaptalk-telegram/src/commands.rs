//! The three bot commands and their fixed UI pieces.

use reqwest::Url;
use teloxide::types::{BotCommand, InlineKeyboardButton, InlineKeyboardMarkup};

/// Confirmation sent after a successful /reset.
pub const RESET_ACK: &str = "I've reset our conversation memory. Let's start fresh!";

const SUPPORT_URL: &str = "https://t.me/WorkGlows";
const UPDATES_URL: &str = "https://t.me/TheCryptoElders";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Reset,
}

/// Parse the leading `/command` token, tolerating the `@botname` suffix
/// Telegram appends in group chats and any trailing arguments.
///
/// Returns `None` for plain text and for commands this bot doesn't know.
pub fn parse(text: &str) -> Option<Command> {
    let first = text.trim().split_whitespace().next()?;
    let name = first.strip_prefix('/')?.split('@').next()?;
    match name.to_ascii_lowercase().as_str() {
        "start" => Some(Command::Start),
        "help" => Some(Command::Help),
        "reset" => Some(Command::Reset),
        _ => None,
    }
}

/// Command list registered in the Telegram menu at startup.
pub fn menu_commands(persona_name: &str) -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", format!("Start chatting with {persona_name}")),
        BotCommand::new("help", "Show help message"),
        BotCommand::new("reset", "Reset conversation memory"),
    ]
}

/// Link buttons attached to the /start greeting: support chat, an
/// add-to-group deep link for this bot, and the updates channel.
pub fn start_keyboard(bot_username: &str) -> InlineKeyboardMarkup {
    let links = [
        ("Support", SUPPORT_URL.to_string()),
        (
            "Add Me To Your Group",
            format!("https://t.me/{bot_username}?startgroup=true"),
        ),
        ("Updates", UPDATES_URL.to_string()),
    ];
    let rows: Vec<Vec<InlineKeyboardButton>> = links
        .into_iter()
        .filter_map(|(label, url)| {
            Url::parse(&url)
                .ok()
                .map(|u| vec![InlineKeyboardButton::url(label, u)])
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}
