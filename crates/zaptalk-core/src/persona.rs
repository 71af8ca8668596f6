use serde::{Deserialize, Serialize};

/// Fixed character instructions prepended to every prompt.
///
/// Loaded once at startup from config and never mutated; carries no per-user
/// state. The persona `name` doubles as the trailing cue token in the prompt
/// (`"Hinata:"`) and as the transcript label for assistant turns, so the
/// stored history and the cue always agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaTemplate {
    /// Display name — transcript label and prompt cue.
    pub name: String,
    /// Instruction block describing tone and character constraints.
    pub instructions: String,
    /// Reply to /start.
    pub greeting: String,
    /// Reply to /help.
    pub help_text: String,
    /// Fixed apologetic reply sent when storage or the model fails.
    pub fallback_reply: String,
}

impl Default for PersonaTemplate {
    fn default() -> Self {
        Self {
            name: "Hinata".to_string(),
            instructions: "Act as Hinata Hyuga from Naruto. You're kind, shy, gentle, and \
                           soft-spoken. Use short, human-like sentences with sweet and soft \
                           emojis (like blush, heart, sparkles). Speak naturally and \
                           affectionately. You're replying like a cute anime girl chatting \
                           with a friend."
                .to_string(),
            greeting: "Hi~ I'm Hinata... I’m always here if you want to talk.".to_string(),
            help_text: "I'm Hinata Hyuga~ You can just talk to me like a friend.\n\n\
                        Commands:\n\
                        /start - Start chatting with me\n\
                        /help - Show this message\n\
                        /reset - Reset our conversation"
                .to_string(),
            fallback_reply: "S-sorry... Something went wrong~".to_string(),
        }
    }
}

impl PersonaTemplate {
    /// The cue token that ends every prompt — where the model continues.
    pub fn cue(&self) -> String {
        format!("{}:", self.name)
    }
}
