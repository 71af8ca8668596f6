//! Per-message turn pipeline — shared by any transport.
//!
//! `run_turn` runs one full turn: validate → load transcript → compose
//! prompt → call the model → trim/truncate → persist both turns → return the
//! reply. The caller only handles transport-specific concerns (typing
//! indicator, reply delivery, error-to-text mapping).
//!
//! The full stored transcript goes into every prompt, uncapped. That is a
//! known scaling limitation, kept deliberately: truncating here would change
//! what the model sees.

use std::sync::Arc;

use tracing::info;

use zaptalk_core::config::{MAX_MESSAGE_CHARS, MAX_REPLY_CHARS};
use zaptalk_core::persona::PersonaTemplate;
use zaptalk_memory::{ConversationStore, StoreError};

use crate::provider::{ProviderError, TextCompletion};

/// Appended to replies cut at [`MAX_REPLY_CHARS`].
const REPLY_ELLIPSIS: &str = "...";

/// Fixed corrective reply for rejected input. User-correctable, so the
/// transport sends this directly instead of the apologetic fallback.
pub const REJECTION_REPLY: &str = "Please send a shorter message.";

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// Message empty after trimming, or longer than [`MAX_MESSAGE_CHARS`].
    #[error("message is empty or exceeds {MAX_MESSAGE_CHARS} characters")]
    InvalidMessage,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Orchestrates one chat turn against an explicit store and provider.
///
/// No global state: both collaborators are injected at construction and the
/// persona is fixed for the process lifetime.
pub struct TurnPipeline {
    store: Arc<dyn ConversationStore>,
    provider: Arc<dyn TextCompletion>,
    persona: PersonaTemplate,
}

impl TurnPipeline {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        provider: Arc<dyn TextCompletion>,
        persona: PersonaTemplate,
    ) -> Self {
        Self {
            store,
            provider,
            persona,
        }
    }

    pub fn persona(&self) -> &PersonaTemplate {
        &self.persona
    }

    /// Produce the reply for one inbound message and persist the exchange.
    ///
    /// Validation failures return before any store or model access. A store
    /// or provider failure is terminal for the turn: nothing is retried and
    /// nothing is persisted after the point of failure.
    pub async fn run_turn(&self, user_id: i64, message: &str) -> Result<String, TurnError> {
        let message = message.trim();
        if message.is_empty() || message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(TurnError::InvalidMessage);
        }

        let transcript = self.store.get(user_id).await?;

        let prompt = compose_prompt(&self.persona, &transcript, message);
        let completion = self.provider.complete(&prompt).await?;
        let reply = truncate_reply(completion.trim());

        let updated = format!(
            "{}\nUser: {}\n{}: {}",
            transcript, message, self.persona.name, reply
        );
        self.store.save(user_id, &updated).await?;

        info!(
            user_id,
            provider = self.provider.name(),
            reply_chars = reply.chars().count(),
            "turn complete"
        );

        Ok(reply)
    }

    /// Clear the user's conversation memory.
    pub async fn reset(&self, user_id: i64) -> Result<(), StoreError> {
        self.store.reset(user_id).await
    }
}

/// Persona instructions, blank line, stored transcript, the new message, and
/// the trailing cue the model continues from.
fn compose_prompt(persona: &PersonaTemplate, transcript: &str, message: &str) -> String {
    format!(
        "{}\n\n{}\nUser: {}\n{}",
        persona.instructions,
        transcript,
        message,
        persona.cue()
    )
}

/// Trimmed completions longer than [`MAX_REPLY_CHARS`] are cut at the first
/// 300 characters with an ellipsis appended.
fn truncate_reply(reply: &str) -> String {
    if reply.chars().count() > MAX_REPLY_CHARS {
        let mut out: String = reply.chars().take(MAX_REPLY_CHARS).collect();
        out.push_str(REPLY_ELLIPSIS);
        out
    } else {
        reply.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use zaptalk_memory::InMemoryStore;

    use super::*;

    /// Canned provider that records every prompt it receives.
    struct ScriptedProvider {
        reply: String,
        prompts: Mutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl TextCompletion for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    /// Store whose reads fail, as when the pool is exhausted or the database
    /// is down. Save calls are counted so tests can assert none happened.
    struct BrokenStore {
        saves: AtomicUsize,
    }

    impl BrokenStore {
        fn new() -> Self {
            Self {
                saves: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ConversationStore for BrokenStore {
        async fn get(&self, _user_id: i64) -> Result<String, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn save(&self, _user_id: i64, _transcript: &str) -> Result<(), StoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_persona() -> PersonaTemplate {
        PersonaTemplate {
            name: "Assistant".to_string(),
            instructions: "Be helpful.".to_string(),
            ..PersonaTemplate::default()
        }
    }

    fn pipeline_with(
        store: Arc<dyn ConversationStore>,
        provider: Arc<dyn TextCompletion>,
    ) -> TurnPipeline {
        TurnPipeline::new(store, provider, test_persona())
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_any_io() {
        let provider = Arc::new(ScriptedProvider::replying("hi"));
        let store = Arc::new(BrokenStore::new());
        let pipeline = pipeline_with(store.clone(), provider.clone());

        let err = pipeline.run_turn(1, "   \n  ").await.unwrap_err();
        assert!(matches!(err, TurnError::InvalidMessage));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oversized_message_is_rejected_before_any_io() {
        let provider = Arc::new(ScriptedProvider::replying("hi"));
        let store = Arc::new(BrokenStore::new());
        let pipeline = pipeline_with(store.clone(), provider.clone());

        let long = "x".repeat(MAX_MESSAGE_CHARS + 1);
        let err = pipeline.run_turn(1, &long).await.unwrap_err();
        assert!(matches!(err, TurnError::InvalidMessage));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn message_at_limit_is_accepted() {
        let provider = Arc::new(ScriptedProvider::replying("ok"));
        let pipeline = pipeline_with(Arc::new(InMemoryStore::new()), provider);

        let exact = "x".repeat(MAX_MESSAGE_CHARS);
        assert_eq!(pipeline.run_turn(1, &exact).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn first_turn_prompt_and_transcript_shapes() {
        let provider = Arc::new(ScriptedProvider::replying("Hello!"));
        let store = Arc::new(InMemoryStore::new());
        let pipeline = pipeline_with(store.clone(), provider.clone());

        let reply = pipeline.run_turn(1, "Hello").await.unwrap();

        assert_eq!(reply, "Hello!");
        assert_eq!(
            provider.last_prompt(),
            "Be helpful.\n\n\nUser: Hello\nAssistant:"
        );
        assert_eq!(
            store.get(1).await.unwrap(),
            "\nUser: Hello\nAssistant: Hello!"
        );
    }

    #[tokio::test]
    async fn second_turn_carries_prior_history_in_prompt_and_store() {
        let provider = Arc::new(ScriptedProvider::replying("Sure."));
        let store = Arc::new(InMemoryStore::new());
        let pipeline = pipeline_with(store.clone(), provider.clone());

        pipeline.run_turn(1, "First").await.unwrap();
        pipeline.run_turn(1, "Second").await.unwrap();

        assert_eq!(
            provider.last_prompt(),
            "Be helpful.\n\n\nUser: First\nAssistant: Sure.\nUser: Second\nAssistant:"
        );
        assert_eq!(
            store.get(1).await.unwrap(),
            "\nUser: First\nAssistant: Sure.\nUser: Second\nAssistant: Sure."
        );
    }

    #[tokio::test]
    async fn message_is_trimmed_before_composition() {
        let provider = Arc::new(ScriptedProvider::replying("ok"));
        let store = Arc::new(InMemoryStore::new());
        let pipeline = pipeline_with(store, provider.clone());

        pipeline.run_turn(1, "  Hello  ").await.unwrap();
        assert_eq!(
            provider.last_prompt(),
            "Be helpful.\n\n\nUser: Hello\nAssistant:"
        );
    }

    #[tokio::test]
    async fn long_completion_truncates_to_303_chars() {
        let long_reply = "a".repeat(MAX_REPLY_CHARS + 50);
        let provider = Arc::new(ScriptedProvider::replying(&long_reply));
        let pipeline = pipeline_with(Arc::new(InMemoryStore::new()), provider);

        let reply = pipeline.run_turn(1, "talk to me").await.unwrap();
        assert_eq!(reply.chars().count(), MAX_REPLY_CHARS + REPLY_ELLIPSIS.len());
        assert_eq!(reply, format!("{}{}", "a".repeat(MAX_REPLY_CHARS), REPLY_ELLIPSIS));
    }

    #[tokio::test]
    async fn completion_whitespace_is_trimmed_not_truncated() {
        let provider = Arc::new(ScriptedProvider::replying("  padded reply \n"));
        let pipeline = pipeline_with(Arc::new(InMemoryStore::new()), provider);

        let reply = pipeline.run_turn(1, "hi").await.unwrap();
        assert_eq!(reply, "padded reply");
    }

    #[tokio::test]
    async fn store_failure_on_get_skips_save_and_surfaces() {
        let provider = Arc::new(ScriptedProvider::replying("hi"));
        let store = Arc::new(BrokenStore::new());
        let pipeline = pipeline_with(store.clone(), provider.clone());

        let err = pipeline.run_turn(1, "hello").await.unwrap_err();
        assert!(matches!(err, TurnError::Store(_)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_failure_leaves_transcript_untouched() {
        struct FailingProvider;

        #[async_trait]
        impl TextCompletion for FailingProvider {
            fn name(&self) -> &str {
                "failing"
            }

            async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
                Err(ProviderError::Parse("empty completion".to_string()))
            }
        }

        let store = Arc::new(InMemoryStore::new());
        let pipeline = pipeline_with(store.clone(), Arc::new(FailingProvider));

        let err = pipeline.run_turn(1, "hello").await.unwrap_err();
        assert!(matches!(err, TurnError::Provider(_)));
        assert_eq!(store.get(1).await.unwrap(), "");
    }

    #[tokio::test]
    async fn reset_clears_accumulated_history() {
        let provider = Arc::new(ScriptedProvider::replying("hi"));
        let store = Arc::new(InMemoryStore::new());
        let pipeline = pipeline_with(store.clone(), provider);

        pipeline.run_turn(1, "hello").await.unwrap();
        pipeline.reset(1).await.unwrap();
        assert_eq!(store.get(1).await.unwrap(), "");
    }
}
