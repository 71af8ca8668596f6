pub mod gemini;
pub mod pipeline;
pub mod provider;

pub use gemini::GeminiProvider;
pub use pipeline::{TurnError, TurnPipeline};
pub use provider::{ProviderError, TextCompletion};
