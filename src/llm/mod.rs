pub mod noop;
pub mod ollama;
pub mod prompt_builder;
mod prompts;

use crate::config::GenerationConfig;
use anyhow::Result;

/// Trait for talking to a text-generation backend.
pub trait LlmClient: Send + Sync {
    /// Send a fully assembled prompt and return the model's raw output.
    fn generate(&self, prompt: &str, cfg: &GenerationConfig) -> Result<String>;
}
