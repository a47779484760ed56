use anyhow::{bail, Result};
use log::debug;

use crate::config::Config;
use crate::llm::noop::NoopClient;
use crate::llm::ollama::OllamaClient;
use crate::llm::LlmClient;

/// Build the LLM client based on CLI + config.
pub fn build_llm_client(cfg: &Config, no_model: bool) -> Result<Box<dyn LlmClient>> {
    if no_model {
        debug!("Using NoopClient (no model calls)");
        return Ok(Box::new(NoopClient));
    }

    debug!("Using OllamaClient with model {} at {}", cfg.model, cfg.endpoint);
    Ok(Box::new(OllamaClient::new()?))
}

/// Client for server management commands, which have no offline fallback.
pub fn build_ollama_client(no_model: bool) -> Result<OllamaClient> {
    if no_model {
        bail!("this command talks to the Ollama server and cannot run with --no-model");
    }
    OllamaClient::new()
}
