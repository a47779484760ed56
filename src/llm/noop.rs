use anyhow::Result;
use log::debug;

use super::LlmClient;
use crate::config::GenerationConfig;

/// Canned reply shaped like real model output, reasoning block included.
pub const NOOP_RESPONSE: &str =
    "<think>offline mode, no model was called</think>\n[COMMIT]\n**chore**: placeholder message\n[/COMMIT]";

/// Client used with `--no-model`; never touches the network.
pub struct NoopClient;

impl LlmClient for NoopClient {
    fn generate(&self, prompt: &str, cfg: &GenerationConfig) -> Result<String> {
        debug!(
            "NoopClient: skipping {} with a {}-char prompt",
            cfg.model,
            prompt.len()
        );
        Ok(NOOP_RESPONSE.to_string())
    }
}
