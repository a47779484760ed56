//! The one procedure behind generate, enhance, reduce, and PR summary.
//!
//! Collect source text, fill the action's template, optionally let the user
//! review the prompt, call the model, then clean the reply. Everything that
//! differs between actions comes from [`ActionKind`].

use anyhow::{Context, Result};
use log::{debug, info};

use crate::cleanup;
use crate::config::Config;
use crate::llm::prompt_builder::{self, ActionKind, TemplateError};
use crate::llm::LlmClient;

/// Capabilities the host environment lends the orchestrator.
pub trait Host {
    /// Report how far along the model call is, from 0.0 to 1.0.
    fn report_progress(&self, fraction: f32, message: &str);

    /// Show `prompt_text` and ask whether to go ahead.
    fn confirm(&self, prompt_text: &str) -> Result<bool>;
}

/// How an action ended when nothing went wrong on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed { raw: String, message: String },
    NothingToDo(String),
    InvalidTemplate(TemplateError),
    Declined,
    EmptyResult { raw: String },
}

fn nothing_to_do(kind: ActionKind) -> String {
    match kind {
        ActionKind::Generate => "No changes to commit.".to_string(),
        ActionKind::Enhance | ActionKind::Reduce => format!("No commit message found to {kind}."),
        ActionKind::PrSummary => {
            "No commits found. Make sure you have commits in your branch.".to_string()
        }
    }
}

/// Run `kind` end to end.
///
/// `collect` supplies the source text (diff, message, or commit list) and
/// returns `None` when there is nothing to work on. Git and HTTP failures come
/// back as errors; every other ending is an [`Outcome`].
pub fn run_action<F>(
    kind: ActionKind,
    config: &Config,
    collect: F,
    client: &dyn LlmClient,
    host: &dyn Host,
) -> Result<Outcome>
where
    F: FnOnce() -> Result<Option<String>>,
{
    let source = match collect().with_context(|| format!("failed to collect input for {kind}"))? {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Ok(Outcome::NothingToDo(nothing_to_do(kind))),
    };

    let template = prompt_builder::resolve_template(kind, config.prompt_override(kind));
    if let Err(err) = prompt_builder::validate_template(kind, template) {
        return Ok(Outcome::InvalidTemplate(err));
    }
    let prompt = prompt_builder::substitute(template, kind.placeholder(), &source);
    debug!("Assembled {kind} prompt ({} chars)", prompt.len());

    if config.debug_preview {
        let preview = render_preview(kind, config, &source, &prompt);
        if !host.confirm(&preview)? {
            info!("{kind} cancelled at preview");
            return Ok(Outcome::Declined);
        }
    }

    let generation = config.generation();
    host.report_progress(0.0, kind.progress_message());
    let result = client.generate(&prompt, &generation);
    host.report_progress(1.0, kind.progress_message());
    let raw = result.with_context(|| format!("{kind} request to model {} failed", generation.model))?;

    debug!("Raw model output:\n{raw}");

    let message = if config.message_cleanup {
        cleanup::extract_and_clean(&raw)
    } else {
        raw.clone()
    };

    if message.trim().is_empty() {
        return Ok(Outcome::EmptyResult { raw });
    }
    Ok(Outcome::Completed { raw, message })
}

/// Markdown summary of what is about to be sent to the model.
pub fn render_preview(kind: ActionKind, config: &Config, source: &str, prompt: &str) -> String {
    let fence = match kind {
        ActionKind::Generate => "```diff",
        _ => "```",
    };

    let mut out = String::new();
    out.push_str(&format!("# Preview - {kind}\n\n"));
    out.push_str(&format!("Model: {}\nEndpoint: {}\n\n", config.model, config.endpoint));
    out.push_str("| Setting | Value |\n|---------|-------|\n");
    out.push_str(&format!("| Temperature | {} |\n", config.temperature));
    out.push_str(&format!("| Max Tokens | {} |\n", config.max_tokens));
    out.push_str(&format!("| Context Lines | {} |\n", config.context_lines));
    out.push_str(&format!("| Timeout | {}s |\n", config.timeout_secs));
    out.push_str(&format!(
        "| Message Cleanup | {} |\n",
        if config.message_cleanup { "Enabled" } else { "Disabled" }
    ));
    out.push_str(&format!(
        "| Template | {} |\n\n",
        if config.prompt_override(kind).is_some() { kind.config_key() } else { "built-in" }
    ));
    out.push_str(&format!("## {}\n\n{fence}\n{}\n```\n\n", kind.source_label(), source.trim_end()));
    out.push_str(&format!("## Full Prompt\n\n```\n{prompt}\n```\n"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationConfig, PromptOverrides};
    use anyhow::anyhow;
    use std::sync::Mutex;

    struct FakeClient {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeClient {
        fn replying(reply: &str) -> Self {
            FakeClient {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: &str) -> Self {
            FakeClient {
                reply: Err(error.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl LlmClient for FakeClient {
        fn generate(&self, prompt: &str, _cfg: &GenerationConfig) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(|e| anyhow!(e))
        }
    }

    struct FakeHost {
        answer: bool,
        previews: Mutex<Vec<String>>,
        progress: Mutex<Vec<f32>>,
    }

    impl FakeHost {
        fn answering(answer: bool) -> Self {
            FakeHost {
                answer,
                previews: Mutex::new(Vec::new()),
                progress: Mutex::new(Vec::new()),
            }
        }
    }

    impl Host for FakeHost {
        fn report_progress(&self, fraction: f32, _message: &str) {
            self.progress.lock().unwrap().push(fraction);
        }

        fn confirm(&self, prompt_text: &str) -> Result<bool> {
            self.previews.lock().unwrap().push(prompt_text.to_string());
            Ok(self.answer)
        }
    }

    fn diff() -> Result<Option<String>> {
        Ok(Some("+fn cache() {}\n".to_string()))
    }

    #[test]
    fn generate_substitutes_diff_and_cleans_reply() {
        let client = FakeClient::replying("Sure!\n[COMMIT]**feat**: add cache[/COMMIT]");
        let host = FakeHost::answering(true);
        let outcome =
            run_action(ActionKind::Generate, &Config::default(), diff, &client, &host).unwrap();

        assert_eq!(
            outcome,
            Outcome::Completed {
                raw: "Sure!\n[COMMIT]**feat**: add cache[/COMMIT]".to_string(),
                message: "feat: add cache".to_string(),
            }
        );
        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("[DIFF]+fn cache() {}\n[/DIFF]"));
        assert!(!calls[0].contains("${diff}"));
        assert_eq!(*host.progress.lock().unwrap(), vec![0.0, 1.0]);
        assert!(host.previews.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_source_stops_before_the_model() {
        let client = FakeClient::replying("unused");
        let host = FakeHost::answering(true);

        let outcome =
            run_action(ActionKind::Generate, &Config::default(), || Ok(None), &client, &host).unwrap();
        assert_eq!(outcome, Outcome::NothingToDo("No changes to commit.".to_string()));

        let outcome = run_action(
            ActionKind::Reduce,
            &Config::default(),
            || Ok(Some("  \n".to_string())),
            &client,
            &host,
        )
        .unwrap();
        assert_eq!(outcome, Outcome::NothingToDo("No commit message found to reduce.".to_string()));
        assert!(client.calls().is_empty());
    }

    #[test]
    fn template_without_placeholder_is_rejected_before_any_call() {
        let config = Config {
            prompts: PromptOverrides {
                enhance: Some("Make this better.".to_string()),
                ..PromptOverrides::default()
            },
            ..Config::default()
        };
        let client = FakeClient::replying("unused");
        let host = FakeHost::answering(true);

        let outcome = run_action(
            ActionKind::Enhance,
            &config,
            || Ok(Some("fix stuff".to_string())),
            &client,
            &host,
        )
        .unwrap();

        assert_eq!(
            outcome,
            Outcome::InvalidTemplate(TemplateError::MissingPlaceholder {
                kind: ActionKind::Enhance,
                placeholder: "${message}",
                key: "prompts.enhance",
            })
        );
        assert!(client.calls().is_empty());
    }

    #[test]
    fn user_template_is_used_with_every_placeholder_filled() {
        let config = Config {
            prompts: PromptOverrides {
                pr_summary: Some("Commits:\n${commits}\nAgain:\n${commits}".to_string()),
                ..PromptOverrides::default()
            },
            ..Config::default()
        };
        let client = FakeClient::replying("Title: Caching");
        let host = FakeHost::answering(true);

        run_action(
            ActionKind::PrSummary,
            &config,
            || Ok(Some("1. feat: cache".to_string())),
            &client,
            &host,
        )
        .unwrap();

        assert_eq!(client.calls(), vec!["Commits:\n1. feat: cache\nAgain:\n1. feat: cache"]);
    }

    #[test]
    fn declined_preview_never_calls_the_model() {
        let config = Config {
            debug_preview: true,
            ..Config::default()
        };
        let client = FakeClient::replying("unused");
        let host = FakeHost::answering(false);

        let outcome = run_action(ActionKind::Generate, &config, diff, &client, &host).unwrap();

        assert_eq!(outcome, Outcome::Declined);
        assert!(client.calls().is_empty());
        let previews = host.previews.lock().unwrap();
        assert_eq!(previews.len(), 1);
        assert!(previews[0].contains("## Git Diff"));
        assert!(previews[0].contains("## Full Prompt"));
    }

    #[test]
    fn accepted_preview_goes_ahead() {
        let config = Config {
            debug_preview: true,
            ..Config::default()
        };
        let client = FakeClient::replying("fix: typo");
        let host = FakeHost::answering(true);

        let outcome = run_action(ActionKind::Generate, &config, diff, &client, &host).unwrap();
        assert!(matches!(outcome, Outcome::Completed { .. }));
        assert_eq!(client.calls().len(), 1);
    }

    #[test]
    fn reasoning_only_reply_is_an_empty_result() {
        let raw = "[COMMIT]<think>only thoughts</think>[/COMMIT]";
        let client = FakeClient::replying(raw);
        let host = FakeHost::answering(true);

        let outcome =
            run_action(ActionKind::Generate, &Config::default(), diff, &client, &host).unwrap();
        assert_eq!(outcome, Outcome::EmptyResult { raw: raw.to_string() });
    }

    #[test]
    fn disabled_cleanup_keeps_raw_output() {
        let config = Config {
            message_cleanup: false,
            ..Config::default()
        };
        let raw = "<think>hmm</think>[COMMIT]feat: x[/COMMIT]";
        let client = FakeClient::replying(raw);
        let host = FakeHost::answering(true);

        let outcome = run_action(ActionKind::Generate, &config, diff, &client, &host).unwrap();
        assert_eq!(
            outcome,
            Outcome::Completed {
                raw: raw.to_string(),
                message: raw.to_string(),
            }
        );
    }

    #[test]
    fn transport_errors_propagate_with_context() {
        let client = FakeClient::failing("connection refused");
        let host = FakeHost::answering(true);

        let err = run_action(ActionKind::Enhance, &Config::default(), || Ok(Some("fix".into())), &client, &host)
            .unwrap_err();
        let text = format!("{err:#}");
        assert!(text.contains("enhance request to model qwen2.5:3b failed"), "{text}");
        assert!(text.contains("connection refused"), "{text}");
        assert_eq!(*host.progress.lock().unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn collector_errors_propagate() {
        let client = FakeClient::replying("unused");
        let host = FakeHost::answering(true);

        let err = run_action(
            ActionKind::Generate,
            &Config::default(),
            || Err(anyhow!("not a git repository")),
            &client,
            &host,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("not a git repository"));
        assert!(client.calls().is_empty());
    }
}
