use std::fmt;

use clap::ValueEnum;

use crate::llm::prompts;

/// The four things we can ask the model to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionKind {
    Generate,
    Enhance,
    Reduce,
    PrSummary,
}

/// Where the finished text of an action ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    CommitMessage,
    PrSummary,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Generate,
        ActionKind::Enhance,
        ActionKind::Reduce,
        ActionKind::PrSummary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Generate => "generate",
            ActionKind::Enhance => "enhance",
            ActionKind::Reduce => "reduce",
            ActionKind::PrSummary => "pr-summary",
        }
    }

    /// Token the template must contain; the collected source text replaces it.
    pub fn placeholder(&self) -> &'static str {
        match self {
            ActionKind::Generate => "${diff}",
            ActionKind::Enhance | ActionKind::Reduce => "${message}",
            ActionKind::PrSummary => "${commits}",
        }
    }

    pub fn default_template(&self) -> &'static str {
        match self {
            ActionKind::Generate => prompts::GENERATE,
            ActionKind::Enhance => prompts::ENHANCE,
            ActionKind::Reduce => prompts::REDUCE,
            ActionKind::PrSummary => prompts::PR_SUMMARY,
        }
    }

    /// Key of this action's override inside the `[prompts]` table.
    pub fn prompt_field(&self) -> &'static str {
        match self {
            ActionKind::Generate => "generate",
            ActionKind::Enhance => "enhance",
            ActionKind::Reduce => "reduce",
            ActionKind::PrSummary => "pr_summary",
        }
    }

    /// Config file key holding the user's override for this action's template.
    pub fn config_key(&self) -> &'static str {
        match self {
            ActionKind::Generate => "prompts.generate",
            ActionKind::Enhance => "prompts.enhance",
            ActionKind::Reduce => "prompts.reduce",
            ActionKind::PrSummary => "prompts.pr_summary",
        }
    }

    /// Heading for the collected source text in previews.
    pub fn source_label(&self) -> &'static str {
        match self {
            ActionKind::Generate => "Git Diff",
            ActionKind::Enhance | ActionKind::Reduce => "Current Commit Message",
            ActionKind::PrSummary => "Recent Commit Messages",
        }
    }

    pub fn progress_message(&self) -> &'static str {
        match self {
            ActionKind::Generate => "Generating commit message...",
            ActionKind::Enhance => "Enhancing commit message...",
            ActionKind::Reduce => "Reducing commit message...",
            ActionKind::PrSummary => "Generating PR summary...",
        }
    }

    pub fn destination(&self) -> Destination {
        match self {
            ActionKind::PrSummary => Destination::PrSummary,
            _ => Destination::CommitMessage,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    MissingPlaceholder {
        kind: ActionKind,
        placeholder: &'static str,
        key: &'static str,
    },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::MissingPlaceholder {
                kind,
                placeholder,
                key,
            } => write!(
                f,
                "the {kind} prompt template must contain the {placeholder} placeholder; update `{key}` in your config"
            ),
        }
    }
}

impl std::error::Error for TemplateError {}

/// Pick the user's template when one is set, otherwise the built-in default.
pub fn resolve_template<'a>(kind: ActionKind, user_override: Option<&'a str>) -> &'a str {
    match user_override {
        Some(template) if !template.trim().is_empty() => template,
        _ => kind.default_template(),
    }
}

pub fn validate_template(kind: ActionKind, template: &str) -> Result<(), TemplateError> {
    if template.contains(kind.placeholder()) {
        return Ok(());
    }
    Err(TemplateError::MissingPlaceholder {
        kind,
        placeholder: kind.placeholder(),
        key: kind.config_key(),
    })
}

/// Replace every literal occurrence of `placeholder` with `value`.
///
/// Replacement is a single pass over the template, so a placeholder that
/// appears inside `value` is inserted verbatim rather than expanded again.
pub fn substitute(template: &str, placeholder: &str, value: &str) -> String {
    template.replace(placeholder, value)
}

/// Render commit subjects as the numbered list fed into `${commits}`.
pub fn format_commit_list(subjects: &[String]) -> String {
    subjects
        .iter()
        .enumerate()
        .map(|(idx, subject)| format!("{}. {}", idx + 1, subject.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}
