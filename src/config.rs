use crate::cli_args::Cli;
use crate::llm::prompt_builder::ActionKind;
use anyhow::{anyhow, Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "qwen2.5:3b";
pub const DEFAULT_MAX_TOKENS: u32 = 300;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_CONTEXT_LINES: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

const MAX_TOKENS_RANGE: (u32, u32) = (1, 10_000);
const TEMPERATURE_RANGE: (f32, f32) = (0.0, 2.0);
const CONTEXT_LINES_MAX: u32 = 100;

/// Per-action prompt template overrides (`[prompts]` table).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_summary: Option<String>,
}

impl PromptOverrides {
    pub fn get(&self, kind: ActionKind) -> Option<&str> {
        let value = match kind {
            ActionKind::Generate => &self.generate,
            ActionKind::Enhance => &self.enhance,
            ActionKind::Reduce => &self.reduce,
            ActionKind::PrSummary => &self.pr_summary,
        };
        value.as_deref()
    }
}

/// Final resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub context_lines: u32,
    /// Seconds to wait for a generation reply; 0 waits forever.
    pub timeout_secs: u64,
    pub message_cleanup: bool,
    pub debug_preview: bool,
    pub prompts: PromptOverrides,
    /// File the settings were read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// What the generation client needs; handed over by value per call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            context_lines: DEFAULT_CONTEXT_LINES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            message_cleanup: true,
            debug_preview: false,
            prompts: PromptOverrides::default(),
            source: None,
        }
    }
}

impl Config {
    /// Build the final config from CLI flags, environment, TOML file, and defaults.
    ///
    /// Precedence:
    ///   1. CLI flags (`--model`, `--endpoint`, ...)
    ///   2. Env vars `LOCALCOMMIT_ENDPOINT`, `LOCALCOMMIT_MODEL`,
    ///      `LOCALCOMMIT_MAX_TOKENS`, `LOCALCOMMIT_TEMPERATURE`, `LOCALCOMMIT_TIMEOUT`
    ///   3. TOML `--config <path>` or `~/.config/localcommit.toml`
    ///   4. Hardcoded defaults
    pub fn from_sources(cli: &Cli) -> Result<Self> {
        let path = config_path(cli);
        let required = cli.config.is_some();

        let file_cfg = match &path {
            Some(path) => load_file_config(path, required)?,
            None => None,
        };
        let source = file_cfg.as_ref().and(path);

        let mut cfg = Self::resolve(cli, |key| env::var(key).ok(), file_cfg.unwrap_or_default())?;
        cfg.source = source;
        Ok(cfg)
    }

    fn resolve<E>(cli: &Cli, env_var: E, file: FileConfig) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let endpoint = cli
            .endpoint
            .clone()
            .or_else(|| env_var("LOCALCOMMIT_ENDPOINT"))
            .or(file.endpoint)
            .unwrap_or(defaults.endpoint);

        let model = cli
            .model
            .clone()
            .or_else(|| env_var("LOCALCOMMIT_MODEL"))
            .or(file.model)
            .unwrap_or(defaults.model);

        let max_tokens = match cli.max_tokens {
            Some(v) => v,
            None => parse_env(&env_var, "LOCALCOMMIT_MAX_TOKENS")?
                .or(file.max_tokens)
                .unwrap_or(defaults.max_tokens),
        };

        let temperature = match cli.temperature {
            Some(v) => v,
            None => parse_env(&env_var, "LOCALCOMMIT_TEMPERATURE")?
                .or(file.temperature)
                .unwrap_or(defaults.temperature),
        };

        let timeout_secs = match cli.timeout {
            Some(v) => v,
            None => parse_env(&env_var, "LOCALCOMMIT_TIMEOUT")?
                .or(file.timeout_secs)
                .unwrap_or(defaults.timeout_secs),
        };

        let context_lines = cli
            .context_lines
            .or(file.context_lines)
            .unwrap_or(defaults.context_lines);

        let message_cleanup = !cli.raw && file.message_cleanup.unwrap_or(defaults.message_cleanup);
        let debug_preview = cli.preview || file.debug_preview.unwrap_or(defaults.debug_preview);

        Ok(Config {
            endpoint: endpoint.trim().to_string(),
            model: model.trim().to_string(),
            max_tokens,
            temperature,
            context_lines,
            timeout_secs,
            message_cleanup,
            debug_preview,
            prompts: file.prompts,
            source: None,
        })
    }

    /// Settings as the file alone would produce them, over the defaults.
    pub fn from_file(file: FileConfig) -> Self {
        let defaults = Config::default();
        Config {
            endpoint: file.endpoint.map_or(defaults.endpoint, |v| v.trim().to_string()),
            model: file.model.map_or(defaults.model, |v| v.trim().to_string()),
            max_tokens: file.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: file.temperature.unwrap_or(defaults.temperature),
            context_lines: file.context_lines.unwrap_or(defaults.context_lines),
            timeout_secs: file.timeout_secs.unwrap_or(defaults.timeout_secs),
            message_cleanup: file.message_cleanup.unwrap_or(defaults.message_cleanup),
            debug_preview: file.debug_preview.unwrap_or(defaults.debug_preview),
            prompts: file.prompts,
            source: None,
        }
    }

    /// Every problem with the resolved values; empty when the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        match Url::parse(&self.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!(
                "endpoint must use http or https, got {:?} in {}",
                url.scheme(),
                self.endpoint
            )),
            Err(e) => errors.push(format!("endpoint {:?} is not a valid URL: {e}", self.endpoint)),
        }

        if self.model.is_empty() {
            errors.push("model name cannot be empty".to_string());
        }

        let (min, max) = MAX_TOKENS_RANGE;
        if !(min..=max).contains(&self.max_tokens) {
            errors.push(format!("max_tokens must be between {min} and {max}"));
        }

        let (min, max) = TEMPERATURE_RANGE;
        if !(min..=max).contains(&self.temperature) {
            errors.push(format!("temperature must be between {min} and {max}"));
        }

        if self.context_lines > CONTEXT_LINES_MAX {
            errors.push(format!("context_lines must be between 0 and {CONTEXT_LINES_MAX}"));
        }

        errors
    }

    /// The user's template for `kind`, if one is configured.
    pub fn prompt_override(&self, kind: ActionKind) -> Option<&str> {
        self.prompts.get(kind)
    }

    pub fn generation(&self) -> GenerationConfig {
        GenerationConfig {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)),
        }
    }

    /// Where overrides should be written, for messages that point users at it.
    pub fn describe_source(&self) -> String {
        match self.source.clone().or_else(default_config_path) {
            Some(path) => path.display().to_string(),
            None => "your config file".to_string(),
        }
    }
}

/// Raw contents of the TOML file; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    endpoint: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    context_lines: Option<u32>,
    timeout_secs: Option<u64>,
    message_cleanup: Option<bool>,
    debug_preview: Option<bool>,
    prompts: PromptOverrides,
}

fn parse_env<E, T>(env_var: &E, key: &str) -> Result<Option<T>>
where
    E: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("{key}={raw:?} is not valid: {e}")),
        None => Ok(None),
    }
}

/// The file `--config` names, or else `~/.config/localcommit.toml`.
pub fn config_path(cli: &Cli) -> Option<PathBuf> {
    cli.config.clone().or_else(default_config_path)
}

/// Return `~/.config/localcommit.toml`
fn default_config_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".config").join("localcommit.toml"))
}

fn load_file_config(path: &Path, required: bool) -> Result<Option<FileConfig>> {
    if !path.exists() {
        if required {
            return Err(anyhow!("config file {} does not exist", path.display()));
        }
        log::debug!("No config file at {}", path.display());
        return Ok(None);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let parsed = toml::from_str::<FileConfig>(&data)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;

    log::debug!("Loaded config from {}", path.display());
    Ok(Some(parsed))
}
