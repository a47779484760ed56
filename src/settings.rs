//! Editing the TOML config file from the command line.
//!
//! Edits go through a [`toml::Table`] so keys this module does not touch are
//! written back as they were read.

use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use log::debug;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

use crate::config::{Config, FileConfig};
use crate::llm::prompt_builder::{self, ActionKind, TemplateError};

const PROMPTS_TABLE: &str = "prompts";

/// A top-level setting that `config set` can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum SettingKey {
    Endpoint,
    Model,
    MaxTokens,
    Temperature,
    ContextLines,
    TimeoutSecs,
    MessageCleanup,
    DebugPreview,
}

impl SettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::Endpoint => "endpoint",
            SettingKey::Model => "model",
            SettingKey::MaxTokens => "max_tokens",
            SettingKey::Temperature => "temperature",
            SettingKey::ContextLines => "context_lines",
            SettingKey::TimeoutSecs => "timeout_secs",
            SettingKey::MessageCleanup => "message_cleanup",
            SettingKey::DebugPreview => "debug_preview",
        }
    }

    fn parse_value(&self, raw: &str) -> Result<Value> {
        let raw = raw.trim();
        let invalid = |expected: &str| anyhow!("{self} expects {expected}, got {raw:?}");

        let value = match self {
            SettingKey::Endpoint | SettingKey::Model => Value::String(raw.to_string()),
            SettingKey::MaxTokens | SettingKey::ContextLines => {
                let n: u32 = raw.parse().map_err(|_| invalid("a whole number"))?;
                Value::Integer(i64::from(n))
            }
            SettingKey::TimeoutSecs => {
                let n: u64 = raw.parse().map_err(|_| invalid("a number of seconds"))?;
                Value::Integer(i64::try_from(n).map_err(|_| invalid("a smaller number of seconds"))?)
            }
            SettingKey::Temperature => {
                let t: f64 = raw.parse().map_err(|_| invalid("a number"))?;
                if !t.is_finite() {
                    return Err(invalid("a finite number"));
                }
                Value::Float(t)
            }
            SettingKey::MessageCleanup | SettingKey::DebugPreview => {
                Value::Boolean(parse_switch(raw).ok_or_else(|| invalid("on or off"))?)
            }
        };
        Ok(value)
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

fn parse_switch(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// The config file on disk, loaded for editing.
pub struct ConfigFile {
    path: PathBuf,
    table: Table,
}

impl ConfigFile {
    /// Load `path`; a missing file starts out empty and is created on save.
    pub fn open(path: &Path) -> Result<Self> {
        let table = match fs::read_to_string(path) {
            Ok(text) => toml::from_str::<Table>(&text)
                .with_context(|| format!("failed to parse config file {}", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist yet", path.display());
                Table::new()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read config file {}", path.display()));
            }
        };
        Ok(ConfigFile {
            path: path.to_path_buf(),
            table,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set(&mut self, key: SettingKey, raw: &str) -> Result<()> {
        let value = key.parse_value(raw)?;
        self.table.insert(key.as_str().to_string(), value);
        Ok(())
    }

    /// Flip an on/off setting and return its new state.
    pub fn toggle(&mut self, key: SettingKey) -> Result<bool> {
        let current = self.settings()?;
        let enabled = match key {
            SettingKey::MessageCleanup => !current.message_cleanup,
            SettingKey::DebugPreview => !current.debug_preview,
            _ => bail!("{key} is not an on/off setting"),
        };
        self.table
            .insert(key.as_str().to_string(), Value::Boolean(enabled));
        Ok(enabled)
    }

    /// Drop `key` so its default applies again. `false` if it was not set.
    pub fn reset(&mut self, key: SettingKey) -> bool {
        self.table.remove(key.as_str()).is_some()
    }

    /// Drop every setting and prompt override.
    pub fn reset_all(&mut self) {
        self.table.clear();
    }

    /// Store a prompt override after checking it carries its placeholder.
    pub fn set_prompt(&mut self, kind: ActionKind, template: &str) -> Result<(), TemplateError> {
        prompt_builder::validate_template(kind, template)?;

        let prompts = self
            .table
            .entry(PROMPTS_TABLE)
            .or_insert(Value::Table(Table::new()));
        if !prompts.is_table() {
            *prompts = Value::Table(Table::new());
        }
        if let Value::Table(prompts) = prompts {
            prompts.insert(kind.prompt_field().to_string(), Value::String(template.to_string()));
        }
        Ok(())
    }

    /// Remove a prompt override. `false` if there was none.
    pub fn reset_prompt(&mut self, kind: ActionKind) -> bool {
        let Some(Value::Table(prompts)) = self.table.get_mut(PROMPTS_TABLE) else {
            return false;
        };
        let removed = prompts.remove(kind.prompt_field()).is_some();
        if prompts.is_empty() {
            self.table.remove(PROMPTS_TABLE);
        }
        removed
    }

    /// What the file holds, layered over the defaults.
    pub fn settings(&self) -> Result<Config> {
        let file: FileConfig = Value::Table(self.table.clone())
            .try_into()
            .with_context(|| format!("{} holds a value of the wrong type", self.path.display()))?;
        Ok(Config::from_file(file))
    }

    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let text = toml::to_string_pretty(&self.table)
            .with_context(|| format!("failed to serialize {}", self.path.display()))?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write config file {}", self.path.display()))?;
        debug!("Saved {}", self.path.display());
        Ok(())
    }
}
