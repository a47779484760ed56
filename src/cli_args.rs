use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::llm::prompt_builder::ActionKind;
use crate::settings::SettingKey;

/// CLI options
#[derive(Parser, Debug)]
#[command(
    name = "localcommit",
    version,
    about = "Draft, enhance, and shorten commit messages with a local Ollama model"
)]
pub struct Cli {
    /// Log more: -v info, -vv debug, -vvv trace (prompts and raw responses)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to read and edit instead of ~/.config/localcommit.toml
    #[arg(long, env = "LOCALCOMMIT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Ollama server URL (e.g. http://localhost:11434)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Model name to use (e.g. qwen2.5:3b)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Sampling temperature, 0.0 to 2.0
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// Maximum number of tokens the model may generate
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,

    /// Lines of context around each change in the diff
    #[arg(long, global = true)]
    pub context_lines: Option<u32>,

    /// Seconds to wait for the model before giving up (0 waits forever)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Disable model calls; return a canned response instead
    #[arg(long, global = true)]
    pub no_model: bool,

    /// Use the model output as-is, without the cleanup pipeline
    #[arg(long, global = true)]
    pub raw: bool,

    /// Show the full prompt and ask before sending it
    #[arg(long, global = true)]
    pub preview: bool,

    /// Answer yes to confirmation questions (preview, config reset)
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Write the generated message into .git/COMMIT_EDITMSG (no commit is created)
    #[arg(long, global = true)]
    pub apply: bool,

    /// Subcommand; defaults to `generate`
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands, e.g. `localcommit pr --base develop`
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a commit message for the staged (or else unstaged) changes
    Generate,

    /// Make an existing commit message more descriptive
    Enhance {
        /// Message to work on; defaults to .git/COMMIT_EDITMSG
        message: Option<String>,
    },

    /// Shorten an existing commit message
    Reduce {
        /// Message to work on; defaults to .git/COMMIT_EDITMSG
        message: Option<String>,
    },

    /// Summarize recent commits into a pull request description
    Pr {
        /// How many recent commits to include
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=50))]
        count: u32,

        /// Base branch to compare against
        #[arg(long, default_value = "main")]
        base: String,

        /// Also write the summary to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List the models installed on the server
    Models,

    /// Download a model onto the server
    Pull {
        /// Model name, e.g. llama3:8b
        name: String,

        /// Make it the configured model once the pull succeeds
        #[arg(long)]
        activate: bool,
    },

    /// Show recent commits
    History {
        /// Number of commits to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Print the diff of one commit
    Show {
        /// Commit hash or any other revision
        hash: String,
    },

    /// Inspect prompt templates
    Prompt {
        #[command(subcommand)]
        command: PromptCommand,
    },

    /// Run the cleanup pipeline on a file (or stdin) and print the result
    Clean {
        /// File holding raw model output; reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// Print the resolved configuration, or change the config file
    Config {
        /// Print as JSON instead of TOML
        #[arg(long)]
        json: bool,

        #[command(subcommand)]
        command: Option<ConfigCommand>,
    },
}

/// Edits to the config file, e.g. `localcommit config set model llama3:8b`
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Change one setting
    Set {
        key: SettingKey,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Switch message_cleanup or debug_preview on or off
    Toggle { key: SettingKey },

    /// Go back to the default for one setting, or for everything when no key is given
    Reset { key: Option<SettingKey> },
}

#[derive(Subcommand, Debug)]
pub enum PromptCommand {
    /// Print the template an action will use
    Show { action: ActionKind },

    /// Print an action's built-in template
    Default { action: ActionKind },

    /// Check that every template carries its placeholder
    Check,

    /// Save a template override read from a file (`-` for stdin)
    Set { action: ActionKind, file: PathBuf },

    /// Drop an override so the built-in template applies again
    Reset { action: ActionKind },
}
