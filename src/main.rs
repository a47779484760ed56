mod actions;
mod cleanup;
mod cli_args;
mod config;
mod git;
mod llm;
mod logging;
mod settings;
mod setup;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use log::{debug, info};
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;

use crate::actions::{Host, Outcome};
use crate::cli_args::{Cli, Command, ConfigCommand, PromptCommand};
use crate::config::Config;
use crate::llm::prompt_builder::{self, ActionKind, Destination};
use crate::settings::{ConfigFile, SettingKey};
use crate::ui::TerminalHost;

/// Bad configuration or prompt template.
const EXIT_CONFIG: u8 = 2;
/// The model (or cleanup) left nothing usable.
const EXIT_EMPTY: u8 = 3;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    if let Some(result) = run_file_edit(&cli) {
        return result;
    }

    let cfg = match Config::from_sources(&cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("{} {err:#}", "Error:".red().bold());
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };
    debug!("Resolved config: {cfg:?}");

    match cli.command.as_ref() {
        None | Some(Command::Generate) => run_commit_action(&cli, &cfg, ActionKind::Generate, None),
        Some(Command::Enhance { message }) => {
            run_commit_action(&cli, &cfg, ActionKind::Enhance, message.as_deref())
        }
        Some(Command::Reduce { message }) => {
            run_commit_action(&cli, &cfg, ActionKind::Reduce, message.as_deref())
        }
        Some(Command::Pr {
            count,
            base,
            output,
        }) => run_pr(&cli, &cfg, *count, base, output.as_deref()),
        Some(Command::Models) => list_models(&cli, &cfg),
        Some(Command::Pull { name, activate }) => pull_model(&cli, &cfg, name, *activate),
        Some(Command::History { limit }) => show_history(*limit),
        Some(Command::Show { hash }) => {
            print!("{}", git::show_commit(hash)?);
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Prompt { command }) => run_prompt(&cli, &cfg, command),
        Some(Command::Clean { file }) => run_clean(file.as_deref()),
        Some(Command::Config { json, .. }) => show_config(&cfg, *json),
    }
}

/// Print validation problems; `Some` carries the exit code when there were any.
fn config_problems(cfg: &Config) -> Option<ExitCode> {
    let problems = cfg.validate();
    if problems.is_empty() {
        return None;
    }
    eprintln!(
        "{}",
        format!("Invalid configuration ({}):", cfg.describe_source())
            .red()
            .bold()
    );
    for problem in problems {
        eprintln!("  - {problem}");
    }
    Some(ExitCode::from(EXIT_CONFIG))
}

fn run_commit_action(
    cli: &Cli,
    cfg: &Config,
    kind: ActionKind,
    message: Option<&str>,
) -> Result<ExitCode> {
    if let Some(code) = config_problems(cfg) {
        return Ok(code);
    }
    let client = setup::build_llm_client(cfg, cli.no_model)?;
    let host = TerminalHost::new(cli.yes);

    let collect = || match (kind, message) {
        (ActionKind::Generate, _) => git::working_diff(cfg.context_lines),
        (_, Some(text)) => Ok(Some(text.to_string())),
        (_, None) => git::read_commit_editmsg(),
    };

    let outcome = actions::run_action(kind, cfg, collect, client.as_ref(), &host)?;
    present(cli, cfg, kind, outcome, None)
}

fn run_pr(
    cli: &Cli,
    cfg: &Config,
    count: u32,
    base: &str,
    output: Option<&Path>,
) -> Result<ExitCode> {
    if let Some(code) = config_problems(cfg) {
        return Ok(code);
    }
    let client = setup::build_llm_client(cfg, cli.no_model)?;
    let host = TerminalHost::new(cli.yes);

    let collect = || -> Result<Option<String>> {
        let subjects = git::recent_commit_subjects(count, base)?;
        info!("Summarizing {} commit(s)", subjects.len());
        Ok((!subjects.is_empty()).then(|| prompt_builder::format_commit_list(&subjects)))
    };

    let outcome = actions::run_action(ActionKind::PrSummary, cfg, collect, client.as_ref(), &host)?;
    present(cli, cfg, ActionKind::PrSummary, outcome, output)
}

fn present(
    cli: &Cli,
    cfg: &Config,
    kind: ActionKind,
    outcome: Outcome,
    output: Option<&Path>,
) -> Result<ExitCode> {
    match outcome {
        Outcome::Completed { raw, message } => {
            if raw.trim() != message {
                debug!(
                    "Cleanup reduced the reply from {} to {} chars",
                    raw.len(),
                    message.len()
                );
            }
            match kind.destination() {
                Destination::CommitMessage => {
                    ui::print_preview("Commit Message Preview", &message);
                    if cli.apply {
                        let path = git::write_commit_editmsg(&message)?;
                        println!(
                            "{}",
                            format!("Commit message written to {}", path.display()).green()
                        );
                    }
                }
                Destination::PrSummary => {
                    ui::print_preview("PR Summary Preview", &message);
                    if let Some(path) = output {
                        fs::write(path, format!("{message}\n"))
                            .with_context(|| format!("failed to write {}", path.display()))?;
                        println!(
                            "{}",
                            format!("PR summary written to {}", path.display()).green()
                        );
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Outcome::NothingToDo(reason) => {
            println!("{}", reason.yellow());
            Ok(ExitCode::SUCCESS)
        }
        Outcome::InvalidTemplate(err) => {
            eprintln!("{} {err}", "Error:".red().bold());
            eprintln!("Config file: {}", cfg.describe_source());
            Ok(ExitCode::from(EXIT_CONFIG))
        }
        Outcome::Declined => {
            println!("Cancelled; no request was sent.");
            Ok(ExitCode::SUCCESS)
        }
        Outcome::EmptyResult { raw } => {
            let what = match kind.destination() {
                Destination::CommitMessage => "commit message",
                Destination::PrSummary => "PR summary",
            };
            eprintln!(
                "{}",
                format!("Empty {what} returned. Try again or write it manually.").yellow()
            );
            if !raw.trim().is_empty() && cfg.message_cleanup {
                eprintln!("Cleanup removed everything; rerun with --raw to see the model's reply.");
            }
            Ok(ExitCode::from(EXIT_EMPTY))
        }
    }
}

fn list_models(cli: &Cli, cfg: &Config) -> Result<ExitCode> {
    if let Some(code) = config_problems(cfg) {
        return Ok(code);
    }
    let client = setup::build_ollama_client(cli.no_model)?;
    let models = client.list_models(&cfg.endpoint)?;

    if models.is_empty() {
        println!("{}", "No models found. Pull a model first.".yellow());
        return Ok(ExitCode::SUCCESS);
    }

    for model in &models {
        let marker = if model.name == cfg.model {
            " (active)".green().to_string()
        } else {
            String::new()
        };
        println!("{:<40} {:>6.1}GB{marker}", model.name, model.size_gb());
    }

    if !models.iter().any(|model| model.name == cfg.model) {
        println!(
            "{}",
            format!(
                "Configured model {} is not installed; run `localcommit pull {}`.",
                cfg.model, cfg.model
            )
            .yellow()
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn pull_model(cli: &Cli, cfg: &Config, name: &str, activate: bool) -> Result<ExitCode> {
    if let Some(code) = config_problems(cfg) {
        return Ok(code);
    }
    let client = setup::build_ollama_client(cli.no_model)?;
    let host = TerminalHost::new(true);

    let message = format!("Pulling {name}...");
    host.report_progress(0.0, &message);
    let result = client.pull_model(&cfg.endpoint, name);
    host.report_progress(1.0, &message);
    result.with_context(|| format!("failed to pull {name}"))?;

    println!("{}", format!("Pulled {name}.").green());
    if activate {
        let mut file = open_config_file(cli)?;
        file.set(SettingKey::Model, name)?;
        return save_settings(&file, &format!("model set to {name}"));
    }
    if name != cfg.model {
        println!(
            "Use it with --model {name}, or make it the default with `localcommit config set model {name}`."
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn show_history(limit: usize) -> Result<ExitCode> {
    let entries = git::recent_history(limit)?;
    if entries.is_empty() {
        println!("No commits yet.");
    }
    for entry in &entries {
        println!(
            "{} {} {}",
            entry.short_hash().yellow(),
            entry.subject,
            format!("({}, {})", entry.author, entry.relative_date).bright_black()
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn run_prompt(cli: &Cli, cfg: &Config, command: &PromptCommand) -> Result<ExitCode> {
    match command {
        PromptCommand::Show { action } => {
            let template = prompt_builder::resolve_template(*action, cfg.prompt_override(*action));
            println!("{template}");
        }
        PromptCommand::Default { action } => println!("{}", action.default_template()),
        PromptCommand::Check => {
            let mut all_valid = true;
            for kind in ActionKind::ALL {
                let user_override = cfg.prompt_override(kind);
                let origin = match user_override {
                    Some(template) if !template.trim().is_empty() => kind.config_key(),
                    _ => "built-in",
                };
                let template = prompt_builder::resolve_template(kind, user_override);
                match prompt_builder::validate_template(kind, template) {
                    Ok(()) => println!("{} {kind:<10} ({origin})", "ok ".green()),
                    Err(err) => {
                        all_valid = false;
                        println!("{} {kind:<10} {err}", "bad".red().bold());
                    }
                }
            }
            if !all_valid {
                eprintln!("Config file: {}", cfg.describe_source());
                return Ok(ExitCode::from(EXIT_CONFIG));
            }
        }
        PromptCommand::Set { action, file } => return set_prompt(cli, *action, file),
        PromptCommand::Reset { action } => return reset_prompt(cli, *action),
    }
    Ok(ExitCode::SUCCESS)
}

/// Contents of `file`, or of stdin when it is omitted or `-`.
fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn run_clean(file: Option<&Path>) -> Result<ExitCode> {
    let raw = read_input(file)?;
    let cleaned = cleanup::extract_and_clean(&raw);
    if cleaned.is_empty() {
        eprintln!("{}", "Nothing left after cleanup.".yellow());
        return Ok(ExitCode::from(EXIT_EMPTY));
    }
    println!("{cleaned}");
    Ok(ExitCode::SUCCESS)
}

fn show_config(cfg: &Config, json: bool) -> Result<ExitCode> {
    if json {
        println!("{}", serde_json::to_string_pretty(cfg)?);
    } else {
        println!("# {}", cfg.describe_source());
        print!("{}", toml::to_string_pretty(cfg)?);
    }

    match config_problems(cfg) {
        Some(code) => Ok(code),
        None => Ok(ExitCode::SUCCESS),
    }
}

/// Edits of the config file run before it is loaded, so they work on a file
/// that does not exist yet or that fails validation.
fn run_file_edit(cli: &Cli) -> Option<Result<ExitCode>> {
    match cli.command.as_ref()? {
        Command::Config {
            command: Some(edit), ..
        } => Some(edit_config(cli, edit)),
        Command::Prompt {
            command: PromptCommand::Set { action, file },
        } => Some(set_prompt(cli, *action, file)),
        Command::Prompt {
            command: PromptCommand::Reset { action },
        } => Some(reset_prompt(cli, *action)),
        _ => None,
    }
}

fn config_error(err: impl std::fmt::Display) -> ExitCode {
    eprintln!("{} {err:#}", "Error:".red().bold());
    ExitCode::from(EXIT_CONFIG)
}

fn open_config_file(cli: &Cli) -> Result<ConfigFile> {
    let path = config::config_path(cli)
        .context("no home directory for ~/.config/localcommit.toml; pass --config <path>")?;
    ConfigFile::open(&path)
}

/// Write `file` if its settings pass validation on their own.
fn save_settings(file: &ConfigFile, done: &str) -> Result<ExitCode> {
    let problems = match file.settings() {
        Ok(settings) => settings.validate(),
        Err(err) => return Ok(config_error(err)),
    };
    if !problems.is_empty() {
        eprintln!(
            "{}",
            format!("Not saving {}:", file.path().display()).red().bold()
        );
        for problem in problems {
            eprintln!("  - {problem}");
        }
        return Ok(ExitCode::from(EXIT_CONFIG));
    }

    file.save()?;
    println!("{}", format!("{done} in {}", file.path().display()).green());
    Ok(ExitCode::SUCCESS)
}

fn edit_config(cli: &Cli, command: &ConfigCommand) -> Result<ExitCode> {
    let mut file = open_config_file(cli)?;

    let done = match command {
        ConfigCommand::Set { key, value } => {
            if let Err(err) = file.set(*key, value) {
                return Ok(config_error(err));
            }
            format!("{key} set to {}", value.trim())
        }
        ConfigCommand::Toggle { key } => match file.toggle(*key) {
            Ok(enabled) => format!("{key} turned {}", if enabled { "on" } else { "off" }),
            Err(err) => return Ok(config_error(err)),
        },
        ConfigCommand::Reset { key: Some(key) } => {
            if !file.reset(*key) {
                println!("{key} is not set; the default is already in use.");
                return Ok(ExitCode::SUCCESS);
            }
            format!("{key} reset to its default")
        }
        ConfigCommand::Reset { key: None } => {
            let host = TerminalHost::new(cli.yes);
            let question = format!(
                "Reset every setting and prompt in {} to the defaults?",
                file.path().display()
            );
            if !host.confirm(&question)? {
                println!("Cancelled; nothing was changed.");
                return Ok(ExitCode::SUCCESS);
            }
            file.reset_all();
            "All settings reset to defaults".to_string()
        }
    };

    save_settings(&file, &done)
}

fn set_prompt(cli: &Cli, action: ActionKind, source: &Path) -> Result<ExitCode> {
    let template = read_input(Some(source))?;
    let mut file = open_config_file(cli)?;
    if let Err(err) = file.set_prompt(action, template.trim_end()) {
        return Ok(config_error(err));
    }
    save_settings(&file, &format!("{} updated", action.config_key()))
}

fn reset_prompt(cli: &Cli, action: ActionKind) -> Result<ExitCode> {
    let mut file = open_config_file(cli)?;
    if !file.reset_prompt(action) {
        println!(
            "{} is not set; the built-in template is already in use.",
            action.config_key()
        );
        return Ok(ExitCode::SUCCESS);
    }
    save_settings(
        &file,
        &format!("{} removed; the built-in template applies again", action.config_key()),
    )
}
