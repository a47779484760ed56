use anyhow::Result;
use colored::Colorize;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::OnceCell;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use crate::actions::Host;

/// Host capabilities for an interactive terminal session.
pub struct TerminalHost {
    assume_yes: bool,
    spinner: OnceCell<ProgressBar>,
}

impl TerminalHost {
    pub fn new(assume_yes: bool) -> Self {
        TerminalHost {
            assume_yes,
            spinner: OnceCell::new(),
        }
    }

    // Created on first report so nothing is drawn while a preview is on screen.
    // The fraction only decides when the spinner stops.
    fn spinner(&self) -> &ProgressBar {
        self.spinner.get_or_init(|| {
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) =
                ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {wide_msg}")
            {
                spinner.set_style(style);
            }
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner
        })
    }
}

impl Host for TerminalHost {
    fn report_progress(&self, fraction: f32, message: &str) {
        let spinner = self.spinner();
        spinner.set_message(message.to_string());
        if fraction >= 1.0 {
            spinner.finish_and_clear();
        }
    }

    fn confirm(&self, prompt_text: &str) -> Result<bool> {
        println!("{prompt_text}");

        if self.assume_yes {
            return Ok(true);
        }
        if !io::stdin().is_terminal() {
            log::warn!("stdin is not a terminal; not sending the prompt (pass --yes to skip the question)");
            return Ok(false);
        }

        eprint!("{} ", "Send this prompt to the model? [y/N]".bold());
        io::stderr().flush()?;
        let answer = read_yes_no()?;
        eprintln!("{}", if answer { "yes" } else { "no" });
        Ok(answer)
    }
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn read_yes_no() -> Result<bool> {
    let _raw = RawModeGuard::enable()?;
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => return Ok(true),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(false);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Enter | KeyCode::Esc => {
                    return Ok(false);
                }
                _ => {}
            }
        }
    }
}

/// Print `body` framed by a titled header rule and a footer rule.
pub fn print_preview(title: &str, body: &str) {
    let header = format!("----- {title} -----");
    println!();
    println!("{}", header.bold());
    println!("{body}");
    println!("{}", "-".repeat(header.chars().count()).bold());
}
