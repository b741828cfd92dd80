// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive REPL for loading modules into a shared registry.
//!
//! Every line that is not a dot command is taken as an entry module id.

use std::path::PathBuf;

use owo_colors::OwoColorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Config, Editor, Helper};
use strata_loader::{Loader, LoaderError};
use strata_script::Value;
use tokio::runtime::Runtime;

/// REPL configuration constants
const HISTORY_FILE: &str = ".strata_history";
const MAX_HISTORY_SIZE: usize = 1000;

/// REPL commands that can be executed with a dot prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Exit,
    Clear,
    Screen,
    Version,
    Load,
    Modules,
}

impl ReplCommand {
    /// Parse a REPL command from input string
    pub fn parse(input: &str) -> Option<(Self, Option<&str>)> {
        let input = input.trim();
        let rest = input.strip_prefix('.')?;

        let mut parts = rest.splitn(2, char::is_whitespace);
        let cmd = parts.next()?.to_lowercase();
        let arg = parts.next().map(str::trim).filter(|arg| !arg.is_empty());

        match cmd.as_str() {
            "help" | "h" | "?" => Some((ReplCommand::Help, arg)),
            "exit" | "quit" | "q" => Some((ReplCommand::Exit, arg)),
            "clear" | "reset" => Some((ReplCommand::Clear, arg)),
            "cls" => Some((ReplCommand::Screen, arg)),
            "version" | "v" => Some((ReplCommand::Version, arg)),
            "load" | "l" => Some((ReplCommand::Load, arg)),
            "modules" | "ls" => Some((ReplCommand::Modules, arg)),
            _ => None,
        }
    }

    /// Get all available commands for help/completion
    pub fn all_commands() -> &'static [(&'static str, &'static str)] {
        &[
            (".help", "Show this help message"),
            (".exit", "Exit the REPL"),
            (".clear", "Forget all modules so they are fetched again"),
            (".cls", "Clear the screen"),
            (".version", "Show version information"),
            (".load <id>", "Load a module and print its exports"),
            (".modules", "List registered modules"),
        ]
    }
}

/// Completes dot commands and hints their remainder
struct StrataHelper {
    commands: Vec<&'static str>,
}

impl StrataHelper {
    fn new() -> Self {
        let commands = ReplCommand::all_commands()
            .iter()
            .map(|&(cmd, _)| cmd.split_whitespace().next().unwrap_or(cmd))
            .collect();
        Self { commands }
    }

    fn matches<'a>(&'a self, word: &'a str) -> impl Iterator<Item = &'static str> + 'a {
        self.commands
            .iter()
            .copied()
            .filter(move |cmd| cmd.starts_with(word) && cmd.len() > word.len())
    }
}

impl Completer for StrataHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let word = &line[..pos];
        if !word.starts_with('.') || word.contains(char::is_whitespace) {
            return Ok((pos, vec![]));
        }

        let matches = self
            .matches(word)
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd[word.len()..].to_string(),
            })
            .collect();

        Ok((pos, matches))
    }
}

impl Hinter for StrataHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if pos < line.len() || line.len() < 2 || !line.starts_with('.') {
            return None;
        }

        self.matches(line)
            .next()
            .map(|cmd| (&cmd[line.len()..]).dimmed().to_string())
    }
}

impl Highlighter for StrataHelper {}

impl Validator for StrataHelper {}

impl Helper for StrataHelper {}

/// The interactive REPL over one [`Loader`]
pub struct Repl {
    loader: Loader,
    runtime: Runtime,
    editor: Editor<StrataHelper, DefaultHistory>,
    history_path: PathBuf,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(loader: Loader, runtime: Runtime) -> rustyline::Result<Self> {
        let config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(MAX_HISTORY_SIZE)?
            .auto_add_history(true)
            .build();

        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(StrataHelper::new()));

        // Determine history file path
        let history_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("strata")
            .join(HISTORY_FILE);

        if let Some(parent) = history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        // A missing history file is normal on first run
        let _ = editor.load_history(&history_path);

        Ok(Self {
            loader,
            runtime,
            editor,
            history_path,
        })
    }

    /// Run the REPL main loop
    pub fn run(&mut self) -> rustyline::Result<()> {
        self.print_banner();

        loop {
            let prompt = format!("{} ", "strata>".bright_green().bold());

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();

                    if trimmed.is_empty() {
                        continue;
                    }

                    match ReplCommand::parse(trimmed) {
                        Some((cmd, arg)) => {
                            if let CommandResult::Exit = self.execute_command(cmd, arg) {
                                break;
                            }
                        }
                        None if is_command_like(trimmed) => {
                            eprintln!(
                                "{}: unknown command '{}'",
                                "Error".red().bold(),
                                trimmed.cyan()
                            );
                        }
                        None => self.load_and_print(trimmed),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".dimmed());
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "^D".dimmed());
                    break;
                }
                Err(err) => {
                    eprintln!("{}: {:?}", "Error".red().bold(), err);
                    break;
                }
            }
        }

        let _ = self.editor.save_history(&self.history_path);

        println!();
        Ok(())
    }

    fn print_banner(&self) {
        println!();
        println!(
            "  {} {} {}",
            "Strata CommonJS Loader".white().bold(),
            "v".dimmed(),
            env!("CARGO_PKG_VERSION").bright_yellow()
        );
        println!(
            "  {} {}",
            "Resolving against".dimmed(),
            self.loader.resolver().location().cyan()
        );
        println!();
        println!(
            "  {} {} {}",
            "Type a module id to load it, or".dimmed(),
            ".help".cyan(),
            "for available commands".dimmed()
        );
        println!();
    }

    fn execute_command(&mut self, cmd: ReplCommand, arg: Option<&str>) -> CommandResult {
        match cmd {
            ReplCommand::Help => self.print_help(),
            ReplCommand::Exit => return CommandResult::Exit,
            ReplCommand::Screen => print!("\x1B[2J\x1B[H"),
            ReplCommand::Version => {
                println!(
                    "{}: {}",
                    "Strata".bright_cyan().bold(),
                    env!("CARGO_PKG_VERSION").yellow()
                );
                println!("{}: {}", "Loader".dimmed(), strata_loader::VERSION);
            }
            ReplCommand::Load => match arg {
                Some(id) => self.load_and_print(id),
                None => eprintln!(
                    "{}: {} {}",
                    "Error".red().bold(),
                    ".load".cyan(),
                    "requires a module id".dimmed()
                ),
            },
            ReplCommand::Modules => self.print_modules(),
            ReplCommand::Clear => {
                let count = self.loader.registry().len();
                self.loader.clear_cache();
                println!("{} {} modules", "Cleared".dimmed(), count.yellow());
            }
        }
        CommandResult::Continue
    }

    fn print_help(&self) {
        println!();
        println!("{}", "REPL Commands:".white().bold());
        println!();

        for (cmd, desc) in ReplCommand::all_commands() {
            println!("  {:16} {}", cmd.cyan(), desc.dimmed());
        }

        println!();
        println!("{}", "Keyboard Shortcuts:".white().bold());
        println!();
        println!("  {:16} {}", "Ctrl+C".yellow(), "Cancel current input".dimmed());
        println!("  {:16} {}", "Ctrl+D".yellow(), "Exit REPL".dimmed());
        println!("  {:16} {}", "Tab".yellow(), "Complete commands".dimmed());
        println!();
    }

    fn print_modules(&self) {
        let registry = self.loader.registry();
        if registry.is_empty() {
            println!("{}", "No modules registered".dimmed());
            return;
        }

        for id in registry.ids() {
            if let Some(module) = registry.find(&id) {
                println!("  {:32} {}", id.as_str().cyan(), module.status().dimmed());
            }
        }
    }

    fn load_and_print(&mut self, id: &str) {
        match self.runtime.block_on(self.loader.use_common_js_module(id)) {
            Ok(Some(exports)) => println!("{}", format_value(&exports)),
            Ok(None) => eprintln!(
                "{}: could not load '{}'",
                "Error".red().bold(),
                id.cyan()
            ),
            Err(e) => print_error(&e),
        }
    }
}

/// Dot-prefixed input that is not a relative module id
fn is_command_like(input: &str) -> bool {
    input.starts_with('.') && !input.starts_with("./") && !input.starts_with("../")
}

/// Result of executing a REPL command
enum CommandResult {
    Continue,
    Exit,
}

/// Format exports for display with syntax coloring
fn format_value(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".blue().dimmed().to_string(),
        Value::Null => "null".blue().to_string(),
        Value::Boolean(b) => b.to_string().yellow().to_string(),
        Value::Number(_) => value.to_string().yellow().to_string(),
        Value::String(s) => format!("'{}'", s).green().to_string(),
        Value::Function(_) => value.to_string().magenta().to_string(),
        Value::Object(_) => value.to_string(),
    }
}

/// Print a loader error, coloring the error kind when there is one
fn print_error(error: &LoaderError) {
    let error_str = error.to_string();

    if let Some(colon_pos) = error_str.find(':') {
        let (error_type, message) = error_str.split_at(colon_pos);
        eprintln!("{}{}", error_type.red().bold(), message);
    } else {
        eprintln!("{}", error_str.red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repl_command_parse() {
        assert!(matches!(
            ReplCommand::parse(".help"),
            Some((ReplCommand::Help, None))
        ));
        assert!(matches!(
            ReplCommand::parse(".exit"),
            Some((ReplCommand::Exit, None))
        ));
        assert!(matches!(
            ReplCommand::parse(".load ./app/main"),
            Some((ReplCommand::Load, Some("./app/main")))
        ));
        assert!(matches!(
            ReplCommand::parse(".ls"),
            Some((ReplCommand::Modules, None))
        ));
        assert!(ReplCommand::parse("./app/main").is_none());
        assert!(ReplCommand::parse("not a command").is_none());
    }

    #[test]
    fn test_command_completion_candidates() {
        let helper = StrataHelper::new();
        let found: Vec<_> = helper.matches(".c").collect();
        assert_eq!(found, vec![".clear", ".cls"]);
        assert!(helper.commands.contains(&".load"));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(
            format_value(&Value::from("x")),
            format!("'{}'", "x").green().to_string()
        );
        assert_eq!(
            format_value(&Value::Number(3.0)),
            "3".yellow().to_string()
        );
    }
}
