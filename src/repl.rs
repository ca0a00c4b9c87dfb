// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive REPL (Read-Eval-Print Loop) for Golem.
//!
//! Each entry is evaluated as its own module: declarations do not carry
//! over from one entry to the next, but modules imported by an entry stay
//! loaded for the rest of the session.

use std::borrow::Cow;
use std::path::PathBuf;

use golem_core::compiler::Disassembler;
use golem_core::lexer::TokenKind;
use golem_core::{Engine, Error, Value};
use owo_colors::OwoColorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Config, Editor, Helper};

const HISTORY_FILE: &str = ".golem_history";
const MAX_HISTORY_SIZE: usize = 1000;

/// Reserved words offered for completion.
const RESERVED: &[&str] = &[
    "break", "case", "catch", "const", "continue", "default", "dict", "else", "false", "finally",
    "fn", "for", "go", "if", "import", "in", "let", "null", "prop", "return", "set", "struct",
    "switch", "this", "throw", "true", "try", "while",
];

/// REPL commands that can be executed with a dot prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Exit,
    Clear,
    Version,
    Load,
    Disasm,
}

impl ReplCommand {
    /// Parse a REPL command from input string
    pub fn parse(input: &str) -> Option<(Self, Option<&str>)> {
        let rest = input.trim().strip_prefix('.')?;
        let (cmd, arg) = match rest.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (rest, None),
        };

        let cmd = match cmd.to_lowercase().as_str() {
            "help" | "h" | "?" => ReplCommand::Help,
            "exit" | "quit" | "q" => ReplCommand::Exit,
            "clear" | "cls" => ReplCommand::Clear,
            "version" | "v" => ReplCommand::Version,
            "load" | "l" => ReplCommand::Load,
            "disasm" | "d" => ReplCommand::Disasm,
            _ => return None,
        };
        Some((cmd, arg))
    }

    /// Get all available commands for help/completion
    pub fn all_commands() -> &'static [(&'static str, &'static str)] {
        &[
            (".help", "Show this help message"),
            (".exit", "Exit the REPL"),
            (".clear", "Clear the screen"),
            (".version", "Show version information"),
            (".load <file>", "Run a Golem file and show its module contents"),
            (".disasm <code>", "Show the bytecode compiled for <code>"),
        ]
    }
}

/// Completion, hints, highlighting and validation for the line editor.
struct GolemHelper {
    /// Keywords, builtins and commands offered for completion
    words: Vec<String>,
}

impl GolemHelper {
    fn new(builtins: &[String]) -> Self {
        let commands = [".help", ".exit", ".clear", ".version", ".load", ".disasm"];
        let words = RESERVED
            .iter()
            .chain(commands.iter())
            .map(|w| w.to_string())
            .chain(builtins.iter().cloned())
            .collect();
        Self { words }
    }

    fn word_start(line: &str) -> usize {
        line.rfind(|c: char| !c.is_alphanumeric() && c != '_' && c != '.')
            .map(|i| i + 1)
            .unwrap_or(0)
    }
}

impl Completer for GolemHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = Self::word_start(&line[..pos]);
        let word = &line[start..pos];
        if word.is_empty() {
            return Ok((pos, vec![]));
        }

        let matches = self
            .words
            .iter()
            .filter(|w| w.starts_with(word))
            .map(|w| Pair {
                display: w.clone(),
                replacement: w[word.len()..].to_string(),
            })
            .collect();

        Ok((pos, matches))
    }
}

impl Hinter for GolemHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if pos < line.len() {
            return None;
        }

        let word = &line[Self::word_start(line)..];
        if word.len() < 2 {
            return None;
        }

        self.words
            .iter()
            .find(|w| w.starts_with(word) && w.len() > word.len())
            .map(|w| (&w[word.len()..]).dimmed().to_string())
    }
}

impl Highlighter for GolemHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('.') {
            return Cow::Owned(line.magenta().to_string());
        }

        let mut out = String::with_capacity(line.len() * 2);
        let mut rest = line;
        while let Some(c) = rest.chars().next() {
            let len = if c.is_alphanumeric() || c == '_' {
                rest.find(|c: char| !c.is_alphanumeric() && c != '_')
                    .unwrap_or(rest.len())
            } else {
                c.len_utf8()
            };
            let (piece, tail) = rest.split_at(len);
            out.push_str(&paint(piece));
            rest = tail;
        }
        Cow::Owned(out)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

/// Colors one word or punctuation character of REPL input.
fn paint(piece: &str) -> String {
    match TokenKind::keyword(piece) {
        Some(TokenKind::Null | TokenKind::True | TokenKind::False | TokenKind::This) => {
            return piece.blue().to_string();
        }
        Some(_) => return piece.magenta().bold().to_string(),
        None => {}
    }
    match piece.chars().next() {
        Some(c) if c.is_ascii_digit() => piece.yellow().to_string(),
        Some('(' | ')' | '[' | ']' | '{' | '}') => piece.yellow().to_string(),
        Some('"' | '\'' | '`') => piece.green().to_string(),
        Some('+' | '-' | '*' | '/' | '%' | '=' | '<' | '>' | '!' | '&' | '|' | '^' | '~') => {
            piece.cyan().to_string()
        }
        _ => piece.to_string(),
    }
}

impl Validator for GolemHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();

        if !is_balanced(input) {
            return Ok(ValidationResult::Incomplete);
        }

        // A trailing binary operator or separator expects more input.
        let trimmed = input.trim_end();
        let continues = ['\\', '+', '-', '*', '/', '%', '=', ',', '&', '|', '^', '<', '>', '.', ':']
            .iter()
            .any(|c| trimmed.ends_with(*c));
        if continues && !trimmed.ends_with("++") && !trimmed.ends_with("--") {
            return Ok(ValidationResult::Incomplete);
        }

        Ok(ValidationResult::Valid(None))
    }
}

/// Check if brackets, braces, and parentheses are balanced
fn is_balanced(input: &str) -> bool {
    let mut stack = Vec::new();
    let mut in_string = None;
    let mut escape_next = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match in_string {
            // Raw strings have no escapes.
            Some('`') if c == '`' => in_string = None,
            Some('`') => {}
            Some(_) if c == '\\' => escape_next = true,
            Some(quote) if c == quote => in_string = None,
            Some(_) => {}
            None => match c {
                '/' if chars.peek() == Some(&'/') => {
                    // Line comment: skip to the end of the line.
                    for c in chars.by_ref() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                '"' | '\'' | '`' => in_string = Some(c),
                '(' => stack.push(')'),
                '[' => stack.push(']'),
                '{' => stack.push('}'),
                ')' | ']' | '}' => {
                    if stack.pop() != Some(c) {
                        return true; // Unbalanced; the parser reports it
                    }
                }
                _ => {}
            },
        }
    }

    stack.is_empty() && in_string.is_none()
}

impl Helper for GolemHelper {}

/// The interactive REPL
pub struct Repl {
    engine: Engine,
    editor: Editor<GolemHelper, DefaultHistory>,
    history_path: PathBuf,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(engine: Engine) -> rustyline::Result<Self> {
        let config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(MAX_HISTORY_SIZE)?
            .auto_add_history(true)
            .build();

        let builtins: Vec<String> = engine
            .runtime()
            .builtins
            .names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(GolemHelper::new(&builtins)));

        let history_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("golem")
            .join(HISTORY_FILE);

        if let Some(parent) = history_path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::debug!("cannot create history directory: {err}");
            }
        }

        if editor.load_history(&history_path).is_err() {
            tracing::debug!(path = %history_path.display(), "no history loaded");
        }

        Ok(Self {
            engine,
            editor,
            history_path,
        })
    }

    /// Run the REPL main loop
    pub fn run(&mut self) -> rustyline::Result<()> {
        self.print_banner();

        loop {
            let prompt = format!("{} ", "golem>".bright_green().bold());

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    if let Some((cmd, arg)) = ReplCommand::parse(trimmed) {
                        match self.execute_command(cmd, arg) {
                            CommandResult::Continue => continue,
                            CommandResult::Exit => break,
                        }
                    }

                    self.eval_and_print(trimmed);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".dimmed());
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

        if let Err(err) = self.editor.save_history(&self.history_path) {
            tracing::warn!("cannot save history: {err}");
        }
        self.engine.join_tasks();
        Ok(())
    }

    fn print_banner(&self) {
        println!();
        println!(
            "  {} {} {}",
            "Golem".white().bold(),
            "v".dimmed(),
            env!("CARGO_PKG_VERSION").bright_yellow()
        );
        println!(
            "  {} {} {}",
            "Type".dimmed(),
            ".help".cyan(),
            "for available commands".dimmed()
        );
        println!();
    }

    fn execute_command(&mut self, cmd: ReplCommand, arg: Option<&str>) -> CommandResult {
        match (cmd, arg) {
            (ReplCommand::Help, _) => self.print_help(),
            (ReplCommand::Exit, _) => return CommandResult::Exit,
            (ReplCommand::Clear, _) => print!("\x1B[2J\x1B[H"),
            (ReplCommand::Version, _) => {
                println!("{} {}", "golem".bright_cyan().bold(), env!("CARGO_PKG_VERSION").yellow());
            }
            (ReplCommand::Load, Some(path)) => match self.engine.run_file(path) {
                Ok(contents) => println!("{}", format_value(&contents)),
                Err(e) => print_error(&e),
            },
            (ReplCommand::Disasm, Some(code)) => match self.engine.compile(code, "<repl>") {
                Ok(module) => {
                    let names = self.engine.runtime().builtins.names().iter().map(|n| n.to_string());
                    print!("{}", Disassembler::new(&module).with_builtins(names));
                }
                Err(e) => print_error(&e),
            },
            (ReplCommand::Load | ReplCommand::Disasm, None) => {
                eprintln!(
                    "{}: {} {}",
                    "Error".red().bold(),
                    format!("{cmd:?}").to_lowercase().cyan(),
                    "requires an argument".dimmed()
                );
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
        println!("  {:16} {}", "Tab".yellow(), "Autocomplete".dimmed());
        println!();
    }

    fn eval_and_print(&mut self, input: &str) {
        match self.engine.eval(input) {
            Ok(Value::Null) => {}
            Ok(value) => println!("{}", format_value(&value)),
            Err(e) => print_error(&e),
        }
    }
}

/// Result of executing a REPL command
enum CommandResult {
    Continue,
    Exit,
}

/// Format a value for display with syntax coloring
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".blue().to_string(),
        Value::Bool(b) => b.yellow().to_string(),
        Value::Int(_) | Value::Float(_) => value.yellow().to_string(),
        Value::Str(_) => value.repr().green().to_string(),
        Value::Func(_) => value.magenta().to_string(),
        Value::Error(_) => value.red().to_string(),
        _ => value.to_string(),
    }
}

/// Print a formatted error message
fn print_error(error: &Error) {
    let text = error.to_string();
    match text.split_once(':') {
        Some((kind, message)) => eprintln!("{}:{}", kind.red().bold(), message),
        None => eprintln!("{}", text.red()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repl_command_parse() {
        assert_eq!(ReplCommand::parse(".help"), Some((ReplCommand::Help, None)));
        assert_eq!(ReplCommand::parse(".exit"), Some((ReplCommand::Exit, None)));
        assert_eq!(
            ReplCommand::parse(".load test.glm"),
            Some((ReplCommand::Load, Some("test.glm")))
        );
        assert_eq!(
            ReplCommand::parse(".d let a = 1"),
            Some((ReplCommand::Disasm, Some("let a = 1")))
        );
        assert!(ReplCommand::parse("not a command").is_none());
        assert!(ReplCommand::parse(".unknown").is_none());
    }

    #[test]
    fn test_is_balanced() {
        assert!(is_balanced("(1 + 2)"));
        assert!(is_balanced("struct { a: 1 }"));
        assert!(is_balanced("fn f() { return 1 }"));
        assert!(!is_balanced("(1 + 2"));
        assert!(!is_balanced("dict { 1: 2"));
        assert!(is_balanced("'string with (unbalanced'"));
        assert!(is_balanced("1 // comment with {"));
        assert!(!is_balanced("`raw \\` still open"));
    }

    #[test]
    fn test_completion_words_include_builtins() {
        let helper = GolemHelper::new(&["println".to_string()]);
        assert!(helper.words.iter().any(|w| w == "println"));
        assert!(helper.words.iter().any(|w| w == "struct"));
        assert_eq!(GolemHelper::word_start("let x = pri"), 8);
    }
}
