//! Interactive read loop.
//!
//! Input is pulled one line at a time through a [`LineSource`]; each line is
//! handed to the [`Dispatcher`] and awaited before the next one is read.
//! Keystrokes typed meanwhile stay buffered in the terminal.

use anyhow::Result;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::io::Write;

use crate::dispatch::{Dispatcher, Flow, GOODBYE};

pub const PROMPT: &str = ">> ";

pub const BANNER: &str = "Chatbot is ready!
Available Commands:
  load [URL] - Load context from a website URL
  ask [your question] - Ask a question based on the loaded context
  exit - Exit the chatbot";

const COMMANDS: [&str; 3] = ["load ", "ask ", "exit"];

/// Outcome of one read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C at the prompt.
    Interrupted,
    /// Ctrl-D or end of piped input.
    Eof,
}

/// Where command lines come from.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    /// Remember an accepted line. No-op by default.
    fn add_history(&mut self, _line: &str) {}
}

/// Drive `dispatcher` until `exit` or end of input.
pub async fn run(
    dispatcher: &mut Dispatcher,
    input: &mut dyn LineSource,
    out: &mut (dyn Write + Send),
) -> Result<()> {
    writeln!(out, "{}", BANNER)?;
    out.flush()?;

    loop {
        match input.read_line(PROMPT)? {
            ReadOutcome::Line(line) => {
                if !line.trim().is_empty() {
                    input.add_history(&line);
                }
                if dispatcher.handle_line(&line, out).await? == Flow::Exit {
                    break;
                }
            }
            ReadOutcome::Interrupted => {
                writeln!(out, "CTRL-C detected. Type 'exit' to quit.")?;
            }
            ReadOutcome::Eof => {
                writeln!(out, "{}", GOODBYE)?;
                break;
            }
        }
    }

    out.flush()?;
    Ok(())
}

/// Completion and hints for the three verbs.
#[derive(Clone, Default)]
struct CommandHelper;

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if line.contains(' ') {
            return Ok((0, vec![]));
        }

        let candidates = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.trim_end().to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Hinter for CommandHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if line.is_empty() || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Highlighter for CommandHelper {}

impl Validator for CommandHelper {}

/// Terminal input through `rustyline`, with history and completion.
pub struct RustylineSource {
    editor: Editor<CommandHelper, DefaultHistory>,
}

impl RustylineSource {
    pub fn new() -> Result<Self> {
        let mut editor = Editor::new()?;
        editor.set_helper(Some(CommandHelper));
        Ok(Self { editor })
    }
}

impl LineSource for RustylineSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(err.into()),
        }
    }

    fn add_history(&mut self, line: &str) {
        if let Err(e) = self.editor.add_history_entry(line) {
            tracing::debug!(error = %e, "failed to record history entry");
        }
    }
}
