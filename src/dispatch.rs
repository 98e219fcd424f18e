//! Command parsing and dispatch.
//!
//! The [`Dispatcher`] owns the [`Session`] and runs one command line to
//! completion before returning, so a `load` is fully applied before the next
//! `ask` is looked at.
//!
//! | Input | Effect |
//! |-------|--------|
//! | `exit` (any case) | goodbye line, session ends |
//! | `load <http(s) URL>` | extract page, replace context |
//! | `ask <question>` | answer from the current context |
//! | blank line | nothing |
//! | anything else | usage hint |

use std::io::{self, Write};

use crate::errors::CommandError;
use crate::extract::ContentExtractor;
use crate::model::ModelClient;
use crate::models::SessionStatus;
use crate::prompt::PromptBuilder;
use crate::session::Session;

pub const GOODBYE: &str = "Exiting chatbot. Goodbye!";
pub const LOAD_OK: &str = "Context loaded successfully!";
pub const LOAD_FAILED: &str = "Failed to load context from the provided URL.";
const INVALID_URL: &str = "Please provide a valid URL starting with http:// or https://.";
const INVALID_QUESTION: &str = "Please provide a valid question.";

/// One parsed input line. Arguments are trimmed but not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Load(String),
    Ask(String),
    Exit,
    Empty,
    Unknown,
}

/// Whether the REPL keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Split a raw input line into a [`Command`].
///
/// Only leading whitespace is dropped before matching the verb, so `"ask "`
/// still parses as an `ask` with an empty question.
pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    let line = line.trim_start();

    if trimmed.is_empty() {
        Command::Empty
    } else if trimmed.eq_ignore_ascii_case("exit") {
        Command::Exit
    } else if let Some(rest) = line.strip_prefix("load ") {
        Command::Load(rest.trim().to_string())
    } else if let Some(rest) = line.strip_prefix("ask ") {
        Command::Ask(rest.trim().to_string())
    } else {
        Command::Unknown
    }
}

/// Accept only non-empty `http://` / `https://` URLs.
pub fn validate_url(url: &str) -> Result<&str, CommandError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url)
    } else {
        Err(CommandError::InvalidArgument(INVALID_URL.to_string()))
    }
}

pub struct Dispatcher {
    session: Session,
    extractor: ContentExtractor,
    prompt: PromptBuilder,
    model: ModelClient,
    echo_context: bool,
}

impl Dispatcher {
    pub fn new(
        session: Session,
        extractor: ContentExtractor,
        prompt: PromptBuilder,
        model: ModelClient,
    ) -> Self {
        Self {
            session,
            extractor,
            prompt,
            model,
            echo_context: false,
        }
    }

    /// Print the stored context after each successful load.
    pub fn with_echo_context(mut self, echo: bool) -> Self {
        self.echo_context = echo;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run one input line to completion, writing operator output to `out`.
    ///
    /// Command failures are reported on `out` and never returned; the only
    /// error is a failed write.
    pub async fn handle_line(
        &mut self,
        line: &str,
        out: &mut (dyn Write + Send),
    ) -> io::Result<Flow> {
        let flow = match parse_command(line) {
            Command::Empty => Flow::Continue,
            Command::Exit => {
                writeln!(out, "{}", GOODBYE)?;
                Flow::Exit
            }
            Command::Unknown => report(out, CommandError::UnknownCommand)?,
            Command::Load(url) => match validate_url(&url) {
                Ok(url) => self.load(url, out).await?,
                Err(e) => report(out, e)?,
            },
            Command::Ask(question) => match self.check_ask(&question) {
                Ok(()) => self.ask(&question, out).await?,
                Err(e) => report(out, e)?,
            },
        };
        out.flush()?;
        Ok(flow)
    }

    fn check_ask(&self, question: &str) -> Result<(), CommandError> {
        if question.is_empty() {
            return Err(CommandError::InvalidArgument(INVALID_QUESTION.to_string()));
        }
        if self.session.context().is_empty() {
            return Err(CommandError::NoContextLoaded);
        }
        Ok(())
    }

    async fn load(&mut self, url: &str, out: &mut (dyn Write + Send)) -> io::Result<Flow> {
        writeln!(out, "Fetching content from: {}", url)?;
        out.flush()?;

        self.session.set_status(SessionStatus::LoadingContext);
        let extracted = self.extractor.extract(url).await;
        self.session.set_status(SessionStatus::Idle);

        match extracted {
            Ok(text) => {
                self.session.replace_context(url, &text);
                tracing::info!(
                    url,
                    context_chars = self.session.context().len(),
                    "context replaced"
                );
                writeln!(out, "{}", LOAD_OK)?;
                if self.echo_context {
                    writeln!(out, "Scraped Content:")?;
                    writeln!(out, "{}", self.session.context().get())?;
                }
            }
            Err(e) => {
                // Previous context, if any, stays in place.
                tracing::warn!(url, error = %e, "extraction failed");
                writeln!(out, "{}", LOAD_FAILED)?;
            }
        }
        Ok(Flow::Continue)
    }

    async fn ask(&mut self, question: &str, out: &mut (dyn Write + Send)) -> io::Result<Flow> {
        writeln!(out, "Generating response...")?;
        out.flush()?;

        let messages = self.prompt.build(self.session.context().get(), question);

        self.session.set_status(SessionStatus::GeneratingReply);
        let reply = self.model.complete(&messages).await;
        self.session.set_status(SessionStatus::Idle);

        writeln!(out, "AI: {}", reply.trim())?;
        Ok(Flow::Continue)
    }
}

fn report(out: &mut (dyn Write + Send), err: CommandError) -> io::Result<Flow> {
    tracing::debug!(error = ?err, "command rejected");
    writeln!(out, "{}", err)?;
    Ok(Flow::Continue)
}
