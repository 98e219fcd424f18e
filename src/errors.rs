//! Error taxonomy for the REPL pipeline.
//!
//! None of these are fatal: the dispatcher reports them and keeps the
//! session alive. Startup failures go through `anyhow` in `main`.

/// A command that could not run. `Display` is the operator-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Malformed or missing command argument.
    #[error("{0}")]
    InvalidArgument(String),

    /// `ask` issued before any successful `load`.
    #[error("No context loaded. Use 'load [URL]' to load context first.")]
    NoContextLoaded,

    /// Unrecognized verb.
    #[error("Invalid command. Use 'load [URL]', 'ask [your question]', or 'exit'.")]
    UnknownCommand,
}

/// Render, fetch, or parse failure during `load`.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The render capability could not provide a session.
    #[error("failed to open render session: {0}")]
    Open(String),

    /// Navigation exceeded the bounded wait.
    #[error("timed out after {secs}s loading {url}")]
    Timeout { url: String, secs: u64 },

    /// Transport-level failure (DNS, TLS, connection reset, body read).
    #[error("failed to load {url}: {message}")]
    Navigation { url: String, message: String },

    /// The page answered with a non-success HTTP status.
    #[error("failed to load {url}: HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Failure of the model capability.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Backend could not be reached at all.
    #[error("model backend unavailable at {url}: {message}")]
    Unavailable { url: String, message: String },

    #[error("model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("model API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    #[error("model returned an empty reply")]
    EmptyReply,

    #[error("model did not answer within {0}s")]
    Timeout(u64),

    /// `model.provider` names no known backend.
    #[error("unknown model provider: {0}")]
    UnknownProvider(String),

    /// Required credential is not set in the environment.
    #[error("{0} environment variable not set")]
    MissingApiKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_errors_are_operator_messages() {
        assert_eq!(
            CommandError::NoContextLoaded.to_string(),
            "No context loaded. Use 'load [URL]' to load context first."
        );
        assert_eq!(
            CommandError::InvalidArgument("Please provide a valid question.".into()).to_string(),
            "Please provide a valid question."
        );
    }

    #[test]
    fn extraction_status_display() {
        let err = ExtractionError::Status {
            url: "https://example.com".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "failed to load https://example.com: HTTP 404");
    }

    #[test]
    fn missing_api_key_display() {
        let err = ModelError::MissingApiKey("OPENAI_API_KEY".to_string());
        assert_eq!(err.to_string(), "OPENAI_API_KEY environment variable not set");
    }
}
