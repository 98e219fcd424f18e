//! Process-lifetime session state.

use crate::context::ContextStore;
use crate::models::SessionStatus;

/// The one session of a running process.
///
/// Built once in `main` and owned by the [`crate::dispatch::Dispatcher`],
/// which is its only mutator.
#[derive(Debug)]
pub struct Session {
    context: ContextStore,
    status: SessionStatus,
    source_url: Option<String>,
}

impl Session {
    pub fn new(max_context_chars: usize) -> Self {
        Self {
            context: ContextStore::new(max_context_chars),
            status: SessionStatus::Idle,
            source_url: None,
        }
    }

    pub fn context(&self) -> &ContextStore {
        &self.context
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// URL of the page the current context was loaded from.
    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub(crate) fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
    }

    /// Replace the context after a successful load.
    pub(crate) fn replace_context(&mut self, url: &str, text: &str) {
        self.context.set(text);
        self.source_url = Some(url.to_string());
    }
}
