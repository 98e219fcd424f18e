//! Core data types shared by the pipeline.

use serde::Serialize;

/// Who authored a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One entry of the sequence sent to the model. Built fresh for every `ask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Observable state of the session between and during commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    LoadingContext,
    GeneratingReply,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_with_lowercase_role() {
        let json = serde_json::to_value(Message::system("ctx")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system", "content": "ctx"}));
    }
}
