//! Prompt assembly.
//!
//! Every `ask` is a fresh single-turn exchange: the message sequence carries
//! the current context and the current question and nothing else. The
//! context always comes first.

use crate::config::PromptStyle;
use crate::models::Message;

/// Instruction placed ahead of the context in [`PromptStyle::System`].
pub const GROUNDING_INSTRUCTION: &str = "Answer based solely on the provided content.";

#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder {
    style: PromptStyle,
}

impl PromptBuilder {
    pub fn new(style: PromptStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> PromptStyle {
        self.style
    }

    pub fn build(&self, context: &str, question: &str) -> Vec<Message> {
        match self.style {
            PromptStyle::Inline => vec![Message::user(format!(
                "Context:\n{}\n\nQuestion: {}",
                context, question
            ))],
            PromptStyle::System => vec![
                Message::system(format!(
                    "{}\n\nContent:\n{}",
                    GROUNDING_INSTRUCTION, context
                )),
                Message::user(question),
            ],
        }
    }
}
