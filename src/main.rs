//! # webload
//!
//! Interactive REPL that loads one web page at a time as context and asks a
//! language model questions about it.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `load <url>` | Fetch the page and store its text as the current context |
//! | `ask <question>` | Answer a question grounded in the current context |
//! | `exit` | Leave the session |
//!
//! ## Configuration
//!
//! Read from `$WEBLOAD_CONFIG`, else `./config/webload.toml` if present,
//! else built-in defaults (local Ollama, `qwen2.5:0.5b`). See
//! `config/webload.example.toml`.

use anyhow::Context;
use std::sync::Arc;

use webload::config;
use webload::dispatch::Dispatcher;
use webload::extract::ContentExtractor;
use webload::logging;
use webload::model::{create_chat_model, ModelClient};
use webload::prompt::PromptBuilder;
use webload::render::HttpRenderer;
use webload::repl::{self, RustylineSource};
use webload::session::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cfg = config::resolve_config()?;

    let chat_model = create_chat_model(&cfg.model)
        .with_context(|| format!("Failed to initialize model provider '{}'", cfg.model.provider))?;
    println!("Connecting to model {} at {}", chat_model.model_id(), cfg.model.base_url());
    chat_model
        .health_check()
        .await
        .context("Model backend is not available")?;

    let extractor = ContentExtractor::new(Arc::new(HttpRenderer::new(&cfg.extract)), &cfg.extract);
    let mut dispatcher = Dispatcher::new(
        Session::new(cfg.extract.max_context_chars),
        extractor,
        PromptBuilder::new(cfg.prompt.style),
        ModelClient::new(chat_model, &cfg.model),
    )
    .with_echo_context(cfg.extract.echo_context);

    let mut input = RustylineSource::new()?;
    let mut stdout = std::io::stdout();
    repl::run(&mut dispatcher, &mut input, &mut stdout).await?;

    Ok(())
}
