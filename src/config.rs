//! TOML configuration parsing.
//!
//! Every field has a default, so an absent file or an empty file yields a
//! working setup against a local Ollama instance. See
//! `config/webload.example.toml` for a full example.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "WEBLOAD_CONFIG";

/// Config file used when [`CONFIG_ENV`] is unset and the file exists.
pub const DEFAULT_CONFIG_PATH: &str = "./config/webload.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    /// Hard cap on stored context, in characters.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default = "default_extract_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Print the stored context after a successful load.
    #[serde(default)]
    pub echo_context: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_context_chars: default_max_context_chars(),
            timeout_secs: default_extract_timeout_secs(),
            user_agent: default_user_agent(),
            echo_context: false,
        }
    }
}

fn default_max_context_chars() -> usize {
    2000
}
fn default_extract_timeout_secs() -> u64 {
    60
}
fn default_user_agent() -> String {
    format!("webload/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// `ollama` or `openai`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of the backend. Defaults per provider, see [`ModelConfig::base_url`].
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            url: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_model_timeout_secs(),
            max_retries: default_max_retries(),
            fallback_reply: default_fallback_reply(),
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_model() -> String {
    "qwen2.5:0.5b".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_model_timeout_secs() -> u64 {
    120
}
fn default_max_retries() -> u32 {
    2
}
fn default_fallback_reply() -> String {
    "I'm sorry, I couldn't process that request.".to_string()
}

impl ModelConfig {
    /// Backend base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        let url = match (&self.url, self.provider.as_str()) {
            (Some(url), _) => url.as_str(),
            (None, "openai") => "https://api.openai.com",
            (None, _) => "http://localhost:11434",
        };
        url.trim_end_matches('/').to_string()
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// One user message embedding both context and question.
    #[default]
    Inline,
    /// Context in a system message, question in a user message.
    System,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PromptConfig {
    #[serde(default)]
    pub style: PromptStyle,
}

/// Parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Resolve the config file from the environment, falling back to defaults.
///
/// An explicit `WEBLOAD_CONFIG` must point at a readable file; the default
/// path is only used when it exists.
pub fn resolve_config() -> Result<Config> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return load_config(&PathBuf::from(path));
    }

    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        return load_config(default_path);
    }

    let config = Config::default();
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.extract.max_context_chars == 0 {
        anyhow::bail!("extract.max_context_chars must be > 0");
    }
    if config.extract.timeout_secs == 0 {
        anyhow::bail!("extract.timeout_secs must be > 0");
    }
    if config.model.timeout_secs == 0 {
        anyhow::bail!("model.timeout_secs must be > 0");
    }
    if config.model.model.trim().is_empty() {
        anyhow::bail!("model.model must not be empty");
    }
    if config.model.fallback_reply.trim().is_empty() {
        anyhow::bail!("model.fallback_reply must not be empty");
    }

    match config.model.provider.as_str() {
        "ollama" | "openai" => {}
        other => anyhow::bail!(
            "Unknown model provider: '{}'. Must be ollama or openai.",
            other
        ),
    }

    Ok(())
}
