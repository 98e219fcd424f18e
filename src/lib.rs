//! # webload
//!
//! An interactive command-line session that grounds a language-model chat in
//! the text of one web page at a time.
//!
//! ## Architecture
//!
//! ```text
//!  operator ──▶ ┌────────────┐  load  ┌───────────┐   ┌──────────────┐
//!   (REPL)      │ Dispatcher │───────▶│ Extractor │──▶│ PageRenderer │
//!               │  (Session) │        └─────┬─────┘   └──────────────┘
//!               └─────┬──────┘              ▼
//!                     │ ask          ┌──────────────┐
//!                     ├─────────────▶│ ContextStore │
//!                     ▼              └──────────────┘
//!              ┌───────────────┐    ┌─────────────┐   ┌───────────┐
//!              │ PromptBuilder │───▶│ ModelClient │──▶│ ChatModel │
//!              └───────────────┘    └─────────────┘   └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`errors`] | Error taxonomy |
//! | [`render`] | Render capability and HTTP backend |
//! | [`extract`] | Page text extraction and flattening |
//! | [`context`] | Context storage and truncation |
//! | [`session`] | Process-lifetime session state |
//! | [`prompt`] | Prompt assembly |
//! | [`model`] | Model capability, backends, fallback client |
//! | [`dispatch`] | Command parsing and dispatch |
//! | [`repl`] | Interactive read loop |
//! | [`logging`] | Diagnostic logging setup |

pub mod config;
pub mod context;
pub mod dispatch;
pub mod errors;
pub mod extract;
pub mod logging;
pub mod model;
pub mod models;
pub mod prompt;
pub mod render;
pub mod repl;
pub mod session;
