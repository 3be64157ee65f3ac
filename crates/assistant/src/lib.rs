//! The StemChat assistant.
//!
//! [`Assistant`] is the entry point: it asks the LLM when one is configured
//! and falls back to the deterministic [`FallbackEngine`] otherwise. Every
//! reply leaves as plain text through [`clean`].

pub mod fallback;
pub mod orchestrator;
pub mod prompt;
pub mod text;

pub use fallback::{FallbackEngine, Intent, IntentRule, Knowledge, Query, Topic};
pub use orchestrator::{Assistant, FallbackReason, Reply, ReplySource};
pub use prompt::{build_system_prompt, format_snapshot};
pub use text::clean;
