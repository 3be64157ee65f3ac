//! # StemChat Core
//!
//! Domain types, traits, and error definitions shared by every StemChat crate.
//! This crate has **no framework dependencies**: it defines the chat message
//! model and the `Provider` seam that the assistant talks to.
//!
//! ## Design Philosophy
//!
//! Outbound capabilities (the LLM, the organizational data stores) are traits.
//! Implementations live in their own crates, which keeps the assistant
//! testable with scripted stand-ins and leaves the dependency graph pointing
//! inward on core.

pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, SourceError};
pub use message::{ChatTurn, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
