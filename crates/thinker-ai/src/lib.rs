//! thinker-ai: Chat-completion provider abstraction
//!
//! This crate provides the message types shared by the rest of the workspace
//! and a single-turn client for OpenAI-compatible chat-completion endpoints
//! (xAI Grok by default).

pub mod error;
pub mod models;
pub mod providers;
pub mod types;

pub use error::{Error, Result};
pub use providers::CompletionProvider;
pub use types::*;
