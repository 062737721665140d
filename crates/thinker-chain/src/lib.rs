//! thinker-chain: Self-steering multi-turn reasoning chains
//!
//! This crate runs a bounded sequence of dependent chat-completion calls in
//! which each response may rewrite the system prompt of the next call, and
//! holds the conversation state those chains are recorded in.

pub mod chain;
pub mod conversation;
pub mod directive;
pub mod error;
pub mod events;
pub mod handle;
pub mod turn;

pub use chain::{
    Chain, ChainConfig, ChainOutcome, FailureReason, MAX_TURNS, MIN_TURNS, TurnFailure,
    clamp_turns,
};
pub use conversation::{ConversationState, DEFAULT_SYSTEM_PROMPT};
pub use directive::{DirectivePolicy, DirectiveSource};
pub use error::{Error, Result};
pub use events::ChainEvent;
pub use handle::ChainHandle;
pub use turn::TurnContext;
