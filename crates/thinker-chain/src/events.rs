//! Chain event types

use serde::{Deserialize, Serialize};

use crate::chain::FailureReason;
use crate::directive::DirectiveSource;

/// Events emitted while a chain runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChainEvent {
    /// Chain started
    ChainStart { total_turns: u32 },

    /// A turn is about to call the provider
    TurnStart { turn: u32, system_prompt: String },

    /// A turn produced a response
    TurnEnd { turn: u32, response: String },

    /// The system prompt for the next turn was decided
    DirectiveApplied {
        turn: u32,
        prompt: String,
        source: DirectiveSource,
    },

    /// A turn failed; no further turns run
    TurnFailed { turn: u32, reason: FailureReason },

    /// Chain finished, normally or early
    ChainEnd { turns_completed: u32, aborted: bool },
}

impl ChainEvent {
    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChainEvent::ChainEnd { .. })
    }
}
