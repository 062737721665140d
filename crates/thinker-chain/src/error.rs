//! Error types for thinker-chain

use thiserror::Error;

/// Result type alias using thinker-chain Error
pub type Result<T> = std::result::Result<T, Error>;

/// Input rejected before any state changes. Provider failures are not errors
/// at this level: they end the chain and are recorded as messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Submitted query was empty after trimming
    #[error("Query is empty")]
    EmptyQuery,

    /// Replacement system prompt was empty after trimming
    #[error("System prompt is empty")]
    EmptySystemPrompt,

    /// Selected model id was empty after trimming
    #[error("Model id is empty")]
    EmptyModel,
}
