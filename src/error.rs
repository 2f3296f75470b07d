//! Error types for the engine.
//!
//! Insufficient data is not an error: predictors abstain by returning
//! `None`. Everything here is a failed call that the caller must handle.

/// Errors returned by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no legal action: every move is out of charges")]
    NoLegalAction,

    #[error("invalid observation: '{0}' is not rock, paper or scissor")]
    InvalidObservation(String),

    #[error("out-of-order turn for opponent '{opponent}': last observed {last}, got {got}")]
    OutOfOrder { opponent: String, last: u32, got: u32 },

    #[error("state corruption: {0}")]
    StateCorruption(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
