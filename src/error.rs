//! Error types for the game core
//!
//! Provides custom error types for configuration validation, opponent-move
//! selection and orchestrator sequencing. Illegal human move attempts are
//! deliberately *not* an error path: the session surfaces them as no-ops
//! with a re-selection fallback so the turn state machine never crashes.

use crate::config::{RATING_MAX, RATING_MIN};

/// Errors that can occur in the game core
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Startup configuration rejected; the game stays un-initialized
    #[error("invalid configuration: opponent strength {rating} outside {RATING_MIN}-{RATING_MAX}")]
    InvalidConfig { rating: u32 },

    /// A move was requested for a position that has no legal continuation.
    /// Only valid at terminal positions, which callers must have excluded.
    #[error("no legal moves available in position {fen}")]
    NoLegalMoves { fen: String },

    /// An operation was invoked in a state where it is not permitted
    #[error("invariant violation: {message}")]
    InvariantViolation { message: String },

    /// The opponent could not produce a move through any strategy.
    /// Reaching this outside a terminal position is a sequencing bug.
    #[error("opponent unavailable: {source}")]
    OpponentUnavailable {
        #[from]
        source: RemoteEngineError,
    },

    /// The spawned opponent task was cancelled or panicked before joining
    #[error("opponent task failed to complete: {message}")]
    OpponentTaskFailed { message: String },
}

/// Errors from the external strong-engine service path.
///
/// Every variant is recoverable: the policy falls back to local search
/// rather than stalling the game.
#[derive(Debug, thiserror::Error)]
pub enum RemoteEngineError {
    /// Transport-level failure (connect, timeout, TLS, ...)
    #[error("engine service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success HTTP status
    #[error("engine service returned status {status}")]
    BadStatus { status: u16 },

    /// The response body had no usable move field
    #[error("engine service response missing a move")]
    MissingMove,

    /// The returned move string could not be parsed in coordinate or
    /// algebraic form
    #[error("engine returned unparseable move {0:?}")]
    UnparseableMove(String),

    /// The returned move parsed but is not legal in the current position
    #[error("engine returned illegal move {mv:?} for position {fen}")]
    IllegalMove { mv: String, fen: String },

    /// No remote engine is configured for this policy
    #[error("no remote engine configured")]
    NotConfigured,
}

/// Result type alias for game operations
pub type GameResult<T> = Result<T, GameError>;
