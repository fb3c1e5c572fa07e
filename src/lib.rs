//! kibitz: the move-arbitration and opponent core of a chess app
//!
//! The crate sits between a board UI and a chess-rules library. It
//! arbitrates human input against the rules, runs a strength-rated
//! opponent (remote engine service when configured, tiered local search
//! otherwise), detects game end, and supports undo and per-game
//! configuration. It renders nothing and owns no event loop; a UI drives
//! it through [`session::GameSession`] and observes it through
//! [`session::GameObserver`].
//!
//! # Architecture
//!
//! - [`rules`]: the [`rules::RulesEngine`] capability trait and its
//!   shakmaty-backed implementation. The crate never reimplements chess
//!   rules.
//! - [`eval`] / [`search`]: material-and-mobility evaluation and
//!   fixed-depth minimax with alpha-beta pruning.
//! - [`policy`]: rating-to-tier mapping and tier-dispatched move
//!   selection, remote-first with local fallback.
//! - [`remote`]: the async client seam to a strong-engine service.
//! - [`session`]: the per-game state machine tying it all together.
//! - [`chat`]: position-aware canned commentary for a side panel.

pub mod chat;
pub mod config;
pub mod error;
pub mod eval;
pub mod policy;
pub mod remote;
pub mod rules;
pub mod search;
pub mod session;

pub use config::{GameConfig, RATING_MAX, RATING_MIN};
pub use error::{GameError, GameResult, RemoteEngineError};
pub use policy::{skill_tier, MoveSource, OpponentPolicy};
pub use remote::{depth_for_rating, HttpEngineClient, RemoteEngine};
pub use rules::{RulesEngine, ShakmatyRules, TerminalStatus};
pub use session::{
    ClickOutcome, GameObserver, GameSession, OpponentOutcome, SessionState, StatusKind,
};
