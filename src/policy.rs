//! Opponent move selection under a configurable strength rating
//!
//! The configured rating maps to a discrete skill tier (0-10). The tier
//! picks the strategy: full local search at the top, blends of shallow
//! search and randomness in the middle, capture-happy randomness at the
//! bottom. When a remote strong-engine service is configured it is
//! preferred at every tier, with its depth scaled from the same rating;
//! any remote failure falls back to the local strategy so the game never
//! stalls.
//!
//! Positions cross this boundary as FEN strings, so the policy stays
//! independent of whichever [`crate::rules::RulesEngine`] the session
//! uses. Randomness comes from a seedable RNG; the session forks a child
//! RNG per opponent turn so spawned tasks stay deterministic under a
//! fixed seed.

use crate::error::{GameError, GameResult, RemoteEngineError};
use crate::remote::{depth_for_rating, RemoteEngine};
use crate::rules::ShakmatyRules;
use crate::search;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, RngCore, SeedableRng};
use shakmaty::san::San;
use shakmaty::uci::UciMove;
use shakmaty::{Chess, Move, Position};
use std::sync::Arc;
use tracing::{info, warn};

/// Map a strength rating to a skill tier 0-10 with fixed breakpoints
pub fn skill_tier(rating: u32) -> u8 {
    match rating {
        0..=899 => 0,
        900..=1099 => 1,
        1100..=1299 => 2,
        1300..=1499 => 3,
        1500..=1699 => 4,
        1700..=1899 => 5,
        1900..=2099 => 6,
        2100..=2299 => 7,
        2300..=2499 => 8,
        2500..=2699 => 9,
        _ => 10,
    }
}

/// Where a selected move came from; surfaced for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSource {
    Remote,
    LocalSearch,
}

/// Strength-tiered move selector
#[derive(Clone)]
pub struct OpponentPolicy {
    rng: StdRng,
    remote: Option<Arc<dyn RemoteEngine>>,
}

impl std::fmt::Debug for OpponentPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpponentPolicy")
            .field("remote", &self.remote.is_some())
            .finish()
    }
}

impl Default for OpponentPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl OpponentPolicy {
    /// Local-only policy with OS-seeded randomness
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            remote: None,
        }
    }

    /// Deterministic policy for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            remote: None,
        }
    }

    /// Prefer the given remote engine, falling back to local search
    pub fn with_remote(mut self, remote: Arc<dyn RemoteEngine>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Split off a policy with a derived RNG stream. Advances this
    /// policy's RNG, so successive forks differ while remaining
    /// reproducible under a fixed seed.
    pub fn fork(&mut self) -> Self {
        Self {
            rng: StdRng::seed_from_u64(self.rng.next_u64()),
            remote: self.remote.clone(),
        }
    }

    /// Select one move for the side to move in `fen`.
    ///
    /// Fails with [`GameError::NoLegalMoves`] only when the position is
    /// terminal, which callers must already have excluded.
    pub async fn select_move(&mut self, fen: &str, rating: u32) -> GameResult<(Move, MoveSource)> {
        let position = ShakmatyRules::position_from_fen(fen).ok_or_else(|| {
            GameError::InvariantViolation {
                message: format!("opponent asked to move in unparseable position {fen:?}"),
            }
        })?;

        let legal = position.legal_moves();
        if legal.is_empty() {
            return Err(GameError::NoLegalMoves { fen: fen.to_string() });
        }

        if let Some(remote) = self.remote.clone() {
            match self.remote_move(remote.as_ref(), &position, fen, rating).await {
                Ok(mv) => {
                    info!("[AI] remote engine chose a move at rating {}", rating);
                    return Ok((mv, MoveSource::Remote));
                }
                Err(err) => {
                    warn!("[AI] remote engine failed ({err}), falling back to local search");
                }
            }
        }

        Ok((self.local_move(&position, rating), MoveSource::LocalSearch))
    }

    async fn remote_move(
        &self,
        remote: &dyn RemoteEngine,
        position: &Chess,
        fen: &str,
        rating: u32,
    ) -> Result<Move, RemoteEngineError> {
        let raw = remote
            .best_move(fen, rating, depth_for_rating(rating))
            .await?;
        parse_move(&raw, position, fen)
    }

    /// Tier-dispatched local selection; `position` must not be terminal.
    fn local_move(&mut self, position: &Chess, rating: u32) -> Move {
        let legal: Vec<Move> = position.legal_moves().into_iter().collect();
        let tier = skill_tier(rating);

        let chosen = match tier {
            8..=10 => search::best_move(position, 2),
            5..=7 => {
                // Top three at depth 2, then pick among the best two.
                let top = search::top_moves(position, 2, 3);
                let pool = &top[..top.len().min(2)];
                pool.choose(&mut self.rng).cloned()
            }
            2..=4 => {
                if self.rng.random_bool(0.4) {
                    search::best_move(position, 1)
                } else {
                    legal.choose(&mut self.rng).cloned()
                }
            }
            _ => {
                let captures: Vec<Move> =
                    legal.iter().filter(|m| m.is_capture()).cloned().collect();
                if !captures.is_empty() && self.rng.random_bool(0.3) {
                    captures.choose(&mut self.rng).cloned()
                } else {
                    legal.choose(&mut self.rng).cloned()
                }
            }
        };

        info!("[AI] tier {} selected a local move", tier);
        // `legal` is non-empty, so every branch above produced a move;
        // the first legal move keeps us total regardless.
        chosen.unwrap_or_else(|| legal[0].clone())
    }
}

/// Parse a remote move string against a position: coordinate form first,
/// SAN second. Distinguishes "could not read it" from "read it, but it is
/// not legal here".
fn parse_move(raw: &str, position: &Chess, fen: &str) -> Result<Move, RemoteEngineError> {
    let trimmed = raw.trim();

    if let Ok(uci) = trimmed.parse::<UciMove>() {
        return uci
            .to_move(position)
            .map_err(|_| RemoteEngineError::IllegalMove {
                mv: trimmed.to_string(),
                fen: fen.to_string(),
            });
    }

    if let Ok(san) = trimmed.parse::<San>() {
        return san
            .to_move(position)
            .map_err(|_| RemoteEngineError::IllegalMove {
                mv: trimmed.to_string(),
                fen: fen.to_string(),
            });
    }

    Err(RemoteEngineError::UnparseableMove(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const FOOLS_MATE_FEN: &str = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";

    struct BrokenEngine;

    #[async_trait]
    impl RemoteEngine for BrokenEngine {
        async fn best_move(&self, _: &str, _: u32, _: u8) -> Result<String, RemoteEngineError> {
            Err(RemoteEngineError::BadStatus { status: 500 })
        }
        async fn chat(&self, _: &str, _: &str) -> Result<String, RemoteEngineError> {
            Err(RemoteEngineError::BadStatus { status: 500 })
        }
    }

    #[test]
    fn test_skill_tier_breakpoints() {
        assert_eq!(skill_tier(800), 0);
        assert_eq!(skill_tier(899), 0);
        assert_eq!(skill_tier(900), 1);
        assert_eq!(skill_tier(1500), 4);
        assert_eq!(skill_tier(1899), 5);
        assert_eq!(skill_tier(2300), 8);
        assert_eq!(skill_tier(2700), 10);
        assert_eq!(skill_tier(3000), 10);
    }

    #[tokio::test]
    async fn test_every_tier_returns_a_legal_move() {
        let position = ShakmatyRules::position_from_fen(START_FEN).unwrap();
        for rating in [800, 1000, 1200, 1400, 1800, 2100, 2400, 3000] {
            let mut policy = OpponentPolicy::seeded(7);
            let (mv, source) = policy.select_move(START_FEN, rating).await.unwrap();
            assert_eq!(source, MoveSource::LocalSearch);
            assert!(
                position.legal_moves().contains(&mv),
                "rating {rating} produced an illegal move"
            );
        }
    }

    #[tokio::test]
    async fn test_terminal_position_is_no_legal_moves() {
        let mut policy = OpponentPolicy::seeded(1);
        let err = policy.select_move(FOOLS_MATE_FEN, 1500).await.unwrap_err();
        assert!(matches!(err, GameError::NoLegalMoves { .. }));
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back_to_local() {
        let mut policy = OpponentPolicy::seeded(3).with_remote(Arc::new(BrokenEngine));
        let (mv, source) = policy.select_move(START_FEN, 2500).await.unwrap();

        assert_eq!(source, MoveSource::LocalSearch);
        let position = ShakmatyRules::position_from_fen(START_FEN).unwrap();
        assert!(position.legal_moves().contains(&mv));
    }

    #[test]
    fn test_parse_move_accepts_uci_and_san() {
        let position = ShakmatyRules::position_from_fen(START_FEN).unwrap();

        let coordinate = parse_move("e2e4", &position, START_FEN).unwrap();
        assert!(position.legal_moves().contains(&coordinate));

        let algebraic = parse_move("Nf3", &position, START_FEN).unwrap();
        assert!(position.legal_moves().contains(&algebraic));
    }

    #[test]
    fn test_parse_move_rejects_illegal_and_garbage() {
        let position = ShakmatyRules::position_from_fen(START_FEN).unwrap();

        assert!(matches!(
            parse_move("e2e5", &position, START_FEN),
            Err(RemoteEngineError::IllegalMove { .. })
        ));
        assert!(matches!(
            parse_move("zz9!", &position, START_FEN),
            Err(RemoteEngineError::UnparseableMove(_))
        ));
    }

    #[test]
    fn test_forked_policies_diverge_but_reproduce() {
        let mut a = OpponentPolicy::seeded(42);
        let mut b = OpponentPolicy::seeded(42);

        // Forks from equal parents match each other pairwise.
        let fork_a1 = a.fork().rng.next_u64();
        let fork_b1 = b.fork().rng.next_u64();
        assert_eq!(fork_a1, fork_b1);

        // Successive forks draw different streams.
        let fork_a2 = a.fork().rng.next_u64();
        assert_ne!(fork_a1, fork_a2);
    }
}
