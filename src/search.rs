//! Local move search: minimax with alpha-beta pruning
//!
//! The search is pure-functional: each node clones the position and plays
//! one move into the clone, so there is no shared mutable board and no
//! apply/undo pairing to get wrong when pruning exits a move loop early.
//! Clone cost is irrelevant at the shallow depths the opponent policy
//! uses (1-2 ply locally).
//!
//! White is the maximizing player throughout. Ties between equal-valued
//! moves resolve to the first move encountered in the rules engine's
//! generation order, so results are deterministic; any randomness is
//! injected above this layer by the opponent policy.
//!
//! Depth is the sole bound. There is no time budget here; callers pick a
//! depth their latency budget can absorb.

use crate::eval::evaluate;
use shakmaty::{Chess, Color, Move, Position};
use tracing::trace;

/// Best move for the side to move, or `None` at a terminal position.
pub fn best_move(position: &Chess, depth: u8) -> Option<Move> {
    let maximizing = position.turn() == Color::White;
    let mut best: Option<(Move, i32)> = None;

    for mv in &position.legal_moves() {
        let child = match position.clone().play(mv) {
            Ok(child) => child,
            Err(_) => continue,
        };
        let value = minimax(&child, depth.saturating_sub(1), i32::MIN, i32::MAX);
        trace!("[SEARCH] {:?} scores {}", mv, value);

        let better = match &best {
            None => true,
            Some((_, best_value)) => {
                if maximizing {
                    value > *best_value
                } else {
                    value < *best_value
                }
            }
        };
        if better {
            best = Some((mv.clone(), value));
        }
    }

    best.map(|(mv, _)| mv)
}

/// The `k` best moves for the side to move, best first.
///
/// Every legal move is scored at full window (no pruning across root
/// siblings) and the list is stably sorted, so equal-valued moves keep
/// their generation order.
pub fn top_moves(position: &Chess, depth: u8, k: usize) -> Vec<Move> {
    let maximizing = position.turn() == Color::White;

    let mut scored: Vec<(Move, i32)> = position
        .legal_moves()
        .into_iter()
        .filter_map(|mv| {
            let child = position.clone().play(&mv).ok()?;
            let value = minimax(&child, depth.saturating_sub(1), i32::MIN, i32::MAX);
            Some((mv, value))
        })
        .collect();

    if maximizing {
        scored.sort_by(|a, b| b.1.cmp(&a.1));
    } else {
        scored.sort_by(|a, b| a.1.cmp(&b.1));
    }

    scored.into_iter().take(k).map(|(mv, _)| mv).collect()
}

/// Alpha-beta minimax. The maximizing side is White, read off the
/// position's own side to move at each node.
fn minimax(position: &Chess, depth: u8, mut alpha: i32, mut beta: i32) -> i32 {
    if depth == 0 || position.is_game_over() {
        return evaluate(position);
    }

    let moves = position.legal_moves();

    if position.turn() == Color::White {
        let mut best = i32::MIN;
        for mv in &moves {
            let child = match position.clone().play(mv) {
                Ok(child) => child,
                Err(_) => continue,
            };
            let value = minimax(&child, depth - 1, alpha, beta);
            best = best.max(value);
            alpha = alpha.max(value);
            if beta <= alpha {
                break;
            }
        }
        best
    } else {
        let mut best = i32::MAX;
        for mv in &moves {
            let child = match position.clone().play(mv) {
                Ok(child) => child,
                Err(_) => continue,
            };
            let value = minimax(&child, depth - 1, alpha, beta);
            best = best.min(value);
            beta = beta.min(value);
            if beta <= alpha {
                break;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::uci::UciMove;

    fn play(pos: Chess, moves: &[&str]) -> Chess {
        moves.iter().fold(pos, |pos, s| {
            let mv = s.parse::<UciMove>().unwrap().to_move(&pos).unwrap();
            pos.play(&mv).unwrap()
        })
    }

    fn uci(mv: &Move) -> String {
        mv.to_uci(shakmaty::CastlingMode::Standard).to_string()
    }

    #[test]
    fn test_best_move_is_deterministic_and_legal() {
        let pos = play(Chess::default(), &["e2e4", "e7e5"]);

        let first = best_move(&pos, 2).expect("position has moves");
        let second = best_move(&pos, 2).expect("position has moves");
        assert_eq!(first, second, "search must have no hidden randomness");
        assert!(pos.legal_moves().contains(&first));
    }

    #[test]
    fn test_best_move_takes_the_free_pawn() {
        // 1. e4 d5: taking on d5 wins a clean pawn at depth 1.
        let pos = play(Chess::default(), &["e2e4", "d7d5"]);
        let best = best_move(&pos, 1).unwrap();
        assert_eq!(uci(&best), "e4d5");
    }

    #[test]
    fn test_black_finds_mate_in_one() {
        // Fool's Mate one ply early; Black to move mates with Qh4#.
        let pos = play(Chess::default(), &["f2f3", "e7e5", "g2g4"]);
        let best = best_move(&pos, 1).unwrap();
        assert_eq!(uci(&best), "d8h4");
    }

    #[test]
    fn test_terminal_position_has_no_best_move() {
        let pos = play(Chess::default(), &["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert!(best_move(&pos, 2).is_none());
        assert!(top_moves(&pos, 2, 3).is_empty());
    }

    #[test]
    fn test_top_moves_returns_best_first() {
        let pos = play(Chess::default(), &["e2e4", "d7d5"]);
        let top = top_moves(&pos, 1, 3);

        assert_eq!(top.len(), 3);
        assert_eq!(uci(&top[0]), "e4d5", "capture should lead the list");
        for mv in &top {
            assert!(pos.legal_moves().contains(mv));
        }
    }

    #[test]
    fn test_top_moves_k_larger_than_move_count() {
        let pos = Chess::default();
        let top = top_moves(&pos, 1, 100);
        assert_eq!(top.len(), 20);
    }
}
