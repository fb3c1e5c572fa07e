//! Position evaluation heuristic
//!
//! A deliberately small, fast leaf evaluation for the local search:
//! material count, a flat bonus for occupying the four central squares,
//! and a mobility term. Scores are centipawn-ish integers, positive in
//! White's favor by convention.
//!
//! Terminal positions short-circuit: checkmate scores a large magnitude
//! against the side to move (the side *delivering* mate scores well),
//! stalemate and material draws score zero.
//!
//! The function is pure: deterministic and side-effect-free, never
//! mutating the position it scores.

use shakmaty::{Chess, Color, Position, Role, Square};

/// Checkmate magnitude; dominates every material total
pub const MATE_SCORE: i32 = 9_999;

/// Flat bonus per piece sitting on d4/e4/d5/e5
const CENTER_BONUS: i32 = 10;

/// Weight per legal move of the side to move
const MOBILITY_WEIGHT: i32 = 2;

const CENTER_SQUARES: [Square; 4] = [Square::D4, Square::E4, Square::D5, Square::E5];

/// Material value of a piece.
///
/// The king value exists only so terminal-adjacent material sums dominate
/// everything else; material-counting callers never rely on it.
pub fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => 100,
        Role::Knight => 320,
        Role::Bishop => 330,
        Role::Rook => 500,
        Role::Queen => 900,
        Role::King => 20_000,
    }
}

/// Score a position, positive favoring White.
pub fn evaluate(position: &Chess) -> i32 {
    if position.is_checkmate() {
        // The side to move is the side that got mated.
        return match position.turn() {
            Color::White => -MATE_SCORE,
            Color::Black => MATE_SCORE,
        };
    }
    if position.is_stalemate() || position.is_insufficient_material() {
        return 0;
    }

    let board = position.board();
    let mut score = 0;

    for square in Square::ALL {
        if let Some(piece) = board.piece_at(square) {
            let sign = if piece.color == Color::White { 1 } else { -1 };
            score += sign * piece_value(piece.role);
            if CENTER_SQUARES.contains(&square) {
                score += sign * CENTER_BONUS;
            }
        }
    }

    // Mobility for whoever is to move, matching the reference heuristic.
    score + position.legal_moves().len() as i32 * MOBILITY_WEIGHT
}
