//! Rules-engine capability interface and its shakmaty-backed implementation
//!
//! The core never reimplements chess rules. Everything rules-related goes
//! through the [`RulesEngine`] trait: legal-move generation, move
//! application, undo, terminal detection and SAN history. Any conformant
//! rules library can sit behind it; [`ShakmatyRules`] is the default
//! implementation over `shakmaty::Chess`.
//!
//! # Undo model
//!
//! [`ShakmatyRules`] keeps a stack of position snapshots, one per applied
//! ply. Undo pops a snapshot and truncates the SAN history, so an
//! apply/undo pair restores the position bit-for-bit (state, history
//! length, side to move).

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Piece, Position, Square};
use tracing::debug;

/// Terminal state of a game, recomputed after every applied move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    /// The game continues
    InProgress,
    /// The named color delivered mate
    Checkmate(Color),
    /// The side to move has no legal moves but is not in check; drawn
    Stalemate,
    /// Drawn by insufficient material or the fifty-move rule
    Draw,
}

impl TerminalStatus {
    /// True for any state that ends the game
    pub fn is_over(self) -> bool {
        self != TerminalStatus::InProgress
    }

    /// True for stalemate and other draws
    pub fn is_draw(self) -> bool {
        matches!(self, TerminalStatus::Stalemate | TerminalStatus::Draw)
    }

    /// The winning color, if the game ended decisively
    pub fn winner(self) -> Option<Color> {
        match self {
            TerminalStatus::Checkmate(winner) => Some(winner),
            _ => None,
        }
    }
}

/// Capability contract for a chess-rules implementation.
///
/// The orchestrator holds the only handle to the engine and is the only
/// caller that mutates it, so implementations do not need interior
/// mutability or locking.
pub trait RulesEngine {
    /// Restore the standard initial position and clear all history
    fn reset(&mut self);

    /// All legal moves for the side to move, in generation order
    fn legal_moves(&self) -> Vec<Move>;

    /// Legal moves whose origin is `from` (empty if the square is empty,
    /// holds an opponent piece, or the piece is pinned into immobility)
    fn legal_moves_from(&self, from: Square) -> Vec<Move>;

    /// Apply a move. Returns the applied move, or `None` if it is not
    /// legal in the current position; an illegal move changes nothing.
    fn apply(&mut self, mv: &Move) -> Option<Move>;

    /// Parse a coordinate-notation move (e.g. `e2e4`, `a7a8q`) and apply
    /// it. `None` if unparseable or illegal.
    fn apply_uci(&mut self, uci: &str) -> Option<Move>;

    /// Revert the most recent ply. Returns false when there is nothing
    /// to undo.
    fn undo(&mut self) -> bool;

    /// Piece occupying `square`, if any
    fn piece_at(&self, square: Square) -> Option<Piece>;

    /// The color whose turn it is
    fn side_to_move(&self) -> Color;

    fn is_check(&self) -> bool;
    fn is_checkmate(&self) -> bool;
    fn is_stalemate(&self) -> bool;

    /// Draw by stalemate, insufficient material, or the fifty-move rule.
    /// Note the fifty-move clock counts here even when the underlying
    /// library treats it as claimable rather than automatic.
    fn is_draw(&self) -> bool;

    /// FEN serialization of the current position; the opaque position id
    /// handed to observers and to the remote engine service
    fn position_fen(&self) -> String;

    /// SAN strings of all applied moves, oldest first
    fn history_san(&self) -> &[String];

    /// Number of applied plies
    fn ply_count(&self) -> usize {
        self.history_san().len()
    }

    fn is_game_over(&self) -> bool {
        self.terminal_status().is_over()
    }

    /// Derive the terminal status from the status queries
    fn terminal_status(&self) -> TerminalStatus {
        if self.is_checkmate() {
            // The mated side is the side to move; the other side wins.
            TerminalStatus::Checkmate(self.side_to_move().other())
        } else if self.is_stalemate() {
            TerminalStatus::Stalemate
        } else if self.is_draw() {
            TerminalStatus::Draw
        } else {
            TerminalStatus::InProgress
        }
    }
}

/// Default rules engine backed by `shakmaty::Chess`
#[derive(Debug, Clone)]
pub struct ShakmatyRules {
    position: Chess,
    /// Snapshot of the position before each applied ply
    undo_stack: Vec<Chess>,
    history: Vec<String>,
}

impl Default for ShakmatyRules {
    fn default() -> Self {
        Self::new()
    }
}

impl ShakmatyRules {
    /// Create an engine at the standard starting position
    pub fn new() -> Self {
        Self {
            position: Chess::default(),
            undo_stack: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Borrow the underlying position (used by evaluation helpers)
    pub fn position(&self) -> &Chess {
        &self.position
    }

    /// Parse a FEN string into a playable position
    pub fn position_from_fen(fen: &str) -> Option<Chess> {
        let setup: Fen = fen.parse().ok()?;
        setup.into_position(CastlingMode::Standard).ok()
    }
}

impl RulesEngine for ShakmatyRules {
    fn reset(&mut self) {
        self.position = Chess::default();
        self.undo_stack.clear();
        self.history.clear();
    }

    fn legal_moves(&self) -> Vec<Move> {
        self.position.legal_moves().into_iter().collect()
    }

    fn legal_moves_from(&self, from: Square) -> Vec<Move> {
        self.position
            .legal_moves()
            .into_iter()
            .filter(|m| m.from() == Some(from))
            .collect()
    }

    fn apply(&mut self, mv: &Move) -> Option<Move> {
        if !self.position.legal_moves().contains(mv) {
            return None;
        }
        let san = SanPlus::from_move(self.position.clone(), mv).to_string();
        let next = match self.position.clone().play(mv) {
            Ok(next) => next,
            // Unreachable for a move out of legal_moves; be safe anyway.
            Err(_) => return None,
        };
        self.undo_stack.push(std::mem::replace(&mut self.position, next));
        debug!("[RULES] applied {} (ply {})", san, self.history.len() + 1);
        self.history.push(san);
        Some(mv.clone())
    }

    fn apply_uci(&mut self, uci: &str) -> Option<Move> {
        let parsed: UciMove = uci.parse().ok()?;
        let mv = parsed.to_move(&self.position).ok()?;
        self.apply(&mv)
    }

    fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(previous) => {
                self.position = previous;
                self.history.pop();
                true
            }
            None => false,
        }
    }

    fn piece_at(&self, square: Square) -> Option<Piece> {
        self.position.board().piece_at(square)
    }

    fn side_to_move(&self) -> Color {
        self.position.turn()
    }

    fn is_check(&self) -> bool {
        self.position.is_check()
    }

    fn is_checkmate(&self) -> bool {
        self.position.is_checkmate()
    }

    fn is_stalemate(&self) -> bool {
        self.position.is_stalemate()
    }

    fn is_draw(&self) -> bool {
        self.position.is_stalemate()
            || self.position.is_insufficient_material()
            || self.position.halfmoves() >= 100
    }

    fn position_fen(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    fn history_san(&self) -> &[String] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn test_starting_position_has_twenty_moves() {
        let rules = ShakmatyRules::new();
        assert_eq!(rules.legal_moves().len(), 20);
        assert_eq!(rules.side_to_move(), Color::White);
        assert_eq!(rules.position_fen(), START_FEN);
    }

    #[test]
    fn test_apply_undo_restores_position_exactly() {
        let mut rules = ShakmatyRules::new();
        let before = rules.position_fen();

        let applied = rules.apply_uci("e2e4");
        assert!(applied.is_some());
        assert_eq!(rules.ply_count(), 1);
        assert_eq!(rules.history_san(), ["e4"]);
        assert_eq!(rules.side_to_move(), Color::Black);

        assert!(rules.undo());
        assert_eq!(rules.position_fen(), before);
        assert_eq!(rules.ply_count(), 0);
        assert_eq!(rules.side_to_move(), Color::White);
    }

    #[test]
    fn test_illegal_move_changes_nothing() {
        let mut rules = ShakmatyRules::new();
        let before = rules.position_fen();

        assert!(rules.apply_uci("e2e5").is_none());
        assert!(rules.apply_uci("nonsense").is_none());
        assert_eq!(rules.position_fen(), before);
        assert_eq!(rules.ply_count(), 0);
    }

    #[test]
    fn test_undo_on_empty_history_is_a_noop() {
        let mut rules = ShakmatyRules::new();
        assert!(!rules.undo());
        assert_eq!(rules.position_fen(), START_FEN);
    }

    #[test]
    fn test_legal_moves_from_square() {
        let rules = ShakmatyRules::new();

        // e2 pawn has the single and double push
        let e2 = Square::E2;
        assert_eq!(rules.legal_moves_from(e2).len(), 2);

        // e4 is empty, e7 holds a black pawn; neither yields moves for White
        assert!(rules.legal_moves_from(Square::E4).is_empty());
        assert!(rules.legal_moves_from(Square::E7).is_empty());
    }

    #[test]
    fn test_fools_mate_is_checkmate_for_black() {
        let mut rules = ShakmatyRules::new();
        for mv in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            assert!(rules.apply_uci(mv).is_some(), "move {mv} should be legal");
        }
        assert!(rules.is_checkmate());
        assert!(rules.is_game_over());
        assert_eq!(rules.terminal_status(), TerminalStatus::Checkmate(Color::Black));
        assert_eq!(rules.side_to_move(), Color::White, "White is the mated side");
    }

    #[test]
    fn test_undo_crosses_terminal_boundary() {
        let mut rules = ShakmatyRules::new();
        for mv in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            rules.apply_uci(mv);
        }
        assert!(rules.terminal_status().is_over());

        assert!(rules.undo());
        assert_eq!(rules.terminal_status(), TerminalStatus::InProgress);
        assert_eq!(rules.ply_count(), 3);
    }

    #[test]
    fn test_fen_roundtrip_through_helper() {
        let mut rules = ShakmatyRules::new();
        rules.apply_uci("e2e4");
        rules.apply_uci("c7c5");

        let fen = rules.position_fen();
        let parsed = ShakmatyRules::position_from_fen(&fen).expect("own FEN must parse");
        assert_eq!(parsed.turn(), rules.side_to_move());
        assert_eq!(parsed.legal_moves().len(), rules.legal_moves().len());
    }
}
