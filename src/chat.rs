//! Chat commentary for the side panel
//!
//! Presentation-adjacent and outside the core correctness contract: a
//! keyword-keyed canned-response table, made mildly contextual by the
//! current position (side to move, game phase, a suggested legal move).
//! When a remote service is configured its reply is preferred; on any
//! failure the local table answers instead, so the panel always says
//! something.

use crate::remote::RemoteEngine;
use crate::rules::ShakmatyRules;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use shakmaty::san::SanPlus;
use shakmaty::{Chess, Color, Position, Role};
use std::sync::Arc;
use tracing::debug;

/// Coarse game phase inferred from ply count and remaining major pieces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

impl GamePhase {
    pub fn name(self) -> &'static str {
        match self {
            GamePhase::Opening => "opening",
            GamePhase::Middlegame => "middlegame",
            GamePhase::Endgame => "endgame",
        }
    }
}

/// Infer the phase: fewer than ten plies is the opening; four or fewer
/// queens-plus-rooks on the board is the endgame; middlegame otherwise.
pub fn game_phase(position: &Chess, ply_count: usize) -> GamePhase {
    if ply_count < 10 {
        return GamePhase::Opening;
    }
    let board = position.board();
    let majors = (board.by_role(Role::Queen) | board.by_role(Role::Rook)).count();
    if majors <= 4 {
        GamePhase::Endgame
    } else {
        GamePhase::Middlegame
    }
}

const GENERAL_RESPONSES: &[&str] = &[
    "That's an interesting question! Chess is all about pattern recognition and planning.",
    "Great question! Remember the key principles: development, center control, and king safety.",
    "Chess is a beautiful game of strategy and tactics. What specific aspect interests you?",
    "Every position tells a story. What would you like to know about this position?",
    "Chess improvement comes from understanding patterns and practicing regularly!",
];

const HELP_RESPONSES: &[&str] = &[
    "I can help analyze positions, suggest moves, and explain chess concepts!",
    "Ask me about strategy, tactics, or specific positions you'd like to understand.",
    "I'm here to help with opening principles, middlegame tactics, and endgame technique!",
];

const OPENING_ADVICE: &[&str] = &[
    "In the opening, focus on controlling the center, developing pieces, and castling for king safety.",
    "Key opening principles: develop knights before bishops, castle early, and control central squares.",
    "Good opening moves prioritize piece development and center control over material gain.",
];

const MIDDLEGAME_ADVICE: &[&str] = &[
    "In the middlegame, look for tactical opportunities and improve piece coordination.",
    "Focus on piece activity, pawn structure, and king safety. Look for tactical motifs.",
    "The middlegame is about improving piece placement and creating threats.",
];

const ENDGAME_ADVICE: &[&str] = &[
    "In the endgame, king activity becomes crucial. Centralize your king!",
    "Endgame principles: activate your king, push passed pawns, and simplify when ahead.",
    "Focus on king and pawn endgames - they're the foundation of endgame knowledge.",
];

/// Canned/contextual chat responder
pub struct ChatResponder {
    rng: StdRng,
    remote: Option<Arc<dyn RemoteEngine>>,
}

impl Default for ChatResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatResponder {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            remote: None,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            remote: None,
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteEngine>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Answer a chat message in the context of the current position.
    /// `ply_count` drives phase inference.
    pub async fn respond(&mut self, message: &str, fen: &str, ply_count: usize) -> String {
        if let Some(remote) = self.remote.clone() {
            match remote.chat(message, fen).await {
                Ok(reply) => return reply,
                Err(err) => {
                    debug!("[CHAT] remote chat failed ({err}), using local responses");
                }
            }
        }
        self.local_response(message, fen, ply_count)
    }

    /// The canned-response fallback, usable without any service
    pub fn local_response(&mut self, message: &str, fen: &str, ply_count: usize) -> String {
        let message = message.to_lowercase();

        let Some(position) = ShakmatyRules::position_from_fen(fen) else {
            return self.pick(GENERAL_RESPONSES);
        };

        let turn = match position.turn() {
            Color::White => "White",
            Color::Black => "Black",
        };
        let phase = game_phase(&position, ply_count);

        if contains_any(&message, &["position", "analyze", "evaluation"]) {
            return format!(
                "Current position: {turn} to move. We're in the {} phase.",
                phase.name()
            );
        }

        if contains_any(&message, &["strategy", "plan", "what should"]) {
            let advice = match phase {
                GamePhase::Opening => OPENING_ADVICE,
                GamePhase::Middlegame => MIDDLEGAME_ADVICE,
                GamePhase::Endgame => ENDGAME_ADVICE,
            };
            return self.pick(advice);
        }

        if contains_any(&message, &["move", "suggest", "recommend"]) {
            let legal: Vec<_> = position.legal_moves().into_iter().collect();
            if let Some(mv) = legal.choose(&mut self.rng) {
                let san = SanPlus::from_move(position.clone(), mv);
                return format!(
                    "You have {} legal moves. Consider {san}. Always look for checks, captures, and threats!",
                    legal.len()
                );
            }
            return "No legal moves available in this position.".to_string();
        }

        if contains_any(&message, &["help", "learn"]) {
            return self.pick(HELP_RESPONSES);
        }

        self.pick(GENERAL_RESPONSES)
    }

    fn pick(&mut self, table: &[&str]) -> String {
        table
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("Chess is a beautiful game.")
            .to_string()
    }
}

fn contains_any(message: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| message.contains(k))
}
