//! Core Engine Integration Tests
//!
//! Tests for the rules engine, evaluation and search working together:
//! - Legal move generation and special moves (castling, en passant)
//! - History and undo across real games
//! - Search picking up tactics the evaluation exposes
//! - Strength tiers behaving monotonically

use kibitz::search::{best_move, top_moves};
use kibitz::{skill_tier, MoveSource, OpponentPolicy, RulesEngine, ShakmatyRules, TerminalStatus};
use shakmaty::{CastlingMode, Color, Position};

fn uci(mv: &shakmaty::Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

// ============================================================================
// Rules Engine Tests
// ============================================================================

#[test]
fn test_starting_position_basics() {
    let rules = ShakmatyRules::new();

    assert_eq!(rules.legal_moves().len(), 20, "White has 20 opening moves");
    assert_eq!(rules.side_to_move(), Color::White);
    assert_eq!(rules.ply_count(), 0);
    assert!(!rules.is_game_over());
}

#[test]
fn test_castling_is_recorded_in_san() {
    let mut rules = ShakmatyRules::new();
    for mv in ["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "f8c5", "e1g1"] {
        assert!(rules.apply_uci(mv).is_some(), "move {mv} should be legal");
    }
    assert_eq!(rules.history_san().last().map(String::as_str), Some("O-O"));
}

#[test]
fn test_en_passant_capture() {
    let mut rules = ShakmatyRules::new();
    for mv in ["e2e4", "a7a6", "e4e5", "d7d5"] {
        rules.apply_uci(mv);
    }

    let captured = rules.apply_uci("e5d6");
    assert!(captured.is_some(), "en passant must be offered");
    assert_eq!(rules.history_san().last().map(String::as_str), Some("exd6"));
}

#[test]
fn test_undo_walks_back_through_a_game() {
    let mut rules = ShakmatyRules::new();
    let opening = ["e2e4", "c7c5", "g1f3", "d7d6", "d2d4", "c5d4"];
    for mv in opening {
        rules.apply_uci(mv);
    }
    assert_eq!(rules.ply_count(), 6);

    for expected_plies in (0..6).rev() {
        assert!(rules.undo());
        assert_eq!(rules.ply_count(), expected_plies);
    }
    assert_eq!(
        rules.position_fen(),
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
    );
}

#[test]
fn test_terminal_status_after_fools_mate() {
    let mut rules = ShakmatyRules::new();
    for mv in ["f2f3", "e7e5", "g2g4", "d8h4"] {
        rules.apply_uci(mv);
    }

    let status = rules.terminal_status();
    assert_eq!(status, TerminalStatus::Checkmate(Color::Black));
    assert!(status.is_over());
    assert!(!status.is_draw());
    assert_eq!(status.winner(), Some(Color::Black));
}

// ============================================================================
// Search Tactics Tests
// ============================================================================

/// Black queen on g5, en prise to the f3 knight with no defender.
const HANGING_QUEEN_FEN: &str = "rnb1kbnr/pppp1ppp/8/4p1q1/8/5N2/PPPPPPPP/RNBQKB1R w KQkq - 2 3";

#[test]
fn test_search_wins_the_hanging_queen() {
    let position = ShakmatyRules::position_from_fen(HANGING_QUEEN_FEN).unwrap();
    let best = best_move(&position, 2).expect("moves exist");
    assert_eq!(
        uci(&best),
        "f3g5",
        "depth-2 search must capture the undefended queen"
    );
}

#[test]
fn test_top_moves_agrees_with_best_move() {
    let position = ShakmatyRules::position_from_fen(HANGING_QUEEN_FEN).unwrap();
    let best = best_move(&position, 2).unwrap();
    let top = top_moves(&position, 2, 3);
    assert_eq!(top.first(), Some(&best), "rankings must share a winner");
}

// ============================================================================
// Strength Tier Tests
// ============================================================================

#[test]
fn test_tier_mapping_covers_supported_range() {
    assert_eq!(skill_tier(kibitz::RATING_MIN), 0);
    assert_eq!(skill_tier(kibitz::RATING_MAX), 10);

    // Tiers never decrease as the rating climbs.
    let mut previous = 0;
    for rating in (800..=3000).step_by(50) {
        let tier = skill_tier(rating);
        assert!(tier >= previous, "tier dropped at rating {rating}");
        previous = tier;
    }
}

/// Statistical and deliberately tolerant: the top tier must punish the
/// hanging queen every time, while the bottom tier shows real variety.
#[tokio::test]
async fn test_tiers_are_monotonic_on_a_hanging_queen() {
    let mut strong_captures = 0;
    let mut weak_captures = 0;
    let mut weak_choices = std::collections::HashSet::new();

    for seed in 0..20 {
        let mut strong = OpponentPolicy::seeded(seed);
        let (mv, source) = strong.select_move(HANGING_QUEEN_FEN, 3000).await.unwrap();
        assert_eq!(source, MoveSource::LocalSearch);
        if uci(&mv) == "f3g5" {
            strong_captures += 1;
        }

        let mut weak = OpponentPolicy::seeded(seed);
        let (mv, _) = weak.select_move(HANGING_QUEEN_FEN, 800).await.unwrap();
        if uci(&mv) == "f3g5" {
            weak_captures += 1;
        }
        weak_choices.insert(uci(&mv));
    }

    assert_eq!(strong_captures, 20, "tier 10 is deterministic full search");
    assert!(
        strong_captures >= weak_captures,
        "higher tier must not capture less often than the lowest"
    );
    assert!(
        weak_choices.len() >= 2,
        "tier 0 must actually vary across seeds"
    );
}

#[tokio::test]
async fn test_every_tier_moves_legally_mid_game() {
    let mut rules = ShakmatyRules::new();
    for mv in ["e2e4", "c7c5", "g1f3", "d7d6"] {
        rules.apply_uci(mv);
    }
    let fen = rules.position_fen();
    let position = ShakmatyRules::position_from_fen(&fen).unwrap();

    for rating in [800, 1000, 1300, 1600, 1800, 2000, 2200, 2400, 2600, 3000] {
        let mut policy = OpponentPolicy::seeded(9);
        let (mv, _) = policy.select_move(&fen, rating).await.unwrap();
        assert!(
            position.legal_moves().contains(&mv),
            "rating {rating} produced an illegal move"
        );
    }
}
