//! Game session orchestration
//!
//! [`GameSession`] is the authoritative state machine for one game: it
//! owns turn alternation, dispatches human move attempts against the
//! rules engine, runs opponent turns through the policy, detects game
//! end, and reports every transition to registered observers.
//!
//! # State flow
//!
//! ```text
//! Setup → AwaitingHumanMove ⇄ AwaitingOpponentMove → GameOver
//!              (PieceSelected nested via Selection)
//! ```
//!
//! # Concurrency model
//!
//! Single logical thread of control with cooperative suspension. The
//! opponent turn is the only operation that suspends: it is spawned as a
//! tokio task tagged with the session's uuid, then joined. While it is
//! outstanding the session is in `AwaitingOpponentMove` and human input
//! is ignored (no-ops, never queued). Starting a new game aborts the
//! task and rotates the uuid, so a stale result can never mutate the new
//! game's position.

use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::policy::{MoveSource, OpponentPolicy};
use crate::rules::{RulesEngine, TerminalStatus};
use shakmaty::{Color, Move, Role, Square};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Top-level session states. `PieceSelected` from the design is the
/// nested condition `state == AwaitingHumanMove && selection.is_selected()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No game running; `start_game` begins one
    Setup,
    /// The human may select a piece or move
    AwaitingHumanMove,
    /// The opponent owes a move; human input is ignored
    AwaitingOpponentMove,
    /// Terminal position reached; undo can resume
    GameOver,
}

/// Transient UI-facing selection state. Never carried across a position
/// mutation: any successful move, deselect or new selection replaces it.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    selected: Option<Square>,
    moves: Vec<Move>,
}

impl Selection {
    pub fn clear(&mut self) {
        self.selected = None;
        self.moves.clear();
    }

    pub fn is_selected(&self) -> bool {
        self.selected.is_some()
    }

    pub fn selected(&self) -> Option<Square> {
        self.selected
    }

    /// Legal destination squares for the selected piece
    pub fn destinations(&self) -> Vec<Square> {
        self.moves.iter().map(|m| m.to()).collect()
    }
}

/// Severity/kind of a status message, for presentation styling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Thinking,
    Check,
    GameOver,
    Error,
}

/// Presentation contract: the callbacks a UI layer observes. All methods
/// default to no-ops so observers implement only what they render.
#[allow(unused_variables)]
pub trait GameObserver: Send {
    fn on_position_changed(&mut self, fen: &str) {}
    fn on_status_changed(&mut self, message: &str, kind: StatusKind) {}
    fn on_selection_changed(&mut self, selected: Option<Square>, destinations: &[Square]) {}
    fn on_history_changed(&mut self, history: &[String]) {}
    fn on_game_over(&mut self, status: TerminalStatus) {}
}

/// What a square interaction did
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// A piece was selected (or the selection moved to another piece)
    Selected,
    /// The selected piece was clicked again and deselected
    Deselected,
    /// A human move was applied
    Moved(Move),
    /// Nothing changed (empty square, opponent piece, wrong state, ...)
    Ignored,
}

/// Result of resolving an opponent turn
#[derive(Debug, Clone, PartialEq)]
pub enum OpponentOutcome {
    /// The opponent's move was applied
    Moved(Move),
    /// The result belonged to a previous game and was dropped
    Stale,
}

struct PendingOpponentMove {
    session: Uuid,
    handle: JoinHandle<GameResult<(Move, MoveSource)>>,
}

/// The authoritative state machine for one human-vs-opponent game
pub struct GameSession<R: RulesEngine> {
    rules: R,
    policy: OpponentPolicy,
    config: GameConfig,
    state: SessionState,
    selection: Selection,
    status: TerminalStatus,
    session_id: Uuid,
    pending: Option<PendingOpponentMove>,
    observers: Vec<Box<dyn GameObserver>>,
}

impl<R: RulesEngine> GameSession<R> {
    pub fn new(rules: R, policy: OpponentPolicy) -> Self {
        Self {
            rules,
            policy,
            config: GameConfig::default(),
            state: SessionState::Setup,
            selection: Selection::default(),
            status: TerminalStatus::InProgress,
            session_id: Uuid::new_v4(),
            pending: None,
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn GameObserver>) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn terminal_status(&self) -> TerminalStatus {
        self.status
    }

    /// The nested sub-state of `AwaitingHumanMove`
    pub fn piece_selected(&self) -> bool {
        self.state == SessionState::AwaitingHumanMove && self.selection.is_selected()
    }

    /// True when the opponent owes a move and no task is running yet
    pub fn needs_opponent_move(&self) -> bool {
        self.state == SessionState::AwaitingOpponentMove && self.pending.is_none()
    }

    /// True while an opponent-move task is outstanding
    pub fn opponent_thinking(&self) -> bool {
        self.pending.is_some()
    }

    /// Start a fresh game. Fails with `InvalidConfig` before touching any
    /// state, so a rejected configuration never leaves a half-initialized
    /// game behind.
    ///
    /// When the human plays Black the session lands in
    /// `AwaitingOpponentMove`; drive it with [`Self::play_opponent_turn`].
    pub fn start_game(&mut self, config: GameConfig) -> GameResult<()> {
        config.validate()?;

        self.cancel_pending();
        self.session_id = Uuid::new_v4();
        self.rules.reset();
        self.selection.clear();
        self.status = TerminalStatus::InProgress;
        self.config = config;

        self.state = if self.rules.side_to_move() == config.human_color {
            SessionState::AwaitingHumanMove
        } else {
            SessionState::AwaitingOpponentMove
        };

        info!(
            "[GAME] new game: human plays {:?}, opponent rating {}",
            config.human_color, config.opponent_strength
        );

        self.notify_position();
        self.notify_history();
        self.notify_selection();
        self.push_turn_status();
        Ok(())
    }

    /// Select the piece on `square`. No-ops (selection untouched) when it
    /// is not the human's turn, the square is empty or holds an opponent
    /// piece, or the piece has no legal moves.
    pub fn select_square(&mut self, square: Square) -> ClickOutcome {
        if self.state != SessionState::AwaitingHumanMove {
            debug!("[GAME] selection ignored in state {:?}", self.state);
            return ClickOutcome::Ignored;
        }

        let Some(piece) = self.rules.piece_at(square) else {
            return ClickOutcome::Ignored;
        };
        if piece.color != self.config.human_color {
            return ClickOutcome::Ignored;
        }

        let moves = self.rules.legal_moves_from(square);
        if moves.is_empty() {
            return ClickOutcome::Ignored;
        }

        self.selection = Selection {
            selected: Some(square),
            moves,
        };
        self.notify_selection();
        ClickOutcome::Selected
    }

    /// Try to move the selected piece to `target`.
    ///
    /// Clicking the selected square again deselects. A target outside the
    /// legal destinations falls back to re-selection instead of failing.
    /// Promotions always promote to queen; there is no underpromotion
    /// surface.
    pub fn attempt_move(&mut self, target: Square) -> ClickOutcome {
        if self.state != SessionState::AwaitingHumanMove {
            return ClickOutcome::Ignored;
        }
        let Some(selected) = self.selection.selected else {
            return ClickOutcome::Ignored;
        };

        if target == selected {
            self.selection.clear();
            self.notify_selection();
            return ClickOutcome::Deselected;
        }

        let candidate = self
            .selection
            .moves
            .iter()
            .filter(|m| m.to() == target)
            .find(|m| m.promotion().is_none() || m.promotion() == Some(Role::Queen))
            .cloned();

        let Some(mv) = candidate else {
            // Re-selection fallback: treat the click as a new selection.
            self.selection.clear();
            self.notify_selection();
            return self.select_square(target);
        };

        if self.rules.apply(&mv).is_none() {
            // The selection held a move the rules now reject; selection
            // state went stale, which start_game/undo should prevent.
            error!("[GAME] selected move rejected by rules engine");
            self.selection.clear();
            self.notify_selection();
            return ClickOutcome::Ignored;
        }

        self.selection.clear();
        self.after_applied_ply();

        if self.status.is_over() {
            self.finish_game();
        } else {
            self.state = SessionState::AwaitingOpponentMove;
            self.push_turn_status();
        }

        ClickOutcome::Moved(mv)
    }

    /// Square-click dispatcher matching the UI's single entry point:
    /// select when nothing is selected, otherwise attempt the move.
    pub fn click_square(&mut self, square: Square) -> ClickOutcome {
        if self.state != SessionState::AwaitingHumanMove {
            return ClickOutcome::Ignored;
        }
        if self.selection.is_selected() {
            self.attempt_move(square)
        } else {
            self.select_square(square)
        }
    }

    /// Spawn the opponent-move task for the current position.
    ///
    /// Must be called inside a tokio runtime. The task works on a FEN
    /// snapshot and a forked policy, so it never touches the session's
    /// rules engine while running.
    pub fn begin_opponent_turn(&mut self) -> GameResult<()> {
        if self.state != SessionState::AwaitingOpponentMove {
            return Err(GameError::InvariantViolation {
                message: format!("opponent turn requested in state {:?}", self.state),
            });
        }
        if self.pending.is_some() {
            return Err(GameError::InvariantViolation {
                message: "opponent turn already outstanding".to_string(),
            });
        }

        let fen = self.rules.position_fen();
        let rating = self.config.opponent_strength;
        let mut policy = self.policy.fork();
        let session = self.session_id;

        debug!("[AI] spawning opponent move task for session {}", session);
        let handle =
            tokio::spawn(async move { policy.select_move(&fen, rating).await });

        self.pending = Some(PendingOpponentMove { session, handle });
        self.push_status("Opponent is thinking...", StatusKind::Thinking);
        Ok(())
    }

    /// Join the outstanding opponent-move task and apply its move.
    ///
    /// Results tagged with a previous game's uuid are dropped as
    /// [`OpponentOutcome::Stale`]. On failure the session stays in
    /// `AwaitingOpponentMove` with no pending task — position and history
    /// are untouched, and the caller may retry the opponent turn or undo.
    pub async fn resolve_opponent_move(&mut self) -> GameResult<OpponentOutcome> {
        let Some(pending) = self.pending.take() else {
            return Err(GameError::InvariantViolation {
                message: "no opponent move outstanding".to_string(),
            });
        };

        let joined = pending.handle.await;

        if pending.session != self.session_id {
            info!("[AI] dropping opponent move from a previous session");
            return Ok(OpponentOutcome::Stale);
        }

        let selected = match joined {
            Ok(result) => result,
            Err(join_err) => {
                if join_err.is_cancelled() {
                    return Ok(OpponentOutcome::Stale);
                }
                self.push_status("Opponent move failed", StatusKind::Error);
                return Err(GameError::OpponentTaskFailed {
                    message: join_err.to_string(),
                });
            }
        };

        let (mv, source) = match selected {
            Ok(chosen) => chosen,
            Err(err) => {
                warn!("[AI] opponent could not produce a move: {err}");
                self.push_status("Opponent move failed", StatusKind::Error);
                return Err(err);
            }
        };

        if self.rules.apply(&mv).is_none() {
            // The policy validated against the same FEN; a mismatch here
            // means the position changed underneath an outstanding turn.
            error!("[AI] opponent move is illegal against the session position");
            self.push_status("Opponent move failed", StatusKind::Error);
            return Err(GameError::InvariantViolation {
                message: "opponent move does not match session position".to_string(),
            });
        }

        info!("[AI] opponent moved via {:?}", source);
        self.after_applied_ply();

        if self.status.is_over() {
            self.finish_game();
        } else {
            self.state = SessionState::AwaitingHumanMove;
            self.push_turn_status();
        }

        Ok(OpponentOutcome::Moved(mv))
    }

    /// Run a full opponent turn: spawn if needed, then resolve.
    pub async fn play_opponent_turn(&mut self) -> GameResult<OpponentOutcome> {
        if self.pending.is_none() {
            self.begin_opponent_turn()?;
        }
        self.resolve_opponent_move().await
    }

    /// Undo the most recent move(s), returning control to the human.
    ///
    /// Removes one ply when the human's own move is the dangling one,
    /// otherwise two (the opponent's reply plus the preceding human
    /// move). Valid in `AwaitingHumanMove`, in `GameOver` (resuming the
    /// game), and after a failed opponent turn. Returns the number of
    /// plies undone; 0 means nothing changed.
    pub fn undo_last_move(&mut self) -> usize {
        let failed_opponent_turn =
            self.state == SessionState::AwaitingOpponentMove && self.pending.is_none();
        let undoable = matches!(
            self.state,
            SessionState::AwaitingHumanMove | SessionState::GameOver
        ) || failed_opponent_turn;

        if !undoable {
            warn!("[GAME] undo ignored in state {:?}", self.state);
            return 0;
        }
        if self.rules.ply_count() == 0 {
            return 0;
        }

        let mut undone = 0;
        if self.rules.undo() {
            undone += 1;
        }
        // Unwind the opponent's ply too, so control returns to the human.
        if self.rules.side_to_move() != self.config.human_color
            && self.rules.ply_count() > 0
            && self.rules.undo()
        {
            undone += 1;
        }

        self.selection.clear();
        self.status = self.rules.terminal_status();
        self.state = if self.rules.side_to_move() == self.config.human_color {
            SessionState::AwaitingHumanMove
        } else {
            SessionState::AwaitingOpponentMove
        };

        info!("[GAME] undid {} ply(ies)", undone);
        self.notify_position();
        self.notify_history();
        self.notify_selection();
        self.push_turn_status();
        undone
    }

    /// Abandon the current game and return to `Setup`, discarding all
    /// state. Any outstanding opponent task is aborted and its eventual
    /// result can never touch the next game.
    pub fn new_game(&mut self) {
        self.cancel_pending();
        self.session_id = Uuid::new_v4();
        self.rules.reset();
        self.selection.clear();
        self.status = TerminalStatus::InProgress;
        self.state = SessionState::Setup;

        info!("[GAME] returned to setup");
        self.notify_position();
        self.notify_history();
        self.notify_selection();
    }

    /// Resign the current game and return to `Setup`
    pub fn resign(&mut self) {
        self.push_status("You resigned", StatusKind::GameOver);
        self.new_game();
    }

    /// History split into display pairs: (move number, white SAN,
    /// optional black SAN)
    pub fn move_pairs(&self) -> Vec<(usize, String, Option<String>)> {
        self.rules
            .history_san()
            .chunks(2)
            .enumerate()
            .map(|(i, chunk)| {
                (
                    i + 1,
                    chunk.first().cloned().unwrap_or_default(),
                    chunk.get(1).cloned(),
                )
            })
            .collect()
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!("[AI] aborting outstanding opponent task");
            pending.handle.abort();
        }
    }

    /// Bookkeeping common to every applied ply
    fn after_applied_ply(&mut self) {
        self.status = self.rules.terminal_status();
        self.notify_position();
        self.notify_history();
        self.notify_selection();

        debug_assert_eq!(
            self.rules.ply_count() % 2 == 0,
            self.rules.side_to_move() == Color::White,
            "history parity must match the side to move"
        );
    }

    fn finish_game(&mut self) {
        self.state = SessionState::GameOver;
        let status = self.status;
        for observer in &mut self.observers {
            observer.on_game_over(status);
        }
        self.push_turn_status();
    }

    fn push_turn_status(&mut self) {
        let human_turn = self.state == SessionState::AwaitingHumanMove;
        let (message, kind) = match self.status {
            TerminalStatus::Checkmate(winner) => (
                format!(
                    "Checkmate! {} wins",
                    if winner == Color::White { "White" } else { "Black" }
                ),
                StatusKind::GameOver,
            ),
            TerminalStatus::Stalemate | TerminalStatus::Draw => {
                ("Game drawn".to_string(), StatusKind::GameOver)
            }
            TerminalStatus::InProgress if self.rules.is_check() => (
                format!(
                    "{} king is in check",
                    if human_turn { "Your" } else { "Opponent's" }
                ),
                StatusKind::Check,
            ),
            TerminalStatus::InProgress => (
                if human_turn {
                    "Your turn".to_string()
                } else {
                    "Opponent's turn".to_string()
                },
                StatusKind::Info,
            ),
        };
        self.push_status(&message, kind);
    }

    fn push_status(&mut self, message: &str, kind: StatusKind) {
        for observer in &mut self.observers {
            observer.on_status_changed(message, kind);
        }
    }

    fn notify_position(&mut self) {
        let fen = self.rules.position_fen();
        for observer in &mut self.observers {
            observer.on_position_changed(&fen);
        }
    }

    fn notify_history(&mut self) {
        let history = self.rules.history_san().to_vec();
        for observer in &mut self.observers {
            observer.on_history_changed(&history);
        }
    }

    fn notify_selection(&mut self) {
        let selected = self.selection.selected;
        let destinations = self.selection.destinations();
        for observer in &mut self.observers {
            observer.on_selection_changed(selected, &destinations);
        }
    }
}

impl<R: RulesEngine> Drop for GameSession<R> {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
