//! External strong-engine service client
//!
//! The opponent policy prefers delegating to a remote engine service when
//! one is configured. The wire contract mirrors the companion service:
//! `POST /api/move` with `{fen, elo, depth}` answering `{move}` in
//! coordinate or algebraic form, and `POST /api/chat` with
//! `{message, fen}` answering `{response}`.
//!
//! Every failure here is recoverable by design: transport errors, bad
//! statuses and malformed moves all surface as [`RemoteEngineError`] and
//! the policy falls back to local search instead of stalling the game.
//! The HTTP client carries a request timeout for the same reason — an
//! unbounded stall would leave the orchestrator unable to start a new
//! game cleanly.

use crate::error::RemoteEngineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default per-request timeout before the policy falls back locally
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

/// Search depth handed to the remote engine for a given strength rating.
///
/// Remote depths run well past the local search (5-15 ply) since the
/// service is expected to be a real engine.
pub fn depth_for_rating(rating: u32) -> u8 {
    match rating {
        0..=1199 => 5,
        1200..=1599 => 8,
        1600..=1999 => 10,
        2000..=2399 => 12,
        _ => 15,
    }
}

/// Async seam to a strong-engine service.
///
/// Implemented over HTTP by [`HttpEngineClient`]; tests substitute
/// scripted or failing implementations.
#[async_trait]
pub trait RemoteEngine: Send + Sync {
    /// Best move for `fen` at the given strength, as a move string
    /// (coordinate `e2e4` form preferred, SAN accepted)
    async fn best_move(
        &self,
        fen: &str,
        rating: u32,
        depth: u8,
    ) -> Result<String, RemoteEngineError>;

    /// Free-form chess commentary for a chat message in the context of
    /// the current position
    async fn chat(&self, message: &str, fen: &str) -> Result<String, RemoteEngineError>;
}

#[derive(Debug, Serialize)]
struct MoveRequest<'a> {
    fen: &'a str,
    elo: u32,
    depth: u8,
}

#[derive(Debug, Deserialize)]
struct MoveResponse {
    #[serde(rename = "move")]
    mv: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    fen: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: Option<String>,
}

/// reqwest-backed [`RemoteEngine`]
#[derive(Debug, Clone)]
pub struct HttpEngineClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEngineClient {
    /// Build a client for a service base URL (e.g. `http://localhost:5100`)
    /// with the default request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, RemoteEngineError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RemoteEngineError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl RemoteEngine for HttpEngineClient {
    async fn best_move(
        &self,
        fen: &str,
        rating: u32,
        depth: u8,
    ) -> Result<String, RemoteEngineError> {
        let request = MoveRequest { fen, elo: rating, depth };
        debug!("[REMOTE] requesting move for rating {} depth {}", rating, depth);

        let response = self
            .client
            .post(self.endpoint("/api/move"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("[REMOTE] engine service answered {}", status);
            return Err(RemoteEngineError::BadStatus {
                status: status.as_u16(),
            });
        }

        let body: MoveResponse = response.json().await?;
        body.mv.ok_or(RemoteEngineError::MissingMove)
    }

    async fn chat(&self, message: &str, fen: &str) -> Result<String, RemoteEngineError> {
        let request = ChatRequest { message, fen };

        let response = self
            .client
            .post(self.endpoint("/api/chat"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteEngineError::BadStatus {
                status: status.as_u16(),
            });
        }

        let body: ChatResponse = response.json().await?;
        body.response.ok_or(RemoteEngineError::MissingMove)
    }
}
