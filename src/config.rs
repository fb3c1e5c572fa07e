//! Game configuration
//!
//! Set once at game start and immutable for the game's lifetime. The only
//! validation rule is the supported opponent-strength range; everything
//! else is a plain choice.

use crate::error::{GameError, GameResult};
use serde::{Deserialize, Serialize};
use shakmaty::Color;

/// Lowest supported opponent rating
pub const RATING_MIN: u32 = 800;
/// Highest supported opponent rating
pub const RATING_MAX: u32 = 3000;

/// Per-game configuration: which side the human plays and how strong the
/// opponent should be (an Elo-like rating mapped to a skill tier by the
/// opponent policy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(with = "color_as_str")]
    pub human_color: Color,
    pub opponent_strength: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            human_color: Color::White,
            opponent_strength: 1500,
        }
    }
}

impl GameConfig {
    pub fn new(human_color: Color, opponent_strength: u32) -> Self {
        Self {
            human_color,
            opponent_strength,
        }
    }

    /// The color the opponent plays
    pub fn opponent_color(&self) -> Color {
        self.human_color.other()
    }

    /// Reject configurations outside the supported rating range
    pub fn validate(&self) -> GameResult<()> {
        if self.opponent_strength < RATING_MIN || self.opponent_strength > RATING_MAX {
            return Err(GameError::InvalidConfig {
                rating: self.opponent_strength,
            });
        }
        Ok(())
    }
}

/// Serialize `shakmaty::Color` as `"white"` / `"black"`
mod color_as_str {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use shakmaty::Color;

    pub fn serialize<S: Serializer>(color: &Color, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match color {
            Color::White => "white",
            Color::Black => "black",
        })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Color, D::Error> {
        match String::deserialize(deserializer)?.as_str() {
            "white" => Ok(Color::White),
            "black" => Ok(Color::Black),
            other => Err(de::Error::custom(format!("unknown color {other:?}"))),
        }
    }
}
