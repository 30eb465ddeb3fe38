//! The game collaborator the screen renders: player clock, roll and scoring.

use crate::chart::ChartItem;
use crate::results::Scorebook;
use serde::{Deserialize, Serialize};
use std::fmt;

/// State reported by the media player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    #[default]
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl PlayerState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unstarted => "unstarted",
            Self::Ended => "ended",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Buffering => "buffering",
            Self::Cued => "cued",
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key press routed to the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Enter,
    Escape,
    Char(char),
}

/// Player clock, roll and scoring, owned by the game and read by the screen.
///
/// Times are in whatever unit the roll uses; the screen only ever subtracts
/// them and scales by the configured speed. Implementations should:
///
/// - Keep `now` monotonic while playing
/// - Mutate note state and remaining text in the roll as the player types
/// - Report judgements, lyric changes and game end as
///   [`ScreenEvent`](crate::ScreenEvent)s to whoever drives the screen
pub trait Playback {
    /// Current playback time.
    fn now(&self) -> f64;

    /// Playback time that maps to the start of the roll.
    fn zero_time(&self) -> f64;

    fn set_zero_time(&mut self, zero_time: f64);

    /// The loaded roll, in index order.
    fn roll(&self) -> &[ChartItem];

    fn player_state(&self) -> PlayerState;

    fn score(&self) -> u64;

    fn max_combo(&self) -> u32;

    fn scorebook(&self) -> &Scorebook;

    /// Start playback.
    fn play(&mut self);

    /// Forward a typed character to the scorer.
    fn hit(&mut self, key: char);

    /// Stop playback and return the roll and scoring to their initial state.
    fn reset(&mut self);

    /// Characters typed but not yet matched.
    fn input_buffer(&self) -> &str {
        ""
    }

    /// Zero time as measured from the player, for diagnostics.
    fn estimated_zero(&self) -> f64 {
        self.zero_time()
    }

    /// Number of zero-time measurements since the last call.
    fn take_zero_calls(&mut self) -> u32 {
        0
    }

    /// Kana reading of the note being typed.
    fn kana_lyric(&self) -> Option<&str> {
        None
    }

    /// Lyric line already under way when resources become ready, e.g. after
    /// a seek. Later lines arrive as [`crate::ScreenEvent::LyricChange`].
    fn current_lyric(&self) -> Option<&str> {
        None
    }

    fn next_lyric(&self) -> Option<&str> {
        None
    }

    /// Called once per frame before the screen reads anything.
    fn sync(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_state_serde_names() {
        let json = serde_json::to_string(&PlayerState::Buffering).unwrap();
        assert_eq!(json, "\"buffering\"");
        let state: PlayerState = serde_json::from_str("\"playing\"").unwrap();
        assert_eq!(state, PlayerState::Playing);
        assert_eq!(PlayerState::default().to_string(), "unstarted");
    }
}
