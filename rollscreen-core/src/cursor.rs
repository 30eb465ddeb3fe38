//! Mouse cursor auto-hide while the video is playing.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorAutoHide {
    hide_after: Duration,
    playing: bool,
    hide_at: Option<Instant>,
}

impl CursorAutoHide {
    #[must_use]
    pub const fn new(hide_after: Duration) -> Self {
        Self {
            hide_after,
            playing: false,
            hide_at: None,
        }
    }

    /// Arm or disarm auto-hide. Leaving the playing state shows the cursor.
    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
        self.hide_at = None;
    }

    /// A mouse move shows the cursor and restarts the hide timer.
    pub fn mouse_moved(&mut self, now: Instant) {
        if self.playing {
            self.hide_at = Some(now + self.hide_after);
        }
    }

    #[must_use]
    pub fn is_visible(&self, now: Instant) -> bool {
        match self.hide_at {
            Some(hide_at) if self.playing => now < hide_at,
            _ => true,
        }
    }
}
