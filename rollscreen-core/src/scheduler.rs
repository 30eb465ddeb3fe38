//! Per-frame diagnostic counters.
//!
//! Frames and collaborator zero-time calls are counted over one-second
//! windows. Counting runs every frame whether or not the player is playing.

use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(1);

/// Rates published at the end of a counting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    pub fps: u32,
    pub zero_call_rate: u32,
}

#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    window_start: Option<Instant>,
    frames_in_window: u32,
    total_frames: u64,
    last: Option<FrameStats>,
}

impl FrameScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a frame. When a one-second window has elapsed, returns the rates
    /// for it; `zero_calls` is only consulted then, and should drain the
    /// collaborator's counter.
    pub fn tick(&mut self, now: Instant, zero_calls: impl FnOnce() -> u32) -> Option<FrameStats> {
        self.frames_in_window += 1;
        self.total_frames += 1;

        let start = *self.window_start.get_or_insert(now);
        let elapsed = now.saturating_duration_since(start);
        if elapsed < WINDOW {
            return None;
        }

        let stats = FrameStats {
            fps: self.frames_in_window,
            zero_call_rate: zero_calls(),
        };
        self.frames_in_window = 0;
        // Keep windows aligned to whole seconds unless we fell far behind
        self.window_start = Some(if elapsed >= WINDOW * 2 {
            now
        } else {
            start + WINDOW
        });
        self.last = Some(stats);
        Some(stats)
    }

    /// Rates from the most recent completed window.
    #[must_use]
    pub const fn last_stats(&self) -> Option<FrameStats> {
        self.last
    }

    #[must_use]
    pub const fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
