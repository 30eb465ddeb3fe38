//! On-screen score that eases toward the collaborator's score.

/// Fraction of the remaining gap closed each frame.
const APPROACH_RATE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreSmoother {
    display: f64,
}

impl ScoreSmoother {
    #[must_use]
    pub const fn new() -> Self {
        Self { display: 0.0 }
    }

    /// Move halfway toward `target` and return the new displayed value.
    pub fn tick(&mut self, target: f64) -> f64 {
        self.display += (target - self.display) * APPROACH_RATE;
        self.display
    }

    #[must_use]
    pub const fn value(&self) -> f64 {
        self.display
    }

    /// The displayed value as the integer shown on screen.
    #[must_use]
    pub fn text(&self) -> String {
        format!("{:.0}", self.display.round())
    }

    pub fn reset(&mut self) {
        self.display = 0.0;
    }
}
