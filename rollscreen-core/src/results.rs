//! End-of-game breakdown and the light cover that fades in before it.

use crate::color::Color;
use crate::config::JudgeColors;
use crate::scene::{Justification, Point, PrimitiveId, Scene, Shape};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

const LOG_TARGET: &str = "rollscreen::results";

/// Frames for the result cover to go from transparent to opaque.
pub const COVER_FADE_FRAMES: u16 = 100;

/// Results are laid out from this fraction of the canvas width.
const RESULT_LEFT_RATIO: f64 = 0.2;
const HEADING_FONT_SIZE: f64 = 48.0;
const LINE_FONT_SIZE: f64 = 36.0;

/// Judgement categories shown in the result breakdown, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Judge {
    Perfect,
    Great,
    Good,
    Bad,
    Failed,
    Neglect,
}

impl Judge {
    pub const ALL: [Self; 6] = [
        Self::Perfect,
        Self::Great,
        Self::Good,
        Self::Bad,
        Self::Failed,
        Self::Neglect,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Perfect => "perfect",
            Self::Great => "great",
            Self::Good => "good",
            Self::Bad => "bad",
            Self::Failed => "failed",
            Self::Neglect => "neglect",
        }
    }
}

impl fmt::Display for Judge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Judgement tallies kept by the scoring collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scorebook {
    /// Cleared notes per judge label
    #[serde(default)]
    pub cleared: BTreeMap<String, u32>,
    /// Failed notes per failure reason
    #[serde(default)]
    pub failed: BTreeMap<String, u32>,
    #[serde(default)]
    pub neglect: u32,
}

impl Scorebook {
    pub fn record_cleared(&mut self, judge: &str) {
        *self.cleared.entry(judge.to_string()).or_default() += 1;
    }

    pub fn record_failed(&mut self, reason: &str) {
        *self.failed.entry(reason.to_string()).or_default() += 1;
    }

    pub fn record_neglect(&mut self) {
        self.neglect += 1;
    }

    /// Count shown for a judge. Failures are summed over every reason.
    #[must_use]
    pub fn count(&self, judge: Judge) -> u32 {
        match judge {
            Judge::Failed => self.failed.values().sum(),
            Judge::Neglect => self.neglect,
            _ => self.cleared.get(judge.as_str()).copied().unwrap_or_default(),
        }
    }
}

/// Final numbers of a finished game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResults {
    pub scorebook: Scorebook,
    pub score: u64,
    pub max_combo: u32,
    pub high_score: u64,
    pub new_record: bool,
}

impl GameResults {
    /// The high score only moves when strictly beaten.
    #[must_use]
    pub fn new(scorebook: Scorebook, score: u64, max_combo: u32, previous_high_score: u64) -> Self {
        let new_record = score > previous_high_score;
        Self {
            scorebook,
            score,
            max_combo,
            high_score: if new_record { score } else { previous_high_score },
            new_record,
        }
    }

    /// Text lines of the breakdown, in display order, without the heading.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        Judge::ALL
            .iter()
            .map(|judge| format!("{judge}: {}", self.scorebook.count(*judge)))
            .chain([
                format!("Max Combo: {}", self.max_combo),
                format!("Score: {}", self.score),
                format!("HighScore: {}", self.high_score),
            ])
            .collect()
    }
}

/// The fading cover and the result text drawn over it.
#[derive(Debug, Clone)]
pub struct ResultScreen {
    width: f64,
    height: f64,
    judge_colors: JudgeColors,
    cover: Option<PrimitiveId>,
    fade_frames: u16,
    lines: Vec<PrimitiveId>,
    results: Option<GameResults>,
}

impl ResultScreen {
    #[must_use]
    pub fn new(width: f64, height: f64, judge_colors: JudgeColors) -> Self {
        Self {
            width,
            height,
            judge_colors,
            cover: None,
            fade_frames: 0,
            lines: Vec::new(),
            results: None,
        }
    }

    /// Start fading the cover in. The breakdown appears once it is opaque.
    pub fn begin(&mut self, results: GameResults, scene: &mut Scene) {
        self.clear(scene);
        self.cover = Some(scene.spawn(Shape::Rect {
            origin: Point::default(),
            width: self.width,
            height: self.height,
            fill: Color::LIGHT.with_alpha(0.0),
        }));
        self.results = Some(results);
    }

    /// Advance the fade by one frame. Returns `true` on the frame the
    /// breakdown is laid out.
    pub fn tick(&mut self, scene: &mut Scene) -> bool {
        let Some(cover) = self.cover else {
            return false;
        };
        if self.fade_frames >= COVER_FADE_FRAMES {
            return false;
        }

        self.fade_frames += 1;
        let alpha = f32::from(self.fade_frames) / f32::from(COVER_FADE_FRAMES);
        scene.set_fill(cover, Color::LIGHT.with_alpha(alpha));

        if self.fade_frames < COVER_FADE_FRAMES {
            return false;
        }
        self.show(scene);
        true
    }

    fn show(&mut self, scene: &mut Scene) {
        let Some(results) = &self.results else {
            return;
        };
        let left = self.width * RESULT_LEFT_RATIO;
        let mut spawn = |y: f64, content: String, font_size: f64, color: Color| {
            scene.spawn(Shape::Text {
                anchor: Point::new(left, y),
                content,
                color,
                font_size,
                justification: Justification::Left,
            })
        };

        self.lines.push(spawn(
            100.0,
            "Result:".to_string(),
            HEADING_FONT_SIZE,
            Color::BLACK,
        ));

        for (judge, y) in Judge::ALL.iter().zip((0..).map(|i: u8| 40.0 * f64::from(i) + 180.0)) {
            let color = self
                .judge_colors
                .color_for(judge.as_str())
                .adjust_hsb(-0.3, 0.2);
            let content = format!("{judge}: {}", results.scorebook.count(*judge));
            self.lines.push(spawn(y, content, LINE_FONT_SIZE, color));
        }

        let summary = [
            (450.0, format!("Max Combo: {}", results.max_combo)),
            (500.0, format!("Score: {}", results.score)),
            (550.0, format!("HighScore: {}", results.high_score)),
        ];
        for (y, content) in summary {
            self.lines.push(spawn(y, content, LINE_FONT_SIZE, Color::BLACK));
        }

        info!(target: LOG_TARGET, "Showing results: score {}, high score {}", results.score, results.high_score);
    }

    pub fn clear(&mut self, scene: &mut Scene) {
        if let Some(cover) = self.cover.take() {
            scene.despawn(cover);
        }
        for id in self.lines.drain(..) {
            scene.despawn(id);
        }
        self.fade_frames = 0;
        self.results = None;
    }

    /// Whether the game has ended and the cover is up.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.cover.is_some()
    }

    #[must_use]
    pub fn is_shown(&self) -> bool {
        !self.lines.is_empty()
    }

    #[must_use]
    pub const fn results(&self) -> Option<&GameResults> {
        self.results.as_ref()
    }

    #[must_use]
    pub fn lines(&self) -> &[PrimitiveId] {
        &self.lines
    }

    #[must_use]
    pub const fn cover(&self) -> Option<PrimitiveId> {
        self.cover
    }
}
