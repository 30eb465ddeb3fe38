//! Current and upcoming lyric lines, centered on their anchors.
//!
//! A lyric line is split into segments that alternate between full and faded
//! opacity, so the singer's phrasing is visible at a glance.

use crate::scene::{Justification, Point, PrimitiveId, Scene, Shape};

/// Separator between alternating lyric segments.
pub const SEGMENT_DELIMITER: &str = "¥|";

pub const CURRENT_LYRIC_FONT_SIZE: f64 = 36.0;
pub const NEXT_LYRIC_FONT_SIZE: f64 = 18.0;

const EVEN_SEGMENT_OPACITY: f64 = 1.0;
const ODD_SEGMENT_OPACITY: f64 = 0.3;

/// Width of a text run when rendered, in pixels.
pub trait TextMeasure {
    fn width(&self, text: &str, font_size: f64) -> f64;
}

/// Font-free width estimate: wide (CJK, full-width) glyphs take one em,
/// everything else a fraction of one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatedTextMeasure {
    pub narrow_factor: f64,
}

impl Default for EstimatedTextMeasure {
    fn default() -> Self {
        Self { narrow_factor: 0.55 }
    }
}

impl EstimatedTextMeasure {
    fn is_wide(c: char) -> bool {
        matches!(c,
            '\u{1100}'..='\u{115F}'
            | '\u{2E80}'..='\u{A4CF}'
            | '\u{AC00}'..='\u{D7A3}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{FE30}'..='\u{FE4F}'
            | '\u{FF00}'..='\u{FF60}'
            | '\u{FFE0}'..='\u{FFE6}')
    }
}

impl TextMeasure for EstimatedTextMeasure {
    fn width(&self, text: &str, font_size: f64) -> f64 {
        text.chars()
            .map(|c| if Self::is_wide(c) { 1.0 } else { self.narrow_factor })
            .sum::<f64>()
            * font_size
    }
}

/// Segments of one laid-out lyric line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LyricBlock {
    segments: Vec<PrimitiveId>,
    width: f64,
}

impl LyricBlock {
    /// Lay `text` out left to right from `anchor`, then shift the whole line
    /// left by half its width so it is centered on the anchor.
    pub fn layout(
        text: &str,
        anchor: Point,
        font_size: f64,
        measure: &dyn TextMeasure,
        scene: &mut Scene,
    ) -> Self {
        let mut width = 0.0;
        let mut segments = Vec::new();

        for (index, segment) in text.split(SEGMENT_DELIMITER).enumerate() {
            let opacity = if index % 2 == 0 {
                EVEN_SEGMENT_OPACITY
            } else {
                ODD_SEGMENT_OPACITY
            };
            let id = scene.spawn(Shape::text(
                anchor.offset(width, 0.0),
                segment,
                font_size,
                Justification::Left,
            ));
            scene.set_opacity(id, opacity);
            segments.push(id);
            width += measure.width(segment, font_size);
        }

        for id in &segments {
            scene.translate(*id, -width / 2.0, 0.0);
        }

        Self { segments, width }
    }

    pub fn clear(&mut self, scene: &mut Scene) {
        for id in self.segments.drain(..) {
            scene.despawn(id);
        }
        self.width = 0.0;
    }

    #[must_use]
    pub fn segments(&self) -> &[PrimitiveId] {
        &self.segments
    }

    #[must_use]
    pub const fn width(&self) -> f64 {
        self.width
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// The pair of lyric lines shown below the roll.
#[derive(Debug, Clone, Default)]
pub struct LyricDisplay {
    current_anchor: Point,
    next_anchor: Point,
    current: LyricBlock,
    next: LyricBlock,
}

impl LyricDisplay {
    #[must_use]
    pub fn new(current_anchor: Point, next_anchor: Point) -> Self {
        Self {
            current_anchor,
            next_anchor,
            ..Self::default()
        }
    }

    /// Rebuild both lines. `None` leaves the line empty.
    pub fn show(
        &mut self,
        current: Option<&str>,
        next: Option<&str>,
        measure: &dyn TextMeasure,
        scene: &mut Scene,
    ) {
        self.clear(scene);
        if let Some(text) = current {
            self.current = LyricBlock::layout(
                text,
                self.current_anchor,
                CURRENT_LYRIC_FONT_SIZE,
                measure,
                scene,
            );
        }
        if let Some(text) = next {
            self.next =
                LyricBlock::layout(text, self.next_anchor, NEXT_LYRIC_FONT_SIZE, measure, scene);
        }
    }

    pub fn clear(&mut self, scene: &mut Scene) {
        self.current.clear(scene);
        self.next.clear(scene);
    }

    #[must_use]
    pub const fn current(&self) -> &LyricBlock {
        &self.current
    }

    #[must_use]
    pub const fn next(&self) -> &LyricBlock {
        &self.next
    }
}
