//! Lifecycle of the items scrolling along the roll.
//!
//! Every chart item owns one slot, indexed by its position in the roll. A slot
//! is filled the frame the playback time enters the item's [`ItemWindow`] and
//! emptied the first frame it leaves. Empty slots outside their window cost a
//! comparison and nothing else.

use crate::chart::{ChartItem, ItemKind, NoteState};
use crate::color::Color;
use crate::config::ScreenConfig;
use crate::error::Result;
use crate::scene::{Justification, Point, PrimitiveId, Scene, Shape};
use crate::window::{compute_windows, ItemWindow, RollGeometry};
use tracing::{debug, info};

const LOG_TARGET: &str = "rollscreen::timeline";

/// Offsets of the labels under a note, from the roll line.
const LYRIC_LABEL_OFFSET: f64 = 50.0;
const ROMAJI_LABEL_OFFSET: f64 = 80.0;
const MERCY_LABEL_OFFSET: f64 = 110.0;

/// Stop marker apex sits this far above the top of a note.
const STOP_MARKER_GAP: f64 = 30.0;
const STOP_MARKER_HALF_WIDTH: f64 = 10.0;
const STOP_MARKER_HEIGHT: f64 = 10.0;

/// Opacity of notes that are being typed or already resolved.
const DIMMED_NOTE_OPACITY: f64 = 0.5;

/// The subset of [`ScreenConfig`] needed to lay out roll items.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RollLayout {
    speed: f64,
    hit_x: f64,
    roll_y: f64,
    note_size: f64,
    lyric_size: f64,
    line_height: f64,
    long_line_height: f64,
    romaji: bool,
}

impl RollLayout {
    fn from_config(config: &ScreenConfig) -> Self {
        Self {
            speed: config.speed,
            hit_x: config.hit_x(),
            roll_y: config.roll_y(),
            note_size: config.note_size,
            lyric_size: config.lyric_size,
            line_height: config.line_height,
            long_line_height: config.long_line_height,
            romaji: config.romaji,
        }
    }

    /// Horizontal position of an item at the given run time.
    fn position(&self, item_time: f64, run_time: f64) -> f64 {
        (item_time - run_time) * self.speed + self.hit_x
    }

    fn label(&self, position: f64, offset: f64, content: &str) -> Shape {
        Shape::text(
            Point::new(position, self.roll_y + self.note_size + offset),
            content,
            self.lyric_size,
            Justification::Center,
        )
    }

    fn divider(&self, position: f64, height: f64, stroke_width: f64) -> Shape {
        Shape::Line {
            from: Point::new(position, self.roll_y - height / 2.0),
            to: Point::new(position, self.roll_y + height / 2.0),
            stroke: Color::WHITE,
            stroke_width,
        }
    }
}

/// Primitives of a rendered note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteBody {
    pub circle: PrimitiveId,
    pub lyric: PrimitiveId,
    /// Romaji and mercy labels, present when romaji display is enabled
    pub romaji: Option<PrimitiveId>,
    pub mercy: Option<PrimitiveId>,
}

/// Kind-specific primitives of a rendered item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemBody {
    Line { line: PrimitiveId },
    LongLine { line: PrimitiveId },
    Note(NoteBody),
    Stop { marker: PrimitiveId },
}

/// An item currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedItem {
    /// Horizontal position the primitives are currently anchored at
    pub position: f64,
    pub body: ItemBody,
}

impl RenderedItem {
    fn spawn(item: &ChartItem, position: f64, layout: &RollLayout, scene: &mut Scene) -> Self {
        let body = match item.kind {
            ItemKind::LongLine => ItemBody::LongLine {
                line: scene.spawn(layout.divider(position, layout.long_line_height, 2.0)),
            },
            ItemKind::Line => ItemBody::Line {
                line: scene.spawn(layout.divider(position, layout.line_height, 1.0)),
            },
            ItemKind::Note => {
                let circle = scene.spawn(Shape::Circle {
                    center: Point::new(position, layout.roll_y),
                    radius: layout.note_size,
                    fill: None,
                    stroke: Some(Color::WHITE),
                    stroke_width: 1.0,
                });
                let lyric =
                    scene.spawn(layout.label(position, LYRIC_LABEL_OFFSET, &item.remaining_text));
                let (romaji, mercy) = if layout.romaji {
                    let romaji = scene.spawn(layout.label(
                        position,
                        ROMAJI_LABEL_OFFSET,
                        &item.remaining_romaji,
                    ));
                    let mercy = scene.spawn(layout.label(
                        position,
                        MERCY_LABEL_OFFSET,
                        item.mercy.as_deref().unwrap_or_default(),
                    ));
                    (Some(romaji), Some(mercy))
                } else {
                    (None, None)
                };
                ItemBody::Note(NoteBody {
                    circle,
                    lyric,
                    romaji,
                    mercy,
                })
            }
            ItemKind::Stop => {
                let apex_y = layout.roll_y - layout.note_size - STOP_MARKER_GAP;
                ItemBody::Stop {
                    marker: scene.spawn(Shape::Polygon {
                        points: vec![
                            Point::new(position, apex_y),
                            Point::new(position + STOP_MARKER_HALF_WIDTH, apex_y - STOP_MARKER_HEIGHT),
                            Point::new(position - STOP_MARKER_HALF_WIDTH, apex_y - STOP_MARKER_HEIGHT),
                        ],
                        fill: Color::WHITE,
                    }),
                }
            }
        };

        Self { position, body }
    }

    /// Visit every primitive owned by this item.
    pub fn for_each_primitive(&self, mut f: impl FnMut(PrimitiveId)) {
        match &self.body {
            ItemBody::Line { line } | ItemBody::LongLine { line } => f(*line),
            ItemBody::Stop { marker } => f(*marker),
            ItemBody::Note(note) => {
                f(note.circle);
                f(note.lyric);
                if let Some(romaji) = note.romaji {
                    f(romaji);
                }
                if let Some(mercy) = note.mercy {
                    f(mercy);
                }
            }
        }
    }

    fn despawn(&self, scene: &mut Scene) {
        self.for_each_primitive(|id| {
            scene.despawn(id);
        });
    }

    fn move_to(&mut self, position: f64, scene: &mut Scene) {
        let dx = position - self.position;
        if dx != 0.0 {
            self.for_each_primitive(|id| scene.translate(id, dx, 0.0));
            self.position = position;
        }
    }

    /// Reposition and restyle from the item's current state.
    fn apply(&mut self, item: &ChartItem, position: f64, scene: &mut Scene) {
        self.move_to(position, scene);

        let ItemBody::Note(note) = &self.body else {
            return;
        };

        if item.state == NoteState::Cleared {
            self.for_each_primitive(|id| scene.set_visible(id, false));
            return;
        }
        self.for_each_primitive(|id| scene.set_visible(id, true));

        let fill = match item.state {
            NoteState::Waiting | NoteState::Hitting if item.mercy.is_some() => Color::ORANGE,
            NoteState::Waiting | NoteState::Hitting => Color::RED,
            _ => Color::MUTED,
        };
        let opacity = match item.state {
            NoteState::Failed | NoteState::Waiting => 1.0,
            _ => DIMMED_NOTE_OPACITY,
        };
        scene.set_fill(note.circle, fill);
        scene.set_opacity(note.circle, opacity);
        scene.set_text(note.lyric, &item.remaining_text);
        if let Some(romaji) = note.romaji {
            scene.set_text(romaji, &item.remaining_romaji);
        }
    }
}

/// Creates, moves and destroys roll items as playback time advances.
#[derive(Debug, Clone)]
pub struct Timeline {
    layout: RollLayout,
    geometry: RollGeometry,
    windows: Vec<ItemWindow>,
    slots: Vec<Option<RenderedItem>>,
    live: usize,
    prepared: bool,
}

impl Timeline {
    #[must_use]
    pub fn new(config: &ScreenConfig) -> Self {
        Self {
            layout: RollLayout::from_config(config),
            geometry: RollGeometry::from_config(config),
            windows: Vec::new(),
            slots: Vec::new(),
            live: 0,
            prepared: false,
        }
    }

    /// Destroy everything on screen and compute the windows for a new roll.
    ///
    /// On failure the timeline is left empty and unprepared.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidItemTime`] if any item has no usable time.
    pub fn prepare(&mut self, items: &[ChartItem], scene: &mut Scene) -> Result<()> {
        self.clear(scene);
        self.windows.clear();
        self.slots.clear();
        self.prepared = false;

        let windows = compute_windows(items, &self.geometry)?;
        self.slots = vec![None; windows.len()];
        self.windows = windows;
        self.prepared = true;

        info!(target: LOG_TARGET, "Computed windows for {} roll items", items.len());
        Ok(())
    }

    #[must_use]
    pub const fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Bring the rendered items in line with `run_time` (playback time since zero).
    ///
    /// Depends only on `run_time` and the items' current state, so calling it
    /// twice with the same inputs changes nothing the second time.
    pub fn update(&mut self, items: &[ChartItem], run_time: f64, scene: &mut Scene) {
        let layout = &self.layout;

        for ((item, window), slot) in items.iter().zip(&self.windows).zip(self.slots.iter_mut()) {
            let visible = window.contains(run_time);
            let position = layout.position(item.time, run_time);

            match (slot.is_some(), visible) {
                (false, false) => continue,
                (false, true) => {
                    debug!(target: LOG_TARGET, "Spawning {:?} item {} at x={:.1}", item.kind, item.index, position);
                    *slot = Some(RenderedItem::spawn(item, position, layout, scene));
                    self.live += 1;
                }
                (true, false) => {
                    if let Some(rendered) = slot.take() {
                        debug!(target: LOG_TARGET, "Evicting item {}", item.index);
                        rendered.despawn(scene);
                        self.live -= 1;
                    }
                    continue;
                }
                (true, true) => {}
            }

            if let Some(rendered) = slot.as_mut() {
                rendered.apply(item, position, scene);
            }
        }
    }

    /// Destroy every rendered item. Windows are kept.
    pub fn clear(&mut self, scene: &mut Scene) {
        for slot in &mut self.slots {
            if let Some(rendered) = slot.take() {
                rendered.despawn(scene);
            }
        }
        self.live = 0;
    }

    /// Number of items currently on screen.
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live
    }

    /// The rendered item for a roll index, if it is on screen.
    #[must_use]
    pub fn rendered(&self, index: usize) -> Option<&RenderedItem> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn window(&self, index: usize) -> Option<&ItemWindow> {
        self.windows.get(index)
    }

    /// Indices of the items currently on screen, in roll order.
    pub fn live_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|_| index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Primitive;

    fn roll() -> Vec<ChartItem> {
        vec![
            ChartItem::new(0, 0.0, ItemKind::LongLine),
            ChartItem::note(1, 400.0, "か", "ka"),
            ChartItem::new(2, 800.0, ItemKind::Line),
            ChartItem::note(3, 1200.0, "な", "na").with_mercy("n"),
            ChartItem::new(4, 1400.0, ItemKind::Stop),
            ChartItem::note(5, 6000.0, "き", "ki"),
        ]
    }

    fn prepared(config: &ScreenConfig, items: &[ChartItem]) -> (Timeline, Scene) {
        let mut scene = Scene::new();
        let mut timeline = Timeline::new(config);
        timeline.prepare(items, &mut scene).unwrap();
        (timeline, scene)
    }

    fn circle_of(timeline: &Timeline, index: usize) -> PrimitiveId {
        match &timeline.rendered(index).unwrap().body {
            ItemBody::Note(note) => note.circle,
            other => panic!("expected note, got {other:?}"),
        }
    }

    fn circle_style(scene: &Scene, id: PrimitiveId) -> (Option<Color>, f64, bool, f64) {
        let Some(Primitive {
            shape: Shape::Circle { fill, center, .. },
            opacity,
            visible,
        }) = scene.get(id)
        else {
            panic!("expected circle");
        };
        (*fill, *opacity, *visible, center.x)
    }

    #[test]
    fn test_spawns_only_items_in_window() {
        let config = ScreenConfig::default();
        let items = roll();
        let (mut timeline, mut scene) = prepared(&config, &items);

        timeline.update(&items, 0.0, &mut scene);

        // Note at 6000 emerges at (0.5 * 6000 - 752) / 0.5 = 4496
        let live: Vec<_> = timeline.live_indices().collect();
        assert_eq!(live, vec![0, 1, 2, 3, 4]);
        assert_eq!(timeline.live_count(), 5);
        // long line 1, two notes with 4 primitives, line 1, stop 1
        assert_eq!(scene.len(), 11);
    }

    #[test]
    fn test_positions_follow_run_time() {
        let config = ScreenConfig::default();
        let items = roll();
        let (mut timeline, mut scene) = prepared(&config, &items);

        timeline.update(&items, 0.0, &mut scene);
        let circle = circle_of(&timeline, 1);
        // (400 - 0) * 0.5 + 1120 * 0.4
        assert!((circle_style(&scene, circle).3 - 648.0).abs() < 1e-9);

        timeline.update(&items, 400.0, &mut scene);
        assert!((circle_style(&scene, circle).3 - 448.0).abs() < 1e-9);
        assert!((timeline.rendered(1).unwrap().position - 448.0).abs() < 1e-9);
    }

    #[test]
    fn test_emerge_boundary_is_inclusive() {
        let config = ScreenConfig::default();
        let items = roll();
        let (mut timeline, mut scene) = prepared(&config, &items);
        let emerge = timeline.window(5).unwrap().emerge_time;

        timeline.update(&items, emerge - 1.0, &mut scene);
        assert!(timeline.rendered(5).is_none());

        timeline.update(&items, emerge, &mut scene);
        assert!(timeline.rendered(5).is_some());
    }

    #[test]
    fn test_eviction_releases_primitives() {
        let config = ScreenConfig::default();
        let items = roll();
        let (mut timeline, mut scene) = prepared(&config, &items);

        timeline.update(&items, 0.0, &mut scene);
        let vanish = timeline.window(1).unwrap().vanish_time;
        let circle = circle_of(&timeline, 1);

        timeline.update(&items, vanish + 1.0, &mut scene);
        assert!(timeline.rendered(1).is_none());
        assert!(!scene.contains(circle));

        timeline.update(&items, 1.0e9, &mut scene);
        assert_eq!(timeline.live_count(), 0);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_update_is_idempotent() {
        let config = ScreenConfig::default();
        let items = roll();
        let (mut timeline, mut scene) = prepared(&config, &items);

        timeline.update(&items, 1234.5, &mut scene);
        let before = scene.snapshot();
        let live_before: Vec<_> = timeline.live_indices().collect();

        timeline.update(&items, 1234.5, &mut scene);
        assert_eq!(scene.snapshot(), before);
        assert_eq!(timeline.live_indices().collect::<Vec<_>>(), live_before);
    }

    #[test]
    fn test_forward_playback_never_resurrects() {
        let config = ScreenConfig::default();
        let items = roll();
        let (mut timeline, mut scene) = prepared(&config, &items);
        let mut evicted = vec![false; items.len()];
        let mut seen = vec![false; items.len()];

        let mut run_time = -2000.0;
        while run_time < 10_000.0 {
            timeline.update(&items, run_time, &mut scene);
            for (index, item_window) in (0..items.len()).filter_map(|i| timeline.window(i).map(|w| (i, *w))) {
                let on_screen = timeline.rendered(index).is_some();
                assert_eq!(on_screen, item_window.contains(run_time));
                if on_screen {
                    assert!(!evicted[index], "item {index} reappeared");
                    seen[index] = true;
                } else if seen[index] {
                    evicted[index] = true;
                }
            }
            let expected = (0..items.len())
                .filter(|&i| timeline.window(i).is_some_and(|w| w.contains(run_time)))
                .count();
            assert_eq!(timeline.live_count(), expected);
            run_time += 16.7;
        }
        assert!(evicted.iter().all(|e| *e));
    }

    #[test]
    fn test_reentry_after_backward_jump_creates_fresh_item() {
        let config = ScreenConfig::default();
        let items = roll();
        let (mut timeline, mut scene) = prepared(&config, &items);

        timeline.update(&items, 0.0, &mut scene);
        let first = circle_of(&timeline, 1);
        timeline.update(&items, 5000.0, &mut scene);
        assert!(timeline.rendered(1).is_none());

        timeline.update(&items, 0.0, &mut scene);
        let second = circle_of(&timeline, 1);
        assert_ne!(first, second);
        assert!((circle_style(&scene, second).3 - 648.0).abs() < 1e-9);
    }

    #[test]
    fn test_note_style_follows_state() {
        let config = ScreenConfig::default();
        let mut items = roll();
        let (mut timeline, mut scene) = prepared(&config, &items);
        timeline.update(&items, 0.0, &mut scene);
        let plain = circle_of(&timeline, 1);
        let merciful = circle_of(&timeline, 3);

        let (fill, opacity, visible, _) = circle_style(&scene, plain);
        assert_eq!((fill, opacity, visible), (Some(Color::RED), 1.0, true));
        let (fill, opacity, _, _) = circle_style(&scene, merciful);
        assert_eq!((fill, opacity), (Some(Color::ORANGE), 1.0));

        items[1].state = NoteState::Hitting;
        items[3].state = NoteState::Failed;
        timeline.update(&items, 0.0, &mut scene);
        let (fill, opacity, _, _) = circle_style(&scene, plain);
        assert_eq!((fill, opacity), (Some(Color::RED), 0.5));
        let (fill, opacity, _, _) = circle_style(&scene, merciful);
        assert_eq!((fill, opacity), (Some(Color::MUTED), 1.0));

        items[1].state = NoteState::Cleared;
        timeline.update(&items, 0.0, &mut scene);
        let rendered = timeline.rendered(1).unwrap();
        rendered.for_each_primitive(|id| assert!(!scene.get(id).unwrap().visible));
    }

    #[test]
    fn test_remaining_text_refreshes() {
        let config = ScreenConfig::default();
        let mut items = roll();
        let (mut timeline, mut scene) = prepared(&config, &items);
        timeline.update(&items, 0.0, &mut scene);

        items[1].remaining_text = String::new();
        items[1].remaining_romaji = "a".to_string();
        timeline.update(&items, 10.0, &mut scene);

        let ItemBody::Note(note) = &timeline.rendered(1).unwrap().body else {
            panic!("expected note");
        };
        assert_eq!(scene.get(note.lyric).and_then(Primitive::text), Some(""));
        assert_eq!(
            scene.get(note.romaji.unwrap()).and_then(Primitive::text),
            Some("a")
        );
    }

    #[test]
    fn test_romaji_disabled_skips_labels() {
        let config = ScreenConfig {
            romaji: false,
            ..ScreenConfig::default()
        };
        let items = vec![ChartItem::note(0, 0.0, "か", "ka")];
        let (mut timeline, mut scene) = prepared(&config, &items);
        timeline.update(&items, 0.0, &mut scene);

        let ItemBody::Note(note) = &timeline.rendered(0).unwrap().body else {
            panic!("expected note");
        };
        assert!(note.romaji.is_none() && note.mercy.is_none());
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn test_stop_marker_geometry() {
        let config = ScreenConfig::default();
        let items = vec![ChartItem::new(0, 0.0, ItemKind::Stop)];
        let (mut timeline, mut scene) = prepared(&config, &items);
        timeline.update(&items, 0.0, &mut scene);

        let ItemBody::Stop { marker } = timeline.rendered(0).unwrap().body else {
            panic!("expected stop marker");
        };
        let Some(Primitive {
            shape: Shape::Polygon { points, .. },
            ..
        }) = scene.get(marker)
        else {
            panic!("expected polygon");
        };
        // apex at roll_y (315) - note_size (50) - 30
        assert_eq!(
            points,
            &vec![
                Point::new(448.0, 235.0),
                Point::new(458.0, 225.0),
                Point::new(438.0, 225.0),
            ]
        );
    }

    #[test]
    fn test_prepare_failure_leaves_timeline_empty() {
        let config = ScreenConfig::default();
        let items = roll();
        let (mut timeline, mut scene) = prepared(&config, &items);
        timeline.update(&items, 0.0, &mut scene);

        let mut broken = roll();
        broken[2].time = f64::NAN;
        assert!(timeline.prepare(&broken, &mut scene).is_err());
        assert!(!timeline.is_prepared());
        assert!(scene.is_empty());

        timeline.update(&broken, 0.0, &mut scene);
        assert_eq!(timeline.live_count(), 0);
    }
}
