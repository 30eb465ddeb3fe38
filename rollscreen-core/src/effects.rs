//! Judgement pop-ups that float up from the hit marker and fade out.

use crate::color::Color;
use crate::scene::{Justification, Point, PrimitiveId, Scene, Shape};
use std::time::Instant;

/// Upward drift, in pixels per millisecond of age.
const RISE_PER_MS: f64 = 0.2;
/// Opacity lost per millisecond of age.
const FADE_PER_MS: f64 = 0.001;

const JUDGE_FONT_SIZE: f64 = 24.0;
const COMBO_FONT_SIZE: f64 = 15.0;

/// One judgement pop-up: the judge label with the combo count underneath.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgementEffect {
    pub born: Instant,
    pub judge: String,
    pub combo: u32,
    label: PrimitiveId,
    combo_text: PrimitiveId,
    /// Upward offset applied so far
    rise: f64,
}

impl JudgementEffect {
    /// Opacity at the given instant. Goes negative once the effect has expired.
    #[must_use]
    pub fn opacity_at(&self, now: Instant) -> f64 {
        1.0 - age_ms(self.born, now) * FADE_PER_MS
    }

    #[must_use]
    pub const fn label(&self) -> PrimitiveId {
        self.label
    }

    #[must_use]
    pub const fn combo_text(&self) -> PrimitiveId {
        self.combo_text
    }
}

fn age_ms(born: Instant, now: Instant) -> f64 {
    now.saturating_duration_since(born).as_secs_f64() * 1000.0
}

/// The set of live judgement pop-ups, each on its own birth-relative clock.
#[derive(Debug, Clone)]
pub struct JudgementEffects {
    anchor: Point,
    note_size: f64,
    effects: Vec<JudgementEffect>,
}

impl JudgementEffects {
    /// Effects are anchored at the hit marker center.
    #[must_use]
    pub const fn new(anchor: Point, note_size: f64) -> Self {
        Self {
            anchor,
            note_size,
            effects: Vec::new(),
        }
    }

    pub fn spawn(&mut self, judge: &str, combo: u32, color: Color, now: Instant, scene: &mut Scene) {
        let label = scene.spawn(Shape::Text {
            anchor: self.anchor.offset(0.0, -self.note_size - JUDGE_FONT_SIZE),
            content: judge.to_string(),
            color,
            font_size: JUDGE_FONT_SIZE,
            justification: Justification::Center,
        });
        let combo_text = scene.spawn(Shape::text(
            self.anchor.offset(0.0, -self.note_size),
            combo.to_string(),
            COMBO_FONT_SIZE,
            Justification::Center,
        ));

        self.effects.push(JudgementEffect {
            born: now,
            judge: judge.to_string(),
            combo,
            label,
            combo_text,
            rise: 0.0,
        });
    }

    /// Advance every effect to `now` and drop the ones that have faded out.
    pub fn tick(&mut self, now: Instant, scene: &mut Scene) {
        self.effects.retain_mut(|effect| {
            let age = age_ms(effect.born, now);
            let opacity = 1.0 - age * FADE_PER_MS;
            if opacity < 0.0 {
                scene.despawn(effect.label);
                scene.despawn(effect.combo_text);
                return false;
            }

            let rise = age * RISE_PER_MS;
            let dy = effect.rise - rise;
            for id in [effect.label, effect.combo_text] {
                scene.translate(id, 0.0, dy);
                scene.set_opacity(id, opacity);
            }
            effect.rise = rise;
            true
        });
    }

    pub fn clear(&mut self, scene: &mut Scene) {
        for effect in self.effects.drain(..) {
            scene.despawn(effect.label);
            scene.despawn(effect.combo_text);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JudgementEffect> {
        self.effects.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Primitive;
    use std::time::Duration;

    fn anchor_of(scene: &Scene, id: PrimitiveId) -> Point {
        match scene.get(id) {
            Some(Primitive {
                shape: Shape::Text { anchor, .. },
                ..
            }) => *anchor,
            other => panic!("expected text, got {other:?}"),
        }
    }

    fn effects() -> JudgementEffects {
        JudgementEffects::new(Point::new(448.0, 315.0), 50.0)
    }

    #[test]
    fn test_spawn_places_labels_above_hit_marker() {
        let mut scene = Scene::new();
        let mut effects = effects();
        effects.spawn("great", 12, Color::ORANGE, Instant::now(), &mut scene);

        let effect = effects.iter().next().unwrap();
        assert_eq!(anchor_of(&scene, effect.label()), Point::new(448.0, 241.0));
        assert_eq!(anchor_of(&scene, effect.combo_text()), Point::new(448.0, 265.0));
        assert_eq!(
            scene.get(effect.combo_text()).and_then(Primitive::text),
            Some("12")
        );
    }

    #[test]
    fn test_effect_rises_and_fades() {
        let mut scene = Scene::new();
        let mut effects = effects();
        let born = Instant::now();
        effects.spawn("perfect", 1, Color::WHITE, born, &mut scene);
        let label = effects.iter().next().unwrap().label();

        let mut last_opacity = 1.0;
        for step in 1..=9u32 {
            effects.tick(born + Duration::from_millis(u64::from(step) * 100), &mut scene);
            let primitive = scene.get(label).unwrap();
            assert!(primitive.opacity < last_opacity);
            last_opacity = primitive.opacity;
        }

        // 900ms: 180px up, 10% opaque
        let anchor = anchor_of(&scene, label);
        assert!((anchor.y - (241.0 - 180.0)).abs() < 1e-6);
        assert!((last_opacity - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_effect_removed_once_transparent() {
        let mut scene = Scene::new();
        let mut effects = effects();
        let born = Instant::now();
        effects.spawn("bad", 0, Color::WHITE, born, &mut scene);

        // Opacity exactly zero is still kept
        effects.tick(born + Duration::from_millis(1000), &mut scene);
        assert_eq!(effects.len(), 1);

        effects.tick(born + Duration::from_millis(1001), &mut scene);
        assert!(effects.is_empty());
        assert!(scene.is_empty());
    }

    #[test]
    fn test_effects_are_independent() {
        let mut scene = Scene::new();
        let mut effects = effects();
        let start = Instant::now();
        effects.spawn("good", 1, Color::WHITE, start, &mut scene);
        effects.spawn("good", 2, Color::WHITE, start + Duration::from_millis(600), &mut scene);

        effects.tick(start + Duration::from_millis(1200), &mut scene);
        let combos: Vec<_> = effects.iter().map(|e| e.combo).collect();
        assert_eq!(combos, vec![2]);
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn test_clear_despawns_everything() {
        let mut scene = Scene::new();
        let mut effects = effects();
        effects.spawn("great", 3, Color::WHITE, Instant::now(), &mut scene);
        effects.spawn("great", 4, Color::WHITE, Instant::now(), &mut scene);

        effects.clear(&mut scene);
        assert!(effects.is_empty());
        assert!(scene.is_empty());
    }
}
