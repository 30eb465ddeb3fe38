//! Retained set of visual primitives read by the renderer every frame.
//!
//! The engine never draws anything itself. It spawns, moves, restyles and
//! despawns primitives here, and whatever draws the screen walks [`Scene::iter`]
//! in paint order (oldest first).

use crate::color::Color;
use std::collections::BTreeMap;

/// Stable handle to a primitive. Ids are never reused within a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimitiveId(u64);

/// A point in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Scale a normalized `[x, y]` ratio by the canvas size.
    #[must_use]
    pub fn from_ratio(ratio: [f64; 2], width: f64, height: f64) -> Self {
        Self::new(ratio[0] * width, ratio[1] * height)
    }
}

/// Horizontal alignment of a text run relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justification {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Line {
        from: Point,
        to: Point,
        stroke: Color,
        stroke_width: f64,
    },
    Circle {
        center: Point,
        radius: f64,
        fill: Option<Color>,
        stroke: Option<Color>,
        stroke_width: f64,
    },
    Text {
        anchor: Point,
        content: String,
        color: Color,
        font_size: f64,
        justification: Justification,
    },
    Polygon {
        points: Vec<Point>,
        fill: Color,
    },
    Rect {
        origin: Point,
        width: f64,
        height: f64,
        fill: Color,
    },
}

impl Shape {
    /// Plain text run with white fill.
    #[must_use]
    pub fn text(
        anchor: Point,
        content: impl Into<String>,
        font_size: f64,
        justification: Justification,
    ) -> Self {
        Self::Text {
            anchor,
            content: content.into(),
            color: Color::WHITE,
            font_size,
            justification,
        }
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            Self::Line { from, to, .. } => {
                *from = from.offset(dx, dy);
                *to = to.offset(dx, dy);
            }
            Self::Circle { center, .. } => *center = center.offset(dx, dy),
            Self::Text { anchor, .. } => *anchor = anchor.offset(dx, dy),
            Self::Polygon { points, .. } => {
                for point in points {
                    *point = point.offset(dx, dy);
                }
            }
            Self::Rect { origin, .. } => *origin = origin.offset(dx, dy),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub shape: Shape,
    pub opacity: f64,
    pub visible: bool,
}

impl Primitive {
    #[must_use]
    pub const fn new(shape: Shape) -> Self {
        Self {
            shape,
            opacity: 1.0,
            visible: true,
        }
    }

    /// Text content, if this is a text run.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.shape {
            Shape::Text { content, .. } => Some(content),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    primitives: BTreeMap<PrimitiveId, Primitive>,
    next_id: u64,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, shape: Shape) -> PrimitiveId {
        self.insert(Primitive::new(shape))
    }

    pub fn insert(&mut self, primitive: Primitive) -> PrimitiveId {
        let id = PrimitiveId(self.next_id);
        self.next_id += 1;
        self.primitives.insert(id, primitive);
        id
    }

    /// Remove a primitive. Returns `false` if it was already gone.
    pub fn despawn(&mut self, id: PrimitiveId) -> bool {
        self.primitives.remove(&id).is_some()
    }

    #[must_use]
    pub fn get(&self, id: PrimitiveId) -> Option<&Primitive> {
        self.primitives.get(&id)
    }

    pub fn get_mut(&mut self, id: PrimitiveId) -> Option<&mut Primitive> {
        self.primitives.get_mut(&id)
    }

    #[must_use]
    pub fn contains(&self, id: PrimitiveId) -> bool {
        self.primitives.contains_key(&id)
    }

    pub fn translate(&mut self, id: PrimitiveId, dx: f64, dy: f64) {
        if let Some(primitive) = self.primitives.get_mut(&id) {
            primitive.shape.translate(dx, dy);
        }
    }

    pub fn set_opacity(&mut self, id: PrimitiveId, opacity: f64) {
        if let Some(primitive) = self.primitives.get_mut(&id) {
            primitive.opacity = opacity;
        }
    }

    pub fn set_visible(&mut self, id: PrimitiveId, visible: bool) {
        if let Some(primitive) = self.primitives.get_mut(&id) {
            primitive.visible = visible;
        }
    }

    /// Replace the content of a text run. Non-text primitives are left alone.
    pub fn set_text(&mut self, id: PrimitiveId, text: &str) {
        if let Some(Primitive {
            shape: Shape::Text { content, .. },
            ..
        }) = self.primitives.get_mut(&id)
        {
            if content.as_str() != text {
                text.clone_into(content);
            }
        }
    }

    /// Set the fill of a circle, polygon or rectangle.
    pub fn set_fill(&mut self, id: PrimitiveId, color: Color) {
        let Some(primitive) = self.primitives.get_mut(&id) else {
            return;
        };
        match &mut primitive.shape {
            Shape::Circle { fill, .. } => *fill = Some(color),
            Shape::Polygon { fill, .. } | Shape::Rect { fill, .. } => *fill = color,
            Shape::Text { color: text_color, .. } => *text_color = color,
            Shape::Line { .. } => {}
        }
    }

    /// Number of live primitives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Primitives in paint order.
    pub fn iter(&self) -> impl Iterator<Item = (PrimitiveId, &Primitive)> {
        self.primitives.iter().map(|(id, primitive)| (*id, primitive))
    }

    /// Primitives in paint order, without their ids.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Primitive> {
        self.primitives.values().cloned().collect()
    }
}
