//! Chart items as handed over by the game collaborator.
//!
//! The roll is loaded and owned elsewhere; the screen only reads it. The
//! scoring side mutates [`ChartItem::state`] and the remaining text fields as
//! the player types.

use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A typed note
    Note,
    /// Beat divider
    Line,
    /// Measure divider
    LongLine,
    /// "Stop typing here" marker
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteState {
    #[default]
    Waiting,
    Hitting,
    Cleared,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartItem {
    /// Position in the roll; assigned on load
    #[serde(default)]
    pub index: usize,
    /// Nominal event time, in the playback clock's unit
    pub time: f64,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default)]
    pub state: NoteState,
    /// Full display text (lyric line for lyric markers, kana for notes)
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub remaining_text: String,
    #[serde(default)]
    pub remaining_romaji: String,
    /// Leniency hint shown under the note
    #[serde(default)]
    pub mercy: Option<String>,
}

impl ChartItem {
    #[must_use]
    pub fn new(index: usize, time: f64, kind: ItemKind) -> Self {
        Self {
            index,
            time,
            kind,
            state: NoteState::Waiting,
            text: String::new(),
            remaining_text: String::new(),
            remaining_romaji: String::new(),
            mercy: None,
        }
    }

    /// A note waiting to be typed in full.
    #[must_use]
    pub fn note(index: usize, time: f64, text: &str, romaji: &str) -> Self {
        Self {
            text: text.to_string(),
            remaining_text: text.to_string(),
            remaining_romaji: romaji.to_string(),
            ..Self::new(index, time, ItemKind::Note)
        }
    }

    #[must_use]
    pub fn with_mercy(mut self, mercy: impl Into<String>) -> Self {
        self.mercy = Some(mercy.into());
        self
    }

    #[must_use]
    pub fn is_note(&self) -> bool {
        self.kind == ItemKind::Note
    }
}

/// Parse a roll from a JSON array and assign each item its index.
///
/// # Errors
///
/// Returns [`crate::CoreError::ChartParse`] if the document is not an array of
/// chart items.
pub fn parse_roll(json: &str) -> Result<Vec<ChartItem>> {
    let mut items: Vec<ChartItem> = serde_json::from_str(json)?;
    for (index, item) in items.iter_mut().enumerate() {
        item.index = index;
    }
    Ok(items)
}
