//! High score persistence across sessions.

use chrono::{DateTime, Utc};
use rollscreen_core::GameResults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Best game played so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreRecord {
    pub high_score: u64,
    pub max_combo: u32,
    /// When the record was set
    pub achieved_at: DateTime<Utc>,
}

impl HighScoreRecord {
    #[must_use]
    pub fn from_results(results: &GameResults) -> Self {
        Self {
            high_score: results.high_score,
            max_combo: results.max_combo,
            achieved_at: Utc::now(),
        }
    }

    /// Load the record from the config directory.
    /// Returns `None` if the file doesn't exist or can't be parsed.
    #[must_use]
    pub fn load() -> Option<Self> {
        Self::load_from(&rollscreen_core::record_path())
    }

    #[must_use]
    pub fn load_from(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(record) => {
                    info!("Loaded high score record from {:?}", path);
                    Some(record)
                }
                Err(e) => {
                    warn!("Failed to parse high score record: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read high score record: {}", e);
                None
            }
        }
    }

    /// Save the record to the config directory.
    pub fn save(&self) {
        self.save_to(&rollscreen_core::record_path());
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create record directory: {}", e);
                return;
            }
        }

        match serde_json::to_string_pretty(self) {
            Ok(content) => {
                if let Err(e) = fs::write(path, content) {
                    warn!("Failed to write high score record: {}", e);
                } else {
                    info!("Saved high score record to {:?}", path);
                }
            }
            Err(e) => {
                warn!("Failed to serialize high score record: {}", e);
            }
        }
    }
}
