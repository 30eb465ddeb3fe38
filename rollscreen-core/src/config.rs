use crate::color::Color;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollscreenConfig {
    #[serde(default)]
    pub screen: ScreenConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Screen geometry, timing and styling constants. Read once per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenConfig {
    /// Canvas width in pixels
    #[serde(default = "default_width")]
    pub width: f64,
    /// Canvas height in pixels
    #[serde(default = "default_height")]
    pub height: f64,
    /// Horizontal position of the hit line as a fraction of the width
    #[serde(default = "default_hit_position")]
    pub hit_position: f64,
    /// Scroll speed in pixels per clock unit
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Note radius in pixels
    #[serde(default = "default_note_size")]
    pub note_size: f64,
    /// Font size of the labels under each note
    #[serde(default = "default_lyric_size")]
    pub lyric_size: f64,
    /// Vertical position of the roll as a fraction of the height
    #[serde(default = "default_roll_y_pos")]
    pub roll_y_pos: f64,
    #[serde(default = "default_long_line_height")]
    pub long_line_height: f64,
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    /// Extra travel beyond the canvas edges before an item is created or destroyed
    #[serde(default = "default_screen_padding")]
    pub screen_padding: f64,
    #[serde(default = "default_buffer_text_position")]
    pub buffer_text_position: [f64; 2],
    #[serde(default = "default_current_lyric_position")]
    pub current_lyric_position: [f64; 2],
    #[serde(default = "default_next_lyric_position")]
    pub next_lyric_position: [f64; 2],
    #[serde(default = "default_kana_lyric_position")]
    pub kana_lyric_position: [f64; 2],
    #[serde(default = "default_score_text_position")]
    pub score_text_position: [f64; 2],
    #[serde(default)]
    pub judge_colors: JudgeColors,
    /// Delay before the mouse cursor hides while playing
    #[serde(default = "default_cursor_hide_ms")]
    pub cursor_hide_ms: u64,
    /// Show romaji and mercy labels under notes
    #[serde(default = "default_true")]
    pub romaji: bool,
    /// Best score seen before this session
    #[serde(default)]
    pub high_score: u64,
}

const fn default_width() -> f64 {
    1120.0
}

const fn default_height() -> f64 {
    630.0
}

const fn default_hit_position() -> f64 {
    0.4
}

const fn default_speed() -> f64 {
    0.5
}

const fn default_note_size() -> f64 {
    50.0
}

const fn default_lyric_size() -> f64 {
    20.0
}

const fn default_roll_y_pos() -> f64 {
    0.5
}

const fn default_long_line_height() -> f64 {
    150.0
}

const fn default_line_height() -> f64 {
    120.0
}

const fn default_screen_padding() -> f64 {
    30.0
}

const fn default_buffer_text_position() -> [f64; 2] {
    [0.2, 0.8]
}

const fn default_current_lyric_position() -> [f64; 2] {
    [0.5, 0.25]
}

const fn default_next_lyric_position() -> [f64; 2] {
    [0.5, 0.3]
}

const fn default_kana_lyric_position() -> [f64; 2] {
    [0.5, 0.8]
}

const fn default_score_text_position() -> [f64; 2] {
    [0.9, 0.1]
}

const fn default_cursor_hide_ms() -> u64 {
    1000
}

const fn default_true() -> bool {
    true
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            hit_position: default_hit_position(),
            speed: default_speed(),
            note_size: default_note_size(),
            lyric_size: default_lyric_size(),
            roll_y_pos: default_roll_y_pos(),
            long_line_height: default_long_line_height(),
            line_height: default_line_height(),
            screen_padding: default_screen_padding(),
            buffer_text_position: default_buffer_text_position(),
            current_lyric_position: default_current_lyric_position(),
            next_lyric_position: default_next_lyric_position(),
            kana_lyric_position: default_kana_lyric_position(),
            score_text_position: default_score_text_position(),
            judge_colors: JudgeColors::default(),
            cursor_hide_ms: default_cursor_hide_ms(),
            romaji: true,
            high_score: 0,
        }
    }
}

impl ScreenConfig {
    /// Check the constants the roll arithmetic depends on.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] if the speed is not a positive
    /// finite number, the canvas has no area, a ratio is out of range, or a
    /// size or padding is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(CoreError::ConfigInvalid {
                message: format!("screen.speed must be positive, got {}", self.speed),
            });
        }
        let finite_area = self.width.is_finite() && self.height.is_finite();
        if !(finite_area && self.width > 0.0 && self.height > 0.0) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "screen size must be positive, got {}x{}",
                    self.width, self.height
                ),
            });
        }
        for (field, value) in [
            ("screen.hit_position", self.hit_position),
            ("screen.roll_y_pos", self.roll_y_pos),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("{field} must be between 0 and 1, got {value}"),
                });
            }
        }
        for (field, value) in [
            ("screen.note_size", self.note_size),
            ("screen.screen_padding", self.screen_padding),
            ("screen.lyric_size", self.lyric_size),
            ("screen.line_height", self.line_height),
            ("screen.long_line_height", self.long_line_height),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::ConfigInvalid {
                    message: format!("{field} must be a non-negative number, got {value}"),
                });
            }
        }
        Ok(())
    }

    /// Y coordinate of the roll line.
    #[must_use]
    pub fn roll_y(&self) -> f64 {
        self.roll_y_pos * self.height
    }

    /// X coordinate of the hit line.
    #[must_use]
    pub fn hit_x(&self) -> f64 {
        self.width * self.hit_position
    }
}

/// Judge label to color mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JudgeColors(BTreeMap<String, Color>);

impl JudgeColors {
    /// Color for unknown judge labels.
    pub const FALLBACK: Color = Color::WHITE;

    /// Color for a judge label, falling back to [`Self::FALLBACK`].
    #[must_use]
    pub fn color_for(&self, judge: &str) -> Color {
        self.0.get(judge).copied().unwrap_or(Self::FALLBACK)
    }

    pub fn insert(&mut self, judge: impl Into<String>, color: Color) {
        self.0.insert(judge.into(), color);
    }
}

impl Default for JudgeColors {
    fn default() -> Self {
        let defaults = [
            ("perfect", Color::rgb(1.0, 1.0, 0.0)),
            ("great", Color::rgb(34.0 / 255.0, 221.0 / 255.0, 17.0 / 255.0)),
            ("good", Color::rgb(17.0 / 255.0, 153.0 / 255.0, 170.0 / 255.0)),
            ("bad", Color::MUTED),
            ("failed", Color::rgb(170.0 / 255.0, 51.0 / 255.0, 68.0 / 255.0)),
            ("neglect", Color::rgb(51.0 / 255.0, 153.0 / 255.0, 170.0 / 255.0)),
        ];
        Self(
            defaults
                .into_iter()
                .map(|(judge, color)| (judge.to_string(), color))
                .collect(),
        )
    }
}

/// Settings for the headless session driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Path to a pre-parsed roll in JSON form
    #[serde(default)]
    pub roll_file: Option<PathBuf>,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

const fn default_frame_rate() -> u32 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            roll_file: None,
            frame_rate: default_frame_rate(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to a file next to the config
    #[serde(default)]
    pub enabled: bool,
}

impl RollscreenConfig {
    /// Get the config file path (~/.config/rollscreen/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from file or create template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template on first
    /// run, or an error if the file cannot be read, parsed or validated.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Same as [`Self::load_or_create`] for an explicit path.
    ///
    /// # Errors
    ///
    /// See [`Self::load_or_create`].
    pub fn load_or_create_at(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound {
                path: config_path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(config_path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error on TOML syntax errors or invalid screen constants.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.screen.validate()?;
        Ok(config)
    }
}

pub const CONFIG_TEMPLATE: &str = r##"# Rollscreen Configuration
# ~/.config/rollscreen/config.toml

[screen]
width = 1120            # pixels
height = 630            # pixels
hit_position = 0.4      # ratio of width
speed = 0.5             # pixels per clock unit, must be positive
note_size = 50          # pixels
lyric_size = 20         # pixels
roll_y_pos = 0.5        # ratio of height
long_line_height = 150  # pixels
line_height = 120       # pixels
screen_padding = 30     # pixels
buffer_text_position = [0.2, 0.8]
current_lyric_position = [0.5, 0.25]
next_lyric_position = [0.5, 0.3]
kana_lyric_position = [0.5, 0.8]
score_text_position = [0.9, 0.1]
cursor_hide_ms = 1000
romaji = true
high_score = 0

[screen.judge_colors]
perfect = "yellow"
great = "#2d1"
good = "#19a"
bad = "#aaa"
failed = "#a34"
neglect = "#39a"

[session]
# roll_file = "roll.json"
frame_rate = 60

[logging]
# Write logs to ~/.config/rollscreen/rollscreen.log as well as the console
enabled = false
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let config = RollscreenConfig::from_toml_str(CONFIG_TEMPLATE).unwrap();
        let defaults = ScreenConfig::default();

        assert!((config.screen.width - defaults.width).abs() < f64::EPSILON);
        assert!((config.screen.speed - defaults.speed).abs() < f64::EPSILON);
        assert_eq!(config.screen.judge_colors, defaults.judge_colors);
        assert_eq!(config.session.frame_rate, 60);
        assert!(!config.logging.enabled);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = RollscreenConfig::from_toml_str("").unwrap();
        assert!(config.screen.romaji);
        assert_eq!(config.screen.cursor_hide_ms, 1000);
        assert!(config.session.roll_file.is_none());
    }

    #[test]
    fn test_zero_speed_rejected() {
        let err = RollscreenConfig::from_toml_str("[screen]\nspeed = 0.0\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_nan_padding_rejected() {
        let err = RollscreenConfig::from_toml_str("[screen]\nscreen_padding = nan\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_negative_padding_rejected() {
        let err =
            RollscreenConfig::from_toml_str("[screen]\nscreen_padding = -700.0\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    }

    #[test]
    fn test_non_finite_sizes_rejected() {
        for field in ["lyric_size", "line_height", "long_line_height", "note_size"] {
            let doc = format!("[screen]\n{field} = inf\n");
            assert!(
                RollscreenConfig::from_toml_str(&doc).is_err(),
                "{field} = inf should be rejected"
            );
        }
    }

    #[test]
    fn test_valid_config_keeps_windows_ordered() {
        let config = ScreenConfig {
            screen_padding: 0.0,
            note_size: 0.0,
            ..ScreenConfig::default()
        };
        config.validate().unwrap();
        let geometry = crate::window::RollGeometry::from_config(&config);
        let window = geometry.window_for(10.0);
        assert!(window.emerge_time < window.vanish_time);
    }

    #[test]
    fn test_negative_speed_rejected() {
        let config = ScreenConfig {
            speed: -1.0,
            ..ScreenConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_hit_position_out_of_range_rejected() {
        let config = ScreenConfig {
            hit_position: 1.5,
            ..ScreenConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_color_is_a_parse_error() {
        let err =
            RollscreenConfig::from_toml_str("[screen.judge_colors]\nperfect = \"nope\"\n").unwrap_err();
        assert!(matches!(err, CoreError::ConfigParseError(_)));
    }

    #[test]
    fn test_judge_color_fallback() {
        let colors = JudgeColors::default();
        assert_eq!(colors.color_for("perfect"), Color::rgb(1.0, 1.0, 0.0));
        assert_eq!(colors.color_for("spectacular"), JudgeColors::FALLBACK);
    }

    #[test]
    fn test_load_or_create_writes_template() {
        let dir = std::env::temp_dir().join(format!("rollscreen-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        let _ = fs::remove_file(&path);

        let err = RollscreenConfig::load_or_create_at(&path).unwrap_err();
        assert!(matches!(err, CoreError::ConfigNotFound { .. }));
        assert!(path.exists());

        let config = RollscreenConfig::load_or_create_at(&path).unwrap();
        assert!((config.screen.hit_position - 0.4).abs() < f64::EPSILON);

        let _ = fs::remove_dir_all(&dir);
    }
}
