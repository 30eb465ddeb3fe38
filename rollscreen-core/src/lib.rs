pub mod chart;
pub mod color;
pub mod config;
pub mod cursor;
pub mod driver;
pub mod effects;
pub mod error;
pub mod lyrics;
pub mod paths;
pub mod playback;
pub mod results;
pub mod scene;
pub mod scheduler;
pub mod score;
pub mod screen;
pub mod timeline;
pub mod window;

pub use chart::{parse_roll, ChartItem, ItemKind, NoteState};
pub use color::Color;
pub use config::{
    JudgeColors, LoggingConfig, RollscreenConfig, ScreenConfig, SessionConfig, CONFIG_TEMPLATE,
};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
pub use driver::{FrameHook, ScreenDriver};
pub use error::{CoreError, Result};
pub use lyrics::{EstimatedTextMeasure, TextMeasure};
pub use paths::{
    config_dir, config_path, log_file_path, record_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
    LOG_FILE_NAME, RECORD_FILE_NAME,
};
pub use playback::{Key, PlayerState, Playback};
pub use results::{GameResults, Judge, Scorebook};
pub use scene::{Point, Primitive, PrimitiveId, Scene, Shape};
pub use screen::{Phase, Screen, ScreenEvent};
pub use window::{compute_windows, ItemWindow, RollGeometry};
