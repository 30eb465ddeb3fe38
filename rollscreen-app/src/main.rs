mod record;
mod simulated;

use crate::record::HighScoreRecord;
use crate::simulated::{demo_roll, SimulatedPlayback};
use rollscreen_core::{
    parse_roll, ChartItem, CoreError, Key, Playback, RollscreenConfig, Screen, ScreenDriver,
    ScreenEvent, TomlParseError,
};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const APP_NAME: &str = "Rollscreen";

/// Dependencies stay quiet unless `RUST_LOG` asks for more.
const DEFAULT_LOG_FILTER: &str = "warn,rollscreen=info";

/// How long the result screen stays up before the session closes.
const RESULT_HOLD_SECONDS: u64 = 3;

fn main() {
    // Check config for logging.enabled before full config load
    let file_logging_enabled = check_file_logging_enabled();
    init_tracing(file_logging_enabled);

    // Load config or create template on first run
    let config = match RollscreenConfig::load_or_create() {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            info!(
                "Created a configuration template at {}. Edit it and restart {APP_NAME}.",
                path.display()
            );
            std::process::exit(0);
        }
        Err(CoreError::ConfigParseError(parse_error)) => {
            report_config_parse_error(&parse_error, &RollscreenConfig::config_path());
            std::process::exit(1);
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let roll = match load_roll(config.session.roll_file.as_deref()) {
        Ok(roll) => roll,
        Err(e) => {
            error!("Failed to load roll: {e}");
            std::process::exit(1);
        }
    };
    info!("Loaded roll with {} items", roll.len());

    let mut screen_config = config.screen.clone();
    if let Some(record) = HighScoreRecord::load() {
        screen_config.high_score = screen_config.high_score.max(record.high_score);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    // Create shared cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Set up Ctrl+C handler to trigger graceful shutdown
    let ctrlc_token = cancel_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down gracefully...");
        ctrlc_token.cancel();
    }) {
        error!("Failed to set Ctrl+C handler: {}", e);
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let playback = SimulatedPlayback::new(roll, event_tx.clone());
    let screen = match Screen::new(screen_config, playback) {
        Ok(screen) => screen,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    // Nobody is at the keyboard, so start right away
    for event in [
        ScreenEvent::ResourceReady,
        ScreenEvent::GameReady,
        ScreenEvent::KeyDown(Key::Enter),
    ] {
        if let Err(e) = event_tx.send(event) {
            error!("Failed to queue startup event: {e}");
        }
    }

    let frame_rate = config.session.frame_rate;
    let driver = ScreenDriver::new(screen, event_rx, frame_rate, cancel_token.clone())
        .with_frame_hook(session_monitor(frame_rate, cancel_token));

    info!("{APP_NAME} running at {frame_rate} fps");
    let screen = runtime.block_on(driver.run());
    drop(event_tx);

    if let Some(results) = screen.result_screen().results() {
        for line in results.lines() {
            info!("{line}");
        }
        if results.new_record {
            info!("New high score!");
            HighScoreRecord::from_results(results).save();
        }
    }

    info!("{APP_NAME} exiting");
}

/// Load the roll from `roll_file` (relative paths resolve against the config
/// directory), or fall back to the built-in demo roll.
fn load_roll(roll_file: Option<&Path>) -> rollscreen_core::Result<Vec<ChartItem>> {
    let Some(roll_file) = roll_file else {
        info!("No roll file configured, using the demo roll");
        return Ok(demo_roll());
    };

    let path = if roll_file.is_relative() {
        rollscreen_core::config_dir().join(roll_file)
    } else {
        roll_file.to_path_buf()
    };
    let content = std::fs::read_to_string(&path)?;
    parse_roll(&content)
}

/// Logs a summary once per second and closes the session a few seconds after
/// the results are up.
fn session_monitor(
    frame_rate: u32,
    cancel_token: CancellationToken,
) -> impl FnMut(&Screen<SimulatedPlayback>, u64) + Send + 'static {
    let frames_per_second = u64::from(frame_rate.max(1));
    let mut results_shown_at: Option<u64> = None;

    move |screen, frame| {
        if frame % frames_per_second == 0 {
            let playback = screen.playback();
            info!(
                "t={:.0} phase={:?} objects={} items={} effects={} score={} combo={}",
                playback.now() - playback.zero_time(),
                screen.phase(),
                screen.scene().len(),
                screen.timeline().live_count(),
                screen.effects().len(),
                screen.score_text().unwrap_or_default(),
                playback.combo(),
            );
        }

        if screen.result_screen().is_shown() {
            let shown_at = *results_shown_at.get_or_insert(frame);
            if frame - shown_at >= frames_per_second * RESULT_HOLD_SECONDS {
                cancel_token.cancel();
            }
        }
    }
}

fn report_config_parse_error(parse_error: &TomlParseError, config_path: &Path) {
    error!(
        "Failed to parse config file at {}:\n{}\nFix the file or delete it to regenerate the template.",
        config_path.display(),
        parse_error
    );
}

/// Peek at `logging.enabled` before the full config is parsed, so file
/// logging also covers config load errors.
fn check_file_logging_enabled() -> bool {
    std::fs::read_to_string(RollscreenConfig::config_path())
        .is_ok_and(|content| file_logging_requested(&content))
}

/// A malformed document counts as "off"; the full load reports the error.
fn file_logging_requested(content: &str) -> bool {
    content
        .parse::<toml::Table>()
        .ok()
        .as_ref()
        .and_then(|table| table.get("logging"))
        .and_then(|logging| logging.get("enabled"))
        .and_then(toml::Value::as_bool)
        .unwrap_or(false)
}

fn open_log_file() -> Option<File> {
    let log_path = rollscreen_core::log_file_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match File::create(&log_path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Failed to create log file at {}: {e}", log_path.display());
            None
        }
    }
}

/// Console logging, plus a plain-text copy in the config directory when asked.
fn init_tracing(file_logging_enabled: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let file_layer = file_logging_enabled.then(open_log_file).flatten().map(|file| {
        tracing_subscriber::fmt::layer()
            .with_writer(Arc::new(file))
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .init();
}
