//! The game screen: owns every primitive and routes events and frames.
//!
//! A [`Screen`] is driven from a single task. Discrete [`ScreenEvent`]s come
//! from the game collaborator and the input devices, and [`Screen::frame`] is
//! called once per display frame. Everything drawn lives in [`Screen::scene`].

use crate::color::Color;
use crate::config::ScreenConfig;
use crate::cursor::CursorAutoHide;
use crate::effects::JudgementEffects;
use crate::error::Result;
use crate::lyrics::{EstimatedTextMeasure, LyricDisplay, TextMeasure};
use crate::playback::{Key, PlayerState, Playback};
use crate::results::{GameResults, ResultScreen};
use crate::scene::{Justification, Point, Primitive, PrimitiveId, Scene, Shape};
use crate::scheduler::FrameScheduler;
use crate::score::ScoreSmoother;
use crate::timeline::Timeline;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "rollscreen::screen";

pub const START_PROMPT: &str = "Press enter or click here.";
const START_PROMPT_POSITION: [f64; 2] = [0.5, 0.8];
const START_PROMPT_FONT_SIZE: f64 = 45.0;

const COVER_ALPHA: f32 = 0.7;
const DEBUG_LINE_COUNT: usize = 7;
const DEBUG_FONT_SIZE: f64 = 10.0;
const SCORE_FONT_SIZE: f64 = 36.0;
const BUFFER_FONT_SIZE: f64 = 24.0;
const KANA_FONT_SIZE: f64 = 24.0;

/// Discrete events delivered to the screen.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenEvent {
    /// The roll and media are loaded
    ResourceReady,
    /// Everything is in place; wait for the player to start
    GameReady,
    Judgement { judge: String, combo: u32 },
    LyricChange {
        current: Option<String>,
        next: Option<String>,
    },
    GameEnd,
    PlayerStateChange(PlayerState),
    KeyDown(Key),
    MouseDown,
    MouseMove,
}

/// Where the screen is in the game flow. Decides what input does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Waiting for resources
    #[default]
    Loading,
    /// Start prompt shown
    AwaitingStart,
    /// Input goes to the scorer
    Started,
    /// Input is ignored
    Ended,
}

/// Fixed overlay created once per screen.
#[derive(Debug, Clone)]
struct Hud {
    debug_lines: [PrimitiveId; DEBUG_LINE_COUNT],
    score_text: PrimitiveId,
    buffer_text: PrimitiveId,
    kana_text: PrimitiveId,
}

impl Hud {
    fn spawn(config: &ScreenConfig, scene: &mut Scene) -> Self {
        let at = |ratio: [f64; 2]| Point::from_ratio(ratio, config.width, config.height);

        // Dims the video underneath
        scene.spawn(Shape::Rect {
            origin: Point::default(),
            width: config.width,
            height: config.height,
            fill: Color::BLACK.with_alpha(COVER_ALPHA),
        });

        let mut y = 0.0;
        let debug_lines = [(); DEBUG_LINE_COUNT].map(|()| {
            y += 20.0;
            scene.spawn(Shape::text(
                Point::new(20.0, y),
                "",
                DEBUG_FONT_SIZE,
                Justification::Left,
            ))
        });

        let score_text = scene.spawn(Shape::text(
            at(config.score_text_position),
            "0",
            SCORE_FONT_SIZE,
            Justification::Right,
        ));
        let buffer_text = scene.spawn(Shape::text(
            at(config.buffer_text_position),
            "",
            BUFFER_FONT_SIZE,
            Justification::Left,
        ));
        let kana_text = scene.spawn(Shape::text(
            at(config.kana_lyric_position),
            "",
            KANA_FONT_SIZE,
            Justification::Center,
        ));

        Self {
            debug_lines,
            score_text,
            buffer_text,
            kana_text,
        }
    }

    fn blank(&self, scene: &mut Scene) {
        for id in self.debug_lines {
            scene.set_text(id, "");
        }
        scene.set_text(self.buffer_text, "");
        scene.set_text(self.kana_text, "");
        scene.set_text(self.score_text, "0");
    }
}

/// The rendered game screen for one playback collaborator.
pub struct Screen<P: Playback> {
    playback: P,
    config: ScreenConfig,
    scene: Scene,
    hud: Hud,
    timeline: Timeline,
    effects: JudgementEffects,
    score: ScoreSmoother,
    lyrics: LyricDisplay,
    measure: Box<dyn TextMeasure + Send>,
    scheduler: FrameScheduler,
    cursor: CursorAutoHide,
    results: ResultScreen,
    hit_circle: Option<PrimitiveId>,
    prompt: Option<PrimitiveId>,
    phase: Phase,
    high_score: u64,
    new_record: bool,
}

impl<P: Playback> Screen<P> {
    /// Build the screen and its overlay.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::ConfigInvalid`] if the configuration fails
    /// validation.
    pub fn new(config: ScreenConfig, playback: P) -> Result<Self> {
        config.validate()?;

        let mut scene = Scene::new();
        let hud = Hud::spawn(&config, &mut scene);
        let at = |ratio: [f64; 2]| Point::from_ratio(ratio, config.width, config.height);
        let hit_anchor = Point::new(config.hit_x(), config.roll_y());

        info!(target: LOG_TARGET, "Screen initialized ({}x{})", config.width, config.height);

        Ok(Self {
            timeline: Timeline::new(&config),
            effects: JudgementEffects::new(hit_anchor, config.note_size),
            lyrics: LyricDisplay::new(
                at(config.current_lyric_position),
                at(config.next_lyric_position),
            ),
            cursor: CursorAutoHide::new(Duration::from_millis(config.cursor_hide_ms)),
            results: ResultScreen::new(config.width, config.height, config.judge_colors.clone()),
            high_score: config.high_score,
            new_record: false,
            score: ScoreSmoother::new(),
            measure: Box::new(EstimatedTextMeasure::default()),
            scheduler: FrameScheduler::new(),
            hit_circle: None,
            prompt: None,
            phase: Phase::Loading,
            playback,
            config,
            scene,
            hud,
        })
    }

    /// Use a real font metric for lyric layout.
    #[must_use]
    pub fn with_text_measure(mut self, measure: impl TextMeasure + Send + 'static) -> Self {
        self.measure = Box::new(measure);
        self
    }

    /// Route one discrete event.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidItemTime`] if a resource-ready event,
    /// or a reset requested by Escape, finds an item without a usable time.
    pub fn handle_event(&mut self, event: ScreenEvent, now: Instant) -> Result<()> {
        match event {
            ScreenEvent::ResourceReady => self.resource_ready()?,
            ScreenEvent::GameReady => self.game_ready(),
            ScreenEvent::Judgement { judge, combo } => {
                debug!(target: LOG_TARGET, "Judgement {} (combo {})", judge, combo);
                let color = self.config.judge_colors.color_for(&judge);
                self.effects.spawn(&judge, combo, color, now, &mut self.scene);
            }
            ScreenEvent::LyricChange { current, next } => {
                debug!(target: LOG_TARGET, "Lyric change: {:?} / {:?}", current, next);
                self.lyrics.show(
                    current.as_deref(),
                    next.as_deref(),
                    self.measure.as_ref(),
                    &mut self.scene,
                );
            }
            ScreenEvent::GameEnd => self.game_end(),
            ScreenEvent::PlayerStateChange(state) => {
                debug!(target: LOG_TARGET, "Player state: {}", state);
                self.cursor.set_playing(state == PlayerState::Playing);
            }
            ScreenEvent::KeyDown(key) => self.key_down(key)?,
            ScreenEvent::MouseDown => {
                if self.phase == Phase::AwaitingStart {
                    self.start();
                }
            }
            ScreenEvent::MouseMove => self.cursor.mouse_moved(now),
        }
        Ok(())
    }

    /// Advance one display frame.
    ///
    /// Diagnostics, overlay text and the result cover advance on every frame.
    /// The roll, the judgement effects and the score text only move while the
    /// player reports [`PlayerState::Playing`]. Once the game has ended, pop-ups
    /// still on screen keep their last opacity under the result cover and the
    /// score text keeps its last smoothed value.
    pub fn frame(&mut self, now: Instant) {
        self.playback.sync();

        let playback = &mut self.playback;
        if let Some(stats) = self.scheduler.tick(now, || playback.take_zero_calls()) {
            let [fps_line, _, zero_call_line, ..] = self.hud.debug_lines;
            self.scene.set_text(fps_line, &format!("FPS: {}", stats.fps));
            self.scene
                .set_text(zero_call_line, &format!("Zerocall FPS: {}", stats.zero_call_rate));
        }

        if self.playback.player_state() == PlayerState::Playing {
            self.update();
            self.effects.tick(now, &mut self.scene);
            // Scores stay far below 2^53
            #[allow(clippy::cast_precision_loss)]
            let target = self.playback.score() as f64;
            self.score.tick(target);
            self.scene.set_text(self.hud.score_text, &self.score.text());
        }

        self.refresh_overlay();
        self.results.tick(&mut self.scene);
    }

    /// Lay the roll out for the collaborator's current time.
    pub fn update(&mut self) {
        let run_time = self.playback.now() - self.playback.zero_time();
        self.timeline
            .update(self.playback.roll(), run_time, &mut self.scene);
    }

    /// Tear the session down and bring it back to the start prompt, as if the
    /// resources had just been loaded.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidItemTime`] if the roll can no longer
    /// be laid out. The start prompt is not shown in that case.
    pub fn reset(&mut self) -> Result<()> {
        info!(target: LOG_TARGET, "Resetting screen");
        self.playback.reset();

        self.timeline.clear(&mut self.scene);
        if let Some(hit_circle) = self.hit_circle.take() {
            self.scene.despawn(hit_circle);
        }
        if let Some(prompt) = self.prompt.take() {
            self.scene.despawn(prompt);
        }
        self.effects.clear(&mut self.scene);
        self.lyrics.clear(&mut self.scene);
        self.results.clear(&mut self.scene);
        self.score.reset();
        self.hud.blank(&mut self.scene);
        self.scheduler.reset();
        self.phase = Phase::Loading;

        self.resource_ready()?;
        self.game_ready();
        Ok(())
    }

    fn resource_ready(&mut self) -> Result<()> {
        let now = self.playback.now();
        self.timeline.prepare(self.playback.roll(), &mut self.scene)?;

        self.playback.set_zero_time(now);
        self.update();

        if let Some(hit_circle) = self.hit_circle.take() {
            self.scene.despawn(hit_circle);
        }
        self.hit_circle = Some(self.scene.spawn(Shape::Circle {
            center: Point::new(self.config.hit_x(), self.config.roll_y()),
            radius: self.config.note_size,
            fill: None,
            stroke: Some(Color::WHITE),
            stroke_width: 1.0,
        }));

        self.lyrics.show(
            self.playback.current_lyric(),
            self.playback.next_lyric(),
            self.measure.as_ref(),
            &mut self.scene,
        );

        info!(target: LOG_TARGET, "Resources ready, zero time {:.2}", now);
        Ok(())
    }

    fn game_ready(&mut self) {
        if !self.timeline.is_prepared() {
            warn!(target: LOG_TARGET, "Game ready before the roll was laid out, ignoring");
            return;
        }
        if self.prompt.is_none() {
            self.prompt = Some(self.scene.spawn(Shape::text(
                Point::from_ratio(START_PROMPT_POSITION, self.config.width, self.config.height),
                START_PROMPT,
                START_PROMPT_FONT_SIZE,
                Justification::Center,
            )));
        }
        self.phase = Phase::AwaitingStart;
        info!(target: LOG_TARGET, "Game is ready");
    }

    fn start(&mut self) {
        if let Some(prompt) = self.prompt.take() {
            self.scene.despawn(prompt);
        }
        self.phase = Phase::Started;
        info!(target: LOG_TARGET, "Starting game");
        self.playback.play();
    }

    fn key_down(&mut self, key: Key) -> Result<()> {
        match (self.phase, key) {
            (Phase::AwaitingStart, Key::Enter) => self.start(),
            (Phase::Started, Key::Escape) => self.reset()?,
            (Phase::Started, Key::Char(c)) if self.playback.player_state() == PlayerState::Playing => {
                self.playback.hit(c);
            }
            _ => {}
        }
        Ok(())
    }

    fn game_end(&mut self) {
        self.phase = Phase::Ended;

        let results = GameResults::new(
            self.playback.scorebook().clone(),
            self.playback.score(),
            self.playback.max_combo(),
            self.high_score,
        );
        if results.new_record {
            info!(target: LOG_TARGET, "New high score: {}", results.score);
            self.high_score = results.high_score;
            self.new_record = true;
        }
        info!(target: LOG_TARGET, "Game ended with score {}", results.score);
        self.results.begin(results, &mut self.scene);
    }

    fn refresh_overlay(&mut self) {
        let playback = &self.playback;
        let scene = &mut self.scene;
        let [_, measured_zero, _, active_objects, zero_time, time, _] = self.hud.debug_lines;

        scene.set_text(
            measured_zero,
            &format!("Measured Zero: {:.2}", playback.estimated_zero()),
        );
        let active = scene.len();
        scene.set_text(active_objects, &format!("Active Objects: {active}"));
        scene.set_text(zero_time, &format!("Zero Time: {:.2}", playback.zero_time()));
        scene.set_text(time, &format!("Time: {:.2}", playback.now()));
        scene.set_text(self.hud.buffer_text, playback.input_buffer());
        scene.set_text(self.hud.kana_text, playback.kana_lyric().unwrap_or_default());
    }

    #[must_use]
    pub const fn scene(&self) -> &Scene {
        &self.scene
    }

    #[must_use]
    pub const fn playback(&self) -> &P {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut P {
        &mut self.playback
    }

    #[must_use]
    pub const fn config(&self) -> &ScreenConfig {
        &self.config
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    #[must_use]
    pub const fn effects(&self) -> &JudgementEffects {
        &self.effects
    }

    #[must_use]
    pub const fn lyrics(&self) -> &LyricDisplay {
        &self.lyrics
    }

    #[must_use]
    pub const fn result_screen(&self) -> &ResultScreen {
        &self.results
    }

    #[must_use]
    pub const fn high_score(&self) -> u64 {
        self.high_score
    }

    /// Whether any game on this screen beat the configured high score.
    #[must_use]
    pub const fn new_record(&self) -> bool {
        self.new_record
    }

    #[must_use]
    pub fn cursor_visible(&self, now: Instant) -> bool {
        self.cursor.is_visible(now)
    }

    #[must_use]
    pub const fn hit_circle(&self) -> Option<PrimitiveId> {
        self.hit_circle
    }

    #[must_use]
    pub const fn prompt(&self) -> Option<PrimitiveId> {
        self.prompt
    }

    /// Text of a diagnostic line, for inspection.
    #[must_use]
    pub fn debug_line(&self, line: usize) -> Option<&str> {
        let id = self.hud.debug_lines.get(line)?;
        self.scene.get(*id).and_then(Primitive::text)
    }

    #[must_use]
    pub fn score_text(&self) -> Option<&str> {
        self.scene.get(self.hud.score_text).and_then(Primitive::text)
    }

    #[must_use]
    pub fn buffer_text(&self) -> Option<&str> {
        self.scene.get(self.hud.buffer_text).and_then(Primitive::text)
    }
}
