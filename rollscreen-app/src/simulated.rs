//! An autoplaying stand-in for the video player and the typing scorer.
//!
//! Every note is typed perfectly the moment it reaches the hit line, so a
//! session can be watched from the logs without any input device.

use rollscreen_core::{
    ChartItem, ItemKind, NoteState, PlayerState, Playback, ScreenEvent, Scorebook,
};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Playback keeps running this long after the last item before the game ends.
const END_TAIL_MS: f64 = 1500.0;
const PERFECT_SCORE: u64 = 100;
const GREAT_SCORE: u64 = 70;
/// Every nth note is judged "great" instead of "perfect".
const GREAT_EVERY: usize = 7;

/// Media clock in milliseconds that only runs while playing.
#[derive(Debug, Clone, Copy, Default)]
struct MediaClock {
    position: f64,
    running_since: Option<Instant>,
}

impl MediaClock {
    fn now(&self) -> f64 {
        self.running_since.map_or(self.position, |since| {
            self.position + since.elapsed().as_secs_f64() * 1000.0
        })
    }

    fn start(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    fn stop(&mut self) {
        self.position = self.now();
        self.running_since = None;
    }
}

pub struct SimulatedPlayback {
    clock: MediaClock,
    zero_time: f64,
    initial_roll: Vec<ChartItem>,
    roll: Vec<ChartItem>,
    state: PlayerState,
    events: UnboundedSender<ScreenEvent>,
    next_note: usize,
    next_lyric_marker: usize,
    judged: usize,
    score: u64,
    combo: u32,
    max_combo: u32,
    scorebook: Scorebook,
    zero_calls: u32,
    typed: String,
    current_lyric: Option<String>,
    next_lyric: Option<String>,
}

impl SimulatedPlayback {
    #[must_use]
    pub fn new(roll: Vec<ChartItem>, events: UnboundedSender<ScreenEvent>) -> Self {
        let mut playback = Self {
            clock: MediaClock::default(),
            zero_time: 0.0,
            initial_roll: roll.clone(),
            roll,
            state: PlayerState::Unstarted,
            events,
            next_note: 0,
            next_lyric_marker: 0,
            judged: 0,
            score: 0,
            combo: 0,
            max_combo: 0,
            scorebook: Scorebook::default(),
            zero_calls: 0,
            typed: String::new(),
            current_lyric: None,
            next_lyric: None,
        };
        playback.next_lyric = playback.lyric_after(0);
        playback
    }

    fn send(&self, event: ScreenEvent) {
        if self.events.send(event).is_err() {
            warn!("Screen event receiver is gone");
        }
    }

    fn set_state(&mut self, state: PlayerState) {
        if self.state != state {
            self.state = state;
            self.send(ScreenEvent::PlayerStateChange(state));
        }
    }

    /// Lyric markers are non-note items carrying text.
    fn is_lyric_marker(item: &ChartItem) -> bool {
        !item.is_note() && !item.text.is_empty()
    }

    fn lyric_after(&self, from: usize) -> Option<String> {
        self.roll
            .iter()
            .skip(from)
            .find(|item| Self::is_lyric_marker(item))
            .map(|item| item.text.clone())
    }

    fn end_time(&self) -> f64 {
        self.roll.last().map_or(0.0, |item| item.time) + END_TAIL_MS
    }

    /// Judge every note and pass every lyric marker up to `run_time`.
    pub(crate) fn autoplay(&mut self, run_time: f64) {
        loop {
            let Some(index) = self
                .roll
                .iter()
                .skip(self.next_note)
                .position(ChartItem::is_note)
                .map(|offset| self.next_note + offset)
            else {
                break;
            };
            if self.roll[index].time > run_time {
                break;
            }
            self.next_note = index + 1;
            self.clear_note(index);
        }

        while let Some(item) = self.roll.get(self.next_lyric_marker) {
            if item.time > run_time {
                break;
            }
            let index = self.next_lyric_marker;
            self.next_lyric_marker += 1;
            if Self::is_lyric_marker(item) {
                self.current_lyric = Some(item.text.clone());
                self.next_lyric = self.lyric_after(index + 1);
                debug!("Lyric marker {} passed", index);
                self.send(ScreenEvent::LyricChange {
                    current: self.current_lyric.clone(),
                    next: self.next_lyric.clone(),
                });
            }
        }

        if run_time > self.end_time() {
            info!("Reached the end of the roll");
            self.clock.stop();
            self.set_state(PlayerState::Ended);
            self.send(ScreenEvent::GameEnd);
        }
    }

    fn clear_note(&mut self, index: usize) {
        self.judged += 1;
        let judge = if self.judged % GREAT_EVERY == 0 {
            "great"
        } else {
            "perfect"
        };

        let note = &mut self.roll[index];
        note.state = NoteState::Cleared;
        note.remaining_text.clear();
        self.typed = std::mem::take(&mut note.remaining_romaji);

        self.combo += 1;
        self.max_combo = self.max_combo.max(self.combo);
        self.score += if judge == "perfect" {
            PERFECT_SCORE
        } else {
            GREAT_SCORE
        };
        self.scorebook.record_cleared(judge);
        self.send(ScreenEvent::Judgement {
            judge: judge.to_string(),
            combo: self.combo,
        });
    }

    #[must_use]
    pub const fn combo(&self) -> u32 {
        self.combo
    }
}

impl Playback for SimulatedPlayback {
    fn now(&self) -> f64 {
        self.clock.now()
    }

    fn zero_time(&self) -> f64 {
        self.zero_time
    }

    fn set_zero_time(&mut self, zero_time: f64) {
        self.zero_time = zero_time;
    }

    fn roll(&self) -> &[ChartItem] {
        &self.roll
    }

    fn player_state(&self) -> PlayerState {
        self.state
    }

    fn score(&self) -> u64 {
        self.score
    }

    fn max_combo(&self) -> u32 {
        self.max_combo
    }

    fn scorebook(&self) -> &Scorebook {
        &self.scorebook
    }

    fn play(&mut self) {
        info!("Starting simulated playback");
        self.clock.start();
        self.set_state(PlayerState::Playing);
    }

    fn hit(&mut self, key: char) {
        self.typed.push(key);
    }

    fn reset(&mut self) {
        info!("Resetting simulated playback");
        self.clock = MediaClock::default();
        self.roll.clone_from(&self.initial_roll);
        self.next_note = 0;
        self.next_lyric_marker = 0;
        self.judged = 0;
        self.score = 0;
        self.combo = 0;
        self.max_combo = 0;
        self.scorebook = Scorebook::default();
        self.typed.clear();
        self.current_lyric = None;
        self.next_lyric = self.lyric_after(0);
        self.set_state(PlayerState::Unstarted);
    }

    fn input_buffer(&self) -> &str {
        &self.typed
    }

    fn take_zero_calls(&mut self) -> u32 {
        std::mem::take(&mut self.zero_calls)
    }

    fn kana_lyric(&self) -> Option<&str> {
        self.roll[self.next_note..]
            .iter()
            .find(|item| item.is_note())
            .map(|item| item.text.as_str())
    }

    fn current_lyric(&self) -> Option<&str> {
        self.current_lyric.as_deref()
    }

    fn next_lyric(&self) -> Option<&str> {
        self.next_lyric.as_deref()
    }

    fn sync(&mut self) {
        if self.state != PlayerState::Playing {
            return;
        }
        self.zero_calls += 1;
        let run_time = self.now() - self.zero_time;
        self.autoplay(run_time);
    }
}

/// A short built-in roll: one measure per lyric line, one note per syllable.
#[must_use]
pub fn demo_roll() -> Vec<ChartItem> {
    const MEASURE_MS: f64 = 2400.0;
    const BEAT_MS: f64 = MEASURE_MS / 8.0;
    const LEAD_IN_MS: f64 = 2000.0;
    let lines: [(&str, &[(&str, &str)]); 3] = [
        (
            "きらきら¥|ひかる",
            &[("き", "ki"), ("ら", "ra"), ("き", "ki"), ("ら", "ra"), ("ひ", "hi"), ("か", "ka"), ("る", "ru")],
        ),
        (
            "おそらの¥|ほしよ",
            &[("お", "o"), ("そ", "so"), ("ら", "ra"), ("の", "no"), ("ほ", "ho"), ("し", "shi"), ("よ", "yo")],
        ),
        (
            "まばたき¥|しては",
            &[("ま", "ma"), ("ば", "ba"), ("た", "ta"), ("き", "ki"), ("し", "shi"), ("て", "te"), ("は", "wa")],
        ),
    ];

    let mut roll = Vec::new();
    let mut start = LEAD_IN_MS;
    for (lyric, syllables) in lines {
        let mut marker = ChartItem::new(0, start, ItemKind::LongLine);
        marker.text = lyric.to_string();
        roll.push(marker);

        let mut end = start;
        for (beat, (kana, romaji)) in (0u32..).zip(syllables) {
            let time = start + f64::from(beat) * BEAT_MS;
            if beat > 0 && beat % 2 == 0 {
                roll.push(ChartItem::new(0, time, ItemKind::Line));
            }
            let note = ChartItem::note(0, time, kana, romaji);
            roll.push(if *romaji == "wa" { note.with_mercy("ha") } else { note });
            end = time + BEAT_MS;
        }
        roll.push(ChartItem::new(0, end, ItemKind::Stop));
        start += MEASURE_MS;
    }

    for (index, item) in roll.iter_mut().enumerate() {
        item.index = index;
    }
    roll
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::UnboundedReceiver<ScreenEvent>) -> Vec<ScreenEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn test_demo_roll_is_ordered() {
        let roll = demo_roll();
        assert!(roll.windows(2).all(|pair| pair[0].time <= pair[1].time));
        assert!(roll.iter().enumerate().all(|(i, item)| item.index == i));
        assert_eq!(roll.iter().filter(|item| item.is_note()).count(), 21);
        assert_eq!(
            roll.iter()
                .filter(|item| SimulatedPlayback::is_lyric_marker(item))
                .count(),
            3
        );
    }

    #[test]
    fn test_autoplay_clears_notes_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut playback = SimulatedPlayback::new(demo_roll(), tx);
        assert_eq!(playback.next_lyric(), Some("きらきら¥|ひかる"));

        playback.autoplay(2000.0 + 300.0 * 6.0);
        let judgements: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                ScreenEvent::Judgement { judge, combo } => Some((judge, combo)),
                _ => None,
            })
            .collect();

        assert_eq!(judgements.len(), 7);
        assert_eq!(judgements[6], ("great".to_string(), 7));
        assert_eq!(playback.score(), 6 * PERFECT_SCORE + GREAT_SCORE);
        assert_eq!(playback.max_combo(), 7);
        assert_eq!(playback.input_buffer(), "ru");
        assert_eq!(playback.kana_lyric(), Some("お"));
        assert!(playback
            .roll()
            .iter()
            .filter(|item| item.is_note())
            .take(7)
            .all(|item| item.state == NoteState::Cleared && item.remaining_text.is_empty()));
    }

    #[test]
    fn test_lyric_markers_emit_changes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut playback = SimulatedPlayback::new(demo_roll(), tx);

        playback.autoplay(2000.0);
        let changes: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|event| matches!(event, ScreenEvent::LyricChange { .. }))
            .collect();
        assert_eq!(
            changes,
            vec![ScreenEvent::LyricChange {
                current: Some("きらきら¥|ひかる".to_string()),
                next: Some("おそらの¥|ほしよ".to_string()),
            }]
        );
    }

    #[test]
    fn test_game_ends_after_tail() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut playback = SimulatedPlayback::new(demo_roll(), tx);
        playback.play();

        playback.autoplay(1.0e6);
        let events = drain(&mut rx);
        assert_eq!(playback.player_state(), PlayerState::Ended);
        assert_eq!(events.last(), Some(&ScreenEvent::GameEnd));
        assert_eq!(playback.scorebook().count(rollscreen_core::Judge::Great), 3);
        assert_eq!(playback.max_combo(), 21);
    }

    #[test]
    fn test_reset_restores_roll() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut playback = SimulatedPlayback::new(demo_roll(), tx);
        playback.play();
        playback.autoplay(5000.0);
        assert!(playback.score() > 0);

        playback.reset();
        assert_eq!(playback.roll(), demo_roll().as_slice());
        assert_eq!(playback.score(), 0);
        assert_eq!(playback.combo(), 0);
        assert_eq!(playback.player_state(), PlayerState::Unstarted);
        assert!(playback.now().abs() < f64::EPSILON);
    }
}
