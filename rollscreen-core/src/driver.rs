//! Async loop feeding frame ticks and events into a [`Screen`].
//!
//! Both inputs are serialized through one task, so an event is never handled
//! in the middle of a frame.

use crate::playback::Playback;
use crate::screen::{Screen, ScreenEvent};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const LOG_TARGET: &str = "rollscreen::driver";

/// Called after every frame with the screen and the frame count.
pub type FrameHook<P> = Box<dyn FnMut(&Screen<P>, u64) + Send>;

pub struct ScreenDriver<P: Playback> {
    screen: Screen<P>,
    events: mpsc::UnboundedReceiver<ScreenEvent>,
    frame_interval: Duration,
    cancel_token: CancellationToken,
    frame_hook: Option<FrameHook<P>>,
}

impl<P: Playback> ScreenDriver<P> {
    /// A `frame_rate` of zero is treated as one frame per second.
    #[must_use]
    pub fn new(
        screen: Screen<P>,
        events: mpsc::UnboundedReceiver<ScreenEvent>,
        frame_rate: u32,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            screen,
            events,
            frame_interval: Duration::from_secs(1) / frame_rate.max(1),
            cancel_token,
            frame_hook: None,
        }
    }

    #[must_use]
    pub fn with_frame_hook(mut self, hook: impl FnMut(&Screen<P>, u64) + Send + 'static) -> Self {
        self.frame_hook = Some(Box::new(hook));
        self
    }

    /// Run until cancelled or until every event sender is gone, then hand the
    /// screen back.
    pub async fn run(mut self) -> Screen<P> {
        let mut ticker = tokio::time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut frames: u64 = 0;

        info!(target: LOG_TARGET, "Screen driver started ({:?} per frame)", self.frame_interval);

        loop {
            tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => {
                    info!(target: LOG_TARGET, "Screen driver shutting down");
                    break;
                }
                event = self.events.recv() => {
                    let Some(event) = event else {
                        info!(target: LOG_TARGET, "Event channel closed, stopping driver");
                        break;
                    };
                    let now = tokio::time::Instant::now().into_std();
                    if let Err(e) = self.screen.handle_event(event, now) {
                        error!(target: LOG_TARGET, "Failed to handle screen event: {}", e);
                    }
                }
                tick = ticker.tick() => {
                    self.screen.frame(tick.into_std());
                    frames += 1;
                    if let Some(hook) = self.frame_hook.as_mut() {
                        hook(&self.screen, frames);
                    }
                }
            }
        }

        self.screen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScreenConfig;
    use crate::playback::{Key, PlayerState};
    use crate::screen::tests::{roll, FakePlayback};
    use crate::screen::Phase;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn screen(roll: Vec<crate::chart::ChartItem>) -> Screen<FakePlayback> {
        Screen::new(ScreenConfig::default(), FakePlayback::new(roll)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_until_cancelled() {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let driver = ScreenDriver::new(screen(roll()), rx, 60, cancel.clone());

        for event in [
            ScreenEvent::ResourceReady,
            ScreenEvent::GameReady,
            ScreenEvent::KeyDown(Key::Enter),
            ScreenEvent::PlayerStateChange(PlayerState::Playing),
        ] {
            tx.send(event).unwrap();
        }
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            canceller.cancel();
        });

        let screen = driver.run().await;
        assert_eq!(screen.phase(), Phase::Started);
        assert_eq!(screen.playback().plays, 1);
        assert!(screen.playback().syncs >= 25);
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_senders_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = ScreenDriver::new(screen(roll()), rx, 60, CancellationToken::new());
        tx.send(ScreenEvent::ResourceReady).unwrap();
        drop(tx);

        let screen = driver.run().await;
        assert!(screen.hit_circle().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_errors_do_not_stop_the_loop() {
        let mut broken = roll();
        broken[0].time = f64::NAN;
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = ScreenDriver::new(screen(broken), rx, 60, CancellationToken::new());
        tx.send(ScreenEvent::ResourceReady).unwrap();
        tx.send(ScreenEvent::GameReady).unwrap();
        tx.send(ScreenEvent::MouseMove).unwrap();
        drop(tx);

        let screen = driver.run().await;
        assert!(screen.hit_circle().is_none());
        assert!(screen.prompt().is_none());
        assert_eq!(screen.phase(), Phase::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_hook_sees_every_frame() {
        let (tx, rx) = mpsc::unbounded_channel::<ScreenEvent>();
        let cancel = CancellationToken::new();
        let seen = Arc::new(AtomicU64::new(0));
        let hook_seen = Arc::clone(&seen);
        let hook_cancel = cancel.clone();

        let driver = ScreenDriver::new(screen(roll()), rx, 10, cancel).with_frame_hook(
            move |_screen, frame| {
                hook_seen.store(frame, Ordering::SeqCst);
                if frame == 5 {
                    hook_cancel.cancel();
                }
            },
        );

        let screen = driver.run().await;
        assert_eq!(seen.load(Ordering::SeqCst), 5);
        assert_eq!(screen.playback().syncs, 5);
        drop(tx);
    }
}
