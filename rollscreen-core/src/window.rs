//! Visible time interval of each chart item.
//!
//! An item enters on the right edge and leaves on the left edge of the canvas.
//! Both edges are pushed out by the note radius and the screen padding so
//! nothing pops in or out while still visible.

use crate::chart::ChartItem;
use crate::config::ScreenConfig;
use crate::error::{CoreError, Result};

/// Playback-time interval during which an item is on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemWindow {
    pub emerge_time: f64,
    pub vanish_time: f64,
}

impl ItemWindow {
    /// Whether `run_time` lies in `[emerge_time, vanish_time]`.
    #[must_use]
    pub fn contains(&self, run_time: f64) -> bool {
        self.emerge_time <= run_time && run_time <= self.vanish_time
    }
}

/// Travel parameters shared by every item of a roll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollGeometry {
    pub speed: f64,
    /// Distance from the hit line to the right edge, padding included
    pub padding_right: f64,
    /// Distance from the hit line to the left edge, padding included
    pub padding_left: f64,
}

impl RollGeometry {
    #[must_use]
    pub fn from_config(config: &ScreenConfig) -> Self {
        Self {
            speed: config.speed,
            padding_right: config.width * (1.0 - config.hit_position)
                + config.note_size
                + config.screen_padding,
            padding_left: config.width * config.hit_position
                + config.note_size
                + config.screen_padding,
        }
    }

    #[must_use]
    pub fn window_for(&self, time: f64) -> ItemWindow {
        ItemWindow {
            emerge_time: (self.speed * time - self.padding_right) / self.speed,
            vanish_time: (self.speed * time + self.padding_left) / self.speed,
        }
    }
}

/// Compute the visible window of every item, in roll order.
///
/// All-or-nothing: if any item has a non-finite time no window is returned.
///
/// # Errors
///
/// Returns [`CoreError::InvalidItemTime`] for the first item without a usable
/// time, or [`CoreError::ConfigInvalid`] if the speed is not positive or the
/// paddings leave no travel between emerging and vanishing.
pub fn compute_windows(items: &[ChartItem], geometry: &RollGeometry) -> Result<Vec<ItemWindow>> {
    if !geometry.speed.is_finite() || geometry.speed <= 0.0 {
        return Err(CoreError::ConfigInvalid {
            message: format!("scroll speed must be positive, got {}", geometry.speed),
        });
    }
    let travel = geometry.padding_left + geometry.padding_right;
    if !travel.is_finite() || travel <= 0.0 {
        return Err(CoreError::ConfigInvalid {
            message: format!("roll travel must be positive, got {travel}"),
        });
    }

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if item.time.is_finite() {
                Ok(geometry.window_for(item.time))
            } else {
                Err(CoreError::InvalidItemTime {
                    index,
                    time: item.time,
                })
            }
        })
        .collect()
}
