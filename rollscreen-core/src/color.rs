//! RGBA colors parsed from CSS-style strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An RGBA color with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const RED: Self = Self::rgb(1.0, 0.0, 0.0);
    pub const ORANGE: Self = Self::rgb(1.0, 165.0 / 255.0, 0.0);
    /// `#aaa`, used for muted notes.
    pub const MUTED: Self = Self::rgb(170.0 / 255.0, 170.0 / 255.0, 170.0 / 255.0);
    /// `#ddd`, the result cover.
    pub const LIGHT: Self = Self::rgb(221.0 / 255.0, 221.0 / 255.0, 221.0 / 255.0);

    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    #[must_use]
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Parse a CSS-style color: a handful of names, `#rgb`, `#rrggbb` or `#rrggbbaa`.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Some(hex) = input.strip_prefix('#') {
            return Self::parse_hex(hex);
        }

        let color = match input.to_ascii_lowercase().as_str() {
            "white" => Self::WHITE,
            "black" => Self::BLACK,
            "red" => Self::RED,
            "orange" => Self::ORANGE,
            "yellow" => Self::rgb(1.0, 1.0, 0.0),
            "green" => Self::rgb(0.0, 128.0 / 255.0, 0.0),
            "blue" => Self::rgb(0.0, 0.0, 1.0),
            "cyan" => Self::rgb(0.0, 1.0, 1.0),
            "magenta" => Self::rgb(1.0, 0.0, 1.0),
            "gray" | "grey" => Self::rgb(128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0),
            "transparent" => Self::BLACK.with_alpha(0.0),
            _ => return None,
        };
        Some(color)
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| f32::from(v) / 255.0);
        match hex.len() {
            3 => {
                let mut chars = hex.chars().map(|c| c.to_digit(16));
                let r = chars.next()??;
                let g = chars.next()??;
                let b = chars.next()??;
                // 0xf -> 0xff
                let expand = |v: u32| f32::from(u8::try_from(v * 17).unwrap_or(u8::MAX)) / 255.0;
                Some(Self::rgb(expand(r), expand(g), expand(b)))
            }
            6 => Some(Self::rgb(
                channel(hex.get(0..2)?)?,
                channel(hex.get(2..4)?)?,
                channel(hex.get(4..6)?)?,
            )),
            8 => Some(
                Self::rgb(
                    channel(hex.get(0..2)?)?,
                    channel(hex.get(2..4)?)?,
                    channel(hex.get(4..6)?)?,
                )
                .with_alpha(channel(hex.get(6..8)?)?),
            ),
            _ => None,
        }
    }

    /// Convert to hue (degrees), saturation and brightness.
    #[must_use]
    pub fn to_hsb(self) -> (f32, f32, f32) {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let delta = max - min;

        let hue = if delta == 0.0 {
            0.0
        } else if (max - self.r).abs() < f32::EPSILON {
            60.0 * (((self.g - self.b) / delta).rem_euclid(6.0))
        } else if (max - self.g).abs() < f32::EPSILON {
            60.0 * ((self.b - self.r) / delta + 2.0)
        } else {
            60.0 * ((self.r - self.g) / delta + 4.0)
        };
        let saturation = if max == 0.0 { 0.0 } else { delta / max };

        (hue, saturation, max)
    }

    /// Build a color from hue (degrees), saturation and brightness.
    #[must_use]
    pub fn from_hsb(hue: f32, saturation: f32, brightness: f32, alpha: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let c = brightness * saturation;
        let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
        let m = brightness - c;

        let (r, g, b) = match h {
            h if h < 1.0 => (c, x, 0.0),
            h if h < 2.0 => (x, c, 0.0),
            h if h < 3.0 => (0.0, c, x),
            h if h < 4.0 => (0.0, x, c),
            h if h < 5.0 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };

        Self {
            r: r + m,
            g: g + m,
            b: b + m,
            a: alpha,
        }
    }

    /// Shift brightness and saturation, clamping both to `0.0..=1.0`.
    #[must_use]
    pub fn adjust_hsb(self, brightness_delta: f32, saturation_delta: f32) -> Self {
        let (hue, saturation, brightness) = self.to_hsb();
        Self::from_hsb(
            hue,
            (saturation + saturation_delta).clamp(0.0, 1.0),
            (brightness + brightness_delta).clamp(0.0, 1.0),
            self.a,
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unrecognized color '{value}'"))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        write!(f, "#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))?;
        if self.a < 1.0 {
            write!(f, "{:02x}", byte(self.a))?;
        }
        Ok(())
    }
}
