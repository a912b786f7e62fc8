//! Accent color handling: strict `#RRGGBB` parsing, OKLCH conversion for CSS
//! custom properties and the lighter/darker variants used for hover states.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ThemeError;

lazy_static::lazy_static! {
    /// Exactly `#` followed by six hex digits; anything trailing is rejected.
    static ref HEX_COLOR_REGEX: Regex = Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap();
}

/// Amount used to derive the hover shade from an accent color.
pub const HOVER_DARKEN_AMOUNT: f64 = 0.15;

/// Amount used for the `-light` accent variant.
pub const LIGHT_VARIANT_AMOUNT: f64 = 0.15;

/// A validated `#RRGGBB` color. The original spelling (case) is preserved so
/// that what an admin saves is exactly what they read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub fn parse(value: &str) -> Result<Self, ThemeError> {
        if HEX_COLOR_REGEX.is_match(value) {
            Ok(HexColor(value.to_string()))
        } else {
            Err(ThemeError::InvalidColor(value.to_string()))
        }
    }

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        HexColor(format!("#{:02X}{:02X}{:02X}", r, g, b))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        let channel = |i: usize| u8::from_str_radix(&self.0[i..i + 2], 16).unwrap_or(0);
        (channel(1), channel(3), channel(5))
    }

    /// Scale every channel towards black by `amount` (0.0..=1.0).
    pub fn darken(&self, amount: f64) -> Self {
        let (r, g, b) = self.rgb();
        let scale = |c: u8| (f64::from(c) * (1.0 - amount)).round().clamp(0.0, 255.0) as u8;
        Self::from_rgb(scale(r), scale(g), scale(b))
    }

    /// Move every channel towards white by `amount` (0.0..=1.0).
    pub fn lighten(&self, amount: f64) -> Self {
        let (r, g, b) = self.rgb();
        let lift = |c: u8| {
            let c = f64::from(c);
            (c + (255.0 - c) * amount).round().clamp(0.0, 255.0) as u8
        };
        Self::from_rgb(lift(r), lift(g), lift(b))
    }

    /// The hover shade paired with this accent.
    pub fn derive_hover(&self) -> Self {
        self.darken(HOVER_DARKEN_AMOUNT)
    }

    /// WCAG relative luminance in `0.0..=1.0`.
    pub fn relative_luminance(&self) -> f64 {
        let (r, g, b) = self.rgb();
        0.2126 * srgb_to_linear(r) + 0.7152 * srgb_to_linear(g) + 0.0722 * srgb_to_linear(b)
    }

    pub fn to_oklch(&self) -> Oklch {
        let (r, g, b) = self.rgb();
        let (lr, lg, lb) = (srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b));

        let l = 0.412_221_470_8 * lr + 0.536_332_536_3 * lg + 0.051_445_992_9 * lb;
        let m = 0.211_903_498_2 * lr + 0.680_699_545_1 * lg + 0.107_396_956_6 * lb;
        let s = 0.088_302_461_9 * lr + 0.281_718_837_6 * lg + 0.629_978_700_5 * lb;

        let (l, m, s) = (l.cbrt(), m.cbrt(), s.cbrt());

        let lightness = 0.210_454_255_3 * l + 0.793_617_785 * m - 0.004_072_046_8 * s;
        let a = 1.977_998_495_1 * l - 2.428_592_205 * m + 0.450_593_709_9 * s;
        let b = 0.025_904_037_1 * l + 0.782_771_766_2 * m - 0.808_675_766 * s;

        let chroma = (a * a + b * b).sqrt();
        let mut hue = b.atan2(a).to_degrees();
        if hue < 0.0 {
            hue += 360.0;
        }

        Oklch {
            lightness,
            chroma,
            hue,
        }
    }
}

impl TryFrom<String> for HexColor {
    type Error = ThemeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        HexColor::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn srgb_to_linear(channel: u8) -> f64 {
    let c = f64::from(channel) / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// OKLCH coordinates; `Display` renders the CSS `oklch()` function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oklch {
    pub lightness: f64,
    pub chroma: f64,
    pub hue: f64,
}

impl fmt::Display for Oklch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "oklch({:.3} {:.3} {:.1})",
            self.lightness, self.chroma, self.hue
        )
    }
}
