//! Color conversion
//!
//! The device takes a 16-bit color word laid out as `rrrrrggggggbbbbb`.
//! Monochrome monitors are driven from the green channel only, so in
//! monochrome mode every conversion collapses the three inputs onto the
//! brightest one ("brightest wins"), keeping green's extra bit.

use zvg_protocol::DEFAULT_COLOR;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Native 5/6/5 color word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Color(pub u16);

impl Default for Color {
    fn default() -> Self {
        Color::DEFAULT
    }
}

impl From<u16> for Color {
    fn from(word: u16) -> Self {
        Color(word)
    }
}

impl From<Color> for u16 {
    fn from(color: Color) -> Self {
        color.0
    }
}

impl Color {
    /// Power-on color, restored by every center-beam command
    pub const DEFAULT: Color = Color(DEFAULT_COLOR);

    /// Beam off
    pub const INVISIBLE: Color = Color(0x0000);

    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Red channel (0..=31)
    pub fn red(self) -> u8 {
        (self.0 >> 11) as u8 & 0x1F
    }

    /// Green channel (0..=63)
    pub fn green(self) -> u8 {
        (self.0 >> 5) as u8 & 0x3F
    }

    /// Blue channel (0..=31)
    pub fn blue(self) -> u8 {
        self.0 as u8 & 0x1F
    }

    /// Convert 8-bit-per-channel RGB
    ///
    /// Only the top 5/6/5 bits of each channel survive.
    pub fn from_rgb24(red: u8, green: u8, blue: u8, monochrome: bool) -> Self {
        let (mut r, mut g, mut b) = (u16::from(red), u16::from(green), u16::from(blue));

        if monochrome {
            g = r.max(g).max(b) & 0xFC;
            r = g & 0xF8;
            b = r;
        } else {
            r &= 0xF8;
            g &= 0xFC;
        }

        Color((r << 8) | (g << 3) | (b >> 3))
    }

    /// Convert 5/6/5 RGB; inputs above 31/63/31 are clamped
    pub fn from_rgb16(red: u8, green: u8, blue: u8, monochrome: bool) -> Self {
        let mut r = u16::from(red.min(31));
        let mut g = u16::from(green.min(63));
        let mut b = u16::from(blue.min(31));

        if monochrome {
            // Compare on the 6-bit green scale
            g = (r << 1).max(g).max(b << 1);
            r = g >> 1;
            b = r;
        }

        Color((r << 11) | (g << 5) | b)
    }

    /// Convert 5/5/5 RGB; inputs above 31 are clamped
    ///
    /// Green is widened by a trailing zero bit.
    pub fn from_rgb15(red: u8, green: u8, blue: u8, monochrome: bool) -> Self {
        let mut r = u16::from(red.min(31));
        let mut g = u16::from(green.min(31));
        let mut b = u16::from(blue.min(31));

        if monochrome {
            g = r.max(g).max(b);
            r = g;
            b = g;
        }

        Color((r << 11) | (g << 6) | b)
    }
}
