//! Device coordinate geometry
//!
//! Coordinates are signed integers centered on the screen. The visible
//! area spans X -512..=511 and Y -384..=383; the overscan area extends that
//! to X -600..=599 and Y -472..=471.

mod clip;

pub use clip::clip;
pub use zvg_protocol::Point;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis-aligned clip rectangle, inclusive on all edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Window {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl Window {
    /// Visible screen area
    pub const VISIBLE: Window = Window::new(-512, -384, 511, 383);

    /// Largest area the beam can reach
    pub const OVERSCAN: Window = Window::new(-600, -472, 599, 471);

    pub const fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Returns true if `point` lies inside or on the edge of the window
    pub fn contains(&self, point: Point) -> bool {
        (self.x_min..=self.x_max).contains(&point.x) && (self.y_min..=self.y_max).contains(&point.y)
    }

    /// Clamp a point onto the window
    pub fn clamp(&self, point: Point) -> Point {
        Point::new(
            point.x.clamp(self.x_min, self.x_max),
            point.y.clamp(self.y_min, self.y_max),
        )
    }
}

impl Default for Window {
    fn default() -> Self {
        Window::OVERSCAN
    }
}

/// Line segment between two points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// A segment with identical endpoints draws a dot
    pub fn is_dot(&self) -> bool {
        self.start == self.end
    }

    pub fn is_horizontal(&self) -> bool {
        self.start.y == self.end.y
    }

    pub fn is_vertical(&self) -> bool {
        self.start.x == self.end.x
    }
}
