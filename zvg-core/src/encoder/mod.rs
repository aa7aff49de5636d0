//! Vector command encoder
//!
//! Turns vectors and dots into the smallest instruction sequence the
//! firmware understands. The encoder mirrors the beam state the board will
//! hold once everything queued so far has executed (position and resident
//! color) and never re-sends either: a vector starting where the beam
//! already is omits its position, and a vector in the resident color omits
//! its color word.
//!
//! Per vector:
//! 1. flip axes (bitwise complement) if the monitor needs it
//! 2. clip diagonal and ratio vectors with [`clip`]; axis-aligned vectors
//!    are clipped directly against the window bounds
//! 3. collapse to a dot if clipping left a single point
//! 4. pick the horizontal, vertical, 45 degree or ratio form with a short
//!    or long length
//! 5. record the deflection for the spot killer

mod assemble;

use zvg_protocol::command::bits;
use zvg_protocol::{ExtendedCommand, FLUSH_NOPS};

use crate::buffer::{BufferFull, CommandBuffer};
use crate::color::Color;
use crate::config::MonitorFlags;
use crate::geometry::{clip, Point, Segment, Window};
use crate::safety::{SpotKillMonitor, SpotKillStatus, KILL_DOTS};

use assemble::{assemble, Move};

/// Vector command encoder
#[derive(Debug, Clone)]
pub struct Encoder {
    flags: MonitorFlags,
    /// Beam position after everything encoded so far
    position: Point,
    /// Color the firmware currently holds
    resident: Color,
    /// Color for the next vector
    color: Color,
    window: Window,
    spot: SpotKillMonitor,
}

impl Encoder {
    /// Create an encoder mirroring a freshly powered-on board
    pub fn new(flags: MonitorFlags) -> Self {
        let mut encoder = Self {
            flags,
            position: Point::ORIGIN,
            resident: Color::DEFAULT,
            color: Color::DEFAULT,
            window: Window::OVERSCAN,
            spot: SpotKillMonitor::new(),
        };
        encoder.reset();
        encoder
    }

    /// Return to the power-on beam state
    ///
    /// The clip window opens to the largest area the monitor flags allow.
    pub fn reset(&mut self) {
        self.position = Point::ORIGIN;
        self.resident = Color::DEFAULT;
        self.set_clip_overscan();
        self.spot.reset();
    }

    pub fn flags(&self) -> MonitorFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: MonitorFlags) {
        self.flags = flags;
    }

    /// Beam position the board will hold
    pub fn position(&self) -> Point {
        self.position
    }

    /// Color the board will hold
    pub fn resident_color(&self) -> Color {
        self.resident
    }

    /// Color used for the next vector
    pub fn color(&self) -> Color {
        self.color
    }

    pub fn clip_window(&self) -> Window {
        self.window
    }

    pub fn spot_killer(&self) -> &SpotKillMonitor {
        &self.spot
    }

    // Colors

    /// Set the native color word; no monochrome mixing is applied
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_rgb24(&mut self, red: u8, green: u8, blue: u8) {
        self.color = Color::from_rgb24(red, green, blue, self.monochrome());
    }

    pub fn set_rgb16(&mut self, red: u8, green: u8, blue: u8) {
        self.color = Color::from_rgb16(red, green, blue, self.monochrome());
    }

    pub fn set_rgb15(&mut self, red: u8, green: u8, blue: u8) {
        self.color = Color::from_rgb15(red, green, blue, self.monochrome());
    }

    fn monochrome(&self) -> bool {
        self.flags.contains(MonitorFlags::MONOCHROME)
    }

    // Clip window

    /// Limit drawing to `window`, given in caller coordinates
    ///
    /// The window follows the axis flips, is clamped to the overscan (or
    /// visible, with `NO_OVERSCAN`) area, and inverted edges are swapped.
    pub fn set_clip_window(&mut self, window: Window) {
        let bounds = self.max_window();
        let min = bounds.clamp(self.flip(Point::new(window.x_min, window.y_min)));
        let max = bounds.clamp(self.flip(Point::new(window.x_max, window.y_max)));

        self.window = Window::new(
            min.x.min(max.x),
            min.y.min(max.y),
            min.x.max(max.x),
            min.y.max(max.y),
        );
    }

    /// Open the clip window to the largest area allowed
    pub fn set_clip_overscan(&mut self) {
        self.window = self.max_window();
    }

    /// Clip to the visible area
    pub fn set_clip_no_overscan(&mut self) {
        self.window = Window::VISIBLE;
    }

    fn max_window(&self) -> Window {
        if self.flags.contains(MonitorFlags::NO_OVERSCAN) {
            Window::VISIBLE
        } else {
            Window::OVERSCAN
        }
    }

    fn flip(&self, point: Point) -> Point {
        Point::new(
            if self.flags.contains(MonitorFlags::FLIP_X) {
                !point.x
            } else {
                point.x
            },
            if self.flags.contains(MonitorFlags::FLIP_Y) {
                !point.y
            } else {
                point.y
            },
        )
    }

    fn spot_kill(&self) -> bool {
        self.flags.contains(MonitorFlags::SPOT_KILL)
    }

    // Drawing

    /// Encode a vector in `color`
    pub fn encode_vector(
        &mut self,
        buf: &mut CommandBuffer,
        start: Point,
        end: Point,
        color: Color,
    ) -> Result<(), BufferFull> {
        self.set_color(color);
        self.vector(buf, start, end)
    }

    /// Encode a dot in `color`
    pub fn encode_dot(
        &mut self,
        buf: &mut CommandBuffer,
        at: Point,
        color: Color,
    ) -> Result<(), BufferFull> {
        self.encode_vector(buf, at, at, color)
    }

    /// Encode a vector in the current color
    ///
    /// Vectors entirely outside the clip window produce no bytes. On
    /// [`BufferFull`] nothing is appended and the beam state is unchanged.
    pub fn vector(
        &mut self,
        buf: &mut CommandBuffer,
        start: Point,
        end: Point,
    ) -> Result<(), BufferFull> {
        let mut start = self.flip(start);
        let mut end = self.flip(end);

        if start.x != end.x && start.y != end.y {
            match clip(Segment::new(start, end), &self.window) {
                Some(clipped) => {
                    start = clipped.start;
                    end = clipped.end;
                }
                None => return Ok(()),
            }
        }

        if start == end {
            if !self.window.contains(start) {
                return Ok(());
            }
            return self.tracked_point(buf, start, self.color);
        }

        let mut cmd = bits::VECTOR;
        let color = (self.color != self.resident).then_some(self.color);
        if color.is_some() {
            cmd |= bits::COLOR;
        }
        let absolute = start != self.position;
        if absolute {
            cmd |= bits::ABS;
        }

        let w = self.window;
        if start.y == end.y {
            let Some((xs, xe)) =
                clip_span(start.x, end.x, start.y, (w.x_min, w.x_max), (w.y_min, w.y_max), absolute)
            else {
                return Ok(());
            };
            start.x = xs;
            end.x = xe;
        } else if start.x == end.x {
            let Some((ys, ye)) =
                clip_span(start.y, end.y, start.x, (w.y_min, w.y_max), (w.x_min, w.x_max), absolute)
            else {
                return Ok(());
            };
            start.y = ys;
            end.y = ye;
        }

        // An axis-aligned vector clipped down to nothing is a dot
        if start == end {
            return self.tracked_point(buf, start, self.color);
        }

        let mv = Move::classify(
            start.x.abs_diff(end.x),
            start.y.abs_diff(end.y),
            end.x < start.x,
            end.y < start.y,
        );
        let bytes = assemble(cmd | mv.bits, color, absolute.then_some(start), mv.field())?;
        buf.push_command(&bytes)?;

        self.spot.count_vector();
        if self.spot_kill() {
            self.spot.track(start);
            self.spot.track(end);
        }

        self.position = end;
        self.resident = self.color;
        Ok(())
    }

    /// Encode a point drawn by the caller, counted and tracked for spot killing
    fn tracked_point(
        &mut self,
        buf: &mut CommandBuffer,
        at: Point,
        color: Color,
    ) -> Result<(), BufferFull> {
        self.point(buf, at, color)?;
        self.spot.count_vector();
        if self.spot_kill() {
            self.spot.track(at);
        }
        Ok(())
    }

    /// Encode a point at device coordinates, no clipping or tracking
    ///
    /// The point's color becomes resident but does not change the color of
    /// the next vector. Jumps that would need a long ratio are sent as
    /// absolute points, which take the same space and are cheaper for the
    /// firmware.
    fn point(
        &mut self,
        buf: &mut CommandBuffer,
        at: Point,
        color: Color,
    ) -> Result<(), BufferFull> {
        let color_word = (color != self.resident).then_some(color);
        let cmd = if color_word.is_some() { bits::COLOR } else { 0 };

        let dx = at.x.abs_diff(self.position.x);
        let dy = at.y.abs_diff(self.position.y);

        let bytes = if dx != 0 && dy != 0 && dx != dy && dx.max(dy) > 127 {
            assemble(cmd | bits::ABS, color_word, Some(at), &[])?
        } else {
            let mv = Move::classify(dx, dy, at.x < self.position.x, at.y < self.position.y);
            assemble(cmd | mv.bits, color_word, None, mv.field())?
        };
        buf.push_command(&bytes)?;

        self.position = at;
        self.resident = color;
        Ok(())
    }

    /// Center the beam
    ///
    /// The firmware also restores its default color.
    pub fn center(&mut self, buf: &mut CommandBuffer) -> Result<(), BufferFull> {
        buf.push(ExtendedCommand::Center.to_byte())?;
        self.position = Point::ORIGIN;
        self.resident = Color::DEFAULT;
        Ok(())
    }

    /// Start a frame
    ///
    /// With spot killing enabled, draws the two invisible kill dots if the
    /// previous frame drew too few vectors or did not deflect far enough,
    /// then starts tracking the new frame.
    pub fn start_frame(&mut self, buf: &mut CommandBuffer) -> Result<SpotKillStatus, BufferFull> {
        if !self.spot_kill() {
            return Ok(SpotKillStatus::Ok);
        }

        let status = self.spot.start_frame();
        if status == SpotKillStatus::DotsNeeded {
            for dot in KILL_DOTS {
                self.point(buf, self.flip(dot), Color::INVISIBLE)?;
            }
        }
        Ok(status)
    }

    /// End a frame: center, then flush the firmware's lookahead with no-ops
    pub fn end_frame(&mut self, buf: &mut CommandBuffer) -> Result<(), BufferFull> {
        let mut tail = [ExtendedCommand::Nop.to_byte(); FLUSH_NOPS + 1];
        tail[0] = ExtendedCommand::Center.to_byte();
        buf.push_command(&tail)?;

        self.position = Point::ORIGIN;
        self.resident = Color::DEFAULT;
        Ok(())
    }
}

/// Clip an axis-aligned vector against the window
///
/// `start`/`end` run along the moving axis, `across` is the fixed
/// coordinate. The start is only clamped when it is sent explicitly; a
/// start taken from the beam position is used as is.
fn clip_span(
    start: i32,
    end: i32,
    across: i32,
    along: (i32, i32),
    across_range: (i32, i32),
    clamp_start: bool,
) -> Option<(i32, i32)> {
    let (min, max) = along;
    if across < across_range.0 || across > across_range.1 {
        return None;
    }

    if end < start {
        if end > max || start < min {
            return None;
        }
        let start = if clamp_start { start.min(max) } else { start };
        Some((start, end.max(min)))
    } else {
        if end < min || start > max {
            return None;
        }
        let start = if clamp_start { start.max(min) } else { start };
        Some((start, end.min(max)))
    }
}
