//! Spot-killer deflection tracking

use crate::geometry::{Point, Window};

/// Fewer vectors than this in a frame always triggers kill dots
pub const SPOT_KILL_THRESHOLD: u32 = 600;

/// A frame must reach at least this far in every direction
pub const SAFE_BOUNDS: Window = Window::new(-384, -300, 384, 300);

/// Calibration dots drawn to defeat the spot killer, in drawing order
pub const KILL_DOTS: [Point; 2] = [Point::new(599, -472), Point::new(-600, 471)];

/// Result of a spot-kill check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpotKillStatus {
    /// Last frame deflected far enough
    Ok,
    /// Kill dots must be drawn before the next frame
    DotsNeeded,
}

/// Per-frame deflection tracker
#[derive(Debug, Clone)]
pub struct SpotKillMonitor {
    /// Vectors drawn since the last frame start
    vectors: u32,
    /// Extent of all tracked endpoints, starting at the center
    extent: Window,
}

impl Default for SpotKillMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SpotKillMonitor {
    pub fn new() -> Self {
        Self {
            vectors: 0,
            extent: Window::new(0, 0, 0, 0),
        }
    }

    /// Forget everything tracked so far
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Count one drawn vector
    pub fn count_vector(&mut self) {
        self.vectors = self.vectors.saturating_add(1);
    }

    pub fn track_x(&mut self, x: i32) {
        self.extent.x_min = self.extent.x_min.min(x);
        self.extent.x_max = self.extent.x_max.max(x);
    }

    pub fn track_y(&mut self, y: i32) {
        self.extent.y_min = self.extent.y_min.min(y);
        self.extent.y_max = self.extent.y_max.max(y);
    }

    /// Track both coordinates of a point
    pub fn track(&mut self, point: Point) {
        self.track_x(point.x);
        self.track_y(point.y);
    }

    pub fn vectors(&self) -> u32 {
        self.vectors
    }

    /// Extent reached this frame
    pub fn extent(&self) -> Window {
        self.extent
    }

    /// Check whether the tracked frame needs kill dots
    pub fn check(&self) -> SpotKillStatus {
        if self.vectors < SPOT_KILL_THRESHOLD
            || self.extent.x_min > SAFE_BOUNDS.x_min
            || self.extent.x_max < SAFE_BOUNDS.x_max
            || self.extent.y_min > SAFE_BOUNDS.y_min
            || self.extent.y_max < SAFE_BOUNDS.y_max
        {
            return SpotKillStatus::DotsNeeded;
        }
        SpotKillStatus::Ok
    }

    /// Close the tracked frame: check it, then reset for the next one
    pub fn start_frame(&mut self) -> SpotKillStatus {
        let status = self.check();
        self.reset();
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_frame() -> SpotKillMonitor {
        let mut monitor = SpotKillMonitor::new();
        for _ in 0..SPOT_KILL_THRESHOLD {
            monitor.count_vector();
        }
        monitor.track(Point::new(-500, -350));
        monitor.track(Point::new(500, 350));
        monitor
    }

    #[test]
    fn test_new_frame_needs_dots() {
        assert_eq!(SpotKillMonitor::new().check(), SpotKillStatus::DotsNeeded);
    }

    #[test]
    fn test_full_deflection_ok() {
        assert_eq!(full_frame().check(), SpotKillStatus::Ok);
    }

    #[test]
    fn test_too_few_vectors() {
        let mut monitor = SpotKillMonitor::new();
        monitor.track(Point::new(-500, -350));
        monitor.track(Point::new(500, 350));
        for _ in 0..SPOT_KILL_THRESHOLD - 1 {
            monitor.count_vector();
        }
        assert_eq!(monitor.check(), SpotKillStatus::DotsNeeded);
    }

    #[test]
    fn test_each_edge_required() {
        // One unit short of the safe bound on a single edge
        let edges = [
            Point::new(-383, 0),
            Point::new(383, 0),
            Point::new(0, -299),
            Point::new(0, 299),
        ];
        for (skip, _) in edges.iter().enumerate() {
            let mut monitor = SpotKillMonitor::new();
            for _ in 0..SPOT_KILL_THRESHOLD {
                monitor.count_vector();
            }
            let reach = [
                Point::new(-384, 0),
                Point::new(384, 0),
                Point::new(0, -300),
                Point::new(0, 300),
            ];
            for (i, point) in reach.iter().enumerate() {
                monitor.track(if i == skip { edges[i] } else { *point });
            }
            assert_eq!(monitor.check(), SpotKillStatus::DotsNeeded, "edge {}", skip);
        }
    }

    #[test]
    fn test_start_frame_resets() {
        let mut monitor = full_frame();
        assert_eq!(monitor.start_frame(), SpotKillStatus::Ok);
        assert_eq!(monitor.vectors(), 0);
        assert_eq!(monitor.extent(), Window::new(0, 0, 0, 0));
        assert_eq!(monitor.start_frame(), SpotKillStatus::DotsNeeded);
    }
}
