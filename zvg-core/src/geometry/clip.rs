//! Parametric line clipping
//!
//! Liang-Barsky clipping in Q16 fixed point. The segment is
//! `P(t) = start + t * (end - start)` with `t` in `[0, 1]` (`0..=0x10000`);
//! each window edge narrows the accepted `[t_low, t_high]` interval and the
//! segment is rejected as soon as the interval is empty. Endpoints whose
//! bound never moved are returned untouched.

use super::{Point, Segment, Window};

/// Q16 representation of 1.0
const ONE: i64 = 0x10000;

/// Accepted parameter interval
struct Interval {
    low: i64,
    high: i64,
}

impl Interval {
    /// Narrow the interval against one edge
    ///
    /// `p` is the signed delta toward the edge, `q` the distance from the
    /// start point to the edge. Returns false if the segment is rejected.
    fn narrow(&mut self, p: i64, q: i64) -> bool {
        if p < 0 {
            let r = (q << 16) / p;
            if r > self.high {
                return false;
            }
            if r > self.low {
                self.low = r;
            }
        } else if p > 0 {
            let r = (q << 16) / p;
            if r < self.low {
                return false;
            }
            if r < self.high {
                self.high = r;
            }
        } else if q < 0 {
            // Parallel to this edge and outside it
            return false;
        }
        true
    }
}

/// Offset along one axis at parameter `t`, rounded to nearest
fn lerp(t: i64, delta: i64) -> i32 {
    ((t * delta + 0x8000) >> 16) as i32
}

/// Clip `segment` against `window`
///
/// Returns `None` if no part of the segment lies inside the window.
pub fn clip(segment: Segment, window: &Window) -> Option<Segment> {
    let (xs, ys) = (i64::from(segment.start.x), i64::from(segment.start.y));
    let dx = i64::from(segment.end.x) - xs;
    let dy = i64::from(segment.end.y) - ys;

    let mut t = Interval { low: 0, high: ONE };

    let accepted = t.narrow(-dx, xs - i64::from(window.x_min))
        && t.narrow(dx, i64::from(window.x_max) - xs)
        && t.narrow(-dy, ys - i64::from(window.y_min))
        && t.narrow(dy, i64::from(window.y_max) - ys);

    if !accepted {
        return None;
    }

    let mut clipped = segment;
    if t.high < ONE {
        clipped.end = Point::new(
            segment.start.x + lerp(t.high, dx),
            segment.start.y + lerp(t.high, dy),
        );
    }
    if t.low > 0 {
        clipped.start = Point::new(
            segment.start.x + lerp(t.low, dx),
            segment.start.y + lerp(t.low, dy),
        );
    }
    Some(clipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(x0: i32, y0: i32, x1: i32, y1: i32) -> Segment {
        Segment::new(Point::new(x0, y0), Point::new(x1, y1))
    }

    #[test]
    fn test_inside_unchanged() {
        let s = seg(-100, -50, 200, 75);
        assert_eq!(clip(s, &Window::VISIBLE), Some(s));
    }

    #[test]
    fn test_outside_rejected() {
        // Entirely right of the visible window
        assert_eq!(clip(seg(600, 0, 700, 100), &Window::VISIBLE), None);
        // Entirely below, crossing the X range
        assert_eq!(clip(seg(-700, -400, 700, -390), &Window::VISIBLE), None);
    }

    #[test]
    fn test_crossing_corner_rejected() {
        // Passes outside the top right corner
        assert_eq!(clip(seg(400, 500, 600, 300), &Window::VISIBLE), None);
    }

    #[test]
    fn test_clip_end_only() {
        // Start inside, end beyond the right edge: start keeps its exact value
        let clipped = clip(seg(0, 0, 1022, 511), &Window::VISIBLE).unwrap();
        assert_eq!(clipped.start, Point::new(0, 0));
        assert_eq!(clipped.end.x, 511);
        assert!((clipped.end.y - 255).abs() <= 1);
    }

    #[test]
    fn test_clip_both_ends() {
        let clipped = clip(seg(-1000, 0, 1000, 0), &Window::VISIBLE).unwrap();
        assert_eq!(clipped, seg(-512, 0, 511, 0));
    }

    #[test]
    fn test_parallel_edges() {
        // Vertical line outside the X range is rejected without dividing
        assert_eq!(clip(seg(520, -10, 520, 10), &Window::VISIBLE), None);
        // Dot inside is accepted unchanged
        assert_eq!(clip(seg(3, 4, 3, 4), &Window::VISIBLE), Some(seg(3, 4, 3, 4)));
        assert_eq!(clip(seg(3, 400, 3, 400), &Window::VISIBLE), None);
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn inside() -> impl Strategy<Value = Point> {
            (-600i32..=599, -472i32..=471).prop_map(|(x, y)| Point::new(x, y))
        }

        proptest! {
            #[test]
            fn prop_inside_segments_unchanged(a in inside(), b in inside()) {
                let s = Segment::new(a, b);
                prop_assert_eq!(clip(s, &Window::OVERSCAN), Some(s));
            }

            #[test]
            fn prop_right_of_window_rejected(
                x0 in 512i32..2000, x1 in 512i32..2000,
                y0 in -2000i32..2000, y1 in -2000i32..2000,
            ) {
                let s = Segment::new(Point::new(x0, y0), Point::new(x1, y1));
                prop_assert_eq!(clip(s, &Window::VISIBLE), None);
            }

            #[test]
            fn prop_above_window_rejected(
                x0 in -2000i32..2000, x1 in -2000i32..2000,
                y0 in 384i32..2000, y1 in 384i32..2000,
            ) {
                let s = Segment::new(Point::new(x0, y0), Point::new(x1, y1));
                prop_assert_eq!(clip(s, &Window::VISIBLE), None);
            }

            #[test]
            fn prop_clipped_endpoints_inside(
                x0 in -2000i32..2000, y0 in -2000i32..2000,
                x1 in -2000i32..2000, y1 in -2000i32..2000,
            ) {
                let s = Segment::new(Point::new(x0, y0), Point::new(x1, y1));
                if let Some(c) = clip(s, &Window::VISIBLE) {
                    // Rounding may land one unit past an edge
                    let slack = Window::new(-513, -385, 512, 384);
                    prop_assert!(slack.contains(c.start));
                    prop_assert!(slack.contains(c.end));
                }
            }
        }
    }
}
