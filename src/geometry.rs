// Hand landmark indices and small 2D helpers for the debug overlay.

use crate::types::Keypoint;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_TIP: usize = 20;
pub const NUM_HAND_LANDMARKS: usize = 21;

/// Bones drawn by the debug overlay: each finger chain plus the knuckle line.
pub const HAND_SKELETON: [(usize, usize); 23] = [
    (WRIST, THUMB_CMC), (1, 2), (2, 3), (3, THUMB_TIP),
    (WRIST, INDEX_MCP), (5, 6), (6, 7), (7, INDEX_TIP),
    (MIDDLE_MCP, 10), (10, 11), (11, MIDDLE_TIP),
    (RING_MCP, 14), (14, 15), (15, RING_TIP),
    (WRIST, PINKY_MCP), (17, 18), (18, 19), (19, PINKY_TIP),
    (INDEX_MCP, MIDDLE_MCP), (MIDDLE_MCP, RING_MCP), (RING_MCP, PINKY_MCP),
    (WRIST, MIDDLE_MCP), (WRIST, RING_MCP),
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl From<&Keypoint> for Point {
    fn from(k: &Keypoint) -> Self {
        Point { x: k.x, y: k.y }
    }
}

/// Intersection of the infinite lines through `a` and `b`.
/// `None` when the lines are parallel (or a segment is degenerate).
pub fn line_intersection(a: [Point; 2], b: [Point; 2]) -> Option<Point> {
    let y_diff_b = b[0].y - b[1].y;
    let x_diff_b = b[0].x - b[1].x;
    let top = (a[0].x - b[0].x) * y_diff_b - (a[0].y - b[0].y) * x_diff_b;
    let bot = (a[0].x - a[1].x) * y_diff_b - (a[0].y - a[1].y) * x_diff_b;
    if bot.abs() <= f32::EPSILON {
        return None;
    }
    let t = top / bot;
    Some(Point { x: a[0].x + t * (a[1].x - a[0].x), y: a[0].y + t * (a[1].y - a[0].y) })
}

/// Angle of (x, y) in radians, in (-PI, PI], with the x == 0 axis handled explicitly.
pub fn arctan360(x: f32, y: f32) -> f32 {
    use std::f32::consts::PI;
    if x == 0.0 {
        return if y >= 0.0 { PI / 2.0 } else { -PI / 2.0 };
    }
    let angle = (y / x).atan();
    if x > 0.0 {
        angle
    } else if y >= 0.0 {
        angle + PI
    } else {
        angle - PI
    }
}

/// Palm center: crossing of the diagonals of the wrist / thumb-base / index-knuckle /
/// pinky-knuckle quad. `None` for short landmark lists or a collapsed palm.
pub fn palm_center(keypoints: &[Keypoint]) -> Option<Point> {
    if keypoints.len() < NUM_HAND_LANDMARKS {
        return None;
    }
    let p = |i: usize| Point::from(&keypoints[i]);
    line_intersection([p(WRIST), p(INDEX_MCP)], [p(THUMB_CMC), p(PINKY_MCP)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn pt(x: f32, y: f32) -> Point {
        Point { x, y }
    }

    #[test]
    fn crossing_diagonals_meet_in_the_middle() {
        let p = line_intersection([pt(0.0, 0.0), pt(2.0, 2.0)], [pt(0.0, 2.0), pt(2.0, 0.0)]).unwrap();
        assert!((p.x - 1.0).abs() < 1e-6 && (p.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn intersection_may_lie_outside_the_segments() {
        let p = line_intersection([pt(0.0, 0.0), pt(1.0, 0.0)], [pt(3.0, -1.0), pt(3.0, 1.0)]).unwrap();
        assert!((p.x - 3.0).abs() < 1e-6 && p.y.abs() < 1e-6);
    }

    #[test]
    fn parallel_lines_have_no_intersection() {
        assert_eq!(line_intersection([pt(0.0, 0.0), pt(1.0, 1.0)], [pt(0.0, 1.0), pt(1.0, 2.0)]), None);
        assert_eq!(line_intersection([pt(0.0, 0.0), pt(0.0, 0.0)], [pt(0.0, 1.0), pt(1.0, 2.0)]), None);
    }

    #[test]
    fn arctan360_covers_all_quadrants() {
        assert!((arctan360(1.0, 1.0) - PI / 4.0).abs() < 1e-6);
        assert!((arctan360(-1.0, 1.0) - 3.0 * PI / 4.0).abs() < 1e-6);
        assert!((arctan360(-1.0, -1.0) + 3.0 * PI / 4.0).abs() < 1e-6);
        assert_eq!(arctan360(0.0, -2.0), -PI / 2.0);
        assert_eq!(arctan360(0.0, 0.0), PI / 2.0);
    }

    #[test]
    fn palm_center_needs_a_full_hand() {
        assert_eq!(palm_center(&[Keypoint::new(0.5, 0.5); 5]), None);
        let mut hand = [Keypoint::new(0.5, 0.5); NUM_HAND_LANDMARKS];
        hand[WRIST] = Keypoint::new(0.4, 0.6);
        hand[INDEX_MCP] = Keypoint::new(0.6, 0.4);
        hand[THUMB_CMC] = Keypoint::new(0.6, 0.6);
        hand[PINKY_MCP] = Keypoint::new(0.4, 0.4);
        let c = palm_center(&hand).unwrap();
        assert!((c.x - 0.5).abs() < 1e-6 && (c.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn skeleton_indices_are_in_range() {
        assert!(HAND_SKELETON.iter().all(|&(a, b)| a < NUM_HAND_LANDMARKS && b < NUM_HAND_LANDMARKS));
    }
}
