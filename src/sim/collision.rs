//! Collision tests for the platformer world
//!
//! Everything is axis-aligned: the player body and obstacles are boxes,
//! coins are circles tested against the body's centre.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle, (x, y) is the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// Strict overlap test. Touching edges do not overlap.
#[inline]
pub fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    a.x < b.x + b.w && a.x + a.w > b.x && a.y < b.y + b.h && a.y + a.h > b.y
}

/// Coin pickup: body centre within `radius + min(w, h) / 2` of the coin
#[inline]
pub fn coin_touches(body: &Rect, coin_center: Vec2, coin_radius: f32) -> bool {
    let reach = coin_radius + body.w.min(body.h) / 2.0;
    body.center().distance_squared(coin_center) <= reach * reach
}

/// New x for a body overlapping `obstacle`: just clear of whichever side
/// is nearer the body's centre. Returns `None` if they do not overlap.
pub fn push_clear_x(body: &Rect, obstacle: &Rect, gap: f32) -> Option<f32> {
    if !rects_overlap(body, obstacle) {
        return None;
    }
    if body.center().x < obstacle.center().x {
        Some(obstacle.x - body.w - gap)
    } else {
        Some(obstacle.right() + gap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_overlap_and_touching() {
        let obstacle = Rect::new(100.0, 100.0, 30.0, 30.0);
        assert!(rects_overlap(&Rect::new(90.0, 90.0, 20.0, 20.0), &obstacle));
        // Right edge touches left edge exactly
        assert!(!rects_overlap(&Rect::new(60.0, 100.0, 40.0, 30.0), &obstacle));
        // Bottom touches top exactly
        assert!(!rects_overlap(&Rect::new(100.0, 50.0, 30.0, 50.0), &obstacle));
        // Contained
        assert!(rects_overlap(&Rect::new(110.0, 110.0, 5.0, 5.0), &obstacle));
    }

    #[test]
    fn test_coin_reach_uses_smaller_half_extent() {
        let body = Rect::new(0.0, 0.0, 40.0, 50.0); // centre (20, 25)
        // reach = 10 + 20 = 30
        assert!(coin_touches(&body, Vec2::new(20.0, 55.0), 10.0));
        assert!(!coin_touches(&body, Vec2::new(20.0, 55.1), 10.0));
        assert!(coin_touches(&body, Vec2::new(38.0, 49.0), 10.0));
    }

    #[test]
    fn test_push_clear_picks_nearer_side() {
        let obstacle = Rect::new(200.0, 450.0, 30.0, 30.0);
        let left = Rect::new(175.0, 430.0, 40.0, 50.0);
        assert_eq!(push_clear_x(&left, &obstacle, 2.0), Some(158.0));
        let right = Rect::new(215.0, 430.0, 40.0, 50.0);
        assert_eq!(push_clear_x(&right, &obstacle, 2.0), Some(232.0));
        let apart = Rect::new(0.0, 430.0, 40.0, 50.0);
        assert_eq!(push_clear_x(&apart, &obstacle, 2.0), None);
    }

    proptest! {
        #[test]
        fn prop_overlap_matches_interval_rule(
            x in -50i32..50, y in -50i32..50, w in 1i32..40, h in 1i32..40,
        ) {
            let obstacle = Rect::new(0.0, 0.0, 20.0, 20.0);
            let body = Rect::new(x as f32, y as f32, w as f32, h as f32);
            let expected = x < 20 && x + w > 0 && y < 20 && y + h > 0;
            prop_assert_eq!(rects_overlap(&body, &obstacle), expected);
            prop_assert_eq!(rects_overlap(&obstacle, &body), expected);
        }
    }
}
