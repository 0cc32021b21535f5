//! Level layout generation
//!
//! Layouts are fixed per level number; the subject only picks the colours.

use glam::Vec2;

use super::collision::Rect;
use super::state::{Coin, Gate, LevelLayout, Obstacle, Theme};
use crate::consts::*;
use crate::quiz::Subject;

/// Colour theme for a subject world
pub fn theme_for(subject: Subject) -> Theme {
    match subject {
        Subject::Math => Theme {
            sky: "#93c5fd",
            ground: "#065f46",
            gate: "#4338ca",
        },
        Subject::Science => Theme {
            sky: "#fde68a",
            ground: "#7c2d12",
            gate: "#ea580c",
        },
        Subject::English => Theme {
            sky: "#c7d2fe",
            ground: "#3730a3",
            gate: "#a78bfa",
        },
        Subject::Social => Theme {
            sky: "#cfd8dc",
            ground: "#1f2937",
            gate: "#22c55e",
        },
    }
}

/// Gate x position for a level
pub fn gate_x_for(level: u32) -> f32 {
    match level {
        1 => 840.0,
        2 => 880.0,
        _ => 900.0,
    }
}

/// (coins, obstacles) for a level
fn counts_for(level: u32) -> (u32, u32) {
    match level {
        1 => (5, 3),
        2 => (7, 5),
        _ => (9, 7),
    }
}

impl LevelLayout {
    /// Coins spread between the start and the gate at three heights,
    /// obstacles sitting on the ground, gate standing at `gate_x_for`.
    pub fn build(subject: Subject, level: u32) -> Self {
        let gate_x = gate_x_for(level);
        let (coin_count, obstacle_count) = counts_for(level);

        let coin_step = ((gate_x - 240.0) / coin_count as f32).floor();
        let coins = (0..coin_count)
            .map(|i| Coin {
                pos: Vec2::new(
                    140.0 + i as f32 * coin_step,
                    GROUND_Y - 60.0 - (i % 3) as f32 * 20.0,
                ),
                radius: COIN_RADIUS,
                collected: false,
            })
            .collect();

        let obstacle_step = ((gate_x - 300.0) / obstacle_count as f32).floor();
        let obstacles = (0..obstacle_count)
            .map(|i| Obstacle {
                rect: Rect::new(
                    220.0 + i as f32 * obstacle_step,
                    GROUND_Y - OBSTACLE_SIZE,
                    OBSTACLE_SIZE,
                    OBSTACLE_SIZE,
                ),
            })
            .collect();

        log::debug!(
            "Layout {} L{}: {} coins, {} obstacles, gate at {}",
            subject.as_str(),
            level,
            coin_count,
            obstacle_count,
            gate_x
        );

        Self {
            coins,
            obstacles,
            gate: Gate {
                rect: Rect::new(gate_x, GROUND_Y - GATE_HEIGHT, GATE_WIDTH, GATE_HEIGHT),
                open: false,
            },
            theme: theme_for(subject),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_one_layout() {
        let layout = LevelLayout::build(Subject::Math, 1);
        assert_eq!(layout.coins.len(), 5);
        assert_eq!(layout.obstacles.len(), 3);
        assert_eq!(layout.gate.rect.x, 840.0);
        assert_eq!(layout.gate.rect.bottom(), GROUND_Y);

        let xs: Vec<f32> = layout.coins.iter().map(|c| c.pos.x).collect();
        assert_eq!(xs, vec![140.0, 260.0, 380.0, 500.0, 620.0]);
        assert_eq!(layout.coins[2].pos.y, GROUND_Y - 100.0);

        let ox: Vec<f32> = layout.obstacles.iter().map(|o| o.rect.x).collect();
        assert_eq!(ox, vec![220.0, 400.0, 580.0]);
        assert!(layout.obstacles.iter().all(|o| o.rect.bottom() == GROUND_Y));
    }

    #[test]
    fn test_counts_grow_with_level() {
        let l2 = LevelLayout::build(Subject::Science, 2);
        let l3 = LevelLayout::build(Subject::Science, 3);
        assert_eq!((l2.coins.len(), l2.obstacles.len()), (7, 5));
        assert_eq!((l3.coins.len(), l3.obstacles.len()), (9, 7));
        assert_eq!(l3.gate.rect.x, 900.0);
        // Everything sits before the gate
        assert!(l3.obstacles.iter().all(|o| o.rect.right() < l3.gate.rect.x));
        assert_eq!(l3.theme, theme_for(Subject::Science));
    }
}
