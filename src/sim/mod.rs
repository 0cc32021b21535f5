//! Platformer simulation module
//!
//! Physics and world geometry for one level attempt:
//! - Velocity-from-input horizontal movement, uniform gravity, edge-triggered jump
//! - Axis-aligned collision against ground, obstacles and the gate
//! - No rendering, storage or timer dependencies

pub mod collision;
pub mod layout;
pub mod state;
pub mod tick;

pub use collision::{Rect, coin_touches, push_clear_x, rects_overlap};
pub use layout::{gate_x_for, theme_for};
pub use state::{
    Coin, Gate, InputState, LevelLayout, Obstacle, PlayerBody, RedeemCooldown, SessionState, Theme,
};
pub use tick::{SimEvent, tick};
