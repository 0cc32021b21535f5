//! Level attempt state and world entities
//!
//! Everything a single level attempt mutates lives in `SessionState`. It is
//! created on level start and dropped on level exit.

use glam::Vec2;

use super::collision::{push_clear_x, Rect};
use crate::consts::*;
use crate::level_time_for;
use crate::quiz::Subject;

/// The player's body
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerBody {
    /// Top-left corner
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    pub grounded: bool,
}

impl PlayerBody {
    /// Standing on the ground at `x`
    pub fn standing_at(x: f32) -> Self {
        Self {
            pos: Vec2::new(x, GROUND_Y - PLAYER_HEIGHT),
            vel: Vec2::ZERO,
            size: Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT),
            grounded: true,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.size.x, self.size.y)
    }

    /// Teleport to `point` at rest on the ground
    pub fn respawn_at(&mut self, point: Vec2) {
        self.pos = point;
        self.vel = Vec2::ZERO;
        self.grounded = true;
    }
}

/// A collectible coin
#[derive(Debug, Clone, PartialEq)]
pub struct Coin {
    pub pos: Vec2,
    pub radius: f32,
    pub collected: bool,
}

/// Static hazard; touching one starts a redeem episode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub rect: Rect,
}

/// The quiz gate at the end of the level
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    pub rect: Rect,
    pub open: bool,
}

/// Per-subject colour theme (CSS colours)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub sky: &'static str,
    pub ground: &'static str,
    pub gate: &'static str,
}

/// Level geometry
#[derive(Debug, Clone, PartialEq)]
pub struct LevelLayout {
    pub coins: Vec<Coin>,
    pub obstacles: Vec<Obstacle>,
    pub gate: Gate,
    pub theme: Theme,
}

/// Held controls plus the jump latch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    /// Cleared by a jump, set again only once jump is released
    pub can_jump: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            left: false,
            right: false,
            jump: false,
            can_jump: true,
        }
    }
}

/// Grace window after a passed redeem during which one obstacle is inert
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedeemCooldown {
    pub obstacle: usize,
    pub until_ms: f64,
}

impl RedeemCooldown {
    pub fn suppresses(&self, obstacle: usize, now_ms: f64) -> bool {
        self.obstacle == obstacle && now_ms < self.until_ms
    }
}

/// State of one level attempt
#[derive(Debug, Clone)]
pub struct SessionState {
    pub subject: Subject,
    pub level: u32,
    pub score: u32,
    pub stars: u32,
    pub paused: bool,
    pub quiz_active: bool,
    pub redeem_active: bool,
    /// Seconds left on the level clock
    pub level_time_left: f32,
    /// Set once the body passes the field midpoint
    pub checkpoint_x: Option<f32>,
    pub respawn: Vec2,
    pub input: InputState,
    pub redeem_cooldown: Option<RedeemCooldown>,
    /// Terminal flags; at most one is ever set per attempt
    pub finished: bool,
    pub timed_out: bool,
    pub body: PlayerBody,
    pub layout: LevelLayout,
}

impl SessionState {
    /// Fresh attempt: zero score, full clock, body at the start, no checkpoint
    pub fn new(subject: Subject, level: u32) -> Self {
        let body = PlayerBody::standing_at(PLAYER_START_X);
        Self {
            subject,
            level,
            score: 0,
            stars: 0,
            paused: false,
            quiz_active: false,
            redeem_active: false,
            level_time_left: level_time_for(level),
            checkpoint_x: None,
            respawn: body.pos,
            input: InputState::default(),
            redeem_cooldown: None,
            finished: false,
            timed_out: false,
            body,
            layout: LevelLayout::build(subject, level),
        }
    }

    /// True while a gate quiz or redeem episode is open
    pub fn in_episode(&self) -> bool {
        self.quiz_active || self.redeem_active
    }

    /// Whether the physics tick may run
    pub fn simulating(&self) -> bool {
        !(self.paused || self.in_episode() || self.finished || self.timed_out)
    }

    /// Subtract from the score, never going below zero
    pub fn deduct(&mut self, points: u32) {
        self.score = self.score.saturating_sub(points);
    }

    /// Put the body back on the respawn point. A checkpoint can sit inside
    /// an obstacle, in which case the body lands just clear of it.
    pub fn respawn_body(&mut self) {
        self.body.respawn_at(self.respawn);
        let body = self.body.rect();
        let pushed = self
            .layout
            .obstacles
            .iter()
            .find_map(|o| push_clear_x(&body, &o.rect, REDEEM_PUSH_GAP));
        if let Some(x) = pushed {
            self.body.pos.x = x.clamp(0.0, FIELD_WIDTH - self.body.size.x);
        }
    }
}
