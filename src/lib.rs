//! Knowledge Quest - a quiz-gated 2D platformer
//!
//! Core modules:
//! - `sim`: Per-frame platformer physics (body, coins, obstacles, gate)
//! - `quiz`: Question bank, identities and challenge selection
//! - `challenge`: Gate quiz and redeem episode state machine
//! - `session`: Level attempt lifecycle, screens and transitions
//! - `progress`: Per-subject unlocks and best scores
//! - `persistence`: Key/value store collaborator with JSON helpers
//! - `platform`: Browser storage and clock

pub mod audio;
pub mod challenge;
pub mod persistence;
pub mod platform;
pub mod progress;
pub mod quiz;
pub mod session;
pub mod settings;
pub mod sim;

pub use audio::Cue;
pub use progress::{ProgressBook, ScoreBoard};
pub use quiz::{QuestionBank, QuestionItem, SeenSet, Subject};
pub use session::{LevelSession, Overlay, Screen};
pub use settings::{Profile, Settings};

/// Game configuration constants
pub mod consts {
    /// Play-field dimensions (y grows downward)
    pub const FIELD_WIDTH: f32 = 960.0;
    pub const FIELD_HEIGHT: f32 = 540.0;
    /// Top of the ground plane
    pub const GROUND_Y: f32 = FIELD_HEIGHT - 60.0;

    /// Longest frame delta fed to the integrator (bounds tunneling)
    pub const MAX_FRAME_DT: f32 = 0.033;

    /// Player physics
    pub const GRAVITY: f32 = 1500.0; // px/s²
    pub const MOVE_SPEED: f32 = 280.0; // px/s
    pub const JUMP_VELOCITY: f32 = -560.0; // px/s, negative is up
    pub const PLAYER_WIDTH: f32 = 40.0;
    pub const PLAYER_HEIGHT: f32 = 50.0;
    pub const PLAYER_START_X: f32 = 40.0;

    /// Coin pickup rewards
    pub const COIN_SCORE: u32 = 10;
    pub const COIN_RADIUS: f32 = 10.0;

    /// Gate and obstacle geometry
    pub const GATE_WIDTH: f32 = 40.0;
    pub const GATE_HEIGHT: f32 = 60.0;
    pub const OBSTACLE_SIZE: f32 = 30.0;

    /// Highest level in a subject
    pub const MAX_LEVEL: u32 = 3;
    /// Questions per gate quiz or redeem episode
    pub const EPISODE_QUESTIONS: usize = 3;
    /// Correct (or incorrect) answers that decide an episode
    pub const EPISODE_DECIDING_COUNT: u32 = 2;

    /// Gate quiz scoring
    pub const GATE_CORRECT_SCORE: u32 = 50;
    pub const GATE_HINTED_SCORE: u32 = 35;
    pub const GATE_PASS_BONUS: u32 = 100;

    /// Redeem penalty and grace window
    pub const REDEEM_PENALTY: u32 = 20;
    pub const REDEEM_COOLDOWN_MS: f64 = 1200.0;
    pub const REDEEM_PUSH_GAP: f32 = 2.0;
    pub const REDEEM_FAIL_NOTICE_MS: f64 = 1000.0;
    /// Redeem countdown starts ticking at this many whole seconds
    pub const REDEEM_TICK_FROM_SECS: u32 = 3;

    /// Pause before the next level / before returning to world select
    pub const NEXT_LEVEL_DELAY_MS: f64 = 1000.0;
    pub const SUBJECT_COMPLETE_DELAY_MS: f64 = 1200.0;
}

/// Level time budget in seconds
pub fn level_time_for(level: u32) -> f32 {
    match level {
        1 => 60.0,
        2 => 45.0,
        3 => 35.0,
        _ => 60.0,
    }
}

/// Per-question gate quiz timer, shorter on higher levels
pub fn gate_question_secs(level: u32) -> f64 {
    match level {
        1 => 15.0,
        2 => 12.0,
        _ => 10.0,
    }
}

/// Per-question redeem timer, shorter on higher levels
pub fn redeem_question_secs(level: u32) -> f64 {
    match level {
        1 => 10.0,
        2 => 8.0,
        _ => 6.0,
    }
}

/// Format seconds as `m:ss` for the HUD
pub fn format_clock(seconds: f32) -> String {
    let s = seconds.max(0.0).floor() as u32;
    format!("{}:{:02}", s / 60, s % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(60.0), "1:00");
        assert_eq!(format_clock(44.7), "0:44");
        assert_eq!(format_clock(-3.0), "0:00");
    }

    #[test]
    fn test_timers_shrink_with_level() {
        assert!(gate_question_secs(1) > gate_question_secs(2));
        assert!(gate_question_secs(2) > gate_question_secs(3));
        assert_eq!(redeem_question_secs(3), 6.0);
        assert_eq!(level_time_for(2), 45.0);
        assert_eq!(level_time_for(9), 60.0);
    }
}
