//! Per-frame simulation tick
//!
//! Advances the body by one (clamped) frame delta and reports what happened.
//! The tick never opens quizzes itself; the level session reacts to the
//! returned events.

use super::collision::{coin_touches, rects_overlap};
use super::state::SessionState;
use crate::consts::*;

/// Things the level session must react to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    Jumped,
    CoinCollected { index: usize },
    CheckpointReached { x: f32 },
    /// Body overlaps an obstacle that is not under cooldown
    ObstacleHit { index: usize },
    /// Body reached the closed gate
    GateReached,
    /// Body fully passed the open gate
    LevelFinished,
    /// Level clock ran out
    LevelTimeout,
}

/// Advance the attempt by `dt` seconds (clamped to `MAX_FRAME_DT`).
///
/// No-op while paused, during an episode, or after the attempt ended.
/// Stops early on any event that hands control to the session.
pub fn tick(state: &mut SessionState, dt: f32, now_ms: f64) -> Vec<SimEvent> {
    let mut events = Vec::new();
    if !state.simulating() {
        return events;
    }
    let dt = dt.clamp(0.0, MAX_FRAME_DT);

    let input = &mut state.input;
    let body = &mut state.body;

    // Horizontal: velocity straight from input, no acceleration
    body.vel.x = 0.0;
    if input.left {
        body.vel.x = -MOVE_SPEED;
    }
    if input.right {
        body.vel.x = MOVE_SPEED;
    }
    body.pos.x += body.vel.x * dt;

    // Gravity, then jump on the rising edge only
    body.vel.y += GRAVITY * dt;
    if input.jump && body.grounded && input.can_jump {
        body.vel.y = JUMP_VELOCITY;
        body.grounded = false;
        input.can_jump = false;
        events.push(SimEvent::Jumped);
    }
    if !input.jump {
        input.can_jump = true;
    }
    body.pos.y += body.vel.y * dt;

    // Ground
    if body.pos.y + body.size.y >= GROUND_Y {
        body.pos.y = GROUND_Y - body.size.y;
        body.vel.y = 0.0;
        body.grounded = true;
    }

    // Field bounds
    body.pos.x = body.pos.x.clamp(0.0, FIELD_WIDTH - body.size.x);

    let rect = body.rect();

    // Coins
    for (index, coin) in state.layout.coins.iter_mut().enumerate() {
        if coin.collected {
            continue;
        }
        if coin_touches(&rect, coin.pos, coin.radius) {
            coin.collected = true;
            state.stars += 1;
            state.score += COIN_SCORE;
            events.push(SimEvent::CoinCollected { index });
        }
    }

    // Mid-level checkpoint, once per attempt
    if state.checkpoint_x.is_none() && rect.x > FIELD_WIDTH * 0.5 {
        let x = (FIELD_WIDTH * 0.5).floor();
        state.checkpoint_x = Some(x);
        state.respawn = glam::Vec2::new(x, GROUND_Y - rect.h);
        events.push(SimEvent::CheckpointReached { x });
    }

    // Obstacles: first live overlap wins
    let cooldown = state.redeem_cooldown;
    let hit = state.layout.obstacles.iter().position(|o| rects_overlap(&rect, &o.rect));
    if let Some(index) = hit {
        if cooldown.is_some_and(|c| c.suppresses(index, now_ms)) {
            log::trace!("Obstacle {} under cooldown", index);
        } else {
            events.push(SimEvent::ObstacleHit { index });
            return events;
        }
    }
    if cooldown.is_some_and(|c| now_ms >= c.until_ms) {
        state.redeem_cooldown = None;
    }

    // Gate
    let gate = &state.layout.gate;
    if !gate.open && rect.right() >= gate.rect.x {
        events.push(SimEvent::GateReached);
        return events;
    }
    // Finish line, capped at the furthest reachable x
    let finish_x = gate.rect.right().min(FIELD_WIDTH - rect.w);
    if gate.open && rect.x >= finish_x {
        state.finished = true;
        events.push(SimEvent::LevelFinished);
        return events;
    }

    // Level clock
    state.level_time_left = (state.level_time_left - dt).max(0.0);
    if state.level_time_left <= 0.0 {
        state.timed_out = true;
        events.push(SimEvent::LevelTimeout);
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::Subject;
    use crate::sim::state::RedeemCooldown;
    use glam::Vec2;

    const DT: f32 = 1.0 / 60.0;

    fn fresh() -> SessionState {
        SessionState::new(Subject::Math, 1)
    }

    /// Park the body somewhere with nothing around it
    fn clear_spot(state: &mut SessionState) {
        state.layout.obstacles.clear();
        state.layout.coins.clear();
    }

    #[test]
    fn test_walk_right() {
        let mut state = fresh();
        clear_spot(&mut state);
        state.input.right = true;
        let events = tick(&mut state, DT, 0.0);
        assert!(events.is_empty());
        assert!((state.body.pos.x - (40.0 + MOVE_SPEED * DT)).abs() < 1e-3);
        assert!(state.body.grounded);
        assert_eq!(state.body.pos.y, GROUND_Y - PLAYER_HEIGHT);
    }

    #[test]
    fn test_delta_is_clamped() {
        let mut state = fresh();
        clear_spot(&mut state);
        state.input.right = true;
        tick(&mut state, 1.0, 0.0);
        assert!((state.body.pos.x - (40.0 + MOVE_SPEED * MAX_FRAME_DT)).abs() < 1e-3);
        assert!((state.level_time_left - (60.0 - MAX_FRAME_DT)).abs() < 1e-4);
    }

    #[test]
    fn test_jump_needs_release_between_jumps() {
        let mut state = fresh();
        clear_spot(&mut state);
        state.input.jump = true;
        assert_eq!(tick(&mut state, DT, 0.0), vec![SimEvent::Jumped]);
        assert!(!state.body.grounded);

        // Hold jump until landing; no second jump
        let mut jumps = 0;
        for _ in 0..120 {
            jumps += tick(&mut state, DT, 0.0)
                .iter()
                .filter(|e| **e == SimEvent::Jumped)
                .count();
        }
        assert_eq!(jumps, 0);
        assert!(state.body.grounded);

        // Release, press again
        state.input.jump = false;
        tick(&mut state, DT, 0.0);
        state.input.jump = true;
        assert_eq!(tick(&mut state, DT, 0.0), vec![SimEvent::Jumped]);
    }

    #[test]
    fn test_bounds_clamp() {
        let mut state = fresh();
        clear_spot(&mut state);
        state.input.left = true;
        for _ in 0..30 {
            tick(&mut state, DT, 0.0);
        }
        assert_eq!(state.body.pos.x, 0.0);
    }

    #[test]
    fn test_coin_collected_once() {
        let mut state = fresh();
        state.layout.obstacles.clear();
        let coin = state.layout.coins[0].pos;
        state.body.pos = coin - state.body.size / 2.0;
        state.body.grounded = false;
        state.body.vel.y = -GRAVITY * DT; // hover for one tick
        let events = tick(&mut state, DT, 0.0);
        assert!(events.contains(&SimEvent::CoinCollected { index: 0 }));
        assert_eq!((state.stars, state.score), (1, 10));

        let events = tick(&mut state, DT, 0.0);
        assert!(!events.iter().any(|e| matches!(e, SimEvent::CoinCollected { .. })));
        assert_eq!(state.stars, 1);
    }

    #[test]
    fn test_walking_passes_under_coins() {
        let mut state = fresh();
        state.layout.obstacles.clear();
        state.input.right = true;
        for _ in 0..120 {
            tick(&mut state, DT, 0.0);
        }
        assert_eq!(state.stars, 0);
    }

    #[test]
    fn test_checkpoint_set_once() {
        let mut state = fresh();
        clear_spot(&mut state);
        state.body.pos.x = 481.0;
        let events = tick(&mut state, DT, 0.0);
        assert!(events.contains(&SimEvent::CheckpointReached { x: 480.0 }));
        assert_eq!(state.respawn, Vec2::new(480.0, GROUND_Y - PLAYER_HEIGHT));

        state.body.pos.x = 700.0;
        let events = tick(&mut state, DT, 0.0);
        assert!(events.is_empty());
        assert_eq!(state.checkpoint_x, Some(480.0));
    }

    #[test]
    fn test_obstacle_hit_and_cooldown() {
        let mut state = fresh();
        state.layout.coins.clear();
        state.body.pos.x = 200.0; // overlaps obstacle 0 at x=220
        assert_eq!(tick(&mut state, DT, 0.0), vec![SimEvent::ObstacleHit { index: 0 }]);

        state.redeem_cooldown = Some(RedeemCooldown {
            obstacle: 0,
            until_ms: 1200.0,
        });
        assert!(tick(&mut state, DT, 500.0).is_empty());
        assert!(state.redeem_cooldown.is_some());

        assert_eq!(
            tick(&mut state, DT, 1300.0),
            vec![SimEvent::ObstacleHit { index: 0 }]
        );
    }

    #[test]
    fn test_gate_then_finish() {
        let mut state = fresh();
        clear_spot(&mut state);
        state.body.pos.x = 800.0; // right edge exactly at the gate
        assert_eq!(tick(&mut state, DT, 0.0), vec![SimEvent::GateReached]);
        let clock = state.level_time_left;

        state.layout.gate.open = true;
        assert!(tick(&mut state, DT, 0.0).is_empty());
        assert!(state.level_time_left < clock);

        state.body.pos.x = 880.0;
        assert_eq!(tick(&mut state, DT, 0.0), vec![SimEvent::LevelFinished]);
        assert!(state.finished);
        // Terminal: nothing else happens
        assert!(tick(&mut state, DT, 0.0).is_empty());
    }

    #[test]
    fn test_last_level_finish_is_reachable() {
        let mut state = SessionState::new(Subject::Math, 3);
        clear_spot(&mut state);
        state.layout.gate.open = true;
        state.input.right = true;
        let mut finished = false;
        for _ in 0..400 {
            finished |= tick(&mut state, DT, 0.0).contains(&SimEvent::LevelFinished);
        }
        assert!(finished);
        assert_eq!(state.body.pos.x, FIELD_WIDTH - PLAYER_WIDTH);
    }

    #[test]
    fn test_timeout_is_terminal() {
        let mut state = fresh();
        clear_spot(&mut state);
        state.level_time_left = 0.01;
        assert_eq!(tick(&mut state, DT, 0.0), vec![SimEvent::LevelTimeout]);
        assert!(state.timed_out);
        state.layout.gate.open = true;
        state.body.pos.x = 900.0;
        assert!(tick(&mut state, DT, 0.0).is_empty());
        assert!(!state.finished);
    }

    #[test]
    fn test_suspended_while_paused_or_in_episode() {
        let mut state = fresh();
        clear_spot(&mut state);
        state.input.right = true;
        let before = state.body.pos;

        state.paused = true;
        tick(&mut state, DT, 0.0);
        state.paused = false;
        state.quiz_active = true;
        tick(&mut state, DT, 0.0);
        state.quiz_active = false;
        state.redeem_active = true;
        tick(&mut state, DT, 0.0);

        assert_eq!(state.body.pos, before);
        assert_eq!(state.level_time_left, 60.0);
    }
}
