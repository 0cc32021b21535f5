//! Level session: screen flow, level attempts and the per-frame dispatch
//!
//! The session owns the persistent collaborators (store, bank, seen set,
//! progress, profile) and at most one live `SessionState`. Every frame it
//! fires due transitions, polls the open episode's deadline, then runs the
//! physics tick and reacts to its events.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::audio::Cue;
use crate::challenge::{AnswerOutcome, ChallengeContext, ChallengeController, Episode, Resolution};
use crate::consts::*;
use crate::format_clock;
use crate::persistence::{self, KeyValueStore, keys};
use crate::progress::ProgressBook;
use crate::quiz::{QuestionBank, QuestionId, SeenSet, Subject};
use crate::settings::{Profile, Settings};
use crate::sim::{SessionState, SimEvent, tick};

/// Top-level screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Start,
    WorldSelect,
    LevelSelect(Subject),
    Playing,
}

/// Modal drawn over the play field (quiz modals come from the episode)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    None,
    /// Attempt is over; Continue returns to world selection
    Results { message: String, can_continue: bool },
    /// Shown while the failed-redeem notice runs
    RedeemFailed,
    LevelTransition { title: String, text: String },
}

/// A transition scheduled for an absolute timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    Resume { at_ms: f64 },
    NextLevel { at_ms: f64, level: u32 },
    WorldSelect { at_ms: f64 },
}

impl Pending {
    fn at_ms(&self) -> f64 {
        match *self {
            Pending::Resume { at_ms } => at_ms,
            Pending::NextLevel { at_ms, .. } => at_ms,
            Pending::WorldSelect { at_ms } => at_ms,
        }
    }
}

/// Numbers for the heads-up display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hud {
    pub world: &'static str,
    pub level: u32,
    pub score: u32,
    pub stars: u32,
    pub clock: String,
    /// (question number, total) while an episode is open
    pub question: Option<(usize, usize)>,
    /// Whole seconds left on the question on screen
    pub question_secs: Option<u32>,
    pub paused: bool,
}

pub struct LevelSession<S: KeyValueStore> {
    store: S,
    bank: QuestionBank,
    seen: SeenSet,
    progress: ProgressBook,
    profile: Profile,
    rng: Pcg32,
    screen: Screen,
    attempt: Option<SessionState>,
    challenge: ChallengeController,
    overlay: Overlay,
    pending: Option<Pending>,
    cues: Vec<Cue>,
    last_frame_ms: Option<f64>,
}

impl<S: KeyValueStore> LevelSession<S> {
    /// Load everything persistent from `store`. `question_json` is the
    /// fetched question file, if any.
    pub fn new(mut store: S, question_json: Option<&str>, seed: u64) -> Self {
        let profile = Profile::load(&mut store);
        let progress = ProgressBook::load(&mut store);
        let seen_ids: Vec<QuestionId> = persistence::load(&store, keys::QUESTIONS_SEEN, Vec::new());
        let seen = SeenSet::from_ids(seen_ids);
        let bank = QuestionBank::load_or_default(question_json);
        log::info!(
            "Session ready for {}: {} questions, {} seen",
            profile.name,
            bank.items().len(),
            seen.len()
        );

        Self {
            store,
            bank,
            seen,
            progress,
            profile,
            rng: Pcg32::seed_from_u64(seed),
            screen: Screen::Start,
            attempt: None,
            challenge: ChallengeController::new(),
            overlay: Overlay::None,
            pending: None,
            cues: Vec::new(),
            last_frame_ms: None,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn attempt(&self) -> Option<&SessionState> {
        self.attempt.as_ref()
    }

    pub fn episode(&self) -> Option<&Episode> {
        self.challenge.episode()
    }

    pub fn progress(&self) -> &ProgressBook {
        &self.progress
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn update_settings(&mut self, settings: Settings) {
        self.profile.settings = settings;
        self.profile.save(&mut self.store);
    }

    /// Take the sound cues queued since the last call
    pub fn drain_cues(&mut self) -> Vec<Cue> {
        std::mem::take(&mut self.cues)
    }

    /// Start screen -> world selection
    pub fn open_worlds(&mut self) {
        self.cues.push(Cue::Button);
        self.leave_attempt();
        self.screen = Screen::WorldSelect;
    }

    pub fn select_world(&mut self, subject: Subject) {
        self.cues.push(Cue::Button);
        self.screen = Screen::LevelSelect(subject);
    }

    /// Start `level` of the world picked on the level select screen.
    /// Locked levels are refused.
    pub fn start_level(&mut self, level: u32) -> bool {
        let Screen::LevelSelect(subject) = self.screen else {
            return false;
        };
        if !self.progress.is_unlocked(subject, level) {
            log::debug!("{} L{} is locked", subject.as_str(), level);
            return false;
        }
        self.cues.push(Cue::Button);
        self.init_level(subject, level);
        true
    }

    /// Fresh attempt: zero score, full clock, body at the start
    fn init_level(&mut self, subject: Subject, level: u32) {
        if let Some(state) = self.attempt.as_mut() {
            self.challenge.abandon(state);
        }
        self.attempt = Some(SessionState::new(subject, level));
        self.overlay = Overlay::None;
        self.pending = None;
        self.last_frame_ms = None;
        self.screen = Screen::Playing;
        log::info!("Starting {} level {}", subject.display_name(), level);
    }

    /// Drop the attempt and return to world selection
    pub fn exit_level(&mut self) {
        if self.screen == Screen::Playing {
            log::info!("Leaving level");
            self.leave_attempt();
            self.screen = Screen::WorldSelect;
        }
    }

    fn leave_attempt(&mut self) {
        if let Some(state) = self.attempt.as_mut() {
            self.challenge.abandon(state);
        }
        self.attempt = None;
        self.overlay = Overlay::None;
        self.pending = None;
        self.persist();
    }

    /// Continue from a results overlay
    pub fn continue_after_results(&mut self) -> bool {
        if !matches!(self.overlay, Overlay::Results { can_continue: true, .. }) {
            return false;
        }
        self.cues.push(Cue::Button);
        self.exit_level();
        true
    }

    /// Pause or resume, only while nothing else holds the attempt
    pub fn toggle_pause(&mut self) -> bool {
        if self.overlay != Overlay::None || self.challenge.is_open() || self.pending.is_some() {
            return false;
        }
        let Some(state) = self.attempt.as_mut() else {
            return false;
        };
        if state.finished || state.timed_out {
            return false;
        }
        state.paused = !state.paused;
        log::debug!("Paused: {}", state.paused);
        true
    }

    /// Latest held controls; the jump latch is kept
    pub fn set_controls(&mut self, left: bool, right: bool, jump: bool) {
        if let Some(state) = self.attempt.as_mut() {
            state.input.left = left;
            state.input.right = right;
            state.input.jump = jump;
        }
    }

    pub fn reveal_hint(&mut self) -> Option<String> {
        self.challenge.reveal_hint()
    }

    /// Answer the question on screen
    pub fn answer(&mut self, choice: usize, now_ms: f64) -> Option<AnswerOutcome> {
        let outcome = self.with_challenge(|ctrl, ctx| ctrl.answer(ctx, choice, now_ms))??;
        if let Some(resolution) = outcome.resolution {
            self.on_resolution(resolution, now_ms);
        }
        Some(outcome)
    }

    /// Advance everything to `now_ms`
    pub fn frame(&mut self, now_ms: f64) {
        let dt = self
            .last_frame_ms
            .map(|last| ((now_ms - last) / 1000.0).max(0.0) as f32)
            .unwrap_or(0.0);
        self.last_frame_ms = Some(now_ms);

        if let Some(pending) = self.pending.filter(|p| now_ms >= p.at_ms()) {
            // A transition owns the whole frame
            self.pending = None;
            self.fire(pending);
            return;
        }

        if let Some(resolution) = self.with_challenge(|ctrl, ctx| ctrl.poll(ctx, now_ms)).flatten() {
            self.on_resolution(resolution, now_ms);
        }

        let Some(state) = self.attempt.as_mut() else {
            return;
        };
        for event in tick(state, dt, now_ms) {
            self.on_sim_event(event, now_ms);
        }
    }

    pub fn hud(&self, now_ms: f64) -> Option<Hud> {
        let state = self.attempt.as_ref()?;
        let episode = self.challenge.episode();
        Some(Hud {
            world: state.subject.display_name(),
            level: state.level,
            score: state.score,
            stars: state.stars,
            clock: format_clock(state.level_time_left),
            question: episode.map(|e| (e.question_number(), e.total())),
            question_secs: episode
                .and_then(|e| e.deadline.as_ref())
                .map(|d| d.remaining_secs(now_ms)),
            paused: state.paused && !state.in_episode() && self.overlay == Overlay::None,
        })
    }

    fn with_challenge<T>(
        &mut self,
        f: impl FnOnce(&mut ChallengeController, &mut ChallengeContext<'_>) -> T,
    ) -> Option<T> {
        let state = self.attempt.as_mut()?;
        let mut ctx = ChallengeContext {
            state,
            bank: &self.bank,
            seen: &mut self.seen,
            progress: &mut self.progress,
            rng: &mut self.rng,
            cues: &mut self.cues,
        };
        Some(f(&mut self.challenge, &mut ctx))
    }

    fn on_sim_event(&mut self, event: SimEvent, now_ms: f64) {
        match event {
            SimEvent::Jumped => self.cues.push(Cue::Jump),
            SimEvent::CoinCollected { index } => {
                log::debug!("Coin {} collected", index);
                self.cues.push(Cue::Coin);
            }
            SimEvent::CheckpointReached { x } => log::info!("Checkpoint at x={}", x),
            SimEvent::ObstacleHit { index } => {
                self.with_challenge(|ctrl, ctx| ctrl.open_redeem(ctx, index, now_ms));
                self.persist();
            }
            SimEvent::GateReached => {
                let opened = self
                    .with_challenge(|ctrl, ctx| ctrl.open_gate_quiz(ctx, now_ms))
                    .unwrap_or(false);
                if let Some(state) = self.attempt.as_mut().filter(|_| !opened) {
                    // Nothing to ask; keep the level playable
                    log::warn!("Opening gate without a quiz");
                    state.layout.gate.open = true;
                }
                self.persist();
            }
            SimEvent::LevelFinished => self.finish_level(now_ms),
            SimEvent::LevelTimeout => {
                if let Some(state) = self.attempt.as_mut() {
                    state.paused = true;
                    log::info!("Time up on {} L{}", state.subject.as_str(), state.level);
                }
                self.cues.push(Cue::Fail);
                self.overlay = Overlay::Results {
                    message: "Time's up! Continue to pick another world.".to_string(),
                    can_continue: true,
                };
            }
        }
    }

    fn on_resolution(&mut self, resolution: Resolution, now_ms: f64) {
        // Finalize before the next tick can run
        self.persist();
        match resolution {
            Resolution::GatePassed { .. } | Resolution::RedeemPassed => {}
            Resolution::GateFailed { correct } => {
                self.cues.push(Cue::Fail);
                self.overlay = Overlay::Results {
                    message: format!("Gate quiz failed ({correct}/{EPISODE_QUESTIONS} correct)."),
                    can_continue: true,
                };
            }
            Resolution::RedeemFailed => {
                self.overlay = Overlay::RedeemFailed;
                self.pending = Some(Pending::Resume {
                    at_ms: now_ms + REDEEM_FAIL_NOTICE_MS,
                });
            }
        }
    }

    fn finish_level(&mut self, now_ms: f64) {
        let Some(state) = self.attempt.as_ref() else {
            return;
        };
        // Best score was already recorded when the gate opened
        let (subject, level, score) = (state.subject, state.level, state.score);
        self.persist();
        log::info!("Finished {} L{} with {}", subject.as_str(), level, score);

        if level < MAX_LEVEL {
            self.overlay = Overlay::LevelTransition {
                title: format!("Level {level} complete!"),
                text: format!("Get ready for level {}", level + 1),
            };
            self.pending = Some(Pending::NextLevel {
                at_ms: now_ms + NEXT_LEVEL_DELAY_MS,
                level: level + 1,
            });
        } else {
            self.overlay = Overlay::LevelTransition {
                title: format!("{} complete!", subject.display_name()),
                text: "Pick your next world.".to_string(),
            };
            self.pending = Some(Pending::WorldSelect {
                at_ms: now_ms + SUBJECT_COMPLETE_DELAY_MS,
            });
        }
    }

    fn fire(&mut self, pending: Pending) {
        match pending {
            Pending::Resume { .. } => {
                self.overlay = Overlay::None;
                if let Some(state) = self.attempt.as_mut() {
                    state.paused = false;
                }
            }
            Pending::NextLevel { level, .. } => {
                if let Some(subject) = self.attempt.as_ref().map(|s| s.subject) {
                    self.init_level(subject, level);
                }
            }
            Pending::WorldSelect { .. } => self.exit_level(),
        }
    }

    /// Write the seen set (if changed) and progress
    fn persist(&mut self) {
        if self.seen.take_dirty() {
            persistence::save(&mut self.store, keys::QUESTIONS_SEEN, &self.seen.to_vec());
        }
        self.progress.save(&mut self.store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::quiz::QuestionItem;
    use glam::Vec2;

    fn session() -> LevelSession<MemoryStore> {
        LevelSession::new(MemoryStore::new(), None, 42)
    }

    fn playing(level: u32) -> LevelSession<MemoryStore> {
        let mut s = session();
        s.open_worlds();
        s.select_world(Subject::Math);
        s.progress.unlock(Subject::Math, level);
        assert!(s.start_level(level));
        s
    }

    fn state(s: &mut LevelSession<MemoryStore>) -> &mut SessionState {
        s.attempt.as_mut().expect("attempt")
    }

    fn question(s: &LevelSession<MemoryStore>) -> QuestionItem {
        s.episode()
            .and_then(|e| e.current())
            .cloned()
            .expect("question on screen")
    }

    fn answer_right(s: &mut LevelSession<MemoryStore>, now: f64) -> AnswerOutcome {
        let choice = question(s).answer_index;
        s.answer(choice, now).expect("episode open")
    }

    fn answer_wrong(s: &mut LevelSession<MemoryStore>, now: f64) -> AnswerOutcome {
        let q = question(s);
        s.answer((q.answer_index + 1) % q.choices.len(), now)
            .expect("episode open")
    }

    #[test]
    fn test_screen_flow_and_locks() {
        let mut s = session();
        assert_eq!(s.screen(), Screen::Start);
        s.open_worlds();
        s.select_world(Subject::Science);
        assert_eq!(s.screen(), Screen::LevelSelect(Subject::Science));
        assert!(!s.start_level(2));
        assert!(s.start_level(1));
        assert_eq!(s.screen(), Screen::Playing);
        assert_eq!(s.hud(0.0).map(|h| h.clock), Some("1:00".to_string()));
    }

    #[test]
    fn test_coins_then_gate_pass_unlocks_next_level() {
        let mut s = playing(1);
        let coins: Vec<Vec2> = state(&mut s).layout.coins.iter().map(|c| c.pos).collect();
        for (i, coin) in coins.into_iter().enumerate() {
            let st = state(&mut s);
            st.body.pos = coin - st.body.size / 2.0;
            st.body.vel = Vec2::ZERO;
            st.body.grounded = false;
            s.frame(i as f64 * 10.0);
        }
        assert_eq!(state(&mut s).score, 50);
        assert_eq!(state(&mut s).stars, 5);

        let st = state(&mut s);
        st.body.respawn_at(Vec2::new(800.0, GROUND_Y - PLAYER_HEIGHT));
        s.frame(100.0);
        assert!(state(&mut s).quiz_active);
        assert_eq!(s.hud(100.0).and_then(|h| h.question), Some((1, 3)));

        answer_right(&mut s, 200.0);
        let out = answer_right(&mut s, 300.0);
        assert_eq!(out.resolution, Some(Resolution::GatePassed { correct: 2, score: 250 }));
        assert_eq!(state(&mut s).score, 250);
        assert!(state(&mut s).layout.gate.open);
        assert_eq!(s.progress().unlock_level(Subject::Math), 2);

        // Persisted right away
        let stored = s.store().read(keys::PROGRESS).expect("progress saved");
        assert!(stored.contains("\"stagesUnlocked\":2"));
        assert!(s.store().read(keys::QUESTIONS_SEEN).is_some());

        // Same attempt resumes, no respawn
        assert_eq!(state(&mut s).body.pos.x, 800.0);
        assert!(state(&mut s).simulating());
    }

    #[test]
    fn test_level_finish_advances_after_delay() {
        let mut s = playing(1);
        let st = state(&mut s);
        st.layout.gate.open = true;
        st.layout.obstacles.clear();
        st.body.pos.x = 880.0;
        s.frame(1000.0);
        assert!(matches!(s.overlay(), Overlay::LevelTransition { .. }));
        assert!(state(&mut s).finished);

        s.frame(1999.0);
        assert_eq!(state(&mut s).level, 1);
        s.frame(2000.0);
        let st = state(&mut s);
        assert_eq!((st.level, st.score), (2, 0));
        assert_eq!(st.level_time_left, 45.0);
        assert_eq!(s.overlay(), &Overlay::None);
    }

    #[test]
    fn test_best_score_comes_from_gate_pass() {
        let mut s = playing(1);
        state(&mut s).body.pos.x = 800.0;
        s.frame(0.0);
        answer_right(&mut s, 10.0);
        answer_right(&mut s, 20.0);
        assert_eq!(s.progress().best_score(Subject::Math), 200);

        // Points gained between the gate and the finish line do not count
        let st = state(&mut s);
        st.score = 900;
        st.body.pos.x = 880.0;
        s.frame(30.0);
        assert!(state(&mut s).finished);
        assert_eq!(s.progress().best_score(Subject::Math), 200);
    }

    #[test]
    fn test_last_level_returns_to_worlds() {
        let mut s = playing(3);
        let st = state(&mut s);
        st.layout.gate.open = true;
        st.layout.obstacles.clear();
        st.body.pos.x = 920.0;
        s.frame(0.0);
        s.frame(1199.0);
        assert_eq!(s.screen(), Screen::Playing);
        s.frame(1200.0);
        assert_eq!(s.screen(), Screen::WorldSelect);
        assert!(s.attempt().is_none());
    }

    #[test]
    fn test_timeout_shows_results_then_world_select() {
        let mut s = playing(1);
        state(&mut s).level_time_left = 0.01;
        state(&mut s).layout.obstacles.clear();
        s.frame(0.0);
        s.frame(20.0);
        assert!(state(&mut s).timed_out);
        match s.overlay() {
            Overlay::Results { message, can_continue } => {
                assert!(*can_continue);
                assert!(message.contains("another world"));
            }
            other => panic!("unexpected overlay {:?}", other),
        }
        assert!(!s.toggle_pause());

        // Nothing moves any more
        s.set_controls(false, true, false);
        let x = state(&mut s).body.pos.x;
        s.frame(40.0);
        assert_eq!(state(&mut s).body.pos.x, x);

        assert!(s.continue_after_results());
        assert_eq!(s.screen(), Screen::WorldSelect);
        assert!(s.attempt().is_none());
    }

    #[test]
    fn test_gate_fail_abandons_attempt() {
        let mut s = playing(1);
        state(&mut s).body.pos.x = 800.0;
        s.frame(0.0);
        answer_wrong(&mut s, 10.0);
        let out = answer_wrong(&mut s, 20.0);
        assert_eq!(out.resolution, Some(Resolution::GateFailed { correct: 0 }));
        assert!(matches!(s.overlay(), Overlay::Results { .. }));
        assert_eq!(s.progress().unlock_level(Subject::Math), 1);
        assert!(s.continue_after_results());
        assert_eq!(s.screen(), Screen::WorldSelect);
    }

    #[test]
    fn test_repeated_hits_penalize_once() {
        let mut s = playing(1);
        state(&mut s).score = 50;
        state(&mut s).body.pos.x = 200.0; // into obstacle 0
        s.frame(0.0);
        assert!(state(&mut s).redeem_active);

        // Still overlapping, but the attempt is frozen during the episode
        s.frame(16.0);
        s.frame(32.0);
        assert_eq!(s.episode().map(|e| e.question_number()), Some(1));

        answer_wrong(&mut s, 40.0);
        let out = answer_wrong(&mut s, 50.0);
        assert_eq!(out.resolution, Some(Resolution::RedeemFailed));
        let st = state(&mut s);
        assert_eq!(st.score, 30);
        assert_eq!(st.body.pos, Vec2::new(40.0, GROUND_Y - PLAYER_HEIGHT));
        assert_eq!(s.overlay(), &Overlay::RedeemFailed);

        s.frame(1049.0);
        assert!(state(&mut s).paused);
        s.frame(1050.0);
        assert!(!state(&mut s).paused);
        assert_eq!(s.overlay(), &Overlay::None);
        assert_eq!(state(&mut s).score, 30);

        // A different obstacle still triggers straight after a failure
        state(&mut s).body.pos.x = 390.0;
        s.frame(1060.0);
        assert_eq!(
            s.episode().map(|e| e.kind),
            Some(crate::challenge::EpisodeKind::Redeem { obstacle: 1 })
        );
    }

    #[test]
    fn test_failed_redeem_past_checkpoint_resumes_clear() {
        // Level 2 has an obstacle straddling the checkpoint
        let mut s = playing(2);
        state(&mut s).body.pos.x = 560.0; // into obstacle 3
        s.frame(0.0);
        assert_eq!(state(&mut s).checkpoint_x, Some(480.0));
        assert!(state(&mut s).redeem_active);

        answer_wrong(&mut s, 10.0);
        let out = answer_wrong(&mut s, 20.0);
        assert_eq!(out.resolution, Some(Resolution::RedeemFailed));
        assert_eq!(state(&mut s).body.pos.x, 484.0);

        s.frame(1020.0);
        assert_eq!(s.overlay(), &Overlay::None);
        s.frame(1030.0);
        s.frame(1046.0);
        assert!(s.episode().is_none());
        let st = state(&mut s);
        assert!(!st.redeem_active);
        assert!(st.simulating());
    }

    #[test]
    fn test_redeem_pass_resumes_with_cooldown() {
        let mut s = playing(1);
        state(&mut s).body.pos.x = 230.0; // centre right of obstacle 0's centre
        s.frame(0.0);
        answer_right(&mut s, 10.0);
        answer_right(&mut s, 20.0);
        let st = state(&mut s);
        assert!(st.simulating());
        assert_eq!(st.body.pos.x, 252.0);
        assert_eq!(st.score, 0);
        assert!(st.redeem_cooldown.is_some());
    }

    #[test]
    fn test_pause_only_when_free() {
        let mut s = playing(1);
        assert!(s.toggle_pause());
        assert!(s.hud(0.0).is_some_and(|h| h.paused));
        assert!(s.toggle_pause());

        state(&mut s).body.pos.x = 800.0;
        s.frame(0.0);
        assert!(s.episode().is_some());
        assert!(!s.toggle_pause());
    }

    #[test]
    fn test_state_survives_restart() {
        let mut s = playing(1);
        state(&mut s).body.pos.x = 800.0;
        s.frame(0.0);
        answer_right(&mut s, 10.0);
        answer_right(&mut s, 20.0);

        let store = std::mem::take(&mut s.store);
        let again = LevelSession::new(store, None, 1);
        assert_eq!(again.progress().unlock_level(Subject::Math), 2);
        assert_eq!(again.progress().best_score(Subject::Math), 200);
        assert_eq!(again.seen.len(), 2);
    }
}
