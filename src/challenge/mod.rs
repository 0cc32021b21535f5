//! Gate quiz and redeem episodes
//!
//! The controller owns at most one open `Episode`. While it is open it has
//! write access to the attempt's score, pause and active flags; everything
//! else is reached through a `ChallengeContext` built per call.

pub mod episode;

pub use episode::{Deadline, Episode, EpisodeKind, Step};

use rand_pcg::Pcg32;

use crate::audio::Cue;
use crate::consts::*;
use crate::progress::ProgressBook;
use crate::quiz::{QuestionBank, SeenSet};
use crate::sim::{SessionState, push_clear_x};
use crate::{gate_question_secs, redeem_question_secs};

/// Borrowed collaborators for one controller call
pub struct ChallengeContext<'a> {
    pub state: &'a mut SessionState,
    pub bank: &'a QuestionBank,
    pub seen: &'a mut SeenSet,
    pub progress: &'a mut ProgressBook,
    pub rng: &'a mut Pcg32,
    pub cues: &'a mut Vec<Cue>,
}

/// How an episode ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Gate opened; `score` is the attempt score including the bonus
    GatePassed { correct: u32, score: u32 },
    GateFailed { correct: u32 },
    RedeemPassed,
    RedeemFailed,
}

/// Feedback for a single answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    /// Set when this answer decided the episode
    pub resolution: Option<Resolution>,
}

#[derive(Debug, Default)]
pub struct ChallengeController {
    episode: Option<Episode>,
}

impl ChallengeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.episode.is_some()
    }

    pub fn episode(&self) -> Option<&Episode> {
        self.episode.as_ref()
    }

    /// Open the three-question gate quiz. Returns false if an episode is
    /// already open or no questions could be drawn.
    pub fn open_gate_quiz(&mut self, ctx: &mut ChallengeContext<'_>, now_ms: f64) -> bool {
        self.open(ctx, EpisodeKind::GateQuiz, now_ms)
    }

    /// Open a redeem for the obstacle at `obstacle`. Ignored while any
    /// episode is open.
    pub fn open_redeem(
        &mut self,
        ctx: &mut ChallengeContext<'_>,
        obstacle: usize,
        now_ms: f64,
    ) -> bool {
        self.open(ctx, EpisodeKind::Redeem { obstacle }, now_ms)
    }

    fn open(&mut self, ctx: &mut ChallengeContext<'_>, kind: EpisodeKind, now_ms: f64) -> bool {
        if self.episode.is_some() || ctx.state.in_episode() {
            log::debug!("Ignoring {:?} trigger, episode already open", kind);
            return false;
        }

        let questions = ctx.bank.select_challenge(
            ctx.state.subject,
            true,
            ctx.seen,
            EPISODE_QUESTIONS,
            ctx.rng,
        );
        if questions.is_empty() {
            log::warn!("No questions available for {:?}", kind);
            return false;
        }

        match kind {
            EpisodeKind::GateQuiz => ctx.state.quiz_active = true,
            EpisodeKind::Redeem { .. } => ctx.state.redeem_active = true,
        }
        ctx.state.paused = true;

        log::info!(
            "Opening {:?} for {} L{} with {} questions",
            kind,
            ctx.state.subject.as_str(),
            ctx.state.level,
            questions.len()
        );
        let mut episode = Episode::new(kind, questions);
        present(&mut episode, ctx, now_ms);
        self.episode = Some(episode);
        true
    }

    /// Reveal the hint for the current gate quiz question
    pub fn reveal_hint(&mut self) -> Option<String> {
        self.episode.as_mut()?.use_hint().map(str::to_owned)
    }

    /// Answer the current question with the choice at `choice`
    pub fn answer(
        &mut self,
        ctx: &mut ChallengeContext<'_>,
        choice: usize,
        now_ms: f64,
    ) -> Option<AnswerOutcome> {
        let episode = self.episode.as_ref()?;
        let correct = episode.current()?.is_correct(choice);
        let resolution = self.advance(ctx, correct, now_ms);
        Some(AnswerOutcome {
            correct,
            resolution,
        })
    }

    /// Check the running question deadline. An expired deadline counts as
    /// a wrong answer; redeem questions tick in their last seconds.
    pub fn poll(&mut self, ctx: &mut ChallengeContext<'_>, now_ms: f64) -> Option<Resolution> {
        let episode = self.episode.as_mut()?;
        let is_gate = episode.is_gate();
        let number = episode.question_number();
        let deadline = episode.deadline.as_mut()?;

        if deadline.expired(now_ms) {
            log::debug!("Question {} timed out", number);
            return self.advance(ctx, false, now_ms);
        }
        if !is_gate && deadline.announce(now_ms, REDEEM_TICK_FROM_SECS).is_some() {
            ctx.cues.push(Cue::Tick);
        }
        None
    }

    /// Close the open episode without resolving it (level exit)
    pub fn abandon(&mut self, state: &mut SessionState) {
        if let Some(episode) = self.episode.take() {
            log::debug!("Abandoning {:?}", episode.kind);
            state.quiz_active = false;
            state.redeem_active = false;
        }
    }

    fn advance(
        &mut self,
        ctx: &mut ChallengeContext<'_>,
        correct: bool,
        now_ms: f64,
    ) -> Option<Resolution> {
        let episode = self.episode.as_mut()?;
        let hinted = episode.hint_used();

        if correct {
            ctx.cues.push(Cue::Correct);
            if episode.is_gate() {
                ctx.state.score += if hinted {
                    GATE_HINTED_SCORE
                } else {
                    GATE_CORRECT_SCORE
                };
            }
        } else {
            ctx.cues.push(Cue::Wrong);
        }

        match episode.record(correct) {
            Step::Next => {
                present(episode, ctx, now_ms);
                None
            }
            step => {
                let episode = self.episode.take()?;
                Some(resolve(&episode, step == Step::Passed, ctx, now_ms))
            }
        }
    }
}

/// Put the current question on screen: mark it seen and start its timer
fn present(episode: &mut Episode, ctx: &mut ChallengeContext<'_>, now_ms: f64) {
    let secs = if episode.is_gate() {
        gate_question_secs(ctx.state.level)
    } else {
        redeem_question_secs(ctx.state.level)
    };
    if let Some(question) = episode.current() {
        ctx.seen.mark(&question.id);
        log::trace!("Presenting {} ({}s)", question.id, secs);
    }
    episode.deadline = Some(Deadline::new(now_ms, secs));
}

/// Apply the effects of a decided episode to the attempt
fn resolve(
    episode: &Episode,
    passed: bool,
    ctx: &mut ChallengeContext<'_>,
    now_ms: f64,
) -> Resolution {
    let state = &mut *ctx.state;
    match (episode.kind, passed) {
        (EpisodeKind::GateQuiz, true) => {
            state.score += GATE_PASS_BONUS;
            state.layout.gate.open = true;
            state.quiz_active = false;
            state.paused = false;
            ctx.progress.unlock(state.subject, state.level + 1);
            if ctx.progress.record_score(state.subject, state.score) {
                log::info!("New best for {}: {}", state.subject.as_str(), state.score);
            }
            ctx.cues.push(Cue::Gate);
            log::info!("Gate quiz passed with {} correct", episode.correct());
            Resolution::GatePassed {
                correct: episode.correct(),
                score: state.score,
            }
        }
        (EpisodeKind::GateQuiz, false) => {
            // Results overlay takes over; the attempt stays paused
            state.quiz_active = false;
            log::info!("Gate quiz failed with {} correct", episode.correct());
            Resolution::GateFailed {
                correct: episode.correct(),
            }
        }
        (EpisodeKind::Redeem { obstacle }, true) => {
            let body = state.body.rect();
            let pushed = state
                .layout
                .obstacles
                .get(obstacle)
                .and_then(|o| push_clear_x(&body, &o.rect, REDEEM_PUSH_GAP));
            if let Some(x) = pushed {
                state.body.pos.x = x.clamp(0.0, FIELD_WIDTH - state.body.size.x);
            }
            state.redeem_cooldown = Some(crate::sim::RedeemCooldown {
                obstacle,
                until_ms: now_ms + REDEEM_COOLDOWN_MS,
            });
            state.redeem_active = false;
            state.paused = false;
            log::info!("Redeem passed for obstacle {}", obstacle);
            Resolution::RedeemPassed
        }
        (EpisodeKind::Redeem { obstacle }, false) => {
            state.deduct(REDEEM_PENALTY);
            state.respawn_body();
            state.redeem_active = false;
            // Stays paused until the failure notice clears
            ctx.cues.push(Cue::Fail);
            log::info!(
                "Redeem failed for obstacle {}, score now {}",
                obstacle,
                state.score
            );
            Resolution::RedeemFailed
        }
    }
}
