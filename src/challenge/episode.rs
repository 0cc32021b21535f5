//! A single gate quiz or redeem run
//!
//! Pure bookkeeping: question cursor, tallies, hint flag and the deadline of
//! the question on screen. Side effects live in the controller.

use crate::consts::{EPISODE_DECIDING_COUNT, EPISODE_QUESTIONS};
use crate::quiz::QuestionItem;

/// Which quiz flavour is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeKind {
    /// Three questions guarding the gate
    GateQuiz,
    /// Penalty-avoidance quiz after touching `obstacle`
    Redeem { obstacle: usize },
}

/// Countdown for the question on screen. Owned by the episode, so it is
/// gone the moment the episode resolves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deadline {
    pub expires_at_ms: f64,
    /// Last whole second announced with a tick cue
    last_announced: Option<u32>,
}

impl Deadline {
    pub fn new(now_ms: f64, secs: f64) -> Self {
        Self {
            expires_at_ms: now_ms + secs * 1000.0,
            last_announced: None,
        }
    }

    /// Whole seconds left, rounded up
    pub fn remaining_secs(&self, now_ms: f64) -> u32 {
        ((self.expires_at_ms - now_ms).max(0.0) / 1000.0).ceil() as u32
    }

    pub fn expired(&self, now_ms: f64) -> bool {
        now_ms >= self.expires_at_ms
    }

    /// Returns the second to announce if it changed and is at most `from`
    pub fn announce(&mut self, now_ms: f64, from: u32) -> Option<u32> {
        let s = self.remaining_secs(now_ms);
        if s == 0 || s > from || self.last_announced == Some(s) {
            return None;
        }
        self.last_announced = Some(s);
        Some(s)
    }
}

/// What an answer (or timeout) did to the episode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Outcome still open, next question is up
    Next,
    Passed,
    Failed,
}

/// One open gate quiz or redeem
#[derive(Debug, Clone)]
pub struct Episode {
    pub kind: EpisodeKind,
    questions: Vec<QuestionItem>,
    index: usize,
    correct: u32,
    wrong: u32,
    /// Hint revealed for the current question
    hint_used: bool,
    pub deadline: Option<Deadline>,
}

impl Episode {
    pub fn new(kind: EpisodeKind, mut questions: Vec<QuestionItem>) -> Self {
        questions.truncate(EPISODE_QUESTIONS);
        Self {
            kind,
            questions,
            index: 0,
            correct: 0,
            wrong: 0,
            hint_used: false,
            deadline: None,
        }
    }

    pub fn current(&self) -> Option<&QuestionItem> {
        self.questions.get(self.index)
    }

    /// 1-based number of the question on screen
    pub fn question_number(&self) -> usize {
        self.index + 1
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn correct(&self) -> u32 {
        self.correct
    }

    pub fn wrong(&self) -> u32 {
        self.wrong
    }

    pub fn hint_used(&self) -> bool {
        self.hint_used
    }

    pub fn is_gate(&self) -> bool {
        self.kind == EpisodeKind::GateQuiz
    }

    /// Reveal the current question's hint (gate quiz only)
    pub fn use_hint(&mut self) -> Option<&str> {
        if !self.is_gate() {
            return None;
        }
        let hint = self.questions.get(self.index)?.hint.as_deref()?;
        self.hint_used = true;
        Some(hint)
    }

    /// Tally an answer and advance. Resolves as soon as either tally hits
    /// the deciding count, or when the questions run out.
    pub fn record(&mut self, correct: bool) -> Step {
        self.deadline = None;
        if correct {
            self.correct += 1;
        } else {
            self.wrong += 1;
        }
        if self.correct >= EPISODE_DECIDING_COUNT {
            return Step::Passed;
        }
        if self.wrong >= EPISODE_DECIDING_COUNT {
            return Step::Failed;
        }

        self.index += 1;
        self.hint_used = false;
        if self.index >= self.questions.len() {
            if self.correct >= EPISODE_DECIDING_COUNT {
                Step::Passed
            } else {
                Step::Failed
            }
        } else {
            Step::Next
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{QuestionBank, SeenSet, Subject};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn three() -> Vec<QuestionItem> {
        let mut rng = Pcg32::seed_from_u64(1);
        QuestionBank::default().select_challenge(Subject::Math, true, &SeenSet::new(), 3, &mut rng)
    }

    #[test]
    fn test_two_correct_passes_early() {
        let mut ep = Episode::new(EpisodeKind::GateQuiz, three());
        assert_eq!(ep.record(true), Step::Next);
        assert_eq!(ep.record(true), Step::Passed);
        assert_eq!(ep.question_number(), 2);
    }

    #[test]
    fn test_split_goes_to_third_question() {
        let mut ep = Episode::new(EpisodeKind::GateQuiz, three());
        assert_eq!(ep.record(true), Step::Next);
        assert_eq!(ep.record(false), Step::Next);
        assert_eq!(ep.question_number(), 3);
        assert_eq!(ep.record(false), Step::Failed);
    }

    #[test]
    fn test_hint_resets_per_question_and_only_in_gate_quiz() {
        let mut ep = Episode::new(EpisodeKind::GateQuiz, three());
        assert!(ep.use_hint().is_some());
        assert!(ep.hint_used());
        ep.record(false);
        assert!(!ep.hint_used());

        let mut redeem = Episode::new(EpisodeKind::Redeem { obstacle: 0 }, three());
        assert!(redeem.use_hint().is_none());
        assert!(!redeem.hint_used());
    }

    #[test]
    fn test_deadline_announces_each_second_once() {
        let mut d = Deadline::new(0.0, 10.0);
        assert_eq!(d.remaining_secs(0.0), 10);
        assert_eq!(d.announce(5_000.0, 3), None);
        assert_eq!(d.announce(7_100.0, 3), Some(3));
        assert_eq!(d.announce(7_500.0, 3), None);
        assert_eq!(d.announce(8_001.0, 3), Some(2));
        assert!(!d.expired(9_999.0));
        assert!(d.expired(10_000.0));
        assert_eq!(d.remaining_secs(12_000.0), 0);
    }

    proptest! {
        #[test]
        fn prop_never_asks_past_a_decision(answers in proptest::collection::vec(any::<bool>(), 3)) {
            let mut ep = Episode::new(EpisodeKind::GateQuiz, three());
            let mut asked = 0;
            let mut outcome = Step::Next;
            for answer in answers {
                prop_assert!(ep.correct() < 2 && ep.wrong() < 2);
                asked += 1;
                outcome = ep.record(answer);
                if outcome != Step::Next {
                    break;
                }
            }
            prop_assert!(asked <= 3);
            prop_assert_ne!(outcome, Step::Next);
            prop_assert_eq!(outcome == Step::Passed, ep.correct() == 2);
            prop_assert!(ep.correct() == 2 || ep.wrong() == 2);
        }
    }
}
