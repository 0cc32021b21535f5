//! Per-subject progress and best scores
//!
//! Persisted to the store under two keys as JSON:
//! `{"math":{"stagesUnlocked":2},...}` and `{"math":250,...}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::MAX_LEVEL;
use crate::persistence::{self, KeyValueStore, keys};
use crate::quiz::Subject;

/// Unlock state for one subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectProgress {
    #[serde(rename = "stagesUnlocked")]
    pub stages_unlocked: u32,
}

impl Default for SubjectProgress {
    fn default() -> Self {
        Self { stages_unlocked: 1 }
    }
}

/// Stored entry before normalization (may be missing, zero or negative)
#[derive(Debug, Default, Deserialize)]
struct RawSubjectProgress {
    #[serde(default, rename = "stagesUnlocked")]
    stages_unlocked: Option<i64>,
}

/// Best score per subject
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ScoreBoard {
    best: BTreeMap<Subject, u32>,
}

impl ScoreBoard {
    pub fn best(&self, subject: Subject) -> u32 {
        self.best.get(&subject).copied().unwrap_or(0)
    }

    /// Keep the larger of the stored and the new score.
    /// Returns true when `score` is a new best.
    pub fn record(&mut self, subject: Subject, score: u32) -> bool {
        let best = self.best.entry(subject).or_insert(0);
        if score > *best {
            *best = score;
            true
        } else {
            false
        }
    }
}

/// Progress store: unlock levels plus the score board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressBook {
    progress: BTreeMap<Subject, SubjectProgress>,
    pub scores: ScoreBoard,
}

impl Default for ProgressBook {
    fn default() -> Self {
        Self {
            progress: Subject::ALL
                .iter()
                .map(|s| (*s, SubjectProgress::default()))
                .collect(),
            scores: ScoreBoard::default(),
        }
    }
}

impl ProgressBook {
    /// Highest level the player may start in `subject` (always at least 1)
    pub fn unlock_level(&self, subject: Subject) -> u32 {
        self.progress
            .get(&subject)
            .map(|p| p.stages_unlocked)
            .unwrap_or(1)
            .max(1)
    }

    pub fn is_unlocked(&self, subject: Subject, level: u32) -> bool {
        level >= 1 && level <= self.unlock_level(subject)
    }

    /// Raise the unlock level to `level` (capped at the last level).
    /// Never lowers it. Returns true if anything changed.
    pub fn unlock(&mut self, subject: Subject, level: u32) -> bool {
        let entry = self.progress.entry(subject).or_default();
        let target = entry.stages_unlocked.max(level.min(MAX_LEVEL)).max(1);
        let changed = target != entry.stages_unlocked;
        entry.stages_unlocked = target;
        changed
    }

    pub fn best_score(&self, subject: Subject) -> u32 {
        self.scores.best(subject)
    }

    pub fn record_score(&mut self, subject: Subject, score: u32) -> bool {
        self.scores.record(subject, score)
    }

    /// Build from stored JSON, entry by entry. Unknown subjects are
    /// dropped, unlock levels coerced into 1..=3, scores floored at 0.
    fn normalized(raw: BTreeMap<String, Value>, raw_scores: BTreeMap<String, Value>) -> Self {
        let mut book = Self::default();
        for (key, value) in raw {
            let Ok(subject) = key.parse::<Subject>() else {
                log::debug!("Ignoring progress for unknown subject {:?}", key);
                continue;
            };
            let entry: RawSubjectProgress = serde_json::from_value(value).unwrap_or_default();
            let stages = entry.stages_unlocked.unwrap_or(0);
            let stages = if stages <= 0 { 1 } else { stages.min(MAX_LEVEL as i64) as u32 };
            book.progress.insert(subject, SubjectProgress { stages_unlocked: stages });
        }
        for (key, value) in raw_scores {
            let Ok(subject) = key.parse::<Subject>() else {
                log::debug!("Ignoring score for unknown subject {:?}", key);
                continue;
            };
            let Some(score) = value.as_f64() else {
                log::debug!("Ignoring non-numeric score for {}", key);
                continue;
            };
            book.scores.record(subject, score.clamp(0.0, u32::MAX as f64) as u32);
        }
        book
    }

    /// Load progress and scores, writing the normalized copies back
    pub fn load<S: KeyValueStore + ?Sized>(store: &mut S) -> Self {
        let raw: BTreeMap<String, Value> =
            persistence::load(&*store, keys::PROGRESS, BTreeMap::new());
        let raw_scores: BTreeMap<String, Value> =
            persistence::load(&*store, keys::SCORES, BTreeMap::new());
        let book = Self::normalized(raw, raw_scores);
        book.save(store);
        log::info!(
            "Progress: {}",
            Subject::ALL
                .iter()
                .map(|s| format!("{}={}", s.as_str(), book.unlock_level(*s)))
                .collect::<Vec<_>>()
                .join(" ")
        );
        book
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) {
        persistence::save(store, keys::PROGRESS, &self.progress);
        persistence::save(store, keys::SCORES, &self.scores);
    }
}
