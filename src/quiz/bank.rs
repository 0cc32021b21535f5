//! Question repository and challenge selection
//!
//! The bank holds loaded items plus a small built-in default set. Selection
//! prefers items the player has not seen, then pads through progressively
//! looser pools so an episode is never short of questions.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::Value;
use thiserror::Error;

use super::question::{Difficulty, QuestionId, QuestionItem, RawQuestion, Subject};

/// Failure to use a fetched question payload
#[derive(Debug, Error)]
pub enum BankError {
    #[error("question data is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("question data is not a JSON array")]
    NotArray,
    #[error("question data has no usable items")]
    Empty,
}

/// Identities of questions already presented to the player.
///
/// Only grows. Persisted as a JSON array of ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeenSet {
    ids: BTreeSet<QuestionId>,
    dirty: bool,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = QuestionId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            dirty: false,
        }
    }

    pub fn contains(&self, id: &QuestionId) -> bool {
        self.ids.contains(id)
    }

    /// Record a presentation. Returns true the first time an id is marked.
    pub fn mark(&mut self, id: &QuestionId) -> bool {
        let added = self.ids.insert(id.clone());
        self.dirty |= added;
        added
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns whether anything was added since the last call
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn to_vec(&self) -> Vec<QuestionId> {
        self.ids.iter().cloned().collect()
    }
}

/// The question repository
#[derive(Debug, Clone)]
pub struct QuestionBank {
    items: Vec<QuestionItem>,
    defaults: Vec<QuestionItem>,
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self::with_items(default_questions())
    }
}

impl QuestionBank {
    /// Bank with the given items on top of the built-in defaults
    pub fn with_items(items: Vec<QuestionItem>) -> Self {
        Self {
            items,
            defaults: default_questions(),
        }
    }

    /// Parse a fetched JSON payload. Invalid items are dropped with a warning.
    pub fn from_json(json: &str) -> Result<Self, BankError> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Array(entries) = value else {
            return Err(BankError::NotArray);
        };

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let raw = match serde_json::from_value::<RawQuestion>(entry) {
                Ok(raw) => raw,
                Err(e) => {
                    log::warn!("Skipping malformed question: {}", e);
                    continue;
                }
            };
            match QuestionItem::try_from(raw) {
                Ok(item) => items.push(item),
                Err(e) => log::warn!("Skipping question: {}", e),
            }
        }

        if items.is_empty() {
            return Err(BankError::Empty);
        }
        Ok(Self::with_items(items))
    }

    /// Use fetched data when it is usable, the default set otherwise
    pub fn load_or_default(json: Option<&str>) -> Self {
        let Some(json) = json else {
            log::info!("No question data, using built-in questions");
            return Self::default();
        };
        match Self::from_json(json) {
            Ok(bank) => {
                log::info!("Loaded {} questions", bank.items.len());
                bank
            }
            Err(e) => {
                log::warn!("{}, using built-in questions", e);
                Self::default()
            }
        }
    }

    pub fn items(&self) -> &[QuestionItem] {
        &self.items
    }

    pub fn defaults(&self) -> &[QuestionItem] {
        &self.defaults
    }

    /// Pick `count` questions for an episode in `subject`.
    ///
    /// Fill order: unseen subject items, seen subject items, subject
    /// defaults, any defaults, then repeats. Each stage is shuffled and
    /// never repeats an id already chosen; only the last stage repeats.
    pub fn select_challenge<R: Rng + ?Sized>(
        &self,
        subject: Subject,
        exclude_seen: bool,
        seen: &SeenSet,
        count: usize,
        rng: &mut R,
    ) -> Vec<QuestionItem> {
        let mut picked: Vec<QuestionItem> = Vec::with_capacity(count);

        let in_subject = |q: &&QuestionItem| q.subject == subject;
        let fresh = self
            .items
            .iter()
            .filter(in_subject)
            .filter(|q| !exclude_seen || !seen.contains(&q.id));
        take_shuffled(&mut picked, fresh, count, rng);

        let rest = self.items.iter().filter(in_subject);
        take_shuffled(&mut picked, rest, count, rng);

        let subject_defaults = self.defaults.iter().filter(in_subject);
        take_shuffled(&mut picked, subject_defaults, count, rng);

        take_shuffled(&mut picked, self.defaults.iter(), count, rng);

        if picked.len() < count {
            let mut pool: Vec<&QuestionItem> = self
                .items
                .iter()
                .chain(self.defaults.iter())
                .filter(in_subject)
                .collect();
            if pool.is_empty() {
                pool = self.items.iter().chain(self.defaults.iter()).collect();
            }
            if pool.is_empty() {
                log::warn!("Question bank is empty, episode will be short");
                return picked;
            }
            log::debug!(
                "Only {} distinct questions for {}, repeating",
                picked.len(),
                subject.as_str()
            );
            while picked.len() < count {
                let q = pool[rng.random_range(0..pool.len())];
                picked.push(q.clone());
            }
        }

        picked
    }
}

/// Shuffle the candidates not yet picked and append until `count` is reached
fn take_shuffled<'a, R: Rng + ?Sized>(
    picked: &mut Vec<QuestionItem>,
    candidates: impl Iterator<Item = &'a QuestionItem>,
    count: usize,
    rng: &mut R,
) {
    if picked.len() >= count {
        return;
    }
    let mut pool: Vec<&QuestionItem> = candidates
        .filter(|q| !picked.iter().any(|p| p.id == q.id))
        .collect();
    pool.shuffle(rng);
    for q in pool {
        if picked.len() >= count {
            break;
        }
        // Candidates may themselves contain duplicate ids
        if !picked.iter().any(|p| p.id == q.id) {
            picked.push(q.clone());
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn default_item(
    id: &str,
    subject: Subject,
    topic: &str,
    difficulty: Difficulty,
    prompt: &str,
    choices: &[&str],
    answer_index: usize,
    hint: &str,
    explanation: &str,
) -> QuestionItem {
    QuestionItem {
        id: QuestionId::new(id),
        subject,
        topic: Some(topic.to_string()),
        difficulty,
        prompt: prompt.to_string(),
        choices: choices.iter().map(|c| c.to_string()).collect(),
        answer_index,
        hint: Some(hint.to_string()),
        explanation: Some(explanation.to_string()),
    }
}

/// Built-in questions used when no data file is available
pub fn default_questions() -> Vec<QuestionItem> {
    use Difficulty::*;
    use Subject::*;

    vec![
        default_item(
            "math_frac_001",
            Math,
            "fractions",
            Easy,
            "Which fraction is equivalent to 1/2?",
            &["2/4", "1/3", "3/5", "2/3"],
            0,
            "Multiply numerator and denominator by the same number.",
            "1/2 = 2/4.",
        ),
        default_item(
            "math_area_002",
            Math,
            "area",
            Easy,
            "What is the area of a rectangle 6 by 3?",
            &["9", "12", "18", "24"],
            2,
            "Area = length × width.",
            "6×3 = 18.",
        ),
        default_item(
            "math_lcm_003",
            Math,
            "multiples",
            Easy,
            "What is the LCM of 4 and 6?",
            &["6", "8", "10", "12"],
            3,
            "List multiples: 4,8,12,... and 6,12,...",
            "LCM is 12.",
        ),
        default_item(
            "sci_water_003",
            Science,
            "water_cycle",
            Easy,
            "Which step turns water vapor into liquid?",
            &["Evaporation", "Condensation", "Precipitation", "Runoff"],
            1,
            "It forms droplets on a cold surface.",
            "Condensation turns vapor to liquid.",
        ),
        default_item(
            "eng_grammar_010",
            English,
            "grammar",
            Medium,
            "Choose the correct sentence.",
            &[
                "The dogs runs fast.",
                "The dog run fast.",
                "The dog runs fast.",
                "The dogs is fast.",
            ],
            2,
            "Match subject and verb number.",
            "Singular subject 'dog' → 'runs'.",
        ),
        default_item(
            "soc_geo_005",
            Social,
            "geography",
            Easy,
            "What does 0° latitude represent?",
            &["Prime Meridian", "Tropic of Cancer", "Equator", "Arctic Circle"],
            2,
            "It's halfway between poles.",
            "The Equator is 0° latitude.",
        ),
    ]
}
