//! Quiz items and their stable identities
//!
//! Question data arrives as loosely-typed JSON. Each item is validated and
//! given a canonical `QuestionId` exactly once, at load time.

use std::convert::Infallible;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Subject worlds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Math,
    Science,
    English,
    Social,
}

impl Subject {
    pub const ALL: [Subject; 4] = [
        Subject::Math,
        Subject::Science,
        Subject::English,
        Subject::Social,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::Science => "science",
            Subject::English => "english",
            Subject::Social => "social",
        }
    }

    /// World name shown in the HUD and quiz header
    pub fn display_name(&self) -> &'static str {
        match self {
            Subject::Math => "Math Jungle",
            Subject::Science => "Science Desert",
            Subject::English => "English Castle",
            Subject::Social => "Social City",
        }
    }
}

impl FromStr for Subject {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "math" => Ok(Subject::Math),
            "science" => Ok(Subject::Science),
            "english" => Ok(Subject::English),
            "social" => Ok(Subject::Social),
            _ => Err(QuestionError::UnknownSubject(s.to_string())),
        }
    }
}

/// Question difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

/// Unknown labels read as easy
impl FromStr for Difficulty {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "medium" | "med" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Easy,
        })
    }
}

/// Canonical question identity, persisted in the seen set
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deterministic identity for items without an explicit id.
    ///
    /// 32-bit `h * 31 + unit` rolling hash over the UTF-16 units of
    /// `world|question|choice|choice...`, printed in base 36.
    pub fn from_content(world: &str, question: &str, choices: &[String]) -> Self {
        let base = format!("{}|{}|{}", world, question, choices.join("|"));
        let mut h: i32 = 0;
        for unit in base.encode_utf16() {
            h = h.wrapping_shl(5).wrapping_sub(h).wrapping_add(unit as i32);
        }
        let world = if world.is_empty() { "x" } else { world };
        Self(format!("kq_{}_{}", world, to_base36(h as u32)))
    }
}

impl std::fmt::Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn to_base36(mut n: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Why a raw item was rejected at load time
#[derive(Debug, Error, PartialEq)]
pub enum QuestionError {
    #[error("unknown subject {0:?}")]
    UnknownSubject(String),
    #[error("question {id} has {count} choices, need at least 2")]
    TooFewChoices { id: String, count: usize },
    #[error("question {id} answer index {index} out of range for {len} choices")]
    AnswerOutOfRange { id: String, index: i64, len: usize },
}

/// Question as it appears in the JSON data file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQuestion {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, rename = "_id")]
    pub alt_id: Option<Value>,
    #[serde(default)]
    pub world: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default, rename = "answerIndex")]
    pub answer_index: Option<i64>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Non-empty string or non-zero number ids count as explicit
fn explicit_id(value: &Option<Value>) -> Option<String> {
    match value.as_ref()? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

impl RawQuestion {
    /// Canonical identity: `id`, then `_id`, then a content hash
    pub fn identity(&self) -> QuestionId {
        explicit_id(&self.id)
            .or_else(|| explicit_id(&self.alt_id))
            .map(QuestionId)
            .unwrap_or_else(|| {
                QuestionId::from_content(
                    self.world.as_deref().unwrap_or(""),
                    &self.question,
                    &self.choices,
                )
            })
    }
}

/// An immutable multiple-choice quiz item
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionItem {
    pub id: QuestionId,
    pub subject: Subject,
    pub topic: Option<String>,
    pub difficulty: Difficulty,
    pub prompt: String,
    pub choices: Vec<String>,
    pub answer_index: usize,
    pub hint: Option<String>,
    pub explanation: Option<String>,
}

impl QuestionItem {
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.answer_index
    }
}

impl TryFrom<RawQuestion> for QuestionItem {
    type Error = QuestionError;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        let id = raw.identity();
        let world = raw.world.clone().unwrap_or_default();
        let subject: Subject = world.parse()?;

        if raw.choices.len() < 2 {
            return Err(QuestionError::TooFewChoices {
                id: id.0,
                count: raw.choices.len(),
            });
        }
        let index = raw.answer_index.unwrap_or(-1);
        if index < 0 || index as usize >= raw.choices.len() {
            return Err(QuestionError::AnswerOutOfRange {
                id: id.0,
                index,
                len: raw.choices.len(),
            });
        }

        Ok(Self {
            id,
            subject,
            topic: raw.topic,
            difficulty: raw
                .difficulty
                .as_deref()
                .and_then(|d| d.parse().ok())
                .unwrap_or_default(),
            prompt: raw.question,
            choices: raw.choices,
            answer_index: index as usize,
            hint: raw.hint.filter(|h| !h.is_empty()),
            explanation: raw.explanation.filter(|e| !e.is_empty()),
        })
    }
}
