//! Question repository
//!
//! Loading, identity and selection of quiz items. Pure data: no timers,
//! no storage access (the seen set is persisted by the session).

pub mod bank;
pub mod question;

pub use bank::{BankError, QuestionBank, SeenSet, default_questions};
pub use question::{Difficulty, QuestionError, QuestionId, QuestionItem, RawQuestion, Subject};
