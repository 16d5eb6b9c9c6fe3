//! Domain models shared across the gateway: quizzes, questions, choices,
//! attempts, users, and the tier tag recording which persistence tier owns a
//! record.
//!
//! Quiz identifiers are strings everywhere. The upstream API hands out
//! numeric ids and the local store generates `local-<uuid>` ids; both are
//! stringified at the data-access boundary so identity comparison is always
//! string equality.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which persistence tier is authoritative for a record.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
  Remote,
  Local,
}

/// How a question is answered: one exclusive choice, or independent toggles.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
  #[default]
  Single,
  Multi,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  #[default]
  Student,
  Teacher,
  Admin,
}

/// Quiz as listed on dashboards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuizSummary {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub published: bool,
  #[serde(default)]
  pub created_by: Option<String>,
  pub tier: Tier,
}

/// Canonical option shape. Legacy shapes (bare strings, `choice` fields,
/// separate correct-index lists) are converted to this at the boundary and
/// never travel further in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Choice {
  #[serde(default)]
  pub id: Option<String>,
  pub text: String,
  #[serde(default)]
  pub is_correct: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Question {
  #[serde(default)]
  pub id: Option<String>,
  pub text: String,
  #[serde(default)]
  pub kind: QuestionKind,
  #[serde(default)]
  pub choices: Vec<Choice>,
}

impl Question {
  /// Indices of the choices marked correct, in option order.
  pub fn correct_indices(&self) -> Vec<usize> {
    self
      .choices
      .iter()
      .enumerate()
      .filter(|(_, c)| c.is_correct)
      .map(|(i, _)| i)
      .collect()
  }
}

/// An authored aggregate on its way through the reconciler: one quiz with
/// nested questions and choices, treated as a single unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuizDraft {
  /// Present when editing an existing record; absent for a new quiz.
  #[serde(default)]
  pub id: Option<String>,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub created_by: Option<String>,
  #[serde(default)]
  pub questions: Vec<Question>,
}

/// A quiz aggregate persisted in the local draft store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredQuiz {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub created_by: Option<String>,
  #[serde(default)]
  pub published: bool,
  #[serde(default)]
  pub questions: Vec<Question>,
  /// False until the draft has been pushed to the upstream store.
  #[serde(default)]
  pub migrated: bool,
  pub last_updated: DateTime<Utc>,
}

impl StoredQuiz {
  pub fn summary(&self) -> QuizSummary {
    QuizSummary {
      id: self.id.clone(),
      title: self.title.clone(),
      description: self.description.clone(),
      category: self.category.clone(),
      published: self.published,
      created_by: self.created_by.clone(),
      tier: Tier::Local,
    }
  }
}

/// One completed, scored submission of a quiz. Append-only; never mutated
/// after creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Attempt {
  pub username: String,
  pub quiz_id: String,
  /// Denormalized at write time so the history view survives quiz deletion.
  pub quiz_title: String,
  pub score: usize,
  pub total: usize,
  pub taken_at: DateTime<Utc>,
}

/// Identity record. The password is only present for locally registered
/// fallback users and is stored in the clear, matching the upstream store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
  #[serde(default)]
  pub id: Option<String>,
  pub username: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub password: Option<String>,
  #[serde(default)]
  pub role: Role,
}
