//! Local persistence tier: one JSON file per storage key under the data
//! directory.
//!
//! Keys mirror the legacy browser layout: `quizzes` (locally authored
//! drafts), `quizzes_cache` (last known upstream snapshot), `studentAttempts`
//! (append-only attempt log), `users` (fallback credential records) and
//! `currentUser` (the logged-in identity).
//!
//! Reads of a missing file yield empty state. Writes rewrite the whole file;
//! there is no locking discipline around read-modify-write sequences, so
//! concurrent writers to the same key can lose updates. That window is
//! accepted for single-user usage.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::{Attempt, QuizSummary, StoredQuiz, User};

const KEY_DRAFTS: &str = "quizzes";
const KEY_CACHE: &str = "quizzes_cache";
const KEY_ATTEMPTS: &str = "studentAttempts";
const KEY_USERS: &str = "users";
const KEY_CURRENT_USER: &str = "currentUser";

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("corrupt store file {key}: {source}")]
  Corrupt {
    key: String,
    #[source]
    source: serde_json::Error,
  },
}

#[derive(Clone, Debug)]
pub struct LocalStore {
  root: PathBuf,
}

impl LocalStore {
  /// Open (and create if needed) the data directory.
  pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
    let root = root.as_ref().to_path_buf();
    fs::create_dir_all(&root)?;
    Ok(Self { root })
  }

  fn path(&self, key: &str) -> PathBuf {
    self.root.join(format!("{key}.json"))
  }

  fn read_key<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
    let path = self.path(key);
    let raw = match fs::read_to_string(&path) {
      Ok(s) => s,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
      Err(e) => return Err(e.into()),
    };
    let value = serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
      key: key.to_string(),
      source,
    })?;
    Ok(Some(value))
  }

  fn write_key<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
    let raw = serde_json::to_string_pretty(value).map_err(|source| StoreError::Corrupt {
      key: key.to_string(),
      source,
    })?;
    fs::write(self.path(key), raw)?;
    debug!(target: "quizdesk", key, "Local store key written");
    Ok(())
  }

  fn remove_key(&self, key: &str) -> Result<(), StoreError> {
    match fs::remove_file(self.path(key)) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }

  // --- Quiz cache (last known upstream snapshot) ---

  pub fn quiz_cache(&self) -> Result<Option<Vec<QuizSummary>>, StoreError> {
    self.read_key(KEY_CACHE)
  }

  /// Overwrite the cache with a fresh upstream snapshot.
  pub fn put_quiz_cache(&self, quizzes: &[QuizSummary]) -> Result<(), StoreError> {
    self.write_key(KEY_CACHE, &quizzes)
  }

  // --- Local drafts (legacy `quizzes` key) ---

  pub fn drafts(&self) -> Result<Vec<StoredQuiz>, StoreError> {
    Ok(self.read_key(KEY_DRAFTS)?.unwrap_or_default())
  }

  pub fn put_drafts(&self, drafts: &[StoredQuiz]) -> Result<(), StoreError> {
    self.write_key(KEY_DRAFTS, &drafts)
  }

  // --- Attempt log ---

  pub fn attempts(&self) -> Result<Vec<Attempt>, StoreError> {
    Ok(self.read_key(KEY_ATTEMPTS)?.unwrap_or_default())
  }

  /// Full-log rewrite; callers append to the vec they read.
  pub fn put_attempts(&self, attempts: &[Attempt]) -> Result<(), StoreError> {
    self.write_key(KEY_ATTEMPTS, &attempts)
  }

  // --- Users / current identity ---

  pub fn users(&self) -> Result<Vec<User>, StoreError> {
    Ok(self.read_key(KEY_USERS)?.unwrap_or_default())
  }

  pub fn put_users(&self, users: &[User]) -> Result<(), StoreError> {
    self.write_key(KEY_USERS, &users)
  }

  pub fn current_user(&self) -> Result<Option<User>, StoreError> {
    self.read_key(KEY_CURRENT_USER)
  }

  pub fn set_current_user(&self, user: Option<&User>) -> Result<(), StoreError> {
    match user {
      Some(u) => self.write_key(KEY_CURRENT_USER, u),
      None => self.remove_key(KEY_CURRENT_USER),
    }
  }
}


#[cfg(test)]
mod tests {
  use super::testing::temp_store;
  use crate::domain::{Attempt, QuestionKind, Question, StoredQuiz, Tier, QuizSummary};
  use chrono::Utc;

  fn summary(id: &str, title: &str) -> QuizSummary {
    QuizSummary {
      id: id.into(),
      title: title.into(),
      description: String::new(),
      category: String::new(),
      published: true,
      created_by: None,
      tier: Tier::Remote,
    }
  }

  #[test]
  fn missing_keys_read_as_empty_state() {
    let store = temp_store();
    assert!(store.quiz_cache().unwrap().is_none());
    assert!(store.drafts().unwrap().is_empty());
    assert!(store.attempts().unwrap().is_empty());
    assert!(store.current_user().unwrap().is_none());
  }

  #[test]
  fn cache_is_overwritten_not_merged() {
    let store = temp_store();
    store.put_quiz_cache(&[summary("1", "Old"), summary("2", "Older")]).unwrap();
    store.put_quiz_cache(&[summary("3", "Fresh")]).unwrap();

    let cached = store.quiz_cache().unwrap().unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].id, "3");
  }

  #[test]
  fn drafts_round_trip_with_nested_questions() {
    let store = temp_store();
    let draft = StoredQuiz {
      id: "local-a".into(),
      title: "Math".into(),
      description: "basics".into(),
      category: "math".into(),
      created_by: Some("t1".into()),
      published: false,
      questions: vec![Question {
        id: None,
        text: "2+2?".into(),
        kind: QuestionKind::Single,
        choices: vec![],
      }],
      migrated: false,
      last_updated: Utc::now(),
    };
    store.put_drafts(&[draft]).unwrap();

    let back = store.drafts().unwrap();
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].questions[0].text, "2+2?");
    assert!(!back[0].migrated);
  }

  #[test]
  fn attempt_log_rewrite_keeps_every_record() {
    let store = temp_store();
    for i in 0..3 {
      let mut log = store.attempts().unwrap();
      log.push(Attempt {
        username: "s1".into(),
        quiz_id: "7".into(),
        quiz_title: "Quiz".into(),
        score: i,
        total: 3,
        taken_at: Utc::now(),
      });
      store.put_attempts(&log).unwrap();
    }
    assert_eq!(store.attempts().unwrap().len(), 3);
  }
}
