//! Authoring workflows: saving a quiz through the dual-write pipeline,
//! loading one back for editing, publish toggling and deletion.
//!
//! The save pipeline is remote-first with whole-aggregate local fallback:
//! quiz row, then each question, then each option, strictly in order,
//! aborting on the first upstream failure. Nothing created upstream before
//! the failure is rolled back; the draft is then stored locally in full and
//! retried on a later save.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::{QuizDraft, StoredQuiz, Tier};
use crate::error::AppError;
use crate::remote::{NewQuiz, QuizPatch, RemoteError};
use crate::state::AppState;
use crate::util::{is_local_id, LOCAL_ID_PREFIX};

/// Outcome of a save: where the quiz ended up and under which id.
#[derive(Clone, Debug, Serialize)]
pub struct SaveReceipt {
  pub tier: Tier,
  pub id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublishReceipt {
  pub tier: Tier,
  pub published: bool,
}

impl AppState {
  /// Validate and persist a draft, upstream when possible, locally otherwise.
  ///
  /// A successful upstream save of a previously local draft also removes
  /// that draft from the local store (one-way migration).
  #[instrument(level = "info", skip(self, draft), fields(title = %draft.title))]
  pub async fn save_quiz(&self, draft: QuizDraft) -> Result<SaveReceipt, AppError> {
    if draft.title.trim().is_empty() {
      return Err(AppError::BadRequest("quiz title is required".into()));
    }
    if draft.questions.is_empty() {
      return Err(AppError::BadRequest("quiz needs at least one question".into()));
    }

    if self.backend.health().await {
      match self.push_remote(&draft).await {
        Ok(remote_id) => {
          if let Some(id) = draft.id.as_deref() {
            if is_local_id(id) {
              let mut drafts = self.store.drafts()?;
              drafts.retain(|d| d.id != id);
              self.store.put_drafts(&drafts)?;
              info!(target: "sync", local_id = %id, %remote_id, "Local draft migrated upstream");
            }
          }
          return Ok(SaveReceipt { tier: Tier::Remote, id: remote_id });
        }
        Err(e) => {
          warn!(target: "sync", error = %e, "Upstream save failed; keeping quiz locally");
        }
      }
    }

    let id = self.save_draft_locally(draft)?;
    Ok(SaveReceipt { tier: Tier::Local, id })
  }

  /// Push the whole aggregate upstream, one row at a time. The first error
  /// aborts the sequence; rows already created are left in place.
  async fn push_remote(&self, draft: &QuizDraft) -> Result<String, RemoteError> {
    let quiz = self
      .backend
      .create_quiz(&NewQuiz {
        title: draft.title.clone(),
        description: draft.description.clone(),
        created_by: draft.created_by.clone(),
      })
      .await?;

    for question in &draft.questions {
      let created = self.backend.create_question(&quiz.id, &question.text).await?;
      for choice in &question.choices {
        self
          .backend
          .create_option(&created.id, &choice.text, choice.is_correct)
          .await?;
      }
    }
    Ok(quiz.id)
  }

  fn save_draft_locally(&self, draft: QuizDraft) -> Result<String, AppError> {
    let mut drafts = self.store.drafts()?;
    let id = draft
      .id
      .clone()
      .unwrap_or_else(|| format!("{LOCAL_ID_PREFIX}{}", Uuid::new_v4()));

    let published = drafts
      .iter()
      .find(|d| d.id == id)
      .map(|d| d.published)
      .unwrap_or(false);
    let stored = StoredQuiz {
      id: id.clone(),
      title: draft.title,
      description: draft.description,
      category: draft.category,
      created_by: draft.created_by,
      published,
      questions: draft.questions,
      migrated: false,
      last_updated: Utc::now(),
    };

    match drafts.iter_mut().find(|d| d.id == id) {
      Some(slot) => *slot = stored,
      None => drafts.push(stored),
    }
    self.store.put_drafts(&drafts)?;
    info!(target: "quizdesk", %id, "Quiz saved to local draft store");
    Ok(id)
  }

  /// Reconstruct an editable draft: local drafts win, then the upstream
  /// aggregate, then not-found.
  #[instrument(level = "info", skip(self), fields(%quiz_id))]
  pub async fn load_for_edit(&self, quiz_id: &str) -> Result<QuizDraft, AppError> {
    let drafts = self.store.drafts()?;
    if let Some(d) = drafts.into_iter().find(|d| d.id == quiz_id) {
      return Ok(QuizDraft {
        id: Some(d.id),
        title: d.title,
        description: d.description,
        category: d.category,
        created_by: d.created_by,
        questions: d.questions,
      });
    }

    if self.backend.health().await {
      if let Ok(quiz) = self.backend.get_quiz(quiz_id).await {
        let questions = self.quiz_detail(quiz_id).await?;
        return Ok(QuizDraft {
          id: Some(quiz.id),
          title: quiz.title,
          description: quiz.description.unwrap_or_default(),
          category: String::new(),
          created_by: quiz.created_by,
          questions,
        });
      }
    }

    Err(AppError::NotFound("quiz not found".into()))
  }

  /// Flip a quiz's published flag: upstream when the quiz lives there,
  /// local draft otherwise.
  #[instrument(level = "info", skip(self), fields(%quiz_id))]
  pub async fn toggle_publish(&self, quiz_id: &str) -> Result<PublishReceipt, AppError> {
    if !is_local_id(quiz_id) && self.backend.health().await {
      let remote_flip = async {
        let quiz = self.backend.get_quiz(quiz_id).await?;
        let patch = QuizPatch {
          published: Some(!quiz.published),
          ..QuizPatch::default()
        };
        self.backend.patch_quiz(quiz_id, &patch).await
      };
      match remote_flip.await {
        Ok(updated) => {
          return Ok(PublishReceipt { tier: Tier::Remote, published: updated.published });
        }
        Err(e) => {
          warn!(target: "sync", %quiz_id, error = %e, "Upstream publish toggle failed; trying local draft");
        }
      }
    }

    let mut drafts = self.store.drafts()?;
    let draft = drafts
      .iter_mut()
      .find(|d| d.id == quiz_id)
      .ok_or_else(|| AppError::NotFound("quiz not found".into()))?;
    draft.published = !draft.published;
    draft.last_updated = Utc::now();
    let published = draft.published;
    self.store.put_drafts(&drafts)?;
    Ok(PublishReceipt { tier: Tier::Local, published })
  }

  /// Delete upstream when reachable; otherwise drop the local draft.
  #[instrument(level = "info", skip(self), fields(%quiz_id))]
  pub async fn delete_quiz(&self, quiz_id: &str) -> Result<(), AppError> {
    if !is_local_id(quiz_id) && self.backend.health().await {
      match self.backend.delete_quiz(quiz_id).await {
        Ok(()) => return Ok(()),
        Err(e) => {
          warn!(target: "sync", %quiz_id, error = %e, "Upstream delete failed; trying local draft");
        }
      }
    }

    let mut drafts = self.store.drafts()?;
    let before = drafts.len();
    drafts.retain(|d| d.id != quiz_id);
    if drafts.len() == before {
      return Err(AppError::NotFound("quiz not found".into()));
    }
    self.store.put_drafts(&drafts)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::config::AppConfig;
  use crate::domain::{Choice, Question, QuestionKind};
  use crate::remote::testing::ScriptedBackend;
  use crate::store::testing::temp_store;

  fn state(backend: ScriptedBackend) -> AppState {
    AppState::from_parts(Arc::new(backend), temp_store(), AppConfig::default())
  }

  fn draft(title: &str) -> QuizDraft {
    QuizDraft {
      id: None,
      title: title.into(),
      description: "desc".into(),
      category: "math".into(),
      created_by: Some("t1".into()),
      questions: vec![Question {
        id: None,
        text: "2+2?".into(),
        kind: QuestionKind::Single,
        choices: vec![
          Choice { id: None, text: "3".into(), is_correct: false },
          Choice { id: None, text: "4".into(), is_correct: true },
        ],
      }],
    }
  }

  #[tokio::test]
  async fn remote_save_creates_quiz_then_questions_then_options() {
    let backend = Arc::new(ScriptedBackend::healthy());
    let state = AppState::from_parts(backend.clone(), temp_store(), AppConfig::default());

    let receipt = state.save_quiz(draft("Math Basics")).await.unwrap();
    assert_eq!(receipt.tier, Tier::Remote);

    let log = backend.log.lock().unwrap().clone();
    assert_eq!(log.len(), 4);
    assert!(log[0].starts_with("quiz:"));
    assert!(log[1].starts_with("question:"));
    assert!(log[2].starts_with("option:"));
    assert!(log[3].starts_with("option:"));
    assert!(state.store.drafts().unwrap().is_empty());
  }

  #[tokio::test]
  async fn quiz_create_failure_saves_full_aggregate_locally() {
    let state = state(ScriptedBackend::failing_quiz_create());

    let receipt = state.save_quiz(draft("Math Basics")).await.unwrap();
    assert_eq!(receipt.tier, Tier::Local);
    assert!(receipt.id.starts_with(LOCAL_ID_PREFIX));

    let drafts = state.store.drafts().unwrap();
    assert_eq!(drafts.len(), 1);
    assert!(!drafts[0].migrated);
    assert!(!drafts[0].published);
    assert_eq!(drafts[0].questions.len(), 1);
    assert_eq!(drafts[0].questions[0].choices.len(), 2);
  }

  #[tokio::test]
  async fn mid_sequence_failure_falls_back_and_leaves_partial_remote_rows() {
    let backend = Arc::new(ScriptedBackend::failing_question(1));
    let state = AppState::from_parts(backend.clone(), temp_store(), AppConfig::default());

    let receipt = state.save_quiz(draft("Math Basics")).await.unwrap();
    assert_eq!(receipt.tier, Tier::Local);

    // The quiz row created before the failure is not rolled back.
    assert_eq!(backend.quizzes.lock().unwrap().len(), 1);
    assert!(backend.questions.lock().unwrap().is_empty());
    assert_eq!(state.store.drafts().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn blank_title_is_rejected_with_no_side_effects() {
    let backend = Arc::new(ScriptedBackend::healthy());
    let state = AppState::from_parts(backend.clone(), temp_store(), AppConfig::default());

    let err = state.save_quiz(draft("   ")).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(backend.log.lock().unwrap().is_empty());
    assert!(state.store.drafts().unwrap().is_empty());
  }

  #[tokio::test]
  async fn empty_question_list_is_rejected() {
    let state = state(ScriptedBackend::healthy());
    let mut d = draft("Math Basics");
    d.questions.clear();
    let err = state.save_quiz(d).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
  }

  #[tokio::test]
  async fn successful_remote_save_migrates_only_the_matching_draft() {
    let state = state(ScriptedBackend::unreachable());
    let kept = state.save_quiz(draft("Kept Offline")).await.unwrap();
    let migrating = state.save_quiz(draft("Math Basics")).await.unwrap();
    assert_eq!(state.store.drafts().unwrap().len(), 2);

    // Upstream comes back; re-saving one draft must not disturb the other.
    let state = AppState::from_parts(
      Arc::new(ScriptedBackend::healthy()),
      state.store.clone(),
      AppConfig::default(),
    );
    let mut d = draft("Math Basics");
    d.id = Some(migrating.id);
    let receipt = state.save_quiz(d).await.unwrap();
    assert_eq!(receipt.tier, Tier::Remote);

    let drafts = state.store.drafts().unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].id, kept.id);
  }

  #[tokio::test]
  async fn local_resave_replaces_the_draft_in_place() {
    let state = state(ScriptedBackend::unreachable());
    let first = state.save_quiz(draft("Math Basics")).await.unwrap();

    let mut d = draft("Math Basics v2");
    d.id = Some(first.id.clone());
    let second = state.save_quiz(d).await.unwrap();
    assert_eq!(second.id, first.id);

    let drafts = state.store.drafts().unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].title, "Math Basics v2");
  }

  #[tokio::test]
  async fn publish_toggle_falls_back_to_flipping_the_local_draft() {
    let state = state(ScriptedBackend::unreachable());
    let saved = state.save_quiz(draft("Math Basics")).await.unwrap();

    let receipt = state.toggle_publish(&saved.id).await.unwrap();
    assert_eq!(receipt.tier, Tier::Local);
    assert!(receipt.published);

    let receipt = state.toggle_publish(&saved.id).await.unwrap();
    assert!(!receipt.published);
  }

  #[tokio::test]
  async fn publish_toggle_patches_the_upstream_row() {
    let backend = Arc::new(ScriptedBackend::healthy());
    backend.seed_quiz("7", "Math Basics");
    let state = AppState::from_parts(backend.clone(), temp_store(), AppConfig::default());

    let receipt = state.toggle_publish("7").await.unwrap();
    assert_eq!(receipt.tier, Tier::Remote);
    assert!(!receipt.published);
  }

  #[tokio::test]
  async fn load_for_edit_prefers_the_local_draft() {
    let backend = Arc::new(ScriptedBackend::healthy());
    backend.seed_quiz("7", "Remote Title");
    let state = AppState::from_parts(backend, temp_store(), AppConfig::default());
    state
      .store
      .put_drafts(&[StoredQuiz {
        id: "7".into(),
        title: "Local Title".into(),
        description: String::new(),
        category: String::new(),
        created_by: None,
        published: false,
        questions: vec![],
        migrated: false,
        last_updated: Utc::now(),
      }])
      .unwrap();

    let draft = state.load_for_edit("7").await.unwrap();
    assert_eq!(draft.title, "Local Title");
  }

  #[tokio::test]
  async fn unknown_quiz_cannot_be_edited_or_deleted() {
    let state = state(ScriptedBackend::unreachable());
    assert!(matches!(
      state.load_for_edit("missing").await.unwrap_err(),
      AppError::NotFound(_)
    ));
    assert!(matches!(
      state.delete_quiz("missing").await.unwrap_err(),
      AppError::NotFound(_)
    ));
  }
}
