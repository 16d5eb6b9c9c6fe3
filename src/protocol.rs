//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve gateway and clients independently.
//!
//! Wire field names stay camelCase to match the legacy clients. Outgoing
//! question payloads never carry correctness flags; grading happens inside
//! the gateway and only scores leave it.

use serde::{Deserialize, Serialize};

use crate::domain::{Attempt, Choice, Question, QuestionKind, QuizDraft, Tier, User};
use crate::logic::{SortKey, StatusFilter};

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub upstream: bool,
}

// --- Quiz detail (student view, correctness redacted) ---

#[derive(Debug, Serialize)]
pub struct ChoiceOut {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct QuestionOut {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub options: Vec<ChoiceOut>,
}

#[derive(Debug, Serialize)]
pub struct QuizDetailOut {
    pub id: String,
    pub questions: Vec<QuestionOut>,
}

pub fn question_to_out(q: &Question) -> QuestionOut {
    QuestionOut {
        id: q.id.clone(),
        text: q.text.clone(),
        kind: q.kind,
        options: q
            .choices
            .iter()
            .map(|c| ChoiceOut { id: c.id.clone(), text: c.text.clone() })
            .collect(),
    }
}

// --- Authoring input ---

#[derive(Debug, Deserialize)]
pub struct DraftIn {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, rename = "createdBy")]
    pub created_by: Option<String>,
    #[serde(default)]
    pub questions: Vec<DraftQuestionIn>,
}

#[derive(Debug, Deserialize)]
pub struct DraftQuestionIn {
    pub text: String,
    #[serde(default, rename = "type")]
    pub kind: Option<QuestionKind>,
    #[serde(default)]
    pub options: Vec<String>,
    /// Zero-based indices into `options`.
    #[serde(default)]
    pub correct: Vec<usize>,
}

impl DraftIn {
    /// Canonicalize the wire shape (option texts + correct indices) into the
    /// internal draft form with per-choice flags.
    pub fn into_draft(self) -> QuizDraft {
        let questions = self
            .questions
            .into_iter()
            .map(|q| {
                let kind = q.kind.unwrap_or(if q.correct.len() > 1 {
                    QuestionKind::Multi
                } else {
                    QuestionKind::Single
                });
                let choices = q
                    .options
                    .iter()
                    .enumerate()
                    .map(|(i, text)| Choice {
                        id: None,
                        text: text.clone(),
                        is_correct: q.correct.contains(&i),
                    })
                    .collect();
                Question { id: None, text: q.text, kind, choices }
            })
            .collect();
        QuizDraft {
            id: self.id,
            title: self.title,
            description: self.description,
            category: self.category,
            created_by: self.created_by,
            questions,
        }
    }
}

// --- Attempts ---

#[derive(Debug, Deserialize)]
pub struct AttemptIn {
    pub username: String,
    #[serde(rename = "quizId")]
    pub quiz_id: String,
    /// One selection set per question, positional; missing trailing entries
    /// read as "nothing selected".
    #[serde(default)]
    pub selections: Vec<Vec<usize>>,
}

#[derive(Debug, Serialize)]
pub struct AttemptOut {
    pub username: String,
    #[serde(rename = "quizId")]
    pub quiz_id: String,
    #[serde(rename = "quizTitle")]
    pub quiz_title: String,
    pub score: usize,
    pub total: usize,
    #[serde(rename = "takenAt")]
    pub taken_at: String,
}

pub fn attempt_to_out(a: &Attempt) -> AttemptOut {
    AttemptOut {
        username: a.username.clone(),
        quiz_id: a.quiz_id.clone(),
        quiz_title: a.quiz_title.clone(),
        score: a.score,
        total: a.total,
        taken_at: a.taken_at.to_rfc3339(),
    }
}

// --- Dashboard filters ---

#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub status: Option<StatusFilter>,
    #[serde(default)]
    pub sort: Option<SortKey>,
}

// --- Auth ---

#[derive(Debug, Deserialize)]
pub struct RegisterIn {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginIn {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordIn {
    #[serde(rename = "newPassword")]
    pub new_password: String,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: String,
}

#[derive(Debug, Serialize)]
pub struct UserOut {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    pub role: crate::domain::Role,
}

pub fn user_to_out(u: &User) -> UserOut {
    UserOut { id: u.id.clone(), username: u.username.clone(), role: u.role }
}

#[derive(Debug, Serialize)]
pub struct SaveOut {
    pub location: Tier,
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct OkOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_in_canonicalizes_correct_indices_to_flags() {
        let raw = serde_json::json!({
            "title": "Math Basics",
            "questions": [
                { "text": "pick two", "options": ["a", "b", "c"], "correct": [0, 2] }
            ]
        });
        let draft: DraftIn = serde_json::from_value(raw).unwrap();
        let draft = draft.into_draft();
        let q = &draft.questions[0];
        assert_eq!(q.kind, QuestionKind::Multi);
        assert_eq!(q.correct_indices(), vec![0, 2]);
        assert!(!q.choices[1].is_correct);
    }

    #[test]
    fn question_out_never_leaks_correctness() {
        let q = Question {
            id: Some("70".into()),
            text: "2+2?".into(),
            kind: QuestionKind::Single,
            choices: vec![Choice { id: None, text: "4".into(), is_correct: true }],
        };
        let value = serde_json::to_value(question_to_out(&q)).unwrap();
        let opt = &value["options"][0];
        assert!(opt.get("isCorrect").is_none());
        assert!(opt.get("is_correct").is_none());
        assert_eq!(opt["text"], "4");
    }
}
