//! Pure core behaviors shared by the HTTP handlers and the recorder:
//! grading and the filtered/sorted dashboard view.
//!
//! Grading rule: a question counts iff the submitted option-index set equals
//! the set of indices marked correct, exactly. No partial credit, no credit
//! for supersets. A question with no correct options is satisfied only by an
//! empty submission; a question with no options at all therefore grades as
//! correct (observed legacy behavior, kept deliberately).

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::domain::{Attempt, Question, QuizSummary};

/// Score a submission against a quiz's question list.
///
/// `selections` is positional: entry `i` holds the option indices the user
/// picked for question `i`. Missing trailing entries read as "nothing
/// selected". Returns the number of correct questions, in `[0, N]`.
pub fn grade(questions: &[Question], selections: &[Vec<usize>]) -> usize {
  questions
    .iter()
    .enumerate()
    .filter(|(i, q)| {
      let submitted: BTreeSet<usize> = selections.get(*i).into_iter().flatten().copied().collect();
      let correct: BTreeSet<usize> = q.correct_indices().into_iter().collect();
      submitted == correct
    })
    .count()
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
  #[default]
  All,
  Attempted,
  NotAttempted,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
  #[default]
  Title,
  Category,
}

/// Derive the filtered, sorted dashboard view.
///
/// `attempts` must already be scoped to the current user; membership is
/// tested on string-compared quiz ids so numeric upstream ids and local
/// draft ids mix freely. `subject == "all"` disables the category filter.
/// Sorting is a stable lexicographic ascend, so equal keys keep input order.
pub fn filtered_quizzes(
  all: &[QuizSummary],
  attempts: &[Attempt],
  subject: &str,
  status: StatusFilter,
  sort: SortKey,
) -> Vec<QuizSummary> {
  let attempted: BTreeSet<&str> = attempts.iter().map(|a| a.quiz_id.as_str()).collect();

  let mut list: Vec<QuizSummary> = all
    .iter()
    .filter(|q| subject == "all" || q.category == subject)
    .filter(|q| match status {
      StatusFilter::All => true,
      StatusFilter::Attempted => attempted.contains(q.id.as_str()),
      StatusFilter::NotAttempted => !attempted.contains(q.id.as_str()),
    })
    .cloned()
    .collect();

  match sort {
    SortKey::Title => list.sort_by(|a, b| a.title.cmp(&b.title)),
    SortKey::Category => list.sort_by(|a, b| a.category.cmp(&b.category)),
  }
  list
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Choice, QuestionKind, Tier};
  use chrono::Utc;

  fn question(correct: &[bool]) -> Question {
    Question {
      id: None,
      text: "q".into(),
      kind: if correct.iter().filter(|c| **c).count() > 1 {
        QuestionKind::Multi
      } else {
        QuestionKind::Single
      },
      choices: correct
        .iter()
        .map(|&is_correct| Choice {
          id: None,
          text: "opt".into(),
          is_correct,
        })
        .collect(),
    }
  }

  fn summary(id: &str, title: &str, category: &str) -> QuizSummary {
    QuizSummary {
      id: id.into(),
      title: title.into(),
      description: String::new(),
      category: category.into(),
      published: true,
      created_by: None,
      tier: Tier::Remote,
    }
  }

  fn attempt(quiz_id: &str) -> Attempt {
    Attempt {
      username: "s1".into(),
      quiz_id: quiz_id.into(),
      quiz_title: String::new(),
      score: 0,
      total: 1,
      taken_at: Utc::now(),
    }
  }

  #[test]
  fn exact_set_equality_no_partial_credit() {
    let qs = vec![question(&[true, true, false])];
    assert_eq!(grade(&qs, &[vec![0, 1]]), 1);
    assert_eq!(grade(&qs, &[vec![1, 0]]), 1);
    assert_eq!(grade(&qs, &[vec![0]]), 0);
    assert_eq!(grade(&qs, &[vec![0, 1, 2]]), 0);
    assert_eq!(grade(&qs, &[vec![]]), 0);
  }

  #[test]
  fn score_stays_within_question_count() {
    let qs = vec![question(&[true, false]), question(&[false, true])];
    assert_eq!(grade(&qs, &[vec![0], vec![1]]), 2);
    assert_eq!(grade(&qs, &[vec![1], vec![0]]), 0);
    // Missing trailing selections are empty sets, not errors.
    assert_eq!(grade(&qs, &[vec![0]]), 1);
    assert_eq!(grade(&qs, &[]), 0);
  }

  #[test]
  fn no_correct_options_requires_empty_submission() {
    let qs = vec![question(&[false, false])];
    assert_eq!(grade(&qs, &[vec![]]), 1);
    assert_eq!(grade(&qs, &[vec![0]]), 0);
  }

  #[test]
  fn question_without_options_grades_correct() {
    // Legacy behavior kept: both sets are empty, so they compare equal.
    let qs = vec![question(&[])];
    assert_eq!(grade(&qs, &[vec![]]), 1);
  }

  #[test]
  fn attempted_filter_and_its_complement_partition_the_list() {
    let all = vec![summary("1", "A", ""), summary("2", "B", ""), summary("local-x", "C", "")];
    let attempts = vec![attempt("1"), attempt("local-x")];

    let taken = filtered_quizzes(&all, &attempts, "all", StatusFilter::Attempted, SortKey::Title);
    let rest = filtered_quizzes(&all, &attempts, "all", StatusFilter::NotAttempted, SortKey::Title);

    let taken_ids: Vec<&str> = taken.iter().map(|q| q.id.as_str()).collect();
    let rest_ids: Vec<&str> = rest.iter().map(|q| q.id.as_str()).collect();
    assert_eq!(taken_ids, ["1", "local-x"]);
    assert_eq!(rest_ids, ["2"]);
  }

  #[test]
  fn subject_filter_matches_category_equality() {
    let all = vec![summary("1", "A", "math"), summary("2", "B", "science")];
    let out = filtered_quizzes(&all, &[], "math", StatusFilter::All, SortKey::Title);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, "1");
    // "all" disables the filter entirely.
    assert_eq!(filtered_quizzes(&all, &[], "all", StatusFilter::All, SortKey::Title).len(), 2);
  }

  #[test]
  fn sort_is_stable_for_equal_keys() {
    let all = vec![
      summary("1", "Zed", "same"),
      summary("2", "Alpha", "same"),
      summary("3", "Mid", "same"),
    ];
    let by_title = filtered_quizzes(&all, &[], "all", StatusFilter::All, SortKey::Title);
    let titles: Vec<&str> = by_title.iter().map(|q| q.title.as_str()).collect();
    assert_eq!(titles, ["Alpha", "Mid", "Zed"]);

    // Equal category keys keep input order.
    let by_cat = filtered_quizzes(&all, &[], "all", StatusFilter::All, SortKey::Category);
    let ids: Vec<&str> = by_cat.iter().map(|q| q.id.as_str()).collect();
    assert_eq!(ids, ["1", "2", "3"]);
  }
}
