//! Upstream REST API client.
//!
//! The upstream persists quizzes, questions and options as three separate,
//! referentially-linked record kinds; this module exposes exactly those
//! operations plus the auth endpoints and the health probe. Payload quirks
//! are absorbed here: ids arrive as numbers or strings (stringified on the
//! way in), and boolean columns arrive as MySQL tinyints.
//!
//! The `QuizBackend` trait is the seam the reconciler and repository access
//! are written against; tests script it without a network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::util::trunc_for_log;

#[derive(Debug, Error)]
pub enum RemoteError {
  /// Transport-level failure: connection refused, timeout, malformed body.
  #[error("upstream transport error: {0}")]
  Transport(String),
  /// Non-success HTTP status with whatever message the upstream attached.
  #[error("upstream HTTP {status}: {message}")]
  Status { status: u16, message: String },
}

impl RemoteError {
  pub fn status(&self) -> Option<u16> {
    match self {
      RemoteError::Status { status, .. } => Some(*status),
      RemoteError::Transport(_) => None,
    }
  }
}

impl From<reqwest::Error> for RemoteError {
  fn from(e: reqwest::Error) -> Self {
    RemoteError::Transport(e.to_string())
  }
}

// --- Tolerant field decoding ---

fn de_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
  match Value::deserialize(d)? {
    Value::String(s) => Ok(s),
    Value::Number(n) => Ok(n.to_string()),
    other => Err(serde::de::Error::custom(format!(
      "expected string or number id, got {other}"
    ))),
  }
}

/// MySQL tinyint, JSON bool, or null.
fn de_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
  match Value::deserialize(d)? {
    Value::Bool(b) => Ok(b),
    Value::Number(n) => Ok(n.as_i64().unwrap_or(0) != 0),
    Value::Null => Ok(false),
    other => Err(serde::de::Error::custom(format!(
      "expected bool or tinyint, got {other}"
    ))),
  }
}

// --- Upstream row shapes ---

#[derive(Clone, Debug, Deserialize)]
pub struct RemoteQuiz {
  #[serde(deserialize_with = "de_id")]
  pub id: String,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default, deserialize_with = "de_flag")]
  pub published: bool,
  #[serde(default)]
  pub created_by: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RemoteQuestion {
  #[serde(deserialize_with = "de_id")]
  pub id: String,
  #[serde(deserialize_with = "de_id")]
  pub quiz_id: String,
  #[serde(default)]
  pub text: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RemoteOption {
  #[serde(deserialize_with = "de_id")]
  pub id: String,
  #[serde(deserialize_with = "de_id")]
  pub question_id: String,
  #[serde(default)]
  pub text: Option<String>,
  #[serde(default, deserialize_with = "de_flag")]
  pub is_correct: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RemoteUser {
  #[serde(deserialize_with = "de_id")]
  pub id: String,
  pub username: String,
  #[serde(default)]
  pub role: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewQuiz {
  pub title: String,
  pub description: String,
  /// Username or numeric id; an unknown username is auto-created upstream
  /// with role "teacher" (migration convenience, see the upstream contract).
  pub created_by: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct QuizPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub published: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub created_by: Option<String>,
}

/// Operations the gateway needs from the remote tier.
#[async_trait]
pub trait QuizBackend: Send + Sync {
  /// Lightweight liveness probe; any failure reads as "unreachable".
  async fn health(&self) -> bool;

  async fn list_quizzes(&self) -> Result<Vec<RemoteQuiz>, RemoteError>;
  async fn get_quiz(&self, id: &str) -> Result<RemoteQuiz, RemoteError>;
  async fn create_quiz(&self, quiz: &NewQuiz) -> Result<RemoteQuiz, RemoteError>;
  async fn patch_quiz(&self, id: &str, patch: &QuizPatch) -> Result<RemoteQuiz, RemoteError>;
  async fn delete_quiz(&self, id: &str) -> Result<(), RemoteError>;

  async fn create_question(&self, quiz_id: &str, text: &str) -> Result<RemoteQuestion, RemoteError>;
  async fn questions_for(&self, quiz_id: &str) -> Result<Vec<RemoteQuestion>, RemoteError>;
  async fn create_option(
    &self,
    question_id: &str,
    text: &str,
    is_correct: bool,
  ) -> Result<RemoteOption, RemoteError>;
  async fn options_for(&self, question_id: &str) -> Result<Vec<RemoteOption>, RemoteError>;

  async fn register(&self, username: &str, password: &str, role: &str) -> Result<RemoteUser, RemoteError>;
  async fn login(&self, username: &str, password: &str) -> Result<RemoteUser, RemoteError>;
}

/// reqwest-backed implementation talking to the real upstream.
#[derive(Clone)]
pub struct Upstream {
  client: reqwest::Client,
  base_url: String,
}

impl Upstream {
  pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, RemoteError> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .build()?;
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  async fn read_json<T: for<'a> Deserialize<'a>>(
    &self,
    res: reqwest::Response,
  ) -> Result<T, RemoteError> {
    let status = res.status();
    let body = res.text().await?;
    if !status.is_success() {
      let message = extract_upstream_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(RemoteError::Status {
        status: status.as_u16(),
        message,
      });
    }
    serde_json::from_str::<T>(&body)
      .map_err(|e| RemoteError::Transport(format!("malformed upstream payload: {e}")))
  }

  async fn get_json<T: for<'a> Deserialize<'a>>(&self, path: &str) -> Result<T, RemoteError> {
    let res = self
      .client
      .get(self.url(path))
      .header(USER_AGENT, "quizdesk/0.1")
      .send()
      .await?;
    self.read_json(res).await
  }

  async fn send_json<T: for<'a> Deserialize<'a>>(
    &self,
    method: reqwest::Method,
    path: &str,
    body: &Value,
  ) -> Result<T, RemoteError> {
    let res = self
      .client
      .request(method, self.url(path))
      .header(USER_AGENT, "quizdesk/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(body)
      .send()
      .await?;
    self.read_json(res).await
  }
}

#[async_trait]
impl QuizBackend for Upstream {
  #[instrument(level = "debug", skip(self))]
  async fn health(&self) -> bool {
    match self.client.get(self.url("/health")).send().await {
      Ok(res) => res.status().is_success(),
      Err(e) => {
        debug!(target: "quizdesk", error = %e, "Upstream health probe failed");
        false
      }
    }
  }

  async fn list_quizzes(&self) -> Result<Vec<RemoteQuiz>, RemoteError> {
    self.get_json("/quizzes").await
  }

  async fn get_quiz(&self, id: &str) -> Result<RemoteQuiz, RemoteError> {
    self.get_json(&format!("/quizzes/{id}")).await
  }

  #[instrument(level = "info", skip(self, quiz), fields(title = %quiz.title))]
  async fn create_quiz(&self, quiz: &NewQuiz) -> Result<RemoteQuiz, RemoteError> {
    self
      .send_json(
        reqwest::Method::POST,
        "/quizzes",
        &serde_json::to_value(quiz).unwrap_or_default(),
      )
      .await
  }

  async fn patch_quiz(&self, id: &str, patch: &QuizPatch) -> Result<RemoteQuiz, RemoteError> {
    self
      .send_json(
        reqwest::Method::PATCH,
        &format!("/quizzes/{id}"),
        &serde_json::to_value(patch).unwrap_or_default(),
      )
      .await
  }

  async fn delete_quiz(&self, id: &str) -> Result<(), RemoteError> {
    #[derive(Deserialize)]
    struct OkBody {
      #[allow(dead_code)]
      ok: bool,
    }
    let _: OkBody = self
      .send_json(reqwest::Method::DELETE, &format!("/quizzes/{id}"), &Value::Null)
      .await?;
    Ok(())
  }

  async fn create_question(&self, quiz_id: &str, text: &str) -> Result<RemoteQuestion, RemoteError> {
    self
      .send_json(
        reqwest::Method::POST,
        "/questions",
        &json!({ "quiz_id": quiz_id, "text": text }),
      )
      .await
  }

  async fn questions_for(&self, quiz_id: &str) -> Result<Vec<RemoteQuestion>, RemoteError> {
    self.get_json(&format!("/quizzes/{quiz_id}/questions")).await
  }

  async fn create_option(
    &self,
    question_id: &str,
    text: &str,
    is_correct: bool,
  ) -> Result<RemoteOption, RemoteError> {
    self
      .send_json(
        reqwest::Method::POST,
        "/options",
        &json!({ "question_id": question_id, "text": text, "is_correct": is_correct }),
      )
      .await
  }

  async fn options_for(&self, question_id: &str) -> Result<Vec<RemoteOption>, RemoteError> {
    self.get_json(&format!("/questions/{question_id}/options")).await
  }

  async fn register(&self, username: &str, password: &str, role: &str) -> Result<RemoteUser, RemoteError> {
    self
      .send_json(
        reqwest::Method::POST,
        "/auth/register",
        &json!({ "username": username, "password": password, "role": role }),
      )
      .await
  }

  async fn login(&self, username: &str, password: &str) -> Result<RemoteUser, RemoteError> {
    self
      .send_json(
        reqwest::Method::POST,
        "/auth/login",
        &json!({ "username": username, "password": password }),
      )
      .await
  }
}

/// Try to extract a clean error message from an upstream error body.
fn extract_upstream_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap {
    error: String,
  }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error)
}
