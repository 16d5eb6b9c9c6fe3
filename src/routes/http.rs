//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs include parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{Path, Query, State}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let upstream = state.backend.health().await;
  Json(HealthOut { ok: true, upstream })
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_quizzes(
  State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
  let listing = state.list_quizzes().await?;
  info!(target: "quizdesk", count = listing.quizzes.len(), source = ?listing.source, "HTTP quiz listing served");
  Ok(Json(listing))
}

#[instrument(level = "info", skip(state, q))]
pub async fn http_filtered_quizzes(
  State(state): State<Arc<AppState>>,
  Query(q): Query<FilterQuery>,
) -> Result<impl IntoResponse, AppError> {
  let username = q.username.unwrap_or_default();
  let subject = q.subject.unwrap_or_else(|| "all".into());
  let listing = state
    .filtered_quizzes(&username, &subject, q.status.unwrap_or_default(), q.sort.unwrap_or_default())
    .await?;
  Ok(Json(listing))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_quiz_detail(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
  let questions = state.quiz_detail(&id).await?;
  info!(target: "quizdesk", %id, count = questions.len(), "HTTP quiz detail served");
  Ok(Json(QuizDetailOut {
    id,
    questions: questions.iter().map(question_to_out).collect(),
  }))
}

#[instrument(level = "info", skip(state, body), fields(title = %body.title))]
pub async fn http_save_quiz(
  State(state): State<Arc<AppState>>,
  Json(body): Json<DraftIn>,
) -> Result<impl IntoResponse, AppError> {
  let receipt = state.save_quiz(body.into_draft()).await?;
  info!(target: "quizdesk", id = %receipt.id, tier = ?receipt.tier, "HTTP quiz saved");
  Ok(Json(SaveOut { location: receipt.tier, id: receipt.id }))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_quiz_for_edit(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
  let draft = state.load_for_edit(&id).await?;
  Ok(Json(draft))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_toggle_publish(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
  let receipt = state.toggle_publish(&id).await?;
  info!(target: "quizdesk", %id, published = receipt.published, tier = ?receipt.tier, "HTTP publish toggled");
  Ok(Json(receipt))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_quiz(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
  state.delete_quiz(&id).await?;
  Ok(Json(OkOut { ok: true }))
}

#[instrument(level = "info", skip(state, body), fields(%body.username, quiz_id = %body.quiz_id))]
pub async fn http_submit_attempt(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AttemptIn>,
) -> Result<impl IntoResponse, AppError> {
  if body.username.trim().is_empty() {
    return Err(AppError::BadRequest("username is required".into()));
  }
  let attempt = state.record_attempt(&body.username, &body.quiz_id, &body.selections).await?;
  info!(target: "quizdesk", score = attempt.score, total = attempt.total, "HTTP attempt recorded");
  Ok(Json(attempt_to_out(&attempt)))
}

#[instrument(level = "info", skip(state, q))]
pub async fn http_attempt_history(
  State(state): State<Arc<AppState>>,
  Query(q): Query<FilterQuery>,
) -> Result<impl IntoResponse, AppError> {
  let username = q
    .username
    .ok_or_else(|| AppError::BadRequest("username is required".into()))?;
  let attempts = state.attempts_for(&username)?;
  Ok(Json(attempts.iter().map(attempt_to_out).collect::<Vec<_>>()))
}

#[instrument(level = "info", skip(state, body), fields(%body.username))]
pub async fn http_register(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RegisterIn>,
) -> Result<impl IntoResponse, AppError> {
  if body.username.trim().is_empty() || body.password.is_empty() {
    return Err(AppError::BadRequest("username and password are required".into()));
  }
  let role = body.role.unwrap_or_else(|| "student".into());
  let user = state.register(&body.username, &body.password, &role).await?;
  info!(target: "quizdesk", username = %user.username, "HTTP user registered");
  Ok(Json(user_to_out(&user)))
}

#[instrument(level = "info", skip(state, body), fields(%body.username))]
pub async fn http_login(
  State(state): State<Arc<AppState>>,
  Json(body): Json<LoginIn>,
) -> Result<impl IntoResponse, AppError> {
  let user = state.login(&body.username, &body.password).await?;
  info!(target: "quizdesk", username = %user.username, "HTTP login");
  Ok(Json(user_to_out(&user)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_logout(
  State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
  state.logout()?;
  Ok(Json(OkOut { ok: true }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_change_password(
  State(state): State<Arc<AppState>>,
  Json(body): Json<PasswordIn>,
) -> Result<impl IntoResponse, AppError> {
  if body.new_password.is_empty() || body.confirm_password.is_empty() {
    return Err(AppError::BadRequest("both password fields are required".into()));
  }
  if body.new_password != body.confirm_password {
    return Err(AppError::BadRequest("passwords do not match".into()));
  }
  state.change_password(&body.new_password)?;
  Ok(Json(OkOut { ok: true }))
}
