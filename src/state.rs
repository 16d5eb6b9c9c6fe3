//! Application state: the upstream backend handle, the local store, and the
//! remote-first read paths.
//!
//! This module owns:
//!   - quiz listing and detail (upstream when reachable, local tiers after)
//!   - the attempt recorder (grade, append, full-log rewrite)
//!   - the auth workflows (upstream proxy with local fallback login)
//!
//! The policy is always the same shape: probe the upstream, prefer it, and
//! on any failure use the local source of truth. The two tiers are never
//! merged.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::domain::{Attempt, Choice, Question, QuestionKind, QuizSummary, Role, Tier, User};
use crate::error::AppError;
use crate::logic::{self, SortKey, StatusFilter};
use crate::remote::{QuizBackend, RemoteUser, Upstream};
use crate::store::LocalStore;

/// Which tier actually served a listing.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListSource {
    Remote,
    Cache,
    Local,
}

#[derive(Clone, Debug, Serialize)]
pub struct QuizListing {
    pub source: ListSource,
    pub quizzes: Vec<QuizSummary>,
}

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn QuizBackend>,
    pub store: LocalStore,
    pub cfg: AppConfig,
}

impl AppState {
    /// Build state from config: open the data dir and the upstream client.
    #[instrument(level = "info", skip_all)]
    pub fn new(cfg: AppConfig) -> Result<Self, AppError> {
        let store = LocalStore::open(&cfg.data_dir)?;
        let upstream = Upstream::new(&cfg.upstream_base, cfg.upstream_timeout_secs)?;
        info!(target: "quizdesk", upstream = %cfg.upstream_base, data_dir = %cfg.data_dir.display(), "Gateway state initialized");
        Ok(Self::from_parts(Arc::new(upstream), store, cfg))
    }

    pub fn from_parts(backend: Arc<dyn QuizBackend>, store: LocalStore, cfg: AppConfig) -> Self {
        Self { backend, store, cfg }
    }

    /// List quizzes, remote-first.
    ///
    /// Reachable upstream: fetch, overwrite the local cache with the result,
    /// serve it. Otherwise: last cached snapshot, and as a final fallback
    /// the legacy local draft store.
    #[instrument(level = "info", skip(self))]
    pub async fn list_quizzes(&self) -> Result<QuizListing, AppError> {
        if self.backend.health().await {
            match self.backend.list_quizzes().await {
                Ok(rows) => {
                    let quizzes: Vec<QuizSummary> = rows
                        .into_iter()
                        .map(|r| QuizSummary {
                            id: r.id,
                            title: r.title,
                            description: r.description.unwrap_or_default(),
                            // The upstream schema carries no category column.
                            category: String::new(),
                            published: r.published,
                            created_by: r.created_by,
                            tier: Tier::Remote,
                        })
                        .collect();
                    self.store.put_quiz_cache(&quizzes)?;
                    info!(target: "sync", count = quizzes.len(), "Quiz listing served from upstream; cache overwritten");
                    return Ok(QuizListing { source: ListSource::Remote, quizzes });
                }
                Err(e) => {
                    warn!(target: "sync", error = %e, "Upstream listing failed; using local tiers");
                }
            }
        }

        if let Some(cached) = self.store.quiz_cache()? {
            info!(target: "sync", count = cached.len(), "Quiz listing served from cache");
            return Ok(QuizListing { source: ListSource::Cache, quizzes: cached });
        }

        let drafts = self.store.drafts()?;
        let quizzes: Vec<QuizSummary> = drafts.iter().map(|d| d.summary()).collect();
        info!(target: "sync", count = quizzes.len(), "Quiz listing served from local draft store");
        Ok(QuizListing { source: ListSource::Local, quizzes })
    }

    /// Fetch a quiz's question/option structure, remote-first.
    ///
    /// Any upstream failure mid-way abandons the remote result entirely and
    /// reads the local aggregate instead; remote and local structures are
    /// never merged. An unknown id degrades to an empty question list.
    #[instrument(level = "info", skip(self), fields(%quiz_id))]
    pub async fn quiz_detail(&self, quiz_id: &str) -> Result<Vec<Question>, AppError> {
        if self.backend.health().await {
            match self.remote_detail(quiz_id).await {
                Ok(questions) => return Ok(questions),
                Err(e) => {
                    warn!(target: "sync", %quiz_id, error = %e, "Upstream detail failed; using local aggregate");
                }
            }
        }

        let drafts = self.store.drafts()?;
        Ok(drafts
            .iter()
            .find(|d| d.id == quiz_id)
            .map(|d| d.questions.clone())
            .unwrap_or_default())
    }

    async fn remote_detail(&self, quiz_id: &str) -> Result<Vec<Question>, crate::remote::RemoteError> {
        let rows = self.backend.questions_for(quiz_id).await?;
        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            let opts = self.backend.options_for(&row.id).await?;
            let choices: Vec<Choice> = opts
                .into_iter()
                .map(|o| Choice {
                    id: Some(o.id),
                    text: o.text.unwrap_or_default(),
                    is_correct: o.is_correct,
                })
                .collect();
            // The upstream stores no question type; more than one correct
            // choice means independent toggles.
            let kind = if choices.iter().filter(|c| c.is_correct).count() > 1 {
                QuestionKind::Multi
            } else {
                QuestionKind::Single
            };
            questions.push(Question {
                id: Some(row.id),
                text: row.text.unwrap_or_default(),
                kind,
                choices,
            });
        }
        Ok(questions)
    }

    /// The filtered/sorted dashboard view for one user.
    pub async fn filtered_quizzes(
        &self,
        username: &str,
        subject: &str,
        status: StatusFilter,
        sort: SortKey,
    ) -> Result<QuizListing, AppError> {
        let listing = self.list_quizzes().await?;
        let attempts = self.attempts_for(username)?;
        let quizzes = logic::filtered_quizzes(&listing.quizzes, &attempts, subject, status, sort);
        Ok(QuizListing { source: listing.source, quizzes })
    }

    // --- Attempt recorder ---

    /// Grade a submission and append the attempt to the log.
    ///
    /// The log is rewritten in full on every call (read-modify-write; no
    /// locking, lost updates under concurrent writers are accepted).
    #[instrument(level = "info", skip(self, selections), fields(%username, %quiz_id))]
    pub async fn record_attempt(
        &self,
        username: &str,
        quiz_id: &str,
        selections: &[Vec<usize>],
    ) -> Result<Attempt, AppError> {
        let listing = self.list_quizzes().await?;
        let quiz_title = listing
            .quizzes
            .iter()
            .find(|q| q.id == quiz_id)
            .map(|q| q.title.clone())
            .unwrap_or_default();

        let questions = self.quiz_detail(quiz_id).await?;
        let score = logic::grade(&questions, selections);
        let attempt = Attempt {
            username: username.to_string(),
            quiz_id: quiz_id.to_string(),
            quiz_title,
            score,
            total: questions.len(),
            taken_at: Utc::now(),
        };

        let mut log = self.store.attempts()?;
        log.push(attempt.clone());
        self.store.put_attempts(&log)?;
        info!(target: "quizdesk", score, total = attempt.total, "Attempt recorded");
        Ok(attempt)
    }

    /// One user's attempts, newest first.
    pub fn attempts_for(&self, username: &str) -> Result<Vec<Attempt>, AppError> {
        let mut attempts: Vec<Attempt> = self
            .store
            .attempts()?
            .into_iter()
            .filter(|a| a.username == username)
            .collect();
        attempts.sort_by(|a, b| b.taken_at.cmp(&a.taken_at));
        Ok(attempts)
    }

    // --- Auth workflows ---

    /// Register against the upstream; there is no offline registration.
    #[instrument(level = "info", skip(self, password), fields(%username, %role))]
    pub async fn register(&self, username: &str, password: &str, role: &str) -> Result<User, AppError> {
        match self.backend.register(username, password, role).await {
            Ok(remote) => {
                let user = to_user(remote);
                self.store.set_current_user(Some(&user))?;
                Ok(user)
            }
            Err(e) if e.status() == Some(409) => {
                Err(AppError::Conflict("username exists".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Log in against the upstream; unreachable upstream falls back to the
    /// local credential list (plaintext comparison, matching the upstream).
    #[instrument(level = "info", skip(self, password), fields(%username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AppError> {
        match self.backend.login(username, password).await {
            Ok(remote) => {
                let user = to_user(remote);
                self.store.set_current_user(Some(&user))?;
                Ok(user)
            }
            Err(e) if e.status() == Some(401) => {
                Err(AppError::Auth("invalid credentials".into()))
            }
            Err(e) => {
                warn!(target: "sync", error = %e, "Upstream login failed; trying local users");
                let user = self
                    .store
                    .users()?
                    .into_iter()
                    .find(|u| u.username == username && u.password.as_deref() == Some(password))
                    .ok_or_else(|| AppError::Auth("invalid credentials".into()))?;
                self.store.set_current_user(Some(&user))?;
                Ok(user)
            }
        }
    }

    pub fn logout(&self) -> Result<(), AppError> {
        self.store.set_current_user(None)?;
        Ok(())
    }

    /// Change the current user's password in the local credential list.
    /// Local-only by design: the upstream has no password-update endpoint.
    pub fn change_password(&self, new_password: &str) -> Result<(), AppError> {
        let mut current = self
            .store
            .current_user()?
            .ok_or_else(|| AppError::Auth("not logged in".into()))?;

        let mut users = self.store.users()?;
        let entry = users
            .iter_mut()
            .find(|u| u.username == current.username)
            .ok_or_else(|| AppError::NotFound("local user not found".into()))?;
        entry.password = Some(new_password.to_string());
        self.store.put_users(&users)?;

        current.password = Some(new_password.to_string());
        self.store.set_current_user(Some(&current))?;
        Ok(())
    }
}

fn to_user(remote: RemoteUser) -> User {
    let role = match remote.role.as_deref().map(|r| r.to_ascii_lowercase()).as_deref() {
        Some("teacher") => Role::Teacher,
        Some("admin") => Role::Admin,
        _ => Role::Student,
    };
    User {
        id: Some(remote.id),
        username: remote.username,
        password: None,
        role,
    }
}
