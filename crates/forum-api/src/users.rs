//! Handlers for registration, `/profiles/{user}` and a user's notifications.
//!
//! | Method   | Path                                   | Notes |
//! |----------|----------------------------------------|-------|
//! | `POST`   | `/register`                            | `name`, `password` |
//! | `GET`    | `/profiles/{user}`                     | Threads and activity |
//! | `GET`    | `/profiles/{user}/notifications`       | Auth; own only; unread unless `?all=1` |
//! | `DELETE` | `/profiles/{user}/notifications/{id}`  | Auth; marks as read |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use forum_core::{
  id::NotificationId,
  model::User,
  store::ForumStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{Authenticated, hash_password},
  error::ApiError,
  negotiate::{Input, WantsJson, render},
};

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  #[serde(default)]
  pub name:     String,
  #[serde(default)]
  pub password: String,
}

/// `POST /register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Input(body): Input<RegisterBody>,
) -> Result<Response, ApiError>
where
  S: ForumStore + Clone + 'static,
{
  if body.password.is_empty() {
    return Err(forum_core::Error::invalid("password", "The password field is required.").into());
  }
  let hash = hash_password(&body.password)?;
  let user = state.forum.register(&body.name, hash).await?;
  tracing::info!(user = %user.id, name = %user.name, "user registered");
  Ok((StatusCode::CREATED, Json(user)).into_response())
}

// ─── Profile ──────────────────────────────────────────────────────────────────

/// `GET /profiles/{user}`
pub async fn profile<S>(
  State(state): State<AppState<S>>,
  wants: WantsJson,
  jar: CookieJar,
  Path(name): Path<String>,
) -> Result<Response, ApiError>
where
  S: ForumStore + Clone + 'static,
{
  let profile = state.forum.profile(&name).await?;
  Ok(render(wants, jar, "profiles.show", profile))
}

// ─── Notifications ────────────────────────────────────────────────────────────

/// Only the owner of a profile may read or acknowledge its notifications.
fn ensure_own_profile(user: &User, name: &str) -> Result<(), ApiError> {
  if user.name == name {
    Ok(())
  } else {
    Err(ApiError::Forbidden(format!(
      "{} may not access the notifications of {name}",
      user.name
    )))
  }
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationParams {
  pub all: Option<String>,
}

/// `GET /profiles/{user}/notifications`, newest first.
pub async fn notifications<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path(name): Path<String>,
  Query(params): Query<NotificationParams>,
) -> Result<Response, ApiError>
where
  S: ForumStore + Clone + 'static,
{
  ensure_own_profile(&user, &name)?;
  let unread_only = !params
    .all
    .is_some_and(|v| !matches!(v.as_str(), "0" | "false"));
  let notifications = state.forum.notifications(user.id, unread_only).await?;
  Ok(Json(notifications).into_response())
}

/// `DELETE /profiles/{user}/notifications/{id}`
pub async fn mark_read<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path((name, id)): Path<(String, NotificationId)>,
) -> Result<StatusCode, ApiError>
where
  S: ForumStore + Clone + 'static,
{
  ensure_own_profile(&user, &name)?;
  state.forum.mark_notification_read(user.id, id).await?;
  Ok(StatusCode::NO_CONTENT)
}
