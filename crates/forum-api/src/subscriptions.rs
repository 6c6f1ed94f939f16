//! Handlers for `/threads/{channel}/{thread}/subscriptions`.
//!
//! Both operations are idempotent and answer 204 whether or not anything
//! changed.

use axum::{
  extract::{Path, State},
  http::StatusCode,
};
use forum_core::{id::ThreadId, store::ForumStore};

use crate::{AppState, auth::Authenticated, error::ApiError};

/// `POST /threads/{channel}/{thread}/subscriptions`
pub async fn store<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path((_channel, thread)): Path<(String, ThreadId)>,
) -> Result<StatusCode, ApiError>
where
  S: ForumStore + Clone + 'static,
{
  state.forum.subscribe(thread, user.id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /threads/{channel}/{thread}/subscriptions`
pub async fn destroy<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path((_channel, thread)): Path<(String, ThreadId)>,
) -> Result<StatusCode, ApiError>
where
  S: ForumStore + Clone + 'static,
{
  state.forum.unsubscribe(thread, user.id).await?;
  Ok(StatusCode::NO_CONTENT)
}
