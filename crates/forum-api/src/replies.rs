//! Handlers for `/threads/{channel}/{thread}/replies`.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use forum_core::{id::ThreadId, store::ForumStore};
use serde::Deserialize;

use crate::{
  AppState,
  auth::Authenticated,
  error::ApiError,
  negotiate::{Input, WantsJson, redirect_with_flash, render},
};

/// `GET /threads/{channel}/{thread}/replies`, oldest first.
pub async fn index<S>(
  State(state): State<AppState<S>>,
  wants: WantsJson,
  jar: CookieJar,
  Path((_channel, thread)): Path<(String, ThreadId)>,
) -> Result<Response, ApiError>
where
  S: ForumStore + Clone + 'static,
{
  let replies = state.forum.replies(thread).await?;
  Ok(render(wants, jar, "replies.index", replies))
}

#[derive(Debug, Deserialize)]
pub struct ReplyBody {
  #[serde(default)]
  pub body: String,
}

/// `POST /threads/{channel}/{thread}/replies`
pub async fn store<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  WantsJson(json): WantsJson,
  jar: CookieJar,
  Path((_channel, thread)): Path<(String, ThreadId)>,
  Input(input): Input<ReplyBody>,
) -> Result<Response, ApiError>
where
  S: ForumStore + Clone + 'static,
{
  let reply = state.forum.create_reply(thread, user.id, &input.body).await?;
  if json {
    return Ok((StatusCode::CREATED, Json(reply)).into_response());
  }
  let path = state.forum.thread_path(&state.forum.get_thread(thread).await?).await?;
  Ok(redirect_with_flash(jar, &path, "Your reply has been left."))
}
