//! Handlers for `/threads` endpoints.
//!
//! | Method   | Path                          | Notes |
//! |----------|-------------------------------|-------|
//! | `GET`    | `/threads`                    | Optional `?by=<name>&popular=1` |
//! | `GET`    | `/threads/{channel}`          | Same filters, within one channel |
//! | `POST`   | `/threads`                    | Auth; `channel_id`, `title`, `body` |
//! | `GET`    | `/threads/{channel}/{thread}` | Thread page |
//! | `DELETE` | `/threads/{channel}/{thread}` | Auth; author only |
//!
//! The `{channel}` segment of a thread path is not checked against the
//! thread's channel; the thread id alone identifies the thread.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use forum_core::{
  id::ThreadId,
  service::{CreateThread, ThreadListing},
  store::ForumStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{Authenticated, MaybeAuthenticated},
  error::ApiError,
  negotiate::{Input, WantsJson, redirect_with_flash, render},
};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub by:      Option<String>,
  /// Any value other than `0` or `false` asks for the popular ordering.
  pub popular: Option<String>,
}

impl ListParams {
  fn into_listing(self, channel: Option<String>) -> ThreadListing {
    let popular = self
      .popular
      .is_some_and(|v| !matches!(v.as_str(), "0" | "false"));
    ThreadListing { channel, by: self.by, popular }
  }
}

/// `GET /threads`
pub async fn index<S>(
  State(state): State<AppState<S>>,
  wants: WantsJson,
  jar: CookieJar,
  Query(params): Query<ListParams>,
) -> Result<Response, ApiError>
where
  S: ForumStore + Clone + 'static,
{
  let threads = state.forum.list_threads(&params.into_listing(None)).await?;
  Ok(render(wants, jar, "threads.index", threads))
}

/// `GET /threads/{channel}`
pub async fn index_in_channel<S>(
  State(state): State<AppState<S>>,
  wants: WantsJson,
  jar: CookieJar,
  Path(channel): Path<String>,
  Query(params): Query<ListParams>,
) -> Result<Response, ApiError>
where
  S: ForumStore + Clone + 'static,
{
  let threads = state
    .forum
    .list_threads(&params.into_listing(Some(channel)))
    .await?;
  Ok(render(wants, jar, "threads.index", threads))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /threads`
pub async fn store<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  WantsJson(json): WantsJson,
  jar: CookieJar,
  Input(input): Input<CreateThread>,
) -> Result<Response, ApiError>
where
  S: ForumStore + Clone + 'static,
{
  let thread = state.forum.create_thread(user.id, input).await?;
  if json {
    return Ok((StatusCode::CREATED, Json(thread)).into_response());
  }
  let path = state.forum.thread_path(&thread).await?;
  Ok(redirect_with_flash(jar, &path, "Your thread has been published!"))
}

// ─── Show ─────────────────────────────────────────────────────────────────────

/// `GET /threads/{channel}/{thread}`
pub async fn show<S>(
  State(state): State<AppState<S>>,
  MaybeAuthenticated(viewer): MaybeAuthenticated,
  wants: WantsJson,
  jar: CookieJar,
  Path((_channel, id)): Path<(String, ThreadId)>,
) -> Result<Response, ApiError>
where
  S: ForumStore + Clone + 'static,
{
  let detail = state.forum.show_thread(id, viewer.map(|u| u.id)).await?;
  Ok(render(wants, jar, "threads.show", detail))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /threads/{channel}/{thread}`
pub async fn destroy<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  WantsJson(json): WantsJson,
  jar: CookieJar,
  Path((_channel, id)): Path<(String, ThreadId)>,
) -> Result<Response, ApiError>
where
  S: ForumStore + Clone + 'static,
{
  state.forum.delete_thread(id, user.id).await?;
  if json {
    return Ok(StatusCode::NO_CONTENT.into_response());
  }
  Ok(redirect_with_flash(jar, "/threads", "Your thread has been deleted!"))
}
