//! Handlers for `/channels`.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use forum_core::store::ForumStore;
use serde::Deserialize;

use crate::{
  AppState,
  auth::Authenticated,
  error::ApiError,
  negotiate::{Input, WantsJson, render},
};

/// `GET /channels`, ordered by name.
pub async fn index<S>(
  State(state): State<AppState<S>>,
  wants: WantsJson,
  jar: CookieJar,
) -> Result<Response, ApiError>
where
  S: ForumStore + Clone + 'static,
{
  let channels = state.forum.list_channels().await?;
  Ok(render(wants, jar, "channels.index", channels))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  #[serde(default)]
  pub slug: String,
  #[serde(default)]
  pub name: String,
}

/// `POST /channels`
pub async fn store<S>(
  State(state): State<AppState<S>>,
  Authenticated(_user): Authenticated,
  Input(body): Input<CreateBody>,
) -> Result<Response, ApiError>
where
  S: ForumStore + Clone + 'static,
{
  let channel = state.forum.create_channel(&body.slug, &body.name).await?;
  Ok((StatusCode::CREATED, Json(channel)).into_response())
}
