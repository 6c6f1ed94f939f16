//! Content negotiation between JSON clients and page clients.
//!
//! Every endpoint serves two audiences. A request whose `Accept` header names
//! a JSON media type gets the bare resource as JSON. Anything else is treated
//! as a page request: reads answer with a [`Page`] envelope carrying the view
//! name and any pending flash message, and writes answer with a `303 See
//! Other` redirect that sets the flash cookie.
//!
//! Errors are rendered the same way for both audiences; a page client that
//! is not allowed to do something still receives a 403.

use std::convert::Infallible;

use axum::{
  Form, Json,
  extract::{FromRequest, FromRequestParts, Request},
  http::{HeaderMap, header, request::Parts},
  response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64URL;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::ApiError;

/// Name of the cookie that carries a one-shot flash message.
pub const FLASH_COOKIE: &str = "forum_flash";

/// Whether the client asked for JSON.
#[derive(Debug, Clone, Copy)]
pub struct WantsJson(pub bool);

pub fn wants_json(headers: &HeaderMap) -> bool {
  headers
    .get_all(header::ACCEPT)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(','))
    .any(|range| {
      let media = range.split(';').next().unwrap_or_default().trim();
      media == "application/json" || media.ends_with("+json")
    })
}

impl<S: Send + Sync> FromRequestParts<S> for WantsJson {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
    Ok(WantsJson(wants_json(&parts.headers)))
  }
}

/// A request body accepted either as JSON or as an urlencoded form,
/// according to its `Content-Type`.
pub struct Input<T>(pub T);

impl<S, T> FromRequest<S> for Input<T>
where
  S: Send + Sync,
  T: DeserializeOwned,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let is_json = req
      .headers()
      .get(header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .is_some_and(|ct| {
        let media = ct.split(';').next().unwrap_or_default().trim();
        media == "application/json" || media.ends_with("+json")
      });

    if is_json {
      let Json(value) = Json::<T>::from_request(req, state)
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
      Ok(Input(value))
    } else {
      let Form(value) = Form::<T>::from_request(req, state)
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
      Ok(Input(value))
    }
  }
}

/// The envelope a page client receives for a read.
#[derive(Debug, Serialize)]
pub struct Page<T> {
  pub view:  &'static str,
  pub flash: Option<String>,
  pub data:  T,
}

/// Remove the flash message from `jar`, returning it alongside the jar that
/// expires the cookie.
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>) {
  let Some(cookie) = jar.get(FLASH_COOKIE) else {
    return (jar, None);
  };
  let message = B64URL
    .decode(cookie.value())
    .ok()
    .and_then(|bytes| String::from_utf8(bytes).ok());
  (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), message)
}

/// Answer a read: the bare resource for JSON clients, a [`Page`] for the rest.
pub fn render<T: Serialize>(
  WantsJson(json): WantsJson,
  jar: CookieJar,
  view: &'static str,
  data: T,
) -> Response {
  if json {
    return Json(data).into_response();
  }
  let (jar, flash) = take_flash(jar);
  (jar, Json(Page { view, flash, data })).into_response()
}

/// Redirect a page client to `to`, leaving `message` to be shown there.
pub fn redirect_with_flash(jar: CookieJar, to: &str, message: &str) -> Response {
  let cookie = Cookie::build((FLASH_COOKIE, B64URL.encode(message)))
    .path("/")
    .http_only(true);
  (jar.add(cookie), Redirect::to(to)).into_response()
}
