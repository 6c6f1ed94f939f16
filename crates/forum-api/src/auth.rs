//! HTTP Basic-auth extractors and password hashing.
//!
//! Credentials are checked against the argon2 PHC string stored with each
//! user. A request either carries no `Authorization` header at all (a guest)
//! or valid credentials; anything in between is rejected with 401.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use forum_core::{model::User, store::ForumStore};
use rand_core::OsRng;

use crate::{AppState, error::ApiError};

/// The authenticated user making the request. Rejects guests with 401.
pub struct Authenticated(pub User);

/// The user making the request, if any. Rejects bad credentials with 401.
pub struct MaybeAuthenticated(pub Option<User>);

/// Hash `password` into an argon2 PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Store(format!("argon2 error: {e}").into()))
}

/// Split a `Basic` authorization header into user name and password.
fn basic_credentials(headers: &HeaderMap) -> Option<Result<(String, String), ApiError>> {
  let value = headers.get(header::AUTHORIZATION)?;
  Some(parse_basic(value.to_str().ok()))
}

fn parse_basic(value: Option<&str>) -> Result<(String, String), ApiError> {
  let encoded = value
    .and_then(|v| v.strip_prefix("Basic "))
    .ok_or(ApiError::Unauthorized)?;
  let decoded = B64.decode(encoded.trim()).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;
  let (name, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((name.to_owned(), password.to_owned()))
}

/// Resolve the request's credentials to a user. `Ok(None)` means no
/// credentials were sent.
pub async fn verify_auth<S: ForumStore>(
  headers: &HeaderMap,
  store: &S,
) -> Result<Option<User>, ApiError> {
  let Some(creds) = basic_credentials(headers) else {
    return Ok(None);
  };
  let (name, password) = creds?;

  let (user, password_hash) = store
    .user_credentials(&name)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or(ApiError::Unauthorized)?;

  let parsed_hash = PasswordHash::new(&password_hash).map_err(|_| ApiError::Unauthorized)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Ok(Some(user))
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: ForumStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    verify_auth(&parts.headers, state.forum.store())
      .await?
      .map(Authenticated)
      .ok_or(ApiError::Unauthorized)
  }
}

impl<S> FromRequestParts<AppState<S>> for MaybeAuthenticated
where
  S: ForumStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(MaybeAuthenticated(verify_auth(&parts.headers, state.forum.store()).await?))
  }
}
