//! HTTP surface of the forum.
//!
//! Exposes an axum [`Router`] over a [`Forum`] backed by any [`ForumStore`].
//! JSON clients and page clients share every route; see [`negotiate`] for how
//! their responses differ.

pub mod auth;
pub mod channels;
pub mod dispatch;
pub mod error;
pub mod negotiate;
pub mod replies;
pub mod subscriptions;
pub mod threads;
pub mod users;

pub use error::ApiError;

use std::path::PathBuf;

use axum::{
  Router,
  routing::{delete, get, post},
};
use forum_core::{service::Forum, store::ForumStore};
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                   String,
  pub port:                   u16,
  pub store_path:             PathBuf,
  /// Seconds between periodic drains of the mention outbox.
  pub dispatch_interval_secs: u64,
  /// Outbox entries processed per drain pass.
  pub dispatch_batch:         usize,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub forum: Forum<S>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self { Self { forum: self.forum.clone() } }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the forum's axum [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ForumStore + Clone + 'static,
{
  Router::new()
    .route("/register", post(users::register::<S>))
    // Channels
    .route("/channels", get(channels::index::<S>).post(channels::store::<S>))
    // Threads
    .route("/threads", get(threads::index::<S>).post(threads::store::<S>))
    .route("/threads/{channel}", get(threads::index_in_channel::<S>))
    .route(
      "/threads/{channel}/{thread}",
      get(threads::show::<S>).delete(threads::destroy::<S>),
    )
    .route(
      "/threads/{channel}/{thread}/replies",
      get(replies::index::<S>).post(replies::store::<S>),
    )
    .route(
      "/threads/{channel}/{thread}/subscriptions",
      post(subscriptions::store::<S>).delete(subscriptions::destroy::<S>),
    )
    // Profiles
    .route("/profiles/{user}", get(users::profile::<S>))
    .route("/profiles/{user}/notifications", get(users::notifications::<S>))
    .route(
      "/profiles/{user}/notifications/{notification}",
      delete(users::mark_read::<S>),
    )
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
