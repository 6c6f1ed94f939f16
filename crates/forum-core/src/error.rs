//! Error types for `forum-core`.

use std::fmt;

use thiserror::Error;

use crate::id::{ChannelId, NotificationId, ReplyId, ThreadId, UserId};

/// A single failed input field, reported back to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
  pub field:   &'static str,
  pub message: String,
}

impl FieldError {
  pub fn new(field: &'static str, message: impl Into<String>) -> Self {
    Self { field, message: message.into() }
  }
}

/// The entity a [`Error::NotFound`] refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
  User(UserId),
  UserNamed(String),
  Channel(ChannelId),
  ChannelSlug(String),
  Thread(ThreadId),
  Reply(ReplyId),
  Notification(NotificationId),
}

impl fmt::Display for Resource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::User(id) => write!(f, "user {id}"),
      Self::UserNamed(name) => write!(f, "user {name:?}"),
      Self::Channel(id) => write!(f, "channel {id}"),
      Self::ChannelSlug(slug) => write!(f, "channel {slug:?}"),
      Self::Thread(id) => write!(f, "thread {id}"),
      Self::Reply(id) => write!(f, "reply {id}"),
      Self::Notification(id) => write!(f, "notification {id}"),
    }
  }
}

#[derive(Debug, Error)]
pub enum Error {
  /// Input was missing or malformed. Raised before any mutation.
  #[error("validation failed: {}", join_fields(.0))]
  Validation(Vec<FieldError>),

  #[error("{0} not found")]
  NotFound(Resource),

  /// The requester is authenticated but not permitted to act on the thread.
  #[error("user {user} may not {action} thread {thread}")]
  Forbidden {
    user:   UserId,
    thread: ThreadId,
    action: &'static str,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error. Used as `.map_err(Error::store)`.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
    Self::Validation(vec![FieldError::new(field, message)])
  }
}

fn join_fields(fields: &[FieldError]) -> String {
  fields
    .iter()
    .map(|f| format!("{}: {}", f.field, f.message))
    .collect::<Vec<_>>()
    .join("; ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
