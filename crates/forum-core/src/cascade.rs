//! Thread deletion cascade.
//!
//! Deleting a thread must leave no orphaned replies or subscriptions, and each
//! reply must go through its own teardown (which removes the activity rows,
//! notifications and outbox entry that point at it). A single set-oriented
//! `DELETE ... WHERE thread_id = ?` over replies would skip that teardown, so
//! the cascade walks the live replies one by one.
//!
//! Order:
//!
//! 1. every reply, oldest first, through [`ThreadTeardown::destroy_reply`]
//! 2. the thread's subscriptions
//! 3. the thread row itself, always last
//!
//! The algorithm is written against [`ThreadTeardown`], which a backend
//! implements for an open transaction. The backend commits only if
//! [`delete_thread`] returns `Ok`, so a failure at any step leaves every row
//! in place.

use serde::{Deserialize, Serialize};

use crate::id::{ReplyId, ThreadId};

/// The per-row operations the cascade is built from. Implemented by storage
/// backends over a live transaction.
pub trait ThreadTeardown {
  type Error;

  /// The thread's reply ids in creation order.
  fn reply_ids(&mut self, thread: ThreadId) -> Result<Vec<ReplyId>, Self::Error>;

  /// Destroy a single reply and its own dependents.
  fn destroy_reply(&mut self, reply: ReplyId) -> Result<(), Self::Error>;

  /// Remove every subscription to the thread; returns how many were removed.
  fn delete_subscriptions(&mut self, thread: ThreadId) -> Result<usize, Self::Error>;

  /// Remove the thread row (and its own activity entry). Returns `false` if
  /// the row was already gone.
  fn delete_thread_row(&mut self, thread: ThreadId) -> Result<bool, Self::Error>;
}

/// What a successful cascade removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeReport {
  pub replies:       usize,
  pub subscriptions: usize,
}

/// Run the full cascade for `thread`.
///
/// Returns `Ok(None)` when the thread row did not exist; the backend should
/// roll back in that case too, although nothing will have been touched.
pub fn delete_thread<T: ThreadTeardown>(
  tx: &mut T,
  thread: ThreadId,
) -> Result<Option<CascadeReport>, T::Error> {
  let replies = tx.reply_ids(thread)?;
  for reply in &replies {
    tx.destroy_reply(*reply)?;
  }

  let subscriptions = tx.delete_subscriptions(thread)?;

  if !tx.delete_thread_row(thread)? {
    return Ok(None);
  }

  Ok(Some(CascadeReport { replies: replies.len(), subscriptions }))
}
