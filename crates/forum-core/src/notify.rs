//! Mention notifications.
//!
//! Reply creation writes a mention-outbox entry in the same transaction as the
//! reply itself. Turning that entry into notifications happens later, outside
//! the reply's transaction:
//!
//! - [`ReplyNotifier::reply_created`] is a fire-and-forget wake-up signal sent
//!   right after the reply is persisted;
//! - [`drain_outbox`] processes pending entries, and is what actually runs
//!   [`dispatch_mentions`].
//!
//! Delivery is at-least-once: an entry is only removed after its dispatch
//! succeeded, and recording a notification is idempotent per
//! `(user, reply)`, so a retried entry never notifies anyone twice.

use crate::{
  mention::mentioned_names,
  model::{Notification, Reply},
  store::ForumStore,
};

/// Receives a signal every time a reply has been persisted.
///
/// A notifier that cannot deliver the signal must not fail the reply that
/// triggered it. A lost signal only delays dispatch until the next drain.
pub trait ReplyNotifier: Send + Sync {
  fn reply_created(&self, reply: &Reply);
}

/// A notifier that ignores every signal; dispatch then relies purely on
/// periodic draining.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl ReplyNotifier for NullNotifier {
  fn reply_created(&self, _reply: &Reply) {}
}

/// Notify every existing user mentioned in `reply`, except its author.
///
/// Returns only the notifications newly recorded by this call.
pub async fn dispatch_mentions<S: ForumStore>(
  store: &S,
  reply: &Reply,
) -> Result<Vec<Notification>, S::Error> {
  let names: Vec<String> =
    mentioned_names(&reply.body).into_iter().map(str::to_owned).collect();
  if names.is_empty() {
    return Ok(Vec::new());
  }

  let mut sent = Vec::new();
  for user in store.users_named(names).await? {
    if user.id == reply.user_id {
      continue;
    }
    if let Some(notification) = store.record_notification(user.id, reply).await? {
      sent.push(notification);
    }
  }
  Ok(sent)
}

/// Outcome of one [`drain_outbox`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
  /// Outbox entries completed.
  pub dispatched:    usize,
  /// Notifications recorded across all completed entries.
  pub notifications: usize,
  /// Entries that failed and stay queued.
  pub failed:        usize,
}

/// Process up to `batch` pending outbox entries, least-retried first.
///
/// A failing entry is logged, marked with the error, and left for the next
/// pass; it never aborts the rest of the batch. Only failing to read the
/// outbox itself is returned as an error.
pub async fn drain_outbox<S: ForumStore>(
  store: &S,
  batch: usize,
) -> Result<DrainReport, S::Error> {
  let mut report = DrainReport::default();

  for pending in store.pending_dispatches(batch).await? {
    let reply_id = pending.reply_id;

    let outcome = match store.get_reply(reply_id).await {
      // The reply's thread was deleted after it was queued.
      Ok(None) => Ok(0),
      Ok(Some(reply)) => dispatch_mentions(store, &reply).await.map(|n| n.len()),
      Err(e) => Err(e),
    };

    match outcome {
      Ok(count) => match store.complete_dispatch(reply_id).await {
        Ok(()) => {
          report.dispatched += 1;
          report.notifications += count;
        }
        Err(e) => {
          tracing::warn!(reply = %reply_id, error = %e, "failed to complete mention dispatch");
          report.failed += 1;
        }
      },
      Err(e) => {
        tracing::warn!(
          reply = %reply_id,
          attempts = pending.attempts + 1,
          error = %e,
          "mention dispatch failed; will retry",
        );
        report.failed += 1;
        if let Err(e) = store.fail_dispatch(reply_id, e.to_string()).await {
          tracing::error!(reply = %reply_id, error = %e, "failed to record dispatch failure");
        }
      }
    }
  }

  Ok(report)
}
