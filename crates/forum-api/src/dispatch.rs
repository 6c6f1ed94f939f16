//! Background mention dispatcher.
//!
//! [`MentionDispatcher`] is the [`ReplyNotifier`] handed to the forum: it only
//! forwards the new reply's id over a channel. [`run`] owns the receiving end
//! and drains the mention outbox whenever it is woken, and on a fixed interval
//! so that entries left behind by a failure or a restart are picked up too.

use std::{sync::Arc, time::Duration};

use forum_core::{
  id::ReplyId,
  model::Reply,
  notify::{ReplyNotifier, drain_outbox},
  store::ForumStore,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Sends a wake-up to the dispatcher task for every new reply.
#[derive(Debug, Clone)]
pub struct MentionDispatcher {
  tx: mpsc::UnboundedSender<ReplyId>,
}

impl MentionDispatcher {
  /// A dispatcher and the receiver to pass to [`run`].
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ReplyId>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }
}

impl ReplyNotifier for MentionDispatcher {
  fn reply_created(&self, reply: &Reply) {
    if self.tx.send(reply.id).is_err() {
      warn!(reply = %reply.id, "mention dispatcher is not running; entry stays queued");
    }
  }
}

/// Drain the outbox until it is empty or only failing entries remain.
pub async fn drain_pending<S: ForumStore>(store: &S, batch: usize) {
  loop {
    match drain_outbox(store, batch).await {
      Ok(report) => {
        if report.dispatched > 0 {
          info!(
            dispatched = report.dispatched,
            notifications = report.notifications,
            failed = report.failed,
            "mentions dispatched",
          );
        }
        // A short batch means the outbox is exhausted; a batch with no
        // progress means everything left is failing.
        if report.dispatched == 0 || report.dispatched + report.failed < batch {
          return;
        }
      }
      Err(e) => {
        warn!(error = %e, "failed to read mention outbox");
        return;
      }
    }
  }
}

/// Run the dispatcher until every [`MentionDispatcher`] has been dropped.
pub async fn run<S: ForumStore>(
  store: Arc<S>,
  mut wake: mpsc::UnboundedReceiver<ReplyId>,
  interval: Duration,
  batch: usize,
) {
  let mut ticker = tokio::time::interval(interval);

  loop {
    tokio::select! {
      woke = wake.recv() => match woke {
        Some(reply) => {
          debug!(reply = %reply, "dispatcher woken");
          // Coalesce signals that queued up meanwhile into this pass.
          while wake.try_recv().is_ok() {}
        }
        None => {
          drain_pending(&*store, batch).await;
          info!("mention dispatcher stopped");
          return;
        }
      },
      _ = ticker.tick() => {}
    }

    drain_pending(&*store, batch).await;
  }
}
