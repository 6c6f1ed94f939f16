//! [`ThreadTeardown`] over an open SQLite transaction.
//!
//! Each reply is torn down on its own: its activity rows, notifications and
//! outbox entry go first, then the reply row. The foreign keys on those
//! tables do not cascade, so skipping a step fails the transaction instead of
//! leaving orphans behind.

use forum_core::{
  cascade::ThreadTeardown,
  id::{ReplyId, ThreadId},
  model::ActivityKind,
};

use crate::encode::encode_activity_kind;

pub struct TxTeardown<'c> {
  conn: &'c rusqlite::Connection,
}

impl<'c> TxTeardown<'c> {
  /// `conn` is expected to be a `rusqlite::Transaction` (by deref); the
  /// caller decides whether to commit.
  pub fn new(conn: &'c rusqlite::Connection) -> Self { Self { conn } }

  fn delete_activity(&self, kind: ActivityKind, subject_id: i64) -> rusqlite::Result<usize> {
    self.conn.execute(
      "DELETE FROM activities WHERE kind = ?1 AND subject_id = ?2",
      rusqlite::params![encode_activity_kind(kind), subject_id],
    )
  }
}

impl ThreadTeardown for TxTeardown<'_> {
  type Error = rusqlite::Error;

  fn reply_ids(&mut self, thread: ThreadId) -> rusqlite::Result<Vec<ReplyId>> {
    let mut stmt = self.conn.prepare(
      "SELECT id FROM replies WHERE thread_id = ?1 ORDER BY created_at, id",
    )?;
    let ids = stmt
      .query_map(rusqlite::params![thread.get()], |row| row.get(0).map(ReplyId))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
  }

  fn destroy_reply(&mut self, reply: ReplyId) -> rusqlite::Result<()> {
    let id = reply.get();
    self.delete_activity(ActivityKind::CreatedReply, id)?;
    self.conn.execute(
      "DELETE FROM notifications WHERE reply_id = ?1",
      rusqlite::params![id],
    )?;
    self.conn.execute(
      "DELETE FROM mention_outbox WHERE reply_id = ?1",
      rusqlite::params![id],
    )?;
    self
      .conn
      .execute("DELETE FROM replies WHERE id = ?1", rusqlite::params![id])?;
    tracing::debug!(reply = %reply, "reply destroyed");
    Ok(())
  }

  fn delete_subscriptions(&mut self, thread: ThreadId) -> rusqlite::Result<usize> {
    self.conn.execute(
      "DELETE FROM subscriptions WHERE thread_id = ?1",
      rusqlite::params![thread.get()],
    )
  }

  fn delete_thread_row(&mut self, thread: ThreadId) -> rusqlite::Result<bool> {
    self.delete_activity(ActivityKind::CreatedThread, thread.get())?;
    let removed = self.conn.execute(
      "DELETE FROM threads WHERE id = ?1",
      rusqlite::params![thread.get()],
    )?;
    Ok(removed > 0)
  }
}
