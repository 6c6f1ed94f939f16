//! [`SqliteStore`], the SQLite implementation of [`ForumStore`].

use std::path::Path;

use forum_core::{
  cascade::{self, CascadeReport},
  id::{ChannelId, NotificationId, ReplyId, ThreadId, UserId},
  model::{
    Activity, ActivityKind, Channel, NewChannel, NewReply, NewThread, NewUser,
    Notification, NotificationKind, Reply, Thread, User,
  },
  store::{ForumStore, PendingDispatch, ThreadFilter},
};
use rusqlite::{OptionalExtension as _, types::Value};

use crate::{
  Result,
  encode::{
    ACTIVITY_COLUMNS, CHANNEL_COLUMNS, NOTIFICATION_COLUMNS, REPLY_COLUMNS,
    RawActivity, RawChannel, RawNotification, RawReply, RawThread, RawUser,
    THREAD_COLUMNS, USER_COLUMNS, encode_activity_kind, encode_dt,
    encode_notification_id, encode_notification_kind, now,
  },
  schema::SCHEMA,
  teardown::TxTeardown,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A forum store backed by a single SQLite file.
///
/// Clones share the same reference-counted connection.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a private in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_users(&self, sql: String, params: Vec<Value>) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn query_threads(&self, sql: String, params: Vec<Value>) -> Result<Vec<Thread>> {
    let raws: Vec<RawThread> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawThread::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawThread::into_thread).collect()
  }
}

/// Insert an activity row inside an already-open transaction.
fn record_activity(
  conn: &rusqlite::Connection,
  user: UserId,
  kind: ActivityKind,
  subject_id: i64,
  at: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO activities (user_id, kind, subject_id, created_at)
     VALUES (?1, ?2, ?3, ?4)",
    rusqlite::params![user.get(), encode_activity_kind(kind), subject_id, at],
  )?;
  Ok(())
}

// ─── ForumStore impl ─────────────────────────────────────────────────────────

impl ForumStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<Option<User>> {
    let created_at = now()?;
    let at_str     = encode_dt(created_at);
    let name       = input.name.clone();

    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        let inserted = conn.execute(
          "INSERT INTO users (name, password_hash, created_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(name) DO NOTHING",
          rusqlite::params![name, input.password_hash, at_str],
        )?;
        Ok((inserted > 0).then(|| conn.last_insert_rowid()))
      })
      .await?;

    Ok(id.map(|id| User { id: UserId(id), name: input.name, created_at }))
  }

  async fn get_user(&self, id: UserId) -> Result<Option<User>> {
    let users = self
      .query_users(
        format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        vec![Value::Integer(id.get())],
      )
      .await?;
    Ok(users.into_iter().next())
  }

  async fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
    let users = self
      .query_users(
        format!("SELECT {USER_COLUMNS} FROM users WHERE name = ?1"),
        vec![Value::Text(name.to_owned())],
      )
      .await?;
    Ok(users.into_iter().next())
  }

  async fn user_credentials(&self, name: &str) -> Result<Option<(User, String)>> {
    let name = name.to_owned();

    let raw: Option<(RawUser, String)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE name = ?1"),
            rusqlite::params![name],
            |row| Ok((RawUser::from_row(row)?, row.get(3)?)),
          )
          .optional()?)
      })
      .await?;

    raw
      .map(|(user, hash)| user.into_user().map(|u| (u, hash)))
      .transpose()
  }

  async fn users_named(&self, names: Vec<String>) -> Result<Vec<User>> {
    if names.is_empty() {
      return Ok(Vec::new());
    }
    let placeholders = vec!["?"; names.len()].join(", ");
    self
      .query_users(
        format!("SELECT {USER_COLUMNS} FROM users WHERE name IN ({placeholders}) ORDER BY id"),
        names.into_iter().map(Value::Text).collect(),
      )
      .await
  }

  // ── Channels ──────────────────────────────────────────────────────────────

  async fn create_channel(&self, input: NewChannel) -> Result<Channel> {
    let created_at = now()?;
    let at_str     = encode_dt(created_at);
    let slug       = input.slug.clone();
    let name       = input.name.clone();

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO channels (slug, name, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![slug, name, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Channel { id: ChannelId(id), slug: input.slug, name: input.name, created_at })
  }

  async fn get_channel(&self, id: ChannelId) -> Result<Option<Channel>> {
    let raw: Option<RawChannel> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = ?1"),
            rusqlite::params![id.get()],
            RawChannel::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawChannel::into_channel).transpose()
  }

  async fn find_channel_by_slug(&self, slug: &str) -> Result<Option<Channel>> {
    let slug = slug.to_owned();

    let raw: Option<RawChannel> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE slug = ?1"),
            rusqlite::params![slug],
            RawChannel::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawChannel::into_channel).transpose()
  }

  async fn list_channels(&self) -> Result<Vec<Channel>> {
    let raws: Vec<RawChannel> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {CHANNEL_COLUMNS} FROM channels ORDER BY name, id"))?;
        let rows = stmt
          .query_map([], RawChannel::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawChannel::into_channel).collect()
  }

  // ── Threads ───────────────────────────────────────────────────────────────

  async fn create_thread(&self, input: NewThread) -> Result<Thread> {
    let created_at = now()?;
    let at_str     = encode_dt(created_at);
    let title      = input.title.clone();
    let body       = input.body.clone();
    let user_id    = input.user_id;
    let channel_id = input.channel_id;

    let id: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO threads (user_id, channel_id, title, body, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![user_id.get(), channel_id.get(), title, body, at_str],
        )?;
        let id = tx.last_insert_rowid();
        record_activity(&tx, user_id, ActivityKind::CreatedThread, id, &at_str)?;
        // Authors follow their own threads.
        tx.execute(
          "INSERT OR IGNORE INTO subscriptions (thread_id, user_id, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![id, user_id.get(), at_str],
        )?;
        tx.commit()?;
        Ok(id)
      })
      .await?;

    Ok(Thread {
      id: ThreadId(id),
      user_id,
      channel_id,
      title: input.title,
      body: input.body,
      created_at,
      replies_count: 0,
    })
  }

  async fn get_thread(&self, id: ThreadId) -> Result<Option<Thread>> {
    let threads = self
      .query_threads(
        format!("SELECT {THREAD_COLUMNS} FROM threads t WHERE t.id = ?"),
        vec![Value::Integer(id.get())],
      )
      .await?;
    Ok(threads.into_iter().next())
  }

  async fn list_threads(&self, filter: &ThreadFilter) -> Result<Vec<Thread>> {
    let mut conds: Vec<&'static str> = vec![];
    let mut params: Vec<Value> = vec![];

    if let Some(channel) = filter.channel {
      conds.push("t.channel_id = ?");
      params.push(Value::Integer(channel.get()));
    }
    if let Some(author) = filter.author {
      conds.push("t.user_id = ?");
      params.push(Value::Integer(author.get()));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    let order = if filter.popular {
      "replies_count DESC, t.created_at DESC, t.id DESC"
    } else {
      "t.created_at DESC, t.id DESC"
    };

    self
      .query_threads(
        format!("SELECT {THREAD_COLUMNS} FROM threads t {where_clause} ORDER BY {order}"),
        params,
      )
      .await
  }

  async fn delete_thread(&self, id: ThreadId) -> Result<Option<CascadeReport>> {
    let report = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let report = cascade::delete_thread(&mut TxTeardown::new(&tx), id)?;
        // Dropping an uncommitted transaction rolls it back.
        if report.is_some() {
          tx.commit()?;
        }
        Ok(report)
      })
      .await?;
    Ok(report)
  }

  // ── Replies ───────────────────────────────────────────────────────────────

  async fn create_reply(&self, input: NewReply) -> Result<Reply> {
    let created_at = now()?;
    let at_str     = encode_dt(created_at);
    let body       = input.body.clone();
    let thread_id  = input.thread_id;
    let user_id    = input.user_id;

    let id: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO replies (thread_id, user_id, body, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![thread_id.get(), user_id.get(), body, at_str],
        )?;
        let id = tx.last_insert_rowid();
        record_activity(&tx, user_id, ActivityKind::CreatedReply, id, &at_str)?;
        tx.execute(
          "INSERT INTO mention_outbox (reply_id, enqueued_at) VALUES (?1, ?2)",
          rusqlite::params![id, at_str],
        )?;
        tx.commit()?;
        Ok(id)
      })
      .await?;

    Ok(Reply {
      id: ReplyId(id),
      thread_id,
      user_id,
      body: input.body,
      created_at,
    })
  }

  async fn get_reply(&self, id: ReplyId) -> Result<Option<Reply>> {
    let raw: Option<RawReply> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {REPLY_COLUMNS} FROM replies WHERE id = ?1"),
            rusqlite::params![id.get()],
            RawReply::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawReply::into_reply).transpose()
  }

  async fn list_replies(&self, thread: ThreadId) -> Result<Vec<Reply>> {
    let raws: Vec<RawReply> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REPLY_COLUMNS} FROM replies WHERE thread_id = ?1 ORDER BY created_at, id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![thread.get()], RawReply::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReply::into_reply).collect()
  }

  // ── Subscriptions ─────────────────────────────────────────────────────────

  async fn subscribe(&self, thread: ThreadId, user: UserId) -> Result<bool> {
    let at_str = encode_dt(now()?);

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO subscriptions (thread_id, user_id, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![thread.get(), user.get(), at_str],
        )?;
        Ok(n > 0)
      })
      .await?;
    Ok(inserted)
  }

  async fn unsubscribe(&self, thread: ThreadId, user: UserId) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM subscriptions WHERE thread_id = ?1 AND user_id = ?2",
          rusqlite::params![thread.get(), user.get()],
        )?;
        Ok(n > 0)
      })
      .await?;
    Ok(removed)
  }

  async fn is_subscribed(&self, thread: ThreadId, user: UserId) -> Result<bool> {
    let found = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT 1 FROM subscriptions WHERE thread_id = ?1 AND user_id = ?2",
            rusqlite::params![thread.get(), user.get()],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false))
      })
      .await?;
    Ok(found)
  }

  async fn subscribers(&self, thread: ThreadId) -> Result<Vec<UserId>> {
    let ids = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id FROM subscriptions WHERE thread_id = ?1 ORDER BY user_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![thread.get()], |row| row.get(0).map(UserId))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(ids)
  }

  // ── Notifications ─────────────────────────────────────────────────────────

  async fn record_notification(
    &self,
    user:  UserId,
    reply: &Reply,
  ) -> Result<Option<Notification>> {
    let notification = Notification {
      id:         NotificationId::new_v4(),
      user_id:    user,
      reply_id:   reply.id,
      thread_id:  reply.thread_id,
      kind:       NotificationKind::Mentioned,
      created_at: now()?,
      read_at:    None,
    };

    let id_str    = encode_notification_id(notification.id);
    let kind_str  = encode_notification_kind(notification.kind);
    let at_str    = encode_dt(notification.created_at);
    let reply_id  = reply.id;
    let thread_id = reply.thread_id;

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO notifications
             (id, user_id, reply_id, thread_id, kind, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            user.get(),
            reply_id.get(),
            thread_id.get(),
            kind_str,
            at_str,
          ],
        )?;
        Ok(n > 0)
      })
      .await?;

    Ok(inserted.then_some(notification))
  }

  async fn notifications_for(
    &self,
    user:        UserId,
    unread_only: bool,
  ) -> Result<Vec<Notification>> {
    let raws: Vec<RawNotification> = self
      .conn
      .call(move |conn| {
        let unread = if unread_only { "AND read_at IS NULL" } else { "" };
        let mut stmt = conn.prepare(&format!(
          "SELECT {NOTIFICATION_COLUMNS} FROM notifications
           WHERE user_id = ?1 {unread}
           ORDER BY created_at DESC, id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user.get()], RawNotification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawNotification::into_notification).collect()
  }

  async fn mark_notification_read(&self, user: UserId, id: NotificationId) -> Result<bool> {
    let id_str = encode_notification_id(id);
    let at_str = encode_dt(now()?);

    let updated = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE notifications SET read_at = COALESCE(read_at, ?1)
           WHERE id = ?2 AND user_id = ?3",
          rusqlite::params![at_str, id_str, user.get()],
        )?;
        Ok(n > 0)
      })
      .await?;
    Ok(updated)
  }

  // ── Mention outbox ────────────────────────────────────────────────────────

  async fn pending_dispatches(&self, limit: usize) -> Result<Vec<PendingDispatch>> {
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let rows: Vec<(i64, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT reply_id, attempts FROM mention_outbox
           ORDER BY attempts, enqueued_at, reply_id
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(reply_id, attempts)| PendingDispatch {
          reply_id: ReplyId(reply_id),
          attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
        })
        .collect(),
    )
  }

  async fn complete_dispatch(&self, reply: ReplyId) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM mention_outbox WHERE reply_id = ?1",
          rusqlite::params![reply.get()],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fail_dispatch(&self, reply: ReplyId, error: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE mention_outbox SET attempts = attempts + 1, last_error = ?1
           WHERE reply_id = ?2",
          rusqlite::params![error, reply.get()],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Activity ──────────────────────────────────────────────────────────────

  async fn activity_for(&self, user: UserId) -> Result<Vec<Activity>> {
    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ACTIVITY_COLUMNS} FROM activities
           WHERE user_id = ?1
           ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user.get()], RawActivity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawActivity::into_activity).collect()
  }
}
