//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond
//! precision and a `Z` suffix, so lexical order equals chronological order and
//! `ORDER BY created_at` is meaningful. Notification ids are stored as
//! hyphenated lowercase UUID strings.

use chrono::{DateTime, SecondsFormat, Utc};
use forum_core::{
  id::{
    ActivityId, ChannelId, NotificationId, ReplyId, ThreadId, UserId,
  },
  model::{
    Activity, ActivityKind, Channel, Notification, NotificationKind, Reply,
    Thread, User,
  },
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_notification_id(id: NotificationId) -> String {
  id.0.hyphenated().to_string()
}

pub fn decode_notification_id(s: &str) -> Result<NotificationId> {
  Ok(NotificationId(Uuid::parse_str(s)?))
}

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Current time, truncated to the stored precision so that what a write
/// returns is exactly what a later read decodes.
pub fn now() -> Result<DateTime<Utc>> { decode_dt(&encode_dt(Utc::now())) }

// ─── Enums ────────────────────────────────────────────────────────────────────

pub fn encode_notification_kind(k: NotificationKind) -> &'static str {
  match k {
    NotificationKind::Mentioned => "mentioned",
  }
}

pub fn decode_notification_kind(s: &str) -> Result<NotificationKind> {
  match s {
    "mentioned" => Ok(NotificationKind::Mentioned),
    other => Err(Error::UnknownVariant {
      column: "notifications.kind",
      value:  other.to_owned(),
    }),
  }
}

pub fn encode_activity_kind(k: ActivityKind) -> &'static str {
  match k {
    ActivityKind::CreatedThread => "created_thread",
    ActivityKind::CreatedReply => "created_reply",
  }
}

pub fn decode_activity_kind(s: &str) -> Result<ActivityKind> {
  match s {
    "created_thread" => Ok(ActivityKind::CreatedThread),
    "created_reply" => Ok(ActivityKind::CreatedReply),
    other => Err(Error::UnknownVariant {
      column: "activities.kind",
      value:  other.to_owned(),
    }),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────
//
// Each row type is filled inside the database closure with plain column
// values and decoded afterwards, outside of it.

pub const USER_COLUMNS: &str = "id, name, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:         i64,
  pub name:       String,
  pub created_at: String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      created_at: row.get(2)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:         UserId(self.id),
      name:       self.name,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const CHANNEL_COLUMNS: &str = "id, slug, name, created_at";

pub struct RawChannel {
  pub id:         i64,
  pub slug:       String,
  pub name:       String,
  pub created_at: String,
}

impl RawChannel {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      slug:       row.get(1)?,
      name:       row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_channel(self) -> Result<Channel> {
    Ok(Channel {
      id:         ChannelId(self.id),
      slug:       self.slug,
      name:       self.name,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Thread columns, qualified with the `t` alias, plus the reply count.
pub const THREAD_COLUMNS: &str = "t.id, t.user_id, t.channel_id, t.title, t.body, t.created_at,
  (SELECT COUNT(*) FROM replies r WHERE r.thread_id = t.id) AS replies_count";

pub struct RawThread {
  pub id:            i64,
  pub user_id:       i64,
  pub channel_id:    i64,
  pub title:         String,
  pub body:          String,
  pub created_at:    String,
  pub replies_count: i64,
}

impl RawThread {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      user_id:       row.get(1)?,
      channel_id:    row.get(2)?,
      title:         row.get(3)?,
      body:          row.get(4)?,
      created_at:    row.get(5)?,
      replies_count: row.get(6)?,
    })
  }

  pub fn into_thread(self) -> Result<Thread> {
    Ok(Thread {
      id:            ThreadId(self.id),
      user_id:       UserId(self.user_id),
      channel_id:    ChannelId(self.channel_id),
      title:         self.title,
      body:          self.body,
      created_at:    decode_dt(&self.created_at)?,
      replies_count: self.replies_count.max(0) as u64,
    })
  }
}

pub const REPLY_COLUMNS: &str = "id, thread_id, user_id, body, created_at";

pub struct RawReply {
  pub id:         i64,
  pub thread_id:  i64,
  pub user_id:    i64,
  pub body:       String,
  pub created_at: String,
}

impl RawReply {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      thread_id:  row.get(1)?,
      user_id:    row.get(2)?,
      body:       row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_reply(self) -> Result<Reply> {
    Ok(Reply {
      id:         ReplyId(self.id),
      thread_id:  ThreadId(self.thread_id),
      user_id:    UserId(self.user_id),
      body:       self.body,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const NOTIFICATION_COLUMNS: &str =
  "id, user_id, reply_id, thread_id, kind, created_at, read_at";

pub struct RawNotification {
  pub id:         String,
  pub user_id:    i64,
  pub reply_id:   i64,
  pub thread_id:  i64,
  pub kind:       String,
  pub created_at: String,
  pub read_at:    Option<String>,
}

impl RawNotification {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      user_id:    row.get(1)?,
      reply_id:   row.get(2)?,
      thread_id:  row.get(3)?,
      kind:       row.get(4)?,
      created_at: row.get(5)?,
      read_at:    row.get(6)?,
    })
  }

  pub fn into_notification(self) -> Result<Notification> {
    Ok(Notification {
      id:         decode_notification_id(&self.id)?,
      user_id:    UserId(self.user_id),
      reply_id:   ReplyId(self.reply_id),
      thread_id:  ThreadId(self.thread_id),
      kind:       decode_notification_kind(&self.kind)?,
      created_at: decode_dt(&self.created_at)?,
      read_at:    self.read_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub const ACTIVITY_COLUMNS: &str = "id, user_id, kind, subject_id, created_at";

pub struct RawActivity {
  pub id:         i64,
  pub user_id:    i64,
  pub kind:       String,
  pub subject_id: i64,
  pub created_at: String,
}

impl RawActivity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      user_id:    row.get(1)?,
      kind:       row.get(2)?,
      subject_id: row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_activity(self) -> Result<Activity> {
    Ok(Activity {
      id:         ActivityId(self.id),
      user_id:    UserId(self.user_id),
      kind:       decode_activity_kind(&self.kind)?,
      subject_id: self.subject_id,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
