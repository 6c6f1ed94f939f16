//! Forum entities.
//!
//! A thread exclusively owns its replies and subscriptions. A reply in turn
//! owns the activity rows, notifications and outbox entry that reference it.
//! Nothing outside a thread may point at its replies once the thread is gone;
//! see [`crate::cascade`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{
  ActivityId, ChannelId, NotificationId, ReplyId, ThreadId, UserId,
};

// ─── Users ───────────────────────────────────────────────────────────────────

/// A registered user. The password hash is kept by the store and never
/// leaves it through this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:         UserId,
  pub name:       String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::ForumStore::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub name:          String,
  /// argon2 PHC string, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

// ─── Channels ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
  pub id:         ChannelId,
  /// URL segment; immutable once threads reference it.
  pub slug:       String,
  pub name:       String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewChannel {
  pub slug: String,
  pub name: String,
}

// ─── Threads ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
  pub id:            ThreadId,
  pub user_id:       UserId,
  pub channel_id:    ChannelId,
  pub title:         String,
  pub body:          String,
  pub created_at:    DateTime<Utc>,
  /// Computed at read time; not a stored column.
  pub replies_count: u64,
}

impl Thread {
  /// The canonical path of this thread under its channel's slug.
  pub fn path(&self, channel: &Channel) -> String {
    thread_path(&channel.slug, self.id)
  }
}

pub fn thread_path(channel_slug: &str, id: ThreadId) -> String {
  format!("/threads/{channel_slug}/{id}")
}

/// Input to [`crate::store::ForumStore::create_thread`]. Already validated.
#[derive(Debug, Clone)]
pub struct NewThread {
  pub user_id:    UserId,
  pub channel_id: ChannelId,
  pub title:      String,
  pub body:       String,
}

/// The read model behind the thread page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadDetail {
  #[serde(flatten)]
  pub thread:           Thread,
  pub path:             String,
  pub channel:          Channel,
  pub author:           User,
  /// In display order: creation time, then id.
  pub replies:          Vec<Reply>,
  /// Everyone who follows the thread, by user id.
  pub subscribers:      Vec<UserId>,
  /// Whether the viewing user is subscribed. Always `false` for anonymous
  /// viewers.
  pub is_subscribed_to: bool,
}

// ─── Replies ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
  pub id:         ReplyId,
  pub thread_id:  ThreadId,
  pub user_id:    UserId,
  pub body:       String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReply {
  pub thread_id: ThreadId,
  pub user_id:   UserId,
  pub body:      String,
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

/// A user's standing interest in a thread. Unique per `(thread, user)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
  pub thread_id:  ThreadId,
  pub user_id:    UserId,
  pub created_at: DateTime<Utc>,
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
  /// The recipient was `@mentioned` in a reply.
  Mentioned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub id:         NotificationId,
  pub user_id:    UserId,
  pub reply_id:   ReplyId,
  pub thread_id:  ThreadId,
  pub kind:       NotificationKind,
  pub created_at: DateTime<Utc>,
  pub read_at:    Option<DateTime<Utc>>,
}

impl Notification {
  pub fn is_read(&self) -> bool { self.read_at.is_some() }
}

// ─── Activity ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
  CreatedThread,
  CreatedReply,
}

/// One entry in a user's activity feed. `subject_id` is a thread id or a
/// reply id depending on `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
  pub id:         ActivityId,
  pub user_id:    UserId,
  pub kind:       ActivityKind,
  pub subject_id: i64,
  pub created_at: DateTime<Utc>,
}

/// Everything shown on a user's profile page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
  pub user:     User,
  /// Newest first.
  pub threads:  Vec<Thread>,
  /// Newest first.
  pub activity: Vec<Activity>,
}
