//! The `ForumStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `forum-store-sqlite`).
//! Higher layers ([`crate::thread`], [`crate::service`], `forum-api`) depend on
//! this abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  cascade::CascadeReport,
  id::{ChannelId, NotificationId, ReplyId, ThreadId, UserId},
  model::{
    Activity, Channel, NewChannel, NewReply, NewThread, NewUser, Notification,
    Reply, Thread, User,
  },
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`ForumStore::list_threads`]. Lookups by slug or user name
/// are resolved to ids before the store sees them.
#[derive(Debug, Clone, Default)]
pub struct ThreadFilter {
  /// Restrict to a single channel.
  pub channel: Option<ChannelId>,
  /// Restrict to threads authored by this user.
  pub author:  Option<UserId>,
  /// Order by reply count (descending) before recency.
  pub popular: bool,
}

/// A reply whose mentions have not been dispatched yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDispatch {
  pub reply_id: ReplyId,
  /// How many earlier dispatch attempts failed.
  pub attempts: u32,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a forum store backend.
///
/// Every method is a single unit of work: multi-row writes (thread creation,
/// reply creation, the deletion cascade) are atomic.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ForumStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Insert a user. `None` when the name is already taken, including by a
  /// registration that raced this one.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// The user and their stored password hash, for authentication.
  fn user_credentials<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<(User, String)>, Self::Error>> + Send + 'a;

  /// Resolve exact (case-sensitive) names to users. Unknown names are
  /// skipped; the result is ordered by user id.
  fn users_named(
    &self,
    names: Vec<String>,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  // ── Channels ──────────────────────────────────────────────────────────

  fn create_channel(
    &self,
    input: NewChannel,
  ) -> impl Future<Output = Result<Channel, Self::Error>> + Send + '_;

  fn get_channel(
    &self,
    id: ChannelId,
  ) -> impl Future<Output = Result<Option<Channel>, Self::Error>> + Send + '_;

  fn find_channel_by_slug<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<Channel>, Self::Error>> + Send + 'a;

  /// All channels, ordered by name.
  fn list_channels(
    &self,
  ) -> impl Future<Output = Result<Vec<Channel>, Self::Error>> + Send + '_;

  // ── Threads ───────────────────────────────────────────────────────────

  /// Persist a thread together with the author's activity row and the
  /// author's subscription.
  fn create_thread(
    &self,
    input: NewThread,
  ) -> impl Future<Output = Result<Thread, Self::Error>> + Send + '_;

  fn get_thread(
    &self,
    id: ThreadId,
  ) -> impl Future<Output = Result<Option<Thread>, Self::Error>> + Send + '_;

  /// Threads matching `filter`, newest first.
  fn list_threads<'a>(
    &'a self,
    filter: &'a ThreadFilter,
  ) -> impl Future<Output = Result<Vec<Thread>, Self::Error>> + Send + 'a;

  /// Remove a thread and everything it owns in one transaction, by running
  /// [`crate::cascade::delete_thread`] against the backend's transaction.
  ///
  /// Returns `None` if the thread does not exist. On any error nothing is
  /// removed.
  fn delete_thread(
    &self,
    id: ThreadId,
  ) -> impl Future<Output = Result<Option<CascadeReport>, Self::Error>> + Send + '_;

  // ── Replies ───────────────────────────────────────────────────────────

  /// Persist a reply together with its activity row and its mention-outbox
  /// entry.
  fn create_reply(
    &self,
    input: NewReply,
  ) -> impl Future<Output = Result<Reply, Self::Error>> + Send + '_;

  fn get_reply(
    &self,
    id: ReplyId,
  ) -> impl Future<Output = Result<Option<Reply>, Self::Error>> + Send + '_;

  /// Replies of a thread in display order (creation time, then id).
  fn list_replies(
    &self,
    thread: ThreadId,
  ) -> impl Future<Output = Result<Vec<Reply>, Self::Error>> + Send + '_;

  // ── Subscriptions ─────────────────────────────────────────────────────

  /// Returns `true` if a new subscription row was written, `false` if the
  /// user was already subscribed.
  fn subscribe(
    &self,
    thread: ThreadId,
    user: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Returns `true` if a subscription row was removed.
  fn unsubscribe(
    &self,
    thread: ThreadId,
    user: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn is_subscribed(
    &self,
    thread: ThreadId,
    user: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn subscribers(
    &self,
    thread: ThreadId,
  ) -> impl Future<Output = Result<Vec<UserId>, Self::Error>> + Send + '_;

  // ── Notifications ─────────────────────────────────────────────────────

  /// Record that `user` was mentioned in `reply`. Returns `None` if that
  /// notification already exists, which makes redelivery harmless.
  fn record_notification<'a>(
    &'a self,
    user: UserId,
    reply: &'a Reply,
  ) -> impl Future<Output = Result<Option<Notification>, Self::Error>> + Send + 'a;

  /// A user's notifications, newest first.
  fn notifications_for(
    &self,
    user: UserId,
    unread_only: bool,
  ) -> impl Future<Output = Result<Vec<Notification>, Self::Error>> + Send + '_;

  /// Mark one of `user`'s notifications as read. Returns `false` if no such
  /// notification belongs to `user`.
  fn mark_notification_read(
    &self,
    user: UserId,
    id: NotificationId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Mention outbox ────────────────────────────────────────────────────

  /// A batch of replies whose mentions still need dispatching. Entries with
  /// fewer failed attempts come first, then the oldest, so entries that keep
  /// failing never hold back newer ones.
  fn pending_dispatches(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<PendingDispatch>, Self::Error>> + Send + '_;

  /// Remove a reply's outbox entry once dispatch succeeded.
  fn complete_dispatch(
    &self,
    reply: ReplyId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Record a failed attempt; the entry stays queued.
  fn fail_dispatch(
    &self,
    reply: ReplyId,
    error: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Activity ──────────────────────────────────────────────────────────

  /// A user's activity feed, newest first.
  fn activity_for(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + '_;
}
