//! The forum service: input validation and lookups in front of the
//! [`ThreadAggregate`].
//!
//! This is the layer an HTTP adapter talks to. It resolves slugs and user
//! names to ids, rejects malformed input before anything is written, and
//! assembles read models. Every mutating operation takes the acting user as a
//! parameter.

use std::sync::Arc;

use serde::Deserialize;

use crate::{
  Error, FieldError, Resource, Result,
  cascade::CascadeReport,
  id::{ChannelId, NotificationId, ThreadId, UserId},
  model::{
    Channel, NewChannel, NewThread, NewUser, Notification, Profile, Reply,
    Thread, ThreadDetail, User,
  },
  notify::ReplyNotifier,
  policy::{OwnerPolicy, ThreadPolicy},
  store::{ForumStore, ThreadFilter},
  thread::ThreadAggregate,
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Filters accepted by [`Forum::list_threads`], in their external (slug and
/// name) form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadListing {
  /// Channel slug.
  pub channel: Option<String>,
  /// Author's user name.
  pub by:      Option<String>,
  #[serde(default)]
  pub popular: bool,
}

/// A submitted channel reference, before it is checked against the store.
///
/// Forms send every value as text and an unselected channel as an empty
/// string, so anything that is not an id is kept here and reported as a
/// field error instead of failing the whole body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChannelRef {
  #[default]
  Missing,
  Id(ChannelId),
  Malformed,
}

impl From<ChannelId> for ChannelRef {
  fn from(id: ChannelId) -> Self { Self::Id(id) }
}

impl<'de> Deserialize<'de> for ChannelRef {
  fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Submitted {
      Int(i64),
      Text(String),
      Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Submitted>::deserialize(deserializer)? {
      None => Self::Missing,
      Some(Submitted::Int(id)) => Self::Id(ChannelId(id)),
      Some(Submitted::Text(text)) => match text.trim() {
        "" => Self::Missing,
        text => text.parse().map_or(Self::Malformed, |id| Self::Id(ChannelId(id))),
      },
      Some(Submitted::Other(_)) => Self::Malformed,
    })
  }
}

/// Unvalidated thread input, as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateThread {
  #[serde(default)]
  pub channel_id: ChannelRef,
  #[serde(default)]
  pub title:      String,
  #[serde(default)]
  pub body:       String,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct Forum<S> {
  threads: ThreadAggregate<S>,
}

impl<S> Clone for Forum<S> {
  fn clone(&self) -> Self { Self { threads: self.threads.clone() } }
}

impl<S: ForumStore> Forum<S> {
  /// A forum where only thread authors may delete their threads.
  pub fn new(store: Arc<S>, notifier: Arc<dyn ReplyNotifier>) -> Self {
    Self::with_policy(store, Arc::new(OwnerPolicy), notifier)
  }

  pub fn with_policy(
    store: Arc<S>,
    policy: Arc<dyn ThreadPolicy>,
    notifier: Arc<dyn ReplyNotifier>,
  ) -> Self {
    Self { threads: ThreadAggregate::new(store, policy, notifier) }
  }

  pub fn threads(&self) -> &ThreadAggregate<S> { &self.threads }

  pub fn store(&self) -> &S { self.threads.store() }

  // ── Users ─────────────────────────────────────────────────────────────

  /// Register a user. `password_hash` must already be hashed by the caller.
  pub async fn register(&self, name: &str, password_hash: String) -> Result<User> {
    let name = name.trim();
    if name.is_empty() {
      return Err(Error::invalid("name", "The name field is required."));
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
      return Err(Error::invalid(
        "name",
        "The name may only contain letters, numbers and underscores.",
      ));
    }
    if self.store().find_user_by_name(name).await.map_err(Error::store)?.is_some() {
      return Err(Error::invalid("name", "The name has already been taken."));
    }

    self
      .store()
      .create_user(NewUser { name: name.to_owned(), password_hash })
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::invalid("name", "The name has already been taken."))
  }

  pub async fn user_named(&self, name: &str) -> Result<User> {
    self
      .store()
      .find_user_by_name(name)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(Resource::UserNamed(name.to_owned())))
  }

  pub async fn user(&self, id: UserId) -> Result<User> {
    self
      .store()
      .get_user(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(Resource::User(id)))
  }

  /// A user's threads and activity feed, both newest first.
  pub async fn profile(&self, name: &str) -> Result<Profile> {
    let user = self.user_named(name).await?;
    let filter = ThreadFilter { author: Some(user.id), ..ThreadFilter::default() };
    let threads = self.store().list_threads(&filter).await.map_err(Error::store)?;
    let activity = self.store().activity_for(user.id).await.map_err(Error::store)?;
    Ok(Profile { user, threads, activity })
  }

  // ── Channels ──────────────────────────────────────────────────────────

  pub async fn create_channel(&self, slug: &str, name: &str) -> Result<Channel> {
    let slug = slug.trim();
    let name = name.trim();

    let mut errors = Vec::new();
    if slug.is_empty() {
      errors.push(FieldError::new("slug", "The slug field is required."));
    } else if !slug
      .chars()
      .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
      errors.push(FieldError::new(
        "slug",
        "The slug may only contain lowercase letters, numbers and dashes.",
      ));
    } else if self
      .store()
      .find_channel_by_slug(slug)
      .await
      .map_err(Error::store)?
      .is_some()
    {
      errors.push(FieldError::new("slug", "The slug has already been taken."));
    }
    if name.is_empty() {
      errors.push(FieldError::new("name", "The name field is required."));
    }
    if !errors.is_empty() {
      return Err(Error::Validation(errors));
    }

    self
      .store()
      .create_channel(NewChannel { slug: slug.to_owned(), name: name.to_owned() })
      .await
      .map_err(Error::store)
  }

  pub async fn channel(&self, id: ChannelId) -> Result<Channel> {
    self
      .store()
      .get_channel(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(Resource::Channel(id)))
  }

  pub async fn channel_by_slug(&self, slug: &str) -> Result<Channel> {
    self
      .store()
      .find_channel_by_slug(slug)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(Resource::ChannelSlug(slug.to_owned())))
  }

  pub async fn list_channels(&self) -> Result<Vec<Channel>> {
    self.store().list_channels().await.map_err(Error::store)
  }

  // ── Threads ───────────────────────────────────────────────────────────

  /// Threads matching `listing`, newest first. An unknown channel slug or
  /// author name is a [`Error::NotFound`], not an empty listing.
  pub async fn list_threads(&self, listing: &ThreadListing) -> Result<Vec<Thread>> {
    let mut filter = ThreadFilter { popular: listing.popular, ..ThreadFilter::default() };
    if let Some(slug) = &listing.channel {
      filter.channel = Some(self.channel_by_slug(slug).await?.id);
    }
    if let Some(name) = &listing.by {
      filter.author = Some(self.user_named(name).await?.id);
    }
    self.store().list_threads(&filter).await.map_err(Error::store)
  }

  /// Validate and persist a new thread. All failing fields are reported
  /// together, and nothing is written unless every field passes.
  pub async fn create_thread(&self, author: UserId, input: CreateThread) -> Result<Thread> {
    let title = input.title.trim();
    let body = input.body.trim();

    const INVALID_CHANNEL: &str = "The selected channel id is invalid.";

    let mut errors = Vec::new();
    match input.channel_id {
      ChannelRef::Missing => {
        errors.push(FieldError::new("channel_id", "The channel id field is required."))
      }
      ChannelRef::Malformed => errors.push(FieldError::new("channel_id", INVALID_CHANNEL)),
      ChannelRef::Id(id) => {
        if let Err(e) = self.channel(id).await {
          match e {
            Error::NotFound(_) => errors.push(FieldError::new("channel_id", INVALID_CHANNEL)),
            other => return Err(other),
          }
        }
      }
    }
    if title.is_empty() {
      errors.push(FieldError::new("title", "The title field is required."));
    }
    if body.is_empty() {
      errors.push(FieldError::new("body", "The body field is required."));
    }

    let channel_id = match input.channel_id {
      ChannelRef::Id(id) if errors.is_empty() => id,
      _ => return Err(Error::Validation(errors)),
    };

    let thread = self
      .store()
      .create_thread(NewThread {
        user_id: author,
        channel_id,
        title: title.to_owned(),
        body: body.to_owned(),
      })
      .await
      .map_err(Error::store)?;

    tracing::info!(thread = %thread.id, user = %author, "thread published");
    Ok(thread)
  }

  pub async fn get_thread(&self, id: ThreadId) -> Result<Thread> {
    self.threads.thread(id).await
  }

  /// The thread page read model. `viewer` only affects `is_subscribed_to`.
  pub async fn show_thread(&self, id: ThreadId, viewer: Option<UserId>) -> Result<ThreadDetail> {
    let thread = self.threads.thread(id).await?;
    let channel = self.channel(thread.channel_id).await?;
    let author = self.user(thread.user_id).await?;
    let replies = self.store().list_replies(id).await.map_err(Error::store)?;
    let subscribers = self.store().subscribers(id).await.map_err(Error::store)?;
    let is_subscribed_to = match viewer {
      Some(user) => self.threads.is_subscribed(id, user).await?,
      None => false,
    };

    Ok(ThreadDetail {
      path: thread.path(&channel),
      thread,
      channel,
      author,
      replies,
      subscribers,
      is_subscribed_to,
    })
  }

  /// The path of a thread under its channel's slug.
  pub async fn thread_path(&self, thread: &Thread) -> Result<String> {
    Ok(thread.path(&self.channel(thread.channel_id).await?))
  }

  pub async fn delete_thread(&self, id: ThreadId, requester: UserId) -> Result<CascadeReport> {
    let report = self.threads.delete_thread(id, requester).await?;
    tracing::info!(
      thread = %id,
      user = %requester,
      replies = report.replies,
      subscriptions = report.subscriptions,
      "thread deleted",
    );
    Ok(report)
  }

  // ── Replies ───────────────────────────────────────────────────────────

  pub async fn create_reply(&self, thread: ThreadId, author: UserId, body: &str) -> Result<Reply> {
    self.threads.create_reply(thread, author, body).await
  }

  pub async fn replies(&self, thread: ThreadId) -> Result<Vec<Reply>> {
    self.threads.thread(thread).await?;
    self.store().list_replies(thread).await.map_err(Error::store)
  }

  // ── Subscriptions ─────────────────────────────────────────────────────

  pub async fn subscribe(&self, thread: ThreadId, user: UserId) -> Result<()> {
    self.threads.subscribe(thread, user).await
  }

  pub async fn unsubscribe(&self, thread: ThreadId, user: UserId) -> Result<()> {
    self.threads.unsubscribe(thread, user).await
  }

  pub async fn is_subscribed(&self, thread: ThreadId, user: UserId) -> Result<bool> {
    self.threads.is_subscribed(thread, user).await
  }

  // ── Notifications ─────────────────────────────────────────────────────

  pub async fn notifications(&self, user: UserId, unread_only: bool) -> Result<Vec<Notification>> {
    self.store().notifications_for(user, unread_only).await.map_err(Error::store)
  }

  pub async fn mark_notification_read(&self, user: UserId, id: NotificationId) -> Result<()> {
    if self.store().mark_notification_read(user, id).await.map_err(Error::store)? {
      Ok(())
    } else {
      Err(Error::NotFound(Resource::Notification(id)))
    }
  }
}
