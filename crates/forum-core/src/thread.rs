//! The thread aggregate: a thread plus everything it owns.
//!
//! Every mutation of replies or subscriptions goes through here, and so does
//! deletion. Identity is always an explicit parameter; there is no ambient
//! "current user".

use std::sync::Arc;

use crate::{
  Error, Resource, Result,
  cascade::CascadeReport,
  id::{ThreadId, UserId},
  model::{NewReply, Reply, Thread},
  notify::ReplyNotifier,
  policy::ThreadPolicy,
  store::ForumStore,
};

pub struct ThreadAggregate<S> {
  store:    Arc<S>,
  policy:   Arc<dyn ThreadPolicy>,
  notifier: Arc<dyn ReplyNotifier>,
}

impl<S> Clone for ThreadAggregate<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      policy:   Arc::clone(&self.policy),
      notifier: Arc::clone(&self.notifier),
    }
  }
}

impl<S: ForumStore> ThreadAggregate<S> {
  pub fn new(
    store: Arc<S>,
    policy: Arc<dyn ThreadPolicy>,
    notifier: Arc<dyn ReplyNotifier>,
  ) -> Self {
    Self { store, policy, notifier }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Load a thread or fail with [`Error::NotFound`].
  pub async fn thread(&self, id: ThreadId) -> Result<Thread> {
    self
      .store
      .get_thread(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(Resource::Thread(id)))
  }

  /// Persist a reply, then signal the notifier.
  ///
  /// The notifier is told after the reply is durable and cannot fail the
  /// call; mention dispatch happens outside this unit of work.
  pub async fn create_reply(
    &self,
    thread: ThreadId,
    author: UserId,
    body: &str,
  ) -> Result<Reply> {
    let body = body.trim();
    if body.is_empty() {
      return Err(Error::invalid("body", "The body field is required."));
    }

    self.thread(thread).await?;

    let reply = self
      .store
      .create_reply(NewReply {
        thread_id: thread,
        user_id:   author,
        body:      body.to_owned(),
      })
      .await
      .map_err(Error::store)?;

    self.notifier.reply_created(&reply);
    Ok(reply)
  }

  /// Delete a thread with all of its replies and subscriptions.
  ///
  /// The policy is consulted first; a refused request touches nothing. The
  /// cascade itself is a single store transaction (see [`crate::cascade`]).
  pub async fn delete_thread(
    &self,
    id: ThreadId,
    requester: UserId,
  ) -> Result<CascadeReport> {
    let thread = self.thread(id).await?;

    if !self.policy.can_delete(&thread, requester) {
      return Err(Error::Forbidden {
        user:   requester,
        thread: id,
        action: "delete",
      });
    }

    self
      .store
      .delete_thread(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(Resource::Thread(id)))
  }

  /// Subscribe `user` to `thread`. Subscribing twice is a no-op.
  pub async fn subscribe(&self, thread: ThreadId, user: UserId) -> Result<()> {
    self.thread(thread).await?;
    self.store.subscribe(thread, user).await.map_err(Error::store)?;
    Ok(())
  }

  /// Unsubscribe `user` from `thread`. Unsubscribing a non-subscriber is a
  /// no-op.
  pub async fn unsubscribe(&self, thread: ThreadId, user: UserId) -> Result<()> {
    self.store.unsubscribe(thread, user).await.map_err(Error::store)?;
    Ok(())
  }

  pub async fn is_subscribed(&self, thread: ThreadId, user: UserId) -> Result<bool> {
    self.store.is_subscribed(thread, user).await.map_err(Error::store)
  }
}
