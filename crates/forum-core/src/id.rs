//! Typed identifiers.
//!
//! Users, channels, threads and replies are keyed by the integer row id the
//! store assigns. Wrapping each in its own type keeps a `ThreadId` from ever
//! being passed where a `ReplyId` is expected. Notifications are keyed by a
//! random UUID instead, since they are created by the background dispatcher
//! rather than by a request.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! row_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
      Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl $name {
      pub fn get(self) -> i64 { self.0 }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
      }
    }

    impl From<i64> for $name {
      fn from(v: i64) -> Self { Self(v) }
    }
  };
}

row_id!(
  /// Identity of a registered user.
  UserId
);
row_id!(
  /// Identity of a channel.
  ChannelId
);
row_id!(
  /// Identity of a thread.
  ThreadId
);
row_id!(
  /// Identity of a reply. Reply ids grow monotonically, so they also break
  /// ties between replies recorded within the same instant.
  ReplyId
);
row_id!(ActivityId);

/// Identity of a notification.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NotificationId(pub Uuid);

impl NotificationId {
  pub fn new_v4() -> Self { Self(Uuid::new_v4()) }
}

impl fmt::Display for NotificationId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}
