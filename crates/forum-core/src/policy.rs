//! Authorization policy for thread mutations.

use crate::{id::UserId, model::Thread};

/// Decides whether a user may act on a thread. Consulted by
/// [`crate::thread::ThreadAggregate::delete_thread`] before anything is
/// touched.
pub trait ThreadPolicy: Send + Sync {
  fn can_delete(&self, thread: &Thread, requester: UserId) -> bool;
}

/// Only the author of a thread may delete it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerPolicy;

impl ThreadPolicy for OwnerPolicy {
  fn can_delete(&self, thread: &Thread, requester: UserId) -> bool {
    thread.user_id == requester
  }
}
