//! Integration tests for `SqliteStore` driven through the forum service,
//! against an in-memory database.

use std::sync::Arc;

use forum_core::{
  Error, Resource,
  id::{ReplyId, ThreadId, UserId},
  model::{ActivityKind, Channel, NewUser, Thread, User},
  notify::{NullNotifier, drain_outbox},
  service::{CreateThread, Forum, ThreadListing},
  store::ForumStore,
};

use crate::SqliteStore;

async fn forum() -> Forum<SqliteStore> {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  Forum::new(Arc::new(store), Arc::new(NullNotifier))
}

async fn user(f: &Forum<SqliteStore>, name: &str) -> User {
  f.register(name, "not-a-real-hash".into()).await.unwrap()
}

async fn channel(f: &Forum<SqliteStore>, slug: &str) -> Channel {
  f.create_channel(slug, &slug.to_uppercase()).await.unwrap()
}

async fn thread(f: &Forum<SqliteStore>, author: &User, channel: &Channel, title: &str) -> Thread {
  f.create_thread(author.id, CreateThread {
    channel_id: channel.id.into(),
    title:      title.into(),
    body:       format!("{title} body"),
  })
  .await
  .unwrap()
}

/// Run a scalar `COUNT(*)`-style query directly against the connection.
async fn count(f: &Forum<SqliteStore>, sql: &'static str, param: i64) -> i64 {
  f.store()
    .conn
    .call(move |conn| Ok(conn.query_row(sql, [param], |row| row.get(0))?))
    .await
    .unwrap()
}

fn validation_fields(err: &Error) -> Vec<&'static str> {
  match err {
    Error::Validation(fields) => fields.iter().map(|f| f.field).collect(),
    other => panic!("expected validation error, got {other:?}"),
  }
}

// ─── Users & channels ────────────────────────────────────────────────────────

#[tokio::test]
async fn register_and_find_user() {
  let f = forum().await;
  let bob = user(&f, "bob").await;

  assert_eq!(f.user_named("bob").await.unwrap(), bob);
  let (found, hash) = f.store().user_credentials("bob").await.unwrap().unwrap();
  assert_eq!(found.id, bob.id);
  assert_eq!(hash, "not-a-real-hash");
}

#[tokio::test]
async fn duplicate_user_name_is_rejected() {
  let f = forum().await;
  user(&f, "bob").await;
  let err = f.register("bob", "x".into()).await.unwrap_err();
  assert_eq!(validation_fields(&err), vec!["name"]);
}

#[tokio::test]
async fn racing_registrations_of_one_name_yield_one_user() {
  let f = forum().await;
  let (a, b) = tokio::join!(
    f.register("bob", "first".into()),
    f.register("bob", "second".into()),
  );
  let err = match (a, b) {
    (Ok(_), Err(e)) | (Err(e), Ok(_)) => e,
    other => panic!("expected exactly one registration to win, got {other:?}"),
  };
  assert_eq!(validation_fields(&err), vec!["name"]);
  assert_eq!(count(&f, "SELECT COUNT(*) FROM users WHERE id > ?1", 0).await, 1);
}

#[tokio::test]
async fn store_reports_a_taken_name_instead_of_failing() {
  let f = forum().await;
  user(&f, "bob").await;
  let again = f
    .store()
    .create_user(NewUser { name: "bob".into(), password_hash: "x".into() })
    .await
    .unwrap();
  assert!(again.is_none());
}

#[tokio::test]
async fn channel_slug_must_be_well_formed_and_unique() {
  let f = forum().await;
  channel(&f, "general").await;

  let err = f.create_channel("general", "Again").await.unwrap_err();
  assert_eq!(validation_fields(&err), vec!["slug"]);

  let err = f.create_channel("Not A Slug", "").await.unwrap_err();
  assert_eq!(validation_fields(&err), vec!["slug", "name"]);

  let all = f.list_channels().await.unwrap();
  assert_eq!(all.len(), 1);
}

// ─── Thread creation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn create_thread_subscribes_author_and_records_activity() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let general = channel(&f, "general").await;

  let t = thread(&f, &alice, &general, "Hello").await;
  assert_eq!(t.user_id, alice.id);
  assert_eq!(t.channel_id, general.id);
  assert_eq!(t.path(&general), format!("/threads/general/{}", t.id));

  assert!(f.is_subscribed(t.id, alice.id).await.unwrap());

  let profile = f.profile("alice").await.unwrap();
  assert_eq!(profile.threads, vec![t.clone()]);
  assert_eq!(profile.activity.len(), 1);
  assert_eq!(profile.activity[0].kind, ActivityKind::CreatedThread);
  assert_eq!(profile.activity[0].subject_id, t.id.get());
}

#[tokio::test]
async fn create_thread_with_empty_title_persists_nothing() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let general = channel(&f, "general").await;

  let err = f
    .create_thread(alice.id, CreateThread {
      channel_id: general.id.into(),
      title:      "   ".into(),
      body:       "body".into(),
    })
    .await
    .unwrap_err();

  assert_eq!(validation_fields(&err), vec!["title"]);
  assert!(f.list_threads(&ThreadListing::default()).await.unwrap().is_empty());
  assert_eq!(count(&f, "SELECT COUNT(*) FROM activities WHERE user_id = ?1", alice.id.get()).await, 0);
}

#[tokio::test]
async fn create_thread_reports_every_invalid_field() {
  let f = forum().await;
  let alice = user(&f, "alice").await;

  let err = f.create_thread(alice.id, CreateThread::default()).await.unwrap_err();
  assert_eq!(validation_fields(&err), vec!["channel_id", "title", "body"]);

  let err = f
    .create_thread(alice.id, CreateThread {
      channel_id: forum_core::id::ChannelId(999).into(),
      title:      "t".into(),
      body:       "b".into(),
    })
    .await
    .unwrap_err();
  assert_eq!(validation_fields(&err), vec!["channel_id"]);
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn threads_are_listed_newest_first_and_filtered() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let bob = user(&f, "bob").await;
  let general = channel(&f, "general").await;
  let rust = channel(&f, "rust").await;

  let first = thread(&f, &alice, &general, "first").await;
  let second = thread(&f, &bob, &rust, "second").await;
  let third = thread(&f, &alice, &rust, "third").await;

  let all = f.list_threads(&ThreadListing::default()).await.unwrap();
  let ids: Vec<ThreadId> = all.iter().map(|t| t.id).collect();
  assert_eq!(ids, vec![third.id, second.id, first.id]);

  let in_rust = f
    .list_threads(&ThreadListing { channel: Some("rust".into()), ..Default::default() })
    .await
    .unwrap();
  let ids: Vec<ThreadId> = in_rust.iter().map(|t| t.id).collect();
  assert_eq!(ids, vec![third.id, second.id]);

  let by_alice = f
    .list_threads(&ThreadListing { by: Some("alice".into()), ..Default::default() })
    .await
    .unwrap();
  let ids: Vec<ThreadId> = by_alice.iter().map(|t| t.id).collect();
  assert_eq!(ids, vec![third.id, first.id]);
}

#[tokio::test]
async fn unknown_channel_filter_is_not_found() {
  let f = forum().await;
  let err = f
    .list_threads(&ThreadListing { channel: Some("nope".into()), ..Default::default() })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound(Resource::ChannelSlug(ref s)) if s == "nope"));
}

#[tokio::test]
async fn popular_orders_by_reply_count() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let general = channel(&f, "general").await;

  let busy = thread(&f, &alice, &general, "busy").await;
  let quiet = thread(&f, &alice, &general, "quiet").await;
  f.create_reply(busy.id, alice.id, "one").await.unwrap();
  f.create_reply(busy.id, alice.id, "two").await.unwrap();

  let popular = f
    .list_threads(&ThreadListing { popular: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(popular[0].id, busy.id);
  assert_eq!(popular[0].replies_count, 2);
  assert_eq!(popular[1].id, quiet.id);
  assert_eq!(popular[1].replies_count, 0);
}

// ─── Replies ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn replies_are_returned_in_creation_order() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let general = channel(&f, "general").await;
  let t = thread(&f, &alice, &general, "Hello").await;

  let mut created = Vec::new();
  for body in ["one", "two", "three"] {
    created.push(f.create_reply(t.id, alice.id, body).await.unwrap().id);
  }

  let listed: Vec<ReplyId> = f.replies(t.id).await.unwrap().iter().map(|r| r.id).collect();
  assert_eq!(listed, created);

  let detail = f.show_thread(t.id, Some(alice.id)).await.unwrap();
  assert_eq!(detail.replies.len(), 3);
  assert_eq!(detail.thread.replies_count, 3);
  assert!(detail.is_subscribed_to);
  assert_eq!(detail.author, alice);
}

#[tokio::test]
async fn reply_validation() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let general = channel(&f, "general").await;
  let t = thread(&f, &alice, &general, "Hello").await;

  let err = f.create_reply(t.id, alice.id, "  ").await.unwrap_err();
  assert_eq!(validation_fields(&err), vec!["body"]);

  let err = f.create_reply(ThreadId(999), alice.id, "hi").await.unwrap_err();
  assert!(matches!(err, Error::NotFound(Resource::Thread(ThreadId(999)))));
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

#[tokio::test]
async fn subscribing_twice_keeps_one_row() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let bob = user(&f, "bob").await;
  let general = channel(&f, "general").await;
  let t = thread(&f, &alice, &general, "Hello").await;

  f.subscribe(t.id, bob.id).await.unwrap();
  f.subscribe(t.id, bob.id).await.unwrap();

  assert!(f.is_subscribed(t.id, bob.id).await.unwrap());
  assert_eq!(
    count(&f, "SELECT COUNT(*) FROM subscriptions WHERE user_id = ?1", bob.id.get()).await,
    1
  );
  let detail = f.show_thread(t.id, None).await.unwrap();
  assert_eq!(detail.subscribers, vec![alice.id, bob.id]);
}

#[tokio::test]
async fn concurrent_duplicate_subscribes_keep_one_row() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let bob = user(&f, "bob").await;
  let general = channel(&f, "general").await;
  let t = thread(&f, &alice, &general, "Hello").await;

  let (a, b) = tokio::join!(f.subscribe(t.id, bob.id), f.subscribe(t.id, bob.id));
  a.unwrap();
  b.unwrap();

  assert_eq!(
    count(&f, "SELECT COUNT(*) FROM subscriptions WHERE user_id = ?1", bob.id.get()).await,
    1
  );
}

#[tokio::test]
async fn unsubscribing_a_non_subscriber_is_a_no_op() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let bob = user(&f, "bob").await;
  let general = channel(&f, "general").await;
  let t = thread(&f, &alice, &general, "Hello").await;

  f.unsubscribe(t.id, bob.id).await.unwrap();
  assert!(!f.is_subscribed(t.id, bob.id).await.unwrap());

  f.unsubscribe(t.id, alice.id).await.unwrap();
  assert!(!f.is_subscribed(t.id, alice.id).await.unwrap());
}

#[tokio::test]
async fn subscribing_to_missing_thread_is_not_found() {
  let f = forum().await;
  let bob = user(&f, "bob").await;
  let err = f.subscribe(ThreadId(42), bob.id).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(Resource::Thread(_))));
}

// ─── Mentions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_mentions_notify_once() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let bob = user(&f, "bob").await;
  let general = channel(&f, "general").await;
  let t = thread(&f, &alice, &general, "Hello").await;

  let reply = f.create_reply(t.id, alice.id, "hello @bob and @bob").await.unwrap();
  let report = drain_outbox(f.store(), 10).await.unwrap();
  assert_eq!(report.dispatched, 1);
  assert_eq!(report.notifications, 1);

  let inbox = f.notifications(bob.id, true).await.unwrap();
  assert_eq!(inbox.len(), 1);
  assert_eq!(inbox[0].reply_id, reply.id);
  assert_eq!(inbox[0].thread_id, t.id);
}

#[tokio::test]
async fn self_mentions_do_not_notify() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let general = channel(&f, "general").await;
  let t = thread(&f, &alice, &general, "Hello").await;

  f.create_reply(t.id, alice.id, "hello @alice").await.unwrap();
  let report = drain_outbox(f.store(), 10).await.unwrap();

  assert_eq!(report.dispatched, 1);
  assert_eq!(report.notifications, 0);
  assert!(f.notifications(alice.id, false).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_names_are_dropped() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let bob = user(&f, "bob").await;
  let general = channel(&f, "general").await;
  let t = thread(&f, &alice, &general, "Hello").await;

  f.create_reply(t.id, alice.id, "@ghost @Bob @bob").await.unwrap();
  let report = drain_outbox(f.store(), 10).await.unwrap();

  assert_eq!(report.notifications, 1);
  assert_eq!(f.notifications(bob.id, false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn redraining_never_duplicates() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let bob = user(&f, "bob").await;
  let general = channel(&f, "general").await;
  let t = thread(&f, &alice, &general, "Hello").await;

  let reply = f.create_reply(t.id, alice.id, "@bob").await.unwrap();
  drain_outbox(f.store(), 10).await.unwrap();
  assert!(f.store().pending_dispatches(10).await.unwrap().is_empty());

  // Simulate a redelivery of an already-dispatched reply.
  let again = forum_core::notify::dispatch_mentions(f.store(), &reply).await.unwrap();
  assert!(again.is_empty());
  assert_eq!(f.notifications(bob.id, false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_dispatch_stays_queued() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  user(&f, "bob").await;
  let general = channel(&f, "general").await;
  let t = thread(&f, &alice, &general, "Hello").await;

  f.store()
    .conn
    .call(|conn| {
      conn.execute_batch(
        "CREATE TRIGGER refuse_notifications BEFORE INSERT ON notifications
         BEGIN SELECT RAISE(ABORT, 'delivery unavailable'); END;",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  // Reply creation itself is unaffected by the broken delivery path.
  let reply = f.create_reply(t.id, alice.id, "@bob").await.unwrap();

  let report = drain_outbox(f.store(), 10).await.unwrap();
  assert_eq!(report.failed, 1);
  let pending = f.store().pending_dispatches(10).await.unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].reply_id, reply.id);
  assert_eq!(pending[0].attempts, 1);
}

#[tokio::test]
async fn failing_entry_does_not_hold_back_later_replies() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let bob = user(&f, "bob").await;
  let general = channel(&f, "general").await;
  let t = thread(&f, &alice, &general, "Hello").await;

  let stuck = f.create_reply(t.id, alice.id, "@bob first").await.unwrap();
  let healthy = f.create_reply(t.id, alice.id, "@bob second").await.unwrap();

  let trigger = format!(
    "CREATE TRIGGER refuse_first_reply BEFORE INSERT ON notifications
     WHEN NEW.reply_id = {stuck}
     BEGIN SELECT RAISE(ABORT, 'delivery unavailable'); END;",
    stuck = stuck.id,
  );
  f.store()
    .conn
    .call(move |conn| {
      conn.execute_batch(&trigger)?;
      Ok(())
    })
    .await
    .unwrap();

  for _ in 0..3 {
    drain_outbox(f.store(), 1).await.unwrap();
  }

  let delivered = f.notifications(bob.id, false).await.unwrap();
  assert_eq!(delivered.len(), 1);
  assert_eq!(delivered[0].reply_id, healthy.id);

  let pending = f.store().pending_dispatches(10).await.unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].reply_id, stuck.id);
  assert_eq!(pending[0].attempts, 2);
}

#[tokio::test]
async fn notifications_can_be_marked_read_by_their_recipient_only() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let bob = user(&f, "bob").await;
  let general = channel(&f, "general").await;
  let t = thread(&f, &alice, &general, "Hello").await;

  f.create_reply(t.id, alice.id, "@bob").await.unwrap();
  drain_outbox(f.store(), 10).await.unwrap();
  let id = f.notifications(bob.id, true).await.unwrap()[0].id;

  let err = f.mark_notification_read(alice.id, id).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(Resource::Notification(_))));

  f.mark_notification_read(bob.id, id).await.unwrap();
  assert!(f.notifications(bob.id, true).await.unwrap().is_empty());
  let all = f.notifications(bob.id, false).await.unwrap();
  assert!(all[0].is_read());
}

// ─── Deletion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn owner_deletes_thread_and_it_is_gone() {
  let f = forum().await;
  let owner = user(&f, "owner").await;
  let general = channel(&f, "general").await;
  let t = thread(&f, &owner, &general, "Hello").await;

  f.delete_thread(t.id, owner.id).await.unwrap();

  let err = f.get_thread(t.id).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(Resource::Thread(id)) if id == t.id));

  let err = f.delete_thread(t.id, owner.id).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn stranger_cannot_delete_and_nothing_changes() {
  let f = forum().await;
  let owner = user(&f, "owner").await;
  let stranger = user(&f, "stranger").await;
  let general = channel(&f, "general").await;
  let t = thread(&f, &owner, &general, "Hello").await;
  let reply = f.create_reply(t.id, stranger.id, "first!").await.unwrap();

  let err = f.delete_thread(t.id, stranger.id).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Forbidden { user, thread, .. } if user == stranger.id && thread == t.id
  ));

  assert!(f.get_thread(t.id).await.is_ok());
  assert!(f.store().get_reply(reply.id).await.unwrap().is_some());
  assert!(f.is_subscribed(t.id, owner.id).await.unwrap());
}

#[tokio::test]
async fn cascade_removes_everything_the_thread_owns_and_nothing_else() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let bob = user(&f, "bob").await;
  let carol = user(&f, "carol").await;
  let general = channel(&f, "general").await;

  let doomed = thread(&f, &alice, &general, "doomed").await;
  let survivor = thread(&f, &alice, &general, "survivor").await;

  let mut doomed_replies = Vec::new();
  for (author, body) in [(&bob, "hi @carol"), (&carol, "hey @bob"), (&alice, "@bob @carol")] {
    doomed_replies.push(f.create_reply(doomed.id, author.id, body).await.unwrap());
  }
  f.subscribe(doomed.id, bob.id).await.unwrap();
  f.subscribe(doomed.id, carol.id).await.unwrap();

  let kept_reply = f.create_reply(survivor.id, bob.id, "ping @carol").await.unwrap();
  f.subscribe(survivor.id, carol.id).await.unwrap();

  drain_outbox(f.store(), 10).await.unwrap();
  assert_eq!(count(&f, "SELECT COUNT(*) FROM notifications WHERE thread_id = ?1", doomed.id.get()).await, 4);

  let report = f.delete_thread(doomed.id, alice.id).await.unwrap();
  assert_eq!(report.replies, 3);
  // alice (author) + bob + carol
  assert_eq!(report.subscriptions, 3);

  assert!(f.store().get_thread(doomed.id).await.unwrap().is_none());
  for r in &doomed_replies {
    assert!(f.store().get_reply(r.id).await.unwrap().is_none());
    // Per-reply teardown ran: nothing else still points at the reply.
    assert_eq!(count(&f, "SELECT COUNT(*) FROM notifications WHERE reply_id = ?1", r.id.get()).await, 0);
    assert_eq!(
      count(&f, "SELECT COUNT(*) FROM activities WHERE kind = 'created_reply' AND subject_id = ?1", r.id.get()).await,
      0
    );
  }
  assert_eq!(count(&f, "SELECT COUNT(*) FROM subscriptions WHERE thread_id = ?1", doomed.id.get()).await, 0);
  assert_eq!(
    count(&f, "SELECT COUNT(*) FROM activities WHERE kind = 'created_thread' AND subject_id = ?1", doomed.id.get()).await,
    0
  );

  // The other thread is untouched.
  let kept = f.get_thread(survivor.id).await.unwrap();
  assert_eq!(kept.replies_count, 1);
  assert!(f.store().get_reply(kept_reply.id).await.unwrap().is_some());
  assert!(f.is_subscribed(survivor.id, carol.id).await.unwrap());
  assert!(f.is_subscribed(survivor.id, alice.id).await.unwrap());
  assert_eq!(f.notifications(carol.id, false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn deletes_pending_outbox_entries_of_its_replies() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  user(&f, "bob").await;
  let general = channel(&f, "general").await;
  let t = thread(&f, &alice, &general, "Hello").await;

  f.create_reply(t.id, alice.id, "@bob").await.unwrap();
  assert_eq!(f.store().pending_dispatches(10).await.unwrap().len(), 1);

  f.delete_thread(t.id, alice.id).await.unwrap();
  assert!(f.store().pending_dispatches(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn failing_cascade_step_rolls_everything_back() {
  let f = forum().await;
  let alice = user(&f, "alice").await;
  let bob = user(&f, "bob").await;
  let general = channel(&f, "general").await;
  let t = thread(&f, &alice, &general, "Hello").await;
  let r1 = f.create_reply(t.id, bob.id, "one").await.unwrap();
  let r2 = f.create_reply(t.id, bob.id, "two").await.unwrap();
  f.subscribe(t.id, bob.id).await.unwrap();

  // Replies are destroyed before subscriptions, so this fires mid-cascade.
  f.store()
    .conn
    .call(|conn| {
      conn.execute_batch(
        "CREATE TRIGGER refuse_unsubscribe BEFORE DELETE ON subscriptions
         BEGIN SELECT RAISE(ABORT, 'storage refused'); END;",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let err = f.delete_thread(t.id, alice.id).await.unwrap_err();
  assert!(matches!(err, Error::Store(_)));

  assert!(f.get_thread(t.id).await.is_ok());
  assert!(f.store().get_reply(r1.id).await.unwrap().is_some());
  assert!(f.store().get_reply(r2.id).await.unwrap().is_some());
  assert!(f.is_subscribed(t.id, bob.id).await.unwrap());
  assert_eq!(
    count(&f, "SELECT COUNT(*) FROM activities WHERE kind = 'created_reply' AND user_id = ?1", bob.id.get()).await,
    2
  );
}

#[tokio::test]
async fn get_user_by_id() {
  let f = forum().await;
  assert!(f.store().get_user(UserId(1)).await.unwrap().is_none());
  let bob = user(&f, "bob").await;
  assert_eq!(f.user(bob.id).await.unwrap().name, "bob");
}
