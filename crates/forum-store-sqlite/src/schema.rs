//! SQL schema for the forum SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.
//!
//! Foreign keys are enforced but none of them cascade: removing a parent
//! before its children fails, which is what keeps the thread deletion cascade
//! honest about its ordering.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,         -- argon2 PHC string
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS channels (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    slug       TEXT NOT NULL UNIQUE,
    name       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS threads (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER NOT NULL REFERENCES users(id),
    channel_id INTEGER NOT NULL REFERENCES channels(id),
    title      TEXT NOT NULL,
    body       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS replies (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    thread_id  INTEGER NOT NULL REFERENCES threads(id),
    user_id    INTEGER NOT NULL REFERENCES users(id),
    body       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- One row per (thread, user); the primary key is what makes subscribing
-- idempotent under concurrent duplicates.
CREATE TABLE IF NOT EXISTS subscriptions (
    thread_id  INTEGER NOT NULL REFERENCES threads(id),
    user_id    INTEGER NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL,
    PRIMARY KEY (thread_id, user_id)
);

CREATE TABLE IF NOT EXISTS notifications (
    id         TEXT PRIMARY KEY,         -- UUID v4
    user_id    INTEGER NOT NULL REFERENCES users(id),
    reply_id   INTEGER NOT NULL REFERENCES replies(id),
    thread_id  INTEGER NOT NULL REFERENCES threads(id),
    kind       TEXT NOT NULL,            -- 'mentioned'
    created_at TEXT NOT NULL,
    read_at    TEXT,
    UNIQUE (user_id, reply_id)
);

-- subject_id is a thread id or a reply id depending on kind, so it carries
-- no foreign key; owners remove their activity rows explicitly.
CREATE TABLE IF NOT EXISTS activities (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER NOT NULL REFERENCES users(id),
    kind       TEXT NOT NULL,            -- 'created_thread' | 'created_reply'
    subject_id INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

-- Replies whose mentions are still to be dispatched. Written in the same
-- transaction as the reply.
CREATE TABLE IF NOT EXISTS mention_outbox (
    reply_id    INTEGER PRIMARY KEY REFERENCES replies(id),
    enqueued_at TEXT NOT NULL,
    attempts    INTEGER NOT NULL DEFAULT 0,
    last_error  TEXT
);

CREATE INDEX IF NOT EXISTS threads_channel_idx     ON threads(channel_id);
CREATE INDEX IF NOT EXISTS threads_user_idx        ON threads(user_id);
CREATE INDEX IF NOT EXISTS threads_created_idx     ON threads(created_at);
CREATE INDEX IF NOT EXISTS replies_thread_idx      ON replies(thread_id);
CREATE INDEX IF NOT EXISTS notifications_user_idx  ON notifications(user_id);
CREATE INDEX IF NOT EXISTS notifications_reply_idx ON notifications(reply_id);
CREATE INDEX IF NOT EXISTS activities_subject_idx  ON activities(kind, subject_id);
CREATE INDEX IF NOT EXISTS activities_user_idx     ON activities(user_id);
CREATE INDEX IF NOT EXISTS mention_outbox_due_idx  ON mention_outbox(attempts, enqueued_at, reply_id);

PRAGMA user_version = 1;
";
