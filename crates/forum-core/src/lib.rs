//! Core types and trait definitions for the forum.
//!
//! This crate has no HTTP or database dependencies. The thread aggregate, the
//! deletion cascade and the mention dispatcher live here as plain control flow
//! over the [`store::ForumStore`] abstraction.

pub mod cascade;
pub mod error;
pub mod id;
pub mod mention;
pub mod model;
pub mod notify;
pub mod policy;
pub mod service;
pub mod store;
pub mod thread;

pub use error::{Error, FieldError, Resource, Result};
