//! Persistence layer: users, feeds, feed follows, and posts on SQLite.
//!
//! The scheduler touches this layer only through the [`crate::ingest`] store
//! seams; the user-facing CRUD surface calls the inherent methods directly.

mod feeds;
mod posts;
mod schema;
mod types;
mod users;

pub use schema::Database;
pub use types::{CandidatePost, Feed, FeedFollow, Post, StoreError, User};
