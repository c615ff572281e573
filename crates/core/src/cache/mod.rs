//! SQLite-backed thumbnail cache.
//!
//! This module provides a durable, URL-addressed cache using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - A namespaced key-value store behind the `DurableStore` trait
//! - Compact 32-bit rolling-hash keys (collisions are not resolved)
//! - A fixed 10 day TTL with lazy eviction and a startup sweep
//! - Schema creation on open and WAL mode

pub mod connection;
pub mod hash;
pub mod store;
pub mod thumbnails;

pub use crate::Error;

pub use connection::CacheDb;
pub use store::DurableStore;
pub use thumbnails::{CACHE_TTL, CacheEntry, CacheLookup, MissReason, Payload, ThumbnailCache};
