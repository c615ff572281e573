//! Core types and shared functionality for peekbox.
//!
//! This crate provides:
//! - Thumbnail cache over a durable SQLite key-value store
//! - Unified error types
//! - Configuration structures
//! - Link classification, image registry, lightbox navigation and row grouping

pub mod cache;
pub mod classify;
pub mod config;
pub mod dom;
pub mod error;
pub mod grouping;
pub mod navigator;
pub mod post;
pub mod registry;

pub use cache::{CacheDb, CacheLookup, DurableStore, MissReason, Payload, ThumbnailCache};
pub use classify::{Classification, ClassifiedLink, InlineImage, LinkCandidate, ServiceTag, Strategy, classify};
pub use config::AppConfig;
pub use dom::{BoundingBox, ContainerKind, DescendantKind, PageDom};
pub use error::Error;
pub use grouping::{Group, group};
pub use navigator::{DisplaySize, LightboxState, LightboxView, LoadState, Navigator, Viewport};
pub use registry::{ImageRecord, Registry};
