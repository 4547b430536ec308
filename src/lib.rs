//! Windfile - a Google Drive file manager with a dual-layer TTL cache
//!
//! The server caches Drive reads per principal and invalidates them after
//! every mutation; the client keeps its own short-lived cache of the
//! server's answers.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod drive;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{CacheKey, Principal, SharedCache, TtlCache};
pub use client::{FileManager, HttpServerApi};
pub use config::{ClientConfig, Config};
pub use tasks::{spawn_cleanup_task, CleanupTask};
