//! Client Module
//!
//! The browser-side half of the file manager: a second TTL cache in front
//! of the server HTTP API, with a badge publishing its size.
//!
//! # TTLs
//! - auth status: 5 minutes
//! - file listing: 1 minute
//! - anything else: 2 minutes

mod api;
mod error;
mod indicator;
mod manager;

pub use api::{FilesPage, HttpServerApi, ServerApi};
pub use error::{ClientError, ClientResult};
pub use indicator::{CacheIndicator, IndicatorState};
pub use manager::{ClientCacheValue, FileManager, FilesSnapshot, FilesSource, FilesView};
