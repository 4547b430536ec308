//! API Module
//!
//! HTTP handlers and routing for the server. Every Drive read goes through
//! the server cache; every Drive mutation invalidates it afterwards.
//!
//! # Endpoints
//! - `GET /api/auth/status` - Identity of the caller
//! - `POST /api/auth/login` / `POST /api/auth/logout` - Session boundaries
//! - `GET /api/files` - Folder listing
//! - `PUT|DELETE /api/files/:file_id` - Rename / delete
//! - `POST /upload` - Upload
//! - `GET /api/cache/stats`, `POST /api/cache/clear` - Cache debugging
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod invalidation;
pub mod routes;
pub mod session;
pub mod state;

pub use handlers::*;
pub use invalidation::Mutation;
pub use routes::create_router;
pub use session::Session;
pub use state::{AppState, ServerCacheValue};
