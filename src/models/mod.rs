//! Request and Response models for the server API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::RenameRequest;
pub use responses::{
    AuthStatusResponse, CacheStatsResponse, ErrorResponse, FilesResponse, HealthResponse,
    LogoutResponse, MessageResponse, RenameResponse, UploadResponse, UserProfile,
};
