//! # REST API Layer
//!
//! Axum router, handlers, and the boundary error/response shapes.

pub mod docs;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;

pub use response::ApiResponse;
pub use routes::{build_router, ApiState};
