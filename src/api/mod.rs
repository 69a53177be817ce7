pub mod middleware;
pub mod routes;

// Re-export public types and functions
pub use middleware::log_request_errors;
pub use routes::{health, serve_preview, serve_thumbnail, serve_video};
