//! HTTP API handlers for candor

pub mod health;
pub mod sessions;
pub mod ws;

pub use health::health_routes;
pub use sessions::session_routes;
pub use ws::session_socket;
