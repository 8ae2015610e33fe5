//! Operational HTTP API: health, readiness, status, metrics.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
