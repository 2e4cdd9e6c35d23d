//! HTTP surface
//!
//! An axum router exposing the cached quote endpoints, the cached
//! pass-through routes to the news backend, and the cache admin routes.

mod auth;
pub mod handlers;
mod routes;
mod state;

pub use routes::{build_router, CACHED_ROUTES};
pub use state::AppState;
