use axum::{
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use super::auth;
use super::handlers;
use super::state::AppState;
use crate::cache::{cache_response, RouteCache};

/// Backend routes served through the response cache: (path, namespace, ttl seconds)
pub const CACHED_ROUTES: &[(&str, &str, u64)] = &[
    ("/api/articles", "articles-list", 300),
    ("/api/articles/{id}", "article", 300),
    ("/api/locations", "locations-list", 3600),
    ("/api/locations/{location_id}/articles", "location-articles", 300),
    ("/api/polls", "polls-list", 300),
    ("/api/polls/{id}", "poll", 300),
    ("/api/polls/{id}/detailed-results", "detailed-poll-results", 60),
];

/// Build and configure the application router
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Market quotes
        .route("/api/crypto", get(handlers::crypto_markets))
        .route(
            "/api/stock",
            get(handlers::stock_quote).post(handlers::clean_stock_cache),
        );

    // Cached pass-through to the news backend
    for &(path, namespace, ttl_seconds) in CACHED_ROUTES {
        let route_cache = RouteCache::new(state.store.clone(), namespace, ttl_seconds);
        router = router.route(
            path,
            get(handlers::forward_to_backend).layer(from_fn_with_state(route_cache, cache_response)),
        );
    }

    // Admin routes
    let admin = Router::new()
        .route(
            "/admin/cache",
            get(handlers::cache_stats).delete(handlers::clear_cache),
        )
        .route_layer(from_fn_with_state(state.clone(), auth::require_admin_token));

    router
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
