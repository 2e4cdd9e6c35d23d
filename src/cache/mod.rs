//! Response caching
//!
//! This module provides an in-memory TTL store and the two ways it is put in
//! front of slow work: a generic read-through wrapper for async operations
//! (`with_cache`) and an axum middleware for whole HTTP routes
//! (`cache_response`). Only successful outcomes are stored, and entries are
//! never served past their TTL.

mod clock;
mod key;
mod middleware;
mod store;
mod wrapper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::CacheKey;
pub use middleware::{cache_response, RouteCache, CACHE_STATUS_HEADER};
pub use store::TtlStore;
pub use wrapper::{with_cache, BoxedOperation, CachedHandler, Outcome, OutcomeStatus, Served};
