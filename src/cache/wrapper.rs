//! Read-through caching around an async operation
//!
//! `with_cache(store, key_fn, ttl, handler)` composes a handler with the
//! store: a live entry short-circuits the handler, otherwise the handler runs
//! and its payload is recorded only when the outcome is successful.

use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::future::Future;
use tracing::{debug, warn};

use super::key::CacheKey;
use super::store::TtlStore;

/// How a wrapped operation reports success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// HTTP-style status code; 200-299 is success
    Http(u16),
    /// Explicit success flag
    Flag(bool),
}

impl OutcomeStatus {
    pub fn is_success(&self) -> bool {
        match *self {
            OutcomeStatus::Http(code) => (200..300).contains(&code),
            OutcomeStatus::Flag(ok) => ok,
        }
    }
}

/// Payload produced by a wrapped operation, with its status
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub payload: T,
    pub status: OutcomeStatus,
}

impl<T> Outcome<T> {
    pub fn http(payload: T, status: u16) -> Self {
        Self {
            payload,
            status: OutcomeStatus::Http(status),
        }
    }

    pub fn flagged(payload: T, ok: bool) -> Self {
        Self {
            payload,
            status: OutcomeStatus::Flag(ok),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl Outcome<Value> {
    /// Judges a JSON body by the absence of a top-level `error` field
    pub fn from_json(payload: Value) -> Self {
        let ok = payload.get("error").is_none();
        Self::flagged(payload, ok)
    }
}

/// Result of a cached call
#[derive(Debug, Clone, PartialEq)]
pub enum Served<T> {
    /// Served from the store; the handler was not invoked
    Hit(T),
    /// The handler ran; its outcome is returned unmodified
    Miss(Outcome<T>),
}

impl<T> Served<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Served::Hit(_))
    }

    pub fn payload(&self) -> &T {
        match self {
            Served::Hit(payload) => payload,
            Served::Miss(outcome) => &outcome.payload,
        }
    }

    pub fn into_payload(self) -> T {
        match self {
            Served::Hit(payload) => payload,
            Served::Miss(outcome) => outcome.payload,
        }
    }
}

/// Boxed async operation, for storing cached handlers in shared state
pub type BoxedOperation<Req, T> = Box<dyn Fn(Req) -> BoxFuture<'static, Outcome<T>> + Send + Sync>;

/// An operation wrapped with a cache lookup
pub struct CachedHandler<K, H> {
    store: TtlStore,
    key_fn: K,
    ttl_seconds: u64,
    handler: H,
}

/// Wraps `handler` so identical requests within `ttl_seconds` are served from `store`
///
/// # Arguments
/// * `store` - Where payloads are kept
/// * `key_fn` - Derives the cache key from a request
/// * `ttl_seconds` - Lifetime of a stored payload
/// * `handler` - The operation to run on a miss
pub fn with_cache<K, H>(store: TtlStore, key_fn: K, ttl_seconds: u64, handler: H) -> CachedHandler<K, H> {
    CachedHandler {
        store,
        key_fn,
        ttl_seconds,
        handler,
    }
}

impl<K, H> CachedHandler<K, H> {
    pub fn store(&self) -> &TtlStore {
        &self.store
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Serves `request` from the store, or runs the handler and records a successful outcome
    pub async fn call<Req, T, Fut>(&self, request: Req) -> Served<T>
    where
        K: Fn(&Req) -> CacheKey,
        H: Fn(Req) -> Fut,
        Fut: Future<Output = Outcome<T>>,
        T: Serialize + DeserializeOwned,
    {
        let key = (self.key_fn)(&request);

        if let Some(stored) = self.store.get(key.as_str()) {
            match serde_json::from_value::<T>(stored) {
                Ok(payload) => {
                    debug!(key = %key, "cache hit");
                    return Served::Hit(payload);
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "stored payload has unexpected shape, treating as miss");
                }
            }
        }

        debug!(key = %key, "cache miss");
        let outcome = (self.handler)(request).await;

        if outcome.is_success() {
            match serde_json::to_value(&outcome.payload) {
                Ok(payload) => self.store.set(key.as_str(), payload, self.ttl_seconds),
                Err(err) => {
                    warn!(key = %key, error = %err, "failed to serialize payload, skipping cache write");
                }
            }
        } else {
            debug!(key = %key, status = ?outcome.status, "unsuccessful outcome not cached");
        }

        Served::Miss(outcome)
    }
}
