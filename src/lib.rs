//! tickerwire library
//!
//! Exposes the cache, data clients and HTTP router for the binary and for
//! integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod server;
pub mod sweep;
