//! Volatile TTL cache for weather responses.
//!
//! The cache is an optimization, never a correctness dependency: every
//! operation is total. A backing-store problem degrades to a miss on read
//! and a logged no-op on write, so callers need no error handling around
//! cache access.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod memory;
pub mod store;

pub use memory::MemoryCache;
pub use store::Cache;
