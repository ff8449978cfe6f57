//! Club Cache - client-side caching and invalidation for a school club manager
//!
//! Provides a TTL/LRU store, per-entity cache facades, and invalidation that
//! stays consistent across execution contexts through a shared signal bus.

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod invalidation;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheKey, CacheStore, SharedStore};
pub use config::Config;
pub use context::CacheContext;
pub use domain::DomainCache;
pub use error::{CacheError, Result};
pub use invalidation::{ChangeType, DataType, InvalidationBus, InvalidationManager, KeyGroup};
