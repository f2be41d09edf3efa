//! dexcache - client-side resource cache for a creature-database REST API
//!
//! This crate keeps fetched resources in memory keyed by
//! `(kind, identifier, params)`, collapses concurrent requests for the same
//! key into one upstream call, decides staleness per resource kind, retries
//! transient failures with backoff, and notifies subscribers whenever an
//! entry changes. Paginated collections are walked with cursor-driven
//! [`PageSequence`]s that reuse the same cache.
//!
//! # Cache Example
//!
//! ```rust,no_run
//! use dexcache::{CacheOptions, Params, ResourceCache, make_key};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> dexcache::Result<()> {
//!     let cache: ResourceCache<String> =
//!         ResourceCache::new(CacheOptions::new().max_age(Duration::from_secs(600)));
//!
//!     let key = make_key("pokemon", 25, Params::new())?;
//!     let _sub = cache.subscribe(key.clone(), |key, entry| {
//!         println!("{key} is now {:?}", entry.status());
//!     });
//!
//!     let name = cache
//!         .request(&key, || async { Ok("pikachu".to_string()) })
//!         .await?;
//!     println!("{name}");
//!     Ok(())
//! }
//! ```
//!
//! # API Example
//!
//! ```rust,no_run
//! use dexcache::api::Dex;
//!
//! #[tokio::main]
//! async fn main() -> dexcache::Result<()> {
//!     let dex = Dex::new()?;
//!     let mut pages = dex.type_pages("fire").await?;
//!     pages.load_pages(2).await?;
//!     println!("{} fire types loaded", pages.items().len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod compare;
pub mod config;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod key;
pub mod pagination;
pub mod persist;
pub mod retry;
pub mod telemetry;
pub mod version;

// Re-export main types at crate root
pub use cache::{
    CacheEntry, CacheOptions, EntryStore, FetchDeduplicator, FetchStatus, FreshnessPolicy,
    Notifier, RequestId, RequestOptions, ResourceCache, Subscription, is_fresh,
};
pub use compare::{CompareState, CompareStore, Slot};
pub use config::Config;
pub use debounce::Debouncer;
pub use error::{CacheError, Result};
pub use filter::{FilterState, FilterStore};
pub use key::{CacheKey, Identifier, Params, ResourceKind, make_key};
pub use pagination::{Cursor, Page, PageResult, PageSequence, PageSource, SequencePhase, SlicePageSource};
pub use persist::{BlobStore, FileBlobStore, MemoryBlobStore, QuizRecord};
pub use retry::{RetryConfig, with_retry};
