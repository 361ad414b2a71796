#![warn(clippy::all)]
#![warn(rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Lexicache is an in-memory text index kept fresh by pulling keys from
//! pluggable sources at a fixed rate.
//!
//! A cache is built with a [`CacheBuilder`][builder-struct] from an
//! [invalidator][invalidator-mod] and one or more [sources][source-mod]. On
//! every refresh cycle, the invalidator calls all the sources concurrently,
//! waits for them until a deadline shared by the whole cycle, and merges what
//! they returned into the cache. Failing or late sources are skipped and
//! [reported][report-mod] without affecting the others.
//!
//! Two caches are provided:
//!
//! - [`sync::PrefixCache`][prefix-cache] answers closest-match and starts-with
//!   queries, backed by a radix tree.
//! - [`sync::SubstringCache`][substring-cache] answers contains and ends-with
//!   queries, backed by a suffix tree.
//!
//! Queries may run on any number of threads, and never wait for a merge in
//! progress. Keys are only ever added: there is no eviction.
//!
//! [builder-struct]: ./sync/struct.CacheBuilder.html
//! [invalidator-mod]: ./invalidator/index.html
//! [source-mod]: ./source/index.html
//! [report-mod]: ./report/index.html
//! [prefix-cache]: ./sync/struct.PrefixCache.html
//! [substring-cache]: ./sync/struct.SubstringCache.html
//!
//! # Example
//!
//! ```rust
//! use lexicache::{invalidator::DefaultInvalidator, sync::SubstringCache};
//!
//! use std::{thread, time::Duration};
//!
//! fn cities() -> Result<Vec<String>, std::io::Error> {
//!     // This would typically read a file or call a remote service.
//!     Ok(vec!["Amsterdam".into(), "Rotterdam".into(), "Berlin".into()])
//! }
//!
//! let cache = SubstringCache::builder()
//!     .name("cities")
//!     .invalidator(DefaultInvalidator::with_timeout(Duration::from_millis(200)))
//!     .source(cities)
//!     .build()
//!     .expect("Failed to build the cache");
//!
//! // The first refresh cycle starts as soon as the cache is built.
//! while cache.key_count() < 3 {
//!     thread::sleep(Duration::from_millis(10));
//! }
//!
//! let mut dams = cache.ending_with("dam").collect::<Vec<_>>();
//! dams.sort();
//! assert_eq!(dams, vec!["Amsterdam", "Rotterdam"]);
//!
//! // Stops the refresh cycles. Dropping the last handle of the cache does the
//! // same.
//! cache.terminate();
//! ```
//!
//! # Logging
//!
//! With the `logging` feature, which is enabled by default, the default
//! [`LogReporter`][log-reporter] writes the skipped sources and the summary of
//! every refresh cycle through the [`log`][log-crate] crate.
//!
//! [log-reporter]: ./report/struct.LogReporter.html
//! [log-crate]: https://docs.rs/log
//!
//! # Minimum Supported Rust Version
//!
//! This crate requires Rust 1.65 or newer.

pub mod index;
pub mod invalidator;
pub mod report;
pub mod source;
pub mod sync;

mod cache;
pub(crate) mod common;

pub use cache::{Close, Merge};
pub use common::error::{BoxError, CloseError, ConfigError, ScheduleError, SourceError};
