//! Provides thread-safe caches refreshed in the background.

mod builder;
mod prefix_cache;
mod substring_cache;

pub use {
    builder::CacheBuilder, prefix_cache::PrefixCache, substring_cache::SubstringCache,
};
