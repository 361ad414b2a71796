//! Concurrent text indexes backing the caches.
//!
//! Both indexes are safe to query from any number of threads while a single
//! writer is inserting. A query never waits for an insert to finish; it walks
//! the version of the index that was published when the query started.

mod prefix;
pub(crate) mod radix;
mod substring;

pub use {
    prefix::PrefixIndex,
    radix::Keys,
    substring::{Matches, SubstringIndex},
};

/// The write side of an index, used by a cache to merge the elements produced
/// by its sources.
pub trait SearchIndex: Send + Sync + 'static {
    /// Inserts every key with a default payload. Keys already present are
    /// tolerated and never show up twice in query results.
    ///
    /// All the keys are visible to queries started after this call returns.
    fn insert_keys<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a str>;

    /// Returns the number of distinct keys in the index.
    fn key_count(&self) -> usize;
}
