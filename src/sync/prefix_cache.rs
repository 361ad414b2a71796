use super::CacheBuilder;
use crate::{
    common::base_cache::BaseCache,
    index::{Keys, PrefixIndex},
    Merge,
};

use std::{fmt, marker::PhantomData, sync::Arc};

/// A thread-safe cache of keys answering closest-match and starts-with
/// queries, refreshed in the background from a set of sources.
///
/// A `PrefixCache` is created by a [`CacheBuilder`][builder-struct], which also
/// schedules its invalidator. From then on every refresh cycle merges the
/// elements `U` produced by the sources, seen as text through `AsRef<str>`.
/// Keys are only ever added.
///
/// Queries never wait for a merge in progress, and may run on any number of
/// threads. `PrefixCache` is a cheap handle: clone it to share the cache
/// across threads.
///
/// The cache is terminated by [`terminate`](#method.terminate), or when its last
/// handle is dropped. Terminating closes the invalidator first and then the other
/// resources the cache owns. A terminated cache is no longer refreshed but
/// can still be queried.
///
/// [builder-struct]: ./struct.CacheBuilder.html
///
/// # Examples
///
/// ```rust
/// use lexicache::{invalidator::DefaultInvalidator, sync::PrefixCache};
///
/// use std::{thread, time::Duration};
///
/// let cache = PrefixCache::builder()
///     .invalidator(DefaultInvalidator::with_timeout(Duration::from_millis(100)))
///     .source(|| Ok::<_, std::io::Error>(vec!["Ford Focus", "Ford Mondeo", "BMW M3"]))
///     .build()
///     .expect("Failed to build the cache");
///
/// let readers = (0..4)
///     .map(|_| {
///         let cache = cache.clone();
///         thread::spawn(move || {
///             while cache.key_count() < 3 {
///                 thread::sleep(Duration::from_millis(10));
///             }
///             let mut closest = cache.closest("Ford Ka").collect::<Vec<_>>();
///             closest.sort();
///             assert_eq!(closest, vec!["Ford Focus", "Ford Mondeo"]);
///         })
///     })
///     .collect::<Vec<_>>();
///
/// readers.into_iter().for_each(|t| t.join().expect("Failed"));
/// cache.terminate();
/// ```
pub struct PrefixCache<U> {
    base: Arc<BaseCache<PrefixIndex>>,
    element_type: PhantomData<fn(U)>,
}

impl<U> Clone for PrefixCache<U> {
    /// Makes a clone of this shared cache.
    ///
    /// This operation is cheap as it only creates a thread-safe reference
    /// counted pointer to the shared internal data structures.
    fn clone(&self) -> Self {
        Self {
            base: Arc::clone(&self.base),
            element_type: PhantomData::default(),
        }
    }
}

impl<U> fmt::Debug for PrefixCache<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefixCache")
            .field("name", &self.name())
            .field("key_count", &self.key_count())
            .field("is_terminated", &self.is_terminated())
            .finish()
    }
}

impl<U> PrefixCache<U> {
    /// Returns a [`CacheBuilder`][builder-struct], which can build a
    /// `PrefixCache` with an invalidator and sources.
    ///
    /// [builder-struct]: ./struct.CacheBuilder.html
    pub fn builder() -> CacheBuilder<U, PrefixCache<U>> {
        CacheBuilder::default()
    }

    pub(crate) fn from_base(base: Arc<BaseCache<PrefixIndex>>) -> Self {
        Self {
            base,
            element_type: PhantomData::default(),
        }
    }

    /// Returns a lazy iterator over the keys closest to `candidate`: the keys
    /// sharing the longest prefix with it, `candidate` itself included.
    ///
    /// Returns nothing when no key starts with the first char of `candidate`.
    /// See [`PrefixIndex::closest_keys`][closest-keys].
    ///
    /// [closest-keys]: ../index/struct.PrefixIndex.html#method.closest_keys
    pub fn closest(&self, candidate: &str) -> Keys {
        self.base.index().closest_keys(candidate)
    }

    /// Returns a lazy iterator over the keys starting with `prefix`, `prefix`
    /// itself included.
    pub fn starting_with(&self, prefix: &str) -> Keys {
        self.base.index().keys_starting_with(prefix)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.base.index().contains_key(key)
    }

    /// Returns the number of distinct keys merged so far.
    pub fn key_count(&self) -> usize {
        self.base.index().key_count()
    }

    /// Returns a read-only reference to the underlying index.
    pub fn index(&self) -> &PrefixIndex {
        self.base.index()
    }

    pub fn name(&self) -> Option<&str> {
        self.base.name()
    }

    /// Closes the invalidator and the other resources owned by the cache, in
    /// the order they were registered. Does not wait for a refresh cycle in
    /// progress, whose elements are discarded.
    ///
    /// Resources failing to close are reported and do not stop the others
    /// from being closed. Calling this method again does nothing.
    pub fn terminate(&self) {
        self.base.terminate()
    }

    pub fn is_terminated(&self) -> bool {
        self.base.is_terminated()
    }
}

impl<U> Merge<U> for PrefixCache<U>
where
    U: AsRef<str>,
{
    /// Merges `elements` right away, outside of any refresh cycle.
    fn merge(&self, elements: Vec<U>) {
        self.base.merge(elements)
    }
}
