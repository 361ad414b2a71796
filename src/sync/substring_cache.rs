use super::CacheBuilder;
use crate::{
    common::base_cache::BaseCache,
    index::{Matches, SubstringIndex},
    Merge,
};

use std::{fmt, marker::PhantomData, sync::Arc};

/// A thread-safe cache of keys answering contains and ends-with queries,
/// refreshed in the background from a set of sources.
///
/// Apart from its queries, a `SubstringCache` behaves like a
/// [`PrefixCache`][prefix-cache]: it is built by a [`CacheBuilder`][builder-struct],
/// is a cheap handle to clone across threads and is terminated explicitly or
/// when its last handle is dropped.
///
/// [prefix-cache]: ./struct.PrefixCache.html
/// [builder-struct]: ./struct.CacheBuilder.html
///
/// # Examples
///
/// ```rust
/// use lexicache::{invalidator::DefaultInvalidator, sync::SubstringCache, Merge};
///
/// let cache = SubstringCache::builder()
///     .invalidator(DefaultInvalidator::new())
///     .source(|| Ok::<_, std::io::Error>(vec!["banana", "bandana"]))
///     .build()
///     .expect("Failed to build the cache");
///
/// // Elements can also be merged by hand.
/// cache.merge(vec!["cabana"]);
///
/// let mut with_bana = cache.containing("bana").collect::<Vec<_>>();
/// with_bana.sort();
/// assert!(with_bana.contains(&"cabana".to_string()));
///
/// cache.terminate();
/// ```
pub struct SubstringCache<U> {
    base: Arc<BaseCache<SubstringIndex>>,
    element_type: PhantomData<fn(U)>,
}

impl<U> Clone for SubstringCache<U> {
    fn clone(&self) -> Self {
        Self {
            base: Arc::clone(&self.base),
            element_type: PhantomData::default(),
        }
    }
}

impl<U> fmt::Debug for SubstringCache<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubstringCache")
            .field("name", &self.name())
            .field("key_count", &self.key_count())
            .field("is_terminated", &self.is_terminated())
            .finish()
    }
}

impl<U> SubstringCache<U> {
    /// Returns a [`CacheBuilder`][builder-struct] switched to building a
    /// `SubstringCache`.
    ///
    /// [builder-struct]: ./struct.CacheBuilder.html
    pub fn builder() -> CacheBuilder<U, SubstringCache<U>> {
        CacheBuilder::new().substring()
    }

    pub(crate) fn from_base(base: Arc<BaseCache<SubstringIndex>>) -> Self {
        Self {
            base,
            element_type: PhantomData::default(),
        }
    }

    /// Returns a lazy iterator over the keys containing `fragment`, each
    /// yielded once. An empty fragment matches every key.
    pub fn containing(&self, fragment: &str) -> Matches {
        self.base.index().keys_containing(fragment)
    }

    /// Returns a lazy iterator over the keys ending with `suffix`, each yielded
    /// once. An empty suffix matches every key.
    pub fn ending_with(&self, suffix: &str) -> Matches {
        self.base.index().keys_ending_with(suffix)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.base.index().contains_key(key)
    }

    pub fn key_count(&self) -> usize {
        self.base.index().key_count()
    }

    pub fn index(&self) -> &SubstringIndex {
        self.base.index()
    }

    pub fn name(&self) -> Option<&str> {
        self.base.name()
    }

    /// See [`PrefixCache::terminate`](./struct.PrefixCache.html#method.terminate).
    pub fn terminate(&self) {
        self.base.terminate()
    }

    pub fn is_terminated(&self) -> bool {
        self.base.is_terminated()
    }
}

impl<U> Merge<U> for SubstringCache<U>
where
    U: AsRef<str>,
{
    fn merge(&self, elements: Vec<U>) {
        self.base.merge(elements)
    }
}

#[cfg(test)]
mod tests {
    use super::SubstringCache;
    use crate::{invalidator::DefaultInvalidator, Merge};

    use std::time::Duration;

    #[test]
    fn queries() {
        let cache = SubstringCache::<String>::builder()
            .invalidator(DefaultInvalidator::with_timeout(Duration::from_secs(3600)))
            .source(|| Ok::<_, std::io::Error>(Vec::new()))
            .build()
            .expect("Failed to build");

        let words = ["a", "aa", "aaa", "ab", "abb", "abbb"];
        cache.merge(words.iter().map(|w| w.to_string()).collect());
        // Merging the same keys again adds nothing.
        cache.merge(words.iter().map(|w| w.to_string()).collect());
        assert_eq!(cache.key_count(), 6);

        let mut bb = cache.containing("bb").collect::<Vec<_>>();
        bb.sort();
        assert_eq!(bb, vec!["abb", "abbb"]);

        let mut ending_with_b = cache.ending_with("b").collect::<Vec<_>>();
        ending_with_b.sort();
        assert_eq!(ending_with_b, vec!["ab", "abb", "abbb"]);

        assert_eq!(cache.containing("").count(), 6);
        assert_eq!(cache.ending_with("ba").count(), 0);
        assert!(cache.name().is_none());

        cache.terminate();
        assert!(cache.is_terminated());
        assert_eq!(cache.containing("a").count(), 6);
    }
}
