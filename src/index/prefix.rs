use super::{
    radix::{Keys, Tree},
    SearchIndex,
};

/// A radix tree index answering closest-match and starts-with queries.
///
/// Each key maps to a payload of type `V`. The first payload inserted for a key
/// wins; later inserts of the same key are no-ops.
///
/// # Examples
///
/// ```rust
/// use lexicache::index::PrefixIndex;
///
/// let index = PrefixIndex::new();
/// index.insert_if_absent("Ford Focus", 1);
/// index.insert_if_absent("Ford Mondeo", 2);
/// index.insert_if_absent("BMW M3", 3);
///
/// let mut fords = index.keys_starting_with("Ford").collect::<Vec<_>>();
/// fords.sort();
/// assert_eq!(fords, vec!["Ford Focus", "Ford Mondeo"]);
///
/// assert_eq!(index.insert_if_absent("BMW M3", 4), Some(3));
/// assert_eq!(index.get("BMW M3"), Some(3));
/// ```
pub struct PrefixIndex<V = ()> {
    tree: Tree<V>,
}

impl<V> Default for PrefixIndex<V> {
    fn default() -> Self {
        Self {
            tree: Tree::default(),
        }
    }
}

impl<V> PrefixIndex<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a lazy iterator over the keys which most closely match
    /// `candidate`.
    ///
    /// The candidate is walked down the tree as far as it matches, and every
    /// key below the point where it stopped is returned. This is *inclusive*:
    /// an exact match for `candidate` is also returned. If not even the first
    /// char of `candidate` matches, the iterator is empty.
    ///
    /// For example, with `Ford Focus`, `Ford Mondeo` and `BMW M3` in the index,
    /// `closest_keys("Ford Ka")` returns `Ford Focus` and `Ford Mondeo`.
    pub fn closest_keys(&self, candidate: &str) -> Keys<V> {
        self.tree.closest_keys(candidate)
    }

    /// Returns a lazy iterator over the keys starting with `prefix`, inclusive.
    pub fn keys_starting_with(&self, prefix: &str) -> Keys<V> {
        self.tree.keys_starting_with(prefix)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.tree.contains_key(key)
    }

    pub fn key_count(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_count() == 0
    }
}

impl<V: Clone> PrefixIndex<V> {
    /// Returns a clone of the payload of `key`.
    pub fn get(&self, key: &str) -> Option<V> {
        self.tree.get(key)
    }

    /// Inserts `key` unless it is already present.
    ///
    /// Returns the payload already stored for `key`, or `None` if `value` was
    /// inserted.
    pub fn insert_if_absent(&self, key: &str, value: V) -> Option<V> {
        if let Some(existing) = self.get(key) {
            return Some(existing);
        }

        let mut existing = None;
        self.tree.write(|w| {
            w.upsert(key, |current| match current {
                Some(v) => {
                    existing = Some(v.clone());
                    None
                }
                None => Some(value),
            })
        });
        existing
    }
}

impl<V> SearchIndex for PrefixIndex<V>
where
    V: Clone + Default + Send + Sync + 'static,
{
    fn insert_keys<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.tree.write(|w| {
            for key in keys {
                w.upsert(key, |current| match current {
                    Some(_) => None,
                    None => Some(V::default()),
                });
            }
        });
    }

    fn key_count(&self) -> usize {
        self.tree.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{PrefixIndex, SearchIndex};

    const DATA: [&str; 6] = ["a", "aa", "aaa", "ab", "abb", "abbb"];

    #[test]
    fn exact_match_is_inclusive() {
        let index = PrefixIndex::<()>::new();
        index.insert_keys(DATA);

        for key in DATA {
            assert!(
                index.closest_keys(key).any(|k| k == key),
                "closest_keys({key:?}) misses {key:?}"
            );
            assert!(
                index.keys_starting_with(key).any(|k| k == key),
                "keys_starting_with({key:?}) misses {key:?}"
            );
        }
    }

    #[test]
    fn insert_if_absent_keeps_the_first_payload() {
        let index = PrefixIndex::new();
        assert_eq!(index.insert_if_absent("key", 1), None);
        assert_eq!(index.insert_if_absent("key", 2), Some(1));
        assert_eq!(index.get("key"), Some(1));
        assert_eq!(index.key_count(), 1);
    }

    #[test]
    fn merging_twice_adds_no_duplicates() {
        let index = PrefixIndex::<()>::new();
        index.insert_keys(DATA);
        let mut first = index.keys_starting_with("a").collect::<Vec<_>>();

        index.insert_keys(DATA);
        let mut second = index.keys_starting_with("a").collect::<Vec<_>>();

        first.sort();
        second.sort();
        assert_eq!(first.len(), DATA.len());
        assert_eq!(first, second);
        assert_eq!(index.key_count(), DATA.len());
    }

    #[test]
    fn empty_index() {
        let index = PrefixIndex::<u32>::new();
        assert!(index.is_empty());
        assert_eq!(index.closest_keys("a").count(), 0);
        assert_eq!(index.keys_starting_with("").count(), 0);
        assert_eq!(index.get("a"), None);
    }
}
