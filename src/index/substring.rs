use super::{
    radix::{Keys, Tree, Writer},
    SearchIndex,
};

use parking_lot::RwLock;
use std::{
    collections::HashSet,
    iter::FusedIterator,
    sync::Arc,
    vec,
};

/// The keys sharing one suffix.
///
/// A member set is shared by every version of the suffix tree and only ever
/// grows, so adding a key to an existing suffix does not copy the tree.
#[derive(Clone, Default)]
struct Members(Arc<RwLock<HashSet<Arc<str>>>>);

impl Members {
    fn of(key: &Arc<str>) -> Self {
        let members = Self::default();
        members.add(key);
        members
    }

    fn add(&self, key: &Arc<str>) {
        let is_known = self.0.read().contains(key);
        if !is_known {
            self.0.write().insert(Arc::clone(key));
        }
    }

    fn to_vec(&self) -> Vec<Arc<str>> {
        self.0.read().iter().cloned().collect()
    }
}

/// A suffix tree index answering contains and ends-with queries.
///
/// Every suffix of every key is stored in a radix tree, together with the set
/// of keys it belongs to. Each key also maps to a payload of type `V`;
/// inserting a key again replaces its payload.
///
/// # Examples
///
/// ```rust
/// use lexicache::index::SubstringIndex;
///
/// let index = SubstringIndex::new();
/// for word in ["banana", "bandana", "cabana"] {
///     index.insert(word, ());
/// }
///
/// let mut with_ana = index.keys_containing("ana").collect::<Vec<_>>();
/// with_ana.sort();
/// assert_eq!(with_ana, vec!["banana", "bandana", "cabana"]);
///
/// let with_dana = index.keys_ending_with("dana").collect::<Vec<_>>();
/// assert_eq!(with_dana, vec!["bandana"]);
/// ```
pub struct SubstringIndex<V = ()> {
    suffixes: Tree<Members>,
    values: Tree<V>,
}

impl<V> Default for SubstringIndex<V> {
    fn default() -> Self {
        Self {
            suffixes: Tree::default(),
            values: Tree::default(),
        }
    }
}

impl<V> SubstringIndex<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a lazy iterator over the keys containing `fragment`.
    ///
    /// This is *inclusive*: a key equal to `fragment` is also returned. An empty
    /// fragment matches every key.
    pub fn keys_containing(&self, fragment: &str) -> Matches<V> {
        if fragment.is_empty() {
            return Matches::all(self.values.keys_starting_with(""));
        }
        Matches::containing(self.suffixes.keys_starting_with(fragment))
    }

    /// Returns a lazy iterator over the keys ending with `suffix`.
    ///
    /// This is *inclusive*: a key equal to `suffix` is also returned. An empty
    /// suffix matches every key.
    pub fn keys_ending_with(&self, suffix: &str) -> Matches<V> {
        if suffix.is_empty() {
            return Matches::all(self.values.keys_starting_with(""));
        }
        let members = self
            .suffixes
            .get(suffix)
            .map(|m| m.to_vec())
            .unwrap_or_default();
        Matches::members(members)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn key_count(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_count() == 0
    }
}

impl<V: Clone> SubstringIndex<V> {
    /// Returns a clone of the payload of `key`.
    pub fn get(&self, key: &str) -> Option<V> {
        self.values.get(key)
    }

    /// Inserts `key`, replacing its payload if it is already present.
    ///
    /// Inserting a key twice does not make it show up twice in query results.
    pub fn insert(&self, key: &str, value: V) {
        self.insert_all(std::iter::once((key, value)));
    }

    fn insert_all<'a, I>(&self, entries: I)
    where
        I: IntoIterator<Item = (&'a str, V)>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (Arc::<str>::from(key), value))
            .collect::<Vec<_>>();

        // Suffixes go first so a key is searchable by the time `contains_key`
        // reports it.
        self.suffixes.write(|w| {
            for (key, _) in &entries {
                add_suffixes(w, key);
            }
        });
        self.values.write(|w| {
            for (key, value) in entries {
                w.upsert(&key, |_| Some(value));
            }
        });
    }
}

fn add_suffixes(w: &mut Writer<Members>, key: &Arc<str>) {
    for (i, _) in key.char_indices() {
        w.upsert(&key[i..], |members| match members {
            Some(members) => {
                members.add(key);
                None
            }
            None => Some(Members::of(key)),
        });
    }
}

impl<V> SearchIndex for SubstringIndex<V>
where
    V: Clone + Default + Send + Sync + 'static,
{
    fn insert_keys<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.insert_all(keys.into_iter().map(|key| (key, V::default())));
    }

    fn key_count(&self) -> usize {
        self.values.len()
    }
}

/// A lazy iterator over the keys matched by a [`SubstringIndex`] query.
///
/// Every key is yielded at most once.
pub struct Matches<V = ()> {
    inner: MatchesInner<V>,
}

enum MatchesInner<V> {
    All(Keys<V>),
    Containing {
        suffixes: Keys<Members>,
        pending: vec::IntoIter<Arc<str>>,
        seen: HashSet<Arc<str>>,
    },
    Members(vec::IntoIter<Arc<str>>),
}

impl<V> Matches<V> {
    fn all(keys: Keys<V>) -> Self {
        Self {
            inner: MatchesInner::All(keys),
        }
    }

    fn containing(suffixes: Keys<Members>) -> Self {
        Self {
            inner: MatchesInner::Containing {
                suffixes,
                pending: Vec::new().into_iter(),
                seen: HashSet::new(),
            },
        }
    }

    fn members(members: Vec<Arc<str>>) -> Self {
        Self {
            inner: MatchesInner::Members(members.into_iter()),
        }
    }
}

impl<V> Iterator for Matches<V> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            MatchesInner::All(keys) => keys.next(),
            MatchesInner::Members(members) => members.next().map(|key| key.to_string()),
            MatchesInner::Containing {
                suffixes,
                pending,
                seen,
            } => loop {
                if let Some(key) = pending.next() {
                    if seen.insert(Arc::clone(&key)) {
                        return Some(key.to_string());
                    }
                    continue;
                }
                let (node, _suffix) = suffixes.next_node()?;
                *pending = node.value().map(Members::to_vec).unwrap_or_default().into_iter();
            },
        }
    }
}

impl<V> FusedIterator for Matches<V> {}

#[cfg(test)]
mod tests {
    use super::{SearchIndex, SubstringIndex};

    const DATA: [&str; 6] = ["a", "aa", "aaa", "ab", "abb", "abbb"];

    fn sorted<I: Iterator<Item = String>>(keys: I) -> Vec<String> {
        let mut keys = keys.collect::<Vec<_>>();
        keys.sort();
        keys
    }

    #[test]
    fn containing_and_ending_with() {
        let index = SubstringIndex::<()>::new();
        index.insert_keys(DATA);

        assert_eq!(sorted(index.keys_containing("a")), DATA);
        assert_eq!(
            sorted(index.keys_containing("b")),
            vec!["ab", "abb", "abbb"]
        );
        assert_eq!(sorted(index.keys_containing("bb")), vec!["abb", "abbb"]);
        assert_eq!(
            sorted(index.keys_ending_with("b")),
            vec!["ab", "abb", "abbb"]
        );
        assert_eq!(sorted(index.keys_ending_with("aa")), vec!["aa", "aaa"]);
        assert_eq!(index.keys_containing("c").count(), 0);
        assert_eq!(index.keys_ending_with("ba").count(), 0);
    }

    #[test]
    fn matches_are_inclusive() {
        let index = SubstringIndex::<()>::new();
        index.insert_keys(DATA);

        for key in DATA {
            assert!(index.keys_containing(key).any(|k| k == key));
            assert!(index.keys_ending_with(key).any(|k| k == key));
        }
    }

    #[test]
    fn empty_fragment_matches_everything() {
        let index = SubstringIndex::<()>::new();
        index.insert_keys(DATA);
        assert_eq!(sorted(index.keys_containing("")), DATA);
        assert_eq!(sorted(index.keys_ending_with("")), DATA);
    }

    #[test]
    fn duplicates_are_tolerated() {
        let index = SubstringIndex::<()>::new();
        index.insert_keys(["banana", "banana"]);
        index.insert_keys(["banana"]);

        assert_eq!(index.key_count(), 1);
        // "ana" occurs twice in "banana" and the key was inserted three times.
        assert_eq!(sorted(index.keys_containing("ana")), vec!["banana"]);
        assert_eq!(sorted(index.keys_containing("a")), vec!["banana"]);
        assert_eq!(sorted(index.keys_ending_with("na")), vec!["banana"]);
    }

    #[test]
    fn insert_replaces_the_payload() {
        let index = SubstringIndex::new();
        index.insert("key", 1);
        index.insert("key", 2);
        assert_eq!(index.get("key"), Some(2));
        assert_eq!(index.key_count(), 1);
        assert!(index.contains_key("key"));
        assert!(!index.contains_key("ke"));
    }

    #[test]
    fn unicode_keys() {
        let index = SubstringIndex::<()>::new();
        index.insert_keys(["café", "décor", "naïve"]);
        assert_eq!(sorted(index.keys_containing("é")), vec!["café", "décor"]);
        assert_eq!(sorted(index.keys_ending_with("ïve")), vec!["naïve"]);
    }

    #[test]
    fn queries_started_before_an_insert() {
        let index = SubstringIndex::<()>::new();
        index.insert_keys(["one"]);
        let before = index.keys_containing("o");
        index.insert_keys(["two"]);

        // The suffix tree version is fixed when the query starts.
        assert_eq!(sorted(before), vec!["one"]);
        assert_eq!(sorted(index.keys_containing("o")), vec!["one", "two"]);
    }
}
