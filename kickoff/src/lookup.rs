//! Bidirectional mapping between items and dense indices, used to lay out per-item parameters
//! in a flat vector.

use std::hash::Hash;
use std::ops::Index;

use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct Lookup<T: Eq + Hash> {
    item_to_index: FxHashMap<T, usize>,
    index_to_item: Vec<T>,
}
impl<T: Eq + Hash> Lookup<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            item_to_index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            index_to_item: Vec::with_capacity(capacity),
        }
    }

    /// Appends `item` if absent, returning its index either way.
    pub fn insert(&mut self, item: T) -> usize
    where
        T: Clone,
    {
        if let Some(&index) = self.item_to_index.get(&item) {
            return index;
        }
        let index = self.index_to_item.len();
        self.item_to_index.insert(item.clone(), index);
        self.index_to_item.push(item);
        index
    }

    pub fn item_at(&self, index: usize) -> Option<&T> {
        self.index_to_item.get(index)
    }

    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.item_to_index.get(item).copied()
    }

    pub fn len(&self) -> usize {
        self.index_to_item.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_to_item.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.index_to_item
    }
}

impl<T: Eq + Hash> Index<usize> for Lookup<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.item_at(index)
            .unwrap_or_else(|| panic!("no item at index {index}"))
    }
}

impl<T: Eq + Hash + Clone> FromIterator<T> for Lookup<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut lookup = Self::with_capacity(iter.size_hint().0);
        for item in iter {
            lookup.insert(item);
        }
        lookup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_resolve() {
        let mut lookup = Lookup::with_capacity(3);
        assert!(lookup.is_empty());
        assert_eq!(0, lookup.insert("zero"));
        assert_eq!(1, lookup.insert("one"));
        assert_eq!(0, lookup.insert("zero"));
        assert_eq!(2, lookup.len());

        assert_eq!(Some(&"zero"), lookup.item_at(0));
        assert_eq!(Some(0), lookup.index_of(&"zero"));
        assert_eq!(Some(&"one"), lookup.item_at(1));
        assert_eq!(Some(1), lookup.index_of(&"one"));
        assert_eq!(None, lookup.item_at(2));
        assert_eq!(None, lookup.index_of(&"two"));
    }

    #[test]
    fn from_iter_deduplicates() {
        let lookup: Lookup<_> = ["b", "a", "b", "c"].into_iter().collect();
        assert_eq!(&["b", "a", "c"], lookup.items());
        assert_eq!(Some(2), lookup.index_of(&"c"));
    }

    #[test]
    #[should_panic(expected = "no item at index 2")]
    fn no_item_at_index() {
        let lookup: Lookup<_> = ["zero", "one"].into_iter().collect();
        let _ = &lookup[2];
    }
}
