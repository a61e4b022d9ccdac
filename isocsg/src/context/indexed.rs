//! Strongly-typed index containers used by [`Context`](super::Context)
use std::collections::HashMap;

/// Trait for strongly-typed indexes into an [`IndexMap`] or [`IndexVec`]
pub trait Index: Copy + Clone {
    /// Builds a new index from a raw `usize`
    fn new(i: usize) -> Self;
    /// Returns the raw `usize`
    fn get(&self) -> usize;
}

macro_rules! define_index {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
        pub struct $name(pub(crate) usize);
        impl crate::context::indexed::Index for $name {
            fn new(i: usize) -> Self {
                Self(i)
            }
            fn get(&self) -> usize {
                self.0
            }
        }
    };
}
pub(crate) use define_index;

/// Stores a set of `(V, I)` tuples, with lookup in both directions.
///
/// Values are deduplicated on insertion; the index of a value never changes
/// until the map is cleared.
#[derive(Clone, Debug)]
pub struct IndexMap<V, I> {
    data: Vec<V>,
    map: HashMap<V, I>,
}

impl<V, I> Default for IndexMap<V, I> {
    fn default() -> Self {
        Self {
            data: vec![],
            map: HashMap::new(),
        }
    }
}

impl<V, I> IndexMap<V, I>
where
    V: Eq + std::hash::Hash + Clone,
    I: Index,
{
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn clear(&mut self) {
        self.data.clear();
        self.map.clear();
    }
    pub fn get_by_index(&self, i: I) -> Option<&V> {
        self.data.get(i.get())
    }

    /// Insert the given value into the map, returning its handle
    ///
    /// If the value is already present, the existing handle is returned.
    pub fn insert(&mut self, v: V) -> I {
        *self.map.entry(v.clone()).or_insert_with(|| {
            self.data.push(v);
            I::new(self.data.len() - 1)
        })
    }
}

/// A `Vec<V>` which is indexed by a strongly-typed handle
#[derive(Clone, Debug)]
pub struct IndexVec<V, I> {
    data: Vec<V>,
    _phantom: std::marker::PhantomData<I>,
}

impl<V, I> From<Vec<V>> for IndexVec<V, I> {
    fn from(data: Vec<V>) -> Self {
        Self {
            data,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<V, I: Index> std::ops::Index<I> for IndexVec<V, I> {
    type Output = V;
    fn index(&self, i: I) -> &V {
        &self.data[i.get()]
    }
}

impl<V, I: Index> std::ops::IndexMut<I> for IndexVec<V, I> {
    fn index_mut(&mut self, i: I) -> &mut V {
        &mut self.data[i.get()]
    }
}
