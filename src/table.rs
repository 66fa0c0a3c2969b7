use std::{alloc::Layout, fmt, iter::FusedIterator, mem};

use log::{debug, warn};

use crate::alloc::{Allocator, Heap};
use crate::config::{Comparator, Config};
use crate::error::Error;
use crate::rbtree::{self, Node, RbTree, Stats, NIL};

/// TreeTable is an ordered map of keys to values, using a
/// [red-black][rbtree] tree. Supports logarithmic time insertion,
/// removal and lookup.
///
/// Keys are ordered by the comparator supplied at construction. Adding
/// an existing key replaces its value, never its key.
///
/// [rbtree]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
pub struct TreeTable<K, V, A = Heap>
where
    A: Allocator,
{
    tree: RbTree<K, V, A>,
}

/// Different ways to construct a new TreeTable instance.
impl<K, V> TreeTable<K, V, Heap> {
    /// Create an empty table ordered by `cmp`.
    pub fn new(cmp: Comparator<K>) -> Result<TreeTable<K, V, Heap>, Error<K>> {
        TreeTable::with_config(Config::new(cmp))
    }
}

impl<K, V, A> TreeTable<K, V, A>
where
    A: Allocator,
{
    /// Create an empty table using the comparator and allocator from
    /// `config`. Table itself is requested from the allocator.
    pub fn with_config(config: Config<K, A>) -> Result<TreeTable<K, V, A>, Error<K>> {
        let Config { cmp, mut alloc } = config;
        if !alloc.allocate_zeroed(Layout::new::<Self>()) {
            warn!("allocator refused tree table");
            return Err(Error::AllocError);
        }
        debug!(
            "new tree table, node size {}",
            mem::size_of::<Node<K, V>>()
        );
        Ok(TreeTable {
            tree: RbTree::new(cmp, alloc),
        })
    }

    /// Deep copy this table. The copy owns a clone of the allocator, and
    /// its header and every node are requested from it. Fails with
    /// AllocError if any request is refused, nothing stays allocated.
    pub fn try_clone(&self) -> Result<TreeTable<K, V, A>, Error<K>>
    where
        K: Clone,
        V: Clone,
        A: Clone,
    {
        let mut tree = self.tree.try_clone()?;
        if !tree.allocator_mut().allocate_zeroed(Layout::new::<Self>()) {
            warn!("allocator refused tree table clone");
            tree.clear();
            return Err(Error::AllocError);
        }
        Ok(TreeTable { tree })
    }
}

/// Maintenance API.
impl<K, V, A> TreeTable<K, V, A>
where
    A: Allocator,
{
    /// Return number of entries in this table.
    #[inline]
    pub fn size(&self) -> usize {
        self.tree.len()
    }

    /// Check whether this table is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.len() == 0
    }

    /// Return the allocator supplied at construction.
    #[inline]
    pub fn allocator(&self) -> &A {
        self.tree.allocator()
    }

    #[inline]
    pub(crate) fn allocator_mut(&mut self) -> &mut A {
        self.tree.allocator_mut()
    }

    /// Return quickly with basic statisics, only entries() and
    /// node_size() are valid with this statisics.
    pub fn stats(&self) -> Stats {
        self.tree.stats()
    }

    /// Validate the red-black tree with following rules:
    ///
    /// * Root is black.
    /// * From root to any leaf, no consecutive reds allowed in its path.
    /// * Number of blacks should be same under left child and right child.
    /// * Keys are in strictly ascending order.
    /// * Parent links agree with child links.
    ///
    /// Additionally return full statistics on the tree. Refer to [`Stats`]
    /// for more information.
    pub fn validate(&self) -> Result<Stats, Error<K>>
    where
        K: Clone,
    {
        self.tree.validate()
    }
}

/// Write operations on TreeTable instance.
impl<K, V, A> TreeTable<K, V, A>
where
    A: Allocator,
{
    /// Add a {key, value} entry to the table. If key is already present
    /// overwrite its value and return the old value. Fails only when
    /// the new entry cannot be allocated, leaving the table unchanged.
    pub fn add(&mut self, key: K, value: V) -> Result<Option<V>, Error<K>> {
        self.tree.insert(key, value)
    }

    /// Remove key from this table and return its value.
    pub fn remove(&mut self, key: &K) -> Result<V, Error<K>> {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Remove key from this table and return the stored {key, value}.
    pub fn remove_entry(&mut self, key: &K) -> Result<(K, V), Error<K>> {
        match self.tree.lookup(key) {
            NIL => Err(Error::KeyNotFound),
            n => Ok(self.tree.remove(n)),
        }
    }

    /// Remove the entry with lowest key.
    pub fn remove_first(&mut self) -> Result<(K, V), Error<K>> {
        match self.tree.first() {
            NIL => Err(Error::KeyNotFound),
            n => Ok(self.tree.remove(n)),
        }
    }

    /// Remove the entry with highest key.
    pub fn remove_last(&mut self) -> Result<(K, V), Error<K>> {
        match self.tree.last() {
            NIL => Err(Error::KeyNotFound),
            n => Ok(self.tree.remove(n)),
        }
    }

    /// Remove all entries from this table.
    pub fn remove_all(&mut self) {
        debug!("remove all {} entries", self.tree.len());
        self.tree.clear();
    }
}

/// Read operations on TreeTable instance.
impl<K, V, A> TreeTable<K, V, A>
where
    A: Allocator,
{
    /// Get the value for key.
    pub fn get(&self, key: &K) -> Result<&V, Error<K>> {
        match self.tree.lookup(key) {
            NIL => Err(Error::KeyNotFound),
            n => Ok(&self.tree.node(n).value),
        }
    }

    /// Get a mutable reference to the value for key.
    pub fn get_mut(&mut self, key: &K) -> Result<&mut V, Error<K>> {
        match self.tree.lookup(key) {
            NIL => Err(Error::KeyNotFound),
            n => Ok(&mut self.tree.node_mut(n).value),
        }
    }

    /// Return the lowest key.
    pub fn get_first_key(&self) -> Result<&K, Error<K>> {
        self.entry(self.tree.first()).map(|(key, _)| key)
    }

    /// Return the value of lowest key.
    pub fn get_first_value(&self) -> Result<&V, Error<K>> {
        self.entry(self.tree.first()).map(|(_, value)| value)
    }

    /// Return the highest key.
    pub fn get_last_key(&self) -> Result<&K, Error<K>> {
        self.entry(self.tree.last()).map(|(key, _)| key)
    }

    /// Return the value of highest key.
    pub fn get_last_value(&self) -> Result<&V, Error<K>> {
        self.entry(self.tree.last()).map(|(_, value)| value)
    }

    /// Return the smallest key strictly greater than `key`. `key` need
    /// not be present in the table.
    pub fn get_greater_than(&self, key: &K) -> Result<&K, Error<K>> {
        self.entry(self.tree.upper(key)).map(|(key, _)| key)
    }

    /// Return the largest key strictly less than `key`. `key` need not
    /// be present in the table.
    pub fn get_lesser_than(&self, key: &K) -> Result<&K, Error<K>> {
        self.entry(self.tree.lower(key)).map(|(key, _)| key)
    }

    /// Check whether key is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.lookup(key) != NIL
    }

    /// Return the number of entries holding `value`. Values are not
    /// ordered, this is a full scan.
    pub fn contains_value(&self, value: &V) -> usize
    where
        V: PartialEq,
    {
        self.values().filter(|v| *v == value).count()
    }

    /// Apply `f` on every key, in ascending order.
    pub fn foreach_key<F>(&self, mut f: F)
    where
        F: FnMut(&K),
    {
        self.keys().for_each(|key| f(key))
    }

    /// Apply `f` on every value, in ascending order of their keys.
    pub fn foreach_value<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut V),
    {
        let mut n = self.tree.first();
        while n != NIL {
            f(&mut self.tree.node_mut(n).value);
            n = self.tree.successor(n);
        }
    }

    /// Return an iterator over all entries in ascending order of keys.
    pub fn iter(&self) -> Iter<K, V> {
        Iter {
            nodes: self.tree.nodes(),
            front: self.tree.first(),
            back: self.tree.last(),
            remaining: self.tree.len(),
        }
    }

    /// Return an iterator over keys in ascending order.
    pub fn keys(&self) -> Keys<K, V> {
        Keys { iter: self.iter() }
    }

    /// Return an iterator over values in ascending order of their keys.
    pub fn values(&self) -> Values<K, V> {
        Values { iter: self.iter() }
    }

    /// Return a cursor over all entries in ascending order of keys, that
    /// can remove the entry it last returned.
    pub fn cursor(&mut self) -> Cursor<K, V, A> {
        let next = self.tree.first();
        Cursor {
            table: self,
            current: NIL,
            next,
        }
    }

    fn entry(&self, n: usize) -> Result<(&K, &V), Error<K>> {
        match n {
            NIL => Err(Error::KeyNotFound),
            n => {
                let node = self.tree.node(n);
                Ok((&node.key, &node.value))
            }
        }
    }
}

/// Every node is released before the table itself.
impl<K, V, A> Drop for TreeTable<K, V, A>
where
    A: Allocator,
{
    fn drop(&mut self) {
        self.tree.clear();
        self.tree.allocator_mut().free(Layout::new::<Self>());
    }
}

impl<K, V, A> fmt::Debug for TreeTable<K, V, A>
where
    K: fmt::Debug,
    V: fmt::Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, A> IntoIterator for &'a TreeTable<K, V, A>
where
    A: Allocator,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

/// Iterator over entries of [`TreeTable`], walks the tree in-order,
/// from both ends.
pub struct Iter<'a, K, V> {
    nodes: &'a [Node<K, V>],
    front: usize,
    back: usize,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.nodes[self.front];
        self.front = rbtree::successor(self.nodes, self.front);
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.nodes[self.back];
        self.back = rbtree::predecessor(self.nodes, self.back);
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over keys of [`TreeTable`].
pub struct Keys<'a, K, V> {
    iter: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.iter.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for Keys<'a, K, V> {
    fn next_back(&mut self) -> Option<&'a K> {
        self.iter.next_back().map(|(key, _)| key)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Iterator over values of [`TreeTable`].
pub struct Values<'a, K, V> {
    iter: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.iter.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<'a, K, V> DoubleEndedIterator for Values<'a, K, V> {
    fn next_back(&mut self) -> Option<&'a V> {
        self.iter.next_back().map(|(_, value)| value)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<K, V> FusedIterator for Values<'_, K, V> {}

/// Cursor walks a [`TreeTable`] in ascending order of keys and can
/// remove the entry it last returned, without losing its position.
///
/// ```
/// use treetable::TreeTable;
///
/// let mut table: TreeTable<i64, &str> = TreeTable::new(i64::cmp).unwrap();
/// for (key, value) in vec![(1, "a"), (2, "b"), (3, "c"), (4, "d")] {
///     table.add(key, value).unwrap();
/// }
///
/// let mut cursor = table.cursor();
/// while let Some((key, _)) = cursor.next() {
///     if key % 2 == 0 {
///         cursor.remove().unwrap();
///     }
/// }
/// assert_eq!(table.keys().cloned().collect::<Vec<i64>>(), vec![1, 3]);
/// ```
pub struct Cursor<'a, K, V, A>
where
    A: Allocator,
{
    table: &'a mut TreeTable<K, V, A>,
    current: usize, // last returned node, NIL before start and after removal.
    next: usize,    // node to return on the following advance.
}

impl<'a, K, V, A> Cursor<'a, K, V, A>
where
    A: Allocator,
{
    /// Advance to the next entry and return it. Return None once
    /// all entries are visited.
    pub fn next(&mut self) -> Option<(&K, &V)> {
        if self.next == NIL {
            self.current = NIL;
            return None;
        }
        self.current = self.next;
        self.next = self.table.tree.successor(self.current);
        let node = self.table.tree.node(self.current);
        Some((&node.key, &node.value))
    }

    /// Check whether a following call to [`Cursor::next`] returns an
    /// entry.
    #[inline]
    pub fn has_next(&self) -> bool {
        self.next != NIL
    }

    /// Return the entry a following call to [`Cursor::next`] returns,
    /// without advancing.
    pub fn peek(&self) -> Option<(&K, &V)> {
        match self.next {
            NIL => None,
            n => {
                let node = self.table.tree.node(n);
                Some((&node.key, &node.value))
            }
        }
    }

    /// Return a mutable reference to the value last returned by
    /// [`Cursor::next`].
    pub fn value_mut(&mut self) -> Option<&mut V> {
        match self.current {
            NIL => None,
            n => Some(&mut self.table.tree.node_mut(n).value),
        }
    }

    /// Remove the entry last returned by [`Cursor::next`]. Fails with
    /// KeyNotFound if there is no such entry, either because next()
    /// was not called or because the entry was already removed.
    pub fn remove(&mut self) -> Result<(K, V), Error<K>> {
        let z = match self.current {
            NIL => return Err(Error::KeyNotFound),
            z => z,
        };
        // successor was computed by next(), before this mutation.
        let last = self.table.tree.len() - 1;
        let entry = self.table.tree.remove(z);
        if self.next == last {
            // arena moved its last node into the removed slot.
            self.next = z;
        }
        self.current = NIL;
        Ok(entry)
    }
}
