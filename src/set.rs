use std::{alloc::Layout, fmt, iter::FusedIterator};

use log::warn;

use crate::alloc::{Allocator, Heap};
use crate::config::{Comparator, Config};
use crate::empty::Empty;
use crate::error::Error;
use crate::rbtree::Stats;
use crate::table::{Cursor, Keys, TreeTable};

/// TreeSet is an ordered set of keys, stored in a [`TreeTable`] with
/// [`Empty`] as the value for every key.
///
/// Lookups that miss report [`Error::ValueNotFound`], the element being
/// the set's value.
pub struct TreeSet<K, A = Heap>
where
    A: Allocator,
{
    table: TreeTable<K, Empty, A>,
}

impl<K> TreeSet<K, Heap> {
    /// Create an empty set ordered by `cmp`.
    pub fn new(cmp: Comparator<K>) -> Result<TreeSet<K, Heap>, Error<K>> {
        TreeSet::with_config(Config::new(cmp))
    }
}

impl<K, A> TreeSet<K, A>
where
    A: Allocator,
{
    /// Create an empty set using the comparator and allocator from
    /// `config`.
    pub fn with_config(config: Config<K, A>) -> Result<TreeSet<K, A>, Error<K>> {
        let table = TreeTable::with_config(config)?;
        TreeSet::with_table(table)
    }

    /// Deep copy this set, refer to [`TreeTable::try_clone`].
    pub fn try_clone(&self) -> Result<TreeSet<K, A>, Error<K>>
    where
        K: Clone,
        A: Clone,
    {
        TreeSet::with_table(self.table.try_clone()?)
    }

    // On refusal `table` is dropped, releasing whatever it holds.
    fn with_table(mut table: TreeTable<K, Empty, A>) -> Result<TreeSet<K, A>, Error<K>> {
        if !table.allocator_mut().allocate_zeroed(Layout::new::<Self>()) {
            warn!("allocator refused tree set");
            return Err(Error::AllocError);
        }
        Ok(TreeSet { table })
    }

    /// Add `key` to the set, return true if it was not already present.
    pub fn add(&mut self, key: K) -> Result<bool, Error<K>> {
        Ok(self.table.add(key, Empty {})?.is_none())
    }

    /// Remove `key` from the set and return the stored key.
    pub fn remove(&mut self, key: &K) -> Result<K, Error<K>> {
        let (key, _) = self.table.remove_entry(key).map_err(value_not_found)?;
        Ok(key)
    }

    /// Remove all keys from the set.
    pub fn remove_all(&mut self) {
        self.table.remove_all()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.table.contains_key(key)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.table.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Return the lowest key.
    pub fn get_first(&self) -> Result<&K, Error<K>> {
        self.table.get_first_key().map_err(value_not_found)
    }

    /// Return the highest key.
    pub fn get_last(&self) -> Result<&K, Error<K>> {
        self.table.get_last_key().map_err(value_not_found)
    }

    /// Return the smallest key strictly greater than `key`.
    pub fn get_greater_than(&self, key: &K) -> Result<&K, Error<K>> {
        self.table.get_greater_than(key).map_err(value_not_found)
    }

    /// Return the largest key strictly less than `key`.
    pub fn get_lesser_than(&self, key: &K) -> Result<&K, Error<K>> {
        self.table.get_lesser_than(key).map_err(value_not_found)
    }

    /// Apply `f` on every key, in ascending order.
    pub fn foreach<F>(&self, f: F)
    where
        F: FnMut(&K),
    {
        self.table.foreach_key(f)
    }

    /// Return an iterator over keys in ascending order.
    pub fn iter(&self) -> SetIter<K> {
        SetIter {
            keys: self.table.keys(),
        }
    }

    /// Return a cursor over keys in ascending order, that can remove the
    /// key it last returned.
    pub fn cursor(&mut self) -> SetCursor<K, A> {
        SetCursor {
            cursor: self.table.cursor(),
        }
    }

    #[inline]
    pub fn allocator(&self) -> &A {
        self.table.allocator()
    }

    /// Refer to [`TreeTable::validate`].
    pub fn validate(&self) -> Result<Stats, Error<K>>
    where
        K: Clone,
    {
        self.table.validate()
    }
}

impl<K, A> Drop for TreeSet<K, A>
where
    A: Allocator,
{
    fn drop(&mut self) {
        self.table.allocator_mut().free(Layout::new::<Self>());
    }
}

impl<K, A> fmt::Debug for TreeSet<K, A>
where
    K: fmt::Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, K, A> IntoIterator for &'a TreeSet<K, A>
where
    A: Allocator,
{
    type Item = &'a K;
    type IntoIter = SetIter<'a, K>;

    fn into_iter(self) -> SetIter<'a, K> {
        self.iter()
    }
}

fn value_not_found<K>(err: Error<K>) -> Error<K> {
    match err {
        Error::KeyNotFound => Error::ValueNotFound,
        err => err,
    }
}

/// Iterator over keys of [`TreeSet`].
pub struct SetIter<'a, K> {
    keys: Keys<'a, K, Empty>,
}

impl<'a, K> Iterator for SetIter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.keys.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl<'a, K> DoubleEndedIterator for SetIter<'a, K> {
    fn next_back(&mut self) -> Option<&'a K> {
        self.keys.next_back()
    }
}

impl<K> ExactSizeIterator for SetIter<'_, K> {}

impl<K> FusedIterator for SetIter<'_, K> {}

/// Cursor over keys of [`TreeSet`], refer to [`Cursor`].
pub struct SetCursor<'a, K, A>
where
    A: Allocator,
{
    cursor: Cursor<'a, K, Empty, A>,
}

impl<'a, K, A> SetCursor<'a, K, A>
where
    A: Allocator,
{
    /// Advance to the next key and return it.
    pub fn next(&mut self) -> Option<&K> {
        self.cursor.next().map(|(key, _)| key)
    }

    /// Check whether a following call to [`SetCursor::next`] returns a
    /// key.
    #[inline]
    pub fn has_next(&self) -> bool {
        self.cursor.has_next()
    }

    /// Return the key a following call to [`SetCursor::next`] returns,
    /// without advancing.
    pub fn peek(&self) -> Option<&K> {
        self.cursor.peek().map(|(key, _)| key)
    }

    /// Remove the key last returned by [`SetCursor::next`].
    pub fn remove(&mut self) -> Result<K, Error<K>> {
        self.cursor.remove().map(|(key, _)| key)
    }
}
