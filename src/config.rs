use std::{cmp::Ordering, fmt};

use crate::alloc::Heap;

/// Comparator orders keys. It must be a total order, and must stay
/// consistent for as long as the keys are held by a table.
pub type Comparator<K> = fn(&K, &K) -> Ordering;

/// Config to construct [`TreeTable`] and [`TreeSet`] instances with a
/// specific key ordering and allocator.
///
/// [`TreeTable`]: crate::TreeTable
/// [`TreeSet`]: crate::TreeSet
#[derive(Clone)]
pub struct Config<K, A = Heap> {
    pub cmp: Comparator<K>,
    pub alloc: A,
}

impl<K> Config<K, Heap> {
    /// Configuration with `cmp` for ordering and the default allocator.
    pub fn new(cmp: Comparator<K>) -> Config<K, Heap> {
        Config { cmp, alloc: Heap }
    }
}

impl<K, A> Config<K, A> {
    pub fn with_allocator(cmp: Comparator<K>, alloc: A) -> Config<K, A> {
        Config { cmp, alloc }
    }
}

/// Natural ordering of keys and the default allocator.
impl<K> Default for Config<K, Heap>
where
    K: Ord,
{
    fn default() -> Self {
        Config::new(<K as Ord>::cmp)
    }
}

impl<K, A> fmt::Debug for Config<K, A>
where
    A: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config").field("alloc", &self.alloc).finish()
    }
}
