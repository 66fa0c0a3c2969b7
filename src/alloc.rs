use std::alloc::Layout;

/// Allocator admits or refuses memory for every node, and for the table
/// itself, over the lifetime of one table instance.
///
/// Entries are stored in an index arena owned by the table, so the
/// allocator does not hand out pointers. Instead it is asked before each
/// allocation and told after each release, which is enough to impose
/// budgets, count allocations, or inject failures. The same allocator
/// instance must see every request of a table, from construction to drop.
pub trait Allocator {
    /// Request memory for `layout`. Return false to refuse it, in which
    /// case the caller fails with [`Error::AllocError`].
    ///
    /// [`Error::AllocError`]: crate::Error::AllocError
    fn allocate(&mut self, layout: Layout) -> bool;

    /// Request zero initialized memory for `layout`.
    fn allocate_zeroed(&mut self, layout: Layout) -> bool {
        self.allocate(layout)
    }

    /// Release memory previously granted for `layout`.
    fn free(&mut self, layout: Layout);
}

/// Default allocator, grants every request. Memory exhaustion still
/// surfaces as an error through the arena's fallible reservation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Heap;

impl Allocator for Heap {
    #[inline]
    fn allocate(&mut self, _layout: Layout) -> bool {
        true
    }

    #[inline]
    fn free(&mut self, _layout: Layout) {}
}

/// Bounded allocator works off a fixed budget of bytes, like a static
/// memory pool. Requests that would exceed the budget are refused.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bounded {
    capacity: usize,
    used: usize,
    n_allocs: usize,
    n_frees: usize,
}

impl Bounded {
    /// Create a pool that can hand out at most `capacity` bytes at a time.
    pub fn new(capacity: usize) -> Bounded {
        Bounded {
            capacity,
            ..Default::default()
        }
    }

    /// Return the budget in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return bytes currently handed out.
    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    /// Return the number of granted requests so far.
    #[inline]
    pub fn n_allocs(&self) -> usize {
        self.n_allocs
    }

    /// Return the number of releases so far.
    #[inline]
    pub fn n_frees(&self) -> usize {
        self.n_frees
    }
}

impl Allocator for Bounded {
    fn allocate(&mut self, layout: Layout) -> bool {
        match self.used.checked_add(layout.size()) {
            Some(used) if used <= self.capacity => {
                self.used = used;
                self.n_allocs += 1;
                true
            }
            _ => false,
        }
    }

    fn free(&mut self, layout: Layout) {
        self.used = self.used.saturating_sub(layout.size());
        self.n_frees += 1;
    }
}
