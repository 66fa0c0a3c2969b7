//! Ordered table and ordered set, backed by a red-black tree.
//!
//! [`TreeTable`] maps keys to values, ordered by a comparator supplied
//! at construction, [`TreeSet`] holds keys alone. Every fallible
//! operation returns a [`Result`] with [`Error`], missing keys are
//! reported as [`Error::KeyNotFound`] and are not a fault. Memory for
//! the table and each of its nodes is requested from an [`Allocator`]
//! injected through [`Config`].
//!
//! Tables are not synchronized, callers sharing one across threads must
//! serialize all access to it, including iteration.

mod alloc;
mod config;
mod depth;
mod empty;
mod error;
mod rbtree;
mod set;
mod table;

pub use crate::alloc::{Allocator, Bounded, Heap};
pub use crate::config::{Comparator, Config};
pub use crate::depth::Depth;
pub use crate::empty::Empty;
pub use crate::error::Error;
pub use crate::rbtree::Stats;
pub use crate::set::{SetCursor, SetIter, TreeSet};
pub use crate::table::{Cursor, Iter, Keys, TreeTable, Values};

#[cfg(test)]
mod set_test;
