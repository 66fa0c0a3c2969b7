use std::{error, fmt};

/// Error enumerates over all possible errors that this package
/// shall return.
#[derive(Debug, PartialEq)]
pub enum Error<K> {
    /// Allocator refused, or the arena could not grow, for a new node or
    /// for the table itself.
    AllocError,
    /// Key is not present in the table, or nothing left to remove.
    KeyNotFound,
    /// Value, or set element, is not present.
    ValueNotFound,
    /// Index out of range. Not returned by tree containers.
    OutOfRange,
    /// Invalid capacity. Not returned by tree containers.
    InvalidCapacity,
    /// Invalid range. Not returned by tree containers.
    InvalidRange,
    /// Fatal case, root node is red.
    RedRoot,
    /// Fatal case, red node with a red child.
    ConsecutiveReds,
    /// Fatal case, number of blacks differ under left and right child.
    /// The String component of this variant can be used for debugging.
    UnbalancedBlacks(String),
    /// Fatal case, index entries are not in sort-order.
    SortError(K, K),
    /// Fatal case, parent and child links disagree.
    BrokenLink(String),
}

impl<K> fmt::Display for Error<K>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::AllocError => write!(f, "allocation failed"),
            Error::KeyNotFound => write!(f, "key not found"),
            Error::ValueNotFound => write!(f, "value not found"),
            Error::OutOfRange => write!(f, "out of range"),
            Error::InvalidCapacity => write!(f, "invalid capacity"),
            Error::InvalidRange => write!(f, "invalid range"),
            Error::RedRoot => write!(f, "root node is red"),
            Error::ConsecutiveReds => write!(f, "consecutive red nodes"),
            Error::UnbalancedBlacks(msg) => write!(f, "unbalanced blacks {}", msg),
            Error::SortError(a, b) => write!(f, "sort error {:?} {:?}", a, b),
            Error::BrokenLink(msg) => write!(f, "broken link {}", msg),
        }
    }
}

impl<K> error::Error for Error<K> where K: fmt::Debug {}
