use std::{alloc::Layout, cell::Cell, mem, rc::Rc};

use rand::prelude::random;

use crate::alloc::{Allocator, Bounded};
use crate::config::Config;
use crate::error::Error;
use crate::set::TreeSet;
use crate::table::TreeTable;

fn new_set() -> TreeSet<i64> {
    TreeSet::new(i64::cmp).unwrap()
}

#[test]
fn test_add_duplicates() {
    let mut set = new_set();
    assert_eq!(set.add(3), Ok(true));
    assert_eq!(set.add(1), Ok(true));
    assert_eq!(set.add(3), Ok(false));
    assert_eq!(set.add(2), Ok(true));
    assert_eq!(set.add(1), Ok(false));
    assert_eq!(set.add(3), Ok(false));

    assert_eq!(set.size(), 3);
    for key in 1..=3 {
        assert!(set.contains(&key));
    }
    assert!(!set.contains(&0));
    assert!(!set.contains(&4));
    assert!(set.validate().is_ok());
}

#[test]
fn test_empty() {
    let mut set = new_set();
    assert!(set.is_empty());
    assert_eq!(set.get_first(), Err(Error::ValueNotFound));
    assert_eq!(set.get_last(), Err(Error::ValueNotFound));
    assert_eq!(set.get_greater_than(&1), Err(Error::ValueNotFound));
    assert_eq!(set.get_lesser_than(&1), Err(Error::ValueNotFound));
    assert_eq!(set.remove(&1), Err(Error::ValueNotFound));
    assert!(set.iter().next().is_none());
    assert!(set.cursor().next().is_none());
}

#[test]
fn test_navigate() {
    let mut set = new_set();
    for key in [50, 10, 40, 20, 30].iter() {
        set.add(*key).unwrap();
    }
    assert_eq!(set.get_first(), Ok(&10));
    assert_eq!(set.get_last(), Ok(&50));
    assert_eq!(set.get_greater_than(&30), Ok(&40));
    assert_eq!(set.get_lesser_than(&30), Ok(&20));
    assert_eq!(set.get_greater_than(&35), Ok(&40));
    assert_eq!(set.get_greater_than(&50), Err(Error::ValueNotFound));
    assert_eq!(set.get_lesser_than(&10), Err(Error::ValueNotFound));

    assert_eq!(set.remove(&30), Ok(30));
    assert_eq!(set.get_greater_than(&20), Ok(&40));
    assert_eq!(set.size(), 4);

    set.remove_all();
    assert!(set.is_empty());
    assert!(!set.contains(&10));
}

#[test]
fn test_iter() {
    let mut set = new_set();
    let mut keys = vec![];
    for _ in 0..1000 {
        let key = random::<i64>() % 100;
        set.add(key).unwrap();
        keys.push(key);
    }
    keys.sort();
    keys.dedup();

    assert_eq!(set.size(), keys.len());
    assert_eq!(set.iter().len(), keys.len());
    assert_eq!(set.iter().cloned().collect::<Vec<i64>>(), keys);
    let mut rkeys = keys.clone();
    rkeys.reverse();
    assert_eq!(set.iter().rev().cloned().collect::<Vec<i64>>(), rkeys);
    assert_eq!((&set).into_iter().count(), keys.len());

    let mut visited = vec![];
    set.foreach(|key| visited.push(*key));
    assert_eq!(visited, keys);
}

#[test]
fn test_cursor() {
    let mut set = new_set();
    for key in 0..10 {
        set.add(key).unwrap();
    }
    {
        let mut cursor = set.cursor();
        assert_eq!(cursor.remove(), Err(Error::KeyNotFound));
        while let Some(key) = cursor.next() {
            if key % 3 == 0 {
                let key = cursor.remove().unwrap();
                assert_eq!(key % 3, 0);
                assert_eq!(cursor.remove(), Err(Error::KeyNotFound));
            }
        }
    }
    assert_eq!(set.iter().cloned().collect::<Vec<i64>>(), vec![1, 2, 4, 5, 7, 8]);
    assert!(set.validate().is_ok());

    let mut cursor = set.cursor();
    assert!(cursor.has_next());
    assert_eq!(cursor.peek(), Some(&1));
    assert_eq!(cursor.next(), Some(&1));
    assert_eq!(cursor.peek(), Some(&2));
    while cursor.has_next() {
        cursor.next();
    }
    assert_eq!(cursor.peek(), None);
    assert_eq!(cursor.remove(), Ok(8));
    assert!(cursor.next().is_none());
}

#[test]
fn test_debug() {
    let mut set = new_set();
    set.add(2).unwrap();
    set.add(1).unwrap();
    assert_eq!(format!("{:?}", set), "{1, 2}");
}

// Grants up to `limit` live requests, shared by every clone.
#[derive(Clone)]
struct Counter {
    live: Rc<Cell<isize>>,
    limit: isize,
}

impl Allocator for Counter {
    fn allocate(&mut self, _layout: Layout) -> bool {
        if self.live.get() >= self.limit {
            return false;
        }
        self.live.set(self.live.get() + 1);
        true
    }

    fn free(&mut self, _layout: Layout) {
        self.live.set(self.live.get() - 1);
    }
}

fn new_counted(live: &Rc<Cell<isize>>, limit: isize) -> Result<TreeSet<i64, Counter>, Error<i64>> {
    let alloc = Counter {
        live: Rc::clone(live),
        limit,
    };
    TreeSet::with_config(Config::with_allocator(i64::cmp, alloc))
}

#[test]
fn test_construct_refused() {
    let live = Rc::new(Cell::new(0));

    // table header refused.
    assert_eq!(new_counted(&live, 0).err(), Some(Error::AllocError));
    assert_eq!(live.get(), 0);
    // table header granted, set header refused.
    assert_eq!(new_counted(&live, 1).err(), Some(Error::AllocError));
    assert_eq!(live.get(), 0);

    let mut set = new_counted(&live, 2).unwrap();
    assert_eq!(live.get(), 2);
    assert_eq!(set.add(1), Err(Error::AllocError));
    assert_eq!(live.get(), 2);
    mem::drop(set);
    assert_eq!(live.get(), 0);
}

#[test]
fn test_clone() {
    let live = Rc::new(Cell::new(0));
    {
        let mut set = new_counted(&live, 10).unwrap();
        for key in 0..3 {
            set.add(key).unwrap();
        }
        assert_eq!(live.get(), 5);

        let mut other = set.try_clone().unwrap();
        assert_eq!(live.get(), 10);
        assert_eq!(other.remove(&1), Ok(1));
        assert_eq!(set.size(), 3);
        assert_eq!(other.iter().cloned().collect::<Vec<i64>>(), vec![0, 2]);

        // every header and node of a third copy cannot fit.
        assert_eq!(set.try_clone().err(), Some(Error::AllocError));
        assert_eq!(live.get(), 9);
    }
    assert_eq!(live.get(), 0);
}

#[test]
fn test_alloc_error() {
    let header = mem::size_of::<TreeSet<i64, Bounded>>();
    let table_header = mem::size_of::<TreeTable<i64, crate::Empty, Bounded>>();

    let config = Config::with_allocator(i64::cmp, Bounded::new(header + table_header));
    let mut set = TreeSet::<i64, Bounded>::with_config(config).unwrap();
    assert_eq!(set.allocator().used(), header + table_header);
    assert_eq!(set.add(1), Err(Error::AllocError));
    assert!(set.is_empty());
    assert!(set.validate().is_ok());
}
