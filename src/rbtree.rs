use std::{alloc::Layout, cmp::Ordering, mem};

use log::warn;

use crate::alloc::Allocator;
use crate::config::Comparator;
use crate::depth::Depth;
use crate::error::Error;

/// Handle for an absent node. Doubles as the parent of root.
pub(crate) const NIL: usize = !0;

/// Red black tree, nodes are held in an arena and linked by their
/// index. Operations follow the CLRS formulation, an absent child is
/// treated as a black leaf.
pub(crate) struct RbTree<K, V, A> {
    nodes: Vec<Node<K, V>>,
    root: usize,
    cmp: Comparator<K>,
    alloc: A,
}

impl<K, V, A> RbTree<K, V, A>
where
    A: Allocator,
{
    pub(crate) fn new(cmp: Comparator<K>, alloc: A) -> RbTree<K, V, A> {
        RbTree {
            nodes: Default::default(),
            root: NIL,
            cmp,
            alloc,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub(crate) fn nodes(&self) -> &[Node<K, V>] {
        &self.nodes
    }

    #[inline]
    pub(crate) fn node(&self, n: usize) -> &Node<K, V> {
        &self.nodes[n]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, n: usize) -> &mut Node<K, V> {
        &mut self.nodes[n]
    }

    #[inline]
    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    #[inline]
    pub(crate) fn allocator_mut(&mut self) -> &mut A {
        &mut self.alloc
    }

    #[inline]
    pub(crate) fn first(&self) -> usize {
        minimum(&self.nodes, self.root)
    }

    #[inline]
    pub(crate) fn last(&self) -> usize {
        maximum(&self.nodes, self.root)
    }

    #[inline]
    pub(crate) fn successor(&self, n: usize) -> usize {
        successor(&self.nodes, n)
    }

    /// Return the node holding `key`, or NIL.
    pub(crate) fn lookup(&self, key: &K) -> usize {
        let mut n = self.root;
        while n != NIL {
            n = match (self.cmp)(key, &self.nodes[n].key) {
                Ordering::Less => self.nodes[n].left,
                Ordering::Greater => self.nodes[n].right,
                Ordering::Equal => return n,
            };
        }
        NIL
    }

    /// Return the node with the smallest key strictly greater than `key`.
    /// `key` need not be present.
    pub(crate) fn upper(&self, key: &K) -> usize {
        let (mut n, mut found) = (self.root, NIL);
        while n != NIL {
            if (self.cmp)(key, &self.nodes[n].key) == Ordering::Less {
                found = n;
                n = self.nodes[n].left;
            } else {
                n = self.nodes[n].right;
            }
        }
        found
    }

    /// Return the node with the largest key strictly less than `key`.
    /// `key` need not be present.
    pub(crate) fn lower(&self, key: &K) -> usize {
        let (mut n, mut found) = (self.root, NIL);
        while n != NIL {
            if (self.cmp)(key, &self.nodes[n].key) == Ordering::Greater {
                found = n;
                n = self.nodes[n].right;
            } else {
                n = self.nodes[n].left;
            }
        }
        found
    }

    /// Insert {key, value}. If key is already present, only its value
    /// is replaced and the old value is returned.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Result<Option<V>, Error<K>> {
        let (mut parent, mut ord) = (NIL, Ordering::Equal);
        let mut n = self.root;
        while n != NIL {
            parent = n;
            ord = (self.cmp)(&key, &self.nodes[n].key);
            n = match ord {
                Ordering::Less => self.nodes[n].left,
                Ordering::Greater => self.nodes[n].right,
                Ordering::Equal => {
                    let old_value = mem::replace(&mut self.nodes[n].value, value);
                    return Ok(Some(old_value));
                }
            };
        }

        let z = self.alloc_node(key, value, parent)?;
        match ord {
            _ if parent == NIL => self.root = z,
            Ordering::Less => self.nodes[parent].left = z,
            _ => self.nodes[parent].right = z,
        }
        self.insert_fixup(z);
        Ok(None)
    }

    /// Unlink node `z` from the tree, rebalance, and release it. Handles
    /// of other nodes remain valid, except the arena's last node which
    /// moves into the slot vacated by `z`.
    pub(crate) fn remove(&mut self, z: usize) -> (K, V) {
        let mut y_black = self.nodes[z].is_black();
        let (x, x_parent);

        if self.left(z) == NIL {
            x = self.right(z);
            x_parent = self.parent(z);
            self.transplant(z, x);
        } else if self.right(z) == NIL {
            x = self.left(z);
            x_parent = self.parent(z);
            self.transplant(z, x);
        } else {
            // z has two children, its successor y takes its place.
            let y = minimum(&self.nodes, self.right(z));
            y_black = self.nodes[y].is_black();
            x = self.right(y);
            if self.parent(y) == z {
                x_parent = y;
            } else {
                x_parent = self.parent(y);
                self.transplant(y, x);
                let zr = self.right(z);
                self.nodes[y].right = zr;
                self.nodes[zr].parent = y;
            }
            self.transplant(z, y);
            let zl = self.left(z);
            self.nodes[y].left = zl;
            self.nodes[zl].parent = y;
            self.nodes[y].black = self.nodes[z].black;
        }

        if y_black {
            self.delete_fixup(x, x_parent);
        }
        self.release(z)
    }

    /// Release every node.
    pub(crate) fn clear(&mut self) {
        let layout = Layout::new::<Node<K, V>>();
        (0..self.nodes.len()).for_each(|_| self.alloc.free(layout));
        self.nodes.clear();
        self.root = NIL;
    }

    /// Validate the tree against red black rules, parent links and
    /// sort order. Additionally return full statistics on the tree.
    pub(crate) fn validate(&self) -> Result<Stats, Error<K>>
    where
        K: Clone,
    {
        if self.is_red(self.root) {
            return Err(Error::RedRoot);
        }

        let mut stats = Stats::new(self.len(), mem::size_of::<Node<K, V>>());
        stats.set_depths(Depth::new(self.len()));
        let blacks = self.validate_tree(self.root, NIL, false, 0, 0, &mut stats)?;
        stats.set_blacks(blacks);

        let (mut n, mut count) = (self.first(), 0);
        while n != NIL {
            count += 1;
            let next = self.successor(n);
            if next != NIL {
                let (key, next_key) = (&self.nodes[n].key, &self.nodes[next].key);
                if (self.cmp)(key, next_key) != Ordering::Less {
                    return Err(Error::SortError(key.clone(), next_key.clone()));
                }
            }
            n = next;
        }
        if count != self.len() {
            let err = format!("reachable: {} entries: {}", count, self.len());
            return Err(Error::BrokenLink(err));
        }
        Ok(stats)
    }

    /// Deep copy the tree into a clone of its allocator, every node of
    /// the copy is requested from that allocator. On refusal, nodes
    /// granted so far are released.
    pub(crate) fn try_clone(&self) -> Result<RbTree<K, V, A>, Error<K>>
    where
        K: Clone,
        V: Clone,
        A: Clone,
    {
        let layout = Layout::new::<Node<K, V>>();
        let mut alloc = self.alloc.clone();
        let mut nodes: Vec<Node<K, V>> = vec![];
        if let Err(err) = nodes.try_reserve(self.nodes.len()) {
            warn!("node arena for {} entries: {}", self.nodes.len(), err);
            return Err(Error::AllocError);
        }
        for node in self.nodes.iter() {
            if !alloc.allocate(layout) {
                warn!("allocator refused clone at {} entries", nodes.len());
                nodes.iter().for_each(|_| alloc.free(layout));
                return Err(Error::AllocError);
            }
            nodes.push(node.clone());
        }
        Ok(RbTree {
            nodes,
            root: self.root,
            cmp: self.cmp,
            alloc,
        })
    }

    #[inline]
    pub(crate) fn stats(&self) -> Stats {
        Stats::new(self.len(), mem::size_of::<Node<K, V>>())
    }
}

impl<K, V, A> RbTree<K, V, A>
where
    A: Allocator,
{
    fn alloc_node(&mut self, key: K, value: V, parent: usize) -> Result<usize, Error<K>> {
        let layout = Layout::new::<Node<K, V>>();
        if !self.alloc.allocate(layout) {
            warn!("allocator refused node, {} entries", self.nodes.len());
            return Err(Error::AllocError);
        }
        if let Err(err) = self.nodes.try_reserve(1) {
            warn!("node arena full at {} entries: {}", self.nodes.len(), err);
            self.alloc.free(layout);
            return Err(Error::AllocError);
        }
        self.nodes.push(Node::new(key, value, parent));
        Ok(self.nodes.len() - 1)
    }

    // Drop the unlinked node `z` from the arena. The last node is moved
    // into its slot and re-linked.
    fn release(&mut self, z: usize) -> (K, V) {
        let node = self.nodes.swap_remove(z);
        let moved = self.nodes.len();
        if z != moved {
            let (p, l, r) = (self.parent(z), self.left(z), self.right(z));
            self.replace_child(p, moved, z);
            if l != NIL {
                self.nodes[l].parent = z;
            }
            if r != NIL {
                self.nodes[r].parent = z;
            }
        }
        self.alloc.free(Layout::new::<Node<K, V>>());
        (node.key, node.value)
    }

    fn insert_fixup(&mut self, mut z: usize) {
        while self.is_red(self.parent(z)) {
            // parent is red, hence not root, hence grand-parent exists.
            let p = self.parent(z);
            let g = self.parent(p);
            if p == self.left(g) {
                let uncle = self.right(g);
                if self.is_red(uncle) {
                    self.nodes[p].set_black();
                    self.nodes[uncle].set_black();
                    self.nodes[g].set_red();
                    z = g;
                } else {
                    if z == self.right(p) {
                        z = p;
                        self.rotate_left(z);
                    }
                    let p = self.parent(z);
                    let g = self.parent(p);
                    self.nodes[p].set_black();
                    self.nodes[g].set_red();
                    self.rotate_right(g);
                }
            } else {
                let uncle = self.left(g);
                if self.is_red(uncle) {
                    self.nodes[p].set_black();
                    self.nodes[uncle].set_black();
                    self.nodes[g].set_red();
                    z = g;
                } else {
                    if z == self.left(p) {
                        z = p;
                        self.rotate_right(z);
                    }
                    let p = self.parent(z);
                    let g = self.parent(p);
                    self.nodes[p].set_black();
                    self.nodes[g].set_red();
                    self.rotate_left(g);
                }
            }
        }
        let root = self.root;
        self.nodes[root].set_black();
    }

    // `x` carries an extra black, it can be NIL hence its parent is
    // tracked separately. While `x` is below root and not red, its
    // sibling `w` exists.
    fn delete_fixup(&mut self, mut x: usize, mut parent: usize) {
        while x != self.root && self.is_black(x) {
            if x == self.left(parent) {
                let mut w = self.right(parent);
                if self.is_red(w) {
                    self.nodes[w].set_black();
                    self.nodes[parent].set_red();
                    self.rotate_left(parent);
                    w = self.right(parent);
                }
                if self.is_black(self.left(w)) && self.is_black(self.right(w)) {
                    self.nodes[w].set_red();
                    x = parent;
                    parent = self.parent(x);
                } else {
                    if self.is_black(self.right(w)) {
                        let wl = self.left(w);
                        self.nodes[wl].set_black();
                        self.nodes[w].set_red();
                        self.rotate_right(w);
                        w = self.right(parent);
                    }
                    self.nodes[w].black = self.nodes[parent].black;
                    self.nodes[parent].set_black();
                    let wr = self.right(w);
                    self.nodes[wr].set_black();
                    self.rotate_left(parent);
                    x = self.root;
                    parent = NIL;
                }
            } else {
                let mut w = self.left(parent);
                if self.is_red(w) {
                    self.nodes[w].set_black();
                    self.nodes[parent].set_red();
                    self.rotate_right(parent);
                    w = self.left(parent);
                }
                if self.is_black(self.right(w)) && self.is_black(self.left(w)) {
                    self.nodes[w].set_red();
                    x = parent;
                    parent = self.parent(x);
                } else {
                    if self.is_black(self.left(w)) {
                        let wr = self.right(w);
                        self.nodes[wr].set_black();
                        self.nodes[w].set_red();
                        self.rotate_left(w);
                        w = self.left(parent);
                    }
                    self.nodes[w].black = self.nodes[parent].black;
                    self.nodes[parent].set_black();
                    let wl = self.left(w);
                    self.nodes[wl].set_black();
                    self.rotate_right(parent);
                    x = self.root;
                    parent = NIL;
                }
            }
        }
        if x != NIL {
            self.nodes[x].set_black();
        }
    }

    //              (p)                       (p)
    //               |                         |
    //               x                         y
    //              / \                       / \
    //             /   \                     /   \
    //            /     \                   /     \
    //          left     y                 x      yr
    //                  / \               / \
    //                yl   yr          left  yl
    //
    fn rotate_left(&mut self, x: usize) {
        let y = self.right(x);
        let yl = self.left(y);
        self.nodes[x].right = yl;
        if yl != NIL {
            self.nodes[yl].parent = x;
        }
        let p = self.parent(x);
        self.nodes[y].parent = p;
        self.replace_child(p, x, y);
        self.nodes[y].left = x;
        self.nodes[x].parent = y;
    }

    //              (p)                       (p)
    //               |                         |
    //               x                         y
    //              / \                       / \
    //             /   \                     /   \
    //            /     \                   /     \
    //           y     right              yl       x
    //          / \                               / \
    //        yl   yr                           yr  right
    //
    fn rotate_right(&mut self, x: usize) {
        let y = self.left(x);
        let yr = self.right(y);
        self.nodes[x].left = yr;
        if yr != NIL {
            self.nodes[yr].parent = x;
        }
        let p = self.parent(x);
        self.nodes[y].parent = p;
        self.replace_child(p, x, y);
        self.nodes[y].right = x;
        self.nodes[x].parent = y;
    }

    // Put `v` in place of `u` under u's parent. `v` can be NIL.
    fn transplant(&mut self, u: usize, v: usize) {
        let p = self.parent(u);
        self.replace_child(p, u, v);
        if v != NIL {
            self.nodes[v].parent = p;
        }
    }

    fn replace_child(&mut self, parent: usize, old: usize, new: usize) {
        if parent == NIL {
            self.root = new;
        } else if self.nodes[parent].left == old {
            self.nodes[parent].left = new;
        } else {
            self.nodes[parent].right = new;
        }
    }

    fn validate_tree(
        &self,
        n: usize,
        parent: usize,
        fromred: bool,
        mut nb: usize,
        depth: usize,
        stats: &mut Stats,
    ) -> Result<usize, Error<K>>
    where
        K: Clone,
    {
        if n == NIL {
            stats.sample_depth(depth);
            return Ok(nb);
        }

        let node = &self.nodes[n];
        if node.parent != parent {
            let err = format!("node: {} parent: {} expected: {}", n, node.parent, parent);
            return Err(Error::BrokenLink(err));
        }
        let red = !node.is_black();
        if fromred && red {
            return Err(Error::ConsecutiveReds);
        }
        if !red {
            nb += 1;
        }
        let lblacks = self.validate_tree(node.left, n, red, nb, depth + 1, stats)?;
        let rblacks = self.validate_tree(node.right, n, red, nb, depth + 1, stats)?;
        if lblacks != rblacks {
            let err = format!("left: {} right: {}", lblacks, rblacks);
            return Err(Error::UnbalancedBlacks(err));
        }
        if node.left != NIL {
            let left = &self.nodes[node.left];
            if (self.cmp)(&left.key, &node.key) != Ordering::Less {
                let (lkey, parent) = (left.key.clone(), node.key.clone());
                return Err(Error::SortError(lkey, parent));
            }
        }
        if node.right != NIL {
            let right = &self.nodes[node.right];
            if (self.cmp)(&right.key, &node.key) != Ordering::Greater {
                let (rkey, parent) = (right.key.clone(), node.key.clone());
                return Err(Error::SortError(rkey, parent));
            }
        }
        Ok(lblacks)
    }

    #[inline]
    fn parent(&self, n: usize) -> usize {
        self.nodes[n].parent
    }

    #[inline]
    fn left(&self, n: usize) -> usize {
        self.nodes[n].left
    }

    #[inline]
    fn right(&self, n: usize) -> usize {
        self.nodes[n].right
    }

    #[inline]
    fn is_red(&self, n: usize) -> bool {
        n != NIL && !self.nodes[n].is_black()
    }

    #[inline]
    fn is_black(&self, n: usize) -> bool {
        !self.is_red(n)
    }
}

#[cfg(test)]
impl<K, V, A> RbTree<K, V, A>
where
    A: Allocator,
{
    pub(crate) fn root(&self) -> usize {
        self.root
    }

    pub(crate) fn set_color(&mut self, n: usize, black: bool) {
        self.nodes[n].black = black
    }

    pub(crate) fn set_cmp(&mut self, cmp: Comparator<K>) {
        self.cmp = cmp
    }

    pub(crate) fn predecessor(&self, n: usize) -> usize {
        predecessor(&self.nodes, n)
    }

    pub(crate) fn children(&self, n: usize) -> (usize, usize) {
        (self.nodes[n].left, self.nodes[n].right)
    }
}

/// Return the leftmost node under `n`.
pub(crate) fn minimum<K, V>(nodes: &[Node<K, V>], mut n: usize) -> usize {
    if n == NIL {
        return NIL;
    }
    while nodes[n].left != NIL {
        n = nodes[n].left;
    }
    n
}

/// Return the rightmost node under `n`.
pub(crate) fn maximum<K, V>(nodes: &[Node<K, V>], mut n: usize) -> usize {
    if n == NIL {
        return NIL;
    }
    while nodes[n].right != NIL {
        n = nodes[n].right;
    }
    n
}

/// Return the in-order successor of `x`, or NIL if `x` is the last node.
pub(crate) fn successor<K, V>(nodes: &[Node<K, V>], mut x: usize) -> usize {
    if x == NIL {
        return NIL;
    }
    if nodes[x].right != NIL {
        return minimum(nodes, nodes[x].right);
    }
    let mut y = nodes[x].parent;
    while y != NIL && x == nodes[y].right {
        x = y;
        y = nodes[y].parent;
    }
    y
}

/// Return the in-order predecessor of `x`, or NIL if `x` is the first node.
pub(crate) fn predecessor<K, V>(nodes: &[Node<K, V>], mut x: usize) -> usize {
    if x == NIL {
        return NIL;
    }
    if nodes[x].left != NIL {
        return maximum(nodes, nodes[x].left);
    }
    let mut y = nodes[x].parent;
    while y != NIL && x == nodes[y].left {
        x = y;
        y = nodes[y].parent;
    }
    y
}

/// Node corresponds to a single entry in the tree.
#[derive(Clone)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    black: bool,   // store: black or red
    parent: usize, // link: parent, NIL for root
    left: usize,   // link: left child
    right: usize,  // link: right child
}

impl<K, V> Node<K, V> {
    // new nodes are always red.
    fn new(key: K, value: V, parent: usize) -> Node<K, V> {
        Node {
            key,
            value,
            black: false,
            parent,
            left: NIL,
            right: NIL,
        }
    }

    #[inline]
    fn set_red(&mut self) {
        self.black = false
    }

    #[inline]
    fn set_black(&mut self) {
        self.black = true
    }

    #[inline]
    fn is_black(&self) -> bool {
        self.black
    }
}

/// Statistics on [`TreeTable`] tree. Serves two purpose:
///
/// * To get partial but quick statistics via [`TreeTable::stats`] method.
/// * To get full statisics via [`TreeTable::validate`] method.
///
/// [`TreeTable`]: crate::TreeTable
/// [`TreeTable::stats`]: crate::TreeTable::stats
/// [`TreeTable::validate`]: crate::TreeTable::validate
#[derive(Default, Debug)]
pub struct Stats {
    entries: usize, // number of entries in the tree.
    node_size: usize,
    blacks: Option<usize>,
    depths: Option<Depth>,
}

impl Stats {
    fn new(entries: usize, node_size: usize) -> Stats {
        Stats {
            entries,
            node_size,
            blacks: Default::default(),
            depths: Default::default(),
        }
    }

    #[inline]
    fn set_blacks(&mut self, blacks: usize) {
        self.blacks = Some(blacks)
    }

    #[inline]
    fn set_depths(&mut self, depths: Depth) {
        self.depths = Some(depths)
    }

    fn sample_depth(&mut self, depth: usize) {
        if let Some(depths) = self.depths.as_mut() {
            depths.sample(depth)
        }
    }

    /// Return number entries in the tree.
    #[inline]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Return node-size, including over-head of color and links. Although
    /// the node overhead is constant, the node size varies based on
    /// key and value types.
    #[inline]
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// Return number of black nodes from root to leaf, on both left
    /// and right child.
    #[inline]
    pub fn blacks(&self) -> Option<usize> {
        self.blacks
    }

    /// Return [`Depth`] statistics, only available from a full validation.
    pub fn depths(&self) -> Option<Depth> {
        match self.depths.as_ref() {
            Some(depths) if depths.samples() > 0 => Some(depths.clone()),
            _ => None,
        }
    }
}
