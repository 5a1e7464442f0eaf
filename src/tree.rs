//! The size-keyed free tree.
//!
//! Nodes live inside free chunks' payloads (see [`crate::chunk::Node`]); this
//! module only ever walks pointers already established by
//! [`crate::chunk::ChunkRef`] and never touches arena bytes directly.
//!
//! There is no permanent zero-size sentinel chunk materialized in the
//! arena (see DESIGN.md decision 1): the real root is held directly as
//! `FreeTree::root`, and a chunk's "no parent" is `ChunkRef::parent() ==
//! None`. Duplicates still alternate sides on insert, and two-child removal
//! still alternates successor/predecessor, with one fewer always-resident
//! chunk than a sentinel-backed design.
//!
//! Grounded on `jcopland-alloc_expr`'s `avl_tree.rs`: a free tree keyed by
//! chunk size, nodes addressed via `NonNull` parent/child pointers stored
//! inside the allocation itself. This tree omits the AVL rebalancing that
//! file performs and stays an unbalanced BST, with the alternation bits as
//! its only anti-degeneracy mechanism.

use crate::chunk::{ChunkRef, Pad, Side};

/// The size-ordered free tree. Duplicates are permitted; insertion and
/// two-child removal both use a process-wide alternation bit to keep
/// duplicate-size runs from degenerating into a single-sided chain.
pub(crate) struct FreeTree {
    pub(crate) root: Option<ChunkRef>,
    insert_toggle: bool,
    remove_toggle: bool,
}

impl FreeTree {
    pub(crate) const fn new() -> Self {
        FreeTree {
            root: None,
            insert_toggle: false,
            remove_toggle: false,
        }
    }

    /// Walks from the root comparing sizes, breaking ties by alternating
    /// sides on the process-wide toggle.
    pub(crate) fn insert(&mut self, pad: &Pad, chunk: ChunkRef) {
        chunk.init_node(pad, None);
        chunk.set_in_use(false);

        let mut current = match self.root {
            Some(root) => root,
            None => {
                self.root = Some(chunk);
                return;
            }
        };

        loop {
            let side = if chunk.size() < current.size() {
                Side::Left
            } else if chunk.size() > current.size() {
                Side::Right
            } else {
                self.insert_toggle = !self.insert_toggle;
                if self.insert_toggle {
                    Side::Left
                } else {
                    Side::Right
                }
            };

            match current.child(pad, side) {
                Some(next) => current = next,
                None => {
                    current.set_child(pad, side, Some(chunk));
                    chunk.set_parent(pad, Some(current));
                    return;
                }
            }
        }
    }

    /// A rightward-biased descent that returns the first node whose size is
    /// `>= s`, removing it from the tree. Not best-fit. `None` if no chunk
    /// is large enough.
    pub(crate) fn find_and_remove_fit(&mut self, pad: &Pad, s: usize) -> Option<ChunkRef> {
        let mut current = self.root?;
        loop {
            if current.size() < s {
                current = current.right(pad)?;
            } else {
                self.remove(pad, current);
                return Some(current);
            }
        }
    }

    /// Arbitrary-node deletion. Two-child removal alternates between
    /// successor and predecessor replacement on a process-wide toggle.
    pub(crate) fn remove(&mut self, pad: &Pad, chunk: ChunkRef) {
        match (chunk.left(pad), chunk.right(pad)) {
            (None, None) => {
                self.replace_in_parent(pad, chunk, None);
            }
            (Some(k), None) | (None, Some(k)) => {
                k.set_parent(pad, chunk.parent(pad));
                self.replace_in_parent(pad, chunk, Some(k));
            }
            (Some(left), Some(right)) => {
                self.remove_toggle = !self.remove_toggle;
                let replacement = if self.remove_toggle {
                    Self::find_largest(pad, left)
                } else {
                    Self::find_smallest(pad, right)
                };

                let parent = chunk.parent(pad);
                // `replacement` has at most one child (the one on the side
                // away from the direction it was found), so this recursion
                // always lands in the no-children or one-child case above.
                self.remove(pad, replacement);

                // Re-read: if `replacement` was `left` or `right` itself,
                // the recursive call above already spliced its child (or
                // nothing) into `chunk`'s corresponding slot.
                let new_left = chunk.left(pad);
                let new_right = chunk.right(pad);

                replacement.set_parent(pad, parent);
                replacement.set_left(pad, new_left);
                replacement.set_right(pad, new_right);
                if let Some(l) = new_left {
                    l.set_parent(pad, Some(replacement));
                }
                if let Some(r) = new_right {
                    r.set_parent(pad, Some(replacement));
                }

                self.replace_in_parent(pad, chunk, Some(replacement));
            }
        }
    }

    /// Rewrites whatever pointed at `node` (a parent's child slot, or
    /// `self.root` when `node` has no parent) to point at `replacement`.
    fn replace_in_parent(&mut self, pad: &Pad, node: ChunkRef, replacement: Option<ChunkRef>) {
        match node.parent(pad) {
            None => {
                debug_assert_eq!(self.root, Some(node));
                self.root = replacement;
            }
            Some(parent) => {
                let side = parent
                    .child_side(pad, node)
                    .expect("free-tree node is not a child of its recorded parent");
                parent.set_child(pad, side, replacement);
            }
        }
    }

    fn find_largest(pad: &Pad, mut node: ChunkRef) -> ChunkRef {
        while let Some(right) = node.right(pad) {
            node = right;
        }
        node
    }

    fn find_smallest(pad: &Pad, mut node: ChunkRef) -> ChunkRef {
        while let Some(left) = node.left(pad) {
            node = left;
        }
        node
    }

    /// In-order walk of every free chunk currently in the tree, smallest
    /// size first. Used by [`crate::audit`] and by property tests checking
    /// tree reachability and BST ordering.
    pub(crate) fn visit_inorder(&self, pad: &Pad, f: &mut dyn FnMut(ChunkRef)) {
        fn walk(pad: &Pad, node: Option<ChunkRef>, f: &mut dyn FnMut(ChunkRef)) {
            if let Some(node) = node {
                walk(pad, node.left(pad), f);
                f(node);
                walk(pad, node.right(pad), f);
            }
        }
        walk(pad, self.root, f);
    }
}
