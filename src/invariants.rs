//! Structural invariant checks against random allocate/free sequences.
//!
//! These need direct access to chunk and tree internals, so they live here
//! rather than in the external `tests/` integration suite, which only sees
//! the public API. Grounded on pack precedent for `proptest` as dev-tooling
//! (`bumpalo`, `fresh-editor` manifests).

#![cfg(test)]

use core::ptr::NonNull;

use proptest::collection::vec as pvec;
use proptest::prelude::*;

use crate::alloc::Allocator;
use crate::arena::SystemArenaSource;
use crate::chunk::ChunkRef;

#[derive(Clone, Copy, Debug)]
enum Op {
    Alloc(usize),
    FreeOldest,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..256).prop_map(Op::Alloc),
        Just(Op::FreeOldest),
    ]
}

/// Walks every chunk from `first_chunk` to the guard address, checking:
/// header/footer agreement, no two adjacent free chunks, and that the
/// total footprint of every chunk exactly spans the arena with no gaps.
fn check_arena_walk(a: &Allocator<SystemArenaSource>) {
    let Some(pad) = a.pad() else { return };
    let Some(first) = a.first_chunk() else { return };

    let mut addr = first.as_ptr() as usize;
    let mut prev_free = false;
    while addr != a.guard_addr() {
        let chunk = ChunkRef::from_header_addr(unsafe { NonNull::new_unchecked(addr as *mut u8) });
        let footer = unsafe {
            NonNull::new_unchecked((addr + pad.h + chunk.size()) as *mut u8)
        };
        let footer_size = unsafe { *(footer.as_ptr() as *const usize) };
        assert_eq!(
            footer_size,
            chunk.size(),
            "header and footer size disagree at {addr:#x}"
        );
        assert!(
            !(prev_free && !chunk.in_use()),
            "two adjacent free chunks at {addr:#x}"
        );
        prev_free = !chunk.in_use();
        addr = chunk.next_header_addr(&pad);
    }
    assert_eq!(addr, a.guard_addr(), "chunk walk overran the arena guard");
}

/// Every free chunk reachable via the tree is also reachable via the arena
/// walk and vice versa, and an in-order walk of the tree yields
/// non-decreasing sizes (BST order, independent of duplicate-key side).
fn check_tree_matches_arena(a: &Allocator<SystemArenaSource>) {
    let Some(pad) = a.pad() else { return };
    let Some(first) = a.first_chunk() else { return };

    let mut from_arena = 0usize;
    let mut addr = first.as_ptr() as usize;
    while addr != a.guard_addr() {
        let chunk = ChunkRef::from_header_addr(unsafe { NonNull::new_unchecked(addr as *mut u8) });
        if !chunk.in_use() {
            from_arena += 1;
        }
        addr = chunk.next_header_addr(&pad);
    }

    let mut from_tree = 0usize;
    let mut last_size = None;
    a.tree().visit_inorder(&pad, &mut |chunk| {
        from_tree += 1;
        if let Some(last) = last_size {
            assert!(last <= chunk.size(), "free tree in-order walk is not sorted");
        }
        last_size = Some(chunk.size());
    });

    assert_eq!(from_arena, from_tree, "tree and arena disagree on free chunk count");
}

/// Every node with a child has that child's parent pointer pointing back.
fn check_parent_pointers(a: &Allocator<SystemArenaSource>) {
    let Some(pad) = a.pad() else { return };
    a.tree().visit_inorder(&pad, &mut |node| {
        if let Some(left) = node.left(&pad) {
            assert_eq!(left.parent(&pad), Some(node));
        }
        if let Some(right) = node.right(&pad) {
            assert_eq!(right.parent(&pad), Some(node));
        }
    });
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn invariants_hold_across_random_alloc_free_sequences(ops in pvec(op_strategy(), 1..64)) {
        let mut a = Allocator::<SystemArenaSource>::with_capacity(1 << 22);
        let mut live: Vec<NonNull<u8>> = Vec::new();
        let mut last_guard = 0usize;

        for op in ops {
            match op {
                Op::Alloc(size) => {
                    if let Some(ptr) = a.allocate(size) {
                        live.push(ptr);
                    }
                }
                Op::FreeOldest => {
                    if !live.is_empty() {
                        let ptr = live.remove(0);
                        unsafe { a.free(ptr) };
                    }
                }
            }

            // monotonic guard: the arena's high-water mark never recedes.
            assert!(a.guard_addr() >= last_guard);
            last_guard = a.guard_addr();

            check_arena_walk(&a);
            check_tree_matches_arena(&a);
            check_parent_pointers(&a);
        }

        for ptr in live {
            unsafe { a.free(ptr) };
        }
        check_arena_walk(&a);
        check_tree_matches_arena(&a);
    }
}
