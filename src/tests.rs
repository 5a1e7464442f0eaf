#![cfg(feature = "alloc")]

use crate::alloc::Allocator;
use crate::arena::SystemArenaSource;
use crate::chunk::Pad;

fn fresh() -> Allocator<SystemArenaSource> {
    Allocator::with_capacity(1 << 20)
}

#[test]
fn first_allocation_grows_the_arena_by_one_chunk() {
    let mut a = fresh();
    let ptr = a.allocate(32).expect("allocation should succeed");

    assert_eq!(a.audit_report().chunk_count, 1);
    unsafe { core::ptr::write_bytes(ptr.as_ptr(), 0xAB, 32) };
}

#[test]
fn freeing_and_reallocating_the_same_size_reuses_the_chunk() {
    let mut a = fresh();
    let first = a.allocate(64).unwrap();
    unsafe { a.free(first) };

    let second = a.allocate(64).unwrap();
    assert_eq!(first, second);
    assert_eq!(a.audit_report().chunk_count, 1);
}

#[test]
fn a_larger_free_chunk_splits_on_reuse() {
    let mut a = fresh();
    let big = a.allocate(256).unwrap();
    unsafe { a.free(big) };

    let small = a.allocate(32).unwrap();
    assert_eq!(small, big);
    // the leftover from the split becomes its own free chunk
    assert_eq!(a.audit_report().chunk_count, 2);
}

#[test]
fn three_chunks_freed_out_of_order_coalesce_back_into_one() {
    let mut a = fresh();
    let x = a.allocate(32).unwrap();
    let y = a.allocate(32).unwrap();
    let z = a.allocate(32).unwrap();

    unsafe { a.free(x) };
    unsafe { a.free(z) };
    unsafe { a.free(y) };

    // backward and forward coalescing should merge all three into one
    // free chunk spanning the whole arena allocation so far.
    assert_eq!(a.audit_report().chunk_count, 1);
}

#[test]
fn duplicate_sized_free_chunks_alternate_sides_on_insert() {
    let mut a = fresh();
    // anchors between the equal-sized chunks keep them from coalescing
    // into each other once freed.
    let chunks = [
        a.allocate(48).unwrap(),
        a.allocate(8).unwrap(),
        a.allocate(48).unwrap(),
        a.allocate(8).unwrap(),
        a.allocate(48).unwrap(),
        a.allocate(8).unwrap(),
        a.allocate(48).unwrap(),
    ];
    for (i, chunk) in chunks.into_iter().enumerate() {
        if i % 2 == 0 {
            unsafe { a.free(chunk) };
        }
    }

    // four equal-sized free chunks should not collapse into a single-sided
    // chain; the tree should have some branching, not a depth of 4.
    assert!(a.audit_report().tree_depth <= 3);
}

#[test]
fn find_and_remove_fit_descends_rightward_past_undersized_chunks() {
    let mut a = fresh();
    // anchors keep the three candidate chunks from coalescing with each
    // other once freed, so the tree actually holds three distinct sizes.
    let small = a.allocate(24).unwrap();
    let _anchor_a = a.allocate(8).unwrap();
    let medium = a.allocate(48).unwrap();
    let _anchor_b = a.allocate(8).unwrap();
    let large = a.allocate(96).unwrap();

    unsafe { a.free(small) };
    unsafe { a.free(medium) };
    unsafe { a.free(large) };

    let fit = a.allocate(40).unwrap();
    assert_eq!(fit, medium);
}

#[test]
fn a_zero_byte_request_rounds_up_to_the_minimum_payload() {
    let mut a = fresh();
    let ptr = a.allocate(0).expect("zero-size requests are not rejected");
    unsafe { a.free(ptr) };

    // the freed chunk is the only chunk in the arena, so its size is
    // exactly what `allocate(0)` rounded the request up to.
    let min_payload = Pad::compute().min_payload();
    assert_eq!(a.audit_report().largest_free_chunk, min_payload);
}
