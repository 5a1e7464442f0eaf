//! Fatal paths for internal invariant violations, as distinct from
//! reportable errors.
//!
//! Out-of-memory is *not* handled here: it is a normal, reportable `None`
//! return from [`crate::alloc::Allocator::allocate`]. These helpers exist
//! only for conditions that should never happen given a correct
//! implementation, such as pad-size arithmetic overflow while computing
//! `H`, `F`, `N` from this platform's type layouts.

#[inline(never)]
#[cold]
pub(crate) fn size_overflow() -> ! {
    panic!("bstalloc: internal size computation overflowed")
}
