//! A [`GlobalAlloc`] adapter over [`Allocator`].
//!
//! Grounded on the teacher's `UnsafeGlobalBlinkAlloc` (`src/global/local.rs`):
//! an `UnsafeCell`-wrapped allocator exposed as `#[global_allocator]`, with
//! the "unsafe" in the name standing for its precondition rather than its
//! API surface. This crate drops the teacher's `sync`/`cache` variants —
//! there is no concurrency story here to adapt, only a single-threaded one.

use core::alloc::{GlobalAlloc, Layout};
use core::cell::UnsafeCell;
use core::ptr;

use crate::alloc::Allocator;
use crate::align::WORD;
use crate::arena::ArenaSource;

/// Exposes an [`Allocator`] as a `#[global_allocator]`.
///
/// # Safety
///
/// This allocator is not thread-safe: every method takes `&self` only
/// because [`GlobalAlloc`] requires it, and the `unsafe impl Sync` below is
/// a promise this type does not itself keep. It is sound only in a
/// single-threaded program, or one where the caller externally
/// serializes every call into this allocator.
pub struct UnsafeGlobalAlloc<S: ArenaSource> {
    inner: UnsafeCell<Allocator<S>>,
}

// Safety: see the struct's own doc comment. This is a statement of intended
// use, not a guarantee this type enforces.
unsafe impl<S: ArenaSource> Sync for UnsafeGlobalAlloc<S> {}

impl<S: ArenaSource> UnsafeGlobalAlloc<S> {
    pub const fn new(allocator: Allocator<S>) -> Self {
        UnsafeGlobalAlloc {
            inner: UnsafeCell::new(allocator),
        }
    }

    #[allow(clippy::mut_from_ref)]
    unsafe fn inner(&self) -> &mut Allocator<S> {
        // Safety: see this type's own doc comment.
        unsafe { &mut *self.inner.get() }
    }
}

unsafe impl<S: ArenaSource> GlobalAlloc for UnsafeGlobalAlloc<S> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > WORD {
            return ptr::null_mut();
        }
        // Safety: see `inner`'s own doc comment.
        match unsafe { self.inner() }.allocate(layout.size()) {
            Some(ptr) => ptr.as_ptr(),
            None => ptr::null_mut(),
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        let Some(ptr) = core::ptr::NonNull::new(ptr) else {
            return;
        };
        // Safety: caller upholds `GlobalAlloc::dealloc`'s contract, which is
        // at least as strong as `Allocator::free`'s.
        unsafe { self.inner().free(ptr) };
    }
}
