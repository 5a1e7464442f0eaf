//! The public allocator: composes an [`Arena`] with the chunk layout and
//! free tree into `allocate`/`free`.
//!
//! Grounded on the teacher's `BlinkAlloc<A: Allocator>` (`src/local.rs`):
//! generic over its backing collaborator, constructed once and reused for
//! every allocation.

use core::ptr::NonNull;

use crate::align::{is_aligned_to, word_align_up, WORD};
use crate::arena::{Arena, ArenaSource};
use crate::chunk::{ChunkRef, Pad};
use crate::tree::FreeTree;

#[cfg(feature = "alloc")]
use crate::arena::SystemArenaSource;

/// A single-threaded, boundary-tag allocator over one contiguous,
/// monotonically-growing arena.
///
/// Not `Sync`, not `Send`: every method takes `&mut self`, and there is no
/// interior mutability anywhere in this crate. Wrap an `Allocator` in
/// whatever synchronization a caller's use case needs.
pub struct Allocator<S: ArenaSource> {
    arena: Arena<S>,
    pad: Option<Pad>,
    tree: FreeTree,
}

impl<S: ArenaSource> Allocator<S> {
    /// Builds an allocator over a caller-supplied arena source.
    pub fn new_in(source: S) -> Self {
        Allocator {
            arena: Arena::new(source),
            pad: None,
            tree: FreeTree::new(),
        }
    }

    /// Finds or creates a chunk of at least `size` usable bytes and marks it
    /// in use. Returns `None` on allocation failure; never panics.
    ///
    /// A zero-byte request succeeds and returns a pointer good for reads and
    /// writes of up to the minimum chunk payload.
    pub fn allocate(&mut self, size: usize) -> Option<NonNull<u8>> {
        let pad = *self.pad.get_or_insert_with(Pad::compute);
        let needed = word_align_up(size)?.max(pad.min_payload());

        if let Some(chunk) = self.tree.find_and_remove_fit(&pad, needed) {
            self.use_fit(&pad, chunk, needed);
            chunk.set_in_use(true);
            let ptr = chunk.payload_ptr(&pad);
            debug_assert!(is_aligned_to(ptr.as_ptr() as usize, WORD));
            return Some(ptr);
        }

        let footprint = pad.footprint(needed);
        let header_addr = self.arena.extend(footprint).ok()?;
        let chunk = ChunkRef::from_header_addr(header_addr);
        chunk.set_size(needed);
        chunk.set_footer_size(&pad, needed);
        chunk.set_in_use(true);
        let ptr = chunk.payload_ptr(&pad);
        debug_assert!(is_aligned_to(ptr.as_ptr() as usize, WORD));
        Some(ptr)
    }

    /// Splits `chunk` if the leftover is itself a valid chunk, otherwise
    /// hands the whole chunk over as-is.
    fn use_fit(&mut self, pad: &Pad, chunk: ChunkRef, needed: usize) {
        let remainder = chunk.size() - needed;
        if remainder < pad.footprint(pad.min_payload()) {
            chunk.set_footer_size(pad, chunk.size());
            return;
        }

        chunk.set_size(needed);
        chunk.set_footer_size(pad, needed);

        let split_addr = chunk.addr() + pad.h + needed + pad.f;
        // Safety: `split_addr` lies strictly within the footprint just
        // removed from the tree, which this allocator exclusively owns.
        let split = ChunkRef::from_header_addr(unsafe {
            NonNull::new_unchecked(split_addr as *mut u8)
        });
        split.set_size(remainder - pad.h - pad.f);
        split.set_footer_size(pad, split.size());
        self.tree.insert(pad, split);
    }

    /// Returns a chunk to the allocator, coalescing with either neighbor
    /// that is itself free.
    ///
    /// # Safety
    ///
    /// `ptr` must be a pointer previously returned by [`Allocator::allocate`]
    /// on this same allocator, not already freed.
    pub unsafe fn free(&mut self, ptr: NonNull<u8>) {
        let pad = self
            .pad
            .expect("bstalloc: free called on an allocator that never allocated");
        let mut chunk = ChunkRef::from_payload(ptr, &pad);
        debug_assert!(
            chunk.in_use(),
            "bstalloc: double free or pointer foreign to this allocator"
        );

        let first_addr = self.arena.first_chunk().map(|c| c.as_ptr() as usize);
        if Some(chunk.addr()) != first_addr {
            let footer_addr = chunk.addr() - pad.f;
            // Safety: chunk is not the first chunk in the arena, so `F`
            // bytes immediately below its header hold a live footer.
            let footer_ptr = unsafe { NonNull::new_unchecked(footer_addr as *mut u8) };
            let pred = unsafe { ChunkRef::from_footer(footer_ptr, &pad) };
            if !pred.in_use() {
                self.tree.remove(&pad, pred);
                pred.set_size(pred.size() + pad.h + pad.f + chunk.size());
                chunk = pred;
            }
        }

        if chunk.next_header_addr(&pad) != self.arena.guard_addr() {
            // Safety: the chunk is not last in the arena, so its next
            // header address denotes a live chunk header.
            let next = ChunkRef::from_header_addr(unsafe {
                NonNull::new_unchecked(chunk.next_header_addr(&pad) as *mut u8)
            });
            if !next.in_use() {
                self.tree.remove(&pad, next);
                chunk.set_size(chunk.size() + pad.h + pad.f + next.size());
            }
        }

        chunk.set_footer_size(&pad, chunk.size());
        self.tree.insert(&pad, chunk);
    }

    pub(crate) fn pad(&self) -> Option<Pad> {
        self.pad
    }

    pub(crate) fn first_chunk(&self) -> Option<NonNull<u8>> {
        self.arena.first_chunk()
    }

    pub(crate) fn guard_addr(&self) -> usize {
        self.arena.guard_addr()
    }

    pub(crate) fn tree(&self) -> &FreeTree {
        &self.tree
    }
}

#[cfg(feature = "alloc")]
impl Allocator<SystemArenaSource> {
    /// Builds an allocator backed by a 64 MiB reservation from the global
    /// allocator, made lazily on first use.
    pub fn new() -> Self {
        Self::new_in(SystemArenaSource::new())
    }

    /// Builds an allocator backed by a `capacity`-byte reservation from the
    /// global allocator, made lazily on first use.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new_in(SystemArenaSource::with_capacity(capacity))
    }
}

#[cfg(feature = "alloc")]
impl Default for Allocator<SystemArenaSource> {
    fn default() -> Self {
        Self::new()
    }
}
