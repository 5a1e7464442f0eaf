//! The chunk layout and pointer-arithmetic contracts this allocator is built
//! on.
//!
//! A chunk is a contiguous header/payload/footer triple. The header and
//! footer both store the chunk's payload size, which is what makes O(1)
//! neighbor navigation possible in both directions. When a chunk is free,
//! its payload is reinterpreted as a [`Node`] of the free tree.
//!
//! Grounded on the boundary-tag layout in `maestro`'s
//! `memory::malloc::chunk::Chunk`/`FreeChunk` (header/footer-adjacent
//! chunks, `from_ptr` pointer-arithmetic recovery).

use core::mem::size_of;
use core::ptr::NonNull;

use crate::align::{align_up, WORD};
use crate::oom::size_overflow;

/// Chunk header: `size` is the payload size in bytes, `in_use` distinguishes
/// an allocated chunk from a free one.
#[repr(C)]
pub(crate) struct Header {
    pub(crate) size: usize,
    pub(crate) in_use: bool,
}

/// Chunk footer: a duplicate of the header's `size`, enabling O(1) backward
/// neighbor lookup (spec.md §3.1).
#[repr(C)]
pub(crate) struct Footer {
    pub(crate) size: usize,
}

/// The free-tree node stored inside a free chunk's payload.
#[repr(C)]
pub(crate) struct Node {
    pub(crate) parent: Option<NonNull<u8>>,
    pub(crate) left: Option<NonNull<u8>>,
    pub(crate) right: Option<NonNull<u8>>,
}

/// The word-padded sizes `H`, `F`, `N`, computed once on first use and
/// reused for the life of the allocator.
#[derive(Clone, Copy)]
pub(crate) struct Pad {
    pub(crate) h: usize,
    pub(crate) f: usize,
    pub(crate) n: usize,
}

impl Pad {
    pub(crate) fn compute() -> Pad {
        let h = align_up(size_of::<Header>(), WORD).unwrap_or_else(|| size_overflow());
        let f = align_up(size_of::<Footer>(), WORD).unwrap_or_else(|| size_overflow());
        let n = align_up(size_of::<Node>(), WORD).unwrap_or_else(|| size_overflow());
        Pad { h, f, n }
    }

    /// Minimum payload size of any chunk: large enough to hold a [`Node`].
    #[inline(always)]
    pub(crate) fn min_payload(&self) -> usize {
        self.n
    }

    /// Total on-arena footprint of a chunk carrying `payload` bytes.
    #[inline(always)]
    pub(crate) fn footprint(&self, payload: usize) -> usize {
        self.h + payload + self.f
    }
}

/// A non-owning handle to a chunk, identified by its header address. All
/// navigation is plain pointer arithmetic; nothing here walks the free tree
/// or the arena — see [`crate::tree`] and [`crate::arena`] respectively.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct ChunkRef(NonNull<u8>);

impl ChunkRef {
    #[inline(always)]
    pub(crate) fn from_header_addr(addr: NonNull<u8>) -> Self {
        ChunkRef(addr)
    }

    #[inline(always)]
    pub(crate) fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }

    #[inline(always)]
    pub(crate) fn as_non_null(self) -> NonNull<u8> {
        self.0
    }

    #[inline(always)]
    fn header_ptr(self) -> *mut Header {
        self.0.as_ptr().cast()
    }

    #[inline(always)]
    pub(crate) fn size(self) -> usize {
        unsafe { (*self.header_ptr()).size }
    }

    #[inline(always)]
    pub(crate) fn set_size(self, size: usize) {
        unsafe { (*self.header_ptr()).size = size }
    }

    #[inline(always)]
    pub(crate) fn in_use(self) -> bool {
        unsafe { (*self.header_ptr()).in_use }
    }

    #[inline(always)]
    pub(crate) fn set_in_use(self, in_use: bool) {
        unsafe { (*self.header_ptr()).in_use = in_use }
    }

    /// `h + H`: start of the payload (user data, or free-tree [`Node`]).
    #[inline(always)]
    pub(crate) fn payload_ptr(self, pad: &Pad) -> NonNull<u8> {
        unsafe { NonNull::new_unchecked(self.0.as_ptr().add(pad.h)) }
    }

    /// `h + H + size`: start of the footer.
    #[inline(always)]
    fn footer_ptr(self, pad: &Pad) -> *mut Footer {
        unsafe { self.0.as_ptr().add(pad.h + self.size()).cast() }
    }

    #[inline(always)]
    pub(crate) fn set_footer_size(self, pad: &Pad, size: usize) {
        unsafe { (*self.footer_ptr(pad)).size = size }
    }

    /// `h + H + size + F`: address of the next chunk's header, in arena
    /// order. Valid to dereference only when this is not the last chunk —
    /// callers compare against the arena's guard address first.
    #[inline(always)]
    pub(crate) fn next_header_addr(self, pad: &Pad) -> usize {
        self.addr() + pad.h + self.size() + pad.f
    }

    /// Recovers the owning chunk from a footer address: `f - f.size - H`.
    ///
    /// # Safety
    ///
    /// `footer` must be the address of a valid chunk footer.
    #[inline(always)]
    pub(crate) unsafe fn from_footer(footer: NonNull<u8>, pad: &Pad) -> ChunkRef {
        let footer_size = unsafe { (*footer.as_ptr().cast::<Footer>()).size };
        let header_addr = footer.as_ptr() as usize - footer_size - pad.h;
        ChunkRef(unsafe { NonNull::new_unchecked(header_addr as *mut u8) })
    }

    /// Recovers the owning chunk from a free-tree node address: `n - H`.
    ///
    /// # Safety
    ///
    /// `node` must be the address of a valid free-tree [`Node`].
    #[inline(always)]
    pub(crate) unsafe fn from_node(node: NonNull<u8>, pad: &Pad) -> ChunkRef {
        let header_addr = node.as_ptr() as usize - pad.h;
        ChunkRef(unsafe { NonNull::new_unchecked(header_addr as *mut u8) })
    }

    /// Recovers the owning chunk from a payload address returned by
    /// `allocate`: `p - H`.
    #[inline(always)]
    pub(crate) fn from_payload(payload: NonNull<u8>, pad: &Pad) -> ChunkRef {
        let header_addr = payload.as_ptr() as usize - pad.h;
        ChunkRef(unsafe { NonNull::new_unchecked(header_addr as *mut u8) })
    }

    #[inline(always)]
    fn node_ptr(self, pad: &Pad) -> *mut Node {
        self.payload_ptr(pad).as_ptr().cast()
    }

    #[inline(always)]
    pub(crate) fn parent(self, pad: &Pad) -> Option<ChunkRef> {
        unsafe { (*self.node_ptr(pad)).parent.map(ChunkRef) }
    }

    #[inline(always)]
    pub(crate) fn set_parent(self, pad: &Pad, parent: Option<ChunkRef>) {
        unsafe { (*self.node_ptr(pad)).parent = parent.map(ChunkRef::as_non_null) }
    }

    #[inline(always)]
    pub(crate) fn left(self, pad: &Pad) -> Option<ChunkRef> {
        unsafe { (*self.node_ptr(pad)).left.map(ChunkRef) }
    }

    #[inline(always)]
    pub(crate) fn set_left(self, pad: &Pad, left: Option<ChunkRef>) {
        unsafe { (*self.node_ptr(pad)).left = left.map(ChunkRef::as_non_null) }
    }

    #[inline(always)]
    pub(crate) fn right(self, pad: &Pad) -> Option<ChunkRef> {
        unsafe { (*self.node_ptr(pad)).right.map(ChunkRef) }
    }

    #[inline(always)]
    pub(crate) fn set_right(self, pad: &Pad, right: Option<ChunkRef>) {
        unsafe { (*self.node_ptr(pad)).right = right.map(ChunkRef::as_non_null) }
    }

    /// Resets the node fields for a freshly-placed free chunk: no children,
    /// and `parent` as given by the caller.
    #[inline(always)]
    pub(crate) fn init_node(self, pad: &Pad, parent: Option<ChunkRef>) {
        unsafe {
            core::ptr::write(
                self.node_ptr(pad),
                Node {
                    parent: parent.map(ChunkRef::as_non_null),
                    left: None,
                    right: None,
                },
            );
        }
    }

    /// Which child slot of `self` does `child` occupy? `None` if neither.
    #[inline(always)]
    pub(crate) fn child_side(self, pad: &Pad, child: ChunkRef) -> Option<Side> {
        if self.left(pad) == Some(child) {
            Some(Side::Left)
        } else if self.right(pad) == Some(child) {
            Some(Side::Right)
        } else {
            None
        }
    }

    #[inline(always)]
    pub(crate) fn set_child(self, pad: &Pad, side: Side, child: Option<ChunkRef>) {
        match side {
            Side::Left => self.set_left(pad, child),
            Side::Right => self.set_right(pad, child),
        }
    }

    #[inline(always)]
    pub(crate) fn child(self, pad: &Pad, side: Side) -> Option<ChunkRef> {
        match side {
            Side::Left => self.left(pad),
            Side::Right => self.right(pad),
        }
    }
}

/// Which side of a parent a child chunk hangs from in the free tree.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    #[inline(always)]
    pub(crate) fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}
