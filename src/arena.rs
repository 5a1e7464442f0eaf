//! The arena primitive and its "extend" collaborator.
//!
//! Growing the arena is explicitly out of scope as a primitive this crate
//! implements itself — it is a collaborator the core allocator consumes.
//! [`ArenaSource`] is the trait it consumes, [`Arena`] tracks `first_chunk`
//! and a guard address on top of whatever source is plugged in, and
//! [`SystemArenaSource`] is the one concrete backing this crate ships,
//! grounded on the teacher's generic-over-backend `BlinkAlloc<A: Allocator>`
//! shape (`src/local.rs`).
//!
//! A single contiguous, monotonically-growing region cannot be backed by a
//! reallocating buffer: growth must never move bytes already handed out as
//! payload. `SystemArenaSource` therefore reserves one fixed-capacity block
//! up front (lazily, on first `extend`) and hands out increasing offsets
//! into it — the same "reserve once, bump a cursor" shape as a real
//! `mmap`-then-`sbrk` pair, without needing platform-specific virtual memory
//! calls.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::align::WORD;
use crate::api::AllocError;

#[cfg(feature = "alloc")]
use crate::api::{Allocator, Global};

/// The sole mechanism by which new arena bytes may appear.
///
/// An implementation must append `n` bytes to the high end of whatever
/// region it manages and return the address of the first new byte. It must
/// never move bytes it has already handed out: every address returned by a
/// prior `extend` call must stay valid for the lifetime of the source.
pub trait ArenaSource {
    fn extend(&mut self, n: usize) -> Result<NonNull<u8>, AllocError>;
}

/// 64 MiB, reserved once, lazily, on the first call to `extend`.
#[cfg(feature = "alloc")]
const DEFAULT_CAPACITY: usize = 64 << 20;

/// The default [`ArenaSource`]: reserves a single fixed-capacity block from
/// a backing [`Allocator`] (the global allocator by default) and carves
/// monotonically increasing offsets out of it.
#[cfg(feature = "alloc")]
pub struct SystemArenaSource<A: Allocator = Global> {
    allocator: A,
    capacity: usize,
    base: Option<NonNull<u8>>,
    used: usize,
}

#[cfg(feature = "alloc")]
impl SystemArenaSource<Global> {
    /// Reserves up to [`DEFAULT_CAPACITY`] bytes from the global allocator.
    pub fn new() -> Self {
        Self::with_capacity_in(DEFAULT_CAPACITY, Global)
    }

    /// Reserves up to `capacity` bytes from the global allocator.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }
}

#[cfg(feature = "alloc")]
impl Default for SystemArenaSource<Global> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "alloc")]
impl<A: Allocator> SystemArenaSource<A> {
    /// Reserves up to `capacity` bytes from `allocator`, on first use.
    pub fn with_capacity_in(capacity: usize, allocator: A) -> Self {
        SystemArenaSource {
            allocator,
            capacity,
            base: None,
            used: 0,
        }
    }

    fn reserve(&mut self) -> Result<NonNull<u8>, AllocError> {
        if let Some(base) = self.base {
            return Ok(base);
        }
        let layout = Layout::from_size_align(self.capacity, WORD).map_err(|_| AllocError)?;
        let slice = self.allocator.allocate(layout)?;
        let base = NonNull::new(slice.as_ptr().cast::<u8>()).ok_or(AllocError)?;
        self.base = Some(base);
        Ok(base)
    }
}

#[cfg(feature = "alloc")]
impl<A: Allocator> ArenaSource for SystemArenaSource<A> {
    fn extend(&mut self, n: usize) -> Result<NonNull<u8>, AllocError> {
        let base = self.reserve()?;
        let start = self.used;
        let end = start.checked_add(n).ok_or(AllocError)?;
        if end > self.capacity {
            return Err(AllocError);
        }
        self.used = end;
        // Safety: `start` is within `[0, capacity)` and `base` denotes a
        // live allocation of `capacity` bytes.
        Ok(unsafe { NonNull::new_unchecked(base.as_ptr().add(start)) })
    }
}

#[cfg(feature = "alloc")]
impl<A: Allocator> Drop for SystemArenaSource<A> {
    fn drop(&mut self) {
        if let Some(base) = self.base {
            if let Ok(layout) = Layout::from_size_align(self.capacity, WORD) {
                // Safety: `base` was allocated from `self.allocator` with
                // this exact layout in `reserve`, and is not used again.
                unsafe { self.allocator.deallocate(base, layout) };
            }
        }
    }
}

/// Tracks `first_chunk` and a guard address on top of an [`ArenaSource`].
/// Owns no chunk semantics of its own — see [`crate::chunk`] and
/// [`crate::alloc`].
pub(crate) struct Arena<S: ArenaSource> {
    source: S,
    first_chunk: Option<NonNull<u8>>,
    guard_addr: usize,
}

impl<S: ArenaSource> Arena<S> {
    pub(crate) fn new(source: S) -> Self {
        Arena {
            source,
            first_chunk: None,
            guard_addr: 0,
        }
    }

    /// Grows the arena by `n` bytes and returns the address of the first
    /// new byte, recording `first_chunk` on the first call and advancing
    /// the guard address past every extension.
    pub(crate) fn extend(&mut self, n: usize) -> Result<NonNull<u8>, AllocError> {
        let addr = self.source.extend(n)?;
        if self.first_chunk.is_none() {
            self.first_chunk = Some(addr);
        }
        self.guard_addr = addr.as_ptr() as usize + n;
        Ok(addr)
    }

    pub(crate) fn first_chunk(&self) -> Option<NonNull<u8>> {
        self.first_chunk
    }

    /// The address one past the last byte ever handed out by `extend`. The
    /// sole test for "is this the last chunk in the arena?".
    pub(crate) fn guard_addr(&self) -> usize {
        self.guard_addr
    }
}
