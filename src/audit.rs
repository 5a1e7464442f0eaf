//! Diagnostic inspection of an allocator's arena and free tree.
//!
//! Nothing here is load-bearing for `allocate`/`free`: this module only
//! reads what [`crate::chunk`] and [`crate::tree`] already expose, for
//! debugging and for the property tests that check invariants across an
//! allocator's whole chunk sequence.

use core::fmt;

use crate::alloc::Allocator;
use crate::arena::ArenaSource;
use crate::chunk::ChunkRef;

/// A snapshot of an allocator's shape at the moment it was taken.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuditReport {
    pub chunk_count: usize,
    pub free_bytes: usize,
    pub largest_free_chunk: usize,
    pub tree_depth: usize,
}

impl<S: ArenaSource> Allocator<S> {
    /// Walks every chunk from `first_chunk` to the guard address and
    /// summarizes free space and tree shape. Returns the default report
    /// (all zero) for an allocator that has never allocated.
    pub fn audit_report(&self) -> AuditReport {
        let Some(pad) = self.pad() else {
            return AuditReport::default();
        };
        let Some(first) = self.first_chunk() else {
            return AuditReport::default();
        };

        let mut report = AuditReport::default();
        let mut addr = first.as_ptr() as usize;
        while addr != self.guard_addr() {
            // Safety: `addr` walks chunk headers between `first_chunk` and
            // the guard address, each one valid by construction.
            let chunk = ChunkRef::from_header_addr(unsafe {
                core::ptr::NonNull::new_unchecked(addr as *mut u8)
            });
            report.chunk_count += 1;
            if !chunk.in_use() {
                report.free_bytes += chunk.size();
                report.largest_free_chunk = report.largest_free_chunk.max(chunk.size());
            }
            addr = chunk.next_header_addr(&pad);
        }

        report.tree_depth = tree_depth(self, &pad);
        report
    }

    /// Renders a human-readable dump of arena chunks (in arena order) and
    /// the free tree (in size order) to `sink`. Format is not contractual
    /// and may change between versions.
    pub fn audit_dump(&self, sink: &mut dyn fmt::Write) -> fmt::Result {
        let Some(pad) = self.pad() else {
            return writeln!(sink, "(allocator has never allocated)");
        };
        let Some(first) = self.first_chunk() else {
            return writeln!(sink, "(allocator has never allocated)");
        };

        writeln!(sink, "arena: first_chunk={:#x} guard={:#x}", first.as_ptr() as usize, self.guard_addr())?;

        let mut addr = first.as_ptr() as usize;
        while addr != self.guard_addr() {
            let chunk = ChunkRef::from_header_addr(unsafe {
                core::ptr::NonNull::new_unchecked(addr as *mut u8)
            });
            writeln!(
                sink,
                "  chunk {:#x}: size={} in_use={}",
                addr,
                chunk.size(),
                chunk.in_use()
            )?;
            addr = chunk.next_header_addr(&pad);
        }

        writeln!(sink, "free tree (size order):")?;
        let mut result = Ok(());
        self.tree().visit_inorder(&pad, &mut |chunk| {
            if result.is_ok() {
                result = writeln!(sink, "  free {:#x}: size={}", chunk.addr(), chunk.size());
            }
        });
        result
    }
}

fn tree_depth<S: ArenaSource>(allocator: &Allocator<S>, pad: &crate::chunk::Pad) -> usize {
    fn depth(pad: &crate::chunk::Pad, node: Option<ChunkRef>) -> usize {
        match node {
            None => 0,
            Some(node) => 1 + depth(pad, node.left(pad)).max(depth(pad, node.right(pad))),
        }
    }
    depth(pad, allocator.tree().root)
}
