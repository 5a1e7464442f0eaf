use bstalloc::Allocator;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const SIZES: [usize; 3] = [127, 1752, 45213];

/// Pure bump-path throughput: every allocation extends the arena, the free
/// tree never gets a chance to satisfy a request.
fn bench_fresh_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation/fresh");
    for size in SIZES {
        group.bench_function(format!("alloc 32 bytes x {size}"), |b| {
            b.iter(|| {
                let mut a = Allocator::with_capacity(64 << 20);
                for _ in 0..size {
                    black_box(a.allocate(32).unwrap());
                }
            })
        });
    }
    group.finish();
}

/// Allocate-then-free-immediately: every request after the first is a tree
/// hit against the chunk just vacated, never a fresh `extend`.
fn bench_reuse(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation/reuse");
    for size in SIZES {
        group.bench_function(format!("alloc-free 32 bytes x {size}"), |b| {
            b.iter(|| {
                let mut a = Allocator::with_capacity(64 << 20);
                for _ in 0..size {
                    let ptr = black_box(a.allocate(32).unwrap());
                    unsafe { a.free(ptr) };
                }
            })
        });
    }
    group.finish();
}

/// Round-robin retention: every third allocation is freed, exercising the
/// free tree's `find_and_remove_fit` against a mix of sizes instead of a
/// single repeatedly-reused chunk.
fn bench_mixed_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation/mixed-churn");
    for size in SIZES {
        group.bench_function(format!("churn x {size}"), |b| {
            b.iter(|| {
                let mut a = Allocator::with_capacity(64 << 20);
                let mut live = Vec::with_capacity(size);
                for i in 0..size {
                    let request = 16 + (i % 7) * 32;
                    live.push(black_box(a.allocate(request).unwrap()));
                    if live.len() > 2 {
                        let ptr = live.remove(0);
                        unsafe { a.free(ptr) };
                    }
                }
                for ptr in live {
                    unsafe { a.free(ptr) };
                }
            })
        });
    }
    group.finish();
}

/// Worst case for coalescing: allocate a run of same-size chunks, then free
/// every one of them, forcing backward+forward coalesce on most frees.
fn bench_coalesce(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation/coalesce");
    for size in SIZES {
        group.bench_function(format!("alloc-all-then-free-all x {size}"), |b| {
            b.iter(|| {
                let mut a = Allocator::with_capacity(64 << 20);
                let mut live = Vec::with_capacity(size);
                for _ in 0..size {
                    live.push(a.allocate(48).unwrap());
                }
                for ptr in live {
                    unsafe { black_box(a.free(ptr)) };
                }
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_fresh_allocation,
    bench_reuse,
    bench_mixed_churn,
    bench_coalesce
);
criterion_main!(benches);
