//! Registry lookup benchmarks

use criterion::{Criterion, criterion_group, criterion_main};
use joint_runtime::{Joinable, Registry};
use std::hint::black_box;
use std::sync::{Arc, Barrier};
use std::thread;

trait Probe: Send + Sync {
    fn value(&self) -> u64;
}

struct Fixed(u64);

impl Probe for Fixed {
    fn value(&self) -> u64 {
        self.0
    }
}

/// Registry with `n` probes under distinct keys.
fn populated(n: u64) -> Arc<Registry> {
    let registry = Arc::new(Registry::new());
    for i in 0..n {
        let probe = Arc::new(Fixed(i));
        registry
            .join(
                Joinable::new(probe.clone()).provide::<dyn Probe>(probe),
                format!("probe_{i}"),
            )
            .unwrap();
    }
    registry
}

/// Benchmark single-threaded lookups by key and by capability
fn bench_single_reader(c: &mut Criterion) {
    let registry = populated(64);

    c.bench_function("interface_by_key", |b| {
        b.iter(|| {
            let probe = registry
                .interface::<dyn Probe>(black_box("probe_31"))
                .unwrap()
                .unwrap();
            black_box(probe.value());
        });
    });

    c.bench_function("interfaces_all_64", |b| {
        b.iter(|| {
            let all = registry.interfaces_all::<dyn Probe>();
            black_box(all.len());
        });
    });
}

/// Benchmark 8 concurrent readers sharing the read lock
fn bench_concurrent_readers(c: &mut Criterion) {
    let registry = populated(64);

    c.bench_function("concurrent_8_readers", |b| {
        b.iter(|| {
            let barrier = Arc::new(Barrier::new(9)); // 8 readers + main thread
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let registry = registry.clone();
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        for _ in 0..100 {
                            let probe = registry
                                .interface::<dyn Probe>("probe_7")
                                .unwrap()
                                .unwrap();
                            black_box(probe.value());
                        }
                    })
                })
                .collect();

            barrier.wait();
            for handle in handles {
                handle.join().unwrap();
            }
        });
    });
}

criterion_group!(benches, bench_single_reader, bench_concurrent_readers);
criterion_main!(benches);
