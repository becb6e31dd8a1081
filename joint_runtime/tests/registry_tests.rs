//! Registry behaviour once the process is live: concurrent lookups against
//! late joins, snapshots, and shutdown through the guard.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use joint_runtime::{BoxError, Close, Joinable, Registry, RegistryError};

trait Backend: Send + Sync {
    fn generation(&self) -> usize;
}

struct Gen(usize);

impl Backend for Gen {
    fn generation(&self) -> usize {
        self.0
    }
}

fn backend(generation: usize) -> Joinable {
    let g = Arc::new(Gen(generation));
    Joinable::new(g.clone()).provide::<dyn Backend>(g)
}

#[test]
fn test_concurrent_readers_see_whole_joins() {
    const READERS: usize = 4;
    const JOINS: usize = 200;

    let registry = Arc::new(Registry::new());
    registry.join(backend(0), "backend").unwrap();
    let barrier = Barrier::new(READERS + 1);

    thread::scope(|s| {
        for _ in 0..READERS {
            s.spawn(|| {
                barrier.wait();
                let mut last = 0;
                for _ in 0..2_000 {
                    let current = registry
                        .interface::<dyn Backend>("backend")
                        .unwrap()
                        .expect("always bound")
                        .generation();
                    // Last-write-wins never goes backwards.
                    assert!(current >= last);
                    last = current;

                    // A scan is a consistent prefix of the join history.
                    let all = registry.interfaces_all::<dyn Backend>();
                    for (i, (key, b)) in all.iter().enumerate() {
                        assert_eq!(key.as_str(), "backend");
                        assert_eq!(b.generation(), i);
                    }
                }
            });
        }

        s.spawn(|| {
            barrier.wait();
            for generation in 1..=JOINS {
                registry.join(backend(generation), "backend").unwrap();
            }
        });
    });

    assert_eq!(registry.len(), JOINS + 1);
    assert_eq!(
        registry
            .require::<dyn Backend>("backend")
            .unwrap()
            .generation(),
        JOINS
    );
}

#[test]
fn test_snapshot_serializes() {
    let registry = Registry::new();
    registry.join(backend(1), "primary").unwrap();
    registry.join(backend(2), "primary").unwrap();

    let json = serde_json::to_value(registry.snapshot()).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["key"], "primary");
    assert_eq!(entries[0]["superseded"], true);
    assert_eq!(entries[1]["superseded"], false);
    assert_eq!(entries[1]["closable"], false);
    assert!(entries[1]["joined_by"].is_null());
}

struct Counted(Arc<AtomicUsize>);

impl Close for Counted {
    fn close(&self) -> Result<(), BoxError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_guard_close_reports_and_blocks_late_joins() {
    let closes = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(Registry::new());
    for key in ["a", "b", "c"] {
        let c = Arc::new(Counted(closes.clone()));
        registry
            .join(Joinable::new(c.clone()).with_close(c), key)
            .unwrap();
    }

    let guard = registry.close_on_drop();
    guard.close().unwrap();

    assert_eq!(closes.load(Ordering::SeqCst), 3);
    assert_eq!(
        registry.join(backend(9), "late"),
        Err(RegistryError::Closed)
    );
    assert!(
        registry
            .interface::<dyn Backend>("a")
            .unwrap()
            .is_none()
    );
}
