//! Segment lifecycle: create/open modes, size rules, name rules, removal.

use shm_segment::{Error, OpenMode, Segment};

/// A name unique to this process and test, so concurrent test runs never
/// collide on the OS namespace.
fn unique_name(suffix: &str) -> String {
    format!("/shm_segment_test_{}_{suffix}", std::process::id())
}

/// Removes the name on drop, so failing tests do not leak OS objects.
struct NameGuard(String);

impl Drop for NameGuard {
    fn drop(&mut self) {
        let _ = Segment::remove(&self.0);
    }
}

fn guarded(suffix: &str) -> NameGuard {
    let name = unique_name(suffix);
    // Best-effort cleanup from prior crashed runs.
    let _ = Segment::remove(&name);
    NameGuard(name)
}

#[test]
fn create_then_open_shares_bytes() {
    let guard = guarded("share");
    let name = &guard.0;

    const SIZE: usize = 1 << 20;

    let producer = Segment::create(name, SIZE).expect("fresh name must create");
    assert!(producer.created_here());
    assert!(producer.size() >= SIZE);
    assert_eq!(producer.name(), name);

    let consumer = Segment::open(name).expect("existing name must open");
    assert!(!consumer.created_here());
    assert!(consumer.size() >= SIZE);

    // Two views of the same object in one process map at distinct bases.
    assert_ne!(producer.base(), consumer.base());

    // Writes through one view are the other view's bytes.
    // SAFETY: both bases map at least SIZE bytes; offsets are in bounds.
    unsafe {
        producer.base().as_ptr().add(17).write(0xA5);
        assert_eq!(consumer.base().as_ptr().add(17).read(), 0xA5);
    }
}

#[test]
fn created_bytes_are_zeroed() {
    let guard = guarded("zeroed");

    let segment = Segment::create(&guard.0, 64 << 10).expect("fresh name must create");

    // Probe a spread of offsets rather than all 64 KiB.
    for offset in [0_usize, 1, 4095, 4096, (64 << 10) - 1] {
        // SAFETY: every offset is within the mapped size.
        let byte = unsafe { segment.base().as_ptr().add(offset).read() };
        assert_eq!(byte, 0, "byte at {offset} must be zero");
    }
}

#[test]
fn create_only_rejects_existing() {
    let guard = guarded("conflict");

    let _held = Segment::create(&guard.0, 4096).expect("fresh name must create");

    match Segment::create(&guard.0, 4096) {
        Err(Error::AlreadyExists { name }) => assert_eq!(name, guard.0),
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
}

#[test]
fn open_only_rejects_missing() {
    let name = unique_name("missing");

    match Segment::open(&name) {
        Err(Error::NotFound { name: reported }) => assert_eq!(reported, name),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn open_or_create_takes_both_paths() {
    let guard = guarded("either");

    let first = Segment::open_or_create(&guard.0, 8192).expect("must create");
    assert!(first.created_here());

    let second = Segment::open_or_create(&guard.0, 8192).expect("must open");
    assert!(!second.created_here());
    assert_ne!(first.base(), second.base());
}

#[test]
fn smaller_request_adopts_existing_size() {
    let guard = guarded("adopt");

    const EXISTING: usize = 2 << 20;

    let _held = Segment::create(&guard.0, EXISTING).expect("fresh name must create");

    let opened = Segment::builder(&guard.0)
        .size(1 << 20)
        .mode(OpenMode::OpenOnly)
        .build()
        .expect("smaller request must open");

    assert!(opened.size() >= EXISTING);
}

#[test]
fn larger_request_is_a_size_conflict() {
    let guard = guarded("too_small");

    const EXISTING: usize = 1 << 20;

    let _held = Segment::create(&guard.0, EXISTING).expect("fresh name must create");

    match Segment::builder(&guard.0)
        .size(4 << 20)
        .mode(OpenMode::OpenOnly)
        .build()
    {
        Err(Error::SizeConflict {
            existing,
            requested,
            ..
        }) => {
            assert!(existing >= EXISTING);
            assert!(existing < 4 << 20);
            assert_eq!(requested, 4 << 20);
        }
        other => panic!("expected SizeConflict, got {other:?}"),
    }
}

#[test]
fn creating_modes_require_a_size() {
    let name = unique_name("no_size");

    match Segment::create(&name, 0) {
        Err(Error::InvalidArgument { .. }) => {}
        other => panic!("expected InvalidArgument, got {other:?}"),
    }

    match Segment::open_or_create(&name, 0) {
        Err(Error::InvalidArgument { .. }) => {}
        other => panic!("expected InvalidArgument, got {other:?}"),
    }
}

#[test]
fn malformed_names_are_rejected_up_front() {
    for name in ["", "/", "no_slash", "/nested/name"] {
        match Segment::create(name, 4096) {
            Err(Error::InvalidName { .. }) => {}
            other => panic!("expected InvalidName for {name:?}, got {other:?}"),
        }

        match Segment::remove(name) {
            Err(Error::InvalidName { .. }) => {}
            other => panic!("expected InvalidName for {name:?}, got {other:?}"),
        }
    }
}

#[test]
fn drop_keeps_the_name_alive() {
    let guard = guarded("persist");

    {
        let segment = Segment::create(&guard.0, 4096).expect("fresh name must create");
        // SAFETY: offset 0 is within the mapping.
        unsafe {
            segment.base().as_ptr().write(0x5A);
        }
        // The mapping goes away here; the name must not.
    }

    if cfg!(windows) {
        // A named section dies with its last handle; nothing to reopen.
        return;
    }

    let reopened = Segment::open(&guard.0).expect("dropping must not unlink");
    // SAFETY: offset 0 is within the mapping.
    assert_eq!(unsafe { reopened.base().as_ptr().read() }, 0x5A);
}

#[test]
fn remove_is_idempotent_and_final() {
    let name = unique_name("removable");

    let segment = Segment::create(&name, 4096).expect("fresh name must create");
    drop(segment);

    Segment::remove(&name).expect("first removal succeeds");
    Segment::remove(&name).expect("second removal is a no-op");

    if cfg!(unix) {
        match Segment::open(&name) {
            Err(Error::NotFound { .. }) => {}
            other => panic!("expected NotFound after removal, got {other:?}"),
        }
    }
}

#[test]
fn segments_cross_threads() {
    static_assertions::assert_impl_all!(Segment: Send, Sync, std::fmt::Debug);

    let guard = guarded("threaded");

    let segment = Segment::create(&guard.0, 4096).expect("fresh name must create");

    // A mapping created on one thread is usable from another.
    let base_addr = std::thread::scope(|scope| {
        scope
            .spawn(|| {
                // SAFETY: offset 0 is within the mapping.
                unsafe {
                    segment.base().as_ptr().write(7);
                }
                segment.base().as_ptr() as usize
            })
            .join()
            .expect("worker must not panic")
    });

    assert_eq!(base_addr, segment.base().as_ptr() as usize);
}
