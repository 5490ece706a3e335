//! The full producer/consumer handoff: a vector is built inside a named
//! segment through one mapping, the mapping is destroyed, and a second
//! mapping of the same segment — at a different base — reads it back.
//!
//! This simulates two processes without fork/exec by holding two views of
//! the same OS object in one process. If any structure stored a raw
//! pointer, it would point into the first (unmapped) view and fail the
//! containment checks.

use linear_arena::{ArenaRef, LinearArena, ShmVec};
use offset_ptr::{SegmentPtr, segment_tag};
use shm_segment::Segment;

segment_tag!(struct HandoffTag;);

type Arena = LinearArena<HandoffTag>;
type Vec32<'a> = ShmVec<'a, i32, HandoffTag>;
type VecHandle = SegmentPtr<Vec32<'static>, HandoffTag>;

const SEGMENT_SIZE: usize = 64 << 20;

fn unique_name() -> String {
    format!("/shm_segment_test_{}_handoff", std::process::id())
}

#[test]
fn vector_survives_mapping_handoff() {
    let name = unique_name();
    let _ = Segment::remove(&name);

    let consumer;
    let handle_offset;

    {
        let producer = Segment::create(&name, SEGMENT_SIZE).expect("fresh name must create");

        // Arena header at offset zero: allocator and rendezvous point in
        // one. Constructing it binds the tag to the producer mapping.
        // SAFETY: the mapping is page-aligned, zeroed, read-write, and
        // outlives the arena uses below.
        let arena_ptr = unsafe { Arena::emplace_at_base(producer.base(), producer.size()) };
        // SAFETY: emplace_at_base initialized the header.
        let arena = unsafe { arena_ptr.as_ref() };

        // The first allocation after the header holds the vector handle,
        // giving the consumer a fixed, computable location.
        let slot = arena.make_handle(VecHandle::null()).expect("segment has room");
        handle_offset = slot.get() as usize - producer.base().as_ptr() as usize;
        assert_eq!(handle_offset, size_of::<Arena>());

        let vec_handle = arena
            .make_handle(Vec32::new_in(ArenaRef::new(arena)))
            .expect("segment has room");

        // SAFETY: the slot was just allocated and nothing else aliases it.
        unsafe {
            *slot.get() = vec_handle.cast::<Vec32<'static>>();
        }

        // SAFETY: the vector handle targets the vector just constructed.
        let vec = unsafe { &mut *vec_handle.get() };

        vec.push(100);
        vec.push(200);
        vec.push(300);
        for i in 0..2048 {
            vec.push(i ^ 0x55AA);
        }

        assert_eq!(vec.len(), 3 + 2048);
        assert_eq!(vec[0], 100);
        assert_eq!(vec[1], 200);
        assert_eq!(vec[2], 300);

        // Map the consumer view while the producer is still alive, to
        // guarantee a distinct base address.
        consumer = Segment::open(&name).expect("existing name must open");
        assert_ne!(consumer.base(), producer.base());

        // The producer mapping is destroyed here. Raw pointers into it are
        // now dangling; offset pointers are not, once the tag moves over.
    }

    consumer.bind::<HandoffTag>();

    let base = consumer.base().as_ptr() as usize;
    let size = consumer.size();
    let in_view = |addr: usize| addr >= base && addr < base + size;

    // SAFETY: the handle slot lies at the recorded offset in the shared
    // bytes; it is only read.
    let handle = unsafe {
        *consumer
            .base()
            .as_ptr()
            .add(handle_offset)
            .cast::<VecHandle>()
    };
    assert!(!handle.is_null());

    let vec_addr = handle.get() as usize;
    assert!(in_view(vec_addr), "vector header must decode into this view");

    // SAFETY: the shared bytes hold the vector the producer built; the
    // consumer only reads it.
    let vec = unsafe { &*handle.get() };

    // Check containment before touching element storage: a raw data
    // pointer would aim at the dead producer view.
    let data_addr = vec.data_handle().get() as usize;
    assert!(in_view(data_addr), "vector data must decode into this view");

    assert_eq!(vec.len(), 3 + 2048);
    assert_eq!(vec[0], 100);
    assert_eq!(vec[1], 200);
    assert_eq!(vec[2], 300);
    for k in [0_i32, 1024, 2047] {
        assert_eq!(vec[3 + k as usize], k ^ 0x55AA);
    }

    drop(consumer);
    Segment::remove(&name).expect("cleanup");
}
