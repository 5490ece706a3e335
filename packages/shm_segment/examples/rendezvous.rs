//! Creates a named segment, builds a small structure inside it, then reads
//! the structure back through a second, independently mapped view — the
//! single-process version of a producer and a consumer process meeting in
//! shared memory.

use linear_arena::LinearArena;
use offset_ptr::{SegmentPtr, segment_tag};
use shm_segment::Segment;

segment_tag!(struct RendezvousTag;);

type Arena = LinearArena<RendezvousTag>;

#[repr(C)]
struct Message {
    sequence: u64,
    payload: [u8; 24],
    next: SegmentPtr<Message, RendezvousTag>,
}

fn main() -> Result<(), shm_segment::Error> {
    let name = format!("/rendezvous_demo_{}", std::process::id());
    let _ = Segment::remove(&name);

    let producer = Segment::create(&name, 1 << 20)?;
    println!("producer mapping at {:p}", producer.base().as_ptr());

    // Arena header at offset zero; constructing it binds the tag.
    // SAFETY: the fresh mapping is page-aligned, zeroed and read-write.
    let arena_ptr = unsafe { Arena::emplace_at_base(producer.base(), producer.size()) };
    // SAFETY: emplace_at_base initialized the header.
    let arena = unsafe { arena_ptr.as_ref() };

    // A two-message chain; the first allocation after the header is the
    // agreed rendezvous location.
    let first = arena
        .make_handle(Message {
            sequence: 1,
            payload: *b"hello from the producer ",
            next: SegmentPtr::null(),
        })
        .expect("segment has room");
    let second = arena
        .make_handle(Message {
            sequence: 2,
            payload: *b"offsets, not addresses  ",
            next: SegmentPtr::null(),
        })
        .expect("segment has room");

    // SAFETY: the handle targets the message just constructed.
    unsafe {
        (*first.get()).next = second;
    }

    // The consumer: a second view of the same object, at its own base.
    let consumer = Segment::open(&name)?;
    println!("consumer mapping at {:p}", consumer.base().as_ptr());
    drop(producer);

    // Re-point the tag at the consumer view; every handle follows.
    consumer.bind::<RendezvousTag>();

    // SAFETY: the first message sits right after the arena header.
    let mut cursor = unsafe {
        consumer
            .base()
            .as_ptr()
            .add(std::mem::size_of::<Arena>())
            .cast::<Message>()
    };

    while !cursor.is_null() {
        // SAFETY: the shared bytes hold the chain built above; the
        // consumer only reads it.
        unsafe {
            let message = &*cursor;
            println!(
                "message {} at {:p}: {}",
                message.sequence,
                cursor,
                String::from_utf8_lossy(&message.payload),
            );
            cursor = message.next.get();
        }
    }

    drop(consumer);
    Segment::remove(&name)?;

    Ok(())
}
