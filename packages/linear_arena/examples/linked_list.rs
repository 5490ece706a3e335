//! Walks through the core promise of offset-pointer handles: a linked list
//! is built in one byte region, the region is copied wholesale to a second
//! address, and the list is traversed from the copy without touching a
//! single link.
//!
//! In real deployments the "copy" is the same shared-memory segment mapped
//! at a different address in another process; two stack buffers make the
//! mechanics visible in one process.

use std::ptr::NonNull;

use linear_arena::LinearArena;
use offset_ptr::{SegmentPtr, segment_tag};

segment_tag!(struct DemoTag;);

/// A shared-memory-safe node: fixed layout, no raw pointers.
#[repr(C)]
struct Payload {
    id: u32,
    data: f32,
    next: SegmentPtr<Payload, DemoTag>,
}

const REGION_SIZE: usize = 4096;

#[repr(C, align(64))]
struct Region([u8; REGION_SIZE]);

fn in_region(addr: *const u8, region: &Region) -> bool {
    let base = region.0.as_ptr() as usize;
    (addr as usize) >= base && (addr as usize) < base + REGION_SIZE
}

fn dump_node(node: &Payload, region: &Region) {
    print!(
        "  id={} data={} at={:p} next_raw={:#x}",
        node.id, node.data, node, node.next.raw_storage()
    );

    let next = node.next.get();
    if next.is_null() {
        println!(" next=null");
    } else {
        println!(
            " next={next:p} next_in_region={}",
            if in_region(next.cast(), region) { "yes" } else { "no" }
        );
    }
}

fn main() {
    let mut region_a = Box::new(Region([0; REGION_SIZE]));
    let mut region_b = Box::new(Region([0; REGION_SIZE]));

    println!("Region A base: {:p}", region_a.0.as_ptr());
    println!("Region B base: {:p}", region_b.0.as_ptr());

    let base_a = NonNull::new(region_a.0.as_mut_ptr()).expect("stack buffer is non-null");

    // "Process A": an arena over region A; constructing it binds the tag.
    // SAFETY: region A outlives the arena and is only accessed through it.
    let arena: LinearArena<DemoTag> = unsafe { LinearArena::over(base_a, REGION_SIZE) };

    let n1 = arena
        .make_handle(Payload { id: 1, data: 10.5, next: SegmentPtr::null() })
        .expect("arena has room");
    let n2 = arena
        .make_handle(Payload { id: 2, data: 20.5, next: SegmentPtr::null() })
        .expect("arena has room");
    let n3 = arena
        .make_handle(Payload { id: 3, data: 30.5, next: SegmentPtr::null() })
        .expect("arena has room");

    // Link them: no absolute addresses are stored in the region.
    // SAFETY: the handles target live nodes; no aliasing references exist.
    unsafe {
        (*n1.get()).next = n2;
        (*n2.get()).next = n3;
    }

    println!("\nConstructed chain in region A:");
    // SAFETY: the handles decode into region A while the tag is bound to it.
    unsafe {
        dump_node(&*n1.get(), &region_a);
        dump_node(&*n2.get(), &region_a);
        dump_node(&*n3.get(), &region_a);
    }

    // "Relocation": copy the entire byte region. In real shared memory this
    // is the same segment mapped at a different base in another process.
    region_b.0.copy_from_slice(&region_a.0);

    // "Process B" registers its own mapping address.
    offset_ptr::bind::<DemoTag>(region_b.0.as_mut_ptr());

    println!("\nTraversing the migrated chain in region B:");
    let mut cur = region_b.0.as_ptr().cast::<Payload>();
    let mut visited = 0;

    while !cur.is_null() {
        assert!(
            in_region(cur.cast(), &region_b),
            "traversal escaped region B"
        );

        // SAFETY: the copied bytes hold valid nodes, and containment in
        // region B was just asserted.
        unsafe {
            dump_node(&*cur, &region_b);
            cur = (*cur).next.get();
        }

        visited += 1;
        assert!(visited < 16, "corrupted chain");
    }

    assert_eq!(visited, 3);
    println!("\nAll decoded pointers stayed within region B.");
}
