#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Lock-free bump allocation over caller-provided bytes, with relocatable
//! handles.
//!
//! [`LinearArena`] carves allocations out of a contiguous byte region —
//! typically a shared-memory segment — by advancing a single atomic cursor.
//! There is no per-object free and no free list: [`reset`][LinearArena::reset]
//! is the only reclamation, which makes allocation a short compare-exchange
//! loop that many threads can drive concurrently.
//!
//! What sets this arena apart from an ordinary bump allocator is its handle
//! type: [`alloc_handle`][LinearArena::alloc_handle] and
//! [`make_handle`][LinearArena::make_handle] return segment-anchored
//! [`offset_ptr`] values rather than raw pointers. Structures threaded with
//! such handles remain traversable after the backing bytes are mapped at a
//! different address, because every handle decodes against the segment base
//! registered for the arena's tag.
//!
//! # Quick start
//!
//! ```rust
//! use linear_arena::LinearArena;
//! use offset_ptr::segment_tag;
//! use std::ptr::NonNull;
//!
//! segment_tag!(struct ScratchTag;);
//!
//! let mut backing = vec![0_u8; 4096];
//! let region = NonNull::new(backing.as_mut_ptr()).unwrap();
//!
//! // SAFETY: `backing` outlives the arena and is not used directly while
//! // the arena hands out its bytes.
//! let arena: LinearArena<ScratchTag> = unsafe { LinearArena::over(region, 4096) };
//!
//! let handle = arena.make_handle(42_u64).expect("arena has room");
//! // SAFETY: the handle was just created by this arena.
//! assert_eq!(unsafe { *handle.get() }, 42);
//! ```
//!
//! Containers that need a growable buffer inside the arena use [`ArenaRef`],
//! the allocation adapter whose pointer type is an offset pointer, or
//! [`ShmVec`], the relocatable vector built on top of it.

mod adapter;
mod arena;
mod vec;

pub use adapter::{AllocError, ArenaRef};
pub use arena::LinearArena;
pub use vec::ShmVec;
