//! Descriptor management.
//!
//! - [`DescriptorAllocator`] bump-allocates CPU-only descriptors out of
//!   fixed-size heaps drawn from a shared [`DescriptorHeapPool`]. Resources
//!   use it for their SRV/UAV/CBV slots.
//! - [`DescriptorHeap`] is a shader-visible heap with paired CPU/GPU handles,
//!   used by render code to build descriptor tables.
//!
//! Neither frees individual descriptors: heaps are released as a whole.

mod allocator;
mod handle;
mod heap;

pub use allocator::{DescriptorAllocator, DescriptorAllocators, DescriptorHeapPool};
pub use handle::DescriptorHandle;
pub use heap::DescriptorHeap;
