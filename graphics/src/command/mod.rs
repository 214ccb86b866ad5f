//! Command recording and submission.
//!
//! A [`CommandQueue`] owns a fence and a [`CommandAllocatorPool`]. A
//! [`CommandContext`] checks an allocator out of its queue, records commands,
//! and on [`finish`](CommandContext::finish) submits them and hands the
//! allocator back tagged with the fence value that proves it idle.
//!
//! ```text
//! request_allocator(completed) ──► record ──► execute ──► discard_allocator(fence)
//!          ▲                                                      │
//!          └──────────────── fence retired ◄──────────────────────┘
//! ```

mod allocator_pool;
mod context;
mod manager;
mod queue;

pub use allocator_pool::{CommandAllocator, CommandAllocatorPool};
pub use context::CommandContext;
pub use manager::CommandListManager;
pub use queue::CommandQueue;
