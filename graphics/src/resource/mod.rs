//! GPU resources.
//!
//! Every resource wraps a [`GpuResource`], which tracks the usage state the
//! CPU believes the resource is in. Buffers come in three view flavors
//! (see [`BufferKind`]) plus CPU-visible [`UploadBuffer`]s and
//! [`ReadbackBuffer`]s. [`Texture`]s hold pixel data with one SRV.

mod buffer;
mod gpu_resource;
mod heap;
mod readback;
mod texture;
mod upload;

pub use buffer::{BufferKind, ConstantBufferView, GpuBuffer, IndexBufferView, VertexBufferView};
pub use gpu_resource::GpuResource;
pub use heap::GpuHeap;
pub use readback::ReadbackBuffer;
pub use texture::Texture;
pub use upload::{UploadBuffer, UploadMapping};
