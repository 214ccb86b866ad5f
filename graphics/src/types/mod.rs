//! Plain data types shared by the backends and the resource layer.

mod command;
mod descriptor;
mod format;
mod resource;
mod state;
mod view;

pub use command::CommandListType;
pub use descriptor::{
    CpuDescriptorHandle, DescriptorHeapDesc, DescriptorHeapType, GpuDescriptorHandle,
};
pub use format::Format;
pub use resource::{
    GPU_VIRTUAL_ADDRESS_UNKNOWN, HeapDesc, HeapType, ResourceDesc, ResourceDimension,
    ResourceFlags, SubresourceData,
};
pub use state::ResourceState;
pub use view::{
    ConstantBufferViewDesc, ShaderResourceViewDesc, SrvDimension, UavDimension,
    UnorderedAccessViewDesc,
};
