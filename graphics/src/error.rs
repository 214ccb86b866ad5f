//! Graphics error types.

use std::fmt;

/// Errors reported by the GPU layer.
///
/// Device calls that fail surface here and are propagated to the caller,
/// which treats them as unrecoverable for the resource being created.
/// Programming errors (heap overflow, out-of-range views) panic instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to bring up the backend or device.
    InitializationFailed(String),
    /// The requested backend was not compiled in.
    BackendUnavailable(String),
    /// A device object (heap, allocator, fence, resource) could not be created.
    ResourceCreationFailed(String),
    /// Out of GPU memory.
    OutOfMemory,
    /// The GPU device was lost.
    DeviceLost,
    /// A command list could not be recorded or submitted.
    SubmissionFailed(String),
    /// A CPU-visible resource could not be mapped or was accessed out of range.
    MapFailed(String),
    /// An invalid parameter was provided.
    InvalidParameter(String),
    /// An internal error occurred.
    Internal(String),
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationFailed(msg) => write!(f, "initialization failed: {msg}"),
            Self::BackendUnavailable(msg) => write!(f, "backend unavailable: {msg}"),
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::OutOfMemory => write!(f, "out of GPU memory"),
            Self::DeviceLost => write!(f, "GPU device lost"),
            Self::SubmissionFailed(msg) => write!(f, "command submission failed: {msg}"),
            Self::MapFailed(msg) => write!(f, "resource mapping failed: {msg}"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for GraphicsError {}
