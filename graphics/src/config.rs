//! Configuration for [`GraphicsCore`](crate::GraphicsCore).

/// Which device implementation to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// Headless software device.
    #[default]
    Dummy,
    /// Native Vulkan device (requires the `vulkan-backend` feature).
    Vulkan,
}

/// Number of frames the CPU may record ahead of the GPU.
pub const NUM_FRAMES_IN_FLIGHT: usize = 3;

/// Settings for the GPU layer.
///
/// # Example
///
/// ```
/// use ember_graphics::{BackendType, GraphicsConfig};
///
/// let config = GraphicsConfig::new()
///     .with_backend(BackendType::Dummy)
///     .with_descriptors_per_heap(1024)
///     .with_texture_root("Textures");
/// assert_eq!(config.descriptors_per_heap, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsConfig {
    pub backend: BackendType,
    /// Fail instead of falling back to the dummy device when `backend` is unavailable.
    pub require_backend: bool,
    /// Enable API validation layers.
    pub validation: bool,
    pub application_name: String,
    /// Capacity of each heap the descriptor allocators draw from.
    pub descriptors_per_heap: u32,
    /// Directory prepended to texture paths before they are read.
    pub texture_root: String,
    /// Maximum number of transition barriers buffered before a flush.
    pub max_pending_barriers: usize,
}

impl GraphicsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_required_backend(mut self, required: bool) -> Self {
        self.require_backend = required;
        self
    }

    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    pub fn with_descriptors_per_heap(mut self, count: u32) -> Self {
        self.descriptors_per_heap = count;
        self
    }

    pub fn with_texture_root(mut self, root: impl Into<String>) -> Self {
        self.texture_root = root.into();
        self
    }

    pub fn with_max_pending_barriers(mut self, count: usize) -> Self {
        self.max_pending_barriers = count;
        self
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::Dummy,
            require_backend: false,
            validation: cfg!(debug_assertions),
            application_name: "Ember".to_string(),
            descriptors_per_heap: 256,
            texture_root: String::new(),
            max_pending_barriers: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GraphicsConfig::default();
        assert_eq!(config.backend, BackendType::Dummy);
        assert_eq!(config.descriptors_per_heap, 256);
        assert_eq!(config.max_pending_barriers, 16);
        assert!(config.texture_root.is_empty());
    }

    #[test]
    fn builder_overrides() {
        let config = GraphicsConfig::new()
            .with_backend(BackendType::Vulkan)
            .with_required_backend(true)
            .with_validation(false)
            .with_application_name("stress");
        assert_eq!(config.backend, BackendType::Vulkan);
        assert!(config.require_backend);
        assert!(!config.validation);
        assert_eq!(config.application_name, "stress");
    }
}
