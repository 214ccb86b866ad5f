use std::ops::Deref;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::descriptor::DescriptorHandle;
use crate::resource::Texture;

use super::TextureCache;

/// Progress of a cached texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureLoadState {
    /// The file is still being read, decoded or uploaded.
    Loading,
    /// The texture was loaded and its own view is bound.
    Valid,
    /// Loading failed; the view shows a fallback texture.
    Invalid,
}

struct LoadSlot {
    state: TextureLoadState,
    texture: Option<Texture>,
    srv: DescriptorHandle,
}

/// A texture owned by the [`TextureCache`], shared by every [`TextureRef`]
/// to its key.
pub struct ManagedTexture {
    key: String,
    slot: Mutex<LoadSlot>,
    loaded: Condvar,
}

impl ManagedTexture {
    pub(crate) fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            slot: Mutex::new(LoadSlot {
                state: TextureLoadState::Loading,
                texture: None,
                srv: DescriptorHandle::NULL,
            }),
            loaded: Condvar::new(),
        }
    }

    /// Cache key: the normalized path, plus `_sRGB` when sRGB was forced.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> TextureLoadState {
        self.slot.lock().state
    }

    pub fn is_valid(&self) -> bool {
        self.state() == TextureLoadState::Valid
    }

    /// Block until the texture has left [`TextureLoadState::Loading`].
    pub fn wait_for_load(&self) -> TextureLoadState {
        let mut slot = self.slot.lock();
        while slot.state == TextureLoadState::Loading {
            self.loaded.wait(&mut slot);
        }
        slot.state
    }

    /// View to bind for this texture. Null while loading.
    pub fn srv(&self) -> DescriptorHandle {
        self.slot.lock().srv
    }

    /// Width and height of the loaded texture, `None` unless valid.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.slot
            .lock()
            .texture
            .as_ref()
            .map(|texture| (texture.width(), texture.height()))
    }

    pub(crate) fn complete(&self, texture: Texture) {
        self.publish(TextureLoadState::Valid, texture.srv(), Some(texture));
    }

    pub(crate) fn fail(&self, fallback_srv: DescriptorHandle) {
        self.publish(TextureLoadState::Invalid, fallback_srv, None);
    }

    fn publish(&self, state: TextureLoadState, srv: DescriptorHandle, texture: Option<Texture>) {
        let mut slot = self.slot.lock();
        debug_assert_eq!(
            slot.state,
            TextureLoadState::Loading,
            "texture '{}' loaded twice",
            self.key
        );
        slot.state = state;
        slot.srv = srv;
        slot.texture = texture;
        drop(slot);
        self.loaded.notify_all();
    }
}

impl std::fmt::Debug for ManagedTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("ManagedTexture")
            .field("key", &self.key)
            .field("state", &slot.state)
            .field("srv", &slot.srv)
            .finish()
    }
}

/// Counted handle to a cached texture.
///
/// Cloning adds a reference; dropping the last one evicts the key from the
/// cache and releases the texture.
pub struct TextureRef {
    cache: Arc<TextureCache>,
    texture: Arc<ManagedTexture>,
}

impl TextureRef {
    /// Wrap a reference already counted by `cache`.
    pub(crate) fn adopt(cache: Arc<TextureCache>, texture: Arc<ManagedTexture>) -> Self {
        Self { cache, texture }
    }

    pub fn texture(&self) -> &Arc<ManagedTexture> {
        &self.texture
    }

    /// Whether both handles refer to the same cached texture.
    pub fn ptr_eq(&self, other: &TextureRef) -> bool {
        Arc::ptr_eq(&self.texture, &other.texture)
    }
}

impl Deref for TextureRef {
    type Target = ManagedTexture;

    fn deref(&self) -> &ManagedTexture {
        &self.texture
    }
}

impl Clone for TextureRef {
    fn clone(&self) -> Self {
        self.cache.retain(&self.texture);
        Self {
            cache: self.cache.clone(),
            texture: self.texture.clone(),
        }
    }
}

impl Drop for TextureRef {
    fn drop(&mut self) {
        self.cache.release(&self.texture);
    }
}

impl std::fmt::Debug for TextureRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TextureRef").field(&self.texture).finish()
    }
}

static_assertions::assert_impl_all!(TextureRef: Send, Sync);
static_assertions::assert_impl_all!(ManagedTexture: Send, Sync);
