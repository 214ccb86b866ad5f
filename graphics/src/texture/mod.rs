//! Managed texture cache.
//!
//! [`TextureManager::load_from_file`] maps a file path to a shared,
//! reference-counted [`ManagedTexture`]. Each key moves through
//! `Loading -> Valid | Invalid` exactly once while it is cached; the
//! [`TextureCache`] evicts it when the last [`TextureRef`] goes away.

mod cache;
mod defaults;
mod loader;
mod managed;
mod manager;

pub use cache::TextureCache;
pub use defaults::{DefaultTexture, DefaultTextures};
pub use managed::{ManagedTexture, TextureLoadState, TextureRef};
pub use manager::TextureManager;
