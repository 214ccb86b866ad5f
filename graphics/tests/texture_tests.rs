//! Integration tests for the managed texture cache.
//!
//! Textures are served from an in-memory source mounted as the default
//! source, under the `Textures` root.

mod common;

use std::sync::Barrier;
use std::thread;

use rstest::rstest;

use common::{Backend, TestContext, png};
use ember_graphics::{DefaultTexture, TextureLoadState};

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_concurrent_requests_share_one_load(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    ctx.files.insert("Textures/shared.png", png(8, 8, [200, 100, 50, 255]));

    const THREADS: usize = 8;
    let barrier = Barrier::new(THREADS);
    let textures = ctx.core.textures();

    let refs: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    let texture =
                        textures.load_from_file("shared.png", DefaultTexture::Magenta2D, true);
                    assert_eq!(texture.wait_for_load(), TextureLoadState::Valid);
                    texture
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert_eq!(ctx.files.read_count(), 1);
    assert_eq!(textures.load_count(), 1);
    assert!(refs.windows(2).all(|pair| pair[0].ptr_eq(&pair[1])));
    assert_eq!(textures.cache().ref_count("shared.png_sRGB"), Some(THREADS));
    assert_eq!(refs[0].dimensions(), Some((8, 8)));

    drop(refs);
    assert!(!textures.cache().contains("shared.png_sRGB"));
    assert_eq!(textures.cache().eviction_count(), 1);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_missing_and_empty_files_fall_back(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    ctx.files.insert("Textures/empty.png", Vec::new());
    let textures = ctx.core.textures();

    let missing = textures.load_from_file("nope.png", DefaultTexture::BlackOpaque2D, false);
    assert_eq!(missing.state(), TextureLoadState::Invalid);
    assert_eq!(missing.srv(), textures.defaults().srv(DefaultTexture::BlackOpaque2D));

    let empty = textures.load_from_file("empty.png", DefaultTexture::DefaultNormalMap, false);
    assert_eq!(empty.state(), TextureLoadState::Invalid);
    assert_eq!(empty.srv(), textures.defaults().srv(DefaultTexture::DefaultNormalMap));

    // Failed entries stay cached while referenced.
    let again = textures.load_from_file("nope.png", DefaultTexture::BlackOpaque2D, false);
    assert!(again.ptr_eq(&missing));
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_corrupt_file_gets_its_own_descriptor(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    ctx.files.insert("Textures/garbage.png", b"definitely not a png".to_vec());
    let textures = ctx.core.textures();

    let garbage = textures.load_from_file("garbage.png", DefaultTexture::WhiteOpaque2D, false);
    assert_eq!(garbage.state(), TextureLoadState::Invalid);
    let fallback = textures.defaults().srv(DefaultTexture::WhiteOpaque2D);
    assert!(!garbage.srv().is_null());
    assert_ne!(garbage.srv(), fallback);

    if let Some(dummy) = &ctx.dummy {
        assert_eq!(dummy.descriptor(garbage.srv().cpu()), dummy.descriptor(fallback.cpu()));
    }
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_reload_after_eviction(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    ctx.files.insert("Textures/Rocks/granite.tga", tga_2x1());
    let textures = ctx.core.textures();

    let first = textures.load_from_file("Rocks\\granite.tga", DefaultTexture::Magenta2D, false);
    assert_eq!(first.state(), TextureLoadState::Valid);
    assert_eq!(first.key(), "Rocks/granite.tga");
    drop(first);

    let second = textures.load_from_file("Rocks/granite.tga", DefaultTexture::Magenta2D, false);
    assert_eq!(second.state(), TextureLoadState::Valid);
    assert_eq!(second.dimensions(), Some((2, 1)));
    assert_eq!(textures.load_count(), 2);
    assert_eq!(ctx.files.read_count(), 2);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
fn test_shutdown_releases_everything(#[case] backend: Backend) {
    let ctx = TestContext::new(backend).unwrap();
    ctx.files.insert("Textures/a.png", png(2, 2, [1, 2, 3, 4]));
    let texture = ctx.core.textures().load_from_file("a.png", DefaultTexture::Magenta2D, false);
    assert!(texture.is_valid());

    ctx.core.shutdown().unwrap();
    assert!(ctx.core.textures().cache().is_empty());
    assert_eq!(ctx.device().descriptors().pool().heap_count(), 0);

    // Outstanding references outlive the cache without touching it.
    drop(texture);
    assert!(ctx.core.textures().cache().is_empty());
}

/// Uncompressed 24-bit TGA, two texels wide, stored bottom-up.
fn tga_2x1() -> Vec<u8> {
    let mut bytes = vec![0u8; 18];
    bytes[2] = 2;
    bytes[12] = 2;
    bytes[14] = 1;
    bytes[16] = 24;
    bytes.extend_from_slice(&[0, 0, 255, 0, 255, 0]);
    bytes
}
