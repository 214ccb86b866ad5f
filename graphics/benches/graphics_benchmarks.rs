use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use ember_graphics::backend::dummy::DummyDevice;
use ember_graphics::texture::TextureCache;
use ember_graphics::{
    CommandListType, DefaultTexture, DescriptorHeapType, GpuBuffer, GraphicsConfig, GraphicsCore,
    GraphicsDevice,
};
use ember_vfs::{MemorySource, Vfs};

fn dummy_device(descriptors_per_heap: u32) -> GraphicsDevice {
    let config = GraphicsConfig::new().with_descriptors_per_heap(descriptors_per_heap);
    GraphicsDevice::new(Arc::new(DummyDevice::new()), &config).unwrap()
}

// ---------------------------------------------------------------------------
// Descriptor allocation
// ---------------------------------------------------------------------------

fn bench_descriptor_allocate_single(c: &mut Criterion) {
    let device = dummy_device(256);
    c.bench_function("descriptor_allocate_1", |b| {
        b.iter(|| black_box(device.allocate_descriptor(DescriptorHeapType::CbvSrvUav, 1).unwrap()));
    });
}

fn bench_descriptor_allocate_tables(c: &mut Criterion) {
    let device = dummy_device(256);
    c.bench_function("descriptor_allocate_table_of_8", |b| {
        b.iter(|| black_box(device.allocate_descriptor(DescriptorHeapType::CbvSrvUav, 8).unwrap()));
    });
}

// ---------------------------------------------------------------------------
// Command allocator recycling
// ---------------------------------------------------------------------------

fn bench_command_context_round_trip(c: &mut Criterion) {
    let device = dummy_device(256);
    c.bench_function("command_context_begin_finish", |b| {
        b.iter(|| {
            let context = device.begin_context(CommandListType::Direct, "bench").unwrap();
            black_box(context.finish(false).unwrap());
        });
    });
}

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

fn bench_structured_buffer_create(c: &mut Criterion) {
    let device = dummy_device(1024);
    c.bench_function("structured_buffer_create_64x32", |b| {
        b.iter(|| {
            let mut buffer = GpuBuffer::structured();
            buffer.create(&device, "bench", 64, 32, None).unwrap();
            black_box(buffer);
        });
    });
}

// ---------------------------------------------------------------------------
// Texture cache
// ---------------------------------------------------------------------------

fn bench_texture_cache_hit(c: &mut Criterion) {
    let files = MemorySource::new();
    let image = image::RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255]));
    let mut bytes = std::io::Cursor::new(Vec::new());
    image.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    files.insert("Textures/hit.png", bytes.into_inner());

    let mut vfs = Vfs::new();
    vfs.mount("memory", files);
    vfs.set_default("memory");
    let core = GraphicsCore::new(GraphicsConfig::new().with_texture_root("Textures"), vfs).unwrap();
    let resident = core.textures().load_from_file("hit.png", DefaultTexture::Magenta2D, false);

    c.bench_function("texture_cache_hit", |b| {
        b.iter(|| {
            black_box(core.textures().load_from_file("hit.png", DefaultTexture::Magenta2D, false))
        });
    });
    drop(resident);
}

fn bench_texture_cache_len(c: &mut Criterion) {
    let cache = TextureCache::new();
    c.bench_function("texture_cache_len_empty", |b| {
        b.iter(|| black_box(cache.len()));
    });
}

criterion_group!(
    benches,
    bench_descriptor_allocate_single,
    bench_descriptor_allocate_tables,
    bench_command_context_round_trip,
    bench_structured_buffer_create,
    bench_texture_cache_hit,
    bench_texture_cache_len,
);
criterion_main!(benches);
