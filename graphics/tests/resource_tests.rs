//! Integration tests for descriptor allocation, command submission and
//! buffer resources.
//!
//! Tests are parameterized with `rstest` and run once per backend. Backends
//! that are unavailable on the current machine are skipped.
//!
//! ```bash
//! cargo test --test resource_tests
//! cargo test --test resource_tests --features vulkan-backend
//! ```

mod common;

use std::sync::Arc;

use rstest::rstest;

use common::{Backend, TestContext, test_pattern};
use ember_graphics::backend::dummy::DummyDevice;
use ember_graphics::{
    CommandListType, DescriptorHeapType, GpuBuffer, GraphicsConfig, GraphicsDevice, ReadbackBuffer,
    ResourceState, UploadBuffer,
};

// ============================================================================
// Descriptor allocation
// ============================================================================

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_descriptor_handles_never_overlap(#[case] backend: Backend) {
    let config = GraphicsConfig::new().with_descriptors_per_heap(16);
    let Some(ctx) = TestContext::with_config(backend, config) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let device = ctx.device();
    let increment = device.raw().descriptor_increment_size(DescriptorHeapType::CbvSrvUav) as u64;

    let mut ranges = Vec::new();
    for count in [1u32, 3, 7, 2, 16, 5, 9, 1, 12] {
        let handle = device.allocate_descriptor(DescriptorHeapType::CbvSrvUav, count).unwrap();
        assert!(!handle.is_null());
        assert!(!handle.is_shader_visible());
        ranges.push((handle.cpu_ptr(), handle.cpu_ptr() + count as u64 * increment));
    }

    for pair in ranges.windows(2) {
        assert!(pair[1].0 > pair[0].0, "handles must increase: {:#x?}", pair);
    }
    for (i, a) in ranges.iter().enumerate() {
        for b in &ranges[i + 1..] {
            assert!(a.1 <= b.0 || b.1 <= a.0, "{:#x?} overlaps {:#x?}", a, b);
        }
    }
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_third_allocation_opens_a_new_heap(#[case] backend: Backend) {
    let config = GraphicsConfig::new().with_descriptors_per_heap(100);
    let Some(ctx) = TestContext::with_config(backend, config) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let device = ctx.device();
    let pool = device.descriptors().pool();
    let increment = device.raw().descriptor_increment_size(DescriptorHeapType::Sampler) as u64;
    let heaps_before = pool.heap_count();

    let first = device.allocate_descriptor(DescriptorHeapType::Sampler, 40).unwrap();
    let second = device.allocate_descriptor(DescriptorHeapType::Sampler, 40).unwrap();
    assert_eq!(second.cpu_ptr(), first.cpu_ptr() + 40 * increment);
    assert_eq!(pool.heap_count_of(DescriptorHeapType::Sampler), 1);

    let third = device.allocate_descriptor(DescriptorHeapType::Sampler, 40).unwrap();
    assert_eq!(pool.heap_count_of(DescriptorHeapType::Sampler), 2);
    assert_eq!(pool.heap_count(), heaps_before + 2);
    assert_ne!(third.cpu_ptr(), second.cpu_ptr() + 40 * increment);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_heap_types_allocate_independently(#[case] backend: Backend) {
    let config = GraphicsConfig::new().with_descriptors_per_heap(8);
    let Some(ctx) = TestContext::with_config(backend, config) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let device = ctx.device();
    let pool = device.descriptors().pool();
    for heap_type in DescriptorHeapType::ALL {
        let before = DescriptorHeapType::ALL.map(|ty| pool.heap_count_of(ty));
        device.allocate_descriptor(heap_type, 8).unwrap();

        // Only the requested type may grow, and by a single heap.
        for (ty, count) in DescriptorHeapType::ALL.into_iter().zip(before) {
            let grown = pool.heap_count_of(ty) - count;
            if ty == heap_type {
                assert!(grown <= 1, "{ty:?} grew by {grown} heaps");
            } else {
                assert_eq!(grown, 0, "{ty:?} grew while allocating {heap_type:?}");
            }
        }
    }
    // Default textures only use view descriptors, so the other types hold one full heap each.
    for ty in [DescriptorHeapType::Sampler, DescriptorHeapType::Rtv, DescriptorHeapType::Dsv] {
        assert_eq!(pool.heap_count_of(ty), 1);
    }
}

// ============================================================================
// Command submission
// ============================================================================

#[test]
fn test_allocators_are_reused_only_after_their_fence() {
    let dummy = Arc::new(DummyDevice::new().with_manual_fences());
    let device = GraphicsDevice::new(dummy.clone(), &GraphicsConfig::default()).unwrap();
    let queue = device.commands().queue(CommandListType::Copy).clone();

    let first = device
        .begin_context(CommandListType::Copy, "first")
        .unwrap()
        .finish(false)
        .unwrap();
    assert_eq!(CommandListType::from_fence_value(first), Some(CommandListType::Copy));
    assert!(!device.commands().is_fence_complete(first));

    // The first allocator is still in flight, so a second one is created.
    let second = device
        .begin_context(CommandListType::Copy, "second")
        .unwrap()
        .finish(false)
        .unwrap();
    assert!(second > first);
    assert_eq!(queue.allocator_pool().size(), 2);

    dummy.retire(queue.fence(), first);
    assert!(device.commands().is_fence_complete(first));
    assert!(!device.commands().is_fence_complete(second));

    let third = device.begin_context(CommandListType::Copy, "third").unwrap();
    assert_eq!(queue.allocator_pool().size(), 2);
    assert_eq!(queue.allocator_pool().ready_count(), 1);
    drop(third);

    assert_eq!(dummy.stats().allocator_resets, 1);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_fence_values_identify_their_queue(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let device = ctx.device();
    for list_type in CommandListType::ALL {
        let value = device.begin_context(list_type, "noop").unwrap().finish(true).unwrap();
        assert_eq!(CommandListType::from_fence_value(value), Some(list_type));
        assert!(device.commands().is_fence_complete(value));
    }
    device.idle_gpu().unwrap();
}

// ============================================================================
// Buffers
// ============================================================================

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_structured_buffer_views(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let mut particles = GpuBuffer::structured();
    particles.create(ctx.device(), "Particles", 10, 16, None).unwrap();

    assert_eq!(particles.buffer_size(), 160);
    assert!(!particles.srv().is_null());
    assert!(!particles.uav().is_null());
    assert_ne!(particles.srv(), particles.uav());

    let counter = particles.counter_buffer().expect("structured buffers own a counter");
    assert_eq!(counter.buffer_size(), 4);
    assert!(!counter.uav().is_null());
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_constant_buffer_view_rounds_up(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let mut constants = GpuBuffer::byte_address();
    constants.create(ctx.device(), "Constants", 4, 4, None).unwrap();

    let view = constants.create_constant_buffer_view(ctx.device(), 0, 10).unwrap();
    assert_eq!(view.desc.size_in_bytes, 16);
    assert_eq!(view.desc.buffer_location, constants.gpu_virtual_address());
    assert!(!view.handle.is_null());
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[should_panic(expected = "exceeds buffer")]
fn test_constant_buffer_view_past_the_end(#[case] backend: Backend) {
    let ctx = TestContext::new(backend).unwrap();
    let mut constants = GpuBuffer::byte_address();
    constants.create(ctx.device(), "Constants", 4, 4, None).unwrap();
    let _ = constants.create_constant_buffer_view(ctx.device(), 8, 16);
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_buffer_round_trip_through_readback(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let device = ctx.device();
    let data = test_pattern(256);

    let mut buffer = GpuBuffer::byte_address();
    buffer.create(device, "Payload", 64, 4, Some(&data)).unwrap();
    assert_eq!(buffer.resource().usage_state(), ResourceState::GENERIC_READ);

    let readback = ReadbackBuffer::create(device, "Readback", 64, 4).unwrap();
    let mut context = device.begin_context(CommandListType::Direct, "Readback").unwrap();
    context.transition_resource(buffer.resource_mut(), ResourceState::COPY_SOURCE, false);
    context.copy_buffer_region(readback.resource(), 0, buffer.resource(), 0, 256);
    context.finish(true).unwrap();

    assert_eq!(readback.read().unwrap(), data);
    assert_eq!(readback.read_range(16, 4).unwrap(), data[16..20].to_vec());
}

#[rstest]
#[case::dummy(Backend::Dummy)]
#[case::vulkan(Backend::Vulkan)]
fn test_buffer_from_upload_offset(#[case] backend: Backend) {
    let Some(ctx) = TestContext::new(backend) else {
        eprintln!("Backend {:?} not available, skipping", backend);
        return;
    };
    let device = ctx.device();
    let upload = UploadBuffer::create(device, "Staging", 128).unwrap();
    upload.write_pod::<u32>(64, &[1, 2, 3, 4]).unwrap();

    let mut buffer = GpuBuffer::typed(ember_graphics::Format::R32Uint);
    buffer.create_from_upload(device, "Indices", 4, 4, &upload, 64).unwrap();

    let readback = ReadbackBuffer::create(device, "Readback", 4, 4).unwrap();
    let mut context = device.begin_context(CommandListType::Copy, "Readback").unwrap();
    context.transition_resource(buffer.resource_mut(), ResourceState::COPY_SOURCE, false);
    context.copy_buffer_region(readback.resource(), 0, buffer.resource(), 0, 16);
    context.finish(true).unwrap();

    let words: Vec<u32> = readback
        .read()
        .unwrap()
        .chunks_exact(4)
        .map(|word| u32::from_le_bytes(word.try_into().unwrap()))
        .collect();
    assert_eq!(words, vec![1, 2, 3, 4]);
}
