//! Physical device selection and logical device creation.

use std::ffi::CStr;

use ash::vk;

use crate::error::GraphicsError;
use crate::types::CommandListType;

/// Queue family serving each command list type, indexed by
/// [`CommandListType::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub families: [u32; 3],
}

impl QueueFamilies {
    pub fn family(&self, list_type: CommandListType) -> u32 {
        self.families[list_type.index()]
    }

    /// Distinct families, in first-use order.
    pub fn unique(&self) -> Vec<u32> {
        let mut unique = Vec::with_capacity(3);
        for family in self.families {
            if !unique.contains(&family) {
                unique.push(family);
            }
        }
        unique
    }
}

/// Pick the highest scoring GPU that supports timeline semaphores and
/// buffer device addresses.
pub fn select_physical_device(
    instance: &ash::Instance,
) -> Result<vk::PhysicalDevice, GraphicsError> {
    let devices = unsafe { instance.enumerate_physical_devices() }.map_err(|e| {
        let message = format!("Failed to enumerate physical devices: {:?}", e);
        GraphicsError::InitializationFailed(message)
    })?;

    if devices.is_empty() {
        return Err(GraphicsError::InitializationFailed(
            "No Vulkan-capable GPU found".to_string(),
        ));
    }

    let mut best_device = None;
    let mut best_score = 0;

    for device in devices {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let device_name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) };

        let mut features_12 = vk::PhysicalDeviceVulkan12Features::default();
        let mut features = vk::PhysicalDeviceFeatures2::default().push_next(&mut features_12);
        unsafe { instance.get_physical_device_features2(device, &mut features) };

        if properties.api_version < vk::make_api_version(0, 1, 2, 0)
            || features_12.timeline_semaphore == vk::FALSE
            || features_12.buffer_device_address == vk::FALSE
        {
            log::info!("Skipping GPU {:?}: missing Vulkan 1.2 features", device_name);
            continue;
        }

        let mut score = 1;
        if properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
            score += 1000;
        } else if properties.device_type == vk::PhysicalDeviceType::INTEGRATED_GPU {
            score += 100;
        }
        score += properties.limits.max_image_dimension2_d / 1024;

        log::info!(
            "Found GPU: {:?} (type: {:?}, score: {})",
            device_name,
            properties.device_type,
            score
        );

        if score > best_score {
            best_score = score;
            best_device = Some(device);
        }
    }

    best_device
        .ok_or_else(|| GraphicsError::InitializationFailed("No suitable GPU found".to_string()))
}

/// Find queue families for direct, compute and copy work.
///
/// Compute and copy prefer dedicated families and fall back to the
/// graphics family.
pub fn find_queue_families(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<QueueFamilies, GraphicsError> {
    let properties =
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
    let flags: Vec<vk::QueueFlags> = properties.iter().map(|family| family.queue_flags).collect();
    pick_queue_families(&flags)
}

fn pick_queue_families(flags: &[vk::QueueFlags]) -> Result<QueueFamilies, GraphicsError> {
    let find = |pred: &dyn Fn(vk::QueueFlags) -> bool| {
        flags.iter().position(|f| pred(*f)).map(|i| i as u32)
    };

    let graphics = find(&|f| f.contains(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE))
        .ok_or_else(|| {
            GraphicsError::InitializationFailed("No graphics queue family found".to_string())
        })?;
    let compute = find(&|f| {
        f.contains(vk::QueueFlags::COMPUTE) && !f.contains(vk::QueueFlags::GRAPHICS)
    })
    .unwrap_or(graphics);
    let copy = find(&|f| {
        f.contains(vk::QueueFlags::TRANSFER)
            && !f.intersects(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)
    })
    .unwrap_or(compute);

    Ok(QueueFamilies {
        families: [graphics, compute, copy],
    })
}

/// Create the logical device with one queue per distinct family.
pub fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    families: &QueueFamilies,
) -> Result<ash::Device, GraphicsError> {
    let queue_priorities = [1.0f32];
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = families
        .unique()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(&queue_priorities)
        })
        .collect();

    let mut vulkan_12_features = vk::PhysicalDeviceVulkan12Features::default()
        .timeline_semaphore(true)
        .buffer_device_address(true);

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .push_next(&mut vulkan_12_features);

    unsafe { instance.create_device(physical_device, &create_info, None) }.map_err(|e| {
        GraphicsError::InitializationFailed(format!("Failed to create logical device: {:?}", e))
    })
}
