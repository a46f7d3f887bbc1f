//! Vulkan device features needed for bindless descriptors.

use ash::vk;

/// Vulkan 1.2 features a physical device must support.
pub fn required_features_vk12() -> vk::PhysicalDeviceVulkan12Features<'static> {
    vk::PhysicalDeviceVulkan12Features::default()
        .vulkan_memory_model(true)
        .runtime_descriptor_array(true)
        .descriptor_binding_update_unused_while_pending(true)
        .descriptor_binding_partially_bound(true)
        .descriptor_binding_storage_buffer_update_after_bind(true)
        .descriptor_binding_sampled_image_update_after_bind(true)
        .descriptor_binding_storage_image_update_after_bind(true)
        .descriptor_binding_uniform_buffer_update_after_bind(true)
}

/// Names of the required features `supported` lacks.
pub fn missing_features(supported: &vk::PhysicalDeviceVulkan12Features<'_>) -> Vec<&'static str> {
    let required = required_features_vk12();
    let checks = [
        (
            "vulkan_memory_model",
            required.vulkan_memory_model,
            supported.vulkan_memory_model,
        ),
        (
            "runtime_descriptor_array",
            required.runtime_descriptor_array,
            supported.runtime_descriptor_array,
        ),
        (
            "descriptor_binding_update_unused_while_pending",
            required.descriptor_binding_update_unused_while_pending,
            supported.descriptor_binding_update_unused_while_pending,
        ),
        (
            "descriptor_binding_partially_bound",
            required.descriptor_binding_partially_bound,
            supported.descriptor_binding_partially_bound,
        ),
        (
            "descriptor_binding_storage_buffer_update_after_bind",
            required.descriptor_binding_storage_buffer_update_after_bind,
            supported.descriptor_binding_storage_buffer_update_after_bind,
        ),
        (
            "descriptor_binding_sampled_image_update_after_bind",
            required.descriptor_binding_sampled_image_update_after_bind,
            supported.descriptor_binding_sampled_image_update_after_bind,
        ),
        (
            "descriptor_binding_storage_image_update_after_bind",
            required.descriptor_binding_storage_image_update_after_bind,
            supported.descriptor_binding_storage_image_update_after_bind,
        ),
        (
            "descriptor_binding_uniform_buffer_update_after_bind",
            required.descriptor_binding_uniform_buffer_update_after_bind,
            supported.descriptor_binding_uniform_buffer_update_after_bind,
        ),
    ];
    checks
        .into_iter()
        .filter(|&(_, required, supported)| required == vk::TRUE && supported != vk::TRUE)
        .map(|(name, _, _)| name)
        .collect()
}
