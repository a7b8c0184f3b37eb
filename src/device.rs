//! Graphics-device collaborator seam
//!
//! The shader subsystem consumes a narrow slice of the graphics device:
//! shader-module creation, descriptor-set layout / pool / set and
//! pipeline-layout lifecycle, buffer + host-visible memory lifecycle,
//! map/unmap for CPU uniform writes, and batched descriptor updates.
//! [`GraphicsDevice`] captures exactly that surface so the subsystem can
//! run against the real Vulkan device or a mock in tests.
//!
//! The device is addressed through a single engine-global accessor in
//! the same style as the engine's other singletons. No internal
//! synchronization beyond the storage lock is provided; all shader
//! subsystem calls are expected to come from the render-controlling
//! thread.

use crate::error::{Error, Result};
use ash::vk;
use std::sync::{Arc, RwLock};

/// Narrow device interface consumed by the shader subsystem
pub trait GraphicsDevice: Send + Sync {
    /// Create a shader module from SPIR-V words
    fn create_shader_module(&self, code: &[u32]) -> Result<vk::ShaderModule>;
    fn destroy_shader_module(&self, module: vk::ShaderModule);

    /// Create a descriptor-set layout from an ordered binding array
    fn create_descriptor_set_layout(
        &self,
        bindings: &[vk::DescriptorSetLayoutBinding<'_>],
    ) -> Result<vk::DescriptorSetLayout>;
    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout);

    /// Create a descriptor pool sized to exactly `pool_sizes`
    fn create_descriptor_pool(
        &self,
        pool_sizes: &[vk::DescriptorPoolSize],
        max_sets: u32,
    ) -> Result<vk::DescriptorPool>;
    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool);

    /// Allocate a single descriptor set from `pool` with `layout`
    fn allocate_descriptor_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
    ) -> Result<vk::DescriptorSet>;

    /// Create a pipeline layout referencing `set_layouts`
    fn create_pipeline_layout(
        &self,
        set_layouts: &[vk::DescriptorSetLayout],
    ) -> Result<vk::PipelineLayout>;
    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout);

    /// Create a buffer without backing memory
    fn create_buffer(&self, size: vk::DeviceSize, usage: vk::BufferUsageFlags)
        -> Result<vk::Buffer>;
    fn destroy_buffer(&self, buffer: vk::Buffer);

    /// Query size/alignment requirements for `buffer`
    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements;

    /// Allocate host-visible, host-coherent memory satisfying `requirements`
    fn allocate_host_visible_memory(
        &self,
        requirements: vk::MemoryRequirements,
    ) -> Result<vk::DeviceMemory>;
    fn free_memory(&self, memory: vk::DeviceMemory);

    /// Bind `memory` to `buffer` at offset 0
    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) -> Result<()>;

    /// Map `size` bytes of `memory` for CPU writes
    fn map_memory(&self, memory: vk::DeviceMemory, size: vk::DeviceSize) -> Result<*mut u8>;
    fn unmap_memory(&self, memory: vk::DeviceMemory);

    /// Submit a batch of descriptor writes in one device call
    fn update_descriptor_sets(&self, writes: &[vk::WriteDescriptorSet<'_>]);
}

static DEVICE: RwLock<Option<Arc<dyn GraphicsDevice>>> = RwLock::new(None);

/// Install the process-wide graphics device
///
/// Called once by engine bootstrap after device creation. Replacing a
/// live device while shader resources exist is the caller's
/// responsibility to avoid.
pub fn install(device: Arc<dyn GraphicsDevice>) {
    if let Ok(mut slot) = DEVICE.write() {
        *slot = Some(device);
    }
}

/// Remove the installed device at engine teardown
pub fn uninstall() {
    if let Ok(mut slot) = DEVICE.write() {
        *slot = None;
    }
}

/// Get the installed device, or `Error::NoDevice`
pub fn instance() -> Result<Arc<dyn GraphicsDevice>> {
    DEVICE
        .read()
        .ok()
        .and_then(|slot| slot.clone())
        .ok_or(Error::NoDevice)
}

/// Get the installed device if any (used by Drop paths, which must not fail)
pub fn try_instance() -> Option<Arc<dyn GraphicsDevice>> {
    DEVICE.read().ok().and_then(|slot| slot.clone())
}
