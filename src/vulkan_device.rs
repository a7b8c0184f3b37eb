//! VulkanDevice - ash-backed implementation of GraphicsDevice
//!
//! Wraps the logical device created by the out-of-scope bootstrap layer.
//! Uniform-buffer memory is always allocated host-visible and
//! host-coherent; there is no device-local/staging path for uniform
//! data in this subsystem.

use crate::device::GraphicsDevice;
use crate::error::{Error, Result};
use crate::nebula_error;
use ash::vk;

/// Vulkan implementation of the shader subsystem's device seam
///
/// Does not own the `ash::Device`; the bootstrap layer that created the
/// device is responsible for destroying it after the subsystem is done.
pub struct VulkanDevice {
    device: ash::Device,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
}

impl VulkanDevice {
    /// Wrap an existing logical device
    pub fn new(device: ash::Device, memory_properties: vk::PhysicalDeviceMemoryProperties) -> Self {
        Self {
            device,
            memory_properties,
        }
    }

    /// Wrap an existing logical device, querying memory properties from the instance
    pub fn for_physical_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
    ) -> Self {
        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };
        Self::new(device, memory_properties)
    }

    /// Find a memory type index matching `type_bits` with `properties`
    fn find_memory_type(
        &self,
        type_bits: u32,
        properties: vk::MemoryPropertyFlags,
    ) -> Result<u32> {
        for i in 0..self.memory_properties.memory_type_count {
            if type_bits & (1 << i) != 0
                && self.memory_properties.memory_types[i as usize]
                    .property_flags
                    .contains(properties)
            {
                return Ok(i);
            }
        }
        nebula_error!(
            "nebula3d::vulkan",
            "No memory type matches bits {:#x} with {:?}",
            type_bits,
            properties
        );
        Err(Error::Device {
            op: "find_memory_type",
            code: vk::Result::ERROR_FEATURE_NOT_PRESENT,
        })
    }
}

/// Map a raw Vulkan failure into the unrecoverable device error tier
fn device_err(op: &'static str) -> impl FnOnce(vk::Result) -> Error {
    move |code| {
        nebula_error!("nebula3d::vulkan", "{} failed: {:?}", op, code);
        Error::Device { op, code }
    }
}

impl GraphicsDevice for VulkanDevice {
    fn create_shader_module(&self, code: &[u32]) -> Result<vk::ShaderModule> {
        let create_info = vk::ShaderModuleCreateInfo::default().code(code);
        unsafe {
            self.device
                .create_shader_module(&create_info, None)
                .map_err(device_err("vkCreateShaderModule"))
        }
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        unsafe { self.device.destroy_shader_module(module, None) }
    }

    fn create_descriptor_set_layout(
        &self,
        bindings: &[vk::DescriptorSetLayoutBinding<'_>],
    ) -> Result<vk::DescriptorSetLayout> {
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);
        unsafe {
            self.device
                .create_descriptor_set_layout(&create_info, None)
                .map_err(device_err("vkCreateDescriptorSetLayout"))
        }
    }

    fn destroy_descriptor_set_layout(&self, layout: vk::DescriptorSetLayout) {
        unsafe { self.device.destroy_descriptor_set_layout(layout, None) }
    }

    fn create_descriptor_pool(
        &self,
        pool_sizes: &[vk::DescriptorPoolSize],
        max_sets: u32,
    ) -> Result<vk::DescriptorPool> {
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(pool_sizes)
            .max_sets(max_sets);
        unsafe {
            self.device
                .create_descriptor_pool(&create_info, None)
                .map_err(device_err("vkCreateDescriptorPool"))
        }
    }

    fn destroy_descriptor_pool(&self, pool: vk::DescriptorPool) {
        unsafe { self.device.destroy_descriptor_pool(pool, None) }
    }

    fn allocate_descriptor_set(
        &self,
        pool: vk::DescriptorPool,
        layout: vk::DescriptorSetLayout,
    ) -> Result<vk::DescriptorSet> {
        let set_layouts = [layout];
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool)
            .set_layouts(&set_layouts);
        let sets = unsafe {
            self.device
                .allocate_descriptor_sets(&allocate_info)
                .map_err(device_err("vkAllocateDescriptorSets"))?
        };
        sets.into_iter().next().ok_or(Error::Device {
            op: "vkAllocateDescriptorSets",
            code: vk::Result::ERROR_UNKNOWN,
        })
    }

    fn create_pipeline_layout(
        &self,
        set_layouts: &[vk::DescriptorSetLayout],
    ) -> Result<vk::PipelineLayout> {
        let create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(set_layouts);
        unsafe {
            self.device
                .create_pipeline_layout(&create_info, None)
                .map_err(device_err("vkCreatePipelineLayout"))
        }
    }

    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout) {
        unsafe { self.device.destroy_pipeline_layout(layout, None) }
    }

    fn create_buffer(
        &self,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
    ) -> Result<vk::Buffer> {
        let create_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        unsafe {
            self.device
                .create_buffer(&create_info, None)
                .map_err(device_err("vkCreateBuffer"))
        }
    }

    fn destroy_buffer(&self, buffer: vk::Buffer) {
        unsafe { self.device.destroy_buffer(buffer, None) }
    }

    fn buffer_memory_requirements(&self, buffer: vk::Buffer) -> vk::MemoryRequirements {
        unsafe { self.device.get_buffer_memory_requirements(buffer) }
    }

    fn allocate_host_visible_memory(
        &self,
        requirements: vk::MemoryRequirements,
    ) -> Result<vk::DeviceMemory> {
        let memory_type_index = self.find_memory_type(
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        let allocate_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);
        unsafe {
            self.device
                .allocate_memory(&allocate_info, None)
                .map_err(device_err("vkAllocateMemory"))
        }
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        unsafe { self.device.free_memory(memory, None) }
    }

    fn bind_buffer_memory(&self, buffer: vk::Buffer, memory: vk::DeviceMemory) -> Result<()> {
        unsafe {
            self.device
                .bind_buffer_memory(buffer, memory, 0)
                .map_err(device_err("vkBindBufferMemory"))
        }
    }

    fn map_memory(&self, memory: vk::DeviceMemory, size: vk::DeviceSize) -> Result<*mut u8> {
        unsafe {
            self.device
                .map_memory(memory, 0, size, vk::MemoryMapFlags::empty())
                .map(|ptr| ptr.cast::<u8>())
                .map_err(device_err("vkMapMemory"))
        }
    }

    fn unmap_memory(&self, memory: vk::DeviceMemory) {
        unsafe { self.device.unmap_memory(memory) }
    }

    fn update_descriptor_sets(&self, writes: &[vk::WriteDescriptorSet<'_>]) {
        unsafe { self.device.update_descriptor_sets(writes, &[]) }
    }
}
