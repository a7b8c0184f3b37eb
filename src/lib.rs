/*!
# Nebula3D - Vulkan Shader Resource Binding

Shader resource-binding subsystem of the Nebula3D engine's Vulkan
renderer: SPIR-V reflection, merged descriptor-set/pipeline layouts,
and name-indexed uniform/texture binding.

Given pre-compiled SPIR-V modules for up to six stages, a
[`ShaderProgram`] reflects each stage's declared interface (uniform
blocks, sampled images, vertex inputs), merges the bindings into one
descriptor-set layout, allocates host-visible backing buffers for every
uniform block, and lazily realizes the GPU layout/pool/set objects on
first access. Uniform data and textures are addressed by the names
declared in shader source.

## Architecture

- [`ModuleCache`] / [`ShaderModule`]: path-keyed registry of realized
  bytecode modules, deduplicated by path and hashed by content
- [`reflect_stage`]: spirq-based extraction of a stage's resource
  interface, reproducing the bytecode's own binding/location numbering
- [`VertexInputBindingTable`]: semantic attribute → location map with a
  content hash for pipeline-state cache keys
- [`ShaderProgram`]: merged bindings, two-state lazy realization, and
  the `set_uniform_data` / `set_texture` write API
- [`GraphicsDevice`](device::GraphicsDevice): the narrow device seam;
  [`VulkanDevice`] is the ash-backed implementation installed by engine
  bootstrap

All calls are expected from the render-controlling thread; the caller
serializes access and handles frame synchronization.
*/

mod error;
pub mod log;
pub mod device;
mod vulkan_device;
mod shader_module;
mod reflection;
mod vertex_input;
mod texture;
mod shader;

pub use error::{Error, Result};
pub use reflection::{
    reflect_stage, ReflectedResource, SampledImageReflection, ShaderStage, StageReflection,
    UniformBlockReflection, VertexInputReflection,
};
pub use shader::{ShaderProgram, ShaderProgramDesc, ShaderProgramPaths, ShaderStageInfo};
pub use shader_module::{ModuleCache, ShaderModule};
pub use texture::Texture;
pub use vertex_input::{VertexAttribute, VertexInputBindingTable, INVALID_LOCATION};
pub use vulkan_device::VulkanDevice;

#[cfg(test)]
mod spirv_fixtures;
