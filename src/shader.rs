//! ShaderProgram - merged bindings and lazy GPU layout realization
//!
//! A program aggregates up to six stage modules, reflects them in a
//! fixed stage order, and owns the realized descriptor-set layout,
//! descriptor pool, descriptor set, pipeline layout, and one
//! host-visible backing buffer per uniform block. Realization is lazy:
//! two explicit state machines ([`LayoutState`], [`DescriptorState`])
//! gate every accessor, so GPU objects are (re)built only when first
//! needed after an invalidation.
//!
//! Callers are responsible for frame synchronization; nothing here
//! prevents overwriting a uniform buffer the GPU is still reading.

use crate::device;
use crate::error::{unrecoverable, Result};
use crate::reflection::{
    self, ReflectedResource, SampledImageReflection, ShaderStage, UniformBlockReflection,
};
use crate::shader_module::{ModuleCache, ShaderModule};
use crate::texture::Texture;
use crate::vertex_input::VertexInputBindingTable;
use crate::{nebula_debug, nebula_warn};
use ash::vk;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::Hasher;
use std::sync::Arc;

/// Stage reflection order; merged binding slots follow this order
const STAGE_ORDER: [ShaderStage; 6] = [
    ShaderStage::Vertex,
    ShaderStage::Geometry,
    ShaderStage::TessControl,
    ShaderStage::TessEval,
    ShaderStage::Compute,
    ShaderStage::Fragment,
];

/// Pipeline/descriptor-set layout validity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayoutState {
    /// No realized layout objects; next accessor rebuilds
    Invalid,
    /// All layout-dependent GPU objects are realized
    Valid,
}

/// Descriptor-set write validity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DescriptorState {
    /// Pending resource changes; next accessor flushes writes
    Stale,
    /// The descriptor set reflects all bound resources
    Flushed,
}

/// One entry of the realized shader-stage list, for pipeline creation
#[derive(Debug, Clone, Copy)]
pub struct ShaderStageInfo {
    pub stage: vk::ShaderStageFlags,
    pub module: vk::ShaderModule,
}

/// A reflected uniform block with its realized backing buffer
struct UniformBlockBinding {
    /// Slot in the merged binding list
    binding: u32,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    /// Struct size declared in shader source
    declared_size: u32,
    /// Actual allocation size after alignment rounding
    allocated_size: vk::DeviceSize,
    /// Buffer-descriptor record reused across descriptor-set writes
    buffer_info: vk::DescriptorBufferInfo,
}

/// A reflected sampled image; the texture itself is assigned by name later
struct ImageBinding {
    /// Slot in the merged binding list
    binding: u32,
}

/// Stage modules for program construction
#[derive(Default)]
pub struct ShaderProgramDesc {
    pub vertex: Option<Arc<ShaderModule>>,
    pub fragment: Option<Arc<ShaderModule>>,
    pub geometry: Option<Arc<ShaderModule>>,
    pub compute: Option<Arc<ShaderModule>>,
    pub tess_control: Option<Arc<ShaderModule>>,
    pub tess_eval: Option<Arc<ShaderModule>>,
}

/// Bytecode paths for cache-backed program construction
#[derive(Debug, Clone, Copy, Default)]
pub struct ShaderProgramPaths<'a> {
    pub vertex: Option<&'a str>,
    pub fragment: Option<&'a str>,
    pub geometry: Option<&'a str>,
    pub compute: Option<&'a str>,
    pub tess_control: Option<&'a str>,
    pub tess_eval: Option<&'a str>,
}

/// Aggregated shader stages with name-indexed resource binding
pub struct ShaderProgram {
    vertex: Option<Arc<ShaderModule>>,
    fragment: Option<Arc<ShaderModule>>,
    geometry: Option<Arc<ShaderModule>>,
    compute: Option<Arc<ShaderModule>>,
    tess_control: Option<Arc<ShaderModule>>,
    tess_eval: Option<Arc<ShaderModule>>,

    /// Combined stage-grouped content hash
    hash: u64,

    layout_state: LayoutState,
    descriptor_state: DescriptorState,

    pipeline_layout: vk::PipelineLayout,
    descriptor_set_layout: vk::DescriptorSetLayout,
    descriptor_pool: vk::DescriptorPool,
    descriptor_set: vk::DescriptorSet,

    shader_stages: Vec<ShaderStageInfo>,
    set_layout_bindings: Vec<vk::DescriptorSetLayoutBinding<'static>>,
    pool_sizes: Vec<vk::DescriptorPoolSize>,
    vertex_inputs: VertexInputBindingTable,

    uniform_blocks: FxHashMap<String, UniformBlockBinding>,
    image_bindings: FxHashMap<String, ImageBinding>,
    textures: FxHashMap<String, Arc<dyn Texture>>,
    /// CPU-side uniform bytes, recorded independently of realization order
    uniform_data: FxHashMap<String, Vec<u8>>,
}

impl ShaderProgram {
    pub fn new(desc: ShaderProgramDesc) -> Self {
        let mut program = Self {
            vertex: desc.vertex,
            fragment: desc.fragment,
            geometry: desc.geometry,
            compute: desc.compute,
            tess_control: desc.tess_control,
            tess_eval: desc.tess_eval,
            hash: 0,
            layout_state: LayoutState::Invalid,
            descriptor_state: DescriptorState::Stale,
            pipeline_layout: vk::PipelineLayout::null(),
            descriptor_set_layout: vk::DescriptorSetLayout::null(),
            descriptor_pool: vk::DescriptorPool::null(),
            descriptor_set: vk::DescriptorSet::null(),
            shader_stages: Vec::new(),
            set_layout_bindings: Vec::new(),
            pool_sizes: Vec::new(),
            vertex_inputs: VertexInputBindingTable::new(),
            uniform_blocks: FxHashMap::default(),
            image_bindings: FxHashMap::default(),
            textures: FxHashMap::default(),
            uniform_data: FxHashMap::default(),
        };
        program.recompute_hash();
        program
    }

    /// Build a program from bytecode paths through a module cache.
    ///
    /// Read failures are recoverable; the caller receives no program.
    pub fn load(cache: &mut ModuleCache, paths: ShaderProgramPaths<'_>) -> Result<Self> {
        fn load_stage(
            cache: &mut ModuleCache,
            path: Option<&str>,
        ) -> Result<Option<Arc<ShaderModule>>> {
            match path {
                Some(path) => Ok(Some(cache.load(path)?)),
                None => Ok(None),
            }
        }

        Ok(Self::new(ShaderProgramDesc {
            vertex: load_stage(cache, paths.vertex)?,
            fragment: load_stage(cache, paths.fragment)?,
            geometry: load_stage(cache, paths.geometry)?,
            compute: load_stage(cache, paths.compute)?,
            tess_control: load_stage(cache, paths.tess_control)?,
            tess_eval: load_stage(cache, paths.tess_eval)?,
        }))
    }

    /// Combined content hash over all present stage modules
    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn vertex_module(&self) -> Option<&Arc<ShaderModule>> {
        self.vertex.as_ref()
    }

    pub fn fragment_module(&self) -> Option<&Arc<ShaderModule>> {
        self.fragment.as_ref()
    }

    pub fn geometry_module(&self) -> Option<&Arc<ShaderModule>> {
        self.geometry.as_ref()
    }

    pub fn compute_module(&self) -> Option<&Arc<ShaderModule>> {
        self.compute.as_ref()
    }

    pub fn tess_control_module(&self) -> Option<&Arc<ShaderModule>> {
        self.tess_control.as_ref()
    }

    pub fn tess_eval_module(&self) -> Option<&Arc<ShaderModule>> {
        self.tess_eval.as_ref()
    }

    /// Replace one stage's module; invalidates the realized layout
    pub fn set_stage(&mut self, stage: ShaderStage, module: Option<Arc<ShaderModule>>) {
        self.destroy_layout_objects();
        match stage {
            ShaderStage::Vertex => self.vertex = module,
            ShaderStage::Fragment => self.fragment = module,
            ShaderStage::Geometry => self.geometry = module,
            ShaderStage::Compute => self.compute = module,
            ShaderStage::TessControl => self.tess_control = module,
            ShaderStage::TessEval => self.tess_eval = module,
        }
        self.recompute_hash();
    }

    /// Release all realized layout-dependent objects
    pub fn invalidate(&mut self) {
        self.destroy_layout_objects();
    }

    /// Pipeline layout, realizing it first if stale
    pub fn pipeline_layout(&mut self) -> vk::PipelineLayout {
        self.ensure_layout();
        self.pipeline_layout
    }

    /// Descriptor-set layout, realizing it first if stale
    pub fn descriptor_set_layout(&mut self) -> vk::DescriptorSetLayout {
        self.ensure_layout();
        self.descriptor_set_layout
    }

    /// Shader-stage list for pipeline creation, realizing layout first if stale
    pub fn shader_stages(&mut self) -> &[ShaderStageInfo] {
        self.ensure_layout();
        &self.shader_stages
    }

    /// Vertex input table, realizing layout first if stale
    pub fn vertex_inputs(&mut self) -> &VertexInputBindingTable {
        self.ensure_layout();
        &self.vertex_inputs
    }

    /// Descriptor set with all pending resource writes flushed
    pub fn descriptor_set(&mut self) -> vk::DescriptorSet {
        self.ensure_layout();
        self.ensure_descriptor_set();
        self.descriptor_set
    }

    /// Record uniform bytes under `name` and, when a backing buffer
    /// exists, copy them into its mapped memory immediately.
    ///
    /// Callable before layout realization; recorded bytes are replayed
    /// into the buffer when it is created. Does not re-arm the
    /// descriptor state: the buffer identity is unchanged, only its
    /// content.
    pub fn set_uniform_data(&mut self, name: &str, data: &[u8]) {
        self.uniform_data.insert(name.to_string(), data.to_vec());
        if let Some(block) = self.uniform_blocks.get(name) {
            Self::write_block(block, data);
        }
    }

    /// Assign the texture bound under `name`; re-arms the descriptor
    /// state since the referenced image changes
    pub fn set_texture(&mut self, name: &str, texture: Arc<dyn Texture>) {
        self.textures.insert(name.to_string(), texture);
        self.descriptor_state = DescriptorState::Stale;
    }

    fn recompute_hash(&mut self) {
        fn group(
            a: Option<&Arc<ShaderModule>>,
            b: Option<&Arc<ShaderModule>>,
            c: Option<&Arc<ShaderModule>>,
        ) -> u64 {
            let mut hasher = FxHasher::default();
            hasher.write_u64(a.map_or(0, |m| m.hash()));
            hasher.write_u64(b.map_or(0, |m| m.hash()));
            hasher.write_u64(c.map_or(0, |m| m.hash()));
            hasher.finish()
        }

        let graphics = group(
            self.vertex.as_ref(),
            self.fragment.as_ref(),
            self.geometry.as_ref(),
        );
        let rest = group(
            self.compute.as_ref(),
            self.tess_control.as_ref(),
            self.tess_eval.as_ref(),
        );

        let mut hasher = FxHasher::default();
        hasher.write_u64(graphics);
        hasher.write_u64(rest);
        self.hash = hasher.finish();
    }

    fn module_for(&self, stage: ShaderStage) -> Option<&Arc<ShaderModule>> {
        match stage {
            ShaderStage::Vertex => self.vertex.as_ref(),
            ShaderStage::Fragment => self.fragment.as_ref(),
            ShaderStage::Geometry => self.geometry.as_ref(),
            ShaderStage::Compute => self.compute.as_ref(),
            ShaderStage::TessControl => self.tess_control.as_ref(),
            ShaderStage::TessEval => self.tess_eval.as_ref(),
        }
    }

    /// Rebuild all layout-dependent GPU objects if the layout is stale
    fn ensure_layout(&mut self) {
        if self.layout_state == LayoutState::Valid {
            return;
        }
        self.destroy_layout_objects();

        for stage in STAGE_ORDER {
            if let Some(module) = self.module_for(stage).cloned() {
                self.merge_stage(stage, &module);
            }
        }

        let gpu = unrecoverable(device::instance());
        self.descriptor_set_layout =
            unrecoverable(gpu.create_descriptor_set_layout(&self.set_layout_bindings));
        self.descriptor_pool = unrecoverable(gpu.create_descriptor_pool(&self.pool_sizes, 1));
        self.descriptor_set =
            unrecoverable(gpu.allocate_descriptor_set(self.descriptor_pool, self.descriptor_set_layout));
        self.pipeline_layout = unrecoverable(
            gpu.create_pipeline_layout(std::slice::from_ref(&self.descriptor_set_layout)),
        );

        self.layout_state = LayoutState::Valid;
        self.descriptor_state = DescriptorState::Stale;

        nebula_debug!(
            "nebula3d::shader",
            "Realized program layout: {} stages, {} bindings ({} uniform blocks, {} images)",
            self.shader_stages.len(),
            self.set_layout_bindings.len(),
            self.uniform_blocks.len(),
            self.image_bindings.len()
        );
    }

    /// Reflect one stage and append its bindings to the merged lists
    fn merge_stage(&mut self, stage: ShaderStage, module: &Arc<ShaderModule>) {
        self.shader_stages.push(ShaderStageInfo {
            stage: stage.to_vk(),
            module: module.handle(),
        });

        let reflected = unrecoverable(reflection::reflect_stage(module.code(), stage));

        for resource in reflected.resources {
            match resource {
                ReflectedResource::UniformBlock(block) => self.merge_uniform_block(stage, block),
                ReflectedResource::SampledImage(image) => self.merge_sampled_image(stage, image),
            }
        }

        if stage == ShaderStage::Vertex {
            for input in reflected.inputs {
                self.vertex_inputs.add_binding(input.attribute, input.location);
            }
            self.vertex_inputs.update();
        }
    }

    fn merge_uniform_block(&mut self, stage: ShaderStage, block: UniformBlockReflection) {
        let binding = self.set_layout_bindings.len() as u32;
        self.set_layout_bindings.push(
            vk::DescriptorSetLayoutBinding::default()
                .binding(binding)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(stage.to_vk()),
        );
        self.pool_sizes.push(vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: 1,
        });

        let entry = Self::create_uniform_buffer(binding, block.declared_size);
        if let Some(data) = self.uniform_data.get(&block.name) {
            // Replay bytes recorded before this buffer existed
            Self::write_block(&entry, data);
        }

        if let Some(previous) = self.uniform_blocks.insert(block.name.clone(), entry) {
            nebula_warn!(
                "nebula3d::shader",
                "Uniform block '{}' declared by more than one stage; keeping the {:?} declaration",
                block.name,
                stage
            );
            if let Some(gpu) = device::try_instance() {
                gpu.free_memory(previous.memory);
                gpu.destroy_buffer(previous.buffer);
            }
        }
    }

    fn merge_sampled_image(&mut self, stage: ShaderStage, image: SampledImageReflection) {
        let binding = self.set_layout_bindings.len() as u32;
        self.set_layout_bindings.push(
            vk::DescriptorSetLayoutBinding::default()
                .binding(binding)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(stage.to_vk()),
        );
        self.pool_sizes.push(vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: 1,
        });

        if self
            .image_bindings
            .insert(image.name.clone(), ImageBinding { binding })
            .is_some()
        {
            nebula_warn!(
                "nebula3d::shader",
                "Sampled image '{}' declared by more than one stage; keeping the {:?} declaration",
                image.name,
                stage
            );
        }
    }

    /// Allocate one host-visible, host-coherent backing buffer
    fn create_uniform_buffer(binding: u32, declared_size: u32) -> UniformBlockBinding {
        let gpu = unrecoverable(device::instance());
        // Runtime-sized blocks reflect as size 0; keep vkCreateBuffer legal
        let size = vk::DeviceSize::from(declared_size.max(4));
        let buffer = unrecoverable(gpu.create_buffer(size, vk::BufferUsageFlags::UNIFORM_BUFFER));
        let requirements = gpu.buffer_memory_requirements(buffer);
        let memory = unrecoverable(gpu.allocate_host_visible_memory(requirements));
        unrecoverable(gpu.bind_buffer_memory(buffer, memory));

        UniformBlockBinding {
            binding,
            buffer,
            memory,
            declared_size,
            allocated_size: requirements.size,
            buffer_info: vk::DescriptorBufferInfo {
                buffer,
                offset: 0,
                range: requirements.size,
            },
        }
    }

    /// Map, copy, unmap; content is observable by the next submission
    fn write_block(block: &UniformBlockBinding, data: &[u8]) {
        if data.len() as u64 > u64::from(block.declared_size) {
            nebula_warn!(
                "nebula3d::shader",
                "Uniform write of {} bytes exceeds declared block size {}",
                data.len(),
                block.declared_size
            );
        }
        let gpu = unrecoverable(device::instance());
        let len = (data.len() as vk::DeviceSize).min(block.allocated_size) as usize;
        let mapped = unrecoverable(gpu.map_memory(block.memory, block.allocated_size));
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped, len);
        }
        gpu.unmap_memory(block.memory);
    }

    /// Flush pending descriptor writes in one batched device call
    fn ensure_descriptor_set(&mut self) {
        debug_assert_eq!(self.layout_state, LayoutState::Valid);
        if self.descriptor_state == DescriptorState::Flushed {
            return;
        }
        let gpu = unrecoverable(device::instance());

        // Gather image records first so the write array can reference them
        let mut image_infos = Vec::with_capacity(self.image_bindings.len());
        let mut image_slots = Vec::with_capacity(self.image_bindings.len());
        for (name, image) in &self.image_bindings {
            match self.textures.get(name) {
                Some(texture) => {
                    image_infos.push(texture.image_info());
                    image_slots.push(image.binding);
                }
                None => {
                    nebula_warn!(
                        "nebula3d::shader",
                        "No texture assigned for '{}'; skipping its descriptor write",
                        name
                    );
                }
            }
        }

        let mut writes =
            Vec::with_capacity(self.uniform_blocks.len() + image_slots.len());
        for block in self.uniform_blocks.values() {
            writes.push(
                vk::WriteDescriptorSet::default()
                    .dst_set(self.descriptor_set)
                    .dst_binding(block.binding)
                    .dst_array_element(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(std::slice::from_ref(&block.buffer_info)),
            );
        }
        for (slot, info) in image_slots.iter().zip(image_infos.iter()) {
            writes.push(
                vk::WriteDescriptorSet::default()
                    .dst_set(self.descriptor_set)
                    .dst_binding(*slot)
                    .dst_array_element(0)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(std::slice::from_ref(info)),
            );
        }

        gpu.update_descriptor_sets(&writes);

        self.descriptor_state = DescriptorState::Flushed;
    }

    /// Release realized objects and clear the merged binding tables.
    /// No-op while the layout is already invalid.
    fn destroy_layout_objects(&mut self) {
        self.descriptor_state = DescriptorState::Stale;
        if self.layout_state == LayoutState::Invalid {
            return;
        }
        self.layout_state = LayoutState::Invalid;

        if let Some(gpu) = device::try_instance() {
            gpu.destroy_descriptor_set_layout(self.descriptor_set_layout);
            gpu.destroy_descriptor_pool(self.descriptor_pool);
            gpu.destroy_pipeline_layout(self.pipeline_layout);
            for block in self.uniform_blocks.values() {
                gpu.free_memory(block.memory);
                gpu.destroy_buffer(block.buffer);
            }
        }

        self.descriptor_set_layout = vk::DescriptorSetLayout::null();
        self.descriptor_pool = vk::DescriptorPool::null();
        self.descriptor_set = vk::DescriptorSet::null();
        self.pipeline_layout = vk::PipelineLayout::null();

        self.shader_stages.clear();
        self.set_layout_bindings.clear();
        self.pool_sizes.clear();
        self.uniform_blocks.clear();
        self.image_bindings.clear();
        self.vertex_inputs.clear();
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.destroy_layout_objects();
    }
}
