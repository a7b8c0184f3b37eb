//! SPIR-V reflection via spirq
//!
//! Extracts each stage's declared resource interface straight from its
//! bytecode: uniform blocks (name, declared byte size, binding slot),
//! sampled images (name, binding slot), and for the vertex stage the
//! named inputs with their location slots. Binding and location numbers
//! are reproduced exactly as decorated in the bytecode; reflection never
//! renumbers or compacts and never mutates the module.

use crate::error::{Error, Result};
use crate::vertex_input::VertexAttribute;
use crate::{nebula_error, nebula_trace, nebula_warn};
use ash::vk;

/// Shader stages a program can aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    TessControl,
    TessEval,
    Compute,
    Fragment,
}

impl ShaderStage {
    /// The corresponding Vulkan stage bit
    pub fn to_vk(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Geometry => vk::ShaderStageFlags::GEOMETRY,
            ShaderStage::TessControl => vk::ShaderStageFlags::TESSELLATION_CONTROL,
            ShaderStage::TessEval => vk::ShaderStageFlags::TESSELLATION_EVALUATION,
            ShaderStage::Compute => vk::ShaderStageFlags::COMPUTE,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }
}

/// A uniform block declared by one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformBlockReflection {
    /// Name as declared in shader source
    pub name: String,
    /// Declared struct size in bytes
    pub declared_size: u32,
    /// Binding slot as decorated in the bytecode
    pub source_binding: u32,
}

/// A combined image sampler declared by one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledImageReflection {
    /// Name as declared in shader source
    pub name: String,
    /// Binding slot as decorated in the bytecode
    pub source_binding: u32,
}

/// One reflected resource declaration, in stage declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectedResource {
    UniformBlock(UniformBlockReflection),
    SampledImage(SampledImageReflection),
}

/// A vertex-stage input attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexInputReflection {
    /// Name as declared in shader source
    pub name: String,
    /// Semantic attribute the name maps to (`None` when unrecognized)
    pub attribute: VertexAttribute,
    /// Location slot as decorated in the bytecode
    pub location: i32,
}

/// Everything reflected from one stage's bytecode
#[derive(Debug, Clone, Default)]
pub struct StageReflection {
    /// Uniform blocks and sampled images, in declaration order
    pub resources: Vec<ReflectedResource>,
    /// Vertex inputs; populated for the vertex stage only
    pub inputs: Vec<VertexInputReflection>,
}

/// Reflect one stage's declared resource interface from its bytecode.
///
/// Read-only; the module is not mutated. Unknown vertex input names are
/// logged and recorded under [`VertexAttribute::None`].
pub fn reflect_stage(code: &[u32], stage: ShaderStage) -> Result<StageReflection> {
    let entry_points = spirq::ReflectConfig::new()
        .spv(code)
        .ref_all_rscs(true)
        .reflect()
        .map_err(|err| {
            nebula_error!(
                "nebula3d::reflection",
                "SPIR-V reflection failed for {:?} stage: {:?}",
                stage,
                err
            );
            Error::Reflect(format!("{:?}", err))
        })?;

    let mut reflection = StageReflection::default();

    for entry_point in &entry_points {
        for var in entry_point.vars.iter() {
            match var {
                spirq::var::Variable::Descriptor {
                    name,
                    desc_bind,
                    desc_ty,
                    ty,
                    ..
                } => {
                    let var_name = name.clone().unwrap_or_default();
                    match desc_ty {
                        spirq::ty::DescriptorType::UniformBuffer() => {
                            reflection.resources.push(ReflectedResource::UniformBlock(
                                UniformBlockReflection {
                                    name: var_name,
                                    declared_size: ty.nbyte().unwrap_or(0) as u32,
                                    source_binding: desc_bind.bind(),
                                },
                            ));
                        }
                        spirq::ty::DescriptorType::CombinedImageSampler()
                        | spirq::ty::DescriptorType::SampledImage() => {
                            reflection.resources.push(ReflectedResource::SampledImage(
                                SampledImageReflection {
                                    name: var_name,
                                    source_binding: desc_bind.bind(),
                                },
                            ));
                        }
                        other => {
                            nebula_warn!(
                                "nebula3d::reflection",
                                "Ignoring descriptor '{}' of unsupported type {:?}",
                                var_name,
                                other
                            );
                        }
                    }
                }
                spirq::var::Variable::Input { name, location, .. }
                    if stage == ShaderStage::Vertex =>
                {
                    let var_name = name.clone().unwrap_or_default();
                    let attribute = match VertexAttribute::from_shader_name(&var_name) {
                        Some(attribute) => attribute,
                        None => {
                            nebula_error!(
                                "nebula3d::reflection",
                                "Vertex input '{}' does not name a known attribute",
                                var_name
                            );
                            VertexAttribute::None
                        }
                    };
                    reflection.inputs.push(VertexInputReflection {
                        name: var_name,
                        attribute,
                        location: location.loc() as i32,
                    });
                }
                _ => {}
            }
        }
    }

    nebula_trace!(
        "nebula3d::reflection",
        "Reflected {:?} stage: {} resources, {} inputs",
        stage,
        reflection.resources.len(),
        reflection.inputs.len()
    );

    Ok(reflection)
}
