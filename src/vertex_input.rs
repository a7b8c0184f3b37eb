//! Vertex input binding table
//!
//! Maps semantic vertex attributes to the location slots the vertex
//! stage declared for them. The table's content hash is deterministic
//! over insertion content and serves as part of pipeline-state cache
//! keys.

use crate::nebula_error;
use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Sentinel returned when an attribute has no bound location
pub const INVALID_LOCATION: i32 = -1;

/// Semantic vertex-attribute identifiers recognized by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    /// Unrecognized shader input (recorded so the slot stays visible in diagnostics)
    None,
    Position,
    UV0,
    UV1,
    Normal,
    Tangent,
    Color,
    SkinWeight,
    SkinIndex,
    Custom0,
    Custom1,
    Custom2,
    Custom3,
}

impl VertexAttribute {
    /// Map a shader source input name to its semantic attribute
    pub fn from_shader_name(name: &str) -> Option<Self> {
        match name {
            "inPosition" => Some(VertexAttribute::Position),
            "inUV0" => Some(VertexAttribute::UV0),
            "inUV1" => Some(VertexAttribute::UV1),
            "inNormal" => Some(VertexAttribute::Normal),
            "inTangent" => Some(VertexAttribute::Tangent),
            "inColor" => Some(VertexAttribute::Color),
            "inSkinWeight" => Some(VertexAttribute::SkinWeight),
            "inSkinIndex" => Some(VertexAttribute::SkinIndex),
            "inCustom0" => Some(VertexAttribute::Custom0),
            "inCustom1" => Some(VertexAttribute::Custom1),
            "inCustom2" => Some(VertexAttribute::Custom2),
            "inCustom3" => Some(VertexAttribute::Custom3),
            _ => None,
        }
    }
}

/// Accumulator of attribute → location bindings for one vertex stage
#[derive(Debug, Clone, Default)]
pub struct VertexInputBindingTable {
    attributes: Vec<VertexAttribute>,
    locations: Vec<i32>,
    hash: u64,
    valid: bool,
}

impl VertexInputBindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Location bound for `attribute`, or [`INVALID_LOCATION`] with a
    /// diagnostic when the vertex stage never declared it
    pub fn location(&self, attribute: VertexAttribute) -> i32 {
        for (i, bound) in self.attributes.iter().enumerate() {
            if *bound == attribute {
                return self.locations[i];
            }
        }
        nebula_error!(
            "nebula3d::shader",
            "No location bound for vertex attribute {:?}",
            attribute
        );
        INVALID_LOCATION
    }

    /// Record one attribute binding; invalidates the cached hash
    pub fn add_binding(&mut self, attribute: VertexAttribute, location: i32) {
        self.valid = false;
        self.attributes.push(attribute);
        self.locations.push(location);
    }

    pub fn input_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    pub fn clear(&mut self) {
        self.valid = false;
        self.hash = 0;
        self.attributes.clear();
        self.locations.clear();
    }

    /// Finalize the content hash after all bindings are added
    pub fn update(&mut self) {
        if !self.valid {
            let mut hasher = FxHasher::default();
            for attribute in &self.attributes {
                hasher.write_u32(*attribute as u32);
            }
            for location in &self.locations {
                hasher.write_i32(*location);
            }
            self.hash = hasher.finish();
            self.valid = true;
        }
    }

    /// Content hash for pipeline-state cache keys (finalize with [`update`](Self::update) first)
    pub fn hash(&self) -> u64 {
        self.hash
    }
}
