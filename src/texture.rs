//! Texture collaborator seam
//!
//! The shader subsystem never owns textures; callers assign them by
//! name and keep them alive for as long as the program references them.
//! Only the image-descriptor record is read, at descriptor-flush time.

use ash::vk;

/// Queryable image-descriptor record exposed by texture instances
pub trait Texture {
    /// Descriptor record for binding this texture as a combined image sampler
    fn image_info(&self) -> vk::DescriptorImageInfo;
}
