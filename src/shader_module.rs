//! ShaderModule and ModuleCache - pre-compiled bytecode ownership
//!
//! A [`ShaderModule`] owns one stage's SPIR-V words, its content hash,
//! and the realized `vk::ShaderModule`. Modules are immutable after
//! construction and shared via `Arc` between the [`ModuleCache`] and
//! every program referencing them; the GPU handle and the words are
//! released together when the last owner drops.

use crate::device;
use crate::error::{unrecoverable, Error, Result};
use crate::{nebula_debug, nebula_error, nebula_info};
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::Hasher;
use std::sync::Arc;

/// One shader stage's pre-compiled bytecode and its realized GPU module
pub struct ShaderModule {
    handle: ash::vk::ShaderModule,
    code: Vec<u32>,
    hash: u64,
}

impl ShaderModule {
    /// Realize a GPU module from SPIR-V words.
    ///
    /// Device failure during module creation is unrecoverable.
    pub fn from_words(code: Vec<u32>) -> Self {
        let gpu = unrecoverable(device::instance());
        let handle = unrecoverable(gpu.create_shader_module(&code));
        let hash = hash_words(&code);
        nebula_debug!(
            "nebula3d::shader",
            "Created shader module ({} bytes, hash {:#018x})",
            code.len() * 4,
            hash
        );
        Self { handle, code, hash }
    }

    /// The realized GPU module handle
    pub fn handle(&self) -> ash::vk::ShaderModule {
        self.handle
    }

    /// The raw SPIR-V words
    pub fn code(&self) -> &[u32] {
        &self.code
    }

    /// Bytecode length in bytes
    pub fn byte_len(&self) -> usize {
        self.code.len() * 4
    }

    /// Content hash: a pure function of the bytecode bytes
    pub fn hash(&self) -> u64 {
        self.hash
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        if let Some(gpu) = device::try_instance() {
            gpu.destroy_shader_module(self.handle);
        }
    }
}

/// Hash SPIR-V words; identical bytecode always hashes identically
fn hash_words(code: &[u32]) -> u64 {
    let mut hasher = FxHasher::default();
    for word in code {
        hasher.write_u32(*word);
    }
    hasher.finish()
}

/// Convert raw bytecode bytes to SPIR-V words
pub(crate) fn words_from_bytes(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(Error::Load(format!(
            "bytecode size {} is not a positive multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Path-keyed registry of realized shader modules
///
/// Identical files are read and compiled to a GPU module at most once
/// per registry lifetime. There is no eviction policy; the caller owns
/// the registry and clears it at teardown. A program holding an `Arc`
/// to a module keeps that module alive independently of the registry.
#[derive(Default)]
pub struct ModuleCache {
    modules: FxHashMap<String, Arc<ShaderModule>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a module, reusing the cached entry if `path` was seen before.
    ///
    /// A read failure is recoverable and returns `Error::Load`; device
    /// failure while realizing the GPU module is unrecoverable.
    pub fn load(&mut self, path: &str) -> Result<Arc<ShaderModule>> {
        if let Some(module) = self.modules.get(path) {
            return Ok(module.clone());
        }

        let bytes = std::fs::read(path).map_err(|err| {
            nebula_error!("nebula3d::shader", "Failed to read '{}': {}", path, err);
            Error::Load(format!("{}: {}", path, err))
        })?;
        let words = words_from_bytes(&bytes).map_err(|err| {
            nebula_error!("nebula3d::shader", "Malformed bytecode in '{}'", path);
            err
        })?;

        let module = Arc::new(ShaderModule::from_words(words));
        self.modules.insert(path.to_string(), module.clone());
        Ok(module)
    }

    /// Number of cached modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Drop all registry references.
    ///
    /// Modules still referenced by a program survive until that program
    /// releases them.
    pub fn clear(&mut self) {
        if !self.modules.is_empty() {
            nebula_info!(
                "nebula3d::shader",
                "Clearing module cache ({} entries)",
                self.modules.len()
            );
        }
        self.modules.clear();
    }
}
