//! Error types for the shader resource-binding subsystem
//!
//! Failures fall into two tiers. Recoverable errors (bytecode load
//! failures, missing device accessor) are returned to the caller as
//! [`Error`] values. Graphics-device call failures during layout
//! realization are unrecoverable at this layer and funnel through
//! [`unrecoverable`], which logs a diagnostic naming the failing
//! operation and terminates the process.

use ash::vk;
use std::fmt;

/// Result type for shader subsystem operations
pub type Result<T> = std::result::Result<T, Error>;

/// Shader subsystem errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Shader bytecode could not be read or is malformed (recoverable)
    Load(String),

    /// No graphics device has been installed via `device::install` (recoverable)
    NoDevice,

    /// A graphics-device call failed (unrecoverable)
    Device {
        /// Name of the failing device operation
        op: &'static str,
        /// Raw Vulkan result code
        code: vk::Result,
    },

    /// SPIR-V reflection failed on a realized module (unrecoverable)
    Reflect(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Load(msg) => write!(f, "Failed to load shader bytecode: {}", msg),
            Error::NoDevice => write!(f, "No graphics device installed"),
            Error::Device { op, code } => write!(f, "Device call '{}' failed: {:?}", op, code),
            Error::Reflect(msg) => write!(f, "SPIR-V reflection failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// Unwrap a result whose failure has no defined recovery path.
///
/// Device-call failures during module creation, layout realization,
/// buffer allocation, and descriptor updates leave no consistent GPU
/// state to fall back to. The diagnostic identifies the failing
/// operation before the process terminates.
pub(crate) fn unrecoverable<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            crate::nebula_error!("nebula3d::shader", "Unrecoverable graphics error: {}", err);
            std::process::abort();
        }
    }
}
