//! Crate-level error types.

use std::fmt;

use crate::gpu::render_context::RenderContextError;

/// Errors produced by the umbra crate.
#[derive(Debug)]
pub enum UmbraError {
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// A value was addressed to a slot the renderable schema does not
    /// declare.
    UnknownSlot(String),
    /// A value of the wrong kind was written into a schema slot.
    SlotTypeMismatch {
        /// Slot name.
        slot: String,
        /// Kind declared by the schema.
        expected: &'static str,
        /// Kind of the rejected value.
        found: &'static str,
    },
    /// A renderable was built without a value for one of its texture slots.
    MissingTexture(String),
    /// A prop key that the parameter table does not declare.
    UnknownParam(String),
    /// A prop value whose kind does not match the parameter declaration.
    ParamType {
        /// Parameter name.
        param: String,
        /// Kind declared by the parameter table.
        expected: &'static str,
    },
    /// Light direction and color arrays differ in length.
    LightMismatch {
        /// Number of directions.
        directions: usize,
        /// Number of colors.
        colors: usize,
    },
    /// Shader composition or validation failure.
    Shader(String),
    /// Failed to resolve or decode a texture asset.
    Asset(String),
    /// Reading a render target back to the CPU failed.
    Readback(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// Failed to spawn a background thread.
    ThreadSpawn(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for UmbraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::UnknownSlot(slot) => {
                write!(f, "schema has no slot named '{slot}'")
            }
            Self::SlotTypeMismatch {
                slot,
                expected,
                found,
            } => write!(
                f,
                "slot '{slot}' expects a {expected} value, got {found}"
            ),
            Self::MissingTexture(slot) => {
                write!(f, "no texture bound to slot '{slot}'")
            }
            Self::UnknownParam(name) => {
                write!(f, "unknown post-processing parameter '{name}'")
            }
            Self::ParamType { param, expected } => {
                write!(f, "parameter '{param}' expects a {expected} value")
            }
            Self::LightMismatch { directions, colors } => write!(
                f,
                "light has {directions} directions but {colors} colors"
            ),
            Self::Shader(msg) => write!(f, "shader error: {msg}"),
            Self::Asset(msg) => write!(f, "asset error: {msg}"),
            Self::Readback(msg) => write!(f, "readback failed: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::ThreadSpawn(e) => {
                write!(f, "failed to spawn thread: {e}")
            }
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for UmbraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Io(e) | Self::ThreadSpawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for UmbraError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for UmbraError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
