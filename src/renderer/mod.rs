//! Rendering passes.

pub mod postprocess;
