// -- Lint policy ---------------------------------------------------------
// Clippy levels live in Cargo.toml; these are the crate-local extras.

// Documentation
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Clone / pass-by-value hygiene
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Unused / redundant code
#![warn(unused_results)]
#![warn(unused_qualifications)]
// Cast hygiene
#![warn(trivial_casts)]
#![warn(trivial_numeric_casts)]
// Test code may unwrap and panic freely
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! Screen-space shadow, ambient occlusion and post-processing passes on
//! wgpu.
//!
//! Every pass is a [`gpu::ComputeRenderable`]: a full-screen shader program
//! whose uniforms, textures and compile-time defines are declared by a
//! [`gpu::RenderableSchema`] and tracked in change-tracked value cells, so
//! only dirty values are uploaded and only define changes recompile.
//!
//! # Key entry points
//!
//! - [`renderer::postprocess::post_process::PostProcessStack`] - runs
//!   shadow, SSGI, postprocessing and old-movie passes in order
//! - [`renderer::postprocess::shadow::ShadowPass`],
//!   [`renderer::postprocess::postprocessing::PostprocessingPass`],
//!   [`renderer::postprocess::ssgi::SsgiPass`],
//!   [`renderer::postprocess::old_movie::OldMoviePass`] - the passes
//! - [`options::Options`] - per-pass settings with TOML presets
//! - [`gpu::Backend`] - the narrow GPU protocol, implemented by
//!   [`gpu::WgpuBackend`]
//! - [`reference`] - host evaluation of the shader kernels
//!
//! # Architecture
//!
//! Passes own their output targets and borrow their inputs; input texture
//! identity is compared every update so reused textures are not rebound.
//! The old-movie pass loads its grain and scratch images on a background
//! thread through an [`assets::AssetResolver`] and renders with procedural
//! placeholders until they arrive.

pub mod assets;
pub mod camera;
pub mod error;
pub mod gpu;
pub mod lighting;
pub mod options;
pub mod reference;
pub mod renderer;
