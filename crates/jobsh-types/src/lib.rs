//! Pure data types for jobsh: pipelines, job status and command results.
//!
//! This crate is a leaf dependency with no process handling and no parser.
//! It exists so that embedders can talk about jobs and pipelines without
//! pulling in jobsh-kernel and its unix-only dependencies.

pub mod job;
pub mod pipeline;
pub mod result;

// Flat re-exports for convenience
pub use job::*;
pub use pipeline::*;
pub use result::*;
