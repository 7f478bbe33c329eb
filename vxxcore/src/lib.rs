//! Rewriting pipeline preparing frontend kernel modules for the vendor backend.
//!
//! The frontend emits SPIR-flavoured modules whose symbol names, calling
//! conventions and metadata the backend compiler refuses. The passes under
//! [`passes`] fix that in place, and [`pipeline::Pipeline`] runs them in the
//! order they depend on. Most consumers only need [`pipeline::Pipeline`] and
//! [`utils::conf::PipelineConfig`].

pub mod callgraph;
pub mod demangle;
pub mod magic;
pub mod naming;
pub mod passes;
pub mod pipeline;
#[cfg(any(test, feature = "test-utils"))]
pub mod tests_utils;
pub mod transform;
pub mod utils;

pub extern crate vxxinstr;
