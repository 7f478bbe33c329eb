//! IR-level transformations shared by the passes.
pub mod inline;
pub mod memintrinsics;
