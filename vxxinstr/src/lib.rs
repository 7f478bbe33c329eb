//! Kernel IR model.
//!
//! The crate exposes the small, LLVM-flavoured intermediate representation
//! rewritten by `vxxcore`. A [`modules::Module`] owns every function and
//! global in arenas addressed by stable handles, so passes may rename,
//! inline or erase entities while iterating over handles without
//! invalidating anything.

pub mod consts;
pub mod modules;
pub mod types;
pub mod utils;
