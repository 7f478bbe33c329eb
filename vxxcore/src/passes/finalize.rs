//! Module-level finishing touches.
use log::debug;
use vxxinstr::modules::{CallingConvention, Module, metadata::MetadataNode};

use crate::{
    magic::{OCL_VERSION, OCL_VERSION_MD, SPIR_TRIPLE, SPIR_VERSION, SPIR_VERSION_MD, STALE_SOURCE_MD},
    passes::prepare::set_calling_convention,
};

/// Append the SPIR and OpenCL version records. Running twice appends twice.
pub fn set_versions(module: &mut Module) {
    module.add_named_metadata(SPIR_VERSION_MD, MetadataNode::from_i32s(SPIR_VERSION));
    module.add_named_metadata(OCL_VERSION_MD, MetadataNode::from_i32s(OCL_VERSION));
}

/// Drop the source language record the backend does not understand.
pub fn remove_stale_metadata(module: &mut Module) -> bool {
    module.erase_named_metadata(STALE_SOURCE_MD).is_some()
}

pub fn set_spir_triple(module: &mut Module) {
    module.target_triple = Some(SPIR_TRIPLE.to_string());
}

/// Force `cconv` on every non-intrinsic function and on the calls to them.
pub fn set_uniform_calling_convention(module: &mut Module, cconv: CallingConvention) -> usize {
    let mut changed = 0;
    for id in module.function_ids() {
        if module.functions[id].is_intrinsic() {
            continue;
        }
        set_calling_convention(module, id, cconv);
        changed += 1;
    }
    debug!("Calling convention {} set on {} function(s)", cconv, changed);
    changed
}
