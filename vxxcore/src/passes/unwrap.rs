//! Property wrapper unwrapping.
//!
//! Kernel-level properties are attached by wrapping the kernel body in a
//! function carrying `fpga.` string attributes and the
//! `fpga.propertywrapper` marker. The wrapper only forwards to the wrapped
//! function, so it is inlined into its caller after handing its annotations
//! over.
//!
//! The walk starts at every kernel and goes depth first through every defined
//! callee. Wrappers are unwrapped bottom-up: the wrappers called from a
//! wrapper are inlined into it before it is itself inlined.
use std::collections::HashMap;

use log::{debug, info};
use vxxinstr::modules::{CallSite, FunctionId, Module};

use crate::{
    magic::{FPGA_ATTRIBUTE_PREFIX, PROPERTY_WRAPPER_ATTRIBUTE},
    passes::classify::{FunctionRole, KernelMode, functions_with_role},
    transform::inline::inline_call,
    utils::error::{PassError, PassResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// What to do next with the function being visited.
enum Step {
    /// Inline the wrapper called at the site.
    Unwrap(CallSite, FunctionId),
    /// Visit a callee reached for the first time.
    Descend(FunctionId),
}

#[derive(Debug, Default)]
struct Unwrapper {
    state: HashMap<FunctionId, VisitState>,
    inlined: usize,
}

fn is_wrapper(module: &Module, id: FunctionId) -> bool {
    module
        .functions
        .get(id)
        .is_some_and(|f| f.attributes.contains(PROPERTY_WRAPPER_ATTRIBUTE))
}

impl Unwrapper {
    /// First call of `caller` that needs handling, in block order.
    fn next_step(&self, module: &Module, caller: FunctionId) -> Option<Step> {
        module.functions[caller].calls().find_map(|(at, call)| {
            let callee = call.resolved_callee()?;
            let function = module.functions.get(callee)?;
            if is_wrapper(module, callee) {
                Some(Step::Unwrap(CallSite { caller, at }, callee))
            } else if !function.is_declaration() && !self.state.contains_key(&callee) {
                Some(Step::Descend(callee))
            } else {
                None
            }
        })
    }

    fn visit(&mut self, module: &mut Module, id: FunctionId) -> PassResult<()> {
        self.state.insert(id, VisitState::InProgress);

        while let Some(step) = self.next_step(module, id) {
            match step {
                Step::Descend(callee) => self.visit(module, callee)?,
                Step::Unwrap(site, wrapper) => {
                    match self.state.get(&wrapper) {
                        Some(VisitState::InProgress) => {
                            return Err(PassError::WrapperCycle {
                                function: module.functions[wrapper].name.clone(),
                            });
                        }
                        Some(VisitState::Done) => {}
                        None => self.visit(module, wrapper)?,
                    }
                    self.unwrap_call(module, site, wrapper)?;
                }
            }
        }

        self.state.insert(id, VisitState::Done);
        Ok(())
    }

    fn unwrap_call(&mut self, module: &mut Module, site: CallSite, wrapper: FunctionId) -> PassResult<()> {
        let annotations: Vec<(String, String)> = module.functions[wrapper]
            .attributes
            .with_prefix(FPGA_ATTRIBUTE_PREFIX)
            .filter(|(key, _)| *key != PROPERTY_WRAPPER_ATTRIBUTE)
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        let wrapper_name = module.functions[wrapper].name.clone();
        let caller = &mut module.functions[site.caller];
        debug!(
            "Unwrapping {} into {}, moving {} annotation(s)",
            wrapper_name,
            caller.name,
            annotations.len()
        );
        for (key, value) in annotations {
            caller.attributes.insert(key, value);
        }

        inline_call(module, site)?;
        self.inlined += 1;
        Ok(())
    }
}

/// Unwrap every property wrapper reachable from the kernels. Returns the
/// number of wrapper calls inlined.
pub fn unwrap_property_wrappers(module: &mut Module, mode: KernelMode) -> PassResult<usize> {
    let mut unwrapper = Unwrapper::default();
    for kernel in functions_with_role(module, mode, FunctionRole::Kernel) {
        if !unwrapper.state.contains_key(&kernel) {
            unwrapper.visit(module, kernel)?;
        }
    }

    if unwrapper.inlined > 0 {
        info!("Unwrapped {} property wrapper call(s)", unwrapper.inlined);
    }
    Ok(unwrapper.inlined)
}
