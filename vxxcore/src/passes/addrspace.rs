//! Generic address-space cleanup around the black-box backend call.
//!
//! Address-space inference never looks through calls to the backend
//! partitioning intrinsic, so the pointers handed to it keep a cast to the
//! generic address space the backend rejects:
//!
//! ```text
//! %1 = addrspacecast ptr %0 to ptr addrspace(4)
//! call void @_ssdm_SpecArrayPartition(ptr addrspace(4) %1, ...)
//! ```
//!
//! The cast is collapsed: every use of `%1` reads `%0` instead and the cast
//! is erased. Other users of the cast are rewritten as well.
use log::debug;
use smallvec::SmallVec;
use vxxinstr::modules::{
    FunctionId, Module,
    instructions::VxInstr,
    operand::{Name, Operand},
};

use crate::{magic::BLACK_BOX_CALLEE, utils::error::PassResult};

/// Collapse the generic casts feeding black-box calls of function `id`.
/// Returns the number of casts removed.
pub fn fix_address_spaces(module: &mut Module, id: FunctionId) -> PassResult<usize> {
    let Some(black_box) = module.find_function(BLACK_BOX_CALLEE) else {
        return Ok(0);
    };
    let function = &mut module.functions[id];

    let mut worklist: SmallVec<Name, 4> = SmallVec::new();
    for (_, call) in function.calls() {
        if call.resolved_callee() != Some(black_box) {
            continue;
        }
        for name in call.args.iter().filter_map(Operand::as_reg) {
            let is_generic_cast = function
                .find_definition(name)
                .and_then(|at| function.instruction(at))
                .is_some_and(|instr| matches!(instr, VxInstr::Cast(cast) if cast.is_generic_addrspace_cast()));
            if is_generic_cast && !worklist.contains(&name) {
                worklist.push(name);
            }
        }
    }

    let mut removed = 0;
    for name in worklist {
        let Some(at) = function.find_definition(name) else {
            continue;
        };
        let VxInstr::Cast(cast) = function.remove_instruction(at)? else {
            continue;
        };
        let rewritten = function.replace_all_uses(name, &cast.value);
        debug!(
            "Collapsed generic cast {} in {} ({} use(s) rewritten)",
            name, function.name, rewritten
        );
        removed += 1;
    }

    Ok(removed)
}
