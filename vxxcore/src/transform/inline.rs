//! Call-site inlining.
//!
//! The caller block is split right after the call; the callee body is cloned
//! between the two halves with fresh labels and SSA names, arguments are
//! replaced by the call operands and every `ret` becomes a jump to the
//! continuation block. When the call produced a value, a single return value
//! is substituted directly and several are merged by a phi placed at the head
//! of the continuation block.
use std::collections::BTreeMap;

use log::{debug, trace};
use vxxinstr::modules::{
    BasicBlock, CallSite, Module,
    instructions::{Instruction, VxInstr, misc::Phi},
    operand::{Label, Name, Operand},
    terminator::{Jump, Terminator},
};

use crate::utils::error::{PassError, PassResult};

/// Inline the call at `site`. Returns the label of the continuation block,
/// which starts with the instructions that followed the call.
pub fn inline_call(module: &mut Module, site: CallSite) -> PassResult<Label> {
    let caller = module
        .functions
        .get(site.caller)
        .ok_or_else(|| vxxinstr::utils::Error::UndefinedFunction {
            function: format!("{:?}", site.caller),
        })?;
    let call = caller.call_at(site.at)?.clone();

    let not_inlinable = |reason: &str| PassError::NotInlinable {
        caller: caller.name.clone(),
        reason: reason.to_string(),
    };

    let callee_id = call
        .resolved_callee()
        .ok_or_else(|| not_inlinable("indirect call"))?;
    if callee_id == site.caller {
        return Err(not_inlinable("recursive call"));
    }
    let callee = module
        .functions
        .get(callee_id)
        .ok_or_else(|| not_inlinable("unknown callee"))?;
    if callee.is_declaration() {
        return Err(not_inlinable(&format!("'{}' has no body", callee.name)));
    }
    if callee.params.len() != call.args.len() {
        return Err(not_inlinable(&format!(
            "'{}' expects {} argument(s), the call passes {}",
            callee.name,
            callee.params.len(),
            call.args.len()
        )));
    }
    callee.check_ssa()?;
    let callee_name = callee.name.clone();
    let callee_body = callee.body.clone();

    let caller = &mut module.functions[site.caller];
    debug!("Inlining {} into {}", callee_name, caller.name);

    // Taken while the call still defines its result, so no cloned value can
    // reuse that name.
    let name_base = caller.next_available_name().0;

    // Isolate the call at the end of its block, then drop it.
    let continuation = caller.split_block(site.at.label, site.at.index + 1)?;
    caller.remove_instruction(site.at)?;

    // Fresh labels past the caller's own.
    let label_base = caller.next_available_label().0;
    let labels: BTreeMap<Label, Label> = callee_body
        .keys()
        .enumerate()
        .map(|(i, label)| (*label, Label(label_base + i as u32)))
        .collect();
    let rename = |name: Name| Name(name_base + name.0);

    let substitute = |operand: &mut Operand| match operand {
        Operand::Reg(name) => *name = rename(*name),
        Operand::Arg(index) => {
            let value = call.args.get(*index as usize).cloned();
            *operand = value.unwrap_or(Operand::Undef);
        }
        _ => {}
    };

    let mut returns = Vec::new();
    for (label, block) in callee_body {
        let new_label = labels[&label];
        let mut instructions = block.instructions;
        for instr in instructions.iter_mut() {
            if let Some(dest) = instr.destination() {
                instr.set_destination(rename(dest));
            }
            instr.operands_mut().for_each(&substitute);
            if let VxInstr::Phi(phi) = instr {
                for (incoming, _) in phi.values.iter_mut() {
                    *incoming = labels[&*incoming];
                }
            }
        }

        let mut terminator = block.terminator;
        terminator.operands_mut().for_each(&substitute);
        for target in terminator.targets_mut() {
            *target = labels[&*target];
        }
        if let Terminator::Ret(ret) = terminator {
            returns.push((new_label, ret.value));
            terminator = Jump {
                target: continuation,
            }
            .into();
        }

        caller
            .body
            .insert(new_label, BasicBlock::new(instructions, terminator));
    }

    if let Some(entry) = caller.body.get_mut(&site.at.label) {
        entry.terminator = Jump {
            target: labels[&Label::NIL],
        }
        .into();
    }

    if let Some(dest) = call.dest {
        let mut values: Vec<(Label, Operand)> = returns
            .into_iter()
            .map(|(label, value)| (label, value.unwrap_or(Operand::Undef)))
            .collect();
        match values.len() {
            0 => {
                caller.replace_all_uses(dest, &Operand::Undef);
            }
            1 => {
                let (_, value) = values.remove(0);
                caller.replace_all_uses(dest, &value);
            }
            _ => {
                let phi = Phi {
                    dest,
                    ty: call.ty.clone(),
                    values,
                };
                if let Some(block) = caller.body.get_mut(&continuation) {
                    block.instructions.insert(0, phi.into());
                }
            }
        }
    }

    trace!("After inlining {}:\n{}", callee_name, caller.fmt(None));
    Ok(continuation)
}
