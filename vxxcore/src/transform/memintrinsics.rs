//! Lowering of memory intrinsics into explicit byte loops.
//!
//! The backend has no implementation of `llvm.memcpy.*`, `llvm.memmove.*` and
//! `llvm.memset.*`, so every call to them is expanded in place:
//!
//! ```text
//! before:  ...
//!          %z = icmp eq len, 0
//!          br %z, exit, loop
//! loop:    %i = phi [0, before], [%n, loop]
//!          <one byte of work at offset %i>
//!          %n = add %i, 1
//!          %c = icmp ult %n, len
//!          br %c, loop, exit
//! exit:    ...
//! ```
//!
//! `memmove` compares the two pointers first and walks backwards when the
//! source lies below the destination.
use log::debug;
use strum::EnumIs;
use vxxinstr::{
    consts::IConst,
    modules::{
        BasicBlock, CallSite, Module,
        instructions::{
            VxInstr,
            int::{IAdd, ICmp, ICmpVariant, ISub},
            mem::{MGetElementPtr, MLoad, MStore},
            misc::Phi,
        },
        FunctionId,
        operand::{Label, Name, Operand},
        terminator::{CBranch, Terminator},
    },
    types::Type,
};

use crate::{
    magic::{MEMCPY_INTRINSIC_PREFIX, MEMMOVE_INTRINSIC_PREFIX, MEMSET_INTRINSIC_PREFIX},
    utils::error::{PassError, PassResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum MemIntrinsic {
    Copy,
    Move,
    Set,
}

impl MemIntrinsic {
    /// Recognize a memory intrinsic from its callee name.
    pub fn from_callee_name(name: &str) -> Option<Self> {
        if name.starts_with(MEMCPY_INTRINSIC_PREFIX) {
            Some(MemIntrinsic::Copy)
        } else if name.starts_with(MEMMOVE_INTRINSIC_PREFIX) {
            Some(MemIntrinsic::Move)
        } else if name.starts_with(MEMSET_INTRINSIC_PREFIX) {
            Some(MemIntrinsic::Set)
        } else {
            None
        }
    }
}

/// First memory intrinsic call of `caller`.
fn find_intrinsic_call(module: &Module, caller: FunctionId) -> Option<(CallSite, MemIntrinsic)> {
    let function = module.functions.get(caller)?;
    function.calls().find_map(|(at, call)| {
        let callee = module.functions.get(call.resolved_callee()?)?;
        let kind = MemIntrinsic::from_callee_name(&callee.name)?;
        Some((CallSite { caller, at }, kind))
    })
}

/// Lower every memory intrinsic call of the module. Returns the number of
/// calls expanded.
pub fn lower_mem_intrinsics(module: &mut Module) -> PassResult<usize> {
    let mut lowered = 0;
    for id in module.function_ids() {
        while let Some((site, kind)) = find_intrinsic_call(module, id) {
            lower_mem_intrinsic(module, site, kind)?;
            lowered += 1;
        }
    }
    Ok(lowered)
}

/// Fresh SSA names, handed out in order.
struct Names(u32);

impl Names {
    fn next(&mut self) -> Name {
        let name = Name(self.0);
        self.0 += 1;
        name
    }
}

/// Expand the intrinsic call at `site`.
pub fn lower_mem_intrinsic(module: &mut Module, site: CallSite, kind: MemIntrinsic) -> PassResult<()> {
    let caller = &module.functions[site.caller];
    let call = caller.call_at(site.at)?.clone();
    let callee_name = call
        .resolved_callee()
        .and_then(|id| module.functions.get(id))
        .map(|f| f.name.clone())
        .unwrap_or_default();

    let [dst, src_or_value, len, rest @ ..] = call.args.as_slice() else {
        return Err(PassError::UnsupportedConstruct {
            symbol: callee_name,
            caller: caller.name.clone(),
        });
    };
    let volatile = rest
        .first()
        .is_some_and(|flag| matches!(flag, Operand::Imm(c) if c.value != 0));
    let len_ty = module.value_type(caller, len).unwrap_or(Type::I64);
    let bits = len_ty.int_width().unwrap_or(64);
    let constant = |value: u64| -> Operand {
        IConst::new(bits, value)
            .map(Operand::Imm)
            .unwrap_or(Operand::Undef)
    };
    let dst_ty = module.value_type(caller, dst).unwrap_or(Type::PTR);
    let src_ty = module.value_type(caller, src_or_value).unwrap_or(Type::PTR);

    let caller = &mut module.functions[site.caller];
    debug!("Lowering {} in {}", callee_name, caller.name);

    let exit = caller.split_block(site.at.label, site.at.index + 1)?;
    caller.remove_instruction(site.at)?;

    let mut names = Names(caller.next_available_name().0);
    let first_label = caller.next_available_label().0;
    let header = site.at.label;

    // Zero-length guard in the header block.
    let is_empty = names.next();
    let guard = ICmp {
        dest: is_empty,
        variant: ICmpVariant::Eq,
        lhs: len.clone(),
        rhs: constant(0),
    };

    // Body of one iteration at byte offset `index`.
    let byte_op = |names: &mut Names, index: Operand| -> Vec<VxInstr> {
        let dst_addr = names.next();
        let mut instructions = vec![];
        let stored = match kind {
            MemIntrinsic::Set => src_or_value.clone(),
            MemIntrinsic::Copy | MemIntrinsic::Move => {
                let src_addr = names.next();
                let byte = names.next();
                instructions.push(
                    MGetElementPtr {
                        dest: src_addr,
                        ty: src_ty.clone(),
                        elem_ty: Type::I8,
                        base: src_or_value.clone(),
                        indices: vec![index.clone()],
                    }
                    .into(),
                );
                instructions.push(
                    MLoad {
                        dest: byte,
                        ty: Type::I8,
                        addr: Operand::Reg(src_addr),
                        volatile,
                    }
                    .into(),
                );
                Operand::Reg(byte)
            }
        };
        instructions.push(
            MGetElementPtr {
                dest: dst_addr,
                ty: dst_ty.clone(),
                elem_ty: Type::I8,
                base: dst.clone(),
                indices: vec![index],
            }
            .into(),
        );
        instructions.push(
            MStore {
                addr: Operand::Reg(dst_addr),
                value: stored,
                volatile,
            }
            .into(),
        );
        instructions
    };

    // Forward loop: index from 0 up to len - 1, entered from `pred`.
    let forward_loop = |names: &mut Names, label: Label, pred: Label| -> BasicBlock {
        let index = names.next();
        let next = names.next();
        let more = names.next();
        let mut instructions: Vec<VxInstr> = vec![
            Phi {
                dest: index,
                ty: len_ty.clone(),
                values: vec![(pred, constant(0)), (label, Operand::Reg(next))],
            }
            .into(),
        ];
        instructions.extend(byte_op(names, Operand::Reg(index)));
        instructions.push(
            IAdd {
                dest: next,
                ty: len_ty.clone(),
                lhs: Operand::Reg(index),
                rhs: constant(1),
            }
            .into(),
        );
        instructions.push(
            ICmp {
                dest: more,
                variant: ICmpVariant::Ult,
                lhs: Operand::Reg(next),
                rhs: len.clone(),
            }
            .into(),
        );
        BasicBlock::new(
            instructions,
            CBranch {
                cond: Operand::Reg(more),
                target_true: label,
                target_false: exit,
            },
        )
    };

    let mut blocks = Vec::new();
    let first = Label(first_label);
    match kind {
        MemIntrinsic::Copy | MemIntrinsic::Set => {
            blocks.push((first, forward_loop(&mut names, first, header)));
        }
        MemIntrinsic::Move => {
            // check: pick the direction, backward: len - 1 down to 0
            let check = first;
            let backward = Label(first_label + 1);
            let forward = Label(first_label + 2);
            let src_below = names.next();
            let check_block = BasicBlock::new(
                vec![
                    ICmp {
                        dest: src_below,
                        variant: ICmpVariant::Ult,
                        lhs: src_or_value.clone(),
                        rhs: dst.clone(),
                    }
                    .into(),
                ],
                CBranch {
                    cond: Operand::Reg(src_below),
                    target_true: backward,
                    target_false: forward,
                },
            );

            let remaining = names.next();
            let index = names.next();
            let more = names.next();
            let mut instructions: Vec<VxInstr> = vec![
                Phi {
                    dest: remaining,
                    ty: len_ty.clone(),
                    values: vec![(check, len.clone()), (backward, Operand::Reg(index))],
                }
                .into(),
                ISub {
                    dest: index,
                    ty: len_ty.clone(),
                    lhs: Operand::Reg(remaining),
                    rhs: constant(1),
                }
                .into(),
            ];
            instructions.extend(byte_op(&mut names, Operand::Reg(index)));
            instructions.push(
                ICmp {
                    dest: more,
                    variant: ICmpVariant::Ne,
                    lhs: Operand::Reg(index),
                    rhs: constant(0),
                }
                .into(),
            );
            let backward_block = BasicBlock::new(
                instructions,
                CBranch {
                    cond: Operand::Reg(more),
                    target_true: backward,
                    target_false: exit,
                },
            );

            blocks.push((check, check_block));
            blocks.push((backward, backward_block));
            blocks.push((forward, forward_loop(&mut names, forward, check)));
        }
    }

    if let Some(block) = caller.body.get_mut(&header) {
        block.instructions.push(guard.into());
        block.terminator = Terminator::from(CBranch {
            cond: Operand::Reg(is_empty),
            target_true: exit,
            target_false: first,
        });
    }
    for (label, block) in blocks {
        caller.body.insert(label, block);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use vxxinstr::modules::{Argument, CallingConvention, Function, InstrRef};

    use super::*;
    use crate::tests_utils::{ModuleBuilder, call_to, straight_body};

    fn intrinsic(builder: &mut ModuleBuilder, name: &str) -> FunctionId {
        let params = vec![
            Argument::new(Type::PTR),
            Argument::new(Type::PTR),
            Argument::new(Type::I64),
            Argument::new(Type::I1),
        ];
        builder.function(Function::new(name, params, Type::Void))
    }

    fn module_calling(name: &str, second: Operand) -> (Module, FunctionId) {
        let mut builder = ModuleBuilder::new("m");
        let callee = intrinsic(&mut builder, name);
        let mut user = Function::new(
            "user",
            vec![
                Argument::new(Type::PTR),
                Argument::new(Type::PTR),
                Argument::new(Type::I64),
            ],
            Type::Void,
        );
        user.cconv = CallingConvention::SpirFunc;
        straight_body(
            &mut user,
            vec![call_to(
                callee,
                vec![
                    Operand::Arg(0),
                    second,
                    Operand::Arg(2),
                    IConst::bool(false).into(),
                ],
                CallingConvention::C,
            )],
        );
        let user = builder.function(user);
        (builder.finish(), user)
    }

    #[test]
    fn memcpy_becomes_a_guarded_loop() {
        let (mut module, user) = module_calling("llvm.memcpy.p0.p0.i64", Operand::Arg(1));
        assert_eq!(lower_mem_intrinsics(&mut module).unwrap(), 1);
        module.verify().unwrap();

        let function = &module.functions[user];
        assert_eq!(function.calls().count(), 0);
        assert_eq!(function.body.len(), 3);
        assert!(function.body[&Label::NIL].terminator.is_c_branch());

        let loop_block = &function.body[&Label(2)];
        assert!(loop_block.instructions[0].is_phi());
        assert!(loop_block.instructions.iter().any(VxInstr::is_m_load));
        assert!(loop_block.instructions.iter().any(VxInstr::is_m_store));
        assert_eq!(
            loop_block.terminator.targets().collect::<Vec<_>>(),
            vec![Label(2), Label(1)]
        );
    }

    #[test]
    fn memset_stores_the_value_without_loading() {
        let (mut module, user) = module_calling("llvm.memset.p0.i64", IConst::new(8, 0xab).unwrap().into());
        lower_mem_intrinsics(&mut module).unwrap();
        module.verify().unwrap();

        let function = &module.functions[user];
        assert!(!function.instructions().any(|(_, instr)| instr.is_m_load()));
        let stored = function.instructions().find_map(|(_, instr)| match instr {
            VxInstr::MStore(store) => Some(store.value.clone()),
            _ => None,
        });
        assert_eq!(stored, Some(IConst::new(8, 0xab).unwrap().into()));
    }

    #[test]
    fn memmove_chooses_direction_at_run_time() {
        let (mut module, user) = module_calling("llvm.memmove.p0.p0.i64", Operand::Arg(1));
        lower_mem_intrinsics(&mut module).unwrap();
        module.verify().unwrap();

        let function = &module.functions[user];
        // header, exit, check, backward, forward
        assert_eq!(function.body.len(), 5);
        let check = &function.body[&Label(2)];
        let VxInstr::ICmp(cmp) = &check.instructions[0] else {
            panic!("direction check expected");
        };
        assert_eq!(cmp.variant, ICmpVariant::Ult);
        assert_eq!(cmp.lhs, Operand::Arg(1));
        assert_eq!(cmp.rhs, Operand::Arg(0));
        assert_eq!(
            function
                .instructions()
                .filter(|(_, instr)| instr.is_m_store())
                .count(),
            2
        );
    }

    #[test]
    fn other_calls_are_left_alone() {
        let (mut module, user) = module_calling("llvm.lifetime.start", Operand::Arg(1));
        assert_eq!(lower_mem_intrinsics(&mut module).unwrap(), 0);
        assert_eq!(module.functions[user].calls().count(), 1);
        assert_eq!(
            module.functions[user].call_at(InstrRef::new(Label::NIL, 0)).unwrap().args.len(),
            4
        );
    }
}
