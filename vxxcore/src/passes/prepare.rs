//! Module preparation.
//!
//! Runs before any renaming and brings the module to the shape the backend
//! inliner expects:
//!
//! 1. property wrappers are unwrapped,
//! 2. everything but kernels becomes private,
//! 3. memory intrinsics are lowered into loops,
//! 4. calls through pointer casts of functions become direct calls,
//! 5. the flow decides calling conventions and the inlining strategy.
//!
//! The SPIR flow forces every device function inline; the HLS flow tags the
//! kernels as top-level functions and asks the backend to flatten them.
use log::{debug, info, trace};
use vxxinstr::{
    consts::IConst,
    modules::{
        CallSite, CallingConvention, FunctionId, Linkage, Module,
        attributes::FnAttrFlags,
        instructions::{
            VxInstr,
            misc::{Call, Callee, Cast, CastVariant},
        },
        operand::{Name, Operand},
    },
    types::Type,
};

use crate::{
    callgraph::CallGraph,
    demangle::Demangler,
    magic::{
        FLATTEN_ATTRIBUTE, GLOBAL_CTORS, SPIR_GLOBAL_ID_INTRINSIC, TOP_FUNCTION_ATTRIBUTE,
        UNSUPPORTED_BUILTIN_PREFIX,
    },
    passes::{
        classify::{KernelMode, is_kernel},
        unwrap::unwrap_property_wrappers,
    },
    transform::memintrinsics::lower_mem_intrinsics,
    utils::{
        conf::BackendFlow,
        error::{PassError, PassResult},
    },
};

/// Counters of what the preparation changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PrepareStats {
    pub unwrapped_wrappers: usize,
    pub privatized_symbols: usize,
    pub lowered_intrinsics: usize,
    pub uncast_calls: usize,
    pub folded_builtin_calls: usize,
}

/// Set the calling convention of function `id` and of every call resolving
/// to it. Returns the number of call sites updated.
pub fn set_calling_convention(module: &mut Module, id: FunctionId, cconv: CallingConvention) -> usize {
    module.functions[id].cconv = cconv;
    let sites = module.call_sites(id);
    for site in &sites {
        if let Some(VxInstr::Call(call)) = module.functions[site.caller].instruction_mut(site.at) {
            call.cconv = cconv;
        }
    }
    sites.len()
}

/// Kernels are entry points: nothing in the module may call them.
fn ensure_uncalled(module: &Module, graph: &CallGraph, kernel: FunctionId) -> PassResult<()> {
    match graph.callers(kernel).next() {
        Some(caller) => Err(PassError::MissingCounterpart {
            symbol: module.functions[kernel].name.clone(),
            context: format!("kernel is called from '{}'", module.functions[caller].name),
        }),
        None => Ok(()),
    }
}

/// Give private linkage to every defined symbol but the kernels and the
/// constructor list. Top-level functions count as kernels whatever the flow.
/// Returns the number of symbols changed.
pub fn privatize(module: &mut Module) -> usize {
    let mut changed = 0;
    for function in module.functions.values_mut() {
        if is_kernel(function, KernelMode::TopFunctionAttribute)
            || function.name == GLOBAL_CTORS
            || function.is_declaration()
        {
            continue;
        }
        function.comdat = None;
        function.linkage = Linkage::Private;
        changed += 1;
    }
    for global in module.globals.values_mut() {
        if global.name == GLOBAL_CTORS || global.is_declaration() {
            continue;
        }
        global.comdat = None;
        global.linkage = Linkage::Private;
        changed += 1;
    }
    debug!("Privatized {} symbol(s)", changed);
    changed
}

/// First call through a pointer cast that can become a direct call: its
/// result is unused and both the callee parameters and the call operands are
/// all pointers.
fn find_removable_cast_call(module: &Module) -> Option<(CallSite, FunctionId)> {
    module.functions.iter().find_map(|(caller, function)| {
        function.calls().find_map(|(at, call)| {
            let Callee::Cast(callee) = &call.callee else {
                return None;
            };
            let callee = *callee;
            let target = module.functions.get(callee)?;
            let unused = call.dest.is_none_or(|dest| function.uses_of(dest) == 0);
            let removable = unused
                && target.params.len() == call.args.len()
                && target.params.iter().all(|param| param.ty.is_pointer())
                && call
                    .args
                    .iter()
                    .all(|arg| module.value_type(function, arg).is_some_and(|ty| ty.is_pointer()));
            removable.then_some((CallSite { caller, at }, callee))
        })
    })
}

/// Replace calls through pointer casts of functions by direct calls, casting
/// the operands whose type differs from the parameter. Returns the number of
/// calls rewritten.
pub fn remove_call_casts(module: &mut Module) -> PassResult<usize> {
    let mut rewritten = 0;
    while let Some((site, callee)) = find_removable_cast_call(module) {
        let target = &module.functions[callee];
        let param_types: Vec<Type> = target.params.iter().map(|param| param.ty.clone()).collect();
        let return_type = target.return_type.clone();
        let target_name = target.name.clone();

        let caller = &module.functions[site.caller];
        let call = caller.call_at(site.at)?.clone();
        let arg_types: Vec<Option<Type>> = call
            .args
            .iter()
            .map(|arg| module.value_type(caller, arg))
            .collect();

        let caller = &mut module.functions[site.caller];
        let mut next_name = caller.next_available_name().0;
        let mut at = site.at;
        let mut args = Vec::with_capacity(call.args.len());

        for ((arg, arg_ty), param_ty) in call.args.into_iter().zip(arg_types).zip(param_types) {
            if arg_ty.as_ref() == Some(&param_ty) {
                args.push(arg);
                continue;
            }
            let same_space = arg_ty.and_then(|ty| ty.address_space()) == param_ty.address_space();
            let dest = Name(next_name);
            next_name += 1;
            caller.insert_instruction(
                at,
                Cast {
                    dest,
                    variant: if same_space {
                        CastVariant::BitCast
                    } else {
                        CastVariant::AddrSpaceCast
                    },
                    value: arg,
                    ty: param_ty,
                },
            )?;
            at.index += 1;
            args.push(Operand::Reg(dest));
        }

        if let Some(instr) = caller.instruction_mut(at) {
            *instr = Call {
                dest: None,
                ty: return_type,
                callee: Callee::Direct(callee),
                args,
                cconv: call.cconv,
            }
            .into();
        }
        debug!("Call in {} now targets {} directly", caller.name, target_name);
        rewritten += 1;
    }
    Ok(rewritten)
}

/// SPIR flow: device functions and their call sites use `spir_func`.
pub fn set_spir_calling_conventions(module: &mut Module) -> PassResult<()> {
    let graph = CallGraph::build(module);
    for id in module.function_ids() {
        let function = &module.functions[id];
        if is_kernel(function, KernelMode::CallingConvention) {
            ensure_uncalled(module, &graph, id)?;
            continue;
        }
        if function.is_intrinsic() {
            continue;
        }
        set_calling_convention(module, id, CallingConvention::SpirFunc);
    }
    Ok(())
}

/// SPIR flow: every defined function but the kernels is inlined.
pub fn force_inlining(module: &mut Module) -> usize {
    let mut forced = 0;
    for function in module.functions.values_mut() {
        if function.is_declaration() || is_kernel(function, KernelMode::CallingConvention) {
            continue;
        }
        function.attributes.insert_flag(FnAttrFlags::ALWAYS_INLINE);
        forced += 1;
    }
    forced
}

/// HLS flow: kernels become top-level functions with the C calling
/// convention; other functions use `ccc` once optimized, `spir_func` before.
pub fn set_hls_calling_conventions(module: &mut Module, after_o3: bool) -> PassResult<()> {
    let graph = CallGraph::build(module);
    let cconv = if after_o3 {
        CallingConvention::C
    } else {
        CallingConvention::SpirFunc
    };

    for id in module.function_ids() {
        let function = &module.functions[id];
        if function.attributes.contains(TOP_FUNCTION_ATTRIBUTE) || function.is_intrinsic() {
            continue;
        }
        if function.cconv == CallingConvention::SpirKernel {
            ensure_uncalled(module, &graph, id)?;
            let function = &mut module.functions[id];
            debug!("Marking kernel {} as top-level function", function.name);
            function.attributes.insert(TOP_FUNCTION_ATTRIBUTE, "");
            function.cconv = CallingConvention::C;
        } else {
            set_calling_convention(module, id, cconv);
        }
    }
    Ok(())
}

/// HLS flow: reject calls to builtins the backend cannot implement.
pub fn signal_unsupported_builtins(module: &Module, demangler: &dyn Demangler) -> PassResult<()> {
    for function in module.functions.values() {
        for (_, call) in function.calls() {
            let Some(callee) = call.resolved_callee().and_then(|id| module.functions.get(id)) else {
                continue;
            };
            if demangler
                .demangle_or_raw(&callee.name)
                .starts_with(UNSUPPORTED_BUILTIN_PREFIX)
            {
                return Err(PassError::UnsupportedConstruct {
                    symbol: callee.name.clone(),
                    caller: function.name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// HLS flow after O3: calls to the global id builtin declaration become the
/// constant 1 and the declaration is erased. Returns the number of calls
/// folded.
pub fn clean_spir_builtins(module: &mut Module) -> PassResult<usize> {
    let Some(id) = module.find_function(SPIR_GLOBAL_ID_INTRINSIC) else {
        return Ok(0);
    };
    let builtin = &module.functions[id];
    if !builtin.is_declaration() {
        return Ok(0);
    }
    let replacement = builtin
        .return_type
        .int_width()
        .and_then(|bits| IConst::new(bits, 1))
        .map(Operand::Imm)
        .unwrap_or(Operand::Undef);

    // Back to front: removing a call shifts the ones after it.
    let sites = module.call_sites(id);
    for site in sites.iter().rev() {
        let caller = &mut module.functions[site.caller];
        if let VxInstr::Call(call) = caller.remove_instruction(site.at)? {
            if let Some(dest) = call.dest {
                caller.replace_all_uses(dest, &replacement);
            }
        }
    }

    module.erase_function(id)?;
    debug!("Folded {} call(s) to {}", sites.len(), SPIR_GLOBAL_ID_INTRINSIC);
    Ok(sites.len())
}

/// HLS flow: kernels and `noinline` functions get everything below them
/// inlined by the backend.
pub fn mark_for_flattening(module: &mut Module) -> usize {
    let mut marked = 0;
    for function in module.functions.values_mut() {
        if is_kernel(function, KernelMode::TopFunctionAttribute)
            || function.attributes.has_flag(FnAttrFlags::NO_INLINE)
        {
            function.attributes.insert(FLATTEN_ATTRIBUTE, "");
            marked += 1;
        }
    }
    marked
}

/// Run the whole preparation for `flow`.
pub fn prepare_module(
    module: &mut Module,
    flow: BackendFlow,
    after_o3: bool,
    demangler: &dyn Demangler,
) -> PassResult<PrepareStats> {
    info!("Preparing module {} for the {:?} flow", module.name, flow);
    let mode = flow.kernel_mode();
    let mut stats = PrepareStats {
        unwrapped_wrappers: unwrap_property_wrappers(module, mode)?,
        privatized_symbols: privatize(module),
        lowered_intrinsics: lower_mem_intrinsics(module)?,
        uncast_calls: remove_call_casts(module)?,
        ..Default::default()
    };

    match flow {
        BackendFlow::Spir => {
            set_spir_calling_conventions(module)?;
            let forced = force_inlining(module);
            debug!("Forced inlining of {} function(s)", forced);
        }
        BackendFlow::Hls => {
            set_hls_calling_conventions(module, after_o3)?;
            signal_unsupported_builtins(module, demangler)?;
            if after_o3 {
                stats.folded_builtin_calls = clean_spir_builtins(module)?;
            }
            let flattened = mark_for_flattening(module);
            debug!("Marked {} function(s) for flattening", flattened);
        }
    }

    trace!("Prepared module:\n{}", module);
    Ok(stats)
}
