//! Function roles.
use strum::EnumIs;
use vxxinstr::modules::{CallingConvention, Function, FunctionId, Module};

use crate::magic::TOP_FUNCTION_ATTRIBUTE;

/// How kernels are recognized.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, EnumIs)]
pub enum KernelMode {
    /// Only the `spir_kernel` calling convention marks a kernel.
    #[default]
    CallingConvention,

    /// Either the `spir_kernel` calling convention or the `fpga.top.func`
    /// attribute marks a kernel. Once the HLS flow prepared a module, kernels
    /// only keep the attribute.
    TopFunctionAttribute,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, EnumIs)]
pub enum FunctionRole {
    Kernel,
    DeviceFunction,
    Declaration,
}

pub fn is_kernel(function: &Function, mode: KernelMode) -> bool {
    function.cconv == CallingConvention::SpirKernel
        || (mode.is_top_function_attribute() && function.attributes.contains(TOP_FUNCTION_ATTRIBUTE))
}

/// Role of `function`, `None` for functions the renaming stages leave alone
/// (intrinsics and anything outside the SPIR calling conventions).
pub fn classify(function: &Function, mode: KernelMode) -> Option<FunctionRole> {
    if is_kernel(function, mode) {
        return Some(FunctionRole::Kernel);
    }
    if function.cconv != CallingConvention::SpirFunc || function.is_intrinsic() {
        return None;
    }
    if function.is_declaration() {
        Some(FunctionRole::Declaration)
    } else {
        Some(FunctionRole::DeviceFunction)
    }
}

/// Handles of every function of `module` with the given role, in arena order.
pub fn functions_with_role(module: &Module, mode: KernelMode, role: FunctionRole) -> Vec<FunctionId> {
    module
        .functions
        .iter()
        .filter(|(_, function)| classify(function, mode) == Some(role))
        .map(|(id, _)| id)
        .collect()
}
