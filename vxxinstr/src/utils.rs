use strum::{EnumIs, EnumTryAs};
use thiserror::Error;

use crate::modules::operand::{Label, Name};

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs, Error)]
pub enum Error {
    /// A name is defined more than once.
    #[error(
        "Multiple operations with shared destination target violate SSA requirements. The name `{duplicate}` is defined more than once within function `{function}`."
    )]
    DuplicateSSAName { function: String, duplicate: Name },

    /// No basic block with the entrypoint label was found.
    #[error(
        "By convention, the entrypoint basic block of a function must have label `block_0`. No such basic block was found in function `{function}`."
    )]
    MissingEntryBlock { function: String },

    /// An operand refers to an unresolved name.
    #[error(
        "An operand of function `{function}` refers to an undefined name: `{undefined}`."
    )]
    UndefinedSSAName { function: String, undefined: Name },

    /// An operand refers to an argument index past the parameter list.
    #[error(
        "An operand of function `{function}` refers to argument #{index}, but the function only has {count} parameters."
    )]
    UndefinedArgument {
        function: String,
        index: u32,
        count: usize,
    },

    /// The basic block referenced cannot be found within the function.
    #[error(
        "The basic block `{label}` referenced in function `{function}` is not defined within the function."
    )]
    UndefinedBasicBlock { function: String, label: Label },

    /// An instruction position does not exist.
    #[error(
        "Basic block `{label}` of function `{function}` has no instruction at index {index}."
    )]
    UndefinedInstruction {
        function: String,
        label: Label,
        index: usize,
    },

    /// A function handle no longer (or never did) resolve inside the module.
    #[error("Function `{function}` refers to a function handle that is not part of the module.")]
    UndefinedFunction { function: String },

    /// A global handle no longer (or never did) resolve inside the module.
    #[error("Function `{function}` refers to a global handle that is not part of the module.")]
    UndefinedGlobal { function: String },

    /// Two symbols of the module would share the same name.
    #[error("A symbol named `{name}` already exists in the module.")]
    DuplicateSymbol { name: String },

    /// A function cannot be replaced by another one with a different prototype.
    #[error(
        "Function `{old}` cannot be replaced by `{new}`: their prototypes differ."
    )]
    SignatureMismatch { old: String, new: String },

    /// A function is erased while call sites still refer to it.
    #[error("Function `{function}` cannot be erased: it still has {uses} use(s).")]
    FunctionStillReferenced { function: String, uses: usize },

    /// The targeted instruction is not a call.
    #[error(
        "Instruction {index} of basic block `{label}` in function `{function}` is not a call."
    )]
    NotACall {
        function: String,
        label: Label,
        index: usize,
    },
}
