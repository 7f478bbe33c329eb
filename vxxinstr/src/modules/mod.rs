//! IR modules
//!
//! A [`Module`] owns every function and global of a compilation unit inside
//! two arenas. Everything else refers to them through [`FunctionId`] and
//! [`GlobalId`] handles, which stay valid across renames, inlining and
//! instruction removal. Submodules contain the building blocks:
//!
//! - `instructions`: the instruction families and the [`VxInstr`] union
//! - `terminator`: control flow terminators
//! - `operand`: SSA names, labels and operands
//! - `attributes`, `metadata`: function side-channel information
//! - `fmt`: textual dump of the IR
use std::collections::{BTreeMap, BTreeSet};

use log::trace;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use crate::{
    consts::IConst,
    modules::{
        attributes::AttributeSet,
        instructions::{
            Instruction, VxInstr,
            misc::{Call, Callee},
        },
        metadata::MetadataNode,
        operand::{Label, Name, Operand},
        terminator::{Jump, Terminator},
    },
    types::{AddressSpace, Type},
    utils::Error,
};

pub mod attributes;
pub mod fmt;
pub mod instructions;
pub mod metadata;
pub mod operand;
pub mod terminator;

new_key_type! {
    /// Handle to a function owned by a [`Module`].
    pub struct FunctionId;

    /// Handle to a global variable owned by a [`Module`].
    pub struct GlobalId;
}

/// All Global Variables and Functions have one of the following types of linkage:
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Linkage {
    /// Only directly accessible by objects in the current module. The symbol
    /// may be renamed freely and doesn't show up in any symbol table.
    Private,

    /// Similar to `Linkage::Private`, but the value shows as a local symbol
    /// in the object file.
    Internal,

    /// May be referenced by other modules, and may also be defined in other
    /// modules.
    #[default]
    External,

    /// Merged with other globals of the same name when linked; unreferenced
    /// copies may be discarded. Typical of template instantiations.
    LinkOnceOdr,
}

impl Linkage {
    pub fn to_str(&self) -> &'static str {
        match self {
            Linkage::Private => "private",
            Linkage::Internal => "internal",
            Linkage::External => "external",
            Linkage::LinkOnceOdr => "linkonce_odr",
        }
    }
}

/// Calling convention of a function or of a call site. The calling
/// convention of any pair of dynamic caller/callee must match.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CallingConvention {
    /// The C calling convention
    ///
    /// Default if no other calling convention is specified. Matches the target
    /// C calling conventions.
    #[default]
    C,

    /// The fast calling convention
    FastC,

    /// The cold calling convention
    ColdC,

    /// Device function of an OpenCL/SPIR kernel module.
    SpirFunc,

    /// Entry point (kernel) of an OpenCL/SPIR kernel module.
    SpirKernel,

    /// Target-specific convention, printed `cc <n>`.
    Numbered(u32),
}

impl std::fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallingConvention::C => write!(f, "ccc"),
            CallingConvention::FastC => write!(f, "fastcc"),
            CallingConvention::ColdC => write!(f, "coldcc"),
            CallingConvention::SpirFunc => write!(f, "spir_func"),
            CallingConvention::SpirKernel => write!(f, "spir_kernel"),
            CallingConvention::Numbered(n) => write!(f, "cc {}", n),
        }
    }
}

/// Formal parameter of a function. Parameters are referenced from the body
/// through [`Operand::Arg`] with their position.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Argument {
    pub name: Option<String>,
    pub ty: Type,
}

impl Argument {
    /// Unnamed argument of the given type.
    pub fn new(ty: Type) -> Self {
        Self { name: None, ty }
    }

    pub fn named(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: Some(name.into()),
            ty,
        }
    }

    /// An empty name counts as no name.
    #[inline]
    pub fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|name| !name.is_empty())
    }
}

/// A basic block within a function, containing a sequence of instructions
/// and ending with a control flow terminator.
///
/// The block's label is its key in [`Function::body`].
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BasicBlock {
    pub instructions: Vec<VxInstr>,
    pub terminator: Terminator,
}

impl BasicBlock {
    pub fn new(instructions: Vec<VxInstr>, terminator: impl Into<Terminator>) -> Self {
        Self {
            instructions,
            terminator: terminator.into(),
        }
    }
}

/// Position of an instruction inside a function body.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InstrRef {
    pub label: Label,
    pub index: usize,
}

impl InstrRef {
    pub fn new(label: Label, index: usize) -> Self {
        Self { label, index }
    }
}

/// A call instruction located inside a function of the module.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CallSite {
    pub caller: FunctionId,
    pub at: InstrRef,
}

/// A function made of basic blocks and parameter metadata.
///
/// A function without any basic block is a declaration. By convention the
/// entrypoint of a definition is the basic block labelled [`Label::NIL`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Function {
    pub name: String,
    pub params: Vec<Argument>,
    pub return_type: Type,
    pub body: BTreeMap<Label, BasicBlock>,
    pub linkage: Linkage,
    pub cconv: CallingConvention,
    pub comdat: Option<String>,
    pub attributes: AttributeSet,
    pub metadata: BTreeMap<String, MetadataNode>,
}

impl Function {
    /// Create a declaration with external linkage and the C calling convention.
    pub fn new(name: impl Into<String>, params: Vec<Argument>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            body: BTreeMap::new(),
            linkage: Linkage::default(),
            cconv: CallingConvention::default(),
            comdat: None,
            attributes: AttributeSet::default(),
            metadata: BTreeMap::new(),
        }
    }

    /// A function without body only declares a symbol defined elsewhere.
    #[inline]
    pub fn is_declaration(&self) -> bool {
        self.body.is_empty()
    }

    /// Functions of the `llvm.` namespace are provided by the backend.
    #[inline]
    pub fn is_intrinsic(&self) -> bool {
        self.name.starts_with("llvm.")
    }

    /// Two functions share a prototype when their return and parameter types
    /// are identical.
    pub fn same_signature(&self, other: &Function) -> bool {
        self.return_type == other.return_type
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(other.params.iter())
                .all(|(a, b)| a.ty == b.ty)
    }

    /// Attach (or replace) the metadata node stored under `key`.
    pub fn set_metadata(&mut self, key: impl Into<String>, node: MetadataNode) {
        self.metadata.insert(key.into(), node);
    }

    pub fn get_metadata(&self, key: &str) -> Option<&MetadataNode> {
        self.metadata.get(key)
    }

    /// First [`Name`] above every SSA value defined or read in the body,
    /// terminators included.
    pub fn next_available_name(&self) -> Name {
        let mut next = 0;
        for bb in self.body.values() {
            for instr in &bb.instructions {
                if let Some(dest) = instr.destination() {
                    next = next.max(dest.0 + 1);
                }
                for name in instr.dependencies() {
                    next = next.max(name.0 + 1);
                }
            }
            for operand in bb.terminator.operands() {
                if let Operand::Reg(name) = operand {
                    next = next.max(name.0 + 1);
                }
            }
        }
        Name(next)
    }

    /// Find next available [`Label`] for a new basic block.
    pub fn next_available_label(&self) -> Label {
        self.body
            .last_key_value()
            .map(|(label, _)| Label(label.0 + 1))
            .unwrap_or(Label::NIL)
    }

    /// Iterate over every instruction with its position, in block order.
    pub fn instructions(&self) -> impl Iterator<Item = (InstrRef, &VxInstr)> {
        self.body.iter().flat_map(|(label, bb)| {
            bb.instructions
                .iter()
                .enumerate()
                .map(move |(index, instr)| (InstrRef::new(*label, index), instr))
        })
    }

    /// Iterate over every call instruction with its position.
    pub fn calls(&self) -> impl Iterator<Item = (InstrRef, &Call)> {
        self.instructions().filter_map(|(at, instr)| match instr {
            VxInstr::Call(call) => Some((at, call)),
            _ => None,
        })
    }

    pub fn instruction(&self, at: InstrRef) -> Option<&VxInstr> {
        self.body
            .get(&at.label)
            .and_then(|bb| bb.instructions.get(at.index))
    }

    pub fn instruction_mut(&mut self, at: InstrRef) -> Option<&mut VxInstr> {
        self.body
            .get_mut(&at.label)
            .and_then(|bb| bb.instructions.get_mut(at.index))
    }

    /// Call instruction at `at`, or an error if there is none.
    pub fn call_at(&self, at: InstrRef) -> Result<&Call, Error> {
        match self.instruction(at) {
            Some(VxInstr::Call(call)) => Ok(call),
            Some(_) => Err(Error::NotACall {
                function: self.name.clone(),
                label: at.label,
                index: at.index,
            }),
            None => Err(Error::UndefinedInstruction {
                function: self.name.clone(),
                label: at.label,
                index: at.index,
            }),
        }
    }

    /// Position of the instruction defining `name`.
    pub fn find_definition(&self, name: Name) -> Option<InstrRef> {
        self.instructions()
            .find(|(_, instr)| instr.destination() == Some(name))
            .map(|(at, _)| at)
    }

    /// Type of an operand as seen from inside the function. Globals live in
    /// the module, use [`Module::value_type`] for them.
    pub fn value_type(&self, operand: &Operand) -> Option<Type> {
        match operand {
            Operand::Reg(name) => {
                let at = self.find_definition(*name)?;
                self.instruction(at)?.destination_type().cloned()
            }
            Operand::Arg(index) => self.params.get(*index as usize).map(|arg| arg.ty.clone()),
            Operand::Imm(constant) => Some(constant.ty()),
            Operand::Func(_) => Some(Type::PTR),
            Operand::Global(_) | Operand::Undef => None,
        }
    }

    /// Number of operands (instructions and terminators) reading `name`.
    pub fn uses_of(&self, name: Name) -> usize {
        self.body
            .values()
            .map(|bb| {
                bb.instructions
                    .iter()
                    .flat_map(|instr| instr.dependencies())
                    .chain(bb.terminator.dependencies())
                    .filter(|dep| *dep == name)
                    .count()
            })
            .sum()
    }

    /// Replace every read of `name` by `with`. Returns the number of operands
    /// rewritten.
    pub fn replace_all_uses(&mut self, name: Name, with: &Operand) -> usize {
        let mut replaced = 0;
        for bb in self.body.values_mut() {
            let operands = bb
                .instructions
                .iter_mut()
                .flat_map(|instr| instr.operands_mut())
                .chain(bb.terminator.operands_mut());

            for operand in operands {
                if operand.as_reg() == Some(name) {
                    *operand = with.clone();
                    replaced += 1;
                }
            }
        }
        replaced
    }

    /// Remove and return the instruction at `at`. Instructions after it in
    /// the same block shift down by one.
    pub fn remove_instruction(&mut self, at: InstrRef) -> Result<VxInstr, Error> {
        let bb = self.body.get_mut(&at.label).ok_or_else(|| Error::UndefinedBasicBlock {
            function: self.name.clone(),
            label: at.label,
        })?;
        if at.index >= bb.instructions.len() {
            return Err(Error::UndefinedInstruction {
                function: self.name.clone(),
                label: at.label,
                index: at.index,
            });
        }
        Ok(bb.instructions.remove(at.index))
    }

    /// Insert `instr` before the instruction at `at`; `at.index` may equal
    /// the block length to append before the terminator.
    pub fn insert_instruction(&mut self, at: InstrRef, instr: impl Into<VxInstr>) -> Result<(), Error> {
        let bb = self.body.get_mut(&at.label).ok_or_else(|| Error::UndefinedBasicBlock {
            function: self.name.clone(),
            label: at.label,
        })?;
        if at.index > bb.instructions.len() {
            return Err(Error::UndefinedInstruction {
                function: self.name.clone(),
                label: at.label,
                index: at.index,
            });
        }
        bb.instructions.insert(at.index, instr.into());
        Ok(())
    }

    /// Split block `label` before instruction `index`.
    ///
    /// The tail of the block and its terminator move to a fresh block whose
    /// label is returned; the original block jumps to it. Phi nodes of the
    /// successors now see the new block as predecessor.
    pub fn split_block(&mut self, label: Label, index: usize) -> Result<Label, Error> {
        let new_label = self.next_available_label();
        let name = self.name.clone();

        let bb = self
            .body
            .get_mut(&label)
            .ok_or_else(|| Error::UndefinedBasicBlock {
                function: name.clone(),
                label,
            })?;
        if index > bb.instructions.len() {
            return Err(Error::UndefinedInstruction {
                function: name,
                label,
                index,
            });
        }

        let tail = bb.instructions.split_off(index);
        let terminator = std::mem::replace(&mut bb.terminator, Jump { target: new_label }.into());
        let successors: BTreeSet<Label> = terminator.targets().collect();
        self.body.insert(new_label, BasicBlock::new(tail, terminator));

        for successor in successors {
            let Some(bb) = self.body.get_mut(&successor) else {
                continue;
            };
            for instr in bb.instructions.iter_mut() {
                if let VxInstr::Phi(phi) = instr {
                    for (incoming, _) in phi.values.iter_mut() {
                        if *incoming == label {
                            *incoming = new_label;
                        }
                    }
                }
            }
        }

        trace!("Split {}:{} at {}, tail is {}", self.name, label, index, new_label);
        Ok(new_label)
    }

    /// Verify SSA form:
    /// 1) The entry block exists.
    /// 2) Each name is defined exactly once.
    /// 3) Each operand refers to a defined name or an existing argument.
    /// 4) Each branch target and phi predecessor is a block of the function.
    ///
    /// Declarations are trivially valid.
    pub fn check_ssa(&self) -> Result<(), Error> {
        if self.is_declaration() {
            return Ok(());
        }

        // Ensure existence of entry block
        if !self.body.contains_key(&Label::NIL) {
            return Err(Error::MissingEntryBlock {
                function: self.name.clone(),
            });
        }

        let mut defined_names = BTreeSet::new();
        for (_, instr) in self.instructions() {
            if let Some(dest) = instr.destination() {
                if !defined_names.insert(dest) {
                    return Err(Error::DuplicateSSAName {
                        function: self.name.clone(),
                        duplicate: dest,
                    });
                }
            }
        }

        for (label, bb) in &self.body {
            let operands = bb
                .instructions
                .iter()
                .flat_map(|instr| instr.operands())
                .chain(bb.terminator.operands());

            for operand in operands {
                match operand {
                    Operand::Reg(name) if !defined_names.contains(name) => {
                        return Err(Error::UndefinedSSAName {
                            function: self.name.clone(),
                            undefined: *name,
                        });
                    }
                    Operand::Arg(index) if *index as usize >= self.params.len() => {
                        return Err(Error::UndefinedArgument {
                            function: self.name.clone(),
                            index: *index,
                            count: self.params.len(),
                        });
                    }
                    _ => {}
                }
            }

            let phi_labels = bb.instructions.iter().flat_map(|instr| match instr {
                VxInstr::Phi(phi) => phi.values.iter().map(|(label, _)| *label).collect(),
                _ => Vec::new(),
            });
            for target in bb.terminator.targets().chain(phi_labels) {
                if !self.body.contains_key(&target) {
                    return Err(Error::UndefinedBasicBlock {
                        function: self.name.clone(),
                        label: target,
                    });
                }
            }
            trace!("Block {} of {} is well formed", label, self.name);
        }

        Ok(())
    }
}

/// Static initializer of a global variable.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Initializer {
    /// All bytes zero.
    Zero,
    /// A single integer value.
    Int(IConst),
    /// Raw bytes, e.g. a string literal.
    Bytes(Vec<u8>),
    /// Ordered list of function addresses, e.g. `llvm.global_ctors`.
    Functions(Vec<FunctionId>),
}

/// A global variable of the module. A global without initializer is a
/// declaration.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Global {
    pub name: String,
    pub ty: Type,
    pub address_space: AddressSpace,
    pub linkage: Linkage,
    pub comdat: Option<String>,
    pub initializer: Option<Initializer>,
}

impl Global {
    pub fn new(name: impl Into<String>, ty: Type, initializer: Option<Initializer>) -> Self {
        Self {
            name: name.into(),
            ty,
            address_space: AddressSpace::GLOBAL,
            linkage: Linkage::default(),
            comdat: None,
            initializer,
        }
    }

    #[inline]
    pub fn is_declaration(&self) -> bool {
        self.initializer.is_none()
    }
}

/// A compilation unit: functions, globals and named metadata.
///
/// Functions and globals live in arenas; the rest of the IR refers to them
/// through [`FunctionId`] and [`GlobalId`] handles. Symbol names are unique
/// across both arenas.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Module {
    pub name: String,
    pub target_triple: Option<String>,
    pub functions: SlotMap<FunctionId, Function>,
    pub globals: SlotMap<GlobalId, Global>,
    pub named_metadata: BTreeMap<String, Vec<MetadataNode>>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Returns true if a function or a global already uses `name`.
    pub fn is_symbol_taken(&self, name: &str) -> bool {
        self.find_function(name).is_some() || self.find_global(name).is_some()
    }

    pub fn add_function(&mut self, function: Function) -> Result<FunctionId, Error> {
        if self.is_symbol_taken(&function.name) {
            return Err(Error::DuplicateSymbol {
                name: function.name,
            });
        }
        Ok(self.functions.insert(function))
    }

    pub fn add_global(&mut self, global: Global) -> Result<GlobalId, Error> {
        if self.is_symbol_taken(&global.name) {
            return Err(Error::DuplicateSymbol { name: global.name });
        }
        Ok(self.globals.insert(global))
    }

    /// Snapshot of the function handles, safe to iterate while mutating the
    /// module.
    pub fn function_ids(&self) -> Vec<FunctionId> {
        self.functions.keys().collect()
    }

    pub fn find_function(&self, name: &str) -> Option<FunctionId> {
        self.functions
            .iter()
            .find(|(_, function)| function.name == name)
            .map(|(id, _)| id)
    }

    pub fn find_global(&self, name: &str) -> Option<GlobalId> {
        self.globals
            .iter()
            .find(|(_, global)| global.name == name)
            .map(|(id, _)| id)
    }

    /// Rename a function. Call sites hold handles and need no update.
    pub fn rename_function(&mut self, id: FunctionId, name: impl Into<String>) -> Result<(), Error> {
        let name = name.into();
        let current = self
            .functions
            .get(id)
            .ok_or_else(|| Error::UndefinedFunction {
                function: name.clone(),
            })?;
        if current.name == name {
            return Ok(());
        }
        if self.is_symbol_taken(&name) {
            return Err(Error::DuplicateSymbol { name });
        }
        if let Some(function) = self.functions.get_mut(id) {
            trace!("Renaming function {} to {}", function.name, name);
            function.name = name;
        }
        Ok(())
    }

    /// Type of an operand used inside `function`.
    pub fn value_type(&self, function: &Function, operand: &Operand) -> Option<Type> {
        match operand {
            Operand::Global(id) => self.globals.get(*id).map(|g| Type::Ptr(g.address_space)),
            _ => function.value_type(operand),
        }
    }

    /// Every call resolving to `callee`, in function then block order.
    pub fn call_sites(&self, callee: FunctionId) -> Vec<CallSite> {
        self.functions
            .iter()
            .flat_map(|(caller, function)| {
                function
                    .calls()
                    .filter(move |(_, call)| call.resolved_callee() == Some(callee))
                    .map(move |(at, _)| CallSite { caller, at })
            })
            .collect()
    }

    /// Number of references to `id`: calls, address-taken operands and
    /// global initializers.
    pub fn uses_of_function(&self, id: FunctionId) -> usize {
        let mut uses = 0;
        for function in self.functions.values() {
            for bb in function.body.values() {
                for instr in &bb.instructions {
                    uses += match instr {
                        VxInstr::Call(call) => {
                            usize::from(call.resolved_callee() == Some(id))
                                + call.args.iter().filter(|op| **op == Operand::Func(id)).count()
                        }
                        _ => instr.operands().filter(|op| **op == Operand::Func(id)).count(),
                    };
                }
                uses += bb
                    .terminator
                    .operands()
                    .filter(|op| **op == Operand::Func(id))
                    .count();
            }
        }
        for global in self.globals.values() {
            if let Some(Initializer::Functions(list)) = &global.initializer {
                uses += list.iter().filter(|f| **f == id).count();
            }
        }
        uses
    }

    /// Redirect every reference to `old` towards `new` and erase `old`.
    ///
    /// Both functions must share a prototype. The erased function is
    /// returned.
    pub fn replace_function(&mut self, old: FunctionId, new: FunctionId) -> Result<Function, Error> {
        let (old_fn, new_fn) = match (self.functions.get(old), self.functions.get(new)) {
            (Some(old_fn), Some(new_fn)) => (old_fn, new_fn),
            (None, _) => {
                return Err(Error::UndefinedFunction {
                    function: format!("{:?}", old),
                });
            }
            (_, None) => {
                return Err(Error::UndefinedFunction {
                    function: format!("{:?}", new),
                });
            }
        };
        if !old_fn.same_signature(new_fn) {
            return Err(Error::SignatureMismatch {
                old: old_fn.name.clone(),
                new: new_fn.name.clone(),
            });
        }

        self.remap_function_refs(|id| {
            if *id == old {
                *id = new;
            }
        });
        self.erase_function(old)
    }

    /// Remove a function that nothing references anymore.
    pub fn erase_function(&mut self, id: FunctionId) -> Result<Function, Error> {
        let uses = self.uses_of_function(id);
        let function = self.functions.get(id).ok_or_else(|| Error::UndefinedFunction {
            function: format!("{:?}", id),
        })?;
        if uses > 0 {
            return Err(Error::FunctionStillReferenced {
                function: function.name.clone(),
                uses,
            });
        }
        self.functions.remove(id).ok_or_else(|| Error::UndefinedFunction {
            function: format!("{:?}", id),
        })
    }

    fn remap_function_refs(&mut self, mut remap: impl FnMut(&mut FunctionId)) {
        for function in self.functions.values_mut() {
            for bb in function.body.values_mut() {
                for instr in bb.instructions.iter_mut() {
                    if let VxInstr::Call(call) = instr {
                        match &mut call.callee {
                            Callee::Direct(id) | Callee::Cast(id) => remap(id),
                            Callee::Indirect(_) => {}
                        }
                    }
                    for operand in instr.operands_mut() {
                        if let Operand::Func(id) = operand {
                            remap(id);
                        }
                    }
                }
                for operand in bb.terminator.operands_mut() {
                    if let Operand::Func(id) = operand {
                        remap(id);
                    }
                }
            }
        }
        for global in self.globals.values_mut() {
            if let Some(Initializer::Functions(list)) = &mut global.initializer {
                list.iter_mut().for_each(&mut remap);
            }
        }
    }

    /// Append a node to the named metadata `key`.
    pub fn add_named_metadata(&mut self, key: impl Into<String>, node: MetadataNode) {
        self.named_metadata.entry(key.into()).or_default().push(node);
    }

    pub fn named_metadata(&self, key: &str) -> &[MetadataNode] {
        self.named_metadata
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Remove the named metadata `key`, returning its nodes if it existed.
    pub fn erase_named_metadata(&mut self, key: &str) -> Option<Vec<MetadataNode>> {
        self.named_metadata.remove(key)
    }

    /// Check every function body and every handle of the module.
    pub fn verify(&self) -> Result<(), Error> {
        let mut names = BTreeSet::new();
        let symbols = self
            .functions
            .values()
            .map(|f| &f.name)
            .chain(self.globals.values().map(|g| &g.name));
        for name in symbols {
            if !names.insert(name) {
                return Err(Error::DuplicateSymbol { name: name.clone() });
            }
        }

        for function in self.functions.values() {
            function.check_ssa()?;

            for (_, instr) in function.instructions() {
                if let VxInstr::Call(call) = instr {
                    if let Some(callee) = call.resolved_callee() {
                        if !self.functions.contains_key(callee) {
                            return Err(Error::UndefinedFunction {
                                function: function.name.clone(),
                            });
                        }
                    }
                }
                for operand in instr.operands() {
                    match operand {
                        Operand::Func(id) if !self.functions.contains_key(*id) => {
                            return Err(Error::UndefinedFunction {
                                function: function.name.clone(),
                            });
                        }
                        Operand::Global(id) if !self.globals.contains_key(*id) => {
                            return Err(Error::UndefinedGlobal {
                                function: function.name.clone(),
                            });
                        }
                        _ => {}
                    }
                }
            }
        }

        Ok(())
    }
}
