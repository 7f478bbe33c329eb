//! Module-building helpers shared by unit and integration tests.
use vxxinstr::{
    consts::IConst,
    modules::{
        Argument, BasicBlock, CallingConvention, Function, FunctionId, Module,
        instructions::{
            VxInstr,
            misc::{Call, Callee},
        },
        operand::{Label, Name, Operand},
        terminator::Ret,
    },
    types::Type,
};

/// Placeholder operand of the given type.
pub fn zero_of(ty: &Type) -> Operand {
    match ty {
        Type::Int(bits) => IConst::new(*bits, 0).map(Operand::Imm).unwrap_or(Operand::Undef),
        _ => Operand::Undef,
    }
}

/// Direct call instruction discarding its result.
pub fn call_to(callee: FunctionId, args: Vec<Operand>, cconv: CallingConvention) -> VxInstr {
    Call {
        dest: None,
        ty: Type::Void,
        callee: Callee::Direct(callee),
        args,
        cconv,
    }
    .into()
}

/// Direct call instruction producing `dest` of type `ty`.
pub fn call_value(
    dest: Name,
    ty: Type,
    callee: FunctionId,
    args: Vec<Operand>,
    cconv: CallingConvention,
) -> VxInstr {
    Call {
        dest: Some(dest),
        ty,
        callee: Callee::Direct(callee),
        args,
        cconv,
    }
    .into()
}

/// Single-block body made of `instructions` followed by `ret void`.
pub fn straight_body(function: &mut Function, instructions: Vec<VxInstr>) {
    function.body.clear();
    function
        .body
        .insert(Label::NIL, BasicBlock::new(instructions, Ret { value: None }));
}

/// Incremental builder of test modules.
///
/// Functions return `void`; defined functions are one block calling their
/// callees in order with placeholder arguments.
pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            module: Module::new(name),
        }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    /// Add an arbitrary function.
    pub fn function(&mut self, function: Function) -> FunctionId {
        self.module
            .add_function(function)
            .expect("test symbols are unique")
    }

    /// `spir_func` declaration taking `params` unnamed `i32`.
    pub fn declaration(&mut self, name: &str, params: usize) -> FunctionId {
        let mut function = Function::new(name, vec![Argument::new(Type::I32); params], Type::Void);
        function.cconv = CallingConvention::SpirFunc;
        self.function(function)
    }

    /// `spir_func` definition calling `callees`.
    pub fn device_function(&mut self, name: &str, callees: &[FunctionId]) -> FunctionId {
        self.defined(name, CallingConvention::SpirFunc, callees)
    }

    /// `spir_kernel` definition calling `callees`.
    pub fn kernel(&mut self, name: &str, callees: &[FunctionId]) -> FunctionId {
        self.defined(name, CallingConvention::SpirKernel, callees)
    }

    /// Append a call to `callee` at the end of `caller`'s entry block.
    pub fn add_call(&mut self, caller: FunctionId, callee: FunctionId) {
        let instr = self.call_instr(callee);
        let function = &mut self.module.functions[caller];
        if let Some(entry) = function.body.get_mut(&Label::NIL) {
            entry.instructions.push(instr);
        }
    }

    pub fn finish(self) -> Module {
        self.module
    }

    fn defined(&mut self, name: &str, cconv: CallingConvention, callees: &[FunctionId]) -> FunctionId {
        let instructions = callees.iter().map(|callee| self.call_instr(*callee)).collect();
        let mut function = Function::new(name, vec![], Type::Void);
        function.cconv = cconv;
        straight_body(&mut function, instructions);
        self.function(function)
    }

    fn call_instr(&self, callee: FunctionId) -> VxInstr {
        let function = &self.module.functions[callee];
        let args = function.params.iter().map(|param| zero_of(&param.ty)).collect();
        call_to(callee, args, function.cconv)
    }
}
