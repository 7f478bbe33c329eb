//! Pretty-print helpers for instructions, terminators, functions, and modules.
//!
//! The listing is LLVM-flavoured; it is meant for logs and test diagnostics
//! and is not parsed back.
use crate::modules::{
    Function, Global, Initializer, Module,
    instructions::{Instruction, VxInstr, misc::Callee},
    operand::Operand,
    terminator::Terminator,
};

impl Operand {
    /// Build a formatting helper that renders the operand using the given module for context.
    pub fn fmt<'a>(&'a self, module: Option<&'a Module>) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            operand: &'a Operand,
            module: Option<&'a Module>,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.operand {
                    Operand::Reg(name) => write!(f, "{}", name),
                    Operand::Arg(index) => write!(f, "%arg{}", index),
                    Operand::Imm(constant) => write!(f, "{}", constant),
                    Operand::Func(id) => match self.module.and_then(|m| m.functions.get(*id)) {
                        Some(function) => write!(f, "@{}", function.name),
                        None => write!(f, "@<{:?}>", id),
                    },
                    Operand::Global(id) => match self.module.and_then(|m| m.globals.get(*id)) {
                        Some(global) => write!(f, "@{}", global.name),
                        None => write!(f, "@<{:?}>", id),
                    },
                    Operand::Undef => write!(f, "undef"),
                }
            }
        }

        Fmt {
            operand: self,
            module,
        }
    }
}

fn write_operands<'a>(
    f: &mut std::fmt::Formatter<'_>,
    operands: impl Iterator<Item = &'a Operand>,
    module: Option<&Module>,
) -> std::fmt::Result {
    let mut first = true;
    for operand in operands {
        if first {
            first = false;
        } else {
            write!(f, ", ")?;
        }
        write!(f, "{}", operand.fmt(module))?;
    }
    Ok(())
}

impl VxInstr {
    /// Build a formatting helper that renders the instruction using the given module for context.
    pub fn fmt<'a>(&'a self, module: Option<&'a Module>) -> impl std::fmt::Display + Copy + 'a {
        #[derive(Clone, Copy)]
        struct Fmt<'a> {
            instr: &'a VxInstr,
            module: Option<&'a Module>,
        }

        impl Fmt<'_> {
            fn callee_name(&self, callee: &Callee) -> String {
                let named = |id| {
                    self.module
                        .and_then(|m| m.functions.get(id))
                        .map(|function| format!("@{}", function.name))
                        .unwrap_or_else(|| format!("@<{:?}>", id))
                };
                match callee {
                    Callee::Direct(id) => named(*id),
                    Callee::Cast(id) => format!("(cast {})", named(*id)),
                    Callee::Indirect(operand) => operand.fmt(self.module).to_string(),
                }
            }
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                if let (Some(dest), false) = (self.instr.destination(), self.instr.is_call()) {
                    write!(f, "{} = ", dest)?;
                }

                let opname = self.instr.op().opname();
                match self.instr {
                    VxInstr::IAdd(instr) => write!(f, "{} {} ", opname, instr.ty)?,
                    VxInstr::ISub(instr) => write!(f, "{} {} ", opname, instr.ty)?,
                    VxInstr::ICmp(cmp) => write!(f, "{} {} ", opname, cmp.variant.to_str())?,
                    VxInstr::MLoad(load) => {
                        write!(f, "{}", opname)?;
                        if load.volatile {
                            write!(f, " volatile")?;
                        }
                        write!(f, " {}, ", load.ty)?;
                    }
                    VxInstr::MStore(store) => {
                        write!(f, "{}", opname)?;
                        if store.volatile {
                            write!(f, " volatile")?;
                        }
                        return write!(
                            f,
                            " {}, {}",
                            store.value.fmt(self.module),
                            store.addr.fmt(self.module)
                        );
                    }
                    VxInstr::MGetElementPtr(gep) => write!(f, "{} {}, ", opname, gep.elem_ty)?,
                    VxInstr::Call(call) => {
                        if let Some(dest) = call.dest {
                            write!(f, "{} = ", dest)?;
                        }
                        write!(
                            f,
                            "{} {} {} {}(",
                            opname,
                            call.cconv,
                            call.ty,
                            self.callee_name(&call.callee)
                        )?;
                        write_operands(f, call.args.iter(), self.module)?;
                        return write!(f, ")");
                    }
                    VxInstr::Phi(phi) => {
                        write!(f, "{} {} ", opname, phi.ty)?;
                        for (i, (label, value)) in phi.values.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "[{}, {}]", value.fmt(self.module), label)?;
                        }
                        return Ok(());
                    }
                    VxInstr::Cast(cast) => {
                        return write!(
                            f,
                            "{} {} to {}",
                            cast.variant.to_str(),
                            cast.value.fmt(self.module),
                            cast.ty
                        );
                    }
                }

                write_operands(f, self.instr.operands(), self.module)
            }
        }

        Fmt {
            instr: self,
            module,
        }
    }
}

impl Terminator {
    /// Build a formatting helper that renders the terminator using the supplied module for context.
    pub fn fmt<'a>(&'a self, module: Option<&'a Module>) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            terminator: &'a Terminator,
            module: Option<&'a Module>,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.terminator {
                    Terminator::CBranch(cbranch) => write!(
                        f,
                        "br {}, {:#}, {:#}",
                        cbranch.cond.fmt(self.module),
                        cbranch.target_true,
                        cbranch.target_false
                    ),
                    Terminator::Jump(jump) => write!(f, "br {:#}", jump.target),
                    Terminator::Ret(ret) => match &ret.value {
                        Some(value) => write!(f, "ret {}", value.fmt(self.module)),
                        None => write!(f, "ret void"),
                    },
                    Terminator::Unreachable(_) => write!(f, "unreachable"),
                }
            }
        }

        Fmt {
            terminator: self,
            module,
        }
    }
}

impl Function {
    /// Build a formatting helper that renders the function in textual form.
    pub fn fmt<'a>(&'a self, module: Option<&'a Module>) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            function: &'a Function,
            module: Option<&'a Module>,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let function = self.function;
                write!(
                    f,
                    "{} {} {} {} @{}(",
                    if function.is_declaration() { "declare" } else { "define" },
                    function.linkage.to_str(),
                    function.cconv,
                    function.return_type,
                    function.name
                )?;

                for (i, param) in function.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match &param.name {
                        Some(name) if !name.is_empty() => write!(f, "{} %{}", param.ty, name)?,
                        _ => write!(f, "{}", param.ty)?,
                    }
                }
                write!(f, ")")?;

                if !function.attributes.is_empty() {
                    write!(f, " {}", function.attributes)?;
                }
                if let Some(comdat) = &function.comdat {
                    write!(f, " comdat({})", comdat)?;
                }
                for (key, node) in &function.metadata {
                    write!(f, " !{} {}", key, node)?;
                }

                if function.is_declaration() {
                    return writeln!(f);
                }

                writeln!(f, " {{")?;
                for (block_label, block) in &function.body {
                    writeln!(f, "{}:", block_label)?;
                    for instr in &block.instructions {
                        writeln!(f, "  {}", instr.fmt(self.module))?;
                    }
                    writeln!(f, "  {}", block.terminator.fmt(self.module))?;
                }
                writeln!(f, "}}")
            }
        }

        Fmt {
            function: self,
            module,
        }
    }
}

impl Global {
    /// Build a formatting helper that renders the global in textual form.
    pub fn fmt<'a>(&'a self, module: Option<&'a Module>) -> impl std::fmt::Display + 'a {
        struct Fmt<'a> {
            global: &'a Global,
            module: Option<&'a Module>,
        }

        impl std::fmt::Display for Fmt<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let global = self.global;
                write!(
                    f,
                    "@{} = {} {} global {}",
                    global.name,
                    global.linkage.to_str(),
                    global.address_space,
                    global.ty
                )?;
                match &global.initializer {
                    None => {}
                    Some(Initializer::Zero) => write!(f, " zeroinitializer")?,
                    Some(Initializer::Int(constant)) => write!(f, " {}", constant.value)?,
                    Some(Initializer::Bytes(bytes)) => {
                        write!(f, " c\"")?;
                        for byte in bytes {
                            if byte.is_ascii_graphic() || *byte == b' ' {
                                write!(f, "{}", *byte as char)?;
                            } else {
                                write!(f, "\\{:02X}", byte)?;
                            }
                        }
                        write!(f, "\"")?;
                    }
                    Some(Initializer::Functions(list)) => {
                        write!(f, " [")?;
                        let operands: Vec<Operand> = list.iter().map(|id| Operand::Func(*id)).collect();
                        write_operands(f, operands.iter(), self.module)?;
                        write!(f, "]")?;
                    }
                }
                if let Some(comdat) = &global.comdat {
                    write!(f, ", comdat({})", comdat)?;
                }
                Ok(())
            }
        }

        Fmt {
            global: self,
            module,
        }
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        if let Some(triple) = &self.target_triple {
            writeln!(f, "target triple = \"{}\"", triple)?;
        }

        for global in self.globals.values() {
            writeln!(f, "{}", global.fmt(Some(self)))?;
        }

        for function in self.functions.values() {
            writeln!(f)?;
            write!(f, "{}", function.fmt(Some(self)))?;
        }

        if !self.named_metadata.is_empty() {
            writeln!(f)?;
        }
        for (key, nodes) in &self.named_metadata {
            write!(f, "!{} = !{{", key)?;
            for (i, node) in nodes.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", node)?;
            }
            writeln!(f, "}}")?;
        }

        Ok(())
    }
}
