//! Kernel decoration.
//!
//! Kernel properties are encoded by the frontend in the kernel type name, so
//! they show up as template arguments in the demangled kernel symbol:
//!
//! ```text
//! cl::sycl::xilinx::reqd_work_group_size<4, 2, 1, main::kernel>
//! ```
//!
//! The decorator turns them into metadata, then replaces the mangled name by
//! a synthesized one the backend accepts and names the kernel arguments.
use log::debug;
use vxxinstr::modules::{Function, FunctionId, Module, metadata::MetadataNode};

use crate::{
    demangle::Demangler,
    magic::{ARGUMENT_NAME_PREFIX, REQD_WORK_GROUP_SIZE_MARKER, REQD_WORK_GROUP_SIZE_MD},
    naming::{check_backend_length, is_synthesized_kernel_name, synthesize_kernel_name},
    utils::error::{PassError, PassResult},
};

/// Top-level template arguments following an opening `<` at the start of
/// `text`. Nested `<`/`>` pairs and the commas inside them are kept in the
/// argument they belong to.
fn template_arguments(text: &str) -> Vec<&str> {
    let mut arguments = Vec::new();
    let mut depth = 1usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    arguments.push(&text[start..i]);
                    return arguments;
                }
            }
            ',' if depth == 1 => {
                arguments.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    // Unterminated list, keep what was read.
    arguments.push(&text[start..]);
    arguments
}

/// Value of an integer literal template argument, with an optional `u`, `l`,
/// `ul`, `ll` or `ull` suffix.
fn integer_literal(argument: &str) -> Option<u32> {
    let argument = argument.trim();
    let digits = ["ull", "ul", "ll", "u", "l"]
        .iter()
        .find_map(|suffix| {
            argument
                .len()
                .checked_sub(suffix.len())
                .filter(|at| argument.is_char_boundary(*at) && argument[*at..].eq_ignore_ascii_case(suffix))
                .map(|at| &argument[..at])
        })
        .unwrap_or(argument);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Required work-group size carried by the demangled name of `kernel`.
///
/// `Ok(None)` when the marker is absent. Only the first marker counts; its
/// leading integer arguments must be exactly three.
pub fn reqd_work_group_size(kernel: &str, demangled: &str) -> PassResult<Option<[u32; 3]>> {
    let Some(at) = demangled.find(REQD_WORK_GROUP_SIZE_MARKER) else {
        return Ok(None);
    };
    let annotation = &demangled[at..];
    let arguments = template_arguments(&annotation[REQD_WORK_GROUP_SIZE_MARKER.len()..]);
    let sizes: Vec<u32> = arguments.iter().map_while(|arg| integer_literal(arg)).collect();

    let found = sizes.len();
    sizes.try_into().map(Some).map_err(|_| PassError::MalformedAnnotation {
        kernel: kernel.to_string(),
        annotation: annotation.to_string(),
        found,
    })
}

/// Attach the required work-group size metadata of kernel `id`, if its name
/// carries one. Returns true if metadata was attached.
pub fn apply_kernel_properties(module: &mut Module, id: FunctionId, demangler: &dyn Demangler) -> PassResult<bool> {
    let function = &mut module.functions[id];
    let demangled = demangler.demangle_or_raw(&function.name);
    let Some(sizes) = reqd_work_group_size(&function.name, &demangled)? else {
        return Ok(false);
    };

    debug!(
        "Kernel {} requires a work-group size of {}x{}x{}",
        function.name, sizes[0], sizes[1], sizes[2]
    );
    function.set_metadata(REQD_WORK_GROUP_SIZE_MD, MetadataNode::from_i32s(sizes));
    Ok(true)
}

/// Rename kernel `id` to its synthesized name. A kernel that already carries
/// a synthesized name keeps it. Returns the new name, `None` if unchanged.
pub fn set_unique_name(module: &mut Module, id: FunctionId) -> PassResult<Option<String>> {
    let current = &module.functions[id].name;
    if is_synthesized_kernel_name(current) {
        return Ok(None);
    }

    let name = synthesize_kernel_name(current);
    check_backend_length(&name)?;
    debug!("Renaming kernel {} to {}", current, name);
    module.rename_function(id, name.clone())?;
    Ok(Some(name))
}

/// Give `arg_<k>` names to the unnamed arguments, `k` counting the unnamed
/// arguments only. Returns the number of arguments named.
pub fn name_arguments(function: &mut Function) -> usize {
    let mut counter = 0;
    for argument in function.params.iter_mut().filter(|arg| !arg.has_name()) {
        argument.name = Some(format!("{}{}", ARGUMENT_NAME_PREFIX, counter));
        counter += 1;
    }
    counter
}

#[cfg(test)]
mod tests {
    use vxxinstr::{
        modules::{Argument, CallingConvention},
        types::Type,
    };

    use super::*;
    use crate::{demangle::DemangleTable, tests_utils::ModuleBuilder};

    const KERNEL: &str = "_ZTSN2cl4sycl6xilinx20reqd_work_group_sizeILi4ELi2ELi1EZ4mainE6kernelEE";
    const DEMANGLED: &str =
        "typeinfo name for cl::sycl::xilinx::reqd_work_group_size<4, 2, 1, main::kernel>";

    #[test]
    fn work_group_size_is_parsed_structurally() {
        assert_eq!(reqd_work_group_size(KERNEL, DEMANGLED).unwrap(), Some([4, 2, 1]));
        assert_eq!(
            reqd_work_group_size(
                "k",
                "cl::sycl::xilinx::reqd_work_group_size<8ul, 1u,2ULL, foo<1, 2>>"
            )
            .unwrap(),
            Some([8, 1, 2])
        );
        assert_eq!(reqd_work_group_size("k", "main::kernel").unwrap(), None);
    }

    #[test]
    fn wrong_dimension_count_is_fatal() {
        let err = reqd_work_group_size("k", "cl::sycl::xilinx::reqd_work_group_size<4, 2, main::k>")
            .unwrap_err();
        assert!(matches!(err, PassError::MalformedAnnotation { found: 2, .. }));

        let err = reqd_work_group_size("k", "cl::sycl::xilinx::reqd_work_group_size<1, 2, 3, 4>")
            .unwrap_err();
        assert!(matches!(err, PassError::MalformedAnnotation { found: 4, .. }));
    }

    #[test]
    fn nested_arguments_do_not_count_as_sizes() {
        let err = reqd_work_group_size(
            "k",
            "cl::sycl::xilinx::reqd_work_group_size<foo<1, 2, 3>, 4, 2, 1>",
        )
        .unwrap_err();
        assert!(matches!(err, PassError::MalformedAnnotation { found: 0, .. }));
    }

    #[test]
    fn kernel_gets_metadata_and_synthesized_name() {
        let mut builder = ModuleBuilder::new("m");
        let kernel = builder.kernel(KERNEL, &[]);
        let mut module = builder.finish();
        let demangler: DemangleTable = [(KERNEL, DEMANGLED)].into_iter().collect();

        assert!(apply_kernel_properties(&mut module, kernel, &demangler).unwrap());
        let node = module.functions[kernel]
            .get_metadata(REQD_WORK_GROUP_SIZE_MD)
            .unwrap();
        assert_eq!(node.int_values(), Some(vec![4, 2, 1]));

        let name = set_unique_name(&mut module, kernel).unwrap().unwrap();
        assert_eq!(name, "xSYCL17741605614697334001");
        assert_eq!(module.functions[kernel].name, name);

        // Already synthesized: hashed once only.
        assert_eq!(set_unique_name(&mut module, kernel).unwrap(), None);
        assert_eq!(module.functions[kernel].name, name);
    }

    #[test]
    fn arguments_are_named_once() {
        let mut function = Function::new(
            "k",
            vec![
                Argument::new(Type::PTR),
                Argument::named("size", Type::I32),
                Argument::new(Type::I32),
            ],
            Type::Void,
        );
        function.cconv = CallingConvention::SpirKernel;

        assert_eq!(name_arguments(&mut function), 2);
        let names: Vec<_> = function.params.iter().map(|arg| arg.name.clone().unwrap()).collect();
        assert_eq!(names, ["arg_0", "size", "arg_1"]);

        assert_eq!(name_arguments(&mut function), 0);
        let again: Vec<_> = function.params.iter().map(|arg| arg.name.clone().unwrap()).collect();
        assert_eq!(names, again);
    }
}
