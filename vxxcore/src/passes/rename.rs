//! Symbol renaming.
//!
//! Device functions lose their mangled names for sequential `sycl_func_<N>`
//! names. Declarations keep their mangling but shed the builtin namespaces
//! the frontend prefixes them with, so that they bind to the backend builtin
//! library:
//!
//! ```text
//! _Z24__spir_ocl_get_global_idj  ->  _Z13get_global_idj
//! ```
//!
//! The length field after `_Z` counts the characters of the identifier, it is
//! recomputed by subtracting the length of the stripped prefix.
use log::{debug, trace};
use vxxinstr::modules::{FunctionId, Module};

use crate::{
    magic::{BUILTIN_PREFIXES, DEVICE_FUNCTION_PREFIX},
    utils::error::{PassError, PassResult},
};

/// Locate the first `_Z<digits><prefix>` of `name`. Returns the start of the
/// occurrence, the digits and the end of the occurrence.
fn find_prefixed_mangling<'a>(name: &'a str, prefix: &str) -> Option<(usize, &'a str, usize)> {
    name.match_indices("_Z").find_map(|(start, _)| {
        let after_z = start + 2;
        let digits_len = name[after_z..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        if digits_len == 0 {
            return None;
        }
        let digits_end = after_z + digits_len;
        name[digits_end..]
            .starts_with(prefix)
            .then(|| (start, &name[after_z..digits_end], digits_end + prefix.len()))
    })
}

/// Remove `prefix` from the first `_Z<digits><prefix>` occurrence of `name`.
///
/// `Ok(None)` when the pattern does not occur. The occurrence is dropped and
/// the name is reassembled as `_Z<digits - prefix.len()>` followed by what
/// surrounded it.
pub fn strip_prefix(name: &str, prefix: &str) -> PassResult<Option<String>> {
    let Some((start, digits, end)) = find_prefixed_mangling(name, prefix) else {
        return Ok(None);
    };

    let len = digits
        .parse::<usize>()
        .ok()
        .and_then(|len| len.checked_sub(prefix.len()))
        .ok_or_else(|| PassError::MalformedMangling {
            symbol: name.to_string(),
            prefix: prefix.to_string(),
        })?;

    Ok(Some(format!("_Z{}{}{}", len, &name[..start], &name[end..])))
}

/// Apply every builtin prefix in priority order, each on the result of the
/// previous one.
pub fn normalize_declaration_name(name: &str) -> PassResult<String> {
    let mut current = name.to_string();
    for prefix in BUILTIN_PREFIXES {
        if let Some(stripped) = strip_prefix(&current, prefix)? {
            trace!("Stripped {} from {}: {}", prefix, current, stripped);
            current = stripped;
        }
    }
    Ok(current)
}

/// Rename the declaration `id` to its normalized name.
///
/// When another function already carries the normalized name and shares the
/// prototype, the declaration is merged into it: references are redirected
/// and the declaration erased. Returns the new name, `None` if nothing
/// changed.
pub fn normalize_declaration(module: &mut Module, id: FunctionId) -> PassResult<Option<String>> {
    let current = module.functions[id].name.clone();
    let normalized = normalize_declaration_name(&current)?;
    if normalized == current {
        return Ok(None);
    }

    let collision = || PassError::SymbolCollision {
        from: current.clone(),
        to: normalized.clone(),
    };
    if module.find_global(&normalized).is_some() {
        return Err(collision());
    }
    match module.find_function(&normalized) {
        Some(existing) if module.functions[existing].same_signature(&module.functions[id]) => {
            debug!("Merging declaration {} into {}", current, normalized);
            module.replace_function(id, existing)?;
        }
        Some(_) => return Err(collision()),
        None => {
            debug!("Renaming declaration {} to {}", current, normalized);
            module.rename_function(id, normalized.clone())?;
        }
    }
    Ok(Some(normalized))
}

/// Normalize every declaration of `ids`. Returns the number of declarations
/// renamed or merged.
pub fn normalize_declarations(module: &mut Module, ids: &[FunctionId]) -> PassResult<usize> {
    let mut renamed = 0;
    for id in ids {
        if normalize_declaration(module, *id)?.is_some() {
            renamed += 1;
        }
    }
    Ok(renamed)
}

/// Hands out `sycl_func_<N>` names in order, skipping names already used by
/// another symbol of the module.
#[derive(Debug, Default, Clone)]
pub struct DeviceFunctionNamer {
    counter: usize,
}

impl DeviceFunctionNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of names handed out or skipped so far.
    pub fn counter(&self) -> usize {
        self.counter
    }

    /// Next free name for function `id`. A name `id` already holds counts as
    /// free, so running the namer again keeps the names it handed out.
    pub fn next_name(&mut self, module: &Module, id: FunctionId) -> String {
        loop {
            let name = format!("{}{}", DEVICE_FUNCTION_PREFIX, self.counter);
            self.counter += 1;
            if module.functions[id].name == name || !module.is_symbol_taken(&name) {
                return name;
            }
        }
    }

    /// Rename the device function `id`. Returns its new name.
    pub fn rename(&mut self, module: &mut Module, id: FunctionId) -> PassResult<String> {
        let name = self.next_name(module, id);
        debug!("Renaming device function {} to {}", module.functions[id].name, name);
        module.rename_function(id, name.clone())?;
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use vxxinstr::{
        modules::{Argument, CallingConvention, Function},
        types::Type,
    };

    use super::*;
    use crate::tests_utils::ModuleBuilder;

    #[test]
    fn length_field_is_recomputed_for_every_prefix() {
        assert_eq!(
            strip_prefix("_Z24__spir_ocl_get_global_idj", "__spir_ocl_").unwrap(),
            Some("_Z13get_global_idj".to_string())
        );
        assert_eq!(
            strip_prefix("_Z15__spirv_ocl_sinf", "__spirv_ocl_").unwrap(),
            Some("_Z3sinf".to_string())
        );
        assert_eq!(
            strip_prefix("_Z17__spirv_ocl_u_absj", "__spirv_ocl_u_").unwrap(),
            Some("_Z3absj".to_string())
        );
        assert_eq!(
            strip_prefix("_Z19__spirv_ocl_s_clampiii", "__spirv_ocl_s_").unwrap(),
            Some("_Z5clampiii".to_string())
        );
    }

    #[test]
    fn absent_pattern_is_not_an_error() {
        assert_eq!(strip_prefix("_Z3fooi", "__spir_ocl_").unwrap(), None);
        assert_eq!(strip_prefix("__spir_ocl_get", "__spir_ocl_").unwrap(), None);
        assert_eq!(strip_prefix("_Z__spir_ocl_get", "__spir_ocl_").unwrap(), None);
    }

    #[test]
    fn impossible_length_field_is_rejected() {
        let err = strip_prefix("_Z5__spir_ocl_getv", "__spir_ocl_").unwrap_err();
        assert!(matches!(err, PassError::MalformedMangling { ref prefix, .. } if prefix == "__spir_ocl_"));
    }

    #[test]
    fn first_occurrence_wins() {
        assert_eq!(
            strip_prefix("x_Z14__spir_ocl_abc_Z14__spir_ocl_abc", "__spir_ocl_").unwrap(),
            Some("_Z3xabc_Z14__spir_ocl_abc".to_string())
        );
    }

    #[test]
    fn longer_prefixes_apply_before_shorter_ones() {
        assert_eq!(normalize_declaration_name("_Z17__spirv_ocl_u_absj").unwrap(), "_Z3absj");
        assert_eq!(normalize_declaration_name("_Z19__spirv_ocl_s_clampiii").unwrap(), "_Z5clampiii");
        assert_eq!(
            normalize_declaration_name("_Z24__spir_ocl_get_global_idj").unwrap(),
            "_Z13get_global_idj"
        );
        assert_eq!(normalize_declaration_name("printf").unwrap(), "printf");
    }

    #[test]
    fn declarations_merge_into_existing_symbols_of_same_prototype() {
        let mut builder = ModuleBuilder::new("m");
        let existing = builder.declaration("_Z3sinf", 1);
        let prefixed = builder.declaration("_Z15__spirv_ocl_sinf", 1);
        let user = builder.device_function("user", &[prefixed]);
        let mut module = builder.finish();

        assert_eq!(
            normalize_declaration(&mut module, prefixed).unwrap().as_deref(),
            Some("_Z3sinf")
        );
        assert!(!module.functions.contains_key(prefixed));
        assert_eq!(module.call_sites(existing).len(), 1);
        assert_eq!(module.call_sites(existing)[0].caller, user);
        module.verify().unwrap();
    }

    #[test]
    fn declarations_refuse_to_clash_with_other_prototypes() {
        let mut builder = ModuleBuilder::new("m");
        builder.declaration("_Z3sinf", 2);
        let prefixed = builder.declaration("_Z15__spirv_ocl_sinf", 1);
        let mut module = builder.finish();

        let err = normalize_declaration(&mut module, prefixed).unwrap_err();
        assert!(err.is_symbol_collision());
        assert_eq!(module.functions[prefixed].name, "_Z15__spirv_ocl_sinf");
    }

    #[test]
    fn device_function_names_skip_taken_symbols() {
        let mut builder = ModuleBuilder::new("m");
        let mut taken = Function::new("sycl_func_0", vec![Argument::new(Type::I32)], Type::Void);
        taken.cconv = CallingConvention::C;
        builder.function(taken);
        let a = builder.device_function("_Z1av", &[]);
        let b = builder.device_function("_Z1bv", &[]);
        let mut module = builder.finish();

        let mut namer = DeviceFunctionNamer::new();
        assert_eq!(namer.rename(&mut module, a).unwrap(), "sycl_func_1");
        assert_eq!(namer.rename(&mut module, b).unwrap(), "sycl_func_2");
        assert_eq!(namer.counter(), 3);
        module.verify().unwrap();

        let mut namer = DeviceFunctionNamer::new();
        assert_eq!(namer.rename(&mut module, a).unwrap(), "sycl_func_1");
    }
}
