//! The rewriting pipeline.
//!
//! Stages run in a fixed order on one module:
//!
//! 1. preparation (optional): wrappers, linkage, lowering, calling
//!    conventions,
//! 2. kernels: work-group size metadata, synthesized name, argument names,
//!    address-space cleanup,
//! 3. device functions: `sycl_func_<N>` names, argument names, address-space
//!    cleanup,
//! 4. declarations: builtin prefixes stripped, once every definition carries
//!    its final name,
//! 5. finalization: version metadata, stale metadata, optional triple and
//!    calling convention.
//!
//! Roles are computed once, after preparation and before any renaming.
use log::{debug, info, trace};
use vxxinstr::modules::Module;

use crate::{
    demangle::{Demangler, NoDemangler},
    passes::{
        addrspace::fix_address_spaces,
        classify::{FunctionRole, functions_with_role},
        decorate::{apply_kernel_properties, name_arguments, set_unique_name},
        finalize::{remove_stale_metadata, set_spir_triple, set_uniform_calling_convention, set_versions},
        prepare::{PrepareStats, prepare_module},
        rename::{DeviceFunctionNamer, normalize_declarations},
    },
    utils::{conf::PipelineConfig, error::PassResult},
};

/// Summary of one pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    /// Set when the preparation stage ran.
    pub prepare: Option<PrepareStats>,
    pub kernels: usize,
    pub renamed_kernels: usize,
    pub work_group_sizes: usize,
    pub device_functions: usize,
    pub named_arguments: usize,
    pub collapsed_casts: usize,
    pub normalized_declarations: usize,
}

/// Configured pipeline. Holds no state between runs, so one value can
/// process any number of modules.
#[derive(Debug, Clone)]
pub struct Pipeline<D: Demangler = NoDemangler> {
    config: PipelineConfig,
    demangler: D,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default(), NoDemangler)
    }
}

impl<D: Demangler> Pipeline<D> {
    pub fn new(config: PipelineConfig, demangler: D) -> Self {
        Self { config, demangler }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Rewrite `module` in place. On error the module is left as the failing
    /// stage found it.
    pub fn run(&self, module: &mut Module) -> PassResult<PipelineStats> {
        let flow = self.config.resolve_flow(module);
        let mode = flow.kernel_mode();
        info!("Running pipeline on module {} ({:?} flow)", module.name, flow);

        let mut stats = PipelineStats::default();
        if self.config.run_preparation {
            stats.prepare = Some(prepare_module(
                module,
                flow,
                self.config.after_o3,
                &self.demangler,
            )?);
        }

        let kernels = functions_with_role(module, mode, FunctionRole::Kernel);
        let device_functions = functions_with_role(module, mode, FunctionRole::DeviceFunction);
        let declarations = functions_with_role(module, mode, FunctionRole::Declaration);
        debug!(
            "{} kernel(s), {} device function(s), {} declaration(s)",
            kernels.len(),
            device_functions.len(),
            declarations.len()
        );

        info!("Decorating {} kernel(s)", kernels.len());
        for id in &kernels {
            if apply_kernel_properties(module, *id, &self.demangler)? {
                stats.work_group_sizes += 1;
            }
            if set_unique_name(module, *id)?.is_some() {
                stats.renamed_kernels += 1;
            }
            stats.named_arguments += name_arguments(&mut module.functions[*id]);
            stats.collapsed_casts += fix_address_spaces(module, *id)?;
        }
        stats.kernels = kernels.len();

        info!("Renaming {} device function(s)", device_functions.len());
        let mut namer = DeviceFunctionNamer::new();
        for id in &device_functions {
            namer.rename(module, *id)?;
            stats.named_arguments += name_arguments(&mut module.functions[*id]);
            stats.collapsed_casts += fix_address_spaces(module, *id)?;
        }
        stats.device_functions = device_functions.len();

        stats.normalized_declarations = normalize_declarations(module, &declarations)?;
        debug!("Normalized {} declaration(s)", stats.normalized_declarations);

        set_versions(module);
        remove_stale_metadata(module);
        if self.config.set_target_triple {
            set_spir_triple(module);
        }
        if let Some(cconv) = self.config.uniform_calling_convention {
            set_uniform_calling_convention(module, cconv);
        }

        info!("Pipeline done on module {}: {:?}", module.name, stats);
        trace!("Final module:\n{}", module);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use vxxinstr::modules::Linkage;

    use super::*;
    use crate::tests_utils::ModuleBuilder;

    #[test]
    fn default_pipeline_runs_on_empty_module() {
        let mut module = Module::new("empty");
        let stats = Pipeline::default().run(&mut module).unwrap();
        assert_eq!(stats.kernels, 0);
        assert!(stats.prepare.is_some());
        assert_eq!(module.named_metadata("opencl.spir.version").len(), 1);
    }

    #[test]
    fn skipping_preparation_keeps_linkage() {
        let mut builder = ModuleBuilder::new("m");
        let device = builder.device_function("_Z6helperv", &[]);
        builder.kernel("_ZTS6Kernel", &[device]);
        let mut module = builder.finish();

        let config = PipelineConfig {
            run_preparation: false,
            ..Default::default()
        };
        let stats = Pipeline::new(config, NoDemangler).run(&mut module).unwrap();
        assert_eq!(stats.prepare, None);
        assert_eq!(stats.kernels, 1);
        assert_eq!(stats.device_functions, 1);
        assert_eq!(module.functions[device].name, "sycl_func_0");
        assert_eq!(module.functions[device].linkage, Linkage::External);
        assert!(module.find_function("xSYCL2847612115522792723").is_some());
    }
}
