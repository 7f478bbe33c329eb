//! Pipeline configuration.
//!
//! Every knob of the pipeline is an explicit field of [`PipelineConfig`];
//! there is no global state. The configuration may be written by hand or
//! loaded from a TOML document:
//!
//! ```toml
//! flow = "hls"
//! after_o3 = true
//! set_target_triple = false
//! uniform_calling_convention = "SpirFunc"
//! ```
use serde::{Deserialize, Serialize};
use strum::EnumIs;
use vxxinstr::modules::{CallingConvention, Module};

use crate::{passes::classify::KernelMode, utils::error::PassResult};

/// Backend the module is prepared for.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, EnumIs, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendFlow {
    /// SPIR consumer: device functions are force-inlined.
    #[default]
    Spir,

    /// High-level synthesis consumer: kernels are flattened and tagged as
    /// top-level functions.
    Hls,
}

impl BackendFlow {
    /// HLS targets carry an architecture starting with `fpga` and mentioning
    /// `hls` (e.g. `fpga64-xilinx-hls`). Everything else is SPIR.
    pub fn from_target_triple(triple: &str) -> Self {
        let arch = triple.split('-').next().unwrap_or_default();
        if arch.starts_with("fpga") && arch.contains("hls") {
            BackendFlow::Hls
        } else {
            BackendFlow::Spir
        }
    }

    /// How kernels are recognized once this flow has prepared the module.
    pub fn kernel_mode(self) -> KernelMode {
        match self {
            BackendFlow::Spir => KernelMode::CallingConvention,
            BackendFlow::Hls => KernelMode::TopFunctionAttribute,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Backend flow. `None` derives it from the module's target triple.
    pub flow: Option<BackendFlow>,

    /// The module already went through the optimizer. In the HLS flow, device
    /// functions then use the C calling convention and the global id builtin
    /// is folded.
    pub after_o3: bool,

    /// Run the preparation stage (wrapper unwrapping, privatization,
    /// lowering, calling conventions) before renaming.
    pub run_preparation: bool,

    /// Overwrite the module's target triple with `spir64`.
    pub set_target_triple: bool,

    /// Force one calling convention on every non-intrinsic function and call
    /// site once everything else is done.
    pub uniform_calling_convention: Option<CallingConvention>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            flow: None,
            after_o3: false,
            run_preparation: true,
            set_target_triple: false,
            uniform_calling_convention: None,
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from a TOML document. Missing keys keep their
    /// default value.
    pub fn from_toml_str(source: &str) -> PassResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Flow to use for `module`: the configured one, else the one implied by
    /// the module's target triple.
    pub fn resolve_flow(&self, module: &Module) -> BackendFlow {
        self.flow.unwrap_or_else(|| {
            module
                .target_triple
                .as_deref()
                .map(BackendFlow::from_target_triple)
                .unwrap_or_default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_from_triple() {
        assert_eq!(BackendFlow::from_target_triple("spir64"), BackendFlow::Spir);
        assert_eq!(
            BackendFlow::from_target_triple("spir64-unknown-unknown-sycldevice"),
            BackendFlow::Spir
        );
        assert_eq!(
            BackendFlow::from_target_triple("fpga64-xilinx-unknown-sycldevice"),
            BackendFlow::Spir
        );
        assert_eq!(
            BackendFlow::from_target_triple("fpga64_hls_hw-xilinx-linux"),
            BackendFlow::Hls
        );
        assert_eq!(BackendFlow::from_target_triple(""), BackendFlow::Spir);
    }

    #[test]
    fn toml_keeps_defaults_for_missing_keys() {
        let config = PipelineConfig::from_toml_str("flow = \"hls\"\nafter_o3 = true\n").unwrap();
        assert_eq!(config.flow, Some(BackendFlow::Hls));
        assert!(config.after_o3);
        assert!(config.run_preparation);
        assert!(!config.set_target_triple);
        assert_eq!(config.uniform_calling_convention, None);

        let config = PipelineConfig::from_toml_str("uniform_calling_convention = \"SpirFunc\"").unwrap();
        assert_eq!(config.uniform_calling_convention, Some(CallingConvention::SpirFunc));
        assert_eq!(config.flow, None);
    }

    #[test]
    fn toml_errors_are_reported() {
        let err = PipelineConfig::from_toml_str("flow = \"vhdl\"").unwrap_err();
        assert!(err.is_config_parse());
        let err = PipelineConfig::from_toml_str("after_o3 = ").unwrap_err();
        assert!(err.is_config_parse());
    }

    #[test]
    fn flow_resolution_prefers_configuration() {
        let mut module = Module::new("m");
        module.target_triple = Some("fpga64_hls_hw-xilinx-linux".into());

        let config = PipelineConfig::default();
        assert_eq!(config.resolve_flow(&module), BackendFlow::Hls);

        let config = PipelineConfig {
            flow: Some(BackendFlow::Spir),
            ..Default::default()
        };
        assert_eq!(config.resolve_flow(&module), BackendFlow::Spir);

        module.target_triple = None;
        assert_eq!(PipelineConfig::default().resolve_flow(&module), BackendFlow::Spir);
    }
}
