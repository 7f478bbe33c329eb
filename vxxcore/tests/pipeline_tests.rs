use vxxcore::{
    demangle::{DemangleTable, NoDemangler},
    magic::{
        BLACK_BOX_CALLEE, FLATTEN_ATTRIBUTE, OCL_VERSION_MD, PROPERTY_WRAPPER_ATTRIBUTE,
        REQD_WORK_GROUP_SIZE_MD, SPIR_GLOBAL_ID_INTRINSIC, SPIR_VERSION_MD, STALE_SOURCE_MD,
        TOP_FUNCTION_ATTRIBUTE,
    },
    pipeline::Pipeline,
    tests_utils::{ModuleBuilder, call_to, call_value, straight_body},
    utils::{
        conf::{BackendFlow, PipelineConfig},
        error::PassError,
    },
};
use vxxinstr::{
    consts::IConst,
    modules::{
        Argument, CallingConvention, Function, FunctionId, Linkage, Module,
        attributes::FnAttrFlags,
        instructions::misc::{Cast, CastVariant},
        metadata::MetadataNode,
        operand::{Name, Operand},
    },
    types::{AddressSpace, Type},
};

const SIZED_KERNEL: &str = "_ZTSN2cl4sycl6xilinx20reqd_work_group_sizeILi4ELi2ELi1EZ4mainE6kernelEE";
const SIZED_KERNEL_DEMANGLED: &str =
    "typeinfo name for cl::sycl::xilinx::reqd_work_group_size<4, 2, 1, main::kernel>";
const GLOBAL_ID_BUILTIN: &str = "_Z24__spir_ocl_get_global_idj";

fn demangler() -> DemangleTable {
    [(SIZED_KERNEL, SIZED_KERNEL_DEMANGLED)].into_iter().collect()
}

struct Sample {
    module: Module,
    kernel: FunctionId,
    helper: FunctionId,
    builtin: FunctionId,
    black_box: FunctionId,
}

/// Kernel with a work-group size in its name, a generic pointer handed to the
/// partitioning black box, and a helper calling the global id builtin.
fn sample_module() -> Sample {
    let mut builder = ModuleBuilder::new("sample");
    let builtin = builder.declaration(GLOBAL_ID_BUILTIN, 1);
    let helper = builder.device_function("_Z6helperv", &[builtin]);

    let mut black_box = Function::new(
        BLACK_BOX_CALLEE,
        vec![Argument::new(Type::Ptr(AddressSpace::GENERIC))],
        Type::Void,
    );
    black_box.cconv = CallingConvention::SpirFunc;
    let black_box = builder.function(black_box);

    let mut kernel = Function::new(
        SIZED_KERNEL,
        vec![
            Argument::new(Type::PTR),
            Argument::named("n", Type::I32),
            Argument::new(Type::I32),
        ],
        Type::Void,
    );
    kernel.cconv = CallingConvention::SpirKernel;
    straight_body(
        &mut kernel,
        vec![
            Cast {
                dest: Name(0),
                variant: CastVariant::AddrSpaceCast,
                value: Operand::Arg(0),
                ty: Type::Ptr(AddressSpace::GENERIC),
            }
            .into(),
            call_to(black_box, vec![Operand::Reg(Name(0))], CallingConvention::SpirFunc),
            call_to(helper, vec![], CallingConvention::SpirFunc),
        ],
    );
    let kernel = builder.function(kernel);

    let mut module = builder.finish();
    module.add_named_metadata(STALE_SOURCE_MD, MetadataNode::from_i32s([4, 100000]));
    Sample {
        module,
        kernel,
        helper,
        builtin,
        black_box,
    }
}

#[test]
fn spir_flow_rewrites_the_whole_module() {
    let Sample {
        mut module,
        kernel,
        helper,
        builtin,
        black_box,
    } = sample_module();

    let stats = Pipeline::new(PipelineConfig::default(), demangler())
        .run(&mut module)
        .unwrap();
    module.verify().unwrap();

    assert_eq!(stats.kernels, 1);
    assert_eq!(stats.renamed_kernels, 1);
    assert_eq!(stats.work_group_sizes, 1);
    assert_eq!(stats.device_functions, 1);
    assert_eq!(stats.collapsed_casts, 1);
    assert_eq!(stats.normalized_declarations, 1);

    let function = &module.functions[kernel];
    assert_eq!(function.name, "xSYCL17741605614697334001");
    assert_eq!(function.linkage, Linkage::External);
    assert_eq!(
        function.get_metadata(REQD_WORK_GROUP_SIZE_MD),
        Some(&MetadataNode::from_i32s([4, 2, 1]))
    );
    let names: Vec<_> = function.params.iter().map(|arg| arg.name.as_deref()).collect();
    assert_eq!(names, [Some("arg_0"), Some("n"), Some("arg_1")]);

    // The black box sees the kernel argument, not its generic cast.
    let (_, call) = function
        .calls()
        .find(|(_, call)| call.resolved_callee() == Some(black_box))
        .unwrap();
    assert_eq!(call.args, vec![Operand::Arg(0)]);
    assert!(function.find_definition(Name(0)).is_none());

    let helper = &module.functions[helper];
    assert_eq!(helper.name, "sycl_func_0");
    assert_eq!(helper.linkage, Linkage::Private);
    assert!(helper.attributes.has_flag(FnAttrFlags::ALWAYS_INLINE));

    assert_eq!(module.functions[builtin].name, "_Z13get_global_idj");
    assert_eq!(module.functions[black_box].name, BLACK_BOX_CALLEE);

    assert_eq!(
        module.named_metadata(SPIR_VERSION_MD),
        &[MetadataNode::from_i32s([2, 0])]
    );
    assert_eq!(
        module.named_metadata(OCL_VERSION_MD),
        &[MetadataNode::from_i32s([1, 2])]
    );
    assert!(module.named_metadata(STALE_SOURCE_MD).is_empty());
    assert_eq!(module.target_triple, None);
}

#[test]
fn declarations_are_renamed_after_definitions() {
    let mut builder = ModuleBuilder::new("m");
    let builtin = builder.declaration(GLOBAL_ID_BUILTIN, 1);
    // A definition holding the stripped name gives it up first.
    let squatter = builder.device_function("_Z13get_global_idj", &[builtin]);
    builder.kernel("_ZTS6Kernel", &[squatter]);
    let mut module = builder.finish();

    Pipeline::default().run(&mut module).unwrap();
    module.verify().unwrap();

    assert_eq!(module.functions[squatter].name, "sycl_func_0");
    assert_eq!(module.functions[builtin].name, "_Z13get_global_idj");
    assert!(module.find_function("xSYCL2847612115522792723").is_some());
}

#[test]
fn property_wrappers_are_unwrapped_into_kernels() {
    let mut builder = ModuleBuilder::new("m");
    let body = builder.device_function("_Z4bodyv", &[]);
    let wrapper = builder.device_function("_Z7wrapperv", &[body]);
    let attributes = &mut builder.module_mut().functions[wrapper].attributes;
    attributes.insert(PROPERTY_WRAPPER_ATTRIBUTE, "");
    attributes.insert("fpga.pipeline", "on");
    let kernel = builder.kernel("_ZTS6Kernel", &[wrapper]);
    let mut module = builder.finish();

    let stats = Pipeline::default().run(&mut module).unwrap();
    module.verify().unwrap();
    assert_eq!(stats.prepare.map(|prepare| prepare.unwrapped_wrappers), Some(1));

    let function = &module.functions[kernel];
    assert_eq!(function.name, "xSYCL2847612115522792723");
    assert_eq!(function.attributes.get("fpga.pipeline"), Some("on"));
    let callees: Vec<_> = function.calls().filter_map(|(_, call)| call.resolved_callee()).collect();
    assert_eq!(callees, vec![body]);
}

#[test]
fn memory_intrinsics_are_lowered_before_renaming() {
    let mut builder = ModuleBuilder::new("m");
    let memcpy = builder.function(Function::new(
        "llvm.memcpy.p0.p0.i64",
        vec![
            Argument::new(Type::PTR),
            Argument::new(Type::PTR),
            Argument::new(Type::I64),
            Argument::new(Type::I1),
        ],
        Type::Void,
    ));
    let mut kernel = Function::new(
        "_ZTS6Kernel",
        vec![
            Argument::new(Type::PTR),
            Argument::new(Type::PTR),
            Argument::new(Type::I64),
        ],
        Type::Void,
    );
    kernel.cconv = CallingConvention::SpirKernel;
    straight_body(
        &mut kernel,
        vec![call_to(
            memcpy,
            vec![
                Operand::Arg(0),
                Operand::Arg(1),
                Operand::Arg(2),
                IConst::bool(false).into(),
            ],
            CallingConvention::C,
        )],
    );
    let kernel = builder.function(kernel);
    let mut module = builder.finish();

    let stats = Pipeline::default().run(&mut module).unwrap();
    module.verify().unwrap();
    assert_eq!(stats.prepare.map(|prepare| prepare.lowered_intrinsics), Some(1));

    let function = &module.functions[kernel];
    assert_eq!(function.calls().count(), 0);
    assert!(function.instructions().any(|(_, instr)| instr.is_m_store()));
    // Intrinsics are never renamed nor given another calling convention.
    assert_eq!(module.functions[memcpy].name, "llvm.memcpy.p0.p0.i64");
    assert_eq!(module.functions[memcpy].cconv, CallingConvention::C);
}

#[test]
fn hls_flow_marks_top_functions() {
    let Sample {
        mut module,
        kernel,
        helper,
        builtin,
        ..
    } = sample_module();
    module.target_triple = Some("fpga64_hls_hw-xilinx-linux".into());

    Pipeline::new(PipelineConfig::default(), demangler())
        .run(&mut module)
        .unwrap();
    module.verify().unwrap();

    let function = &module.functions[kernel];
    assert_eq!(function.name, "xSYCL17741605614697334001");
    assert_eq!(function.cconv, CallingConvention::C);
    assert!(function.attributes.contains(TOP_FUNCTION_ATTRIBUTE));
    assert!(function.attributes.contains(FLATTEN_ATTRIBUTE));
    assert!(function.get_metadata(REQD_WORK_GROUP_SIZE_MD).is_some());

    let helper = &module.functions[helper];
    assert_eq!(helper.name, "sycl_func_0");
    assert_eq!(helper.cconv, CallingConvention::SpirFunc);
    assert!(!helper.attributes.has_flag(FnAttrFlags::ALWAYS_INLINE));
    assert_eq!(module.functions[builtin].name, "_Z13get_global_idj");
}

#[test]
fn hls_flow_after_optimization_keeps_c_functions_and_folds_global_id() {
    let mut builder = ModuleBuilder::new("m");
    let global_id = builder.function(Function::new(
        SPIR_GLOBAL_ID_INTRINSIC,
        vec![Argument::new(Type::I32)],
        Type::I64,
    ));
    let helper = builder.device_function("_Z6helperv", &[]);
    let mut kernel = Function::new("_ZTS6Kernel", vec![], Type::Void);
    kernel.cconv = CallingConvention::SpirKernel;
    straight_body(
        &mut kernel,
        vec![
            call_value(
                Name(0),
                Type::I64,
                global_id,
                vec![IConst::i32(0).into()],
                CallingConvention::C,
            ),
            call_to(helper, vec![], CallingConvention::SpirFunc),
        ],
    );
    let kernel = builder.function(kernel);
    let mut module = builder.finish();

    let config = PipelineConfig {
        flow: Some(BackendFlow::Hls),
        after_o3: true,
        ..Default::default()
    };
    let stats = Pipeline::new(config, NoDemangler).run(&mut module).unwrap();
    module.verify().unwrap();

    assert_eq!(stats.prepare.map(|prepare| prepare.folded_builtin_calls), Some(1));
    assert!(module.find_function(SPIR_GLOBAL_ID_INTRINSIC).is_none());
    assert_eq!(stats.device_functions, 0);
    assert_eq!(module.functions[helper].name, "_Z6helperv");
    assert_eq!(module.functions[helper].cconv, CallingConvention::C);
    assert_eq!(module.functions[kernel].name, "xSYCL2847612115522792723");
}

#[test]
fn toml_configuration_drives_the_finalizer() {
    let config = PipelineConfig::from_toml_str(
        r#"
        flow = "spir"
        set_target_triple = true
        uniform_calling_convention = "SpirFunc"
        "#,
    )
    .unwrap();
    let Sample {
        mut module, kernel, ..
    } = sample_module();

    Pipeline::new(config, demangler()).run(&mut module).unwrap();

    assert_eq!(module.target_triple.as_deref(), Some("spir64"));
    assert_eq!(module.functions[kernel].cconv, CallingConvention::SpirFunc);
    assert!(
        module
            .functions
            .values()
            .flat_map(|function| function.calls())
            .all(|(_, call)| call.cconv == CallingConvention::SpirFunc)
    );
}

#[test]
fn malformed_work_group_size_stops_the_pipeline() {
    let Sample { mut module, .. } = sample_module();
    let demangler: DemangleTable = [(
        SIZED_KERNEL,
        "typeinfo name for cl::sycl::xilinx::reqd_work_group_size<4, 2, main::kernel>",
    )]
    .into_iter()
    .collect();

    let err = Pipeline::new(PipelineConfig::default(), demangler)
        .run(&mut module)
        .unwrap_err();
    assert!(matches!(err, PassError::MalformedAnnotation { found: 2, .. }));
}

#[test]
fn called_kernels_are_rejected() {
    let mut builder = ModuleBuilder::new("m");
    let kernel = builder.kernel("_ZTS6Kernel", &[]);
    builder.kernel("_ZTS5Other", &[kernel]);
    let mut module = builder.finish();

    let err = Pipeline::default().run(&mut module).unwrap_err();
    assert!(err.is_missing_counterpart());
}

#[test]
fn rerunning_keeps_synthesized_names() {
    let Sample {
        mut module,
        kernel,
        helper,
        ..
    } = sample_module();
    let pipeline = Pipeline::new(PipelineConfig::default(), demangler());
    pipeline.run(&mut module).unwrap();
    let stats = pipeline.run(&mut module).unwrap();

    assert_eq!(stats.renamed_kernels, 0);
    assert_eq!(module.functions[kernel].name, "xSYCL17741605614697334001");
    // Device function numbering restarts, so the helper keeps its name.
    assert_eq!(module.functions[helper].name, "sycl_func_0");
    // Version records are appended once per run.
    assert_eq!(module.named_metadata(SPIR_VERSION_MD).len(), 2);
}
