/// Prefix of the synthesized kernel names.
pub const KERNEL_NAME_PREFIX: &str = "xSYCL";

/// Prefix of the synthesized device function names, followed by a counter.
pub const DEVICE_FUNCTION_PREFIX: &str = "sycl_func_";

/// Prefix of the synthesized argument names, followed by a counter.
pub const ARGUMENT_NAME_PREFIX: &str = "arg_";

/// Longest symbol the backend accepts for a kernel together with its compute
/// unit name.
pub const BACKEND_SYMBOL_LIMIT: usize = 64;

/// The backend names compute units after their kernel with a `_<N>` suffix.
/// Reserved room for that suffix.
pub const COMPUTE_UNIT_SUFFIX_LEN: usize = 2;

/// Builtin namespaces stripped from declarations, in the order they are tried.
/// A longer prefix always comes before a shorter overlapping one.
pub const BUILTIN_PREFIXES: [&str; 4] = [
    "__spirv_ocl_u_",
    "__spirv_ocl_s_",
    "__spirv_ocl_",
    "__spir_ocl_",
];

/// Demangled template marker carrying a kernel's required work-group size.
pub const REQD_WORK_GROUP_SIZE_MARKER: &str = "cl::sycl::xilinx::reqd_work_group_size<";

/// Function metadata key of the required work-group size.
pub const REQD_WORK_GROUP_SIZE_MD: &str = "reqd_work_group_size";

/// Opaque backend intrinsic whose pointer operands must not be generic.
pub const BLACK_BOX_CALLEE: &str = "_ssdm_SpecArrayPartition";

/// Reserved namespace of the backend string attributes.
pub const FPGA_ATTRIBUTE_PREFIX: &str = "fpga.";

/// Marks a function whose only purpose is to carry `fpga.` annotations.
pub const PROPERTY_WRAPPER_ATTRIBUTE: &str = "fpga.propertywrapper";

/// Marks a kernel (top-level function) for the HLS backend.
pub const TOP_FUNCTION_ATTRIBUTE: &str = "fpga.top.func";

/// Requests every callee to be inlined into the function.
pub const FLATTEN_ATTRIBUTE: &str = "flatten";

/// Global holding the module constructors; never privatized.
pub const GLOBAL_CTORS: &str = "llvm.global_ctors";

/// Builtin callee whose demangled name starts with this prefix cannot be
/// implemented by the HLS backend.
pub const UNSUPPORTED_BUILTIN_PREFIX: &str = "__spir_ocl_get";

/// Work-item id intrinsic folded to a constant after O3 in the HLS flow.
pub const SPIR_GLOBAL_ID_INTRINSIC: &str = "llvm.spir.get.global.id.i64";

/// Memory intrinsic families lowered into loops.
pub const MEMCPY_INTRINSIC_PREFIX: &str = "llvm.memcpy.";
pub const MEMMOVE_INTRINSIC_PREFIX: &str = "llvm.memmove.";
pub const MEMSET_INTRINSIC_PREFIX: &str = "llvm.memset.";

/// Named metadata stamped by the finalizer.
pub const SPIR_VERSION_MD: &str = "opencl.spir.version";
pub const SPIR_VERSION: [u32; 2] = [2, 0];
pub const OCL_VERSION_MD: &str = "opencl.ocl.version";
pub const OCL_VERSION: [u32; 2] = [1, 2];

/// Named metadata left by the frontend and removed by the finalizer.
pub const STALE_SOURCE_MD: &str = "spirv.Source";

/// Target triple optionally set by the finalizer.
pub const SPIR_TRIPLE: &str = "spir64";
