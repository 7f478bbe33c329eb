//! Kernel name synthesis.
//!
//! The backend chokes on most characters of mangled names, so kernels are
//! renamed to `xSYCL<hash>` where the hash is derived from the original
//! mangled name. The runtime recomputes the same name from the kernel type
//! name to find the kernel in the binary, so the derivation must never
//! change:
//!
//! 1. `uuid = uuid_v5(NAMESPACE_DNS, name)`
//! 2. `seed = 0`, then for every byte `b` of the uuid:
//!    `seed ^= b + 0x9e3779b9 + (seed << 6) + (seed >> 2)` (64-bit wrapping)
//! 3. `xSYCL` followed by the decimal `seed`
use uuid::Uuid;

use crate::{
    magic::{BACKEND_SYMBOL_LIMIT, COMPUTE_UNIT_SUFFIX_LEN, KERNEL_NAME_PREFIX},
    utils::error::{PassError, PassResult},
};

/// Name-based (SHA-1) uuid of `name` in the DNS namespace.
pub fn kernel_uuid(name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes())
}

/// Fold the 16 bytes of `uuid` with the hash-combine step.
pub fn uuid_hash(uuid: &Uuid) -> u64 {
    uuid.as_bytes().iter().fold(0u64, |seed, byte| {
        seed ^ (*byte as u64)
            .wrapping_add(0x9e3779b9)
            .wrapping_add(seed << 6)
            .wrapping_add(seed >> 2)
    })
}

/// Synthesized backend name of a kernel whose mangled name is `name`.
pub fn synthesize_kernel_name(name: &str) -> String {
    format!("{}{}", KERNEL_NAME_PREFIX, uuid_hash(&kernel_uuid(name)))
}

/// Returns true if `name` already has the `xSYCL<digits>` shape.
pub fn is_synthesized_kernel_name(name: &str) -> bool {
    name.strip_prefix(KERNEL_NAME_PREFIX)
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Reject kernel names the backend would have to truncate once it appends
/// the compute unit suffix.
pub fn check_backend_length(name: &str) -> PassResult<()> {
    let len = name.len() + COMPUTE_UNIT_SUFFIX_LEN;
    if len > BACKEND_SYMBOL_LIMIT {
        return Err(PassError::KernelNameTooLong {
            name: name.to_string(),
            len,
            max: BACKEND_SYMBOL_LIMIT,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_uuid_hashes_to_reference_value() {
        let uuid = Uuid::parse_str("8e6761a3-f150-580f-bae8-7d8d86bfa552").unwrap();
        assert_eq!(uuid_hash(&uuid), 14050332600208107103);
    }

    #[test]
    fn fixed_name_vectors() {
        let vectors = [
            (
                "_ZTSZ4mainE11vector_add",
                "87a047ca-de6b-51b7-885a-2a9a3b216684",
                13326137138564970334u64,
            ),
            (
                "_ZTSN2cl4sycl6xilinx20reqd_work_group_sizeILi4ELi2ELi1EZ4mainE6kernelEE",
                "8afff922-4741-5d0b-89ee-cda21d09a101",
                17741605614697334001,
            ),
            (
                "_ZTS6Kernel",
                "6b5cffc8-4161-5f70-a389-af9d2257681c",
                2847612115522792723,
            ),
            (
                "a",
                "4f3f2898-69e3-5a0d-820a-c4e87987dbce",
                14588375283720516167,
            ),
            (
                "",
                "4ebd0208-8328-5d69-8c44-ec50939c0967",
                10897873601168084180,
            ),
        ];

        for (name, uuid, hash) in vectors {
            let computed = kernel_uuid(name);
            assert_eq!(computed.to_string(), uuid, "uuid of {:?}", name);
            assert_eq!(uuid_hash(&computed), hash, "hash of {:?}", name);
            assert_eq!(synthesize_kernel_name(name), format!("xSYCL{}", hash));
        }
    }

    #[test]
    fn synthesis_is_deterministic_and_recognized() {
        let first = synthesize_kernel_name("_ZTS6Kernel");
        assert_eq!(first, synthesize_kernel_name("_ZTS6Kernel"));
        assert_ne!(first, synthesize_kernel_name("_ZTS7Kernel2"));
        assert!(is_synthesized_kernel_name(&first));
        assert!(!is_synthesized_kernel_name("xSYCL"));
        assert!(!is_synthesized_kernel_name("xSYCL12a"));
        assert!(!is_synthesized_kernel_name("_ZTS6Kernel"));
        check_backend_length(&first).unwrap();
    }

    #[test]
    fn long_names_are_rejected() {
        let name = "k".repeat(63);
        let err = check_backend_length(&name).unwrap_err();
        assert!(matches!(err, PassError::KernelNameTooLong { len: 65, max: 64, .. }));
        check_backend_length(&"k".repeat(62)).unwrap();
    }
}
