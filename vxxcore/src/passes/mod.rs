//! The rewriting passes, in the order the pipeline runs them:
//! [`prepare`] (which drives [`unwrap`]), then [`decorate`], [`rename`] and
//! [`addrspace`] per function role from [`classify`], and [`finalize`].
pub mod addrspace;
pub mod classify;
pub mod decorate;
pub mod finalize;
pub mod prepare;
pub mod rename;
pub mod unwrap;
