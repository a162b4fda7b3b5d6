//! Domain types shared by the portal client and session crates.
//!
//! This crate has no internal dependencies and no I/O: identities, roles,
//! clocks and input validation live here so both the HTTP layer and the
//! session manager agree on them.

pub mod clock;
pub mod error;
pub mod identity;
pub mod roles;
pub mod types;
pub mod validation;
