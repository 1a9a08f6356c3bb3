//! # veil-core: Foundational Types for the Veil Stack
//!
//! Every other crate in the workspace depends on `veil-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `Identity`, `FieldId`,
//!    `HandleId` are distinct types. An owner cannot be passed where a field
//!    is expected.
//!
//! 2. **Handles never carry plaintext.** A [`Handle`] is an opaque reference
//!    plus a [`ValueWidth`] tag. The only type holding a cleartext number is
//!    [`PlaintextValue`], and only the compute backend produces one.
//!
//! 3. **UTC-only timestamps, monotonic clocks.** Phase deadlines compare
//!    [`Timestamp`] values read from a [`Clock`] that never goes backward.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `veil-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;
pub mod value;

pub use digest::{tagged_digest, ContentDigest};
pub use error::CoreError;
pub use identity::{FieldId, HandleId, Identity};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
pub use value::{Handle, PlaintextValue, ValueWidth};
