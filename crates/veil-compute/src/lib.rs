//! # veil-compute: Confidential Compute Gateway
//!
//! Defines the narrow interface through which the vault reaches the
//! homomorphic backend, and a deterministic mock of that backend.
//!
//! ## Architecture
//!
//! - **Traits** (`traits.rs`): `ComputeGateway` is the contract every backend
//!   satisfies. The vault is generic over it and never sees ciphertext bytes.
//!
//! - **Mock** (`mock.rs`): `MockGateway` keeps plaintexts in a table keyed by
//!   handle. It gives no confidentiality at all; it exists so the protocol
//!   logic can be exercised deterministically.
//!
//! ## Crate Policy
//!
//! - Depends on `veil-core` only.
//! - The mock is behind the default `mock` feature.

#[cfg(feature = "mock")]
pub mod mock;
pub mod traits;

#[cfg(feature = "mock")]
pub use mock::MockGateway;
pub use traits::{
    Ciphertext, CombineOp, CompareOp, ComputeGateway, GatewayError, InputProof, ProofError,
};
