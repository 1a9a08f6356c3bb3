//! # Vault Errors
//!
//! One error enum for every public vault operation. No error leaves the
//! vault in a partially updated state; batch disclosure reports per-item
//! failures inside its result instead of through this type.

use thiserror::Error;

use veil_compute::{GatewayError, ProofError};
use veil_core::{CoreError, FieldId, Identity};
use veil_state::PhaseError;

/// Errors returned by [`crate::ConfidentialVault`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// The input proof was empty, malformed, or bound to someone else.
    /// Not retryable without a fresh proof.
    #[error("input rejected: {0}")]
    Proof(#[from] ProofError),

    /// No value is stored (or disclosed) for the given owner and field.
    #[error("no value for {owner}/{field}")]
    NotFound {
        /// The owner that was looked up.
        owner: Identity,
        /// The field that was looked up.
        field: FieldId,
    },

    /// The operation is illegal in the current phase.
    #[error("phase violation: {0}")]
    PhaseViolation(PhaseError),

    /// The value was already revealed. Signals a no-op, not a fault.
    #[error("{owner}/{field} has already been revealed")]
    AlreadyRevealed {
        /// The owner of the revealed value.
        owner: Identity,
        /// The revealed field.
        field: FieldId,
    },

    /// The caller lacks the capability the operation requires.
    #[error("{caller} is not authorized to {action}")]
    Unauthorized {
        /// The rejected caller.
        caller: Identity,
        /// What the caller tried to do.
        action: &'static str,
    },

    /// The grantee (or acting identity) is the zero identity.
    #[error("invalid grantee {0}")]
    InvalidGrantee(Identity),

    /// A batch exceeded the per-call ceiling. Nothing was processed.
    #[error("batch of {len} entries exceeds the ceiling of {ceiling}")]
    BatchTooLarge {
        /// Number of entries submitted.
        len: usize,
        /// Configured ceiling.
        ceiling: usize,
    },

    /// The compute backend rejected an operation.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Invalid vault configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A core primitive failed validation.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<PhaseError> for VaultError {
    fn from(err: PhaseError) -> Self {
        match err {
            PhaseError::Unauthorized { caller } => Self::Unauthorized {
                caller,
                action: "trigger a phase transition",
            },
            PhaseError::ZeroAuthority => {
                Self::Config("phase authority must not be the zero identity".to_string())
            }
            other => Self::PhaseViolation(other),
        }
    }
}
