//! # Compute Gateway Trait
//!
//! The abstract interface to the confidential compute backend. All
//! implementations (mock, real FHE coprocessor) satisfy this trait.
//!
//! ## Security Invariant
//!
//! Every operation returns a *new* handle. The gateway has no notion of who
//! may read a handle; access control is the caller's job. Operations are
//! side-effect-free apart from resource consumption.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use veil_core::{CoreError, Handle, HandleId, Identity, PlaintextValue, ValueWidth};

/// Opaque client-produced ciphertext bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext(pub Vec<u8>);

/// Proof that a ciphertext was produced by a given caller for a given system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputProof(pub Vec<u8>);

impl InputProof {
    /// Whether the proof carries no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Comparison operators producing a `Bool` handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// `lhs == rhs`
    Eq,
    /// `lhs != rhs`
    Ne,
    /// `lhs < rhs`
    Lt,
    /// `lhs <= rhs`
    Le,
    /// `lhs > rhs`
    Gt,
    /// `lhs >= rhs`
    Ge,
}

impl CompareOp {
    /// Evaluate on widened plaintexts. Used by plaintext-backed backends.
    pub fn apply(&self, lhs: u64, rhs: u64) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

/// Arithmetic operators over same-width integer handles. Wrapping at the
/// operand width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineOp {
    /// Wrapping addition.
    Add,
    /// Wrapping subtraction.
    Sub,
    /// Wrapping multiplication.
    Mul,
    /// Minimum.
    Min,
    /// Maximum.
    Max,
}

impl CombineOp {
    /// Evaluate on widened plaintexts, wrapping to `width`.
    pub fn apply(&self, width: ValueWidth, lhs: u64, rhs: u64) -> PlaintextValue {
        let raw = match self {
            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
            Self::Mul => lhs.wrapping_mul(rhs),
            Self::Min => lhs.min(rhs),
            Self::Max => lhs.max(rhs),
        };
        PlaintextValue::wrapping_from_u64(width, raw)
    }
}

/// Rejection of an input proof. Raised before any state mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    /// No proof bytes were supplied.
    #[error("input proof is empty")]
    Empty,
    /// Proof or ciphertext bytes are structurally invalid.
    #[error("malformed input: {0}")]
    Malformed(String),
    /// Proof is well-formed but bound to a different caller or system.
    #[error("input proof is not bound to caller {caller} and this system")]
    ForeignBinding {
        /// The caller that submitted the input.
        caller: Identity,
    },
}

/// Failure of a homomorphic operation or materialization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The backend holds no ciphertext for this handle.
    #[error("unknown handle {0}")]
    UnknownHandle(HandleId),

    /// Operands have different widths.
    #[error("width mismatch: {lhs} vs {rhs}")]
    WidthMismatch {
        /// Left operand width.
        lhs: ValueWidth,
        /// Right operand width.
        rhs: ValueWidth,
    },

    /// A `Bool` handle was required.
    #[error("expected a bool handle, got {0}")]
    NotBoolean(ValueWidth),

    /// Arithmetic was requested on a `Bool` handle.
    #[error("arithmetic is not defined on {0} handles")]
    NotArithmetic(ValueWidth),

    /// A plaintext constant could not be represented.
    #[error(transparent)]
    Value(#[from] CoreError),

    /// Backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Abstract interface to a confidential compute backend.
pub trait ComputeGateway: Send + Sync {
    /// The identity inputs must be bound to (the managing system).
    fn system_identity(&self) -> Identity;

    /// Validate `proof` against (`owner`, system) and ingest the ciphertext.
    fn validate_and_ingest(
        &self,
        input: &Ciphertext,
        proof: &InputProof,
        owner: &Identity,
    ) -> Result<Handle, ProofError>;

    /// Encrypt a public constant so it can be used as an operand.
    fn trivial_encrypt(&self, value: PlaintextValue) -> Result<Handle, GatewayError>;

    /// Compare two same-width handles, producing a `Bool` handle.
    fn compare(&self, lhs: &Handle, rhs: &Handle, op: CompareOp) -> Result<Handle, GatewayError>;

    /// `cond ? if_true : if_false` over handles.
    fn select(
        &self,
        cond: &Handle,
        if_true: &Handle,
        if_false: &Handle,
    ) -> Result<Handle, GatewayError>;

    /// Arithmetic over two same-width integer handles.
    fn combine(&self, lhs: &Handle, rhs: &Handle, op: CombineOp) -> Result<Handle, GatewayError>;

    /// Decrypt a handle. The most expensive primitive.
    fn materialize(&self, handle: &Handle) -> Result<PlaintextValue, GatewayError>;
}
