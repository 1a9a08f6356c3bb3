//! # Error Types
//!
//! Validation failures for the foundational newtypes. Higher layers wrap
//! these into their own error enums.

use thiserror::Error;

/// Error raised when constructing a core primitive from untrusted input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The field identifier failed validation.
    #[error("invalid field id {value:?}: {reason}")]
    InvalidFieldId {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The nil identity was supplied where a real identity is required.
    #[error("the zero identity is not a valid {role}")]
    ZeroIdentity {
        /// The role the identity was meant to play (e.g. "authority").
        role: &'static str,
    },

    /// A timestamp could not be parsed or constructed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A plaintext does not fit the requested width.
    #[error("value {value} does not fit width {width}")]
    ValueOutOfRange {
        /// The rejected value.
        value: u64,
        /// The target width name.
        width: &'static str,
    },
}
