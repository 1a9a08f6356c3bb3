//! # Identity Newtypes
//!
//! Newtype wrappers for the identifiers that flow through the vault.
//! You cannot pass a `HandleId` where an `Identity` is expected, and a
//! `FieldId` can only be built through its validating constructor.
//!
//! ## Security Invariant
//!
//! The nil UUID is the *zero identity*. It is representable (so that
//! malformed input can be rejected with a precise error) but every layer
//! that records a capability or an owner rejects it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Maximum length of a field identifier, in bytes.
pub const MAX_FIELD_ID_LEN: usize = 64;

/// An actor in the system: a value owner, a grantee, the process authority,
/// or the managing system itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity(pub Uuid);

impl Identity {
    /// Generate a new random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The zero identity. Never a valid grantee, owner, or authority.
    pub fn zero() -> Self {
        Self(Uuid::nil())
    }

    /// Build an identity from raw bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Whether this is the zero identity.
    pub fn is_zero(&self) -> bool {
        self.0.is_nil()
    }

    /// Reject the zero identity for the given role.
    pub fn require_non_zero(self, role: &'static str) -> Result<Self, CoreError> {
        if self.is_zero() {
            Err(CoreError::ZeroIdentity { role })
        } else {
            Ok(self)
        }
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Raw bytes, used when binding proofs to identities.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "id:{}", self.0)
    }
}

/// Name of a confidential field owned by an identity (e.g. `"score"`, `"bid"`).
///
/// Non-empty, at most [`MAX_FIELD_ID_LEN`] bytes, and restricted to ASCII
/// alphanumerics plus `_`, `-` and `.`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldId(String);

impl FieldId {
    /// Validate and wrap a field name.
    pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::InvalidFieldId {
                value: name,
                reason: "must not be empty",
            });
        }
        if name.len() > MAX_FIELD_ID_LEN {
            return Err(CoreError::InvalidFieldId {
                value: name,
                reason: "exceeds 64 bytes",
            });
        }
        if !name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
        {
            return Err(CoreError::InvalidFieldId {
                value: name,
                reason: "allowed characters are [A-Za-z0-9_.-]",
            });
        }
        Ok(Self(name))
    }

    /// The field name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FieldId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FieldId> for String {
    fn from(field: FieldId) -> Self {
        field.0
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of a ciphertext held by the compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HandleId(pub Uuid);

impl HandleId {
    /// Generate a new random handle identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handle:{}", self.0)
    }
}
