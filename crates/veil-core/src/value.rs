//! # Handles and Plaintext Values
//!
//! A [`Handle`] names a ciphertext held by the compute backend. It carries
//! the semantic width of the encrypted value and nothing else. A
//! [`PlaintextValue`] is what materialization returns.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::identity::HandleId;

/// Semantic width of an encrypted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueWidth {
    /// Encrypted boolean (result of a comparison).
    Bool,
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 64-bit unsigned integer.
    U64,
}

impl ValueWidth {
    /// Number of plaintext bits.
    pub fn bits(&self) -> u32 {
        match self {
            Self::Bool => 1,
            Self::U8 => 8,
            Self::U16 => 16,
            Self::U32 => 32,
            Self::U64 => 64,
        }
    }

    /// Largest representable plaintext at this width.
    pub fn max_value(&self) -> u64 {
        match self {
            Self::U64 => u64::MAX,
            other => (1u64 << other.bits()) - 1,
        }
    }

    /// Single-byte tag used by backends that embed the width in ciphertexts.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Bool => 0,
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 3,
            Self::U64 => 4,
        }
    }

    /// Inverse of [`ValueWidth::tag`].
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Bool),
            1 => Some(Self::U8),
            2 => Some(Self::U16),
            3 => Some(Self::U32),
            4 => Some(Self::U64),
            _ => None,
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
        }
    }
}

impl std::fmt::Display for ValueWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque reference to a ciphertext. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    /// Backend-assigned identifier.
    pub id: HandleId,
    /// Semantic width of the encrypted value.
    pub width: ValueWidth,
}

impl Handle {
    /// Wrap a backend identifier with its width tag.
    pub fn new(id: HandleId, width: ValueWidth) -> Self {
        Self { id, width }
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}<{}>", self.id, self.width)
    }
}

/// A materialized, width-tagged plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "width", content = "value", rename_all = "snake_case")]
pub enum PlaintextValue {
    /// Boolean plaintext.
    Bool(bool),
    /// 8-bit plaintext.
    U8(u8),
    /// 16-bit plaintext.
    U16(u16),
    /// 32-bit plaintext.
    U32(u32),
    /// 64-bit plaintext.
    U64(u64),
}

impl PlaintextValue {
    /// Build a plaintext of the given width, rejecting out-of-range values.
    pub fn from_u64(width: ValueWidth, value: u64) -> Result<Self, CoreError> {
        if value > width.max_value() {
            return Err(CoreError::ValueOutOfRange {
                value,
                width: width.as_str(),
            });
        }
        // Range checked above; the narrowing casts are lossless.
        Ok(match width {
            ValueWidth::Bool => Self::Bool(value == 1),
            ValueWidth::U8 => Self::U8(value as u8),
            ValueWidth::U16 => Self::U16(value as u16),
            ValueWidth::U32 => Self::U32(value as u32),
            ValueWidth::U64 => Self::U64(value),
        })
    }

    /// Build a plaintext of the given width, keeping only the low bits.
    pub fn wrapping_from_u64(width: ValueWidth, value: u64) -> Self {
        match width {
            ValueWidth::Bool => Self::Bool(value & 1 == 1),
            ValueWidth::U8 => Self::U8(value as u8),
            ValueWidth::U16 => Self::U16(value as u16),
            ValueWidth::U32 => Self::U32(value as u32),
            ValueWidth::U64 => Self::U64(value),
        }
    }

    /// The width of this plaintext.
    pub fn width(&self) -> ValueWidth {
        match self {
            Self::Bool(_) => ValueWidth::Bool,
            Self::U8(_) => ValueWidth::U8,
            Self::U16(_) => ValueWidth::U16,
            Self::U32(_) => ValueWidth::U32,
            Self::U64(_) => ValueWidth::U64,
        }
    }

    /// Widen to `u64` (`true` is 1).
    pub fn as_u64(&self) -> u64 {
        match *self {
            Self::Bool(b) => u64::from(b),
            Self::U8(v) => u64::from(v),
            Self::U16(v) => u64::from(v),
            Self::U32(v) => u64::from(v),
            Self::U64(v) => v,
        }
    }

    /// The boolean value, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlaintextValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            other => write!(f, "{}{}", other.as_u64(), other.width()),
        }
    }
}
