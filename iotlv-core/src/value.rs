//! Owned TLV data tree

use crate::tag::Tag;
use crate::types::TlvType;
use serde::{Deserialize, Serialize};

/// Container class holding a fully materialized TLV element tree.
///
/// Numeric variants carry their source width so that callers who need the
/// wire form preserved (back-patching by the same tag and width later) can
/// encode with `put_preserved`; the default encode path picks the smallest
/// width that round-trips the value regardless of the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TlvValue {
    /// Null data
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer 8-bit
    Int8(i8),
    /// Integer 16-bit
    Int16(i16),
    /// Integer 32-bit
    Int32(i32),
    /// Integer 64-bit
    Int64(i64),
    /// Unsigned integer 8-bit
    UInt8(u8),
    /// Unsigned integer 16-bit
    UInt16(u16),
    /// Unsigned integer 32-bit
    UInt32(u32),
    /// Unsigned integer 64-bit
    UInt64(u64),
    /// Float 32-bit
    Float32(f32),
    /// Float 64-bit
    Float64(f64),
    /// UTF-8 string
    Utf8(String),
    /// Byte string
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
    /// Structure: ordered, tagged members
    Structure(Vec<(Tag, TlvValue)>),
    /// Array: ordered, anonymous members
    Array(Vec<TlvValue>),
    /// List: ordered members, tagged or anonymous
    List(Vec<(Tag, TlvValue)>),
}

impl TlvValue {
    /// User-visible type of this value.
    pub fn tlv_type(&self) -> TlvType {
        match self {
            TlvValue::Null => TlvType::Null,
            TlvValue::Boolean(_) => TlvType::Boolean,
            TlvValue::Int8(_) | TlvValue::Int16(_) | TlvValue::Int32(_) | TlvValue::Int64(_) => {
                TlvType::SignedInteger
            }
            TlvValue::UInt8(_)
            | TlvValue::UInt16(_)
            | TlvValue::UInt32(_)
            | TlvValue::UInt64(_) => TlvType::UnsignedInteger,
            TlvValue::Float32(_) | TlvValue::Float64(_) => TlvType::FloatingPoint,
            TlvValue::Utf8(_) => TlvType::Utf8String,
            TlvValue::Bytes(_) => TlvType::ByteString,
            TlvValue::Structure(_) => TlvType::Structure,
            TlvValue::Array(_) => TlvType::Array,
            TlvValue::List(_) => TlvType::List,
        }
    }

    pub fn is_container(&self) -> bool {
        self.tlv_type().is_container()
    }

    /// Get boolean value if this is a Boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TlvValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value widened to i64 if this is any signed integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TlvValue::Int8(v) => Some(*v as i64),
            TlvValue::Int16(v) => Some(*v as i64),
            TlvValue::Int32(v) => Some(*v as i64),
            TlvValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value widened to u64 if this is any unsigned integer
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            TlvValue::UInt8(v) => Some(*v as u64),
            TlvValue::UInt16(v) => Some(*v as u64),
            TlvValue::UInt32(v) => Some(*v as u64),
            TlvValue::UInt64(v) => Some(*v),
            _ => None,
        }
    }

    /// Get string slice if this is a UTF-8 string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TlvValue::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// Get byte slice if this is a byte string
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TlvValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl From<bool> for TlvValue {
    fn from(v: bool) -> Self {
        TlvValue::Boolean(v)
    }
}

impl From<u8> for TlvValue {
    fn from(v: u8) -> Self {
        TlvValue::UInt8(v)
    }
}

impl From<u16> for TlvValue {
    fn from(v: u16) -> Self {
        TlvValue::UInt16(v)
    }
}

impl From<u32> for TlvValue {
    fn from(v: u32) -> Self {
        TlvValue::UInt32(v)
    }
}

impl From<u64> for TlvValue {
    fn from(v: u64) -> Self {
        TlvValue::UInt64(v)
    }
}

impl From<i8> for TlvValue {
    fn from(v: i8) -> Self {
        TlvValue::Int8(v)
    }
}

impl From<i16> for TlvValue {
    fn from(v: i16) -> Self {
        TlvValue::Int16(v)
    }
}

impl From<i32> for TlvValue {
    fn from(v: i32) -> Self {
        TlvValue::Int32(v)
    }
}

impl From<i64> for TlvValue {
    fn from(v: i64) -> Self {
        TlvValue::Int64(v)
    }
}

impl From<f32> for TlvValue {
    fn from(v: f32) -> Self {
        TlvValue::Float32(v)
    }
}

impl From<f64> for TlvValue {
    fn from(v: f64) -> Self {
        TlvValue::Float64(v)
    }
}

impl From<&str> for TlvValue {
    fn from(v: &str) -> Self {
        TlvValue::Utf8(v.to_string())
    }
}

impl From<String> for TlvValue {
    fn from(v: String) -> Self {
        TlvValue::Utf8(v)
    }
}

impl From<Vec<u8>> for TlvValue {
    fn from(v: Vec<u8>) -> Self {
        TlvValue::Bytes(v)
    }
}
