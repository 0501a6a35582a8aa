//! Element tags for the TLV encoding

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a TLV element within its enclosing container.
///
/// The wire form is chosen canonically on encode: the smallest tag control
/// that represents the value. A fully-qualified tag whose profile id equals
/// the reader/writer-configured implicit profile id is compressed to the
/// short implicit form; the peer must be configured with the same implicit
/// profile id to decode it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tag {
    /// No tag. Legal for array members and anonymous top-level elements.
    Anonymous,
    /// Small-integer tag scoped to the enclosing structure or list.
    Context(u8),
    /// Numeric tag in the implicitly shared common profile.
    CommonProfile(u32),
    /// Vendor-scoped tag: vendor id, profile number and tag number.
    FullyQualified {
        vendor_id: u16,
        profile_num: u16,
        tag_num: u32,
    },
}

impl Tag {
    /// Build a fully-qualified tag.
    pub fn fully_qualified(vendor_id: u16, profile_num: u16, tag_num: u32) -> Self {
        Tag::FullyQualified {
            vendor_id,
            profile_num,
            tag_num,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Tag::Anonymous)
    }

    pub fn is_context(&self) -> bool {
        matches!(self, Tag::Context(_))
    }

    /// Profile id of a fully-qualified tag: the vendor id in the upper
    /// 16 bits, the profile number in the lower 16 bits.
    pub fn profile_id(&self) -> Option<u32> {
        match self {
            Tag::FullyQualified {
                vendor_id,
                profile_num,
                ..
            } => Some(((*vendor_id as u32) << 16) | *profile_num as u32),
            _ => None,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tag::Anonymous => write!(f, "anonymous"),
            Tag::Context(n) => write!(f, "ctx:{}", n),
            Tag::CommonProfile(n) => write!(f, "common:{}", n),
            Tag::FullyQualified {
                vendor_id,
                profile_num,
                tag_num,
            } => write!(f, "{:#06X}:{:#06X}:{}", vendor_id, profile_num, tag_num),
        }
    }
}
