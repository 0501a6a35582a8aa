//! User-visible TLV type enumerations

/// Data type of a TLV element as seen by callers.
///
/// Wire-level width distinctions (one- vs eight-byte integers, the two
/// boolean codes, the per-width string length prefixes) collapse into one
/// variant each; the codec layer keeps the exact wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TlvType {
    /// No element under the cursor.
    NotSpecified,
    SignedInteger,
    UnsignedInteger,
    Boolean,
    FloatingPoint,
    Utf8String,
    ByteString,
    Null,
    Structure,
    Array,
    List,
}

impl TlvType {
    pub fn is_container(&self) -> bool {
        matches!(self, TlvType::Structure | TlvType::Array | TlvType::List)
    }

    /// Containment context this type opens, if it is a container.
    pub fn container_type(&self) -> Option<TlvContainerType> {
        match self {
            TlvType::Structure => Some(TlvContainerType::Structure),
            TlvType::Array => Some(TlvContainerType::Array),
            TlvType::List => Some(TlvContainerType::List),
            _ => None,
        }
    }
}

/// Containment context of a reader/writer cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TlvContainerType {
    /// Outside any container.
    TopLevel,
    Structure,
    Array,
    List,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_mapping() {
        assert!(TlvType::Array.is_container());
        assert!(!TlvType::Null.is_container());
        assert_eq!(
            TlvType::Structure.container_type(),
            Some(TlvContainerType::Structure)
        );
        assert_eq!(TlvType::Boolean.container_type(), None);
    }
}
