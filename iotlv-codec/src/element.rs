//! Element-head codec
//!
//! The element head is the control byte, the tag bytes selected by the
//! tag-control nibble, and (for primitive types) a variable-width
//! length-or-value field. All multi-byte fields are little-endian.

use iotlv_core::{Tag, TlvContainerType, TlvError, TlvResult, TlvType};

/// Number of bits the tag control occupies in the control byte.
pub const TAG_CONTROL_SHIFT: u8 = 5;
/// Mask selecting the tag-control bits of a control byte.
pub const TAG_CONTROL_MASK: u8 = 0xE0;
/// Mask selecting the element-type bits of a control byte.
pub const TYPE_MASK: u8 = 0x1F;
/// Largest possible element head: control byte, 8 tag bytes, 8
/// length-or-value bytes.
pub const MAX_HEAD_LEN: usize = 17;

/// Wire-level element type: the low 5 bits of the control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ElementType {
    Int8 = 0x00,
    Int16 = 0x01,
    Int32 = 0x02,
    Int64 = 0x03,
    UInt8 = 0x04,
    UInt16 = 0x05,
    UInt32 = 0x06,
    UInt64 = 0x07,
    BooleanFalse = 0x08,
    BooleanTrue = 0x09,
    Float32 = 0x0A,
    Float64 = 0x0B,
    Utf8Len1 = 0x0C,
    Utf8Len2 = 0x0D,
    Utf8Len4 = 0x0E,
    Utf8Len8 = 0x0F,
    BytesLen1 = 0x10,
    BytesLen2 = 0x11,
    BytesLen4 = 0x12,
    BytesLen8 = 0x13,
    Null = 0x14,
    Structure = 0x15,
    Array = 0x16,
    List = 0x17,
    EndOfContainer = 0x18,
}

impl ElementType {
    /// Element type from a control byte; rejects the reserved codes.
    pub fn from_control(control: u8) -> TlvResult<Self> {
        use ElementType::*;
        match control & TYPE_MASK {
            0x00 => Ok(Int8),
            0x01 => Ok(Int16),
            0x02 => Ok(Int32),
            0x03 => Ok(Int64),
            0x04 => Ok(UInt8),
            0x05 => Ok(UInt16),
            0x06 => Ok(UInt32),
            0x07 => Ok(UInt64),
            0x08 => Ok(BooleanFalse),
            0x09 => Ok(BooleanTrue),
            0x0A => Ok(Float32),
            0x0B => Ok(Float64),
            0x0C => Ok(Utf8Len1),
            0x0D => Ok(Utf8Len2),
            0x0E => Ok(Utf8Len4),
            0x0F => Ok(Utf8Len8),
            0x10 => Ok(BytesLen1),
            0x11 => Ok(BytesLen2),
            0x12 => Ok(BytesLen4),
            0x13 => Ok(BytesLen8),
            0x14 => Ok(Null),
            0x15 => Ok(Structure),
            0x16 => Ok(Array),
            0x17 => Ok(List),
            0x18 => Ok(EndOfContainer),
            code => Err(TlvError::InvalidElement(format!(
                "reserved element type 0x{:02X}",
                code
            ))),
        }
    }

    pub fn is_container(self) -> bool {
        matches!(
            self,
            ElementType::Structure | ElementType::Array | ElementType::List
        )
    }

    pub fn is_utf8_string(self) -> bool {
        matches!(
            self,
            ElementType::Utf8Len1
                | ElementType::Utf8Len2
                | ElementType::Utf8Len4
                | ElementType::Utf8Len8
        )
    }

    pub fn is_byte_string(self) -> bool {
        matches!(
            self,
            ElementType::BytesLen1
                | ElementType::BytesLen2
                | ElementType::BytesLen4
                | ElementType::BytesLen8
        )
    }

    /// Either kind of length-prefixed string.
    pub fn is_string(self) -> bool {
        self.is_utf8_string() || self.is_byte_string()
    }

    /// Width of the length-or-value field: the value width for integers and
    /// floats, the length-prefix width for strings, zero otherwise.
    pub fn value_field_size(self) -> usize {
        use ElementType::*;
        match self {
            Int8 | UInt8 | Utf8Len1 | BytesLen1 => 1,
            Int16 | UInt16 | Utf8Len2 | BytesLen2 => 2,
            Int32 | UInt32 | Float32 | Utf8Len4 | BytesLen4 => 4,
            Int64 | UInt64 | Float64 | Utf8Len8 | BytesLen8 => 8,
            BooleanFalse | BooleanTrue | Null | Structure | Array | List | EndOfContainer => 0,
        }
    }

    /// User-visible type this wire type decodes to.
    pub fn tlv_type(self) -> TlvType {
        use ElementType::*;
        match self {
            Int8 | Int16 | Int32 | Int64 => TlvType::SignedInteger,
            UInt8 | UInt16 | UInt32 | UInt64 => TlvType::UnsignedInteger,
            BooleanFalse | BooleanTrue => TlvType::Boolean,
            Float32 | Float64 => TlvType::FloatingPoint,
            Utf8Len1 | Utf8Len2 | Utf8Len4 | Utf8Len8 => TlvType::Utf8String,
            BytesLen1 | BytesLen2 | BytesLen4 | BytesLen8 => TlvType::ByteString,
            Null => TlvType::Null,
            Structure => TlvType::Structure,
            Array => TlvType::Array,
            List => TlvType::List,
            EndOfContainer => TlvType::NotSpecified,
        }
    }

    /// Containment context this type opens, if it is a container.
    pub fn container_type(self) -> Option<TlvContainerType> {
        match self {
            ElementType::Structure => Some(TlvContainerType::Structure),
            ElementType::Array => Some(TlvContainerType::Array),
            ElementType::List => Some(TlvContainerType::List),
            _ => None,
        }
    }
}

/// Tag control: the high 3 bits of the control byte, selecting the tag form
/// and its width on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TagControl {
    Anonymous = 0,
    Context = 1,
    CommonProfile16 = 2,
    CommonProfile32 = 3,
    ImplicitProfile16 = 4,
    ImplicitProfile32 = 5,
    FullyQualified48 = 6,
    FullyQualified64 = 7,
}

impl TagControl {
    /// Tag control from a control byte. All eight codes are assigned.
    pub fn from_control(control: u8) -> Self {
        use TagControl::*;
        match (control & TAG_CONTROL_MASK) >> TAG_CONTROL_SHIFT {
            0 => Anonymous,
            1 => Context,
            2 => CommonProfile16,
            3 => CommonProfile32,
            4 => ImplicitProfile16,
            5 => ImplicitProfile32,
            6 => FullyQualified48,
            _ => FullyQualified64,
        }
    }

    /// Number of tag bytes following the control byte.
    pub fn tag_size(self) -> usize {
        use TagControl::*;
        match self {
            Anonymous => 0,
            Context => 1,
            CommonProfile16 | ImplicitProfile16 => 2,
            CommonProfile32 | ImplicitProfile32 => 4,
            FullyQualified48 => 6,
            FullyQualified64 => 8,
        }
    }
}

/// Decoded element head: tag, wire type and the raw length-or-value field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementHead {
    pub tag: Tag,
    pub element_type: ElementType,
    /// Payload length for strings, raw value bits for primitives (signed
    /// values sign-extended to 64 bits), zero otherwise.
    pub len_or_val: u64,
}

/// Encode an element head into `out`, returning the encoded length.
///
/// The tag control is chosen canonically; a fully-qualified tag whose
/// profile id equals `implicit_profile_id` is written in the implicit form.
pub fn encode_head(
    tag: &Tag,
    element_type: ElementType,
    len_or_val: u64,
    implicit_profile_id: Option<u32>,
    out: &mut [u8; MAX_HEAD_LEN],
) -> usize {
    let control;
    let mut n = 1;
    match *tag {
        Tag::Anonymous => {
            control = TagControl::Anonymous;
        }
        Tag::Context(c) => {
            control = TagControl::Context;
            out[1] = c;
            n = 2;
        }
        Tag::CommonProfile(t) if t <= u16::MAX as u32 => {
            control = TagControl::CommonProfile16;
            out[1..3].copy_from_slice(&(t as u16).to_le_bytes());
            n = 3;
        }
        Tag::CommonProfile(t) => {
            control = TagControl::CommonProfile32;
            out[1..5].copy_from_slice(&t.to_le_bytes());
            n = 5;
        }
        Tag::FullyQualified {
            vendor_id,
            profile_num,
            tag_num,
        } => {
            if implicit_profile_id.is_some() && tag.profile_id() == implicit_profile_id {
                if tag_num <= u16::MAX as u32 {
                    control = TagControl::ImplicitProfile16;
                    out[1..3].copy_from_slice(&(tag_num as u16).to_le_bytes());
                    n = 3;
                } else {
                    control = TagControl::ImplicitProfile32;
                    out[1..5].copy_from_slice(&tag_num.to_le_bytes());
                    n = 5;
                }
            } else {
                out[1..3].copy_from_slice(&vendor_id.to_le_bytes());
                out[3..5].copy_from_slice(&profile_num.to_le_bytes());
                if tag_num <= u16::MAX as u32 {
                    control = TagControl::FullyQualified48;
                    out[5..7].copy_from_slice(&(tag_num as u16).to_le_bytes());
                    n = 7;
                } else {
                    control = TagControl::FullyQualified64;
                    out[5..9].copy_from_slice(&tag_num.to_le_bytes());
                    n = 9;
                }
            }
        }
    }
    out[0] = ((control as u8) << TAG_CONTROL_SHIFT) | element_type as u8;
    let w = element_type.value_field_size();
    if w > 0 {
        out[n..n + w].copy_from_slice(&len_or_val.to_le_bytes()[..w]);
        n += w;
    }
    n
}

/// Decode tag bytes for the given tag control.
///
/// `bytes` must hold exactly `control.tag_size()` bytes. Implicit forms
/// require the reader's implicit profile id; without one the tag cannot be
/// resolved and decoding fails with `UnknownImplicitTag`.
pub fn decode_tag(
    control: TagControl,
    bytes: &[u8],
    implicit_profile_id: Option<u32>,
) -> TlvResult<Tag> {
    use TagControl::*;
    match control {
        Anonymous => Ok(Tag::Anonymous),
        Context => Ok(Tag::Context(bytes[0])),
        CommonProfile16 => Ok(Tag::CommonProfile(
            u16::from_le_bytes([bytes[0], bytes[1]]) as u32,
        )),
        CommonProfile32 => Ok(Tag::CommonProfile(u32::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ]))),
        ImplicitProfile16 | ImplicitProfile32 => {
            let profile_id = implicit_profile_id.ok_or(TlvError::UnknownImplicitTag)?;
            let tag_num = if control == ImplicitProfile16 {
                u16::from_le_bytes([bytes[0], bytes[1]]) as u32
            } else {
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
            };
            Ok(Tag::FullyQualified {
                vendor_id: (profile_id >> 16) as u16,
                profile_num: profile_id as u16,
                tag_num,
            })
        }
        FullyQualified48 => Ok(Tag::FullyQualified {
            vendor_id: u16::from_le_bytes([bytes[0], bytes[1]]),
            profile_num: u16::from_le_bytes([bytes[2], bytes[3]]),
            tag_num: u16::from_le_bytes([bytes[4], bytes[5]]) as u32,
        }),
        FullyQualified64 => Ok(Tag::FullyQualified {
            vendor_id: u16::from_le_bytes([bytes[0], bytes[1]]),
            profile_num: u16::from_le_bytes([bytes[2], bytes[3]]),
            tag_num: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }),
    }
}

/// Decode the length-or-value field. Narrow signed integers are
/// sign-extended to 64 bits so getters can truncate uniformly.
pub fn decode_value_field(element_type: ElementType, bytes: &[u8]) -> u64 {
    use ElementType::*;
    match element_type {
        Int8 => bytes[0] as i8 as i64 as u64,
        Int16 => i16::from_le_bytes([bytes[0], bytes[1]]) as i64 as u64,
        Int32 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as i64 as u64,
        _ => {
            let mut raw = [0u8; 8];
            raw[..bytes.len()].copy_from_slice(bytes);
            u64::from_le_bytes(raw)
        }
    }
}

/// Decode a full element head from the start of `buf`, returning the head
/// and the number of bytes consumed.
pub fn decode_head(buf: &[u8], implicit_profile_id: Option<u32>) -> TlvResult<(ElementHead, usize)> {
    if buf.is_empty() {
        return Err(TlvError::Underrun);
    }
    let control = buf[0];
    let element_type = ElementType::from_control(control)?;
    let tag_control = TagControl::from_control(control);
    if element_type == ElementType::EndOfContainer && tag_control != TagControl::Anonymous {
        return Err(TlvError::InvalidElement(format!(
            "end-of-container with tag control 0x{:02X}",
            control & TAG_CONTROL_MASK
        )));
    }
    let ts = tag_control.tag_size();
    if buf.len() < 1 + ts {
        return Err(TlvError::Underrun);
    }
    let tag = decode_tag(tag_control, &buf[1..1 + ts], implicit_profile_id)?;
    let w = element_type.value_field_size();
    if buf.len() < 1 + ts + w {
        return Err(TlvError::Underrun);
    }
    let len_or_val = decode_value_field(element_type, &buf[1 + ts..1 + ts + w]);
    Ok((
        ElementHead {
            tag,
            element_type,
            len_or_val,
        },
        1 + ts + w,
    ))
}

/// Total encoded size of the element starting at `buf[0]`, including, for
/// containers, every nested element and the matching end-of-container
/// marker.
pub fn element_span(buf: &[u8], implicit_profile_id: Option<u32>) -> TlvResult<usize> {
    let (head, mut n) = decode_head(buf, implicit_profile_id)?;
    if head.element_type.is_string() {
        let len = head.len_or_val as usize;
        if buf.len() < n + len {
            return Err(TlvError::Underrun);
        }
        return Ok(n + len);
    }
    if !head.element_type.is_container() {
        return Ok(n);
    }
    let mut depth = 1usize;
    while depth > 0 {
        let (h, hn) = decode_head(&buf[n..], implicit_profile_id)?;
        n += hn;
        if h.element_type.is_string() {
            let len = h.len_or_val as usize;
            if buf.len() < n + len {
                return Err(TlvError::Underrun);
            }
            n += len;
        } else if h.element_type.is_container() {
            depth += 1;
        } else if h.element_type == ElementType::EndOfContainer {
            depth -= 1;
        }
    }
    Ok(n)
}

/// Smallest unsigned element type that round-trips `value`.
pub fn unsigned_element_type(value: u64) -> ElementType {
    if value <= u8::MAX as u64 {
        ElementType::UInt8
    } else if value <= u16::MAX as u64 {
        ElementType::UInt16
    } else if value <= u32::MAX as u64 {
        ElementType::UInt32
    } else {
        ElementType::UInt64
    }
}

/// Smallest signed element type that round-trips `value`.
pub fn signed_element_type(value: i64) -> ElementType {
    if value >= i8::MIN as i64 && value <= i8::MAX as i64 {
        ElementType::Int8
    } else if value >= i16::MIN as i64 && value <= i16::MAX as i64 {
        ElementType::Int16
    } else if value >= i32::MIN as i64 && value <= i32::MAX as i64 {
        ElementType::Int32
    } else {
        ElementType::Int64
    }
}

/// Smallest UTF-8 string type whose length prefix holds `len`.
pub fn utf8_length_type(len: usize) -> ElementType {
    if len <= u8::MAX as usize {
        ElementType::Utf8Len1
    } else if len <= u16::MAX as usize {
        ElementType::Utf8Len2
    } else if len <= u32::MAX as usize {
        ElementType::Utf8Len4
    } else {
        ElementType::Utf8Len8
    }
}

/// Smallest byte string type whose length prefix holds `len`.
pub fn bytes_length_type(len: usize) -> ElementType {
    if len <= u8::MAX as usize {
        ElementType::BytesLen1
    } else if len <= u16::MAX as usize {
        ElementType::BytesLen2
    } else if len <= u32::MAX as usize {
        ElementType::BytesLen4
    } else {
        ElementType::BytesLen8
    }
}

/// Containment rules shared by the reader, writer and updater: arrays hold
/// only anonymous members, structure members must be tagged, context tags
/// are meaningless outside a structure or list.
pub fn check_tag_allowed(tag: &Tag, container: TlvContainerType) -> TlvResult<()> {
    match container {
        TlvContainerType::Array => {
            if !tag.is_anonymous() {
                return Err(TlvError::InvalidTag);
            }
        }
        TlvContainerType::Structure => {
            if tag.is_anonymous() {
                return Err(TlvError::InvalidTag);
            }
        }
        TlvContainerType::TopLevel => {
            if tag.is_context() {
                return Err(TlvError::InvalidTag);
            }
        }
        TlvContainerType::List => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_byte_composition() {
        let mut out = [0u8; MAX_HEAD_LEN];
        let n = encode_head(&Tag::Context(1), ElementType::UInt8, 7, None, &mut out);
        assert_eq!(&out[..n], &[0x24, 0x01, 0x07]);
    }

    #[test]
    fn test_anonymous_container_head() {
        let mut out = [0u8; MAX_HEAD_LEN];
        let n = encode_head(&Tag::Anonymous, ElementType::Structure, 0, None, &mut out);
        assert_eq!(&out[..n], &[0x15]);
    }

    #[test]
    fn test_fully_qualified_tag_round_trip() {
        let tag = Tag::fully_qualified(0xFFF1, 0xDEED, 0x10000);
        let mut out = [0u8; MAX_HEAD_LEN];
        let n = encode_head(&tag, ElementType::Null, 0, None, &mut out);
        // 64-bit fully-qualified form: control + 8 tag bytes
        assert_eq!(n, 9);
        assert_eq!(out[0], (7 << TAG_CONTROL_SHIFT) | 0x14);
        let (head, consumed) = decode_head(&out[..n], None).unwrap();
        assert_eq!(consumed, n);
        assert_eq!(head.tag, tag);
    }

    #[test]
    fn test_implicit_profile_compression() {
        let tag = Tag::fully_qualified(0xFFF1, 0xDEED, 5);
        let implicit = Some(0xFFF1_DEED);
        let mut out = [0u8; MAX_HEAD_LEN];
        let n = encode_head(&tag, ElementType::Null, 0, implicit, &mut out);
        assert_eq!(&out[..n], &[(4 << TAG_CONTROL_SHIFT) | 0x14, 0x05, 0x00]);

        // Same bytes decode back to the fully-qualified tag with the id set,
        // and fail without it.
        let (head, _) = decode_head(&out[..n], implicit).unwrap();
        assert_eq!(head.tag, tag);
        assert!(matches!(
            decode_head(&out[..n], None),
            Err(TlvError::UnknownImplicitTag)
        ));
    }

    #[test]
    fn test_sign_extension() {
        assert_eq!(decode_value_field(ElementType::Int8, &[0xFE]) as i64, -2);
        assert_eq!(
            decode_value_field(ElementType::Int16, &[0x00, 0x80]) as i64,
            i16::MIN as i64
        );
        assert_eq!(decode_value_field(ElementType::UInt8, &[0xFE]), 0xFE);
    }

    #[test]
    fn test_minimal_width_selection() {
        assert_eq!(unsigned_element_type(200), ElementType::UInt8);
        assert_eq!(unsigned_element_type(0x10000), ElementType::UInt32);
        assert_eq!(signed_element_type(-2), ElementType::Int8);
        assert_eq!(signed_element_type(-40000), ElementType::Int32);
        assert_eq!(utf8_length_type(300), ElementType::Utf8Len2);
    }

    #[test]
    fn test_reserved_element_type_rejected() {
        assert!(matches!(
            ElementType::from_control(0x1F),
            Err(TlvError::InvalidElement(_))
        ));
    }

    #[test]
    fn test_element_span_skips_nested_containers() {
        // struct { ctx1: u8 7, ctx2: array [ u8 1 ] } followed by a trailing byte
        let buf = [
            0x15, 0x24, 0x01, 0x07, 0x36, 0x02, 0x04, 0x01, 0x18, 0x18, 0xAA,
        ];
        assert_eq!(element_span(&buf, None).unwrap(), 10);
    }

    #[test]
    fn test_element_span_underrun() {
        let buf = [0x15, 0x24, 0x01];
        assert!(matches!(element_span(&buf, None), Err(TlvError::Underrun)));
    }
}
