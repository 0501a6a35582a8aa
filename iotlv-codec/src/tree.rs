//! Owned-tree codec over the streaming reader and writer
//!
//! Bridges [`TlvValue`] and the wire: recursive encode through
//! [`TlvWriter`], recursive materialization through [`TlvReader`]. The
//! streaming API remains the primary interface; this layer is for callers
//! that want whole values in memory.

use crate::element::ElementType;
use crate::reader::TlvReader;
use crate::writer::TlvWriter;
use iotlv_core::{Tag, TlvContainerType, TlvError, TlvResult, TlvValue};

/// Encode `value` under `tag`.
///
/// With `preserve` set, numeric variants keep their declared width on the
/// wire; otherwise the smallest round-tripping width is chosen.
pub fn encode_value(
    writer: &mut TlvWriter<'_>,
    tag: Tag,
    value: &TlvValue,
    preserve: bool,
) -> TlvResult<()> {
    let width = |element_type| if preserve { Some(element_type) } else { None };
    match value {
        TlvValue::Null => writer.put_null(tag),
        TlvValue::Boolean(v) => writer.put_bool(tag, *v),
        TlvValue::Int8(v) => writer.put_signed(tag, *v as i64, width(ElementType::Int8)),
        TlvValue::Int16(v) => writer.put_signed(tag, *v as i64, width(ElementType::Int16)),
        TlvValue::Int32(v) => writer.put_signed(tag, *v as i64, width(ElementType::Int32)),
        TlvValue::Int64(v) => writer.put_signed(tag, *v, width(ElementType::Int64)),
        TlvValue::UInt8(v) => writer.put_unsigned(tag, *v as u64, width(ElementType::UInt8)),
        TlvValue::UInt16(v) => writer.put_unsigned(tag, *v as u64, width(ElementType::UInt16)),
        TlvValue::UInt32(v) => writer.put_unsigned(tag, *v as u64, width(ElementType::UInt32)),
        TlvValue::UInt64(v) => writer.put_unsigned(tag, *v, width(ElementType::UInt64)),
        TlvValue::Float32(v) => writer.put_f32(tag, *v),
        TlvValue::Float64(v) => writer.put_f64(tag, *v),
        TlvValue::Utf8(v) => writer.put_string(tag, v),
        TlvValue::Bytes(v) => writer.put_bytes(tag, v),
        TlvValue::Structure(members) => {
            writer.start_container(tag, TlvContainerType::Structure)?;
            for (member_tag, member) in members {
                encode_value(writer, *member_tag, member, preserve)?;
            }
            writer.end_container()
        }
        TlvValue::Array(members) => {
            writer.start_container(tag, TlvContainerType::Array)?;
            for member in members {
                encode_value(writer, Tag::Anonymous, member, preserve)?;
            }
            writer.end_container()
        }
        TlvValue::List(members) => {
            writer.start_container(tag, TlvContainerType::List)?;
            for (member_tag, member) in members {
                encode_value(writer, *member_tag, member, preserve)?;
            }
            writer.end_container()
        }
    }
}

/// Materialize the element under the reader's cursor, containers included.
/// Numeric variants reflect the exact wire width, so a `put_preserved`
/// round-trip reproduces the input.
pub fn decode_element(reader: &mut TlvReader<'_>) -> TlvResult<(Tag, TlvValue)> {
    let tag = reader.tag().ok_or_else(|| {
        TlvError::IncorrectState("reader is not positioned on an element".to_string())
    })?;
    let element_type = match reader.element_type() {
        Some(t) => t,
        None => {
            return Err(TlvError::IncorrectState(
                "reader is not positioned on an element".to_string(),
            ));
        }
    };
    let value = match element_type {
        ElementType::Null => TlvValue::Null,
        ElementType::BooleanFalse | ElementType::BooleanTrue => {
            TlvValue::Boolean(reader.get_bool()?)
        }
        ElementType::Int8 => TlvValue::Int8(reader.get_i8()?),
        ElementType::Int16 => TlvValue::Int16(reader.get_i16()?),
        ElementType::Int32 => TlvValue::Int32(reader.get_i32()?),
        ElementType::Int64 => TlvValue::Int64(reader.get_i64()?),
        ElementType::UInt8 => TlvValue::UInt8(reader.get_u8()?),
        ElementType::UInt16 => TlvValue::UInt16(reader.get_u16()?),
        ElementType::UInt32 => TlvValue::UInt32(reader.get_u32()?),
        ElementType::UInt64 => TlvValue::UInt64(reader.get_u64()?),
        ElementType::Float32 => TlvValue::Float32(reader.get_f32()?),
        ElementType::Float64 => TlvValue::Float64(reader.get_f64()?),
        _ if element_type.is_utf8_string() => TlvValue::Utf8(reader.get_string()?),
        _ if element_type.is_byte_string() => TlvValue::Bytes(reader.get_bytes()?),
        ElementType::Structure => {
            reader.enter_container()?;
            let mut members = Vec::new();
            while reader.next()? {
                let (member_tag, member) = decode_element(reader)?;
                members.push((member_tag, member));
            }
            reader.exit_container()?;
            TlvValue::Structure(members)
        }
        ElementType::Array => {
            reader.enter_container()?;
            let mut members = Vec::new();
            while reader.next()? {
                let (_, member) = decode_element(reader)?;
                members.push(member);
            }
            reader.exit_container()?;
            TlvValue::Array(members)
        }
        ElementType::List => {
            reader.enter_container()?;
            let mut members = Vec::new();
            while reader.next()? {
                let (member_tag, member) = decode_element(reader)?;
                members.push((member_tag, member));
            }
            reader.exit_container()?;
            TlvValue::List(members)
        }
        _ => {
            return Err(TlvError::InvalidElement(
                "unexpected element type under cursor".to_string(),
            ));
        }
    };
    Ok((tag, value))
}

/// Advance the reader and materialize the next element at the current
/// nesting level, `Ok(None)` at the end of the container or input.
pub fn decode_next(reader: &mut TlvReader<'_>) -> TlvResult<Option<(Tag, TlvValue)>> {
    if !reader.next()? {
        return Ok(None);
    }
    decode_element(reader).map(Some)
}
