//! Search, counting and diagnostic helpers
//!
//! All helpers operate on an independent clone of the given reader, so the
//! caller's cursor never moves. They require a contiguous (slice-backed)
//! source; store-backed readers cannot be rescanned.

use crate::reader::TlvReader;
use iotlv_core::{Tag, TlvResult, TlvType};

/// Locate the first element bearing `tag` in the current container.
///
/// The scan starts at the container's first member regardless of where the
/// source reader currently sits inside it; when the reader is positioned
/// *on* a container element, its members are searched. Returns an
/// independent reader positioned on the match, `None` if the tag does not
/// occur.
pub fn find_element<'a>(reader: &TlvReader<'a>, tag: Tag) -> TlvResult<Option<TlvReader<'a>>> {
    let mut scan = reader.rescan_container()?;
    while scan.next()? {
        if scan.tag() == Some(tag) {
            return Ok(Some(scan));
        }
    }
    Ok(None)
}

/// Number of elements remaining at the reader's current nesting level,
/// or, when positioned on a container element, the member count of that
/// container. Nested containers count as one element each.
pub fn count_elements(reader: &TlvReader<'_>) -> TlvResult<usize> {
    let mut scan = if reader.tlv_type().is_container() {
        reader.container_reader()?
    } else {
        reader.duplicate()?
    };
    let mut count = 0;
    while scan.next()? {
        count += 1;
    }
    Ok(count)
}

/// Render the remaining encoding as an indented listing, one element per
/// line, for diagnostics and logs.
pub fn dump(reader: &TlvReader<'_>) -> TlvResult<String> {
    let mut scan = reader.duplicate()?;
    let mut out = String::new();
    dump_level(&mut scan, 0, &mut out)?;
    Ok(out)
}

/// Render the element under the cursor (if any) and every following
/// sibling at this nesting level.
fn dump_level(reader: &mut TlvReader<'_>, indent: usize, out: &mut String) -> TlvResult<()> {
    let mut have = reader.tag().is_some();
    if !have {
        have = reader.next()?;
    }
    while have {
        dump_element(reader, indent, out)?;
        have = reader.next()?;
    }
    Ok(())
}

fn dump_element(reader: &mut TlvReader<'_>, indent: usize, out: &mut String) -> TlvResult<()> {
    let tag = reader.tag().unwrap_or(Tag::Anonymous);
    for _ in 0..indent {
        out.push_str("  ");
    }
    match reader.tlv_type() {
        TlvType::Structure => {
            out.push_str(&format!("{} = struct {{\n", tag));
            reader.enter_container()?;
            dump_level(reader, indent + 1, out)?;
            reader.exit_container()?;
            close_brace(indent, out, "}");
        }
        TlvType::Array => {
            out.push_str(&format!("{} = array [\n", tag));
            reader.enter_container()?;
            dump_level(reader, indent + 1, out)?;
            reader.exit_container()?;
            close_brace(indent, out, "]");
        }
        TlvType::List => {
            out.push_str(&format!("{} = list [\n", tag));
            reader.enter_container()?;
            dump_level(reader, indent + 1, out)?;
            reader.exit_container()?;
            close_brace(indent, out, "]");
        }
        TlvType::Null => out.push_str(&format!("{} = null\n", tag)),
        TlvType::Boolean => out.push_str(&format!("{} = {}\n", tag, reader.get_bool()?)),
        TlvType::SignedInteger => out.push_str(&format!("{} = {}\n", tag, reader.get_i64()?)),
        TlvType::UnsignedInteger => out.push_str(&format!("{} = {}\n", tag, reader.get_u64()?)),
        TlvType::FloatingPoint => out.push_str(&format!("{} = {}\n", tag, reader.get_f64()?)),
        TlvType::Utf8String => out.push_str(&format!("{} = {:?}\n", tag, reader.get_string()?)),
        TlvType::ByteString => {
            let bytes = reader.get_bytes()?;
            out.push_str(&format!("{} = {} bytes <", tag, bytes.len()));
            for (i, b) in bytes.iter().take(8).enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(&format!("{:02X}", b));
            }
            if bytes.len() > 8 {
                out.push_str(" ..");
            }
            out.push_str(">\n");
        }
        TlvType::NotSpecified => {}
    }
    Ok(())
}

fn close_brace(indent: usize, out: &mut String, brace: &str) {
    for _ in 0..indent {
        out.push_str("  ");
    }
    out.push_str(brace);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::TlvWriter;
    use iotlv_core::TlvContainerType;

    fn members_123() -> Vec<u8> {
        let mut buf = vec![0u8; 64];
        let mut writer = TlvWriter::new(&mut buf);
        writer
            .put_container(Tag::Anonymous, TlvContainerType::Structure, |w| {
                w.put_u8(Tag::Context(1), 10)?;
                w.put_u8(Tag::Context(2), 20)?;
                w.put_u8(Tag::Context(3), 30)
            })
            .unwrap();
        let len = writer.finalize().unwrap();
        buf.truncate(len);
        buf
    }

    #[test]
    fn test_find_element() {
        let buf = members_123();
        let mut reader = TlvReader::new(&buf);
        assert!(reader.next().unwrap());

        let found = find_element(&reader, Tag::Context(2)).unwrap().unwrap();
        assert_eq!(found.get_u8().unwrap(), 20);
        // Source reader undisturbed.
        assert_eq!(reader.tlv_type(), TlvType::Structure);

        assert!(find_element(&reader, Tag::Context(9)).unwrap().is_none());
    }

    #[test]
    fn test_find_element_ignores_prior_position() {
        let buf = members_123();
        let mut reader = TlvReader::new(&buf);
        assert!(reader.next().unwrap());
        reader.enter_container().unwrap();
        // Walk past the element we will search for.
        assert!(reader.next().unwrap());
        assert!(reader.next().unwrap());
        assert!(reader.next().unwrap());
        assert_eq!(reader.tag(), Some(Tag::Context(3)));

        let found = find_element(&reader, Tag::Context(2)).unwrap().unwrap();
        assert_eq!(found.get_u8().unwrap(), 20);
    }

    #[test]
    fn test_count_elements() {
        let buf = members_123();
        let mut reader = TlvReader::new(&buf);
        assert!(reader.next().unwrap());
        assert_eq!(count_elements(&reader).unwrap(), 3);

        reader.enter_container().unwrap();
        assert!(reader.next().unwrap());
        // Two members remain after the first.
        assert_eq!(count_elements(&reader).unwrap(), 2);
    }

    #[test]
    fn test_dump_renders_nesting() {
        let buf = members_123();
        let reader = {
            let mut r = TlvReader::new(&buf);
            assert!(r.next().unwrap());
            r
        };
        let text = dump(&reader).unwrap();
        assert!(text.contains("struct {"));
        assert!(text.contains("ctx:2 = 20"));
    }
}
