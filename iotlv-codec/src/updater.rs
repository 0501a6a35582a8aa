//! In-place editing of an existing TLV encoding
//!
//! The updater pairs a read cursor and a write cursor over one
//! caller-owned buffer. `new()` relocates the existing encoding to the
//! buffer's tail, so free space opens at the head and grows with every
//! element the caller skips: output is constructed into that space while
//! the source is lazily copied (`move_element`) or dropped (`next`
//! without a move). The write cursor can never pass the read cursor,
//! since everything emitted is at most what was consumed plus the initial
//! free space, so the edit is safe in place with no scratch allocation.
//!
//! Single contiguous buffer only; there is no backing-store indirection
//! here.

use crate::element::{self, ElementHead, ElementType};
use crate::reader::TlvReader;
use crate::tree;
use crate::writer::TlvWriter;
use iotlv_core::{Tag, TlvContainerType, TlvError, TlvResult, TlvType, TlvValue};

/// Paired reader/writer over one buffer for selective keep/skip/replace
/// edits of a pre-encoded TLV blob.
///
/// Lifecycle: `new(buf, data_len)`, element visits, `finalize()`. After
/// `finalize` the output occupies the head of the buffer. `put` calls are
/// valid where the write cursor logically sits at the end of the
/// already-moved prefix, i.e. immediately after a `next()` (which returns
/// `Ok(false)` when appending at a container's end).
pub struct TlvUpdater<'a> {
    buf: &'a mut [u8],
    /// Read cursor: next unconsumed source byte in the tail region.
    rd: usize,
    /// Write cursor: end of the output at the buffer head.
    wr: usize,
    /// Start of the current element's head in the source.
    elem_start: usize,
    head_len: usize,
    head: Option<ElementHead>,
    at_end: bool,
    stack: Vec<TlvContainerType>,
    implicit_profile_id: Option<u32>,
}

impl<'a> TlvUpdater<'a> {
    /// Bind to `buf` whose first `data_len` bytes hold an existing
    /// encoding. The encoding is physically moved to the buffer tail; the
    /// difference between the buffer length and `data_len` becomes the
    /// initial free space for additions.
    pub fn new(buf: &'a mut [u8], data_len: usize) -> TlvResult<Self> {
        if data_len > buf.len() {
            return Err(TlvError::InvalidArgument(
                "data length exceeds the buffer".to_string(),
            ));
        }
        let tail = buf.len() - data_len;
        buf.copy_within(0..data_len, tail);
        Ok(Self {
            buf,
            rd: tail,
            wr: 0,
            elem_start: tail,
            head_len: 0,
            head: None,
            at_end: false,
            stack: Vec::new(),
            implicit_profile_id: None,
        })
    }

    pub fn implicit_profile_id(&self) -> Option<u32> {
        self.implicit_profile_id
    }

    /// Ambient profile id applied to both cursors. Moved elements are
    /// copied verbatim either way; this affects head decoding and newly
    /// put elements.
    pub fn set_implicit_profile_id(&mut self, profile_id: Option<u32>) {
        self.implicit_profile_id = profile_id;
    }

    /// Tag of the source element under the read cursor.
    pub fn tag(&self) -> Option<Tag> {
        self.head.as_ref().map(|h| h.tag)
    }

    /// Type of the source element under the read cursor.
    pub fn tlv_type(&self) -> TlvType {
        self.head
            .as_ref()
            .map(|h| h.element_type.tlv_type())
            .unwrap_or(TlvType::NotSpecified)
    }

    /// Payload length of the current string element, zero for other types.
    pub fn length(&self) -> usize {
        match &self.head {
            Some(h) if h.element_type.is_string() => h.len_or_val as usize,
            _ => 0,
        }
    }

    /// Containment context shared by both cursors.
    pub fn container_type(&self) -> TlvContainerType {
        self.stack.last().copied().unwrap_or(TlvContainerType::TopLevel)
    }

    /// Advance the read cursor to the next source element at the current
    /// nesting level.
    ///
    /// The element left behind, unless it was copied with `move_element`
    /// or entered, is skipped for good: its bytes never reach the output
    /// and its space becomes usable for `put`. Returns `Ok(false)` at the
    /// end of the current container or of the source.
    pub fn next(&mut self) -> TlvResult<bool> {
        if self.at_end {
            return Ok(false);
        }
        if self.head.is_some() {
            self.rd = self.current_element_end()?;
            self.head = None;
        }
        if self.rd == self.buf.len() {
            self.at_end = true;
            return Ok(false);
        }
        let (head, head_len) =
            element::decode_head(&self.buf[self.rd..], self.implicit_profile_id)?;
        if head.element_type == ElementType::EndOfContainer {
            if self.stack.is_empty() {
                return Err(TlvError::InvalidElement(
                    "end-of-container outside any container".to_string(),
                ));
            }
            self.rd += head_len;
            self.at_end = true;
            return Ok(false);
        }
        element::check_tag_allowed(&head.tag, self.container_type())?;
        self.elem_start = self.rd;
        self.head_len = head_len;
        self.rd += head_len;
        self.head = Some(head);
        Ok(true)
    }

    /// Materialize the source element under the read cursor, containers
    /// included. Inspection only; the cursors do not move.
    pub fn get_value(&self) -> TlvResult<TlvValue> {
        if self.head.is_none() {
            return Err(TlvError::IncorrectState(
                "updater is not positioned on an element".to_string(),
            ));
        }
        let end = self.current_element_end()?;
        let mut reader = TlvReader::new_in_container(
            &self.buf[self.elem_start..end],
            self.container_type(),
            self.implicit_profile_id,
        );
        if !reader.next()? {
            return Err(TlvError::Underrun);
        }
        let (_, value) = tree::decode_element(&mut reader)?;
        Ok(value)
    }

    /// Copy the current source element, subtree and all, verbatim to the
    /// output, then advance past it.
    pub fn move_element(&mut self) -> TlvResult<()> {
        if self.head.is_none() {
            return Err(TlvError::IncorrectState(
                "updater is not positioned on an element".to_string(),
            ));
        }
        let end = self.current_element_end()?;
        let len = end - self.elem_start;
        self.buf.copy_within(self.elem_start..end, self.wr);
        self.wr += len;
        self.rd = end;
        self.head = None;
        Ok(())
    }

    /// Copy everything remaining in the source verbatim to the output,
    /// across arbitrary nesting, end-of-container markers included. Any
    /// containers entered on the way down are closed by the copied
    /// markers, so the nesting stack drains.
    pub fn move_until_end(&mut self) -> TlvResult<()> {
        let start = if self.head.is_some() {
            self.elem_start
        } else {
            self.rd
        };
        let end = self.buf.len();
        let len = end - start;
        self.buf.copy_within(start..end, self.wr);
        self.wr += len;
        self.rd = end;
        self.head = None;
        self.at_end = true;
        self.stack.clear();
        Ok(())
    }

    /// Descend into the container under the read cursor, emitting its
    /// start marker on the output side so the emitted stream stays well
    /// formed even if only part of the container is kept.
    pub fn enter_container(&mut self) -> TlvResult<()> {
        let container_type = self
            .head
            .as_ref()
            .and_then(|h| h.element_type.container_type())
            .ok_or_else(|| {
                TlvError::IncorrectState("updater is not positioned on a container".to_string())
            })?;
        let head_end = self.elem_start + self.head_len;
        self.buf.copy_within(self.elem_start..head_end, self.wr);
        self.wr += self.head_len;
        self.rd = head_end;
        self.stack.push(container_type);
        self.head = None;
        self.at_end = false;
        Ok(())
    }

    /// Leave the innermost container: the unvisited remainder of the
    /// source container is discarded, and the matching end marker is
    /// emitted on the output side.
    pub fn exit_container(&mut self) -> TlvResult<()> {
        if self.stack.is_empty() {
            return Err(TlvError::IncorrectState(
                "no container is open".to_string(),
            ));
        }
        if !self.at_end {
            if self.head.is_some() {
                self.rd = self.current_element_end()?;
                self.head = None;
            }
            let mut depth = 1usize;
            while depth > 0 {
                if self.rd >= self.buf.len() {
                    break;
                }
                let (head, head_len) =
                    element::decode_head(&self.buf[self.rd..], self.implicit_profile_id)?;
                self.rd += head_len;
                if head.element_type.is_string() {
                    let len = head.len_or_val as usize;
                    if self.rd + len > self.buf.len() {
                        return Err(TlvError::Underrun);
                    }
                    self.rd += len;
                } else if head.element_type.is_container() {
                    depth += 1;
                } else if head.element_type == ElementType::EndOfContainer {
                    depth -= 1;
                }
            }
        }
        if self.wr >= self.free_limit() {
            return Err(TlvError::BufferTooSmall);
        }
        self.buf[self.wr] = ElementType::EndOfContainer as u8;
        self.wr += 1;
        self.stack.pop();
        self.at_end = false;
        Ok(())
    }

    /// Append a new element to the output, minimal-width. See the type
    /// docs for when appending is structurally valid.
    pub fn put(&mut self, tag: Tag, value: &TlvValue) -> TlvResult<()> {
        self.with_writer(|writer| writer.put(tag, value))
    }

    /// Append a new element keeping the variant's numeric width.
    pub fn put_preserved(&mut self, tag: Tag, value: &TlvValue) -> TlvResult<()> {
        self.with_writer(|writer| writer.put_preserved(tag, value))
    }

    /// Complete the edit. Fails with `ContainerOpen` while any container
    /// is unclosed; otherwise returns the output length at the buffer
    /// head. Unconsumed source bytes are discarded.
    pub fn finalize(self) -> TlvResult<usize> {
        if !self.stack.is_empty() {
            return Err(TlvError::ContainerOpen);
        }
        Ok(self.wr)
    }

    /// End of the current element in the source, nested content included.
    fn current_element_end(&self) -> TlvResult<usize> {
        let span = element::element_span(&self.buf[self.elem_start..], self.implicit_profile_id)?;
        Ok(self.elem_start + span)
    }

    /// Upper bound of the free region: the start of the pending element if
    /// one is under the read cursor, else the read cursor itself.
    fn free_limit(&self) -> usize {
        if self.head.is_some() {
            self.elem_start
        } else {
            self.rd
        }
    }

    fn with_writer<R>(
        &mut self,
        f: impl FnOnce(&mut TlvWriter<'_>) -> TlvResult<R>,
    ) -> TlvResult<R> {
        let limit = self.free_limit();
        let container = self.container_type();
        let implicit = self.implicit_profile_id;
        let wr = self.wr;
        let mut writer =
            TlvWriter::new_in_container(&mut self.buf[wr..limit], container, implicit);
        let out = f(&mut writer)?;
        let written = writer.len_written();
        self.wr += written;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::TlvReader;

    // { struct { ctx1: u8 7, ctx2: bool true } }
    const SCENARIO: [u8; 7] = [0x15, 0x24, 0x01, 0x07, 0x29, 0x02, 0x18];

    fn buffer_with(data: &[u8], capacity: usize) -> Vec<u8> {
        let mut buf = vec![0u8; capacity];
        buf[..data.len()].copy_from_slice(data);
        buf
    }

    #[test]
    fn test_move_until_end_is_identity() {
        let mut buf = buffer_with(&SCENARIO, 32);
        let mut updater = TlvUpdater::new(&mut buf, SCENARIO.len()).unwrap();
        updater.move_until_end().unwrap();
        let len = updater.finalize().unwrap();
        assert_eq!(&buf[..len], &SCENARIO);

        // The relocation is invisible to a fresh reader over the result.
        let mut reader = TlvReader::new(&buf[..len]);
        assert!(reader.next().unwrap());
        reader.enter_container().unwrap();
        assert!(reader.next().unwrap());
        assert_eq!(reader.get_u8().unwrap(), 7);
    }

    #[test]
    fn test_element_by_element_identity() {
        let mut buf = buffer_with(&SCENARIO, 32);
        let mut updater = TlvUpdater::new(&mut buf, SCENARIO.len()).unwrap();
        assert!(updater.next().unwrap());
        updater.enter_container().unwrap();
        while updater.next().unwrap() {
            updater.move_element().unwrap();
        }
        updater.exit_container().unwrap();
        let len = updater.finalize().unwrap();
        assert_eq!(&buf[..len], &SCENARIO);
    }

    #[test]
    fn test_delete_element() {
        let mut buf = buffer_with(&SCENARIO, 32);
        let mut updater = TlvUpdater::new(&mut buf, SCENARIO.len()).unwrap();
        assert!(updater.next().unwrap());
        updater.enter_container().unwrap();
        // Walk past ctx1 without moving it, keep ctx2.
        assert!(updater.next().unwrap());
        assert_eq!(updater.tag(), Some(Tag::Context(1)));
        assert!(updater.next().unwrap());
        updater.move_element().unwrap();
        assert!(!updater.next().unwrap());
        updater.exit_container().unwrap();
        let len = updater.finalize().unwrap();
        assert_eq!(&buf[..len], &[0x15, 0x29, 0x02, 0x18]);
    }

    #[test]
    fn test_replace_element() {
        let mut buf = buffer_with(&SCENARIO, 32);
        let mut updater = TlvUpdater::new(&mut buf, SCENARIO.len()).unwrap();
        assert!(updater.next().unwrap());
        updater.enter_container().unwrap();
        assert!(updater.next().unwrap());
        assert_eq!(updater.get_value().unwrap(), TlvValue::UInt8(7));
        // Emit the replacement; the original is dropped by the next
        // advance.
        updater.put(Tag::Context(1), &TlvValue::UInt8(8)).unwrap();
        assert!(updater.next().unwrap());
        updater.move_element().unwrap();
        assert!(!updater.next().unwrap());
        updater.exit_container().unwrap();
        let len = updater.finalize().unwrap();
        assert_eq!(&buf[..len], &[0x15, 0x24, 0x01, 0x08, 0x29, 0x02, 0x18]);
    }

    #[test]
    fn test_append_sibling() {
        let mut buf = buffer_with(&SCENARIO, 32);
        let mut updater = TlvUpdater::new(&mut buf, SCENARIO.len()).unwrap();
        assert!(updater.next().unwrap());
        updater.enter_container().unwrap();
        while updater.next().unwrap() {
            updater.move_element().unwrap();
        }
        // Appending at the container's end, confirmed by the false next().
        updater.put(Tag::Context(3), &TlvValue::UInt8(42)).unwrap();
        updater.exit_container().unwrap();
        let len = updater.finalize().unwrap();
        assert_eq!(
            &buf[..len],
            &[0x15, 0x24, 0x01, 0x07, 0x29, 0x02, 0x24, 0x03, 0x2A, 0x18]
        );
    }

    #[test]
    fn test_exit_discards_unvisited_members() {
        let mut buf = buffer_with(&SCENARIO, 32);
        let mut updater = TlvUpdater::new(&mut buf, SCENARIO.len()).unwrap();
        assert!(updater.next().unwrap());
        updater.enter_container().unwrap();
        assert!(updater.next().unwrap());
        updater.move_element().unwrap();
        // ctx2 never visited.
        updater.exit_container().unwrap();
        let len = updater.finalize().unwrap();
        assert_eq!(&buf[..len], &[0x15, 0x24, 0x01, 0x07, 0x18]);
    }

    #[test]
    fn test_finalize_with_open_container() {
        let mut buf = buffer_with(&SCENARIO, 32);
        let mut updater = TlvUpdater::new(&mut buf, SCENARIO.len()).unwrap();
        assert!(updater.next().unwrap());
        updater.enter_container().unwrap();
        assert!(matches!(updater.finalize(), Err(TlvError::ContainerOpen)));
    }

    #[test]
    fn test_no_free_space_rejects_put() {
        // Zero slack: the buffer is exactly the encoding.
        let mut buf = buffer_with(&SCENARIO, SCENARIO.len());
        let mut updater = TlvUpdater::new(&mut buf, SCENARIO.len()).unwrap();
        assert!(updater.next().unwrap());
        assert!(matches!(
            updater.put(Tag::CommonProfile(1), &TlvValue::UInt8(1)),
            Err(TlvError::BufferTooSmall)
        ));
    }

    #[test]
    fn test_data_len_larger_than_buffer() {
        let mut buf = [0u8; 4];
        assert!(matches!(
            TlvUpdater::new(&mut buf, 8),
            Err(TlvError::InvalidArgument(_))
        ));
    }
}
