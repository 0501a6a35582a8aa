//! Forward-only TLV stream reader

use bytes::Bytes;

use crate::backing::TlvBackingStore;
use crate::element::{self, ElementHead, ElementType, TagControl};
use iotlv_core::{Tag, TlvContainerType, TlvError, TlvResult, TlvType};

/// One open container on the reader's stack.
#[derive(Debug, Clone, Copy)]
struct ContainerFrame {
    container_type: TlvContainerType,
    /// Offset of the container's first member. Meaningful for contiguous
    /// sources only; tag search rescans from here.
    first_member: usize,
}

enum ReadSource<'a> {
    Slice(&'a [u8]),
    Store(&'a mut dyn TlvBackingStore),
}

/// Forward-only cursor decoding a TLV byte stream element by element.
///
/// The reader materializes nothing beyond what the caller asks for: an
/// element head is at most 17 bytes of state, and string payloads stay in
/// the source until `get_bytes`/`get_string`/`get_byte_view` consume them.
/// `next()` walks siblings at the current nesting level, skipping over
/// whole containers unless `enter_container` descends into them.
pub struct TlvReader<'a> {
    source: ReadSource<'a>,
    /// Current chunk when store-backed.
    chunk: Bytes,
    /// Position within the slice or the current chunk.
    pos: usize,
    len_read: usize,
    max_len: usize,
    implicit_profile_id: Option<u32>,
    base_container: TlvContainerType,
    stack: Vec<ContainerFrame>,
    head: Option<ElementHead>,
    /// Start offset of the current element head (contiguous sources).
    elem_start: usize,
    /// Unconsumed payload bytes of the current string element.
    payload_remaining: u64,
    at_end: bool,
}

impl<'a> TlvReader<'a> {
    /// Reader over a contiguous buffer.
    pub fn new(buf: &'a [u8]) -> Self {
        Self::new_with_limit(buf, buf.len())
    }

    /// Reader over a contiguous buffer, decoding at most `max_len` bytes.
    pub fn new_with_limit(buf: &'a [u8], max_len: usize) -> Self {
        Self {
            source: ReadSource::Slice(buf),
            chunk: Bytes::new(),
            pos: 0,
            len_read: 0,
            max_len: max_len.min(buf.len()),
            implicit_profile_id: None,
            base_container: TlvContainerType::TopLevel,
            stack: Vec::new(),
            head: None,
            elem_start: 0,
            payload_remaining: 0,
            at_end: false,
        }
    }

    /// Reader pulling chunks from a backing store, decoding at most
    /// `max_len` bytes. Fails only if the store's `on_init_read` fails.
    pub fn with_backing(
        store: &'a mut dyn TlvBackingStore,
        max_len: usize,
    ) -> TlvResult<Self> {
        let chunk = store.on_init_read()?;
        Ok(Self {
            source: ReadSource::Store(store),
            chunk,
            pos: 0,
            len_read: 0,
            max_len,
            implicit_profile_id: None,
            base_container: TlvContainerType::TopLevel,
            stack: Vec::new(),
            head: None,
            elem_start: 0,
            payload_remaining: 0,
            at_end: false,
        })
    }

    /// Contiguous reader whose top-level context is `container`, for
    /// decoding a detached fragment cut out of a larger encoding.
    pub(crate) fn new_in_container(
        buf: &'a [u8],
        container: TlvContainerType,
        implicit_profile_id: Option<u32>,
    ) -> Self {
        let mut reader = Self::new(buf);
        reader.base_container = container;
        reader.implicit_profile_id = implicit_profile_id;
        reader
    }

    pub fn implicit_profile_id(&self) -> Option<u32> {
        self.implicit_profile_id
    }

    /// Ambient profile id used to resolve implicitly encoded tags. Must
    /// match the id the producer encoded with.
    pub fn set_implicit_profile_id(&mut self, profile_id: Option<u32>) {
        self.implicit_profile_id = profile_id;
    }

    /// Tag of the element under the cursor.
    pub fn tag(&self) -> Option<Tag> {
        self.head.as_ref().map(|h| h.tag)
    }

    /// Type of the element under the cursor, `NotSpecified` if none.
    pub fn tlv_type(&self) -> TlvType {
        self.head
            .as_ref()
            .map(|h| h.element_type.tlv_type())
            .unwrap_or(TlvType::NotSpecified)
    }

    pub(crate) fn element_type(&self) -> Option<ElementType> {
        self.head.as_ref().map(|h| h.element_type)
    }

    /// Payload length of the current string element, zero for other types.
    pub fn length(&self) -> usize {
        match &self.head {
            Some(h) if h.element_type.is_string() => h.len_or_val as usize,
            _ => 0,
        }
    }

    /// Total bytes consumed from the source so far.
    pub fn len_read(&self) -> usize {
        self.len_read
    }

    /// Containment context of the cursor.
    pub fn container_type(&self) -> TlvContainerType {
        self.stack
            .last()
            .map(|f| f.container_type)
            .unwrap_or(self.base_container)
    }

    /// Advance to the next element at the current nesting level.
    ///
    /// Returns `Ok(false)` at the end of the current container (or of the
    /// input); the position parks there, so further calls keep returning
    /// `Ok(false)` until the container is exited. When positioned on a
    /// container element this skips its entire subtree.
    pub fn next(&mut self) -> TlvResult<bool> {
        if self.at_end {
            return Ok(false);
        }
        self.skip_current()?;
        match self.read_element_head()? {
            None => {
                self.at_end = true;
                Ok(false)
            }
            Some(h) if h.element_type == ElementType::EndOfContainer => {
                if self.stack.is_empty() {
                    return Err(TlvError::InvalidElement(
                        "end-of-container outside any container".to_string(),
                    ));
                }
                self.at_end = true;
                Ok(false)
            }
            Some(h) => {
                element::check_tag_allowed(&h.tag, self.container_type())?;
                self.payload_remaining = if h.element_type.is_string() {
                    h.len_or_val
                } else {
                    0
                };
                self.head = Some(h);
                Ok(true)
            }
        }
    }

    /// Advance like `next()`, then assert the element's tag and type.
    ///
    /// A mismatched element is already consumed when the error returns;
    /// the failure is an assertion, not a peek.
    pub fn next_expect(&mut self, expected_type: TlvType, expected_tag: Tag) -> TlvResult<()> {
        if !self.next()? {
            return Err(TlvError::EndOfTlv);
        }
        if self.tag() != Some(expected_tag) {
            return Err(TlvError::UnexpectedElement);
        }
        if self.tlv_type() != expected_type {
            return Err(TlvError::WrongType);
        }
        Ok(())
    }

    /// Advance past the current element (and, for containers, its whole
    /// subtree) without decoding the following element's head.
    pub fn skip(&mut self) -> TlvResult<()> {
        if self.head.is_none() {
            return Err(TlvError::IncorrectState(
                "reader is not positioned on an element".to_string(),
            ));
        }
        self.skip_current()
    }

    pub fn get_bool(&self) -> TlvResult<bool> {
        match self.current_head()?.element_type {
            ElementType::BooleanFalse => Ok(false),
            ElementType::BooleanTrue => Ok(true),
            _ => Err(TlvError::WrongType),
        }
    }

    /// Unsigned value zero-extended to 64 bits.
    pub fn get_u64(&self) -> TlvResult<u64> {
        let h = self.current_head()?;
        if h.element_type.tlv_type() != TlvType::UnsignedInteger {
            return Err(TlvError::WrongType);
        }
        Ok(h.len_or_val)
    }

    /// Unsigned value truncated to 8 bits. Narrowing below the encoded
    /// width silently drops the high-order bytes.
    pub fn get_u8(&self) -> TlvResult<u8> {
        Ok(self.get_u64()? as u8)
    }

    pub fn get_u16(&self) -> TlvResult<u16> {
        Ok(self.get_u64()? as u16)
    }

    pub fn get_u32(&self) -> TlvResult<u32> {
        Ok(self.get_u64()? as u32)
    }

    /// Signed value sign-extended to 64 bits.
    pub fn get_i64(&self) -> TlvResult<i64> {
        let h = self.current_head()?;
        if h.element_type.tlv_type() != TlvType::SignedInteger {
            return Err(TlvError::WrongType);
        }
        Ok(h.len_or_val as i64)
    }

    /// Signed value truncated to 8 bits; see `get_u8` for the narrowing
    /// contract.
    pub fn get_i8(&self) -> TlvResult<i8> {
        Ok(self.get_i64()? as i8)
    }

    pub fn get_i16(&self) -> TlvResult<i16> {
        Ok(self.get_i64()? as i16)
    }

    pub fn get_i32(&self) -> TlvResult<i32> {
        Ok(self.get_i64()? as i32)
    }

    pub fn get_f32(&self) -> TlvResult<f32> {
        let h = self.current_head()?;
        match h.element_type {
            ElementType::Float32 => Ok(f32::from_bits(h.len_or_val as u32)),
            _ => Err(TlvError::WrongType),
        }
    }

    /// Double value; a single-precision element widens losslessly.
    pub fn get_f64(&self) -> TlvResult<f64> {
        let h = self.current_head()?;
        match h.element_type {
            ElementType::Float32 => Ok(f32::from_bits(h.len_or_val as u32) as f64),
            ElementType::Float64 => Ok(f64::from_bits(h.len_or_val)),
            _ => Err(TlvError::WrongType),
        }
    }

    /// Copy out the payload of the current byte- or UTF-8-string element.
    pub fn get_bytes(&mut self) -> TlvResult<Vec<u8>> {
        let (element_type, len) = {
            let h = self.current_head()?;
            (h.element_type, h.len_or_val)
        };
        if !element_type.is_string() {
            return Err(TlvError::WrongType);
        }
        if self.payload_remaining != len {
            return Err(TlvError::IncorrectState(
                "string payload already consumed".to_string(),
            ));
        }
        let mut out = vec![0u8; len as usize];
        self.read_exact(&mut out)?;
        self.payload_remaining = 0;
        Ok(out)
    }

    /// Copy out the current UTF-8 string element, validating the encoding.
    pub fn get_string(&mut self) -> TlvResult<String> {
        let element_type = self.current_head()?.element_type;
        if !element_type.is_utf8_string() {
            return Err(TlvError::WrongType);
        }
        let bytes = self.get_bytes()?;
        String::from_utf8(bytes).map_err(|_| TlvError::InvalidUtf8)
    }

    /// Borrow the payload of the current string element in place.
    ///
    /// Works only while the payload sits in one contiguous span: always for
    /// slice sources, and for store-backed readers only when it does not
    /// cross a chunk boundary. Fails with `Underrun` otherwise.
    pub fn get_byte_view(&mut self) -> TlvResult<&[u8]> {
        let (element_type, len) = {
            let h = self.current_head()?;
            (h.element_type, h.len_or_val)
        };
        if !element_type.is_string() {
            return Err(TlvError::WrongType);
        }
        if self.payload_remaining != len {
            return Err(TlvError::IncorrectState(
                "string payload already consumed".to_string(),
            ));
        }
        let len = len as usize;
        if len > self.max_len - self.len_read {
            return Err(TlvError::Underrun);
        }
        match &self.source {
            ReadSource::Slice(buf) => {
                let buf: &'a [u8] = *buf;
                if self.pos + len > buf.len() {
                    return Err(TlvError::Underrun);
                }
                let view = &buf[self.pos..self.pos + len];
                self.pos += len;
                self.len_read += len;
                self.payload_remaining = 0;
                Ok(view)
            }
            ReadSource::Store(_) => {
                if self.pos + len > self.chunk.len() {
                    return Err(TlvError::Underrun);
                }
                let start = self.pos;
                self.pos += len;
                self.len_read += len;
                self.payload_remaining = 0;
                Ok(&self.chunk[start..start + len])
            }
        }
    }

    /// Descend into the container element under the cursor; afterwards the
    /// reader is positioned before its first member.
    pub fn enter_container(&mut self) -> TlvResult<()> {
        let container_type = self
            .head
            .as_ref()
            .and_then(|h| h.element_type.container_type())
            .ok_or_else(|| {
                TlvError::IncorrectState("reader is not positioned on a container".to_string())
            })?;
        self.head = None;
        self.payload_remaining = 0;
        self.at_end = false;
        self.stack.push(ContainerFrame {
            container_type,
            first_member: self.pos,
        });
        Ok(())
    }

    /// Leave the innermost open container, discarding any members not yet
    /// visited, and position the reader between the container element and
    /// its next sibling.
    pub fn exit_container(&mut self) -> TlvResult<()> {
        if self.stack.is_empty() {
            return Err(TlvError::IncorrectState(
                "no container is open".to_string(),
            ));
        }
        if !self.at_end {
            if self.head.is_some() {
                self.skip_current()?;
            }
            self.discard_until_end(1)?;
        }
        self.stack.pop();
        self.head = None;
        self.payload_remaining = 0;
        self.at_end = false;
        Ok(())
    }

    /// Independent reader over the members of the container element under
    /// the cursor, leaving this reader untouched. Contiguous sources only;
    /// the clone shares nothing mutable with its parent.
    pub fn container_reader(&self) -> TlvResult<TlvReader<'a>> {
        let container_type = self
            .head
            .as_ref()
            .and_then(|h| h.element_type.container_type())
            .ok_or_else(|| {
                TlvError::IncorrectState("reader is not positioned on a container".to_string())
            })?;
        let buf = self.contiguous_source()?;
        Ok(TlvReader {
            source: ReadSource::Slice(buf),
            chunk: Bytes::new(),
            pos: self.pos,
            len_read: self.len_read,
            max_len: self.max_len,
            implicit_profile_id: self.implicit_profile_id,
            base_container: self.base_container,
            stack: vec![ContainerFrame {
                container_type,
                first_member: self.pos,
            }],
            head: None,
            elem_start: self.pos,
            payload_remaining: 0,
            at_end: false,
        })
    }

    /// Clone of this reader at its current position. Contiguous sources
    /// only.
    pub(crate) fn duplicate(&self) -> TlvResult<TlvReader<'a>> {
        let buf = self.contiguous_source()?;
        Ok(TlvReader {
            source: ReadSource::Slice(buf),
            chunk: Bytes::new(),
            pos: self.pos,
            len_read: self.len_read,
            max_len: self.max_len,
            implicit_profile_id: self.implicit_profile_id,
            base_container: self.base_container,
            stack: self.stack.clone(),
            head: self.head,
            elem_start: self.elem_start,
            payload_remaining: self.payload_remaining,
            at_end: self.at_end,
        })
    }

    /// Clone positioned before the first member of the current container
    /// context: inside the container element under the cursor if there is
    /// one, else rewound to the start of the innermost open container (or
    /// of the whole input). Contiguous sources only.
    pub(crate) fn rescan_container(&self) -> TlvResult<TlvReader<'a>> {
        if self
            .head
            .as_ref()
            .is_some_and(|h| h.element_type.is_container())
        {
            return self.container_reader();
        }
        let mut clone = self.duplicate()?;
        let first_member = clone.stack.last().map(|f| f.first_member).unwrap_or(0);
        clone.len_read -= clone.pos - first_member;
        clone.pos = first_member;
        clone.elem_start = first_member;
        clone.head = None;
        clone.payload_remaining = 0;
        clone.at_end = false;
        Ok(clone)
    }

    /// Underlying buffer and element start offset for verbatim copies.
    /// Fails unless the source is contiguous, the cursor is on an element
    /// and its payload is untouched.
    pub(crate) fn contiguous_element(&self) -> TlvResult<(&'a [u8], usize)> {
        let h = self.current_head()?;
        if h.element_type.is_string() && self.payload_remaining != h.len_or_val {
            return Err(TlvError::IncorrectState(
                "string payload already consumed".to_string(),
            ));
        }
        Ok((self.contiguous_source()?, self.elem_start))
    }

    fn contiguous_source(&self) -> TlvResult<&'a [u8]> {
        match &self.source {
            ReadSource::Slice(buf) => Ok(buf),
            ReadSource::Store(_) => Err(TlvError::IncorrectState(
                "operation requires a contiguous source".to_string(),
            )),
        }
    }

    fn current_head(&self) -> TlvResult<&ElementHead> {
        self.head.as_ref().ok_or_else(|| {
            TlvError::IncorrectState("reader is not positioned on an element".to_string())
        })
    }

    /// Pull the next chunk from the store. `Ok(false)` means end of input.
    fn refill(&mut self) -> TlvResult<bool> {
        match &mut self.source {
            ReadSource::Slice(_) => Ok(false),
            ReadSource::Store(store) => {
                let next = store.next_read_buffer()?;
                if next.is_empty() {
                    return Ok(false);
                }
                self.chunk = next;
                self.pos = 0;
                Ok(true)
            }
        }
    }

    fn available_in_span(&self) -> usize {
        match &self.source {
            ReadSource::Slice(buf) => buf.len() - self.pos,
            ReadSource::Store(_) => self.chunk.len() - self.pos,
        }
    }

    fn read_u8(&mut self) -> TlvResult<u8> {
        if self.len_read >= self.max_len {
            return Err(TlvError::Underrun);
        }
        loop {
            if self.available_in_span() > 0 {
                let byte = match &self.source {
                    ReadSource::Slice(buf) => buf[self.pos],
                    ReadSource::Store(_) => self.chunk[self.pos],
                };
                self.pos += 1;
                self.len_read += 1;
                return Ok(byte);
            }
            if !self.refill()? {
                return Err(TlvError::Underrun);
            }
        }
    }

    fn read_exact(&mut self, out: &mut [u8]) -> TlvResult<()> {
        if out.len() > self.max_len - self.len_read {
            return Err(TlvError::Underrun);
        }
        let mut filled = 0;
        while filled < out.len() {
            let avail = self.available_in_span();
            if avail == 0 {
                if !self.refill()? {
                    return Err(TlvError::Underrun);
                }
                continue;
            }
            let n = avail.min(out.len() - filled);
            match &self.source {
                ReadSource::Slice(buf) => {
                    out[filled..filled + n].copy_from_slice(&buf[self.pos..self.pos + n]);
                }
                ReadSource::Store(_) => {
                    out[filled..filled + n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
                }
            }
            self.pos += n;
            self.len_read += n;
            filled += n;
        }
        Ok(())
    }

    fn discard(&mut self, count: u64) -> TlvResult<()> {
        if count > (self.max_len - self.len_read) as u64 {
            return Err(TlvError::Underrun);
        }
        let mut remaining = count as usize;
        while remaining > 0 {
            let avail = self.available_in_span();
            if avail == 0 {
                if !self.refill()? {
                    return Err(TlvError::Underrun);
                }
                continue;
            }
            let n = avail.min(remaining);
            self.pos += n;
            self.len_read += n;
            remaining -= n;
        }
        Ok(())
    }

    /// Read one control byte, distinguishing clean end of input (`None`)
    /// from a byte.
    fn try_read_control(&mut self) -> TlvResult<Option<u8>> {
        if self.len_read >= self.max_len {
            return Ok(None);
        }
        loop {
            if self.available_in_span() > 0 {
                return self.read_u8().map(Some);
            }
            if !self.refill()? {
                return Ok(None);
            }
        }
    }

    /// Decode the next element head. `Ok(None)` on clean end of input.
    fn read_element_head(&mut self) -> TlvResult<Option<ElementHead>> {
        self.elem_start = self.pos;
        let control = match self.try_read_control()? {
            Some(c) => c,
            None => return Ok(None),
        };
        let element_type = ElementType::from_control(control)?;
        let tag_control = TagControl::from_control(control);
        if element_type == ElementType::EndOfContainer && tag_control != TagControl::Anonymous {
            return Err(TlvError::InvalidElement(format!(
                "end-of-container with tag control 0x{:02X}",
                control & element::TAG_CONTROL_MASK
            )));
        }
        let mut tag_buf = [0u8; 8];
        let ts = tag_control.tag_size();
        self.read_exact(&mut tag_buf[..ts])?;
        let tag = element::decode_tag(tag_control, &tag_buf[..ts], self.implicit_profile_id)?;
        let mut val_buf = [0u8; 8];
        let w = element_type.value_field_size();
        self.read_exact(&mut val_buf[..w])?;
        let len_or_val = element::decode_value_field(element_type, &val_buf[..w]);
        Ok(Some(ElementHead {
            tag,
            element_type,
            len_or_val,
        }))
    }

    /// Consume whatever remains of the current element: pending string
    /// payload, or the whole subtree of an unentered container.
    fn skip_current(&mut self) -> TlvResult<()> {
        let Some(head) = self.head.take() else {
            return Ok(());
        };
        if head.element_type.is_string() {
            let pending = self.payload_remaining;
            self.payload_remaining = 0;
            return self.discard(pending);
        }
        if head.element_type.is_container() {
            self.discard_until_end(1)?;
        }
        Ok(())
    }

    /// Read and discard elements until `depth` end-of-container markers
    /// above the openings seen along the way have been consumed. Tolerates
    /// clean end of input, matching `next()`.
    fn discard_until_end(&mut self, mut depth: usize) -> TlvResult<()> {
        while depth > 0 {
            match self.read_element_head()? {
                None => break,
                Some(h) => {
                    if h.element_type.is_string() {
                        self.discard(h.len_or_val)?;
                    } else if h.element_type.is_container() {
                        depth += 1;
                    } else if h.element_type == ElementType::EndOfContainer {
                        depth -= 1;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // { struct { ctx1: u8 7, ctx2: bool true } }
    const SCENARIO: [u8; 7] = [0x15, 0x24, 0x01, 0x07, 0x29, 0x02, 0x18];

    #[test]
    fn test_decode_scenario() {
        let mut reader = TlvReader::new(&SCENARIO);
        assert!(reader.next().unwrap());
        assert_eq!(reader.tlv_type(), TlvType::Structure);
        reader.enter_container().unwrap();

        assert!(reader.next().unwrap());
        assert_eq!(reader.tag(), Some(Tag::Context(1)));
        assert_eq!(reader.get_u8().unwrap(), 7);

        assert!(reader.next().unwrap());
        assert_eq!(reader.tag(), Some(Tag::Context(2)));
        assert!(reader.get_bool().unwrap());

        assert!(!reader.next().unwrap());
        assert!(!reader.next().unwrap());
        reader.exit_container().unwrap();
        assert!(!reader.next().unwrap());
    }

    #[test]
    fn test_next_expect() {
        let mut reader = TlvReader::new(&SCENARIO);
        assert!(reader.next().unwrap());
        reader.enter_container().unwrap();
        reader
            .next_expect(TlvType::UnsignedInteger, Tag::Context(1))
            .unwrap();
        assert!(matches!(
            reader.next_expect(TlvType::UnsignedInteger, Tag::Context(2)),
            Err(TlvError::WrongType)
        ));
        // The mismatched element was still consumed.
        assert!(!reader.next().unwrap());
    }

    #[test]
    fn test_next_expect_wrong_tag() {
        let mut reader = TlvReader::new(&SCENARIO);
        assert!(reader.next().unwrap());
        reader.enter_container().unwrap();
        assert!(matches!(
            reader.next_expect(TlvType::UnsignedInteger, Tag::Context(9)),
            Err(TlvError::UnexpectedElement)
        ));
    }

    #[test]
    fn test_skip_over_container() {
        // struct { a: u8 1, arr: [1, 2, 3], b: u8 2 }
        let buf = [
            0x15, 0x24, 0x01, 0x01, 0x36, 0x02, 0x04, 0x01, 0x04, 0x02, 0x04, 0x03, 0x18, 0x24,
            0x03, 0x02, 0x18,
        ];
        let mut reader = TlvReader::new(&buf);
        assert!(reader.next().unwrap());
        reader.enter_container().unwrap();

        assert!(reader.next().unwrap());
        assert_eq!(reader.tag(), Some(Tag::Context(1)));
        assert!(reader.next().unwrap());
        assert_eq!(reader.tlv_type(), TlvType::Array);
        // Not entered: the third next() lands on b, past the whole array.
        assert!(reader.next().unwrap());
        assert_eq!(reader.tag(), Some(Tag::Context(3)));
        assert_eq!(reader.get_u8().unwrap(), 2);
        assert!(!reader.next().unwrap());
    }

    #[test]
    fn test_truncation_underrun() {
        // Cut inside the u8 value field.
        let mut reader = TlvReader::new(&SCENARIO[..3]);
        assert!(reader.next().unwrap());
        reader.enter_container().unwrap();
        assert!(matches!(reader.next(), Err(TlvError::Underrun)));
    }

    #[test]
    fn test_every_truncation_is_underrun_or_end() {
        // No prefix of the valid encoding may trip out-of-bounds access or
        // decode past the cut; mid-element cuts must surface Underrun.
        for cut in 1..SCENARIO.len() {
            let mut reader = TlvReader::new(&SCENARIO[..cut]);
            let mut result = Ok(());
            'walk: while result.is_ok() {
                match reader.next() {
                    Ok(true) => {
                        if reader.tlv_type() == TlvType::Structure {
                            result = reader.enter_container();
                        }
                    }
                    Ok(false) => break 'walk,
                    Err(e) => {
                        assert!(matches!(e, TlvError::Underrun), "cut {}: {:?}", cut, e);
                        break 'walk;
                    }
                }
            }
        }
    }

    #[test]
    fn test_narrowing_get_truncates() {
        // u32 0x12345678 encoded at full width.
        let buf = [0x06, 0x78, 0x56, 0x34, 0x12];
        let mut reader = TlvReader::new(&buf);
        assert!(reader.next().unwrap());
        assert_eq!(reader.get_u32().unwrap(), 0x12345678);
        assert_eq!(reader.get_u8().unwrap(), 0x78);
        assert_eq!(reader.get_u64().unwrap(), 0x12345678);
    }

    #[test]
    fn test_widening_get_sign_extends() {
        // i8 -2
        let buf = [0x00, 0xFE];
        let mut reader = TlvReader::new(&buf);
        assert!(reader.next().unwrap());
        assert_eq!(reader.get_i64().unwrap(), -2);
        assert_eq!(reader.get_i8().unwrap(), -2);
        assert!(matches!(reader.get_u64(), Err(TlvError::WrongType)));
    }

    #[test]
    fn test_floats() {
        let mut buf = vec![0x0A];
        buf.extend_from_slice(&1.5f32.to_bits().to_le_bytes());
        let mut reader = TlvReader::new(&buf);
        assert!(reader.next().unwrap());
        assert_eq!(reader.get_f32().unwrap(), 1.5);
        assert_eq!(reader.get_f64().unwrap(), 1.5);
    }

    #[test]
    fn test_strings() {
        let buf = [0x0C, 0x02, b'h', b'i', 0x10, 0x01, 0xAA];
        let mut reader = TlvReader::new(&buf);
        assert!(reader.next().unwrap());
        assert_eq!(reader.length(), 2);
        assert_eq!(reader.get_string().unwrap(), "hi");
        assert!(reader.next().unwrap());
        assert_eq!(reader.get_bytes().unwrap(), vec![0xAA]);
        assert!(!reader.next().unwrap());
    }

    #[test]
    fn test_get_string_rejects_byte_string() {
        let buf = [0x10, 0x01, 0xAA];
        let mut reader = TlvReader::new(&buf);
        assert!(reader.next().unwrap());
        assert!(matches!(reader.get_string(), Err(TlvError::WrongType)));
    }

    #[test]
    fn test_get_byte_view() {
        let buf = [0x0C, 0x02, b'h', b'i'];
        let mut reader = TlvReader::new(&buf);
        assert!(reader.next().unwrap());
        assert_eq!(reader.get_byte_view().unwrap(), b"hi");
        assert!(!reader.next().unwrap());
    }

    #[test]
    fn test_implicit_tag_without_profile_id() {
        // Implicit 16-bit tag, u8 5.
        let buf = [(4 << 5) | 0x04, 0x05, 0x00, 0x05];
        let mut reader = TlvReader::new(&buf);
        assert!(matches!(reader.next(), Err(TlvError::UnknownImplicitTag)));

        let mut reader = TlvReader::new(&buf);
        reader.set_implicit_profile_id(Some(0xFFF1_DEED));
        assert!(reader.next().unwrap());
        assert_eq!(reader.tag(), Some(Tag::fully_qualified(0xFFF1, 0xDEED, 5)));
    }

    #[test]
    fn test_tag_legality_in_array() {
        // array [ ctx1: u8 1 ]: tagged member inside an array is invalid.
        let buf = [0x16, 0x24, 0x01, 0x01, 0x18];
        let mut reader = TlvReader::new(&buf);
        assert!(reader.next().unwrap());
        reader.enter_container().unwrap();
        assert!(matches!(reader.next(), Err(TlvError::InvalidTag)));
    }

    #[test]
    fn test_context_tag_at_top_level() {
        let buf = [0x24, 0x01, 0x07];
        let mut reader = TlvReader::new(&buf);
        assert!(matches!(reader.next(), Err(TlvError::InvalidTag)));
    }

    #[test]
    fn test_end_of_container_at_top_level() {
        let buf = [0x18];
        let mut reader = TlvReader::new(&buf);
        assert!(matches!(reader.next(), Err(TlvError::InvalidElement(_))));
    }

    #[test]
    fn test_exit_container_discards_remainder() {
        let mut reader = TlvReader::new(&SCENARIO);
        assert!(reader.next().unwrap());
        reader.enter_container().unwrap();
        assert!(reader.next().unwrap());
        // Leave without visiting ctx2.
        reader.exit_container().unwrap();
        assert!(!reader.next().unwrap());
    }

    #[test]
    fn test_exit_without_enter() {
        let mut reader = TlvReader::new(&SCENARIO);
        assert!(matches!(
            reader.exit_container(),
            Err(TlvError::IncorrectState(_))
        ));
    }

    #[test]
    fn test_container_reader_is_independent() {
        let mut reader = TlvReader::new(&SCENARIO);
        assert!(reader.next().unwrap());
        let mut members = reader.container_reader().unwrap();
        assert!(members.next().unwrap());
        assert_eq!(members.get_u8().unwrap(), 7);
        // Parent is still positioned on the structure element.
        assert_eq!(reader.tlv_type(), TlvType::Structure);
        assert!(!reader.next().unwrap());
    }

    #[test]
    fn test_skip() {
        let mut reader = TlvReader::new(&SCENARIO);
        assert!(reader.next().unwrap());
        reader.enter_container().unwrap();
        assert!(reader.next().unwrap());
        reader.skip().unwrap();
        assert!(reader.next().unwrap());
        assert_eq!(reader.tag(), Some(Tag::Context(2)));
    }

    #[test]
    fn test_max_len_limits_decoding() {
        let mut long = SCENARIO.to_vec();
        long.push(0x04); // trailing garbage past the limit
        let mut reader = TlvReader::new_with_limit(&long, SCENARIO.len());
        assert!(reader.next().unwrap());
        assert!(!reader.next().unwrap());
    }
}
