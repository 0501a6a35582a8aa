//! Forward-only TLV stream writer

use bytes::BytesMut;
use std::fmt;
use std::mem;

use crate::backing::TlvBackingStore;
use crate::element::{self, ElementType};
use crate::reader::TlvReader;
use crate::tree;
use iotlv_core::{Tag, TlvContainerType, TlvError, TlvResult, TlvValue};

enum WriteSink<'a> {
    Slice { buf: &'a mut [u8], pos: usize },
    Store {
        store: &'a mut dyn TlvBackingStore,
        chunk: BytesMut,
    },
}

/// Forward-only cursor encoding TLV elements into caller- or
/// store-provided memory, verifying the nesting discipline and the length
/// ceiling as it goes.
///
/// Numeric puts pick the smallest wire width that round-trips the value;
/// `put_preserved` keeps the width of the [`TlvValue`] variant instead, for
/// callers that anticipate back-patching a field at a fixed width later.
pub struct TlvWriter<'a> {
    sink: WriteSink<'a>,
    len_written: usize,
    max_len: usize,
    implicit_profile_id: Option<u32>,
    base_container: TlvContainerType,
    stack: Vec<TlvContainerType>,
}

impl<'a> TlvWriter<'a> {
    /// Writer over a caller-provided buffer.
    pub fn new(buf: &'a mut [u8]) -> Self {
        let max_len = buf.len();
        Self::with_slice(buf, max_len, TlvContainerType::TopLevel, None)
    }

    /// Writer over a caller-provided buffer with an explicit length
    /// ceiling.
    pub fn new_with_limit(buf: &'a mut [u8], max_len: usize) -> Self {
        let max_len = max_len.min(buf.len());
        Self::with_slice(buf, max_len, TlvContainerType::TopLevel, None)
    }

    /// Writer pushing chunks into a backing store, writing at most
    /// `max_len` bytes. Fails only if the store's `on_init_write` fails.
    pub fn with_backing(
        store: &'a mut dyn TlvBackingStore,
        max_len: usize,
    ) -> TlvResult<Self> {
        let chunk = store.on_init_write()?;
        Ok(Self {
            sink: WriteSink::Store { store, chunk },
            len_written: 0,
            max_len,
            implicit_profile_id: None,
            base_container: TlvContainerType::TopLevel,
            stack: Vec::new(),
        })
    }

    /// Contiguous writer whose top-level context is `container`, for
    /// emitting a fragment spliced into a larger encoding.
    pub(crate) fn new_in_container(
        buf: &'a mut [u8],
        container: TlvContainerType,
        implicit_profile_id: Option<u32>,
    ) -> Self {
        let max_len = buf.len();
        Self::with_slice(buf, max_len, container, implicit_profile_id)
    }

    fn with_slice(
        buf: &'a mut [u8],
        max_len: usize,
        base_container: TlvContainerType,
        implicit_profile_id: Option<u32>,
    ) -> Self {
        Self {
            sink: WriteSink::Slice { buf, pos: 0 },
            len_written: 0,
            max_len,
            implicit_profile_id,
            base_container,
            stack: Vec::new(),
        }
    }

    pub fn implicit_profile_id(&self) -> Option<u32> {
        self.implicit_profile_id
    }

    /// Ambient profile id: fully-qualified tags under this profile are
    /// compressed to the short implicit wire form. The consuming reader
    /// must be configured with the same id.
    pub fn set_implicit_profile_id(&mut self, profile_id: Option<u32>) {
        self.implicit_profile_id = profile_id;
    }

    /// Total bytes emitted so far.
    pub fn len_written(&self) -> usize {
        self.len_written
    }

    /// Containment context of the cursor.
    pub fn container_type(&self) -> TlvContainerType {
        self.stack.last().copied().unwrap_or(self.base_container)
    }

    /// Encode `value` under `tag`, minimal-width.
    pub fn put(&mut self, tag: Tag, value: &TlvValue) -> TlvResult<()> {
        tree::encode_value(self, tag, value, false)
    }

    /// Encode `value` under `tag`, keeping each numeric variant's width.
    pub fn put_preserved(&mut self, tag: Tag, value: &TlvValue) -> TlvResult<()> {
        tree::encode_value(self, tag, value, true)
    }

    pub fn put_null(&mut self, tag: Tag) -> TlvResult<()> {
        self.write_element_head(&tag, ElementType::Null, 0)
    }

    pub fn put_bool(&mut self, tag: Tag, value: bool) -> TlvResult<()> {
        let element_type = if value {
            ElementType::BooleanTrue
        } else {
            ElementType::BooleanFalse
        };
        self.write_element_head(&tag, element_type, 0)
    }

    pub fn put_u8(&mut self, tag: Tag, value: u8) -> TlvResult<()> {
        self.put_unsigned(tag, value as u64, None)
    }

    pub fn put_u16(&mut self, tag: Tag, value: u16) -> TlvResult<()> {
        self.put_unsigned(tag, value as u64, None)
    }

    pub fn put_u32(&mut self, tag: Tag, value: u32) -> TlvResult<()> {
        self.put_unsigned(tag, value as u64, None)
    }

    pub fn put_u64(&mut self, tag: Tag, value: u64) -> TlvResult<()> {
        self.put_unsigned(tag, value, None)
    }

    pub fn put_i8(&mut self, tag: Tag, value: i8) -> TlvResult<()> {
        self.put_signed(tag, value as i64, None)
    }

    pub fn put_i16(&mut self, tag: Tag, value: i16) -> TlvResult<()> {
        self.put_signed(tag, value as i64, None)
    }

    pub fn put_i32(&mut self, tag: Tag, value: i32) -> TlvResult<()> {
        self.put_signed(tag, value as i64, None)
    }

    pub fn put_i64(&mut self, tag: Tag, value: i64) -> TlvResult<()> {
        self.put_signed(tag, value, None)
    }

    pub fn put_f32(&mut self, tag: Tag, value: f32) -> TlvResult<()> {
        self.write_element_head(&tag, ElementType::Float32, value.to_bits() as u64)
    }

    pub fn put_f64(&mut self, tag: Tag, value: f64) -> TlvResult<()> {
        self.write_element_head(&tag, ElementType::Float64, value.to_bits())
    }

    pub fn put_bytes(&mut self, tag: Tag, value: &[u8]) -> TlvResult<()> {
        let element_type = element::bytes_length_type(value.len());
        self.write_element_head(&tag, element_type, value.len() as u64)?;
        self.write_bytes(value)
    }

    pub fn put_string(&mut self, tag: Tag, value: &str) -> TlvResult<()> {
        let element_type = element::utf8_length_type(value.len());
        self.write_element_head(&tag, element_type, value.len() as u64)?;
        self.write_bytes(value.as_bytes())
    }

    /// Encode a formatted UTF-8 string element, streaming the rendered
    /// text straight into the sink. A measuring pass sizes the length
    /// prefix, so no intermediate `String` is materialized.
    pub fn put_string_fmt(&mut self, tag: Tag, args: fmt::Arguments<'_>) -> TlvResult<()> {
        use fmt::Write as _;

        struct LenCounter(usize);
        impl fmt::Write for LenCounter {
            fn write_str(&mut self, s: &str) -> fmt::Result {
                self.0 += s.len();
                Ok(())
            }
        }

        struct FmtSink<'w, 'a> {
            writer: &'w mut TlvWriter<'a>,
            err: Option<TlvError>,
        }
        impl fmt::Write for FmtSink<'_, '_> {
            fn write_str(&mut self, s: &str) -> fmt::Result {
                self.writer.write_bytes(s.as_bytes()).map_err(|e| {
                    self.err = Some(e);
                    fmt::Error
                })
            }
        }

        let mut counter = LenCounter(0);
        if counter.write_fmt(args).is_err() {
            return Err(TlvError::InvalidArgument(
                "format arguments failed to render".to_string(),
            ));
        }
        let len = counter.0;
        let element_type = element::utf8_length_type(len);
        self.write_element_head(&tag, element_type, len as u64)?;

        let mut sink = FmtSink {
            writer: self,
            err: None,
        };
        if sink.write_fmt(args).is_err() {
            return Err(sink.err.take().unwrap_or(TlvError::BufferTooSmall));
        }
        Ok(())
    }

    /// Open a container element; subsequent puts become its members until
    /// the matching `end_container`.
    pub fn start_container(
        &mut self,
        tag: Tag,
        container_type: TlvContainerType,
    ) -> TlvResult<()> {
        let element_type = container_element_type(container_type)?;
        self.write_element_head(&tag, element_type, 0)?;
        self.stack.push(container_type);
        Ok(())
    }

    /// Close the innermost open container with an end-of-container marker.
    pub fn end_container(&mut self) -> TlvResult<()> {
        if self.stack.is_empty() {
            return Err(TlvError::IncorrectState(
                "no container is open".to_string(),
            ));
        }
        self.write_bytes(&[ElementType::EndOfContainer as u8])?;
        self.stack.pop();
        Ok(())
    }

    /// Write a complete container in one scope: opens it, hands the writer
    /// to `f` for the members, closes it on the way out.
    pub fn put_container<F>(
        &mut self,
        tag: Tag,
        container_type: TlvContainerType,
        f: F,
    ) -> TlvResult<()>
    where
        F: FnOnce(&mut TlvWriter<'a>) -> TlvResult<()>,
    {
        self.start_container(tag, container_type)?;
        f(self)?;
        self.end_container()
    }

    /// Re-encode the element under `src`'s cursor, including, for a
    /// container, its full subtree, keeping the source tag. The source
    /// reader must be backed by a single contiguous buffer.
    pub fn copy_element(&mut self, src: &TlvReader<'_>) -> TlvResult<()> {
        let tag = src.tag().ok_or_else(|| {
            TlvError::IncorrectState("source reader is not positioned on an element".to_string())
        })?;
        self.copy_element_as(tag, src)
    }

    /// `copy_element` under a different tag. The outer head is re-encoded
    /// for this writer's implicit profile id; the body is copied verbatim.
    pub fn copy_element_as(&mut self, tag: Tag, src: &TlvReader<'_>) -> TlvResult<()> {
        let (buf, elem_start) = src.contiguous_element()?;
        let span = element::element_span(&buf[elem_start..], src.implicit_profile_id())?;
        let raw = &buf[elem_start..elem_start + span];
        let (head, head_len) = element::decode_head(raw, src.implicit_profile_id())?;
        self.write_element_head(&tag, head.element_type, head.len_or_val)?;
        self.write_bytes(&raw[head_len..])
    }

    /// Emit a container whose member bytes, including the terminating
    /// end-of-container marker, are already valid TLV, skipping
    /// member-by-member re-encoding.
    pub fn put_pre_encoded_container(
        &mut self,
        tag: Tag,
        container_type: TlvContainerType,
        body: &[u8],
    ) -> TlvResult<()> {
        let element_type = container_element_type(container_type)?;
        self.write_element_head(&tag, element_type, 0)?;
        self.write_bytes(body)
    }

    /// Bulk-copy the container under `src`'s cursor under a new tag.
    /// Contiguous sources only.
    pub fn copy_container(&mut self, tag: Tag, src: &TlvReader<'_>) -> TlvResult<()> {
        let (buf, elem_start) = src.contiguous_element()?;
        let (head, head_len) = element::decode_head(&buf[elem_start..], src.implicit_profile_id())?;
        let container_type = head
            .element_type
            .container_type()
            .ok_or(TlvError::WrongType)?;
        let span = element::element_span(&buf[elem_start..], src.implicit_profile_id())?;
        self.put_pre_encoded_container(
            tag,
            container_type,
            &buf[elem_start + head_len..elem_start + span],
        )
    }

    /// Complete the encoding: rejects with `ContainerOpen` while any
    /// container is unclosed, flushes the final chunk through the backing
    /// store, and returns the encoded length.
    pub fn finalize(self) -> TlvResult<usize> {
        let TlvWriter {
            sink,
            len_written,
            stack,
            ..
        } = self;
        if !stack.is_empty() {
            return Err(TlvError::ContainerOpen);
        }
        match sink {
            WriteSink::Slice { .. } => Ok(len_written),
            WriteSink::Store { store, chunk } => {
                store.finalize_buffer(chunk)?;
                Ok(len_written)
            }
        }
    }

    pub(crate) fn put_unsigned(
        &mut self,
        tag: Tag,
        value: u64,
        width: Option<ElementType>,
    ) -> TlvResult<()> {
        let element_type = width.unwrap_or_else(|| element::unsigned_element_type(value));
        self.write_element_head(&tag, element_type, value)
    }

    pub(crate) fn put_signed(
        &mut self,
        tag: Tag,
        value: i64,
        width: Option<ElementType>,
    ) -> TlvResult<()> {
        let element_type = width.unwrap_or_else(|| element::signed_element_type(value));
        self.write_element_head(&tag, element_type, value as u64)
    }

    fn write_element_head(
        &mut self,
        tag: &Tag,
        element_type: ElementType,
        len_or_val: u64,
    ) -> TlvResult<()> {
        element::check_tag_allowed(tag, self.container_type())?;
        let mut head = [0u8; element::MAX_HEAD_LEN];
        let n = element::encode_head(
            tag,
            element_type,
            len_or_val,
            self.implicit_profile_id,
            &mut head,
        );
        self.write_bytes(&head[..n])
    }

    fn write_bytes(&mut self, data: &[u8]) -> TlvResult<()> {
        if data.len() > self.max_len - self.len_written {
            return Err(TlvError::BufferTooSmall);
        }
        match &mut self.sink {
            WriteSink::Slice { buf, pos } => {
                if *pos + data.len() > buf.len() {
                    return Err(TlvError::BufferTooSmall);
                }
                buf[*pos..*pos + data.len()].copy_from_slice(data);
                *pos += data.len();
            }
            WriteSink::Store { store, chunk } => {
                let mut rest = data;
                while !rest.is_empty() {
                    let space = chunk.capacity() - chunk.len();
                    if space == 0 {
                        let filled = mem::take(chunk);
                        let fresh = store.next_write_buffer(filled)?;
                        if fresh.capacity() == fresh.len() {
                            return Err(TlvError::NoMemory(
                                "backing store returned no buffer space".to_string(),
                            ));
                        }
                        *chunk = fresh;
                        continue;
                    }
                    let n = space.min(rest.len());
                    chunk.extend_from_slice(&rest[..n]);
                    rest = &rest[n..];
                }
            }
        }
        self.len_written += data.len();
        Ok(())
    }
}

fn container_element_type(container_type: TlvContainerType) -> TlvResult<ElementType> {
    match container_type {
        TlvContainerType::Structure => Ok(ElementType::Structure),
        TlvContainerType::Array => Ok(ElementType::Array),
        TlvContainerType::List => Ok(ElementType::List),
        TlvContainerType::TopLevel => Err(TlvError::InvalidArgument(
            "top level is not a container element".to_string(),
        )),
    }
}
