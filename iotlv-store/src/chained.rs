//! Chained in-memory buffers as a TLV backing store

use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;

use iotlv_codec::TlvBackingStore;
use iotlv_core::TlvResult;

/// Default chunk capacity handed to writers, matching a typical radio
/// frame payload.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Backing store over a chain of in-memory buffers.
///
/// On the read side it hands out the queued chunks in order, which is how
/// a message reassembled from several link-layer frames reaches the codec
/// without being flattened first. On the write side it collects filled
/// fixed-size chunks; `into_bytes` flattens them once at the end.
pub struct ChainedBufferStore {
    pending: VecDeque<Bytes>,
    written: Vec<Bytes>,
    chunk_size: usize,
}

impl ChainedBufferStore {
    /// Read-side store over the given chunks, in order.
    pub fn from_chunks(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        Self {
            pending: chunks.into_iter().collect(),
            written: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Write-side store collecting chunks of `chunk_size` bytes.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            written: Vec::new(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Total bytes collected on the write side.
    pub fn written_len(&self) -> usize {
        self.written.iter().map(|c| c.len()).sum()
    }

    /// Flatten everything written into one contiguous buffer.
    pub fn into_bytes(self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.written_len());
        for chunk in &self.written {
            out.extend_from_slice(chunk);
        }
        out.freeze()
    }
}

impl TlvBackingStore for ChainedBufferStore {
    fn on_init_read(&mut self) -> TlvResult<Bytes> {
        Ok(self.pending.pop_front().unwrap_or_default())
    }

    fn next_read_buffer(&mut self) -> TlvResult<Bytes> {
        let chunk = self.pending.pop_front().unwrap_or_default();
        log::trace!("chained store: handing out {} byte chunk", chunk.len());
        Ok(chunk)
    }

    fn on_init_write(&mut self) -> TlvResult<BytesMut> {
        Ok(BytesMut::with_capacity(self.chunk_size))
    }

    fn next_write_buffer(&mut self, filled: BytesMut) -> TlvResult<BytesMut> {
        log::trace!("chained store: sealed {} byte chunk", filled.len());
        self.written.push(filled.freeze());
        Ok(BytesMut::with_capacity(self.chunk_size))
    }

    fn finalize_buffer(&mut self, filled: BytesMut) -> TlvResult<()> {
        if !filled.is_empty() {
            self.written.push(filled.freeze());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iotlv_codec::{TlvReader, TlvWriter};
    use iotlv_core::{Tag, TlvError, TlvValue};

    // { struct { ctx1: u8 7, ctx2: bool true } }
    const SCENARIO: [u8; 7] = [0x15, 0x24, 0x01, 0x07, 0x29, 0x02, 0x18];

    #[test]
    fn test_read_across_chunk_boundaries() {
        // Split mid-head and mid-element: every boundary must be invisible.
        for split in 1..SCENARIO.len() {
            let chunks = vec![
                Bytes::copy_from_slice(&SCENARIO[..split]),
                Bytes::copy_from_slice(&SCENARIO[split..]),
            ];
            let mut store = ChainedBufferStore::from_chunks(chunks);
            let mut reader = TlvReader::with_backing(&mut store, SCENARIO.len()).unwrap();
            assert!(reader.next().unwrap());
            reader.enter_container().unwrap();
            assert!(reader.next().unwrap());
            assert_eq!(reader.get_u8().unwrap(), 7, "split {}", split);
            assert!(reader.next().unwrap());
            assert!(reader.get_bool().unwrap());
            assert!(!reader.next().unwrap());
        }
    }

    #[test]
    fn test_byte_view_across_chunks_underruns() {
        // 4-byte string payload split across two chunks: borrowing fails,
        // copying succeeds.
        let encoded = [0x0C, 0x04, b'a', b'b', b'c', b'd'];
        let chunks = vec![
            Bytes::copy_from_slice(&encoded[..4]),
            Bytes::copy_from_slice(&encoded[4..]),
        ];
        let mut store = ChainedBufferStore::from_chunks(chunks);
        let mut reader = TlvReader::with_backing(&mut store, encoded.len()).unwrap();
        assert!(reader.next().unwrap());
        assert!(matches!(reader.get_byte_view(), Err(TlvError::Underrun)));
        assert_eq!(reader.get_string().unwrap(), "abcd");
    }

    #[test]
    fn test_write_through_small_chunks() {
        let mut store = ChainedBufferStore::with_chunk_size(2);
        let mut writer = TlvWriter::with_backing(&mut store, 64).unwrap();
        writer
            .put(
                Tag::Anonymous,
                &TlvValue::Structure(vec![
                    (Tag::Context(1), TlvValue::UInt8(7)),
                    (Tag::Context(2), TlvValue::Boolean(true)),
                ]),
            )
            .unwrap();
        let len = writer.finalize().unwrap();
        assert_eq!(len, SCENARIO.len());
        assert_eq!(&store.into_bytes()[..], &SCENARIO);
    }

    #[test]
    fn test_exhausted_chain_underruns() {
        let chunks = vec![Bytes::copy_from_slice(&SCENARIO[..3])];
        let mut store = ChainedBufferStore::from_chunks(chunks);
        let mut reader = TlvReader::with_backing(&mut store, SCENARIO.len()).unwrap();
        assert!(reader.next().unwrap());
        reader.enter_container().unwrap();
        assert!(matches!(reader.next(), Err(TlvError::Underrun)));
    }
}
