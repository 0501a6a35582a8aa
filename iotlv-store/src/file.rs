//! File-backed TLV backing store

use bytes::{Bytes, BytesMut};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use iotlv_codec::TlvBackingStore;
use iotlv_core::TlvResult;

/// Backing store over a plain file, for persisted TLV records.
///
/// Reads hand the codec chunks of at most `chunk_size` bytes; writes go
/// straight through to the file as each chunk fills. All I/O is blocking
/// `std::io`; errors pass through as `TlvError::Io`.
pub struct FileBackingStore {
    file: File,
    chunk_size: usize,
}

impl FileBackingStore {
    /// Open an existing file for reading.
    pub fn open(path: impl AsRef<Path>, chunk_size: usize) -> TlvResult<Self> {
        let file = File::open(path.as_ref())?;
        log::debug!("file store: reading {}", path.as_ref().display());
        Ok(Self {
            file,
            chunk_size: chunk_size.max(1),
        })
    }

    /// Create (or truncate) a file for writing.
    pub fn create(path: impl AsRef<Path>, chunk_size: usize) -> TlvResult<Self> {
        let file = File::create(path.as_ref())?;
        log::debug!("file store: writing {}", path.as_ref().display());
        Ok(Self {
            file,
            chunk_size: chunk_size.max(1),
        })
    }

    fn read_chunk(&mut self) -> TlvResult<Bytes> {
        let mut buf = vec![0u8; self.chunk_size];
        let n = self.file.read(&mut buf)?;
        buf.truncate(n);
        Ok(Bytes::from(buf))
    }
}

impl TlvBackingStore for FileBackingStore {
    fn on_init_read(&mut self) -> TlvResult<Bytes> {
        self.read_chunk()
    }

    fn next_read_buffer(&mut self) -> TlvResult<Bytes> {
        let chunk = self.read_chunk()?;
        log::trace!("file store: read {} byte chunk", chunk.len());
        Ok(chunk)
    }

    fn on_init_write(&mut self) -> TlvResult<BytesMut> {
        Ok(BytesMut::with_capacity(self.chunk_size))
    }

    fn next_write_buffer(&mut self, filled: BytesMut) -> TlvResult<BytesMut> {
        self.file.write_all(&filled)?;
        log::trace!("file store: flushed {} byte chunk", filled.len());
        Ok(BytesMut::with_capacity(self.chunk_size))
    }

    fn finalize_buffer(&mut self, filled: BytesMut) -> TlvResult<()> {
        self.file.write_all(&filled)?;
        self.file.flush()?;
        Ok(())
    }
}
