//! Pluggable byte source/sink abstraction
//!
//! A reader or writer binds to at most one backing store for its lifetime
//! and pulls/pushes whole chunks through it, so the same cursor code runs
//! over a single contiguous buffer, a chain of buffers, a file or a socket
//! without knowing the difference. Store methods may block on I/O; the
//! codec imposes no timeout and propagates store errors verbatim.

use bytes::{Bytes, BytesMut};
use iotlv_core::{TlvError, TlvResult};

/// Byte source/sink consumed by [`TlvReader`](crate::TlvReader) and
/// [`TlvWriter`](crate::TlvWriter).
///
/// The default method bodies fail with `IncorrectState` so a source-only
/// store implements just the read half and a sink-only store just the
/// write half.
pub trait TlvBackingStore {
    /// First chunk of input, called once when a reader binds to the store.
    fn on_init_read(&mut self) -> TlvResult<Bytes> {
        Err(TlvError::IncorrectState(
            "backing store is not readable".to_string(),
        ))
    }

    /// Next chunk of input. An empty chunk signals end of input.
    fn next_read_buffer(&mut self) -> TlvResult<Bytes> {
        Err(TlvError::IncorrectState(
            "backing store is not readable".to_string(),
        ))
    }

    /// Initial output buffer, called once when a writer binds to the store.
    /// The writer fills spare capacity without reallocating.
    fn on_init_write(&mut self) -> TlvResult<BytesMut> {
        Err(TlvError::IncorrectState(
            "backing store is not writable".to_string(),
        ))
    }

    /// Take ownership of the filled chunk and hand back fresh buffer space.
    /// Returning a buffer with no spare capacity signals allocation failure
    /// and surfaces as `NoMemory` from the writer.
    fn next_write_buffer(&mut self, filled: BytesMut) -> TlvResult<BytesMut> {
        let _ = filled;
        Err(TlvError::IncorrectState(
            "backing store is not writable".to_string(),
        ))
    }

    /// Record the final chunk and the end of the encoding, called once from
    /// `TlvWriter::finalize`.
    fn finalize_buffer(&mut self, filled: BytesMut) -> TlvResult<()> {
        let _ = filled;
        Err(TlvError::IncorrectState(
            "backing store is not writable".to_string(),
        ))
    }
}
