//! Backing-store implementations for the IoT TLV codec
//!
//! Concrete byte sources and sinks behind the
//! [`TlvBackingStore`](iotlv_codec::TlvBackingStore) contract: chained
//! in-memory buffers and plain files. The codec crates stay free of I/O;
//! everything that can block lives here.

pub mod chained;
pub mod file;

pub use chained::ChainedBufferStore;
pub use file::FileBackingStore;
