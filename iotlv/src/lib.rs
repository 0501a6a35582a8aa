//! iotlv - streaming TLV wire codec for IoT device connectivity
//!
//! The compact, self-describing Tag-Length-Value binary encoding carried by
//! every message, attribute, event and persisted record in the stack:
//! forward-only reader and writer with constant extra memory, an in-place
//! updater for editing pre-encoded blobs, and a pluggable backing-store
//! abstraction so the same codec runs over a contiguous buffer, a chain of
//! frame-sized buffers, or a file.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `iotlv-core`: Core types, error handling, and the owned value tree
//! - `iotlv-codec`: Element-head codec, reader, writer, updater, utilities
//! - `iotlv-store`: Backing-store implementations (buffer chains, files)
//!
//! # Usage
//!
//! ```
//! use iotlv::{Tag, TlvContainerType, TlvReader, TlvWriter};
//!
//! let mut buf = [0u8; 32];
//! let mut writer = TlvWriter::new(&mut buf);
//! writer
//!     .put_container(Tag::Anonymous, TlvContainerType::Structure, |w| {
//!         w.put_u8(Tag::Context(1), 7)?;
//!         w.put_bool(Tag::Context(2), true)
//!     })
//!     .unwrap();
//! let len = writer.finalize().unwrap();
//!
//! let mut reader = TlvReader::new(&buf[..len]);
//! assert!(reader.next().unwrap());
//! reader.enter_container().unwrap();
//! assert!(reader.next().unwrap());
//! assert_eq!(reader.get_u8().unwrap(), 7);
//! ```

// Re-export core types
pub use iotlv_core::{Tag, TlvContainerType, TlvError, TlvResult, TlvType, TlvValue};

// Re-export the codec
pub use iotlv_codec::{TlvBackingStore, TlvReader, TlvUpdater, TlvWriter};

// Re-export the codec submodules for direct access
pub mod codec {
    pub use iotlv_codec::*;
}

// Re-export backing stores
pub mod store {
    pub use iotlv_store::*;
}
