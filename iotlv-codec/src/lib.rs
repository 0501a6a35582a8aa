//! Streaming TLV codec for the IoT wire format
//!
//! Every element on the wire is `[control byte][tag bytes?][length-or-value
//! bytes?][payload bytes?]`. The control byte packs a 3-bit tag control and
//! a 5-bit element type; containers carry no length and are delimited by a
//! matching end-of-container marker. This crate provides:
//!
//! - the element-head codec ([`element`])
//! - the pluggable byte source/sink abstraction ([`TlvBackingStore`])
//! - the forward-only [`TlvReader`] and [`TlvWriter`]
//! - the in-place [`TlvUpdater`]
//! - the owned-tree codec ([`tree`]) and search/dump helpers ([`util`])

pub mod backing;
pub mod element;
pub mod reader;
pub mod tree;
pub mod updater;
pub mod util;
pub mod writer;

pub use backing::TlvBackingStore;
pub use reader::TlvReader;
pub use updater::TlvUpdater;
pub use writer::TlvWriter;
