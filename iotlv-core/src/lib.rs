//! Core types and utilities for the IoT TLV wire codec
//!
//! This crate provides the fundamental types, error handling, and the owned
//! data tree used throughout the TLV codec implementation.

pub mod error;
pub mod tag;
pub mod types;
pub mod value;

pub use error::{TlvError, TlvResult};
pub use tag::Tag;
pub use types::{TlvContainerType, TlvType};
pub use value::TlvValue;
