//! Layerkit Core Library
//!
//! This crate provides the fundamental types and error handling for the
//! layerkit packet dissection and construction framework.

pub mod error;
pub mod types;
pub mod wire;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::MacAddr;
pub use wire::{Frame, FrameSink, FrameSource};
