//! Wire hand-off types
//!
//! The capture/transmit collaborator lives outside this workspace. These
//! traits define the whole-buffer, blocking hand-off it plugs into: inbound
//! frames (optionally timestamped) feed the dissector, and serialized packets
//! go out as `(bytes, interface)` pairs.

use crate::Result;
use std::time::SystemTime;

/// A raw frame received from, or destined for, the wire
#[derive(Debug, Clone)]
pub struct Frame {
    /// When the frame was captured/created
    pub timestamp: SystemTime,
    /// Interface the frame was received on
    pub interface: String,
    /// Frame data (including all headers)
    pub data: Vec<u8>,
}

impl Frame {
    /// Create a new frame stamped with the current time
    pub fn new(interface: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            interface: interface.into(),
            data,
        }
    }

    /// Get frame data as slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get frame length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the frame is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Source of inbound frames (capture side of the collaborator)
pub trait FrameSource {
    /// Block for the next frame; `Ok(None)` means the source is exhausted
    fn recv(&mut self) -> Result<Option<Frame>>;
}

/// Sink for outbound frames (transmit side of the collaborator)
pub trait FrameSink {
    /// Transmit one serialized packet on the given interface
    fn send(&mut self, data: &[u8], interface: &str) -> Result<()>;
}
