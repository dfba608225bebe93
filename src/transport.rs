//! Frame transport seam.
//!
//! The radio link itself lives outside this crate. Frames are handed to a
//! [`Transport`] in the order they were produced; nothing here retries or
//! paces transmissions.

use log::info;
use std::fmt;
use std::io;

/// Something that can put a finished frame on the air.
pub trait Transport {
    /// Send one complete frame.
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        (**self).send(frame)
    }
}

/// Keeps every sent frame in memory.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Vec<Vec<u8>>,
    closed: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames sent so far, oldest first.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Refuse further frames.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.sent.push(frame.to_vec());
        Ok(())
    }
}

/// Logs frames instead of transmitting them (dry run).
#[derive(Debug, Default)]
pub struct LogTransport {
    frames: usize,
    bytes: usize,
}

impl LogTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames logged.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Total bytes logged.
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Transport for LogTransport {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.frames += 1;
        self.bytes += frame.len();
        info!(
            "TX #{} ({} bytes): {}",
            self.frames,
            frame.len(),
            hex::encode_upper(frame)
        );
        Ok(())
    }
}

/// Errors reported by a transport.
#[derive(Debug)]
pub enum TransportError {
    /// Underlying device I/O failed.
    Io(io::Error),
    /// The radio refused the frame.
    Rejected(String),
    /// Transport is closed.
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "transport I/O error: {}", e),
            Self::Rejected(reason) => write!(f, "frame rejected: {}", reason),
            Self::Closed => write!(f, "transport closed"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
