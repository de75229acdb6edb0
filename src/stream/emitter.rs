//! Host-side sender that fits output messages into datagrams.
//!
//! A message is sent as consecutive slices of at most `chunk_size` bytes.
//! When the transport rejects a slice as too large, the chunk size is halved
//! and the same offset is retried, so no byte is skipped or sent twice.

use std::{
    io,
    net::{SocketAddr, UdpSocket},
};

use crate::error::TransportError;

/// Largest chunk the emitter starts with.
pub const MAX_CHUNK_SIZE: usize = 8 * 1024;

#[cfg(any(target_os = "linux", target_os = "android"))]
const EMSGSIZE: i32 = 90;
#[cfg(windows)]
const EMSGSIZE: i32 = 10040;
#[cfg(not(any(target_os = "linux", target_os = "android", windows)))]
const EMSGSIZE: i32 = 40;

/// Something that sends one datagram at a time.
pub trait DatagramTransport {
    fn send_datagram(&self, payload: &[u8], target: SocketAddr) -> Result<(), TransportError>;
}

impl DatagramTransport for UdpSocket {
    fn send_datagram(&self, payload: &[u8], target: SocketAddr) -> Result<(), TransportError> {
        self.send_to(payload, target)
            .map(|_| ())
            .map_err(|e| TransportError::from_io(e, payload.len()))
    }
}

impl TransportError {
    /// Classify an OS error from a datagram send.
    pub fn from_io(e: io::Error, size: usize) -> Self {
        if e.raw_os_error() == Some(EMSGSIZE) {
            Self::MessageTooLarge { size }
        } else {
            Self::Other(e)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitReport {
    pub datagrams: usize,
    pub bytes: usize,
    /// Chunk size in effect when the message finished.
    pub chunk_size: usize,
}

pub struct ChunkedEmitter<T> {
    transport: T,
    max_chunk_size: usize,
}

impl<T: DatagramTransport> ChunkedEmitter<T> {
    pub fn new(transport: T) -> Self {
        Self::with_max_chunk_size(transport, MAX_CHUNK_SIZE)
    }

    /// `max_chunk_size` is clamped to `1..=MAX_CHUNK_SIZE`.
    pub fn with_max_chunk_size(transport: T, max_chunk_size: usize) -> Self {
        Self {
            transport,
            max_chunk_size: max_chunk_size.clamp(1, MAX_CHUNK_SIZE),
        }
    }

    pub const fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `message` to `target` as one or more datagrams, in order.
    pub fn emit(&self, message: &[u8], target: SocketAddr) -> Result<EmitReport, TransportError> {
        let mut chunk_size = self.max_chunk_size;
        let mut offset: usize = 0;
        let mut datagrams = 0;

        loop {
            let end = message.len().min(offset.saturating_add(chunk_size));
            let part = &message[offset..end];
            if part.is_empty() {
                return Ok(EmitReport {
                    datagrams,
                    bytes: offset,
                    chunk_size,
                });
            }

            match self.transport.send_datagram(part, target) {
                Ok(()) => {
                    offset = end;
                    datagrams += 1;
                }
                Err(TransportError::MessageTooLarge { size }) => {
                    chunk_size /= 2;
                    tracing::debug!("{size} byte datagram rejected, chunk size now {chunk_size}");
                    if chunk_size == 0 {
                        return Err(TransportError::ChunkSizeExhausted { offset });
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
