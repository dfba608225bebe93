//! Identifier frame encoding and decoding.
//!
//! # Frame Format
//!
//! Each frame has a 4-byte big-endian header followed by raw identifiers:
//! ```text
//! [packet_id: 1 byte][count: 1 byte][timestamp: 2 bytes][identifier: 12 bytes] * count
//! ```
//!
//! The timestamp is the encoder's wall-clock time in seconds, modulo 65536.
//!
//! Decoding tolerates truncation: it returns every complete identifier it can
//! read, and callers compare [`Frame::recovered_count`] with the declared
//! count to detect loss.
//!
//! # Example
//!
//! ```
//! use epc_lora_framer::epc::Identifier;
//! use epc_lora_framer::frame::{FixedClock, Frame, FrameCodec};
//! use epc_lora_framer::lora::RadioConfig;
//!
//! let config = RadioConfig::new(12, 125, 1).unwrap();
//! let codec = FrameCodec::with_clock(&config, FixedClock(1_000));
//!
//! let id: Identifier = "E28011606000020000003039".parse().unwrap();
//! let bytes = codec.encode(&[id], 7).unwrap();
//! assert_eq!(bytes.len(), 16);
//!
//! let frame = Frame::from_bytes(&bytes).unwrap();
//! assert_eq!(frame.packet_id, 7);
//! assert_eq!(frame.identifiers, vec![id]);
//! ```

use super::clock::{Clock, SystemClock};
use crate::epc::{Identifier, IDENTIFIER_BYTES};
use crate::lora::{RadioConfig, HEADER_BYTES};
use std::fmt;

/// A frame of identifiers, either built for sending or recovered from bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Packet id (0-255, wraps around).
    pub packet_id: u8,
    /// Identifier count declared in the header.
    ///
    /// Only meaningful for decoded frames; [`Frame::to_bytes`] writes the
    /// length of `identifiers` instead.
    pub identifier_count: u8,
    /// Encoder time in seconds, modulo 65536.
    pub timestamp: u16,
    /// Identifiers in encode order.
    pub identifiers: Vec<Identifier>,
}

impl Frame {
    /// Serialized length in bytes.
    pub fn encoded_len(&self) -> usize {
        HEADER_BYTES + self.identifiers.len() * IDENTIFIER_BYTES
    }

    /// Serialize frame to bytes (header + identifiers).
    ///
    /// The header count is always the number of identifiers carried, so a
    /// re-serialized truncated frame stays self-consistent.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.push(self.packet_id);
        bytes.push(self.identifiers.len() as u8);
        bytes.extend_from_slice(&self.timestamp.to_be_bytes());
        for id in &self.identifiers {
            bytes.extend_from_slice(id.as_bytes());
        }
        bytes
    }

    /// Deserialize frame from bytes.
    ///
    /// Stops at the first incomplete identifier without failing; only input
    /// shorter than the header is an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < HEADER_BYTES {
            return Err(FrameError::TooShort { len: bytes.len() });
        }

        let packet_id = bytes[0];
        let identifier_count = bytes[1];
        let timestamp = u16::from_be_bytes([bytes[2], bytes[3]]);

        let identifiers: Vec<Identifier> = bytes[HEADER_BYTES..]
            .chunks_exact(IDENTIFIER_BYTES)
            .take(identifier_count as usize)
            .map(|chunk| {
                let mut raw = [0u8; IDENTIFIER_BYTES];
                raw.copy_from_slice(chunk);
                Identifier::from_bytes(raw)
            })
            .collect();

        if identifiers.len() < identifier_count as usize {
            log::warn!(
                "Frame {} truncated: {} of {} identifiers recovered",
                packet_id,
                identifiers.len(),
                identifier_count
            );
        }

        Ok(Self {
            packet_id,
            identifier_count,
            timestamp,
            identifiers,
        })
    }

    /// Number of identifiers actually present.
    pub fn recovered_count(&self) -> usize {
        self.identifiers.len()
    }

    /// True when every declared identifier was recovered.
    pub fn is_complete(&self) -> bool {
        self.identifiers.len() == self.identifier_count as usize
    }
}

/// Encodes identifier lists into frames sized for a radio configuration.
#[derive(Debug, Clone)]
pub struct FrameCodec<C = SystemClock> {
    capacity: usize,
    clock: C,
}

impl FrameCodec<SystemClock> {
    /// Create a codec stamping frames with the system clock.
    pub fn new(config: &RadioConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> FrameCodec<C> {
    /// Create a codec with a custom clock.
    pub fn with_clock(config: &RadioConfig, clock: C) -> Self {
        Self {
            capacity: config.max_identifiers_per_frame(),
            clock,
        }
    }

    /// Maximum identifiers per frame.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Build a frame for `ids`. `packet_id` wraps modulo 256.
    pub fn frame(&self, ids: &[Identifier], packet_id: u32) -> Result<Frame, FrameError> {
        if ids.len() > self.capacity {
            return Err(FrameError::CapacityExceeded {
                requested: ids.len(),
                capacity: self.capacity,
            });
        }

        Ok(Frame {
            packet_id: (packet_id % 256) as u8,
            // capacity is bounded by the 255-byte payload limit
            identifier_count: ids.len() as u8,
            timestamp: (self.clock.now_secs() % 65_536) as u16,
            identifiers: ids.to_vec(),
        })
    }

    /// Encode `ids` into one frame's bytes.
    pub fn encode(&self, ids: &[Identifier], packet_id: u32) -> Result<Vec<u8>, FrameError> {
        self.frame(ids, packet_id).map(|frame| frame.to_bytes())
    }

    /// Split `ids` across as many frames as needed.
    ///
    /// Packet ids count up from `first_packet_id`, wrapping at 256.
    pub fn encode_batch(
        &self,
        ids: &[Identifier],
        first_packet_id: u32,
    ) -> Result<Vec<Frame>, FrameError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if self.capacity == 0 {
            return Err(FrameError::CapacityExceeded {
                requested: ids.len(),
                capacity: 0,
            });
        }

        ids.chunks(self.capacity)
            .enumerate()
            .map(|(i, chunk)| self.frame(chunk, first_packet_id.wrapping_add(i as u32)))
            .collect()
    }
}

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// More identifiers than one frame can hold.
    CapacityExceeded { requested: usize, capacity: usize },
    /// Input is shorter than the frame header.
    TooShort { len: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                requested,
                capacity,
            } => write!(
                f,
                "frame capacity exceeded: {} identifiers (max {})",
                requested, capacity
            ),
            Self::TooShort { len } => write!(
                f,
                "frame too short: {} bytes (minimum: {})",
                len, HEADER_BYTES
            ),
        }
    }
}

impl std::error::Error for FrameError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FixedClock;

    fn id(s: &str) -> Identifier {
        s.parse().unwrap()
    }

    fn random_ids(n: usize) -> Vec<Identifier> {
        let mut rng = rand_core::OsRng;
        (0..n).map(|_| Identifier::random(&mut rng)).collect()
    }

    fn codec(sf: u8) -> FrameCodec<FixedClock> {
        let config = RadioConfig::new(sf, 125, 1).unwrap();
        FrameCodec::with_clock(&config, FixedClock(0x1_2345))
    }

    // ==================== Wire Format Tests ====================

    #[test]
    fn test_header_layout() {
        let bytes = codec(12).encode(&[id("E28011606000020000003039")], 300).unwrap();

        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[0], 44); // 300 mod 256
        assert_eq!(bytes[1], 1);
        assert_eq!(&bytes[2..4], &[0x23, 0x45]); // 0x12345 mod 65536
        assert_eq!(
            &bytes[4..],
            &[0xE2, 0x80, 0x11, 0x60, 0x60, 0x00, 0x02, 0x00, 0x00, 0x00, 0x30, 0x39]
        );
    }

    #[test]
    fn test_empty_frame() {
        let bytes = codec(12).encode(&[], 0).unwrap();
        assert_eq!(bytes.len(), HEADER_BYTES);

        let frame = Frame::from_bytes(&bytes).unwrap();
        assert_eq!(frame.identifier_count, 0);
        assert!(frame.identifiers.is_empty());
        assert!(frame.is_complete());
    }

    #[test]
    fn test_single_identifier_sf12_roundtrip() {
        let original = id("E28011606000020000003039");
        let bytes = codec(12).encode(&[original], 0).unwrap();
        let frame = Frame::from_bytes(&bytes).unwrap();

        assert_eq!(frame.identifier_count, 1);
        assert_eq!(frame.identifiers[0].to_string(), "E28011606000020000003039");
        assert_eq!(frame.timestamp, 0x2345);
    }

    #[test]
    fn test_roundtrip_every_sf_and_packet_id() {
        for sf in 7..=12 {
            let codec = codec(sf);
            let ids = random_ids(codec.capacity());
            for packet_id in [0u32, 1, 127, 255, 256, 1000] {
                let frame = Frame::from_bytes(&codec.encode(&ids, packet_id).unwrap()).unwrap();
                assert_eq!(frame.identifiers, ids);
                assert_eq!(frame.identifier_count as usize, ids.len());
                assert_eq!(frame.packet_id as u32, packet_id % 256);
            }
        }
    }

    // ==================== Capacity Tests ====================

    #[test]
    fn test_capacity_boundary() {
        let codec = codec(12);
        assert_eq!(codec.capacity(), 3);

        assert!(codec.encode(&random_ids(3), 0).is_ok());
        assert_eq!(
            codec.encode(&random_ids(4), 0),
            Err(FrameError::CapacityExceeded {
                requested: 4,
                capacity: 3
            })
        );
    }

    #[test]
    fn test_encoded_len_within_payload_limit() {
        for sf in 7..=12 {
            let config = RadioConfig::new(sf, 125, 1).unwrap();
            let codec = FrameCodec::new(&config);
            let frame = codec.frame(&random_ids(codec.capacity()), 0).unwrap();
            assert!(frame.encoded_len() <= config.max_payload_bytes());
            assert_eq!(frame.to_bytes().len(), frame.encoded_len());
        }
    }

    #[test]
    fn test_zero_capacity_codec() {
        let config = RadioConfig::builder().max_payload_override(10).build().unwrap();
        let codec = FrameCodec::with_clock(&config, FixedClock(0));
        assert_eq!(codec.capacity(), 0);
        assert!(codec.encode(&[], 0).is_ok());
        assert!(matches!(
            codec.encode_batch(&random_ids(1), 0),
            Err(FrameError::CapacityExceeded { capacity: 0, .. })
        ));
    }

    // ==================== Batch Tests ====================

    #[test]
    fn test_encode_batch_splits_by_capacity() {
        let ids = random_ids(10);
        let frames = codec(12).encode_batch(&ids, 254).unwrap();

        assert_eq!(frames.len(), 4);
        let counts: Vec<u8> = frames.iter().map(|f| f.identifier_count).collect();
        assert_eq!(counts, vec![3, 3, 3, 1]);
        let packet_ids: Vec<u8> = frames.iter().map(|f| f.packet_id).collect();
        assert_eq!(packet_ids, vec![254, 255, 0, 1]);

        let rejoined: Vec<Identifier> = frames.into_iter().flat_map(|f| f.identifiers).collect();
        assert_eq!(rejoined, ids);
    }

    #[test]
    fn test_encode_batch_empty() {
        assert!(codec(12).encode_batch(&[], 0).unwrap().is_empty());
    }

    // ==================== Decode Tests ====================

    #[test]
    fn test_decode_too_short() {
        assert_eq!(Frame::from_bytes(&[]), Err(FrameError::TooShort { len: 0 }));
        assert_eq!(
            Frame::from_bytes(&[1, 2, 3]),
            Err(FrameError::TooShort { len: 3 })
        );
    }

    #[test]
    fn test_decode_truncated_chunk() {
        let ids = random_ids(3);
        let mut bytes = codec(12).encode(&ids, 5).unwrap();
        bytes.pop();

        let frame = Frame::from_bytes(&bytes).unwrap();
        assert_eq!(frame.identifier_count, 3);
        assert_eq!(frame.recovered_count(), 2);
        assert!(!frame.is_complete());
        assert_eq!(frame.identifiers, &ids[..2]);
    }

    #[test]
    fn test_to_bytes_writes_carried_count() {
        let frame = Frame {
            packet_id: 3,
            identifier_count: 9,
            timestamp: 0,
            identifiers: vec![id("E28011606000020000003039")],
        };
        let bytes = frame.to_bytes();
        assert_eq!(bytes[1], 1);

        let decoded = Frame::from_bytes(&bytes).unwrap();
        assert!(decoded.is_complete());
        assert_eq!(decoded.identifiers, frame.identifiers);
    }

    #[test]
    fn test_codec_with_borrowed_clock() {
        let config = RadioConfig::new(12, 125, 1).unwrap();
        let clock = FixedClock(70_000);
        let codec = FrameCodec::with_clock(&config, &clock);

        let frame = codec.frame(&[id("E28011606000020000003039")], 0).unwrap();
        assert_eq!(frame.timestamp, (70_000 % 65_536) as u16);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let ids = random_ids(1);
        let mut bytes = codec(12).encode(&ids, 0).unwrap();
        bytes.extend_from_slice(&[0xAA; 12]);

        let frame = Frame::from_bytes(&bytes).unwrap();
        assert_eq!(frame.identifiers, ids);
        assert!(frame.is_complete());
    }
}
