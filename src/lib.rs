//! RFID identifier batching for LoRa links.
//!
//! Compresses identifier lists by common-prefix grouping, packs them into
//! frames that respect the LoRa payload limit, and works out how much of the
//! regulatory duty cycle each batch consumes. Everything here is pure
//! computation apart from the frame timestamp, which comes from an injectable
//! [`frame::Clock`].

pub mod epc;
pub mod error;
pub mod frame;
pub mod lora;
pub mod pipeline;
pub mod sink;
pub mod transport;

// Re-export commonly used items
pub use epc::{optimize, reconstruct, Group, Identifier};
pub use error::Error;
pub use frame::{Frame, FrameCodec};
pub use lora::{AirtimeParameters, DutyCyclePlanner, RadioConfig, Region, TransmissionPlan};
pub use pipeline::Pipeline;
pub use sink::{JsonLinesSink, Sink};
pub use transport::{Transport, TransportError};
