//! Frame wire format.
//!
//! This module contains:
//! - [`codec`]: Frame layout, encoder and truncation-tolerant decoder
//! - [`clock`]: Injectable time source for frame timestamps

mod clock;
mod codec;

pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{Frame, FrameCodec, FrameError};
