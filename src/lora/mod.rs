//! LoRa physical-layer model.
//!
//! This module contains:
//! - [`config`]: Region settings, payload limits and the validated radio configuration
//! - [`airtime`]: Time-on-air calculation for a single frame
//! - [`duty_cycle`]: Daily airtime budget planning under a duty cycle cap

mod airtime;
mod config;
mod duty_cycle;

pub use airtime::{frame_duration_ms, payload_symbol_count, symbol_duration_ms, AirtimeParameters};
pub use config::{
    PayloadTable, RadioConfig, RadioConfigBuilder, RadioConfigError, Region, BANDWIDTHS_KHZ,
    HEADER_BYTES, LOW_DATA_RATE_MIN_SF, MAX_SPREADING_FACTOR, MIN_SPREADING_FACTOR,
    PREAMBLE_LENGTH, TX_POWER,
};
pub use duty_cycle::{
    DailyLimit, DutyCyclePlanner, PlanError, TransmissionPlan, DAY_MS,
    DEFAULT_DUTY_CYCLE_FRACTION,
};
