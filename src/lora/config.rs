//! LoRa radio configuration.
//!
//! Region-specific settings plus the validated [`RadioConfig`] every airtime,
//! framing and planning call takes. The per-SF payload limits come from the
//! LoRaWAN regional parameters (application payload column, no dwell-time
//! restriction) and can be replaced with a custom [`PayloadTable`].
//!
//! # Example
//!
//! ```
//! use epc_lora_framer::lora::{RadioConfig, Region};
//!
//! let config = RadioConfig::builder()
//!     .spreading_factor(12)
//!     .bandwidth_khz(125)
//!     .coding_rate(1)
//!     .region(Region::Eu868)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.max_payload_bytes(), 51);
//! assert_eq!(config.max_identifiers_per_frame(), 3);
//! ```

use crate::epc::IDENTIFIER_BYTES;
use std::fmt;

/// Frequency band region.
///
/// Determines the operating frequency, duty cycle limit and payload limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// EU 863-870 MHz band (1% duty cycle)
    Eu868,
    /// US 902-928 MHz band (more relaxed duty cycle)
    Us915,
    /// Australia 915-928 MHz
    Au915,
    /// Asia 920-923 MHz
    As923,
}

impl Region {
    /// Get the operating frequency for this region in Hz.
    pub fn frequency(self) -> u32 {
        match self {
            Self::Eu868 => 868_100_000,
            Self::Us915 => 915_000_000,
            Self::Au915 => 915_000_000,
            Self::As923 => 923_200_000,
        }
    }

    /// Get the duty cycle limit for this region (percentage).
    pub fn duty_cycle_percent(self) -> f64 {
        match self {
            Self::Eu868 => 1.0,
            Self::Us915 => 10.0,
            Self::Au915 => 10.0,
            Self::As923 => 1.0,
        }
    }

    /// Maximum application payload per spreading factor.
    pub fn payload_table(self) -> PayloadTable {
        // Indexed SF7..=SF12
        match self {
            Self::Eu868 => PayloadTable::new([222, 222, 115, 51, 51, 51]),
            // SF11/SF12 are not allowed for 125 kHz uplinks
            Self::Us915 => PayloadTable::new([242, 125, 53, 11, 0, 0]),
            Self::Au915 => PayloadTable::new([242, 242, 115, 51, 51, 51]),
            Self::As923 => PayloadTable::new([242, 242, 115, 115, 51, 51]),
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        #[cfg(feature = "region-us915")]
        return Self::Us915;
        #[cfg(feature = "region-au915")]
        return Self::Au915;
        #[cfg(feature = "region-as923")]
        return Self::As923;
        #[cfg(not(any(
            feature = "region-us915",
            feature = "region-au915",
            feature = "region-as923"
        )))]
        Self::Eu868
    }
}

impl std::str::FromStr for Region {
    type Err = RadioConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eu868" => Ok(Self::Eu868),
            "us915" => Ok(Self::Us915),
            "au915" => Ok(Self::Au915),
            "as923" => Ok(Self::As923),
            _ => Err(RadioConfigError::UnknownRegion(s.to_string())),
        }
    }
}

// ==================== Standard LoRa Parameters ====================

/// Lowest supported spreading factor.
pub const MIN_SPREADING_FACTOR: u8 = 7;

/// Highest supported spreading factor.
pub const MAX_SPREADING_FACTOR: u8 = 12;

/// Supported bandwidths in kHz.
pub const BANDWIDTHS_KHZ: [u32; 3] = [125, 250, 500];

/// Preamble length in symbols.
pub const PREAMBLE_LENGTH: u16 = 8;

/// TX power in dBm.
pub const TX_POWER: i8 = 14;

/// Frame header size in bytes (packet id, count, timestamp).
pub const HEADER_BYTES: usize = 4;

/// Spreading factor from which low data rate optimization is applied.
pub const LOW_DATA_RATE_MIN_SF: u8 = 11;

/// Maximum payload size per spreading factor (SF7..=SF12).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadTable([usize; 6]);

impl PayloadTable {
    /// Create a table from limits for SF7 through SF12.
    pub const fn new(limits: [usize; 6]) -> Self {
        Self(limits)
    }

    /// Payload limit for `sf`, or `None` outside SF7..=SF12.
    pub fn max_payload(&self, sf: u8) -> Option<usize> {
        if !(MIN_SPREADING_FACTOR..=MAX_SPREADING_FACTOR).contains(&sf) {
            return None;
        }
        Some(self.0[(sf - MIN_SPREADING_FACTOR) as usize])
    }
}

impl Default for PayloadTable {
    fn default() -> Self {
        Region::default().payload_table()
    }
}

/// Validated LoRa modulation and framing parameters.
///
/// Built through [`RadioConfig::builder`] or [`RadioConfig::new`]; the derived
/// payload and capacity limits are computed once at build time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadioConfig {
    spreading_factor: u8,
    bandwidth_khz: u32,
    coding_rate: u8,
    preamble_symbols: u16,
    region: Region,
    frequency_hz: u32,
    tx_power_dbm: i8,
    max_payload_bytes: usize,
}

impl RadioConfig {
    /// Build a configuration for the default region.
    pub fn new(
        spreading_factor: u8,
        bandwidth_khz: u32,
        coding_rate: u8,
    ) -> Result<Self, RadioConfigError> {
        Self::builder()
            .spreading_factor(spreading_factor)
            .bandwidth_khz(bandwidth_khz)
            .coding_rate(coding_rate)
            .build()
    }

    /// Start a configuration from defaults (SF12, 125 kHz, 4/5).
    pub fn builder() -> RadioConfigBuilder {
        RadioConfigBuilder::default()
    }

    /// Spreading factor (7-12).
    pub fn spreading_factor(&self) -> u8 {
        self.spreading_factor
    }

    /// Bandwidth in kHz.
    pub fn bandwidth_khz(&self) -> u32 {
        self.bandwidth_khz
    }

    /// Coding rate index (1-4 for 4/5 to 4/8).
    pub fn coding_rate(&self) -> u8 {
        self.coding_rate
    }

    /// Preamble length in symbols.
    pub fn preamble_symbols(&self) -> u16 {
        self.preamble_symbols
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Carrier frequency in Hz.
    pub fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    pub fn tx_power_dbm(&self) -> i8 {
        self.tx_power_dbm
    }

    /// Largest payload one frame may carry, in bytes.
    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    /// Frame header size in bytes.
    pub fn header_bytes(&self) -> usize {
        HEADER_BYTES
    }

    /// Raw identifier size in bytes.
    pub fn identifier_bytes(&self) -> usize {
        IDENTIFIER_BYTES
    }

    /// How many identifiers fit in one frame after the header.
    pub fn max_identifiers_per_frame(&self) -> usize {
        self.max_payload_bytes.saturating_sub(HEADER_BYTES) / IDENTIFIER_BYTES
    }

    /// Whether low data rate optimization applies.
    pub fn low_data_rate_optimize(&self) -> bool {
        self.spreading_factor >= LOW_DATA_RATE_MIN_SF
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        let region = Region::default();
        Self {
            spreading_factor: MAX_SPREADING_FACTOR,
            bandwidth_khz: 125,
            coding_rate: 1,
            preamble_symbols: PREAMBLE_LENGTH,
            region,
            frequency_hz: region.frequency(),
            tx_power_dbm: TX_POWER,
            max_payload_bytes: region.payload_table().0[5],
        }
    }
}

impl fmt::Display for RadioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SF{} BW{}kHz CR4/{} ({:?}, max payload {} bytes, {} identifiers/frame)",
            self.spreading_factor,
            self.bandwidth_khz,
            self.coding_rate + 4,
            self.region,
            self.max_payload_bytes,
            self.max_identifiers_per_frame()
        )
    }
}

/// Builder for [`RadioConfig`].
#[derive(Debug, Clone)]
pub struct RadioConfigBuilder {
    spreading_factor: u8,
    bandwidth_khz: u32,
    coding_rate: u8,
    preamble_symbols: u16,
    region: Region,
    payload_table: Option<PayloadTable>,
    max_payload_override: Option<usize>,
    frequency_hz: Option<u32>,
    tx_power_dbm: i8,
}

impl Default for RadioConfigBuilder {
    fn default() -> Self {
        Self {
            spreading_factor: MAX_SPREADING_FACTOR,
            bandwidth_khz: 125,
            coding_rate: 1,
            preamble_symbols: PREAMBLE_LENGTH,
            region: Region::default(),
            payload_table: None,
            max_payload_override: None,
            frequency_hz: None,
            tx_power_dbm: TX_POWER,
        }
    }
}

impl RadioConfigBuilder {
    pub fn spreading_factor(mut self, sf: u8) -> Self {
        self.spreading_factor = sf;
        self
    }

    pub fn bandwidth_khz(mut self, bw: u32) -> Self {
        self.bandwidth_khz = bw;
        self
    }

    /// Coding rate index: 1 = 4/5 ... 4 = 4/8.
    pub fn coding_rate(mut self, cr: u8) -> Self {
        self.coding_rate = cr;
        self
    }

    pub fn preamble_symbols(mut self, symbols: u16) -> Self {
        self.preamble_symbols = symbols;
        self
    }

    /// Region for frequency and default payload limits.
    pub fn region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Replace the region's payload limits.
    pub fn payload_table(mut self, table: PayloadTable) -> Self {
        self.payload_table = Some(table);
        self
    }

    /// Fix the payload limit regardless of spreading factor.
    pub fn max_payload_override(mut self, bytes: usize) -> Self {
        self.max_payload_override = Some(bytes);
        self
    }

    pub fn frequency_hz(mut self, hz: u32) -> Self {
        self.frequency_hz = Some(hz);
        self
    }

    pub fn tx_power_dbm(mut self, dbm: i8) -> Self {
        self.tx_power_dbm = dbm;
        self
    }

    /// Validate and derive the payload limit.
    pub fn build(self) -> Result<RadioConfig, RadioConfigError> {
        let sf = self.spreading_factor;
        if !(MIN_SPREADING_FACTOR..=MAX_SPREADING_FACTOR).contains(&sf) {
            return Err(RadioConfigError::SpreadingFactor(sf));
        }
        if !BANDWIDTHS_KHZ.contains(&self.bandwidth_khz) {
            return Err(RadioConfigError::Bandwidth(self.bandwidth_khz));
        }
        if !(1..=4).contains(&self.coding_rate) {
            return Err(RadioConfigError::CodingRate(self.coding_rate));
        }
        if self.preamble_symbols == 0 {
            return Err(RadioConfigError::Preamble(self.preamble_symbols));
        }

        let table = self
            .payload_table
            .unwrap_or_else(|| self.region.payload_table());
        let max_payload_bytes = match self.max_payload_override {
            Some(bytes) => bytes,
            None => table
                .max_payload(sf)
                .ok_or(RadioConfigError::SpreadingFactor(sf))?,
        };
        if max_payload_bytes > u8::MAX as usize {
            return Err(RadioConfigError::PayloadTooLarge(max_payload_bytes));
        }

        Ok(RadioConfig {
            spreading_factor: sf,
            bandwidth_khz: self.bandwidth_khz,
            coding_rate: self.coding_rate,
            preamble_symbols: self.preamble_symbols,
            region: self.region,
            frequency_hz: self.frequency_hz.unwrap_or_else(|| self.region.frequency()),
            tx_power_dbm: self.tx_power_dbm,
            max_payload_bytes,
        })
    }
}

/// Errors that can occur when building a radio configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioConfigError {
    /// Spreading factor outside 7-12.
    SpreadingFactor(u8),
    /// Bandwidth not one of 125/250/500 kHz.
    Bandwidth(u32),
    /// Coding rate index outside 1-4.
    CodingRate(u8),
    /// Preamble must have at least one symbol.
    Preamble(u16),
    /// Payload limit exceeds the LoRa PHY maximum of 255 bytes.
    PayloadTooLarge(usize),
    /// Unknown region name.
    UnknownRegion(String),
}

impl fmt::Display for RadioConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpreadingFactor(sf) => write!(
                f,
                "invalid radio config: spreading factor {} (expected {}-{})",
                sf, MIN_SPREADING_FACTOR, MAX_SPREADING_FACTOR
            ),
            Self::Bandwidth(bw) => write!(
                f,
                "invalid radio config: bandwidth {} kHz (expected 125, 250 or 500)",
                bw
            ),
            Self::CodingRate(cr) => {
                write!(f, "invalid radio config: coding rate {} (expected 1-4)", cr)
            }
            Self::Preamble(n) => write!(f, "invalid radio config: preamble of {} symbols", n),
            Self::PayloadTooLarge(n) => {
                write!(f, "invalid radio config: payload limit {} bytes (max 255)", n)
            }
            Self::UnknownRegion(name) => write!(f, "invalid radio config: unknown region {}", name),
        }
    }
}

impl std::error::Error for RadioConfigError {}
