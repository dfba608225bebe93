//! LoRa time-on-air calculation.
//!
//! Calculates the transmission duration of one frame from its payload size
//! and the modulation parameters in a [`RadioConfig`]. All durations are in
//! milliseconds.
//!
//! # Example
//!
//! ```
//! use epc_lora_framer::lora::{AirtimeParameters, RadioConfig};
//!
//! let config = RadioConfig::new(12, 125, 1).unwrap();
//! let airtime = AirtimeParameters::calculate(&config, 16);
//! println!("16-byte frame takes {:.2} ms", airtime.frame_duration_ms);
//! assert_eq!(airtime.payload_symbol_count, 23);
//! ```

use super::config::RadioConfig;

/// Extra preamble symbols added by the modem (sync word and SFD).
const PREAMBLE_OVERHEAD_SYMBOLS: f64 = 4.25;

/// Fixed symbols at the start of every payload.
const PAYLOAD_BASE_SYMBOLS: u32 = 8;

/// Timing figures for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirtimeParameters {
    pub symbol_duration_ms: f64,
    pub preamble_duration_ms: f64,
    pub payload_symbol_count: u32,
    pub payload_duration_ms: f64,
    pub frame_duration_ms: f64,
    /// Identifiers that fit in one frame under this configuration.
    pub identifiers_per_frame_capacity: usize,
}

impl AirtimeParameters {
    /// Compute frame timing for a payload of `payload_bytes`.
    pub fn calculate(config: &RadioConfig, payload_bytes: usize) -> Self {
        let symbol_duration_ms = symbol_duration_ms(config);

        // Preamble duration: (preamble_symbols + 4.25) * symbol_duration
        let preamble = config.preamble_symbols() as f64;
        let preamble_duration_ms = (preamble + PREAMBLE_OVERHEAD_SYMBOLS) * symbol_duration_ms;

        let payload_symbol_count = payload_symbol_count(config, payload_bytes);
        let payload_duration_ms = payload_symbol_count as f64 * symbol_duration_ms;

        Self {
            symbol_duration_ms,
            preamble_duration_ms,
            payload_symbol_count,
            payload_duration_ms,
            frame_duration_ms: preamble_duration_ms + payload_duration_ms,
            identifiers_per_frame_capacity: config.max_identifiers_per_frame(),
        }
    }

    /// Frame duration in seconds.
    pub fn frame_duration_s(&self) -> f64 {
        self.frame_duration_ms / 1000.0
    }
}

/// Symbol duration in milliseconds: 2^SF / BW.
pub fn symbol_duration_ms(config: &RadioConfig) -> f64 {
    let chips = (1u64 << config.spreading_factor()) as f64;
    let bw_hz = config.bandwidth_khz() as f64 * 1000.0;
    1000.0 * chips / bw_hz
}

/// Number of payload symbols for `payload_bytes`.
///
/// `8 + max(0, ceil((8*PL - 4*SF + 28 + 16 - 20*DE) / (4*(SF - 2*DE))) * (CR + 4))`
pub fn payload_symbol_count(config: &RadioConfig, payload_bytes: usize) -> u32 {
    let sf = config.spreading_factor() as i64;
    let de = if config.low_data_rate_optimize() { 1 } else { 0 };
    let cr = config.coding_rate() as i64;

    let numerator = 8 * payload_bytes as i64 - 4 * sf + 28 + 16 - 20 * de;
    // SF >= 7 keeps this positive
    let denominator = 4 * (sf - 2 * de);

    let blocks = if numerator <= 0 {
        0
    } else {
        (numerator + denominator - 1) / denominator
    };

    PAYLOAD_BASE_SYMBOLS + (blocks * (cr + 4)) as u32
}

/// Frame duration in milliseconds (convenience wrapper).
pub fn frame_duration_ms(config: &RadioConfig, payload_bytes: usize) -> f64 {
    AirtimeParameters::calculate(config, payload_bytes).frame_duration_ms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(sf: u8, bw: u32) -> RadioConfig {
        RadioConfig::new(sf, bw, 1).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    // ==================== Symbol Timing Tests ====================

    #[test]
    fn test_symbol_duration_sf7_125khz() {
        // 2^7 / 125000 = 1.024 ms
        assert!(approx(symbol_duration_ms(&config(7, 125)), 1.024));
    }

    #[test]
    fn test_symbol_duration_sf12_125khz() {
        // 2^12 / 125000 = 32.768 ms
        assert!(approx(symbol_duration_ms(&config(12, 125)), 32.768));
    }

    #[test]
    fn test_symbol_duration_sf7_500khz() {
        assert!(approx(symbol_duration_ms(&config(7, 500)), 0.256));
    }

    #[test]
    fn test_preamble_is_12_25_symbols() {
        let params = AirtimeParameters::calculate(&config(12, 125), 0);
        assert!(approx(params.preamble_duration_ms, 12.25 * 32.768));
    }

    // ==================== Payload Symbol Tests ====================

    #[test]
    fn test_single_identifier_frame_sf12() {
        // 16 bytes, DE=1: ceil(104 / 40) = 3 blocks * 5 + 8
        let params = AirtimeParameters::calculate(&config(12, 125), 16);
        assert_eq!(params.payload_symbol_count, 23);
        assert!(approx(params.payload_duration_ms, 23.0 * 32.768));
        assert!(approx(params.frame_duration_ms, 1155.072));
        assert_eq!(params.identifiers_per_frame_capacity, 3);
    }

    #[test]
    fn test_full_frame_sf7() {
        // 51 bytes, DE=0: ceil(424 / 20) = 22 blocks * 5 + 8
        assert_eq!(payload_symbol_count(&config(7, 125), 51), 118);
    }

    #[test]
    fn test_empty_payload_sf7() {
        // numerator 16 > 0: one block
        assert_eq!(payload_symbol_count(&config(7, 125), 0), 13);
    }

    #[test]
    fn test_negative_numerator_clamps_to_base() {
        // SF12, DE=1: 0 - 48 + 44 - 20 = -24
        assert_eq!(payload_symbol_count(&config(12, 125), 0), 8);
    }

    #[test]
    fn test_coding_rate_scales_blocks() {
        let cr1 = RadioConfig::new(9, 125, 1).unwrap();
        let cr4 = RadioConfig::new(9, 125, 4).unwrap();
        // 20 bytes: ceil((160 - 36 + 44) / 36) = 5 blocks
        assert_eq!(payload_symbol_count(&cr1, 20), 8 + 5 * 5);
        assert_eq!(payload_symbol_count(&cr4, 20), 8 + 5 * 8);
    }

    // ==================== Monotonicity Tests ====================

    #[test]
    fn test_airtime_increases_with_payload() {
        let config = config(7, 125);
        let airtime_10 = frame_duration_ms(&config, 10);
        let airtime_50 = frame_duration_ms(&config, 50);
        let airtime_100 = frame_duration_ms(&config, 100);

        assert!(
            airtime_50 > airtime_10,
            "Larger payload should take longer: {} > {}",
            airtime_50,
            airtime_10
        );
        assert!(airtime_100 > airtime_50);
    }

    #[test]
    fn test_airtime_strictly_increases_with_sf() {
        for payload in [0, 16, 51, 100, 222] {
            for bw in [125, 250, 500] {
                let mut previous = 0.0;
                for sf in 7..=12 {
                    let airtime = frame_duration_ms(&config(sf, bw), payload);
                    assert!(
                        airtime > previous,
                        "Higher SF should take longer: SF{} {:.3} ms <= {:.3} ms ({} bytes, {} kHz)",
                        sf,
                        airtime,
                        previous,
                        payload,
                        bw
                    );
                    previous = airtime;
                }
            }
        }
    }

    #[test]
    fn test_airtime_decreases_with_bandwidth() {
        let airtime_125k = frame_duration_ms(&config(9, 125), 50);
        let airtime_250k = frame_duration_ms(&config(9, 250), 50);
        let airtime_500k = frame_duration_ms(&config(9, 500), 50);

        assert!(airtime_125k > airtime_250k, "Higher bandwidth should be faster");
        assert!(airtime_250k > airtime_500k, "Higher bandwidth should be faster");
    }

    #[test]
    fn test_seconds_conversion() {
        let params = AirtimeParameters::calculate(&config(12, 125), 16);
        assert!(approx(params.frame_duration_s(), 1.155072));
    }
}
