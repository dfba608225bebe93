//! Duty cycle planning for identifier batches.
//!
//! Regulators cap the fraction of time a device may transmit (1% per day in
//! the EU 868 MHz sub-bands). Given how many identifiers make up a batch, the
//! planner works out how many frames the batch needs, how long it occupies
//! the channel, and how many such batches fit in one day's airtime budget.
//!
//! # Example
//!
//! ```
//! use epc_lora_framer::lora::{DailyLimit, DutyCyclePlanner, RadioConfig};
//!
//! let config = RadioConfig::new(12, 125, 1).unwrap();
//! let planner = DutyCyclePlanner::default(); // 1%
//!
//! let plan = planner.plan(500, &config).unwrap();
//! assert_eq!(plan.frames_needed, 167);
//! assert_eq!(plan.max_batches_per_day, DailyLimit::Limited(2));
//! ```

use super::airtime::AirtimeParameters;
use super::config::{RadioConfig, Region};
use std::fmt;

/// Milliseconds in one day.
pub const DAY_MS: f64 = 86_400_000.0;

/// Default duty cycle (1%, EU 868 MHz).
pub const DEFAULT_DUTY_CYCLE_FRACTION: f64 = 0.01;

/// A per-day allowance that may be unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum DailyLimit {
    /// At most this many per day.
    Limited(u64),
    /// Batch takes no airtime, so the budget never runs out.
    Unbounded,
}

impl DailyLimit {
    /// The bound, or `None` when unbounded.
    pub fn limit(self) -> Option<u64> {
        match self {
            Self::Limited(n) => Some(n),
            Self::Unbounded => None,
        }
    }
}

impl fmt::Display for DailyLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => write!(f, "{}", n),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// How a batch of identifiers maps onto the daily airtime budget.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TransmissionPlan {
    pub total_identifiers: usize,
    pub frames_needed: usize,
    pub identifiers_per_frame: usize,
    /// Airtime of one full frame.
    pub frame_duration_ms: f64,
    /// Airtime of the whole batch, frames sent back to back.
    pub batch_duration_ms: f64,
    pub max_batches_per_day: DailyLimit,
    pub max_identifiers_per_day: DailyLimit,
}

impl TransmissionPlan {
    /// Batch duration in seconds.
    pub fn batch_duration_s(&self) -> f64 {
        self.batch_duration_ms / 1000.0
    }
}

/// Computes [`TransmissionPlan`]s under a duty cycle cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DutyCyclePlanner {
    duty_cycle_fraction: f64,
}

impl Default for DutyCyclePlanner {
    fn default() -> Self {
        Self {
            duty_cycle_fraction: DEFAULT_DUTY_CYCLE_FRACTION,
        }
    }
}

impl DutyCyclePlanner {
    /// Create a planner with the given duty cycle fraction (0.01 for 1%).
    pub fn new(duty_cycle_fraction: f64) -> Result<Self, PlanError> {
        if !(duty_cycle_fraction > 0.0 && duty_cycle_fraction <= 1.0) {
            return Err(PlanError::InvalidDutyCycle(duty_cycle_fraction));
        }
        Ok(Self {
            duty_cycle_fraction,
        })
    }

    /// Create a planner from a region's duty cycle limit.
    pub fn for_region(region: Region) -> Self {
        Self {
            duty_cycle_fraction: region.duty_cycle_percent() / 100.0,
        }
    }

    pub fn duty_cycle_fraction(&self) -> f64 {
        self.duty_cycle_fraction
    }

    /// Transmit time allowed per day in milliseconds.
    pub fn daily_budget_ms(&self) -> f64 {
        DAY_MS * self.duty_cycle_fraction
    }

    /// Plan the transmission of `total_identifiers` identifiers.
    ///
    /// Every frame is costed at the configuration's maximum payload size.
    pub fn plan(
        &self,
        total_identifiers: usize,
        config: &RadioConfig,
    ) -> Result<TransmissionPlan, PlanError> {
        let per_frame = config.max_identifiers_per_frame();
        if per_frame == 0 {
            return Err(PlanError::ZeroCapacity {
                max_payload_bytes: config.max_payload_bytes(),
            });
        }

        let frames_needed = total_identifiers.div_ceil(per_frame);
        let frame_duration_ms =
            AirtimeParameters::calculate(config, config.max_payload_bytes()).frame_duration_ms;
        let batch_duration_ms = frames_needed as f64 * frame_duration_ms;

        let (max_batches_per_day, max_identifiers_per_day) = if batch_duration_ms > 0.0 {
            let batches = (self.daily_budget_ms() / batch_duration_ms).floor() as u64;
            (
                DailyLimit::Limited(batches),
                DailyLimit::Limited(batches * total_identifiers as u64),
            )
        } else {
            (DailyLimit::Unbounded, DailyLimit::Unbounded)
        };

        log::debug!(
            "Plan: {} identifiers -> {} frames, {:.1} ms per batch, {} batches/day",
            total_identifiers,
            frames_needed,
            batch_duration_ms,
            max_batches_per_day
        );

        Ok(TransmissionPlan {
            total_identifiers,
            frames_needed,
            identifiers_per_frame: per_frame,
            frame_duration_ms,
            batch_duration_ms,
            max_batches_per_day,
            max_identifiers_per_day,
        })
    }
}

/// Errors that can occur while planning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanError {
    /// Configuration leaves no room for a single identifier per frame.
    ZeroCapacity { max_payload_bytes: usize },
    /// Duty cycle fraction outside (0, 1].
    InvalidDutyCycle(f64),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity { max_payload_bytes } => write!(
                f,
                "configuration fits no identifiers per frame (max payload {} bytes)",
                max_payload_bytes
            ),
            Self::InvalidDutyCycle(fraction) => {
                write!(f, "duty cycle fraction {} outside (0, 1]", fraction)
            }
        }
    }
}

impl std::error::Error for PlanError {}
