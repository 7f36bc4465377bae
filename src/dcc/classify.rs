//! Pulse pair classification
//!
//! A DCC bit is one full period of the track signal: a high half followed by a
//! low half of equal nominal length.
//! - One: 58µs per half (NMRA S-9.1 allows 55-61µs)
//! - Zero: 100µs per half (stretched zeros may run longer)
//!
//! Both halves must land strictly inside the same band for the pair to count.

use super::error::ConfigError;
use super::types::{Bit, TimedSymbol};

pub const DEFAULT_ONE_HALF_PERIOD_US: u32 = 58;
pub const DEFAULT_ZERO_HALF_PERIOD_US: u32 = 100;
pub const DEFAULT_MARGIN_US: u32 = 5;

/// Nominal half-period durations and the shared tolerance margin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitTiming {
    pub zero_high: u32,
    pub zero_low: u32,
    pub one_high: u32,
    pub one_low: u32,
    pub margin: u32,
}

impl Default for BitTiming {
    fn default() -> Self {
        Self {
            zero_high: DEFAULT_ZERO_HALF_PERIOD_US,
            zero_low: DEFAULT_ZERO_HALF_PERIOD_US,
            one_high: DEFAULT_ONE_HALF_PERIOD_US,
            one_low: DEFAULT_ONE_HALF_PERIOD_US,
            margin: DEFAULT_MARGIN_US,
        }
    }
}

impl BitTiming {
    /// Reject margins of zero and bands that touch or overlap
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.margin == 0 {
            return Err(ConfigError::ZeroMargin);
        }
        check_separated("high", self.one_high, self.zero_high, self.margin)?;
        check_separated("low", self.one_low, self.zero_low, self.margin)?;
        Ok(())
    }

    /// Classify one pulse pair
    #[inline]
    pub fn classify(&self, symbol: &TimedSymbol) -> Bit {
        if in_band(symbol.duration_high, self.zero_high, self.margin)
            && in_band(symbol.duration_low, self.zero_low, self.margin)
        {
            Bit::Zero
        } else if in_band(symbol.duration_high, self.one_high, self.margin)
            && in_band(symbol.duration_low, self.one_low, self.margin)
        {
            Bit::One
        } else {
            Bit::Invalid
        }
    }
}

/// Open interval check: nominal - margin < duration < nominal + margin
#[inline(always)]
fn in_band(duration: u32, nominal: u32, margin: u32) -> bool {
    duration.abs_diff(nominal) < margin
}

fn check_separated(half: &'static str, one: u32, zero: u32, margin: u32) -> Result<(), ConfigError> {
    let one_top = one.saturating_add(margin);
    let zero_bottom = zero.saturating_sub(margin);
    if one_top < zero_bottom {
        Ok(())
    } else {
        Err(ConfigError::OverlappingBands {
            half,
            one,
            zero,
            margin,
        })
    }
}
