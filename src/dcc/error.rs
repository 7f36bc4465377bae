//! Error types for configuration and frame decoding

use thiserror::Error;

/// Rejected decoder configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tolerance margin must be non-zero")]
    ZeroMargin,

    #[error(
        "{half} half-period bands overlap: one={one}us zero={zero}us margin={margin}us"
    )]
    OverlappingBands {
        half: &'static str,
        one: u32,
        zero: u32,
        margin: u32,
    },

    #[error("minimum preamble of {0} bits is below the protocol minimum of 10")]
    PreambleTooShort(u32),

    #[error("packet byte ceiling {0} outside 3..=8")]
    ByteCeilingOutOfRange(usize),

    #[error("idle window must be non-zero")]
    ZeroIdleWindow,

    #[error("{0} must be non-zero")]
    ZeroCapacity(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Why a frame was abandoned. None of these are fatal; each one resynchronizes.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("symbol duration outside all tolerance bands")]
    InvalidSymbol,

    #[error("framing violation: {0}")]
    FramingViolation(Violation),

    #[error("packet exceeds {limit} bytes")]
    ByteCeilingExceeded { limit: usize },
}

/// Specific framing rule that was broken
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    #[error("partial packet abandoned after idle window")]
    IdleTimeout,
}
