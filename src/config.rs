//! Configuration loaded from environment variables

use std::str::FromStr;
use std::time::Duration;

use crate::capture::{CaptureConfig, CaptureSource};
use crate::dcc::{
    BitTiming, ConfigError, DecoderConfig, DEFAULT_MARGIN_US, DEFAULT_MAX_PACKET_BYTES,
    DEFAULT_ONE_HALF_PERIOD_US, DEFAULT_ZERO_HALF_PERIOD_US, PROTOCOL_MIN_PREAMBLE_BITS,
};
use crate::output::OutputFormat;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Nominal half-periods and tolerance
    pub timing: BitTiming,

    /// One-bits required before a packet start bit
    pub min_preamble_bits: u32,

    /// Largest packet accepted, in bytes
    pub max_packet_bytes: usize,

    /// Silence after which a partial packet is dropped
    pub idle_window: Duration,

    /// Symbol batches buffered between capture and decoder
    pub queue_capacity: usize,

    /// Symbols per capture hand-off
    pub batch_symbols: usize,

    /// Symbol source
    pub source: CaptureSource,

    /// Packet output format
    pub output: OutputFormat,

    /// Decoder statistics logging interval
    pub stats_interval: Duration,

    /// tracing filter directive
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any key lookup, applying defaults for missing keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timing = BitTiming {
            zero_high: parse_or(&lookup, "DCC_ZERO_HIGH_US", DEFAULT_ZERO_HALF_PERIOD_US)?,
            zero_low: parse_or(&lookup, "DCC_ZERO_LOW_US", DEFAULT_ZERO_HALF_PERIOD_US)?,
            one_high: parse_or(&lookup, "DCC_ONE_HIGH_US", DEFAULT_ONE_HALF_PERIOD_US)?,
            one_low: parse_or(&lookup, "DCC_ONE_LOW_US", DEFAULT_ONE_HALF_PERIOD_US)?,
            margin: parse_or(&lookup, "DCC_MARGIN_US", DEFAULT_MARGIN_US)?,
        };

        let output = match lookup("DCC_OUTPUT") {
            Some(value) => OutputFormat::parse(&value).ok_or(ConfigError::InvalidValue {
                name: "DCC_OUTPUT",
                value,
            })?,
            None => OutputFormat::Log,
        };

        let config = Self {
            timing,
            min_preamble_bits: parse_or(
                &lookup,
                "DCC_MIN_PREAMBLE_BITS",
                PROTOCOL_MIN_PREAMBLE_BITS,
            )?,
            max_packet_bytes: parse_or(&lookup, "DCC_MAX_PACKET_BYTES", DEFAULT_MAX_PACKET_BYTES)?,
            idle_window: Duration::from_millis(parse_or(&lookup, "DCC_IDLE_WINDOW_MS", 50)?),
            queue_capacity: parse_or(&lookup, "DCC_QUEUE_CAPACITY", 16)?,
            batch_symbols: parse_or(&lookup, "DCC_BATCH_SYMBOLS", 64)?,
            source: CaptureSource::parse(
                &lookup("DCC_CAPTURE_SOURCE").unwrap_or_else(|| "synthetic".to_string()),
            ),
            output,
            stats_interval: Duration::from_millis(parse_or(
                &lookup,
                "DCC_STATS_INTERVAL_MS",
                5000,
            )?),
            log_level: lookup("DCC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };

        if config.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("DCC_QUEUE_CAPACITY"));
        }
        if config.batch_symbols == 0 {
            return Err(ConfigError::ZeroCapacity("DCC_BATCH_SYMBOLS"));
        }
        config.decoder_config().validate()?;
        Ok(config)
    }

    /// Decoder settings
    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            timing: self.timing,
            min_preamble_bits: self.min_preamble_bits,
            max_packet_bytes: self.max_packet_bytes,
            idle_window: self.idle_window,
        }
    }

    /// Capture settings
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            source: self.source.clone(),
            batch_symbols: self.batch_symbols,
            queue_capacity: self.queue_capacity,
            timing: self.timing,
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.timing, BitTiming::default());
        assert_eq!(config.min_preamble_bits, 10);
        assert_eq!(config.max_packet_bytes, 8);
        assert_eq!(config.idle_window, Duration::from_millis(50));
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.batch_symbols, 64);
        assert_eq!(config.source, CaptureSource::Synthetic);
        assert_eq!(config.output, OutputFormat::Log);
        assert_eq!(config.decoder_config(), DecoderConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DCC_MARGIN_US", "8"),
            ("DCC_MIN_PREAMBLE_BITS", "12"),
            ("DCC_CAPTURE_SOURCE", "-"),
            ("DCC_OUTPUT", "json"),
            ("DCC_IDLE_WINDOW_MS", "200"),
        ])
        .unwrap();
        assert_eq!(config.timing.margin, 8);
        assert_eq!(config.min_preamble_bits, 12);
        assert_eq!(config.source, CaptureSource::Stdin);
        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.capture_config().source, CaptureSource::Stdin);
        assert_eq!(config.decoder_config().idle_window, Duration::from_millis(200));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("DCC_MARGIN_US", "five")]),
            Err(ConfigError::InvalidValue { name: "DCC_MARGIN_US", .. })
        ));
        assert!(matches!(
            load(&[("DCC_OUTPUT", "xml")]),
            Err(ConfigError::InvalidValue { name: "DCC_OUTPUT", .. })
        ));
        assert_eq!(
            load(&[("DCC_QUEUE_CAPACITY", "0")]).unwrap_err(),
            ConfigError::ZeroCapacity("DCC_QUEUE_CAPACITY")
        );
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        // u32::MAX + 101 would wrap to 100 if narrowed
        for name in ["DCC_ZERO_HIGH_US", "DCC_MIN_PREAMBLE_BITS"] {
            assert_eq!(
                load(&[(name, "4294967396")]).unwrap_err(),
                ConfigError::InvalidValue {
                    name,
                    value: "4294967396".to_string()
                }
            );
        }
        assert!(matches!(
            load(&[("DCC_MAX_PACKET_BYTES", "18446744073709551624")]),
            Err(ConfigError::InvalidValue { name: "DCC_MAX_PACKET_BYTES", .. })
        ));
        assert!(matches!(
            load(&[("DCC_MARGIN_US", "-5")]),
            Err(ConfigError::InvalidValue { name: "DCC_MARGIN_US", .. })
        ));
    }

    #[test]
    fn test_decoder_rules_enforced() {
        assert!(matches!(
            load(&[("DCC_MARGIN_US", "25")]),
            Err(ConfigError::OverlappingBands { .. })
        ));
        assert_eq!(
            load(&[("DCC_MIN_PREAMBLE_BITS", "4")]).unwrap_err(),
            ConfigError::PreambleTooShort(4)
        );
        assert_eq!(
            load(&[("DCC_IDLE_WINDOW_MS", "0")]).unwrap_err(),
            ConfigError::ZeroIdleWindow
        );
    }
}
