//! Timed symbols to framed packets
//!
//! Glues the classifier, framer and checksum validator together and keeps
//! counters for everything that did not turn into a packet.

use std::time::Duration;

use tracing::trace;

use super::classify::BitTiming;
use super::emit::PacketSink;
use super::error::{ConfigError, FrameError, Violation};
use super::framer::{Framer, SyncState, MIN_PACKET_BYTES};
use super::types::{Bit, TimedSymbol, ValidationResult, MAX_DATA_BYTES};

/// NMRA S-9.2 minimum preamble accepted by a decoder
pub const PROTOCOL_MIN_PREAMBLE_BITS: u32 = 10;

/// Address + 6 data bytes + checksum
pub const DEFAULT_MAX_PACKET_BYTES: usize = MAX_DATA_BYTES + 2;

pub const DEFAULT_IDLE_WINDOW: Duration = Duration::from_millis(50);

/// Immutable decoder settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    pub timing: BitTiming,
    pub min_preamble_bits: u32,
    pub max_packet_bytes: usize,
    /// Silence after which a partial packet is abandoned
    pub idle_window: Duration,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            timing: BitTiming::default(),
            min_preamble_bits: PROTOCOL_MIN_PREAMBLE_BITS,
            max_packet_bytes: DEFAULT_MAX_PACKET_BYTES,
            idle_window: DEFAULT_IDLE_WINDOW,
        }
    }
}

impl DecoderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing.validate()?;
        if self.min_preamble_bits < PROTOCOL_MIN_PREAMBLE_BITS {
            return Err(ConfigError::PreambleTooShort(self.min_preamble_bits));
        }
        if !(MIN_PACKET_BYTES..=DEFAULT_MAX_PACKET_BYTES).contains(&self.max_packet_bytes) {
            return Err(ConfigError::ByteCeilingOutOfRange(self.max_packet_bytes));
        }
        if self.idle_window.is_zero() {
            return Err(ConfigError::ZeroIdleWindow);
        }
        Ok(())
    }
}

/// Decoder counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecoderStats {
    pub symbols_processed: u64,
    pub invalid_symbols: u64,
    pub preambles_detected: u64,
    pub ceiling_exceeded: u64,
    pub idle_resets: u64,
    pub packets_valid: u64,
    pub checksum_mismatches: u64,
}

impl DecoderStats {
    pub fn packets_emitted(&self) -> u64 {
        self.packets_valid + self.checksum_mismatches
    }
}

/// DCC decoder for one signal line
pub struct Decoder {
    timing: BitTiming,
    framer: Framer,
    pub stats: DecoderStats,
}

impl Decoder {
    pub fn new(config: &DecoderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            timing: config.timing,
            framer: Framer::new(config.min_preamble_bits, config.max_packet_bytes),
            stats: DecoderStats::default(),
        })
    }

    pub fn state(&self) -> SyncState {
        self.framer.state()
    }

    /// Classify and frame a batch of symbols, emitting each completed packet
    pub fn process_symbols<S: PacketSink>(&mut self, symbols: &[TimedSymbol], sink: &mut S) {
        for symbol in symbols {
            let bit = self.timing.classify(symbol);
            self.stats.symbols_processed += 1;
            if bit == Bit::Invalid {
                trace!(
                    "Invalid symbol {{{}:{}}} in {:?}",
                    symbol.duration_high,
                    symbol.duration_low,
                    self.framer.state()
                );
            }
            self.push_bit(bit, sink);
        }
    }

    /// Feed one already classified bit
    pub fn push_bit<S: PacketSink>(&mut self, bit: Bit, sink: &mut S) {
        let before = self.framer.state();
        match self.framer.push_bit(bit) {
            Ok(Some(framed)) => {
                match framed.result {
                    ValidationResult::Valid => self.stats.packets_valid += 1,
                    ValidationResult::ChecksumMismatch => self.stats.checksum_mismatches += 1,
                }
                trace!(
                    "Packet: preamble={} hex={} result={:?}",
                    framed.packet.preamble_bits,
                    framed.packet.to_hex(),
                    framed.result
                );
                sink.emit(framed.packet, framed.result);
            }
            Ok(None) => {
                if matches!(before, SyncState::AwaitingStartBit { .. })
                    && matches!(self.framer.state(), SyncState::InFrame { .. })
                {
                    self.stats.preambles_detected += 1;
                }
            }
            Err(err) => self.record_error(err),
        }
    }

    /// Abandon a partial packet after the idle window expired.
    /// Returns true if anything was discarded.
    pub fn idle_timeout(&mut self) -> bool {
        let in_frame = matches!(self.framer.state(), SyncState::InFrame { .. });
        let discarded = self.framer.abandon();
        if in_frame {
            self.record_error(FrameError::FramingViolation(Violation::IdleTimeout));
        }
        discarded
    }

    fn record_error(&mut self, err: FrameError) {
        match err {
            FrameError::InvalidSymbol => self.stats.invalid_symbols += 1,
            FrameError::FramingViolation(Violation::IdleTimeout) => self.stats.idle_resets += 1,
            FrameError::ByteCeilingExceeded { .. } => self.stats.ceiling_exceeded += 1,
        }
        if !matches!(err, FrameError::InvalidSymbol) {
            trace!("Frame aborted: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dcc::types::DccPacket;
    use crate::dcc::waveform::{encode_packet, symbols_for_bits};

    fn decoder() -> Decoder {
        Decoder::new(&DecoderConfig::default()).unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(DecoderConfig::default().validate().is_ok());

        let short = DecoderConfig {
            min_preamble_bits: 9,
            ..DecoderConfig::default()
        };
        assert_eq!(short.validate(), Err(ConfigError::PreambleTooShort(9)));

        for bad in [0, 2, 9] {
            let cfg = DecoderConfig {
                max_packet_bytes: bad,
                ..DecoderConfig::default()
            };
            assert_eq!(cfg.validate(), Err(ConfigError::ByteCeilingOutOfRange(bad)));
        }

        let idle = DecoderConfig {
            idle_window: Duration::ZERO,
            ..DecoderConfig::default()
        };
        assert_eq!(idle.validate(), Err(ConfigError::ZeroIdleWindow));
        assert!(Decoder::new(&idle).is_err());
    }

    #[test]
    fn test_decode_symbols_end_to_end() {
        let timing = BitTiming::default();
        let packet = DccPacket::new(0x03, &[0x3F]);
        let symbols = encode_packet(&packet, 12, &timing, 0);

        let mut dec = decoder();
        let mut out = Vec::new();
        dec.process_symbols(&symbols, &mut out);

        assert_eq!(out.len(), 1);
        let (got, result) = &out[0];
        assert_eq!(*result, ValidationResult::Valid);
        assert_eq!(got.address, 0x03);
        assert_eq!(got.data, vec![0x3F]);
        assert_eq!(got.checksum, 0x3C);
        assert_eq!(got.preamble_bits, 12);
        assert_eq!(dec.stats.packets_valid, 1);
        assert_eq!(dec.stats.preambles_detected, 1);
        assert_eq!(dec.stats.symbols_processed, symbols.len() as u64);
    }

    #[test]
    fn test_stop_bit_after_data_byte() {
        // 1x12, 0, 00000011, 0, 00111111, 1, 00111100, 1
        let mut bits = vec![true; 12];
        bits.push(false);
        bits.extend([false, false, false, false, false, false, true, true]);
        bits.push(false);
        bits.extend([false, false, true, true, true, true, true, true]);
        bits.push(true);
        bits.extend([false, false, true, true, true, true, false, false]);
        bits.push(true);
        let symbols = symbols_for_bits(&bits, &BitTiming::default());

        let mut dec = decoder();
        let mut out = Vec::new();
        dec.process_symbols(&symbols, &mut out);

        assert_eq!(
            out,
            vec![(
                DccPacket {
                    preamble_bits: 12,
                    address: 0x03,
                    data: vec![0x3F],
                    checksum: 0x3C,
                },
                ValidationResult::Valid
            )]
        );
        assert_eq!(dec.state(), SyncState::SeekingPreamble { ones: 0 });
    }

    #[test]
    fn test_decode_with_jitter() {
        let timing = BitTiming::default();
        let packet = DccPacket::new(0xC1, &[0x23, 0x3F, 0x80]);
        let symbols = encode_packet(&packet, 14, &timing, 4);

        let mut dec = decoder();
        let mut out = Vec::new();
        dec.process_symbols(&symbols, &mut out);
        assert_eq!(out, vec![(packet, ValidationResult::Valid)]);
    }

    #[test]
    fn test_flipped_checksum_bit_reported() {
        let timing = BitTiming::default();
        for bit in 0..8 {
            let mut packet = DccPacket::new(0x03, &[0x3F]);
            packet.checksum ^= 1 << bit;
            let symbols = encode_packet(&packet, 12, &timing, 0);

            let mut dec = decoder();
            let mut out = Vec::new();
            dec.process_symbols(&symbols, &mut out);

            assert_eq!(out.len(), 1);
            assert_eq!(out[0].1, ValidationResult::ChecksumMismatch);
            assert_eq!(out[0].0.address, 0x03);
            assert_eq!(out[0].0.data, vec![0x3F]);
            assert_eq!(dec.stats.checksum_mismatches, 1);
        }
    }

    #[test]
    fn test_missing_end_bit_then_idle() {
        let timing = BitTiming::default();
        let mut symbols = encode_packet(&DccPacket::new(0x03, &[0x3F]), 12, &timing, 0);
        // Replace the end bit with a zero, implying another byte
        symbols.pop();
        symbols.extend(symbols_for_bits(&[false], &timing));

        let mut dec = decoder();
        let mut count = 0;
        let mut sink = |_: DccPacket, _: ValidationResult| count += 1;
        dec.process_symbols(&symbols, &mut sink);
        assert!(matches!(dec.state(), SyncState::InFrame { .. }));

        assert!(dec.idle_timeout());
        assert_eq!(dec.state(), SyncState::SeekingPreamble { ones: 0 });
        assert_eq!(dec.stats.idle_resets, 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_idle_timeout_when_synced_is_noop() {
        let mut dec = decoder();
        assert!(!dec.idle_timeout());
        assert_eq!(dec.stats.idle_resets, 0);
    }

    #[test]
    fn test_invalid_symbol_resync() {
        let timing = BitTiming::default();
        let packet = DccPacket::new(0x03, &[0x3F]);
        let mut symbols = encode_packet(&packet, 12, &timing, 0);
        // Corrupt a symbol in the middle of the address byte
        symbols[16] = TimedSymbol::new(80, 80);
        symbols.extend(encode_packet(&packet, 12, &timing, 0));

        let mut dec = decoder();
        let mut out = Vec::new();
        dec.process_symbols(&symbols, &mut out);

        assert_eq!(out.len(), 1);
        assert!(out[0].1.is_valid());
        assert_eq!(dec.stats.invalid_symbols, 1);
    }

    #[test]
    fn test_stats_count_aborts() {
        let timing = BitTiming::default();
        let mut dec = Decoder::new(&DecoderConfig {
            max_packet_bytes: 3,
            ..DecoderConfig::default()
        })
        .unwrap();
        let mut out = Vec::new();

        let long = DccPacket::new(0x03, &[0x3F, 0x01]);
        dec.process_symbols(&encode_packet(&long, 12, &timing, 0), &mut out);
        assert_eq!(dec.stats.ceiling_exceeded, 1);

        // A one after the address alone does not close the frame
        let mut bits = vec![true; 12];
        bits.push(false);
        bits.extend([false, false, false, false, false, false, true, true]);
        bits.push(true);
        dec.process_symbols(&symbols_for_bits(&bits, &timing), &mut out);
        assert_eq!(dec.state(), SyncState::InFrame { preamble: 12 });
        assert!(dec.idle_timeout());
        assert_eq!(dec.stats.idle_resets, 1);

        assert!(out.is_empty());
    }
}
