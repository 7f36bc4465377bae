//! Packet to symbol synthesis
//!
//! Produces the pulse pairs a receiver would capture for a given packet, using
//! the nominal durations of a `BitTiming`. Feeds the synthetic capture source
//! and the decoder tests. Nothing here touches output pins.

use super::classify::BitTiming;
use super::types::{DccPacket, TimedSymbol};

/// Frame a packet as bits: preamble, then each byte behind a zero start bit,
/// then the one end bit
pub fn packet_bits(packet: &DccPacket, preamble_bits: u32) -> Vec<bool> {
    let bytes = packet.to_bytes();
    let mut bits = Vec::with_capacity(preamble_bits as usize + bytes.len() * 9 + 1);
    bits.extend(std::iter::repeat(true).take(preamble_bits as usize));
    for byte in bytes {
        bits.push(false);
        bits.extend((0..8).rev().map(|i| (byte >> i) & 1 == 1));
    }
    bits.push(true);
    bits
}

/// Nominal pulse pairs for a bit sequence
pub fn symbols_for_bits(bits: &[bool], timing: &BitTiming) -> Vec<TimedSymbol> {
    bits.iter()
        .map(|&one| nominal_symbol(one, timing))
        .collect()
}

/// Pulse pairs for a whole packet.
///
/// `jitter` spreads each half-period deterministically over
/// `nominal - jitter ..= nominal + jitter`; keep it below the margin for the
/// output to decode.
pub fn encode_packet(
    packet: &DccPacket,
    preamble_bits: u32,
    timing: &BitTiming,
    jitter: u32,
) -> Vec<TimedSymbol> {
    packet_bits(packet, preamble_bits)
        .into_iter()
        .enumerate()
        .map(|(i, one)| {
            let nominal = nominal_symbol(one, timing);
            TimedSymbol::new(
                apply_jitter(nominal.duration_high, i * 2, jitter),
                apply_jitter(nominal.duration_low, i * 2 + 1, jitter),
            )
        })
        .collect()
}

fn nominal_symbol(one: bool, timing: &BitTiming) -> TimedSymbol {
    if one {
        TimedSymbol::new(timing.one_high, timing.one_low)
    } else {
        TimedSymbol::new(timing.zero_high, timing.zero_low)
    }
}

fn apply_jitter(nominal: u32, index: usize, jitter: u32) -> u32 {
    if jitter == 0 {
        return nominal;
    }
    let span = 2 * jitter as u64 + 1;
    // Stride co-prime with most spans so consecutive halves differ
    let step = (index as u64).wrapping_mul(7).wrapping_add(3) % span;
    let offset = step as i64 - jitter as i64;
    (nominal as i64 + offset).clamp(0, u32::MAX as i64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_bits_layout() {
        let bits = packet_bits(&DccPacket::new(0x03, &[0x3F]), 12);
        assert_eq!(bits.len(), 12 + 3 * 9 + 1);
        assert!(bits[..12].iter().all(|&b| b));
        assert!(!bits[12]);
        assert_eq!(&bits[13..21], &[false, false, false, false, false, false, true, true]);
        assert!(!bits[21]);
        assert!(*bits.last().unwrap());
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let timing = BitTiming::default();
        let symbols = encode_packet(&DccPacket::idle(), 14, &timing, 3);
        for s in symbols {
            let ok = |d: u32| d.abs_diff(58) <= 3 || d.abs_diff(100) <= 3;
            assert!(ok(s.duration_high) && ok(s.duration_low), "{:?}", s);
        }
    }

    #[test]
    fn test_zero_jitter_is_nominal() {
        let timing = BitTiming::default();
        let symbols = encode_packet(&DccPacket::idle(), 10, &timing, 0);
        assert_eq!(symbols[0], TimedSymbol::new(58, 58));
        assert_eq!(symbols[10], TimedSymbol::new(100, 100));
    }
}
