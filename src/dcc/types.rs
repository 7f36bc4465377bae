//! DCC data types

use serde::Serialize;

use super::checksum::compute_checksum;

/// Maximum data bytes carried between the address and checksum bytes
pub const MAX_DATA_BYTES: usize = 6;

/// One captured pulse pair: the high and low half-period durations in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedSymbol {
    pub duration_high: u32,
    pub duration_low: u32,
}

impl TimedSymbol {
    pub fn new(duration_high: u32, duration_low: u32) -> Self {
        Self {
            duration_high,
            duration_low,
        }
    }
}

/// Classified bit value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bit {
    Zero,
    One,
    /// Duration outside every tolerance band
    Invalid,
}

/// Outcome of the checksum comparison for a framed packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationResult {
    Valid,
    ChecksumMismatch,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// A framed DCC packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DccPacket {
    /// Number of one-bits seen before the packet start bit
    pub preamble_bits: u32,

    /// Address byte
    pub address: u8,

    /// Instruction bytes between address and checksum (1 to 6)
    pub data: Vec<u8>,

    /// Received error detection byte
    pub checksum: u8,
}

impl DccPacket {
    /// Build a packet with a correct checksum and the recommended 14-bit preamble
    pub fn new(address: u8, data: &[u8]) -> Self {
        let checksum = compute_checksum(address, data);
        Self {
            preamble_bits: 14,
            address,
            data: data.to_vec(),
            checksum,
        }
    }

    /// The broadcast idle packet (0xFF 0x00 0xFF)
    pub fn idle() -> Self {
        Self::new(0xFF, &[0x00])
    }

    /// Split received bytes into address, data and checksum.
    /// Returns None unless there are 3 to 8 bytes.
    pub fn from_bytes(preamble_bits: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 3 || bytes.len() > MAX_DATA_BYTES + 2 {
            return None;
        }
        let (&checksum, rest) = bytes.split_last()?;
        let (&address, data) = rest.split_first()?;
        Some(Self {
            preamble_bits,
            address,
            data: data.to_vec(),
            checksum,
        })
    }

    /// All bytes in wire order
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.data.len() + 2);
        bytes.push(self.address);
        bytes.extend_from_slice(&self.data);
        bytes.push(self.checksum);
        bytes
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.to_bytes())
    }

    /// Whether this is the broadcast idle packet
    pub fn is_idle(&self) -> bool {
        self.address == 0xFF && self.data == [0x00]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_computes_checksum() {
        let packet = DccPacket::new(0x03, &[0x3F]);
        assert_eq!(packet.checksum, 0x3C);
        assert_eq!(packet.to_bytes(), vec![0x03, 0x3F, 0x3C]);
    }

    #[test]
    fn test_idle_packet() {
        let idle = DccPacket::idle();
        assert_eq!(idle.to_hex(), "FF00FF");
        assert!(idle.is_idle());
    }

    #[test]
    fn test_from_bytes_splits_roles() {
        let packet = DccPacket::from_bytes(12, &[0x03, 0x3F, 0x01, 0x3D]).unwrap();
        assert_eq!(packet.address, 0x03);
        assert_eq!(packet.data, vec![0x3F, 0x01]);
        assert_eq!(packet.checksum, 0x3D);
        assert_eq!(packet.preamble_bits, 12);
    }

    #[test]
    fn test_from_bytes_rejects_bad_lengths() {
        assert!(DccPacket::from_bytes(10, &[0x03, 0x03]).is_none());
        assert!(DccPacket::from_bytes(10, &[0u8; 9]).is_none());
    }
}
