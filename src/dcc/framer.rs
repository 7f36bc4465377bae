//! Bit-stream synchronization and packet assembly
//!
//! DCC packets have no length field. The only boundaries are:
//! - Preamble: at least 10 consecutive one-bits
//! - Packet start bit: the zero that ends the preamble
//! - Data byte start bit: a zero after a byte, meaning another byte follows
//! - Packet end bit: a one after a byte, meaning the packet is complete
//!
//! ```text
//! 1111111111 0 AAAAAAAA 0 DDDDDDDD 0 EEEEEEEE 1
//! preamble   ^ address  ^ data     ^ checksum ^ end
//! ```
//!
//! So the bit after every byte is read contextually: it either opens the next
//! byte or closes the packet. A packet needs at least address, data and
//! checksum, so until three bytes are in, a one after a byte is taken as a
//! continuation like a zero.

use super::checksum::validate;
use super::error::FrameError;
use super::types::{Bit, DccPacket, ValidationResult};

/// Fewest bytes a packet can carry: address, one data byte, checksum
pub const MIN_PACKET_BYTES: usize = 3;

/// Position of the decoder in the bit stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Counting consecutive one-bits
    SeekingPreamble { ones: u32 },
    /// Preamble long enough, waiting for the zero that starts the packet
    AwaitingStartBit { preamble: u32 },
    /// Collecting packet bytes
    InFrame { preamble: u32 },
}

impl Default for SyncState {
    fn default() -> Self {
        Self::SeekingPreamble { ones: 0 }
    }
}

/// Byte under assembly, most significant bit first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartialByte {
    value: u8,
    bits: u8,
}

impl PartialByte {
    /// Shift in one bit. Returns the byte once all 8 bits are in.
    fn push(&mut self, one: bool) -> Option<u8> {
        self.value = (self.value << 1) | one as u8;
        self.bits += 1;
        if self.bits == 8 {
            let byte = self.value;
            *self = Self::default();
            Some(byte)
        } else {
            None
        }
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }
}

/// A completed packet with its checksum verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedPacket {
    pub packet: DccPacket,
    pub result: ValidationResult,
}

/// Synchronizer and frame assembler state machine
pub struct Framer {
    min_preamble_bits: u32,
    max_packet_bytes: usize,
    state: SyncState,
    partial: PartialByte,
    bytes: Vec<u8>,
    /// A full byte was just collected and the next bit is a separator
    awaiting_separator: bool,
}

impl Framer {
    pub fn new(min_preamble_bits: u32, max_packet_bytes: usize) -> Self {
        Self {
            min_preamble_bits,
            max_packet_bytes,
            state: SyncState::default(),
            partial: PartialByte::default(),
            bytes: Vec::with_capacity(max_packet_bytes),
            awaiting_separator: false,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Bytes collected so far for the packet in progress
    pub fn pending_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Feed one classified bit.
    ///
    /// Returns a packet when an end bit closes a frame. Any error has already
    /// reset the framer to `SeekingPreamble { ones: 0 }`.
    pub fn push_bit(&mut self, bit: Bit) -> Result<Option<FramedPacket>, FrameError> {
        if bit == Bit::Invalid {
            self.reset();
            return Err(FrameError::InvalidSymbol);
        }
        let one = bit == Bit::One;

        match self.state {
            SyncState::SeekingPreamble { ones } => {
                self.state = if !one {
                    SyncState::SeekingPreamble { ones: 0 }
                } else if ones + 1 >= self.min_preamble_bits {
                    SyncState::AwaitingStartBit { preamble: ones + 1 }
                } else {
                    SyncState::SeekingPreamble { ones: ones + 1 }
                };
                Ok(None)
            }
            SyncState::AwaitingStartBit { preamble } => {
                if one {
                    self.state = SyncState::AwaitingStartBit {
                        preamble: preamble.saturating_add(1),
                    };
                } else {
                    self.begin_frame(preamble);
                }
                Ok(None)
            }
            SyncState::InFrame { preamble } => {
                if self.awaiting_separator {
                    self.awaiting_separator = false;
                    if one && self.bytes.len() >= MIN_PACKET_BYTES {
                        Ok(Some(self.finish_frame(preamble)))
                    } else if self.bytes.len() >= self.max_packet_bytes {
                        self.reset();
                        Err(FrameError::ByteCeilingExceeded {
                            limit: self.max_packet_bytes,
                        })
                    } else {
                        Ok(None)
                    }
                } else {
                    if let Some(byte) = self.partial.push(one) {
                        self.bytes.push(byte);
                        self.awaiting_separator = true;
                    }
                    Ok(None)
                }
            }
        }
    }

    /// Drop any packet in progress and go back to preamble search.
    /// Returns true if a preamble or partial frame was discarded.
    pub fn abandon(&mut self) -> bool {
        let discarded = !matches!(self.state, SyncState::SeekingPreamble { .. });
        self.reset();
        discarded
    }

    fn begin_frame(&mut self, preamble: u32) {
        self.state = SyncState::InFrame { preamble };
        self.partial = PartialByte::default();
        self.bytes.clear();
        self.awaiting_separator = false;
    }

    fn finish_frame(&mut self, preamble: u32) -> FramedPacket {
        let count = self.bytes.len();
        let result = validate(&self.bytes);
        let checksum = self.bytes[count - 1];
        let packet = DccPacket {
            preamble_bits: preamble,
            address: self.bytes[0],
            data: self.bytes[1..count - 1].to_vec(),
            checksum,
        };
        self.reset();
        FramedPacket { packet, result }
    }

    fn reset(&mut self) {
        self.state = SyncState::default();
        self.partial = PartialByte::default();
        self.bytes.clear();
        self.awaiting_separator = false;
    }
}
