//! DCC packet decoding
//!
//! Pipeline for one signal line:
//! 1. Classify each captured pulse pair as a zero, one or invalid bit
//! 2. Find the preamble and the start bit that ends it
//! 3. Assemble bytes until the packet end bit
//! 4. Verify the XOR error detection byte
//! 5. Hand the packet to a sink

mod checksum;
mod classify;
mod decoder;
mod emit;
mod error;
mod framer;
mod types;
pub mod waveform;

pub use checksum::{compute_checksum, validate};
pub use classify::{BitTiming, DEFAULT_MARGIN_US, DEFAULT_ONE_HALF_PERIOD_US, DEFAULT_ZERO_HALF_PERIOD_US};
pub use decoder::{
    Decoder, DecoderConfig, DecoderStats, DEFAULT_IDLE_WINDOW, DEFAULT_MAX_PACKET_BYTES,
    PROTOCOL_MIN_PREAMBLE_BITS,
};
pub use emit::PacketSink;
pub use error::{ConfigError, FrameError, Violation};
pub use framer::{FramedPacket, Framer, PartialByte, SyncState, MIN_PACKET_BYTES};
pub use types::{Bit, DccPacket, TimedSymbol, ValidationResult, MAX_DATA_BYTES};
