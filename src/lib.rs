//! DCC Capture - edge timings to validated DCC packets
//!
//! Decodes the NMRA Digital Command Control track signal from captured pulse
//! durations: classify each pulse pair as a bit, find the preamble, assemble
//! packet bytes and verify the XOR error detection byte.

pub mod capture;
pub mod config;
pub mod dcc;
pub mod output;
pub mod runner;

pub use config::Config;
pub use dcc::{DccPacket, Decoder, DecoderConfig, PacketSink, TimedSymbol, ValidationResult};
pub use runner::DecodeRunner;
