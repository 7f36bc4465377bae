//! Symbol capture
//!
//! Stands in for the edge-capture peripheral: something timestamps the track
//! signal and hands over pulse pairs in batches. Here the pairs come from a
//! replay file, stdin, or a synthetic generator.

mod source;
pub mod worker;

pub use source::{parse_symbol_line, ReplaySource, SymbolParseError, SymbolSource, SyntheticSource};
pub use worker::{CaptureConfig, CaptureSource, CaptureStats, SymbolCapture};
