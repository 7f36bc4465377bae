//! Symbol sources feeding the capture thread
//!
//! Replay format, one pulse pair per line:
//! ```text
//! # high low (microseconds)
//! 58 58
//! 100,100
//! ```

use std::io::BufRead;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::warn;

use crate::dcc::waveform::encode_packet;
use crate::dcc::{BitTiming, DccPacket, TimedSymbol};

/// Malformed replay line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolParseError {
    #[error("expected two durations, got {0}")]
    FieldCount(usize),

    #[error("invalid duration {0:?}")]
    InvalidDuration(String),
}

/// Parse one replay line. Blank lines and comments yield `Ok(None)`.
pub fn parse_symbol_line(line: &str) -> Result<Option<TimedSymbol>, SymbolParseError> {
    let line = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let fields: Vec<&str> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|f| !f.is_empty())
        .collect();
    if fields.len() != 2 {
        return Err(SymbolParseError::FieldCount(fields.len()));
    }

    let parse = |f: &str| {
        f.parse::<u32>()
            .map_err(|_| SymbolParseError::InvalidDuration(f.to_string()))
    };
    Ok(Some(TimedSymbol::new(parse(fields[0])?, parse(fields[1])?)))
}

/// Produces batches of captured symbols
pub trait SymbolSource: Send {
    /// Next batch of at most `max` symbols, `None` once the source is exhausted
    fn next_batch(&mut self, max: usize) -> Result<Option<Vec<TimedSymbol>>>;

    /// Live sources keep producing whether or not the decoder keeps up, so
    /// a full queue costs a batch. Recorded input can wait instead.
    fn is_live(&self) -> bool {
        true
    }
}

/// Replays pulse pairs from text
pub struct ReplaySource<R> {
    reader: R,
    line: String,
    line_number: u64,
    pub malformed_lines: u64,
}

impl<R: BufRead + Send> ReplaySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
            malformed_lines: 0,
        }
    }
}

impl<R: BufRead + Send> SymbolSource for ReplaySource<R> {
    fn next_batch(&mut self, max: usize) -> Result<Option<Vec<TimedSymbol>>> {
        let mut batch = Vec::with_capacity(max);
        while batch.len() < max {
            self.line.clear();
            let n = self
                .reader
                .read_line(&mut self.line)
                .context("Failed to read capture input")?;
            if n == 0 {
                break;
            }
            self.line_number += 1;
            match parse_symbol_line(&self.line) {
                Ok(Some(symbol)) => batch.push(symbol),
                Ok(None) => {}
                Err(e) => {
                    self.malformed_lines += 1;
                    warn!("Skipping capture line {}: {}", self.line_number, e);
                }
            }
        }
        Ok(if batch.is_empty() { None } else { Some(batch) })
    }

    fn is_live(&self) -> bool {
        false
    }
}

/// Endless track signal built from a rotating set of packets.
///
/// Every fourth packet carries a corrupted checksum so mismatch handling is
/// visible downstream. Batches are paced to the signal's real duration.
pub struct SyntheticSource {
    timing: BitTiming,
    jitter: u32,
    packets: Vec<DccPacket>,
    next_packet: usize,
    pending: Vec<TimedSymbol>,
    cursor: usize,
    paced: bool,
}

impl SyntheticSource {
    pub fn new(timing: BitTiming) -> Self {
        let mut corrupted = DccPacket::new(0x03, &[0x60]);
        corrupted.checksum ^= 0x01;
        Self {
            timing,
            // Stay strictly inside the open tolerance band
            jitter: timing.margin.saturating_sub(1).min(3),
            packets: vec![
                DccPacket::idle(),
                DccPacket::new(0x03, &[0x3F, 0x9A]),
                DccPacket::new(0x03, &[0x90]),
                corrupted,
            ],
            next_packet: 0,
            pending: Vec::new(),
            cursor: 0,
            paced: true,
        }
    }

    /// Disable real-time pacing
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    fn refill(&mut self) {
        let packet = &self.packets[self.next_packet % self.packets.len()];
        self.pending = encode_packet(packet, 14, &self.timing, self.jitter);
        self.cursor = 0;
        self.next_packet += 1;
    }
}

impl SymbolSource for SyntheticSource {
    fn next_batch(&mut self, max: usize) -> Result<Option<Vec<TimedSymbol>>> {
        let mut batch = Vec::with_capacity(max);
        while batch.len() < max {
            if self.cursor >= self.pending.len() {
                self.refill();
            }
            let take = (max - batch.len()).min(self.pending.len() - self.cursor);
            batch.extend_from_slice(&self.pending[self.cursor..self.cursor + take]);
            self.cursor += take;
        }

        if self.paced {
            let micros: u64 = batch
                .iter()
                .map(|s| s.duration_high as u64 + s.duration_low as u64)
                .sum();
            thread::sleep(Duration::from_micros(micros));
        }
        Ok(Some(batch))
    }
}
