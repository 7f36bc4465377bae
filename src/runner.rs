//! Decode runner - drains the capture channel into the decoder

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, info, trace, warn, Level};

use crate::dcc::{Decoder, DecoderStats, PacketSink, TimedSymbol};

/// Runs one decoder against one capture channel
pub struct DecodeRunner {
    decoder: Decoder,
    idle_window: Duration,
    stats_interval: Duration,
}

impl DecodeRunner {
    pub fn new(decoder: Decoder, idle_window: Duration, stats_interval: Duration) -> Self {
        Self {
            decoder,
            idle_window,
            stats_interval,
        }
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Decode until the channel disconnects or `running` is cleared.
    ///
    /// Waits at most one idle window for each batch. When the window passes
    /// without symbols, any partial packet is abandoned.
    pub fn run<S: PacketSink>(
        &mut self,
        batch_rx: &Receiver<Vec<TimedSymbol>>,
        running: &AtomicBool,
        sink: &mut S,
    ) -> DecoderStats {
        info!(
            "Decoder waiting for symbols (idle window {} ms)",
            self.idle_window.as_millis()
        );
        let mut last_stats_report = Instant::now();

        loop {
            match batch_rx.recv_timeout(self.idle_window) {
                Ok(batch) => {
                    if tracing::enabled!(Level::TRACE) {
                        dump_symbols(&batch);
                    }
                    self.decoder.process_symbols(&batch, sink);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.decoder.idle_timeout() {
                        debug!("Idle window expired, partial packet abandoned");
                    }
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    if self.decoder.idle_timeout() {
                        debug!("Capture ended mid-packet, partial packet abandoned");
                    }
                    warn!("Symbol channel disconnected");
                    break;
                }
            }

            if last_stats_report.elapsed() >= self.stats_interval {
                log_stats(&self.decoder.stats);
                last_stats_report = Instant::now();
            }
        }

        log_stats(&self.decoder.stats);
        self.decoder.stats.clone()
    }
}

fn log_stats(stats: &DecoderStats) {
    info!(
        "[Decoder Stats] Symbols: {} | Preambles: {} | Packets: {} (checksum errors: {}) | Invalid: {} | Too long: {} | Idle resets: {}",
        stats.symbols_processed,
        stats.preambles_detected,
        stats.packets_emitted(),
        stats.checksum_mismatches,
        stats.invalid_symbols,
        stats.ceiling_exceeded,
        stats.idle_resets
    );
}

/// Raw batch dump, four symbols per line
fn dump_symbols(batch: &[TimedSymbol]) {
    trace!("Symbol batch start---");
    for (row, chunk) in batch.chunks(4).enumerate() {
        let line: Vec<String> = chunk
            .iter()
            .enumerate()
            .map(|(col, s)| format!("i={} {{{}:{}}}", row * 4 + col, s.duration_high, s.duration_low))
            .collect();
        trace!("{}", line.join("  "));
    }
    trace!("---Symbol batch end ({} symbols)", batch.len());
}
