//! Capture thread
//!
//! Pulls symbol batches from a source on a dedicated thread and hands them to
//! the decoder through a bounded channel. A live source never waits for the
//! decoder: if the channel is full the batch is dropped and counted. Replayed
//! input blocks on a full channel instead, so a recording decodes completely.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

use super::source::{ReplaySource, SymbolSource, SyntheticSource};
use crate::dcc::{BitTiming, TimedSymbol};

/// Where captured symbols come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSource {
    /// Generated track signal
    Synthetic,
    /// Replay text from standard input
    Stdin,
    /// Replay text from a file
    File(PathBuf),
}

impl CaptureSource {
    /// `synthetic`, `-` for stdin, anything else is a path
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "synthetic" => Self::Synthetic,
            "-" | "stdin" => Self::Stdin,
            path => Self::File(PathBuf::from(path)),
        }
    }

    fn open(&self, timing: BitTiming) -> Result<Box<dyn SymbolSource>> {
        Ok(match self {
            Self::Synthetic => Box::new(SyntheticSource::new(timing)),
            Self::Stdin => Box::new(ReplaySource::new(BufReader::new(io::stdin()))),
            Self::File(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open capture file {}", path.display()))?;
                Box::new(ReplaySource::new(BufReader::new(file)))
            }
        })
    }
}

/// Capture configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub source: CaptureSource,
    /// Symbols per hand-off
    pub batch_symbols: usize,
    /// Batches the channel can hold
    pub queue_capacity: usize,
    /// Nominal timing used by the synthetic source
    pub timing: BitTiming,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: CaptureSource::Synthetic,
            batch_symbols: 64,
            queue_capacity: 16,
            timing: BitTiming::default(),
        }
    }
}

/// Statistics for capture (atomic for thread-safe access)
#[derive(Debug, Default)]
pub struct CaptureStats {
    pub symbols_captured: AtomicU64,
    pub batches_sent: AtomicU64,
    pub batches_dropped: AtomicU64,
}

impl CaptureStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

/// Capture controller
pub struct SymbolCapture {
    config: CaptureConfig,
    running: Arc<AtomicBool>,
    stats: Arc<CaptureStats>,
}

impl SymbolCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            stats: CaptureStats::new(),
        }
    }

    /// Start capturing from the configured source
    pub fn start(&self) -> Result<Receiver<Vec<TimedSymbol>>> {
        let source = self.config.source.open(self.config.timing)?;
        self.start_with(source)
    }

    /// Start capturing from an explicit source
    pub fn start_with(&self, source: Box<dyn SymbolSource>) -> Result<Receiver<Vec<TimedSymbol>>> {
        info!("Starting DCC capture");
        info!("  Source: {:?}", self.config.source);
        info!("  Batch size: {} symbols", self.config.batch_symbols);
        info!("  Queue capacity: {} batches", self.config.queue_capacity);

        let (batch_tx, batch_rx) = bounded::<Vec<TimedSymbol>>(self.config.queue_capacity);

        let batch_symbols = self.config.batch_symbols;
        let running = self.running.clone();
        let stats = self.stats.clone();

        running.store(true, Ordering::SeqCst);

        thread::Builder::new()
            .name("dcc-capture".to_string())
            .spawn(move || {
                if let Err(e) = run_capture(source, batch_symbols, &running, &stats, &batch_tx) {
                    error!("Capture error: {:#}", e);
                }
                // Clear the flag before the receiver can observe the disconnect
                running.store(false, Ordering::SeqCst);
                drop(batch_tx);
            })
            .context("Failed to spawn capture thread")?;

        Ok(batch_rx)
    }

    /// Stop capturing
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Stopping DCC capture...");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Shared run flag, cleared when capture ends
    pub fn running(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn stats(&self) -> &Arc<CaptureStats> {
        &self.stats
    }
}

impl Drop for SymbolCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Main capture loop (runs in dedicated thread)
fn run_capture(
    mut source: Box<dyn SymbolSource>,
    batch_symbols: usize,
    running: &AtomicBool,
    stats: &CaptureStats,
    batch_tx: &Sender<Vec<TimedSymbol>>,
) -> Result<()> {
    let mut first_data = true;
    let live = source.is_live();

    while running.load(Ordering::SeqCst) {
        let Some(batch) = source.next_batch(batch_symbols)? else {
            info!("Capture source exhausted");
            break;
        };

        if first_data {
            info!("First symbols received! ({} in batch)", batch.len());
            first_data = false;
        }
        stats
            .symbols_captured
            .fetch_add(batch.len() as u64, Ordering::Relaxed);

        if !live {
            if batch_tx.send(batch).is_err() {
                warn!("Symbol channel disconnected");
                break;
            }
            stats.batches_sent.fetch_add(1, Ordering::Relaxed);
            continue;
        }

        match batch_tx.try_send(batch) {
            Ok(()) => {
                stats.batches_sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) => {
                stats.batches_dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Symbol queue full, dropping batch");
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Symbol channel disconnected");
                break;
            }
        }
    }

    info!(
        "Capture stopped. Symbols={}, Batches={}, Dropped={}",
        stats.symbols_captured.load(Ordering::Relaxed),
        stats.batches_sent.load(Ordering::Relaxed),
        stats.batches_dropped.load(Ordering::Relaxed)
    );
    Ok(())
}
