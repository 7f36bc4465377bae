//! DCC Capture - decode a captured DCC track signal into packets
//!
//! Reads pulse-pair timings from a capture source, decodes them on a blocking
//! worker and reports every framed packet.

use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dcc_capture::capture::SymbolCapture;
use dcc_capture::output::{JsonSink, LogSink, OutputFormat};
use dcc_capture::{Config, DecodeRunner, Decoder};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;

    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("===========================================");
    info!("   DCC Capture");
    info!("   edge timings -> validated packets");
    info!("===========================================");

    info!("Configuration:");
    info!(
        "  One half-periods: {}/{} us, zero: {}/{} us, margin: {} us",
        config.timing.one_high,
        config.timing.one_low,
        config.timing.zero_high,
        config.timing.zero_low,
        config.timing.margin
    );
    info!("  Minimum preamble: {} bits", config.min_preamble_bits);
    info!("  Maximum packet: {} bytes", config.max_packet_bytes);
    info!("  Idle window: {} ms", config.idle_window.as_millis());
    info!("  Output: {:?}", config.output);

    let decoder = Decoder::new(&config.decoder_config()).context("Invalid decoder configuration")?;
    let mut runner = DecodeRunner::new(decoder, config.idle_window, config.stats_interval);

    let capture = SymbolCapture::new(config.capture_config());
    let batch_rx = match capture.start() {
        Ok(rx) => rx,
        Err(e) => {
            error!("Failed to start capture: {:#}", e);
            return Err(e);
        }
    };

    info!("===========================================");
    info!("  Decoding...");
    info!("  Press Ctrl+C to stop.");
    info!("===========================================");

    let running = capture.running();
    let output = config.output;
    let mut decode_handle = tokio::task::spawn_blocking(move || match output {
        OutputFormat::Log => runner.run(&batch_rx, &running, &mut LogSink::default()),
        OutputFormat::Json => {
            let mut sink = JsonSink::new(std::io::stdout().lock());
            runner.run(&batch_rx, &running, &mut sink)
        }
    });

    let finished = tokio::select! {
        result = &mut decode_handle => Some(result),
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Ctrl+C received");
            None
        }
    };
    let stats = match finished {
        Some(result) => result.context("Decode task failed")?,
        None => {
            capture.stop();
            decode_handle.await.context("Decode task failed")?
        }
    };

    capture.stop();
    let capture_stats = capture.stats();
    info!(
        "Shutdown complete. Symbols captured: {}, batches dropped: {}, packets: {} ({} checksum errors)",
        capture_stats.symbols_captured.load(Ordering::Relaxed),
        capture_stats.batches_dropped.load(Ordering::Relaxed),
        stats.packets_emitted(),
        stats.checksum_mismatches
    );
    Ok(())
}
