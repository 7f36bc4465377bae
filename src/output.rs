//! Packet sinks used by the binary

use std::io::Write;

use serde::Serialize;
use tracing::{info, warn};

use crate::dcc::{DccPacket, PacketSink, ValidationResult};

/// Output format for decoded packets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Log,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "log" => Some(Self::Log),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logs every packet through tracing
#[derive(Debug, Default)]
pub struct LogSink {
    pub packets: u64,
}

impl PacketSink for LogSink {
    fn emit(&mut self, packet: DccPacket, result: ValidationResult) {
        self.packets += 1;
        match result {
            ValidationResult::Valid => info!(
                ">>> PACKET: addr={:#04X} | {} data bytes | preamble={} | {}",
                packet.address,
                packet.data.len(),
                packet.preamble_bits,
                packet.to_hex()
            ),
            ValidationResult::ChecksumMismatch => warn!(
                ">>> PACKET (checksum mismatch): addr={:#04X} | {} data bytes | preamble={} | {}",
                packet.address,
                packet.data.len(),
                packet.preamble_bits,
                packet.to_hex()
            ),
        }
    }
}

#[derive(Serialize)]
struct PacketEvent<'a> {
    timestamp_ms: i64,
    #[serde(flatten)]
    packet: &'a DccPacket,
    hex: String,
    result: ValidationResult,
}

/// Writes one JSON object per packet per line
pub struct JsonSink<W> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PacketSink for JsonSink<W> {
    fn emit(&mut self, packet: DccPacket, result: ValidationResult) {
        let event = PacketEvent {
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            hex: packet.to_hex(),
            packet: &packet,
            result,
        };
        let written = serde_json::to_writer(&mut self.writer, &event)
            .map_err(std::io::Error::from)
            .and_then(|_| writeln!(self.writer))
            .and_then(|_| self.writer.flush());
        if let Err(e) = written {
            warn!("Failed to write packet: {}", e);
        }
    }
}
