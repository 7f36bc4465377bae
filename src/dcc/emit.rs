//! Packet hand-off to the consumer

use super::types::{DccPacket, ValidationResult};

/// Receives every framed packet, valid or not.
///
/// Called exactly once per packet whose end bit was seen. Aborted frames never
/// reach the sink. Whether mismatched packets are discarded is up to the sink.
pub trait PacketSink {
    fn emit(&mut self, packet: DccPacket, result: ValidationResult);
}

impl<F> PacketSink for F
where
    F: FnMut(DccPacket, ValidationResult),
{
    fn emit(&mut self, packet: DccPacket, result: ValidationResult) {
        self(packet, result)
    }
}

impl PacketSink for Vec<(DccPacket, ValidationResult)> {
    fn emit(&mut self, packet: DccPacket, result: ValidationResult) {
        self.push((packet, result));
    }
}
