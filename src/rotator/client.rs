// Command client: one write-then-read round trip per call

use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::protocol::{
    decode_response, hex_dump, parse_firmware, read_frame, response_text, write_frame, Command,
    FirmwareInfo, Result,
};
use super::transport::Transport;
use crate::config::DRIVER_TIMEOUT;

/// Issues commands to the rotator firmware.
///
/// Holds nothing but the transport and the read timeout; every call is a
/// blocking round trip of up to `timeout`. Failures are logged and returned,
/// never retried.
pub struct CommandClient<T: Transport> {
    transport: T,
    timeout: Duration,
}

impl<T: Transport> CommandClient<T> {
    pub fn new(transport: T) -> Self {
        Self::with_timeout(transport, DRIVER_TIMEOUT)
    }

    pub fn with_timeout(transport: T, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Liveness check. The reply payload is ignored.
    pub fn ping(&mut self) -> Result<()> {
        self.send_command(Command::Ping).map(|_| ())
    }

    /// Ask the firmware for its version
    pub fn query_firmware(&mut self) -> Result<FirmwareInfo> {
        let payload = self.send_command(Command::Version)?;
        let firmware = parse_firmware(&payload).inspect_err(|e| error!("Bad version reply: {}", e))?;
        info!("FW_VERSION <{}>", firmware);
        Ok(firmware)
    }

    /// Send a command and return the reply payload with the terminator stripped
    pub fn send_command(&mut self, command: Command) -> Result<Vec<u8>> {
        let frame = command.encode();
        info!("CMD <{}>", command.frame());
        debug!("CMD hex: {}", hex_dump(frame));

        // A stale reply left in the input queue would be read as ours
        if let Err(e) = self.transport.clear() {
            warn!("Failed to flush serial queues: {}", e);
        }

        write_frame(&mut self.transport, frame).inspect_err(|e| error!("{}.", e))?;

        let raw = read_frame(&mut self.transport, self.timeout).inspect_err(|e| error!("{}.", e))?;
        debug!("RES hex: {}", hex_dump(&raw));

        let payload = decode_response(&raw)?.to_vec();
        info!("RES <{}>", response_text(&payload));
        Ok(payload)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotator::protocol::ProtocolError;
    use crate::rotator::transport::SimulatedDevice;

    #[test]
    fn test_ping_simulated() {
        let mut client = CommandClient::new(SimulatedDevice::default());
        assert!(client.ping().is_ok());
    }

    #[test]
    fn test_firmware_simulated() {
        let mut client = CommandClient::new(SimulatedDevice::new(*b"210"));
        let fw = client.query_firmware().unwrap();
        assert_eq!(fw.version, "2.1.0");
    }

    #[test]
    fn test_send_command_returns_payload() {
        let mut client = CommandClient::new(SimulatedDevice::default());
        assert_eq!(client.send_command(Command::Ping).unwrap(), b"OK");
    }

    #[test]
    fn test_no_reply_is_read_error() {
        struct Silent;
        impl Transport for Silent {
            fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
                Ok(data.len())
            }
            fn read_byte(&mut self, _timeout: Duration) -> std::io::Result<u8> {
                Err(std::io::ErrorKind::TimedOut.into())
            }
        }

        let mut client = CommandClient::with_timeout(Silent, Duration::from_millis(10));
        let err = client.ping().unwrap_err();
        assert!(matches!(err, ProtocolError::TransportRead(_)));
        assert!(err.is_timeout());
    }
}
