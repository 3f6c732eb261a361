// Byte transports for the rotator link
//
// The protocol layer only needs to write a frame and pull bytes one at a
// time with a deadline. `SerialTransport` does that over a real port,
// `SimulatedDevice` answers locally for running without hardware.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::debug;

use super::protocol::Command;

/// Byte-oriented serial channel.
///
/// A single owner drives it synchronously; there is no internal locking.
pub trait Transport {
    /// Write bytes, returning how many were accepted
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Read a single byte, failing with `ErrorKind::TimedOut` after `timeout`
    fn read_byte(&mut self, timeout: Duration) -> io::Result<u8>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Discard anything pending in both directions
    fn clear(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        (**self).write(data)
    }

    fn read_byte(&mut self, timeout: Duration) -> io::Result<u8> {
        (**self).read_byte(timeout)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn clear(&mut self) -> io::Result<()> {
        (**self).clear()
    }
}

/// Transport over a serial port
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    timeout: Duration,
}

impl SerialTransport {
    pub fn open(port_name: &str, baudrate: u32, timeout: Duration) -> serialport::Result<Self> {
        let port = serialport::new(port_name, baudrate).timeout(timeout).open()?;
        debug!("Opened {} at {} baud", port_name, baudrate);
        Ok(Self { port, timeout })
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        Write::write(&mut self.port, data)
    }

    fn read_byte(&mut self, timeout: Duration) -> io::Result<u8> {
        if timeout != self.timeout {
            self.port.set_timeout(timeout)?;
            self.timeout = timeout;
        }
        let mut byte = [0u8; 1];
        self.port.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut self.port)
    }

    fn clear(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::All)?;
        Ok(())
    }
}

/// In-process stand-in for the rotator firmware.
///
/// Replies "OK#" to a ping and "SV<major><minor><patch>#" to a version
/// query. Anything else gets no reply, so the caller times out.
#[derive(Debug)]
pub struct SimulatedDevice {
    firmware: [u8; 3],
    pending: VecDeque<u8>,
}

impl SimulatedDevice {
    pub fn new(firmware: [u8; 3]) -> Self {
        Self {
            firmware,
            pending: VecDeque::new(),
        }
    }

    fn reply_to(&self, frame: &[u8]) -> Option<Vec<u8>> {
        if frame == Command::Ping.encode() {
            Some(b"OK#".to_vec())
        } else if frame == Command::Version.encode() {
            let mut reply = b"SV".to_vec();
            reply.extend_from_slice(&self.firmware);
            reply.push(b'#');
            Some(reply)
        } else {
            None
        }
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new(*b"102")
    }
}

impl Transport for SimulatedDevice {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if let Some(reply) = self.reply_to(data) {
            self.pending.extend(reply);
        }
        Ok(data.len())
    }

    fn read_byte(&mut self, _timeout: Duration) -> io::Result<u8> {
        self.pending
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::TimedOut, "simulated device idle"))
    }

    fn clear(&mut self) -> io::Result<()> {
        self.pending.clear();
        Ok(())
    }
}
