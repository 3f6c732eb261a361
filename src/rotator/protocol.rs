// Sunshine rotator serial protocol
//
// ASCII request/response, one frame per round trip:
//   -> ":<code>#"
//   <- "<payload>#"   (at most DRIVER_LEN bytes including the terminator)
//
// The Version reply carries five raw bytes; positions 2, 3 and 4 are the
// major, minor and patch digits.

use std::fmt;
use std::io;
use std::time::{Duration, Instant};

use super::transport::Transport;
use crate::config::{DRIVER_LEN, DRIVER_STOP_CHAR};

/// Byte offsets of the version digits inside a Version reply.
const FIRMWARE_DIGITS: [usize; 3] = [2, 3, 4];

/// Commands understood by the rotator firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    Version,
}

impl Command {
    /// Wire frame for this command
    pub fn frame(self) -> &'static str {
        match self {
            Command::Ping => ":P#",
            Command::Version => ":V#",
        }
    }

    pub fn encode(self) -> &'static [u8] {
        self.frame().as_bytes()
    }
}

/// Error types for rotator communication
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Serial write error: {0}")]
    TransportWrite(#[source] io::Error),

    #[error("Serial read error: {0}")]
    TransportRead(#[source] io::Error),

    #[error("No terminator within {capacity} bytes")]
    Framing { capacity: usize },

    #[error("Response too short: expected {expected} bytes, got {actual}")]
    ShortResponse { expected: usize, actual: usize },
}

impl ProtocolError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProtocolError::TransportRead(e) if e.kind() == io::ErrorKind::TimedOut)
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Firmware version as reported by the device, e.g. "1.0.2"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareInfo {
    pub version: String,
}

impl fmt::Display for FirmwareInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.version)
    }
}

/// Write a whole command frame. A short write is an error.
pub fn write_frame<T: Transport + ?Sized>(transport: &mut T, frame: &[u8]) -> Result<()> {
    let written = transport.write(frame).map_err(ProtocolError::TransportWrite)?;
    if written != frame.len() {
        return Err(ProtocolError::TransportWrite(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("wrote {} of {} bytes", written, frame.len()),
        )));
    }
    transport.flush().map_err(ProtocolError::TransportWrite)
}

/// Read bytes until the terminator arrives, the buffer fills, or `timeout`
/// elapses. Returns the raw frame including the terminator.
pub fn read_frame<T: Transport + ?Sized>(transport: &mut T, timeout: Duration) -> Result<Vec<u8>> {
    let deadline = Instant::now() + timeout;
    let mut buf = Vec::with_capacity(DRIVER_LEN);

    while buf.len() < DRIVER_LEN {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(timed_out(buf.len()));
        }

        let byte = transport.read_byte(remaining).map_err(|e| match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => timed_out(buf.len()),
            _ => ProtocolError::TransportRead(e),
        })?;

        buf.push(byte);
        if byte == DRIVER_STOP_CHAR {
            return Ok(buf);
        }
    }

    Err(ProtocolError::Framing {
        capacity: DRIVER_LEN,
    })
}

fn timed_out(received: usize) -> ProtocolError {
    ProtocolError::TransportRead(io::Error::new(
        io::ErrorKind::TimedOut,
        format!("timed out after {} bytes without terminator", received),
    ))
}

/// Strip the terminator from a raw frame, returning the payload bytes.
pub fn decode_response(raw: &[u8]) -> Result<&[u8]> {
    let window = &raw[..raw.len().min(DRIVER_LEN)];
    match window.iter().position(|&b| b == DRIVER_STOP_CHAR) {
        Some(end) => Ok(&raw[..end]),
        None if raw.len() >= DRIVER_LEN => Err(ProtocolError::Framing {
            capacity: DRIVER_LEN,
        }),
        None => Err(ProtocolError::TransportRead(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "missing terminator",
        ))),
    }
}

/// Payload as trimmed ASCII for logging and display
pub fn response_text(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).trim().to_string()
}

/// Extract the version digits from a Version reply payload
pub fn parse_firmware(payload: &[u8]) -> Result<FirmwareInfo> {
    let expected = FIRMWARE_DIGITS[2] + 1;
    if payload.len() < expected {
        return Err(ProtocolError::ShortResponse {
            expected,
            actual: payload.len(),
        });
    }

    let [major, minor, patch] = FIRMWARE_DIGITS.map(|i| payload[i] as char);
    Ok(FirmwareInfo {
        version: format!("{}.{}.{}", major, minor, patch),
    })
}

/// Space separated hex bytes, e.g. "3A 50 23"
pub fn hex_dump(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
