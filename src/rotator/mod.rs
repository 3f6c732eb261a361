// Rotator control for the Sunshine serial rotator
//
// Provides:
// - Serial protocol framing and firmware reply parsing
// - Transports (serial port, simulated device)
// - Command client for ping and firmware queries
// - Motion state machine stepping toward the target angle
// - Host-facing driver tying it together

mod client;
mod driver;
pub mod motion;
pub mod protocol;
pub mod transport;

pub use client::CommandClient;
pub use driver::{Capabilities, RotatorDriver, DRIVER_NAME, FIRMWARE_UNKNOWN};
pub use motion::{range360, MotionControllable, MotionController, RotatorStatus};
pub use protocol::{Command, FirmwareInfo, ProtocolError};
pub use transport::{SerialTransport, SimulatedDevice, Transport};
