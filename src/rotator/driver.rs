// Host-facing rotator driver
//
// Combines the command client and the motion controller behind the entry
// points a host framework calls: connect/handshake, connection changes,
// move/sync/abort/reverse, and the periodic timer tick.

use tracing::{info, warn};

use super::client::CommandClient;
use super::motion::{MotionControllable, MotionController, RotatorStatus};
use super::protocol::{FirmwareInfo, Result};
use super::transport::Transport;
use crate::config::RotatorConfig;
use crate::messages::RotatorSnapshot;

pub const DRIVER_NAME: &str = "Sunshine";
pub const DRIVER_VERSION: (u16, u16) = (1, 0);

/// Shown in place of the firmware version until the first successful query
pub const FIRMWARE_UNKNOWN: &str = "NA";

/// Optional rotator features this driver supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub can_abort: bool,
    pub can_reverse: bool,
    pub can_sync: bool,
}

pub struct RotatorDriver<T: Transport> {
    client: CommandClient<T>,
    motion: MotionController,
    step_size: f64,
    firmware: Option<FirmwareInfo>,
    firmware_visible: bool,
    connected: bool,
}

impl<T: Transport> RotatorDriver<T> {
    pub fn new(transport: T, config: &RotatorConfig) -> Self {
        Self {
            client: CommandClient::with_timeout(transport, config.timeout()),
            motion: MotionController::with_step_size(config.step_size),
            step_size: config.step_size,
            firmware: None,
            firmware_visible: false,
            connected: false,
        }
    }

    pub fn default_name(&self) -> &'static str {
        DRIVER_NAME
    }

    pub fn version(&self) -> (u16, u16) {
        DRIVER_VERSION
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_abort: true,
            can_reverse: true,
            can_sync: true,
        }
    }

    /// Reset motion state and forget the cached firmware version
    pub fn initialize(&mut self) {
        self.motion = MotionController::with_step_size(self.step_size);
        self.firmware = None;
        self.firmware_visible = false;
    }

    /// Liveness check performed when a connection is established
    pub fn handshake(&mut self) -> bool {
        match self.client.ping() {
            Ok(()) => true,
            Err(e) => {
                warn!("Handshake with {} failed: {}", DRIVER_NAME, e);
                false
            }
        }
    }

    /// Handshake and, on success, mark the driver connected
    pub fn connect(&mut self) -> bool {
        let ok = self.handshake();
        self.on_connected_state_changed(ok);
        ok
    }

    pub fn disconnect(&mut self) {
        self.on_connected_state_changed(false);
    }

    /// Refresh the firmware version and expose it on connect, hide it on
    /// disconnect.
    pub fn on_connected_state_changed(&mut self, connected: bool) {
        self.connected = connected;
        if connected {
            // A failed query keeps whatever was cached before
            if let Err(e) = self.query_firmware() {
                warn!(
                    "Firmware query on connect failed, keeping {}: {}",
                    self.firmware_version(),
                    e
                );
            }
            self.firmware_visible = true;
        } else {
            self.firmware_visible = false;
        }
        info!(
            "{} {}",
            DRIVER_NAME,
            if connected { "connected" } else { "disconnected" }
        );
    }

    pub fn ping(&mut self) -> Result<()> {
        self.client.ping()
    }

    /// Query the firmware version; the cache only changes on success
    pub fn query_firmware(&mut self) -> Result<FirmwareInfo> {
        let firmware = self.client.query_firmware()?;
        self.firmware = Some(firmware.clone());
        Ok(firmware)
    }

    pub fn move_to(&mut self, angle: f64) -> RotatorStatus {
        info!("Moving to {:.2}", angle);
        self.motion.move_rotator(angle)
    }

    /// Move `delta` degrees from the current position, whatever the
    /// reverse setting
    pub fn jog(&mut self, delta: f64) -> RotatorStatus {
        let destination = self.motion.current_angle() + delta;
        let requested = if self.motion.is_reversed() {
            360.0 - destination
        } else {
            destination
        };
        self.move_to(requested)
    }

    pub fn sync(&mut self, angle: f64) -> bool {
        self.motion.sync_rotator(angle)
    }

    pub fn abort(&mut self) -> bool {
        info!("Abort at {:.2}", self.motion.current_angle());
        self.motion.abort_rotator()
    }

    pub fn set_reversed(&mut self, enabled: bool) -> bool {
        info!("Reverse {}", if enabled { "enabled" } else { "disabled" });
        self.motion.reverse_rotator(enabled)
    }

    /// Periodic timer callback.
    ///
    /// Does nothing while disconnected or idle. Otherwise advances one step
    /// and returns the state to publish.
    pub fn on_timer_tick(&mut self) -> Option<RotatorSnapshot> {
        if !self.connected || !self.motion.is_busy() {
            return None;
        }
        if self.motion.tick() == RotatorStatus::Idle {
            info!("Reached {:.2}", self.motion.current_angle());
        }
        Some(self.snapshot())
    }

    pub fn snapshot(&self) -> RotatorSnapshot {
        RotatorSnapshot {
            current_angle: self.motion.current_angle(),
            target_angle: self.motion.target_angle(),
            status: self.motion.status(),
            reversed: self.motion.is_reversed(),
            firmware: self
                .firmware_visible
                .then(|| self.firmware_version().to_string()),
        }
    }

    /// Cached firmware version, or "NA" before the first successful query
    pub fn firmware_version(&self) -> &str {
        self.firmware
            .as_ref()
            .map_or(FIRMWARE_UNKNOWN, |fw| fw.version.as_str())
    }

    pub fn firmware(&self) -> Option<&FirmwareInfo> {
        self.firmware.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn status(&self) -> RotatorStatus {
        self.motion.status()
    }

    pub fn current_angle(&self) -> f64 {
        self.motion.current_angle()
    }

    pub fn motion(&self) -> &MotionController {
        &self.motion
    }

    pub fn client_mut(&mut self) -> &mut CommandClient<T> {
        &mut self.client
    }
}
