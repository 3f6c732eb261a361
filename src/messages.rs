// Message types exchanged between the host and the runtime

use serde::{Deserialize, Serialize};

use crate::rotator::RotatorStatus;

// Command from host/scripts -> runtime, one JSON object per line
// e.g. {"cmd": "move", "angle": 90.0}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum RotatorCommand {
    Move { angle: f64 },
    Sync { angle: f64 },
    Abort,
    Reverse { enabled: bool },
    Ping,
    Firmware,
}

/// Published rotator state, the values a host shows in its UI.
///
/// `firmware` is only present while the firmware field is exposed
/// (i.e. while connected).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotatorSnapshot {
    pub current_angle: f64,
    pub target_angle: Option<f64>,
    pub status: RotatorStatus,
    pub reversed: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub firmware: Option<String>,
}
